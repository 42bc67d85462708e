//! In-memory store, used by the test-suite

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;

use chrono::Utc;

use tokio::sync::RwLock;

use uuid::Uuid;

use super::{Stats, Store, StoreResult};
use crate::domain::{
    Campaign, CampaignDraft, Coupon, DiscountType, Event, NewCoupon, NewEvent, NewSubscriber,
    Subscriber, WELCOME_CAMPAIGN_ID,
};

#[derive(Default)]
pub struct MemoryStore {
    subscribers: RwLock<HashMap<String, Subscriber>>,
    campaigns: RwLock<BTreeMap<String, Campaign>>,
    coupons: RwLock<HashMap<(String, String), Coupon>>,
    events: RwLock<Vec<Event>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the same `WELCOME` campaign the database migrations seed
    pub fn seeded() -> Self {
        let now = Utc::now();
        let welcome = Campaign {
            id: WELCOME_CAMPAIGN_ID.into(),
            name: "Welcome offer".into(),
            prefix: WELCOME_CAMPAIGN_ID.into(),
            discount_type: DiscountType::Percent,
            discount_value: 10,
            stackable: false,
            stack_group: None,
            active: true,
            starts_at: None,
            ends_at: None,
            created_at: now,
            updated_at: now,
        };

        Self {
            campaigns: RwLock::new(BTreeMap::from([(welcome.id.clone(), welcome)])),
            ..Self::default()
        }
    }

    pub async fn subscriber(&self, email: &str) -> Option<Subscriber> {
        self.subscribers.read().await.get(email).cloned()
    }

    /// All coupons issued to an email, ordered by campaign id
    pub async fn coupons_for(&self, email: &str) -> Vec<Coupon> {
        let mut coupons: Vec<Coupon> = self
            .coupons
            .read()
            .await
            .values()
            .filter(|c| c.email == email)
            .cloned()
            .collect();
        coupons.sort_by(|a, b| a.campaign_id.cmp(&b.campaign_id));
        coupons
    }

    pub async fn events(&self) -> Vec<Event> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_subscriber(&self, subscriber: &NewSubscriber) -> StoreResult<()> {
        let email = subscriber.email.as_ref().to_string();
        self.subscribers
            .write()
            .await
            .entry(email.clone())
            .and_modify(|stored| stored.attributes.backfill(&subscriber.attributes))
            .or_insert_with(|| Subscriber {
                email,
                created_at: Utc::now(),
                attributes: subscriber.attributes.clone(),
            });
        Ok(())
    }

    async fn fetch_campaign(&self, id: &str) -> StoreResult<Option<Campaign>> {
        Ok(self.campaigns.read().await.get(id).cloned())
    }

    async fn list_campaigns(&self) -> StoreResult<Vec<Campaign>> {
        Ok(self.campaigns.read().await.values().cloned().collect())
    }

    async fn upsert_campaign(&self, draft: &CampaignDraft) -> StoreResult<()> {
        let now = Utc::now();
        let mut campaigns = self.campaigns.write().await;
        let created_at = campaigns
            .get(draft.id.as_ref())
            .map_or(now, |existing| existing.created_at);

        campaigns.insert(
            draft.id.as_ref().to_string(),
            Campaign {
                id: draft.id.as_ref().to_string(),
                name: draft.name.clone(),
                prefix: draft.prefix.as_ref().to_string(),
                discount_type: draft.discount_type,
                discount_value: draft.discount_value,
                stackable: draft.stackable,
                stack_group: draft.stack_group.clone(),
                active: draft.active,
                starts_at: draft.starts_at,
                ends_at: draft.ends_at,
                created_at,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn insert_coupon_if_absent(&self, coupon: &NewCoupon) -> StoreResult<(Coupon, bool)> {
        let key = (coupon.email.clone(), coupon.campaign_id.clone());
        let mut coupons = self.coupons.write().await;
        if let Some(stored) = coupons.get(&key) {
            return Ok((stored.clone(), false));
        }

        let stored = Coupon {
            code: coupon.code.clone(),
            email: coupon.email.clone(),
            campaign_id: coupon.campaign_id.clone(),
            created_at: Utc::now(),
            redeemed_at: None,
        };
        coupons.insert(key, stored.clone());
        Ok((stored, true))
    }

    async fn record_event(&self, event: &NewEvent) -> StoreResult<()> {
        self.events.write().await.push(Event {
            id: Uuid::new_v4(),
            kind: event.kind,
            email: event.email.clone(),
            campaign_id: event.campaign_id.clone(),
            ip: event.ip.clone(),
            created_at: Utc::now(),
            payload: event.payload.clone(),
        });
        Ok(())
    }

    async fn stats(&self) -> StoreResult<Stats> {
        let active_campaigns = self
            .campaigns
            .read()
            .await
            .values()
            .filter(|c| c.active)
            .count();

        Ok(Stats {
            subscribers: self.subscribers.read().await.len() as i64,
            coupons: self.coupons.read().await.len() as i64,
            active_campaigns: active_campaigns as i64,
        })
    }
}
