use async_trait::async_trait;

use chrono::{DateTime, Utc};

use sqlx::{FromRow, PgPool};

use uuid::Uuid;

use super::{Stats, Store, StoreError, StoreResult};
use crate::domain::{Campaign, CampaignDraft, Coupon, NewCoupon, NewEvent, NewSubscriber};

const CAMPAIGN_COLUMNS: &str = "id, name, prefix, discount_type, discount_value, stackable, \
    stack_group, active, starts_at, ends_at, created_at, updated_at";

/// Postgres-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct CampaignRow {
    id: String,
    name: String,
    prefix: String,
    discount_type: String,
    discount_value: i32,
    stackable: bool,
    stack_group: Option<String>,
    active: bool,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = StoreError;

    fn try_from(row: CampaignRow) -> StoreResult<Self> {
        let discount_type = row.discount_type.parse().map_err(|_| {
            StoreError::InvalidRecord(format!(
                "campaign {} has unknown discount type {}",
                row.id, row.discount_type
            ))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            prefix: row.prefix,
            discount_type,
            discount_value: row.discount_value,
            stackable: row.stackable,
            stack_group: row.stack_group,
            active: row.active,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CouponRow {
    code: String,
    email: String,
    campaign_id: String,
    created_at: DateTime<Utc>,
    redeemed_at: Option<DateTime<Utc>>,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Self {
            code: row.code,
            email: row.email,
            campaign_id: row.campaign_id,
            created_at: row.created_at,
            redeemed_at: row.redeemed_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StatsRow {
    subscribers: i64,
    coupons: i64,
    active_campaigns: i64,
}

#[async_trait]
impl Store for PgStore {
    #[tracing::instrument(
        name = "Upsert subscriber",
        skip(self, subscriber),
        fields(email = %subscriber.email)
    )]
    async fn upsert_subscriber(&self, subscriber: &NewSubscriber) -> StoreResult<()> {
        let attrs = &subscriber.attributes;
        // coalesce keeps the stored value: first write wins per column
        sqlx::query(
            r#"
            insert into subscribers
                (email, source, referrer, landing_path, country, region, city, user_agent)
            values ($1, $2, $3, $4, $5, $6, $7, $8)
            on conflict (email) do update set
                source = coalesce(subscribers.source, excluded.source),
                referrer = coalesce(subscribers.referrer, excluded.referrer),
                landing_path = coalesce(subscribers.landing_path, excluded.landing_path),
                country = coalesce(subscribers.country, excluded.country),
                region = coalesce(subscribers.region, excluded.region),
                city = coalesce(subscribers.city, excluded.city),
                user_agent = coalesce(subscribers.user_agent, excluded.user_agent)
            "#,
        )
        .bind(subscriber.email.as_ref())
        .bind(&attrs.source)
        .bind(&attrs.referrer)
        .bind(&attrs.landing_path)
        .bind(&attrs.country)
        .bind(&attrs.region)
        .bind(&attrs.city)
        .bind(&attrs.user_agent)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(name = "Fetch campaign", skip(self))]
    async fn fetch_campaign(&self, id: &str) -> StoreResult<Option<Campaign>> {
        let query = format!("select {} from campaigns where id = $1", CAMPAIGN_COLUMNS);
        sqlx::query_as::<_, CampaignRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Campaign::try_from)
            .transpose()
    }

    #[tracing::instrument(name = "List campaigns", skip(self))]
    async fn list_campaigns(&self) -> StoreResult<Vec<Campaign>> {
        let query = format!("select {} from campaigns order by id", CAMPAIGN_COLUMNS);
        sqlx::query_as::<_, CampaignRow>(&query)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Campaign::try_from)
            .collect()
    }

    #[tracing::instrument(name = "Upsert campaign", skip(self, draft), fields(id = %draft.id))]
    async fn upsert_campaign(&self, draft: &CampaignDraft) -> StoreResult<()> {
        sqlx::query(
            r#"
            insert into campaigns
                (id, name, prefix, discount_type, discount_value, stackable, stack_group,
                 active, starts_at, ends_at, created_at, updated_at)
            values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now(), now())
            on conflict (id) do update set
                name = excluded.name,
                prefix = excluded.prefix,
                discount_type = excluded.discount_type,
                discount_value = excluded.discount_value,
                stackable = excluded.stackable,
                stack_group = excluded.stack_group,
                active = excluded.active,
                starts_at = excluded.starts_at,
                ends_at = excluded.ends_at,
                updated_at = now()
            "#,
        )
        .bind(draft.id.as_ref())
        .bind(&draft.name)
        .bind(draft.prefix.as_ref())
        .bind(draft.discount_type.as_str())
        .bind(draft.discount_value)
        .bind(draft.stackable)
        .bind(&draft.stack_group)
        .bind(draft.active)
        .bind(draft.starts_at)
        .bind(draft.ends_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(
        name = "Insert coupon if absent",
        skip(self, coupon),
        fields(email = %coupon.email, campaign_id = %coupon.campaign_id)
    )]
    async fn insert_coupon_if_absent(&self, coupon: &NewCoupon) -> StoreResult<(Coupon, bool)> {
        let inserted = sqlx::query(
            r#"
            insert into coupons (code, email, campaign_id, created_at)
            values ($1, $2, $3, now())
            on conflict (email, campaign_id) do nothing
            "#,
        )
        .bind(&coupon.code)
        .bind(&coupon.email)
        .bind(&coupon.campaign_id)
        .execute(&self.pool)
        .await?
        .rows_affected()
            == 1;

        // Always answer with the stored row so a re-issue returns the original code
        let stored = sqlx::query_as::<_, CouponRow>(
            r#"
            select code, email, campaign_id, created_at, redeemed_at
            from coupons where email = $1 and campaign_id = $2
            "#,
        )
        .bind(&coupon.email)
        .bind(&coupon.campaign_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((stored.into(), inserted))
    }

    #[tracing::instrument(
        name = "Record event",
        skip(self, event),
        fields(kind = event.kind.as_str())
    )]
    async fn record_event(&self, event: &NewEvent) -> StoreResult<()> {
        sqlx::query(
            r#"
            insert into events (id, type, email, campaign_id, ip, created_at, payload_json)
            values ($1, $2, $3, $4, $5, now(), $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event.kind.as_str())
        .bind(&event.email)
        .bind(&event.campaign_id)
        .bind(&event.ip)
        .bind(event.payload.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(name = "Fetch stats", skip(self))]
    async fn stats(&self) -> StoreResult<Stats> {
        let row = sqlx::query_as::<_, StatsRow>(
            r#"
            select
                (select count(*) from subscribers) as subscribers,
                (select count(*) from coupons) as coupons,
                (select count(*) from campaigns where active) as active_campaigns
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(Stats {
            subscribers: row.subscribers,
            coupons: row.coupons,
            active_campaigns: row.active_campaigns,
        })
    }
}
