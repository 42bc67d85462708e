use chrono::{DateTime, Utc};

use serde::Deserialize;

use serde_json::json;

use super::{record_event_best_effort, resolve_campaigns, IssuedCoupon, Notifier};
use crate::client::TurnstileClient;
use crate::crypto::CouponSecret;
use crate::domain::{
    Campaign, EmailAddress, EventKind, NewCoupon, NewEvent, NewSubscriber, SubscriberAttributes,
};
use crate::error::ApiResult;
use crate::repo::Store;

/// Body of a subscribe request. Unknown fields are ignored, and so is any
/// field holding something other than a string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeBody {
    #[serde(default, deserialize_with = "string_or_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub turnstile_token: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub campaign_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub referrer: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub landing_path: Option<String>,
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

/// A validated subscribe request
#[derive(Debug, Clone)]
pub struct SubscribeRequest {
    pub email: EmailAddress,
    pub turnstile_token: Option<String>,
    pub campaign_id: Option<String>,
    pub attributes: SubscriberAttributes,
    pub ip: Option<String>,
}

#[derive(Debug)]
pub struct SubscribeOutcome {
    /// Welcome coupon first, then the requested campaign's coupon if any
    pub coupons: Vec<IssuedCoupon>,
    pub email_sent: bool,
}

/// The subscribe flow: challenge, subscriber upsert, campaign resolution,
/// coupon issuance and notification, in that order
pub struct SubscriptionService<'a> {
    pub store: &'a dyn Store,
    pub challenge: &'a TurnstileClient,
    pub coupon_secret: &'a CouponSecret,
    pub notifier: &'a Notifier,
}

impl SubscriptionService<'_> {
    #[tracing::instrument(
        name = "Process subscription",
        skip(self, request),
        fields(email = %request.email, campaign_id = ?request.campaign_id)
    )]
    pub async fn subscribe(
        &self,
        request: SubscribeRequest,
        now: DateTime<Utc>,
    ) -> ApiResult<SubscribeOutcome> {
        self.challenge
            .verify(request.turnstile_token.as_deref(), request.ip.as_deref())
            .await?;

        let subscriber = NewSubscriber {
            email: request.email.clone(),
            attributes: request.attributes.clone(),
        };
        self.store.upsert_subscriber(&subscriber).await?;

        record_event_best_effort(
            self.store,
            NewEvent::new(
                EventKind::Subscribe,
                json!({
                    "requestedCampaignId": request.campaign_id,
                    "attributes": request.attributes,
                }),
            )
            .email(request.email.as_ref())
            .ip(request.ip.clone()),
        )
        .await;

        let campaigns = resolve_campaigns(self.store, request.campaign_id.as_deref(), now).await?;

        let mut coupons = Vec::with_capacity(2);
        for campaign in campaigns.all() {
            coupons.push(self.issue(&request.email, campaign).await?);
        }

        let issued: Vec<_> = coupons
            .iter()
            .map(|c| json!({ "campaignId": c.campaign.id, "code": c.code, "created": c.created }))
            .collect();
        let event_campaign = campaigns
            .requested
            .as_ref()
            .unwrap_or(&campaigns.welcome)
            .id
            .clone();
        record_event_best_effort(
            self.store,
            NewEvent::new(EventKind::CouponIssued, json!({ "coupons": issued }))
                .email(request.email.as_ref())
                .campaign(event_campaign)
                .ip(request.ip.clone()),
        )
        .await;

        let email_sent = self.notifier.send_coupons(&request.email, &coupons).await;

        Ok(SubscribeOutcome {
            coupons,
            email_sent,
        })
    }

    /// Issue (or re-issue) the coupon for one campaign. The stored code wins over
    /// a freshly derived one, so codes survive later prefix changes.
    async fn issue(&self, email: &EmailAddress, campaign: &Campaign) -> ApiResult<IssuedCoupon> {
        let code = self
            .coupon_secret
            .derive(email.as_ref(), &campaign.id, &campaign.prefix)?;

        let (coupon, created) = self
            .store
            .insert_coupon_if_absent(&NewCoupon {
                code,
                email: email.as_ref().to_string(),
                campaign_id: campaign.id.clone(),
            })
            .await?;

        if created {
            tracing::info!(campaign_id = %campaign.id, "Issued new coupon");
        }

        Ok(IssuedCoupon {
            code: coupon.code,
            campaign: campaign.clone(),
            created,
        })
    }
}
