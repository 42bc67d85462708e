use chrono::{DateTime, Utc};

use crate::domain::{Campaign, CampaignId, WELCOME_CAMPAIGN_ID};
use crate::error::{ApiError, ApiResult};
use crate::repo::Store;

/// Campaigns a subscription is granted coupons for
#[derive(Debug, Clone)]
pub struct ResolvedCampaigns {
    pub welcome: Campaign,
    /// An eligible campaign the client asked for, never the welcome campaign
    pub requested: Option<Campaign>,
}

impl ResolvedCampaigns {
    pub fn all(&self) -> impl Iterator<Item = &Campaign> {
        std::iter::once(&self.welcome).chain(self.requested.as_ref())
    }
}

/// Load the mandatory welcome campaign
#[tracing::instrument(name = "Load welcome campaign", skip(store))]
pub async fn welcome_campaign(store: &dyn Store) -> ApiResult<Campaign> {
    store
        .fetch_campaign(WELCOME_CAMPAIGN_ID)
        .await?
        .ok_or(ApiError::MissingWelcomeCampaign)
}

/// Load a campaign if it is currently eligible for issuance
#[tracing::instrument(name = "Load active campaign", skip(store))]
pub async fn active_campaign(
    store: &dyn Store,
    id: &CampaignId,
    now: DateTime<Utc>,
) -> ApiResult<Option<Campaign>> {
    let campaign = store.fetch_campaign(id.as_ref()).await?;
    Ok(campaign.filter(|c| c.is_eligible_at(now)))
}

/// Resolve the welcome campaign plus an optional requested one.
///
/// Malformed, unknown, ineligible or `WELCOME` requests resolve to no extra campaign.
pub async fn resolve_campaigns(
    store: &dyn Store,
    requested: Option<&str>,
    now: DateTime<Utc>,
) -> ApiResult<ResolvedCampaigns> {
    let welcome = welcome_campaign(store).await?;

    let requested_id = requested.and_then(|raw| match raw.parse::<CampaignId>() {
        Ok(id) => Some(id),
        Err(_) => {
            tracing::debug!(campaign_id = raw, "Ignoring malformed campaign id");
            None
        }
    });

    let requested = match requested_id {
        Some(id) if !id.is_welcome() => active_campaign(store, &id, now).await?,
        _ => None,
    };

    Ok(ResolvedCampaigns { welcome, requested })
}
