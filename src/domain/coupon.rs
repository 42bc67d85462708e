use chrono::{DateTime, Utc};

use serde::Serialize;

/// Coupon about to be issued; stored only if the (email, campaign) pair has none yet
#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub code: String,
    pub email: String,
    pub campaign_id: String,
}

/// Stored coupon record. The code is fixed at first issuance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub code: String,
    pub email: String,
    pub campaign_id: String,
    pub created_at: DateTime<Utc>,
    /// Redemption is not tracked by this service yet
    pub redeemed_at: Option<DateTime<Utc>>,
}
