mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use serde::Serialize;

use crate::domain::{Campaign, CampaignDraft, Coupon, NewCoupon, NewEvent, NewSubscriber};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Stored record is invalid: {0}")]
    InvalidRecord(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Aggregate counts for the admin dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub subscribers: i64,
    pub coupons: i64,
    pub active_campaigns: i64,
}

/// Durable state for subscribers, campaigns, coupons and audit events
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a subscriber, or backfill only the attributes that are still unset
    async fn upsert_subscriber(&self, subscriber: &NewSubscriber) -> StoreResult<()>;

    /// Get a campaign by id
    async fn fetch_campaign(&self, id: &str) -> StoreResult<Option<Campaign>>;

    /// List all campaigns, ordered by id
    async fn list_campaigns(&self) -> StoreResult<Vec<Campaign>>;

    /// Insert a campaign, or replace every mutable field of an existing one
    async fn upsert_campaign(&self, draft: &CampaignDraft) -> StoreResult<()>;

    /// Store a coupon unless one already exists for its (email, campaign) pair.
    /// Returns the stored coupon and whether it was created by this call.
    async fn insert_coupon_if_absent(&self, coupon: &NewCoupon) -> StoreResult<(Coupon, bool)>;

    /// Append an audit event
    async fn record_event(&self, event: &NewEvent) -> StoreResult<()>;

    async fn stats(&self) -> StoreResult<Stats>;
}
