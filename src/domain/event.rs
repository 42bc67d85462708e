use chrono::{DateTime, Utc};

use uuid::Uuid;

/// Audit event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Subscribe,
    CouponIssued,
    AdminAction,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::CouponIssued => "coupon_issued",
            Self::AdminAction => "admin_action",
        }
    }
}

/// Append-only audit record
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub kind: EventKind,
    pub email: Option<String>,
    pub campaign_id: Option<String>,
    pub ip: Option<String>,
    pub payload: serde_json::Value,
}

impl NewEvent {
    pub fn new(kind: EventKind, payload: serde_json::Value) -> Self {
        Self {
            kind,
            email: None,
            campaign_id: None,
            ip: None,
            payload,
        }
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn campaign(mut self, campaign_id: impl Into<String>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }

    pub fn ip(mut self, ip: Option<String>) -> Self {
        self.ip = ip;
        self
    }
}

/// Stored audit record
#[derive(Debug, Clone)]
pub struct Event {
    pub id: Uuid,
    pub kind: EventKind,
    pub email: Option<String>,
    pub campaign_id: Option<String>,
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}
