use chrono::{DateTime, Utc};

use serde::Serialize;

use super::EmailAddress;

/// Longest value kept for any free-form subscriber attribute
pub const MAX_ATTRIBUTE_LEN: usize = 512;

/// Where a subscriber came from. Every field is optional and first-write-wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberAttributes {
    pub source: Option<String>,
    pub referrer: Option<String>,
    pub landing_path: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub user_agent: Option<String>,
}

impl SubscriberAttributes {
    /// Fill in fields that are still unset from `incoming`, never overwriting a stored value
    pub fn backfill(&mut self, incoming: &SubscriberAttributes) {
        fn keep_first(current: &mut Option<String>, incoming: &Option<String>) {
            if current.is_none() {
                current.clone_from(incoming);
            }
        }

        keep_first(&mut self.source, &incoming.source);
        keep_first(&mut self.referrer, &incoming.referrer);
        keep_first(&mut self.landing_path, &incoming.landing_path);
        keep_first(&mut self.country, &incoming.country);
        keep_first(&mut self.region, &incoming.region);
        keep_first(&mut self.city, &incoming.city);
        keep_first(&mut self.user_agent, &incoming.user_agent);
    }
}

/// Trim a free-form attribute, dropping blanks and clipping overly long values
pub fn clean_attribute(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.chars().take(MAX_ATTRIBUTE_LEN).collect())
}

/// Subscriber upsert request
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub email: EmailAddress,
    pub attributes: SubscriberAttributes,
}

/// Stored subscriber record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub email: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub attributes: SubscriberAttributes,
}
