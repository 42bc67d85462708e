use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use regex::Regex;

use serde::{Deserialize, Serialize};

use unicode_segmentation::UnicodeSegmentation;

use super::ValidationError;

/// Id of the campaign every subscriber is granted a coupon for
pub const WELCOME_CAMPAIGN_ID: &str = "WELCOME";

const MAX_NAME_LEN: usize = 80;
const MAX_STACK_GROUP_LEN: usize = 32;

lazy_static::lazy_static! {
    static ref CAMPAIGN_ID_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_-]{2,32}$").unwrap();
    static ref PREFIX_REGEX: Regex = Regex::new(r"^[A-Z0-9]{2,12}$").unwrap();
}

/// A campaign identifier: 2-32 alphanumerics, underscores or hyphens, stored uppercase
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CampaignId(String);

impl CampaignId {
    pub fn is_welcome(&self) -> bool {
        self.0 == WELCOME_CAMPAIGN_ID
    }
}

impl FromStr for CampaignId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if !CAMPAIGN_ID_REGEX.is_match(value) {
            return Err(ValidationError("id"));
        }
        Ok(Self(value.to_uppercase()))
    }
}

impl AsRef<str> for CampaignId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The uppercase prefix placed in front of coupon codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponPrefix(String);

impl FromStr for CouponPrefix {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_uppercase();
        if !PREFIX_REGEX.is_match(&value) {
            return Err(ValidationError("prefix"));
        }
        Ok(Self(value))
    }
}

impl AsRef<str> for CouponPrefix {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percent,
    Amount,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percent => "percent",
            Self::Amount => "amount",
        }
    }
}

impl FromStr for DiscountType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "percent" => Ok(Self::Percent),
            "amount" => Ok(Self::Amount),
            _ => Err(ValidationError("discount_type")),
        }
    }
}

/// Stored campaign record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub prefix: String,
    pub discount_type: DiscountType,
    pub discount_value: i32,
    pub stackable: bool,
    pub stack_group: Option<String>,
    pub active: bool,
    /// Inclusive eligibility window, open-ended when `None`
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Whether a subscriber may be issued a coupon for this campaign at `now`
    pub fn is_eligible_at(&self, now: DateTime<Utc>) -> bool {
        self.active
            && self.starts_at.map_or(true, |starts_at| starts_at <= now)
            && self.ends_at.map_or(true, |ends_at| ends_at >= now)
    }

    /// Human readable discount, e.g. `15% off`
    pub fn discount_label(&self) -> String {
        match self.discount_type {
            DiscountType::Percent => format!("{}% off", self.discount_value),
            DiscountType::Amount => format!("{} off", self.discount_value),
        }
    }
}

/// Admin-supplied campaign definition, deserialized straight from the request body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignForm {
    pub id: Option<String>,
    pub name: Option<String>,
    pub prefix: Option<String>,
    pub discount_type: Option<String>,
    pub discount_value: Option<f64>,
    pub stackable: Option<bool>,
    pub stack_group: Option<String>,
    pub active: Option<bool>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
}

/// Validated campaign definition, ready to be upserted
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignDraft {
    pub id: CampaignId,
    pub name: String,
    pub prefix: CouponPrefix,
    pub discount_type: DiscountType,
    pub discount_value: i32,
    pub stackable: bool,
    pub stack_group: Option<String>,
    pub active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl TryFrom<CampaignForm> for CampaignDraft {
    type Error = ValidationError;

    fn try_from(form: CampaignForm) -> Result<Self, Self::Error> {
        let id: CampaignId = form.id.as_deref().unwrap_or_default().parse()?;

        let name = form.name.as_deref().unwrap_or_default().trim().to_string();
        if name.is_empty() || name.graphemes(true).count() > MAX_NAME_LEN {
            return Err(ValidationError("name"));
        }

        let prefix: CouponPrefix = form.prefix.as_deref().unwrap_or_default().parse()?;

        let discount_type: DiscountType =
            form.discount_type.as_deref().unwrap_or_default().parse()?;

        let discount_value = match form.discount_value {
            Some(value) if value.fract() == 0.0 && value >= 1.0 && value <= i32::MAX as f64 => {
                value as i32
            }
            _ => return Err(ValidationError("discount_value")),
        };

        let stack_group = match form.stack_group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(group) if group.graphemes(true).count() > MAX_STACK_GROUP_LEN => {
                return Err(ValidationError("stack_group"))
            }
            Some(group) => Some(group.to_string()),
        };

        let starts_at = parse_timestamp(form.starts_at.as_deref(), "starts_at")?;
        let ends_at = parse_timestamp(form.ends_at.as_deref(), "ends_at")?;
        if let (Some(starts_at), Some(ends_at)) = (starts_at, ends_at) {
            if ends_at < starts_at {
                return Err(ValidationError("ends_at"));
            }
        }

        Ok(Self {
            id,
            name,
            prefix,
            discount_type,
            discount_value,
            stackable: form.stackable.unwrap_or(false),
            stack_group,
            active: form.active.unwrap_or(true),
            starts_at,
            ends_at,
        })
    }
}

fn parse_timestamp(
    value: Option<&str>,
    field: &'static str,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(|_| ValidationError(field)),
    }
}
