mod campaign;
mod coupon;
mod email_address;
mod event;
mod subscriber;

pub use campaign::*;
pub use coupon::*;
pub use email_address::*;
pub use event::*;
pub use subscriber::*;

/// A domain value failed validation; carries the name of the offending field
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid value for field `{0}`")]
pub struct ValidationError(pub &'static str);
