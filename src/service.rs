mod campaigns;
mod notify;
mod subscriptions;

pub use campaigns::*;
pub use notify::*;
pub use subscriptions::*;

use crate::domain::NewEvent;
use crate::repo::Store;

/// Append an audit event without letting a failure reach the caller
pub async fn record_event_best_effort(store: &dyn Store, event: NewEvent) {
    if let Err(e) = store.record_event(&event).await {
        tracing::warn!(
            error.cause_chain = ?e,
            kind = event.kind.as_str(),
            "Failed to record audit event"
        );
    }
}
