//! Click enrichment contract.

use crate::domain::click_event::ClickEvent;
use crate::domain::entities::ClickEnrichment;

/// Derives geo and user-agent attributes for a click.
///
/// Enrichment is best-effort and infallible from the caller's point of view:
/// any lookup that fails leaves its fields as `None`.
#[cfg_attr(test, mockall::automock)]
pub trait ClickEnricher: Send + Sync {
    fn enrich(&self, event: &ClickEvent) -> ClickEnrichment;
}
