//! Stateless aggregation over usage records.
//!
//! Every query is a pure function of the record set and an explicit `now`;
//! nothing here caches or mutates its input.

mod aggregate;
mod record;
mod sessions;
mod summary;
mod timeline;
mod window;

pub use aggregate::{ModelCost, TagCost, cost_by_model, cost_by_tag};
pub use record::UsageRecord;
pub use sessions::{DEFAULT_RECENT_SESSIONS, SessionSummary, recent_sessions};
pub use summary::{Summary, build_summary};
pub use timeline::{DEFAULT_TOP_SESSIONS, DEFAULT_WINDOW_DAYS, SessionTimeline, build_timelines};

/// Rounds a monetary amount to 4 decimal places for presentation.
pub fn round_cost(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
