//! Scrape endpoint and per-request counters

mod handlers;
mod middleware;

pub use handlers::{prometheus_metrics, MetricsState};
pub use middleware::http_metrics_middleware;
