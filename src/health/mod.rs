mod aggregator;
mod types;


pub use aggregator::{overall_status, HealthAggregator};
pub use types::{HealthReport, OverallStatus, ProbeStatus, ServiceHealth};
