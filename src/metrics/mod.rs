mod collector;
mod counters;
mod reader;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use collector::MetricsCollector;
pub use counters::RequestCounters;
pub use reader::{ReadResult, ResourceReader, SysinfoReader};
pub use types::{
    ApplicationMetrics, DiskUsage, LoadAverage, MemoryUsage, MetricsSnapshot, ProcessMetrics,
    ProcessUsage, Reading, SystemMetrics,
};
