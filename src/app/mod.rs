mod context;
mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;


pub use context::AppContext;
pub use orchestrator::LifecycleOrchestrator;
pub use types::{
    LifecyclePhase, LifecycleReport, LifecycleState, ReportEntry, ServiceOutcome, ServiceState,
    ShutdownReason, ShutdownReport, StartupReport,
};
