pub mod runner;
pub mod scheduler;
#[cfg(test)]
pub mod testing;

pub use runner::{IngestionPipeline, PipelineSettings, TickMetricsSnapshot};
pub use scheduler::spawn_scheduler;
