use super::IngestionPipeline;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

/// Starts the fixed-interval timer that drives scheduled ticks.
///
/// The first tick fires one `period` after the call. Each tick runs on its own
/// task, so a slow fetch or upload never holds back the next tick or any HTTP
/// request. Aborting the returned handle stops new ticks; ticks already running
/// are left to finish.
///
/// # Arguments
/// * `pipeline`: Shared pipeline whose `run_tick` is invoked on every tick
/// * `period`: Interval between tick starts
pub fn spawn_scheduler(pipeline: Arc<IngestionPipeline>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(?period, "ingestion scheduler started");

        loop {
            ticker.tick().await;
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                pipeline.run_tick().await;
            });
        }
    })
}
