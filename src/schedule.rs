//! Periodic cycle runner.
//!
//! Fires a cycle immediately and then on every interval tick, each under a
//! hard timeout and with a fresh request id. Cycle failures are logged and
//! never stop the schedule: the next tick re-derives everything.

use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{DeploymentSafetySettings, ScheduleConfig};
use crate::effects::{CalendarInterpreter, MonitoringInterpreter, PipelineInterpreter};
use crate::engine::{CycleError, Enforcer};
use crate::types::RequestId;

/// Runs cycles until `cancel` fires. Returns the number of ticks that ran.
///
/// A cycle in flight when `cancel` fires is allowed to finish (bounded by
/// the cycle timeout); a tick is never started after cancellation.
pub async fn run_scheduled<P, C, M>(
    enforcer: &Enforcer<P, C, M>,
    settings: &DeploymentSafetySettings,
    config: &ScheduleConfig,
    cancel: CancellationToken,
) -> u64
where
    P: PipelineInterpreter,
    C: CalendarInterpreter,
    M: MonitoringInterpreter,
{
    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0;

    info!(
        pipeline = %settings.pipeline_name,
        interval_secs = config.interval.as_secs(),
        timeout_secs = config.cycle_timeout.as_secs(),
        "Starting scheduled enforcement"
    );

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!(ticks, "Shutdown signal received, stopping schedule");
                break;
            }

            _ = ticker.tick() => {
                let request_id = RequestId::generate();
                match timeout(config.cycle_timeout, enforcer.run_cycle(settings, &request_id)).await {
                    Ok(Ok(report)) => {
                        info!(%request_id, outcomes = report.outcomes.len(), "Cycle succeeded");
                    }
                    Ok(Err(CycleError::ActionsFailed { failed, .. })) => {
                        error!(%request_id, failed = failed.len(), "Cycle finished with failed actions");
                    }
                    Ok(Err(e)) => {
                        error!(%request_id, error = %e, "Cycle aborted");
                    }
                    Err(_) => {
                        warn!(%request_id, "Cycle timed out");
                    }
                }
                ticks += 1;
            }
        }
    }

    ticks
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::time::Duration;

    use super::*;
    use crate::effects::{PipelineEffect, PipelineResponse};
    use crate::error::RemoteError;
    use crate::test_utils::{MockCalendars, MockMonitoring, MockPipeline, SnapshotBuilder};
    use crate::types::TransitionState;

    fn config() -> ScheduleConfig {
        ScheduleConfig {
            interval: Duration::from_secs(600),
            cycle_timeout: Duration::from_secs(60),
        }
    }

    fn cancel_after(token: &CancellationToken, after: Duration) {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            token.cancel();
        });
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_immediately_then_every_interval() {
        let snapshot = SnapshotBuilder::new("P")
            .stage("Prod", TransitionState::enabled())
            .build();
        let enforcer = Enforcer::new(
            MockPipeline::new().with_snapshot(snapshot),
            MockCalendars::new(),
            MockMonitoring::new(),
        );
        let settings = DeploymentSafetySettings::new("P");
        let cancel = CancellationToken::new();
        cancel_after(&cancel, Duration::from_secs(25 * 60));

        let ticks = run_scheduled(&enforcer, &settings, &config(), cancel).await;

        assert_eq!(ticks, 3);
        assert_eq!(enforcer.pipeline().effects().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_runs_nothing() {
        let enforcer = Enforcer::new(MockPipeline::new(), MockCalendars::new(), MockMonitoring::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let ticks = run_scheduled(&enforcer, &DeploymentSafetySettings::new("P"), &config(), cancel).await;

        assert_eq!(ticks, 0);
        assert!(enforcer.pipeline().effects().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failing_cycles_do_not_stop_the_schedule() {
        // No snapshot registered: every cycle aborts.
        let enforcer = Enforcer::new(MockPipeline::new(), MockCalendars::new(), MockMonitoring::new());
        let cancel = CancellationToken::new();
        cancel_after(&cancel, Duration::from_secs(15 * 60));

        let ticks = run_scheduled(&enforcer, &DeploymentSafetySettings::new("P"), &config(), cancel).await;

        assert_eq!(ticks, 2);
    }

    /// Never answers within the cycle timeout.
    struct StalledPipeline;

    impl PipelineInterpreter for StalledPipeline {
        fn interpret(
            &self,
            _effect: PipelineEffect,
        ) -> impl Future<Output = Result<PipelineResponse, RemoteError>> + Send {
            async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(RemoteError::transient("stalled"))
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_cycle_is_cut_off_by_timeout() {
        let enforcer = Enforcer::new(StalledPipeline, MockCalendars::new(), MockMonitoring::new());
        let cancel = CancellationToken::new();
        cancel_after(&cancel, Duration::from_secs(5 * 60));

        let started = tokio::time::Instant::now();
        let ticks = run_scheduled(&enforcer, &DeploymentSafetySettings::new("P"), &config(), cancel).await;

        assert_eq!(ticks, 1);
        assert!(started.elapsed() < Duration::from_secs(3600));
    }
}
