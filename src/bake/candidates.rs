//! Discovery of configured bake actions in the pipeline snapshot.

use std::collections::BTreeMap;

use tracing::warn;

use crate::config::BakeStepSettings;
use crate::types::{ApprovalProps, BakeAction, PipelineSnapshot};

/// Bake actions found in a snapshot, split by whether they still need a decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BakeCandidates {
    /// In-progress approvals with everything needed to resolve them.
    pub in_progress: Vec<ApprovalProps>,
    /// Actions already decided without consulting start times or alarms.
    pub settled: Vec<BakeAction>,
}

/// Scans every stage for actions configured as bake steps.
///
/// - no latest execution: not started, nothing emitted
/// - latest execution not `InProgress`: `DONE`
/// - `InProgress`: a candidate, if the snapshot carries its pipeline
///   execution id, action execution id and token; otherwise `CONTINUE`
pub fn find_bake_candidates(
    snapshot: &PipelineSnapshot,
    bake_steps: &BTreeMap<String, BakeStepSettings>,
) -> BakeCandidates {
    let mut candidates = BakeCandidates::default();

    for stage in &snapshot.stages {
        for action in &stage.actions {
            if !bake_steps.contains_key(&action.action_name) {
                continue;
            }

            let Some(execution) = &action.latest_execution else {
                continue;
            };

            if !execution.status.is_in_progress() {
                candidates.settled.push(BakeAction::done(&action.action_name));
                continue;
            }

            let pipeline_execution_id = stage
                .latest_execution
                .as_ref()
                .map(|e| e.pipeline_execution_id.clone());

            match (
                pipeline_execution_id,
                execution.action_execution_id.clone(),
                execution.token.clone(),
            ) {
                (Some(pipeline_execution_id), Some(action_execution_id), Some(token)) => {
                    candidates.in_progress.push(ApprovalProps {
                        pipeline_name: snapshot.pipeline_name.clone(),
                        stage_name: stage.stage_name.clone(),
                        action_name: action.action_name.clone(),
                        pipeline_execution_id,
                        action_execution_id,
                        token,
                    });
                }
                _ => {
                    warn!(
                        stage = %stage.stage_name,
                        action = %action.action_name,
                        "In-progress bake action lacks execution ids or token; will retry next cycle"
                    );
                    candidates
                        .settled
                        .push(BakeAction::continue_baking(&action.action_name));
                }
            }
        }
    }

    candidates
}
