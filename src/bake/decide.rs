//! Bake decisions for in-progress approvals.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config::BakeStepSettings;
use crate::types::{
    ActionExecutionId, AlarmKey, AlarmQuery, AlarmState, ApprovalProps, BakeAction,
};

/// Builds one alarm query per guarding alarm of every guarded candidate.
///
/// The cutoff is the candidate's start time, so any alarm transition during
/// the bake window counts against it.
pub fn alarm_queries(
    candidates: &[ApprovalProps],
    bake_steps: &BTreeMap<String, BakeStepSettings>,
    start_times: &HashMap<ActionExecutionId, DateTime<Utc>>,
) -> Vec<AlarmQuery> {
    candidates
        .iter()
        .filter_map(|props| {
            let step = bake_steps.get(&props.action_name)?;
            let start = start_times.get(&props.action_execution_id)?;
            Some(step.alarm_settings.iter().map(move |alarm| AlarmQuery {
                action_execution_id: props.action_execution_id.clone(),
                alarm_name: alarm.alarm_name.clone(),
                group: alarm.group(),
                treat_missing: alarm.treat_missing_alarm,
                cutoff: *start,
            }))
        })
        .flatten()
        .collect()
}

/// Decides the fate of every in-progress candidate.
///
/// Guarded steps are checked against their alarms on every cycle, before and
/// after the bake time has elapsed: one failing alarm rejects the step. A step
/// that survives is approved once `now - start >= bake time`, and continues
/// baking otherwise. An alarm absent from `alarms` counts as `MISSING`.
pub fn decide_bake_actions(
    candidates: &[ApprovalProps],
    bake_steps: &BTreeMap<String, BakeStepSettings>,
    start_times: &HashMap<ActionExecutionId, DateTime<Utc>>,
    alarms: &HashMap<AlarmKey, AlarmState>,
    now: DateTime<Utc>,
) -> Vec<BakeAction> {
    candidates
        .iter()
        .map(|props| {
            let (Some(step), Some(start)) = (
                bake_steps.get(&props.action_name),
                start_times.get(&props.action_execution_id),
            ) else {
                warn!(action = %props.action_name, "No bake settings or start time; continuing");
                return BakeAction::continue_baking(&props.action_name);
            };

            let failed: Vec<String> = step
                .alarm_settings
                .iter()
                .filter(|alarm| {
                    let key = AlarmKey {
                        action_execution_id: props.action_execution_id.clone(),
                        group: alarm.group(),
                        alarm_name: alarm.alarm_name.clone(),
                    };
                    alarms
                        .get(&key)
                        .copied()
                        .unwrap_or(AlarmState::Missing)
                        .is_failure(alarm.treat_missing_alarm)
                })
                .map(|alarm| alarm.alarm_name.clone())
                .collect();

            if !failed.is_empty() {
                return BakeAction::reject(props.clone(), failed);
            }

            let elapsed = now - *start;
            debug!(
                action = %props.action_name,
                elapsed_secs = elapsed.num_seconds(),
                bake_secs = step.bake_time().num_seconds(),
                "Bake progress"
            );

            if elapsed >= step.bake_time() {
                BakeAction::approve(props.clone())
            } else {
                BakeAction::continue_baking(&props.action_name)
            }
        })
        .collect()
}
