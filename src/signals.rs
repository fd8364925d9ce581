//! Concurrent gathering of external signal states.
//!
//! Calendars are queried one per request so a failure names exactly the
//! calendar at fault and never hides the others. Alarms are batched per
//! `(region, assumed role)` group so each group costs one session and one
//! describe call.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::effects::{
    AlarmDescription, AlarmStateValue, CalendarEffect, CalendarInterpreter, CalendarResponse,
    MonitoringEffect, MonitoringInterpreter, MonitoringResponse,
};
use crate::error::RemoteError;
use crate::types::{AlarmGroup, AlarmKey, AlarmQuery, AlarmState, CalendarState};

/// Queries every distinct calendar concurrently.
///
/// A calendar whose query fails is recorded as `CLOSED`: an unknown freeze
/// window blocks promotion until a later cycle can see it again.
pub async fn gather_calendar_states<C>(
    calendars: &C,
    names: &[String],
) -> HashMap<String, CalendarState>
where
    C: CalendarInterpreter,
{
    let mut seen = HashSet::new();
    let distinct: Vec<&String> = names.iter().filter(|n| seen.insert(n.as_str())).collect();

    let results = join_all(distinct.into_iter().map(|name| async move {
        let result = calendars
            .interpret(CalendarEffect::GetCalendarState {
                calendar: name.clone(),
            })
            .await;
        (name, result)
    }))
    .await;

    let states: HashMap<String, CalendarState> = results
        .into_iter()
        .map(|(name, result)| {
            let state = match result {
                Ok(CalendarResponse::State(state)) => state,
                Err(e) => {
                    warn!(calendar = %name, error = %e, "Calendar query failed; treating as CLOSED");
                    CalendarState::Closed
                }
            };
            (name.clone(), state)
        })
        .collect();

    info!(?states, "Calendar states");
    states
}

/// Classifies one alarm against the instant its bake step started.
///
/// An alarm that is `OK` now but changed state after `cutoff` is still
/// `IN_ALARM`: it flapped during the bake window. Only the most recent state
/// change is visible, so several flaps before that change go unnoticed.
pub fn classify_alarm(description: Option<&AlarmDescription>, cutoff: DateTime<Utc>) -> AlarmState {
    let Some(alarm) = description else {
        return AlarmState::Missing;
    };

    if alarm.state_value != AlarmStateValue::Ok {
        return AlarmState::InAlarm;
    }

    match alarm.state_updated {
        Some(updated) if updated > cutoff => AlarmState::InAlarm,
        _ => AlarmState::Ok,
    }
}

/// Describes every queried alarm, one batch per `(region, role)` group,
/// groups concurrently.
///
/// If a group's describe call fails, every alarm in it is `MISSING`; the
/// per-alarm missing policy then decides whether that fails the step.
pub async fn gather_alarm_states<M>(
    monitoring: &M,
    queries: &[AlarmQuery],
) -> HashMap<AlarmKey, AlarmState>
where
    M: MonitoringInterpreter,
{
    let mut groups: BTreeMap<&AlarmGroup, Vec<&AlarmQuery>> = BTreeMap::new();
    for query in queries {
        groups.entry(&query.group).or_default().push(query);
    }

    let results = join_all(groups.into_iter().map(|(group, queries)| async move {
        let described = describe_group(monitoring, group, &queries).await;
        (group, queries, described)
    }))
    .await;

    let mut states = HashMap::new();
    for (group, queries, described) in results {
        let lookup: HashMap<&str, &AlarmDescription> = match &described {
            Ok(alarms) => alarms.iter().map(|a| (a.alarm_name.as_str(), a)).collect(),
            Err(e) => {
                warn!(%group, error = %e, "Describe alarms failed; treating group as MISSING");
                HashMap::new()
            }
        };

        for query in queries {
            let state = classify_alarm(lookup.get(query.alarm_name.as_str()).copied(), query.cutoff);
            debug!(
                alarm = %query.alarm_name,
                %group,
                action_execution_id = %query.action_execution_id,
                ?state,
                "Alarm state"
            );
            states.insert(query.key(), state);
        }
    }

    states
}

async fn describe_group<M>(
    monitoring: &M,
    group: &AlarmGroup,
    queries: &[&AlarmQuery],
) -> Result<Vec<AlarmDescription>, RemoteError>
where
    M: MonitoringInterpreter,
{
    let mut seen = HashSet::new();
    let alarm_names: Vec<String> = queries
        .iter()
        .filter(|q| seen.insert(q.alarm_name.as_str()))
        .map(|q| q.alarm_name.clone())
        .collect();

    let response = monitoring
        .interpret(MonitoringEffect::DescribeAlarms {
            group: group.clone(),
            alarm_names,
        })
        .await?;

    match response {
        MonitoringResponse::Alarms(alarms) => Ok(alarms),
        other => Err(RemoteError::permanent(format!(
            "unexpected response to describe_alarms: {:?}",
            other
        ))),
    }
}
