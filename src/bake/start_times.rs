//! Start-time resolution for in-progress bake actions.
//!
//! The snapshot does not say when an action started, so the action executions
//! of each owning pipeline execution are listed page by page until every
//! pending id has been matched.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use thiserror::Error;
use tracing::debug;

use crate::effects::{PipelineEffect, PipelineInterpreter, PipelineResponse};
use crate::error::RemoteError;
use crate::types::{ActionExecutionId, ApprovalProps, PipelineExecutionId};

/// Upper bound on pages fetched per pipeline execution.
const MAX_PAGES: usize = 100;

#[derive(Debug, Error)]
pub enum StartTimeError {
    #[error("listing action executions for {pipeline_execution_id} failed: {source}")]
    List {
        pipeline_execution_id: PipelineExecutionId,
        #[source]
        source: RemoteError,
    },

    /// The pipeline reported in-progress actions the execution listing does not
    /// contain; the remote state is inconsistent, so no bake decision is safe.
    #[error("unable to find start times for {action_execution_ids:?} in {pipeline_execution_id}")]
    NotFound {
        pipeline_execution_id: PipelineExecutionId,
        action_execution_ids: Vec<ActionExecutionId>,
    },

    #[error("unexpected response to list_action_executions: {0}")]
    UnexpectedResponse(String),
}

/// Resolves the start time of every candidate, keyed by action execution id.
///
/// Candidates are grouped by pipeline execution; groups are resolved
/// concurrently. Any unresolved id fails the whole resolution.
pub async fn resolve_start_times<P>(
    pipeline: &P,
    candidates: &[ApprovalProps],
) -> Result<HashMap<ActionExecutionId, DateTime<Utc>>, StartTimeError>
where
    P: PipelineInterpreter,
{
    let mut groups: BTreeMap<&PipelineExecutionId, Vec<&ApprovalProps>> = BTreeMap::new();
    for props in candidates {
        groups
            .entry(&props.pipeline_execution_id)
            .or_default()
            .push(props);
    }

    let results = join_all(
        groups
            .into_iter()
            .map(|(execution_id, props)| resolve_group(pipeline, execution_id, props)),
    )
    .await;

    let mut start_times = HashMap::new();
    for result in results {
        start_times.extend(result?);
    }
    Ok(start_times)
}

async fn resolve_group<P>(
    pipeline: &P,
    pipeline_execution_id: &PipelineExecutionId,
    props: Vec<&ApprovalProps>,
) -> Result<HashMap<ActionExecutionId, DateTime<Utc>>, StartTimeError>
where
    P: PipelineInterpreter,
{
    let Some(first) = props.first() else {
        return Ok(HashMap::new());
    };
    let pipeline_name = first.pipeline_name.clone();

    let mut remaining: BTreeSet<ActionExecutionId> =
        props.iter().map(|p| p.action_execution_id.clone()).collect();
    let mut start_times = HashMap::new();
    let mut next_token = None;

    for page in 0..MAX_PAGES {
        let response = pipeline
            .interpret(PipelineEffect::ListActionExecutions {
                pipeline_name: pipeline_name.clone(),
                pipeline_execution_id: pipeline_execution_id.clone(),
                next_token: next_token.take(),
            })
            .await
            .map_err(|source| StartTimeError::List {
                pipeline_execution_id: pipeline_execution_id.clone(),
                source,
            })?;

        let (details, token) = match response {
            PipelineResponse::ActionExecutions {
                details,
                next_token,
            } => (details, next_token),
            other => return Err(StartTimeError::UnexpectedResponse(format!("{:?}", other))),
        };

        for detail in details {
            if remaining.remove(&detail.action_execution_id) {
                start_times.insert(detail.action_execution_id, detail.start_time);
            }
        }

        debug!(
            %pipeline_execution_id,
            page,
            unresolved = remaining.len(),
            "Listed action executions"
        );

        next_token = token;
        if remaining.is_empty() || next_token.is_none() {
            break;
        }
    }

    if !remaining.is_empty() {
        return Err(StartTimeError::NotFound {
            pipeline_execution_id: pipeline_execution_id.clone(),
            action_execution_ids: remaining.into_iter().collect(),
        });
    }

    Ok(start_times)
}
