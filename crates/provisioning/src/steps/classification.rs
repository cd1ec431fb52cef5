//! Iteration and area nodes.

use chrono::NaiveDate;
use devhub_core::policy::StepId;
use devhub_core::schedule::{IterationWindow, ScheduleStrategy};
use devhub_core::types::{RemoteResourceRef, ResourceKind, StepOutcome};
use serde_json::{json, Value};

use super::Context;
use crate::error::StepFailure;

fn midnight_utc(date: NaiveDate) -> String {
    format!("{}T00:00:00Z", date.format("%Y-%m-%d"))
}

/// Node payload for one dated iteration window.
pub(crate) fn window_payload(window: &IterationWindow) -> Value {
    json!({
        "name": window.name,
        "attributes": {
            "startDate": midnight_utc(window.start_date),
            "finishDate": midnight_utc(window.end_date),
        },
    })
}

/// Delete the iterations the remote creates with every project.
///
/// Individual delete failures are logged and skipped.
pub(crate) async fn delete_default_iterations(ctx: &Context<'_>) -> Result<StepOutcome, StepFailure> {
    let scope = ctx.project_scope();
    let children = ctx.client.list(ResourceKind::Iteration, &scope).await?;

    if children.is_empty() {
        tracing::debug!(project = ctx.project_name(), "No default iterations to delete");
        return Ok(StepOutcome::empty());
    }

    for child in &children {
        match ctx.client.delete(ResourceKind::Iteration, &scope, &child.name).await {
            Ok(()) => tracing::debug!(iteration = %child.name, "Deleted default iteration"),
            Err(e) => tracing::warn!(
                iteration = %child.name,
                error = %e,
                "Failed to delete default iteration, skipping",
            ),
        }
    }
    Ok(StepOutcome::empty())
}

/// Create the team's root iteration under the project iteration root.
pub(crate) async fn create_root_iteration(ctx: &Context<'_>) -> Result<RemoteResourceRef, StepFailure> {
    let team_name = ctx.team_name();
    let resolved = ctx
        .create_named(
            StepId::CreateRootIteration,
            ResourceKind::Iteration,
            &ctx.project_scope(),
            team_name,
            &json!({ "name": team_name }),
        )
        .await?;
    Ok(resolved.resource)
}

/// Create every scheduled window below the team's root iteration.
///
/// A failing window is recorded and later windows are still attempted.
pub(crate) async fn create_iteration_windows(ctx: &Context<'_>) -> Result<StepOutcome, StepFailure> {
    let request = ctx.request;
    let strategy = ScheduleStrategy::for_request(request.is_sustentacao, request.sprint_cadence);
    let windows = strategy.windows(request.start_date, request.iteration_count);
    let scope = ctx.project_scope().under(ctx.team_name());
    let step = StepId::CreateIterationWindows;

    tracing::info!(
        project = ctx.project_name(),
        strategy = ?strategy,
        count = windows.len(),
        "Creating iteration windows",
    );

    let mut outcome = StepOutcome::empty();
    for window in &windows {
        let created = ctx
            .create_named(step, ResourceKind::Iteration, &scope, &window.name, &window_payload(window))
            .await;
        outcome = match created {
            Ok(resolved) => outcome.and(StepOutcome {
                iterations: vec![resolved.resource],
                ..StepOutcome::default()
            }),
            Err(e) => {
                tracing::warn!(iteration = %window.name, error = %e, "Failed to create iteration window");
                outcome.and(StepOutcome::failed(step.name(), format!("{}: {e}", window.name)))
            }
        };
    }
    Ok(outcome)
}

/// Create the team area, then every extra area of the request.
pub(crate) async fn create_areas(ctx: &Context<'_>) -> Result<StepOutcome, StepFailure> {
    let step = StepId::CreateAreas;
    let project_scope = ctx.project_scope();

    let mut targets = vec![(project_scope.clone(), ctx.team_name().to_string())];
    targets.extend(ctx.request.areas.iter().map(|area| {
        let scope = match &area.path {
            Some(path) => project_scope.clone().under(path.clone()),
            None => project_scope.clone(),
        };
        (scope, area.name.clone())
    }));

    let mut outcome = StepOutcome::empty();
    for (scope, name) in &targets {
        let created = ctx
            .create_named(step, ResourceKind::Area, scope, name, &json!({ "name": name }))
            .await;
        outcome = match created {
            Ok(resolved) => outcome.and(StepOutcome {
                areas: vec![resolved.resource],
                ..StepOutcome::default()
            }),
            Err(e) => {
                tracing::warn!(area = %name, error = %e, "Failed to create area");
                outcome.and(StepOutcome::failed(step.name(), format!("{name}: {e}")))
            }
        };
    }
    Ok(outcome)
}
