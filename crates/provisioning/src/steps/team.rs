use devhub_azdo::client::{RemoteError, SettingsTarget};
use devhub_azdo::poller::poll_for;
use devhub_core::board::{backlog_visibility_settings, is_default_team, iteration_path_settings};
use devhub_core::policy::StepId;
use devhub_core::types::{RemoteResourceRef, ResourceKind, StepOutcome};
use serde_json::json;

use super::Context;
use crate::error::StepFailure;

const TEAM_DESCRIPTION: &str = "Primary project team";

/// Find the team the remote created with the project and rename it to the
/// requested team name. Falls back to creating the team when none shows up.
pub(crate) async fn discover_team(ctx: &Context<'_>) -> Result<RemoteResourceRef, StepFailure> {
    let project = ctx.project_name();
    let team_name = ctx.team_name();
    let scope = &ctx.project_scope();
    let client = ctx.client;

    let found = poll_for(ctx.sleeper, &ctx.config.team_discovery, "default team", |_| async move {
        let teams = client.list(ResourceKind::Team, scope).await?;
        Ok::<_, RemoteError>(teams.into_iter().find(|t| is_default_team(project, &t.name)))
    })
    .await;

    let payload = json!({ "name": team_name, "description": TEAM_DESCRIPTION });

    let Some(team) = found else {
        tracing::warn!(project, team = team_name, "No default team found, creating team");
        let resolved = ctx
            .create_named(StepId::DiscoverTeam, ResourceKind::Team, scope, team_name, &payload)
            .await?;
        return Ok(resolved.resource);
    };

    tracing::info!(project, from = %team.name, to = team_name, "Renaming default team");
    let target = SettingsTarget::Team {
        project: project.to_string(),
        team_id: team.id.clone(),
    };
    ctx.client.patch_settings(&target, &payload).await?;
    ctx.sleeper.sleep(ctx.config.rename_propagation).await;

    Ok(RemoteResourceRef::new(ResourceKind::Team, team.id, team_name))
}

// ---------------------------------------------------------------------------
// Team settings
// ---------------------------------------------------------------------------

fn team_settings(ctx: &Context<'_>, team: &RemoteResourceRef) -> SettingsTarget {
    SettingsTarget::TeamSettings {
        project: ctx.project_name().to_string(),
        team_id: team.id.clone(),
    }
}

/// Point the team's backlog and default iteration at its root iteration.
pub(crate) async fn configure_iteration_path(
    ctx: &Context<'_>,
    team: &RemoteResourceRef,
) -> Result<StepOutcome, StepFailure> {
    let settings = iteration_path_settings(ctx.project_name(), ctx.team_name());
    ctx.client
        .patch_settings(&team_settings(ctx, team), &settings)
        .await?;
    Ok(StepOutcome::configured(
        StepId::ConfigureIterationPath.name(),
        &team.id,
    ))
}

/// Show the Epic, Feature, and Requirement backlogs.
pub(crate) async fn configure_backlog_levels(
    ctx: &Context<'_>,
    team: &RemoteResourceRef,
) -> Result<StepOutcome, StepFailure> {
    ctx.client
        .patch_settings(&team_settings(ctx, team), &backlog_visibility_settings())
        .await?;
    Ok(StepOutcome::configured(
        StepId::ConfigureBacklogLevels.name(),
        &team.id,
    ))
}
