//! Repository creation, scaffold, branch policies, and permissions.

use devhub_azdo::client::SettingsTarget;
use devhub_core::policy::StepId;
use devhub_core::repo_policy::{
    branch_policies, find_valid_users_descriptor, restrict_contributors_entry, scaffold_push,
    GIT_SECURITY_NAMESPACE, PROJECT_VALID_USERS,
};
use devhub_core::types::{RemoteResourceRef, RepositorySpec, ResourceKind, StepOutcome};
use serde_json::json;

use super::{items, Context};
use crate::error::StepFailure;

pub(crate) async fn resolve_repository(
    ctx: &Context<'_>,
    project: &RemoteResourceRef,
    spec: &RepositorySpec,
) -> Result<RemoteResourceRef, StepFailure> {
    let payload = json!({ "name": spec.name, "project": { "id": project.id } });
    let resolved = ctx
        .create_named(
            StepId::ResolveRepository,
            ResourceKind::Repository,
            &ctx.project_scope(),
            &spec.name,
            &payload,
        )
        .await?;
    Ok(resolved.resource)
}

/// Push the scaffold commit when `main` does not exist yet.
pub(crate) async fn initialize_repository(
    ctx: &Context<'_>,
    repository: &RemoteResourceRef,
) -> Result<StepOutcome, StepFailure> {
    let refs = SettingsTarget::RepositoryRefs {
        project: ctx.project_name().to_string(),
        repository_id: repository.id.clone(),
    };
    if !items(&ctx.client.get_settings(&refs).await?).is_empty() {
        tracing::info!(repository = %repository.name, "Repository already has commits, skipping scaffold");
        return Ok(StepOutcome::empty());
    }

    let push = SettingsTarget::RepositoryPush {
        project: ctx.project_name().to_string(),
        repository_id: repository.id.clone(),
    };
    ctx.client
        .patch_settings(&push, &scaffold_push(&repository.name))
        .await?;
    tracing::info!(repository = %repository.name, "Pushed initial repository structure");
    Ok(StepOutcome::configured(
        StepId::InitializeRepository.name(),
        &repository.id,
    ))
}

/// Create each main-branch policy. A failing policy is recorded and the
/// rest are still attempted.
pub(crate) async fn configure_branch_policies(
    ctx: &Context<'_>,
    repository: &RemoteResourceRef,
    spec: &RepositorySpec,
) -> Result<StepOutcome, StepFailure> {
    let step = StepId::ConfigureBranchPolicies;
    let scope = ctx.project_scope();

    let mut outcome = StepOutcome::empty();
    for policy in branch_policies(spec, &repository.id) {
        let created = ctx
            .create_named(step, ResourceKind::Policy, &scope, policy.name, &policy.payload)
            .await;
        outcome = match created {
            Ok(_) => outcome.and(StepOutcome::configured(
                step.name(),
                format!("{}:{}", repository.name, policy.name),
            )),
            Err(e) => {
                tracing::warn!(policy = policy.name, error = %e, "Failed to create branch policy");
                outcome.and(StepOutcome::failed(step.name(), format!("{}: {e}", policy.name)))
            }
        };
    }
    Ok(outcome)
}

/// Deny contribute and force-push to the project's valid users.
pub(crate) async fn configure_permissions(
    ctx: &Context<'_>,
    project: &RemoteResourceRef,
    repository: &RemoteResourceRef,
) -> Result<StepOutcome, StepFailure> {
    let search = SettingsTarget::Identities {
        search: format!("[{}]\\{PROJECT_VALID_USERS}", ctx.project_name()),
    };
    let identities = ctx.client.get_settings(&search).await?;
    let descriptor = find_valid_users_descriptor(&identities, ctx.project_name()).ok_or_else(|| {
        StepFailure::Precondition(format!(
            "{PROJECT_VALID_USERS} group not found for project {}",
            ctx.project_name()
        ))
    })?;

    let acl = SettingsTarget::AccessControlEntries {
        namespace_id: GIT_SECURITY_NAMESPACE.to_string(),
    };
    let entry = restrict_contributors_entry(&project.id, &repository.id, &descriptor);
    ctx.client.patch_settings(&acl, &entry).await?;

    tracing::info!(repository = %repository.name, "Restricted contributor permissions");
    Ok(StepOutcome::configured(
        StepId::ConfigureRepositoryPermissions.name(),
        &repository.id,
    ))
}
