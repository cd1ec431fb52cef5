//! Integration tests for the optional repository phase: creation, scaffold
//! push, branch policies, and contributor restriction.

mod common;

use devhub_azdo::client::{Scope, SettingsTarget};
use devhub_azdo::mock::{Failure, MockRemote};
use devhub_core::repo_policy::GIT_SECURITY_NAMESPACE;
use devhub_core::types::{ProvisioningRequest, ResourceKind};
use serde_json::json;

use common::{harness, repository_spec, request};

fn request_with_repository() -> ProvisioningRequest {
    let mut req = request();
    req.repository = Some(repository_spec());
    req
}

fn steps(result: &devhub_core::types::ProvisioningResult, name: &str) -> usize {
    result
        .configurations
        .iter()
        .filter(|c| c.step_name == name)
        .count()
}

fn acl_target() -> SettingsTarget {
    SettingsTarget::AccessControlEntries {
        namespace_id: GIT_SECURITY_NAMESPACE.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Test: full repository setup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repository_is_created_and_secured() {
    let h = harness(MockRemote::new());

    let result = h.orchestrator.run(&request_with_repository()).await.unwrap();

    assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
    assert_eq!(result.repositories.len(), 1);
    assert_eq!(result.repositories[0].name, "atlas-api");

    assert_eq!(steps(&result, "initialize_repository"), 1);
    assert_eq!(steps(&result, "configure_branch_policies"), 4);
    assert_eq!(steps(&result, "configure_repository_permissions"), 1);

    assert_eq!(h.remote.count("patch_settings", "pushes"), 1);
    assert_eq!(h.remote.count("create", "policy"), 4);
}

/// Contribute (4) and force-push (32) are denied to the project's valid
/// users group on the new repository.
#[tokio::test]
async fn contributor_restriction_targets_valid_users() {
    let h = harness(MockRemote::new());

    let result = h.orchestrator.run(&request_with_repository()).await.unwrap();

    let project_id = &result.project.as_ref().unwrap().id;
    let repository_id = &result.repositories[0].id;
    let acl = h.remote.settings(&acl_target()).unwrap();
    assert_eq!(acl["token"], format!("repoV2/{project_id}/{repository_id}"));
    let entry = &acl["accessControlEntries"][0];
    assert_eq!(entry["descriptor"], "vssgp.valid-users");
    assert_eq!(entry["deny"], 36);
    assert_eq!(entry["allow"], 0);
}

#[tokio::test]
async fn unrestricted_repository_skips_permissions() {
    let h = harness(MockRemote::new());
    let mut req = request_with_repository();
    if let Some(spec) = req.repository.as_mut() {
        spec.restrict_contributors = false;
    }

    let result = h.orchestrator.run(&req).await.unwrap();

    assert_eq!(steps(&result, "configure_repository_permissions"), 0);
    assert_eq!(h.remote.count("get_settings", "identities"), 0);
    assert_eq!(h.remote.count("patch_settings", "accesscontrolentries"), 0);
}

#[tokio::test]
async fn no_repository_requested_means_no_repository_calls() {
    let h = harness(MockRemote::new());

    let result = h.orchestrator.run(&request()).await.unwrap();

    assert!(result.repositories.is_empty());
    assert_eq!(h.remote.count("", "repository"), 0);
    assert_eq!(h.remote.count("create", "policy"), 0);
}

// ---------------------------------------------------------------------------
// Test: existing repository content
// ---------------------------------------------------------------------------

#[tokio::test]
async fn existing_commits_skip_the_scaffold() {
    let remote = MockRemote::new();
    let existing = remote.seed(ResourceKind::Repository, &Scope::project("Atlas"), "atlas-api");
    remote.set_settings(
        &SettingsTarget::RepositoryRefs {
            project: "Atlas".into(),
            repository_id: existing.id.clone(),
        },
        json!({ "count": 1, "value": [{ "name": "refs/heads/main" }] }),
    );
    let h = harness(remote);

    let result = h.orchestrator.run(&request_with_repository()).await.unwrap();

    assert_eq!(result.repositories[0].id, existing.id);
    assert_eq!(h.remote.count("create", "repository"), 0);
    assert_eq!(h.remote.count("patch_settings", "pushes"), 0);
    assert_eq!(steps(&result, "initialize_repository"), 0);
    assert_eq!(steps(&result, "configure_branch_policies"), 4);
}

// ---------------------------------------------------------------------------
// Test: tolerated repository failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_policy_does_not_stop_the_others() {
    let h = harness(MockRemote::new());
    h.remote.fail_times("create", "policy", Failure::Api(400), 1);

    let result = h.orchestrator.run(&request_with_repository()).await.unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].step_name, "configure_branch_policies");
    assert!(result.errors[0].message.starts_with("commit_author_email"));
    assert_eq!(steps(&result, "configure_branch_policies"), 3);
    assert_eq!(steps(&result, "configure_repository_permissions"), 1);
}

#[tokio::test]
async fn missing_valid_users_group_is_recorded() {
    let h = harness(MockRemote::new());
    h.remote.set_settings(
        &SettingsTarget::Identities {
            search: "[Atlas]\\Project Valid Users".into(),
        },
        json!({ "value": [] }),
    );

    let result = h.orchestrator.run(&request_with_repository()).await.unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].step_name, "configure_repository_permissions");
    assert!(result.errors[0].message.contains("Project Valid Users"));
    assert!(h.remote.settings(&acl_target()).is_none());
}

#[tokio::test]
async fn repository_creation_failure_skips_repository_steps() {
    let h = harness(MockRemote::new());
    h.remote.fail("create", "repository", Failure::Api(500));

    let result = h.orchestrator.run(&request_with_repository()).await.unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].step_name, "resolve_repository");
    assert!(result.repositories.is_empty());
    assert_eq!(h.remote.count("create", "policy"), 0);
    assert_eq!(h.remote.count("patch_settings", "pushes"), 0);
    // Earlier phases are unaffected.
    assert_eq!(result.iterations.len(), 3);
}
