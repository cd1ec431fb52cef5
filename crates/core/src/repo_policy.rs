//! Repository scaffold, branch policies, and access-control entries.

use serde_json::{json, Value};

use crate::types::RepositorySpec;

/// Branch every policy and the scaffold commit target.
pub const MAIN_BRANCH_REF: &str = "refs/heads/main";

/// Object id used as `oldObjectId` when creating a branch.
const EMPTY_OBJECT_ID: &str = "0000000000000000000000000000000000000000";

/// Security namespace of Git repositories.
pub const GIT_SECURITY_NAMESPACE: &str = "2e9eb7ed-3c0a-47d4-87c1-0ffdd275fd87";

/// GenericContribute permission bit.
pub const PERMISSION_GENERIC_CONTRIBUTE: u32 = 4;

/// ForcePush permission bit.
pub const PERMISSION_FORCE_PUSH: u32 = 32;

/// Identity whose contribute rights are restricted on new repositories.
pub const PROJECT_VALID_USERS: &str = "Project Valid Users";

const POLICY_AUTHOR_EMAIL: &str = "bca1b469-a735-4095-a829-8ea9beb98f5e";
const POLICY_MINIMUM_REVIEWERS: &str = "fa4e907d-c16b-4a4c-9dfa-4906e5d171dd";
const POLICY_WORK_ITEM_LINKING: &str = "40e92b44-2fe1-4dd6-b3d8-74a9c21d0c6e";
const POLICY_COMMENT_RESOLUTION: &str = "c6a1889d-b943-4856-b76f-9e46bb6b0df2";

/// A named policy configuration ready to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchPolicy {
    pub name: &'static str,
    pub payload: Value,
}

fn main_branch_scope(repository_id: &str) -> Value {
    json!([{
        "repositoryId": repository_id,
        "refName": MAIN_BRANCH_REF,
        "matchKind": "Exact",
    }])
}

fn blocking_policy(type_id: &str, mut settings: Value, repository_id: &str) -> Value {
    if let Some(obj) = settings.as_object_mut() {
        obj.insert("scope".into(), main_branch_scope(repository_id));
    }
    json!({
        "isEnabled": true,
        "isBlocking": true,
        "type": { "id": type_id },
        "settings": settings,
    })
}

/// Main-branch policies for a repository, in submission order.
///
/// The author email policy is only included when patterns are configured.
pub fn branch_policies(spec: &RepositorySpec, repository_id: &str) -> Vec<BranchPolicy> {
    let mut policies = Vec::with_capacity(4);

    if !spec.author_email_patterns.is_empty() {
        policies.push(BranchPolicy {
            name: "commit_author_email",
            payload: blocking_policy(
                POLICY_AUTHOR_EMAIL,
                json!({ "authorEmailPatterns": spec.author_email_patterns }),
                repository_id,
            ),
        });
    }

    policies.push(BranchPolicy {
        name: "minimum_reviewers",
        payload: blocking_policy(
            POLICY_MINIMUM_REVIEWERS,
            json!({
                "minimumApproverCount": spec.minimum_reviewers,
                "creatorVoteCounts": false,
                "allowDownvotes": false,
                "resetOnSourcePush": true,
            }),
            repository_id,
        ),
    });
    policies.push(BranchPolicy {
        name: "work_item_linking",
        payload: blocking_policy(POLICY_WORK_ITEM_LINKING, json!({}), repository_id),
    });
    policies.push(BranchPolicy {
        name: "comment_resolution",
        payload: blocking_policy(POLICY_COMMENT_RESOLUTION, json!({}), repository_id),
    });

    policies
}

// ---------------------------------------------------------------------------
// Scaffold
// ---------------------------------------------------------------------------

/// Files committed to an empty repository, as `(path, content)`.
pub fn scaffold_files(repository_name: &str) -> Vec<(&'static str, String)> {
    let readme = format!(
        "# {repository_name}\n\n\
         ## Structure\n\
         - `.azuredevops/` - pull request templates and ownership rules\n\
         - `docs/` - project documentation\n\
         - `src/` - source code\n"
    );
    let mkdocs = format!(
        "site_name: {repository_name}\n\
         site_description: Documentation for {repository_name}\n\
         theme:\n  name: material\n\
         nav:\n  - Home: index.md\n\
         markdown_extensions:\n  - admonition\n  - toc:\n      permalink: true\n"
    );
    let docs_index = format!(
        "# {repository_name}\n\nThis repository was provisioned automatically.\n"
    );
    let codeowners = "# Default\n* @devops-team\n\n\
                      # Security\n/docs/security/* @security-team\n\n\
                      # Pipelines\n/.azuredevops/* @platform-team\n"
        .to_string();

    vec![
        ("/README.md", readme),
        ("/mkdocs.yml", mkdocs),
        ("/docs/index.md", docs_index),
        ("/.azuredevops/CODEOWNERS", codeowners),
    ]
}

/// Push document creating `main` with one commit holding the scaffold.
pub fn scaffold_push(repository_name: &str) -> Value {
    let changes: Vec<Value> = scaffold_files(repository_name)
        .into_iter()
        .map(|(path, content)| {
            json!({
                "changeType": "add",
                "item": { "path": path },
                "newContent": { "content": content, "contentType": "rawtext" },
            })
        })
        .collect();

    json!({
        "refUpdates": [{ "name": MAIN_BRANCH_REF, "oldObjectId": EMPTY_OBJECT_ID }],
        "commits": [{
            "comment": "Initial commit - repository structure",
            "changes": changes,
        }],
    })
}

// ---------------------------------------------------------------------------
// Access control
// ---------------------------------------------------------------------------

/// Security token addressing one repository.
pub fn repository_security_token(project_id: &str, repository_id: &str) -> String {
    format!("repoV2/{project_id}/{repository_id}")
}

/// Access-control document denying contribute and force-push to
/// `descriptor` on the repository.
pub fn restrict_contributors_entry(project_id: &str, repository_id: &str, descriptor: &str) -> Value {
    let deny = PERMISSION_GENERIC_CONTRIBUTE | PERMISSION_FORCE_PUSH;
    json!({
        "token": repository_security_token(project_id, repository_id),
        "merge": true,
        "accessControlEntries": [{
            "descriptor": descriptor,
            "allow": 0,
            "deny": deny,
            "extendedInfo": { "effectiveAllow": 0, "effectiveDeny": deny },
        }],
    })
}

/// Find the descriptor of the project's valid-users group in an identity
/// listing. Matching is by display name and is best effort.
pub fn find_valid_users_descriptor(identities: &Value, project_name: &str) -> Option<String> {
    let list = identities
        .get("value")
        .and_then(Value::as_array)
        .or_else(|| identities.as_array())?;

    list.iter()
        .find(|identity| {
            let provider = identity
                .get("providerDisplayName")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let custom = identity
                .get("customDisplayName")
                .and_then(Value::as_str)
                .unwrap_or_default();
            provider.contains(PROJECT_VALID_USERS)
                || (custom.contains(project_name) && custom.contains("Valid Users"))
        })
        .and_then(|identity| identity.get("descriptor").and_then(Value::as_str))
        .map(str::to_string)
}
