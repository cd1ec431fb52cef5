//! In-memory remote for tests.
//!
//! [`MockRemote`] keeps resources and settings documents in a mutex-guarded
//! store, records every call as a one-line string, and can be told to fail
//! specific calls. [`RecordingSleeper`] records requested delays without
//! sleeping.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use devhub_core::types::{ExternalOperation, OperationStatus, ResourceKind};
use serde_json::{json, Value};

use crate::client::{
    BoardDocument, Created, RemoteError, RemoteResource, RemoteResourceClient, Scope,
    SettingsTarget,
};
use crate::poller::Sleeper;

/// Nil GUID the remote uses for a board's default swimlane.
const DEFAULT_ROW_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Failure a rule injects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    NotFound,
    Conflict,
    Api(u16),
}

impl Failure {
    fn to_error(&self) -> RemoteError {
        match self {
            Self::NotFound => RemoteError::NotFound,
            Self::Conflict => RemoteError::Conflict("already exists".into()),
            Self::Api(status) => RemoteError::Api {
                status: *status,
                body: "injected failure".into(),
            },
        }
    }
}

#[derive(Debug)]
struct Rule {
    method: &'static str,
    needle: String,
    failure: Failure,
    remaining: Option<usize>,
}

#[derive(Debug, Clone)]
struct Stored {
    kind: ResourceKind,
    project: Option<String>,
    parent: Option<String>,
    resource: RemoteResource,
}

#[derive(Debug, Default)]
struct State {
    resources: Vec<Stored>,
    settings: HashMap<String, Value>,
    operations: VecDeque<Result<OperationStatus, Failure>>,
    rules: Vec<Rule>,
    calls: Vec<String>,
    next_id: u64,
    skip_default_team: bool,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn insert(&mut self, kind: ResourceKind, scope: &Scope, name: &str, extra: Value) -> RemoteResource {
        let id = self.next_id(&kind.to_string());
        let mut raw = json!({ "id": id, "name": name });
        if let (Some(obj), Value::Object(extra)) = (raw.as_object_mut(), extra) {
            obj.extend(extra);
        }
        let resource = RemoteResource {
            id,
            name: name.to_string(),
            raw,
        };
        self.resources.push(Stored {
            kind,
            project: project_key(kind, scope),
            parent: scope.parent_path.clone(),
            resource: resource.clone(),
        });
        resource
    }

    fn matching(&self, kind: ResourceKind, scope: &Scope) -> impl Iterator<Item = &Stored> {
        let project = project_key(kind, scope);
        let parent = scope.parent_path.clone();
        self.resources
            .iter()
            .filter(move |s| s.kind == kind && s.project == project && s.parent == parent)
    }

    /// Record the call and return the injected failure, if a rule matches.
    fn enter(&mut self, method: &'static str, detail: String) -> Result<(), RemoteError> {
        let line = format!("{method} {detail}");
        self.calls.push(line.clone());

        let rule = self
            .rules
            .iter_mut()
            .find(|r| r.method == method && line.contains(&r.needle) && r.remaining != Some(0));
        match rule {
            Some(rule) => {
                if let Some(n) = rule.remaining.as_mut() {
                    *n -= 1;
                }
                Err(rule.failure.to_error())
            }
            None => Ok(()),
        }
    }
}

fn project_key(kind: ResourceKind, scope: &Scope) -> Option<String> {
    match kind {
        ResourceKind::Project => None,
        _ => scope.project.clone(),
    }
}

fn default_settings(target: &SettingsTarget) -> Value {
    match target {
        SettingsTarget::Board { document, .. } => match document {
            BoardDocument::Cards => json!({
                "cards": {
                    "Microsoft.VSTS.WorkItemTypes.UserStory": [
                        { "displayType": "core", "fieldIdentifier": "System.Title" }
                    ],
                    "Microsoft.VSTS.WorkItemTypes.Bug": [
                        { "displayType": "core", "fieldIdentifier": "System.Title" }
                    ],
                }
            }),
            BoardDocument::CardRules => json!({ "rules": {} }),
            BoardDocument::Columns => json!({
                "count": 3,
                "value": [
                    { "id": "col-in", "name": "New", "columnType": "incoming" },
                    { "id": "col-mid", "name": "Committed", "columnType": "inProgress" },
                    { "id": "col-out", "name": "Done", "columnType": "outgoing" },
                ]
            }),
            BoardDocument::Rows => json!({
                "count": 2,
                "value": [
                    { "id": DEFAULT_ROW_ID, "name": null },
                    { "id": "row-1", "name": "Expedite" },
                ]
            }),
        },
        SettingsTarget::RepositoryRefs { .. } => json!({ "count": 0, "value": [] }),
        SettingsTarget::Identities { .. } => json!({
            "value": [
                { "providerDisplayName": "[Default]\\Contributors", "descriptor": "vssgp.contributors" },
                { "providerDisplayName": "[Default]\\Project Valid Users", "descriptor": "vssgp.valid-users" },
            ]
        }),
        _ => json!({}),
    }
}

/// In-memory [`RemoteResourceClient`].
///
/// Creating a project seeds what the real service creates with it: a
/// default team named `"{project} Team"`, three default iterations, and
/// two boards.
#[derive(Debug, Default)]
pub struct MockRemote {
    state: Mutex<State>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Do not seed a default team when a project is created.
    pub fn without_default_team(self) -> Self {
        self.state().skip_default_team = true;
        self
    }

    /// Add a resource directly, bypassing the call log.
    pub fn seed(&self, kind: ResourceKind, scope: &Scope, name: &str) -> RemoteResource {
        self.state().insert(kind, scope, name, json!({}))
    }

    /// Add an existing project.
    pub fn with_project(self, name: &str) -> Self {
        self.seed(ResourceKind::Project, &Scope::organization(), name);
        self
    }

    /// Statuses returned by successive `get_operation_status` calls. Once
    /// the script is exhausted every operation reports success.
    pub fn script_operations<I>(&self, statuses: I)
    where
        I: IntoIterator<Item = Result<OperationStatus, Failure>>,
    {
        self.state().operations.extend(statuses);
    }

    /// Fail every `method` call whose log line contains `needle`.
    pub fn fail(&self, method: &'static str, needle: &str, failure: Failure) {
        self.push_rule(method, needle, failure, None);
    }

    /// Fail the next `times` matching calls, then behave normally.
    pub fn fail_times(&self, method: &'static str, needle: &str, failure: Failure, times: usize) {
        self.push_rule(method, needle, failure, Some(times));
    }

    fn push_rule(&self, method: &'static str, needle: &str, failure: Failure, remaining: Option<usize>) {
        self.state().rules.push(Rule {
            method,
            needle: needle.to_string(),
            failure,
            remaining,
        });
    }

    /// Replace a settings document.
    pub fn set_settings(&self, target: &SettingsTarget, value: Value) {
        self.state().settings.insert(target.describe(), value);
    }

    /// The last document written to `target`, if any.
    pub fn settings(&self, target: &SettingsTarget) -> Option<Value> {
        self.state().settings.get(&target.describe()).cloned()
    }

    /// Every call so far, formatted as `"{method} {detail}"`.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Number of `method` calls whose log line contains `needle`.
    pub fn count(&self, method: &str, needle: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.starts_with(method) && c.contains(needle))
            .count()
    }

    /// Stored resources of one kind, in insertion order.
    pub fn resources(&self, kind: ResourceKind) -> Vec<RemoteResource> {
        self.state()
            .resources
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.resource.clone())
            .collect()
    }
}

#[async_trait]
impl RemoteResourceClient for MockRemote {
    async fn get_by_name(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        name: &str,
    ) -> Result<Option<RemoteResource>, RemoteError> {
        let mut state = self.state();
        state.enter("get_by_name", format!("{kind} {} {name}", scope.describe()))?;
        let found = state
            .matching(kind, scope)
            .find(|s| s.resource.name == name)
            .map(|s| s.resource.clone());
        Ok(found)
    }

    async fn list(&self, kind: ResourceKind, scope: &Scope) -> Result<Vec<RemoteResource>, RemoteError> {
        let mut state = self.state();
        state.enter("list", format!("{kind} {}", scope.describe()))?;

        // Boards belong to whichever team asks.
        if kind == ResourceKind::Board {
            let project = scope.project.clone();
            return Ok(state
                .resources
                .iter()
                .filter(|s| s.kind == kind && s.project == project)
                .map(|s| s.resource.clone())
                .collect());
        }
        Ok(state.matching(kind, scope).map(|s| s.resource.clone()).collect())
    }

    async fn create(&self, kind: ResourceKind, scope: &Scope, payload: &Value) -> Result<Created, RemoteError> {
        let name = payload
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mut state = self.state();
        state.enter("create", format!("{kind} {} {name}", scope.describe()))?;

        if !name.is_empty() && state.matching(kind, scope).any(|s| s.resource.name == name) {
            return Err(RemoteError::Conflict(format!("{kind} {name} already exists")));
        }

        let extra = match payload.get("attributes") {
            Some(attributes) => json!({ "attributes": attributes }),
            None => json!({}),
        };
        let resource = state.insert(kind, scope, &name, extra);

        if kind != ResourceKind::Project {
            return Ok(Created::Resource(resource));
        }

        let project_scope = Scope::project(name.clone());
        if !state.skip_default_team {
            state.insert(ResourceKind::Team, &project_scope, &format!("{name} Team"), json!({}));
        }
        for i in 1..=3 {
            state.insert(ResourceKind::Iteration, &project_scope, &format!("Iteration {i}"), json!({}));
        }
        for board in ["Features", "Stories"] {
            state.insert(ResourceKind::Board, &project_scope, board, json!({}));
        }
        let operation_id = state.next_id("op");
        Ok(Created::Operation(ExternalOperation {
            id: operation_id,
            status: OperationStatus::Pending,
        }))
    }

    async fn get_operation_status(&self, operation_id: &str) -> Result<OperationStatus, RemoteError> {
        let mut state = self.state();
        state.enter("get_operation_status", operation_id.to_string())?;
        match state.operations.pop_front() {
            Some(Ok(status)) => Ok(status),
            Some(Err(failure)) => Err(failure.to_error()),
            None => Ok(OperationStatus::Succeeded),
        }
    }

    async fn get_settings(&self, target: &SettingsTarget) -> Result<Value, RemoteError> {
        let mut state = self.state();
        let key = target.describe();
        state.enter("get_settings", key.clone())?;
        Ok(state
            .settings
            .get(&key)
            .cloned()
            .unwrap_or_else(|| default_settings(target)))
    }

    async fn patch_settings(&self, target: &SettingsTarget, payload: &Value) -> Result<(), RemoteError> {
        let mut state = self.state();
        let key = target.describe();
        state.enter("patch_settings", key.clone())?;

        match target {
            SettingsTarget::Team { team_id, .. } => {
                if let Some(new_name) = payload.get("name").and_then(Value::as_str) {
                    let team = state
                        .resources
                        .iter_mut()
                        .find(|s| s.kind == ResourceKind::Team && s.resource.id == *team_id)
                        .ok_or(RemoteError::NotFound)?;
                    team.resource.name = new_name.to_string();
                    team.resource.raw["name"] = json!(new_name);
                }
            }
            SettingsTarget::RepositoryPush {
                project,
                repository_id,
            } => {
                let refs = SettingsTarget::RepositoryRefs {
                    project: project.clone(),
                    repository_id: repository_id.clone(),
                };
                state.settings.insert(
                    refs.describe(),
                    json!({ "count": 1, "value": [{ "name": "refs/heads/main" }] }),
                );
            }
            _ => {}
        }
        state.settings.insert(key, payload.clone());
        Ok(())
    }

    async fn delete(&self, kind: ResourceKind, scope: &Scope, key: &str) -> Result<(), RemoteError> {
        let mut state = self.state();
        state.enter("delete", format!("{kind} {} {key}", scope.describe()))?;

        let project = project_key(kind, scope);
        let parent = scope.parent_path.clone();
        let before = state.resources.len();
        state.resources.retain(|s| {
            !(s.kind == kind
                && s.project == project
                && s.parent == parent
                && (s.resource.name == key || s.resource.id == key))
        });
        if state.resources.len() == before {
            return Err(RemoteError::NotFound);
        }
        Ok(())
    }
}

/// [`Sleeper`] that records each requested delay and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn durations(&self) -> Vec<Duration> {
        self.slept
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count(&self) -> usize {
        self.durations().len()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(duration);
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn project_creation_seeds_defaults() {
        let remote = MockRemote::new();
        let created = remote
            .create(ResourceKind::Project, &Scope::organization(), &json!({ "name": "Atlas" }))
            .await
            .unwrap();
        assert_matches!(created, Created::Operation(_));

        let teams = remote.list(ResourceKind::Team, &Scope::project("Atlas")).await.unwrap();
        assert_eq!(teams[0].name, "Atlas Team");
        let iterations = remote
            .list(ResourceKind::Iteration, &Scope::project("Atlas"))
            .await
            .unwrap();
        assert_eq!(iterations.len(), 3);
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let remote = MockRemote::new();
        let scope = Scope::project("Atlas");
        remote
            .create(ResourceKind::Repository, &scope, &json!({ "name": "api" }))
            .await
            .unwrap();
        let err = remote
            .create(ResourceKind::Repository, &scope, &json!({ "name": "api" }))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn limited_failure_rule_expires() {
        let remote = MockRemote::new();
        remote.fail_times("list", "team", Failure::Api(503), 1);
        let scope = Scope::project("Atlas");
        assert!(remote.list(ResourceKind::Team, &scope).await.is_err());
        assert!(remote.list(ResourceKind::Team, &scope).await.is_ok());
        assert_eq!(remote.count("list", "team"), 2);
    }

    #[tokio::test]
    async fn team_patch_renames() {
        let remote = MockRemote::new();
        let team = remote.seed(ResourceKind::Team, &Scope::project("Atlas"), "Atlas Team");
        let target = SettingsTarget::Team {
            project: "Atlas".into(),
            team_id: team.id.clone(),
        };
        remote
            .patch_settings(&target, &json!({ "name": "Core" }))
            .await
            .unwrap();
        assert_eq!(remote.resources(ResourceKind::Team)[0].name, "Core");
    }
}
