//! Request, result, and remote-reference types shared by every crate.
//!
//! Everything here is plain data. The orchestrator builds a
//! [`ProvisioningResult`] by folding one [`StepOutcome`] per step into it
//! via [`ProvisioningResult::merge`].

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default number of sprint windows generated for a new team.
pub const DEFAULT_ITERATION_COUNT: u32 = 26;

/// Default minimum approver count for the main-branch reviewer policy.
pub const DEFAULT_MINIMUM_REVIEWERS: u32 = 2;

// ---------------------------------------------------------------------------
// Process template
// ---------------------------------------------------------------------------

/// Work-item process the remote project is created with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessTemplate {
    #[default]
    Scrum,
    Agile,
    Basic,
    #[serde(rename = "CMMI", alias = "Cmmi")]
    Cmmi,
}

impl ProcessTemplate {
    /// System type id of the built-in process on the remote side.
    pub fn template_type_id(self) -> &'static str {
        match self {
            Self::Scrum => "6b724908-ef14-45cf-84f8-768b5384da45",
            Self::Agile => "adcc42ab-9882-485e-a3ed-7678f01f66bc",
            Self::Basic => "b8a3a935-7e91-48b8-a94c-606d37c3e9f2",
            Self::Cmmi => "27450541-8e31-4150-9947-dc59f998fc01",
        }
    }
}

/// Which named sprint strategy a non-monthly team uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SprintCadence {
    /// Two-week windows, Monday to Friday, named `Sprint N`.
    #[default]
    Biweekly,
    /// One-week, five-business-day windows named `SPRINT-00N`.
    WeeklyFiveDay,
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// An extra area node requested alongside the team area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AreaSpec {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    /// Parent path below the area root, e.g. `Platform/Backend`.
    #[serde(default)]
    pub path: Option<String>,
}

/// Repository scaffold requested for the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySpec {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    /// Allowed commit-author email globs. Empty skips the policy.
    #[serde(default)]
    pub author_email_patterns: Vec<String>,
    #[serde(default = "default_minimum_reviewers")]
    #[validate(range(min = 1, max = 10))]
    pub minimum_reviewers: u32,
    /// Deny contribute and force-push to the project's valid users.
    #[serde(default = "default_true")]
    pub restrict_contributors: bool,
}

/// Everything needed to stand up one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningRequest {
    #[validate(length(min = 1, max = 64))]
    pub project_name: String,
    #[serde(default)]
    pub process_template: ProcessTemplate,
    #[validate(length(min = 1, max = 64))]
    pub team_name: String,
    pub start_date: NaiveDate,
    /// Maintenance teams get monthly iterations instead of sprints.
    #[serde(default)]
    pub is_sustentacao: bool,
    #[serde(default = "default_iteration_count")]
    #[validate(range(min = 1, max = 104))]
    pub iteration_count: u32,
    #[serde(default)]
    #[validate(nested)]
    pub areas: Vec<AreaSpec>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sprint_cadence: SprintCadence,
    #[serde(default)]
    #[validate(nested)]
    pub repository: Option<RepositorySpec>,
}

impl ProvisioningRequest {
    /// Minimal request with every optional field at its default.
    pub fn new(
        project_name: impl Into<String>,
        team_name: impl Into<String>,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            process_template: ProcessTemplate::default(),
            team_name: team_name.into(),
            start_date,
            is_sustentacao: false,
            iteration_count: DEFAULT_ITERATION_COUNT,
            areas: Vec::new(),
            description: None,
            sprint_cadence: SprintCadence::default(),
            repository: None,
        }
    }
}

fn default_iteration_count() -> u32 {
    DEFAULT_ITERATION_COUNT
}

fn default_minimum_reviewers() -> u32 {
    DEFAULT_MINIMUM_REVIEWERS
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Remote references
// ---------------------------------------------------------------------------

/// Kind of object living in the remote project-management system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Project,
    Team,
    Area,
    Iteration,
    Board,
    Repository,
    Policy,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Project => "project",
            Self::Team => "team",
            Self::Area => "area",
            Self::Iteration => "iteration",
            Self::Board => "board",
            Self::Repository => "repository",
            Self::Policy => "policy",
        };
        f.write_str(s)
    }
}

/// Identity of a remote object produced during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteResourceRef {
    pub id: String,
    pub name: String,
    pub kind: ResourceKind,
}

impl RemoteResourceRef {
    pub fn new(kind: ResourceKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }
}

/// Status of a long-running remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Succeeded,
    Failed,
}

impl OperationStatus {
    /// Map the remote system's status string onto the three-state model.
    ///
    /// `notSet`, `queued` and `inProgress` are pending; `cancelled` is a
    /// failure. Unknown values are treated as pending so the poller keeps
    /// waiting until its attempt budget runs out.
    pub fn from_remote(status: &str) -> Self {
        match status {
            "succeeded" => Self::Succeeded,
            "failed" | "cancelled" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// A long-running operation started by the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalOperation {
    pub id: String,
    pub status: OperationStatus,
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// A tolerated step failure recorded in the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepError {
    pub step_name: String,
    pub message: String,
}

impl StepError {
    pub fn new(step_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            message: message.into(),
        }
    }
}

/// A configuration step that was applied successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOutcome {
    pub step_name: String,
    /// What was configured: a team id, board name, or repository id.
    pub target: String,
}

impl ConfigOutcome {
    pub fn new(step_name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            target: target.into(),
        }
    }
}

/// What a single step contributes to the overall result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub teams: Vec<RemoteResourceRef>,
    pub iterations: Vec<RemoteResourceRef>,
    pub areas: Vec<RemoteResourceRef>,
    pub repositories: Vec<RemoteResourceRef>,
    pub configurations: Vec<ConfigOutcome>,
    pub errors: Vec<StepError>,
}

impl StepOutcome {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Outcome holding a single tolerated failure.
    pub fn failed(step_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![StepError::new(step_name, message)],
            ..Self::default()
        }
    }

    /// Outcome holding a single applied configuration.
    pub fn configured(step_name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            configurations: vec![ConfigOutcome::new(step_name, target)],
            ..Self::default()
        }
    }

    /// Append another outcome's entries after this one's.
    pub fn and(mut self, other: StepOutcome) -> Self {
        self.teams.extend(other.teams);
        self.iterations.extend(other.iterations);
        self.areas.extend(other.areas);
        self.repositories.extend(other.repositories);
        self.configurations.extend(other.configurations);
        self.errors.extend(other.errors);
        self
    }
}

/// Final report of a provisioning run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningResult {
    pub project: Option<RemoteResourceRef>,
    /// Whether the project was created by this run.
    pub is_new: bool,
    pub teams: Vec<RemoteResourceRef>,
    pub iterations: Vec<RemoteResourceRef>,
    pub areas: Vec<RemoteResourceRef>,
    pub repositories: Vec<RemoteResourceRef>,
    pub configurations: Vec<ConfigOutcome>,
    pub errors: Vec<StepError>,
}

impl ProvisioningResult {
    /// Start a result for a resolved project.
    pub fn for_project(project: RemoteResourceRef, is_new: bool) -> Self {
        Self {
            project: Some(project),
            is_new,
            ..Self::default()
        }
    }

    /// Fold a step's outcome into the result, preserving step order.
    pub fn merge(mut self, outcome: StepOutcome) -> Self {
        self.teams.extend(outcome.teams);
        self.iterations.extend(outcome.iterations);
        self.areas.extend(outcome.areas);
        self.repositories.extend(outcome.repositories);
        self.configurations.extend(outcome.configurations);
        self.errors.extend(outcome.errors);
        self
    }

    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(name: &str) -> RemoteResourceRef {
        RemoteResourceRef::new(ResourceKind::Team, format!("id-{name}"), name)
    }

    #[test]
    fn merge_appends_in_step_order() {
        let result = ProvisioningResult::for_project(
            RemoteResourceRef::new(ResourceKind::Project, "p1", "Atlas"),
            true,
        )
        .merge(StepOutcome {
            teams: vec![team("Core")],
            ..StepOutcome::default()
        })
        .merge(StepOutcome::failed("configure_board_cards", "boom"))
        .merge(StepOutcome::configured("configure_board_styles", "Stories"));

        assert_eq!(result.teams, vec![team("Core")]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].step_name, "configure_board_cards");
        assert_eq!(result.configurations[0].target, "Stories");
        assert!(result.is_degraded());
    }

    #[test]
    fn outcome_and_concatenates() {
        let combined = StepOutcome::failed("a", "x").and(StepOutcome::failed("b", "y"));
        let names: Vec<_> = combined.errors.iter().map(|e| e.step_name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn request_defaults_from_minimal_json() {
        let req: ProvisioningRequest = serde_json::from_value(serde_json::json!({
            "projectName": "Atlas",
            "teamName": "Atlas Core",
            "startDate": "2025-01-06",
        }))
        .expect("minimal request should deserialize");

        assert_eq!(req.iteration_count, DEFAULT_ITERATION_COUNT);
        assert_eq!(req.process_template, ProcessTemplate::Scrum);
        assert_eq!(req.sprint_cadence, SprintCadence::Biweekly);
        assert!(!req.is_sustentacao);
        assert!(req.areas.is_empty());
        assert!(req.repository.is_none());
    }

    #[test]
    fn request_validation_rejects_bad_counts_and_names() {
        let mut req = ProvisioningRequest::new(
            "Atlas",
            "",
            NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
        );
        req.iteration_count = 0;
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("team_name"));
        assert!(fields.contains_key("iteration_count"));
    }

    #[test]
    fn request_validation_checks_nested_repository() {
        let mut req = ProvisioningRequest::new(
            "Atlas",
            "Core",
            NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
        );
        req.repository = Some(RepositorySpec {
            name: "atlas-api".into(),
            author_email_patterns: vec![],
            minimum_reviewers: 0,
            restrict_contributors: true,
        });
        assert!(req.validate().is_err());
    }

    #[test]
    fn process_template_type_ids_are_distinct() {
        let ids = [
            ProcessTemplate::Scrum.template_type_id(),
            ProcessTemplate::Agile.template_type_id(),
            ProcessTemplate::Basic.template_type_id(),
            ProcessTemplate::Cmmi.template_type_id(),
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn remote_operation_status_mapping() {
        assert_eq!(OperationStatus::from_remote("succeeded"), OperationStatus::Succeeded);
        assert_eq!(OperationStatus::from_remote("failed"), OperationStatus::Failed);
        assert_eq!(OperationStatus::from_remote("cancelled"), OperationStatus::Failed);
        assert_eq!(OperationStatus::from_remote("inProgress"), OperationStatus::Pending);
        assert_eq!(OperationStatus::from_remote("queued"), OperationStatus::Pending);
    }
}
