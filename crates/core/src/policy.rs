//! Step identities and their failure / idempotency policy.
//!
//! The orchestrator looks up every step here before running it: a
//! [`FailurePolicy::Fatal`] step aborts the run, a
//! [`FailurePolicy::Tolerated`] step is caught and recorded. The
//! [`Idempotency`] column decides whether a create first looks the
//! resource up and whether a conflict counts as success.

use std::fmt;

/// Every step of a provisioning run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepId {
    ResolveProject,
    DiscoverTeam,
    DeleteDefaultIterations,
    CreateRootIteration,
    CreateIterationWindows,
    CreateAreas,
    ConfigureIterationPath,
    ConfigureBacklogLevels,
    DiscoverBoard,
    ConfigureBoardCards,
    ConfigureBoardStyles,
    ConfigureBoardColumns,
    ConfigureBoardSwimlanes,
    ResolveRepository,
    InitializeRepository,
    ConfigureBranchPolicies,
    ConfigureRepositoryPermissions,
}

impl StepId {
    /// All steps in execution order.
    pub const ALL: [StepId; 17] = [
        StepId::ResolveProject,
        StepId::DiscoverTeam,
        StepId::DeleteDefaultIterations,
        StepId::CreateRootIteration,
        StepId::CreateIterationWindows,
        StepId::CreateAreas,
        StepId::ConfigureIterationPath,
        StepId::ConfigureBacklogLevels,
        StepId::DiscoverBoard,
        StepId::ConfigureBoardCards,
        StepId::ConfigureBoardStyles,
        StepId::ConfigureBoardColumns,
        StepId::ConfigureBoardSwimlanes,
        StepId::ResolveRepository,
        StepId::InitializeRepository,
        StepId::ConfigureBranchPolicies,
        StepId::ConfigureRepositoryPermissions,
    ];

    /// Stable snake_case name used in logs and [`crate::types::StepError`].
    pub fn name(self) -> &'static str {
        match self {
            Self::ResolveProject => "resolve_project",
            Self::DiscoverTeam => "discover_team",
            Self::DeleteDefaultIterations => "delete_default_iterations",
            Self::CreateRootIteration => "create_root_iteration",
            Self::CreateIterationWindows => "create_iteration_windows",
            Self::CreateAreas => "create_areas",
            Self::ConfigureIterationPath => "configure_iteration_path",
            Self::ConfigureBacklogLevels => "configure_backlog_levels",
            Self::DiscoverBoard => "discover_board",
            Self::ConfigureBoardCards => "configure_board_cards",
            Self::ConfigureBoardStyles => "configure_board_styles",
            Self::ConfigureBoardColumns => "configure_board_columns",
            Self::ConfigureBoardSwimlanes => "configure_board_swimlanes",
            Self::ResolveRepository => "resolve_repository",
            Self::InitializeRepository => "initialize_repository",
            Self::ConfigureBranchPolicies => "configure_branch_policies",
            Self::ConfigureRepositoryPermissions => "configure_repository_permissions",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happens to the run when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the whole run and surface the error to the caller.
    Fatal,
    /// Record a step error and continue with the next step.
    Tolerated,
}

/// How a step's remote writes behave when the target already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    /// Look up by name first; create only when absent.
    CreateOrGet,
    /// Create directly; a conflict response counts as success.
    CreateIfAbsent,
    /// Overwrite settings unconditionally on every run.
    ConfigureAlways,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPolicy {
    pub failure: FailurePolicy,
    pub idempotency: Idempotency,
}

impl StepPolicy {
    const fn new(failure: FailurePolicy, idempotency: Idempotency) -> Self {
        Self {
            failure,
            idempotency,
        }
    }

    pub fn is_fatal(self) -> bool {
        self.failure == FailurePolicy::Fatal
    }

    /// Whether a conflict from the remote system means "already done".
    pub fn conflict_is_success(self) -> bool {
        matches!(
            self.idempotency,
            Idempotency::CreateOrGet | Idempotency::CreateIfAbsent
        )
    }
}

/// Static policy table.
pub fn policy_for(step: StepId) -> StepPolicy {
    use FailurePolicy::{Fatal, Tolerated};
    use Idempotency::{ConfigureAlways, CreateIfAbsent, CreateOrGet};

    match step {
        StepId::ResolveProject => StepPolicy::new(Fatal, CreateOrGet),
        StepId::DiscoverTeam => StepPolicy::new(Tolerated, CreateOrGet),
        StepId::DeleteDefaultIterations => StepPolicy::new(Tolerated, ConfigureAlways),
        StepId::CreateRootIteration => StepPolicy::new(Tolerated, CreateIfAbsent),
        StepId::CreateIterationWindows => StepPolicy::new(Tolerated, CreateIfAbsent),
        StepId::CreateAreas => StepPolicy::new(Tolerated, CreateIfAbsent),
        StepId::ConfigureIterationPath
        | StepId::ConfigureBacklogLevels
        | StepId::DiscoverBoard
        | StepId::ConfigureBoardCards
        | StepId::ConfigureBoardStyles
        | StepId::ConfigureBoardColumns
        | StepId::ConfigureBoardSwimlanes
        | StepId::InitializeRepository
        | StepId::ConfigureRepositoryPermissions => StepPolicy::new(Tolerated, ConfigureAlways),
        StepId::ResolveRepository => StepPolicy::new(Tolerated, CreateOrGet),
        StepId::ConfigureBranchPolicies => StepPolicy::new(Tolerated, CreateIfAbsent),
    }
}
