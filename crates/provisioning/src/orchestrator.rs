//! Sequential provisioning workflow.
//!
//! [`Orchestrator::run`] resolves the project, and for a newly created
//! project continues through team, iterations, areas, team settings, board
//! layout, and optionally a repository. Every step's failure policy comes
//! from [`policy_for`]: only project resolution aborts the run, every other
//! failure is recorded in [`ProvisioningResult::errors`].

use std::sync::Arc;

use devhub_azdo::client::RemoteResourceClient;
use devhub_azdo::poller::{OperationPoller, Sleeper};
use devhub_azdo::resolver::ResourceResolver;
use devhub_core::policy::{policy_for, StepId};
use devhub_core::types::{
    ProvisioningRequest, ProvisioningResult, RemoteResourceRef, RepositorySpec, StepOutcome,
};
use validator::Validate;

use crate::config::ProvisioningConfig;
use crate::error::{ProvisionError, StepFailure};
use crate::steps::{board, classification, project, repository, team, Context};

/// Runs provisioning requests against one remote.
///
/// Holds no per-run state and can be shared across tasks.
pub struct Orchestrator {
    client: Arc<dyn RemoteResourceClient>,
    sleeper: Arc<dyn Sleeper>,
    resolver: ResourceResolver,
    poller: OperationPoller,
    config: ProvisioningConfig,
}

/// Result accumulator for one run.
struct Progress {
    project: String,
    result: ProvisioningResult,
}

impl Progress {
    fn new(project: &str) -> Self {
        Self {
            project: project.to_string(),
            result: ProvisioningResult::default(),
        }
    }

    fn record(&mut self, outcome: StepOutcome) {
        self.result = std::mem::take(&mut self.result).merge(outcome);
    }

    /// Apply `step`'s failure policy to its result.
    ///
    /// Returns the value on success, `None` after a tolerated failure (now
    /// recorded), or the fatal error.
    fn settle<T>(&mut self, step: StepId, outcome: Result<T, StepFailure>) -> Result<Option<T>, ProvisionError> {
        match outcome {
            Ok(value) => {
                tracing::debug!(project = %self.project, step = step.name(), "Step completed");
                Ok(Some(value))
            }
            Err(source) if policy_for(step).is_fatal() => {
                tracing::error!(
                    project = %self.project,
                    step = step.name(),
                    error = %source,
                    "Provisioning aborted",
                );
                Err(ProvisionError::Fatal {
                    project: self.project.clone(),
                    step,
                    source,
                })
            }
            Err(e) => {
                tracing::warn!(
                    project = %self.project,
                    step = step.name(),
                    error = %e,
                    "Step failed, continuing",
                );
                self.record(StepOutcome::failed(step.name(), e.to_string()));
                Ok(None)
            }
        }
    }

    /// [`settle`](Self::settle) for steps that only contribute an outcome.
    fn settle_outcome(
        &mut self,
        step: StepId,
        outcome: Result<StepOutcome, StepFailure>,
    ) -> Result<(), ProvisionError> {
        if let Some(outcome) = self.settle(step, outcome)? {
            self.record(outcome);
        }
        Ok(())
    }

    fn finish(self) -> ProvisioningResult {
        self.result
    }
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn RemoteResourceClient>,
        sleeper: Arc<dyn Sleeper>,
        config: ProvisioningConfig,
    ) -> Self {
        Self {
            resolver: ResourceResolver::new(client.clone()),
            poller: OperationPoller::new(client.clone(), sleeper.clone()),
            client,
            sleeper,
            config,
        }
    }

    fn context<'a>(&'a self, request: &'a ProvisioningRequest) -> Context<'a> {
        Context {
            client: self.client.as_ref(),
            resolver: &self.resolver,
            poller: &self.poller,
            sleeper: self.sleeper.as_ref(),
            config: &self.config,
            request,
        }
    }

    /// Provision the workspace described by `request`.
    ///
    /// An existing project is returned as-is with `is_new = false` and no
    /// further changes. Errors only for an invalid request or a failed
    /// project resolution; no partial result is returned in that case.
    pub async fn run(&self, request: &ProvisioningRequest) -> Result<ProvisioningResult, ProvisionError> {
        request.validate()?;

        let ctx = self.context(request);
        let mut progress = Progress::new(&request.project_name);

        tracing::info!(
            project = %request.project_name,
            team = %request.team_name,
            template = ?request.process_template,
            "Provisioning workspace",
        );

        let resolved = progress.settle(StepId::ResolveProject, project::resolve_project(&ctx).await)?;
        let Some(resolved) = resolved else {
            return Ok(progress.finish());
        };
        progress.result.project = Some(resolved.resource.clone());
        progress.result.is_new = resolved.is_new;

        if !resolved.is_new {
            tracing::info!(project = %request.project_name, "Project already exists, nothing to do");
            return Ok(progress.finish());
        }

        let team = progress.settle(StepId::DiscoverTeam, team::discover_team(&ctx).await)?;
        if let Some(team) = &team {
            progress.record(StepOutcome {
                teams: vec![team.clone()],
                ..StepOutcome::default()
            });
        }

        progress.settle_outcome(
            StepId::DeleteDefaultIterations,
            classification::delete_default_iterations(&ctx).await,
        )?;
        let root = progress.settle(
            StepId::CreateRootIteration,
            classification::create_root_iteration(&ctx).await,
        )?;
        if let Some(root) = root {
            progress.record(StepOutcome {
                iterations: vec![root],
                ..StepOutcome::default()
            });
        }
        progress.settle_outcome(
            StepId::CreateIterationWindows,
            classification::create_iteration_windows(&ctx).await,
        )?;
        progress.settle_outcome(StepId::CreateAreas, classification::create_areas(&ctx).await)?;

        match &team {
            Some(team) => self.configure_team(&ctx, &mut progress, team).await?,
            None => tracing::warn!(
                project = %request.project_name,
                "No team available, skipping team and board configuration",
            ),
        }

        if let Some(spec) = &request.repository {
            self.configure_repository(&ctx, &mut progress, &resolved.resource, spec)
                .await?;
        }

        let result = progress.finish();
        tracing::info!(
            project = %request.project_name,
            teams = result.teams.len(),
            iterations = result.iterations.len(),
            areas = result.areas.len(),
            errors = result.errors.len(),
            "Workspace provisioned",
        );
        Ok(result)
    }

    async fn configure_team(
        &self,
        ctx: &Context<'_>,
        progress: &mut Progress,
        team_ref: &RemoteResourceRef,
    ) -> Result<(), ProvisionError> {
        progress.settle_outcome(
            StepId::ConfigureIterationPath,
            team::configure_iteration_path(ctx, team_ref).await,
        )?;
        progress.settle_outcome(
            StepId::ConfigureBacklogLevels,
            team::configure_backlog_levels(ctx, team_ref).await,
        )?;

        let board = match board::discover_board(ctx, team_ref).await {
            Ok(Some(board)) => board,
            Ok(None) => {
                tracing::warn!(team = %team_ref.name, "Team has no boards, skipping board layout");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(team = %team_ref.name, error = %e, "Could not list boards, skipping board layout");
                return Ok(());
            }
        };

        progress.settle_outcome(
            StepId::ConfigureBoardCards,
            board::configure_cards(ctx, &board).await,
        )?;
        progress.settle_outcome(
            StepId::ConfigureBoardStyles,
            board::configure_styles(ctx, &board).await,
        )?;
        progress.settle_outcome(
            StepId::ConfigureBoardColumns,
            board::configure_columns(ctx, &board).await,
        )?;
        progress.settle_outcome(
            StepId::ConfigureBoardSwimlanes,
            board::configure_swimlanes(ctx, &board).await,
        )?;
        Ok(())
    }

    async fn configure_repository(
        &self,
        ctx: &Context<'_>,
        progress: &mut Progress,
        project_ref: &RemoteResourceRef,
        spec: &RepositorySpec,
    ) -> Result<(), ProvisionError> {
        let resolved = progress.settle(
            StepId::ResolveRepository,
            repository::resolve_repository(ctx, project_ref, spec).await,
        )?;
        let Some(repo) = resolved else {
            return Ok(());
        };
        progress.record(StepOutcome {
            repositories: vec![repo.clone()],
            ..StepOutcome::default()
        });

        progress.settle_outcome(
            StepId::InitializeRepository,
            repository::initialize_repository(ctx, &repo).await,
        )?;
        progress.settle_outcome(
            StepId::ConfigureBranchPolicies,
            repository::configure_branch_policies(ctx, &repo, spec).await,
        )?;

        if spec.restrict_contributors {
            progress.settle_outcome(
                StepId::ConfigureRepositoryPermissions,
                repository::configure_permissions(ctx, project_ref, &repo).await,
            )?;
        } else {
            tracing::debug!(repository = %repo.name, "Contributor restriction disabled");
        }
        Ok(())
    }
}
