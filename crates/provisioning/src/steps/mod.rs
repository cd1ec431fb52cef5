//! The individual provisioning steps.
//!
//! Each step is an async function over a shared [`Context`]. Steps return
//! `Result<_, StepFailure>`; whether a failure aborts the run or is
//! recorded is decided by the orchestrator from the policy table.

pub(crate) mod board;
pub(crate) mod classification;
pub(crate) mod project;
pub(crate) mod repository;
pub(crate) mod team;

use devhub_azdo::client::{RemoteError, RemoteResourceClient, Scope};
use devhub_azdo::poller::{OperationPoller, Sleeper};
use devhub_azdo::resolver::{Resolved, ResourceResolver};
use devhub_core::policy::{policy_for, Idempotency, StepId};
use devhub_core::types::{ProvisioningRequest, ResourceKind};
use serde_json::Value;

use crate::config::ProvisioningConfig;

/// Everything a step may use during one run.
pub(crate) struct Context<'a> {
    pub client: &'a dyn RemoteResourceClient,
    pub resolver: &'a ResourceResolver,
    pub poller: &'a OperationPoller,
    pub sleeper: &'a dyn Sleeper,
    pub config: &'a ProvisioningConfig,
    pub request: &'a ProvisioningRequest,
}

impl Context<'_> {
    pub fn project_name(&self) -> &str {
        &self.request.project_name
    }

    pub fn team_name(&self) -> &str {
        &self.request.team_name
    }

    pub fn project_scope(&self) -> Scope {
        Scope::project(self.project_name())
    }

    /// Create a named resource the way `step`'s idempotency policy asks.
    ///
    /// Only steps whose conflicts count as "already done" create named
    /// resources; any other step is rejected before reaching the remote.
    pub async fn create_named(
        &self,
        step: StepId,
        kind: ResourceKind,
        scope: &Scope,
        name: &str,
        payload: &Value,
    ) -> Result<Resolved, RemoteError> {
        let policy = policy_for(step);
        if !policy.conflict_is_success() {
            return Err(RemoteError::Unsupported(format!(
                "step {step} does not create named resources"
            )));
        }
        match policy.idempotency {
            Idempotency::CreateIfAbsent => {
                self.resolver
                    .create_if_absent(kind, scope, name, payload)
                    .await
            }
            _ => self.resolver.create_or_get(kind, scope, name, payload).await,
        }
    }
}

/// The array of a list-shaped settings document: either a bare array or
/// an object with a `value` array.
pub(crate) fn items(document: &Value) -> &[Value] {
    document
        .as_array()
        .or_else(|| document.get("value").and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use chrono::NaiveDate;
    use devhub_azdo::mock::{MockRemote, RecordingSleeper};
    use serde_json::json;

    use super::*;

    struct Fixture {
        remote: Arc<MockRemote>,
        sleeper: Arc<RecordingSleeper>,
        resolver: ResourceResolver,
        poller: OperationPoller,
        config: ProvisioningConfig,
        request: ProvisioningRequest,
    }

    impl Fixture {
        fn new() -> Self {
            let remote = Arc::new(MockRemote::new());
            let sleeper = Arc::new(RecordingSleeper::new());
            Self {
                resolver: ResourceResolver::new(remote.clone()),
                poller: OperationPoller::new(remote.clone(), sleeper.clone()),
                remote,
                sleeper,
                config: ProvisioningConfig::default(),
                request: ProvisioningRequest::new(
                    "Atlas",
                    "Atlas Core",
                    NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
                ),
            }
        }

        fn context(&self) -> Context<'_> {
            Context {
                client: self.remote.as_ref(),
                resolver: &self.resolver,
                poller: &self.poller,
                sleeper: self.sleeper.as_ref(),
                config: &self.config,
                request: &self.request,
            }
        }
    }

    #[test]
    fn items_accepts_both_shapes() {
        assert_eq!(items(&json!([1, 2])).len(), 2);
        assert_eq!(items(&json!({ "count": 1, "value": [1] })).len(), 1);
        assert!(items(&json!({})).is_empty());
        assert!(items(&Value::Null).is_empty());
    }

    #[tokio::test]
    async fn configure_steps_cannot_create_named_resources() {
        let fixture = Fixture::new();
        let ctx = fixture.context();

        let err = ctx
            .create_named(
                StepId::ConfigureBoardColumns,
                ResourceKind::Board,
                &ctx.project_scope(),
                "Stories",
                &json!({ "name": "Stories" }),
            )
            .await
            .unwrap_err();

        assert_matches!(err, RemoteError::Unsupported(_));
        assert!(fixture.remote.calls().is_empty());
    }

    #[tokio::test]
    async fn create_if_absent_step_treats_existing_as_done() {
        let fixture = Fixture::new();
        let ctx = fixture.context();
        let scope = ctx.project_scope();
        let payload = json!({ "name": "Payments" });

        let first = ctx
            .create_named(StepId::CreateAreas, ResourceKind::Area, &scope, "Payments", &payload)
            .await
            .unwrap();
        let second = ctx
            .create_named(StepId::CreateAreas, ResourceKind::Area, &scope, "Payments", &payload)
            .await
            .unwrap();

        assert!(first.is_new);
        assert!(!second.is_new);
        assert_eq!(second.resource.id, first.resource.id);
        assert_eq!(fixture.remote.count("create", "area"), 2);
        assert_eq!(fixture.remote.resources(ResourceKind::Area).len(), 1);
    }
}
