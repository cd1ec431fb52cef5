#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use devhub_azdo::client::{BoardDocument, SettingsTarget};
use devhub_azdo::mock::{MockRemote, RecordingSleeper};
use devhub_azdo::poller::PollSettings;
use devhub_core::types::{ProvisioningRequest, RepositorySpec, ResourceKind};
use devhub_provisioning::config::ProvisioningConfig;
use devhub_provisioning::Orchestrator;

/// An orchestrator wired to an in-memory remote and a sleeper that only
/// records delays.
pub struct Harness {
    pub remote: Arc<MockRemote>,
    pub sleeper: Arc<RecordingSleeper>,
    pub orchestrator: Orchestrator,
}

/// Default timings with small attempt budgets so failure paths stay short.
pub fn test_config() -> ProvisioningConfig {
    ProvisioningConfig {
        operation_poll: PollSettings::new(Duration::from_secs(2), 3),
        team_discovery: PollSettings::new(Duration::from_secs(3), 3),
        rename_propagation: Duration::from_secs(2),
    }
}

pub fn harness(remote: MockRemote) -> Harness {
    harness_with(remote, test_config())
}

pub fn harness_with(remote: MockRemote, config: ProvisioningConfig) -> Harness {
    let remote = Arc::new(remote);
    let sleeper = Arc::new(RecordingSleeper::new());
    let orchestrator = Orchestrator::new(remote.clone(), sleeper.clone(), config);
    Harness {
        remote,
        sleeper,
        orchestrator,
    }
}

/// `Atlas` / `Atlas Core`, two biweekly sprints from 2025-01-06.
pub fn request() -> ProvisioningRequest {
    let mut request = ProvisioningRequest::new(
        "Atlas",
        "Atlas Core",
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
    );
    request.iteration_count = 2;
    request
}

pub fn repository_spec() -> RepositorySpec {
    RepositorySpec {
        name: "atlas-api".into(),
        author_email_patterns: vec!["*@atlas.example".into()],
        minimum_reviewers: 2,
        restrict_contributors: true,
    }
}

/// Settings target of the board the orchestrator configures in the mock.
pub fn board_target(remote: &MockRemote, document: BoardDocument) -> SettingsTarget {
    let team = remote.resources(ResourceKind::Team).remove(0);
    SettingsTarget::board("Atlas", team.id, "Stories", document)
}
