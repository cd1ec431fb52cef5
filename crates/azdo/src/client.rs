//! Capability interface the orchestrator requires from the remote system.
//!
//! [`RemoteResourceClient`] is deliberately small: named-resource lookup,
//! listing, creation, deletion, settings documents, and operation status.
//! Wire details (URLs, verbs, auth) belong to the adapter implementing it.

use async_trait::async_trait;
use devhub_core::types::{ExternalOperation, OperationStatus, RemoteResourceRef, ResourceKind};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors from the remote client layer.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The addressed resource does not exist.
    #[error("Resource not found")]
    NotFound,

    /// The resource already exists (create raced or was repeated).
    #[error("Resource already exists: {0}")]
    Conflict(String),

    /// The remote returned any other non-2xx status code.
    #[error("Remote API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// The adapter cannot perform this operation for the given target.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl RemoteError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Errors that can say whether they stem from an already-exists conflict.
pub trait ConflictAware {
    fn is_conflict(&self) -> bool;
}

impl ConflictAware for RemoteError {
    fn is_conflict(&self) -> bool {
        RemoteError::is_conflict(self)
    }
}

// ---------------------------------------------------------------------------
// Addressing
// ---------------------------------------------------------------------------

/// Where a resource lives: organization, project, team, and for
/// classification nodes the parent path below the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Scope {
    pub project: Option<String>,
    pub team: Option<String>,
    /// Slash-separated path below the classification root.
    pub parent_path: Option<String>,
}

impl Scope {
    pub fn organization() -> Self {
        Self::default()
    }

    pub fn project(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            ..Self::default()
        }
    }

    pub fn team(project: impl Into<String>, team: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            team: Some(team.into()),
            parent_path: None,
        }
    }

    /// Nest under a classification path, e.g. the team's root iteration.
    pub fn under(mut self, parent_path: impl Into<String>) -> Self {
        self.parent_path = Some(parent_path.into());
        self
    }

    /// Human-readable location used in logs.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(p) = &self.project {
            parts.push(p.as_str());
        }
        if let Some(t) = &self.team {
            parts.push(t.as_str());
        }
        if let Some(path) = &self.parent_path {
            parts.push(path.as_str());
        }
        if parts.is_empty() {
            "<organization>".to_string()
        } else {
            parts.join("/")
        }
    }
}

/// Which board document a settings call addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardDocument {
    Cards,
    CardRules,
    Columns,
    Rows,
}

impl BoardDocument {
    pub fn segment(self) -> &'static str {
        match self {
            Self::Cards => "cardsettings",
            Self::CardRules => "cardrulesettings",
            Self::Columns => "columns",
            Self::Rows => "rows",
        }
    }
}

/// A settings document in the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SettingsTarget {
    /// The team object itself (name, description).
    Team { project: String, team_id: String },
    /// Team work settings (iterations, backlog visibility).
    TeamSettings { project: String, team_id: String },
    /// One of a board's layout documents.
    Board {
        project: String,
        team_id: String,
        board: String,
        document: BoardDocument,
    },
    /// Branch refs of a repository, filtered to `main`.
    RepositoryRefs { project: String, repository_id: String },
    /// Push endpoint of a repository.
    RepositoryPush { project: String, repository_id: String },
    /// Identity search across the organization.
    Identities { search: String },
    /// Access-control entries of a security namespace.
    AccessControlEntries { namespace_id: String },
}

impl SettingsTarget {
    pub fn board(
        project: impl Into<String>,
        team_id: impl Into<String>,
        board: impl Into<String>,
        document: BoardDocument,
    ) -> Self {
        Self::Board {
            project: project.into(),
            team_id: team_id.into(),
            board: board.into(),
            document,
        }
    }

    /// Short path-like description used in logs and test assertions.
    pub fn describe(&self) -> String {
        match self {
            Self::Team { project, team_id } => format!("{project}/teams/{team_id}"),
            Self::TeamSettings { project, team_id } => format!("{project}/{team_id}/teamsettings"),
            Self::Board {
                project,
                team_id,
                board,
                document,
            } => format!("{project}/{team_id}/boards/{board}/{}", document.segment()),
            Self::RepositoryRefs {
                project,
                repository_id,
            } => format!("{project}/repositories/{repository_id}/refs"),
            Self::RepositoryPush {
                project,
                repository_id,
            } => format!("{project}/repositories/{repository_id}/pushes"),
            Self::Identities { search } => format!("identities?{search}"),
            Self::AccessControlEntries { namespace_id } => {
                format!("accesscontrolentries/{namespace_id}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// A resource as returned by the remote, with its raw body kept for
/// callers that need extra attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResource {
    pub id: String,
    pub name: String,
    pub raw: Value,
}

impl RemoteResource {
    /// Extract `id` and `name` from a remote JSON object.
    ///
    /// Ids may be strings (GUIDs) or numbers (classification nodes).
    pub fn from_json(raw: Value) -> Result<Self, RemoteError> {
        let id = match raw.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(RemoteError::Decode(format!("resource without id: {raw}"))),
        };
        let name = raw
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(Self { id, name, raw })
    }

    pub fn to_ref(&self, kind: ResourceKind) -> RemoteResourceRef {
        RemoteResourceRef::new(kind, self.id.clone(), self.name.clone())
    }
}

/// Result of a create call: either the resource itself or, for resources
/// the remote builds asynchronously, the operation to poll.
#[derive(Debug, Clone, PartialEq)]
pub enum Created {
    Resource(RemoteResource),
    Operation(ExternalOperation),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Operations the provisioning workflow needs from the remote system.
#[async_trait]
pub trait RemoteResourceClient: Send + Sync {
    /// Look a resource up by name. Absence is `Ok(None)`, never an error.
    async fn get_by_name(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        name: &str,
    ) -> Result<Option<RemoteResource>, RemoteError>;

    /// List resources of a kind in a scope. For classification nodes this
    /// returns the direct children of `scope.parent_path` (or the root).
    async fn list(&self, kind: ResourceKind, scope: &Scope)
        -> Result<Vec<RemoteResource>, RemoteError>;

    /// Create a resource. Must report already-exists as
    /// [`RemoteError::Conflict`].
    async fn create(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        payload: &Value,
    ) -> Result<Created, RemoteError>;

    async fn get_operation_status(&self, operation_id: &str)
        -> Result<OperationStatus, RemoteError>;

    async fn get_settings(&self, target: &SettingsTarget) -> Result<Value, RemoteError>;

    /// Apply a settings document. The adapter picks the verb the remote
    /// expects for the target.
    async fn patch_settings(&self, target: &SettingsTarget, payload: &Value)
        -> Result<(), RemoteError>;

    /// Delete a resource. Classification nodes are addressed by name path,
    /// everything else by id.
    async fn delete(&self, kind: ResourceKind, scope: &Scope, key: &str)
        -> Result<(), RemoteError>;
}
