//! Idempotent creation of named remote resources.
//!
//! Two flavours, matching the step policy table:
//!
//! - [`ResourceResolver::resolve_or_create`] looks the name up first and
//!   only creates when absent. A conflict from the create (someone else got
//!   there first) is resolved by fetching the winner.
//! - [`ResourceResolver::create_if_absent`] creates directly and treats a
//!   conflict as success.

use std::future::Future;
use std::sync::Arc;

use devhub_core::types::{RemoteResourceRef, ResourceKind};
use serde_json::Value;

use crate::client::{ConflictAware, Created, RemoteError, RemoteResource, RemoteResourceClient, Scope};

/// A resource that exists after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub resource: RemoteResourceRef,
    /// `true` only when this call created it.
    pub is_new: bool,
}

impl Resolved {
    fn existing(resource: RemoteResourceRef) -> Self {
        Self {
            resource,
            is_new: false,
        }
    }

    fn created(resource: RemoteResourceRef) -> Self {
        Self {
            resource,
            is_new: true,
        }
    }
}

/// Reference for `resource`, named after the requested name when the
/// remote body carries none (policy configurations).
fn reference(resource: &RemoteResource, kind: ResourceKind, name: &str) -> RemoteResourceRef {
    let mut r = resource.to_ref(kind);
    if r.name.is_empty() {
        r.name = name.to_string();
    }
    r
}

/// Create-or-get helper over a [`RemoteResourceClient`].
#[derive(Clone)]
pub struct ResourceResolver {
    client: Arc<dyn RemoteResourceClient>,
}

impl ResourceResolver {
    pub fn new(client: Arc<dyn RemoteResourceClient>) -> Self {
        Self { client }
    }

    /// Look `name` up and return it, or run `create` when absent.
    ///
    /// If `create` fails with a conflict the resource is fetched again and
    /// returned as existing. When that fetch still finds nothing the
    /// conflict is returned.
    pub async fn resolve_or_create<F, Fut, E>(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        name: &str,
        create: F,
    ) -> Result<Resolved, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RemoteResourceRef, E>>,
        E: From<RemoteError> + ConflictAware,
    {
        if let Some(existing) = self.client.get_by_name(kind, scope, name).await? {
            tracing::debug!(kind = %kind, name, id = %existing.id, "Resource already exists");
            return Ok(Resolved::existing(reference(&existing, kind, name)));
        }

        match create().await {
            Ok(created) => {
                tracing::info!(kind = %kind, name, id = %created.id, "Created resource");
                Ok(Resolved::created(created))
            }
            Err(e) if e.is_conflict() => {
                tracing::info!(kind = %kind, name, "Resource created concurrently, re-fetching");
                match self.client.get_by_name(kind, scope, name).await? {
                    Some(existing) => Ok(Resolved::existing(reference(&existing, kind, name))),
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// [`resolve_or_create`](Self::resolve_or_create) with a plain create
    /// call as the creation step.
    pub async fn create_or_get(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        name: &str,
        payload: &Value,
    ) -> Result<Resolved, RemoteError> {
        self.resolve_or_create(kind, scope, name, move || async move {
            match self.client.create(kind, scope, payload).await? {
                Created::Resource(resource) => Ok(reference(&resource, kind, name)),
                Created::Operation(op) => Err(RemoteError::Unsupported(format!(
                    "{kind} creation returned operation {}",
                    op.id
                ))),
            }
        })
        .await
    }

    /// Create `name` directly; a conflict counts as success.
    ///
    /// On conflict the existing resource is fetched for its id. If that
    /// lookup fails or finds nothing, the returned reference has an empty
    /// id.
    pub async fn create_if_absent(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        name: &str,
        payload: &Value,
    ) -> Result<Resolved, RemoteError> {
        match self.client.create(kind, scope, payload).await {
            Ok(Created::Resource(resource)) => {
                tracing::info!(kind = %kind, name, id = %resource.id, "Created resource");
                Ok(Resolved::created(reference(&resource, kind, name)))
            }
            Ok(Created::Operation(op)) => Err(RemoteError::Unsupported(format!(
                "{kind} creation returned operation {}",
                op.id
            ))),
            Err(e) if e.is_conflict() => {
                tracing::info!(kind = %kind, name, "Resource already exists");
                let existing = match self.client.get_by_name(kind, scope, name).await {
                    Ok(found) => found,
                    Err(lookup) => {
                        tracing::warn!(kind = %kind, name, error = %lookup, "Could not fetch existing resource");
                        None
                    }
                };
                let resource = existing
                    .map(|r| reference(&r, kind, name))
                    .unwrap_or_else(|| RemoteResourceRef::new(kind, "", name));
                Ok(Resolved::existing(resource))
            }
            Err(e) => Err(e),
        }
    }
}
