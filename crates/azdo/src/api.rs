//! REST adapter for Azure DevOps Services.
//!
//! Implements [`RemoteResourceClient`] over the organization REST API using
//! [`reqwest`]. Every request carries the PAT as basic-auth password and the
//! configured `api-version`. Identity search lives on the `vssps` host.

use async_trait::async_trait;
use devhub_core::types::{ExternalOperation, OperationStatus, ResourceKind};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;

use crate::client::{
    BoardDocument, Created, RemoteError, RemoteResource, RemoteResourceClient, Scope,
    SettingsTarget,
};
use crate::config::AzdoConfig;

/// `api-version` for endpoints that are only published as previews.
const PREVIEW_API_VERSION: &str = "7.1-preview.1";

/// HTTP client for one Azure DevOps organization.
pub struct AzureDevOpsApi {
    client: reqwest::Client,
    base_url: String,
    identity_url: String,
    api_version: String,
    pat: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Host {
    Organization,
    Identity,
}

/// A request target before it is turned into a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Endpoint {
    host: Host,
    segments: Vec<String>,
    query: Vec<(&'static str, String)>,
    preview: bool,
}

impl Endpoint {
    fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            host: Host::Organization,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            preview: false,
        }
    }

    fn push(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Append a slash-separated path, skipping empty parts.
    fn push_path(mut self, path: &str) -> Self {
        self.segments.extend(
            path.split(['/', '\\'])
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
        self
    }

    fn query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    fn preview(mut self) -> Self {
        self.preview = true;
        self
    }

    fn on_identity_host(mut self) -> Self {
        self.host = Host::Identity;
        self
    }
}

/// Map a non-success status onto [`RemoteError`].
///
/// 409, and 400 responses saying the resource "already exists", are
/// conflicts.
pub fn classify_status(status: u16, body: String) -> RemoteError {
    match status {
        404 => RemoteError::NotFound,
        409 => RemoteError::Conflict(body),
        400 if body.to_ascii_lowercase().contains("already exists") => RemoteError::Conflict(body),
        _ => RemoteError::Api { status, body },
    }
}

fn require_project<'a>(kind: ResourceKind, scope: &'a Scope) -> Result<&'a str, RemoteError> {
    scope
        .project
        .as_deref()
        .ok_or_else(|| RemoteError::Unsupported(format!("{kind} requires a project scope")))
}

fn classification_root(kind: ResourceKind) -> Option<&'static str> {
    match kind {
        ResourceKind::Iteration => Some("Iterations"),
        ResourceKind::Area => Some("Areas"),
        _ => None,
    }
}

/// Endpoint listing (and creating) resources of `kind` in `scope`.
fn collection(kind: ResourceKind, scope: &Scope) -> Result<Endpoint, RemoteError> {
    let endpoint = match kind {
        ResourceKind::Project => Endpoint::new(["_apis", "projects"]),
        ResourceKind::Team => {
            let project = require_project(kind, scope)?;
            Endpoint::new(["_apis", "projects", project, "teams"])
        }
        ResourceKind::Iteration | ResourceKind::Area => {
            let project = require_project(kind, scope)?;
            let root = classification_root(kind).unwrap_or_default();
            let endpoint = Endpoint::new([project, "_apis", "wit", "classificationnodes", root]);
            match &scope.parent_path {
                Some(path) => endpoint.push_path(path),
                None => endpoint,
            }
        }
        ResourceKind::Board => {
            let project = require_project(kind, scope)?;
            let team = scope
                .team
                .as_deref()
                .ok_or_else(|| RemoteError::Unsupported("board requires a team scope".into()))?;
            Endpoint::new([project, team, "_apis", "work", "boards"])
        }
        ResourceKind::Repository => {
            let project = require_project(kind, scope)?;
            Endpoint::new([project, "_apis", "git", "repositories"])
        }
        ResourceKind::Policy => {
            let project = require_project(kind, scope)?;
            Endpoint::new([project, "_apis", "policy", "configurations"])
        }
    };
    Ok(endpoint)
}

/// Endpoint addressing one resource by name (or id for policies).
fn item(kind: ResourceKind, scope: &Scope, key: &str) -> Result<Endpoint, RemoteError> {
    Ok(collection(kind, scope)?.push(key))
}

fn settings_endpoint(target: &SettingsTarget) -> Endpoint {
    match target {
        SettingsTarget::Team { project, team_id } => {
            Endpoint::new(["_apis", "projects", project.as_str(), "teams", team_id.as_str()])
        }
        SettingsTarget::TeamSettings { project, team_id } => {
            Endpoint::new([project.as_str(), team_id.as_str(), "_apis", "work", "teamsettings"])
        }
        SettingsTarget::Board {
            project,
            team_id,
            board,
            document,
        } => Endpoint::new([
            project.as_str(),
            team_id.as_str(),
            "_apis",
            "work",
            "boards",
            board.as_str(),
            document.segment(),
        ]),
        SettingsTarget::RepositoryRefs {
            project,
            repository_id,
        } => Endpoint::new([
            project.as_str(),
            "_apis",
            "git",
            "repositories",
            repository_id.as_str(),
            "refs",
        ])
        .query("filter", "heads/main"),
        SettingsTarget::RepositoryPush {
            project,
            repository_id,
        } => Endpoint::new([
            project.as_str(),
            "_apis",
            "git",
            "repositories",
            repository_id.as_str(),
            "pushes",
        ]),
        SettingsTarget::Identities { search } => Endpoint::new(["_apis", "identities"])
            .query("searchFilter", "General")
            .query("filterValue", search.as_str())
            .on_identity_host()
            .preview(),
        SettingsTarget::AccessControlEntries { namespace_id } => {
            Endpoint::new(["_apis", "accesscontrolentries", namespace_id.as_str()]).preview()
        }
    }
}

/// Verb used to write a settings document.
fn write_method(target: &SettingsTarget) -> Result<Method, RemoteError> {
    let method = match target {
        SettingsTarget::Team { .. } | SettingsTarget::TeamSettings { .. } => Method::PATCH,
        SettingsTarget::Board { document, .. } => match document {
            BoardDocument::CardRules => Method::PATCH,
            BoardDocument::Cards | BoardDocument::Columns | BoardDocument::Rows => Method::PUT,
        },
        SettingsTarget::RepositoryRefs { .. }
        | SettingsTarget::RepositoryPush { .. }
        | SettingsTarget::AccessControlEntries { .. } => Method::POST,
        SettingsTarget::Identities { .. } => {
            return Err(RemoteError::Unsupported("identities are read-only".into()))
        }
    };
    Ok(method)
}

fn readable(target: &SettingsTarget) -> bool {
    !matches!(
        target,
        SettingsTarget::RepositoryPush { .. } | SettingsTarget::AccessControlEntries { .. }
    )
}

/// Pull the resource array out of a list response.
fn list_items(kind: ResourceKind, body: Option<Value>) -> Result<Vec<RemoteResource>, RemoteError> {
    let field = if classification_root(kind).is_some() {
        "children"
    } else {
        "value"
    };
    let items = match body {
        Some(Value::Object(mut obj)) => match obj.remove(field) {
            Some(Value::Array(items)) => items,
            // Leaf classification nodes have no `children` key.
            None => Vec::new(),
            Some(other) => {
                return Err(RemoteError::Decode(format!("`{field}` is not an array: {other}")))
            }
        },
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => Vec::new(),
        Some(other) => return Err(RemoteError::Decode(format!("unexpected list body: {other}"))),
    };
    items.into_iter().map(RemoteResource::from_json).collect()
}

fn operation_from_json(body: &Value) -> Result<ExternalOperation, RemoteError> {
    let id = body
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| RemoteError::Decode(format!("operation without id: {body}")))?;
    let status = body
        .get("status")
        .and_then(Value::as_str)
        .map(OperationStatus::from_remote)
        .unwrap_or(OperationStatus::Pending);
    Ok(ExternalOperation {
        id: id.to_string(),
        status,
    })
}

impl AzureDevOpsApi {
    /// Build an adapter with its own connection pool.
    pub fn new(config: &AzdoConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Build an adapter reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &AzdoConfig) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let identity_url = base_url.replacen("://dev.azure.com/", "://vssps.dev.azure.com/", 1);
        Self {
            client,
            base_url,
            identity_url,
            api_version: config.api_version.clone(),
            pat: config.pat.clone(),
        }
    }

    fn url(&self, endpoint: &Endpoint) -> Result<Url, RemoteError> {
        let base = match endpoint.host {
            Host::Organization => &self.base_url,
            Host::Identity => &self.identity_url,
        };
        let mut url = Url::parse(base)
            .map_err(|e| RemoteError::Unsupported(format!("invalid base url {base}: {e}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| RemoteError::Unsupported(format!("base url {base} cannot hold a path")))?;
            segments.pop_if_empty();
            segments.extend(endpoint.segments.iter());
        }
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &endpoint.query {
                pairs.append_pair(key, value);
            }
            let version = if endpoint.preview {
                PREVIEW_API_VERSION
            } else {
                self.api_version.as_str()
            };
            pairs.append_pair("api-version", version);
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &Endpoint,
        body: Option<&Value>,
    ) -> Result<Option<Value>, RemoteError> {
        let url = self.url(endpoint)?;
        tracing::debug!(method = method.as_str(), url = url.as_str(), "Remote request");

        let mut request = self
            .client
            .request(method, url)
            .basic_auth("", Some(&self.pat));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        Self::read_json(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, classifying failures.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(classify_status(status.as_u16(), body));
        }
        Ok(response)
    }

    /// Parse a successful response body. Empty bodies and 204 yield `None`.
    async fn read_json(response: reqwest::Response) -> Result<Option<Value>, RemoteError> {
        let response = Self::ensure_success(response).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RemoteResourceClient for AzureDevOpsApi {
    async fn get_by_name(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        name: &str,
    ) -> Result<Option<RemoteResource>, RemoteError> {
        if kind == ResourceKind::Policy {
            return Err(RemoteError::Unsupported("policies are not addressable by name".into()));
        }
        match self.send(Method::GET, &item(kind, scope, name)?, None).await {
            Ok(Some(body)) => RemoteResource::from_json(body).map(Some),
            Ok(None) | Err(RemoteError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list(
        &self,
        kind: ResourceKind,
        scope: &Scope,
    ) -> Result<Vec<RemoteResource>, RemoteError> {
        let mut endpoint = collection(kind, scope)?;
        if classification_root(kind).is_some() {
            endpoint = endpoint.query("$depth", "1");
        }
        let body = self.send(Method::GET, &endpoint, None).await?;
        list_items(kind, body)
    }

    async fn create(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        payload: &Value,
    ) -> Result<Created, RemoteError> {
        let body = self
            .send(Method::POST, &collection(kind, scope)?, Some(payload))
            .await?
            .ok_or_else(|| RemoteError::Decode(format!("empty response creating {kind}")))?;

        // Project creation is queued; everything else returns the resource.
        if kind == ResourceKind::Project {
            return operation_from_json(&body).map(Created::Operation);
        }
        RemoteResource::from_json(body).map(Created::Resource)
    }

    async fn get_operation_status(&self, operation_id: &str) -> Result<OperationStatus, RemoteError> {
        let endpoint = Endpoint::new(["_apis", "operations", operation_id]);
        let body = self
            .send(Method::GET, &endpoint, None)
            .await?
            .ok_or_else(|| RemoteError::Decode("empty operation response".into()))?;
        Ok(operation_from_json(&body)?.status)
    }

    async fn get_settings(&self, target: &SettingsTarget) -> Result<Value, RemoteError> {
        if !readable(target) {
            return Err(RemoteError::Unsupported(format!(
                "{} is write-only",
                target.describe()
            )));
        }
        Ok(self
            .send(Method::GET, &settings_endpoint(target), None)
            .await?
            .unwrap_or(Value::Null))
    }

    async fn patch_settings(&self, target: &SettingsTarget, payload: &Value) -> Result<(), RemoteError> {
        let method = write_method(target)?;
        self.send(method, &settings_endpoint(target), Some(payload))
            .await?;
        Ok(())
    }

    async fn delete(&self, kind: ResourceKind, scope: &Scope, key: &str) -> Result<(), RemoteError> {
        self.send(Method::DELETE, &item(kind, scope, key)?, None).await?;
        Ok(())
    }
}
