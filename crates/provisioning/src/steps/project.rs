use chrono::{DateTime, Utc};
use devhub_azdo::client::{Created, Scope};
use devhub_azdo::resolver::Resolved;
use devhub_core::types::{ProvisioningRequest, ResourceKind};
use serde_json::{json, Value};

use super::Context;
use crate::error::StepFailure;

/// Creation payload for a private Git project.
///
/// Without a description one is generated from `now`.
pub(crate) fn project_payload(request: &ProvisioningRequest, now: DateTime<Utc>) -> Value {
    let description = request.description.clone().unwrap_or_else(|| {
        format!(
            "Project provisioned automatically at {}",
            now.format("%H:%M:%S %d/%m/%Y")
        )
    });
    json!({
        "name": request.project_name,
        "description": description,
        "visibility": "private",
        "capabilities": {
            "versioncontrol": { "sourceControlType": "Git" },
            "processTemplate": {
                "templateTypeId": request.process_template.template_type_id(),
            },
        },
    })
}

/// Look the project up; create it and wait for the queued operation when
/// absent.
pub(crate) async fn resolve_project(ctx: &Context<'_>) -> Result<Resolved, StepFailure> {
    let scope = &Scope::organization();
    let name = ctx.project_name();

    ctx.resolver
        .resolve_or_create::<_, _, StepFailure>(ResourceKind::Project, scope, name, move || async move {
            let payload = project_payload(ctx.request, Utc::now());
            let operation = match ctx.client.create(ResourceKind::Project, scope, &payload).await? {
                Created::Operation(operation) => operation,
                Created::Resource(project) => return Ok(project.to_ref(ResourceKind::Project)),
            };

            tracing::info!(project = name, operation_id = %operation.id, "Project creation queued");
            ctx.poller
                .wait(&operation.id, &ctx.config.operation_poll)
                .await?;

            let project = ctx
                .client
                .get_by_name(ResourceKind::Project, scope, name)
                .await?
                .ok_or_else(|| {
                    StepFailure::Precondition(format!("project {name} not found after creation"))
                })?;
            Ok(project.to_ref(ResourceKind::Project))
        })
        .await
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};
    use devhub_core::types::ProcessTemplate;

    use super::*;

    fn request() -> ProvisioningRequest {
        ProvisioningRequest::new("Atlas", "Atlas Core", NaiveDate::from_ymd_opt(2025, 1, 6).unwrap())
    }

    #[test]
    fn generated_description_carries_timestamp() {
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 9, 5, 7).unwrap();
        let payload = project_payload(&request(), now);
        assert_eq!(
            payload["description"],
            "Project provisioned automatically at 09:05:07 04/03/2025"
        );
        assert_eq!(payload["visibility"], "private");
        assert_eq!(
            payload["capabilities"]["versioncontrol"]["sourceControlType"],
            "Git"
        );
    }

    #[test]
    fn explicit_description_and_template_are_used() {
        let mut req = request();
        req.description = Some("Payments platform".into());
        req.process_template = ProcessTemplate::Agile;
        let payload = project_payload(&req, Utc::now());
        assert_eq!(payload["description"], "Payments platform");
        assert_eq!(
            payload["capabilities"]["processTemplate"]["templateTypeId"],
            ProcessTemplate::Agile.template_type_id()
        );
    }
}
