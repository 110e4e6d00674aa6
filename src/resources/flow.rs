use async_trait::async_trait;
use serde_json::json;

use super::{Resource, POLICY_ENGINE_MODES};
use crate::client::ApiClient;
use crate::diag::{handle_read_error, ignore_not_found};
use crate::error::ProviderError;
use crate::helpers::{get_p, get_required, set_wrapper};
use crate::models::{Flow, FlowRequest};
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;

pub(crate) const DESIGNATIONS: &[&str] = &[
    "authentication",
    "authorization",
    "invalidation",
    "enrollment",
    "unenrollment",
    "recovery",
    "stage_configuration",
];

const AUTHENTICATION: &[&str] = &[
    "none",
    "require_authenticated",
    "require_unauthenticated",
    "require_superuser",
    "require_redirect",
    "require_outpost",
];

const LAYOUTS: &[&str] = &[
    "stacked",
    "content_left",
    "content_right",
    "sidebar_left",
    "sidebar_right",
];

const DENIED_ACTIONS: &[&str] = &["message_continue", "message", "continue"];

/// `authentik_flow`, identified by its slug.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowResource;

fn flow_request(data: &ResourceData) -> Result<FlowRequest, ProviderError> {
    Ok(FlowRequest {
        slug: get_required(data, "slug")?,
        name: get_required(data, "name")?,
        title: get_required(data, "title")?,
        designation: get_required(data, "designation")?,
        authentication: get_p(data, "authentication")?,
        layout: get_p(data, "layout")?,
        policy_engine_mode: get_p(data, "policy_engine_mode")?,
        denied_action: get_p(data, "denied_action")?,
        compatibility_mode: get_p(data, "compatibility_mode")?.unwrap_or(false),
    })
}

/// Write a fetched flow into the store. Shared with the flow data source.
pub(crate) fn write_flow(data: &mut ResourceData, flow: &Flow) -> Result<(), ProviderError> {
    set_wrapper(data, "uuid", &flow.pk)?;
    set_wrapper(data, "slug", &flow.slug)?;
    set_wrapper(data, "name", &flow.name)?;
    set_wrapper(data, "title", &flow.title)?;
    set_wrapper(data, "designation", &flow.designation)?;
    set_wrapper(data, "authentication", &flow.authentication)?;
    set_wrapper(data, "layout", &flow.layout)?;
    set_wrapper(data, "policy_engine_mode", &flow.policy_engine_mode)?;
    set_wrapper(data, "denied_action", &flow.denied_action)?;
    set_wrapper(data, "compatibility_mode", flow.compatibility_mode)?;
    Ok(())
}

#[async_trait]
impl Resource for FlowResource {
    fn type_name(&self) -> &'static str {
        "authentik_flow"
    }

    fn schema(&self) -> Schema {
        Schema::resource()
            .with_description("Manage flows.")
            .with_attribute("uuid", Attribute::computed_string())
            .with_attribute("slug", Attribute::required_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("title", Attribute::required_string())
            .with_attribute("designation", Attribute::required_string().one_of(DESIGNATIONS))
            .with_attribute(
                "authentication",
                Attribute::optional_string()
                    .with_default(json!("none"))
                    .one_of(AUTHENTICATION),
            )
            .with_attribute(
                "layout",
                Attribute::optional_string()
                    .with_default(json!("stacked"))
                    .one_of(LAYOUTS),
            )
            .with_attribute(
                "policy_engine_mode",
                Attribute::optional_string()
                    .with_default(json!("any"))
                    .one_of(POLICY_ENGINE_MODES),
            )
            .with_attribute(
                "denied_action",
                Attribute::optional_string()
                    .with_default(json!("message_continue"))
                    .one_of(DENIED_ACTIONS),
            )
            .with_attribute(
                "compatibility_mode",
                Attribute::optional_bool().with_default(json!(false)),
            )
    }

    async fn create(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let flow: Flow = client.post("flows/instances/", &flow_request(data)?).await?;
        data.set_id(flow.slug);
        self.read(client, data).await
    }

    async fn read(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let flow: Flow = match client.get(&format!("flows/instances/{}/", data.id())).await {
            Ok(flow) => flow,
            Err(e) => return handle_read_error(data, e),
        };
        write_flow(data, &flow)
    }

    async fn update(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        // The id is the slug before the update, which may rename it.
        let flow: Flow = client
            .put(&format!("flows/instances/{}/", data.id()), &flow_request(data)?)
            .await?;
        data.set_id(flow.slug);
        self.read(client, data).await
    }

    async fn delete(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        ignore_not_found(client.delete(&format!("flows/instances/{}/", data.id())).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::FakeApi;

    fn remote_flow(slug: &str) -> serde_json::Value {
        json!({
            "pk": "f-uuid",
            "slug": slug,
            "name": "Login",
            "title": "Welcome",
            "designation": "authentication",
            "authentication": "none",
            "layout": "stacked",
            "policy_engine_mode": "any",
            "denied_action": "message_continue",
            "compatibility_mode": false,
        })
    }

    #[tokio::test]
    async fn test_rename_moves_id_to_new_slug() {
        let api = FakeApi::new();
        api.route("PUT", "flows/instances/login/", 200, remote_flow("sign-in"));
        api.route("GET", "flows/instances/sign-in/", 200, remote_flow("sign-in"));

        let mut data = ResourceData::from_value(json!({
            "id": "login",
            "slug": "sign-in",
            "name": "Login",
            "title": "Welcome",
            "designation": "authentication",
        }))
        .unwrap();
        FlowResource.update(&api.client(), &mut data).await.unwrap();

        assert_eq!(data.id(), "sign-in");
        assert_eq!(data.get("uuid"), Some(&json!("f-uuid")));
        assert_eq!(data.get("layout"), Some(&json!("stacked")));
    }

    #[tokio::test]
    async fn test_import_by_slug() {
        let api = FakeApi::new();
        api.route("GET", "flows/instances/login/", 200, remote_flow("login"));

        let data = FlowResource.import(&api.client(), "login").await.unwrap();
        assert_eq!(data.get("title"), Some(&json!("Welcome")));

        let err = FlowResource.import(&api.client(), "missing").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }
}
