use async_trait::async_trait;
use serde_json::json;

use super::{Resource, POLICY_ENGINE_MODES};
use crate::client::ApiClient;
use crate::diag::{handle_read_error, ignore_not_found};
use crate::error::ProviderError;
use crate::helpers::{cast_slice_int32, get_int32, get_p, get_required, list_consistent_merge, set_wrapper};
use crate::models::{Application, ApplicationRequest};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::state::ResourceData;

/// `authentik_application`, identified by its slug.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationResource;

fn application_request(data: &ResourceData) -> Result<ApplicationRequest, ProviderError> {
    Ok(ApplicationRequest {
        name: get_required(data, "name")?,
        slug: get_required(data, "slug")?,
        provider: get_int32(data, "protocol_provider")?,
        backchannel_providers: cast_slice_int32(data, "backchannel_providers")?,
        group: get_p(data, "group")?,
        open_in_new_tab: get_p(data, "open_in_new_tab")?.unwrap_or(false),
        meta_launch_url: get_p(data, "meta_launch_url")?,
        meta_description: get_p(data, "meta_description")?,
        meta_publisher: get_p(data, "meta_publisher")?,
        policy_engine_mode: get_p(data, "policy_engine_mode")?,
    })
}

#[async_trait]
impl Resource for ApplicationResource {
    fn type_name(&self) -> &'static str {
        "authentik_application"
    }

    fn schema(&self) -> Schema {
        Schema::resource()
            .with_description("Manage applications.")
            .with_attribute("uuid", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("slug", Attribute::required_string())
            .with_attribute("protocol_provider", Attribute::optional_int64())
            .with_attribute(
                "backchannel_providers",
                Attribute::optional_list(AttributeType::Int64),
            )
            .with_attribute("group", Attribute::optional_string())
            .with_attribute("open_in_new_tab", Attribute::optional_bool().with_default(json!(false)))
            .with_attribute("meta_launch_url", Attribute::optional_string())
            .with_attribute("meta_description", Attribute::optional_string())
            .with_attribute("meta_publisher", Attribute::optional_string())
            .with_attribute(
                "policy_engine_mode",
                Attribute::optional_string()
                    .with_default(json!("any"))
                    .one_of(POLICY_ENGINE_MODES),
            )
    }

    async fn create(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let app: Application = client
            .post("core/applications/", &application_request(data)?)
            .await?;
        data.set_id(app.slug);
        self.read(client, data).await
    }

    async fn read(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let app: Application = match client.get(&format!("core/applications/{}/", data.id())).await {
            Ok(app) => app,
            Err(e) => return handle_read_error(data, e),
        };

        set_wrapper(data, "uuid", &app.pk)?;
        set_wrapper(data, "name", &app.name)?;
        set_wrapper(data, "slug", &app.slug)?;
        set_wrapper(data, "protocol_provider", app.provider)?;
        let local = cast_slice_int32(data, "backchannel_providers")?;
        set_wrapper(
            data,
            "backchannel_providers",
            list_consistent_merge(&local, &app.backchannel_providers),
        )?;
        set_wrapper(data, "group", &app.group)?;
        set_wrapper(data, "open_in_new_tab", app.open_in_new_tab)?;
        set_wrapper(data, "meta_launch_url", &app.meta_launch_url)?;
        set_wrapper(data, "meta_description", &app.meta_description)?;
        set_wrapper(data, "meta_publisher", &app.meta_publisher)?;
        set_wrapper(data, "policy_engine_mode", &app.policy_engine_mode)?;
        Ok(())
    }

    async fn update(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let app: Application = client
            .put(
                &format!("core/applications/{}/", data.id()),
                &application_request(data)?,
            )
            .await?;
        data.set_id(app.slug);
        self.read(client, data).await
    }

    async fn delete(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        ignore_not_found(
            client
                .delete(&format!("core/applications/{}/", data.id()))
                .await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::FakeApi;

    fn remote_app(backchannel: &[i32]) -> serde_json::Value {
        json!({
            "pk": "a-uuid",
            "name": "Grafana",
            "slug": "grafana",
            "provider": 4,
            "backchannel_providers": backchannel,
            "group": "",
            "open_in_new_tab": false,
            "meta_launch_url": "",
            "meta_description": "",
            "meta_publisher": "",
            "policy_engine_mode": "any",
        })
    }

    #[tokio::test]
    async fn test_create_maps_protocol_provider() {
        let api = FakeApi::new();
        api.route("POST", "core/applications/", 201, remote_app(&[9, 8]));
        api.route("GET", "core/applications/grafana/", 200, remote_app(&[9, 8]));

        let mut data = ResourceData::from_value(json!({
            "name": "Grafana",
            "slug": "grafana",
            "protocol_provider": 4,
            "backchannel_providers": [8, 9],
        }))
        .unwrap();
        ApplicationResource.create(&api.client(), &mut data).await.unwrap();

        assert_eq!(api.bodies("POST")[0]["provider"], 4);
        assert_eq!(data.id(), "grafana");
        assert_eq!(data.get("protocol_provider"), Some(&json!(4)));
        assert_eq!(data.get("backchannel_providers"), Some(&json!([8, 9])));
    }

    #[tokio::test]
    async fn test_out_of_range_provider_is_rejected() {
        let api = FakeApi::new();
        let mut data = ResourceData::from_value(json!({
            "name": "Grafana",
            "slug": "grafana",
            "protocol_provider": 5_000_000_000i64,
        }))
        .unwrap();
        let err = ApplicationResource.create(&api.client(), &mut data).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }
}
