use async_trait::async_trait;

use super::Resource;
use crate::client::ApiClient;
use crate::diag::{handle_read_error, ignore_not_found};
use crate::error::ProviderError;
use crate::helpers::{get_p, get_required, set_wrapper};
use crate::models::{ScopeMapping, ScopeMappingRequest};
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;

const PATH: &str = "propertymappings/provider/scope/";

/// `authentik_property_mapping_provider_scope`
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeMappingResource;

fn scope_mapping_request(data: &ResourceData) -> Result<ScopeMappingRequest, ProviderError> {
    Ok(ScopeMappingRequest {
        name: get_required(data, "name")?,
        expression: get_required(data, "expression")?,
        scope_name: get_required(data, "scope_name")?,
        description: get_p(data, "description")?,
    })
}

#[async_trait]
impl Resource for ScopeMappingResource {
    fn type_name(&self) -> &'static str {
        "authentik_property_mapping_provider_scope"
    }

    fn schema(&self) -> Schema {
        Schema::resource()
            .with_description("Manage OAuth2 scope mappings.")
            .with_attribute("name", Attribute::required_string())
            .with_attribute("scope_name", Attribute::required_string())
            .with_attribute(
                "expression",
                Attribute::required_string().with_description("Python expression returning the claims."),
            )
            .with_attribute("description", Attribute::optional_string())
    }

    async fn create(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let mapping: ScopeMapping = client.post(PATH, &scope_mapping_request(data)?).await?;
        data.set_id(mapping.pk);
        self.read(client, data).await
    }

    async fn read(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let mapping: ScopeMapping = match client.get(&format!("{}{}/", PATH, data.id())).await {
            Ok(mapping) => mapping,
            Err(e) => return handle_read_error(data, e),
        };

        set_wrapper(data, "name", &mapping.name)?;
        set_wrapper(data, "scope_name", &mapping.scope_name)?;
        set_wrapper(data, "expression", &mapping.expression)?;
        set_wrapper(data, "description", &mapping.description)?;
        Ok(())
    }

    async fn update(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let mapping: ScopeMapping = client
            .put(&format!("{}{}/", PATH, data.id()), &scope_mapping_request(data)?)
            .await?;
        data.set_id(mapping.pk);
        self.read(client, data).await
    }

    async fn delete(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        ignore_not_found(client.delete(&format!("{}{}/", PATH, data.id())).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::FakeApi;
    use serde_json::json;

    fn remote_mapping(description: &str) -> serde_json::Value {
        json!({
            "pk": "m-1",
            "name": "groups",
            "scope_name": "groups",
            "expression": "return {'groups': []}",
            "description": description,
        })
    }

    #[tokio::test]
    async fn test_create_then_update() {
        let api = FakeApi::new();
        api.route("POST", PATH, 201, remote_mapping(""));
        api.route("GET", "propertymappings/provider/scope/m-1/", 200, remote_mapping(""));
        let client = api.client();

        let mut data = ResourceData::from_value(json!({
            "name": "groups",
            "scope_name": "groups",
            "expression": "return {'groups': []}",
        }))
        .unwrap();
        ScopeMappingResource.create(&client, &mut data).await.unwrap();

        let posts = api.bodies("POST");
        assert_eq!(posts[0]["scope_name"], "groups");
        assert!(posts[0].get("description").is_none());
        assert_eq!(data.id(), "m-1");
        assert_eq!(data.get("description"), Some(&json!("")));

        api.route("PUT", "propertymappings/provider/scope/m-1/", 200, remote_mapping("Group claims"));
        api.route("GET", "propertymappings/provider/scope/m-1/", 200, remote_mapping("Group claims"));
        data.set("description", json!("Group claims"));
        ScopeMappingResource.update(&client, &mut data).await.unwrap();

        let puts = api.bodies("PUT");
        assert_eq!(puts[0]["description"], "Group claims");
        assert_eq!(data.get("description"), Some(&json!("Group claims")));
    }

    #[tokio::test]
    async fn test_read_and_delete_tolerate_missing() {
        let api = FakeApi::new();
        let client = api.client();

        let mut data = ResourceData::from_value(json!({"id": "gone", "name": "x"})).unwrap();
        ScopeMappingResource.read(&client, &mut data).await.unwrap();
        assert!(!data.exists());

        let mut data = ResourceData::with_id("gone");
        ScopeMappingResource.delete(&client, &mut data).await.unwrap();
    }
}
