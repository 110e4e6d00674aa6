use async_trait::async_trait;
use serde_json::json;

use super::Resource;
use crate::client::ApiClient;
use crate::diag::{handle_read_error, ignore_not_found};
use crate::error::ProviderError;
use crate::helpers::{get_json, get_p, get_required, set_json, set_wrapper};
use crate::models::{Brand, BrandRequest};
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;

const FLOW_FIELDS: &[&str] = &[
    "flow_authentication",
    "flow_invalidation",
    "flow_recovery",
    "flow_unenrollment",
    "flow_user_settings",
    "flow_device_code",
];

/// `authentik_brand`
#[derive(Debug, Clone, Copy, Default)]
pub struct BrandResource;

fn brand_request(data: &ResourceData) -> Result<BrandRequest, ProviderError> {
    Ok(BrandRequest {
        domain: get_required(data, "domain")?,
        default: get_p(data, "default")?.unwrap_or(false),
        branding_title: get_p(data, "branding_title")?,
        branding_logo: get_p(data, "branding_logo")?,
        branding_favicon: get_p(data, "branding_favicon")?,
        flow_authentication: get_p(data, "flow_authentication")?,
        flow_invalidation: get_p(data, "flow_invalidation")?,
        flow_recovery: get_p(data, "flow_recovery")?,
        flow_unenrollment: get_p(data, "flow_unenrollment")?,
        flow_user_settings: get_p(data, "flow_user_settings")?,
        flow_device_code: get_p(data, "flow_device_code")?,
        default_application: get_p(data, "default_application")?,
        web_certificate: get_p(data, "web_certificate")?,
        attributes: get_json(data, "attributes")?.unwrap_or_else(|| json!({})),
    })
}

#[async_trait]
impl Resource for BrandResource {
    fn type_name(&self) -> &'static str {
        "authentik_brand"
    }

    fn schema(&self) -> Schema {
        let mut schema = Schema::resource()
            .with_description("Manage brands, the per-domain look and default flows.")
            .with_attribute("domain", Attribute::required_string())
            .with_attribute("default", Attribute::optional_bool().with_default(json!(false)))
            .with_attribute(
                "branding_title",
                Attribute::optional_string().with_default(json!("authentik")),
            )
            .with_attribute(
                "branding_logo",
                Attribute::optional_string()
                    .with_default(json!("/static/dist/assets/icons/icon_left_brand.svg")),
            )
            .with_attribute(
                "branding_favicon",
                Attribute::optional_string().with_default(json!("/static/dist/assets/icons/icon.png")),
            )
            .with_attribute("default_application", Attribute::optional_string())
            .with_attribute("web_certificate", Attribute::optional_string())
            .with_attribute("attributes", Attribute::json_string());
        for field in FLOW_FIELDS {
            schema = schema.with_attribute(*field, Attribute::optional_string());
        }
        schema
    }

    async fn create(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let brand: Brand = client.post("core/brands/", &brand_request(data)?).await?;
        data.set_id(brand.brand_uuid);
        self.read(client, data).await
    }

    async fn read(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let brand: Brand = match client.get(&format!("core/brands/{}/", data.id())).await {
            Ok(brand) => brand,
            Err(e) => return handle_read_error(data, e),
        };

        set_wrapper(data, "domain", &brand.domain)?;
        set_wrapper(data, "default", brand.default)?;
        set_wrapper(data, "branding_title", &brand.branding_title)?;
        set_wrapper(data, "branding_logo", &brand.branding_logo)?;
        set_wrapper(data, "branding_favicon", &brand.branding_favicon)?;
        set_wrapper(data, "flow_authentication", &brand.flow_authentication)?;
        set_wrapper(data, "flow_invalidation", &brand.flow_invalidation)?;
        set_wrapper(data, "flow_recovery", &brand.flow_recovery)?;
        set_wrapper(data, "flow_unenrollment", &brand.flow_unenrollment)?;
        set_wrapper(data, "flow_user_settings", &brand.flow_user_settings)?;
        set_wrapper(data, "flow_device_code", &brand.flow_device_code)?;
        set_wrapper(data, "default_application", &brand.default_application)?;
        set_wrapper(data, "web_certificate", &brand.web_certificate)?;
        set_json(data, "attributes", &brand.attributes)?;
        Ok(())
    }

    async fn update(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let brand: Brand = client
            .put(&format!("core/brands/{}/", data.id()), &brand_request(data)?)
            .await?;
        data.set_id(brand.brand_uuid);
        self.read(client, data).await
    }

    async fn delete(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        ignore_not_found(client.delete(&format!("core/brands/{}/", data.id())).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::FakeApi;

    #[test]
    fn test_schema_has_flow_references() {
        let schema = BrandResource.schema();
        for field in FLOW_FIELDS {
            assert!(schema.attributes[*field].flags.optional, "{}", field);
        }
    }

    #[tokio::test]
    async fn test_create_with_failing_api() {
        let api = FakeApi::new();
        api.route("POST", "core/brands/", 400, json!({"domain": ["brand with this domain already exists."]}));

        let mut data = ResourceData::from_value(json!({"domain": "auth.example.com"})).unwrap();
        let err = BrandResource.create(&api.client(), &mut data).await.unwrap_err();
        let diags = err.to_diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("400"));
        assert!(diags[0].detail.as_deref().unwrap().contains("already exists"));
        assert!(!data.exists());
    }
}
