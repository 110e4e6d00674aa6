use async_trait::async_trait;

use super::DataSource;
use crate::client::ApiClient;
use crate::error::ProviderError;
use crate::helpers::get_required;
use crate::models::Flow;
use crate::resources::write_flow;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;

/// Look up a flow by slug.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowDataSource;

#[async_trait]
impl DataSource for FlowDataSource {
    fn type_name(&self) -> &'static str {
        "authentik_flow"
    }

    fn schema(&self) -> Schema {
        let mut schema = Schema::resource()
            .with_description("Get a flow by slug.")
            .with_attribute("slug", Attribute::required_string());
        for name in [
            "uuid",
            "name",
            "title",
            "designation",
            "authentication",
            "layout",
            "policy_engine_mode",
            "denied_action",
        ] {
            schema = schema.with_attribute(name, Attribute::computed_string());
        }
        schema.with_attribute("compatibility_mode", Attribute::computed_bool())
    }

    async fn read(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let slug: String = get_required(data, "slug")?;
        let flow: Flow = client
            .get(&format!("flows/instances/{}/", slug))
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    ProviderError::NotFound(format!("no flow with slug '{}'", slug))
                } else {
                    e
                }
            })?;
        data.set_id(flow.slug.clone());
        write_flow(data, &flow)
    }
}
