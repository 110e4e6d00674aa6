use async_trait::async_trait;
use serde_json::json;

use super::Resource;
use crate::client::ApiClient;
use crate::diag::{handle_read_error, ignore_not_found};
use crate::error::ProviderError;
use crate::helpers::{
    cast_slice, cast_slice_int32, get_json, get_p, get_required, list_consistent_merge, set_json,
    set_wrapper,
};
use crate::models::{Group, GroupRequest};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::state::ResourceData;

/// `authentik_group`
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupResource;

fn group_request(data: &ResourceData) -> Result<GroupRequest, ProviderError> {
    Ok(GroupRequest {
        name: get_required(data, "name")?,
        is_superuser: get_p(data, "is_superuser")?.unwrap_or(false),
        parent: get_p(data, "parent")?,
        users: cast_slice_int32(data, "users")?,
        roles: cast_slice(data, "roles")?,
        attributes: get_json(data, "attributes")?.unwrap_or_else(|| json!({})),
    })
}

#[async_trait]
impl Resource for GroupResource {
    fn type_name(&self) -> &'static str {
        "authentik_group"
    }

    fn schema(&self) -> Schema {
        Schema::resource()
            .with_description("Manage groups.")
            .with_attribute("name", Attribute::required_string())
            .with_attribute("is_superuser", Attribute::optional_bool().with_default(json!(false)))
            .with_attribute("parent", Attribute::optional_string())
            .with_attribute(
                "users",
                Attribute::optional_list(AttributeType::Int64).with_description("IDs of member users."),
            )
            .with_attribute("roles", Attribute::optional_list(AttributeType::String))
            .with_attribute("attributes", Attribute::json_string())
    }

    async fn create(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let group: Group = client.post("core/groups/", &group_request(data)?).await?;
        data.set_id(group.pk);
        self.read(client, data).await
    }

    async fn read(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let group: Group = match client.get(&format!("core/groups/{}/", data.id())).await {
            Ok(group) => group,
            Err(e) => return handle_read_error(data, e),
        };

        set_wrapper(data, "name", &group.name)?;
        set_wrapper(data, "is_superuser", group.is_superuser)?;
        set_wrapper(data, "parent", &group.parent)?;
        let local_users = cast_slice_int32(data, "users")?;
        set_wrapper(data, "users", list_consistent_merge(&local_users, &group.users))?;
        let local_roles: Vec<String> = cast_slice(data, "roles")?;
        set_wrapper(data, "roles", list_consistent_merge(&local_roles, &group.roles))?;
        set_json(data, "attributes", &group.attributes)?;
        Ok(())
    }

    async fn update(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let group: Group = client
            .put(&format!("core/groups/{}/", data.id()), &group_request(data)?)
            .await?;
        data.set_id(group.pk);
        self.read(client, data).await
    }

    async fn delete(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        ignore_not_found(client.delete(&format!("core/groups/{}/", data.id())).await)
    }
}
