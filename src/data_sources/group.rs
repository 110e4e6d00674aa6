use async_trait::async_trait;

use super::{single, DataSource};
use crate::client::ApiClient;
use crate::error::ProviderError;
use crate::helpers::{get_p, set_json, set_wrapper};
use crate::models::Group;
use crate::schema::{Attribute, AttributeType, Schema};
use crate::state::ResourceData;

/// Look up a group by `pk` or `name`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupDataSource;

#[async_trait]
impl DataSource for GroupDataSource {
    fn type_name(&self) -> &'static str {
        "authentik_group"
    }

    fn schema(&self) -> Schema {
        Schema::resource()
            .with_description("Get a group by primary key or name.")
            .with_attribute("pk", Attribute::optional_computed_string())
            .with_attribute("name", Attribute::optional_computed_string())
            .with_attribute("num_pk", Attribute::computed_int64())
            .with_attribute("is_superuser", Attribute::computed_bool())
            .with_attribute("parent", Attribute::computed_string())
            .with_attribute("users", Attribute::computed_list(AttributeType::Int64))
            .with_attribute("roles", Attribute::computed_list(AttributeType::String))
            .with_attribute("attributes", Attribute::computed_string())
    }

    async fn read(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let group: Group = match (get_p::<String>(data, "pk")?, get_p::<String>(data, "name")?) {
            (Some(pk), _) => client.get(&format!("core/groups/{}/", pk)).await?,
            (None, Some(name)) => {
                let groups = client.list("core/groups/", &[("name", name.clone())]).await?;
                single(groups, &format!("group named '{}'", name))?
            }
            (None, None) => {
                return Err(ProviderError::Validation(
                    "one of 'pk' or 'name' must be set".to_string(),
                ))
            }
        };

        data.set_id(group.pk.clone());
        set_wrapper(data, "pk", &group.pk)?;
        set_wrapper(data, "num_pk", group.num_pk)?;
        set_wrapper(data, "name", &group.name)?;
        set_wrapper(data, "is_superuser", group.is_superuser)?;
        set_wrapper(data, "parent", &group.parent)?;
        set_wrapper(data, "users", &group.users)?;
        set_wrapper(data, "roles", &group.roles)?;
        set_json(data, "attributes", &group.attributes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::FakeApi;
    use serde_json::json;

    #[tokio::test]
    async fn test_lookup_by_pk() {
        let api = FakeApi::new();
        api.route(
            "GET",
            "core/groups/g-1/",
            200,
            json!({"pk": "g-1", "num_pk": 3, "name": "authentik Admins", "is_superuser": true, "users": [1]}),
        );

        let mut data = ResourceData::from_value(json!({"pk": "g-1"})).unwrap();
        GroupDataSource.read(&api.client(), &mut data).await.unwrap();
        assert_eq!(data.id(), "g-1");
        assert_eq!(data.get("name"), Some(&json!("authentik Admins")));
        assert_eq!(data.get("users"), Some(&json!([1])));
    }

    #[tokio::test]
    async fn test_ambiguous_name() {
        let api = FakeApi::new();
        api.route(
            "GET",
            "core/groups/",
            200,
            json!({"results": [{"pk": "a", "name": "ops"}, {"pk": "b", "name": "ops"}]}),
        );

        let mut data = ResourceData::from_value(json!({"name": "ops"})).unwrap();
        let err = GroupDataSource.read(&api.client(), &mut data).await.unwrap_err();
        assert!(err.to_string().contains("matched 2"));
    }
}
