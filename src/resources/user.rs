use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{numeric_id, Resource};
use crate::client::ApiClient;
use crate::diag::{handle_read_error, ignore_not_found};
use crate::error::ProviderError;
use crate::helpers::{cast_slice, get_json, get_p, get_required, list_consistent_merge, set_json, set_wrapper};
use crate::models::{User, UserPasswordSetRequest, UserRequest};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::state::ResourceData;

const USER_TYPES: &[&str] = &["internal", "external", "service_account", "internal_service_account"];

/// `authentik_user`
#[derive(Debug, Clone, Copy, Default)]
pub struct UserResource;

fn user_request(data: &ResourceData) -> Result<UserRequest, ProviderError> {
    Ok(UserRequest {
        username: get_required(data, "username")?,
        name: get_required(data, "name")?,
        is_active: get_p(data, "is_active")?,
        email: get_p(data, "email")?,
        path: get_p(data, "path")?,
        user_type: get_p(data, "type")?,
        attributes: get_json(data, "attributes")?.unwrap_or_else(|| json!({})),
        groups: cast_slice(data, "groups")?,
    })
}

async fn set_password(client: &ApiClient, data: &ResourceData) -> Result<(), ProviderError> {
    if let Some(password) = get_p::<String>(data, "password")? {
        debug!(id = %data.id(), "Setting user password");
        client
            .post_action(
                &format!("core/users/{}/set_password/", data.id()),
                &UserPasswordSetRequest { password },
            )
            .await?;
    }
    Ok(())
}

#[async_trait]
impl Resource for UserResource {
    fn type_name(&self) -> &'static str {
        "authentik_user"
    }

    fn schema(&self) -> Schema {
        Schema::resource()
            .with_description("Manage users.")
            .with_attribute("username", Attribute::required_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("email", Attribute::optional_string())
            .with_attribute(
                "password",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("Optionally set the user's password. Changing the password in authentik will not trigger an update here."),
            )
            .with_attribute("is_active", Attribute::optional_bool().with_default(json!(true)))
            .with_attribute("path", Attribute::optional_string().with_default(json!("users")))
            .with_attribute(
                "type",
                Attribute::optional_string()
                    .with_default(json!("internal"))
                    .one_of(USER_TYPES),
            )
            .with_attribute("attributes", Attribute::json_string())
            .with_attribute("groups", Attribute::optional_list(AttributeType::String))
    }

    async fn create(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let request = user_request(data)?;
        let user: User = client.post("core/users/", &request).await?;
        data.set_id(user.pk.to_string());
        set_password(client, data).await?;
        self.read(client, data).await
    }

    async fn read(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = numeric_id(data)?;
        let user: User = match client.get(&format!("core/users/{}/", id)).await {
            Ok(user) => user,
            Err(e) => return handle_read_error(data, e),
        };

        set_wrapper(data, "username", &user.username)?;
        set_wrapper(data, "name", &user.name)?;
        set_wrapper(data, "email", &user.email)?;
        set_wrapper(data, "is_active", user.is_active)?;
        set_wrapper(data, "path", &user.path)?;
        set_wrapper(data, "type", &user.user_type)?;
        set_json(data, "attributes", &user.attributes)?;
        let local: Vec<String> = cast_slice(data, "groups")?;
        set_wrapper(data, "groups", list_consistent_merge(&local, &user.groups))?;
        Ok(())
    }

    async fn update(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = numeric_id(data)?;
        let request = user_request(data)?;
        let user: User = client.put(&format!("core/users/{}/", id), &request).await?;
        data.set_id(user.pk.to_string());
        set_password(client, data).await?;
        self.read(client, data).await
    }

    async fn delete(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = numeric_id(data)?;
        ignore_not_found(client.delete(&format!("core/users/{}/", id)).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::FakeApi;

    fn remote_user(groups: &[&str]) -> serde_json::Value {
        json!({
            "pk": 7,
            "username": "jane",
            "name": "Jane Doe",
            "is_active": true,
            "email": "jane@example.com",
            "path": "users",
            "type": "internal",
            "attributes": {"locale": "en"},
            "groups": groups,
        })
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let api = FakeApi::new();
        api.route("POST", "core/users/", 201, remote_user(&["g2", "g1"]));
        api.route("GET", "core/users/7/", 200, remote_user(&["g2", "g1"]));
        api.route("POST", "core/users/7/set_password/", 204, json!({}));

        let mut data = ResourceData::from_value(json!({
            "username": "jane",
            "name": "Jane Doe",
            "email": "jane@example.com",
            "password": "hunter2",
            "attributes": "{\"locale\": \"en\"}",
            "groups": ["g1", "g2"],
        }))
        .unwrap();
        UserResource.create(&api.client(), &mut data).await.unwrap();

        assert_eq!(data.id(), "7");
        assert_eq!(data.get("name"), Some(&json!("Jane Doe")));
        // Local order kept, remote returned the same members reordered.
        assert_eq!(data.get("groups"), Some(&json!(["g1", "g2"])));
        assert_eq!(data.get("attributes"), Some(&json!("{\"locale\": \"en\"}")));

        let posts = api.bodies("POST");
        assert_eq!(posts[0]["attributes"], json!({"locale": "en"}));
        assert!(posts[0].get("password").is_none());
        assert_eq!(posts[1], json!({"password": "hunter2"}));
    }

    #[tokio::test]
    async fn test_read_takes_remote_groups_on_drift() {
        let api = FakeApi::new();
        api.route("GET", "core/users/7/", 200, remote_user(&["g3"]));

        let mut data = ResourceData::from_value(json!({"id": "7", "groups": ["g1", "g2"]})).unwrap();
        UserResource.read(&api.client(), &mut data).await.unwrap();
        assert_eq!(data.get("groups"), Some(&json!(["g3"])));
    }

    #[tokio::test]
    async fn test_read_missing_user_clears_id() {
        let api = FakeApi::new();
        let mut data = ResourceData::from_value(json!({"id": "7", "username": "jane"})).unwrap();
        UserResource.read(&api.client(), &mut data).await.unwrap();
        assert!(!data.exists());
    }

    #[tokio::test]
    async fn test_malformed_attributes_fail_before_request() {
        let api = FakeApi::new();
        let mut data = ResourceData::from_value(json!({
            "username": "jane",
            "name": "Jane",
            "attributes": "{oops",
        }))
        .unwrap();
        let err = UserResource.create(&api.client(), &mut data).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(api.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_ignores_not_found() {
        let api = FakeApi::new();
        let mut data = ResourceData::with_id("7");
        UserResource.delete(&api.client(), &mut data).await.unwrap();
    }
}
