use async_trait::async_trait;

use super::{single, DataSource};
use crate::client::ApiClient;
use crate::error::ProviderError;
use crate::helpers::{get_int32, get_p, set_json, set_wrapper};
use crate::models::User;
use crate::schema::{Attribute, AttributeType, Schema};
use crate::state::ResourceData;

/// Look up a user by `pk` or `username`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserDataSource;

#[async_trait]
impl DataSource for UserDataSource {
    fn type_name(&self) -> &'static str {
        "authentik_user"
    }

    fn schema(&self) -> Schema {
        Schema::resource()
            .with_description("Get a user by primary key or username.")
            .with_attribute("pk", Attribute::optional_computed_int64())
            .with_attribute("username", Attribute::optional_computed_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("email", Attribute::computed_string())
            .with_attribute("is_active", Attribute::computed_bool())
            .with_attribute("path", Attribute::computed_string())
            .with_attribute("type", Attribute::computed_string())
            .with_attribute("attributes", Attribute::computed_string())
            .with_attribute("groups", Attribute::computed_list(AttributeType::String))
    }

    async fn read(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let user: User = match (get_int32(data, "pk")?, get_p::<String>(data, "username")?) {
            (Some(pk), _) => client.get(&format!("core/users/{}/", pk)).await?,
            (None, Some(username)) => {
                let users = client
                    .list("core/users/", &[("username", username.clone())])
                    .await?;
                single(users, &format!("user with username '{}'", username))?
            }
            (None, None) => {
                return Err(ProviderError::Validation(
                    "one of 'pk' or 'username' must be set".to_string(),
                ))
            }
        };

        data.set_id(user.pk.to_string());
        set_wrapper(data, "pk", user.pk)?;
        set_wrapper(data, "username", &user.username)?;
        set_wrapper(data, "name", &user.name)?;
        set_wrapper(data, "email", &user.email)?;
        set_wrapper(data, "is_active", user.is_active)?;
        set_wrapper(data, "path", &user.path)?;
        set_wrapper(data, "type", &user.user_type)?;
        set_json(data, "attributes", &user.attributes)?;
        set_wrapper(data, "groups", &user.groups)?;
        Ok(())
    }
}
