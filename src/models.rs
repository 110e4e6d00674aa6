//! Request and response bodies of the authentik API objects the provider manages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pagination block of list responses.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Pagination {
    /// Next page number, 0 on the last page.
    #[serde(default)]
    pub next: u64,
    /// Total number of objects.
    #[serde(default)]
    pub count: u64,
}

/// Envelope of every list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Paginated<T> {
    /// Paging information.
    #[serde(default)]
    pub pagination: Pagination,
    /// Objects on this page.
    pub results: Vec<T>,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

/// A user as returned by `core/users/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub pk: i32,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub path: String,
    #[serde(rename = "type", default)]
    pub user_type: Option<String>,
    #[serde(default = "empty_object")]
    pub attributes: Value,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Body for creating or updating a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRequest {
    pub username: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    pub attributes: Value,
    pub groups: Vec<String>,
}

/// Body for setting a user's password.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserPasswordSetRequest {
    pub password: String,
}

/// A group as returned by `core/groups/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Group {
    pub pk: String,
    #[serde(default)]
    pub num_pk: i32,
    pub name: String,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub users: Vec<i32>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default = "empty_object")]
    pub attributes: Value,
}

/// Body for creating or updating a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRequest {
    pub name: String,
    pub is_superuser: bool,
    pub parent: Option<String>,
    pub users: Vec<i32>,
    pub roles: Vec<String>,
    pub attributes: Value,
}

/// A flow as returned by `flows/instances/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Flow {
    pub pk: String,
    pub slug: String,
    pub name: String,
    pub title: String,
    pub designation: String,
    #[serde(default)]
    pub authentication: Option<String>,
    #[serde(default)]
    pub layout: Option<String>,
    #[serde(default)]
    pub policy_engine_mode: Option<String>,
    #[serde(default)]
    pub denied_action: Option<String>,
    #[serde(default)]
    pub compatibility_mode: bool,
}

/// Body for creating or updating a flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowRequest {
    pub slug: String,
    pub name: String,
    pub title: String,
    pub designation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_engine_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denied_action: Option<String>,
    pub compatibility_mode: bool,
}

/// A brand as returned by `core/brands/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Brand {
    pub brand_uuid: String,
    pub domain: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub branding_title: String,
    #[serde(default)]
    pub branding_logo: String,
    #[serde(default)]
    pub branding_favicon: String,
    #[serde(default)]
    pub flow_authentication: Option<String>,
    #[serde(default)]
    pub flow_invalidation: Option<String>,
    #[serde(default)]
    pub flow_recovery: Option<String>,
    #[serde(default)]
    pub flow_unenrollment: Option<String>,
    #[serde(default)]
    pub flow_user_settings: Option<String>,
    #[serde(default)]
    pub flow_device_code: Option<String>,
    #[serde(default)]
    pub default_application: Option<String>,
    #[serde(default)]
    pub web_certificate: Option<String>,
    #[serde(default = "empty_object")]
    pub attributes: Value,
}

/// Body for creating or updating a brand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandRequest {
    pub domain: String,
    pub default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branding_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branding_logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branding_favicon: Option<String>,
    pub flow_authentication: Option<String>,
    pub flow_invalidation: Option<String>,
    pub flow_recovery: Option<String>,
    pub flow_unenrollment: Option<String>,
    pub flow_user_settings: Option<String>,
    pub flow_device_code: Option<String>,
    pub default_application: Option<String>,
    pub web_certificate: Option<String>,
    pub attributes: Value,
}

/// An application as returned by `core/applications/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Application {
    pub pk: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub provider: Option<i32>,
    #[serde(default)]
    pub backchannel_providers: Vec<i32>,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub open_in_new_tab: bool,
    #[serde(default)]
    pub meta_launch_url: String,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default)]
    pub meta_publisher: String,
    #[serde(default)]
    pub policy_engine_mode: Option<String>,
}

/// Body for creating or updating an application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationRequest {
    pub name: String,
    pub slug: String,
    pub provider: Option<i32>,
    pub backchannel_providers: Vec<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub open_in_new_tab: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_launch_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_engine_mode: Option<String>,
}

/// A scope mapping as returned by `propertymappings/provider/scope/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScopeMapping {
    pub pk: String,
    pub name: String,
    pub expression: String,
    pub scope_name: String,
    #[serde(default)]
    pub description: String,
}

/// Body for creating or updating a scope mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeMappingRequest {
    pub name: String,
    pub expression: String,
    pub scope_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paginated_envelope() {
        let page: Paginated<Group> = serde_json::from_value(json!({
            "pagination": {"next": 2, "count": 3},
            "results": [{"pk": "a1", "name": "admins"}]
        }))
        .unwrap();
        assert_eq!(page.pagination.next, 2);
        assert_eq!(page.results[0].name, "admins");
        assert_eq!(page.results[0].attributes, json!({}));
        assert!(page.results[0].users.is_empty());
    }

    #[test]
    fn test_user_type_rename() {
        let user: User = serde_json::from_value(json!({
            "pk": 4, "username": "jane", "name": "Jane", "type": "internal"
        }))
        .unwrap();
        assert_eq!(user.user_type.as_deref(), Some("internal"));

        let body = serde_json::to_value(UserRequest {
            username: "jane".into(),
            name: "Jane".into(),
            is_active: None,
            email: None,
            path: None,
            user_type: Some("service_account".into()),
            attributes: json!({}),
            groups: vec![],
        })
        .unwrap();
        assert_eq!(body["type"], "service_account");
        assert!(body.get("email").is_none());
    }
}
