//! Managed resource types.
//!
//! Every resource follows the same contract: Create builds a typed request
//! from the attribute store, calls one client method, stores the returned
//! identifier and delegates to Read. Read fetches the object and writes every
//! field back, clearing the identifier on 404. Update mirrors Create. Delete
//! treats 404 as already done.

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::ApiClient;
use crate::error::ProviderError;
use crate::schema::Schema;
use crate::state::ResourceData;

mod application;
mod brand;
mod flow;
mod group;
mod scope_mapping;
mod user;

pub use application::ApplicationResource;
pub use brand::BrandResource;
pub use flow::FlowResource;
pub use group::GroupResource;
pub use scope_mapping::ScopeMappingResource;
pub use user::UserResource;

pub(crate) use flow::write_flow;

/// Lifecycle operations of one managed resource type.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name exposed to the host, e.g. `authentik_user`.
    fn type_name(&self) -> &'static str;

    /// Attribute schema of the resource.
    fn schema(&self) -> Schema;

    /// Create the remote object and populate `data` from it.
    async fn create(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError>;

    /// Refresh `data` from the remote object.
    async fn read(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError>;

    /// Push `data` to the remote object and refresh it.
    async fn update(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError>;

    /// Delete the remote object.
    async fn delete(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError>;

    /// Adopt an existing object by its remote identifier.
    async fn import(&self, client: &ApiClient, id: &str) -> Result<ResourceData, ProviderError> {
        let mut data = ResourceData::with_id(id);
        self.read(client, &mut data).await?;
        if !data.exists() {
            return Err(ProviderError::NotFound(format!(
                "{} with id '{}' does not exist",
                self.type_name(),
                id
            )));
        }
        Ok(data)
    }
}

/// Every resource type the provider registers.
pub fn all() -> Vec<Arc<dyn Resource>> {
    vec![
        Arc::new(UserResource),
        Arc::new(GroupResource),
        Arc::new(FlowResource),
        Arc::new(BrandResource),
        Arc::new(ApplicationResource),
        Arc::new(ScopeMappingResource),
    ]
}

/// Values accepted by `policy_engine_mode` attributes.
pub(crate) const POLICY_ENGINE_MODES: &[&str] = &["all", "any"];

/// Parse a numeric identifier stored as a string.
pub(crate) fn numeric_id(data: &ResourceData) -> Result<i32, ProviderError> {
    data.id()
        .parse()
        .map_err(|_| ProviderError::InvalidRequest(format!("'{}' is not a numeric id", data.id())))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Offline API stand-in shared by the resource tests.

    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::client::ApiClient;
    use crate::config::ProviderConfig;
    use crate::transport::Transport;

    /// A canned answer for requests matching a method and path suffix.
    #[derive(Debug, Clone)]
    pub struct Route {
        pub method: &'static str,
        pub path: String,
        pub status: u16,
        pub body: Value,
    }

    /// Transport answering from a route table and recording request bodies.
    #[derive(Debug, Default)]
    pub struct FakeApi {
        routes: Mutex<Vec<Route>>,
        pub requests: Mutex<Vec<(String, String, Option<Value>)>>,
    }

    impl FakeApi {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn route(&self, method: &'static str, path: &str, status: u16, body: Value) {
            self.routes.lock().unwrap().push(Route {
                method,
                path: path.to_string(),
                status,
                body,
            });
        }

        pub fn client(self: &Arc<Self>) -> ApiClient {
            let config = ProviderConfig::new("https://authentik.test", "token");
            ApiClient::with_transport(&config, self.clone()).unwrap()
        }

        /// Bodies sent with `method`, in order.
        pub fn bodies(&self, method: &str) -> Vec<Value> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|(m, _, _)| m == method)
                .filter_map(|(_, _, b)| b.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Transport for FakeApi {
        async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
            let method = request.method().to_string();
            let path = request.url().path().to_string();
            let body = request
                .body()
                .and_then(|b| b.as_bytes())
                .and_then(|b| serde_json::from_slice(b).ok());
            self.requests
                .lock()
                .unwrap()
                .push((method.clone(), path.clone(), body));

            let routes = self.routes.lock().unwrap();
            let (status, body) = routes
                .iter()
                .rev()
                .find(|r| r.method == method && path.ends_with(&r.path))
                .map(|r| (r.status, r.body.to_string()))
                .unwrap_or((404, r#"{"detail":"Not found."}"#.to_string()));
            let mut response = http::Response::new(body);
            *response.status_mut() = http::StatusCode::from_u16(status).unwrap();
            Ok(reqwest::Response::from(response))
        }
    }
}
