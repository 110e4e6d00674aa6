//! Read-only lookups.
//!
//! A data source fills the store built from its config with the matching
//! remote object. Matching nothing is an error, never an empty result.

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::ApiClient;
use crate::error::ProviderError;
use crate::schema::Schema;
use crate::state::ResourceData;

mod flow;
mod group;
mod user;

pub use flow::FlowDataSource;
pub use group::GroupDataSource;
pub use user::UserDataSource;

/// A read-only lookup exposed to the host.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Type name exposed to the host.
    fn type_name(&self) -> &'static str;

    /// Lookup arguments and returned attributes.
    fn schema(&self) -> Schema;

    /// Resolve the lookup described by `data` and write the result into it.
    async fn read(&self, client: &ApiClient, data: &mut ResourceData) -> Result<(), ProviderError>;
}

/// Every data source the provider registers.
pub fn all() -> Vec<Arc<dyn DataSource>> {
    vec![
        Arc::new(UserDataSource),
        Arc::new(GroupDataSource),
        Arc::new(FlowDataSource),
    ]
}

/// Exactly one of the list results, or a not-found error naming the lookup.
pub(crate) fn single<T>(mut results: Vec<T>, what: &str) -> Result<T, ProviderError> {
    match results.len() {
        0 => Err(ProviderError::NotFound(format!("no {} found", what))),
        1 => Ok(results.remove(0)),
        n => Err(ProviderError::Validation(format!(
            "{} matched {} objects, expected one",
            what, n
        ))),
    }
}
