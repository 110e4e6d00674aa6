//! The authentik provider: registration tables and operation dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::client::ApiClient;
use crate::config::ProviderConfig;
use crate::data_sources::{self, DataSource};
use crate::error::ProviderError;
use crate::plan;
use crate::resources::{self, Resource};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::state::ResourceData;
use crate::transport::{TracingTransport, Transport};
use crate::types::{ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities};
use crate::validation::validate;

/// Provider for the authentik identity API.
///
/// Holds the resource and data source tables and the API client built by
/// `configure`. The client is written once and read by every operation.
pub struct AuthentikProvider {
    resources: HashMap<&'static str, Arc<dyn Resource>>,
    data_sources: HashMap<&'static str, Arc<dyn DataSource>>,
    client: RwLock<Option<Arc<ApiClient>>>,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for AuthentikProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthentikProvider {
    /// Provider registering every resource and data source.
    pub fn new() -> Self {
        Self {
            resources: resources::all()
                .into_iter()
                .map(|r| (r.type_name(), r))
                .collect(),
            data_sources: data_sources::all()
                .into_iter()
                .map(|d| (d.type_name(), d))
                .collect(),
            client: RwLock::new(None),
            transport: None,
        }
    }

    /// Send API requests through `transport` instead of the default HTTP stack.
    ///
    /// Test mode still takes precedence.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Configure from an already resolved configuration.
    pub async fn configure_with(&self, config: ProviderConfig) -> Result<(), ProviderError> {
        let client = match &self.transport {
            Some(transport) if !config.fail_requests => {
                let traced = TracingTransport::new(Arc::clone(transport));
                ApiClient::with_transport(&config, Arc::new(traced))?
            },
            _ => ApiClient::new(&config)?,
        };
        info!(
            url = %client.base_url(),
            insecure = config.insecure,
            test_mode = config.fail_requests,
            "provider configured"
        );
        *self.client.write().await = Some(Arc::new(client));
        Ok(())
    }

    async fn client(&self) -> Result<Arc<ApiClient>, ProviderError> {
        self.client
            .read()
            .await
            .clone()
            .ok_or_else(|| ProviderError::Configuration("provider is not configured".to_string()))
    }

    fn resource(&self, type_name: &str) -> Result<Arc<dyn Resource>, ProviderError> {
        self.resources
            .get(type_name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownResource(format!("unknown resource type: {}", type_name)))
    }

    fn data_source(&self, type_name: &str) -> Result<Arc<dyn DataSource>, ProviderError> {
        self.data_sources
            .get(type_name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownResource(format!("unknown data source type: {}", type_name)))
    }
}

fn validation_error(diagnostics: Vec<Diagnostic>) -> Option<ProviderError> {
    let messages: Vec<String> = diagnostics
        .into_iter()
        .filter(Diagnostic::is_error)
        .map(|d| match d.attribute {
            Some(attr) => format!("{}: {}", attr, d.summary),
            None => d.summary,
        })
        .collect();
    (!messages.is_empty()).then(|| ProviderError::Validation(messages.join("; ")))
}

#[async_trait::async_trait]
impl ProviderService for AuthentikProvider {
    fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(ProviderConfig::schema());
        for (name, resource) in &self.resources {
            schema = schema.with_resource(*name, resource.schema());
        }
        for (name, data_source) in &self.data_sources {
            schema = schema.with_data_source(*name, data_source.schema());
        }
        schema
    }

    fn metadata(&self) -> ProviderMetadata {
        let mut resources: Vec<String> = self.resources.keys().map(|k| k.to_string()).collect();
        let mut data_sources: Vec<String> = self.data_sources.keys().map(|k| k.to_string()).collect();
        resources.sort();
        data_sources.sort();
        ProviderMetadata {
            resources,
            data_sources,
            capabilities: ServerCapabilities { plan_destroy: true },
        }
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&ProviderConfig::schema(), &config))
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        self.configure_with(ProviderConfig::resolve(&config)?).await?;
        Ok(vec![])
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&self.resource(resource_type)?.schema(), &config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let schema = self.resource(resource_type)?.schema();
        if !proposed_state.is_null() {
            if let Some(err) = validation_error(validate(&schema, &proposed_state)) {
                return Err(err);
            }
        }
        plan::plan(&schema, prior_state.as_ref(), &proposed_state)
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        let mut data = ResourceData::from_value(planned_state)?;

        let result = resource
            .create(&client, &mut data)
            .instrument(info_span!("resource.create", resource_type))
            .await;
        if let Err(err) = result {
            if !data.exists() {
                return Err(err);
            }
            warn!(resource_type, id = %data.id(), error = %err, "created, but the follow-up step failed");
            return Err(err.with_state(data.into_state()));
        }
        info!(resource_type, id = %data.id(), "created");
        Ok(data.into_state())
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        let mut data = ResourceData::from_value(current_state)?;
        let id = data.id().to_string();

        resource
            .read(&client, &mut data)
            .instrument(info_span!("resource.read", resource_type, id = %id))
            .await?;
        if !data.exists() {
            info!(resource_type, id = %id, "object no longer exists");
        }
        Ok(data.into_state())
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        let prior = ResourceData::from_value(prior_state.clone())?;
        let mut data = ResourceData::from_value(planned_state)?;
        if !data.exists() || data.id() != prior.id() {
            data.set_id(prior.id());
        }

        resource
            .update(&client, &mut data)
            .instrument(info_span!("resource.update", resource_type, id = %prior.id()))
            .await
            .map_err(|err| err.with_state(prior_state))?;
        info!(resource_type, id = %data.id(), "updated");
        Ok(data.into_state())
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        let mut data = ResourceData::from_value(current_state)?;
        let id = data.id().to_string();

        resource
            .delete(&client, &mut data)
            .instrument(info_span!("resource.delete", resource_type, id = %id))
            .await?;
        info!(resource_type, id = %id, "deleted");
        Ok(())
    }

    async fn import_resource(&self, resource_type: &str, id: &str) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;

        let data = resource
            .import(&client, id)
            .instrument(info_span!("resource.import", resource_type, id))
            .await?;
        Ok(vec![ImportedResource::new(resource_type, data.into_state())])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&self.data_source(data_source_type)?.schema(), &config))
    }

    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        let client = self.client().await?;
        let mut data = ResourceData::from_value(config)?;

        data_source
            .read(&client, &mut data)
            .instrument(info_span!("data_source.read", data_source_type))
            .await?;
        debug!(data_source_type, id = %data.id(), "data source read");
        Ok(data.into_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::FakeApi;
    use crate::testing::{assert_plan_changes_attribute, assert_plan_no_changes, ProviderTester};
    use serde_json::json;

    fn tester(api: &Arc<FakeApi>) -> ProviderTester<AuthentikProvider> {
        ProviderTester::new(AuthentikProvider::new().with_transport(api.clone()))
    }

    async fn configured(api: &Arc<FakeApi>) -> ProviderTester<AuthentikProvider> {
        let tester = tester(api);
        tester
            .configure(json!({"url": "https://authentik.test", "token": "t"}))
            .await
            .unwrap();
        tester
    }

    #[test]
    fn test_registers_every_type() {
        let provider = AuthentikProvider::new();
        let metadata = provider.metadata();
        assert_eq!(
            metadata.resources,
            vec![
                "authentik_application",
                "authentik_brand",
                "authentik_flow",
                "authentik_group",
                "authentik_property_mapping_provider_scope",
                "authentik_user",
            ]
        );
        assert_eq!(
            metadata.data_sources,
            vec!["authentik_flow", "authentik_group", "authentik_user"]
        );
        assert!(metadata.capabilities.plan_destroy);

        let schema = provider.schema();
        assert!(schema.provider.attribute("token").unwrap().flags.sensitive);
        assert!(schema.resources["authentik_user"].attribute("id").unwrap().flags.computed);
    }

    #[tokio::test]
    async fn test_operations_require_configure() {
        let api = FakeApi::new();
        let err = tester(&api)
            .read("authentik_group", json!({"id": "g"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unknown_type() {
        let api = FakeApi::new();
        let tester = configured(&api).await;
        let err = tester.create("authentik_nope", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_read_gone_returns_null() {
        let api = FakeApi::new();
        let tester = configured(&api).await;
        let state = tester
            .read("authentik_group", json!({"id": "g", "name": "ops"}))
            .await
            .unwrap();
        assert!(state.is_null());
    }

    #[tokio::test]
    async fn test_plan_rejects_bad_enum() {
        let api = FakeApi::new();
        let tester = configured(&api).await;
        let err = tester
            .plan_create(
                "authentik_flow",
                json!({"name": "n", "slug": "s", "title": "t", "designation": "bogus"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(ref m) if m.contains("designation")));
    }

    #[tokio::test]
    async fn test_plan_attributes_json() {
        let api = FakeApi::new();
        let tester = configured(&api).await;
        let prior = json!({
            "id": "g", "name": "ops", "is_superuser": false,
            "attributes": r#"{"a":1,"b":2}"#
        });

        let plan = tester
            .plan_update(
                "authentik_group",
                prior.clone(),
                json!({"name": "ops", "attributes": r#"{"b":2,"a":1}"#}),
            )
            .await
            .unwrap();
        assert_plan_no_changes(&plan);

        let plan = tester
            .plan_update("authentik_group", prior, json!({"name": "dev", "attributes": "{}"}))
            .await
            .unwrap();
        assert_plan_changes_attribute(&plan, "name");
        assert_plan_changes_attribute(&plan, "attributes");
    }

    #[tokio::test]
    async fn test_update_keeps_prior_id() {
        let api = FakeApi::new();
        let remote = json!({"pk": "g", "name": "dev", "users": [], "roles": [], "attributes": {}});
        api.route("PUT", "core/groups/g/", 200, remote.clone());
        api.route("GET", "core/groups/g/", 200, remote);
        let tester = configured(&api).await;

        let state = tester
            .update("authentik_group", json!({"id": "g", "name": "ops"}), json!({"name": "dev"}))
            .await
            .unwrap();
        assert_eq!(state["id"], "g");
        assert_eq!(state["name"], "dev");
    }

    #[tokio::test]
    async fn test_create_keeps_id_when_read_back_fails() {
        let api = FakeApi::new();
        api.route("POST", "core/groups/", 201, json!({"pk": "3f1c", "name": "ops"}));
        api.route("GET", "core/groups/3f1c/", 500, json!({"detail": "boom"}));
        let tester = configured(&api).await;

        let err = tester
            .create("authentik_group", json!({"name": "ops"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_diagnostics().len(), 1);

        let (state, inner) = err.into_parts();
        let state = state.unwrap();
        assert_eq!(state["id"], "3f1c");
        assert_eq!(state["name"], "ops");
        assert_eq!(inner.as_api().unwrap().status, 500);
    }

    #[tokio::test]
    async fn test_create_rejected_has_no_state() {
        let api = FakeApi::new();
        api.route("POST", "core/groups/", 400, json!({"name": ["required"]}));
        let tester = configured(&api).await;

        let err = tester
            .create("authentik_group", json!({"name": "ops"}))
            .await
            .unwrap_err();
        assert!(err.into_parts().0.is_none());
    }

    #[tokio::test]
    async fn test_update_failure_keeps_prior_state() {
        let api = FakeApi::new();
        api.route("PUT", "core/groups/g/", 500, json!({"detail": "boom"}));
        let tester = configured(&api).await;

        let prior = json!({"id": "g", "name": "ops"});
        let err = tester
            .update("authentik_group", prior.clone(), json!({"name": "dev"}))
            .await
            .unwrap_err();
        let (state, inner) = err.into_parts();
        assert_eq!(state, Some(prior));
        assert_eq!(inner.as_api().unwrap().status, 500);
    }

    #[derive(Clone, Default)]
    struct SpanNames(Arc<std::sync::Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for SpanNames {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _id: &tracing::span::Id,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            self.0.lock().unwrap().push(attrs.metadata().name().to_string());
        }
    }

    #[tokio::test]
    async fn test_injected_transport_is_traced() {
        use tracing_subscriber::layer::SubscriberExt;

        let names = SpanNames::default();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(names.clone()));

        let api = FakeApi::new();
        api.route("GET", "core/groups/g/", 200, json!({"pk": "g", "name": "ops"}));
        let tester = configured(&api).await;
        tester
            .read("authentik_group", json!({"id": "g"}))
            .await
            .unwrap();

        let names = names.0.lock().unwrap();
        assert!(names.iter().any(|n| n == "resource.read"));
        assert!(names.iter().any(|n| n == "http.client"));
        assert_eq!(api.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_import() {
        let api = FakeApi::new();
        api.route(
            "GET",
            "propertymappings/provider/scope/m-1/",
            200,
            json!({"pk": "m-1", "name": "email", "scope_name": "email", "expression": "return {}"}),
        );
        let tester = configured(&api).await;

        let imported = tester
            .import_resource("authentik_property_mapping_provider_scope", "m-1")
            .await
            .unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].state["id"], "m-1");
        assert_eq!(imported[0].state["scope_name"], "email");
    }

    #[tokio::test]
    async fn test_test_mode_overrides_transport() {
        let api = FakeApi::new();
        let provider = AuthentikProvider::new().with_transport(api.clone());
        provider
            .configure_with(ProviderConfig::new("https://authentik.test", "t").with_fail_requests(true))
            .await
            .unwrap();

        let err = provider
            .create("authentik_group", json!({"name": "ops"}))
            .await
            .unwrap_err();
        assert_eq!(err.as_api().unwrap().status, 400);
        assert!(api.requests.lock().unwrap().is_empty());
    }
}
