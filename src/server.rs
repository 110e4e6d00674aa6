//! The plugin protocol server.
//!
//! [`ProviderService`] is the typed surface a provider implements. [`serve`]
//! wraps it in the generated gRPC service, binds a local port, prints the
//! handshake line on stdout and runs until SIGTERM or SIGINT.
//!
//! Failures of individual operations never become gRPC errors: they are
//! returned as diagnostics in the response so the host can show them next to
//! the resource that caused them.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{debug, error, info, instrument, warn};

use crate::error::ProviderError;
use crate::generated as proto;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema, Schema};
use crate::types::{ImportedResource, PlanResult, ProviderMetadata, HANDSHAKE_PREFIX, PROTOCOL_VERSION};

/// Operations a provider exposes to the host.
///
/// States and configs are plain JSON objects. A `Null` state returned from
/// [`read`](ProviderService::read) means the object no longer exists.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    /// Provider block, resource and data source schemas.
    fn schema(&self) -> ProviderSchema;

    /// Type names and capabilities, derived from [`schema`](ProviderService::schema) by default.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        let mut resources: Vec<String> = schema.resources.into_keys().collect();
        let mut data_sources: Vec<String> = schema.data_sources.into_keys().collect();
        resources.sort();
        data_sources.sort();
        ProviderMetadata {
            resources,
            data_sources,
            capabilities: Default::default(),
        }
    }

    /// Check the provider block without configuring anything.
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Build whatever the resource operations need from the provider block.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Release resources before the process exits.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Check a resource config before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Migrate state written by an older schema version.
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let _ = (resource_type, version);
        Ok(state)
    }

    /// Compute the changes needed to go from `prior_state` to `proposed_state`.
    ///
    /// `prior_state` is `None` on create; `proposed_state` is `Null` on destroy.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create the object described by `planned_state`.
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError>;

    /// Refresh `current_state` from the remote object.
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError>;

    /// Apply `planned_state` to an existing object.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the object described by `current_state`.
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError>;

    /// Adopt an existing object by its remote identifier.
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let _ = id;
        Err(ProviderError::Unimplemented(format!(
            "import is not supported for {}",
            resource_type
        )))
    }

    /// Check a data source config.
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (data_source_type, config);
        Ok(vec![])
    }

    /// Look up the data described by `config`.
    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, ProviderError> {
        let _ = config;
        Err(ProviderError::UnknownResource(format!(
            "unknown data source type: {}",
            data_source_type
        )))
    }
}

/// Decode a JSON payload. Empty bytes are `Null`.
fn decode(bytes: &[u8]) -> Result<Value, ProviderError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(ProviderError::from)
}

/// Encode a state. `Null` is sent as empty bytes.
fn encode(value: &Value) -> Vec<u8> {
    if value.is_null() {
        Vec::new()
    } else {
        serde_json::to_vec(value).unwrap_or_default()
    }
}

pub(crate) fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<proto::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| proto::Diagnostic {
            severity: match d.severity {
                DiagnosticSeverity::Error => proto::diagnostic::Severity::Error as i32,
                DiagnosticSeverity::Warning => proto::diagnostic::Severity::Warning as i32,
            },
            summary: d.summary,
            detail: d.detail.unwrap_or_default(),
            attribute: d.attribute.unwrap_or_default(),
        })
        .collect()
}

fn error_diagnostics(operation: &str, err: ProviderError) -> Vec<proto::Diagnostic> {
    error!(operation, error = %err, "operation failed");
    diagnostics_to_proto(err.to_diagnostics())
}

fn log_validation(operation: &str, diagnostics: &[Diagnostic]) {
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    if errors > 0 {
        warn!(operation, errors, "validation failed");
    } else {
        debug!(operation, warnings = diagnostics.len(), "validation passed");
    }
}

pub(crate) fn schema_to_proto(schema: &Schema) -> proto::Schema {
    let attributes = schema
        .attributes
        .iter()
        .map(|(name, attr)| proto::Attribute {
            name: name.clone(),
            r#type: serde_json::to_vec(&attr.attr_type).unwrap_or_default(),
            required: attr.flags.required,
            optional: attr.flags.optional,
            computed: attr.flags.computed,
            sensitive: attr.flags.sensitive,
            description: attr.description.clone().unwrap_or_default(),
            force_new: attr.force_new,
            default_value: attr
                .default
                .as_ref()
                .and_then(|v| serde_json::to_vec(v).ok())
                .unwrap_or_default(),
            allowed_values: attr.allowed_values().to_vec(),
        })
        .collect();

    proto::Schema {
        version: schema.version as i64,
        block: Some(proto::Block {
            attributes,
            description: schema.description.clone().unwrap_or_default(),
        }),
    }
}

/// Adapts a [`ProviderService`] to the generated gRPC trait.
struct ProviderGrpcService<P: ProviderService> {
    provider: Arc<P>,
}

impl<P: ProviderService> ProviderGrpcService<P> {
    async fn validate_with<F, Fut>(operation: &str, payload: &[u8], check: F) -> Vec<proto::Diagnostic>
    where
        F: FnOnce(Value) -> Fut,
        Fut: std::future::Future<Output = Result<Vec<Diagnostic>, ProviderError>>,
    {
        let result = match decode(payload) {
            Ok(config) => check(config).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(diagnostics) => {
                log_validation(operation, &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => error_diagnostics(operation, e),
        }
    }
}

#[tonic::async_trait]
impl<P: ProviderService> proto::provider_server::Provider for ProviderGrpcService<P> {
    #[instrument(skip_all, name = "grpc.get_metadata")]
    async fn get_metadata(
        &self,
        _request: Request<proto::GetMetadataRequest>,
    ) -> Result<Response<proto::GetMetadataResponse>, Status> {
        let metadata = self.provider.metadata();
        debug!(
            resources = metadata.resources.len(),
            data_sources = metadata.data_sources.len(),
            "GetMetadata"
        );
        Ok(Response::new(metadata.into()))
    }

    #[instrument(skip_all, name = "grpc.get_schema")]
    async fn get_schema(
        &self,
        _request: Request<proto::GetSchemaRequest>,
    ) -> Result<Response<proto::GetSchemaResponse>, Status> {
        let schema = self.provider.schema();
        debug!(resources = schema.resources.len(), "GetSchema");
        Ok(Response::new(proto::GetSchemaResponse {
            provider: Some(schema_to_proto(&schema.provider)),
            resources: schema
                .resources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            data_sources: schema
                .data_sources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            diagnostics: vec![],
        }))
    }

    #[instrument(skip_all, name = "grpc.validate_provider_config")]
    async fn validate_provider_config(
        &self,
        request: Request<proto::ValidateProviderConfigRequest>,
    ) -> Result<Response<proto::ValidateProviderConfigResponse>, Status> {
        let req = request.into_inner();
        let diagnostics = Self::validate_with("ValidateProviderConfig", &req.config, |config| {
            self.provider.validate_provider_config(config)
        })
        .await;
        Ok(Response::new(proto::ValidateProviderConfigResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.configure")]
    async fn configure(
        &self,
        request: Request<proto::ConfigureRequest>,
    ) -> Result<Response<proto::ConfigureResponse>, Status> {
        let req = request.into_inner();
        let result = match decode(&req.config) {
            Ok(config) => self.provider.configure(config).await,
            Err(e) => Err(e),
        };
        let diagnostics = match result {
            Ok(diagnostics) => {
                if diagnostics.iter().any(Diagnostic::is_error) {
                    warn!(diagnostics = diagnostics.len(), "Configure completed with errors");
                } else {
                    info!("provider configured");
                }
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => error_diagnostics("Configure", e),
        };
        Ok(Response::new(proto::ConfigureResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.stop")]
    async fn stop(&self, _request: Request<proto::StopRequest>) -> Result<Response<proto::StopResponse>, Status> {
        info!("Stop called");
        let error = match self.provider.stop().await {
            Ok(()) => String::new(),
            Err(e) => {
                error!(error = %e, "Stop failed");
                e.to_string()
            }
        };
        Ok(Response::new(proto::StopResponse { error }))
    }

    #[instrument(skip_all, name = "grpc.validate_resource_config", fields(resource_type = %request.get_ref().resource_type))]
    async fn validate_resource_config(
        &self,
        request: Request<proto::ValidateResourceConfigRequest>,
    ) -> Result<Response<proto::ValidateResourceConfigResponse>, Status> {
        let req = request.into_inner();
        let diagnostics = Self::validate_with("ValidateResourceConfig", &req.config, |config| {
            self.provider.validate_resource_config(&req.resource_type, config)
        })
        .await;
        Ok(Response::new(proto::ValidateResourceConfigResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.upgrade_resource_state", fields(resource_type = %request.get_ref().resource_type))]
    async fn upgrade_resource_state(
        &self,
        request: Request<proto::UpgradeResourceStateRequest>,
    ) -> Result<Response<proto::UpgradeResourceStateResponse>, Status> {
        let req = request.into_inner();
        let result = match decode(&req.state) {
            Ok(state) => {
                self.provider
                    .upgrade_resource_state(&req.resource_type, req.version, state)
                    .await
            }
            Err(e) => Err(e),
        };
        Ok(Response::new(match result {
            Ok(upgraded) => proto::UpgradeResourceStateResponse {
                upgraded_state: encode(&upgraded),
                diagnostics: vec![],
            },
            Err(e) => proto::UpgradeResourceStateResponse {
                upgraded_state: vec![],
                diagnostics: error_diagnostics("UpgradeResourceState", e),
            },
        }))
    }

    #[instrument(skip_all, name = "grpc.plan", fields(resource_type = %request.get_ref().resource_type))]
    async fn plan(&self, request: Request<proto::PlanRequest>) -> Result<Response<proto::PlanResponse>, Status> {
        let req = request.into_inner();

        let result: Result<PlanResult, ProviderError> = async {
            let prior = decode(&req.prior_state)?;
            let prior = (!prior.is_null()).then_some(prior);
            let proposed = decode(&req.proposed_state)?;
            let config = decode(&req.config)?;
            self.provider
                .plan(&req.resource_type, prior, proposed, config)
                .await
        }
        .await;

        Ok(Response::new(match result {
            Ok(plan) => {
                debug!(
                    changes = plan.changes.len(),
                    requires_replace = plan.requires_replace,
                    "Plan completed"
                );
                plan.into_response()
            }
            Err(e) => proto::PlanResponse {
                planned_state: vec![],
                changes: vec![],
                requires_replace: false,
                diagnostics: error_diagnostics("Plan", e),
            },
        }))
    }

    #[instrument(skip_all, name = "grpc.create", fields(resource_type = %request.get_ref().resource_type))]
    async fn create(&self, request: Request<proto::CreateRequest>) -> Result<Response<proto::CreateResponse>, Status> {
        let req = request.into_inner();
        let result = match decode(&req.planned_state) {
            Ok(planned) => self.provider.create(&req.resource_type, planned).await,
            Err(e) => Err(e),
        };
        Ok(Response::new(match result {
            Ok(state) => proto::CreateResponse {
                state: encode(&state),
                diagnostics: vec![],
            },
            Err(e) => {
                let (state, e) = e.into_parts();
                proto::CreateResponse {
                    state: state.as_ref().map(encode).unwrap_or_default(),
                    diagnostics: error_diagnostics("Create", e),
                }
            },
        }))
    }

    #[instrument(skip_all, name = "grpc.read", fields(resource_type = %request.get_ref().resource_type))]
    async fn read(&self, request: Request<proto::ReadRequest>) -> Result<Response<proto::ReadResponse>, Status> {
        let req = request.into_inner();
        let result = match decode(&req.current_state) {
            Ok(current) => self.provider.read(&req.resource_type, current).await,
            Err(e) => Err(e),
        };
        Ok(Response::new(match result {
            Ok(state) => proto::ReadResponse {
                state: encode(&state),
                diagnostics: vec![],
            },
            Err(e) => proto::ReadResponse {
                state: vec![],
                diagnostics: error_diagnostics("Read", e),
            },
        }))
    }

    #[instrument(skip_all, name = "grpc.update", fields(resource_type = %request.get_ref().resource_type))]
    async fn update(&self, request: Request<proto::UpdateRequest>) -> Result<Response<proto::UpdateResponse>, Status> {
        let req = request.into_inner();
        let result: Result<Value, ProviderError> = async {
            let prior = decode(&req.prior_state)?;
            let planned = decode(&req.planned_state)?;
            self.provider.update(&req.resource_type, prior, planned).await
        }
        .await;
        Ok(Response::new(match result {
            Ok(state) => proto::UpdateResponse {
                state: encode(&state),
                diagnostics: vec![],
            },
            Err(e) => {
                let (state, e) = e.into_parts();
                proto::UpdateResponse {
                    state: state.as_ref().map(encode).unwrap_or_default(),
                    diagnostics: error_diagnostics("Update", e),
                }
            },
        }))
    }

    #[instrument(skip_all, name = "grpc.delete", fields(resource_type = %request.get_ref().resource_type))]
    async fn delete(&self, request: Request<proto::DeleteRequest>) -> Result<Response<proto::DeleteResponse>, Status> {
        let req = request.into_inner();
        let result = match decode(&req.current_state) {
            Ok(current) => self.provider.delete(&req.resource_type, current).await,
            Err(e) => Err(e),
        };
        let diagnostics = match result {
            Ok(()) => vec![],
            Err(e) => error_diagnostics("Delete", e),
        };
        Ok(Response::new(proto::DeleteResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.import_resource_state", fields(resource_type = %request.get_ref().resource_type, id = %request.get_ref().id))]
    async fn import_resource_state(
        &self,
        request: Request<proto::ImportResourceStateRequest>,
    ) -> Result<Response<proto::ImportResourceStateResponse>, Status> {
        let req = request.into_inner();

        Ok(Response::new(
            match self.provider.import_resource(&req.resource_type, &req.id).await {
                Ok(imported) => {
                    info!(count = imported.len(), "ImportResourceState completed");
                    proto::ImportResourceStateResponse {
                        imported: imported.into_iter().map(Into::into).collect(),
                        diagnostics: vec![],
                    }
                }
                Err(e) => proto::ImportResourceStateResponse {
                    imported: vec![],
                    diagnostics: error_diagnostics("ImportResourceState", e),
                },
            },
        ))
    }

    #[instrument(skip_all, name = "grpc.validate_data_source_config", fields(data_source_type = %request.get_ref().data_source_type))]
    async fn validate_data_source_config(
        &self,
        request: Request<proto::ValidateDataSourceConfigRequest>,
    ) -> Result<Response<proto::ValidateDataSourceConfigResponse>, Status> {
        let req = request.into_inner();
        let diagnostics = Self::validate_with("ValidateDataSourceConfig", &req.config, |config| {
            self.provider
                .validate_data_source_config(&req.data_source_type, config)
        })
        .await;
        Ok(Response::new(proto::ValidateDataSourceConfigResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.read_data_source", fields(data_source_type = %request.get_ref().data_source_type))]
    async fn read_data_source(
        &self,
        request: Request<proto::ReadDataSourceRequest>,
    ) -> Result<Response<proto::ReadDataSourceResponse>, Status> {
        let req = request.into_inner();
        let result = match decode(&req.config) {
            Ok(config) => {
                self.provider
                    .read_data_source(&req.data_source_type, config)
                    .await
            }
            Err(e) => Err(e),
        };
        Ok(Response::new(match result {
            Ok(state) => proto::ReadDataSourceResponse {
                state: encode(&state),
                diagnostics: vec![],
            },
            Err(e) => proto::ReadDataSourceResponse {
                state: vec![],
                diagnostics: error_diagnostics("ReadDataSource", e),
            },
        }))
    }
}

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// How long in-flight requests may run after a shutdown signal. Default 30s.
    pub shutdown_timeout: Duration,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServeOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the graceful drain after a shutdown signal.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Resolves on SIGTERM or SIGINT (CTRL+C elsewhere).
///
/// If a handler cannot be installed the server keeps running until killed.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                    _ = sigint.recv() => info!("received SIGINT, shutting down"),
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "failed to install signal handlers");
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received CTRL+C, shutting down"),
            Err(e) => {
                warn!(error = %e, "failed to install CTRL+C handler");
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Serve `provider` on an ephemeral localhost port.
///
/// Prints `AUTHENTIK_PROVIDER|<version>|<address>` to stdout once listening.
pub async fn serve<P: ProviderService>(provider: P) -> Result<(), ProviderError> {
    serve_with_options(provider, ServeOptions::default()).await
}

/// [`serve`] with explicit options.
pub async fn serve_with_options<P: ProviderService>(provider: P, options: ServeOptions) -> Result<(), ProviderError> {
    let listener = bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    serve_on_listener(provider, listener, wait_for_shutdown_signal(), options).await
}

/// Serve on a fixed address.
pub async fn serve_on<P: ProviderService>(provider: P, addr: SocketAddr) -> Result<(), ProviderError> {
    serve_on_with_options(provider, addr, ServeOptions::default()).await
}

/// [`serve_on`] with explicit options.
pub async fn serve_on_with_options<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
    options: ServeOptions,
) -> Result<(), ProviderError> {
    let listener = bind(addr).await?;
    serve_on_listener(provider, listener, wait_for_shutdown_signal(), options).await
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, ProviderError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| ProviderError::Sdk(format!("failed to bind {}: {}", addr, e)))
}

/// Handshake line announcing `addr`.
pub fn handshake_line(addr: SocketAddr) -> String {
    format!("{}|{}|{}", HANDSHAKE_PREFIX, PROTOCOL_VERSION, addr)
}

/// Run the server on `listener` until `shutdown` resolves, then drain
/// in-flight requests for at most `options.shutdown_timeout`.
pub async fn serve_on_listener<P, F>(
    provider: P,
    listener: TcpListener,
    shutdown: F,
    options: ServeOptions,
) -> Result<(), ProviderError>
where
    P: ProviderService,
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| ProviderError::Sdk(format!("listener has no local address: {}", e)))?;
    println!("{}", handshake_line(addr));
    info!(address = %addr, "provider server listening");

    let provider = Arc::new(provider);
    let service = proto::provider_server::ProviderServer::new(ProviderGrpcService {
        provider: Arc::clone(&provider),
    });

    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let server = Server::builder().add_service(service).serve_with_incoming_shutdown(
        tokio_stream::wrappers::TcpListenerStream::new(listener),
        async move {
            shutdown.await;
            let _ = signalled_tx.send(());
        },
    );
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        _ = signalled_rx => {
            match tokio::time::timeout(options.shutdown_timeout, &mut server).await {
                Ok(result) => result?,
                Err(_) => warn!(timeout = ?options.shutdown_timeout, "shutdown timeout exceeded, dropping in-flight requests"),
            }
        }
    }

    if let Err(e) = provider.stop().await {
        warn!(error = %e, "provider stop failed");
    }
    info!("provider shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde_json::json;

    #[test]
    fn test_decode_empty_is_null() {
        assert_eq!(decode(b"").unwrap(), Value::Null);
        assert_eq!(decode(br#"{"a":1}"#).unwrap(), json!({"a": 1}));
        assert!(matches!(decode(b"{"), Err(ProviderError::Serialization(_))));
    }

    #[test]
    fn test_encode_null_is_empty() {
        assert!(encode(&Value::Null).is_empty());
        assert_eq!(encode(&json!({"id": "1"})), br#"{"id":"1"}"#.to_vec());
    }

    #[test]
    fn test_schema_to_proto_carries_allowed_values() {
        let schema = Schema::resource()
            .with_description("Flows")
            .with_attribute(
                "layout",
                Attribute::optional_string()
                    .with_default(json!("stacked"))
                    .one_of(&["stacked", "sidebar_left"]),
            );
        let proto = schema_to_proto(&schema);
        let block = proto.block.unwrap();
        assert_eq!(block.description, "Flows");

        let layout = block.attributes.iter().find(|a| a.name == "layout").unwrap();
        assert_eq!(layout.allowed_values, vec!["stacked", "sidebar_left"]);
        assert_eq!(layout.default_value, br#""stacked""#.to_vec());
        assert!(layout.optional);

        let id = block.attributes.iter().find(|a| a.name == "id").unwrap();
        assert!(id.computed);
    }

    #[test]
    fn test_diagnostics_to_proto() {
        let proto = diagnostics_to_proto(vec![
            Diagnostic::error("bad").with_attribute("name"),
            Diagnostic::warning("meh"),
        ]);
        assert_eq!(proto[0].severity, proto::diagnostic::Severity::Error as i32);
        assert_eq!(proto[0].attribute, "name");
        assert_eq!(proto[1].severity, proto::diagnostic::Severity::Warning as i32);
        assert!(proto[1].detail.is_empty());
    }

    #[tokio::test]
    async fn test_create_response_keeps_partial_state() {
        use crate::provider::AuthentikProvider;
        use crate::resources::test_support::FakeApi;
        use proto::provider_server::Provider;

        let api = FakeApi::new();
        api.route("POST", "core/groups/", 201, json!({"pk": "3f1c", "name": "ops"}));
        api.route("GET", "core/groups/3f1c/", 500, json!({"detail": "boom"}));
        let provider = AuthentikProvider::new().with_transport(api.clone());
        provider
            .configure(json!({"url": "https://authentik.test", "token": "t"}))
            .await
            .unwrap();
        let service = ProviderGrpcService {
            provider: Arc::new(provider),
        };

        let response = service
            .create(Request::new(proto::CreateRequest {
                resource_type: "authentik_group".to_string(),
                planned_state: br#"{"name":"ops"}"#.to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.contains("500"));
        let state = decode(&response.state).unwrap();
        assert_eq!(state["id"], "3f1c");

        let response = service
            .update(Request::new(proto::UpdateRequest {
                resource_type: "authentik_group".to_string(),
                prior_state: br#"{"id":"3f1c","name":"ops"}"#.to_vec(),
                planned_state: br#"{"id":"3f1c","name":"dev"}"#.to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(decode(&response.state).unwrap(), json!({"id": "3f1c", "name": "ops"}));
    }

    #[test]
    fn test_handshake_line() {
        let addr: SocketAddr = "127.0.0.1:50051".parse().unwrap();
        assert_eq!(handshake_line(addr), "AUTHENTIK_PROVIDER|1|127.0.0.1:50051");
    }

    #[test]
    fn test_serve_options() {
        assert_eq!(ServeOptions::default().shutdown_timeout, Duration::from_secs(30));
        let options = ServeOptions::new().with_shutdown_timeout(Duration::from_secs(5));
        assert_eq!(options.shutdown_timeout, Duration::from_secs(5));
    }
}
