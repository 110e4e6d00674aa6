//! Provider plugin for the [authentik](https://goauthentik.io) identity API.
//!
//! The crate maps resource and data source schemas onto the authentik REST
//! API (`/api/v3`) and serves them to a declarative-infrastructure host over
//! the gRPC plugin protocol in `proto/provider.proto`.
//!
//! # Layers
//!
//! - [`helpers`], [`state`]: the dynamic attribute store and the accessors
//!   that move values between it and typed API structs.
//! - [`diag`], [`error`]: HTTP failures turned into host diagnostics.
//! - [`transport`], [`client`]: the instrumented HTTP stack.
//! - [`resources`], [`data_sources`]: one module per authentik object.
//! - [`provider`]: registration tables and dispatch.
//! - [`server`]: the gRPC service, handshake and shutdown handling.
//!
//! # Handshake
//!
//! On startup the provider prints one line to stdout and logs to stderr:
//!
//! ```text
//! AUTHENTIK_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! # Configuration
//!
//! | attribute | environment fallback |
//! |---|---|
//! | `url` | `AUTHENTIK_URL` |
//! | `token` | `AUTHENTIK_TOKEN` |
//! | `insecure` | `AUTHENTIK_INSECURE` |
//! | `headers` | none |
//!
//! Setting `AUTHENTIK_TEST_FAIL_REQUESTS=true` answers every API request with
//! HTTP 400 without touching the network.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod data_sources;
pub mod diag;
pub mod error;
pub mod helpers;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod state;
pub mod testing;
pub mod transport;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
pub mod models;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use client::ApiClient;
pub use config::ProviderConfig;
pub use error::{ApiError, ProviderError};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::AuthentikProvider;
pub use schema::ProviderSchema;
pub use server::{serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions};
pub use state::ResourceData;
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities, HANDSHAKE_PREFIX,
    PROTOCOL_VERSION,
};
pub use validation::{is_valid, validate, validate_result};
