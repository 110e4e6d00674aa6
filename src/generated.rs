//! Protocol buffer types for the provider plugin protocol.
//!
//! Generated at build time from `proto/provider.proto`. Top-level messages are
//! plain structs, nested enums live in snake_case modules (for example
//! `diagnostic::Severity`) and the gRPC service trait is
//! `provider_server::Provider`.

include!(concat!(env!("OUT_DIR"), "/authentik.provider.v1.rs"));
