//! Hemmer provider for Instatus
//!
//! Manages components on an [Instatus](https://instatus.com) status page as
//! infrastructure. The crate builds into a provider plugin: Hemmer spawns the
//! binary, reads the handshake line from stdout, and drives it over gRPC.
//!
//! # Overview
//!
//! - [`client`]: async client for the Instatus components API
//! - [`component`]: the `instatus_component` resource (state mapping, plan, CRUD, import)
//! - [`provider`]: provider configuration and resource routing ([`InstatusProvider`])
//! - [`server`]: the [`ProviderService`] trait and gRPC serving with the handshake
//! - [`schema`] / [`validation`]: schema description and config validation
//! - [`testing`]: a harness for driving a provider without gRPC
//!
//! # Configuration
//!
//! ```hcl
//! provider "instatus" {
//!   api_key = var.instatus_api_key   # or INSTATUS_API_KEY
//!   page_id = "ckxyz123"             # or INSTATUS_PAGE_ID
//! }
//!
//! resource "instatus_component" "api" {
//!   name        = "API"
//!   description = "Public REST API"
//!   status      = "OPERATIONAL"
//!   group_id    = "ckgrp456"
//! }
//! ```
//!
//! # Handshake Protocol
//!
//! When started via [`serve`], the provider prints a single line to stdout:
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `HEMMER_PROVIDER|<protocol_version>|<address>`
//!
//! # Provider Protocol
//!
//! - **GetMetadata**: Returns provider capabilities and resource names
//! - **GetSchema**: Returns the provider config and resource schemas
//! - **ValidateProviderConfig** / **Configure**: Check and apply credentials
//! - **Stop**: Gracefully shuts down the provider
//! - **ValidateResourceConfig**: Validates resource configuration
//! - **UpgradeResourceState**: Migrates state from older schema versions
//! - **Plan**: Calculates required changes
//! - **Create/Read/Update/Delete**: CRUD operations for resources
//! - **ImportResourceState**: Imports existing components by ID

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod component;
pub mod error;
pub mod logging;
pub mod provider;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

// Re-export main types at crate root
pub use client::{ApiError, ClientConfig, ComponentStatus, InstatusClient};
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::{InstatusProvider, ProviderConfig};
pub use schema::ProviderSchema;
pub use server::{serve, serve_with_options, serve_with_shutdown, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::validate;

pub use async_trait::async_trait;
pub use serde_json;
pub use tonic;
pub use tracing;
