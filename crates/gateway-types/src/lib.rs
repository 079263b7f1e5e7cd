//! Common types module for the payment gateway.
//!
//! This module defines the data model shared by every gateway component:
//! orders and the parties they bind, the domain context that pins orders to
//! one running instance, relay calls handed to the host platform, events,
//! storage keys and the HTTP API surface.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Domain context binding orders to one instance on one network.
pub mod domain;
/// Event types published by the engine after a committed operation.
pub mod events;
/// Order, parties and authorization types.
pub mod order;
/// Value-carrying calls executed by the host platform.
pub mod relay;
/// Storage types for managing persistent data.
pub mod storage;
/// Utility functions for digest encoding and formatting.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use alloy_primitives::{Address, Bytes, B256, U256};

// Re-export all types for convenient access
pub use api::*;
pub use domain::DomainContext;
pub use events::*;
pub use order::*;
pub use relay::*;
pub use storage::*;
pub use utils::truncate_id;
pub use validation::*;
