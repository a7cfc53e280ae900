//! Core abstractions shared by service clients
//!
//! - `ServiceClient`: identity and telemetry of an upstream client

use std::collections::HashMap;

/// Base trait for all service clients
pub trait ServiceClient: Send + Sync {
    /// The client name/identifier
    fn name(&self) -> &str;

    /// The base URL for the service
    fn base_url(&self) -> &str;

    /// Returns the client's metrics and telemetry if available
    fn metrics(&self) -> Option<HashMap<String, String>>;
}
