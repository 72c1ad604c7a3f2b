//! # Data Models
//!
//! This module contains all the data models used throughout the Accounts API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod client;
pub mod project;
pub mod user;

pub use client::Entity as Client;
pub use client::SafeClient;
pub use project::Entity as Project;
pub use project::SafeProject;
pub use user::Entity as User;
pub use user::{Role, SafeUser};

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "accounts-api".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
