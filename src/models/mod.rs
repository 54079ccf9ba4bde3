//! # Data Models
//!
//! This module contains the SeaORM entities for the DevTrack API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod commit;
pub mod repo;
pub mod summary;
pub mod user;

pub use commit::Entity as Commit;
pub use repo::Entity as Repo;
pub use summary::Entity as Summary;
pub use summary::Timeframe;
pub use user::Entity as User;

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
            service: "devtrack".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
