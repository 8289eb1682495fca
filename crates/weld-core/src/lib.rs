//! Weld Core - Domain types, relationship model, and traits for space provisioning

pub mod authz;
pub mod error;
pub mod ids;
pub mod mappings;
pub mod models;
pub mod spaces;
pub mod traits;

#[cfg(any(test, feature = "test-util"))]
pub mod testkit;

pub use authz::*;
pub use error::*;
pub use ids::*;
pub use mappings::*;
pub use models::*;
pub use spaces::*;
pub use traits::*;
