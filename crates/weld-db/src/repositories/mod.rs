//! Repository implementations for PostgreSQL

pub mod group_mapping;
pub mod space;
pub mod user;

pub use group_mapping::*;
pub use space::*;
pub use user::*;
