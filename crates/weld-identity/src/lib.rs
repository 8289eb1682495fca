//! Weld Identity - login-event reconciliation, token verification, and
//! the identity directory adapter
//!
//! The reconciliation engine is the write path that keeps the
//! relational membership record, the OU-mapping table, and the
//! authorization store's tuples consistent with what the identity
//! directory says about a user at login time.

pub mod directory;
pub mod provisioner;
pub mod token;

#[cfg(test)]
mod tests;

pub use directory::HttpIdentityDirectory;
pub use provisioner::Provisioner;
pub use token::{Claims, TokenVerifier};
