//! Server configuration

use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub openfga: OpenFgaSettings,
    pub auth: AuthSettings,
    pub directory: DirectorySettings,
    pub organization: OrganizationSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct OpenFgaSettings {
    #[serde(default = "default_openfga_endpoint")]
    pub endpoint: String,
    /// Pre-shared key; empty when the server runs without auth.
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub use_tls: bool,
    #[serde(default = "default_store_name")]
    pub store_name: String,
    /// When set, bootstrap reuses this store instead of creating one.
    #[serde(default)]
    pub store_id: Option<String>,
}

/// Bearer-token verification settings. The secret, issuer, and audience
/// must match what the identity provider signs.
#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    pub token_secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Deserialize)]
pub struct DirectorySettings {
    pub endpoint: String,
    #[serde(default = "default_directory_timeout")]
    pub timeout_secs: u64,
}

/// The single organization every space is projected under.
#[derive(Debug, Deserialize)]
pub struct OrganizationSettings {
    #[serde(default = "default_organization_id")]
    pub id: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    10
}

fn default_openfga_endpoint() -> String {
    "http://localhost:8081".to_string()
}

fn default_store_name() -> String {
    "weld".to_string()
}

fn default_directory_timeout() -> u64 {
    10
}

fn default_organization_id() -> String {
    "00000000-0000-0000-0000-000000000001".to_string()
}

impl Settings {
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.max_connections", 10)?
            .set_default("openfga.endpoint", "http://localhost:8081")?
            .set_default("openfga.token", "")?
            .set_default("openfga.use_tls", false)?
            .set_default("openfga.store_name", "weld")?
            .set_default("directory.timeout_secs", 10)?
            .set_default("organization.id", "00000000-0000-0000-0000-000000000001")?
            // Load from config file if present
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // Load from environment variables with WELD_ prefix
            .add_source(
                config::Environment::with_prefix("WELD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
