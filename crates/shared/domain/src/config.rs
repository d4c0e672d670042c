use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Every configuration section of the service.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfigInner {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub model: ModelConfig,
    pub log: LogConfig,
}

/// Arc-wrapped [`ApiConfigInner`], cheap to clone into slices.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(flatten, default)]
    inner: Arc<ApiConfigInner>,
}

impl Deref for ApiConfig {
    type Target = ApiConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ApiConfig {
    fn deref_mut(&mut self) -> &mut ApiConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub ssl: Option<SslConfig>,
}

/// TLS certificate and key, PEM encoded.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SslConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials; leave unset for `mem://` and embedded engines.
    pub credentials: Option<DatabaseCredentials>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseCredentials {
    pub username: String,
    pub password: String,
}

/// Media and static asset locations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of uploaded images, saved drawings and the report log.
    pub data_dir: PathBuf,
    /// Directory served at `/` (holds `index.html`).
    pub static_dir: PathBuf,
    /// URL prefix under which `data_dir` is served. Always ends with `/`.
    pub media_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// CRNN weights in safetensors format.
    pub weights: PathBuf,
    /// Start with a placeholder recognizer when `weights` does not exist.
    pub allow_missing: bool,
}

#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives. `RUST_LOG` overrides it.
    pub filter: String,
    /// Rolling log file directory. Console only when unset.
    pub dir: Option<PathBuf>,
    /// Write the log file as JSON lines.
    pub json: bool,
}

#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Upper bound of revoked tokens remembered at once.
    pub session_cache_capacity: u64,
    pub jwt: JwtConfig,
    /// Mark the session cookie `Secure`. Enable behind TLS.
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_seconds: u64,
    pub clock_skew_seconds: u64,
}

impl StorageConfig {
    /// Public URL of a stored media path.
    #[must_use]
    pub fn media_url_for(&self, path: &str) -> String {
        let prefix = self.media_url.trim_end_matches('/');
        format!("{prefix}/{}", path.trim_start_matches('/'))
    }
}

// --- Default ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 4583, ssl: None }
    }
}

impl Default for SslConfig {
    fn default() -> Self {
        Self { cert: PathBuf::from("cert.pem"), key: PathBuf::from("key.pem") }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "mem://".to_owned(),
            namespace: "scribe".to_owned(),
            database: "core".to_owned(),
            credentials: None,
        }
    }
}

impl Default for DatabaseCredentials {
    fn default() -> Self {
        Self { username: "root".to_owned(), password: "root".to_owned() }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("media"),
            static_dir: PathBuf::from("public"),
            media_url: "/media/".to_owned(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { weights: PathBuf::from("model/best_model.safetensors"), allow_missing: false }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self { session_cache_capacity: 10_000, jwt: JwtConfig::default(), cookie_secure: false }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "dev-only-change-me".to_owned(),
            issuer: "scribe".to_owned(),
            ttl_seconds: 86_400,
            clock_skew_seconds: 60,
        }
    }
}
