use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

/// Prefix of environment overrides, e.g. `SCRIBE__MODEL__WEIGHTS`.
pub const ENV_PREFIX: &str = "SCRIBE";

#[scribe_derive::scribe_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads `T` from a config file overlaid with `SCRIBE__` environment variables.
///
/// `path` defaults to `server` in the working directory; the extension is optional
/// (`server.toml`, `server.yaml`, ...). Nested keys use `__`: `SCRIBE__DATABASE__URL`
/// sets `database.url`.
///
/// # Errors
/// Returns [`ConfigError::Config`] if the file is missing or the merged values do not
/// deserialize into `T`.
///
/// # Example
/// ```rust
/// use scribe_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let path = path.map_or_else(|| PathBuf::from("server"), |p| p.as_ref().to_path_buf());

    info!(path = %path.display(), "Loading configuration");

    Config::builder()
        .add_source(File::from(path.as_path()).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .convert_case(config::Case::Snake),
        )
        .build()
        .context(format!("Failed to read {}", path.display()))?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_domain::config::ApiConfig;

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_config::<ApiConfig>(Some("does/not/exist")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist"));
    }

    #[test]
    fn test_toml_sections_are_merged_over_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = dir.path().join("server.toml");
        std::fs::write(
            &file,
            "[server]\nport = 9000\n\n[model]\nallow_missing = true\n\n[storage]\nmedia_url = \"/m/\"\n",
        )
        .expect("write config");

        let cfg: ApiConfig = load_config(Some(&file)).expect("config loads");
        assert_eq!(cfg.server.port, 9000);
        assert!(cfg.model.allow_missing);
        assert_eq!(cfg.storage.media_url, "/m/");
        assert_eq!(cfg.database.namespace, "scribe");
    }
}
