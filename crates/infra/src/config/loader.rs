//! Configuration loader
//!
//! Loads [`CastkitConfig`] from environment variables or files.
//!
//! ## Loading Strategy
//! Sources are layered, later ones overriding earlier ones:
//! 1. Defaults
//! 2. The first config file found by [`find_config_file`]
//! 3. Environment variables (after reading `.env` when present)
//!
//! ## Environment Variables
//! Unset variables keep the value from the file or the defaults.
//! - `FARCASTER_API_URL`, `BASE_API_URL`: endpoint base URLs
//! - `API_TIMEOUT_MS`: per-attempt timeout
//! - `API_RETRY_MAX_ATTEMPTS`, `API_RETRY_INITIAL_DELAY_MS`,
//!   `API_RETRY_MAX_DELAY_MS`, `API_RETRY_BACKOFF_FACTOR`: default retry policy
//! - `LOG_LEVEL`: `debug`, `info`, `warn` or `error`
//! - `LOG_FORMAT`: `text` or `json`
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./castkit.toml`, `./castkit.json`
//! 2. `./config.toml`, `./config.json`
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::{CastkitConfig, ConfigError};

const ENV_KEYS: [&str; 9] = [
    "FARCASTER_API_URL",
    "BASE_API_URL",
    "API_TIMEOUT_MS",
    "API_RETRY_MAX_ATTEMPTS",
    "API_RETRY_INITIAL_DELAY_MS",
    "API_RETRY_MAX_DELAY_MS",
    "API_RETRY_BACKOFF_FACTOR",
    "LOG_LEVEL",
    "LOG_FORMAT",
];

const FILE_NAMES: [&str; 4] = ["castkit.toml", "castkit.json", "config.toml", "config.json"];

/// Load configuration from every available source
///
/// # Errors
///
/// Invalid environment values and malformed files are reported rather than
/// skipped. A missing file or an empty environment is not an error.
pub fn load() -> Result<CastkitConfig, ConfigError> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    layered(find_config_file(), |key| std::env::var(key).ok())
}

/// Load configuration from environment variables over the defaults
///
/// # Errors
///
/// [`ConfigError::Missing`] when none of the variables is set,
/// [`ConfigError::Invalid`] when one does not parse or the result fails
/// validation.
pub fn load_from_env() -> Result<CastkitConfig, ConfigError> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Load configuration from a file
///
/// If `path` is `None`, searches the standard locations. The format follows
/// the extension (`.toml` or `.json`).
///
/// # Errors
///
/// [`ConfigError::NotFound`] for a missing explicit path or when probing
/// finds nothing, plus read, parse and validation failures.
pub fn load_from_file(path: Option<PathBuf>) -> Result<CastkitConfig, ConfigError> {
    let config_path = match path {
        Some(p) if !p.exists() => return Err(ConfigError::NotFound(p)),
        Some(p) => p,
        None => find_config_file().ok_or_else(|| ConfigError::NotFound(PathBuf::from(FILE_NAMES[0])))?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let config = read_file(&config_path)?;
    config.validate()?;
    Ok(config)
}

/// Search the standard locations for a config file
///
/// Returns the first existing candidate.
pub fn find_config_file() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

/// Defaults, then `file` when given, then the variables `lookup` finds.
fn layered<F>(file: Option<PathBuf>, lookup: F) -> Result<CastkitConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let base = match file {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading configuration from file");
            read_file(&path)?
        }
        None => CastkitConfig::default(),
    };

    let config = if any_set(&lookup) {
        tracing::info!("Applying configuration from environment variables");
        apply_env(base, &lookup)?
    } else {
        base
    };

    config.validate()?;
    Ok(config)
}

/// Variables `lookup` finds over the defaults; none at all is `Missing`.
fn from_lookup<F>(lookup: F) -> Result<CastkitConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !any_set(&lookup) {
        return Err(ConfigError::Missing);
    }
    let config = apply_env(CastkitConfig::default(), &lookup)?;
    config.validate()?;
    Ok(config)
}

fn read_file(path: &Path) -> Result<CastkitConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    parse_config(&contents, path)
}

fn parse_config(contents: &str, path: &Path) -> Result<CastkitConfig, ConfigError> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            format: "TOML",
            message: e.to_string(),
        }),
        "json" => serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            format: "JSON",
            message: e.to_string(),
        }),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

fn any_set<F: Fn(&str) -> Option<String>>(lookup: &F) -> bool {
    ENV_KEYS.iter().any(|key| lookup(key).is_some())
}

/// Override `config` with every variable `lookup` finds.
fn apply_env<F>(mut config: CastkitConfig, lookup: &F) -> Result<CastkitConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("FARCASTER_API_URL") {
        config.api.farcaster_url = url;
    }
    if let Some(url) = lookup("BASE_API_URL") {
        config.api.base_url = url;
    }
    if let Some(ms) = parsed::<u64, _>(lookup, "API_TIMEOUT_MS")? {
        config.api.timeout = Duration::from_millis(ms);
    }
    if let Some(n) = parsed(lookup, "API_RETRY_MAX_ATTEMPTS")? {
        config.retry.max_attempts = n;
    }
    if let Some(ms) = parsed::<u64, _>(lookup, "API_RETRY_INITIAL_DELAY_MS")? {
        config.retry.initial_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = parsed::<u64, _>(lookup, "API_RETRY_MAX_DELAY_MS")? {
        config.retry.max_delay = Duration::from_millis(ms);
    }
    if let Some(factor) = parsed(lookup, "API_RETRY_BACKOFF_FACTOR")? {
        config.retry.backoff_factor = factor;
    }
    if let Some(level) = parsed(lookup, "LOG_LEVEL")? {
        config.logging.level = level;
    }
    if let Some(format) = parsed(lookup, "LOG_FORMAT")? {
        config.logging.format = format;
    }

    Ok(config)
}

fn parsed<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                key: key.to_string(),
                message: format!("'{raw}': {e}"),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use castkit_common::observability::LogLevel;
    use tempfile::TempDir;

    use super::*;
    use crate::observability::LogFormat;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn empty_environment_is_missing() {
        assert!(matches!(from_lookup(|_| None), Err(ConfigError::Missing)));
    }

    #[test]
    fn partial_environment_keeps_defaults() {
        let config = from_lookup(lookup_from(&[("LOG_LEVEL", "WARN")])).unwrap();
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.api.farcaster_url, "https://api.farcaster.xyz/v1");
    }

    #[test]
    fn all_variables_apply() {
        let config = from_lookup(lookup_from(&[
            ("FARCASTER_API_URL", "http://localhost:8080/fc"),
            ("BASE_API_URL", "http://localhost:8080/base"),
            ("API_TIMEOUT_MS", "2500"),
            ("API_RETRY_MAX_ATTEMPTS", "5"),
            ("API_RETRY_INITIAL_DELAY_MS", "100"),
            ("API_RETRY_MAX_DELAY_MS", "800"),
            ("API_RETRY_BACKOFF_FACTOR", "1.5"),
            ("LOG_LEVEL", "debug"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.api.farcaster_url, "http://localhost:8080/fc");
        assert_eq!(config.api.base_url, "http://localhost:8080/base");
        assert_eq!(config.api.timeout, Duration::from_millis(2500));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(100));
        assert_eq!(config.retry.max_delay, Duration::from_millis(800));
        assert!((config.retry.backoff_factor - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn unparsable_number_names_the_variable() {
        let err = from_lookup(lookup_from(&[("API_RETRY_MAX_ATTEMPTS", "lots")])).unwrap_err();
        assert!(matches!(&err, ConfigError::Invalid { key, .. } if key == "API_RETRY_MAX_ATTEMPTS"));
        assert!(err.to_string().contains("'lots'"));
    }

    #[test]
    fn inconsistent_policy_is_rejected() {
        let err = from_lookup(lookup_from(&[
            ("API_RETRY_INITIAL_DELAY_MS", "5000"),
            ("API_RETRY_MAX_DELAY_MS", "100"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == "retry"));
    }

    #[test]
    fn environment_layers_over_file() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "castkit.toml",
            "[api]\nbase_url = \"http://127.0.0.1:9001\"\n\n[retry]\nmax_attempts = 7\n",
        );

        let config = layered(Some(path), lookup_from(&[("LOG_LEVEL", "warn")])).unwrap();

        assert_eq!(config.retry.max_attempts, 7);
        assert_eq!(config.api.base_url, "http://127.0.0.1:9001");
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn environment_wins_on_the_same_key() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "castkit.toml", "[retry]\nmax_attempts = 7\n");

        let config =
            layered(Some(path), lookup_from(&[("API_RETRY_MAX_ATTEMPTS", "2")])).unwrap();
        assert_eq!(config.retry.max_attempts, 2);
    }

    #[test]
    fn layering_without_sources_is_defaults() {
        assert_eq!(layered(None, |_| None).unwrap(), CastkitConfig::default());
    }

    #[test]
    fn environment_can_repair_a_file_policy() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "castkit.toml", "[retry]\nmax_attempts = 0\n");

        assert!(layered(Some(path.clone()), |_| None).is_err());
        let config = layered(Some(path), lookup_from(&[("API_RETRY_MAX_ATTEMPTS", "4")])).unwrap();
        assert_eq!(config.retry.max_attempts, 4);
    }

    #[test]
    fn toml_file_overrides_sections() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "castkit.toml",
            r#"
[api]
farcaster_url = "http://127.0.0.1:9000"
timeout_ms = 1500

[retry]
max_attempts = 4
initial_delay_ms = 200

[logging]
format = "json"
"#,
        );

        let config = load_from_file(Some(path)).unwrap();
        assert_eq!(config.api.farcaster_url, "http://127.0.0.1:9000");
        assert_eq!(config.api.base_url, "https://api.base.org/v1");
        assert_eq!(config.api.timeout, Duration::from_millis(1500));
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(200));
        assert_eq!(config.retry.max_delay, Duration::from_millis(10_000));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn json_file_is_supported() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "config.json", r#"{ "retry": { "max_attempts": 1 } }"#);
        assert_eq!(load_from_file(Some(path)).unwrap().retry.max_attempts, 1);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "castkit.toml", "[api\nfarcaster_url = ");
        assert!(matches!(load_from_file(Some(path)), Err(ConfigError::Parse { format: "TOML", .. })));
    }

    #[test]
    fn missing_explicit_path_is_not_found() {
        let err = load_from_file(Some(PathBuf::from("/nonexistent/castkit.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = parse_config("a: 1", Path::new("castkit.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "yaml"));
    }
}
