use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ZipviewError};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:9411";
pub const DEFAULT_API_ROOT: &str = "/api/v2";
pub const DEFAULT_DEPENDENCY_LOOKBACK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub base_url: String,
    pub site_prefix: String,
    pub api_root: String,
    pub dependency_lookback: Duration,
    pub request_timeout: Duration,
    pub headers: Vec<(String, String)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            site_prefix: String::new(),
            api_root: DEFAULT_API_ROOT.to_string(),
            dependency_lookback: DEFAULT_DEPENDENCY_LOOKBACK,
            request_timeout: Duration::from_secs(10),
            headers: Vec::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(path) = config_file_path()
            && let Some(file_overrides) = load_file_overrides(&path)?
        {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        let env_overrides = load_env_overrides();
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }

    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        apply_overrides(&mut cfg, load_env_overrides(), "environment")?;
        Ok(cfg)
    }

    pub fn dependency_lookback_ms(&self) -> u64 {
        u64::try_from(self.dependency_lookback.as_millis()).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    base_url: Option<String>,
    site_prefix: Option<String>,
    api_root: Option<String>,
    dependency_lookback: Option<String>,
    request_timeout: Option<String>,
    headers: Option<String>,
}

/// `$ZIPVIEW_CONFIG`, else `zipview/config.toml` under the XDG config home.
fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os("ZIPVIEW_CONFIG") {
        return Some(PathBuf::from(path));
    }
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .map(|dir| dir.join("zipview").join("config.toml"))
}

fn load_file_overrides(path: &Path) -> Result<Option<ConfigOverrides>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ZipviewError::Config(format!(
                "cannot read {}: {e}",
                path.display()
            )));
        }
    };
    parse_file_overrides(&raw)
        .map(Some)
        .map_err(|e| ZipviewError::Config(format!("invalid TOML in {}: {e}", path.display())))
}

fn parse_file_overrides(raw: &str) -> std::result::Result<ConfigOverrides, toml::de::Error> {
    toml::from_str(raw)
}

fn load_env_overrides() -> ConfigOverrides {
    ConfigOverrides {
        base_url: env::var("ZIPVIEW_BASE_URL").ok(),
        site_prefix: env::var("ZIPVIEW_SITE_PREFIX").ok(),
        api_root: env::var("ZIPVIEW_API_ROOT").ok(),
        dependency_lookback: env::var("ZIPVIEW_DEPENDENCY_LOOKBACK").ok(),
        request_timeout: env::var("ZIPVIEW_REQUEST_TIMEOUT").ok(),
        headers: env::var("ZIPVIEW_HEADERS").ok(),
    }
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.base_url {
        cfg.base_url = v.trim_end_matches('/').to_string();
    }
    if let Some(v) = overrides.site_prefix {
        cfg.site_prefix = v;
    }
    if let Some(v) = overrides.api_root {
        cfg.api_root = v;
    }
    if let Some(v) = overrides.dependency_lookback {
        cfg.dependency_lookback = humantime::parse_duration(&v).map_err(|e| {
            ZipviewError::Config(format!(
                "bad dependency_lookback in {source}: {e} (value={v})"
            ))
        })?;
    }
    if let Some(v) = overrides.request_timeout {
        cfg.request_timeout = humantime::parse_duration(&v).map_err(|e| {
            ZipviewError::Config(format!("bad request_timeout in {source}: {e} (value={v})"))
        })?;
    }
    if let Some(v) = overrides.headers {
        cfg.headers = parse_headers(&v).map_err(|e| {
            ZipviewError::Config(format!("bad headers in {source}: {e} (value={v})"))
        })?;
    }
    Ok(())
}

/// Parses the credential headers sent with every Zipkin request.
///
/// Entries are comma separated `name=value` pairs. Only the first `=` splits,
/// so base64 padding in values survives. Names are lowercased.
pub fn parse_headers(raw: &str) -> Result<Vec<(String, String)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, value) = entry.split_once('=').ok_or_else(|| {
                ZipviewError::Config(format!("header `{entry}` is missing `=`"))
            })?;
            let name = name.trim();
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(ZipviewError::Config(format!(
                    "header `{entry}` has an invalid name"
                )));
            }
            Ok((name.to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_local_zipkin() {
        let cfg = Config::default();
        assert_eq!(cfg.base_url, "http://127.0.0.1:9411");
        assert_eq!(cfg.api_root, "/api/v2");
        assert_eq!(cfg.site_prefix, "");
    }

    #[test]
    fn default_dependency_lookback_is_one_week() {
        let cfg = Config::default();
        assert_eq!(cfg.dependency_lookback_ms(), 604_800_000);
    }

    #[test]
    fn basic_auth_padding_survives() {
        let headers = parse_headers("Authorization=Basic YWRtaW46YWRtaW4=").unwrap();
        assert_eq!(
            headers,
            vec![("authorization".to_string(), "Basic YWRtaW46YWRtaW4=".to_string())]
        );
    }

    #[test]
    fn header_list_tolerates_blank_entries() {
        let headers = parse_headers(" x-scope-orgid = team-a ,, cookie=session=abc; path=/,").unwrap();
        assert_eq!(
            headers,
            vec![
                ("x-scope-orgid".to_string(), "team-a".to_string()),
                ("cookie".to_string(), "session=abc; path=/".to_string()),
            ]
        );
    }

    #[test]
    fn header_errors_name_the_entry() {
        let err = parse_headers("x-scope-orgid=a,zipkin").unwrap_err();
        assert!(err.to_string().contains("`zipkin` is missing `=`"));
        assert!(parse_headers("=token").is_err());
        assert!(parse_headers("x scope=a").is_err());
    }

    #[test]
    fn missing_config_file_is_not_an_error() {
        let path = Path::new("/nonexistent/zipview/config.toml");
        assert!(load_file_overrides(path).unwrap().is_none());
    }

    #[test]
    fn file_overrides_apply() {
        let raw = r#"
            base_url = "https://zipkin.internal/"
            site_prefix = "/zipkin"
            dependency_lookback = "2d"
            request_timeout = "3s"
            headers = "authorization=Basic abc"
        "#;
        let overrides = parse_file_overrides(raw).unwrap();
        let mut cfg = Config::default();
        apply_overrides(&mut cfg, overrides, "config file").unwrap();

        assert_eq!(cfg.base_url, "https://zipkin.internal");
        assert_eq!(cfg.site_prefix, "/zipkin");
        assert_eq!(cfg.api_root, "/api/v2");
        assert_eq!(cfg.dependency_lookback_ms(), 2 * 86_400_000);
        assert_eq!(cfg.request_timeout, Duration::from_secs(3));
        assert_eq!(
            cfg.headers,
            vec![("authorization".to_string(), "Basic abc".to_string())]
        );
    }

    #[test]
    fn bad_duration_names_its_source() {
        let mut cfg = Config::default();
        let overrides = ConfigOverrides {
            request_timeout: Some("soon".to_string()),
            ..ConfigOverrides::default()
        };
        let err = apply_overrides(&mut cfg, overrides, "environment").unwrap_err();
        assert!(err.to_string().contains("request_timeout in environment"));
    }
}
