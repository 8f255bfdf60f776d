//! Runtime settings for the binaries
//!
//! Defaults, then `DASHBOARD_*` environment variables, then command-line flags.

use crate::error::{IngestError, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_BIND: &str = "DASHBOARD_BIND";
pub const ENV_STATIC_DIR: &str = "DASHBOARD_STATIC_DIR";
pub const ENV_MAX_UPLOAD_MB: &str = "DASHBOARD_MAX_UPLOAD_MB";
pub const ENV_PRETTY: &str = "DASHBOARD_PRETTY";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub static_dir: PathBuf,
    pub max_upload_mb: usize,
    pub pretty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            static_dir: PathBuf::from("static"),
            max_upload_mb: 64,
            pretty: false,
        }
    }
}

impl Config {
    /// Defaults overridden by whatever is set in the process environment.
    pub fn from_env() -> Result<Self> {
        Self::default().with_vars(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reading variables through `lookup`.
    pub fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(v) = lookup(ENV_BIND) {
            self.bind_addr = parse_value(ENV_BIND, &v)?;
        }
        if let Some(v) = lookup(ENV_STATIC_DIR) {
            self.static_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_MAX_UPLOAD_MB) {
            self.max_upload_mb = parse_value(ENV_MAX_UPLOAD_MB, &v)?;
        }
        if let Some(v) = lookup(ENV_PRETTY) {
            self.pretty = parse_flag(ENV_PRETTY, &v)?;
        }
        Ok(self)
    }

    /// Consumes the flags this struct knows about and returns the remaining
    /// arguments in order.
    pub fn apply_args<I>(&mut self, args: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = String>,
    {
        let mut rest = Vec::new();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--pretty" => self.pretty = true,
                "--bind" => self.bind_addr = parse_value("--bind", &next_value(&mut args, "--bind")?)?,
                "--static-dir" => self.static_dir = PathBuf::from(next_value(&mut args, "--static-dir")?),
                "--max-upload-mb" => {
                    self.max_upload_mb = parse_value("--max-upload-mb", &next_value(&mut args, "--max-upload-mb")?)?
                }
                _ => rest.push(arg),
            }
        }
        Ok(rest)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| IngestError::Config(format!("{flag} expects a value")))
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| IngestError::Config(format!("{name}: invalid value '{value}'")))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(IngestError::Config(format!("{name}: invalid value '{value}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_defaults() {
        let config = Config::default()
            .with_vars(vars(&[(ENV_BIND, "0.0.0.0:8080"), (ENV_PRETTY, "yes")]))
            .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.pretty);
        assert_eq!(config.max_upload_mb, 64);
    }

    #[test]
    fn bad_env_value_is_config_error() {
        let err = Config::default()
            .with_vars(vars(&[(ENV_MAX_UPLOAD_MB, "lots")]))
            .unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
    }

    #[test]
    fn args_are_consumed_and_rest_returned() {
        let mut config = Config::default();
        let rest = config
            .apply_args(
                ["--pretty", "a.xlsx", "--max-upload-mb", "8", "dir"]
                    .into_iter()
                    .map(String::from),
            )
            .unwrap();
        assert!(config.pretty);
        assert_eq!(config.max_upload_bytes(), 8 * 1024 * 1024);
        assert_eq!(rest, vec!["a.xlsx".to_string(), "dir".to_string()]);
    }

    #[test]
    fn missing_flag_value_errors() {
        let mut config = Config::default();
        assert!(config.apply_args(vec!["--bind".to_string()]).is_err());
    }
}
