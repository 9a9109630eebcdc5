//! Environment variable names used by this crate to configure loggers
//! without code changes.
//!
//! These are purely helpers; `LoggerBuilder` and `LayerConfig` can be
//! configured explicitly without touching the environment.

use crate::entry::ServiceContext;
use crate::error::{Error, Result};
use crate::severity::LevelFilter;

/// Minimum level to emit, e.g. `debug` or `warning`. Defaults to `info`.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Service version reported in `serviceContext`.
pub const SERVICE_VERSION_ENV: &str = "VERSION";

/// Service name reported in `serviceContext`.
pub const SERVICE_NAME_ENV: &str = "SERVICE_NAME";

/// Version used when `VERSION` is not set.
pub const DEFAULT_VERSION: &str = "latest";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Level filter from `LOG_LEVEL`, or `info` when unset.
pub fn level_from_env() -> Result<LevelFilter> {
    match std::env::var(LOG_LEVEL_ENV) {
        Ok(value) if !value.trim().is_empty() => value.parse(),
        _ => Ok(LevelFilter::default()),
    }
}

/// Derive the service context used for error reporting.
///
/// The name is `service` when given, else `SERVICE_NAME`, else the file stem
/// of the running executable. The version comes from `VERSION` and defaults
/// to `latest`.
pub fn default_service_context(service: Option<&str>) -> Result<ServiceContext> {
    let service = match service {
        Some(name) => name.to_string(),
        None => match std::env::var(SERVICE_NAME_ENV) {
            Ok(name) if !name.is_empty() => name,
            _ => executable_name()?,
        },
    };
    Ok(ServiceContext::new(service, env_or(SERVICE_VERSION_ENV, DEFAULT_VERSION)))
}

fn executable_name() -> Result<String> {
    let exe = std::env::current_exe().map_err(|e| Error::ServiceContext(e.to_string()))?;
    exe.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or_else(|| Error::ServiceContext(format!("no file name in {}", exe.display())))
}
