use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{AppError, Context, Result};

use super::{validator, ServiceConfig};

/// Load a service configuration JSON file, then apply environment overrides and validate.
///
/// The path is tried as given, next to the running executable and under the working
/// directory, in that order.
pub fn load_service_config<P: AsRef<Path>>(path: P) -> Result<ServiceConfig> {
    let path = path.as_ref();
    let mut last_error = None;

    for candidate in search_paths(path) {
        match fs::read_to_string(&candidate) {
            Ok(content) => {
                let config: ServiceConfig = serde_json::from_str(&content).with_context(|| {
                    format!("failed to parse service config JSON at {}", candidate.display())
                })?;
                log::debug!("loaded service config from {}", candidate.display());

                let config = config.apply_env_overrides();
                validator::validate_service_config(&config)?;
                return Ok(config);
            }
            Err(err) => {
                last_error = Some(format!("failed to read {}: {}", candidate.display(), err));
            }
        }
    }

    Err(AppError::Config(format!(
        "could not find service config. Last error: {}",
        last_error.unwrap_or_else(|| "no search paths".to_string())
    )))
}

/// Resolve the configuration to use: the file when one is given, the builtin defaults otherwise.
pub fn resolve_service_config(path: Option<&Path>) -> Result<ServiceConfig> {
    match path {
        Some(path) => load_service_config(path),
        None => {
            let config = ServiceConfig::builtin().apply_env_overrides();
            validator::validate_service_config(&config)?;
            Ok(config)
        }
    }
}

fn search_paths(path: &Path) -> Vec<PathBuf> {
    let mut paths = vec![path.to_path_buf()];
    if path.is_absolute() {
        return paths;
    }

    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        paths.push(dir.join(path));
    }
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(path));
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_config_from_absolute_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"extraction_base_uri": "https://dss.example.com", "poll": {{"interval_secs": 2, "max_attempts": 10}}}}"#
        )
        .unwrap();

        let config = load_service_config(file.path()).expect("config should load");
        assert_eq!(config.poll.interval_secs, 2);
        assert_eq!(config.poll.max_attempts, Some(10));
        assert_eq!(config.prefer_wait_secs, 5);
    }

    #[test]
    fn reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_service_config(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn rejects_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = load_service_config(file.path()).unwrap_err();
        assert!(
            err.to_string().contains("failed to parse service config"),
            "unexpected error message: {err}"
        );
    }
}
