use crate::types::*;
use std::{
  env,
  fs,
  path::{Path, PathBuf},
};
use tracing::warn;

pub fn repo_root() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn resolve_repo_path(raw: &str) -> PathBuf {
  let path = PathBuf::from(raw);
  if path.is_absolute() {
    path
  } else {
    repo_root().join(path)
  }
}

pub fn config_path() -> PathBuf {
  repo_root().join("config.json")
}

pub fn env_default(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

pub fn env_flag_true(key: &str) -> bool {
  match env::var(key) {
    Ok(value) => {
      let value = value.trim().to_ascii_lowercase();
      matches!(value.as_str(), "1" | "true" | "yes" | "on")
    }
    Err(_) => false,
  }
}

/// Fills settings the config file left empty from the environment.
pub fn apply_env_defaults(mut config: AppConfig) -> AppConfig {
  if config.tournament_record_path.trim().is_empty() {
    if let Some(value) = env_default("TOURNAMENT_RECORD_PATH") {
      config.tournament_record_path = value;
    }
  }
  if config.server_addr.trim().is_empty() || config.server_addr == DEFAULT_SERVER_ADDR {
    if let Some(value) = env_default("PARTICIPANTS_ADDR") {
      config.server_addr = value;
    }
  }
  if config.server_addr.trim().is_empty() {
    config.server_addr = DEFAULT_SERVER_ADDR.to_string();
  }
  if !config.use_publish_state {
    config.use_publish_state = env_flag_true("USE_PUBLISH_STATE");
  }
  if config.scheduled_minutes_difference.is_none() {
    if let Some(value) = env_default("SCHEDULED_MINUTES_DIFFERENCE") {
      match value.parse::<f64>() {
        Ok(minutes) if minutes.is_finite() => config.scheduled_minutes_difference = Some(minutes),
        _ => warn!("SCHEDULED_MINUTES_DIFFERENCE is not a number: {value}"),
      }
    }
  }
  if !config.diagnostics {
    config.diagnostics = env_flag_true("PARTICIPANTS_DIAGNOSTICS");
  }
  config
}

pub fn load_config_from(path: &Path) -> Result<AppConfig, String> {
  if !path.is_file() {
    return Ok(apply_env_defaults(AppConfig::default()));
  }
  let data = fs::read_to_string(path).map_err(|e| format!("read config {}: {e}", path.display()))?;
  let config =
    serde_json::from_str::<AppConfig>(&data).map_err(|e| format!("parse config {}: {e}", path.display()))?;
  Ok(apply_env_defaults(config))
}

pub fn load_config_inner() -> Result<AppConfig, String> {
  load_config_from(&config_path())
}

pub fn load_env_file() {
  let env_path = repo_root().join(".env");
  if !env_path.is_file() {
    return;
  }
  let contents = match fs::read_to_string(&env_path) {
    Ok(data) => data,
    Err(_) => return,
  };
  for line in contents.lines() {
    if let Some((key, value)) = parse_env_line(line) {
      if env::var_os(&key).is_none() {
        env::set_var(key, value);
      }
    }
  }
}

pub fn parse_env_line(line: &str) -> Option<(String, String)> {
  let trimmed = line.trim();
  if trimmed.is_empty() || trimmed.starts_with('#') {
    return None;
  }
  let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
  let (key, raw_value) = trimmed.split_once('=')?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  let mut value = raw_value.trim();
  if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if let Some(idx) = value.find('#') {
    value = value[..idx].trim_end();
  }
  Some((key.to_string(), value.to_string()))
}

/// Reads the competition record the server will answer queries against.
pub fn load_tournament_record(path: &Path) -> Result<Tournament, String> {
  let data = fs::read_to_string(path).map_err(|e| format!("read record {}: {e}", path.display()))?;
  serde_json::from_str::<Tournament>(&data).map_err(|e| format!("parse record {}: {e}", path.display()))
}

pub fn log_env_warnings(config: &AppConfig) {
  if config.tournament_record_path.trim().is_empty() {
    warn!("TOURNAMENT_RECORD_PATH is not set; set it in .env or config.json.");
  }
  if config.diagnostics {
    warn!("Participant diagnostics enabled; skipped references will be logged.");
  }
}
