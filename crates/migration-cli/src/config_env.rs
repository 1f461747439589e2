//! Assembles the immutable [`Config`] from the environment once at
//! startup (SPEC_FULL.md §4.1), `dotenvy`-loading a `.env` file first in
//! the tradition of the original tool's `python-dotenv` use.

use migration_connector::config::Config;
use migration_connector::error::ConfigError;
use migration_connector::model::ServerEndpoint;
use migration_connector::patterns::{parse_force_pattern_list, parse_skip_pattern_list};
use std::path::PathBuf;

pub fn load() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();

    let source = ServerEndpoint {
        host: require("READ_DB_HOST")?,
        port: port_var("READ_DB_PORT")?,
        user: require("READ_DB_USER")?,
        password: require("READ_DB_PASSWORD")?,
        charset: "utf8mb4".to_string(),
    };

    let destination = ServerEndpoint {
        host: require("WRITE_DB_HOST")?,
        port: port_var("WRITE_DB_PORT")?,
        user: require("WRITE_DB_USER")?,
        password: require("WRITE_DB_PASSWORD")?,
        charset: "utf8mb4".to_string(),
    };

    let auto_confirm_threshold = u64_var("AUTO_CONFIRM_THRESHOLD", Config::DEFAULT_AUTO_CONFIRM_THRESHOLD)?;
    let seed_user_ids = id_list_var("SEED_USER_IDS", Config::DEFAULT_SEED_USER_IDS)?;
    let force_migrate_tables = parse_force_pattern_list(&str_var("FORCE_MIGRATE_TABLES", Config::DEFAULT_FORCE_MIGRATE_TABLES));
    let skip_tables = parse_skip_pattern_list(&str_var("SKIP_TABLES", ""));
    let state_dir = PathBuf::from(str_var("MIGRATION_STATE_DIR", Config::DEFAULT_STATE_DIR));
    let skip_large_tables = str_var("SKIP_LARGE_TABLES", "false").eq_ignore_ascii_case("true");

    Ok(Config {
        source,
        destination,
        auto_confirm_threshold,
        seed_user_ids,
        force_migrate_tables,
        skip_tables,
        state_dir,
        skip_large_tables,
        batch_size: Config::DEFAULT_BATCH_SIZE,
        max_chain_depth: Config::DEFAULT_MAX_CHAIN_DEPTH,
    })
}

fn require(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingValue(key))
}

fn str_var(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn port_var(key: &str) -> Result<u16, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::MalformedIdList(format!("{key}={raw}"))),
        Err(_) => Ok(3306),
    }
}

fn u64_var(key: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::MalformedIdList(format!("{key}={raw}"))),
        Err(_) => Ok(default),
    }
}

fn id_list_var(key: &str, default: &[i64]) -> Result<Vec<i64>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => parse_id_list(&raw),
        Err(_) => Ok(default.to_vec()),
    }
}

/// Shared with CLI argument parsing for `--customer-ids`/`--force-tables`
/// id lists entered as a single comma-joined string.
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().map_err(|_| ConfigError::MalformedIdList(raw.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_list_trims_and_drops_blanks() {
        assert_eq!(parse_id_list(" 1, 7 ,2").unwrap(), vec![1, 7, 2]);
    }

    #[test]
    fn parse_id_list_rejects_non_numeric_token() {
        assert!(parse_id_list("1,abc").is_err());
    }
}
