//! Configuration validation.

use super::Config;
use crate::error::{LoadError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.target.host.is_empty() {
        return Err(LoadError::Config("target.host is required".into()));
    }
    if config.target.database.is_empty() {
        return Err(LoadError::Config("target.database is required".into()));
    }
    if config.target.user.is_empty() {
        return Err(LoadError::Config("target.user is required".into()));
    }
    if config.target.pool_size == 0 {
        return Err(LoadError::Config(
            "target.pool_size must be at least 1".into(),
        ));
    }

    if config.load.chunk_size == 0 {
        return Err(LoadError::Config(
            "load.chunk_size must be at least 1".into(),
        ));
    }
    if let Some((name, _)) = config
        .load
        .custom
        .iter()
        .find(|(_, sql_type)| sql_type.trim().is_empty())
    {
        return Err(LoadError::Config(format!(
            "load.custom type for column {:?} cannot be empty",
            name
        )));
    }

    Ok(())
}
