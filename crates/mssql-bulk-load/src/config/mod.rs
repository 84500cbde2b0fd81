//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use std::path::Path;

use crate::error::Result;
use crate::orchestrator::LoadOptions;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl LoadConfig {
    /// Per-call loader options derived from these defaults.
    pub fn to_options(&self) -> LoadOptions {
        LoadOptions {
            if_exists: self.if_exists,
            custom: self.custom.clone(),
            temporary: self.temporary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::IfExists;

    const YAML: &str = r#"
target:
  host: db.internal
  database: warehouse
  user: loader
  password: hunter2
load:
  if_exists: replace
  chunk_size: 500
  custom:
    id: INT PRIMARY KEY
"#;

    #[test]
    fn test_from_yaml_with_defaults() {
        let config = Config::from_yaml(YAML).unwrap();
        assert_eq!(config.target.port, 1433);
        assert!(config.target.encrypt);
        assert!(!config.target.trust_server_cert);
        assert_eq!(config.load.if_exists, IfExists::Replace);
        assert_eq!(config.load.chunk_size, 500);
        assert!(!config.load.temporary);
        assert_eq!(
            config.load.custom.get("id").map(String::as_str),
            Some("INT PRIMARY KEY")
        );
    }

    #[test]
    fn test_load_section_optional() {
        let yaml = "target:\n  host: h\n  database: d\n  user: u\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.load.if_exists, IfExists::Append);
        assert_eq!(config.load.chunk_size, 1000);
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let yaml = "target:\n  host: h\n  database: d\n  user: u\nload:\n  if_exists: upsert\n";
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("upsert"), "{err}");
    }

    #[test]
    fn test_password_not_serialized() {
        let config = Config::from_yaml(YAML).unwrap();
        let out = serde_yaml::to_string(&config).unwrap();
        assert!(!out.contains("hunter2"), "{out}");
        assert!(out.contains("if_exists: replace"), "{out}");
    }

    #[test]
    fn test_to_options() {
        let config = Config::from_yaml(YAML).unwrap();
        let opts = config.load.to_options();
        assert_eq!(opts.if_exists, IfExists::Replace);
        assert!(!opts.temporary);
        assert_eq!(opts.custom.len(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, YAML).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.target.host, "db.internal");
    }
}
