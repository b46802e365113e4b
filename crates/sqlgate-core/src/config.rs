//! YAML configuration: policy plus audit settings.

use crate::audit::{AuditTrail, JsonlSink, Recording};
use crate::error::{GuardError, PolicyError};
use crate::policy::{Policy, PolicyAuthorizer, PolicySpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub policy: PolicySpec,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            audit: AuditConfig::default(),
            policy: PolicySpec::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Append decisions to this JSONL file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Parse YAML, returning the config and the paths of keys it ignored.
    pub fn parse(content: &str) -> Result<(Self, Vec<String>), serde_yaml::Error> {
        let mut ignored = Vec::new();
        let de = serde_yaml::Deserializer::from_str(content);
        let config: Config = serde_ignored::deserialize(de, |path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Read, parse and validate a config file. Unknown keys are logged, not rejected.
    pub fn load(path: &Path) -> Result<Self, GuardError> {
        let content = std::fs::read_to_string(path)?;
        let (config, ignored) = Self::parse(&content).map_err(|e| GuardError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        for key in &ignored {
            tracing::warn!(event = "config_unknown_key", path = %path.display(), key = %key);
        }
        config.validate().map_err(|e| match e {
            GuardError::Config { message, .. } => GuardError::Config {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GuardError> {
        if self.version != CONFIG_VERSION {
            return Err(GuardError::Config {
                path: PathBuf::new(),
                message: format!(
                    "unsupported version {} (expected {})",
                    self.version, CONFIG_VERSION
                ),
            });
        }
        self.compile_policy()?;
        Ok(())
    }

    pub fn compile_policy(&self) -> Result<Policy, PolicyError> {
        Policy::from_spec(&self.policy)
    }

    /// Policy authorizer recording into `trail` when given, plus the JSONL
    /// sink when configured. Pass `None` for long-lived connections.
    pub fn build_authorizer(
        &self,
        trail: Option<AuditTrail>,
    ) -> Result<Recording<PolicyAuthorizer>, GuardError> {
        let authorizer = self.compile_policy()?.into_authorizer();
        let mut recording = match trail {
            Some(trail) => Recording::new(authorizer, trail),
            None => Recording::without_trail(authorizer),
        };
        if let Some(path) = &self.audit.path {
            recording = recording.with_sink(JsonlSink::open(path)?);
        }
        Ok(recording)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionCode;
    use crate::authorizer::Authorizer;
    use crate::decision::Decision;
    use crate::request::AuthRequest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"
version: 1
audit:
  path: audit.jsonl
policy:
  default: deny
  rules:
    - action: read
      table: secrets
      column: ssn
      decision: ignore
"#;

    #[test]
    fn test_parse_full_config() {
        let (config, ignored) = Config::parse(CONFIG).unwrap();
        assert!(ignored.is_empty());
        assert_eq!(config.audit.path, Some(PathBuf::from("audit.jsonl")));
        assert_eq!(config.policy.default, Decision::Deny);
        assert_eq!(config.policy.rules.len(), 1);
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_config_allows_everything() {
        let (config, _) = Config::parse("{}").unwrap();
        assert_eq!(config, Config::default());
        let policy = config.compile_policy().unwrap();
        assert_eq!(policy.default_decision(), Decision::Allow);
        assert!(policy.rules().is_empty());
    }

    #[test]
    fn test_unknown_keys_are_reported() {
        let yaml = r#"
version: 1
colour: blue
policy:
  default: allow
  strict: true
"#;
        let (_, ignored) = Config::parse(yaml).unwrap();
        assert_eq!(ignored, vec!["colour".to_string(), "policy.strict".to_string()]);
    }

    #[test]
    fn test_build_authorizer_without_trail_writes_file_only() {
        let dir = tempfile::tempdir().unwrap();
        let audit = dir.path().join("audit.jsonl");
        let config = Config {
            audit: AuditConfig {
                path: Some(audit.clone()),
            },
            ..Config::default()
        };
        let mut authorizer = config.build_authorizer(None).unwrap();
        for _ in 0..1000 {
            assert_eq!(
                authorizer.authorize(&AuthRequest::new(ActionCode::Select)),
                Decision::Allow
            );
        }
        assert!(authorizer.trail().is_none());
        let content = std::fs::read_to_string(&audit).unwrap();
        assert_eq!(content.lines().count(), 1000);
    }

    #[test]
    fn test_load_rejects_unsupported_version() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "version: 7").unwrap();
        let err = Config::load(tmp.path()).unwrap_err();
        match err {
            GuardError::Config { path, message } => {
                assert_eq!(path, tmp.path());
                assert!(message.contains("unsupported version 7"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_rejects_bad_decision() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "policy:\n  default: maybe").unwrap();
        assert!(matches!(
            Config::load(tmp.path()),
            Err(GuardError::Config { .. })
        ));
    }

    #[test]
    fn test_load_rejects_unknown_action() {
        let mut tmp = NamedTempFile::new().unwrap();
        write!(
            tmp,
            "policy:\n  rules:\n    - action: vacuum\n      decision: deny\n"
        )
        .unwrap();
        assert!(matches!(
            Config::load(tmp.path()),
            Err(GuardError::InvalidPolicy(PolicyError::UnknownAction { .. }))
        ));
    }
}
