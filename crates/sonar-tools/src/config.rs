//! Connection settings and their resolution from CLI flags, environment, config file and prompt.
//!
//! Resolution is split into a pure part ([`PartialConfig::or`] / [`merge`] / [`finalize`]) and
//! the I/O edges (reading the file, looking up variables, asking the user), so precedence can be
//! tested without touching the process environment.

use crate::error::{Result, SonarToolsError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://sonarcloud.io";

/// Environment variable names per field, primary name first.
pub const TOKEN_ENV: [&str; 2] = ["SONARCLOUD_TOKEN", "SONARQUBE_TOKEN"];
pub const ORGANIZATION_ENV: [&str; 2] = ["SONARCLOUD_ORGANIZATION", "SONARQUBE_ORGANIZATION"];
pub const URL_ENV: [&str; 2] = ["SONARCLOUD_URL", "SONARQUBE_URL"];

/// Effective connection settings. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SonarConfig {
    pub token: String,
    pub organization: Option<String>,
    /// Never ends with `/`.
    pub base_url: String,
}

impl SonarConfig {
    #[must_use]
    pub fn new(
        token: impl Into<String>,
        organization: Option<String>,
        base_url: impl AsRef<str>,
    ) -> Self {
        Self {
            token: token.into(),
            organization: organization.filter(|o| !o.trim().is_empty()),
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
        }
    }

    /// Names of required fields that are empty; an upstream call is only allowed when this is
    /// empty.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.token.trim().is_empty() {
            missing.push("token");
        }
        if self.organization.is_none() {
            missing.push("organization");
        }
        missing
    }
}

/// One source's view of the configuration. Unset and blank values are both `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default, alias = "baseUrl")]
    pub url: Option<String>,
}

impl PartialConfig {
    #[must_use]
    pub fn new(token: Option<String>, organization: Option<String>, url: Option<String>) -> Self {
        Self {
            token,
            organization,
            url,
        }
        .normalized()
    }

    fn normalized(self) -> Self {
        fn clean(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        Self {
            token: clean(self.token),
            organization: clean(self.organization),
            url: clean(self.url),
        }
    }

    /// Fill every unset field from `lower`; fields already set here win.
    #[must_use]
    pub fn or(self, lower: Self) -> Self {
        let this = self.normalized();
        let lower = lower.normalized();
        Self {
            token: this.token.or(lower.token),
            organization: this.organization.or(lower.organization),
            url: this.url.or(lower.url),
        }
    }

    /// Read the primary and legacy variable names through `lookup`.
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |names: [&str; 2]| {
            names
                .into_iter()
                .filter_map(&lookup)
                .find(|v| !v.trim().is_empty())
        };
        Self::new(first(TOKEN_ENV), first(ORGANIZATION_ENV), first(URL_ENV))
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.token.is_some() && self.organization.is_some()
    }
}

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read a JSON config file (`{"token", "organization", "url"}`).
///
/// # Errors
///
/// Returns an error naming the path if the file cannot be read or is not valid JSON.
pub fn read_config_file(path: &Path) -> std::result::Result<PartialConfig, ConfigFileError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg: PartialConfig =
        serde_json::from_slice(&bytes).map_err(|source| ConfigFileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(cfg.normalized())
}

/// Ask for a value on a channel that is not the protocol channel.
pub trait Prompter {
    /// Ask one question; an empty answer means "no value".
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the prompt cannot be written or the answer read.
    fn prompt(&mut self, label: &str) -> std::io::Result<String>;
}

/// Apply precedence CLI > environment > file > prompt.
#[must_use]
pub fn merge(
    cli: PartialConfig,
    env: PartialConfig,
    file: PartialConfig,
    prompt: PartialConfig,
) -> PartialConfig {
    cli.or(env).or(file).or(prompt)
}

/// Turn a merged partial into a full config, applying the URL default.
///
/// # Errors
///
/// Returns [`SonarToolsError::ConfigurationMissing`] if token or organization is unset.
pub fn finalize(merged: PartialConfig) -> Result<SonarConfig> {
    let merged = merged.normalized();
    let cfg = SonarConfig::new(
        merged.token.unwrap_or_default(),
        merged.organization,
        merged.url.as_deref().unwrap_or(DEFAULT_BASE_URL),
    );
    let fields = cfg.missing_fields();
    if fields.is_empty() {
        Ok(cfg)
    } else {
        Err(SonarToolsError::ConfigurationMissing { fields })
    }
}

/// Inputs for [`resolve`] gathered by the binary.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub cli: PartialConfig,
    pub config_path: Option<PathBuf>,
}

/// Resolve the effective configuration from all sources.
///
/// The prompter is consulted only for fields still unset after CLI, environment and file.
/// A broken config file is logged and skipped.
///
/// # Errors
///
/// Returns [`SonarToolsError::ConfigurationMissing`] if token or organization is still unset.
pub fn resolve(
    sources: ConfigSources,
    env: impl Fn(&str) -> Option<String>,
    prompter: Option<&mut dyn Prompter>,
) -> Result<SonarConfig> {
    let file = match sources.config_path.as_deref() {
        Some(path) => match read_config_file(path) {
            Ok(cfg) => {
                debug!(path = %path.display(), "loaded config file");
                cfg
            }
            Err(e) => {
                warn!(error = %e, "ignoring config file");
                PartialConfig::default()
            }
        },
        None => PartialConfig::default(),
    };

    let merged = merge(
        sources.cli,
        PartialConfig::from_env(env),
        file,
        PartialConfig::default(),
    );

    let prompted = match prompter {
        Some(p) if !merged.is_complete() => prompt_missing(&merged, p),
        _ => PartialConfig::default(),
    };

    finalize(merged.or(prompted))
}

fn prompt_missing(merged: &PartialConfig, prompter: &mut dyn Prompter) -> PartialConfig {
    let mut ask = |label: &str| match prompter.prompt(label) {
        Ok(answer) => Some(answer),
        Err(e) => {
            warn!(error = %e, prompt = %label, "interactive prompt failed");
            None
        }
    };

    let token = if merged.token.is_none() {
        ask("SonarCloud token")
    } else {
        None
    };
    let organization = if merged.organization.is_none() {
        ask("SonarCloud organization")
    } else {
        None
    };
    PartialConfig::new(token, organization, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write as _;

    fn partial(token: Option<&str>, org: Option<&str>, url: Option<&str>) -> PartialConfig {
        PartialConfig::new(
            token.map(str::to_string),
            org.map(str::to_string),
            url.map(str::to_string),
        )
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    struct ScriptedPrompter {
        answers: Vec<String>,
        asked: Vec<String>,
    }

    impl Prompter for ScriptedPrompter {
        fn prompt(&mut self, label: &str) -> std::io::Result<String> {
            self.asked.push(label.to_string());
            if self.answers.is_empty() {
                return Ok(String::new());
            }
            Ok(self.answers.remove(0))
        }
    }

    #[test]
    fn token_precedence_is_cli_then_env_then_file() {
        let cli = partial(Some("cli"), None, None);
        let env = partial(Some("env"), None, None);
        let file = partial(Some("file"), Some("acme"), None);
        let prompt = partial(Some("prompt"), None, None);

        let all = merge(cli, env.clone(), file.clone(), prompt.clone());
        assert_eq!(all.token.as_deref(), Some("cli"));

        let no_cli = merge(PartialConfig::default(), env, file.clone(), prompt.clone());
        assert_eq!(no_cli.token.as_deref(), Some("env"));

        let file_only = merge(
            PartialConfig::default(),
            PartialConfig::default(),
            file,
            prompt,
        );
        assert_eq!(file_only.token.as_deref(), Some("file"));
    }

    #[test]
    fn blank_values_do_not_shadow_lower_sources() {
        let merged = merge(
            partial(Some("  "), None, None),
            partial(Some("env"), None, None),
            PartialConfig::default(),
            PartialConfig::default(),
        );
        assert_eq!(merged.token.as_deref(), Some("env"));
    }

    #[test]
    fn env_accepts_legacy_alias_names() {
        let env = PartialConfig::from_env(env_of(&[
            ("SONARQUBE_TOKEN", "legacy"),
            ("SONARQUBE_ORGANIZATION", "acme"),
        ]));
        assert_eq!(env.token.as_deref(), Some("legacy"));
        assert_eq!(env.organization.as_deref(), Some("acme"));

        let both = PartialConfig::from_env(env_of(&[
            ("SONARCLOUD_TOKEN", "primary"),
            ("SONARQUBE_TOKEN", "legacy"),
        ]));
        assert_eq!(both.token.as_deref(), Some("primary"));
    }

    #[test]
    fn finalize_defaults_url_and_trims_trailing_slash() {
        let cfg = finalize(partial(Some("t"), Some("o"), None)).expect("complete");
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);

        let cfg = finalize(partial(Some("t"), Some("o"), Some("https://sonar.example.com//")))
            .expect("complete");
        assert_eq!(cfg.base_url, "https://sonar.example.com");
    }

    #[test]
    fn finalize_names_missing_fields() {
        let err = finalize(partial(None, None, None)).unwrap_err();
        match err {
            SonarToolsError::ConfigurationMissing { fields } => {
                assert_eq!(fields, vec!["token", "organization"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = finalize(partial(Some("t"), None, None)).unwrap_err();
        assert!(err.to_string().contains("organization"));
        assert!(!err.to_string().contains("token,"));
    }

    #[test]
    fn file_values_never_override_cli_or_env() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{"token":"file-token","organization":"file-org","baseUrl":"https://file.example"}}"#
        )
        .expect("write");

        let sources = ConfigSources {
            cli: partial(Some("cli-token"), None, None),
            config_path: Some(file.path().to_path_buf()),
        };
        let cfg = resolve(
            sources,
            env_of(&[("SONARCLOUD_ORGANIZATION", "env-org")]),
            None,
        )
        .expect("resolved");
        assert_eq!(cfg.token, "cli-token");
        assert_eq!(cfg.organization.as_deref(), Some("env-org"));
        assert_eq!(cfg.base_url, "https://file.example");
    }

    #[test]
    fn malformed_config_file_is_reported_but_not_fatal() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "{{ not json").expect("write");

        let err = read_config_file(file.path()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(&file.path().display().to_string()));
        assert!(msg.contains("parse"));

        let sources = ConfigSources {
            cli: PartialConfig::default(),
            config_path: Some(file.path().to_path_buf()),
        };
        let cfg = resolve(
            sources,
            env_of(&[("SONARCLOUD_TOKEN", "t"), ("SONARCLOUD_ORGANIZATION", "o")]),
            None,
        )
        .expect("env still consulted");
        assert_eq!(cfg.token, "t");
    }

    #[test]
    fn prompter_only_asks_for_missing_fields() {
        let mut prompter = ScriptedPrompter {
            answers: vec!["prompted-org".to_string()],
            asked: Vec::new(),
        };
        let sources = ConfigSources {
            cli: partial(Some("cli-token"), None, None),
            config_path: None,
        };
        let cfg = resolve(sources, env_of(&[]), Some(&mut prompter)).expect("resolved");
        assert_eq!(cfg.organization.as_deref(), Some("prompted-org"));
        assert_eq!(prompter.asked, vec!["SonarCloud organization".to_string()]);
    }

    #[test]
    fn prompter_is_not_used_when_sources_are_complete() {
        let mut prompter = ScriptedPrompter {
            answers: Vec::new(),
            asked: Vec::new(),
        };
        let sources = ConfigSources {
            cli: partial(Some("t"), Some("o"), None),
            config_path: None,
        };
        resolve(sources, env_of(&[]), Some(&mut prompter)).expect("resolved");
        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn empty_prompt_answers_still_fail() {
        let mut prompter = ScriptedPrompter {
            answers: Vec::new(),
            asked: Vec::new(),
        };
        let err = resolve(ConfigSources::default(), env_of(&[]), Some(&mut prompter)).unwrap_err();
        assert!(matches!(err, SonarToolsError::ConfigurationMissing { .. }));
        assert_eq!(prompter.asked.len(), 2);
    }
}
