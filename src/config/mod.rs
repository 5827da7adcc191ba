//! Configuration management for `turnmark.toml`.
//!
//! # Sections
//!
//! | Section      | Purpose                                              |
//! |--------------|------------------------------------------------------|
//! | `[markers]`  | Container selector, role attribute, marker classes   |
//! | `[label]`    | Label element, class and text template               |
//! | `[watch]`    | Settle delay and observed mutation kinds             |
//!
//! The file is optional: without one, the defaults match the common chat
//! transcript markup (`<article>` turns with `data-message-author-role`).

mod error;
mod section;
mod util;

pub use error::ConfigError;
pub use section::{LabelConfig, MarkersConfig, ORDINAL_PLACEHOLDER, WatchConfig};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{Cli, Commands};
use crate::dom::Selector;
use crate::log;
use util::find_config_file;

/// Config file searched for when `--config` is not given.
pub const DEFAULT_CONFIG_NAME: &str = "turnmark.toml";

/// Root configuration structure representing turnmark.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnmarkConfig {
    /// Absolute path of the loaded file, if any (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    pub markers: MarkersConfig,

    pub label: LabelConfig,

    pub watch: WatchConfig,
}

impl TurnmarkConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// An explicit `--config` must exist; otherwise `turnmark.toml` is
    /// searched upward from the current directory and defaults are used
    /// when none is found. CLI overrides are applied last.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let path = match &cli.config {
            Some(explicit) => {
                let path = cwd.join(explicit);
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path).into());
                }
                Some(path)
            }
            None => find_config_file(Path::new(DEFAULT_CONFIG_NAME), &cwd),
        };

        let mut config = match &path {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };
        config.config_path = path;
        config.apply_cli(cli);
        config.validate()?;

        Ok(config)
    }

    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("in {}", path.display()))?;

        if !ignored.is_empty() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_else(|| path.to_string_lossy());
            log!("warning"; "ignoring unknown fields in {}: {}", name, ignored.join(", "));
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Apply command-line overrides.
    fn apply_cli(&mut self, cli: &Cli) {
        if let Commands::Watch {
            debounce,
            attributes,
            ..
        } = &cli.command
        {
            if let Some(ms) = debounce {
                self.watch.debounce_ms = *ms;
            }
            if let Some(attributes) = attributes {
                self.watch.attributes = *attributes;
            }
        }
    }

    /// Check marker settings for values that would make classification ambiguous.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        let markers = &self.markers;

        if let Err(e) = Selector::parse(&markers.container) {
            problems.push(format!("markers.container: {e}"));
        }

        let required = [
            ("markers.role_attr", &markers.role_attr),
            ("markers.user_role", &markers.user_role),
            ("markers.assistant_role", &markers.assistant_role),
            ("markers.user_class", &markers.user_class),
            ("markers.assistant_class", &markers.assistant_class),
            ("markers.processed_attr", &markers.processed_attr),
            ("label.tag", &self.label.tag),
            ("label.class", &self.label.class),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                problems.push(format!("{field}: must not be empty"));
            } else if value.contains(char::is_whitespace) {
                problems.push(format!("{field}: must not contain whitespace"));
            }
        }

        if markers.user_role == markers.assistant_role {
            problems.push("markers.assistant_role: must differ from markers.user_role".into());
        }
        if markers.user_class == markers.assistant_class {
            problems.push("markers.assistant_class: must differ from markers.user_class".into());
        }
        if !self.label.template.contains(ORDINAL_PLACEHOLDER) {
            problems.push(format!(
                "label.template: must contain `{}`",
                ORDINAL_PLACEHOLDER
            ));
        }
        if self.watch.debounce_ms == 0 {
            problems.push("watch.debounce_ms: must be greater than 0".into());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems))
        }
    }
}

/// Parse a config snippet for tests, failing on unknown fields.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> TurnmarkConfig {
    let (parsed, ignored) = TurnmarkConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_invalid_toml() {
        let result = TurnmarkConfig::parse_with_ignored("[markers\ncontainer = \"article\"");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_unknown_fields_collected() {
        let (_, ignored) =
            TurnmarkConfig::parse_with_ignored("[markers]\ncontaner = \"div\"\n[extra]\nx = 1")
                .unwrap();
        assert_eq!(ignored, vec!["markers.contaner", "extra"]);
    }

    #[test]
    fn test_watch_flags_override_file() {
        use clap::Parser;

        let mut config = test_parse_config("[watch]\ndebounce_ms = 500");
        let cli = Cli::parse_from(["turnmark", "watch", "chat.html", "-d", "50", "-a"]);
        config.apply_cli(&cli);
        assert_eq!(config.watch.debounce_ms, 50);
        assert!(config.watch.attributes);

        // Other commands leave the file values alone
        let mut config = test_parse_config("[watch]\ndebounce_ms = 500");
        config.apply_cli(&Cli::parse_from(["turnmark", "annotate", "chat.html"]));
        assert_eq!(config.watch.debounce_ms, 500);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(TurnmarkConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_ambiguous_markers() {
        let config = test_parse_config(
            "[markers]\nuser_class = \"turn\"\nassistant_class = \"turn\"\nuser_role = \"x\"\nassistant_role = \"x\"",
        );
        let Err(ConfigError::Validation(problems)) = config.validate() else {
            panic!("expected validation error");
        };
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("assistant_role"));
        assert!(problems[1].contains("assistant_class"));
    }

    #[test]
    fn test_validate_template_and_selector() {
        let config = test_parse_config(
            "[markers]\ncontainer = \"article > div\"\n[label]\ntemplate = \"Turn\"\n[watch]\ndebounce_ms = 0",
        );
        let Err(ConfigError::Validation(problems)) = config.validate() else {
            panic!("expected validation error");
        };
        assert_eq!(problems.len(), 3);
        assert!(problems[0].starts_with("markers.container"));
        assert!(problems.iter().any(|p| p.starts_with("label.template")));
        assert!(problems.iter().any(|p| p.starts_with("watch.debounce_ms")));
    }

    #[test]
    fn test_validate_rejects_empty_and_whitespace() {
        let config = test_parse_config("[markers]\nrole_attr = \"\"\n[label]\nclass = \"a b\"");
        let Err(ConfigError::Validation(problems)) = config.validate() else {
            panic!("expected validation error");
        };
        assert_eq!(
            problems,
            vec![
                "markers.role_attr: must not be empty".to_string(),
                "label.class: must not contain whitespace".to_string(),
            ]
        );
    }
}
