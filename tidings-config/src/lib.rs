//! Loader for workspace configuration with YAML + environment overlays.
//!
//! `tidings.yaml` declares the configured bridges; `TIDINGS_`-prefixed
//! environment variables override individual fields and `${VAR}` placeholders
//! are expanded recursively before the strongly typed structs materialise.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Deserialize)]
pub struct TidingsConfig {
    pub version: Option<String>,
    pub bridges: Vec<BridgeSpec>,
}

/// Shared fields + the per-kind "details"
#[derive(Debug, Deserialize)]
pub struct BridgeSpec {
    pub id: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(flatten)]
    pub details: BridgeDetails,
}

impl BridgeSpec {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// The tag is `kind`; the payload lives in `config`
#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
pub enum BridgeDetails {
    #[serde(rename = "twitter")]
    Twitter { config: TwitterParams },

    #[serde(rename = "wikipedia")]
    Wikipedia { config: WikipediaParams },
}

/// Tweet bridge parameter surface: one query mode plus the global flags.
#[derive(Debug, Deserialize)]
pub struct TwitterParams {
    #[serde(flatten)]
    pub mode: TwitterMode,
    /// Hide profile pictures in content.
    #[serde(default)]
    pub nopic: bool,
    /// Hide images in tweets.
    #[serde(default)]
    pub noimg: bool,
    /// Disable image scaling (keeps original image).
    #[serde(default)]
    pub noimgscaling: bool,
}

/// Closed set of query modes; an unrecognized mode is a deserialization
/// error, there is no default fallback.
#[derive(Debug, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TwitterMode {
    Keyword {
        q: String,
    },
    Username {
        u: String,
        #[serde(default)]
        norep: bool,
        #[serde(default)]
        noreplycontext: bool,
        #[serde(default)]
        noretweet: bool,
        #[serde(default)]
        nopinned: bool,
    },
    List {
        user: String,
        list: String,
        #[serde(default)]
        filter: Option<String>,
    },
    ListId {
        listid: String,
        #[serde(default)]
        filter: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
pub struct WikipediaParams {
    pub language: String,
    pub subject: String,
    #[serde(default)]
    pub fullarticle: bool,
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct TidingsConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for TidingsConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TidingsConfigLoader {
    /// Start with sensible defaults: YAML file + `TIDINGS_` env overrides.
    ///
    /// ```
    /// use tidings_config::TidingsConfigLoader;
    ///
    /// let config = TidingsConfigLoader::new()
    ///     .with_yaml_str("version: '1'\nbridges: []")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert!(config.bridges.is_empty());
    /// ```
    pub fn new() -> Self {
        let builder =
            Config::builder().add_source(Environment::with_prefix("TIDINGS").separator("__"));
        Self { builder }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly
    /// typed config, expanding `${VAR}` placeholders along the way.
    pub fn load(self) -> Result<TidingsConfig, ConfigError> {
        let cfg = self.builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: TidingsConfig =
            serde_json::from_value(v).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles_and_leaves_value_reasonable() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${DOES_NOT_EXIST}"));
    }

    #[test]
    fn loads_twitter_bridge_spec() {
        let cfg = TidingsConfigLoader::new()
            .with_yaml_str(
                r#"
version: "1"
bridges:
  - id: "sebsauvage-timeline"
    kind: "twitter"
    config:
      mode: "username"
      u: "sebsauvage"
      norep: true
      nopic: true
"#,
            )
            .load()
            .unwrap();

        assert_eq!(cfg.bridges.len(), 1);
        assert!(cfg.bridges[0].is_enabled());
        match &cfg.bridges[0].details {
            BridgeDetails::Twitter { config } => {
                assert!(config.nopic);
                assert!(!config.noimg);
                match &config.mode {
                    TwitterMode::Username { u, norep, noretweet, .. } => {
                        assert_eq!(u, "sebsauvage");
                        assert!(*norep);
                        assert!(!*noretweet);
                    }
                    other => panic!("expected username mode, got {other:?}"),
                }
            }
            other => panic!("expected twitter bridge, got {other:?}"),
        }
    }

    #[test]
    fn loads_wikipedia_bridge_spec() {
        let cfg = TidingsConfigLoader::new()
            .with_yaml_str(
                r#"
version: "1"
bridges:
  - id: "frontpage"
    enabled: false
    kind: "wikipedia"
    config:
      language: "de"
      subject: "dyk"
      fullarticle: true
"#,
            )
            .load()
            .unwrap();

        assert!(!cfg.bridges[0].is_enabled());
        match &cfg.bridges[0].details {
            BridgeDetails::Wikipedia { config } => {
                assert_eq!(config.language, "de");
                assert_eq!(config.subject, "dyk");
                assert!(config.fullarticle);
            }
            other => panic!("expected wikipedia bridge, got {other:?}"),
        }
    }

    #[test]
    fn unrecognized_mode_is_an_error() {
        let result = TidingsConfigLoader::new()
            .with_yaml_str(
                r#"
version: "1"
bridges:
  - id: "bad"
    kind: "twitter"
    config:
      mode: "firehose"
"#,
            )
            .load();
        assert!(result.is_err());
    }
}
