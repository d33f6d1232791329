use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{args, properties};

/// Marker default meaning "the operator has to supply this value".
pub const UNSET: &str = "userMustProvide";

/// Option id of the parameter naming the property file.
pub const CONFIG_FILE_ID: &str = "configFileId";

pub const DEFAULT_PARSER_CONFIG: &str = "./config/parameters_config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read parser config '{path}': {source}")]
    ReadDescriptor {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse parser config '{path}': {source}")]
    ParseDescriptor {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("duplicate option id '{0}' in parser config")]
    DuplicateOption(String),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

/// How a switch and its value are joined on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgSeparator {
    #[default]
    #[serde(rename = "SPACE")]
    Space,
    #[serde(rename = "EQUALS")]
    Equals,
    #[serde(rename = "COMMA")]
    Comma,
    #[serde(rename = "COLON")]
    Colon,
    #[serde(rename = "SEMI-COLON")]
    SemiColon,
}

impl ArgSeparator {
    /// Separator character, or `None` when the value is the next token.
    pub fn as_char(self) -> Option<char> {
        match self {
            ArgSeparator::Space => None,
            ArgSeparator::Equals => Some('='),
            ArgSeparator::Comma => Some(','),
            ArgSeparator::Colon => Some(':'),
            ArgSeparator::SemiColon => Some(';'),
        }
    }
}

/// One configurable parameter as declared by the parser descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub option_id: String,
    #[serde(default)]
    pub cli_argument: String,
    #[serde(default)]
    pub environment_var: String,
    #[serde(default)]
    pub property_name: String,
    #[serde(default)]
    pub default_val: String,
    #[serde(default)]
    pub description: String,
}

/// Parser descriptor: which parameters exist and how to find them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParserConfig {
    #[serde(default = "default_switch")]
    pub arg_switch: String,
    #[serde(default)]
    pub arg_separator: ArgSeparator,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

fn default_switch() -> String {
    "--".to_string()
}

impl ParserConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadDescriptor {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, path)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Self::parse(raw, Path::new("<inline>"))
    }

    fn parse(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let parsed: ParserConfig =
            serde_json::from_str(raw).map_err(|source| ConfigError::ParseDescriptor {
                path: path.to_path_buf(),
                source,
            })?;

        let mut seen = std::collections::HashSet::new();
        for p in &parsed.parameters {
            if !seen.insert(p.option_id.as_str()) {
                return Err(ConfigError::DuplicateOption(p.option_id.clone()));
            }
        }
        Ok(parsed)
    }
}

/// Inputs to a resolution run. Environment is captured as a map so tests
/// do not have to mutate the process environment.
#[derive(Debug, Clone)]
pub struct ConfigSources {
    pub parser_config: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    /// Property file that replaces whatever `configFileId` resolves to.
    pub config_file: Option<PathBuf>,
}

impl Default for ConfigSources {
    fn default() -> Self {
        Self {
            parser_config: PathBuf::from(DEFAULT_PARSER_CONFIG),
            args: Vec::new(),
            env: HashMap::new(),
            config_file: None,
        }
    }
}

impl ConfigSources {
    /// Sources backed by the live process environment.
    pub fn from_process(parser_config: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            parser_config: parser_config.into(),
            args,
            env: std::env::vars().collect(),
            config_file: None,
        }
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Cli,
    Env,
    File,
    Default,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedParam {
    pub option_id: String,
    pub value: String,
    pub source: ValueSource,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Immutable result of one configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    params: Vec<ResolvedParam>,
    index: HashMap<String, usize>,
    warnings: Vec<String>,
}

impl AppConfig {
    /// Load the parser descriptor named by `sources` and resolve every parameter.
    pub fn resolve(sources: &ConfigSources) -> Result<Self, ConfigError> {
        let parser = ParserConfig::from_file(&sources.parser_config)?;
        Ok(Self::resolve_with(&parser, sources))
    }

    /// Resolve against an already loaded descriptor.
    ///
    /// Each parameter takes the first non-empty value of CLI argument, then
    /// environment variable, then its literal default. Parameters left at
    /// their default may afterwards be replaced from the property file.
    pub fn resolve_with(parser: &ParserConfig, sources: &ConfigSources) -> Self {
        let cli = args::parse_args(&sources.args, &parser.arg_switch, parser.arg_separator);
        let mut cfg = AppConfig::default();

        for p in &parser.parameters {
            let from_cli = non_empty_lookup(&cli, &p.cli_argument);
            let from_env = non_empty_lookup(&sources.env, &p.environment_var);

            let (value, source) = match (from_cli, from_env) {
                (Some(v), _) => (v.to_string(), ValueSource::Cli),
                (None, Some(v)) => (v.to_string(), ValueSource::Env),
                (None, None) => (p.default_val.clone(), ValueSource::Default),
            };

            cfg.index.insert(p.option_id.clone(), cfg.params.len());
            cfg.params.push(ResolvedParam {
                option_id: p.option_id.clone(),
                value,
                source,
                description: p.description.clone(),
            });
        }

        cfg.apply_property_file(parser, sources);
        cfg
    }

    fn apply_property_file(&mut self, parser: &ParserConfig, sources: &ConfigSources) {
        let (path, user_supplied) = match &sources.config_file {
            Some(p) => (p.clone(), true),
            None => {
                if !self.assigned_value(CONFIG_FILE_ID) {
                    return;
                }
                let user_supplied = self.source_of(CONFIG_FILE_ID) != Some(ValueSource::Default);
                (PathBuf::from(self.value_of(CONFIG_FILE_ID)), user_supplied)
            }
        };

        let props = match properties::load(&path) {
            Ok(props) => props,
            Err(e) if !user_supplied && e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "default property file not present");
                return;
            }
            Err(e) => {
                let msg = format!("failed to load property file '{}': {}", path.display(), e);
                warn!("{msg}");
                self.warnings.push(msg);
                return;
            }
        };

        for p in &parser.parameters {
            if p.property_name.is_empty() {
                continue;
            }
            let Some(&idx) = self.index.get(&p.option_id) else {
                continue;
            };
            let entry = &mut self.params[idx];
            if entry.source != ValueSource::Default {
                continue;
            }
            if let Some(v) = props.get(&p.property_name) {
                entry.value = v.clone();
                entry.source = ValueSource::File;
            }
        }
    }

    /// Resolved value, or `""` for an unknown id.
    pub fn value_of(&self, id: &str) -> &str {
        self.entry(id).map(|e| e.value.as_str()).unwrap_or("")
    }

    /// Resolved value unless it is unknown or still the unset marker.
    /// An unknown id yields `default`, not the `""` that [`value_of`] gives.
    ///
    /// [`value_of`]: AppConfig::value_of
    pub fn value_of_with_default<'a>(&'a self, id: &str, default: &'a str) -> &'a str {
        match self.entry(id) {
            Some(e) if e.value != UNSET => e.value.as_str(),
            _ => default,
        }
    }

    /// True when the parameter holds a real, non-empty value.
    pub fn assigned_value(&self, id: &str) -> bool {
        self.entry(id)
            .map(|e| !e.value.is_empty() && e.value != UNSET)
            .unwrap_or(false)
    }

    /// Parse an assigned value, falling back to `default` when it is absent
    /// or does not parse.
    pub fn parsed_or<T: FromStr>(&self, id: &str, default: T) -> T {
        if !self.assigned_value(id) {
            return default;
        }
        self.value_of(id).trim().parse().unwrap_or(default)
    }

    /// Boolean flag: `true`, `yes`, `1` or `on`, case-insensitive.
    pub fn flag(&self, id: &str) -> bool {
        matches!(
            self.value_of(id).trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "1" | "on"
        )
    }

    pub fn source_of(&self, id: &str) -> Option<ValueSource> {
        self.entry(id).map(|e| e.source)
    }

    pub fn entries(&self) -> &[ResolvedParam] {
        &self.params
    }

    /// Non-fatal problems met during resolution.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// YAML dump of the effective configuration with the given ids masked.
    pub fn to_yaml_redacted(&self, secret_ids: &[&str]) -> Result<String, ConfigError> {
        let shown: Vec<ResolvedParam> = self
            .params
            .iter()
            .map(|p| {
                let mut p = p.clone();
                if secret_ids.contains(&p.option_id.as_str()) && !p.value.is_empty() {
                    p.value = "***".to_string();
                }
                p
            })
            .collect();
        Ok(serde_yaml::to_string(&shown)?)
    }

    fn entry(&self, id: &str) -> Option<&ResolvedParam> {
        self.index.get(id).map(|&i| &self.params[i])
    }
}

fn non_empty_lookup<'a>(map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    if key.is_empty() {
        return None;
    }
    map.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

/// Resolves configuration once and hands out the cached result afterwards.
pub struct ConfigResolver {
    sources: ConfigSources,
    resolved: OnceLock<Arc<AppConfig>>,
}

impl ConfigResolver {
    pub fn new(sources: ConfigSources) -> Self {
        Self {
            sources,
            resolved: OnceLock::new(),
        }
    }

    /// First successful call loads; later calls return the same instance.
    /// A failed load is not cached, so the caller may retry.
    pub fn resolve(&self) -> Result<Arc<AppConfig>, ConfigError> {
        if let Some(cfg) = self.resolved.get() {
            return Ok(cfg.clone());
        }
        let cfg = Arc::new(AppConfig::resolve(&self.sources)?);
        Ok(self.resolved.get_or_init(|| cfg).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const DESCRIPTOR: &str = r#"{
        "argSwitch": "--",
        "argSeparator": "SPACE",
        "parameters": [
            { "optionId": "configFileId", "cliArgument": "configFile",
              "environmentVar": "CONFIG_FILE", "propertyName": "",
              "defaultVal": "./config/does-not-exist.properties" },
            { "optionId": "hostId", "cliArgument": "host",
              "environmentVar": "APP_HOST", "propertyName": "app.host",
              "defaultVal": "localhost", "description": "Server host" },
            { "optionId": "portId", "cliArgument": "port",
              "environmentVar": "APP_PORT", "propertyName": "app.port",
              "defaultVal": "3306" },
            { "optionId": "credsId", "cliArgument": "creds",
              "environmentVar": "APP_CREDS", "propertyName": "app.creds",
              "defaultVal": "userMustProvide" }
        ]
    }"#;

    fn parser() -> ParserConfig {
        ParserConfig::from_json_str(DESCRIPTOR).unwrap()
    }

    fn sources(args: &[&str], env: &[(&str, &str)]) -> ConfigSources {
        ConfigSources {
            args: args.iter().map(|s| s.to_string()).collect(),
            env: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn descriptor_defaults() {
        let p = ParserConfig::from_json_str(r#"{"parameters":[{"optionId":"a"}]}"#).unwrap();
        assert_eq!(p.arg_switch, "--");
        assert_eq!(p.arg_separator, ArgSeparator::Space);
        assert_eq!(p.parameters[0].default_val, "");
    }

    #[test]
    fn descriptor_separator_names() {
        let p = ParserConfig::from_json_str(r#"{"argSeparator":"SEMI-COLON"}"#).unwrap();
        assert_eq!(p.arg_separator, ArgSeparator::SemiColon);
        assert!(ParserConfig::from_json_str(r#"{"argSeparator":"TAB"}"#).is_err());
    }

    #[test]
    fn duplicate_option_ids_are_rejected() {
        let raw = r#"{"parameters":[{"optionId":"a"},{"optionId":"a"}]}"#;
        assert!(matches!(
            ParserConfig::from_json_str(raw),
            Err(ConfigError::DuplicateOption(id)) if id == "a"
        ));
    }

    #[test]
    fn missing_descriptor_is_fatal() {
        let src = ConfigSources {
            parser_config: PathBuf::from("/no/such/parameters_config.json"),
            ..Default::default()
        };
        assert!(matches!(
            AppConfig::resolve(&src),
            Err(ConfigError::ReadDescriptor { .. })
        ));
    }

    #[test]
    fn cli_beats_env_beats_default() {
        let cfg = AppConfig::resolve_with(
            &parser(),
            &sources(&["--host", "cli-host"], &[("APP_HOST", "env-host"), ("APP_PORT", "4000")]),
        );
        assert_eq!(cfg.value_of("hostId"), "cli-host");
        assert_eq!(cfg.source_of("hostId"), Some(ValueSource::Cli));
        assert_eq!(cfg.value_of("portId"), "4000");
        assert_eq!(cfg.source_of("portId"), Some(ValueSource::Env));
        assert_eq!(cfg.value_of("credsId"), UNSET);
        assert_eq!(cfg.source_of("credsId"), Some(ValueSource::Default));
    }

    #[test]
    fn empty_cli_or_env_values_fall_through() {
        let cfg = AppConfig::resolve_with(
            &parser(),
            &sources(&["--host"], &[("APP_HOST", "")]),
        );
        assert_eq!(cfg.value_of("hostId"), "localhost");
        assert_eq!(cfg.source_of("hostId"), Some(ValueSource::Default));
    }

    #[test]
    fn property_file_only_replaces_defaulted_values() {
        let tmp = tempdir().unwrap();
        let props = tmp.path().join("app.properties");
        fs::write(&props, "app.host=file-host\napp.port=5000\napp.creds=s3cret\n").unwrap();

        let cfg = AppConfig::resolve_with(
            &parser(),
            &sources(&["--port", "6000"], &[]).with_config_file(&props),
        );
        assert_eq!(cfg.value_of("hostId"), "file-host");
        assert_eq!(cfg.source_of("hostId"), Some(ValueSource::File));
        assert_eq!(cfg.value_of("portId"), "6000");
        assert_eq!(cfg.value_of("credsId"), "s3cret");
        assert!(cfg.warnings().is_empty());
    }

    #[test]
    fn property_file_path_can_come_from_env() {
        let tmp = tempdir().unwrap();
        let props = tmp.path().join("from-env.properties");
        fs::write(&props, "app.host=env-file-host\n").unwrap();
        let path = props.to_string_lossy().to_string();

        let cfg = AppConfig::resolve_with(&parser(), &sources(&[], &[("CONFIG_FILE", path.as_str())]));
        assert_eq!(cfg.value_of("hostId"), "env-file-host");
    }

    #[test]
    fn missing_default_property_file_is_silent() {
        let cfg = AppConfig::resolve_with(&parser(), &sources(&[], &[]));
        assert!(cfg.warnings().is_empty());
        assert_eq!(cfg.value_of("hostId"), "localhost");
    }

    #[test]
    fn missing_user_property_file_is_a_warning() {
        let cfg = AppConfig::resolve_with(
            &parser(),
            &sources(&["--configFile", "/nope/app.properties"], &[]),
        );
        assert_eq!(cfg.warnings().len(), 1);
        assert!(cfg.warnings()[0].contains("/nope/app.properties"));
        assert_eq!(cfg.value_of("hostId"), "localhost");
    }

    #[test]
    fn lookups() {
        let cfg = AppConfig::resolve_with(&parser(), &sources(&["--port", "not-a-number"], &[]));
        assert_eq!(cfg.value_of("unknownId"), "");
        assert_eq!(cfg.value_of_with_default("unknownId", "fallback"), "fallback");
        assert_eq!(cfg.value_of_with_default("credsId", "fallback"), "fallback");
        assert_eq!(cfg.value_of_with_default("hostId", "fallback"), "localhost");
        assert!(!cfg.assigned_value("credsId"));
        assert!(cfg.assigned_value("hostId"));
        assert_eq!(cfg.parsed_or("portId", 3306u16), 3306);
        assert!(!cfg.flag("hostId"));
    }

    #[test]
    fn unknown_ids_take_the_caller_default() {
        let cfg = AppConfig::resolve_with(&parser(), &sources(&[], &[]));
        assert_eq!(cfg.value_of("noSuchId"), "");
        assert_eq!(cfg.value_of_with_default("noSuchId", "dflt"), "dflt");
        assert_eq!(cfg.value_of_with_default("noSuchId", ""), "");
        assert_eq!(cfg.value_of("credsId"), UNSET);
        assert_eq!(cfg.value_of_with_default("credsId", "dflt"), "dflt");
    }

    #[test]
    fn redacted_yaml_masks_secrets() {
        let cfg = AppConfig::resolve_with(&parser(), &sources(&["--creds", "pw"], &[]));
        let yaml = cfg.to_yaml_redacted(&["credsId"]).unwrap();
        assert!(yaml.contains("***"));
        assert!(!yaml.contains("pw\n"));
        assert!(yaml.contains("Server host"));
    }

    #[test]
    fn resolver_caches_first_result() {
        let tmp = tempdir().unwrap();
        let descriptor = tmp.path().join("parameters_config.json");
        fs::write(&descriptor, DESCRIPTOR).unwrap();

        let resolver = ConfigResolver::new(ConfigSources {
            parser_config: descriptor.clone(),
            args: vec!["--host".into(), "first".into()],
            ..Default::default()
        });
        let a = resolver.resolve().unwrap();
        fs::remove_file(&descriptor).unwrap();
        let b = resolver.resolve().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.value_of("hostId"), "first");
    }
}
