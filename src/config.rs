//! Serializable configuration for migrations defined outside the crate.

use crate::codemod::{Migration, MigrationRegistry, script_files};
use crate::error::{MigrateError, Result};
use crate::matcher::{FileMatcher, Pattern};
use crate::pass::{Handler, Rule, RuleSet};
use crate::pipeline::Pipeline;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// A declarative rewrite, compiled into a query-based rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RuleSpec {
    /// Rename a method at its call sites: `x.from(...)` becomes `x.to(...)`.
    #[serde(rename = "rename_method")]
    RenameMethod { from: String, to: String },

    /// Rename every identifier and type reference with the given name.
    #[serde(rename = "rename_identifier")]
    RenameIdentifier { from: String, to: String },

    /// Point imports of one module at another.
    #[serde(rename = "rename_import_source")]
    RenameImportSource { from: String, to: String },
}

impl RuleSpec {
    /// Checks that the names can be spliced into a query and into source.
    pub fn validate(&self) -> Result<()> {
        match self {
            RuleSpec::RenameMethod { from, to } | RuleSpec::RenameIdentifier { from, to } => {
                let identifier = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$")?;
                for name in [from, to] {
                    if !identifier.is_match(name) {
                        return Err(MigrateError::InvalidConfig(format!(
                            "'{name}' is not a valid identifier"
                        )));
                    }
                }
            }
            RuleSpec::RenameImportSource { from, to } => {
                for source in [from, to] {
                    if source.is_empty() || source.contains(['"', '\'', '\\', '\n']) {
                        return Err(MigrateError::InvalidConfig(format!(
                            "'{source}' is not a valid module specifier"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Builds the rule this entry describes.
    pub fn to_rule(&self) -> Rule {
        match self {
            RuleSpec::RenameMethod { from, to } => {
                let to = to.clone();
                Rule::new(
                    self.to_string(),
                    Pattern::new(
                        format!(
                            r#"(call_expression
                                 function: (member_expression
                                   property: (property_identifier) @method (#eq? @method "{from}")))"#
                        ),
                        "method",
                    ),
                    Handler::replace(move |_, _| Some(to.clone())),
                )
            }

            RuleSpec::RenameIdentifier { from, to } => {
                let to = to.clone();
                Rule::new(
                    self.to_string(),
                    Pattern::new(
                        format!(r#"([(identifier) (type_identifier)] @name (#eq? @name "{from}"))"#),
                        "name",
                    ),
                    Handler::replace(move |_, _| Some(to.clone())),
                )
            }

            RuleSpec::RenameImportSource { from, to } => {
                let from = from.clone();
                let to = to.clone();
                Rule::new(
                    self.to_string(),
                    Pattern::new("(import_statement source: (string) @source)", "source"),
                    Handler::replace(move |m, _| {
                        let text = m.text();
                        let quote = text.chars().next()?;
                        let inner = text.get(1..text.len().saturating_sub(1))?;
                        (inner == from).then(|| format!("{quote}{to}{quote}"))
                    }),
                )
            }
        }
    }
}

impl fmt::Display for RuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleSpec::RenameMethod { from, to } => write!(f, "rename-method:{from}->{to}"),
            RuleSpec::RenameIdentifier { from, to } => write!(f, "rename-identifier:{from}->{to}"),
            RuleSpec::RenameImportSource { from, to } => {
                write!(f, "rename-import-source:{from}->{to}")
            }
        }
    }
}

fn default_parallel() -> bool {
    true
}

/// A serializable migration definition.
///
/// # Example YAML
///
/// ```yaml
/// name: api-v2
/// description: Move to the v2 client and pick up the Zod 4 rewrites
/// extensions:
///   - ts
///   - tsx
/// catalogs:
///   - zod-v4
/// rules:
///   - type: rename_method
///     from: getData
///     to: fetchData
///   - type: rename_import_source
///     from: "@acme/client"
///     to: "@acme/client/v2"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationConfig {
    pub name: String,

    pub description: String,

    /// File extensions to target. Empty means every JavaScript-family file.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Glob patterns to exclude.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Built-in migrations whose passes are included, by name.
    #[serde(default)]
    pub catalogs: Vec<String>,

    #[serde(default)]
    pub rules: Vec<RuleSpec>,

    /// Run passes in parallel.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            name: "unnamed-migration".to_string(),
            description: "No description".to_string(),
            extensions: Vec::new(),
            exclude_patterns: vec![
                "**/node_modules/**".to_string(),
                "**/dist/**".to_string(),
                "**/.git/**".to_string(),
            ],
            catalogs: Vec::new(),
            rules: Vec::new(),
            parallel: true,
        }
    }
}

impl MigrationConfig {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn add_rule(&mut self, rule: RuleSpec) {
        self.rules.push(rule);
    }

    pub fn add_catalog(&mut self, name: impl Into<String>) {
        self.catalogs.push(name.into());
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    /// Parses a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| MigrateError::InvalidConfig(format!("Failed to parse YAML config: {e}")))
    }

    /// Parses a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| MigrateError::InvalidConfig(format!("Failed to parse JSON config: {e}")))
    }

    /// Loads config from a YAML file.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_yaml_str(&read_config(path.as_ref())?)
    }

    /// Loads config from a JSON file.
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&read_config(path.as_ref())?)
    }

    /// Loads config, choosing the format from the file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(path),
            Some("yaml" | "yml") => Self::from_yaml(path),
            _ => Err(MigrateError::InvalidConfig(format!(
                "Unrecognized config format: {}",
                path.display()
            ))),
        }
    }

    /// Saves config to a YAML file.
    pub fn to_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| MigrateError::InvalidConfig(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Saves config to a JSON file.
    pub fn to_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Builds a migration from this config.
    pub fn into_migration(self) -> Result<ConfigBasedMigration> {
        ConfigBasedMigration::new(self)
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        MigrateError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read config file {}: {e}", path.display()),
        ))
    })
}

/// A [`Migration`] assembled from a [`MigrationConfig`].
///
/// Catalog passes run first, in the order the catalogs are listed, followed by
/// one pass holding every declarative rule.
pub struct ConfigBasedMigration {
    config: MigrationConfig,
    catalogs: Vec<Box<dyn Migration>>,
}

impl ConfigBasedMigration {
    /// Validates the config and resolves its catalogs.
    pub fn new(config: MigrationConfig) -> Result<Self> {
        for rule in &config.rules {
            rule.validate()?;
        }

        let mut registry = MigrationRegistry::new();
        let catalogs = config
            .catalogs
            .iter()
            .map(|name| {
                registry
                    .take(name)
                    .ok_or_else(|| MigrateError::UnknownMigration(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            migration = %config.name,
            catalogs = catalogs.len(),
            rules = config.rules.len(),
            "loaded migration config"
        );

        Ok(Self { config, catalogs })
    }

    /// Loads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(MigrationConfig::load(path)?)
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }
}

impl Migration for ConfigBasedMigration {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn description(&self) -> &str {
        &self.config.description
    }

    fn files(&self) -> FileMatcher {
        let matcher = if self.config.extensions.is_empty() {
            script_files()
        } else {
            FileMatcher::new().extensions(self.config.extensions.iter().cloned())
        };
        self.config
            .exclude_patterns
            .iter()
            .fold(matcher, |m, pattern| m.exclude(pattern.as_str()))
    }

    fn pipeline(&self) -> Pipeline {
        let mut pipeline = Pipeline::new().parallel(self.config.parallel);
        for catalog in &self.catalogs {
            pipeline = pipeline.extend(catalog.pipeline());
        }
        if !self.config.rules.is_empty() {
            pipeline = pipeline.pass(
                RuleSet::new(format!("{}-rules", self.config.name))
                    .rules(self.config.rules.iter().map(RuleSpec::to_rule)),
            );
        }
        pipeline
    }
}

impl fmt::Debug for ConfigBasedMigration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigBasedMigration")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::TypeScript;

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
name: api-v2
description: Move to the v2 client
extensions:
  - ts
catalogs:
  - zod-v4
rules:
  - type: rename_method
    from: getData
    to: fetchData
  - type: rename_import_source
    from: "@acme/client"
    to: "@acme/client/v2"
"#;
        let config = MigrationConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.name, "api-v2");
        assert_eq!(config.catalogs, vec!["zod-v4"]);
        assert!(config.parallel);
        assert!(config.exclude_patterns.is_empty());
        assert_eq!(
            config.rules[0],
            RuleSpec::RenameMethod {
                from: "getData".to_string(),
                to: "fetchData".to_string()
            }
        );
    }

    #[test]
    fn test_yaml_serialization_uses_type_tags() {
        let mut config = MigrationConfig::new("t", "test");
        config.add_rule(RuleSpec::RenameIdentifier {
            from: "Old".to_string(),
            to: "New".to_string(),
        });

        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("type: rename_identifier"));

        let parsed = MigrationConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "name": "j",
            "description": "json config",
            "parallel": false,
            "rules": [{ "type": "rename_identifier", "from": "a", "to": "b" }]
        }"#;
        let config = MigrationConfig::from_json_str(json).unwrap();
        assert!(!config.parallel);
        assert_eq!(config.rules.len(), 1);
    }

    #[test]
    fn test_unknown_rule_type_is_rejected() {
        let yaml = "name: x\ndescription: y\nrules:\n  - type: rewrite_everything\n";
        let err = MigrationConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_identifier_is_rejected() {
        let mut config = MigrationConfig::new("bad", "bad");
        config.add_rule(RuleSpec::RenameMethod {
            from: "get\") @x (".to_string(),
            to: "fetch".to_string(),
        });

        let err = config.into_migration().unwrap_err();
        assert!(matches!(err, MigrateError::InvalidConfig(_)));
    }

    #[test]
    fn test_unknown_catalog_is_rejected() {
        let mut config = MigrationConfig::new("bad", "bad");
        config.add_catalog("angular-17");

        let err = config.into_migration().unwrap_err();
        assert!(matches!(err, MigrateError::UnknownMigration(name) if name == "angular-17"));
    }

    #[test]
    fn test_rules_rewrite_source() {
        let mut config = MigrationConfig::new("api-v2", "rename client api");
        config.add_rule(RuleSpec::RenameMethod {
            from: "getData".to_string(),
            to: "fetchData".to_string(),
        });
        config.add_rule(RuleSpec::RenameIdentifier {
            from: "UserData".to_string(),
            to: "User".to_string(),
        });
        config.add_rule(RuleSpec::RenameImportSource {
            from: "@acme/client".to_string(),
            to: "@acme/client/v2".to_string(),
        });

        let migration = config.into_migration().unwrap();
        let source = "import { UserData } from '@acme/client';\nconst u: UserData = api.getData();\ngetData();\n";
        let outcome = migration.pipeline().run_source(source, &TypeScript).unwrap();

        assert_eq!(
            outcome.output,
            "import { User } from '@acme/client/v2';\nconst u: User = api.fetchData();\ngetData();\n"
        );
    }

    #[test]
    fn test_catalog_passes_are_included() {
        let mut config = MigrationConfig::new("with-zod", "zod plus rules");
        config.add_catalog("zod-v4");
        config.add_rule(RuleSpec::RenameIdentifier {
            from: "a".to_string(),
            to: "b".to_string(),
        });

        let migration = config.into_migration().unwrap();
        let names = migration.pipeline().names().join(",");
        assert_eq!(
            names,
            "zod-imports,zod-chain-ordering,zod-utility-types,zod-schema-methods,with-zod-rules"
        );
    }

    #[test]
    fn test_files_respect_extensions_and_excludes() {
        let config = MigrationConfig::new("f", "files")
            .with_extensions(vec!["ts".to_string()])
            .with_exclude_patterns(vec!["**/generated/**".to_string()]);
        let migration = config.into_migration().unwrap();
        let files = migration.files();
        let root = Path::new("/repo");

        assert!(files.matches(Path::new("/repo/src/a.ts"), root).unwrap());
        assert!(!files.matches(Path::new("/repo/src/a.tsx"), root).unwrap());
        assert!(!files.matches(Path::new("/repo/generated/a.ts"), root).unwrap());
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let err = MigrationConfig::load("migration.toml").unwrap_err();
        assert!(matches!(err, MigrateError::InvalidConfig(_)));
    }
}
