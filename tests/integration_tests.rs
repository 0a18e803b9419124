//! Integration tests for running migrations over a project on disk.

use migrate_dsl::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SCHEMA: &str = r#"import { z } from "zod";

export const Settings = z.object({
  theme: z.enum(["light", "dark"]).default("light").optional(),
  label: z.string().describe("Shown in the header"),
});
"#;

const MIGRATED_SCHEMA: &str = r#"import { z } from "zod/v4";

export const Settings = z.object({
  theme: z.enum(["light", "dark"]).optional().default("light"),
  label: z.string().meta({ description: "Shown in the header" }),
});
"#;

const COMPONENT: &str = r#"import React from "react";

export class Clock extends React.Component {
  componentWillMount() {
    this.tick();
  }

  render() {
    return <span>{this.state.now}</span>;
  }
}
"#;

fn create_web_project(dir: &Path) {
    fs::create_dir_all(dir.join("src/components")).unwrap();
    fs::create_dir_all(dir.join("node_modules/zod")).unwrap();

    fs::write(dir.join("src/settings.ts"), SCHEMA).unwrap();
    fs::write(dir.join("src/components/Clock.tsx"), COMPONENT).unwrap();
    fs::write(dir.join("src/index.ts"), "export * from \"./settings\";\n").unwrap();
    fs::write(dir.join("node_modules/zod/index.ts"), "export const z = {};\n").unwrap();
}

#[test]
fn test_zod_dry_run() {
    let dir = TempDir::new().unwrap();
    create_web_project(dir.path());

    let result = Runner::in_dir(dir.path())
        .migration(zod_v4())
        .dry_run()
        .run()
        .unwrap();

    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files_modified(), 1);
    assert!(result.diff().contains("+import { z } from \"zod/v4\";"));

    // Files untouched
    let content = fs::read_to_string(dir.path().join("src/settings.ts")).unwrap();
    assert_eq!(content, SCHEMA);
}

#[test]
fn test_zod_apply() {
    let dir = TempDir::new().unwrap();
    create_web_project(dir.path());

    let result = Runner::in_dir(dir.path()).migration(zod_v4()).run().unwrap();
    assert_eq!(result.files_modified(), 1);

    let content = fs::read_to_string(dir.path().join("src/settings.ts")).unwrap();
    assert_eq!(content, MIGRATED_SCHEMA);

    // A second run finds nothing left to do
    let again = Runner::in_dir(dir.path()).migration(zod_v4()).run().unwrap();
    assert_eq!(again.files_modified(), 0);
}

#[test]
fn test_react_apply() {
    let dir = TempDir::new().unwrap();
    create_web_project(dir.path());

    let result = Runner::in_dir(dir.path())
        .migration(react_unsafe_lifecycles())
        .run()
        .unwrap();

    assert_eq!(result.files_modified(), 1);
    let content = fs::read_to_string(dir.path().join("src/components/Clock.tsx")).unwrap();
    assert!(content.contains("  UNSAFE_componentWillMount() {"));
    assert!(content.contains("  render() {"));
}

#[test]
fn test_single_file_root() {
    let dir = TempDir::new().unwrap();
    create_web_project(dir.path());

    let result = Runner::in_dir(dir.path().join("src/settings.ts"))
        .migration(zod_v4())
        .dry_run()
        .run()
        .unwrap();

    assert_eq!(result.files.len(), 1);
    assert_eq!(result.summary.files_changed, 1);
}

#[test]
fn test_yaml_config_migration() {
    let dir = TempDir::new().unwrap();
    create_web_project(dir.path());

    let config_path = dir.path().join("migration.yaml");
    fs::write(
        &config_path,
        r#"
name: settings-v2
description: Zod 4 plus a local rename
extensions:
  - ts
exclude_patterns:
  - "**/node_modules/**"
catalogs:
  - zod-v4
rules:
  - type: rename_identifier
    from: Settings
    to: AppSettings
"#,
    )
    .unwrap();

    let migration = ConfigBasedMigration::load(&config_path).unwrap();
    assert_eq!(migration.name(), "settings-v2");

    let result = Runner::in_dir(dir.path().join("src"))
        .migration(migration)
        .run()
        .unwrap();

    assert_eq!(result.files_modified(), 1);
    let content = fs::read_to_string(dir.path().join("src/settings.ts")).unwrap();
    assert!(content.starts_with("import { z } from \"zod/v4\";"));
    assert!(content.contains("export const AppSettings = z.object({"));
    assert!(content.contains("z.enum([\"light\", \"dark\"]).optional().default(\"light\")"));
}

#[test]
fn test_config_round_trip_through_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("migration.json");

    let mut config = MigrationConfig::new("json-config", "saved and loaded");
    config.add_catalog("react-unsafe-lifecycles");
    config.to_json(&path).unwrap();

    let loaded = MigrationConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_result_json_report() {
    let dir = TempDir::new().unwrap();
    create_web_project(dir.path());

    let result = Runner::in_dir(dir.path())
        .migration(zod_v4())
        .dry_run()
        .run()
        .unwrap();

    let json: serde_json::Value = serde_json::to_value(&result).unwrap();
    assert_eq!(json["dry_run"], true);
    assert_eq!(json["summary"]["files_changed"], 1);
    assert!(
        json["files"][0]["path"]
            .as_str()
            .unwrap()
            .ends_with("settings.ts")
    );
}
