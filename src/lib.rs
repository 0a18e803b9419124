//! # Migrate DSL
//!
//! A small language for writing source migrations as independent passes that
//! compose into one conflict-free rewrite.
//!
//! Every pass reads the same, unmodified document and proposes byte-range
//! [`edit::Edit`]s against it. The [`edit::Compositor`] orders those edits,
//! keeps the outermost of any nested pair, drops and reports partial overlaps,
//! and splices the survivors into the original text in a single step.
//!
//! This crate provides:
//! - Structural matching with tree-sitter queries over TypeScript and JavaScript
//! - Declarative rules (pattern plus handler) grouped into passes
//! - A call-chain parser and normalizer for order-sensitive builder APIs
//! - Built-in migrations (`zod-v4`, `react-unsafe-lifecycles`) and YAML/JSON
//!   configured ones
//! - A runner that applies a migration across a directory tree, with diffs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use migrate_dsl::prelude::*;
//!
//! // Preview the Zod 4 migration over a project
//! let result = Runner::in_dir("./web").migration(zod_v4()).dry_run().run()?;
//!
//! println!("{}", result.diff());
//! # Ok::<(), migrate_dsl::error::MigrateError>(())
//! ```
//!
//! ## Writing Passes
//!
//! ```rust
//! use migrate_dsl::prelude::*;
//!
//! let pipeline = Pipeline::new()
//!     .pass(RuleSet::new("rename-fetch").rule(Rule::new(
//!         "get-data",
//!         Pattern::new(
//!             r#"(call_expression function: (member_expression property: (property_identifier) @m (#eq? @m "getData")))"#,
//!             "m",
//!         ),
//!         Handler::replace(|_, _| Some("fetchData".to_string())),
//!     )))
//!     .pass(ChainOrdering);
//!
//! let source = "import { z } from \"zod\";\napi.getData();\nz.string().default(\"\").optional();\n";
//! let outcome = pipeline.run_source(source, &TypeScript)?;
//!
//! assert_eq!(
//!     outcome.output,
//!     "import { z } from \"zod\";\napi.fetchData();\nz.string().optional().default(\"\");\n"
//! );
//! # Ok::<(), migrate_dsl::error::MigrateError>(())
//! ```
//!
//! ## Supported Languages
//!
//! - TypeScript/JavaScript (`.ts`, `.mts`, `.cts`, `.js`, `.mjs`, `.cjs`)
//! - TSX/JSX (`.tsx`, `.jsx`)

pub mod chain;
pub mod codemod;
pub mod config;
pub mod diff;
pub mod document;
pub mod edit;
pub mod error;
pub mod lang;
pub mod matcher;
pub mod pass;
pub mod pipeline;
pub mod runner;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::chain::{ChainError, ChainRewrite, MethodCall, Modifier, parse_chain, rewrite_chain};
    pub use crate::codemod::{
        ChainOrdering, ClosureMigration, Migration, MigrationRegistry, OrToUnion,
        ReactUnsafeLifecycles, ZodImports, ZodV4Migration, react_unsafe_lifecycles, zod_v4,
    };
    pub use crate::config::{ConfigBasedMigration, MigrationConfig, RuleSpec};
    pub use crate::diff::DiffSummary;
    pub use crate::document::Document;
    pub use crate::edit::{Commit, Compositor, ConflictReason, Diagnostic, Edit, Range};
    pub use crate::error::{MigrateError, Result};
    pub use crate::lang::{Language, LanguageRegistry, Tsx, TypeScript};
    pub use crate::matcher::{FileMatcher, Pattern, QueryMatch};
    pub use crate::pass::{Handler, ImportIndex, Pass, PassContext, Rule, RuleSet};
    pub use crate::pipeline::{Outcome, Pipeline, Status};
    pub use crate::runner::{FileReport, FileStatus, RunResult, Runner};
}

pub use prelude::*;
