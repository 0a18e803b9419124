//! Migrations: named bundles of file selection and passes.
//!
//! A [`Migration`] says which files it applies to and builds the
//! [`Pipeline`] that rewrites each of them. The built-in catalogs live in the
//! submodules and are reachable by name through [`MigrationRegistry`].
//!
//! ```rust
//! use migrate_dsl::codemod::MigrationRegistry;
//! use migrate_dsl::lang::TypeScript;
//!
//! let registry = MigrationRegistry::new();
//! let zod = registry.get("zod-v4").unwrap();
//!
//! let source = "import { z } from \"zod\";\nconst s = z.string().catch(\"y\");\n";
//! let outcome = zod.pipeline().run_source(source, &TypeScript)?;
//! assert_eq!(
//!     outcome.output,
//!     "import { z } from \"zod/v4\";\nconst s = z.string().optional().catch(\"y\");\n"
//! );
//! # Ok::<(), migrate_dsl::error::MigrateError>(())
//! ```

mod react;
mod zod;

pub use react::{ReactUnsafeLifecycles, react_unsafe_lifecycles};
pub use zod::{ChainOrdering, OrToUnion, ZOD_MODULES, ZodImports, ZodV4Migration, zod_alias, zod_v4};

use crate::matcher::FileMatcher;
use crate::pipeline::Pipeline;

/// A reusable, named migration.
///
/// # Example
///
/// ```rust
/// use migrate_dsl::codemod::Migration;
/// use migrate_dsl::matcher::{FileMatcher, Pattern};
/// use migrate_dsl::pass::{Handler, Rule, RuleSet};
/// use migrate_dsl::pipeline::Pipeline;
///
/// struct RenameFetch;
///
/// impl Migration for RenameFetch {
///     fn name(&self) -> &str {
///         "rename-fetch"
///     }
///
///     fn description(&self) -> &str {
///         "Rename getData() calls to fetchData()"
///     }
///
///     fn files(&self) -> FileMatcher {
///         FileMatcher::new().extensions(["ts", "tsx"])
///     }
///
///     fn pipeline(&self) -> Pipeline {
///         Pipeline::new().pass(RuleSet::new("rename-fetch").rule(Rule::new(
///             "get-data",
///             Pattern::new(r#"((identifier) @id (#eq? @id "getData"))"#, "id"),
///             Handler::replace(|_, _| Some("fetchData".to_string())),
///         )))
///     }
/// }
/// ```
pub trait Migration: Send + Sync {
    /// Unique name for this migration.
    fn name(&self) -> &str;

    /// Human-readable description of what this migration does.
    fn description(&self) -> &str;

    /// The files this migration applies to.
    fn files(&self) -> FileMatcher;

    /// Builds the passes that rewrite one file.
    fn pipeline(&self) -> Pipeline;
}

/// The migrations available by name.
pub struct MigrationRegistry {
    migrations: Vec<Box<dyn Migration>>,
}

impl MigrationRegistry {
    /// Creates a registry holding every built-in migration.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(zod_v4()));
        registry.register(Box::new(react_unsafe_lifecycles()));
        registry
    }

    /// Creates a registry with no migrations.
    pub fn empty() -> Self {
        Self {
            migrations: Vec::new(),
        }
    }

    /// Registers a migration, replacing any existing one with the same name.
    pub fn register(&mut self, migration: Box<dyn Migration>) {
        self.migrations.retain(|m| m.name() != migration.name());
        self.migrations.push(migration);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Migration> {
        self.migrations
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.as_ref())
    }

    /// Removes and returns a migration.
    pub fn take(&mut self, name: &str) -> Option<Box<dyn Migration>> {
        let index = self.migrations.iter().position(|m| m.name() == name)?;
        Some(self.migrations.remove(index))
    }

    pub fn names(&self) -> Vec<&str> {
        self.migrations.iter().map(|m| m.name()).collect()
    }

    pub fn all(&self) -> &[Box<dyn Migration>] {
        &self.migrations
    }
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A closure-based migration for quick one-off rewrites.
///
/// ```rust
/// use migrate_dsl::codemod::{ClosureMigration, Migration};
/// use migrate_dsl::matcher::FileMatcher;
/// use migrate_dsl::pipeline::Pipeline;
///
/// let migration = ClosureMigration::new(
///     "noop",
///     "Does nothing",
///     || FileMatcher::new().extension("ts"),
///     Pipeline::new,
/// );
/// assert!(migration.pipeline().is_empty());
/// ```
pub struct ClosureMigration<F, P>
where
    F: Fn() -> FileMatcher + Send + Sync,
    P: Fn() -> Pipeline + Send + Sync,
{
    name: String,
    description: String,
    files_fn: F,
    pipeline_fn: P,
}

impl<F, P> ClosureMigration<F, P>
where
    F: Fn() -> FileMatcher + Send + Sync,
    P: Fn() -> Pipeline + Send + Sync,
{
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        files_fn: F,
        pipeline_fn: P,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            files_fn,
            pipeline_fn,
        }
    }
}

impl<F, P> Migration for ClosureMigration<F, P>
where
    F: Fn() -> FileMatcher + Send + Sync,
    P: Fn() -> Pipeline + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn files(&self) -> FileMatcher {
        (self.files_fn)()
    }

    fn pipeline(&self) -> Pipeline {
        (self.pipeline_fn)()
    }
}

/// The file selection shared by the JavaScript-family migrations.
pub(crate) fn script_files() -> FileMatcher {
    FileMatcher::new()
        .extensions(["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"])
        .exclude("**/node_modules/**")
        .exclude("**/dist/**")
        .exclude("**/*.d.ts")
}
