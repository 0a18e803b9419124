//! Fluent call-chain parsing and modifier normalization.
//!
//! A chain like `z.string().default("x").optional()` is split into a base
//! expression and a list of [`MethodCall`]s by [`parse_chain`], then
//! [`normalize`] decides whether the order-sensitive modifiers need to move.
//! [`rewrite_chain`] does both and hands back the replacement text for the
//! chain prefix, if any.
//!
//! ```rust
//! use migrate_dsl::chain::rewrite_chain;
//!
//! let rewrite = rewrite_chain("z.string().catch(\"y\");")?.unwrap();
//! assert_eq!(rewrite.text, "z.string().optional().catch(\"y\")");
//! assert_eq!(rewrite.consumed, "z.string().catch(\"y\")".len());
//!
//! assert!(rewrite_chain("z.string().min(3).optional()")?.is_none());
//! # Ok::<(), migrate_dsl::chain::ChainError>(())
//! ```

mod normalizer;
mod parser;
mod scanner;

pub use normalizer::{Modifier, Normalization, normalize, violations};
pub use parser::{MethodCall, ParsedChain, parse_chain, render};
pub use scanner::{Scanner, root_identifier, split_args};

use thiserror::Error;

/// Why a piece of text could not be read as a call chain.
///
/// Both variants mean "leave this text alone"; neither aborts a migration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("no call chain found")]
    NoMatch,

    #[error("malformed call chain at byte {offset}: {message}")]
    Malformed {
        offset: usize,
        message: &'static str,
    },
}

/// Replacement text for the chain at the start of some input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRewrite {
    /// Bytes of the input the chain spans.
    pub consumed: usize,
    pub text: String,
}

/// Parses and normalizes the chain at the start of `text`.
///
/// Returns `Ok(None)` when the chain is already in canonical order.
pub fn rewrite_chain(text: &str) -> Result<Option<ChainRewrite>, ChainError> {
    let chain = parse_chain(text)?;
    let normalization = normalize(&chain.calls);
    if !normalization.needs_transform {
        return Ok(None);
    }
    Ok(Some(ChainRewrite {
        consumed: chain.consumed,
        text: render(&chain.base, &normalization.calls),
    }))
}
