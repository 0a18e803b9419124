//! Prefixes React's deprecated class lifecycle methods with `UNSAFE_`.

use super::{Migration, script_files};
use crate::matcher::{FileMatcher, Pattern};
use crate::pass::{Handler, Rule, RuleSet};
use crate::pipeline::Pipeline;

const LIFECYCLES: &str = "componentWillMount|componentWillReceiveProps|componentWillUpdate";

/// Renames `componentWillMount`, `componentWillReceiveProps` and
/// `componentWillUpdate` on class components.
pub struct ReactUnsafeLifecycles;

impl ReactUnsafeLifecycles {
    fn rules() -> RuleSet {
        let prefixed = || Handler::replace(|m, _| Some(format!("UNSAFE_{}", m.text())));

        RuleSet::new("react-unsafe-lifecycles")
            .rule(Rule::new(
                "lifecycle-method",
                Pattern::new(
                    format!(
                        r#"(method_definition
                             name: (property_identifier) @name (#match? @name "^({LIFECYCLES})$"))"#
                    ),
                    "name",
                ),
                prefixed(),
            ))
            .rule(Rule::new(
                "lifecycle-reference",
                Pattern::new(
                    format!(
                        r#"(member_expression
                             object: [(this) (super)]
                             property: (property_identifier) @name (#match? @name "^({LIFECYCLES})$"))"#
                    ),
                    "name",
                ),
                prefixed(),
            ))
    }
}

impl Migration for ReactUnsafeLifecycles {
    fn name(&self) -> &str {
        "react-unsafe-lifecycles"
    }

    fn description(&self) -> &str {
        "Rename deprecated React lifecycle methods to their UNSAFE_ aliases"
    }

    fn files(&self) -> FileMatcher {
        script_files().contains_pattern(r"\bcomponentWill(Mount|ReceiveProps|Update)\b")
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new().pass(Self::rules())
    }
}

pub fn react_unsafe_lifecycles() -> ReactUnsafeLifecycles {
    ReactUnsafeLifecycles
}
