//! Ordering of the modifiers whose relative position changes a schema's meaning.

use super::MethodCall;
use std::fmt;

/// A call whose position relative to the other modifiers is significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Modifier {
    Nullable,
    Optional,
    Default,
    Catch,
}

impl Modifier {
    /// All modifiers, in the order they are emitted.
    pub const ALL: [Modifier; 4] = [
        Modifier::Nullable,
        Modifier::Optional,
        Modifier::Default,
        Modifier::Catch,
    ];

    /// Pairs `(a, b)` where `a` must come before `b` when both are present.
    pub const CONSTRAINTS: [(Modifier, Modifier); 5] = [
        (Modifier::Nullable, Modifier::Optional),
        (Modifier::Optional, Modifier::Default),
        (Modifier::Optional, Modifier::Catch),
        (Modifier::Nullable, Modifier::Default),
        (Modifier::Nullable, Modifier::Catch),
    ];

    /// Classifies a method name.
    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            "nullable" => Some(Modifier::Nullable),
            "optional" => Some(Modifier::Optional),
            "default" => Some(Modifier::Default),
            "catch" => Some(Modifier::Catch),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Modifier::Nullable => "nullable",
            Modifier::Optional => "optional",
            Modifier::Default => "default",
            Modifier::Catch => "catch",
        }
    }

    fn bucket(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of normalizing a call sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalization {
    pub needs_transform: bool,
    /// The calls in normalized order, or the input calls unchanged when no
    /// transform is needed.
    pub calls: Vec<MethodCall>,
    /// True if an `optional()` call was added.
    pub synthesized_optional: bool,
}

/// Returns every ordering constraint the calls violate.
///
/// With repeated modifiers, a constraint `(a, b)` is violated when any `a`
/// appears after any `b`.
pub fn violations(calls: &[MethodCall]) -> Vec<(Modifier, Modifier)> {
    let mut first = [None::<usize>; 4];
    let mut last = [None::<usize>; 4];

    for (index, call) in calls.iter().enumerate() {
        if let Some(modifier) = Modifier::from_method(&call.method) {
            let bucket = modifier.bucket();
            first[bucket].get_or_insert(index);
            last[bucket] = Some(index);
        }
    }

    Modifier::CONSTRAINTS
        .into_iter()
        .filter(|(earlier, later)| {
            match (last[earlier.bucket()], first[later.bucket()]) {
                (Some(earlier_last), Some(later_first)) => earlier_last > later_first,
                _ => false,
            }
        })
        .collect()
}

/// Puts the order-sensitive modifiers of a chain into canonical order.
///
/// A transform is needed when `default` or `catch` is used without
/// `optional`, or when any ordering constraint is violated. Then every other
/// call keeps its relative order and moves ahead of the modifiers, which follow
/// as `nullable`, `optional`, `default`, `catch`. A missing `optional()` is
/// added with empty arguments. Each call keeps its leading trivia.
///
/// Calls that are not modifiers are moved past modifiers without checking
/// that doing so preserves their effect. A chain whose only irregularity is
/// such an interleaving is left alone.
pub fn normalize(calls: &[MethodCall]) -> Normalization {
    let present = |modifier: Modifier| {
        calls
            .iter()
            .any(|c| Modifier::from_method(&c.method) == Some(modifier))
    };

    let needs_optional =
        (present(Modifier::Default) || present(Modifier::Catch)) && !present(Modifier::Optional);
    let misordered = !violations(calls).is_empty();

    if !needs_optional && !misordered {
        return Normalization {
            needs_transform: false,
            calls: calls.to_vec(),
            synthesized_optional: false,
        };
    }

    let mut others = Vec::new();
    let mut buckets: [Vec<MethodCall>; 4] = Default::default();

    for call in calls {
        match Modifier::from_method(&call.method) {
            Some(modifier) => buckets[modifier.bucket()].push(call.clone()),
            None => others.push(call.clone()),
        }
    }

    if needs_optional {
        // Follow the layout of a multi-line chain, but never copy a comment.
        let leading = buckets[Modifier::Default.bucket()]
            .iter()
            .chain(&buckets[Modifier::Catch.bucket()])
            .map(|c| c.leading.as_str())
            .find(|l| l.trim().is_empty())
            .unwrap_or_default()
            .to_string();
        buckets[Modifier::Optional.bucket()]
            .push(MethodCall::new("optional", "").with_leading(leading));
    }

    let mut ordered = others;
    for bucket in buckets {
        ordered.extend(bucket);
    }

    Normalization {
        needs_transform: true,
        calls: ordered,
        synthesized_optional: needs_optional,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calls(pairs: &[(&str, &str)]) -> Vec<MethodCall> {
        pairs.iter().map(|(m, a)| MethodCall::new(*m, *a)).collect()
    }

    fn names(calls: &[MethodCall]) -> Vec<&str> {
        calls.iter().map(|c| c.method.as_str()).collect()
    }

    #[test]
    fn test_default_before_optional_is_reordered() {
        let result = normalize(&calls(&[("default", "\"x\""), ("optional", "")]));
        assert!(result.needs_transform);
        assert!(!result.synthesized_optional);
        assert_eq!(names(&result.calls), vec!["optional", "default"]);
        assert_eq!(result.calls[1].args, "\"x\"");
    }

    #[test]
    fn test_catch_without_optional_synthesizes_one() {
        let result = normalize(&calls(&[("catch", "\"y\"")]));
        assert!(result.needs_transform);
        assert!(result.synthesized_optional);
        assert_eq!(names(&result.calls), vec!["optional", "catch"]);
        assert_eq!(result.calls[0].args, "");
    }

    #[test]
    fn test_lone_optional_is_noop() {
        let input = calls(&[("min", "3"), ("optional", "")]);
        let result = normalize(&input);
        assert!(!result.needs_transform);
        assert_eq!(result.calls, input);
    }

    #[test]
    fn test_no_modifiers_is_noop() {
        let input = calls(&[("min", "1"), ("max", "10"), ("email", "")]);
        assert!(!normalize(&input).needs_transform);
    }

    #[test]
    fn test_optional_before_nullable_is_violation() {
        let input = calls(&[("optional", ""), ("nullable", "")]);
        assert_eq!(
            violations(&input),
            vec![(Modifier::Nullable, Modifier::Optional)]
        );
        assert_eq!(
            names(&normalize(&input).calls),
            vec!["nullable", "optional"]
        );
    }

    #[test]
    fn test_other_calls_float_ahead_when_transforming() {
        let input = calls(&[
            ("default", "1"),
            ("min", "0"),
            ("optional", ""),
            ("max", "9"),
        ]);
        let result = normalize(&input);
        assert_eq!(
            names(&result.calls),
            vec!["min", "max", "optional", "default"]
        );
    }

    #[test]
    fn test_interleaving_alone_is_not_a_violation() {
        let input = calls(&[("optional", ""), ("min", "1"), ("default", "2")]);
        let result = normalize(&input);
        assert!(!result.needs_transform);
        assert_eq!(result.calls, input);
    }

    #[test]
    fn test_duplicate_modifiers_keep_relative_order() {
        let input = calls(&[
            ("default", "\"a\""),
            ("optional", ""),
            ("default", "\"b\""),
        ]);
        let result = normalize(&input);
        assert!(result.needs_transform);
        assert_eq!(names(&result.calls), vec!["optional", "default", "default"]);
        assert_eq!(result.calls[1].args, "\"a\"");
        assert_eq!(result.calls[2].args, "\"b\"");
    }

    #[test]
    fn test_full_reverse_order() {
        let input = calls(&[
            ("catch", "c"),
            ("default", "d"),
            ("optional", ""),
            ("nullable", ""),
        ]);
        let result = normalize(&input);
        assert_eq!(violations(&input).len(), 5);
        assert_eq!(
            names(&result.calls),
            vec!["nullable", "optional", "default", "catch"]
        );
    }

    #[test]
    fn test_normalized_output_is_stable() {
        let input = calls(&[("nullable", ""), ("catch", "0")]);
        let first = normalize(&input);
        assert!(first.needs_transform);

        let second = normalize(&first.calls);
        assert!(!second.needs_transform);
        assert_eq!(second.calls, first.calls);
    }

    #[test]
    fn test_synthesized_optional_follows_line_layout() {
        let input = vec![
            MethodCall::new("min", "1").with_leading("\n  "),
            MethodCall::new("default", "2").with_leading("\n  // fallback\n  "),
            MethodCall::new("catch", "3").with_leading("\n  "),
        ];
        let result = normalize(&input);
        assert_eq!(names(&result.calls), vec!["min", "optional", "default", "catch"]);
        assert_eq!(result.calls[1].leading, "\n  ");
        assert_eq!(result.calls[2].leading, "\n  // fallback\n  ");
    }

    #[test]
    fn test_modifier_names_round_trip() {
        for modifier in Modifier::ALL {
            assert_eq!(Modifier::from_method(modifier.name()), Some(modifier));
        }
        assert_eq!(Modifier::from_method("min"), None);
    }
}
