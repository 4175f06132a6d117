// This file is part of the terraform-provider-port project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use lazy_static::lazy_static;
use regex::Regex;
use tf_provider::{AttributePath, Diagnostics, Value, ValueString};

use crate::utils::DisplayJoinable;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z0-9@_.:\\/=-]+$").unwrap();
}

/// Identifiers accepted by the API for blueprints, entities, actions and pages
pub(crate) fn identifier(diags: &mut Diagnostics, attr_path: AttributePath, value: &ValueString) {
    if let Some(value) = value.as_deref_option() {
        if !IDENTIFIER.is_match(value) {
            diags.error(
                "Invalid identifier",
                format!("`{value}` must match the pattern {}", IDENTIFIER.as_str()),
                attr_path,
            );
        }
    }
}

/// Lengths and item counts are whole numbers, zero or more
pub(crate) fn count(diags: &mut Diagnostics, attr_path: AttributePath, value: &Value<f64>) {
    if let Value::Value(value) = value {
        if value.fract() != 0.0 || *value < 0.0 {
            diags.error(
                "Invalid count",
                format!("expected a non-negative whole number, got {value}"),
                attr_path,
            );
        }
    }
}

/// `min` must not exceed `max` when both are known
pub(crate) fn ordered<T: PartialOrd + std::fmt::Display>(
    diags: &mut Diagnostics,
    attr_path: AttributePath,
    min: &Value<T>,
    max: &Value<T>,
) {
    if let (Value::Value(min), Value::Value(max)) = (min, max) {
        if min > max {
            diags.error(
                "Inconsistent bounds",
                format!("the lower bound {min} is greater than the upper bound {max}"),
                attr_path,
            );
        }
    }
}

pub(crate) fn one_of(
    diags: &mut Diagnostics,
    attr_path: AttributePath,
    value: &ValueString,
    allowed: &[&str],
) {
    if let Some(value) = value.as_deref_option() {
        if !allowed.contains(&value) {
            diags.error(
                "Invalid value",
                format!(
                    "`{value}` is not one of: {}",
                    allowed.iter().join_with(", ")
                ),
                attr_path,
            );
        }
    }
}

/// Enum lists must hold at least one element and no duplicate
pub(crate) fn enum_list<T: PartialEq + std::fmt::Debug>(
    diags: &mut Diagnostics,
    attr_path: AttributePath,
    value: &Value<Vec<Value<T>>>,
) {
    let Value::Value(items) = value else {
        return;
    };
    if items.is_empty() {
        diags.error_short("The list must contain at least 1 element", attr_path);
        return;
    }
    for (i, item) in items.iter().enumerate() {
        if item.is_unknown() {
            continue;
        }
        if items[..i].contains(item) {
            diags.error(
                "Duplicate value",
                format!("{item:?} appears more than once"),
                attr_path.clone().index(i as i64),
            );
        }
    }
}

/// The attribute must hold a JSON document
pub(crate) fn json(diags: &mut Diagnostics, attr_path: AttributePath, value: &ValueString) {
    if let Some(text) = value.as_deref_option() {
        if let Err(err) = serde_json::from_str::<serde_json::Value>(text) {
            diags.error("Invalid JSON", err.to_string(), attr_path);
        }
    }
}

/// At most one of the named attributes may be set
pub(crate) fn at_most_one(
    diags: &mut Diagnostics,
    attr_path: AttributePath,
    candidates: &[(&str, bool)],
) -> usize {
    let set: Vec<&str> = candidates
        .iter()
        .filter_map(|(name, set)| set.then_some(*name))
        .collect();
    if set.len() > 1 {
        diags.error(
            "Conflicting attributes",
            format!(
                "only one of [{}] can be set, got [{}]",
                candidates.iter().map(|(name, _)| name).join_with(", "),
                set.iter().join_with(", ")
            ),
            attr_path,
        );
    }
    set.len()
}

/// Exactly one of the named attributes must be set
pub(crate) fn exactly_one(
    diags: &mut Diagnostics,
    attr_path: AttributePath,
    candidates: &[(&str, bool)],
) {
    if at_most_one(diags, attr_path.clone(), candidates) == 0 {
        diags.error(
            "Missing attribute",
            format!(
                "one of [{}] must be set",
                candidates.iter().map(|(name, _)| name).join_with(", ")
            ),
            attr_path,
        );
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    #[test]
    fn identifier_pattern() {
        let mut diags = Diagnostics::default();
        identifier(
            &mut diags,
            AttributePath::new("identifier"),
            &Value::Value(Cow::Borrowed("my_service-1")),
        );
        assert!(diags.errors.is_empty());

        identifier(
            &mut diags,
            AttributePath::new("identifier"),
            &Value::Value(Cow::Borrowed("not valid")),
        );
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn counts_are_whole_and_positive() {
        let mut diags = Diagnostics::default();
        for valid in [0.0, 3.0] {
            count(&mut diags, AttributePath::new("min_length"), &Value::Value(valid));
        }
        count(&mut diags, AttributePath::new("min_length"), &Value::Null);
        assert!(diags.errors.is_empty());

        count(&mut diags, AttributePath::new("min_length"), &Value::Value(2.5));
        count(&mut diags, AttributePath::new("max_length"), &Value::Value(-1.0));
        assert_eq!(diags.errors.len(), 2);
        assert_eq!(diags.errors[0].summary, "Invalid count");
        assert_eq!(diags.errors[0].attribute, AttributePath::new("min_length"));
    }

    #[test]
    fn enum_list_rejects_duplicates_and_empty() {
        let mut diags = Diagnostics::default();
        enum_list::<f64>(&mut diags, AttributePath::new("enum"), &Value::Value(vec![]));
        assert_eq!(diags.errors.len(), 1);

        let mut diags = Diagnostics::default();
        enum_list(
            &mut diags,
            AttributePath::new("enum"),
            &Value::Value(vec![Value::Value(1.0), Value::Value(2.0), Value::Value(1.0)]),
        );
        assert_eq!(diags.errors.len(), 1);

        let mut diags = Diagnostics::default();
        enum_list(
            &mut diags,
            AttributePath::new("enum"),
            &Value::Value(vec![Value::<f64>::Unknown, Value::Unknown]),
        );
        assert!(diags.errors.is_empty());
    }

    #[test]
    fn exactly_one_reports_missing_and_conflicts() {
        let mut diags = Diagnostics::default();
        exactly_one(
            &mut diags,
            AttributePath::new("method"),
            &[("a", false), ("b", false)],
        );
        assert_eq!(diags.errors.len(), 1);

        let mut diags = Diagnostics::default();
        exactly_one(
            &mut diags,
            AttributePath::new("method"),
            &[("a", true), ("b", true)],
        );
        assert_eq!(diags.errors.len(), 1);

        let mut diags = Diagnostics::default();
        exactly_one(
            &mut diags,
            AttributePath::new("method"),
            &[("a", true), ("b", false)],
        );
        assert!(diags.errors.is_empty());
    }

    #[test]
    fn ordered_bounds() {
        let mut diags = Diagnostics::default();
        ordered(&mut diags, AttributePath::new("x"), &Value::Value(3), &Value::Value(1));
        assert_eq!(diags.errors.len(), 1);
        ordered(&mut diags, AttributePath::new("x"), &Value::Value(1), &Value::Null);
        assert_eq!(diags.errors.len(), 1);
    }
}
