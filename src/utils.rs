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

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tf_provider::{
    Attribute, AttributeConstraint, AttributePath, AttributeType, Description, Diagnostics,
    Schema, Value, ValueMap, ValueString,
};

pub(crate) trait WithSchema {
    fn schema() -> Schema;
}

pub(crate) trait WithValidate {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath);
}

impl<T: WithValidate> WithValidate for Value<T> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Value::Value(inner) = self {
            inner.validate(diags, attr_path);
        }
    }
}

/// Planning adjustments, `config` is the configuration the plan comes from
pub(crate) trait WithNormalize {
    fn normalize(&mut self, diags: &mut Diagnostics, config: &Self);
}

fn attribute(
    attr_type: AttributeType,
    description: &str,
    constraint: AttributeConstraint,
) -> Attribute {
    Attribute {
        attr_type,
        description: Description::plain(description),
        constraint,
        ..Default::default()
    }
}

pub(crate) fn required_attr(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, description, AttributeConstraint::Required)
}

pub(crate) fn optional_attr(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, description, AttributeConstraint::Optional)
}

pub(crate) fn computed_attr(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, description, AttributeConstraint::Computed)
}

pub(crate) fn optional_computed_attr(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, description, AttributeConstraint::OptionalComputed)
}

/// Apply `default` when the configuration leaves the attribute unset.
///
/// The proposed value of an unset optional+computed attribute is the prior
/// value, so only the configuration tells whether the default applies.
/// Without a configuration value, the proposed value stands in for it.
pub(crate) fn default_when_unset<T>(value: &mut Value<T>, config: Option<&Value<T>>, default: T) {
    let unset = config.unwrap_or(&*value).is_null();
    if unset {
        *value = Value::Value(default);
    }
}

/// Clone a known string out of a `ValueString`
pub(crate) fn known_string(value: &ValueString<'_>) -> Option<String> {
    value.as_deref_option().map(str::to_owned)
}

/// Counts are validated as whole numbers before they reach a body
pub(crate) fn known_count(value: &Value<f64>) -> Option<i64> {
    value.as_ref_option().map(|count| *count as i64)
}

pub(crate) fn string_value<'a, S: Into<String>>(value: Option<S>) -> ValueString<'a> {
    match value {
        Some(value) => Value::Value(Cow::Owned(value.into())),
        None => Value::Null,
    }
}

/// Reconcile a remote scalar with the prior state.
///
/// A non-empty remote value always wins. An empty or absent remote value
/// keeps an explicit empty prior value, and is null otherwise.
pub(crate) fn merge<T>(prior: &Value<T>, remote: Option<T>) -> Value<T>
where
    T: PartialEq + Default + Clone,
{
    let empty = T::default();
    match remote {
        Some(remote) if remote != empty => Value::Value(remote),
        _ => match prior {
            Value::Value(prior) if *prior == empty => Value::Value(empty),
            _ => Value::Null,
        },
    }
}

pub(crate) fn merge_string<'a>(prior: &ValueString<'a>, remote: Option<&str>) -> ValueString<'a> {
    merge(prior, remote.map(|s| Cow::Owned(s.to_owned())))
}

/// Reconcile a remote list with the prior state, with the same rules as [`merge`]
pub(crate) fn merge_list<T: Clone>(
    prior: &Value<Vec<Value<T>>>,
    remote: Option<Vec<T>>,
) -> Value<Vec<Value<T>>> {
    match remote {
        Some(remote) if !remote.is_empty() => {
            Value::Value(remote.into_iter().map(Value::Value).collect())
        }
        _ => match prior {
            Value::Value(prior) if prior.is_empty() => Value::Value(Vec::new()),
            _ => Value::Null,
        },
    }
}

/// Reconcile a remote map with the prior state, with the same rules as [`merge`]
pub(crate) fn merge_map<'a, T>(
    prior: &ValueMap<'a, T>,
    remote: BTreeMap<Cow<'a, str>, T>,
) -> ValueMap<'a, T> {
    if !remote.is_empty() {
        return Value::Value(remote);
    }
    match prior {
        Value::Value(prior) if prior.is_empty() => Value::Value(BTreeMap::new()),
        _ => Value::Null,
    }
}

/// Look up the known value of a map entry
pub(crate) fn entry<'p, 'a, T>(map: &'p ValueMap<'a, Value<T>>, key: &str) -> Option<&'p T> {
    map.as_ref_option()?.get(key)?.as_ref_option()
}

/// Collect the known elements of a list attribute
pub(crate) fn known_list<T: Clone>(value: &Value<Vec<Value<T>>>) -> Option<Vec<T>> {
    value.as_ref_option().map(|items| {
        items
            .iter()
            .filter_map(|item| item.as_ref_option().cloned())
            .collect()
    })
}

pub(crate) fn known_string_list(value: &Value<Vec<ValueString<'_>>>) -> Option<Vec<String>> {
    value.as_ref_option().map(|items| {
        items
            .iter()
            .filter_map(|item| item.as_deref_option().map(str::to_owned))
            .collect()
    })
}

/// Encode a terraform number the way the API expects it
pub(crate) fn json_number(value: f64) -> serde_json::Value {
    if value.fract() == 0.0 && value.abs() < (i64::MAX as f64) {
        serde_json::Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

pub(crate) fn parse_json(text: &str) -> Result<serde_json::Value> {
    serde_json::from_str(text).with_context(|| format!("invalid JSON: {text}"))
}

/// Keys are sorted and whitespace removed, matching `jsonencode`.
pub(crate) fn canonical_json(value: &serde_json::Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Reconcile a remote JSON document with a JSON-encoded prior value.
///
/// The prior text is kept when it encodes the same document, so formatting
/// differences do not show up as drift.
pub(crate) fn merge_json<'a>(
    prior: &ValueString<'a>,
    remote: Option<&serde_json::Value>,
) -> ValueString<'a> {
    match remote {
        None | Some(serde_json::Value::Null) => Value::Null,
        Some(remote) => {
            if let Some(prior_text) = prior.as_deref_option() {
                if serde_json::from_str::<serde_json::Value>(prior_text).ok().as_ref()
                    == Some(remote)
                {
                    return prior.clone();
                }
            }
            Value::Value(Cow::Owned(canonical_json(remote)))
        }
    }
}

pub struct DisplayJoiner<'a, T, I>
where
    T: Iterator<Item = I>,
    I: std::fmt::Display,
{
    iter: RefCell<T>,
    sep: &'a str,
}

pub trait DisplayJoinable {
    type Joiner<'a>;
    fn join_with(self, sep: &str) -> Self::Joiner<'_>;
}

impl<T, I> DisplayJoinable for T
where
    T: Iterator<Item = I>,
    I: std::fmt::Display,
{
    type Joiner<'a> = DisplayJoiner<'a, T, I>;

    fn join_with(self, sep: &str) -> Self::Joiner<'_> {
        DisplayJoiner {
            iter: RefCell::new(self),
            sep,
        }
    }
}

impl<'a, T, I> std::fmt::Display for DisplayJoiner<'a, T, I>
where
    T: Iterator<Item = I>,
    I: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut sep = "";
        let mut iter = self.iter.try_borrow_mut().or(Err(std::fmt::Error))?;
        for elt in iter.by_ref() {
            f.write_str(sep)?;
            f.write_fmt(format_args!("{elt}"))?;
            sep = self.sep;
        }
        Ok(())
    }
}
