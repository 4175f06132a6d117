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

//! Typed properties shared by blueprint schemas and action user inputs.
//!
//! Properties are grouped by kind in five maps keyed by the property
//! identifier. The API has a single flat property object discriminated by
//! its `type`, so conversions dispatch on that field.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tf_provider::{map, Attribute, AttributePath, AttributeType, Diagnostics, Value, ValueMap};

use crate::client::BlueprintProperty;
use crate::utils::{
    default_when_unset, entry, merge, merge_map, optional_attr, optional_computed_attr,
};

mod array;
mod boolean;
mod number;
mod object;
mod string;

pub(crate) use array::ArrayProp;
pub(crate) use boolean::BooleanProp;
pub(crate) use number::NumberProp;
pub(crate) use object::ObjectProp;
pub(crate) use string::StringProp;

/// Resource the properties belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PropertyOwner {
    Blueprint,
    Action,
}

impl PropertyOwner {
    fn noun(self) -> &'static str {
        match self {
            PropertyOwner::Blueprint => "blueprint",
            PropertyOwner::Action => "action",
        }
    }
}

/// Conversion shared by every property kind
trait PropertyKind {
    fn required(&self) -> &Value<bool>;
    fn required_mut(&mut self) -> &mut Value<bool>;
    fn to_body(&self) -> Result<BlueprintProperty>;

    fn is_required(&self) -> bool {
        matches!(self.required(), Value::Value(true))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct PropertiesState<'a> {
    #[serde(borrow = "'a")]
    pub string_props: ValueMap<'a, Value<StringProp<'a>>>,
    pub number_props: ValueMap<'a, Value<NumberProp<'a>>>,
    pub boolean_props: ValueMap<'a, Value<BooleanProp<'a>>>,
    pub array_props: ValueMap<'a, Value<ArrayProp<'a>>>,
    pub object_props: ValueMap<'a, Value<ObjectProp<'a>>>,
}

/// Attributes common to every property kind
fn metadata_attributes(owner: PropertyOwner) -> HashMap<String, Attribute> {
    let required = match owner {
        PropertyOwner::Blueprint => optional_attr(
            AttributeType::Bool,
            "Whether the property is required in the blueprint",
        ),
        PropertyOwner::Action => optional_computed_attr(
            AttributeType::Bool,
            "Whether the user input is required, defaults to false",
        ),
    };
    map! {
        "title" => optional_attr(AttributeType::String, "The display name of the property"),
        "icon" => optional_attr(AttributeType::String, "The icon of the property"),
        "description" => optional_attr(AttributeType::String, "The description of the property"),
        "required" => required,
    }
}

fn kind_attribute(
    owner: PropertyOwner,
    kind: &str,
    mut attributes: HashMap<String, Attribute>,
) -> Attribute {
    attributes.extend(metadata_attributes(owner));
    optional_attr(
        AttributeType::AttributeMap(attributes),
        &format!("The {kind} properties of the {}", owner.noun()),
    )
}

/// `required` of a property rebuilt from the API required list
fn required_value(prior: &Value<bool>, required: bool, owner: PropertyOwner) -> Value<bool> {
    match owner {
        PropertyOwner::Action => Value::Value(required),
        PropertyOwner::Blueprint => merge(prior, Some(required)),
    }
}

fn collect<'a, T: PropertyKind>(
    props: &ValueMap<'a, Value<T>>,
    properties: &mut BTreeMap<String, BlueprintProperty>,
    required: &mut Vec<String>,
) -> Result<()> {
    for (identifier, prop) in props.iter().flatten() {
        let Value::Value(prop) = prop else {
            continue;
        };
        if prop.is_required() {
            required.push(identifier.to_string());
        }
        properties.insert(identifier.to_string(), prop.to_body()?);
    }
    Ok(())
}

fn normalize_required<'a, T: PropertyKind>(
    props: &mut ValueMap<'a, Value<T>>,
    config: &ValueMap<'a, Value<T>>,
) {
    for (identifier, prop) in props.as_mut_option().into_iter().flatten() {
        if let Value::Value(prop) = prop {
            let config = entry(config, identifier).map(T::required);
            default_when_unset(prop.required_mut(), config, false);
        }
    }
}

impl<'a> PropertiesState<'a> {
    /// Schema of the `properties` (blueprint) or `user_properties` (action) attribute
    pub(crate) fn schema(owner: PropertyOwner, description: &str) -> Attribute {
        optional_attr(
            AttributeType::AttributeSingle(map! {
                "string_props" => kind_attribute(owner, "string", string::attributes(owner)),
                "number_props" => kind_attribute(owner, "number", number::attributes()),
                "boolean_props" => kind_attribute(owner, "boolean", boolean::attributes()),
                "array_props" => kind_attribute(owner, "array", array::attributes(owner)),
                "object_props" => kind_attribute(owner, "object", object::attributes(owner)),
            }),
            description,
        )
    }

    pub(crate) fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        for (identifier, prop) in self.string_props.iter().flatten() {
            if let Value::Value(prop) = prop {
                let path = attr_path.clone().attribute("string_props").key(identifier.to_string());
                prop.validate(diags, path);
            }
        }
        for (identifier, prop) in self.number_props.iter().flatten() {
            if let Value::Value(prop) = prop {
                let path = attr_path.clone().attribute("number_props").key(identifier.to_string());
                prop.validate(diags, path);
            }
        }
        for (identifier, prop) in self.array_props.iter().flatten() {
            if let Value::Value(prop) = prop {
                let path = attr_path.clone().attribute("array_props").key(identifier.to_string());
                prop.validate(diags, path);
            }
        }
        for (identifier, prop) in self.object_props.iter().flatten() {
            if let Value::Value(prop) = prop {
                let path = attr_path.clone().attribute("object_props").key(identifier.to_string());
                prop.validate(diags, path);
            }
        }
    }

    /// Fill the computed defaults of the owner that `config` leaves unset
    pub(crate) fn normalize(&mut self, config: &Self, owner: PropertyOwner) {
        if owner != PropertyOwner::Action {
            return;
        }
        normalize_required(&mut self.string_props, &config.string_props);
        normalize_required(&mut self.number_props, &config.number_props);
        normalize_required(&mut self.boolean_props, &config.boolean_props);
        normalize_required(&mut self.array_props, &config.array_props);
        normalize_required(&mut self.object_props, &config.object_props);
    }

    /// API properties and the list of required identifiers
    pub(crate) fn to_body(&self) -> Result<(BTreeMap<String, BlueprintProperty>, Vec<String>)> {
        let mut properties = BTreeMap::new();
        let mut required = Vec::new();
        collect(&self.string_props, &mut properties, &mut required)?;
        collect(&self.number_props, &mut properties, &mut required)?;
        collect(&self.boolean_props, &mut properties, &mut required)?;
        collect(&self.array_props, &mut properties, &mut required)?;
        collect(&self.object_props, &mut properties, &mut required)?;
        Ok((properties, required))
    }

    pub(crate) fn from_body(
        properties: &BTreeMap<String, BlueprintProperty>,
        required: &[String],
        prior: &Self,
        owner: PropertyOwner,
    ) -> Self {
        let mut string_props = BTreeMap::new();
        let mut number_props = BTreeMap::new();
        let mut boolean_props = BTreeMap::new();
        let mut array_props = BTreeMap::new();
        let mut object_props = BTreeMap::new();

        for (identifier, property) in properties {
            let is_required = required.iter().any(|r| r == identifier);
            let key = Cow::Owned(identifier.clone());
            match property.property_type.as_str() {
                "string" => {
                    let prior = entry(&prior.string_props, identifier);
                    let prop = StringProp::from_body(property, is_required, prior, owner);
                    string_props.insert(key, Value::Value(prop));
                }
                "number" => {
                    let prior = entry(&prior.number_props, identifier);
                    let prop = NumberProp::from_body(property, is_required, prior, owner);
                    number_props.insert(key, Value::Value(prop));
                }
                "boolean" => {
                    let prior = entry(&prior.boolean_props, identifier);
                    let prop = BooleanProp::from_body(property, is_required, prior, owner);
                    boolean_props.insert(key, Value::Value(prop));
                }
                "array" => {
                    let prior = entry(&prior.array_props, identifier);
                    let prop = ArrayProp::from_body(property, is_required, prior, owner);
                    array_props.insert(key, Value::Value(prop));
                }
                "object" => {
                    let prior = entry(&prior.object_props, identifier);
                    let prop = ObjectProp::from_body(property, is_required, prior, owner);
                    object_props.insert(key, Value::Value(prop));
                }
                other => {
                    tracing::warn!("Skipping property `{identifier}` with unsupported type `{other}`");
                }
            }
        }

        Self {
            string_props: merge_map(&prior.string_props, string_props),
            number_props: merge_map(&prior.number_props, number_props),
            boolean_props: merge_map(&prior.boolean_props, boolean_props),
            array_props: merge_map(&prior.array_props, array_props),
            object_props: merge_map(&prior.object_props, object_props),
        }
    }

    /// Same as [`Self::from_body`] for an optional attribute, staying null when
    /// nothing is configured nor reported
    pub(crate) fn from_body_value(
        properties: &BTreeMap<String, BlueprintProperty>,
        required: &[String],
        prior: &Value<Self>,
        owner: PropertyOwner,
    ) -> Value<Self> {
        let default = Self::default();
        let state = Self::from_body(
            properties,
            required,
            prior.as_ref_option().unwrap_or(&default),
            owner,
        );
        if prior.is_null() && state.is_empty() {
            Value::Null
        } else {
            Value::Value(state)
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        [
            self.string_props.as_ref_option().map_or(true, BTreeMap::is_empty),
            self.number_props.as_ref_option().map_or(true, BTreeMap::is_empty),
            self.boolean_props.as_ref_option().map_or(true, BTreeMap::is_empty),
            self.array_props.as_ref_option().map_or(true, BTreeMap::is_empty),
            self.object_props.as_ref_option().map_or(true, BTreeMap::is_empty),
        ]
        .into_iter()
        .all(|empty| empty)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn api_properties(value: serde_json::Value) -> BTreeMap<String, BlueprintProperty> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn properties_are_dispatched_by_type() {
        let properties = api_properties(json!({
            "language": {"type": "string", "enum": ["go", "rust"]},
            "replicas": {"type": "number", "minimum": 1},
            "public": {"type": "boolean", "default": true},
            "tags": {"type": "array", "items": {"type": "string", "format": "user"}},
            "config": {"type": "object", "default": {"a": 1}},
            "when": {"type": "timestamp"}
        }));
        let state = PropertiesState::from_body(
            &properties,
            &["language".to_owned()],
            &Default::default(),
            PropertyOwner::Blueprint,
        );

        let language = entry(&state.string_props, "language").unwrap();
        assert_eq!(language.required, Value::Value(true));
        assert_eq!(language.enum_values.as_ref_option().map(Vec::len), Some(2));
        assert!(entry(&state.number_props, "replicas").is_some());
        assert!(entry(&state.boolean_props, "public").is_some());
        let tags = entry(&state.array_props, "tags").unwrap();
        assert_eq!(
            tags.string_items.as_ref_option().unwrap().format.as_deref_option(),
            Some("user")
        );
        assert_eq!(
            entry(&state.object_props, "config").unwrap().default.as_deref_option(),
            Some("{\"a\":1}")
        );
        assert_eq!(state.string_props.as_ref_option().unwrap().len(), 1);
    }

    #[test]
    fn missing_kinds_stay_null() {
        let properties = api_properties(json!({"language": {"type": "string"}}));
        let state = PropertiesState::from_body(
            &properties,
            &[],
            &Default::default(),
            PropertyOwner::Blueprint,
        );
        assert!(state.number_props.is_null());
        assert!(state.object_props.is_null());

        let prior = PropertiesState {
            number_props: Value::Value(BTreeMap::new()),
            ..Default::default()
        };
        let state = PropertiesState::from_body(&properties, &[], &prior, PropertyOwner::Blueprint);
        assert_eq!(state.number_props, Value::Value(BTreeMap::new()));
    }

    #[test]
    fn body_lists_required_properties() {
        let properties = api_properties(json!({
            "language": {"type": "string", "title": "Language"},
            "replicas": {"type": "number"}
        }));
        let state = PropertiesState::from_body(
            &properties,
            &["replicas".to_owned()],
            &Default::default(),
            PropertyOwner::Action,
        );
        let (body, required) = state.to_body().unwrap();
        assert_eq!(body, properties);
        assert_eq!(required, vec!["replicas".to_owned()]);
    }

    #[test]
    fn action_required_defaults_to_false() {
        let mut state = PropertiesState {
            boolean_props: Value::Value(BTreeMap::from([(
                Cow::Borrowed("confirm"),
                Value::Value(BooleanProp::default()),
            )])),
            ..Default::default()
        };

        let config = state.clone();

        state.normalize(&config, PropertyOwner::Blueprint);
        assert!(entry(&state.boolean_props, "confirm").unwrap().required.is_null());

        state.normalize(&config, PropertyOwner::Action);
        assert_eq!(
            entry(&state.boolean_props, "confirm").unwrap().required,
            Value::Value(false)
        );
    }

    #[test]
    fn removed_required_reverts_to_false() {
        let prop = |required| {
            Value::Value(BTreeMap::from([(
                Cow::Borrowed("environment"),
                Value::Value(StringProp {
                    required,
                    ..Default::default()
                }),
            )]))
        };
        // The proposed state carries the prior value of an unset attribute
        let mut state = PropertiesState {
            string_props: prop(Value::Value(true)),
            ..Default::default()
        };
        let config = PropertiesState {
            string_props: prop(Value::Null),
            ..Default::default()
        };

        state.normalize(&config, PropertyOwner::Action);
        assert_eq!(
            entry(&state.string_props, "environment").unwrap().required,
            Value::Value(false)
        );

        let mut state = PropertiesState {
            string_props: prop(Value::Value(true)),
            ..Default::default()
        };
        let kept = state.clone();
        state.normalize(&kept, PropertyOwner::Action);
        assert_eq!(
            entry(&state.string_props, "environment").unwrap().required,
            Value::Value(true)
        );
    }

    #[test]
    fn schema_depends_on_owner() {
        let fields = |owner| match PropertiesState::schema(owner, "props").attr_type {
            AttributeType::AttributeSingle(kinds) => match &kinds["string_props"].attr_type {
                AttributeType::AttributeMap(fields) => fields.clone(),
                _ => panic!("string_props is not a map"),
            },
            _ => panic!("properties is not an object"),
        };

        let blueprint = fields(PropertyOwner::Blueprint);
        assert!(blueprint.contains_key("spec"));
        assert!(!blueprint.contains_key("blueprint"));

        let action = fields(PropertyOwner::Action);
        assert!(action.contains_key("blueprint"));
        assert!(!action.contains_key("spec_authentication"));
        assert!(action.contains_key("title"));
    }
}
