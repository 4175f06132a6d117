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
use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tf_provider::{map, Attribute, AttributePath, AttributeType, Diagnostics, Value, ValueString};

use crate::client::{BlueprintProperty, PropertyItems};
use crate::utils::{
    json_number, known_count, known_list, known_string, known_string_list, merge, merge_json, merge_list,
    merge_string, optional_attr, parse_json,
};
use crate::validators;

use super::{required_value, PropertyKind, PropertyOwner};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ArrayProp<'a> {
    #[serde(borrow = "'a")]
    pub title: ValueString<'a>,
    pub icon: ValueString<'a>,
    pub description: ValueString<'a>,
    pub required: Value<bool>,
    pub min_items: Value<f64>,
    pub max_items: Value<f64>,
    pub string_items: Value<StringItems<'a>>,
    pub number_items: Value<NumberItems>,
    pub boolean_items: Value<BooleanItems>,
    pub object_items: Value<ObjectItems<'a>>,
    /// Action only, the input selects entities of this blueprint
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub blueprint: ValueString<'a>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct StringItems<'a> {
    #[serde(borrow = "'a")]
    pub format: ValueString<'a>,
    pub default: Value<Vec<ValueString<'a>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct NumberItems {
    pub default: Value<Vec<Value<f64>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct BooleanItems {
    pub default: Value<Vec<Value<bool>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ObjectItems<'a> {
    /// JSON documents
    #[serde(borrow = "'a")]
    pub default: Value<Vec<ValueString<'a>>>,
}

fn items_attribute(description: &str, attributes: HashMap<String, Attribute>) -> Attribute {
    optional_attr(AttributeType::AttributeSingle(attributes), description)
}

pub(super) fn attributes(owner: PropertyOwner) -> HashMap<String, Attribute> {
    let mut attributes: HashMap<String, Attribute> = map! {
        "min_items" => optional_attr(AttributeType::Number, "The min items of the array property"),
        "max_items" => optional_attr(AttributeType::Number, "The max items of the array property"),
        "string_items" => items_attribute("The items of the array property, as strings", map! {
            "format" => optional_attr(AttributeType::String, "The format of the items"),
            "default" => optional_attr(
                AttributeType::List(AttributeType::String.into()),
                "The default of the array property",
            ),
        }),
        "number_items" => items_attribute("The items of the array property, as numbers", map! {
            "default" => optional_attr(
                AttributeType::List(AttributeType::Number.into()),
                "The default of the array property",
            ),
        }),
        "boolean_items" => items_attribute("The items of the array property, as booleans", map! {
            "default" => optional_attr(
                AttributeType::List(AttributeType::Bool.into()),
                "The default of the array property",
            ),
        }),
        "object_items" => items_attribute("The items of the array property, as objects", map! {
            "default" => optional_attr(
                AttributeType::List(AttributeType::String.into()),
                "The default of the array property, as JSON encoded strings",
            ),
        }),
    };
    if owner == PropertyOwner::Action {
        attributes.insert(
            "blueprint".to_owned(),
            optional_attr(
                AttributeType::String,
                "The blueprint of the entities selected by the input",
            ),
        );
    }
    attributes
}

/// Rebuild a JSON list, keeping the prior text of elements that did not change
fn merge_json_list<'a>(
    prior: &Value<Vec<ValueString<'a>>>,
    remote: Option<&Vec<serde_json::Value>>,
) -> Value<Vec<ValueString<'a>>> {
    let remote = match remote {
        Some(remote) if !remote.is_empty() => remote,
        _ => return merge_list(prior, None::<Vec<Cow<'a, str>>>),
    };
    let prior = prior.as_ref_option();
    Value::Value(
        remote
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let prior = prior
                    .and_then(|prior| prior.get(i))
                    .cloned()
                    .unwrap_or_default();
                merge_json(&prior, Some(value))
            })
            .collect(),
    )
}

impl<'a> ArrayProp<'a> {
    pub(super) fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        validators::count(diags, attr_path.clone().attribute("min_items"), &self.min_items);
        validators::count(diags, attr_path.clone().attribute("max_items"), &self.max_items);
        validators::ordered(
            diags,
            attr_path.clone().attribute("min_items"),
            &self.min_items,
            &self.max_items,
        );
        validators::at_most_one(
            diags,
            attr_path.clone(),
            &[
                ("string_items", !self.string_items.is_null()),
                ("number_items", !self.number_items.is_null()),
                ("boolean_items", !self.boolean_items.is_null()),
                ("object_items", !self.object_items.is_null()),
            ],
        );
        if let Value::Value(items) = &self.object_items {
            for (i, item) in items.default.iter().flatten().enumerate() {
                validators::json(
                    diags,
                    attr_path
                        .clone()
                        .attribute("object_items")
                        .attribute("default")
                        .index(i as i64),
                    item,
                );
            }
        }
    }

    pub(super) fn from_body(
        property: &BlueprintProperty,
        required: bool,
        prior: Option<&Self>,
        owner: PropertyOwner,
    ) -> Self {
        let default = Self::default();
        let prior = prior.unwrap_or(&default);
        let remote_default = property.default.as_ref().and_then(serde_json::Value::as_array);

        let mut prop = Self {
            title: merge_string(&prior.title, property.title.as_deref()),
            icon: merge_string(&prior.icon, property.icon.as_deref()),
            description: merge_string(&prior.description, property.description.as_deref()),
            required: required_value(&prior.required, required, owner),
            min_items: merge(&prior.min_items, property.min_items.map(|count| count as f64)),
            max_items: merge(&prior.max_items, property.max_items.map(|count| count as f64)),
            blueprint: match owner {
                PropertyOwner::Action => {
                    merge_string(&prior.blueprint, property.blueprint.as_deref())
                }
                PropertyOwner::Blueprint => Value::Null,
            },
            ..Default::default()
        };

        let Some(items) = &property.items else {
            return prop;
        };
        // The API reports the item kind even when it was not configured
        let bare = items.format.is_none() && remote_default.is_none();

        match items.item_type.as_str() {
            "string" if !(bare && prior.string_items.is_null()) => {
                let empty = StringItems::default();
                let prior_items = prior.string_items.as_ref_option().unwrap_or(&empty);
                prop.string_items = Value::Value(StringItems {
                    format: merge_string(&prior_items.format, items.format.as_deref()),
                    default: merge_list(
                        &prior_items.default,
                        remote_default.map(|values| {
                            values
                                .iter()
                                .filter_map(|value| value.as_str().map(|s| Cow::Owned(s.to_owned())))
                                .collect()
                        }),
                    ),
                });
            }
            "number" if !(bare && prior.number_items.is_null()) => {
                let empty = NumberItems::default();
                let prior_items = prior.number_items.as_ref_option().unwrap_or(&empty);
                prop.number_items = Value::Value(NumberItems {
                    default: merge_list(
                        &prior_items.default,
                        remote_default
                            .map(|values| values.iter().filter_map(serde_json::Value::as_f64).collect()),
                    ),
                });
            }
            "boolean" if !(bare && prior.boolean_items.is_null()) => {
                let empty = BooleanItems::default();
                let prior_items = prior.boolean_items.as_ref_option().unwrap_or(&empty);
                prop.boolean_items = Value::Value(BooleanItems {
                    default: merge_list(
                        &prior_items.default,
                        remote_default
                            .map(|values| values.iter().filter_map(serde_json::Value::as_bool).collect()),
                    ),
                });
            }
            "object" if !(bare && prior.object_items.is_null()) => {
                let empty = ObjectItems::default();
                let prior_items = prior.object_items.as_ref_option().unwrap_or(&empty);
                prop.object_items = Value::Value(ObjectItems {
                    default: merge_json_list(&prior_items.default, remote_default),
                });
            }
            "string" | "number" | "boolean" | "object" => (),
            other => tracing::warn!("Ignoring unsupported array item type `{other}`"),
        }
        prop
    }

    fn items(&self) -> Result<(Option<PropertyItems>, Option<serde_json::Value>)> {
        if let Value::Value(items) = &self.string_items {
            return Ok((
                Some(PropertyItems {
                    item_type: "string".to_owned(),
                    format: known_string(&items.format),
                }),
                known_string_list(&items.default).map(|values| values.into()),
            ));
        }
        if let Value::Value(items) = &self.number_items {
            return Ok((
                Some(PropertyItems {
                    item_type: "number".to_owned(),
                    format: None,
                }),
                known_list(&items.default).map(|values| {
                    serde_json::Value::Array(values.into_iter().map(json_number).collect())
                }),
            ));
        }
        if let Value::Value(items) = &self.boolean_items {
            return Ok((
                Some(PropertyItems {
                    item_type: "boolean".to_owned(),
                    format: None,
                }),
                known_list(&items.default).map(|values| values.into()),
            ));
        }
        if let Value::Value(items) = &self.object_items {
            let default = match known_string_list(&items.default) {
                Some(values) => Some(serde_json::Value::Array(
                    values
                        .iter()
                        .map(|value| parse_json(value))
                        .collect::<Result<_>>()?,
                )),
                None => None,
            };
            return Ok((
                Some(PropertyItems {
                    item_type: "object".to_owned(),
                    format: None,
                }),
                default,
            ));
        }
        Ok((None, None))
    }
}

impl<'a> PropertyKind for ArrayProp<'a> {
    fn required(&self) -> &Value<bool> {
        &self.required
    }

    fn required_mut(&mut self) -> &mut Value<bool> {
        &mut self.required
    }

    fn to_body(&self) -> Result<BlueprintProperty> {
        let (items, default) = self.items()?;
        Ok(BlueprintProperty {
            property_type: "array".to_owned(),
            title: known_string(&self.title),
            icon: known_string(&self.icon),
            description: known_string(&self.description),
            min_items: known_count(&self.min_items),
            max_items: known_count(&self.max_items),
            items,
            default,
            blueprint: known_string(&self.blueprint),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn default_is_sent_at_property_level() {
        let prop = ArrayProp {
            number_items: Value::Value(NumberItems {
                default: Value::Value(vec![Value::Value(1.0), Value::Value(2.0)]),
            }),
            ..Default::default()
        };
        let body = serde_json::to_value(prop.to_body().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({"type": "array", "items": {"type": "number"}, "default": [1, 2]})
        );
    }

    #[test]
    fn object_items_are_decoded() {
        let prop = ArrayProp {
            object_items: Value::Value(ObjectItems {
                default: Value::Value(vec![Value::Value(Cow::Borrowed(r#"{"a": true}"#))]),
            }),
            ..Default::default()
        };
        let body = prop.to_body().unwrap();
        assert_eq!(body.default, Some(json!([{"a": true}])));
        assert_eq!(body.items.unwrap().item_type, "object");
    }

    #[test]
    fn bare_items_are_not_reported() {
        let property: BlueprintProperty = serde_json::from_value(json!({
            "type": "array",
            "items": {"type": "string"}
        }))
        .unwrap();
        let prop = ArrayProp::from_body(&property, false, None, PropertyOwner::Blueprint);
        assert!(prop.string_items.is_null());

        let prior = ArrayProp {
            string_items: Value::Value(StringItems::default()),
            ..Default::default()
        };
        let prop = ArrayProp::from_body(&property, false, Some(&prior), PropertyOwner::Blueprint);
        assert_eq!(prop.string_items, Value::Value(StringItems::default()));
    }

    #[test]
    fn string_items_are_read_back() {
        let property: BlueprintProperty = serde_json::from_value(json!({
            "type": "array",
            "items": {"type": "string", "format": "url"},
            "default": ["https://a", "https://b"],
            "blueprint": "service"
        }))
        .unwrap();
        let prop = ArrayProp::from_body(&property, false, None, PropertyOwner::Action);
        let items = prop.string_items.as_ref_option().unwrap();
        assert_eq!(items.format.as_deref_option(), Some("url"));
        assert_eq!(items.default.as_ref_option().map(Vec::len), Some(2));
        assert_eq!(prop.blueprint.as_deref_option(), Some("service"));
        assert_eq!(prop.to_body().unwrap(), property);
    }

    #[test]
    fn only_one_item_kind() {
        let prop = ArrayProp {
            string_items: Value::Value(StringItems::default()),
            boolean_items: Value::Value(BooleanItems::default()),
            min_items: Value::Value(-1.0),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        prop.validate(&mut diags, AttributePath::new("properties"));
        assert_eq!(diags.errors.len(), 2);
    }
}
