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

use serde::{Deserialize, Serialize};
use tf_provider::value::{Value, ValueMap, ValueString};
use tf_provider::{map, AttributePath, AttributeType, Block, Description, Diagnostics, Schema};

use crate::utils::{
    computed_attr, optional_attr, optional_computed_attr, required_attr, WithNormalize,
    WithSchema, WithValidate,
};
use crate::validators;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub identifier: ValueString<'a>,
    pub blueprint: ValueString<'a>,
    pub title: ValueString<'a>,
    pub icon: ValueString<'a>,
    pub run_id: ValueString<'a>,
    pub teams: Value<Vec<ValueString<'a>>>,
    pub properties: Value<EntityPropertiesState<'a>>,
    pub relations: Value<EntityRelationsState<'a>>,
    pub created_at: ValueString<'a>,
    pub created_by: ValueString<'a>,
    pub updated_at: ValueString<'a>,
    pub updated_by: ValueString<'a>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityPropertiesState<'a> {
    #[serde(borrow = "'a")]
    pub string_props: ValueMap<'a, ValueString<'a>>,
    pub number_props: ValueMap<'a, Value<f64>>,
    pub boolean_props: ValueMap<'a, Value<bool>>,
    /// JSON documents
    pub object_props: ValueMap<'a, ValueString<'a>>,
    pub array_props: Value<EntityArrayPropsState<'a>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityArrayPropsState<'a> {
    #[serde(borrow = "'a")]
    pub string_items: ValueMap<'a, Value<Vec<ValueString<'a>>>>,
    pub number_items: ValueMap<'a, Value<Vec<Value<f64>>>>,
    pub boolean_items: ValueMap<'a, Value<Vec<Value<bool>>>>,
    /// Lists of JSON documents
    pub object_items: ValueMap<'a, Value<Vec<ValueString<'a>>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRelationsState<'a> {
    #[serde(borrow = "'a")]
    pub single_relations: ValueMap<'a, ValueString<'a>>,
    pub many_relations: ValueMap<'a, Value<Vec<ValueString<'a>>>>,
}

fn map_of(attr_type: AttributeType) -> AttributeType {
    AttributeType::Map(attr_type.into())
}

fn list_of(attr_type: AttributeType) -> AttributeType {
    AttributeType::List(attr_type.into())
}

impl<'a> WithSchema for EntityState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                description: Description::plain("A Port entity, an instance of a blueprint"),
                attributes: map! {
                    "id" => computed_attr(AttributeType::String, "The identifier of the entity"),
                    "identifier" => optional_computed_attr(
                        AttributeType::String,
                        "The identifier of the entity, generated by Port when omitted",
                    ),
                    "blueprint" => required_attr(
                        AttributeType::String,
                        "The blueprint of the entity, changing it recreates the entity",
                    ),
                    "title" => optional_attr(AttributeType::String, "The display name of the entity"),
                    "icon" => optional_attr(AttributeType::String, "The icon of the entity"),
                    "run_id" => optional_attr(
                        AttributeType::String,
                        "The run of the action that created or updated the entity",
                    ),
                    "teams" => optional_attr(list_of(AttributeType::String), "The teams owning the entity"),
                    "properties" => optional_attr(
                        AttributeType::AttributeSingle(map! {
                            "string_props" => optional_attr(map_of(AttributeType::String), "The string properties of the entity"),
                            "number_props" => optional_attr(map_of(AttributeType::Number), "The number properties of the entity"),
                            "boolean_props" => optional_attr(map_of(AttributeType::Bool), "The boolean properties of the entity"),
                            "object_props" => optional_attr(
                                map_of(AttributeType::String),
                                "The object properties of the entity, as JSON encoded strings",
                            ),
                            "array_props" => optional_attr(
                                AttributeType::AttributeSingle(map! {
                                    "string_items" => optional_attr(map_of(list_of(AttributeType::String)), "The string array properties"),
                                    "number_items" => optional_attr(map_of(list_of(AttributeType::Number)), "The number array properties"),
                                    "boolean_items" => optional_attr(map_of(list_of(AttributeType::Bool)), "The boolean array properties"),
                                    "object_items" => optional_attr(
                                        map_of(list_of(AttributeType::String)),
                                        "The object array properties, as JSON encoded strings",
                                    ),
                                }),
                                "The array properties of the entity",
                            ),
                        }),
                        "The property values of the entity",
                    ),
                    "relations" => optional_attr(
                        AttributeType::AttributeSingle(map! {
                            "single_relations" => optional_attr(
                                map_of(AttributeType::String),
                                "The relations pointing to a single entity",
                            ),
                            "many_relations" => optional_attr(
                                map_of(list_of(AttributeType::String)),
                                "The relations pointing to many entities",
                            ),
                        }),
                        "The related entities",
                    ),
                    "created_at" => computed_attr(AttributeType::String, "The creation date of the entity"),
                    "created_by" => computed_attr(AttributeType::String, "The creator of the entity"),
                    "updated_at" => computed_attr(AttributeType::String, "The last update date of the entity"),
                    "updated_by" => computed_attr(AttributeType::String, "The last updater of the entity"),
                },
                ..Default::default()
            },
        }
    }
}

impl<'a> WithValidate for EntityState<'a> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        validators::identifier(diags, attr_path.clone().attribute("identifier"), &self.identifier);
        validators::identifier(diags, attr_path.clone().attribute("blueprint"), &self.blueprint);

        let Value::Value(properties) = &self.properties else {
            return;
        };
        let attr_path = attr_path.attribute("properties");
        for (name, value) in properties.object_props.iter().flatten() {
            validators::json(
                diags,
                attr_path.clone().attribute("object_props").key(name.to_string()),
                value,
            );
        }
        if let Value::Value(arrays) = &properties.array_props {
            for (name, items) in arrays.object_items.iter().flatten() {
                let path = attr_path
                    .clone()
                    .attribute("array_props")
                    .attribute("object_items")
                    .key(name.to_string());
                for (i, item) in items.iter().flatten().enumerate() {
                    validators::json(diags, path.clone().index(i as i64), item);
                }
            }
        }
    }
}

impl<'a> WithNormalize for EntityState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics, _config: &Self) {}
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn object_values_must_be_json() {
        let state = EntityState {
            blueprint: Value::Value(Cow::Borrowed("microservice")),
            properties: Value::Value(EntityPropertiesState {
                object_props: Value::Value(BTreeMap::from([
                    (Cow::Borrowed("good"), Value::Value(Cow::Borrowed(r#"{"a": 1}"#))),
                    (Cow::Borrowed("bad"), Value::Value(Cow::Borrowed("{"))),
                ])),
                array_props: Value::Value(EntityArrayPropsState {
                    object_items: Value::Value(BTreeMap::from([(
                        Cow::Borrowed("list"),
                        Value::Value(vec![
                            Value::Value(Cow::Borrowed("[]")),
                            Value::Value(Cow::Borrowed("nope")),
                        ]),
                    )])),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        state.validate(&mut diags, Default::default());
        assert_eq!(diags.errors.len(), 2);
    }

    #[test]
    fn unknown_identifier_is_accepted() {
        let state = EntityState {
            identifier: Value::Unknown,
            blueprint: Value::Value(Cow::Borrowed("microservice")),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        state.validate(&mut diags, Default::default());
        assert!(diags.errors.is_empty());
    }
}
