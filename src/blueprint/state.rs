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

use crate::property::{PropertiesState, PropertyOwner};
use crate::utils::{
    computed_attr, default_when_unset, entry, optional_attr, optional_computed_attr,
    required_attr, WithNormalize, WithSchema, WithValidate,
};
use crate::validators;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlueprintState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub identifier: ValueString<'a>,
    pub title: ValueString<'a>,
    pub icon: ValueString<'a>,
    pub description: ValueString<'a>,
    pub created_at: ValueString<'a>,
    pub created_by: ValueString<'a>,
    pub updated_at: ValueString<'a>,
    pub updated_by: ValueString<'a>,
    pub changelog_destination: Value<ChangelogDestinationState<'a>>,
    pub properties: Value<PropertiesState<'a>>,
    pub relations: ValueMap<'a, Value<RelationState<'a>>>,
    pub mirror_properties: ValueMap<'a, Value<MirrorPropertyState<'a>>>,
    pub calculation_properties: ValueMap<'a, Value<CalculationPropertyState<'a>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangelogDestinationState<'a> {
    #[serde(borrow = "'a", rename = "type")]
    pub destination_type: ValueString<'a>,
    pub url: ValueString<'a>,
    pub agent: Value<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationState<'a> {
    #[serde(borrow = "'a")]
    pub target: ValueString<'a>,
    pub title: ValueString<'a>,
    pub required: Value<bool>,
    pub many: Value<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MirrorPropertyState<'a> {
    #[serde(borrow = "'a")]
    pub path: ValueString<'a>,
    pub title: ValueString<'a>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationPropertyState<'a> {
    #[serde(borrow = "'a")]
    pub calculation: ValueString<'a>,
    #[serde(rename = "type")]
    pub property_type: ValueString<'a>,
    pub title: ValueString<'a>,
    pub description: ValueString<'a>,
    pub icon: ValueString<'a>,
    pub format: ValueString<'a>,
    pub colorized: Value<bool>,
    pub colors: ValueMap<'a, ValueString<'a>>,
}

impl<'a> WithSchema for BlueprintState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                description: Description::plain("A Port blueprint, the type of the catalog entities"),
                attributes: map! {
                    "id" => computed_attr(AttributeType::String, "The identifier of the blueprint"),
                    "identifier" => required_attr(
                        AttributeType::String,
                        "The identifier of the blueprint, changing it recreates the blueprint",
                    ),
                    "title" => optional_attr(AttributeType::String, "The display name of the blueprint"),
                    "icon" => optional_attr(AttributeType::String, "The icon of the blueprint"),
                    "description" => optional_attr(AttributeType::String, "The description of the blueprint"),
                    "created_at" => computed_attr(AttributeType::String, "The creation date of the blueprint"),
                    "created_by" => computed_attr(AttributeType::String, "The creator of the blueprint"),
                    "updated_at" => computed_attr(AttributeType::String, "The last update date of the blueprint"),
                    "updated_by" => computed_attr(AttributeType::String, "The last updater of the blueprint"),
                    "changelog_destination" => optional_attr(
                        AttributeType::AttributeSingle(map! {
                            "type" => required_attr(AttributeType::String, "The type of the destination, WEBHOOK or KAFKA"),
                            "url" => optional_attr(AttributeType::String, "The url of the webhook, required for WEBHOOK"),
                            "agent" => optional_computed_attr(
                                AttributeType::Bool,
                                "Deliver the changelog through the Port agent, defaults to false",
                            ),
                        }),
                        "Where the changes of the entities are sent",
                    ),
                    "properties" => PropertiesState::schema(
                        PropertyOwner::Blueprint,
                        "The properties of the blueprint",
                    ),
                    "relations" => optional_attr(
                        AttributeType::AttributeMap(map! {
                            "target" => required_attr(AttributeType::String, "The blueprint the relation points to"),
                            "title" => optional_attr(AttributeType::String, "The display name of the relation"),
                            "required" => optional_computed_attr(AttributeType::Bool, "Whether the relation is required, defaults to false"),
                            "many" => optional_computed_attr(AttributeType::Bool, "Whether the relation holds many entities, defaults to false"),
                        }),
                        "The relations of the blueprint",
                    ),
                    "mirror_properties" => optional_attr(
                        AttributeType::AttributeMap(map! {
                            "path" => required_attr(AttributeType::String, "The path of the mirrored property, through the relations"),
                            "title" => optional_attr(AttributeType::String, "The display name of the mirror property"),
                        }),
                        "The mirror properties of the blueprint",
                    ),
                    "calculation_properties" => optional_attr(
                        AttributeType::AttributeMap(map! {
                            "calculation" => required_attr(AttributeType::String, "The jq expression computing the property"),
                            "type" => required_attr(AttributeType::String, "The type of the computed value"),
                            "title" => optional_attr(AttributeType::String, "The display name of the calculation property"),
                            "description" => optional_attr(AttributeType::String, "The description of the calculation property"),
                            "icon" => optional_attr(AttributeType::String, "The icon of the calculation property"),
                            "format" => optional_attr(AttributeType::String, "The format of the computed value"),
                            "colorized" => optional_attr(AttributeType::Bool, "Whether the value is colorized"),
                            "colors" => optional_attr(
                                AttributeType::Map(AttributeType::String.into()),
                                "The colors of the values",
                            ),
                        }),
                        "The calculation properties of the blueprint",
                    ),
                },
                ..Default::default()
            },
        }
    }
}

impl<'a> WithValidate for BlueprintState<'a> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        validators::identifier(diags, attr_path.clone().attribute("identifier"), &self.identifier);

        if let Value::Value(destination) = &self.changelog_destination {
            let attr_path = attr_path.clone().attribute("changelog_destination");
            validators::one_of(
                diags,
                attr_path.clone().attribute("type"),
                &destination.destination_type,
                &["WEBHOOK", "KAFKA"],
            );
            match destination.destination_type.as_deref_option() {
                Some("WEBHOOK") if destination.url.is_null() => diags.error_short(
                    "`url` is required for a WEBHOOK changelog destination",
                    attr_path.attribute("url"),
                ),
                Some("KAFKA") if !destination.url.is_null() => diags.error_short(
                    "`url` cannot be set for a KAFKA changelog destination",
                    attr_path.attribute("url"),
                ),
                _ => (),
            }
        }

        if let Value::Value(properties) = &self.properties {
            properties.validate(diags, attr_path.attribute("properties"));
        }
    }
}

impl<'a> WithNormalize for BlueprintState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics, config: &Self) {
        if let Value::Value(destination) = &mut self.changelog_destination {
            let configured = config.changelog_destination.as_ref_option();
            default_when_unset(&mut destination.agent, configured.map(|c| &c.agent), false);
        }
        for (name, relation) in self.relations.as_mut_option().into_iter().flatten() {
            if let Value::Value(relation) = relation {
                let configured = entry(&config.relations, name);
                default_when_unset(&mut relation.required, configured.map(|c| &c.required), false);
                default_when_unset(&mut relation.many, configured.map(|c| &c.many), false);
            }
        }
        if let (Value::Value(properties), Value::Value(configured)) =
            (&mut self.properties, &config.properties)
        {
            properties.normalize(configured, PropertyOwner::Blueprint);
        }
    }
}
