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

use serde::{Deserialize, Serialize};
use tf_provider::value::{Value, ValueMap, ValueString};
use tf_provider::{
    map, Attribute, AttributePath, AttributeType, Block, Description, Diagnostics, Schema,
};

use crate::utils::{
    computed_attr, default_when_unset, entry, optional_attr, optional_computed_attr,
    required_attr, WithNormalize, WithSchema, WithValidate,
};
use crate::validators;

pub(super) const DEFAULT_AVERAGE_OF: &str = "day";
pub(super) const DEFAULT_MEASURE_TIME_BY: &str = "$createdAt";

const AVERAGE_OF: &[&str] = &["hour", "day", "week", "month"];
const FUNCS: &[&str] = &["sum", "min", "max", "median"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationPropertiesState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub blueprint_identifier: ValueString<'a>,
    pub properties: ValueMap<'a, Value<AggregationPropertyState<'a>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationPropertyState<'a> {
    #[serde(borrow = "'a")]
    pub title: ValueString<'a>,
    pub icon: ValueString<'a>,
    pub description: ValueString<'a>,
    pub target_blueprint_identifier: ValueString<'a>,
    pub method: Value<MethodState<'a>>,
    /// JSON document
    pub query: ValueString<'a>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodState<'a> {
    pub count_entities: Value<bool>,
    #[serde(borrow = "'a")]
    pub average_entities: Value<AverageEntitiesState<'a>>,
    pub average_by_property: Value<AverageByPropertyState<'a>>,
    pub aggregate_by_property: Value<AggregateByPropertyState<'a>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageEntitiesState<'a> {
    #[serde(borrow = "'a")]
    pub average_of: ValueString<'a>,
    pub measure_time_by: ValueString<'a>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageByPropertyState<'a> {
    #[serde(borrow = "'a")]
    pub average_of: ValueString<'a>,
    pub measure_time_by: ValueString<'a>,
    pub property: ValueString<'a>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateByPropertyState<'a> {
    #[serde(borrow = "'a", rename = "func")]
    pub function: ValueString<'a>,
    pub property: ValueString<'a>,
}

impl<'a> WithSchema for AggregationPropertiesState<'a> {
    fn schema() -> Schema {
        let method: HashMap<String, Attribute> = map! {
            "count_entities" => optional_attr(AttributeType::Bool, "Count the related entities, must be true"),
            "average_entities" => optional_attr(
                AttributeType::AttributeSingle(map! {
                    "average_of" => optional_computed_attr(
                        AttributeType::String,
                        "The period of the average, one of: hour, day, week, month, defaults to day",
                    ),
                    "measure_time_by" => optional_computed_attr(
                        AttributeType::String,
                        "The date property placing the entities in time, defaults to $createdAt",
                    ),
                }),
                "Average number of related entities per period",
            ),
            "average_by_property" => optional_attr(
                AttributeType::AttributeSingle(map! {
                    "average_of" => required_attr(
                        AttributeType::String,
                        "The period of the average, one of: hour, day, week, month",
                    ),
                    "measure_time_by" => required_attr(
                        AttributeType::String,
                        "The date property placing the entities in time",
                    ),
                    "property" => required_attr(AttributeType::String, "The averaged property"),
                }),
                "Average of a property of the related entities per period",
            ),
            "aggregate_by_property" => optional_attr(
                AttributeType::AttributeSingle(map! {
                    "func" => required_attr(
                        AttributeType::String,
                        "The aggregation function, one of: sum, min, max, median",
                    ),
                    "property" => required_attr(AttributeType::String, "The aggregated property"),
                }),
                "Aggregate a property of the related entities",
            ),
        };

        Schema {
            version: 1,
            block: Block {
                version: 1,
                description: Description::plain(
                    "The aggregation properties of a Port blueprint, managing all of them at once",
                ),
                attributes: map! {
                    "id" => computed_attr(AttributeType::String, "The identifier of the blueprint"),
                    "blueprint_identifier" => required_attr(
                        AttributeType::String,
                        "The blueprint holding the aggregation properties",
                    ),
                    "properties" => required_attr(
                        AttributeType::AttributeMap(map! {
                            "title" => optional_attr(AttributeType::String, "The display name of the aggregation property"),
                            "icon" => optional_attr(AttributeType::String, "The icon of the aggregation property"),
                            "description" => optional_attr(AttributeType::String, "The description of the aggregation property"),
                            "target_blueprint_identifier" => required_attr(
                                AttributeType::String,
                                "The blueprint of the aggregated entities",
                            ),
                            "method" => required_attr(
                                AttributeType::AttributeSingle(method),
                                "How the related entities are aggregated, exactly one must be set",
                            ),
                            "query" => optional_attr(
                                AttributeType::String,
                                "Filter of the aggregated entities, as a JSON encoded string",
                            ),
                        }),
                        "The aggregation properties",
                    ),
                },
                ..Default::default()
            },
        }
    }
}

impl<'a> MethodState<'a> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        let methods = [
            ("count_entities", self.count_entities.is_null(), self.count_entities.is_unknown()),
            ("average_entities", self.average_entities.is_null(), self.average_entities.is_unknown()),
            ("average_by_property", self.average_by_property.is_null(), self.average_by_property.is_unknown()),
            ("aggregate_by_property", self.aggregate_by_property.is_null(), self.aggregate_by_property.is_unknown()),
        ];
        if !methods.iter().any(|(_, _, unknown)| *unknown) {
            let candidates: Vec<(&str, bool)> =
                methods.iter().map(|(name, null, _)| (*name, !null)).collect();
            validators::exactly_one(diags, attr_path.clone(), &candidates);
        }

        if self.count_entities == Value::Value(false) {
            diags.error_short(
                "`count_entities` must be true when set",
                attr_path.clone().attribute("count_entities"),
            );
        }
        if let Value::Value(average) = &self.average_entities {
            validators::one_of(
                diags,
                attr_path.clone().attribute("average_entities").attribute("average_of"),
                &average.average_of,
                AVERAGE_OF,
            );
        }
        if let Value::Value(average) = &self.average_by_property {
            validators::one_of(
                diags,
                attr_path.clone().attribute("average_by_property").attribute("average_of"),
                &average.average_of,
                AVERAGE_OF,
            );
        }
        if let Value::Value(aggregate) = &self.aggregate_by_property {
            validators::one_of(
                diags,
                attr_path.attribute("aggregate_by_property").attribute("func"),
                &aggregate.function,
                FUNCS,
            );
        }
    }
}

impl<'a> WithValidate for AggregationPropertiesState<'a> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        validators::identifier(
            diags,
            attr_path.clone().attribute("blueprint_identifier"),
            &self.blueprint_identifier,
        );
        for (name, property) in self.properties.iter().flatten() {
            let Value::Value(property) = property else {
                continue;
            };
            let attr_path = attr_path.clone().attribute("properties").key(name.to_string());
            validators::json(diags, attr_path.clone().attribute("query"), &property.query);
            if let Value::Value(method) = &property.method {
                method.validate(diags, attr_path.attribute("method"));
            }
        }
    }
}

impl<'a> WithNormalize for AggregationPropertiesState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics, config: &Self) {
        for (name, property) in self.properties.as_mut_option().into_iter().flatten() {
            let Value::Value(property) = property else {
                continue;
            };
            let Value::Value(method) = &mut property.method else {
                continue;
            };
            let Value::Value(average) = &mut method.average_entities else {
                continue;
            };
            let configured = entry(&config.properties, name)
                .and_then(|property| property.method.as_ref_option())
                .and_then(|method| method.average_entities.as_ref_option());
            default_when_unset(
                &mut average.average_of,
                configured.map(|c| &c.average_of),
                Cow::Borrowed(DEFAULT_AVERAGE_OF),
            );
            default_when_unset(
                &mut average.measure_time_by,
                configured.map(|c| &c.measure_time_by),
                Cow::Borrowed(DEFAULT_MEASURE_TIME_BY),
            );
        }
    }
}
