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

use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tf_provider::{map, Attribute, AttributePath, AttributeType, Diagnostics, Value, ValueString};

use crate::client::BlueprintProperty;
use crate::utils::{json_number, known_list, known_string, merge, merge_list, merge_string, optional_attr};
use crate::validators;

use super::{required_value, PropertyKind, PropertyOwner};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct NumberProp<'a> {
    #[serde(borrow = "'a")]
    pub title: ValueString<'a>,
    pub icon: ValueString<'a>,
    pub description: ValueString<'a>,
    pub required: Value<bool>,
    pub default: Value<f64>,
    pub minimum: Value<f64>,
    pub maximum: Value<f64>,
    #[serde(rename = "enum")]
    pub enum_values: Value<Vec<Value<f64>>>,
}

pub(super) fn attributes() -> HashMap<String, Attribute> {
    map! {
        "default" => optional_attr(AttributeType::Number, "The default of the number property"),
        "minimum" => optional_attr(AttributeType::Number, "The minimum of the number property"),
        "maximum" => optional_attr(AttributeType::Number, "The maximum of the number property"),
        "enum" => optional_attr(
            AttributeType::List(AttributeType::Number.into()),
            "The enum of the number property",
        ),
    }
}

impl<'a> NumberProp<'a> {
    pub(super) fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        validators::ordered(
            diags,
            attr_path.clone().attribute("minimum"),
            &self.minimum,
            &self.maximum,
        );
        validators::enum_list(diags, attr_path.attribute("enum"), &self.enum_values);
    }

    pub(super) fn from_body(
        property: &BlueprintProperty,
        required: bool,
        prior: Option<&Self>,
        owner: PropertyOwner,
    ) -> Self {
        let default = Self::default();
        let prior = prior.unwrap_or(&default);
        Self {
            title: merge_string(&prior.title, property.title.as_deref()),
            icon: merge_string(&prior.icon, property.icon.as_deref()),
            description: merge_string(&prior.description, property.description.as_deref()),
            required: required_value(&prior.required, required, owner),
            default: merge(
                &prior.default,
                property.default.as_ref().and_then(serde_json::Value::as_f64),
            ),
            minimum: merge(&prior.minimum, property.minimum),
            maximum: merge(&prior.maximum, property.maximum),
            enum_values: merge_list(
                &prior.enum_values,
                property
                    .enum_values
                    .as_ref()
                    .map(|values| values.iter().filter_map(serde_json::Value::as_f64).collect()),
            ),
        }
    }
}

impl<'a> PropertyKind for NumberProp<'a> {
    fn required(&self) -> &Value<bool> {
        &self.required
    }

    fn required_mut(&mut self) -> &mut Value<bool> {
        &mut self.required
    }

    fn to_body(&self) -> Result<BlueprintProperty> {
        Ok(BlueprintProperty {
            property_type: "number".to_owned(),
            title: known_string(&self.title),
            icon: known_string(&self.icon),
            description: known_string(&self.description),
            default: self.default.as_ref_option().copied().map(json_number),
            minimum: self.minimum.as_ref_option().copied(),
            maximum: self.maximum.as_ref_option().copied(),
            enum_values: known_list(&self.enum_values)
                .map(|values| values.into_iter().map(json_number).collect()),
            ..Default::default()
        })
    }
}
