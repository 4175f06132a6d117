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
use crate::utils::{known_string, merge_json, merge_string, optional_attr, parse_json};
use crate::validators;

use super::{required_value, PropertyKind, PropertyOwner};

const SPECS: &[&str] = &["async-api", "open-api"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ObjectProp<'a> {
    #[serde(borrow = "'a")]
    pub title: ValueString<'a>,
    pub icon: ValueString<'a>,
    pub description: ValueString<'a>,
    pub required: Value<bool>,
    /// JSON document
    pub default: ValueString<'a>,
    /// Blueprint only
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub spec: ValueString<'a>,
}

pub(super) fn attributes(owner: PropertyOwner) -> HashMap<String, Attribute> {
    let mut attributes: HashMap<String, Attribute> = map! {
        "default" => optional_attr(
            AttributeType::String,
            "The default of the object property, as a JSON encoded string",
        ),
    };
    if owner == PropertyOwner::Blueprint {
        attributes.insert(
            "spec".to_owned(),
            optional_attr(
                AttributeType::String,
                "The specification of the object property, one of: async-api, open-api",
            ),
        );
    }
    attributes
}

impl<'a> ObjectProp<'a> {
    pub(super) fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        validators::json(diags, attr_path.clone().attribute("default"), &self.default);
        validators::one_of(diags, attr_path.attribute("spec"), &self.spec, SPECS);
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
            default: merge_json(&prior.default, property.default.as_ref()),
            spec: match owner {
                PropertyOwner::Blueprint => merge_string(&prior.spec, property.spec.as_deref()),
                PropertyOwner::Action => Value::Null,
            },
        }
    }
}

impl<'a> PropertyKind for ObjectProp<'a> {
    fn required(&self) -> &Value<bool> {
        &self.required
    }

    fn required_mut(&mut self) -> &mut Value<bool> {
        &mut self.required
    }

    fn to_body(&self) -> Result<BlueprintProperty> {
        Ok(BlueprintProperty {
            property_type: "object".to_owned(),
            title: known_string(&self.title),
            icon: known_string(&self.icon),
            description: known_string(&self.description),
            default: self.default.as_deref_option().map(parse_json).transpose()?,
            spec: known_string(&self.spec),
            ..Default::default()
        })
    }
}
