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
use tf_provider::{map, Attribute, AttributeType, Value, ValueString};

use crate::client::BlueprintProperty;
use crate::utils::{known_string, merge, merge_string, optional_attr};

use super::{required_value, PropertyKind, PropertyOwner};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct BooleanProp<'a> {
    #[serde(borrow = "'a")]
    pub title: ValueString<'a>,
    pub icon: ValueString<'a>,
    pub description: ValueString<'a>,
    pub required: Value<bool>,
    pub default: Value<bool>,
}

pub(super) fn attributes() -> HashMap<String, Attribute> {
    map! {
        "default" => optional_attr(AttributeType::Bool, "The default of the boolean property"),
    }
}

impl<'a> BooleanProp<'a> {
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
                property.default.as_ref().and_then(serde_json::Value::as_bool),
            ),
        }
    }
}

impl<'a> PropertyKind for BooleanProp<'a> {
    fn required(&self) -> &Value<bool> {
        &self.required
    }

    fn required_mut(&mut self) -> &mut Value<bool> {
        &mut self.required
    }

    fn to_body(&self) -> Result<BlueprintProperty> {
        Ok(BlueprintProperty {
            property_type: "boolean".to_owned(),
            title: known_string(&self.title),
            icon: known_string(&self.icon),
            description: known_string(&self.description),
            default: self.default.as_ref_option().copied().map(serde_json::Value::Bool),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn explicit_false_default_does_not_drift() {
        let property: BlueprintProperty =
            serde_json::from_value(json!({"type": "boolean", "default": false})).unwrap();
        let prior = BooleanProp {
            default: Value::Value(false),
            ..Default::default()
        };
        let prop = BooleanProp::from_body(&property, false, Some(&prior), PropertyOwner::Blueprint);
        assert_eq!(prop.default, Value::Value(false));

        let prop = BooleanProp::from_body(&property, false, None, PropertyOwner::Blueprint);
        assert_eq!(prop.default, Value::Null);
    }
}
