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

use crate::client::{BlueprintProperty, SpecAuthentication};
use crate::utils::{
    known_count, known_string, known_string_list, merge, merge_list, merge_string, optional_attr,
    required_attr,
};
use crate::validators;

use super::{required_value, PropertyKind, PropertyOwner};

const SPECS: &[&str] = &["open-api", "async-api", "embedded-url"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct StringProp<'a> {
    #[serde(borrow = "'a")]
    pub title: ValueString<'a>,
    pub icon: ValueString<'a>,
    pub description: ValueString<'a>,
    pub required: Value<bool>,
    pub default: ValueString<'a>,
    pub format: ValueString<'a>,
    pub min_length: Value<f64>,
    pub max_length: Value<f64>,
    pub pattern: ValueString<'a>,
    #[serde(rename = "enum")]
    pub enum_values: Value<Vec<ValueString<'a>>>,
    /// Blueprint only
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub spec: ValueString<'a>,
    /// Blueprint only
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub spec_authentication: Value<SpecAuthenticationState<'a>>,
    /// Action only, the input selects entities of this blueprint
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub blueprint: ValueString<'a>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct SpecAuthenticationState<'a> {
    #[serde(borrow = "'a")]
    pub client_id: ValueString<'a>,
    pub token_url: ValueString<'a>,
    pub authorization_url: ValueString<'a>,
}

pub(super) fn attributes(owner: PropertyOwner) -> HashMap<String, Attribute> {
    let mut attributes: HashMap<String, Attribute> = map! {
        "default" => optional_attr(AttributeType::String, "The default of the string property"),
        "format" => optional_attr(AttributeType::String, "The format of the string property"),
        "min_length" => optional_attr(AttributeType::Number, "The min length of the string property"),
        "max_length" => optional_attr(AttributeType::Number, "The max length of the string property"),
        "pattern" => optional_attr(AttributeType::String, "The pattern of the string property"),
        "enum" => optional_attr(
            AttributeType::List(AttributeType::String.into()),
            "The enum of the string property",
        ),
    };
    match owner {
        PropertyOwner::Blueprint => {
            attributes.insert(
                "spec".to_owned(),
                optional_attr(
                    AttributeType::String,
                    "The specification of the string property, one of: open-api, async-api, embedded-url",
                ),
            );
            attributes.insert(
                "spec_authentication".to_owned(),
                optional_attr(
                    AttributeType::AttributeSingle(map! {
                        "client_id" => required_attr(AttributeType::String, "The OAuth client id"),
                        "token_url" => required_attr(AttributeType::String, "The OAuth token url"),
                        "authorization_url" => required_attr(AttributeType::String, "The OAuth authorization url"),
                    }),
                    "The authentication used to display an embedded specification",
                ),
            );
        }
        PropertyOwner::Action => {
            attributes.insert(
                "blueprint".to_owned(),
                optional_attr(
                    AttributeType::String,
                    "The blueprint of the entities selected by the input",
                ),
            );
        }
    }
    attributes
}

impl<'a> StringProp<'a> {
    pub(super) fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        validators::count(diags, attr_path.clone().attribute("min_length"), &self.min_length);
        validators::count(diags, attr_path.clone().attribute("max_length"), &self.max_length);
        validators::ordered(
            diags,
            attr_path.clone().attribute("min_length"),
            &self.min_length,
            &self.max_length,
        );
        validators::enum_list(diags, attr_path.clone().attribute("enum"), &self.enum_values);
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
        let remote_enum = property.enum_values.as_ref().map(|values| {
            values
                .iter()
                .filter_map(|value| value.as_str().map(str::to_owned).map(Into::into))
                .collect()
        });

        let mut prop = Self {
            title: merge_string(&prior.title, property.title.as_deref()),
            icon: merge_string(&prior.icon, property.icon.as_deref()),
            description: merge_string(&prior.description, property.description.as_deref()),
            required: required_value(&prior.required, required, owner),
            default: merge_string(
                &prior.default,
                property.default.as_ref().and_then(serde_json::Value::as_str),
            ),
            format: merge_string(&prior.format, property.format.as_deref()),
            min_length: merge(&prior.min_length, property.min_length.map(|count| count as f64)),
            max_length: merge(&prior.max_length, property.max_length.map(|count| count as f64)),
            pattern: merge_string(&prior.pattern, property.pattern.as_deref()),
            enum_values: merge_list(&prior.enum_values, remote_enum),
            ..Default::default()
        };

        match owner {
            PropertyOwner::Blueprint => {
                prop.spec = merge_string(&prior.spec, property.spec.as_deref());
                prop.spec_authentication = match &property.spec_authentication {
                    Some(auth) => Value::Value(SpecAuthenticationState {
                        client_id: Value::Value(auth.client_id.clone().into()),
                        token_url: Value::Value(auth.token_url.clone().into()),
                        authorization_url: Value::Value(auth.authorization_url.clone().into()),
                    }),
                    None => Value::Null,
                };
            }
            PropertyOwner::Action => {
                prop.blueprint = merge_string(&prior.blueprint, property.blueprint.as_deref());
            }
        }
        prop
    }
}

impl<'a> PropertyKind for StringProp<'a> {
    fn required(&self) -> &Value<bool> {
        &self.required
    }

    fn required_mut(&mut self) -> &mut Value<bool> {
        &mut self.required
    }

    fn to_body(&self) -> Result<BlueprintProperty> {
        Ok(BlueprintProperty {
            property_type: "string".to_owned(),
            title: known_string(&self.title),
            icon: known_string(&self.icon),
            description: known_string(&self.description),
            default: known_string(&self.default).map(serde_json::Value::String),
            format: known_string(&self.format),
            enum_values: known_string_list(&self.enum_values)
                .map(|values| values.into_iter().map(serde_json::Value::String).collect()),
            min_length: known_count(&self.min_length),
            max_length: known_count(&self.max_length),
            pattern: known_string(&self.pattern),
            spec: known_string(&self.spec),
            spec_authentication: self.spec_authentication.as_ref_option().map(|auth| {
                SpecAuthentication {
                    client_id: auth.client_id.as_str().to_owned(),
                    token_url: auth.token_url.as_str().to_owned(),
                    authorization_url: auth.authorization_url.as_str().to_owned(),
                }
            }),
            blueprint: known_string(&self.blueprint),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use serde_json::json;

    use super::*;

    #[test]
    fn description_cleared_remotely_is_kept_when_empty() {
        let property: BlueprintProperty = serde_json::from_value(json!({"type": "string"})).unwrap();
        let prior = StringProp {
            description: Value::Value(Cow::Borrowed("")),
            title: Value::Value(Cow::Borrowed("Old title")),
            ..Default::default()
        };

        let prop = StringProp::from_body(&property, false, Some(&prior), PropertyOwner::Blueprint);
        assert_eq!(prop.description, Value::Value(Cow::Borrowed("")));
        assert_eq!(prop.title, Value::Null);
        assert_eq!(prop.required, Value::Null);
    }

    #[test]
    fn spec_authentication_round_trip() {
        let property: BlueprintProperty = serde_json::from_value(json!({
            "type": "string",
            "format": "url",
            "spec": "open-api",
            "specAuthentication": {
                "clientId": "id",
                "tokenUrl": "https://auth/token",
                "authorizationUrl": "https://auth/authorize"
            }
        }))
        .unwrap();

        let prop = StringProp::from_body(&property, true, None, PropertyOwner::Blueprint);
        assert_eq!(prop.required, Value::Value(true));
        assert_eq!(prop.to_body().unwrap(), property);

        let action = StringProp::from_body(&property, false, None, PropertyOwner::Action);
        assert!(action.spec.is_null());
        assert!(action.spec_authentication.is_null());
    }

    #[test]
    fn invalid_lengths_and_spec_are_reported() {
        let prop = StringProp {
            min_length: Value::Value(5.0),
            max_length: Value::Value(-1.0),
            spec: Value::Value(Cow::Borrowed("graphql")),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        prop.validate(&mut diags, AttributePath::new("properties"));
        // negative max, min > max, unknown spec
        assert_eq!(diags.errors.len(), 3);
    }

    #[test]
    fn fractional_length_is_rejected() {
        let prop = StringProp {
            min_length: Value::Value(2.5),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        prop.validate(&mut diags, AttributePath::new("properties"));
        assert_eq!(diags.errors.len(), 1);
        assert_eq!(diags.errors[0].summary, "Invalid count");
    }

    #[test]
    fn lengths_are_sent_as_integers() {
        let prop = StringProp {
            min_length: Value::Value(2.0),
            max_length: Value::Value(10.0),
            ..Default::default()
        };
        let body = serde_json::to_value(prop.to_body().unwrap()).unwrap();
        assert_eq!(body["minLength"], serde_json::json!(2));
        assert_eq!(body["maxLength"], serde_json::json!(10));
    }
}
