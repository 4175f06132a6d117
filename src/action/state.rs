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
    computed_attr, optional_attr, required_attr, WithNormalize, WithSchema, WithValidate,
};
use crate::validators;

const TRIGGERS: &[&str] = &["CREATE", "DAY-2", "DELETE"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub identifier: ValueString<'a>,
    pub blueprint: ValueString<'a>,
    pub title: ValueString<'a>,
    pub icon: ValueString<'a>,
    pub description: ValueString<'a>,
    pub required_approval: Value<bool>,
    pub trigger: ValueString<'a>,
    /// Always empty, only its presence matters
    pub kafka_method: ValueMap<'a, ValueString<'a>>,
    pub webhook_method: Value<WebhookMethodState<'a>>,
    pub github_method: Value<GithubMethodState<'a>>,
    pub azure_method: Value<AzureMethodState<'a>>,
    pub user_properties: Value<PropertiesState<'a>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookMethodState<'a> {
    #[serde(borrow = "'a")]
    pub url: ValueString<'a>,
    pub agent: Value<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GithubMethodState<'a> {
    #[serde(borrow = "'a")]
    pub org: ValueString<'a>,
    pub repo: ValueString<'a>,
    pub workflow: ValueString<'a>,
    pub omit_payload: Value<bool>,
    pub omit_user_inputs: Value<bool>,
    pub report_workflow_status: Value<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AzureMethodState<'a> {
    #[serde(borrow = "'a")]
    pub org: ValueString<'a>,
    pub webhook: ValueString<'a>,
}

impl<'a> WithSchema for ActionState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                description: Description::plain("A self-service action of a Port blueprint"),
                attributes: map! {
                    "id" => computed_attr(AttributeType::String, "`<blueprint>:<identifier>`"),
                    "identifier" => required_attr(AttributeType::String, "The identifier of the action"),
                    "blueprint" => required_attr(AttributeType::String, "The blueprint the action belongs to"),
                    "title" => required_attr(AttributeType::String, "The display name of the action"),
                    "icon" => optional_attr(AttributeType::String, "The icon of the action"),
                    "description" => optional_attr(AttributeType::String, "The description of the action"),
                    "required_approval" => optional_attr(
                        AttributeType::Bool,
                        "Require an approval before running the action",
                    ),
                    "trigger" => required_attr(
                        AttributeType::String,
                        "The trigger of the action, one of: CREATE, DAY-2, DELETE",
                    ),
                    "kafka_method" => optional_attr(
                        AttributeType::Map(AttributeType::String.into()),
                        "Send the runs to the Kafka topic of the organization, set to `{}`",
                    ),
                    "webhook_method" => optional_attr(
                        AttributeType::AttributeSingle(map! {
                            "url" => required_attr(AttributeType::String, "The url receiving the runs"),
                            "agent" => optional_attr(AttributeType::Bool, "Deliver the runs through the Port agent"),
                        }),
                        "Send the runs to a webhook",
                    ),
                    "github_method" => optional_attr(
                        AttributeType::AttributeSingle(map! {
                            "org" => required_attr(AttributeType::String, "The GitHub organization of the workflow"),
                            "repo" => required_attr(AttributeType::String, "The GitHub repository of the workflow"),
                            "workflow" => optional_attr(AttributeType::String, "The workflow file to run"),
                            "omit_payload" => optional_attr(AttributeType::Bool, "Omit the payload when running the workflow"),
                            "omit_user_inputs" => optional_attr(AttributeType::Bool, "Omit the user inputs when running the workflow"),
                            "report_workflow_status" => optional_attr(
                                AttributeType::Bool,
                                "Report the status of the workflow to the run",
                            ),
                        }),
                        "Run a GitHub workflow",
                    ),
                    "azure_method" => optional_attr(
                        AttributeType::AttributeSingle(map! {
                            "org" => required_attr(AttributeType::String, "The Azure DevOps organization"),
                            "webhook" => required_attr(AttributeType::String, "The Azure DevOps webhook receiving the runs"),
                        }),
                        "Trigger an Azure DevOps pipeline",
                    ),
                    "user_properties" => PropertiesState::schema(
                        PropertyOwner::Action,
                        "The inputs asked to the user running the action",
                    ),
                },
                ..Default::default()
            },
        }
    }
}

impl<'a> WithValidate for ActionState<'a> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        validators::identifier(diags, attr_path.clone().attribute("identifier"), &self.identifier);
        validators::identifier(diags, attr_path.clone().attribute("blueprint"), &self.blueprint);
        validators::one_of(diags, attr_path.clone().attribute("trigger"), &self.trigger, TRIGGERS);

        // Unknown methods may still resolve to null
        let methods = [
            ("kafka_method", self.kafka_method.is_null(), self.kafka_method.is_unknown()),
            ("webhook_method", self.webhook_method.is_null(), self.webhook_method.is_unknown()),
            ("github_method", self.github_method.is_null(), self.github_method.is_unknown()),
            ("azure_method", self.azure_method.is_null(), self.azure_method.is_unknown()),
        ];
        if !methods.iter().any(|(_, _, unknown)| *unknown) {
            let candidates: Vec<(&str, bool)> =
                methods.iter().map(|(name, null, _)| (*name, !null)).collect();
            validators::exactly_one(diags, attr_path.clone(), &candidates);
        }

        if let Value::Value(properties) = &self.user_properties {
            properties.validate(diags, attr_path.attribute("user_properties"));
        }
    }
}

impl<'a> WithNormalize for ActionState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics, config: &Self) {
        if let Value::Value(properties) = &mut self.user_properties {
            let configured = config.user_properties.as_ref_option().unwrap_or(&*properties).clone();
            properties.normalize(&configured, PropertyOwner::Action);
        }
    }
}
