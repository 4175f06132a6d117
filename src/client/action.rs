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

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{segment, ApiError, BlueprintProperty, PortClient};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub trigger: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_method: Option<InvocationMethod>,
    #[serde(default)]
    pub user_inputs: ActionUserInputs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_approval: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionUserInputs {
    #[serde(default)]
    pub properties: BTreeMap<String, BlueprintProperty>,
    #[serde(default)]
    pub required: Vec<String>,
}

/// How an action run is delivered, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InvocationMethod {
    #[serde(rename = "KAFKA")]
    Kafka,
    #[serde(rename = "WEBHOOK")]
    Webhook {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent: Option<bool>,
    },
    #[serde(rename = "GITHUB", rename_all = "camelCase")]
    Github {
        org: String,
        repo: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        workflow: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        omit_payload: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        omit_user_inputs: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        report_workflow_status: Option<bool>,
    },
    #[serde(rename = "AZURE-DEVOPS")]
    Azure { org: String, webhook: String },
}

#[derive(Deserialize)]
struct ActionResponse {
    action: Action,
}

impl PortClient {
    pub async fn read_action(&self, blueprint: &str, identifier: &str) -> Result<Action, ApiError> {
        let path = format!(
            "/v1/blueprints/{}/actions/{}",
            segment(blueprint),
            segment(identifier)
        );
        let response: ActionResponse = self.get(&path).await?;
        Ok(response.action)
    }

    pub async fn create_action(&self, blueprint: &str, action: &Action) -> Result<Action, ApiError> {
        let path = format!("/v1/blueprints/{}/actions", segment(blueprint));
        let response: ActionResponse = self.post(&path, action).await?;
        Ok(response.action)
    }

    pub async fn update_action(
        &self,
        blueprint: &str,
        identifier: &str,
        action: &Action,
    ) -> Result<Action, ApiError> {
        let path = format!(
            "/v1/blueprints/{}/actions/{}",
            segment(blueprint),
            segment(identifier)
        );
        let response: ActionResponse = self.put(&path, action).await?;
        Ok(response.action)
    }

    pub async fn delete_action(&self, blueprint: &str, identifier: &str) -> Result<(), ApiError> {
        let path = format!(
            "/v1/blueprints/{}/actions/{}",
            segment(blueprint),
            segment(identifier)
        );
        self.delete(&path).await
    }
}
