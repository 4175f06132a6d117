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

use super::{segment, ApiError, PortClient};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub schema: BlueprintSchema,
    #[serde(default)]
    pub relations: BTreeMap<String, Relation>,
    #[serde(default)]
    pub mirror_properties: BTreeMap<String, MirrorProperty>,
    #[serde(default)]
    pub calculation_properties: BTreeMap<String, CalculationProperty>,
    /// Managed by `port_aggregation_properties`, only sent when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_properties: Option<BTreeMap<String, AggregationProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog_destination: Option<ChangelogDestination>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlueprintSchema {
    #[serde(default)]
    pub properties: BTreeMap<String, BlueprintProperty>,
    #[serde(default)]
    pub required: Vec<String>,
}

/// A typed property, used both by blueprint schemas and action user inputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintProperty {
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<PropertyItems>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_authentication: Option<SpecAuthentication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blueprint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyItems {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecAuthentication {
    pub client_id: String,
    pub token_url: String,
    pub authorization_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub many: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MirrorProperty {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationProperty {
    pub calculation: String,
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colorized: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangelogDestination {
    #[serde(rename = "type")]
    pub destination_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub target: String,
    pub calculation_spec: CalculationSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationSpec {
    /// Either `entities` or `property`
    pub calculation_by: String,
    pub func: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_time_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
}

#[derive(Deserialize)]
struct BlueprintResponse {
    blueprint: Blueprint,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregationPatch<'a> {
    aggregation_properties: &'a BTreeMap<String, AggregationProperty>,
}

impl PortClient {
    pub async fn read_blueprint(&self, identifier: &str) -> Result<Blueprint, ApiError> {
        let path = format!("/v1/blueprints/{}", segment(identifier));
        let response: BlueprintResponse = self.get(&path).await?;
        Ok(response.blueprint)
    }

    pub async fn create_blueprint(&self, blueprint: &Blueprint) -> Result<Blueprint, ApiError> {
        let response: BlueprintResponse = self.post("/v1/blueprints", blueprint).await?;
        Ok(response.blueprint)
    }

    pub async fn update_blueprint(
        &self,
        identifier: &str,
        blueprint: &Blueprint,
    ) -> Result<Blueprint, ApiError> {
        let path = format!("/v1/blueprints/{}", segment(identifier));
        let response: BlueprintResponse = self.put(&path, blueprint).await?;
        Ok(response.blueprint)
    }

    /// Replace the aggregation properties of a blueprint, leaving the rest untouched
    pub async fn patch_aggregation_properties(
        &self,
        identifier: &str,
        properties: &BTreeMap<String, AggregationProperty>,
    ) -> Result<Blueprint, ApiError> {
        let path = format!("/v1/blueprints/{}", segment(identifier));
        let response: BlueprintResponse = self
            .patch(
                &path,
                &AggregationPatch {
                    aggregation_properties: properties,
                },
            )
            .await?;
        Ok(response.blueprint)
    }

    pub async fn delete_blueprint(&self, identifier: &str) -> Result<(), ApiError> {
        let path = format!("/v1/blueprints/{}", segment(identifier));
        self.delete(&path).await
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};

    use super::super::test_helpers::{create_test_client, mock_token};
    use super::*;

    const BLUEPRINT: &str = r#"{
        "ok": true,
        "blueprint": {
            "identifier": "microservice",
            "title": "Microservice",
            "icon": "Terraform",
            "schema": {
                "properties": {
                    "language": {"type": "string", "enum": ["go", "rust"]},
                    "replicas": {"type": "number", "default": 2}
                },
                "required": ["language"]
            },
            "relations": {"team": {"target": "team", "many": true}},
            "mirrorProperties": {},
            "calculationProperties": {},
            "aggregationProperties": {
                "count": {
                    "target": "deployment",
                    "calculationSpec": {"calculationBy": "entities", "func": "count"}
                }
            },
            "createdAt": "2024-01-01T00:00:00.000Z",
            "createdBy": "someone",
            "updatedAt": "2024-01-02T00:00:00.000Z",
            "updatedBy": "someone"
        }
    }"#;

    #[tokio::test]
    async fn read_blueprint_parses_envelope() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _m = server
            .mock("GET", "/v1/blueprints/microservice")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BLUEPRINT)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let blueprint = client.read_blueprint("microservice").await.unwrap();

        assert_eq!(blueprint.identifier, "microservice");
        assert_eq!(blueprint.title.as_deref(), Some("Microservice"));
        assert_eq!(blueprint.schema.required, vec!["language".to_string()]);
        assert_eq!(blueprint.schema.properties["replicas"].default, Some(2.into()));
        assert!(blueprint.relations["team"].many);
        assert_eq!(
            blueprint.aggregation_properties.unwrap()["count"]
                .calculation_spec
                .func,
            "count"
        );
        assert_eq!(blueprint.created_by.as_deref(), Some("someone"));
    }

    #[tokio::test]
    async fn audit_fields_are_not_sent() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let m = server
            .mock("POST", "/v1/blueprints")
            .match_body(Matcher::Json(serde_json::json!({
                "identifier": "microservice",
                "title": "Microservice",
                "schema": {"properties": {}, "required": []},
                "relations": {},
                "mirrorProperties": {},
                "calculationProperties": {}
            })))
            .with_status(200)
            .with_body(BLUEPRINT)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let blueprint = Blueprint {
            identifier: "microservice".to_owned(),
            title: Some("Microservice".to_owned()),
            created_at: Some("ignored".to_owned()),
            ..Default::default()
        };
        client.create_blueprint(&blueprint).await.unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn patch_aggregation_properties_sends_only_aggregations() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let m = server
            .mock("PATCH", "/v1/blueprints/microservice")
            .match_body(Matcher::Json(serde_json::json!({"aggregationProperties": {}})))
            .with_status(200)
            .with_body(BLUEPRINT)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client
            .patch_aggregation_properties("microservice", &BTreeMap::new())
            .await
            .unwrap();
        m.assert_async().await;
    }
}
