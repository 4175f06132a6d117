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
pub struct Entity {
    /// Generated by the API when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Vec<String>>,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub relations: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing)]
    pub blueprint: Option<String>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub updated_by: Option<String>,
}

#[derive(Deserialize)]
struct EntityResponse {
    entity: Entity,
}

impl PortClient {
    pub async fn read_entity(&self, blueprint: &str, identifier: &str) -> Result<Entity, ApiError> {
        let path = format!(
            "/v1/blueprints/{}/entities/{}",
            segment(blueprint),
            segment(identifier)
        );
        let response: EntityResponse = self.get(&path).await?;
        Ok(response.entity)
    }

    pub async fn create_entity(
        &self,
        blueprint: &str,
        entity: &Entity,
        run_id: Option<&str>,
    ) -> Result<Entity, ApiError> {
        let mut path = format!("/v1/blueprints/{}/entities?upsert=false", segment(blueprint));
        if let Some(run_id) = run_id {
            path.push_str("&run_id=");
            path.push_str(&segment(run_id));
        }
        let response: EntityResponse = self.post(&path, entity).await?;
        Ok(response.entity)
    }

    pub async fn update_entity(
        &self,
        blueprint: &str,
        identifier: &str,
        entity: &Entity,
        run_id: Option<&str>,
    ) -> Result<Entity, ApiError> {
        let mut path = format!(
            "/v1/blueprints/{}/entities/{}",
            segment(blueprint),
            segment(identifier)
        );
        if let Some(run_id) = run_id {
            path.push_str("?run_id=");
            path.push_str(&segment(run_id));
        }
        let response: EntityResponse = self.put(&path, entity).await?;
        Ok(response.entity)
    }

    pub async fn delete_entity(&self, blueprint: &str, identifier: &str) -> Result<(), ApiError> {
        let path = format!(
            "/v1/blueprints/{}/entities/{}",
            segment(blueprint),
            segment(identifier)
        );
        self.delete(&path).await
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};

    use super::super::test_helpers::{create_test_client, mock_token};
    use super::*;

    #[tokio::test]
    async fn create_entity_passes_run_id() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let m = server
            .mock("POST", "/v1/blueprints/microservice/entities")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("upsert".into(), "false".into()),
                Matcher::UrlEncoded("run_id".into(), "r_123".into()),
            ]))
            .match_body(Matcher::Json(serde_json::json!({
                "title": "Service",
                "properties": {"language": "rust"},
                "relations": {}
            })))
            .with_status(201)
            .with_body(
                r#"{"ok": true, "entity": {
                    "identifier": "generated",
                    "title": "Service",
                    "blueprint": "microservice",
                    "properties": {"language": "rust"},
                    "relations": {}
                }}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let entity = Entity {
            title: Some("Service".to_owned()),
            properties: BTreeMap::from([("language".to_owned(), "rust".into())]),
            ..Default::default()
        };
        let created = client
            .create_entity("microservice", &entity, Some("r_123"))
            .await
            .unwrap();

        assert_eq!(created.identifier.as_deref(), Some("generated"));
        assert_eq!(created.blueprint.as_deref(), Some("microservice"));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn delete_entity_encodes_path() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let m = server
            .mock("DELETE", "/v1/blueprints/microservice/entities/a%2Fb")
            .with_status(200)
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client.delete_entity("microservice", "a/b").await.unwrap();
        m.assert_async().await;
    }
}
