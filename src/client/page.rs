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

use super::{segment, ApiError, PortClient};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub identifier: String,
    #[serde(rename = "type")]
    pub page_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blueprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_in_sidebar: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_query_params: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widgets: Option<Vec<serde_json::Value>>,
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
struct PageResponse {
    page: Page,
}

impl PortClient {
    pub async fn read_page(&self, identifier: &str) -> Result<Page, ApiError> {
        let path = format!("/v1/pages/{}", segment(identifier));
        let response: PageResponse = self.get(&path).await?;
        Ok(response.page)
    }

    pub async fn create_page(&self, page: &Page) -> Result<Page, ApiError> {
        let response: PageResponse = self.post("/v1/pages", page).await?;
        Ok(response.page)
    }

    pub async fn update_page(&self, identifier: &str, page: &Page) -> Result<Page, ApiError> {
        let path = format!("/v1/pages/{}", segment(identifier));
        let response: PageResponse = self.patch(&path, page).await?;
        Ok(response.page)
    }

    pub async fn delete_page(&self, identifier: &str) -> Result<(), ApiError> {
        let path = format!("/v1/pages/{}", segment(identifier));
        self.delete(&path).await
    }
}
