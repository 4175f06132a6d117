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

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::value::{Value, ValueString};
use tf_provider::{
    map, Attribute, AttributePath, AttributeType, Block, Description, Diagnostics, Provider,
    Schema, ValueEmpty,
};
use tracing::info;
use url::Url;

use crate::action::ActionResource;
use crate::aggregation::AggregationPropertiesResource;
use crate::blueprint::BlueprintResource;
use crate::client::{PortClient, DEFAULT_BASE_URL};
use crate::entity::EntityResource;
use crate::page::PageResource;
use crate::resource::{ContextSlot, PortResourceAdapter, ProviderContext};
use crate::utils::optional_attr;

const CLIENT_ID_ENV: &str = "PORT_CLIENT_ID";
const SECRET_ENV: &str = "PORT_CLIENT_SECRET";
const BASE_URL_ENV: &str = "PORT_BASE_URL";
const BETA_FEATURES_ENV: &str = "PORT_BETA_FEATURES_ENABLED";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortProviderConfig<'a> {
    #[serde(borrow = "'a")]
    pub client_id: ValueString<'a>,
    pub secret: ValueString<'a>,
    pub base_url: ValueString<'a>,
    pub beta_features_enabled: Value<bool>,
}

/// Provider configuration once the environment fallbacks are applied
#[derive(Debug, Clone, PartialEq)]
struct ResolvedConfig {
    client_id: String,
    secret: String,
    base_url: Url,
    beta_features_enabled: bool,
}

#[derive(Debug, Default, Clone)]
pub struct PortProvider {
    context: ContextSlot,
}

/// The configured value, or the environment variable when it is not set
fn with_fallback(value: &ValueString<'_>, env: &str) -> Option<String> {
    match value.as_deref_option() {
        Some(value) if !value.is_empty() => Some(value.to_owned()),
        _ => std::env::var(env).ok().filter(|value| !value.is_empty()),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" | "" => Some(false),
        _ => None,
    }
}

fn parse_base_url(diags: &mut Diagnostics, text: &str) -> Option<Url> {
    match Url::parse(text) {
        Ok(url) => Some(url),
        Err(err) => {
            diags.error(
                "Invalid base url",
                format!("`{text}` is not a valid url: {err}"),
                AttributePath::new("base_url"),
            );
            None
        }
    }
}

impl<'a> PortProviderConfig<'a> {
    fn resolve(&self, diags: &mut Diagnostics) -> Option<ResolvedConfig> {
        let mut required = |value: &ValueString<'_>, name: &'static str, env: &str| {
            let resolved = with_fallback(value, env);
            if resolved.is_none() {
                diags.error(
                    format!("Missing `{name}`"),
                    format!(
                        "The Port provider needs `{name}`, set it in the provider block or through the `{env}` environment variable."
                    ),
                    AttributePath::new(name),
                );
            }
            resolved
        };
        let client_id = required(&self.client_id, "client_id", CLIENT_ID_ENV);
        let secret = required(&self.secret, "secret", SECRET_ENV);

        let base_url = with_fallback(&self.base_url, BASE_URL_ENV)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let base_url = parse_base_url(diags, &base_url);

        let beta_features_enabled = match self.beta_features_enabled {
            Value::Value(enabled) => Some(enabled),
            _ => match std::env::var(BETA_FEATURES_ENV) {
                Ok(text) => {
                    let parsed = parse_bool(&text);
                    if parsed.is_none() {
                        diags.error(
                            "Invalid `beta_features_enabled`",
                            format!("`{BETA_FEATURES_ENV}` must be `true` or `false`, got `{text}`."),
                            AttributePath::new("beta_features_enabled"),
                        );
                    }
                    parsed
                }
                Err(_) => Some(false),
            },
        };

        Some(ResolvedConfig {
            client_id: client_id?,
            secret: secret?,
            base_url: base_url?,
            beta_features_enabled: beta_features_enabled?,
        })
    }
}

#[async_trait]
impl Provider for PortProvider {
    type Config<'a> = Value<PortProviderConfig<'a>>;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let attributes: HashMap<String, Attribute> = map! {
            "client_id" => optional_attr(
                AttributeType::String,
                "The client id of the Port organization, defaults to `PORT_CLIENT_ID`",
            ),
            "secret" => Attribute {
                sensitive: true,
                ..optional_attr(
                    AttributeType::String,
                    "The client secret of the Port organization, defaults to `PORT_CLIENT_SECRET`",
                )
            },
            "base_url" => optional_attr(
                AttributeType::String,
                "The url of the Port API, defaults to `PORT_BASE_URL` or https://api.getport.io",
            ),
            "beta_features_enabled" => optional_attr(
                AttributeType::Bool,
                "Enable the resources still in beta, defaults to `PORT_BETA_FEATURES_ENABLED`",
            ),
        };
        Some(Schema {
            version: 1,
            block: Block {
                description: Description::plain("Manage the software catalog of Port"),
                attributes,
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::Config<'a>) -> Option<()> {
        if let Value::Value(config) = &config {
            let base_url = config.base_url.as_deref_option().filter(|url| !url.is_empty());
            if let Some(base_url) = base_url {
                parse_base_url(diags, base_url);
            }
        }

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn configure<'a>(
        &self,
        diags: &mut Diagnostics,
        terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        let config = config.unwrap_or_default().resolve(diags)?;

        let client = match PortClient::new(config.base_url.as_str(), &config.client_id, &config.secret)
        {
            Ok(client) => client,
            Err(err) => {
                diags.root_error("Failed to create the Port client", err.to_string());
                return None;
            }
        };
        info!(
            "Configured Port provider for {} (terraform {terraform_version}, beta features: {})",
            client.base_url(),
            config.beta_features_enabled
        );

        let Ok(mut context) = self.context.write() else {
            diags.root_error(
                "Provider state is corrupted",
                "A previous operation panicked while configuring the provider.",
            );
            return None;
        };
        *context = Some(ProviderContext {
            client,
            beta_features_enabled: config.beta_features_enabled,
        });

        Some(())
    }

    fn get_resources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn tf_provider::resource::DynamicResource>>> {
        Some(map! {
            "blueprint" => PortResourceAdapter::new(BlueprintResource, self.context.clone()),
            "entity" => PortResourceAdapter::new(EntityResource, self.context.clone()),
            "action" => PortResourceAdapter::new(ActionResource, self.context.clone()),
            "page" => PortResourceAdapter::new(PageResource, self.context.clone()),
            "aggregation_properties" => PortResourceAdapter::new(AggregationPropertiesResource, self.context.clone()),
        })
    }

    fn get_data_sources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn tf_provider::data_source::DynamicDataSource>>> {
        Some(map! {})
    }
}
