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

use std::borrow::Cow;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tf_provider::value::Value;
use tf_provider::AttributePath;

use crate::client::{
    Blueprint, BlueprintSchema, CalculationProperty, ChangelogDestination, MirrorProperty,
    NotFoundExt, Relation,
};
use crate::property::{PropertiesState, PropertyOwner};
use crate::resource::{PortResource, ProviderContext};
use crate::utils::{
    entry, known_string, merge, merge_map, merge_string, string_value, DisplayJoinable,
};

use super::state::{
    BlueprintState, CalculationPropertyState, ChangelogDestinationState, MirrorPropertyState,
    RelationState,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct BlueprintResource;

impl<'a> BlueprintState<'a> {
    /// Identifier of the blueprint in the API
    fn api_identifier(&self) -> Result<&str> {
        self.identifier
            .as_deref_option()
            .or(self.id.as_deref_option())
            .context("the blueprint identifier is not known")
    }

    fn to_body(&self) -> Result<Blueprint> {
        let (properties, required) = match &self.properties {
            Value::Value(properties) => properties.to_body()?,
            _ => Default::default(),
        };

        let relations = self
            .relations
            .iter()
            .flatten()
            .filter_map(|(name, relation)| {
                let relation = relation.as_ref_option()?;
                Some((
                    name.to_string(),
                    Relation {
                        target: relation.target.as_str().to_owned(),
                        title: known_string(&relation.title),
                        required: relation.required.unwrap_or_default(),
                        many: relation.many.unwrap_or_default(),
                    },
                ))
            })
            .collect();

        let mirror_properties = self
            .mirror_properties
            .iter()
            .flatten()
            .filter_map(|(name, mirror)| {
                let mirror = mirror.as_ref_option()?;
                Some((
                    name.to_string(),
                    MirrorProperty {
                        path: mirror.path.as_str().to_owned(),
                        title: known_string(&mirror.title),
                    },
                ))
            })
            .collect();

        let calculation_properties = self
            .calculation_properties
            .iter()
            .flatten()
            .filter_map(|(name, calculation)| {
                let calculation = calculation.as_ref_option()?;
                Some((
                    name.to_string(),
                    CalculationProperty {
                        calculation: calculation.calculation.as_str().to_owned(),
                        property_type: calculation.property_type.as_str().to_owned(),
                        title: known_string(&calculation.title),
                        description: known_string(&calculation.description),
                        icon: known_string(&calculation.icon),
                        format: known_string(&calculation.format),
                        colorized: calculation.colorized.as_ref_option().copied(),
                        colors: calculation.colors.as_ref_option().map(|colors| {
                            colors
                                .iter()
                                .filter_map(|(k, v)| Some((k.to_string(), v.as_deref_option()?.to_owned())))
                                .collect()
                        }),
                    },
                ))
            })
            .collect();

        let changelog_destination =
            self.changelog_destination
                .as_ref_option()
                .map(|destination| ChangelogDestination {
                    destination_type: destination.destination_type.as_str().to_owned(),
                    url: known_string(&destination.url),
                    agent: destination.agent.as_ref_option().copied(),
                });

        Ok(Blueprint {
            identifier: self.api_identifier()?.to_owned(),
            title: known_string(&self.title),
            icon: known_string(&self.icon),
            description: known_string(&self.description),
            schema: BlueprintSchema {
                properties,
                required,
            },
            relations,
            mirror_properties,
            calculation_properties,
            changelog_destination,
            ..Default::default()
        })
    }

    /// Rebuild the state from the API, `self` being the prior state
    fn from_body(&self, remote: Blueprint) -> Self {
        let properties = PropertiesState::from_body_value(
            &remote.schema.properties,
            &remote.schema.required,
            &self.properties,
            PropertyOwner::Blueprint,
        );

        let relations = remote
            .relations
            .into_iter()
            .map(|(name, relation)| {
                let prior = entry(&self.relations, &name).cloned().unwrap_or_default();
                let state = RelationState {
                    target: Value::Value(relation.target.into()),
                    title: merge_string(&prior.title, relation.title.as_deref()),
                    required: Value::Value(relation.required),
                    many: Value::Value(relation.many),
                };
                (Cow::Owned(name), Value::Value(state))
            })
            .collect();

        let mirror_properties = remote
            .mirror_properties
            .into_iter()
            .map(|(name, mirror)| {
                let prior = entry(&self.mirror_properties, &name).cloned().unwrap_or_default();
                let state = MirrorPropertyState {
                    path: Value::Value(mirror.path.into()),
                    title: merge_string(&prior.title, mirror.title.as_deref()),
                };
                (Cow::Owned(name), Value::Value(state))
            })
            .collect();

        let calculation_properties = remote
            .calculation_properties
            .into_iter()
            .map(|(name, calculation)| {
                let prior = entry(&self.calculation_properties, &name)
                    .cloned()
                    .unwrap_or_default();
                let colors = calculation
                    .colors
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(k, v)| (Cow::Owned(k), Value::Value(Cow::Owned(v))))
                    .collect();
                let state = CalculationPropertyState {
                    calculation: Value::Value(calculation.calculation.into()),
                    property_type: Value::Value(calculation.property_type.into()),
                    title: merge_string(&prior.title, calculation.title.as_deref()),
                    description: merge_string(&prior.description, calculation.description.as_deref()),
                    icon: merge_string(&prior.icon, calculation.icon.as_deref()),
                    format: merge_string(&prior.format, calculation.format.as_deref()),
                    colorized: merge(&prior.colorized, calculation.colorized),
                    colors: merge_map(&prior.colors, colors),
                };
                (Cow::Owned(name), Value::Value(state))
            })
            .collect();

        let changelog_destination = match remote.changelog_destination {
            // The API reports a KAFKA destination for blueprints that never configured one
            Some(destination)
                if self.changelog_destination.is_null()
                    && destination.destination_type == "KAFKA"
                    && destination.url.is_none()
                    && !destination.agent.unwrap_or_default() =>
            {
                Value::Null
            }
            Some(destination) => {
                let prior = self
                    .changelog_destination
                    .as_ref_option()
                    .cloned()
                    .unwrap_or_default();
                Value::Value(ChangelogDestinationState {
                    destination_type: Value::Value(destination.destination_type.into()),
                    url: merge_string(&prior.url, destination.url.as_deref()),
                    agent: Value::Value(destination.agent.unwrap_or_default()),
                })
            }
            None => Value::Null,
        };

        Self {
            id: Value::Value(remote.identifier.clone().into()),
            identifier: Value::Value(remote.identifier.into()),
            title: merge_string(&self.title, remote.title.as_deref()),
            icon: merge_string(&self.icon, remote.icon.as_deref()),
            description: merge_string(&self.description, remote.description.as_deref()),
            created_at: string_value(remote.created_at),
            created_by: string_value(remote.created_by),
            updated_at: string_value(remote.updated_at),
            updated_by: string_value(remote.updated_by),
            changelog_destination,
            properties,
            relations: merge_map(&self.relations, relations),
            mirror_properties: merge_map(&self.mirror_properties, mirror_properties),
            calculation_properties: merge_map(&self.calculation_properties, calculation_properties),
        }
    }
}

#[async_trait]
impl PortResource for BlueprintResource {
    const NAME: &'static str = "port_blueprint";
    type State<'a> = BlueprintState<'a>;

    fn plan_create(&self, state: &mut Self::State<'_>) {
        state.id = Value::Unknown;
        state.created_at = Value::Unknown;
        state.created_by = Value::Unknown;
        state.updated_at = Value::Unknown;
        state.updated_by = Value::Unknown;
    }

    fn plan_update<'a>(
        &self,
        prior: &Self::State<'a>,
        state: &mut Self::State<'a>,
    ) -> Vec<AttributePath> {
        if state != prior {
            state.updated_at = Value::Unknown;
            state.updated_by = Value::Unknown;
        }
        if state.identifier != prior.identifier {
            self.plan_create(state);
            vec![AttributePath::new("identifier")]
        } else {
            Vec::new()
        }
    }

    async fn create<'a>(
        &self,
        ctx: &ProviderContext,
        planned: Self::State<'a>,
    ) -> Result<Self::State<'a>> {
        let body = planned.to_body()?;
        tracing::debug!("Creating blueprint {}", body.identifier);
        let remote = ctx.client.create_blueprint(&body).await?;
        Ok(planned.from_body(remote))
    }

    async fn read<'a>(
        &self,
        ctx: &ProviderContext,
        state: Self::State<'a>,
    ) -> Result<Option<Self::State<'a>>> {
        let identifier = state.api_identifier()?;
        let Some(remote) = ctx.client.read_blueprint(identifier).await.found()? else {
            return Ok(None);
        };
        Ok(Some(state.from_body(remote)))
    }

    async fn update<'a>(
        &self,
        ctx: &ProviderContext,
        prior: Self::State<'a>,
        planned: Self::State<'a>,
    ) -> Result<Self::State<'a>> {
        let identifier = prior.api_identifier()?;
        let mut body = planned.to_body()?;

        // Aggregation properties are managed by their own resource
        let current = ctx.client.read_blueprint(identifier).await.found()?;
        body.aggregation_properties = current.and_then(|current| current.aggregation_properties);
        if let Some(aggregations) = &body.aggregation_properties {
            tracing::debug!(
                "Keeping aggregation properties [{}] of blueprint {identifier}",
                aggregations.keys().join_with(", ")
            );
        }

        let remote = ctx.client.update_blueprint(identifier, &body).await?;
        Ok(planned.from_body(remote))
    }

    async fn delete<'a>(&self, ctx: &ProviderContext, state: Self::State<'a>) -> Result<()> {
        let identifier = state.api_identifier()?;
        ctx.client.delete_blueprint(identifier).await.found()?;
        Ok(())
    }

    fn import<'a>(&self, id: &str) -> Result<Self::State<'a>> {
        if id.is_empty() {
            anyhow::bail!("the import id must be the blueprint identifier");
        }
        Ok(BlueprintState {
            id: Value::Value(Cow::Owned(id.to_owned())),
            identifier: Value::Value(Cow::Owned(id.to_owned())),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;

    use crate::client::test_helpers::{create_test_client, mock_token};
    use crate::property::StringProp;

    use super::*;

    const REMOTE: &str = r#"{
        "ok": true,
        "blueprint": {
            "identifier": "microservice",
            "title": "Microservice",
            "icon": "Terraform",
            "description": "",
            "schema": {
                "properties": {"language": {"type": "string", "title": "Language"}},
                "required": ["language"]
            },
            "relations": {"team": {"target": "team", "required": false, "many": true}},
            "mirrorProperties": {},
            "calculationProperties": {},
            "aggregationProperties": {
                "deployments": {
                    "target": "deployment",
                    "calculationSpec": {"calculationBy": "entities", "func": "count"}
                }
            },
            "changelogDestination": {"type": "KAFKA"},
            "createdAt": "2024-01-01T00:00:00.000Z",
            "createdBy": "creator",
            "updatedAt": "2024-01-02T00:00:00.000Z",
            "updatedBy": "updater"
        }
    }"#;

    fn context(url: &str) -> ProviderContext {
        ProviderContext {
            client: create_test_client(url),
            beta_features_enabled: false,
        }
    }

    fn planned() -> BlueprintState<'static> {
        let mut state = BlueprintState {
            identifier: Value::Value(Cow::Borrowed("microservice")),
            title: Value::Value(Cow::Borrowed("Microservice")),
            icon: Value::Value(Cow::Borrowed("Terraform")),
            description: Value::Value(Cow::Borrowed("")),
            properties: Value::Value(PropertiesState {
                string_props: Value::Value(
                    [(
                        Cow::Borrowed("language"),
                        Value::Value(StringProp {
                            title: Value::Value(Cow::Borrowed("Language")),
                            required: Value::Value(true),
                            ..Default::default()
                        }),
                    )]
                    .into_iter()
                    .collect(),
                ),
                ..Default::default()
            }),
            relations: Value::Value(
                [(
                    Cow::Borrowed("team"),
                    Value::Value(RelationState {
                        target: Value::Value(Cow::Borrowed("team")),
                        required: Value::Value(false),
                        many: Value::Value(true),
                        ..Default::default()
                    }),
                )]
                .into_iter()
                .collect(),
            ),
            ..Default::default()
        };
        BlueprintResource.plan_create(&mut state);
        state
    }

    #[test]
    fn body_matches_configuration() {
        let body = serde_json::to_value(planned().to_body().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "identifier": "microservice",
                "title": "Microservice",
                "icon": "Terraform",
                "description": "",
                "schema": {
                    "properties": {"language": {"type": "string", "title": "Language"}},
                    "required": ["language"]
                },
                "relations": {"team": {"target": "team", "required": false, "many": true}},
                "mirrorProperties": {},
                "calculationProperties": {}
            })
        );
    }

    #[tokio::test]
    async fn create_fills_computed_attributes() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let m = server
            .mock("POST", "/v1/blueprints")
            .with_status(200)
            .with_body(REMOTE)
            .create_async()
            .await;

        let planned = planned();
        let state = BlueprintResource
            .create(&context(&server.url()), planned.clone())
            .await
            .unwrap();
        m.assert_async().await;

        assert_eq!(state.id, Value::Value(Cow::Borrowed("microservice")));
        assert_eq!(state.created_by, Value::Value(Cow::Borrowed("creator")));
        assert_eq!(state.description, Value::Value(Cow::Borrowed("")));
        // Default KAFKA destination is not reported
        assert!(state.changelog_destination.is_null());
        assert_eq!(state.properties, planned.properties);
        assert_eq!(state.relations, planned.relations);
        assert!(state.mirror_properties.is_null());
    }

    #[tokio::test]
    async fn missing_blueprint_is_gone() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _m = server
            .mock("GET", "/v1/blueprints/microservice")
            .with_status(404)
            .with_body(r#"{"ok": false, "error": "not_found"}"#)
            .create_async()
            .await;

        let state = BlueprintResource.import("microservice").unwrap();
        let result = BlueprintResource
            .read(&context(&server.url()), state)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn update_keeps_aggregation_properties() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _get = server
            .mock("GET", "/v1/blueprints/microservice")
            .with_status(200)
            .with_body(REMOTE)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/v1/blueprints/microservice")
            .match_body(Matcher::PartialJson(json!({
                "aggregationProperties": {
                    "deployments": {
                        "target": "deployment",
                        "calculationSpec": {"calculationBy": "entities", "func": "count"}
                    }
                }
            })))
            .with_status(200)
            .with_body(REMOTE)
            .create_async()
            .await;

        let ctx = context(&server.url());
        let prior = BlueprintResource.read(&ctx, planned()).await.unwrap().unwrap();
        let mut planned = prior.clone();
        planned.title = Value::Value(Cow::Borrowed("Renamed"));
        let replace = BlueprintResource.plan_update(&prior, &mut planned);
        assert!(replace.is_empty());
        assert!(planned.updated_at.is_unknown());

        BlueprintResource.update(&ctx, prior, planned).await.unwrap();
        put.assert_async().await;
    }

    #[test]
    fn identifier_change_forces_replacement() {
        let prior = BlueprintResource.import("microservice").unwrap();
        let mut planned = prior.clone();
        planned.identifier = Value::Value(Cow::Borrowed("service"));
        let replace = BlueprintResource.plan_update(&prior, &mut planned);
        assert_eq!(replace, vec![AttributePath::new("identifier")]);
        assert!(planned.id.is_unknown());
    }
}
