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
use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tf_provider::value::Value;
use tf_provider::AttributePath;

use crate::client::{AggregationProperty, CalculationSpec, NotFoundExt};
use crate::resource::{PortResource, ProviderContext};
use crate::utils::{known_string, merge_json, merge_string, parse_json, DisplayJoinable};

use super::state::{
    AggregateByPropertyState, AggregationPropertiesState, AggregationPropertyState,
    AverageByPropertyState, AverageEntitiesState, MethodState, DEFAULT_AVERAGE_OF,
    DEFAULT_MEASURE_TIME_BY,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct AggregationPropertiesResource;

fn owned<'a>(value: &str) -> Value<Cow<'a, str>> {
    Value::Value(Cow::Owned(value.to_owned()))
}

impl<'a> MethodState<'a> {
    fn to_body(&self) -> Option<CalculationSpec> {
        if self.count_entities == Value::Value(true) {
            return Some(CalculationSpec {
                calculation_by: "entities".to_owned(),
                func: "count".to_owned(),
                ..Default::default()
            });
        }
        if let Value::Value(average) = &self.average_entities {
            return Some(CalculationSpec {
                calculation_by: "entities".to_owned(),
                func: "average".to_owned(),
                average_of: Some(
                    average.average_of.as_deref_option().unwrap_or(DEFAULT_AVERAGE_OF).to_owned(),
                ),
                measure_time_by: Some(
                    average
                        .measure_time_by
                        .as_deref_option()
                        .unwrap_or(DEFAULT_MEASURE_TIME_BY)
                        .to_owned(),
                ),
                property: None,
            });
        }
        if let Value::Value(average) = &self.average_by_property {
            return Some(CalculationSpec {
                calculation_by: "property".to_owned(),
                func: "average".to_owned(),
                average_of: known_string(&average.average_of),
                measure_time_by: known_string(&average.measure_time_by),
                property: known_string(&average.property),
            });
        }
        if let Value::Value(aggregate) = &self.aggregate_by_property {
            return Some(CalculationSpec {
                calculation_by: "property".to_owned(),
                func: aggregate.function.as_str().to_owned(),
                property: known_string(&aggregate.property),
                ..Default::default()
            });
        }
        None
    }

    fn from_body(spec: &CalculationSpec) -> Self {
        let average_of = owned(spec.average_of.as_deref().unwrap_or(DEFAULT_AVERAGE_OF));
        let measure_time_by =
            owned(spec.measure_time_by.as_deref().unwrap_or(DEFAULT_MEASURE_TIME_BY));
        let property = || string_or_null(spec.property.as_deref());

        match (spec.calculation_by.as_str(), spec.func.as_str()) {
            ("entities", "average") => Self {
                average_entities: Value::Value(AverageEntitiesState {
                    average_of,
                    measure_time_by,
                }),
                ..Default::default()
            },
            ("entities", _) => Self {
                count_entities: Value::Value(true),
                ..Default::default()
            },
            (_, "average") => Self {
                average_by_property: Value::Value(AverageByPropertyState {
                    average_of,
                    measure_time_by,
                    property: property(),
                }),
                ..Default::default()
            },
            (_, func) => Self {
                aggregate_by_property: Value::Value(AggregateByPropertyState {
                    function: owned(func),
                    property: property(),
                }),
                ..Default::default()
            },
        }
    }
}

fn string_or_null<'a>(value: Option<&str>) -> Value<Cow<'a, str>> {
    value.map_or(Value::Null, owned)
}

impl<'a> AggregationPropertiesState<'a> {
    fn blueprint(&self) -> Result<&str> {
        self.blueprint_identifier
            .as_deref_option()
            .or(self.id.as_deref_option())
            .context("the blueprint identifier is not known")
    }

    fn to_body(&self) -> Result<BTreeMap<String, AggregationProperty>> {
        let mut body = BTreeMap::new();
        for (name, property) in self.properties.iter().flatten() {
            let Value::Value(property) = property else {
                continue;
            };
            let calculation_spec = property
                .method
                .as_ref_option()
                .and_then(MethodState::to_body)
                .with_context(|| format!("the aggregation property `{name}` has no method"))?;
            let query = property
                .query
                .as_deref_option()
                .map(parse_json)
                .transpose()
                .with_context(|| format!("in the query of `{name}`"))?;
            body.insert(
                name.to_string(),
                AggregationProperty {
                    title: known_string(&property.title),
                    icon: known_string(&property.icon),
                    description: known_string(&property.description),
                    target: property.target_blueprint_identifier.as_str().to_owned(),
                    calculation_spec,
                    query,
                },
            );
        }
        Ok(body)
    }

    /// Rebuild the state from the API, `self` being the prior state
    fn from_body(&self, blueprint: &str, remote: BTreeMap<String, AggregationProperty>) -> Self {
        let properties = remote
            .into_iter()
            .map(|(name, remote)| {
                let prior = self
                    .properties
                    .as_ref_option()
                    .and_then(|properties| properties.get(name.as_str()))
                    .and_then(|property| property.as_ref_option())
                    .cloned()
                    .unwrap_or_default();
                let property = AggregationPropertyState {
                    title: merge_string(&prior.title, remote.title.as_deref()),
                    icon: merge_string(&prior.icon, remote.icon.as_deref()),
                    description: merge_string(&prior.description, remote.description.as_deref()),
                    target_blueprint_identifier: owned(&remote.target),
                    method: Value::Value(MethodState::from_body(&remote.calculation_spec)),
                    query: merge_json(&prior.query, remote.query.as_ref()),
                };
                (Cow::Owned(name), Value::Value(property))
            })
            .collect();

        Self {
            id: owned(blueprint),
            blueprint_identifier: owned(blueprint),
            properties: Value::Value(properties),
        }
    }
}

#[async_trait]
impl PortResource for AggregationPropertiesResource {
    const NAME: &'static str = "port_aggregation_properties";
    type State<'a> = AggregationPropertiesState<'a>;

    fn plan_create(&self, state: &mut Self::State<'_>) {
        state.id = match &state.blueprint_identifier {
            Value::Value(blueprint) => Value::Value(blueprint.clone()),
            _ => Value::Unknown,
        };
    }

    fn plan_update<'a>(
        &self,
        prior: &Self::State<'a>,
        state: &mut Self::State<'a>,
    ) -> Vec<AttributePath> {
        if state.blueprint_identifier != prior.blueprint_identifier {
            self.plan_create(state);
            vec![AttributePath::new("blueprint_identifier")]
        } else {
            Vec::new()
        }
    }

    async fn create<'a>(
        &self,
        ctx: &ProviderContext,
        planned: Self::State<'a>,
    ) -> Result<Self::State<'a>> {
        let blueprint = planned.blueprint()?;
        let body = planned.to_body()?;
        tracing::debug!(
            "Setting aggregation properties [{}] of blueprint {blueprint}",
            body.keys().join_with(", ")
        );
        let remote = ctx.client.patch_aggregation_properties(blueprint, &body).await?;
        Ok(planned.from_body(blueprint, remote.aggregation_properties.unwrap_or_default()))
    }

    async fn read<'a>(
        &self,
        ctx: &ProviderContext,
        state: Self::State<'a>,
    ) -> Result<Option<Self::State<'a>>> {
        let blueprint = state.blueprint()?;
        let Some(remote) = ctx.client.read_blueprint(blueprint).await.found()? else {
            return Ok(None);
        };
        match remote.aggregation_properties {
            Some(properties) if !properties.is_empty() => {
                Ok(Some(state.from_body(blueprint, properties)))
            }
            _ => Ok(None),
        }
    }

    async fn update<'a>(
        &self,
        ctx: &ProviderContext,
        _prior: Self::State<'a>,
        planned: Self::State<'a>,
    ) -> Result<Self::State<'a>> {
        self.create(ctx, planned).await
    }

    async fn delete<'a>(&self, ctx: &ProviderContext, state: Self::State<'a>) -> Result<()> {
        let blueprint = state.blueprint()?;
        ctx.client
            .patch_aggregation_properties(blueprint, &BTreeMap::new())
            .await
            .found()?;
        Ok(())
    }

    fn import<'a>(&self, id: &str) -> Result<Self::State<'a>> {
        if id.is_empty() {
            anyhow::bail!("the import id must be the blueprint identifier");
        }
        Ok(AggregationPropertiesState {
            id: owned(id),
            blueprint_identifier: owned(id),
            ..Default::default()
        })
    }
}
