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
use serde_json::Value as Json;
use tf_provider::value::{Value, ValueMap, ValueString};
use tf_provider::AttributePath;

use crate::client::{Blueprint, BlueprintProperty, Entity, NotFoundExt};
use crate::resource::{PortResource, ProviderContext};
use crate::utils::{
    json_number, known_string, known_string_list, merge_json, merge_list, merge_map,
    merge_string, parse_json, string_value,
};

use super::state::{EntityArrayPropsState, EntityPropertiesState, EntityRelationsState, EntityState};

#[derive(Debug, Default, Clone, Copy)]
pub struct EntityResource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemKind {
    String,
    Number,
    Boolean,
    Object,
}

/// Which attribute of `properties` holds a remote value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    String,
    Number,
    Boolean,
    Object,
    Array(ItemKind),
}

impl ItemKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    fn from_value(value: &Json) -> Option<Self> {
        match value {
            Json::String(_) => Some(Self::String),
            Json::Number(_) => Some(Self::Number),
            Json::Bool(_) => Some(Self::Boolean),
            Json::Object(_) | Json::Array(_) => Some(Self::Object),
            Json::Null => None,
        }
    }
}

impl ValueKind {
    fn from_schema(property: &BlueprintProperty) -> Option<Self> {
        match property.property_type.as_str() {
            "array" => property
                .items
                .as_ref()
                .and_then(|items| ItemKind::from_name(&items.item_type))
                .map(Self::Array),
            name => match ItemKind::from_name(name)? {
                ItemKind::String => Some(Self::String),
                ItemKind::Number => Some(Self::Number),
                ItemKind::Boolean => Some(Self::Boolean),
                ItemKind::Object => Some(Self::Object),
            },
        }
    }

    fn from_value(value: &Json) -> Option<Self> {
        match value {
            Json::String(_) => Some(Self::String),
            Json::Number(_) => Some(Self::Number),
            Json::Bool(_) => Some(Self::Boolean),
            Json::Object(_) => Some(Self::Object),
            Json::Array(items) => Some(Self::Array(
                items
                    .iter()
                    .find_map(ItemKind::from_value)
                    .unwrap_or(ItemKind::String),
            )),
            Json::Null => None,
        }
    }
}

fn has_key<T>(map: &ValueMap<'_, T>, key: &str) -> bool {
    map.as_ref_option().is_some_and(|map| map.contains_key(key))
}

fn prior_value<'a, T: Clone + Default>(map: &ValueMap<'a, T>, key: &str) -> T {
    map.as_ref_option()
        .and_then(|map| map.get(key))
        .cloned()
        .unwrap_or_default()
}

impl<'a> EntityPropertiesState<'a> {
    /// Kind of a property already present in the state
    fn kind_of(&self, name: &str) -> Option<ValueKind> {
        if has_key(&self.string_props, name) {
            return Some(ValueKind::String);
        }
        if has_key(&self.number_props, name) {
            return Some(ValueKind::Number);
        }
        if has_key(&self.boolean_props, name) {
            return Some(ValueKind::Boolean);
        }
        if has_key(&self.object_props, name) {
            return Some(ValueKind::Object);
        }
        let arrays = self.array_props.as_ref_option()?;
        if has_key(&arrays.string_items, name) {
            Some(ValueKind::Array(ItemKind::String))
        } else if has_key(&arrays.number_items, name) {
            Some(ValueKind::Array(ItemKind::Number))
        } else if has_key(&arrays.boolean_items, name) {
            Some(ValueKind::Array(ItemKind::Boolean))
        } else if has_key(&arrays.object_items, name) {
            Some(ValueKind::Array(ItemKind::Object))
        } else {
            None
        }
    }

    fn is_empty(&self) -> bool {
        fn empty<T>(map: &ValueMap<'_, T>) -> bool {
            map.as_ref_option().map_or(true, BTreeMap::is_empty)
        }
        empty(&self.string_props)
            && empty(&self.number_props)
            && empty(&self.boolean_props)
            && empty(&self.object_props)
            && self.array_props.as_ref_option().map_or(true, |arrays| {
                empty(&arrays.string_items)
                    && empty(&arrays.number_items)
                    && empty(&arrays.boolean_items)
                    && empty(&arrays.object_items)
            })
    }

    fn to_body(&self) -> Result<BTreeMap<String, Json>> {
        let mut body = BTreeMap::new();

        for (name, value) in self.string_props.iter().flatten() {
            if let Some(value) = value.as_deref_option() {
                body.insert(name.to_string(), Json::from(value));
            }
        }
        for (name, value) in self.number_props.iter().flatten() {
            if let Value::Value(value) = value {
                body.insert(name.to_string(), json_number(*value));
            }
        }
        for (name, value) in self.boolean_props.iter().flatten() {
            if let Value::Value(value) = value {
                body.insert(name.to_string(), Json::Bool(*value));
            }
        }
        for (name, value) in self.object_props.iter().flatten() {
            if let Some(text) = value.as_deref_option() {
                let value = parse_json(text).with_context(|| format!("in object property `{name}`"))?;
                body.insert(name.to_string(), value);
            }
        }

        let Value::Value(arrays) = &self.array_props else {
            return Ok(body);
        };
        for (name, items) in arrays.string_items.iter().flatten() {
            if let Value::Value(items) = items {
                let items = items.iter().filter_map(|item| item.as_deref_option().map(Json::from));
                body.insert(name.to_string(), Json::Array(items.collect()));
            }
        }
        for (name, items) in arrays.number_items.iter().flatten() {
            if let Value::Value(items) = items {
                let items = items.iter().filter_map(|item| item.as_ref_option().copied().map(json_number));
                body.insert(name.to_string(), Json::Array(items.collect()));
            }
        }
        for (name, items) in arrays.boolean_items.iter().flatten() {
            if let Value::Value(items) = items {
                let items = items.iter().filter_map(|item| item.as_ref_option().copied().map(Json::Bool));
                body.insert(name.to_string(), Json::Array(items.collect()));
            }
        }
        for (name, items) in arrays.object_items.iter().flatten() {
            if let Value::Value(items) = items {
                let items = items
                    .iter()
                    .filter_map(|item| item.as_deref_option())
                    .map(parse_json)
                    .collect::<Result<Vec<_>>>()
                    .with_context(|| format!("in object array property `{name}`"))?;
                body.insert(name.to_string(), Json::Array(items));
            }
        }
        Ok(body)
    }
}

/// Remote property values sorted by attribute
#[derive(Default)]
struct PropertyBuckets<'a> {
    strings: BTreeMap<Cow<'a, str>, ValueString<'a>>,
    numbers: BTreeMap<Cow<'a, str>, Value<f64>>,
    booleans: BTreeMap<Cow<'a, str>, Value<bool>>,
    objects: BTreeMap<Cow<'a, str>, ValueString<'a>>,
    string_items: BTreeMap<Cow<'a, str>, Value<Vec<ValueString<'a>>>>,
    number_items: BTreeMap<Cow<'a, str>, Value<Vec<Value<f64>>>>,
    boolean_items: BTreeMap<Cow<'a, str>, Value<Vec<Value<bool>>>>,
    object_items: BTreeMap<Cow<'a, str>, Value<Vec<ValueString<'a>>>>,
}

impl<'a> PropertyBuckets<'a> {
    /// Store `value` as `kind`, giving it back when it does not fit
    fn insert(
        &mut self,
        prior: &EntityPropertiesState<'a>,
        name: String,
        kind: ValueKind,
        value: Json,
    ) -> Result<(), Json> {
        match (kind, value) {
            (ValueKind::String, Json::String(value)) => {
                self.strings.insert(Cow::Owned(name), Value::Value(Cow::Owned(value)));
            }
            (ValueKind::Number, Json::Number(value)) => {
                let value = value.as_f64().ok_or(Json::Number(value))?;
                self.numbers.insert(Cow::Owned(name), Value::Value(value));
            }
            (ValueKind::Boolean, Json::Bool(value)) => {
                self.booleans.insert(Cow::Owned(name), Value::Value(value));
            }
            (ValueKind::Object, value) => {
                let state = merge_json(&prior_value(&prior.object_props, &name), Some(&value));
                self.objects.insert(Cow::Owned(name), state);
            }
            (ValueKind::Array(item), Json::Array(items)) => match item {
                ItemKind::String => {
                    let items = items
                        .into_iter()
                        .filter_map(|item| match item {
                            Json::String(item) => Some(Value::Value(Cow::Owned(item))),
                            _ => None,
                        })
                        .collect();
                    self.string_items.insert(Cow::Owned(name), Value::Value(items));
                }
                ItemKind::Number => {
                    let items = items.iter().filter_map(Json::as_f64).map(Value::Value).collect();
                    self.number_items.insert(Cow::Owned(name), Value::Value(items));
                }
                ItemKind::Boolean => {
                    let items = items.iter().filter_map(Json::as_bool).map(Value::Value).collect();
                    self.boolean_items.insert(Cow::Owned(name), Value::Value(items));
                }
                ItemKind::Object => {
                    let prior_items = prior
                        .array_props
                        .as_ref_option()
                        .map(|arrays| prior_value(&arrays.object_items, &name))
                        .unwrap_or_default();
                    let prior_items = prior_items.as_ref_option();
                    let items = items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| {
                            let prior = prior_items
                                .and_then(|prior| prior.get(i))
                                .cloned()
                                .unwrap_or_default();
                            merge_json(&prior, Some(item))
                        })
                        .collect();
                    self.object_items.insert(Cow::Owned(name), Value::Value(items));
                }
            },
            (_, value) => return Err(value),
        }
        Ok(())
    }
}

/// Rebuild the property values from the API, `prior` being the prior state
fn properties_from_body<'a>(
    prior: &Value<EntityPropertiesState<'a>>,
    remote: BTreeMap<String, Json>,
    schema: Option<&Blueprint>,
) -> Value<EntityPropertiesState<'a>> {
    let default = EntityPropertiesState::default();
    let prior_props = prior.as_ref_option().unwrap_or(&default);
    let mut buckets = PropertyBuckets::default();

    for (name, value) in remote {
        if value.is_null() {
            continue;
        }
        let known = prior_props.kind_of(&name);
        // Port reports unset array properties as empty lists
        if known.is_none() && value.as_array().is_some_and(Vec::is_empty) {
            continue;
        }
        let kind = known
            .or_else(|| {
                let property = schema?.schema.properties.get(&name)?;
                ValueKind::from_schema(property)
            })
            .or_else(|| ValueKind::from_value(&value));
        let Some(kind) = kind else {
            continue;
        };
        if let Err(value) = buckets.insert(prior_props, name.clone(), kind, value) {
            tracing::warn!("Skipping property `{name}`: {value} is not a valid {kind:?} value");
        }
    }

    let prior_arrays = prior_props.array_props.as_ref_option().cloned().unwrap_or_default();
    let arrays = EntityArrayPropsState {
        string_items: merge_map(&prior_arrays.string_items, buckets.string_items),
        number_items: merge_map(&prior_arrays.number_items, buckets.number_items),
        boolean_items: merge_map(&prior_arrays.boolean_items, buckets.boolean_items),
        object_items: merge_map(&prior_arrays.object_items, buckets.object_items),
    };
    let array_props = if prior_props.array_props.is_null() && arrays == Default::default() {
        Value::Null
    } else {
        Value::Value(arrays)
    };

    let properties = EntityPropertiesState {
        string_props: merge_map(&prior_props.string_props, buckets.strings),
        number_props: merge_map(&prior_props.number_props, buckets.numbers),
        boolean_props: merge_map(&prior_props.boolean_props, buckets.booleans),
        object_props: merge_map(&prior_props.object_props, buckets.objects),
        array_props,
    };
    if prior.is_null() && properties.is_empty() {
        Value::Null
    } else {
        Value::Value(properties)
    }
}

fn relations_from_body<'a>(
    prior: &Value<EntityRelationsState<'a>>,
    remote: BTreeMap<String, Json>,
) -> Value<EntityRelationsState<'a>> {
    let default = EntityRelationsState::default();
    let prior_relations = prior.as_ref_option().unwrap_or(&default);
    let mut single = BTreeMap::new();
    let mut many = BTreeMap::new();

    for (name, value) in remote {
        match value {
            Json::Null => (),
            Json::String(target) => {
                single.insert(Cow::Owned(name), Value::Value(Cow::Owned(target)));
            }
            Json::Array(targets) => {
                if targets.is_empty() && !has_key(&prior_relations.many_relations, &name) {
                    continue;
                }
                let targets = targets
                    .into_iter()
                    .filter_map(|target| match target {
                        Json::String(target) => Some(Value::Value(Cow::Owned(target))),
                        _ => None,
                    })
                    .collect();
                many.insert(Cow::Owned(name), Value::Value(targets));
            }
            value => tracing::warn!("Skipping relation `{name}` with unexpected value {value}"),
        }
    }

    let relations = EntityRelationsState {
        single_relations: merge_map(&prior_relations.single_relations, single),
        many_relations: merge_map(&prior_relations.many_relations, many),
    };
    if prior.is_null() && relations == Default::default() {
        Value::Null
    } else {
        Value::Value(relations)
    }
}

impl<'a> EntityState<'a> {
    fn blueprint_identifier(&self) -> Result<&str> {
        self.blueprint
            .as_deref_option()
            .context("the blueprint of the entity is not known")
    }

    fn api_identifier(&self) -> Result<&str> {
        self.identifier
            .as_deref_option()
            .or(self.id.as_deref_option())
            .context("the entity identifier is not known")
    }

    fn to_body(&self) -> Result<Entity> {
        let properties = match &self.properties {
            Value::Value(properties) => properties.to_body()?,
            _ => Default::default(),
        };

        let mut relations = BTreeMap::new();
        if let Value::Value(state) = &self.relations {
            for (name, target) in state.single_relations.iter().flatten() {
                if let Some(target) = target.as_deref_option() {
                    relations.insert(name.to_string(), Json::from(target));
                }
            }
            for (name, targets) in state.many_relations.iter().flatten() {
                if let Some(targets) = known_string_list(targets) {
                    relations.insert(name.to_string(), Json::from(targets));
                }
            }
        }

        Ok(Entity {
            identifier: known_string(&self.identifier),
            title: known_string(&self.title),
            icon: known_string(&self.icon),
            team: known_string_list(&self.teams),
            properties,
            relations,
            ..Default::default()
        })
    }

    /// Rebuild the state from the API, `self` being the prior state
    fn from_body(&self, remote: Entity, schema: Option<&Blueprint>) -> Self {
        let identifier = match remote.identifier {
            Some(identifier) => Value::Value(Cow::Owned(identifier)),
            None => self.identifier.clone(),
        };
        let blueprint = match remote.blueprint {
            Some(blueprint) => Value::Value(Cow::Owned(blueprint)),
            None => self.blueprint.clone(),
        };
        let teams = remote
            .team
            .map(|teams| teams.into_iter().map(Cow::Owned).collect());

        Self {
            id: identifier.clone(),
            identifier,
            blueprint,
            title: merge_string(&self.title, remote.title.as_deref()),
            icon: merge_string(&self.icon, remote.icon.as_deref()),
            run_id: self.run_id.clone(),
            teams: merge_list(&self.teams, teams),
            properties: properties_from_body(&self.properties, remote.properties, schema),
            relations: relations_from_body(&self.relations, remote.relations),
            created_at: string_value(remote.created_at),
            created_by: string_value(remote.created_by),
            updated_at: string_value(remote.updated_at),
            updated_by: string_value(remote.updated_by),
        }
    }
}

#[async_trait]
impl PortResource for EntityResource {
    const NAME: &'static str = "port_entity";
    type State<'a> = EntityState<'a>;

    fn plan_create(&self, state: &mut Self::State<'_>) {
        state.id = Value::Unknown;
        if state.identifier.is_null() {
            state.identifier = Value::Unknown;
        }
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

        let mut trigger_replace = Vec::new();
        if state.blueprint != prior.blueprint {
            trigger_replace.push(AttributePath::new("blueprint"));
        }
        if !state.identifier.is_null() && state.identifier != prior.identifier {
            trigger_replace.push(AttributePath::new("identifier"));
        }
        if !trigger_replace.is_empty() {
            self.plan_create(state);
        }
        trigger_replace
    }

    async fn create<'a>(
        &self,
        ctx: &ProviderContext,
        planned: Self::State<'a>,
    ) -> Result<Self::State<'a>> {
        let blueprint = planned.blueprint_identifier()?;
        let body = planned.to_body()?;
        tracing::debug!("Creating entity of blueprint {blueprint}");
        let remote = ctx
            .client
            .create_entity(blueprint, &body, planned.run_id.as_deref_option())
            .await?;
        Ok(planned.from_body(remote, None))
    }

    async fn read<'a>(
        &self,
        ctx: &ProviderContext,
        state: Self::State<'a>,
    ) -> Result<Option<Self::State<'a>>> {
        let blueprint = state.blueprint_identifier()?;
        let identifier = state.api_identifier()?;
        let Some(remote) = ctx.client.read_entity(blueprint, identifier).await.found()? else {
            return Ok(None);
        };
        let schema = ctx.client.read_blueprint(blueprint).await.found()?;
        Ok(Some(state.from_body(remote, schema.as_ref())))
    }

    async fn update<'a>(
        &self,
        ctx: &ProviderContext,
        prior: Self::State<'a>,
        planned: Self::State<'a>,
    ) -> Result<Self::State<'a>> {
        let blueprint = prior.blueprint_identifier()?;
        let identifier = prior.api_identifier()?;
        let body = planned.to_body()?;
        let remote = ctx
            .client
            .update_entity(blueprint, identifier, &body, planned.run_id.as_deref_option())
            .await?;
        Ok(planned.from_body(remote, None))
    }

    async fn delete<'a>(&self, ctx: &ProviderContext, state: Self::State<'a>) -> Result<()> {
        let blueprint = state.blueprint_identifier()?;
        let identifier = state.api_identifier()?;
        ctx.client.delete_entity(blueprint, identifier).await.found()?;
        Ok(())
    }

    fn import<'a>(&self, id: &str) -> Result<Self::State<'a>> {
        let Some((blueprint, identifier)) = id
            .split_once(':')
            .filter(|(blueprint, identifier)| !blueprint.is_empty() && !identifier.is_empty())
        else {
            anyhow::bail!("the import id must be `<blueprint>:<entity>`, got `{id}`");
        };
        Ok(EntityState {
            id: Value::Value(Cow::Owned(identifier.to_owned())),
            identifier: Value::Value(Cow::Owned(identifier.to_owned())),
            blueprint: Value::Value(Cow::Owned(blueprint.to_owned())),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;

    use crate::client::test_helpers::{create_test_client, mock_token};

    use super::*;

    fn context(url: &str) -> ProviderContext {
        ProviderContext {
            client: create_test_client(url),
            beta_features_enabled: false,
        }
    }

    #[test]
    fn body_carries_every_kind() {
        let state = EntityState {
            identifier: Value::Value(Cow::Borrowed("svc")),
            blueprint: Value::Value(Cow::Borrowed("microservice")),
            teams: Value::Value(vec![Value::Value(Cow::Borrowed("core"))]),
            properties: Value::Value(EntityPropertiesState {
                string_props: Value::Value(BTreeMap::from([(
                    Cow::Borrowed("language"),
                    Value::Value(Cow::Borrowed("rust")),
                )])),
                number_props: Value::Value(BTreeMap::from([(Cow::Borrowed("replicas"), Value::Value(3.0))])),
                object_props: Value::Value(BTreeMap::from([(
                    Cow::Borrowed("config"),
                    Value::Value(Cow::Borrowed(r#"{"debug": true}"#)),
                )])),
                array_props: Value::Value(EntityArrayPropsState {
                    boolean_items: Value::Value(BTreeMap::from([(
                        Cow::Borrowed("flags"),
                        Value::Value(vec![Value::Value(true), Value::Value(false)]),
                    )])),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            relations: Value::Value(EntityRelationsState {
                single_relations: Value::Value(BTreeMap::from([(
                    Cow::Borrowed("owner"),
                    Value::Value(Cow::Borrowed("team-a")),
                )])),
                many_relations: Value::Value(BTreeMap::from([(
                    Cow::Borrowed("deps"),
                    Value::Value(vec![Value::Value(Cow::Borrowed("db"))]),
                )])),
            }),
            ..Default::default()
        };

        let body = serde_json::to_value(state.to_body().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "identifier": "svc",
                "team": ["core"],
                "properties": {
                    "language": "rust",
                    "replicas": 3,
                    "config": {"debug": true},
                    "flags": [true, false]
                },
                "relations": {"owner": "team-a", "deps": ["db"]}
            })
        );
    }

    #[tokio::test]
    async fn create_without_identifier() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let m = server
            .mock("POST", "/v1/blueprints/microservice/entities")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("upsert".into(), "false".into()),
                Matcher::UrlEncoded("run_id".into(), "r_1".into()),
            ]))
            .match_body(Matcher::Json(json!({
                "title": "Service",
                "properties": {},
                "relations": {}
            })))
            .with_status(201)
            .with_body(
                r#"{"ok": true, "entity": {
                    "identifier": "e_generated",
                    "title": "Service",
                    "blueprint": "microservice",
                    "team": [],
                    "properties": {"language": null, "tags": []},
                    "relations": {"owner": null, "deps": []},
                    "createdAt": "2024-01-01T00:00:00.000Z",
                    "createdBy": "creator",
                    "updatedAt": "2024-01-01T00:00:00.000Z",
                    "updatedBy": "creator"
                }}"#,
            )
            .create_async()
            .await;

        let mut planned = EntityState {
            blueprint: Value::Value(Cow::Borrowed("microservice")),
            title: Value::Value(Cow::Borrowed("Service")),
            run_id: Value::Value(Cow::Borrowed("r_1")),
            ..Default::default()
        };
        EntityResource.plan_create(&mut planned);
        assert!(planned.identifier.is_unknown());

        let state = EntityResource
            .create(&context(&server.url()), planned)
            .await
            .unwrap();
        m.assert_async().await;

        assert_eq!(state.identifier, Value::Value(Cow::Borrowed("e_generated")));
        assert_eq!(state.id, state.identifier);
        assert_eq!(state.run_id, Value::Value(Cow::Borrowed("r_1")));
        assert!(state.teams.is_null());
        assert!(state.properties.is_null());
        assert!(state.relations.is_null());
        assert_eq!(state.created_by, Value::Value(Cow::Borrowed("creator")));
    }

    #[tokio::test]
    async fn read_classifies_values() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _entity = server
            .mock("GET", "/v1/blueprints/microservice/entities/svc")
            .with_status(200)
            .with_body(
                json!({
                    "ok": true,
                    "entity": {
                        "identifier": "svc",
                        "blueprint": "microservice",
                        "properties": {
                            "language": "rust",
                            "replicas": 2,
                            "public": true,
                            "config": {"a": 2, "b": 1},
                            "payload": [1, 2],
                            "ports": [80, 443],
                            "unset": [],
                            "missing": null
                        },
                        "relations": {"owner": "team-a", "deps": ["db", "cache"]}
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _blueprint = server
            .mock("GET", "/v1/blueprints/microservice")
            .with_status(200)
            .with_body(
                json!({
                    "ok": true,
                    "blueprint": {
                        "identifier": "microservice",
                        "schema": {
                            "properties": {
                                "payload": {"type": "object"},
                                "ports": {"type": "array", "items": {"type": "number"}}
                            }
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let prior = EntityResource.import("microservice:svc").unwrap();
        let state = EntityResource
            .read(&context(&server.url()), prior)
            .await
            .unwrap()
            .unwrap();

        let properties = state.properties.as_ref_option().unwrap();
        assert_eq!(
            properties.string_props,
            Value::Value(BTreeMap::from([(Cow::Borrowed("language"), Value::Value(Cow::Borrowed("rust")))]))
        );
        assert_eq!(
            properties.number_props,
            Value::Value(BTreeMap::from([(Cow::Borrowed("replicas"), Value::Value(2.0))]))
        );
        assert_eq!(
            properties.boolean_props,
            Value::Value(BTreeMap::from([(Cow::Borrowed("public"), Value::Value(true))]))
        );
        assert_eq!(
            properties.object_props,
            Value::Value(BTreeMap::from([
                (Cow::Borrowed("config"), Value::Value(Cow::Borrowed(r#"{"a":2,"b":1}"#))),
                (Cow::Borrowed("payload"), Value::Value(Cow::Borrowed("[1,2]"))),
            ]))
        );
        let arrays = properties.array_props.as_ref_option().unwrap();
        assert_eq!(
            arrays.number_items,
            Value::Value(BTreeMap::from([(
                Cow::Borrowed("ports"),
                Value::Value(vec![Value::Value(80.0), Value::Value(443.0)]),
            )]))
        );
        assert!(arrays.string_items.is_null());

        let relations = state.relations.as_ref_option().unwrap();
        assert_eq!(
            relations.single_relations,
            Value::Value(BTreeMap::from([(Cow::Borrowed("owner"), Value::Value(Cow::Borrowed("team-a")))]))
        );
        assert_eq!(
            relations.many_relations,
            Value::Value(BTreeMap::from([(
                Cow::Borrowed("deps"),
                Value::Value(vec![
                    Value::Value(Cow::Borrowed("db")),
                    Value::Value(Cow::Borrowed("cache")),
                ]),
            )]))
        );
    }

    #[tokio::test]
    async fn missing_entity_is_gone() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _m = server
            .mock("GET", "/v1/blueprints/microservice/entities/svc")
            .with_status(404)
            .with_body(r#"{"ok": false, "error": "not_found"}"#)
            .create_async()
            .await;

        let prior = EntityResource.import("microservice:svc").unwrap();
        let state = EntityResource.read(&context(&server.url()), prior).await.unwrap();
        assert!(state.is_none());
    }

    #[test]
    fn prior_kind_wins_over_shape() {
        let prior = Value::Value(EntityPropertiesState {
            array_props: Value::Value(EntityArrayPropsState {
                object_items: Value::Value(BTreeMap::from([(
                    Cow::Borrowed("hooks"),
                    Value::Value(vec![Value::Value(Cow::Borrowed("{ \"url\": \"x\" }"))]),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        });
        let remote = BTreeMap::from([("hooks".to_owned(), json!([{"url": "x"}]))]);

        let properties = properties_from_body(&prior, remote, None);
        assert_eq!(properties, prior);
    }

    #[test]
    fn import_needs_both_identifiers() {
        let state = EntityResource.import("microservice:svc").unwrap();
        assert_eq!(state.blueprint, Value::Value(Cow::Borrowed("microservice")));
        assert_eq!(state.identifier, Value::Value(Cow::Borrowed("svc")));

        assert!(EntityResource.import("svc").is_err());
        assert!(EntityResource.import(":svc").is_err());
    }

    #[test]
    fn blueprint_change_forces_replacement() {
        let prior = EntityResource.import("microservice:svc").unwrap();
        let mut planned = prior.clone();
        planned.blueprint = Value::Value(Cow::Borrowed("service"));
        let replace = EntityResource.plan_update(&prior, &mut planned);
        assert_eq!(replace, vec![AttributePath::new("blueprint")]);
        assert!(planned.id.is_unknown());
        // Identifier given by the configuration is kept
        assert_eq!(planned.identifier, prior.identifier);
    }
}
