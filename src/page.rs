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
use serde::{Deserialize, Serialize};
use tf_provider::value::{Value, ValueString};
use tf_provider::{map, AttributePath, AttributeType, Block, Description, Diagnostics, Schema};

use crate::client::{NotFoundExt, Page};
use crate::resource::{PortResource, ProviderContext};
use crate::utils::{
    computed_attr, known_string, known_string_list, merge, merge_json, merge_list, merge_string,
    optional_attr, parse_json, required_attr, string_value, WithNormalize, WithSchema,
    WithValidate,
};
use crate::validators;

const PAGE_TYPES: &[&str] = &["blueprint-entities", "dashboard", "home", "entity"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub identifier: ValueString<'a>,
    #[serde(rename = "type")]
    pub page_type: ValueString<'a>,
    pub title: ValueString<'a>,
    pub icon: ValueString<'a>,
    pub parent: ValueString<'a>,
    pub after: ValueString<'a>,
    pub section: ValueString<'a>,
    pub blueprint: ValueString<'a>,
    pub show_in_sidebar: Value<bool>,
    pub locked: Value<bool>,
    pub required_query_params: Value<Vec<ValueString<'a>>>,
    /// JSON documents
    pub widgets: Value<Vec<ValueString<'a>>>,
    pub created_at: ValueString<'a>,
    pub created_by: ValueString<'a>,
    pub updated_at: ValueString<'a>,
    pub updated_by: ValueString<'a>,
}

impl<'a> WithSchema for PageState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                description: Description::plain("A page of the Port UI, requires `beta_features_enabled`"),
                attributes: map! {
                    "id" => computed_attr(AttributeType::String, "The identifier of the page"),
                    "identifier" => required_attr(
                        AttributeType::String,
                        "The identifier of the page, changing it recreates the page",
                    ),
                    "type" => required_attr(
                        AttributeType::String,
                        "The type of the page, one of: blueprint-entities, dashboard, home, entity",
                    ),
                    "title" => optional_attr(AttributeType::String, "The display name of the page"),
                    "icon" => optional_attr(AttributeType::String, "The icon of the page"),
                    "parent" => optional_attr(AttributeType::String, "The folder holding the page"),
                    "after" => optional_attr(AttributeType::String, "The page displayed before this one"),
                    "section" => optional_attr(AttributeType::String, "The section of the page"),
                    "blueprint" => optional_attr(AttributeType::String, "The blueprint displayed by the page"),
                    "show_in_sidebar" => optional_attr(AttributeType::Bool, "Whether the page is listed in the sidebar"),
                    "locked" => optional_attr(AttributeType::Bool, "Whether the page is locked"),
                    "required_query_params" => optional_attr(
                        AttributeType::List(AttributeType::String.into()),
                        "The query parameters the page needs",
                    ),
                    "widgets" => optional_attr(
                        AttributeType::List(AttributeType::String.into()),
                        "The widgets of the page, as JSON encoded strings",
                    ),
                    "created_at" => computed_attr(AttributeType::String, "The creation date of the page"),
                    "created_by" => computed_attr(AttributeType::String, "The creator of the page"),
                    "updated_at" => computed_attr(AttributeType::String, "The last update date of the page"),
                    "updated_by" => computed_attr(AttributeType::String, "The last updater of the page"),
                },
                ..Default::default()
            },
        }
    }
}

impl<'a> WithValidate for PageState<'a> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        validators::identifier(diags, attr_path.clone().attribute("identifier"), &self.identifier);
        validators::one_of(diags, attr_path.clone().attribute("type"), &self.page_type, PAGE_TYPES);
        let widgets_path = attr_path.attribute("widgets");
        for (i, widget) in self.widgets.iter().flatten().enumerate() {
            validators::json(diags, widgets_path.clone().index(i as i64), widget);
        }
    }
}

impl<'a> WithNormalize for PageState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics, _config: &Self) {}
}

impl<'a> PageState<'a> {
    fn api_identifier(&self) -> Result<&str> {
        self.identifier
            .as_deref_option()
            .or(self.id.as_deref_option())
            .context("the page identifier is not known")
    }

    fn to_body(&self) -> Result<Page> {
        let widgets = match &self.widgets {
            Value::Value(widgets) => Some(
                widgets
                    .iter()
                    .filter_map(|widget| widget.as_deref_option())
                    .map(parse_json)
                    .collect::<Result<Vec<_>>>()
                    .context("invalid widget")?,
            ),
            _ => None,
        };
        Ok(Page {
            identifier: self.api_identifier()?.to_owned(),
            page_type: self.page_type.as_str().to_owned(),
            title: known_string(&self.title),
            icon: known_string(&self.icon),
            parent: known_string(&self.parent),
            after: known_string(&self.after),
            section: known_string(&self.section),
            blueprint: known_string(&self.blueprint),
            show_in_sidebar: self.show_in_sidebar.as_ref_option().copied(),
            locked: self.locked.as_ref_option().copied(),
            required_query_params: known_string_list(&self.required_query_params),
            widgets,
            ..Default::default()
        })
    }

    /// Rebuild the state from the API, `self` being the prior state
    fn from_body(&self, remote: Page) -> Self {
        let prior_widgets = self.widgets.as_ref_option();
        let widgets = match remote.widgets {
            Some(widgets) if !widgets.is_empty() => Value::Value(
                widgets
                    .iter()
                    .enumerate()
                    .map(|(i, widget)| {
                        let prior = prior_widgets
                            .and_then(|prior| prior.get(i))
                            .cloned()
                            .unwrap_or_default();
                        merge_json(&prior, Some(widget))
                    })
                    .collect(),
            ),
            _ => match prior_widgets {
                Some(prior) if prior.is_empty() => Value::Value(Vec::new()),
                _ => Value::Null,
            },
        };
        let required_query_params = remote
            .required_query_params
            .map(|params| params.into_iter().map(Cow::Owned).collect());

        Self {
            id: Value::Value(Cow::Owned(remote.identifier.clone())),
            identifier: Value::Value(Cow::Owned(remote.identifier)),
            page_type: Value::Value(Cow::Owned(remote.page_type)),
            title: merge_string(&self.title, remote.title.as_deref()),
            icon: merge_string(&self.icon, remote.icon.as_deref()),
            parent: merge_string(&self.parent, remote.parent.as_deref()),
            after: merge_string(&self.after, remote.after.as_deref()),
            section: merge_string(&self.section, remote.section.as_deref()),
            blueprint: merge_string(&self.blueprint, remote.blueprint.as_deref()),
            show_in_sidebar: merge(&self.show_in_sidebar, remote.show_in_sidebar),
            locked: merge(&self.locked, remote.locked),
            required_query_params: merge_list(&self.required_query_params, required_query_params),
            widgets,
            created_at: string_value(remote.created_at),
            created_by: string_value(remote.created_by),
            updated_at: string_value(remote.updated_at),
            updated_by: string_value(remote.updated_by),
        }
    }
}

fn check_beta(ctx: &ProviderContext) -> Result<()> {
    if !ctx.beta_features_enabled {
        anyhow::bail!(
            "Beta features are not enabled: set `beta_features_enabled` in the provider \
             or PORT_BETA_FEATURES_ENABLED=true to manage pages"
        );
    }
    Ok(())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PageResource;

#[async_trait]
impl PortResource for PageResource {
    const NAME: &'static str = "port_page";
    type State<'a> = PageState<'a>;

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
        check_beta(ctx)?;
        let body = planned.to_body()?;
        tracing::debug!("Creating page {}", body.identifier);
        let remote = ctx.client.create_page(&body).await?;
        Ok(planned.from_body(remote))
    }

    async fn read<'a>(
        &self,
        ctx: &ProviderContext,
        state: Self::State<'a>,
    ) -> Result<Option<Self::State<'a>>> {
        let identifier = state.api_identifier()?;
        let Some(remote) = ctx.client.read_page(identifier).await.found()? else {
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
        check_beta(ctx)?;
        let identifier = prior.api_identifier()?;
        let body = planned.to_body()?;
        let remote = ctx.client.update_page(identifier, &body).await?;
        Ok(planned.from_body(remote))
    }

    async fn delete<'a>(&self, ctx: &ProviderContext, state: Self::State<'a>) -> Result<()> {
        let identifier = state.api_identifier()?;
        ctx.client.delete_page(identifier).await.found()?;
        Ok(())
    }

    fn import<'a>(&self, id: &str) -> Result<Self::State<'a>> {
        if id.is_empty() {
            anyhow::bail!("the import id must be the page identifier");
        }
        Ok(PageState {
            id: Value::Value(Cow::Owned(id.to_owned())),
            identifier: Value::Value(Cow::Owned(id.to_owned())),
            ..Default::default()
        })
    }
}
