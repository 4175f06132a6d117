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

use std::fmt::Debug;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{schema::Schema, AttributePath, Diagnostics, Resource};

use crate::client::PortClient;
use crate::utils::{WithNormalize, WithSchema, WithValidate};

/// Everything a resource needs once the provider is configured
#[derive(Debug, Clone)]
pub(crate) struct ProviderContext {
    pub client: PortClient,
    pub beta_features_enabled: bool,
}

/// Filled by `configure`, shared by every resource of the provider
pub(crate) type ContextSlot = Arc<RwLock<Option<ProviderContext>>>;

/// A Port object managed through the REST API
#[async_trait]
pub(crate) trait PortResource: Send + Sync + 'static {
    /// Terraform type name, used in logs and diagnostics
    const NAME: &'static str;

    type State<'a>: Serialize
        + Deserialize<'a>
        + Clone
        + Debug
        + PartialEq
        + Default
        + Send
        + Sync
        + WithSchema
        + WithValidate
        + WithNormalize;

    /// Mark the computed attributes of a new object unknown
    fn plan_create(&self, state: &mut Self::State<'_>);

    /// Mark the computed attributes affected by the update unknown,
    /// and return the attributes forcing a replacement
    fn plan_update<'a>(
        &self,
        prior: &Self::State<'a>,
        state: &mut Self::State<'a>,
    ) -> Vec<AttributePath>;

    async fn create<'a>(
        &self,
        ctx: &ProviderContext,
        planned: Self::State<'a>,
    ) -> Result<Self::State<'a>>;

    /// `None` when the object does not exist anymore
    async fn read<'a>(
        &self,
        ctx: &ProviderContext,
        state: Self::State<'a>,
    ) -> Result<Option<Self::State<'a>>>;

    async fn update<'a>(
        &self,
        ctx: &ProviderContext,
        prior: Self::State<'a>,
        planned: Self::State<'a>,
    ) -> Result<Self::State<'a>>;

    async fn delete<'a>(&self, ctx: &ProviderContext, state: Self::State<'a>) -> Result<()>;

    /// Build the state identifying the object, the rest is filled by `read`
    fn import<'a>(&self, id: &str) -> Result<Self::State<'a>>;
}

#[derive(Debug)]
pub(crate) struct PortResourceAdapter<R: PortResource> {
    resource: R,
    context: ContextSlot,
}

impl<R: PortResource> PortResourceAdapter<R> {
    pub fn new(resource: R, context: ContextSlot) -> Self {
        Self { resource, context }
    }

    fn context(&self, diags: &mut Diagnostics) -> Option<ProviderContext> {
        let Ok(context) = self.context.read() else {
            diags.root_error(
                "Provider state is corrupted",
                "A previous operation panicked while configuring the provider.",
            );
            return None;
        };
        match context.as_ref() {
            Some(context) => Some(context.clone()),
            None => {
                diags.root_error(
                    "Provider is not configured",
                    format!(
                        "`{}` cannot reach the Port API before the provider has been configured.",
                        R::NAME
                    ),
                );
                None
            }
        }
    }
}

fn report<T>(diags: &mut Diagnostics, summary: String, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::error!("{summary}: {err:#}");
            diags.root_error(summary, format!("{err:#}"));
            None
        }
    }
}

#[async_trait]
impl<R: PortResource> Resource for PortResourceAdapter<R> {
    type State<'a> = Value<R::State<'a>>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(<R::State<'static> as WithSchema>::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        config.validate(diags, Default::default());

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let current = match state {
            Value::Value(current) => current,
            state => return Some((state, private_state)),
        };
        let ctx = self.context(diags)?;

        let result = self.resource.read(&ctx, current).await;
        match report(diags, format!("Failed to read {}", R::NAME), result)? {
            Some(state) => Some((Value::Value(state), private_state)),
            None => {
                tracing::warn!("{} no longer exists, removing it from the state", R::NAME);
                Some((Value::Null, private_state))
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        if let Value::Value(state) = &mut state {
            let config = match config_state {
                Value::Value(config) => config,
                _ => state.clone(),
            };
            state.normalize(diags, &config);
            self.resource.plan_create(state);
        }

        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(
        Self::State<'a>,
        Self::PrivateState<'a>,
        Vec<tf_provider::AttributePath>,
    )> {
        let mut state = proposed_state;
        let mut trigger_replace = Vec::new();
        if let (Value::Value(prior), Value::Value(planned)) = (&prior_state, &mut state) {
            let config = match config_state {
                Value::Value(config) => config,
                _ => planned.clone(),
            };
            planned.normalize(diags, &config);
            trigger_replace = self.resource.plan_update(prior, planned);
        }

        Some((state, prior_private_state, trigger_replace))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        _prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        Some(())
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let Value::Value(planned) = planned_state else {
            diags.root_error(
                format!("Cannot create {}", R::NAME),
                "The planned state is empty.",
            );
            return None;
        };
        let ctx = self.context(diags)?;

        let result = self.resource.create(&ctx, planned).await;
        let state = report(diags, format!("Failed to create {}", R::NAME), result)?;
        tracing::info!("Created {}", R::NAME);

        Some((Value::Value(state), private_state))
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let (Value::Value(prior), Value::Value(planned)) = (prior_state, planned_state) else {
            diags.root_error(
                format!("Cannot update {}", R::NAME),
                "The prior or planned state is empty.",
            );
            return None;
        };
        let ctx = self.context(diags)?;

        let result = self.resource.update(&ctx, prior, planned).await;
        let state = report(diags, format!("Failed to update {}", R::NAME), result)?;
        tracing::info!("Updated {}", R::NAME);

        Some((Value::Value(state), private_state))
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let Value::Value(state) = state else {
            return Some(());
        };
        let ctx = self.context(diags)?;

        let result = self.resource.delete(&ctx, state).await;
        report(diags, format!("Failed to delete {}", R::NAME), result)?;
        tracing::info!("Deleted {}", R::NAME);

        Some(())
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let result = self.resource.import(&id);
        let state = report(diags, format!("Failed to import {} `{id}`", R::NAME), result)?;

        Some((Value::Value(state), Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tf_provider::{Block, Description};

    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct DummyState {
        id: Value<String>,
    }

    impl WithSchema for DummyState {
        fn schema() -> Schema {
            Schema {
                version: 1,
                block: Block {
                    description: Description::plain("dummy"),
                    attributes: HashMap::new(),
                    ..Default::default()
                },
            }
        }
    }

    impl WithValidate for DummyState {
        fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
            if self.id.as_ref_option().map(String::as_str) == Some("invalid") {
                diags.error_short("invalid id", attr_path.attribute("id"));
            }
        }
    }

    impl WithNormalize for DummyState {
        fn normalize(&mut self, _diags: &mut Diagnostics, _config: &Self) {}
    }

    #[derive(Debug, Default)]
    struct Dummy;

    #[async_trait]
    impl PortResource for Dummy {
        const NAME: &'static str = "port_dummy";
        type State<'a> = DummyState;

        fn plan_create(&self, state: &mut Self::State<'_>) {
            state.id = Value::Unknown;
        }

        fn plan_update<'a>(
            &self,
            _prior: &Self::State<'a>,
            _state: &mut Self::State<'a>,
        ) -> Vec<AttributePath> {
            Vec::new()
        }

        async fn create<'a>(
            &self,
            _ctx: &ProviderContext,
            _planned: Self::State<'a>,
        ) -> Result<Self::State<'a>> {
            Ok(DummyState {
                id: Value::Value("created".to_owned()),
            })
        }

        async fn read<'a>(
            &self,
            _ctx: &ProviderContext,
            state: Self::State<'a>,
        ) -> Result<Option<Self::State<'a>>> {
            Ok((state.id.as_ref_option().map(String::as_str) != Some("gone")).then_some(state))
        }

        async fn update<'a>(
            &self,
            _ctx: &ProviderContext,
            _prior: Self::State<'a>,
            planned: Self::State<'a>,
        ) -> Result<Self::State<'a>> {
            Ok(planned)
        }

        async fn delete<'a>(&self, _ctx: &ProviderContext, _state: Self::State<'a>) -> Result<()> {
            anyhow::bail!("cannot delete")
        }

        fn import<'a>(&self, id: &str) -> Result<Self::State<'a>> {
            Ok(DummyState {
                id: Value::Value(id.to_owned()),
            })
        }
    }

    fn configured() -> PortResourceAdapter<Dummy> {
        let client = PortClient::new("http://localhost", "id", "secret").unwrap();
        let slot = Arc::new(RwLock::new(Some(ProviderContext {
            client,
            beta_features_enabled: false,
        })));
        PortResourceAdapter::new(Dummy, slot)
    }

    #[tokio::test]
    async fn unconfigured_provider_is_reported() {
        let adapter = PortResourceAdapter::new(Dummy, Default::default());
        let mut diags = Diagnostics::default();
        let result = adapter
            .create(
                &mut diags,
                Value::Value(DummyState::default()),
                Value::Value(DummyState::default()),
                Default::default(),
                Default::default(),
            )
            .await;
        assert!(result.is_none());
        assert_eq!(diags.errors.len(), 1);
        assert_eq!(diags.errors[0].summary, "Provider is not configured");
    }

    #[tokio::test]
    async fn missing_object_is_removed_from_state() {
        let adapter = configured();
        let mut diags = Diagnostics::default();
        let state = Value::Value(DummyState {
            id: Value::Value("gone".to_owned()),
        });
        let (state, _) = adapter
            .read(&mut diags, state, Default::default(), Default::default())
            .await
            .unwrap();
        assert!(state.is_null());
        assert!(diags.errors.is_empty());
    }

    #[tokio::test]
    async fn failures_become_diagnostics() {
        let adapter = configured();
        let mut diags = Diagnostics::default();
        let state = Value::Value(DummyState::default());
        let result = adapter
            .destroy(&mut diags, state, Default::default())
            .await;
        assert!(result.is_none());
        assert_eq!(diags.errors[0].summary, "Failed to delete port_dummy");
    }

    #[tokio::test]
    async fn plan_and_validate_are_delegated() {
        let adapter = configured();
        let mut diags = Diagnostics::default();
        let (planned, _) = adapter
            .plan_create(
                &mut diags,
                Value::Value(DummyState::default()),
                Value::Value(DummyState::default()),
                Default::default(),
            )
            .await
            .unwrap();
        assert_eq!(planned.as_ref_option().unwrap().id, Value::Unknown);

        let destroy = adapter
            .plan_destroy(&mut diags, planned, Default::default(), Default::default())
            .await;
        assert_eq!(destroy, Some(()));

        let invalid = Value::Value(DummyState {
            id: Value::Value("invalid".to_owned()),
        });
        assert!(adapter.validate(&mut diags, invalid).await.is_none());

        let (imported, _) = adapter.import(&mut diags, "some-id".to_owned()).await.unwrap();
        assert_eq!(
            imported.as_ref_option().unwrap().id,
            Value::Value("some-id".to_owned())
        );
    }
}
