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

use crate::client::{Action, ActionUserInputs, InvocationMethod, NotFoundExt};
use crate::property::{PropertiesState, PropertyOwner};
use crate::resource::{PortResource, ProviderContext};
use crate::utils::{known_string, merge, merge_string};

use super::state::{ActionState, AzureMethodState, GithubMethodState, WebhookMethodState};

#[derive(Debug, Default, Clone, Copy)]
pub struct ActionResource;

impl<'a> ActionState<'a> {
    fn blueprint_identifier(&self) -> Result<&str> {
        self.blueprint
            .as_deref_option()
            .context("the blueprint of the action is not known")
    }

    fn api_identifier(&self) -> Result<&str> {
        self.identifier
            .as_deref_option()
            .context("the action identifier is not known")
    }

    fn invocation_method(&self) -> Option<InvocationMethod> {
        if !self.kafka_method.is_null() {
            return Some(InvocationMethod::Kafka);
        }
        if let Value::Value(webhook) = &self.webhook_method {
            return Some(InvocationMethod::Webhook {
                url: webhook.url.as_str().to_owned(),
                agent: webhook.agent.as_ref_option().copied(),
            });
        }
        if let Value::Value(github) = &self.github_method {
            return Some(InvocationMethod::Github {
                org: github.org.as_str().to_owned(),
                repo: github.repo.as_str().to_owned(),
                workflow: known_string(&github.workflow),
                omit_payload: github.omit_payload.as_ref_option().copied(),
                omit_user_inputs: github.omit_user_inputs.as_ref_option().copied(),
                report_workflow_status: github.report_workflow_status.as_ref_option().copied(),
            });
        }
        if let Value::Value(azure) = &self.azure_method {
            return Some(InvocationMethod::Azure {
                org: azure.org.as_str().to_owned(),
                webhook: azure.webhook.as_str().to_owned(),
            });
        }
        None
    }

    fn to_body(&self) -> Result<Action> {
        let (properties, required) = match &self.user_properties {
            Value::Value(properties) => properties.to_body()?,
            _ => Default::default(),
        };
        Ok(Action {
            identifier: self.api_identifier()?.to_owned(),
            title: known_string(&self.title),
            icon: known_string(&self.icon),
            description: known_string(&self.description),
            trigger: self.trigger.as_str().to_owned(),
            invocation_method: Some(
                self.invocation_method()
                    .context("the action has no invocation method")?,
            ),
            user_inputs: ActionUserInputs {
                properties,
                required,
            },
            required_approval: self.required_approval.as_ref_option().copied(),
        })
    }

    /// Rebuild the state from the API, `self` being the prior state
    fn from_body(&self, blueprint: &str, remote: Action) -> Self {
        let mut state = Self {
            id: Value::Value(Cow::Owned(format!("{blueprint}:{}", remote.identifier))),
            identifier: Value::Value(Cow::Owned(remote.identifier)),
            blueprint: Value::Value(Cow::Owned(blueprint.to_owned())),
            title: merge_string(&self.title, remote.title.as_deref()),
            icon: merge_string(&self.icon, remote.icon.as_deref()),
            description: merge_string(&self.description, remote.description.as_deref()),
            required_approval: merge(&self.required_approval, remote.required_approval),
            trigger: Value::Value(Cow::Owned(remote.trigger)),
            user_properties: PropertiesState::from_body_value(
                &remote.user_inputs.properties,
                &remote.user_inputs.required,
                &self.user_properties,
                PropertyOwner::Action,
            ),
            ..Default::default()
        };

        match remote.invocation_method {
            Some(InvocationMethod::Kafka) => {
                state.kafka_method = match &self.kafka_method {
                    Value::Value(prior) => Value::Value(prior.clone()),
                    _ => Value::Value(Default::default()),
                };
            }
            Some(InvocationMethod::Webhook { url, agent }) => {
                let prior = self.webhook_method.as_ref_option().cloned().unwrap_or_default();
                state.webhook_method = Value::Value(WebhookMethodState {
                    url: Value::Value(Cow::Owned(url)),
                    agent: merge(&prior.agent, agent),
                });
            }
            Some(InvocationMethod::Github {
                org,
                repo,
                workflow,
                omit_payload,
                omit_user_inputs,
                report_workflow_status,
            }) => {
                let prior = self.github_method.as_ref_option().cloned().unwrap_or_default();
                state.github_method = Value::Value(GithubMethodState {
                    org: Value::Value(Cow::Owned(org)),
                    repo: Value::Value(Cow::Owned(repo)),
                    workflow: merge_string(&prior.workflow, workflow.as_deref()),
                    omit_payload: merge(&prior.omit_payload, omit_payload),
                    omit_user_inputs: merge(&prior.omit_user_inputs, omit_user_inputs),
                    report_workflow_status: merge(&prior.report_workflow_status, report_workflow_status),
                });
            }
            Some(InvocationMethod::Azure { org, webhook }) => {
                state.azure_method = Value::Value(AzureMethodState {
                    org: Value::Value(Cow::Owned(org)),
                    webhook: Value::Value(Cow::Owned(webhook)),
                });
            }
            None => tracing::warn!("Action {blueprint}:{} has no invocation method", state.identifier.as_str()),
        }
        state
    }
}

#[async_trait]
impl PortResource for ActionResource {
    const NAME: &'static str = "port_action";
    type State<'a> = ActionState<'a>;

    fn plan_create(&self, state: &mut Self::State<'_>) {
        state.id = match (state.blueprint.as_deref_option(), state.identifier.as_deref_option()) {
            (Some(blueprint), Some(identifier)) => {
                Value::Value(Cow::Owned(format!("{blueprint}:{identifier}")))
            }
            _ => Value::Unknown,
        };
    }

    fn plan_update<'a>(
        &self,
        prior: &Self::State<'a>,
        state: &mut Self::State<'a>,
    ) -> Vec<AttributePath> {
        let mut trigger_replace = Vec::new();
        if state.blueprint != prior.blueprint {
            trigger_replace.push(AttributePath::new("blueprint"));
        }
        if state.identifier != prior.identifier {
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
        tracing::debug!("Creating action {blueprint}:{}", body.identifier);
        let remote = ctx.client.create_action(blueprint, &body).await?;
        Ok(planned.from_body(blueprint, remote))
    }

    async fn read<'a>(
        &self,
        ctx: &ProviderContext,
        state: Self::State<'a>,
    ) -> Result<Option<Self::State<'a>>> {
        let blueprint = state.blueprint_identifier()?;
        let identifier = state.api_identifier()?;
        let Some(remote) = ctx.client.read_action(blueprint, identifier).await.found()? else {
            return Ok(None);
        };
        Ok(Some(state.from_body(blueprint, remote)))
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
        let remote = ctx.client.update_action(blueprint, identifier, &body).await?;
        Ok(planned.from_body(blueprint, remote))
    }

    async fn delete<'a>(&self, ctx: &ProviderContext, state: Self::State<'a>) -> Result<()> {
        let blueprint = state.blueprint_identifier()?;
        let identifier = state.api_identifier()?;
        ctx.client.delete_action(blueprint, identifier).await.found()?;
        Ok(())
    }

    fn import<'a>(&self, id: &str) -> Result<Self::State<'a>> {
        let Some((blueprint, identifier)) = id
            .split_once(':')
            .filter(|(blueprint, identifier)| !blueprint.is_empty() && !identifier.is_empty())
        else {
            anyhow::bail!("the import id must be `<blueprint>:<action>`, got `{id}`");
        };
        Ok(ActionState {
            id: Value::Value(Cow::Owned(id.to_owned())),
            identifier: Value::Value(Cow::Owned(identifier.to_owned())),
            blueprint: Value::Value(Cow::Owned(blueprint.to_owned())),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use mockito::{Matcher, Server};
    use serde_json::json;
    use tf_provider::Diagnostics;

    use crate::client::test_helpers::{create_test_client, mock_token};
    use crate::property::StringProp;
    use crate::utils::WithNormalize;

    use super::*;

    fn context(url: &str) -> ProviderContext {
        ProviderContext {
            client: create_test_client(url),
            beta_features_enabled: false,
        }
    }

    fn planned() -> ActionState<'static> {
        let mut state = ActionState {
            identifier: Value::Value(Cow::Borrowed("deploy")),
            blueprint: Value::Value(Cow::Borrowed("microservice")),
            title: Value::Value(Cow::Borrowed("Deploy")),
            trigger: Value::Value(Cow::Borrowed("DAY-2")),
            github_method: Value::Value(GithubMethodState {
                org: Value::Value(Cow::Borrowed("acme")),
                repo: Value::Value(Cow::Borrowed("infra")),
                workflow: Value::Value(Cow::Borrowed("deploy.yml")),
                ..Default::default()
            }),
            user_properties: Value::Value(PropertiesState {
                string_props: Value::Value(BTreeMap::from([(
                    Cow::Borrowed("environment"),
                    Value::Value(StringProp {
                        title: Value::Value(Cow::Borrowed("Environment")),
                        ..Default::default()
                    }),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        };
        let config = state.clone();
        state.normalize(&mut Diagnostics::default(), &config);
        ActionResource.plan_create(&mut state);
        state
    }

    #[tokio::test]
    async fn create_github_action() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let m = server
            .mock("POST", "/v1/blueprints/microservice/actions")
            .match_body(Matcher::Json(json!({
                "identifier": "deploy",
                "title": "Deploy",
                "trigger": "DAY-2",
                "invocationMethod": {
                    "type": "GITHUB",
                    "org": "acme",
                    "repo": "infra",
                    "workflow": "deploy.yml"
                },
                "userInputs": {
                    "properties": {"environment": {"type": "string", "title": "Environment"}},
                    "required": []
                }
            })))
            .with_status(200)
            .with_body(
                json!({
                    "ok": true,
                    "action": {
                        "identifier": "deploy",
                        "title": "Deploy",
                        "trigger": "DAY-2",
                        "invocationMethod": {
                            "type": "GITHUB",
                            "org": "acme",
                            "repo": "infra",
                            "workflow": "deploy.yml",
                            "omitPayload": false,
                            "omitUserInputs": false,
                            "reportWorkflowStatus": true
                        },
                        "userInputs": {
                            "properties": {"environment": {"type": "string", "title": "Environment"}},
                            "required": []
                        },
                        "requiredApproval": false
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let planned = planned();
        assert_eq!(planned.id, Value::Value(Cow::Borrowed("microservice:deploy")));

        let state = ActionResource
            .create(&context(&server.url()), planned.clone())
            .await
            .unwrap();
        m.assert_async().await;

        assert_eq!(state.id, planned.id);
        assert_eq!(state.user_properties, planned.user_properties);
        assert!(state.required_approval.is_null());
        let github = state.github_method.as_ref_option().unwrap();
        assert!(github.omit_payload.is_null());
        assert_eq!(github.report_workflow_status, Value::Value(true));
        assert!(state.kafka_method.is_null());
    }

    #[tokio::test]
    async fn read_kafka_action() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _m = server
            .mock("GET", "/v1/blueprints/microservice/actions/restart")
            .with_status(200)
            .with_body(
                r#"{"ok": true, "action": {
                    "identifier": "restart",
                    "title": "Restart",
                    "trigger": "DAY-2",
                    "invocationMethod": {"type": "KAFKA"},
                    "userInputs": {
                        "properties": {"force": {"type": "boolean"}},
                        "required": ["force"]
                    }
                }}"#,
            )
            .create_async()
            .await;

        let prior = ActionResource.import("microservice:restart").unwrap();
        let state = ActionResource
            .read(&context(&server.url()), prior)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(state.id, Value::Value(Cow::Borrowed("microservice:restart")));
        assert_eq!(state.kafka_method, Value::Value(BTreeMap::new()));
        let properties = state.user_properties.as_ref_option().unwrap();
        let force = properties.boolean_props.as_ref_option().unwrap()["force"]
            .as_ref_option()
            .unwrap();
        assert_eq!(force.required, Value::Value(true));
    }

    #[tokio::test]
    async fn missing_action_is_gone() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _m = server
            .mock("GET", "/v1/blueprints/microservice/actions/deploy")
            .with_status(404)
            .create_async()
            .await;

        let prior = ActionResource.import("microservice:deploy").unwrap();
        let state = ActionResource.read(&context(&server.url()), prior).await.unwrap();
        assert!(state.is_none());
    }

    #[test]
    fn import_needs_both_identifiers() {
        assert!(ActionResource.import("deploy").is_err());
        assert!(ActionResource.import("microservice:").is_err());
    }

    #[tokio::test]
    async fn removed_required_reverts_to_false() {
        use tf_provider::Resource;

        use crate::resource::PortResourceAdapter;

        let with_required = |required| {
            let mut state = planned();
            if let Value::Value(properties) = &mut state.user_properties {
                if let Value::Value(props) = &mut properties.string_props {
                    if let Some(Value::Value(prop)) = props.get_mut("environment") {
                        prop.required = required;
                    }
                }
            }
            state
        };
        let prior = with_required(Value::Value(true));
        // Terraform proposes the prior value when the configuration drops it
        let proposed = with_required(Value::Value(true));
        let config = with_required(Value::Null);

        let adapter = PortResourceAdapter::new(ActionResource, Default::default());
        let mut diags = Diagnostics::default();
        let (planned, _, replace) = adapter
            .plan_update(
                &mut diags,
                Value::Value(prior),
                Value::Value(proposed),
                Value::Value(config),
                Default::default(),
                Default::default(),
            )
            .await
            .unwrap();

        assert!(replace.is_empty());
        let planned = planned.as_ref_option().unwrap();
        let properties = planned.user_properties.as_ref_option().unwrap();
        let prop = properties.string_props.as_ref_option().unwrap()["environment"]
            .as_ref_option()
            .unwrap();
        assert_eq!(prop.required, Value::Value(false));
    }
}
