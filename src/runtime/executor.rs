//! Flow Executor - stage-ordered interpretation of a flow definition
//!
//! One `execute` call walks the flow's stages in ascending order. Stage 0
//! and single-item stages run sequentially on the calling task; larger
//! stages fan out onto a JoinSet and the stage barrier joins every task
//! before the next stage reads the namespace. Parallel items in one stage
//! must claim distinct keys; the engine does not guard same-key races.
//!
//! Failure policy: required-missing-data and configuration errors abort the
//! flow; external-call failures are embedded into the result payload so a
//! partial answer can still be synthesized.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use super::output::{is_empty_result, parse_model_output, unwrap_single};
use crate::ast::{FlowDefinition, FlowItem, KnowledgeItem, KnowledgeKind};
use crate::binding::{bind, Skeleton};
use crate::context::ExecutionContext;
use crate::dispatch::{DispatchRegistry, KnowledgeCatalog, StepDispatch};
use crate::error::{Result, WeftError};
use crate::provider::{ChatPrompt, ModelFactory};
use crate::template;
use crate::util::{NO_DATA_PLACEHOLDER, UNABLE_TO_PROCESS};

/// Interprets flow definitions against a shared namespace.
///
/// Cheap to clone: all state is behind `Arc`.
#[derive(Clone)]
pub struct FlowExecutor {
    catalog: Arc<dyn KnowledgeCatalog>,
    registry: Arc<DispatchRegistry>,
    models: Arc<ModelFactory>,
}

impl FlowExecutor {
    /// Build an executor and register the nested-flow dispatcher, so a
    /// `flow`-kind knowledge item recurses into this executor.
    pub fn new(
        catalog: Arc<dyn KnowledgeCatalog>,
        registry: Arc<DispatchRegistry>,
        models: Arc<ModelFactory>,
    ) -> Arc<Self> {
        let executor = Arc::new(Self {
            catalog,
            registry,
            models,
        });
        executor.registry.register(
            KnowledgeKind::Flow,
            Arc::new(FlowDispatch {
                executor: (*executor).clone(),
            }),
        );
        executor
    }

    /// Run the flow carried by `ctx.knowledge` to completion.
    ///
    /// Returns the synthesized answer, the configured final namespace
    /// entry, or the full namespace snapshot.
    #[instrument(skip(self, ctx), fields(invocation = %ctx.invocation_id, flow = %ctx.knowledge.name))]
    pub async fn execute(&self, ctx: &ExecutionContext) -> Result<Value> {
        let def = FlowDefinition::parse(&ctx.knowledge.body)?;
        debug!(items = def.items.len(), "flow parsed");

        for (order, items) in def.stages() {
            if ctx.cancellation.is_cancelled() {
                return Err(WeftError::Cancelled { order });
            }

            // Order 0 holds order-sensitive setup and always runs
            // sequentially; so does any single-item stage.
            if order == 0 || items.len() == 1 {
                for item in items {
                    self.run_item(item, ctx).await?;
                }
            } else {
                self.run_stage_parallel(&items, ctx).await?;
            }
            debug!(order, "stage drained");
        }

        self.finalize(&def, ctx).await
    }

    /// Fan a stage out onto a JoinSet and join every item before returning.
    async fn run_stage_parallel(&self, items: &[&FlowItem], ctx: &ExecutionContext) -> Result<()> {
        let mut set = JoinSet::new();
        for (idx, item) in items.iter().enumerate() {
            let executor = self.clone();
            let ctx = ctx.clone();
            let item = (*item).clone();
            set.spawn(async move { (idx, executor.run_item(&item, &ctx).await) });
        }

        let mut outcomes: Vec<(usize, Result<()>)> = Vec::with_capacity(items.len());
        while let Some(joined) = set.join_next().await {
            let outcome = joined.map_err(|e| {
                WeftError::Execution(format!("stage task panicked or was aborted: {e}"))
            })?;
            outcomes.push(outcome);
        }

        // Report failures in declaration order, not completion order
        outcomes.sort_by_key(|(idx, _)| *idx);
        for (_, outcome) in outcomes {
            outcome?;
        }
        Ok(())
    }

    /// Execute one flow item: resolve its knowledge item and input, bind,
    /// dispatch, store the result, then post-process.
    #[instrument(skip(self, ctx), fields(item = %item.key, name = %item.name))]
    async fn run_item(&self, item: &FlowItem, ctx: &ExecutionContext) -> Result<()> {
        let Some(knowledge) = self.catalog.lookup(&item.name) else {
            if item.strict {
                return Err(WeftError::KnowledgeNotFound {
                    name: item.name.clone(),
                    key: item.key.clone(),
                });
            }
            warn!("knowledge item not found, skipping");
            return Ok(());
        };

        let input: Value = match &item.source {
            Some(source) => match ctx.namespace.get(source) {
                Some(value) => (*value).clone(),
                None => {
                    debug!(source = %source, "source entry absent, skipping item");
                    return Ok(());
                }
            },
            // No declared source: feed the initiating payload
            None => ctx.input().map(|v| (*v).clone()).unwrap_or(Value::Null),
        };

        // A template with no fillable leaves would just replace the payload
        // with its own literals; skip binding entirely in that case.
        let skeleton = knowledge
            .params_template
            .as_ref()
            .map(Skeleton::parse)
            .filter(Skeleton::has_typed_leaves);

        let raw = if item.is_array {
            self.run_iterable(item, &knowledge, skeleton.as_ref(), input, ctx)
                .await?
        } else {
            self.invoke_once(&knowledge, skeleton.as_ref(), input, ctx)
                .await?
        };

        if is_empty_result(&raw) {
            if item.required {
                return Err(WeftError::RequiredDataMissing {
                    key: item.key.clone(),
                });
            }
            debug!("empty result on optional item, storing placeholder");
            let mut placeholder = Map::new();
            placeholder.insert(
                item.key.clone(),
                Value::String(NO_DATA_PLACEHOLDER.to_string()),
            );
            ctx.namespace.insert(&item.key, Value::Object(placeholder));
            return Ok(());
        }

        ctx.namespace.insert(&item.key, raw);

        if let Some(prompt) = item.post_prompt() {
            self.post_process(item, prompt, ctx).await?;
        }
        Ok(())
    }

    /// Invoke once per input element, aggregating by loop key into an
    /// object or by position into an array.
    async fn run_iterable(
        &self,
        item: &FlowItem,
        knowledge: &Arc<KnowledgeItem>,
        skeleton: Option<&Skeleton>,
        input: Value,
        ctx: &ExecutionContext,
    ) -> Result<Value> {
        // Scalar input degrades to a single invocation
        let elements = match input {
            Value::Array(elements) => elements,
            scalar => return self.invoke_once(knowledge, skeleton, scalar, ctx).await,
        };

        if let Some(loop_key) = &item.loop_key {
            let mut aggregated = Map::new();
            for (idx, element) in elements.iter().enumerate() {
                let result_key = match element.get(loop_key) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => idx.to_string(),
                };
                let out = self
                    .invoke_once(knowledge, skeleton, element.clone(), ctx)
                    .await?;
                aggregated.insert(result_key, unwrap_single(out));
            }
            Ok(Value::Object(aggregated))
        } else {
            let mut collected = Vec::with_capacity(elements.len());
            for element in elements {
                let out = self.invoke_once(knowledge, skeleton, element, ctx).await?;
                collected.push(unwrap_single(out));
            }
            Ok(Value::Array(collected))
        }
    }

    /// One dispatch call. External-call failures become an error payload
    /// embedded in the result array; everything else propagates.
    async fn invoke_once(
        &self,
        knowledge: &Arc<KnowledgeItem>,
        skeleton: Option<&Skeleton>,
        input: Value,
        ctx: &ExecutionContext,
    ) -> Result<Value> {
        let payload = match skeleton {
            Some(sk) => bind(sk, &input),
            None => input,
        };

        let dispatch = self.registry.get(knowledge.kind)?;
        let step_ctx = ctx.child(Arc::clone(knowledge), payload);

        match dispatch.invoke(&step_ctx.knowledge, &step_ctx).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(name = %knowledge.name, error = %e, "step dispatch failed, embedding error payload");
                Ok(json!([{ "error": e.to_string() }]))
            }
        }
    }

    /// Refine a freshly stored result through the item's prompt.
    async fn post_process(
        &self,
        item: &FlowItem,
        prompt: &str,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        let resolved = template::resolve(prompt, &ctx.namespace);
        if template::is_all_no_data(&resolved) {
            debug!("post prompt resolved to no data, skipping model call");
            return Ok(());
        }

        let model = self.models.get(self.models.default_provider())?;
        let model_name = self.models.model_for(ctx.metadata.model.as_deref());
        let chat = ChatPrompt::new(None, resolved.into_owned());

        match model.complete(&chat, &model_name).await {
            Ok(text) => {
                ctx.namespace.insert(&item.key, parse_model_output(&text));
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "post-processing model call failed, keeping raw result");
            }
        }
        Ok(())
    }

    /// Produce the flow's response once every stage has drained.
    async fn finalize(&self, def: &FlowDefinition, ctx: &ExecutionContext) -> Result<Value> {
        if let Some(system) = &def.system_prompt {
            let system = template::resolve(system, &ctx.namespace).into_owned();
            let user = if let Some(card) = &def.card_prompt {
                template::resolve(card, &ctx.namespace).into_owned()
            } else if let Some(user) = &def.user_prompt {
                template::resolve(user, &ctx.namespace).into_owned()
            } else {
                ctx.query.clone()
            };

            if template::is_all_no_data(&system) && template::is_all_no_data(&user) {
                debug!("both final prompts resolved to no data, skipping model call");
                return Ok(Value::String(UNABLE_TO_PROCESS.to_string()));
            }

            let model = self.models.get(self.models.default_provider())?;
            let model_name = self.models.model_for(ctx.metadata.model.as_deref());
            let mut chat = ChatPrompt::new(Some(system), user);
            chat.history = ctx.history.clone();

            let text = model.complete(&chat, &model_name).await?;
            return Ok(parse_model_output(&text));
        }

        if let Some(final_key) = def.final_key.as_deref().filter(|k| !k.is_empty()) {
            return Ok(ctx
                .namespace
                .get(final_key)
                .map(|v| (*v).clone())
                .unwrap_or(Value::Null));
        }

        Ok(ctx.namespace.snapshot())
    }
}

/// Nested-flow dispatcher: a `flow`-kind knowledge item runs through the
/// executor itself, satisfying the same dispatch interface as any step.
struct FlowDispatch {
    executor: FlowExecutor,
}

#[async_trait]
impl StepDispatch for FlowDispatch {
    async fn invoke(&self, _item: &KnowledgeItem, ctx: &ExecutionContext) -> Result<Value> {
        let response = self.executor.execute(ctx).await?;
        // Dispatchers return arrays by convention
        Ok(match response {
            Value::Array(_) => response,
            other => json!([other]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeftConfig;
    use crate::dispatch::InMemoryCatalog;
    use crate::provider::MockModel;
    use std::sync::Mutex;

    // ═══════════════════════════════════════════
    // Test harness
    // ═══════════════════════════════════════════

    /// Answers by knowledge-item name from a fixed table, recording the
    /// order of invocations.
    struct TableDispatch {
        responses: Map<String, Value>,
        seen: Mutex<Vec<String>>,
    }

    impl TableDispatch {
        fn new(responses: Value) -> Self {
            Self {
                responses: responses.as_object().expect("object table").clone(),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StepDispatch for TableDispatch {
        async fn invoke(&self, item: &KnowledgeItem, ctx: &ExecutionContext) -> Result<Value> {
            self.seen.lock().unwrap().push(item.name.clone());
            match self.responses.get(&item.name) {
                Some(Value::String(s)) if s == "!fail" => Err(WeftError::DispatchFailed {
                    name: item.name.clone(),
                    reason: "scripted failure".into(),
                }),
                Some(Value::String(s)) if s == "!echo" => Ok(json!([ctx.variables.clone()])),
                Some(response) => Ok(response.clone()),
                None => Ok(json!([])),
            }
        }
    }

    fn harness(
        responses: Value,
        script: Vec<&str>,
    ) -> (Arc<FlowExecutor>, Arc<InMemoryCatalog>, Arc<TableDispatch>, Arc<MockModel>) {
        let catalog = Arc::new(InMemoryCatalog::new());
        let registry = Arc::new(DispatchRegistry::new());
        let dispatch = Arc::new(TableDispatch::new(responses));
        registry.register(KnowledgeKind::Rest, Arc::clone(&dispatch) as Arc<dyn StepDispatch>);

        let mock = Arc::new(MockModel::new(
            script.into_iter().map(str::to_string).collect(),
        ));
        let models = Arc::new(ModelFactory::new(WeftConfig::default()));
        models.register("openai", Arc::clone(&mock) as Arc<dyn crate::provider::LanguageModel>);

        let executor = FlowExecutor::new(
            Arc::clone(&catalog) as Arc<dyn KnowledgeCatalog>,
            registry,
            models,
        );
        (executor, catalog, dispatch, mock)
    }

    fn rest_item(catalog: &InMemoryCatalog, name: &str) {
        catalog.insert(KnowledgeItem::new(name, KnowledgeKind::Rest, ""));
    }

    fn flow_ctx(body: &str, variables: Value) -> ExecutionContext {
        let item = KnowledgeItem::new("main", KnowledgeKind::Flow, body);
        ExecutionContext::new("what is the plan?", variables, Arc::new(item))
    }

    // ═══════════════════════════════════════════
    // Namespace and final-key paths
    // ═══════════════════════════════════════════

    #[tokio::test]
    async fn snapshot_returned_without_prompts() {
        let (executor, catalog, _, _) =
            harness(json!({"get_weather": [{"temp": 21}]}), vec![]);
        rest_item(&catalog, "get_weather");

        let ctx = flow_ctx(
            r#"{"Flow": [{"Name": "get_weather", "Key": "weather"}]}"#,
            json!({"city": "Nice"}),
        );
        let out = executor.execute(&ctx).await.unwrap();

        assert_eq!(out["input"], json!({"city": "Nice"}));
        assert_eq!(out["weather"], json!([{"temp": 21}]));
    }

    #[tokio::test]
    async fn final_key_returned_verbatim() {
        let (executor, catalog, _, _) =
            harness(json!({"get_weather": [{"temp": 21}]}), vec![]);
        rest_item(&catalog, "get_weather");

        let ctx = flow_ctx(
            r#"{"Flow": [{"Name": "get_weather", "Key": "weather"}], "Result": "weather"}"#,
            json!({}),
        );
        let out = executor.execute(&ctx).await.unwrap();
        assert_eq!(out, json!([{"temp": 21}]));
    }

    #[tokio::test]
    async fn missing_knowledge_item_skips_silently() {
        let (executor, _, _, _) = harness(json!({}), vec![]);

        let ctx = flow_ctx(
            r#"{"Flow": [{"Name": "not_registered", "Key": "gap"}]}"#,
            json!({}),
        );
        let out = executor.execute(&ctx).await.unwrap();
        assert!(out.get("gap").is_none());
    }

    #[tokio::test]
    async fn strict_missing_knowledge_item_errors() {
        let (executor, _, _, _) = harness(json!({}), vec![]);

        let ctx = flow_ctx(
            r#"{"Flow": [{"Name": "not_registered", "Key": "gap", "Strict": true}]}"#,
            json!({}),
        );
        let err = executor.execute(&ctx).await.unwrap_err();
        assert_eq!(err.code(), "WEFT-002");
    }

    #[tokio::test]
    async fn absent_source_skips_item() {
        let (executor, catalog, dispatch, _) = harness(json!({"step": [{"x": 1}]}), vec![]);
        rest_item(&catalog, "step");

        let ctx = flow_ctx(
            r#"{"Flow": [{"Name": "step", "Key": "out", "Source": "never_written"}]}"#,
            json!({}),
        );
        executor.execute(&ctx).await.unwrap();
        assert!(dispatch.seen().is_empty());
    }

    // ═══════════════════════════════════════════
    // Required / optional empties
    // ═══════════════════════════════════════════

    #[tokio::test]
    async fn required_empty_is_fatal() {
        let (executor, catalog, _, _) = harness(json!({"probe": []}), vec![]);
        rest_item(&catalog, "probe");

        let ctx = flow_ctx(
            r#"{"Flow": [{"Name": "probe", "Key": "data", "Required": true}]}"#,
            json!({}),
        );
        let err = executor.execute(&ctx).await.unwrap_err();
        assert_eq!(err.code(), "WEFT-010");
    }

    #[tokio::test]
    async fn optional_empty_stores_placeholder() {
        let (executor, catalog, _, _) = harness(json!({"probe": []}), vec![]);
        rest_item(&catalog, "probe");

        let ctx = flow_ctx(r#"{"Flow": [{"Name": "probe", "Key": "data"}]}"#, json!({}));
        let out = executor.execute(&ctx).await.unwrap();
        assert_eq!(out["data"], json!({"data": "No data found"}));
    }

    #[tokio::test]
    async fn dispatch_failure_embeds_error_payload() {
        let (executor, catalog, _, _) = harness(json!({"flaky": "!fail"}), vec![]);
        rest_item(&catalog, "flaky");

        let ctx = flow_ctx(r#"{"Flow": [{"Name": "flaky", "Key": "out"}]}"#, json!({}));
        let out = executor.execute(&ctx).await.unwrap();

        let embedded = out["out"][0]["error"].as_str().unwrap();
        assert!(embedded.contains("WEFT-020"));
    }

    // ═══════════════════════════════════════════
    // Iterables
    // ═══════════════════════════════════════════

    #[tokio::test]
    async fn iterable_without_loop_key_collects_array() {
        let (executor, catalog, _, _) = harness(json!({"lookup": "!echo"}), vec![]);
        rest_item(&catalog, "lookup");

        let ctx = flow_ctx(
            r#"{"Flow": [{"Name": "lookup", "Key": "results", "Source": "input", "IsArray": true}]}"#,
            json!([{"id": "a"}, {"id": "b"}]),
        );
        let out = executor.execute(&ctx).await.unwrap();
        assert_eq!(out["results"], json!([{"id": "a"}, {"id": "b"}]));
    }

    #[tokio::test]
    async fn iterable_with_loop_key_aggregates_object() {
        let (executor, catalog, _, _) = harness(json!({"lookup": "!echo"}), vec![]);
        rest_item(&catalog, "lookup");

        let ctx = flow_ctx(
            r#"{"Flow": [{"Name": "lookup", "Key": "by_city", "Source": "input",
                "IsArray": true, "LoopKey": "city"}]}"#,
            json!([{"city": "Nice", "n": 1}, {"city": "Lyon", "n": 2}]),
        );
        let out = executor.execute(&ctx).await.unwrap();
        assert_eq!(
            out["by_city"],
            json!({"Nice": {"city": "Nice", "n": 1}, "Lyon": {"city": "Lyon", "n": 2}})
        );
    }

    #[tokio::test]
    async fn iterable_scalar_input_invokes_once() {
        let (executor, catalog, dispatch, _) = harness(json!({"lookup": "!echo"}), vec![]);
        rest_item(&catalog, "lookup");

        let ctx = flow_ctx(
            r#"{"Flow": [{"Name": "lookup", "Key": "out", "Source": "input", "IsArray": true}]}"#,
            json!({"not": "an array"}),
        );
        let out = executor.execute(&ctx).await.unwrap();
        assert_eq!(out["out"], json!([{"not": "an array"}]));
        assert_eq!(dispatch.seen().len(), 1);
    }

    // ═══════════════════════════════════════════
    // Binding and nested flows
    // ═══════════════════════════════════════════

    #[tokio::test]
    async fn params_template_binds_input() {
        let (executor, catalog, _, _) = harness(json!({"search": "!echo"}), vec![]);
        catalog.insert(
            KnowledgeItem::new("search", KnowledgeKind::Rest, "")
                .with_params_template(json!({"origin": {"type": "string"}, "seats": {"type": "number"}})),
        );

        let ctx = flow_ctx(
            r#"{"Flow": [{"Name": "search", "Key": "found"}], "Result": "found"}"#,
            json!({"originCity": "NCE", "seatCount": "3"}),
        );
        let out = executor.execute(&ctx).await.unwrap();
        assert_eq!(out, json!([{"origin": "NCE", "seats": 3}]));
    }

    #[tokio::test]
    async fn params_template_without_leaves_passes_payload_through() {
        let (executor, catalog, _, _) = harness(json!({"search": "!echo"}), vec![]);
        catalog.insert(
            KnowledgeItem::new("search", KnowledgeKind::Rest, "")
                .with_params_template(json!({"version": 2, "mode": "fast"})),
        );

        let ctx = flow_ctx(
            r#"{"Flow": [{"Name": "search", "Key": "found"}], "Result": "found"}"#,
            json!({"city": "Nice"}),
        );
        let out = executor.execute(&ctx).await.unwrap();
        assert_eq!(out, json!([{"city": "Nice"}]));
    }

    #[tokio::test]
    async fn nested_flow_runs_through_executor() {
        let (executor, catalog, _, _) = harness(json!({"leaf": [{"v": 7}]}), vec![]);
        rest_item(&catalog, "leaf");
        catalog.insert(KnowledgeItem::new(
            "inner",
            KnowledgeKind::Flow,
            r#"{"Flow": [{"Name": "leaf", "Key": "x"}], "Result": "x"}"#,
        ));

        let ctx = flow_ctx(
            r#"{"Flow": [{"Name": "inner", "Key": "nested"}]}"#,
            json!({}),
        );
        let out = executor.execute(&ctx).await.unwrap();
        assert_eq!(out["nested"], json!([{"v": 7}]));
    }

    // ═══════════════════════════════════════════
    // Synthesis
    // ═══════════════════════════════════════════

    #[tokio::test]
    async fn final_prompts_call_model_and_parse_output() {
        let (executor, catalog, _, mock) = harness(
            json!({"get_weather": [{"temp": 21}]}),
            vec![r#"{"answer": "mild"}"#],
        );
        rest_item(&catalog, "get_weather");

        let ctx = flow_ctx(
            r#"{"Flow": [{"Name": "get_weather", "Key": "weather"}],
                "SystemPrompt": "Data: {{$weather.0.temp}}"}"#,
            json!({}),
        );
        let out = executor.execute(&ctx).await.unwrap();

        assert_eq!(out, json!({"answer": "mild"}));
        let received = mock.received();
        assert_eq!(received[0].system.as_deref(), Some("Data: JSON:21"));
        // No user prompt configured: the original query is sent
        assert_eq!(received[0].user, "what is the plan?");
    }

    #[tokio::test]
    async fn all_no_data_prompts_short_circuit() {
        let (executor, _, _, mock) = harness(json!({}), vec!["should not be called"]);

        let ctx = flow_ctx(
            r#"{"Flow": [],
                "SystemPrompt": "Data: {{$missing}}",
                "UserPrompt": "Also: {{$absent}}"}"#,
            json!({}),
        );
        let out = executor.execute(&ctx).await.unwrap();

        assert_eq!(
            out,
            json!("Unable to process your request with the available data.")
        );
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn cancelled_context_aborts_before_stage() {
        let (executor, catalog, dispatch, _) = harness(json!({"step": [{"x": 1}]}), vec![]);
        rest_item(&catalog, "step");

        let ctx = flow_ctx(r#"{"Flow": [{"Name": "step", "Key": "out"}]}"#, json!({}));
        ctx.cancellation.cancel();

        let err = executor.execute(&ctx).await.unwrap_err();
        assert_eq!(err.code(), "WEFT-051");
        assert!(dispatch.seen().is_empty());
    }
}
