//! Tool invoker — lookup → validate → execute → validate-result pipeline.

use std::sync::Arc;
use std::time::Instant;

use lantern_core::{MessageId, ToolCall, ToolCallStatus};
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::errors::ToolError;
use crate::registry::ToolRegistry;
use crate::traits::{Tool, ToolContext};

/// Runs individual tool calls in isolation.
///
/// Every failure mode — unknown tool, bad arguments, execution error, panic,
/// timeout, result-schema violation — lands in the returned [`ToolCall`] as
/// status `Failed` with detail. Nothing escapes to abort sibling calls issued
/// in the same turn.
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
}

impl ToolInvoker {
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Invoke a tool and record the outcome as a [`ToolCall`].
    ///
    /// `plan_index` is the call's position in the planner-specified order;
    /// it is recorded verbatim so results display deterministically no
    /// matter which call finishes first.
    #[instrument(skip_all, fields(tool_name = %tool_name, tool_call_id = %ctx.tool_call_id))]
    pub async fn invoke(
        &self,
        message_id: MessageId,
        plan_index: u32,
        tool_name: &str,
        raw_args: Value,
        ctx: ToolContext,
    ) -> ToolCall {
        let start = Instant::now();
        let outcome = self.run(tool_name, raw_args.clone(), &ctx).await;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (status, result, error) = match outcome {
            Ok(value) => {
                debug!(tool_name, duration_ms, "tool call complete");
                (ToolCallStatus::Complete, Some(value), None)
            }
            Err(e) => {
                warn!(tool_name, duration_ms, error = %e, "tool call failed");
                (ToolCallStatus::Failed, None, Some(e.to_string()))
            }
        };

        ToolCall {
            id: ctx.tool_call_id,
            message_id,
            tool_name: tool_name.to_owned(),
            arguments: raw_args,
            status,
            result,
            error,
            plan_index,
        }
    }

    /// The raw pipeline, surfacing the [`ToolError`] instead of folding it.
    pub async fn run(
        &self,
        tool_name: &str,
        raw_args: Value,
        ctx: &ToolContext,
    ) -> Result<Value, ToolError> {
        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| ToolError::UnknownTool {
                name: tool_name.to_owned(),
            })?;

        let issues = tool.parameters().check(&raw_args);
        if !issues.is_empty() {
            return Err(ToolError::InvalidArguments { issues });
        }

        let value = execute_isolated(tool.clone(), raw_args, ctx).await?;

        // A result that violates the tool's own declared schema is a defect
        // in the tool; it is surfaced, never coerced.
        let issues = tool.result_schema().check(&value);
        if !issues.is_empty() {
            error!(tool_name, "tool returned schema-violating result");
            return Err(ToolError::InvalidResult { issues });
        }
        Ok(value)
    }
}

/// Run a tool body on its own task with the tool's timeout and the call's
/// cancellation token. A panic inside the body is contained here.
async fn execute_isolated(
    tool: Arc<dyn Tool>,
    args: Value,
    ctx: &ToolContext,
) -> Result<Value, ToolError> {
    if ctx.cancellation.is_cancelled() {
        return Err(ToolError::Cancelled);
    }

    let timeout = tool.timeout();
    let task_ctx = ctx.clone();
    let handle = tokio::spawn(async move { tool.execute(args, &task_ctx).await });
    let abort = handle.abort_handle();

    tokio::select! {
        () = ctx.cancellation.cancelled() => {
            abort.abort();
            Err(ToolError::Cancelled)
        }
        joined = tokio::time::timeout(timeout, handle) => match joined {
            // The task is aborted on timeout; a stuck body must not keep
            // running (or land side effects) after the call has failed.
            Err(_elapsed) => {
                abort.abort();
                Err(ToolError::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
            Ok(Err(join_err)) if join_err.is_panic() => {
                Err(ToolError::execution("tool panicked during execution"))
            }
            Ok(Err(_aborted)) => Err(ToolError::Cancelled),
            Ok(Ok(result)) => result,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use lantern_core::{BranchId, ChatId, ToolCallId};
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::schema::ParameterSchema;

    fn echo_params() -> ParameterSchema {
        let props = json!({ "text": { "type": "string" } });
        let Value::Object(props) = props else {
            unreachable!()
        };
        ParameterSchema::object(props, &["text"])
    }

    fn echo_result() -> ParameterSchema {
        let props = json!({ "echoed": { "type": "string" } });
        let Value::Object(props) = props else {
            unreachable!()
        };
        ParameterSchema::object(props, &["echoed"])
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn parameters(&self) -> ParameterSchema {
            echo_params()
        }
        fn result_schema(&self) -> ParameterSchema {
            echo_result()
        }
        async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
            let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
            Ok(json!({ "echoed": text }))
        }
    }

    /// Sleeps past its own 20ms timeout.
    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "never finishes in time"
        }
        fn parameters(&self) -> ParameterSchema {
            ParameterSchema::any_object()
        }
        fn result_schema(&self) -> ParameterSchema {
            ParameterSchema::any_object()
        }
        fn timeout(&self) -> Duration {
            Duration::from_millis(20)
        }
        async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(json!({}))
        }
    }

    /// Declares a string result but returns a number.
    struct LiarTool;

    #[async_trait]
    impl Tool for LiarTool {
        fn name(&self) -> &str {
            "liar"
        }
        fn description(&self) -> &str {
            "violates its own result schema"
        }
        fn parameters(&self) -> ParameterSchema {
            ParameterSchema::any_object()
        }
        fn result_schema(&self) -> ParameterSchema {
            echo_result()
        }
        async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
            Ok(json!({ "echoed": 99 }))
        }
    }

    /// Sleeps past its 20ms timeout, then records that its body finished.
    struct MarkingTool {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Tool for MarkingTool {
        fn name(&self) -> &str {
            "marking"
        }
        fn description(&self) -> &str {
            "marks a flag if its body runs to completion"
        }
        fn parameters(&self) -> ParameterSchema {
            ParameterSchema::any_object()
        }
        fn result_schema(&self) -> ParameterSchema {
            ParameterSchema::any_object()
        }
        fn timeout(&self) -> Duration {
            Duration::from_millis(20)
        }
        async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
            tokio::time::sleep(Duration::from_millis(150)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(json!({}))
        }
    }

    struct PanickyTool;

    #[async_trait]
    impl Tool for PanickyTool {
        fn name(&self) -> &str {
            "panicky"
        }
        fn description(&self) -> &str {
            "panics on execution"
        }
        fn parameters(&self) -> ParameterSchema {
            ParameterSchema::any_object()
        }
        fn result_schema(&self) -> ParameterSchema {
            ParameterSchema::any_object()
        }
        async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
            panic!("boom")
        }
    }

    fn invoker() -> ToolInvoker {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        registry.register(Arc::new(SlowTool)).unwrap();
        registry.register(Arc::new(LiarTool)).unwrap();
        registry.register(Arc::new(PanickyTool)).unwrap();
        ToolInvoker::new(Arc::new(registry))
    }

    fn ctx() -> ToolContext {
        ToolContext {
            tool_call_id: ToolCallId::new(),
            chat_id: ChatId::new(),
            branch_id: BranchId::new(),
            cancellation: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn successful_call_is_complete_with_result() {
        let call = invoker()
            .invoke(
                MessageId::new(),
                0,
                "echo",
                json!({ "text": "hello" }),
                ctx(),
            )
            .await;

        assert_eq!(call.status, ToolCallStatus::Complete);
        assert_eq!(call.result, Some(json!({ "echoed": "hello" })));
        assert!(call.error.is_none());
        assert_eq!(call.plan_index, 0);
    }

    #[tokio::test]
    async fn unknown_tool_fails_the_call() {
        let call = invoker()
            .invoke(MessageId::new(), 0, "levitate", json!({}), ctx())
            .await;

        assert_eq!(call.status, ToolCallStatus::Failed);
        assert!(call.error.as_deref().unwrap().contains("unknown tool"));
    }

    #[tokio::test]
    async fn invalid_arguments_fail_with_field_path() {
        let call = invoker()
            .invoke(MessageId::new(), 0, "echo", json!({ "text": 7 }), ctx())
            .await;

        assert_eq!(call.status, ToolCallStatus::Failed);
        let detail = call.error.unwrap();
        assert!(detail.contains("text"), "missing path in: {detail}");
        assert!(detail.contains("expected string"));
    }

    #[tokio::test]
    async fn timeout_fails_only_that_call() {
        let call = invoker()
            .invoke(MessageId::new(), 0, "slow", json!({}), ctx())
            .await;

        assert_eq!(call.status, ToolCallStatus::Failed);
        assert!(call.error.as_deref().unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn timed_out_tool_body_is_aborted() {
        let finished = Arc::new(AtomicBool::new(false));
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(MarkingTool {
                finished: finished.clone(),
            }))
            .unwrap();
        let inv = ToolInvoker::new(Arc::new(registry));

        let err = inv.run("marking", json!({}), &ctx()).await;
        assert_matches!(err, Err(ToolError::Timeout { .. }));

        // Well past the body's sleep; an un-aborted task would have run on
        // and set the flag by now.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(
            !finished.load(Ordering::SeqCst),
            "tool body kept running after the call timed out"
        );
    }

    #[tokio::test]
    async fn schema_violating_result_is_surfaced_not_coerced() {
        let call = invoker()
            .invoke(MessageId::new(), 0, "liar", json!({}), ctx())
            .await;

        assert_eq!(call.status, ToolCallStatus::Failed);
        assert!(call.error.as_deref().unwrap().contains("invalid result"));
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let call = invoker()
            .invoke(MessageId::new(), 0, "panicky", json!({}), ctx())
            .await;

        assert_eq!(call.status, ToolCallStatus::Failed);
        assert!(call.error.as_deref().unwrap().contains("panicked"));
    }

    #[tokio::test]
    async fn pre_cancelled_context_short_circuits() {
        let ctx = ctx();
        ctx.cancellation.cancel();

        let err = invoker().run("echo", json!({ "text": "x" }), &ctx).await;
        assert_matches!(err, Err(ToolError::Cancelled));
    }

    #[tokio::test]
    async fn cancellation_mid_flight_aborts_the_call() {
        let ctx = ctx();
        let token = ctx.cancellation.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            token.cancel();
        });

        let err = invoker().run("slow", json!({}), &ctx).await;
        assert_matches!(err, Err(ToolError::Cancelled));
    }

    #[tokio::test]
    async fn sibling_calls_are_isolated_from_one_failure() {
        let inv = Arc::new(invoker());
        let msg = MessageId::new();

        let a = inv.invoke(msg.clone(), 0, "panicky", json!({}), ctx());
        let b = inv.invoke(msg.clone(), 1, "echo", json!({ "text": "ok" }), ctx());
        let (a, b) = tokio::join!(a, b);

        assert_eq!(a.status, ToolCallStatus::Failed);
        assert_eq!(b.status, ToolCallStatus::Complete);
        assert_eq!(b.plan_index, 1);
    }

    #[tokio::test]
    async fn arguments_are_recorded_on_the_call() {
        let args = json!({ "text": "preserved" });
        let call = invoker()
            .invoke(MessageId::new(), 3, "echo", args.clone(), ctx())
            .await;

        assert_eq!(call.arguments, args);
        assert_eq!(call.plan_index, 3);
    }
}
