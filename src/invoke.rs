//! Invocation: running a tool with materialized arguments.
//!
//! Handler tools await their boxed future; whatever error the handler body
//! returns propagates unchanged, never rewrapped. Record tools run no code
//! at all — invoking one constructs the record value. Cancellation is plain
//! future semantics: dropping the invocation future abandons the call.

use crate::tool::{Callable, Tool};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::future::Future;
use tracing::trace;

/// Invoke a tool with already-materialized arguments.
pub async fn invoke(tool: &Tool, args: Map<String, Value>) -> Result<Value> {
    trace!(tool = tool.name(), "invoking");
    match tool.callable() {
        Callable::Handler(handler) => handler(Value::Object(args)).await,
        Callable::Record(shape) => Ok(shape.construct(args)),
    }
}

/// Drive an invocation future from synchronous code.
///
/// Inside a running multi-thread tokio runtime the ambient handle is
/// reused; with no runtime at all, a throwaway current-thread runtime
/// drives the future. Inside a current-thread runtime blocking would
/// deadlock, so the call fails with
/// [`Error::Runtime`](crate::Error::Runtime) — await the invocation there
/// instead.
pub fn block_on<F>(future: F) -> Result<Value>
where
    F: Future<Output = Result<Value>>,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            if matches!(
                handle.runtime_flavor(),
                tokio::runtime::RuntimeFlavor::CurrentThread
            ) {
                return Err(Error::Runtime(
                    "cannot block inside a current-thread tokio runtime; \
                     await the invocation instead"
                        .to_string(),
                ));
            }
            tokio::task::block_in_place(|| handle.block_on(future))
        }
        Err(_) => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(future)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeExpr;
    use crate::tool::tool;
    use crate::Error;
    use serde_json::json;

    #[test]
    fn test_handler_errors_propagate_unchanged() {
        let failing = tool("fail", "always fails")
            .build(|_| async move { Err(Error::tool("backend unavailable")) })
            .unwrap();

        let err = tokio_test::block_on(invoke(&failing, Map::new())).unwrap_err();
        assert_eq!(err.to_string(), "tool execution error: backend unavailable");
    }

    #[test]
    fn test_record_invocation_runs_no_handler() {
        use crate::descriptor::{FieldDecl, ModelShape};

        let point = ModelShape::new("Point");
        point.define([
            FieldDecl::new("x", TypeExpr::number()),
            FieldDecl::new("y", TypeExpr::number()),
        ]);
        let t = crate::tool::record_tool(point).unwrap();

        let mut args = Map::new();
        args.insert("x".to_string(), json!(1.0));
        args.insert("y".to_string(), json!(2.0));
        let built = tokio_test::block_on(invoke(&t, args)).unwrap();
        assert_eq!(built, json!({"x": 1.0, "y": 2.0}));
    }

    #[test]
    fn test_block_on_without_ambient_runtime() {
        let echo = tool("echo", "echo")
            .param("x", TypeExpr::integer())
            .build(|args| async move { Ok(args) })
            .unwrap();

        let result = block_on(echo.invoke_text("echo(41)")).unwrap();
        assert_eq!(result, json!({"x": 41}));
    }

    #[tokio::test]
    async fn test_block_on_inside_current_thread_runtime_errors() {
        let echo = tool("echo", "echo")
            .param("x", TypeExpr::integer())
            .build(|args| async move { Ok(args) })
            .unwrap();

        // The default test runtime is current-thread flavored; blocking
        // here must fail instead of deadlocking or panicking.
        let err = block_on(echo.invoke_text("echo(1)")).unwrap_err();
        assert!(matches!(err, Error::Runtime(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_block_on_reuses_the_ambient_runtime() {
        let echo = tool("echo", "echo")
            .param("x", TypeExpr::integer())
            .build(|args| async move { Ok(args) })
            .unwrap();

        let result =
            tokio::task::spawn_blocking(move || block_on(echo.invoke_text("echo(1)")))
                .await
                .unwrap()
                .unwrap();
        assert_eq!(result, json!({"x": 1}));
    }
}
