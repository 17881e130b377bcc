//! Argument adapter - turns a cleaned prompt into tool arguments
//!
//! Tool signatures differ, so keyword routing is best-effort: when the
//! derived arguments do not fit, the tool is retried once with no arguments
//! before the mismatch is reported.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{DispatchError, ToolError};
use crate::registry::ToolDescriptor;
use crate::router::ArgumentShape;
use crate::schema::bind;

/// Derive arguments from the prompt remainder, then lay the explicit
/// structured `params` over them. Explicit params always win.
pub fn shape_arguments(
    shape: &ArgumentShape,
    cleaned: &str,
    params: Map<String, Value>,
) -> Map<String, Value> {
    let mut args = Map::new();

    match shape {
        ArgumentShape::Remainder { param } => {
            args.insert(param.clone(), Value::String(cleaned.to_string()));
        }
        ArgumentShape::OptionalRemainder { param } => {
            let trimmed = cleaned.trim();
            if !trimmed.is_empty() {
                args.insert(param.clone(), Value::String(trimmed.to_string()));
            }
        }
        ArgumentShape::Discard => {}
    }

    args.extend(params);
    args
}

enum Attempt {
    Mismatch(String),
    Failed(String),
}

async fn attempt(tool: &ToolDescriptor, args: Map<String, Value>) -> Result<Value, Attempt> {
    let bound = bind(&tool.parameters, args).map_err(|e| Attempt::Mismatch(e.to_string()))?;

    match tool.invoke(bound).await {
        Ok(value) => Ok(value),
        Err(e @ ToolError::InvalidArguments(_)) => Err(Attempt::Mismatch(e.to_string())),
        Err(e) => Err(Attempt::Failed(e.to_string())),
    }
}

/// Bind `args` to `tool` and run it.
///
/// With `fallback` set, an argument mismatch (at binding time or reported by
/// the tool) is retried once with an empty argument map.
pub async fn invoke_adapted(
    tool: &ToolDescriptor,
    args: Map<String, Value>,
    fallback: bool,
) -> Result<Value, DispatchError> {
    let had_args = !args.is_empty();
    debug!("Invoking {} with {:?}", tool.name, args);

    let first = match attempt(tool, args).await {
        Ok(value) => return Ok(value),
        Err(Attempt::Failed(message)) => return Err(execution(tool, message)),
        Err(Attempt::Mismatch(message)) => message,
    };

    if !fallback || !had_args {
        return Err(adaptation(tool, first));
    }

    warn!(
        "Arguments did not fit {} ({}), retrying without arguments",
        tool.name, first
    );

    match attempt(tool, Map::new()).await {
        Ok(value) => Ok(value),
        Err(Attempt::Mismatch(_)) => Err(adaptation(tool, first)),
        Err(Attempt::Failed(message)) => Err(execution(tool, message)),
    }
}

fn adaptation(tool: &ToolDescriptor, message: String) -> DispatchError {
    DispatchError::ArgumentAdaptation {
        tool: tool.name.clone(),
        message,
    }
}

fn execution(tool: &ToolDescriptor, message: String) -> DispatchError {
    DispatchError::ToolExecution {
        tool: tool.name.clone(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParamKind, ParamSpec, ToolArgs};
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn no_arg_tool() -> ToolDescriptor {
        ToolDescriptor::from_fn("get_os_name", "OS info", vec![], |_args: ToolArgs| async {
            Ok::<_, ToolError>(json!({"os": "linux"}))
        })
    }

    fn sql_tool() -> ToolDescriptor {
        ToolDescriptor::from_fn(
            "postgres_query",
            "SQL",
            vec![
                ParamSpec::required("sql", ParamKind::String, ""),
                ParamSpec::optional("limit", ParamKind::Integer, 100, ""),
            ],
            |args: ToolArgs| async move {
                let sql = args.require_str("sql")?;
                if !sql.to_lowercase().starts_with("select") {
                    return Err(ToolError::Rejected("Only SELECT is allowed".to_string()));
                }
                Ok(json!({"query": sql, "limit": args.get_i64("limit")}))
            },
        )
    }

    #[test]
    fn test_remainder_shape() {
        let shape = ArgumentShape::Remainder { param: "sql".to_string() };
        let args = shape_arguments(&shape, "SELECT * FROM users", Map::new());
        assert_eq!(args, map(json!({"sql": "SELECT * FROM users"})));
    }

    #[test]
    fn test_optional_remainder_shape() {
        let shape = ArgumentShape::OptionalRemainder { param: "path".to_string() };
        assert_eq!(
            shape_arguments(&shape, " /var ", Map::new()),
            map(json!({"path": "/var"}))
        );
        assert!(shape_arguments(&shape, "   ", Map::new()).is_empty());
    }

    #[test]
    fn test_discard_shape_keeps_params() {
        let args = shape_arguments(
            &ArgumentShape::Discard,
            "ignored text",
            map(json!({"verbose": true})),
        );
        assert_eq!(args, map(json!({"verbose": true})));
    }

    #[test]
    fn test_explicit_params_override_derived() {
        let shape = ArgumentShape::Remainder { param: "sql".to_string() };
        let args = shape_arguments(
            &shape,
            "SELECT 1",
            map(json!({"sql": "SELECT 2", "limit": 5})),
        );
        assert_eq!(args, map(json!({"sql": "SELECT 2", "limit": 5})));
    }

    #[tokio::test]
    async fn test_mismatch_falls_back_to_no_arguments() {
        let result = invoke_adapted(&no_arg_tool(), map(json!({"message": "hi"})), true)
            .await
            .unwrap();
        assert_eq!(result, json!({"os": "linux"}));
    }

    #[tokio::test]
    async fn test_mismatch_without_fallback_is_hard_error() {
        let err = invoke_adapted(&no_arg_tool(), map(json!({"message": "hi"})), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "argument_adaptation");
    }

    #[tokio::test]
    async fn test_failed_fallback_reports_first_mismatch() {
        let err = invoke_adapted(&sql_tool(), map(json!({"path": "/"})), true)
            .await
            .unwrap_err();
        match err {
            DispatchError::ArgumentAdaptation { tool, message } => {
                assert_eq!(tool, "postgres_query");
                assert!(message.contains("unexpected argument 'path'"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tool_failure_is_wrapped_not_retried() {
        let err = invoke_adapted(&sql_tool(), map(json!({"sql": "DROP TABLE users"})), true)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::ToolExecution {
                tool: "postgres_query".to_string(),
                message: "Only SELECT is allowed".to_string(),
            }
        );
    }
}
