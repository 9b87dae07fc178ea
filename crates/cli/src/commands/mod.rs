pub mod catalog;
pub mod config;

use serde::Serialize;
use serde_json::Value;
use stockroom_core::errors::InterfaceError;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>, data: Option<Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn config_failure(command: &str, error: impl std::fmt::Display) -> Self {
        Self::failure(command, "config_validation", format!("configuration issue: {error}"), 2)
    }

    pub fn runtime_failure(command: &str, error: impl std::fmt::Display) -> Self {
        Self::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    }

    pub fn interface_failure(command: &str, error: &InterfaceError) -> Self {
        let (error_class, exit_code) = match error {
            InterfaceError::NotFound { .. } => ("not_found", 4),
            InterfaceError::BadRequest { .. } => ("bad_request", 5),
            InterfaceError::ServiceUnavailable { .. } => ("storage_unavailable", 6),
            InterfaceError::Internal { .. } => ("internal", 7),
        };
        Self::failure(command, error_class, error.message(), exit_code)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\",\"data\":null}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use stockroom_core::errors::InterfaceError;

    use super::CommandResult;

    fn parse(result: &CommandResult) -> Value {
        serde_json::from_str(&result.output).expect("valid JSON output")
    }

    #[test]
    fn success_carries_data_and_null_error_class() {
        let result = CommandResult::success("list", "2 products", Some(json!([1, 2])));
        let payload = parse(&result);

        assert_eq!(result.exit_code, 0);
        assert_eq!(payload["status"], "ok");
        assert!(payload["error_class"].is_null());
        assert_eq!(payload["data"], json!([1, 2]));
    }

    #[test]
    fn interface_errors_map_to_distinct_exit_codes() {
        let cases = [
            (InterfaceError::NotFound { message: "m".into(), correlation_id: "c".into() }, 4),
            (InterfaceError::BadRequest { message: "m".into(), correlation_id: "c".into() }, 5),
            (
                InterfaceError::ServiceUnavailable {
                    message: "m".into(),
                    correlation_id: "c".into(),
                },
                6,
            ),
            (InterfaceError::Internal { message: "m".into(), correlation_id: "c".into() }, 7),
        ];

        for (error, exit_code) in cases {
            let result = CommandResult::interface_failure("get", &error);
            assert_eq!(result.exit_code, exit_code);
            assert_eq!(parse(&result)["status"], "error");
            assert!(parse(&result)["data"].is_null());
        }
    }
}
