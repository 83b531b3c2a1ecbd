use std::backtrace::{Backtrace, BacktraceStatus};
use std::collections::BTreeMap;

use serde_json::{json, Value};

/// Metadata accepted by the log facade.
///
/// Plain JSON covers most call sites; `Error` carries an error captured at the
/// call site, and `List`/`Map` let errors sit anywhere inside a structure.
#[derive(Debug, Clone, PartialEq)]
pub enum LogValue {
    Json(Value),
    Error(CapturedError),
    List(Vec<LogValue>),
    Map(BTreeMap<String, LogValue>),
}

impl LogValue {
    pub fn error<E: std::error::Error>(error: &E) -> Self {
        Self::Error(CapturedError::from_error(error))
    }

    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<LogValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn is_error_like(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl From<Value> for LogValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<CapturedError> for LogValue {
    fn from(error: CapturedError) -> Self {
        Self::Error(error)
    }
}

impl From<&anyhow::Error> for LogValue {
    fn from(error: &anyhow::Error) -> Self {
        Self::Error(CapturedError::from_anyhow(error))
    }
}

impl From<&str> for LogValue {
    fn from(value: &str) -> Self {
        Self::Json(Value::String(value.to_string()))
    }
}

impl From<String> for LogValue {
    fn from(value: String) -> Self {
        Self::Json(Value::String(value))
    }
}

impl From<i64> for LogValue {
    fn from(value: i64) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<bool> for LogValue {
    fn from(value: bool) -> Self {
        Self::Json(Value::Bool(value))
    }
}

impl From<Vec<LogValue>> for LogValue {
    fn from(values: Vec<LogValue>) -> Self {
        Self::List(values)
    }
}

/// Serializable snapshot of an error: display message, type name, and stack lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedError {
    pub message: String,
    pub name: String,
    pub stack: Option<Vec<String>>,
}

impl CapturedError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        let message = message.into();
        let stack = stack_lines(&name, &message, &Backtrace::capture());
        Self {
            message,
            name,
            stack: Some(stack),
        }
    }

    pub fn from_error<E: std::error::Error>(error: &E) -> Self {
        Self::new(short_type_name::<E>(), error.to_string())
    }

    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        let name = "Error".to_string();
        let message = format!("{error:#}");
        let stack = stack_lines(&name, &message, error.backtrace());
        Self {
            message,
            name,
            stack: Some(stack),
        }
    }

    /// Error raised on behalf of a `fatal` call that carried no metadata.
    pub fn synthetic(message: &str) -> Self {
        Self::new("Error", message)
    }

    /// Drops the leading frames recorded inside the logger so the stack
    /// starts at the caller. The `Name: message` header is kept.
    pub fn strip_logger_frames(&mut self) {
        if let Some(stack) = self.stack.as_mut() {
            let logger_frames = stack
                .iter()
                .skip(1)
                .take_while(|frame| is_logger_frame(frame))
                .count();
            stack.drain(1..1 + logger_frames);
        }
    }

    pub fn into_json(self) -> Value {
        json!({
            "message": self.message,
            "name": self.name,
            "stack": self.stack,
        })
    }
}

/// Symbol prefixes of frames recorded while the logger builds an error record.
const LOGGER_FRAME_PREFIXES: &[&str] = &[
    "std::backtrace",
    "<std::backtrace",
    "warden_logs::value::",
    "<warden_logs::value::",
    "warden_logs::facade::fatal_metadata",
    "warden_logs::facade::Logs",
    "warden_logs::facade::ThreadLogs",
];

fn is_logger_frame(frame: &str) -> bool {
    LOGGER_FRAME_PREFIXES
        .iter()
        .any(|prefix| frame.starts_with(prefix))
}

/// Header line `Name: message` followed by one entry per captured frame.
fn stack_lines(name: &str, message: &str, backtrace: &Backtrace) -> Vec<String> {
    let mut lines = vec![format!("{name}: {message}")];
    if backtrace.status() == BacktraceStatus::Captured {
        lines.extend(backtrace_frames(&backtrace.to_string()));
    }
    lines
}

/// Folds the rendered backtrace (`N: symbol` lines, each optionally followed
/// by an `at file:line:col` line) into `symbol at file:line:col` entries.
fn backtrace_frames(rendered: &str) -> Vec<String> {
    let mut frames: Vec<String> = Vec::new();
    for line in rendered.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                frame.push_str(" at ");
                frame.push_str(location);
            }
            continue;
        }
        let symbol = match line.split_once(": ") {
            Some((index, symbol)) if index.chars().all(|c| c.is_ascii_digit()) => symbol,
            _ => line,
        };
        frames.push(symbol.to_string());
    }
    frames
}

fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

#[cfg(test)]
mod tests {
    use super::{backtrace_frames, short_type_name, CapturedError, LogValue};
    use serde_json::json;

    #[test]
    fn unit_short_type_name_drops_module_path_and_generics() {
        assert_eq!(short_type_name::<std::io::Error>(), "Error");
        assert_eq!(
            short_type_name::<std::num::ParseIntError>(),
            "ParseIntError"
        );
        assert_eq!(short_type_name::<Vec<u8>>(), "Vec");
    }

    #[test]
    fn unit_captured_error_stack_starts_with_name_and_message() {
        let parse_error = "x".parse::<u32>().expect_err("not a number");
        let captured = CapturedError::from_error(&parse_error);
        assert_eq!(captured.name, "ParseIntError");
        assert_eq!(captured.message, "invalid digit found in string");
        let stack = captured.stack.expect("stack");
        assert_eq!(stack[0], "ParseIntError: invalid digit found in string");
    }

    #[test]
    fn unit_backtrace_frames_join_symbol_and_location() {
        let rendered = "   0: std::backtrace::Backtrace::create\n             at /rustc/library/std/src/backtrace.rs:331:13\n   1: warden_logs::value::CapturedError::new\n             at ./src/value.rs:102:51\n   2: handler::stop\n   3: <unknown>\n";
        assert_eq!(
            backtrace_frames(rendered),
            vec![
                "std::backtrace::Backtrace::create at /rustc/library/std/src/backtrace.rs:331:13",
                "warden_logs::value::CapturedError::new at ./src/value.rs:102:51",
                "handler::stop",
                "<unknown>",
            ]
        );
    }

    #[test]
    fn unit_strip_logger_frames_removes_every_leading_logger_frame() {
        let mut captured = CapturedError {
            message: "boom".to_string(),
            name: "Error".to_string(),
            stack: Some(vec![
                "Error: boom".to_string(),
                "std::backtrace::Backtrace::capture at backtrace.rs:296:9".to_string(),
                "warden_logs::value::CapturedError::new at ./src/value.rs:102:51".to_string(),
                "warden_logs::value::CapturedError::synthetic at ./src/value.rs:126:9".to_string(),
                "warden_logs::facade::fatal_metadata at ./src/facade.rs:209:33".to_string(),
                "warden_logs::facade::Logs::emit at ./src/facade.rs:150:13".to_string(),
                "warden_logs::facade::Logs::fatal at ./src/facade.rs:132:9".to_string(),
                "handler::stop at ./src/handler.rs:12:5".to_string(),
                "warden_logs::value::later_frame_is_kept".to_string(),
            ]),
        };
        captured.strip_logger_frames();
        assert_eq!(
            captured.stack,
            Some(vec![
                "Error: boom".to_string(),
                "handler::stop at ./src/handler.rs:12:5".to_string(),
                "warden_logs::value::later_frame_is_kept".to_string(),
            ])
        );

        let mut header_only = CapturedError {
            message: "boom".to_string(),
            name: "Error".to_string(),
            stack: Some(vec!["Error: boom".to_string()]),
        };
        header_only.strip_logger_frames();
        assert_eq!(header_only.stack.map(|stack| stack.len()), Some(1));
    }

    #[test]
    fn unit_anyhow_errors_capture_the_context_chain() {
        let error = anyhow::anyhow!("connection reset").context("insert log row");
        let value = LogValue::from(&error);
        let LogValue::Error(captured) = value else {
            panic!("expected captured error");
        };
        assert_eq!(captured.message, "insert log row: connection reset");
        assert_eq!(captured.name, "Error");
    }

    #[test]
    fn unit_into_json_has_message_name_and_stack_keys() {
        let captured = CapturedError {
            message: "m".to_string(),
            name: "N".to_string(),
            stack: None,
        };
        assert_eq!(
            captured.into_json(),
            json!({"message": "m", "name": "N", "stack": null})
        );
    }
}
