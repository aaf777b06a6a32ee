//! Wire format spoken with the worker process.
//!
//! Requests are single ASCII lines, `"<command> <arg> <arg>…\n"`.
//! Responses are one JSON object per output line:
//! `{"status": "success" | "error", "data": …, "message": "…"}`, optionally
//! carrying an `id` that names the request it answers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ocrgrep_core::{OcrError, OcrResult};

pub const CMD_INIT: &str = "init";
pub const CMD_READ_TEXT: &str = "read_text";
pub const CMD_CLOSE: &str = "close";

/// Outcome reported by the worker. Anything other than `success` or `error`
/// is kept verbatim and treated as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResponseStatus {
    Success,
    Error,
    Other(String),
}

impl From<String> for ResponseStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "success" => Self::Success,
            "error" => Self::Error,
            _ => Self::Other(raw),
        }
    }
}

impl From<ResponseStatus> for String {
    fn from(status: ResponseStatus) -> Self {
        match status {
            ResponseStatus::Success => "success".to_string(),
            ResponseStatus::Error => "error".to_string(),
            ResponseStatus::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WorkerResponse {
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// The worker's message, or `fallback` when it sent none.
    pub fn message_or(&self, fallback: &str) -> String {
        self.message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Render a request line. Arguments may not contain line breaks, since a
/// newline terminates the request.
pub fn encode_command(command: &str, args: &[String]) -> OcrResult<String> {
    if command.is_empty() || command.contains(char::is_whitespace) {
        return Err(OcrError::Protocol(format!("invalid command name: {command:?}")));
    }
    if let Some(bad) = args.iter().find(|a| a.contains(['\n', '\r'])) {
        return Err(OcrError::Protocol(format!(
            "argument contains a line break: {bad:?}"
        )));
    }

    let mut line = String::from(command);
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line.push('\n');
    Ok(line)
}

/// Parse one output line into a response.
pub fn decode_response(line: &str) -> OcrResult<WorkerResponse> {
    serde_json::from_str(line.trim()).map_err(|e| {
        OcrError::Protocol(format!("Failed to parse worker output ({e}): {}", truncate(line, 200)))
    })
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_command_lines() {
        let langs = vec!["en".to_string(), "fr".to_string()];
        assert_eq!(encode_command(CMD_INIT, &langs).unwrap(), "init en fr\n");
        assert_eq!(encode_command(CMD_CLOSE, &[]).unwrap(), "close\n");
        assert_eq!(
            encode_command(CMD_READ_TEXT, &["/img/a.png".to_string()]).unwrap(),
            "read_text /img/a.png\n"
        );
    }

    #[test]
    fn rejects_line_breaks_in_arguments() {
        let err = encode_command(CMD_READ_TEXT, &["a\nclose".to_string()]).unwrap_err();
        assert!(matches!(err, OcrError::Protocol(_)));
        assert!(encode_command("read text", &[]).is_err());
        assert!(encode_command("", &[]).is_err());
    }

    #[test]
    fn decodes_success_and_error() {
        let ok = decode_response(r#"{"status":"success","data":[1,2]}"#).unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.data, Some(serde_json::json!([1, 2])));

        let err = decode_response(r#"{"status":"error","message":"no such file"}"#).unwrap();
        assert_eq!(err.status, ResponseStatus::Error);
        assert_eq!(err.message_or("fallback"), "no such file");
    }

    #[test]
    fn unknown_status_is_not_success() {
        let resp = decode_response(r#"{"status":"pending"}"#).unwrap();
        assert_eq!(resp.status, ResponseStatus::Other("pending".into()));
        assert!(!resp.is_success());
        assert_eq!(resp.message_or("fallback"), "fallback");
    }

    #[test]
    fn garbage_is_a_protocol_error() {
        assert!(matches!(decode_response("Loading model..."), Err(OcrError::Protocol(_))));
        assert!(matches!(decode_response(r#"{"data":1}"#), Err(OcrError::Protocol(_))));
    }

    #[test]
    fn response_id_round_trips() {
        let resp = decode_response(r#"{"id":"abc","status":"success"}"#).unwrap();
        assert_eq!(resp.id.as_deref(), Some("abc"));
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"id":"abc","status":"success"}"#);
    }
}
