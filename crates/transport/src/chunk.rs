use serde::Deserialize;

/// One decoded unit of a streamed reply.
///
/// Wire shape: `{"type": "content" | "done" | "error", ...}`, one JSON
/// record per `data: ` line. `Done` and `Error` are terminal: the stream
/// yields nothing after either.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamChunk {
    Content {
        #[serde(default)]
        content: String,
    },
    Done,
    Error {
        #[serde(default)]
        message: String,
    },
}

impl StreamChunk {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }

    /// Builds a synthetic error chunk for failures the server never sent
    /// (malformed payloads, transport faults, truncated streams).
    pub(crate) fn synthetic_error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

pub(crate) fn parse_payload(payload: &str) -> Result<StreamChunk, serde_json::Error> {
    serde_json::from_str(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_three_wire_variants() {
        assert_eq!(
            parse_payload(r#"{"content": "Hello", "type": "content"}"#).unwrap(),
            StreamChunk::Content {
                content: "Hello".to_string()
            }
        );
        assert_eq!(parse_payload(r#"{"type": "done"}"#).unwrap(), StreamChunk::Done);
        assert_eq!(
            parse_payload(r#"{"type": "error", "message": "rate limited"}"#).unwrap(),
            StreamChunk::Error {
                message: "rate limited".to_string()
            }
        );
    }

    #[test]
    fn error_without_message_defaults_to_empty() {
        assert_eq!(
            parse_payload(r#"{"type": "error"}"#).unwrap(),
            StreamChunk::Error {
                message: String::new()
            }
        );
    }

    #[test]
    fn unknown_type_tag_is_a_parse_failure() {
        assert!(parse_payload(r#"{"type": "ping"}"#).is_err());
        assert!(parse_payload("not json").is_err());
    }

    #[test]
    fn only_done_and_error_are_terminal() {
        assert!(StreamChunk::Done.is_terminal());
        assert!(
            StreamChunk::Error {
                message: String::new()
            }
            .is_terminal()
        );
        assert!(
            !StreamChunk::Content {
                content: "x".to_string()
            }
            .is_terminal()
        );
    }
}
