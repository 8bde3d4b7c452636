use crate::{Chunk, Result};

use super::models::{ChatWireLine, GenerateWireLine};

/// Turn one raw `/api/generate` JSON line into a `Chunk`.
pub(super) fn map_generate_line(line: &str) -> Result<Chunk> {
    let wire: GenerateWireLine = serde_json::from_str(line)?;
    Ok(if wire.done {
        Chunk::Done {
            prompt_tokens: wire.prompt_eval_count,
            completion_tokens: wire.eval_count,
        }
    } else {
        Chunk::Token(wire.response)
    })
}

/// Turn one raw `/api/chat` JSON line into a `Chunk`.
pub(super) fn map_chat_line(line: &str) -> Result<Chunk> {
    let wire: ChatWireLine = serde_json::from_str(line)?;
    Ok(if wire.done {
        Chunk::Done {
            prompt_tokens: wire.prompt_eval_count,
            completion_tokens: wire.eval_count,
        }
    } else {
        let content = wire.message.map(|m| m.content).unwrap_or_default();
        Chunk::Token(content)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_token_line_maps_to_token_chunk() {
        let line = r#"{"response":"hel","done":false}"#;
        match map_generate_line(line).unwrap() {
            Chunk::Token(s) => assert_eq!(s, "hel"),
            other => panic!("expected token chunk, got {other:?}"),
        }
    }

    #[test]
    fn generate_done_line_carries_token_counts() {
        let line = r#"{"response":"","done":true,"prompt_eval_count":12,"eval_count":34}"#;
        match map_generate_line(line).unwrap() {
            Chunk::Done {
                prompt_tokens,
                completion_tokens,
            } => {
                assert_eq!(prompt_tokens, 12);
                assert_eq!(completion_tokens, 34);
            }
            other => panic!("expected done chunk, got {other:?}"),
        }
    }

    #[test]
    fn chat_token_line_maps_to_token_chunk() {
        let line = r#"{"message":{"role":"assistant","content":"hi"},"done":false}"#;
        match map_chat_line(line).unwrap() {
            Chunk::Token(s) => assert_eq!(s, "hi"),
            other => panic!("expected token chunk, got {other:?}"),
        }
    }

    #[test]
    fn chat_done_line_carries_token_counts() {
        let line = r#"{"done":true,"prompt_eval_count":5,"eval_count":7}"#;
        match map_chat_line(line).unwrap() {
            Chunk::Done {
                prompt_tokens,
                completion_tokens,
            } => {
                assert_eq!(prompt_tokens, 5);
                assert_eq!(completion_tokens, 7);
            }
            other => panic!("expected done chunk, got {other:?}"),
        }
    }

    #[test]
    fn malformed_line_is_a_protocol_error() {
        let err = map_generate_line("not json").unwrap_err();
        assert!(matches!(err, crate::Error::Protocol(_)));
    }
}
