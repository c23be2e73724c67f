//! Turns `data:` lines into typed [`StreamEvent`]s.

use serde::Deserialize;

use crate::content::CompletedContent;
use crate::errors::FrameError;
use crate::model::ConversationId;
use crate::stream::StreamEvent;

/// Framing marker of meaningful lines.
pub const DATA_PREFIX: &str = "data:";

const KIND_CONVERSATION_ID: &str = "conversation_id";
const KIND_CONTENT: &str = "content";
const KIND_COMPLETE: &str = "complete";
const KIND_ERROR: &str = "error";

#[derive(Deserialize)]
struct Frame<T> {
    data: T,
}

/// Parses one complete line.
///
/// Returns `Ok(None)` for lines that carry no event: blank lines, lines
/// without the `data:` prefix, `[DONE]` sentinels and unknown event kinds.
/// A `data:` line whose payload is malformed returns a [`FrameError`]; it is
/// up to the caller to drop it and carry on.
pub fn parse_line(line: &str) -> Result<Option<StreamEvent>, FrameError> {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload);
    if payload.trim().is_empty() || payload.trim() == "[DONE]" {
        return Ok(None);
    }

    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| FrameError::Json {
            message: e.to_string(),
        })?;
    let Some(kind) = value.get("type").and_then(|v| v.as_str()) else {
        return Err(FrameError::MissingType);
    };

    let event = match kind {
        KIND_CONVERSATION_ID => {
            let frame: Frame<i64> = decode_frame(kind, &value)?;
            StreamEvent::ConversationStarted {
                conversation_id: ConversationId(frame.data),
            }
        }
        KIND_CONTENT => {
            let frame: Frame<String> = decode_frame(kind, &value)?;
            StreamEvent::ContentDelta { text: frame.data }
        }
        KIND_COMPLETE => {
            let frame: Frame<CompletedContent> = decode_frame(kind, &value)?;
            StreamEvent::Completed(frame.data)
        }
        KIND_ERROR => {
            let frame: Frame<String> = decode_frame(kind, &value)?;
            StreamEvent::Failed {
                message: frame.data,
            }
        }
        other => {
            tracing::debug!(kind = other, "ignoring unknown stream event kind");
            return Ok(None);
        }
    };
    Ok(Some(event))
}

fn decode_frame<T: serde::de::DeserializeOwned>(
    kind: &str,
    value: &serde_json::Value,
) -> Result<Frame<T>, FrameError> {
    Frame::<T>::deserialize(value).map_err(|e| FrameError::InvalidPayload {
        kind: kind.to_string(),
        message: e.to_string(),
    })
}
