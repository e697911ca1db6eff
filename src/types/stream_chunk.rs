use serde::{Deserialize, Serialize};

use crate::types::Role;

/// One partial update of a streaming response.
///
/// A response stream is a finite, ordered sequence of these.  The first chunk
/// normally carries the role and later chunks carry fragments of content, but
/// a chunk may carry both, or neither (keep-alives and finish markers).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// The role of the message being streamed, if this chunk announces it.
    #[serde(rename = "role", default, skip_serializing_if = "Option::is_none")]
    pub delta_role: Option<Role>,

    /// A fragment of content to append.
    #[serde(rename = "content", default, skip_serializing_if = "Option::is_none")]
    pub delta_content: Option<String>,
}

impl StreamChunk {
    /// A chunk that announces the role.
    pub fn role(role: Role) -> Self {
        Self {
            delta_role: Some(role),
            delta_content: None,
        }
    }

    /// A chunk that carries a content fragment.
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            delta_role: None,
            delta_content: Some(content.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_openai_style_delta() {
        let chunk: StreamChunk =
            serde_json::from_str(r#"{"role":"assistant","content":""}"#).unwrap();
        assert_eq!(chunk.delta_role, Some(Role::Assistant));
        assert_eq!(chunk.delta_content.as_deref(), Some(""));

        let chunk: StreamChunk = serde_json::from_str("{}").unwrap();
        assert_eq!(chunk, StreamChunk::default());
    }
}
