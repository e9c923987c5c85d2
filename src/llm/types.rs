use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<i64>,
    pub stop: Option<Vec<String>>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            top_p: None,
            max_tokens: None,
            stop: None,
        }
    }

    /// Overlay sampling parameters from the `llm` config section.
    pub fn with_config(mut self, config: &serde_json::Value) -> Self {
        if let Some(llm) = config.get("llm") {
            self.temperature = llm
                .get("temperature")
                .and_then(|v| v.as_f64())
                .or(self.temperature);
            self.top_p = llm.get("top_p").and_then(|v| v.as_f64()).or(self.top_p);
            self.max_tokens = llm
                .get("max_tokens")
                .and_then(|v| v.as_i64())
                .or(self.max_tokens);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn with_config_overlays_llm_section() {
        let request = ChatRequest::new(vec![ChatMessage::user("hi")])
            .with_config(&json!({ "llm": { "temperature": 0.2, "max_tokens": 256 } }));

        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(256));
        assert_eq!(request.top_p, None);
    }
}
