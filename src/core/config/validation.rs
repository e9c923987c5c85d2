//! Sanity checks applied before a config write is persisted.

use serde_json::Value;

use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    if !config.is_object() {
        return Err(ApiError::BadRequest(
            "config root must be a mapping".to_string(),
        ));
    }

    if let Some(index) = config.get("index") {
        let chunk_size = read_u64(index, "chunk_size");
        let chunk_overlap = read_u64(index, "chunk_overlap");

        if let Some(size) = chunk_size {
            if size == 0 {
                return Err(ApiError::BadRequest(
                    "index.chunk_size must be at least 1".to_string(),
                ));
            }
        }
        if let (Some(size), Some(overlap)) = (chunk_size, chunk_overlap) {
            if overlap >= size {
                return Err(ApiError::BadRequest(
                    "index.chunk_overlap must be smaller than index.chunk_size".to_string(),
                ));
            }
        }
    }

    if let Some(rag) = config.get("rag") {
        if let Some(top_k) = read_u64(rag, "top_k") {
            if top_k == 0 {
                return Err(ApiError::BadRequest(
                    "rag.top_k must be at least 1".to_string(),
                ));
            }
        }
    }

    if let Some(llm) = config.get("llm") {
        if let Some(base_url) = llm.get("base_url") {
            match base_url.as_str() {
                Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
                _ => {
                    return Err(ApiError::BadRequest(
                        "llm.base_url must be an http(s) URL".to_string(),
                    ))
                }
            }
        }
    }

    if let Some(origins) = config
        .get("server")
        .and_then(|server| server.get("cors_allowed_origins"))
    {
        let all_strings = origins
            .as_array()
            .map(|list| list.iter().all(Value::is_string))
            .unwrap_or(false);
        if !all_strings {
            return Err(ApiError::BadRequest(
                "server.cors_allowed_origins must be a list of strings".to_string(),
            ));
        }
    }

    Ok(())
}

fn read_u64(value: &Value, key: &str) -> Option<u64> {
    value.get(key).and_then(Value::as_u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_reasonable_config() {
        let config = json!({
            "index": { "chunk_size": 500, "chunk_overlap": 50 },
            "rag": { "top_k": 4 },
            "llm": { "base_url": "https://api.openai.com" },
            "server": { "cors_allowed_origins": ["http://localhost:3000"] }
        });

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        let config = json!({ "index": { "chunk_size": 100, "chunk_overlap": 100 } });

        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let config = json!({ "llm": { "base_url": "ftp://example.com" } });

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_zero_top_k() {
        let config = json!({ "rag": { "top_k": 0 } });

        assert!(validate_config(&config).is_err());
    }
}
