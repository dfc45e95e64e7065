//! Request DTOs for the HTTP surface
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Request body for POST /cache/invalidate
///
/// # Fields
/// - `pattern`: `"*"` for every key, any other string selects keys containing it
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    pub pattern: String,
}

impl InvalidateRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.pattern.is_empty() {
            // an empty substring would silently match every key
            return Some("Pattern cannot be empty, use \"*\" to invalidate everything".to_string());
        }
        None
    }
}

/// Upper bound on ids accepted by one warmup request
pub const MAX_WARMUP_IDS: usize = 1000;

/// Request body for POST /cache/warmup
#[derive(Debug, Clone, Deserialize)]
pub struct WarmupRequest {
    pub ids: Vec<String>,
}

impl WarmupRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.ids.is_empty() {
            return Some("At least one id is required".to_string());
        }
        if self.ids.len() > MAX_WARMUP_IDS {
            return Some(format!("At most {} ids per warmup", MAX_WARMUP_IDS));
        }
        if self.ids.iter().any(|id| id.trim().is_empty()) {
            return Some("Ids cannot be empty".to_string());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_request_deserialize() {
        let req: InvalidateRequest = serde_json::from_str(r#"{"pattern": "page:abc"}"#).unwrap();
        assert_eq!(req.pattern, "page:abc");
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_validate_empty_pattern() {
        let req = InvalidateRequest {
            pattern: String::new(),
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_warmup_request_validation() {
        let req: WarmupRequest = serde_json::from_str(r#"{"ids": ["abc", "xyz"]}"#).unwrap();
        assert!(req.validate().is_none());

        let empty = WarmupRequest { ids: Vec::new() };
        assert!(empty.validate().is_some());

        let blank = WarmupRequest {
            ids: vec!["abc".to_string(), " ".to_string()],
        };
        assert!(blank.validate().is_some());

        let too_many = WarmupRequest {
            ids: vec!["abc".to_string(); MAX_WARMUP_IDS + 1],
        };
        assert!(too_many.validate().is_some());
    }
}
