//! Request types for the reconciliation API.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Request body for `POST /tenants/:tenant_id/runs`.
///
/// The body is optional; without it the run uses the server's local time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    /// The run's notion of "now", in device local time.
    #[serde(default)]
    pub now: Option<NaiveDateTime>,
}

/// Request body for `POST /tenants/:tenant_id/reprocess`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReprocessRequest {
    /// First shift date to reprocess (inclusive).
    pub from: NaiveDate,
    /// Last shift date to reprocess (inclusive).
    pub to: NaiveDate,
    /// The run's notion of "now", in device local time.
    #[serde(default)]
    pub now: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_run_request() {
        let request: RunRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request, RunRequest::default());
    }

    #[test]
    fn test_deserialize_run_request_with_now() {
        let request: RunRequest = serde_json::from_str(r#"{"now": "2026-01-16T08:00:00"}"#).unwrap();
        assert_eq!(
            request.now.unwrap().to_string(),
            "2026-01-16 08:00:00"
        );
    }

    #[test]
    fn test_deserialize_reprocess_request() {
        let json = r#"{
            "from": "2026-01-13",
            "to": "2026-01-19"
        }"#;

        let request: ReprocessRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.from.to_string(), "2026-01-13");
        assert_eq!(request.to.to_string(), "2026-01-19");
        assert!(request.now.is_none());
    }

    #[test]
    fn test_reprocess_request_requires_range() {
        let result: Result<ReprocessRequest, _> = serde_json::from_str(r#"{"from": "2026-01-13"}"#);
        assert!(result.unwrap_err().to_string().contains("missing field `to`"));
    }
}
