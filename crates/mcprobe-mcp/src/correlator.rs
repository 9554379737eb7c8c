//! Request id assignment and reply matching.
//!
//! Each session owns one [`Correlator`]. Ids start at 1 and grow by one per
//! request; notifications never consume an id. At most one request is
//! outstanding at a time, so matching a reply is a comparison against that
//! single id rather than a lookup table.

use crate::error::{McpError, Result};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use serde_json::Value;

/// How a transport pairs replies with requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    /// The reply is the next message on an ordered stream; its id must match.
    Positional,
    /// The reply arrives on the same call as the request (HTTP).
    Implicit,
}

/// Assigns request ids and validates reply ids.
#[derive(Debug)]
pub struct Correlator {
    next_id: u64,
    outstanding: Option<u64>,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

impl Correlator {
    /// Create a correlator whose first id is 1.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            outstanding: None,
        }
    }

    /// Build the next request and mark it outstanding.
    ///
    /// Fails if a previous request has neither been settled nor abandoned.
    pub fn issue(&mut self, method: &str, params: Option<Value>) -> Result<JsonRpcRequest> {
        if let Some(pending) = self.outstanding {
            return Err(McpError::InvalidState {
                operation: "issue a request",
                state: format!("awaiting reply to request {}", pending),
            });
        }
        let id = self.next_id;
        self.next_id += 1;
        self.outstanding = Some(id);
        Ok(JsonRpcRequest::new(id, method, params))
    }

    /// Match a reply against the outstanding request.
    ///
    /// Under [`Correlation::Positional`] the reply id must equal the id just
    /// sent; anything else is a protocol error. Under
    /// [`Correlation::Implicit`] the reply is accepted as-is.
    pub fn settle(
        &mut self,
        response: JsonRpcResponse,
        correlation: Correlation,
    ) -> Result<JsonRpcResponse> {
        let expected = self
            .outstanding
            .take()
            .ok_or_else(|| McpError::protocol("reply received with no request outstanding"))?;

        if response.id == Some(expected) {
            return Ok(response);
        }

        let actual = response
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "null".to_string());

        match correlation {
            Correlation::Positional => Err(McpError::IdMismatch { expected, actual }),
            Correlation::Implicit => {
                tracing::warn!(expected, actual = %actual, "HTTP reply id differs from request id");
                Ok(response)
            }
        }
    }

    /// Drop the outstanding request after its exchange failed.
    pub fn abandon(&mut self) {
        if let Some(id) = self.outstanding.take() {
            tracing::trace!(id, "abandoned outstanding request");
        }
    }

    /// Number of request ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.next_id - 1
    }

    /// Id of the request awaiting a reply, if any.
    pub fn outstanding(&self) -> Option<u64> {
        self.outstanding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply(id: Option<u64>) -> JsonRpcResponse {
        JsonRpcResponse {
            id,
            ..JsonRpcResponse::success(0, json!({}))
        }
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut correlator = Correlator::new();
        let mut ids = Vec::new();
        for _ in 0..5 {
            let req = correlator.issue("tools/call", None).unwrap();
            ids.push(req.id);
            correlator
                .settle(reply(Some(req.id)), Correlation::Positional)
                .unwrap();
        }
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(correlator.issued(), 5);
    }

    #[test]
    fn test_second_request_while_outstanding_is_rejected() {
        let mut correlator = Correlator::new();
        correlator.issue("initialize", None).unwrap();
        let err = correlator.issue("tools/list", None).unwrap_err();
        assert!(matches!(err, McpError::InvalidState { .. }));

        correlator.abandon();
        let req = correlator.issue("tools/list", None).unwrap();
        assert_eq!(req.id, 2);
    }

    #[test]
    fn test_positional_mismatch_is_protocol_error() {
        let mut correlator = Correlator::new();
        correlator.issue("tools/list", None).unwrap();
        let err = correlator
            .settle(reply(Some(9)), Correlation::Positional)
            .unwrap_err();
        assert!(err.is_protocol());
        assert_eq!(correlator.outstanding(), None);
    }

    #[test]
    fn test_positional_null_id_is_mismatch() {
        let mut correlator = Correlator::new();
        correlator.issue("tools/list", None).unwrap();
        match correlator.settle(reply(None), Correlation::Positional) {
            Err(McpError::IdMismatch { expected, actual }) => {
                assert_eq!(expected, 1);
                assert_eq!(actual, "null");
            }
            other => panic!("expected id mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_implicit_accepts_any_id() {
        let mut correlator = Correlator::new();
        correlator.issue("tools/list", None).unwrap();
        assert!(correlator
            .settle(reply(None), Correlation::Implicit)
            .is_ok());
    }

    #[test]
    fn test_unsolicited_reply() {
        let mut correlator = Correlator::new();
        assert!(correlator
            .settle(reply(Some(1)), Correlation::Positional)
            .is_err());
    }
}
