use serde::Deserialize;

use crate::account::UserId;
use crate::errors::LedgerError;

/// Largest purchase body accepted, in bytes
pub const MAX_PAYLOAD_SIZE: usize = 4096;

/// Wire shape of a purchase body: `{"token": <integer>}`
///
/// A missing `token` reads as `0` and is turned away by the executor.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseRequest {
    #[serde(default)]
    pub token: i64,
}

/// A purchase intent that decoded cleanly for a known user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPurchase {
    pub user_id: UserId,
    pub amount: i64,
}

/// Turns raw purchase payloads into [`ValidatedPurchase`] values.
///
/// Only the shape is checked here. Whether the amount is acceptable is the
/// executor's call, since it is the one holding the balance.
pub struct RequestValidator {
    max_payload_size: usize,
}

impl RequestValidator {
    pub fn new() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD_SIZE,
        }
    }

    pub fn with_limits(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }

    /// Decode the first JSON value in `payload`; anything after it is ignored.
    pub fn validate(&self, user_id: UserId, payload: &[u8]) -> Result<ValidatedPurchase, LedgerError> {
        self.validate_size(payload)?;
        let request = serde_json::Deserializer::from_slice(payload)
            .into_iter::<PurchaseRequest>()
            .next()
            .ok_or_else(|| LedgerError::MalformedRequest("Empty payload".to_string()))??;

        Ok(ValidatedPurchase {
            user_id,
            amount: request.token,
        })
    }

    fn validate_size(&self, payload: &[u8]) -> Result<(), LedgerError> {
        if payload.len() > self.max_payload_size {
            return Err(LedgerError::MalformedRequest(format!(
                "Payload size {} exceeds maximum {}",
                payload.len(),
                self.max_payload_size
            )));
        }
        Ok(())
    }
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    #[test]
    fn test_valid_payload() {
        let validator = RequestValidator::new();
        let purchase = validator.validate(alice(), br#"{"token": 30}"#).unwrap();

        assert_eq!(purchase.user_id, alice());
        assert_eq!(purchase.amount, 30);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let validator = RequestValidator::new();
        let purchase = validator.validate(alice(), br#"{"token": 2, "note": "hi"}"#).unwrap();
        assert_eq!(purchase.amount, 2);
    }

    #[test]
    fn test_missing_token_reads_as_zero() {
        let validator = RequestValidator::new();
        assert_eq!(validator.validate(alice(), br#"{}"#).unwrap().amount, 0);
        assert_eq!(validator.validate(alice(), br#"{"amount": 10}"#).unwrap().amount, 0);
    }

    #[test]
    fn test_trailing_data_ignored() {
        let validator = RequestValidator::new();
        let purchase = validator.validate(alice(), br#"{"token": 30} trailing"#).unwrap();
        assert_eq!(purchase.amount, 30);

        let purchase = validator.validate(alice(), b"{\"token\": 7}\n{\"token\": 9}").unwrap();
        assert_eq!(purchase.amount, 7);
    }

    #[test]
    fn test_amount_sign_not_checked_here() {
        let validator = RequestValidator::new();
        assert_eq!(validator.validate(alice(), br#"{"token": -5}"#).unwrap().amount, -5);
        assert_eq!(validator.validate(alice(), br#"{"token": 0}"#).unwrap().amount, 0);
    }

    #[test]
    fn test_malformed_payloads() {
        let validator = RequestValidator::new();
        let cases: [&[u8]; 6] = [
            b"",
            b"   ",
            b"not json",
            br#"{"token": "30"}"#,
            br#"{"token": 1.5}"#,
            br#"trailing {"token": 30}"#,
        ];

        for payload in cases {
            let result = validator.validate(alice(), payload);
            assert!(
                matches!(result, Err(LedgerError::MalformedRequest(_))),
                "payload {:?} should be rejected",
                String::from_utf8_lossy(payload)
            );
        }
    }

    #[test]
    fn test_oversized_payload() {
        let validator = RequestValidator::with_limits(8);
        let result = validator.validate(alice(), br#"{"token": 30}"#);
        assert!(matches!(result, Err(LedgerError::MalformedRequest(_))));
    }
}
