/// Common utility functions used across the node

/// Get current Unix timestamp in seconds
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Encode a ledger amount the way it is stored on disk
pub fn encode_amount(value: i64) -> [u8; 8] {
    value.to_le_bytes()
}

/// Decode an on-disk ledger amount, `None` if the record has the wrong width
pub fn decode_amount(bytes: &[u8]) -> Option<i64> {
    let raw: [u8; 8] = bytes.try_into().ok()?;
    Some(i64::from_le_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_encoding() {
        assert_eq!(decode_amount(&encode_amount(-42)), Some(-42));
        assert_eq!(decode_amount(&encode_amount(i64::MAX)), Some(i64::MAX));
        assert_eq!(decode_amount(&[1, 2, 3]), None);
    }
}
