use alloy::primitives::Address;
use std::str::FromStr;

/// Parse a `0x`-prefixed, 40 hex-digit address.
///
/// All-lowercase and all-uppercase forms are accepted as-is; mixed case must
/// carry a valid EIP-55 checksum.
pub fn parse_address(input: &str) -> Option<Address> {
    let hex_part = input.strip_prefix("0x")?;
    if hex_part.len() != 40 {
        return None;
    }

    let address = Address::from_str(input).ok()?;

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && address.to_checksum(None) != input {
        return None;
    }

    Some(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKSUMMED: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

    #[test]
    fn test_accepts_checksummed_and_single_case() {
        assert!(parse_address(CHECKSUMMED).is_some());
        assert!(parse_address(&CHECKSUMMED.to_lowercase()).is_some());
        assert!(parse_address(&format!("0x{}", CHECKSUMMED[2..].to_uppercase())).is_some());
    }

    #[test]
    fn test_rejects_bad_checksum() {
        // flip the case of one letter
        let bad = CHECKSUMMED.replacen("A0b", "A0B", 1);
        assert!(parse_address(&bad).is_none());
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(parse_address("not-an-address").is_none());
        assert!(parse_address("0x1234").is_none());
        assert!(parse_address(&CHECKSUMMED[2..]).is_none());
        assert!(parse_address("0xZZb86991c6218b36c1d19D4a2e9Eb0cE3606eB48").is_none());
    }
}
