use alloy::primitives::U256;
use bigdecimal::num_bigint::{BigInt, Sign};
use bigdecimal::BigDecimal;

const ETH_DECIMALS: i64 = 18;

/// Exact wei -> ETH conversion. No floating point is involved.
pub fn wei_to_eth(wei: U256) -> BigDecimal {
    let digits = BigInt::from_bytes_be(Sign::Plus, &wei.to_be_bytes::<32>());
    BigDecimal::new(digits, ETH_DECIMALS)
}

/// Render an ETH amount without trailing zeros or exponent notation (`25`, `2.5`, `0.001`).
pub fn format_eth(value: &BigDecimal) -> String {
    value.normalized().to_plain_string()
}
