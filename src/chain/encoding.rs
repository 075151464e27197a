//! Identifier encodings used by the DapiServer contract.

use alloy::primitives::{keccak256, Address, B256};

use crate::chain::types::{ChainError, ChainResult};

/// Encode a dAPI name as a right-padded bytes32 string (31 bytes max, NUL terminated).
pub fn dapi_name_to_bytes32(name: &str) -> ChainResult<B256> {
    let bytes = name.as_bytes();
    if bytes.len() > 31 {
        return Err(ChainError::InvalidDapiName(name.to_string()));
    }
    let mut out = [0u8; 32];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(B256::from(out))
}

/// Beacon id for an Airnode/template pair: `keccak256(abi.encodePacked(airnode, templateId))`.
pub fn beacon_id(airnode: Address, template_id: B256) -> B256 {
    let mut packed = [0u8; 52];
    packed[..20].copy_from_slice(airnode.as_slice());
    packed[20..].copy_from_slice(template_id.as_slice());
    keccak256(packed)
}

/// Strict `0x`-prefixed 32-byte hex.
pub fn parse_bytes32(value: &str) -> Option<B256> {
    parse_prefixed_hex(value, 64)?.parse().ok()
}

/// Strict `0x`-prefixed 20-byte hex.
pub fn parse_address(value: &str) -> Option<Address> {
    parse_prefixed_hex(value, 40)?.parse().ok()
}

fn parse_prefixed_hex(value: &str, digits: usize) -> Option<&str> {
    let hex = value.strip_prefix("0x")?;
    if hex.len() == digits && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(value)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BEACON: &str = "0x09a5873667837598bd0990ba2f53d750d545ce435ecdcd44e0b4c64ab7d7d20d";

    #[test]
    fn test_dapi_name_padding() {
        let encoded = dapi_name_to_bytes32("ETH/USD").unwrap();
        assert_eq!(
            encoded.to_string(),
            "0x4554482f55534400000000000000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn test_dapi_name_length_limit() {
        assert!(dapi_name_to_bytes32(&"A".repeat(31)).is_ok());
        assert!(matches!(
            dapi_name_to_bytes32(&"A".repeat(32)),
            Err(ChainError::InvalidDapiName(_))
        ));
    }

    #[test]
    fn test_beacon_id_is_packed_keccak() {
        let airnode: Address = "0x6238772544f029ecaBfDED4300f13A3c4FE84E1D".parse().unwrap();
        let template = parse_bytes32(BEACON).unwrap();

        let mut expected = Vec::with_capacity(52);
        expected.extend_from_slice(airnode.as_slice());
        expected.extend_from_slice(template.as_slice());

        assert_eq!(beacon_id(airnode, template), keccak256(&expected));
        assert_ne!(beacon_id(Address::ZERO, template), beacon_id(airnode, template));
    }

    #[test]
    fn test_strict_hex_parsing() {
        assert!(parse_bytes32(BEACON).is_some());
        assert!(parse_bytes32(&BEACON[2..]).is_none());
        assert!(parse_bytes32(&BEACON[..65]).is_none());
        assert!(parse_bytes32(&BEACON.replace('a', "g")).is_none());

        assert!(parse_address("0x6238772544f029ecaBfDED4300f13A3c4FE84E1D").is_some());
        assert!(parse_address("6238772544f029ecaBfDED4300f13A3c4FE84E1D").is_none());
        assert!(parse_address(BEACON).is_none());
    }
}
