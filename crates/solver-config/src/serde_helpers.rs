//! Serde helpers for configuration deserialization

use alloy::primitives::B256;
use serde::{Deserialize, Deserializer, Serializer};

/// Parses a `0x`-prefixed hex identifier of at most 32 bytes into a
/// zero-extended 32-byte word. Accepts odd digit counts, as Starknet
/// addresses are commonly written without leading zeros.
pub fn parse_word(value: &str) -> Result<B256, String> {
	let digits = value
		.strip_prefix("0x")
		.ok_or_else(|| format!("'{}' must start with 0x", value))?;
	if digits.is_empty() || digits.len() > 64 {
		return Err(format!("'{}' must encode between 1 and 32 bytes", value));
	}

	let padded = format!("{:0>64}", digits);
	let bytes = hex::decode(&padded).map_err(|e| format!("'{}' is not valid hex: {}", value, e))?;
	Ok(B256::from_slice(&bytes))
}

/// Deserializes a hex identifier into a zero-extended 32-byte word.
pub fn deserialize_word<'de, D>(deserializer: D) -> Result<B256, D::Error>
where
	D: Deserializer<'de>,
{
	let value = String::deserialize(deserializer)?;
	parse_word(&value).map_err(serde::de::Error::custom)
}

/// Serializes a 32-byte word as full-width hex.
pub fn serialize_word<S>(word: &B256, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.serialize_str(&format!("0x{}", hex::encode(word)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde::{Deserialize, Serialize};

	#[derive(Debug, Deserialize, Serialize)]
	struct TestStruct {
		#[serde(deserialize_with = "deserialize_word", serialize_with = "serialize_word")]
		settler: B256,
	}

	#[test]
	fn test_evm_address_is_zero_extended() {
		let parsed: TestStruct =
			toml::from_str(r#"settler = "0x5FbDB2315678afecb367f032d93F642f64180aa3""#).unwrap();

		assert!(parsed.settler[..12].iter().all(|b| *b == 0));
		assert_eq!(parsed.settler[12], 0x5f);
		assert_eq!(parsed.settler[31], 0xa3);
	}

	#[test]
	fn test_odd_length_felt_is_accepted() {
		let word = parse_word("0x123").unwrap();
		assert_eq!(word[30], 0x01);
		assert_eq!(word[31], 0x23);
	}

	#[test]
	fn test_rejects_bad_words() {
		assert!(parse_word("1234").is_err());
		assert!(parse_word("0x").is_err());
		assert!(parse_word("0xzz").is_err());
		assert!(parse_word(&format!("0x{}", "1".repeat(65))).is_err());
	}

	#[test]
	fn test_serialize_roundtrip() {
		let original = TestStruct {
			settler: B256::repeat_byte(0xab),
		};
		let rendered = toml::to_string(&original).unwrap();
		let parsed: TestStruct = toml::from_str(&rendered).unwrap();
		assert_eq!(parsed.settler, original.settler);
	}
}
