//! 128-bit word packing used by chains that carry byte arrays as a byte
//! length, a word count and a sequence of `u128` words.

use crate::CodecError;

const WORD_BYTES: usize = 16;

/// Number of 16-byte words needed to hold `size` bytes.
pub fn word_count(size: usize) -> usize {
	size.div_ceil(WORD_BYTES)
}

/// Packs bytes into big-endian 16-byte words. A trailing partial word is
/// left-aligned and zero-filled on the right.
pub fn pack_words(bytes: &[u8]) -> (usize, Vec<u128>) {
	let words = bytes
		.chunks(WORD_BYTES)
		.map(|chunk| {
			let mut word = [0u8; WORD_BYTES];
			word[..chunk.len()].copy_from_slice(chunk);
			u128::from_be_bytes(word)
		})
		.collect();
	(bytes.len(), words)
}

/// Reconstitutes the byte array from its words.
///
/// Adjacent words concatenate in order, so each 32-byte field of the payload
/// is `words[2i] || words[2i + 1]`. Bytes past `size` in the last word are
/// dropped.
pub fn unpack_words(size: usize, words: &[u128]) -> Result<Vec<u8>, CodecError> {
	let expected = word_count(size);
	if words.len() != expected {
		return Err(CodecError::FieldCount {
			expected,
			actual: words.len(),
		});
	}

	let mut bytes: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
	bytes.truncate(size);
	Ok(bytes)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_pack_left_aligns_partial_word() {
		let (size, words) = pack_words(&[0xaa; 17]);
		assert_eq!(size, 17);
		assert_eq!(words.len(), 2);
		assert_eq!(words[0], u128::from_be_bytes([0xaa; 16]));
		assert_eq!(words[1], 0xaa << 120);
	}

	#[test]
	fn test_unpack_pairs_form_fields() {
		let mut field = [0u8; 32];
		field[15] = 0x01;
		field[31] = 0x02;
		let (size, words) = pack_words(&field);
		assert_eq!(words, vec![1, 2]);
		assert_eq!(unpack_words(size, &words).unwrap(), field.to_vec());
	}

	#[test]
	fn test_word_roundtrip_odd_sizes() {
		for len in [0usize, 1, 15, 16, 31, 272, 448] {
			let bytes: Vec<u8> = (0..len).map(|i| i as u8).collect();
			let (size, words) = pack_words(&bytes);
			assert_eq!(words.len(), word_count(len));
			assert_eq!(unpack_words(size, &words).unwrap(), bytes);
		}
	}

	#[test]
	fn test_unpack_rejects_count_mismatch() {
		let err = unpack_words(33, &[0, 0]).unwrap_err();
		assert_eq!(
			err,
			CodecError::FieldCount {
				expected: 3,
				actual: 2
			}
		);
	}
}
