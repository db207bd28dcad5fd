//! Variable-length unsigned integer encoding used throughout the header:
//! little-endian base-128 with continuation. Each byte carries 7 payload
//! bits in its low bits; the byte whose high bit is set terminates the
//! number.

use crate::constants::COMPINT_MAX_BYTES;
use crate::error::{ZchunkError, ZchunkErrorKind};
use crate::Result;

/// Encodes `value` as a CompInt. Zero encodes as the single byte `0x80`
/// (value 0, terminator bit set). Encoded length is `ceil(log128(value+1))`
/// with a minimum of one byte.
pub fn encode(mut value: u64) -> Vec<u8> {
	let mut out = Vec::with_capacity(4);
	loop {
		let mut byte = (value & 0x7f) as u8;
		value >>= 7;
		if value == 0 {
			byte |= 0x80;
			out.push(byte);
			break;
		}
		out.push(byte);
	}
	out
}

/// Decodes a CompInt from the front of `data`. `max_len` bounds how many
/// bytes the number may span before decoding gives up with `Truncated`;
/// callers pass the number of bytes remaining in the declared header
/// region. Returns the decoded value and the number of bytes consumed.
pub fn decode(data: &[u8], max_len: usize) -> Result<(u64, usize)> {
	let mut value: u64 = 0;
	let mut consumed = 0usize;

	loop {
		if consumed >= max_len || consumed >= data.len() {
			return Err(ZchunkError::new(ZchunkErrorKind::Decode, crate::constants::ERROR_COMPINT_TRUNCATED));
		}
		let byte = data[consumed];
		consumed += 1;
		if consumed > COMPINT_MAX_BYTES {
			return Err(ZchunkError::new(ZchunkErrorKind::Decode, crate::constants::ERROR_COMPINT_OVERFLOW));
		}

		let payload = (byte & 0x7f) as u64;
		let shift = (consumed - 1) * 7;
		if shift >= 64 || (payload != 0 && shift > 63) {
			return Err(ZchunkError::new(ZchunkErrorKind::Decode, crate::constants::ERROR_COMPINT_OVERFLOW));
		}
		let contribution = payload.checked_shl(shift as u32).unwrap_or(0);
		let new_value = value.checked_add(contribution).ok_or_else(|| {
			ZchunkError::new(ZchunkErrorKind::Decode, crate::constants::ERROR_COMPINT_OVERFLOW)
		})?;
		// any high bits that don't fit in u64 signal overflow
		if shift < 64 && payload != 0 && (contribution >> shift) != payload {
			return Err(ZchunkError::new(ZchunkErrorKind::Decode, crate::constants::ERROR_COMPINT_OVERFLOW));
		}
		value = new_value;

		if byte & 0x80 != 0 {
			return Ok((value, consumed));
		}
	}
}

#[cfg(test)]
mod proptests {
	use super::*;
	use proptest::prelude::*;

	proptest! {
		#[test]
		fn round_trips_any_u64(v in any::<u64>()) {
			let encoded = encode(v);
			let (decoded, consumed) = decode(&encoded, encoded.len()).unwrap();
			prop_assert_eq!(decoded, v);
			prop_assert_eq!(consumed, encoded.len());
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zero_is_single_terminator_byte() {
		assert_eq!(encode(0), vec![0x80]);
	}

	#[test]
	fn round_trips_boundary_values() {
		for &v in &[0u64, 1, 127, 128, 16383, 16384, u32::MAX as u64, (1u64 << 63) - 1] {
			let encoded = encode(v);
			let (decoded, consumed) = decode(&encoded, encoded.len()).unwrap();
			assert_eq!(decoded, v);
			assert_eq!(consumed, encoded.len());
		}
	}

	#[test]
	fn decode_fails_without_terminator_within_max_len() {
		// Three non-terminated bytes, no terminator anywhere in the slice.
		let data = [0x01, 0x02, 0x03];
		let err = decode(&data, 3).unwrap_err();
		assert_eq!(err.kind(), ZchunkErrorKind::Decode);
	}

	#[test]
	fn decode_stops_at_max_len_even_with_more_data_available() {
		// Terminator is the 4th byte, but max_len only allows 3.
		let data = [0x01, 0x02, 0x03, 0x84];
		let err = decode(&data, 3).unwrap_err();
		assert_eq!(err.kind(), ZchunkErrorKind::Decode);
	}

	#[test]
	fn multi_byte_encoding_matches_expected_length() {
		// 128 needs two bytes: low 7 bits = 0, continuation; then 1, terminator.
		assert_eq!(encode(128), vec![0x00, 0x81]);
		assert_eq!(encode(127), vec![0xff]);
	}
}
