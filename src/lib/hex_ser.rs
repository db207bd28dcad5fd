//! `serde::Serialize` helper for hex-encoding byte fields (digests,
//! signature payloads). Only compiled under the `serde` feature, where the
//! `hex` dependency becomes available.

#![cfg(feature = "serde")]

use serde::Serializer;

pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

pub fn serialize_opt<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(b) => serializer.serialize_some(&hex::encode(b)),
        None => serializer.serialize_none(),
    }
}
