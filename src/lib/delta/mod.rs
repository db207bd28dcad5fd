//! The delta/resume engine: diffs a target header against a donor or a
//! partially populated local file, plans the byte ranges still missing, and
//! places incoming bytes (raw or multipart) at the right offset while
//! re-verifying each chunk as it lands.

pub mod engine;
pub mod multipart;
pub mod range;

pub use engine::DeltaEngine;
pub use multipart::{MultipartDispatcher, MultipartEvent, MultipartPhase};
pub use range::RangeSet;
