//! Header serialization, split by region the way the Lead/Preface/Index
//! layout is split on disk: one module per region, plus an aggregate
//! [`header::Header`] that owns one of each and seals/verifies them
//! together.

pub mod header;
pub mod index;
pub mod lead;
pub mod preface;
pub mod signatures;

pub use header::{Header, HeaderParser, HeaderParsePhase};
pub use lead::Lead;
pub use preface::Preface;
pub use signatures::{SignatureEntry, Signatures};
