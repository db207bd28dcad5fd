// - STD
use std::array::TryFromSliceError;
use std::fmt;

/// The main error type of this crate.
#[derive(Debug)]
pub struct ZchunkError {
	details: String,
	source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
	kind: ZchunkErrorKind,
	/// Whether the context that produced this error should poison itself.
	/// Integrity errors are recoverable inside the delta engine (the chunk
	/// is zeroed and re-queued) but fatal on the plain read path, so
	/// recoverability is a property of the call site, not of the kind alone.
	recoverable: bool,
}

impl ZchunkError {
	/// Creates a new fatal error of the given kind.
	pub fn new<S: Into<String>>(kind: ZchunkErrorKind, details: S) -> Self {
		Self {
			kind,
			source: None,
			details: details.into(),
			recoverable: false,
		}
	}

	/// Creates a new fatal error of the given kind, chained to an underlying cause.
	pub fn new_with_source<S: Into<String>>(
		kind: ZchunkErrorKind,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		details: S,
	) -> Self {
		Self {
			kind,
			source,
			details: details.into(),
			recoverable: false,
		}
	}

	/// Creates a recoverable error of the given kind (see [`ZchunkError::is_recoverable`]).
	pub fn new_recoverable<S: Into<String>>(kind: ZchunkErrorKind, details: S) -> Self {
		Self {
			kind,
			source: None,
			details: details.into(),
			recoverable: true,
		}
	}

	/// Returns the kind of this error.
	pub fn kind(&self) -> ZchunkErrorKind {
		self.kind.clone()
	}

	/// Returns a reference to the kind of this error.
	pub fn kind_ref(&self) -> &ZchunkErrorKind {
		&self.kind
	}

	/// Returns whether the originating context may continue after this error
	/// (true) or must latch it and refuse further calls (false).
	pub fn is_recoverable(&self) -> bool {
		self.recoverable
	}

	/// Returns a copy of this error suitable for re-returning from a poisoned
	/// context on every subsequent call. The `source` chain is dropped since
	/// boxed trait objects are not `Clone`.
	pub fn latch(&self) -> Self {
		Self {
			kind: self.kind.clone(),
			source: None,
			details: self.details.clone(),
			recoverable: false,
		}
	}
}

impl std::error::Error for ZchunkError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		self.source.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
	}
}

impl fmt::Display for ZchunkError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.kind, self.details)
	}
}

impl From<std::io::Error> for ZchunkError {
	fn from(e: std::io::Error) -> ZchunkError {
		let err_msg = e.to_string();
		ZchunkError::new_with_source(ZchunkErrorKind::Io, Some(Box::new(e)), err_msg)
	}
}

impl From<TryFromSliceError> for ZchunkError {
	fn from(e: TryFromSliceError) -> ZchunkError {
		let err_msg = e.to_string();
		ZchunkError::new_with_source(ZchunkErrorKind::Decode, Some(Box::new(e)), err_msg)
	}
}

impl From<regex::Error> for ZchunkError {
	fn from(e: regex::Error) -> ZchunkError {
		let err_msg = e.to_string();
		ZchunkError::new_with_source(ZchunkErrorKind::Config, Some(Box::new(e)), err_msg)
	}
}

/// Kinds of errors produced by this crate, matching the taxonomy in the
/// format's error-handling design: config, decode, integrity, I/O and
/// transport, plus a catch-all for conversions that don't map cleanly onto
/// any of those five.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZchunkErrorKind {
	/// Invalid option, unsupported codec/hash on this build, or a bad
	/// combination of options.
	Config,
	/// Magic mismatch, compint overflow, truncated header, header-digest
	/// mismatch, or an otherwise impossible index shape.
	Decode,
	/// Chunk digest mismatch or full-data digest mismatch.
	Integrity,
	/// Read/write/seek failure on the backing descriptor.
	Io,
	/// Fetch returned an unexpected status, multipart parse failed, or a
	/// range was truncated in flight.
	Transport,
	/// Anything else.
	Other,
}

impl fmt::Display for ZchunkErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let msg = match self {
			ZchunkErrorKind::Config => "Config",
			ZchunkErrorKind::Decode => "Decode",
			ZchunkErrorKind::Integrity => "Integrity",
			ZchunkErrorKind::Io => "Io",
			ZchunkErrorKind::Transport => "Transport",
			ZchunkErrorKind::Other => "Other",
		};
		write!(f, "{}", msg)
	}
}
