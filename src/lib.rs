//! # acomms-codec - Bit-Packed Message Codec for Acoustic Telemetry
//!
//! ## Purpose
//!
//! Bandwidth-constrained binary message codec for acoustic and other
//! low-bandwidth telemetry links. Given a schema of named, typed,
//! bounded-size fields, the codec packs field values into the smallest
//! possible bit-exact byte stream and reverses the process exactly. Encoders
//! predict their own output length before writing a single bit; decoders
//! consume exactly that many bits. This size law is what allows fields to be
//! streamed back-to-back with no per-field length markers.
//!
//! ## Architecture Role
//!
//! ```text
//! Caller (value map) → [Codec] → hex wire text → modem / transport
//!        ↑                ↓
//!   Schema load     Registry + Field Codecs + BitBuffer
//!        ↑                ↓
//!   Descriptors     header ++ (optionally encrypted) body
//! ```
//!
//! The codec sits between an external scheduler/middleware (which decides
//! *when* to send, fed by [`Codec::publish_triggers`] and
//! [`Codec::time_triggers`]) and the physical link (which carries the
//! hex-text wire form this crate produces).
//!
//! ## Wire Format
//!
//! Every encoded message is `hex(header_bytes ++ head_bytes ++ body_bytes)`:
//!
//! - **Fixed header** (10 bytes, always plaintext): message ID, timestamp,
//!   source node ID, destination node ID. See [`header::MessageHeader`].
//! - **Head section** (fixed width, plaintext): any schema fields flagged
//!   for the header region. Variable-size codecs are rejected here at
//!   schema-validation time.
//! - **Body** (variable width): bit-packed field payload, optionally run
//!   through a length-preserving stream cipher keyed from a session
//!   passphrase, with the plaintext prefix serving as the per-message nonce.
//!
//! ## Quick Start
//!
//! ```rust
//! use acomms_codec::{Codec, FieldDescriptor, FieldValue, MessageDescriptor, TriggerRule};
//!
//! let mut codec = Codec::new();
//! codec.set_node_id(3);
//!
//! codec.load(vec![MessageDescriptor::new(
//!     "STATUS",
//!     14,
//!     TriggerRule::OnTime { interval_secs: 30 },
//!     vec![
//!         FieldDescriptor::int("depth", 0, 5000),
//!         FieldDescriptor::float("heading", 0.0, 360.0, 1),
//!     ],
//! )]).unwrap();
//!
//! let mut vals = acomms_codec::ValueMap::new();
//! vals.insert("depth".into(), vec![FieldValue::Int(1250)]);
//! vals.insert("heading".into(), vec![FieldValue::Float(274.5)]);
//!
//! let wire = codec.encode("STATUS", &vals)?;
//! let (id, decoded) = codec.decode(&wire)?;
//! assert_eq!(id, 14);
//! assert_eq!(decoded["depth"][0], FieldValue::Int(1250));
//! # Ok::<(), acomms_codec::CodecError>(())
//! ```
//!
//! ## Error Families
//!
//! Failures split into three families so callers can tell "this schema is
//! broken" from "this one message failed":
//!
//! - [`SchemaError`] - raised at load/validate time; fatal to loading that
//!   schema entry but not to the registry as a whole.
//! - [`LookupError`] - message name or numeric ID not registered; per-call,
//!   recoverable.
//! - [`CodecError`] - per-message encode/decode failure (malformed hex,
//!   truncated input, bit-stream exhaustion). Wraps [`LookupError`].
//!
//! All errors are synchronous and propagate immediately; there is no retry
//! inside the codec.

use thiserror::Error;

pub mod buffer;
pub mod codec;
pub mod crypto;
pub mod field;
pub mod header;
pub mod registry;
pub mod schema;
pub mod transform;
pub mod trigger;
pub mod value;

pub use codec::{Codec, Selector};
pub use crypto::CryptoContext;
pub use header::{MessageHeader, HEADER_SIZE, HEAD_DEST_ID, HEAD_SRC_ID, HEAD_TIME};
pub use registry::Registry;
pub use schema::{FieldDescriptor, FieldKind, MessageDescriptor, TriggerRule};
pub use transform::TransformRegistry;
pub use value::{FieldValue, ValueMap};

/// Largest numeric message ID the fixed header can carry.
pub const MAX_MESSAGE_ID: u32 = u16::MAX as u32;

/// Schema-level validation failure.
///
/// Raised when loading descriptors into the [`Registry`]. A `SchemaError`
/// rejects the offending load as a whole; previously loaded messages remain
/// usable.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Two messages claim the same numeric ID (checked across the whole
    /// registry, not just within one load call).
    #[error("duplicate message id {id} specified for '{second}' and '{first}'")]
    DuplicateId {
        id: u32,
        first: String,
        second: String,
    },

    /// A message name was registered twice.
    #[error("duplicate message name '{name}'")]
    DuplicateName { name: String },

    /// Numeric ID does not fit the header's ID width.
    #[error("message '{name}': id {id} exceeds maximum {max}", max = MAX_MESSAGE_ID)]
    IdOutOfRange { name: String, id: u32 },

    /// A field references a transform name nobody registered.
    #[error("message '{message}': field '{field}' uses unknown transform '{transform}'")]
    UnknownTransform {
        message: String,
        field: String,
        transform: String,
    },

    /// A required size parameter is missing for the field's type
    /// (e.g. a string field without a maximum length).
    #[error("field '{field}': missing required parameter: {what}")]
    MissingParameter { field: String, what: &'static str },

    /// Numeric bounds are inverted or otherwise unusable.
    #[error("field '{field}': invalid bounds (min {min} > max {max})")]
    InvalidBounds { field: String, min: i64, max: i64 },

    /// A variable-size codec was placed in the fixed-size header region.
    #[error("field '{field}': variable-size codec cannot be used in the header region")]
    VariableSizeInHeader { field: String },

    /// An array length of zero was configured (scalar fields use length 1).
    #[error("field '{field}': array length must be at least 1")]
    ZeroArrayLength { field: String },

    /// An enumeration field with no labels cannot encode anything.
    #[error("field '{field}': enumeration requires at least one label")]
    EmptyEnum { field: String },
}

/// Message name or numeric ID not present in the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("attempted an operation on message '{0}' which is not loaded")]
    UnknownName(String),

    #[error("attempted an operation on message id {0} which is not loaded")]
    UnknownId(u32),
}

/// Per-message encode/decode failure.
///
/// These abort the single message operation, never the registry.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Wire text is not valid hex.
    #[error("invalid hex in wire input: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Input shorter than the fixed header; nothing can be decoded.
    #[error("truncated wire input: need at least {need} bytes, got {got}")]
    Truncated { need: usize, got: usize },

    /// A decoder asked for more bits than the stream still holds. The body
    /// was present but shorter than a field's declared minimum size.
    #[error("bit stream exhausted: requested {requested} bits, {available} available")]
    OutOfBits { requested: usize, available: usize },

    /// More than 64 bits requested in a single bit-buffer operation;
    /// indicates a misconfigured field width.
    #[error("invalid bit width {0} (maximum 64 per operation)")]
    InvalidBitWidth(usize),

    /// A field codec produced or consumed a different number of bits than
    /// it declared, or a decoded size prefix points past the field's
    /// declared maximum. Surfaced rather than silently aliasing adjacent
    /// fields.
    #[error("field '{field}': moved {actual} bits against declared bound {declared}")]
    SizeLawViolation {
        field: String,
        declared: usize,
        actual: usize,
    },
}

/// Result alias for per-message operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Result alias for schema loading and validation.
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;
