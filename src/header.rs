//! Fixed wire header.
//!
//! Every message on the wire starts with this 10-byte plaintext header:
//! message ID, timestamp, source node, destination node. Layout is a packed
//! little-endian struct so parsing is a zero-copy reinterpretation of the
//! leading bytes. The header always stays in the clear so a receiver can
//! route on ID and addressing before touching the (possibly encrypted)
//! body, and its bytes double as nonce material for the body cipher.

use zerocopy::byteorder::{LittleEndian, U16, U32};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::value::{FieldValue, ValueMap};
use crate::{CodecError, Result};

/// Reserved value-map key: message timestamp, seconds since the Unix epoch.
pub const HEAD_TIME: &str = "_time";
/// Reserved value-map key: sending node ID.
pub const HEAD_SRC_ID: &str = "_src_id";
/// Reserved value-map key: destination node ID.
pub const HEAD_DEST_ID: &str = "_dest_id";

/// Wire size of the fixed header in bytes.
pub const HEADER_SIZE: usize = std::mem::size_of::<MessageHeader>();

/// The fixed plaintext header preceding every encoded message.
#[repr(C, packed)]
#[derive(AsBytes, FromBytes, FromZeroes, Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageHeader {
    message_id: U16<LittleEndian>,
    time: U32<LittleEndian>,
    source: U16<LittleEndian>,
    dest: U16<LittleEndian>,
}

impl MessageHeader {
    pub fn new(message_id: u16, time: u32, source: u16, dest: u16) -> Self {
        Self {
            message_id: U16::new(message_id),
            time: U32::new(time),
            source: U16::new(source),
            dest: U16::new(dest),
        }
    }

    pub fn message_id(&self) -> u16 {
        self.message_id.get()
    }

    pub fn time(&self) -> u32 {
        self.time.get()
    }

    pub fn source(&self) -> u16 {
        self.source.get()
    }

    pub fn dest(&self) -> u16 {
        self.dest.get()
    }

    /// Reinterpret the leading [`HEADER_SIZE`] bytes of `raw` as a header,
    /// returning it together with the remaining payload bytes.
    pub fn parse(raw: &[u8]) -> Result<(Self, &[u8])> {
        let header = Self::read_from_prefix(raw).ok_or(CodecError::Truncated {
            need: HEADER_SIZE,
            got: raw.len(),
        })?;
        Ok((header, &raw[HEADER_SIZE..]))
    }

    /// Surface the header fields under their reserved value-map keys.
    pub fn fill_values(&self, vals: &mut ValueMap) {
        vals.insert(
            HEAD_TIME.to_owned(),
            vec![FieldValue::Int(i64::from(self.time()))],
        );
        vals.insert(
            HEAD_SRC_ID.to_owned(),
            vec![FieldValue::Int(i64::from(self.source()))],
        );
        vals.insert(
            HEAD_DEST_ID.to_owned(),
            vec![FieldValue::Int(i64::from(self.dest()))],
        );
    }
}
