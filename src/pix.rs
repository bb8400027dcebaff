//! PIX BR Code ("Copia e Cola") payload encoding.
//!
//! The payload is an EMV-Co Merchant Presented QR Code string as profiled by
//! the Banco Central do Brasil: a flat sequence of tag-length-value fields
//! closed by a CRC-16/CCITT-FALSE trailer (`6304XXXX`).

mod crc;
mod payload;
mod tlv;

pub use crc::{crc16, crc16_hex};
pub use payload::{decode_payload, generate_payload, Amount, BrCode, DecodedPayload};
pub use tlv::{format_field, merchant_account_info, parse_fields, Field, FieldId};

pub const DEFAULT_MERCHANT_NAME: &str = "DOLLYNSTORM";
pub const DEFAULT_MERCHANT_CITY: &str = "BRASILIA";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PixError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Field {id} is too long: {len} > 99")]
    FieldTooLong { id: String, len: usize },
    #[error("Receiver PIX key is empty")]
    EmptyKey,
    #[error("Encoding invariant violated: {0}")]
    EncodingInvariantViolation(String),
    #[error("Malformed payload: {0}")]
    Malformed(String),
    #[error("Checksum mismatch: expected {expected}, found {found}")]
    ChecksumMismatch { expected: String, found: String },
}
