//! Value formats for stored response snapshots.
//!
//! A [`Format`] turns a [`CachedResponse`] into bytes and back. The trait is
//! object safe so backends can hand out `&dyn Format`.
//!
//! | Format | Notes |
//! |--------|-------|
//! | [`JsonFormat`] | Default. Human readable, larger. |
//! | [`BincodeFormat`] | Compact binary, `bincode` standard config. |

use fetchbox_core::{CachedResponse, Raw};
use thiserror::Error;

mod bincode;
mod json;

pub use bincode::BincodeFormat;
pub use json::JsonFormat;

/// Serialization failure.
#[derive(Error, Debug)]
pub enum FormatError {
    /// Encoding a snapshot failed.
    #[error(transparent)]
    Serialize(Box<dyn std::error::Error + Send + Sync>),

    /// Decoding stored bytes failed.
    #[error(transparent)]
    Deserialize(Box<dyn std::error::Error + Send + Sync>),
}

/// Unique identifier for format types, used to compare format equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTypeId {
    /// [`JsonFormat`].
    Json,
    /// [`BincodeFormat`].
    Bincode,
    /// For user-defined custom formats. The string should be a unique identifier.
    Custom(&'static str),
}

/// Object-safe value format.
pub trait Format: std::fmt::Debug + Send + Sync {
    /// Encodes a response snapshot.
    fn serialize(&self, value: &CachedResponse) -> Result<Raw, FormatError>;

    /// Decodes a response snapshot.
    fn deserialize(&self, data: &[u8]) -> Result<CachedResponse, FormatError>;

    /// Clone this format into a box (for object safety).
    fn clone_box(&self) -> Box<dyn Format>;

    /// Returns a unique identifier for this format type.
    fn format_type_id(&self) -> FormatTypeId;
}

impl Clone for Box<dyn Format> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn snapshot() -> CachedResponse {
        CachedResponse {
            status: 200,
            headers: vec![("content-type".to_owned(), Bytes::from_static(b"application/json"))],
            body: Bytes::from_static(br#"{"id":42}"#),
        }
    }

    #[test]
    fn formats_restore_the_snapshot() {
        let formats: [Box<dyn Format>; 2] = [Box::new(JsonFormat), Box::new(BincodeFormat)];
        for format in formats {
            let raw = format.serialize(&snapshot()).expect("serialize");
            let restored = format.deserialize(&raw).expect("deserialize");
            assert_eq!(restored, snapshot(), "{:?}", format.format_type_id());
        }
    }

    #[test]
    fn garbage_is_a_deserialize_error() {
        let err = JsonFormat.deserialize(b"not json").unwrap_err();
        assert!(matches!(err, FormatError::Deserialize(_)));
        let err = BincodeFormat.deserialize(&[0xff]).unwrap_err();
        assert!(matches!(err, FormatError::Deserialize(_)));
    }

    #[test]
    fn bincode_is_smaller_than_json() {
        let json = JsonFormat.serialize(&snapshot()).expect("json");
        let bincode = BincodeFormat.serialize(&snapshot()).expect("bincode");
        assert!(bincode.len() < json.len());
    }
}
