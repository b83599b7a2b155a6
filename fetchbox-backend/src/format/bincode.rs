use bytes::Bytes;
use fetchbox_core::{CachedResponse, Raw};

use super::{Format, FormatError, FormatTypeId};

/// Bincode format
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeFormat;

impl Format for BincodeFormat {
    fn serialize(&self, value: &CachedResponse) -> Result<Raw, FormatError> {
        ::bincode::serde::encode_to_vec(value, ::bincode::config::standard())
            .map(Bytes::from)
            .map_err(|e| FormatError::Serialize(Box::new(e)))
    }

    fn deserialize(&self, data: &[u8]) -> Result<CachedResponse, FormatError> {
        let (value, _read) =
            ::bincode::serde::decode_from_slice(data, ::bincode::config::standard())
                .map_err(|e| FormatError::Deserialize(Box::new(e)))?;
        Ok(value)
    }

    fn clone_box(&self) -> Box<dyn Format> {
        Box::new(*self)
    }

    fn format_type_id(&self) -> FormatTypeId {
        FormatTypeId::Bincode
    }
}
