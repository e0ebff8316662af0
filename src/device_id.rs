//! Astarte device ids are 128 bit values written as unpadded base64url
//! (22 characters), which makes them interchangeable with UUIDs.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceIdError {
    #[error("device id is not valid base64url: {0}")]
    Encoding(String),

    #[error("device id must encode 16 bytes, got {0}")]
    Length(usize),
}

pub fn device_id_to_uuid(device_id: &str) -> Result<Uuid, DeviceIdError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(device_id.trim())
        .map_err(|err| DeviceIdError::Encoding(err.to_string()))?;

    Uuid::from_slice(&bytes).map_err(|_| DeviceIdError::Length(bytes.len()))
}

pub fn validate_device_id(device_id: &str) -> Result<(), DeviceIdError> {
    device_id_to_uuid(device_id).map(|_| ())
}

pub fn uuid_to_device_id(uuid: Uuid) -> String {
    URL_SAFE_NO_PAD.encode(uuid.as_bytes())
}

pub fn random_device_id() -> String {
    uuid_to_device_id(Uuid::new_v4())
}

/// A stable device id derived from a name, e.g. a serial number, within a
/// namespace picked by the operator.
pub fn device_id_from_name(namespace: Uuid, name: &str) -> String {
    uuid_to_device_id(Uuid::new_v5(&namespace, name.as_bytes()))
}
