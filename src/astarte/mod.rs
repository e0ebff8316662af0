pub mod client;
pub mod endpoint;
pub mod error;
#[cfg(test)]
pub mod mock;
pub mod types;
pub mod value;

pub use client::{AstarteApi, AstarteClient, DeviceDataRequest};
pub use error::ClientError;
pub use types::InterfaceDescriptor;
pub use value::AstarteValue;
