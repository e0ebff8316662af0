//! In-memory AppEngine and Realm Management, answering device data queries
//! with the same filter semantics as the real APIs.

use std::collections::HashMap;

use serde_json::Value;

use crate::datetime::parse_timestamp;

use super::client::{AstarteApi, DeviceDataRequest};
use super::endpoint;
use super::error::ClientError;
use super::types::{DeviceDetails, InterfaceDescriptor, InterfaceVersion};

#[derive(Debug, Default)]
pub struct MockApi {
    devices: HashMap<String, DeviceDetails>,
    interfaces: Vec<InterfaceDescriptor>,
    data: HashMap<(String, String), Value>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interface(mut self, interface: Value) -> Self {
        let interface = serde_json::from_value(interface).expect("invalid interface fixture");
        self.interfaces.push(interface);
        self
    }

    pub fn with_device(mut self, device_id: &str, introspection: &[(&str, u32, u32)]) -> Self {
        let introspection = introspection
            .iter()
            .map(|(name, major, minor)| {
                let version = InterfaceVersion {
                    major: *major,
                    minor: *minor,
                };
                ((*name).to_string(), version)
            })
            .collect();

        let device = DeviceDetails {
            id: device_id.to_string(),
            connected: true,
            introspection,
            aliases: HashMap::new(),
            attributes: HashMap::new(),
            last_connection: None,
            last_disconnection: None,
            total_received_msgs: 0,
            total_received_bytes: 0,
        };
        self.devices.insert(device_id.to_string(), device);
        self
    }

    pub fn with_data(mut self, device_id: &str, interface_name: &str, data: Value) -> Self {
        self.data
            .insert((device_id.to_string(), interface_name.to_string()), data);
        self
    }
}

impl AstarteApi for MockApi {
    async fn get_device_introspection(
        &self,
        device_id: &str,
    ) -> Result<DeviceDetails, ClientError> {
        self.devices
            .get(device_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("/devices/{device_id}")))
    }

    async fn get_interface(
        &self,
        interface_name: &str,
        interface_major: u32,
    ) -> Result<InterfaceDescriptor, ClientError> {
        self.interfaces
            .iter()
            .find(|interface| {
                interface.interface_name == interface_name
                    && interface.version_major == interface_major
            })
            .cloned()
            .ok_or_else(|| {
                ClientError::NotFound(format!("/interfaces/{interface_name}/{interface_major}"))
            })
    }

    async fn get_device_data(&self, request: &DeviceDataRequest) -> Result<Value, ClientError> {
        let path = request.endpoint();
        let not_found = || {
            ClientError::NotFound(format!(
                "/devices/{}/interfaces/{}{path}",
                request.device_id, request.interface_name
            ))
        };

        let data = self
            .data
            .get(&(request.device_id.clone(), request.interface_name.clone()))
            .ok_or_else(not_found)?;

        let data = endpoint::segments(&path)
            .iter()
            .try_fold(data, |data, segment| data.get(segment))
            .ok_or_else(not_found)?;

        Ok(filter(data, request))
    }
}

fn filter(data: &Value, request: &DeviceDataRequest) -> Value {
    match data {
        Value::Object(fields) => fields
            .iter()
            .map(|(key, value)| (key.clone(), filter(value, request)))
            .collect::<serde_json::Map<_, _>>()
            .into(),
        Value::Array(samples) if samples.iter().all(|sample| sample.get("timestamp").is_some()) => {
            let mut samples = samples
                .iter()
                .filter(|sample| {
                    let Some(timestamp) = sample.get("timestamp").and_then(parse_timestamp) else {
                        return false;
                    };
                    request.since.map_or(true, |since| timestamp >= since)
                        && request.since_after.map_or(true, |after| timestamp > after)
                        && request.to.map_or(true, |to| timestamp <= to)
                })
                .cloned()
                .collect::<Vec<_>>();

            if let Some(limit) = request.limit {
                let skip = samples.len().saturating_sub(limit as usize);
                samples.drain(..skip);
            }

            Value::Array(samples)
        }
        value => value.clone(),
    }
}
