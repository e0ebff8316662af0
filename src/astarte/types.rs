use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::endpoint;
use super::value::AstarteDataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceType {
    Properties,
    Datastream,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Individual,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ownership {
    Device,
    Server,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reliability {
    #[default]
    Unreliable,
    Guaranteed,
    Unique,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Retention {
    #[default]
    Discard,
    Volatile,
    Stored,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseRetentionPolicy {
    #[default]
    NoTtl,
    UseTtl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    pub endpoint: String,
    #[serde(rename = "type")]
    pub mapping_type: AstarteDataType,
    #[serde(default)]
    pub reliability: Reliability,
    #[serde(default)]
    pub retention: Retention,
    #[serde(default)]
    pub expiry: u32,
    #[serde(default)]
    pub database_retention_policy: DatabaseRetentionPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_retention_ttl: Option<u32>,
    #[serde(default)]
    pub allow_unset: bool,
    #[serde(default)]
    pub explicit_timestamp: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// An interface as installed in a realm. A given `(interface_name,
/// version_major)` pair never changes once installed, minor versions may
/// only add mappings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    pub interface_name: String,
    pub version_major: u32,
    pub version_minor: u32,
    #[serde(rename = "type")]
    pub interface_type: InterfaceType,
    pub ownership: Ownership,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default)]
    pub mappings: Vec<Mapping>,
}

impl InterfaceDescriptor {
    /// The mapping whose endpoint covers `path`, if any.
    pub fn find_mapping(&self, path: &str) -> Option<&Mapping> {
        self.mappings
            .iter()
            .find(|mapping| endpoint::matches(&mapping.endpoint, path))
    }

    pub fn mapping_type(&self, path: &str) -> AstarteDataType {
        self.find_mapping(path)
            .map_or(AstarteDataType::Unknown, |mapping| mapping.mapping_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceVersion {
    pub major: u32,
    pub minor: u32,
}

/// Device status as returned by AppEngine, limited to what the dashboard
/// displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDetails {
    pub id: String,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub introspection: HashMap<String, InterfaceVersion>,
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub last_connection: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_disconnection: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_received_msgs: u64,
    #[serde(default)]
    pub total_received_bytes: u64,
}

impl DeviceDetails {
    pub fn installed_major(&self, interface_name: &str) -> Option<u32> {
        self.introspection
            .get(interface_name)
            .map(|version| version.major)
    }
}
