use chrono::{DateTime, Utc};
use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::astarte::value::{AstarteDataType, AstarteValue};
use crate::datetime::format_timestamp;

use super::{DataTree, LeafData, NodeContent, ObjectSample, TreeNode};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyRecord {
    pub endpoint: String,
    #[serde(rename = "type")]
    pub data_type: AstarteDataType,
    pub value: AstarteValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndividualRecord {
    pub endpoint: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub data_type: AstarteDataType,
    pub value: AstarteValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectRecord {
    pub endpoint: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(serialize_with = "serialize_fields")]
    pub value: Vec<(String, AstarteValue)>,
}

/// A row of the tabular view of a tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LinearizedRecord {
    Property(PropertyRecord),
    Individual(IndividualRecord),
    Object(ObjectRecord),
}

impl LinearizedRecord {
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Property(record) => &record.endpoint,
            Self::Individual(record) => &record.endpoint,
            Self::Object(record) => &record.endpoint,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Property(_) => None,
            Self::Individual(record) => Some(record.timestamp),
            Self::Object(record) => Some(record.timestamp),
        }
    }
}

impl DataTree {
    /// One record per leaf and per sample. Leaves come in pre-order and
    /// samples in the order they were received.
    pub fn to_linearized_data(&self) -> Vec<LinearizedRecord> {
        let mut records = Vec::new();

        for node in self.leaves() {
            let Some(leaf) = node.leaf() else {
                continue;
            };

            match leaf {
                LeafData::Property(value) => {
                    records.push(LinearizedRecord::Property(PropertyRecord {
                        endpoint: node.endpoint.clone(),
                        data_type: value.data_type(),
                        value: value.clone(),
                    }));
                }
                LeafData::Individual(samples) => {
                    records.extend(samples.iter().map(|sample| {
                        LinearizedRecord::Individual(IndividualRecord {
                            endpoint: node.endpoint.clone(),
                            timestamp: sample.timestamp,
                            data_type: sample.value.data_type(),
                            value: sample.value.clone(),
                        })
                    }));
                }
                LeafData::Object(samples) => {
                    records.extend(samples.iter().map(|sample| {
                        LinearizedRecord::Object(ObjectRecord {
                            endpoint: node.endpoint.clone(),
                            timestamp: sample.timestamp,
                            value: sample.values.clone(),
                        })
                    }));
                }
            }
        }

        records
    }

    /// A plain nested object, relative to the tree root, holding the
    /// current value of every leaf: the property value or the value of the
    /// most recent sample.
    pub fn to_last_value(&self) -> Value {
        last_value(&self.root).unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// The tree rendered back in the shape of the AppEngine payload.
    pub fn to_data(&self) -> Value {
        data(&self.root)
    }
}

fn last_value(node: &TreeNode) -> Option<Value> {
    match &node.content {
        NodeContent::Branch(children) => {
            let fields = children
                .iter()
                .filter_map(|child| Some((child.segment.clone(), last_value(child)?)))
                .collect::<Map<_, _>>();
            (!fields.is_empty()).then_some(Value::Object(fields))
        }
        NodeContent::Leaf(LeafData::Property(value)) => Some(value.to_json()),
        NodeContent::Leaf(LeafData::Individual(samples)) => {
            samples.last().map(|sample| sample.value.to_json())
        }
        NodeContent::Leaf(LeafData::Object(samples)) => samples
            .last()
            .map(|sample| Value::Object(fields_to_json(&sample.values))),
    }
}

fn data(node: &TreeNode) -> Value {
    match &node.content {
        NodeContent::Branch(children) => children
            .iter()
            .map(|child| (child.segment.clone(), data(child)))
            .collect::<Map<_, _>>()
            .into(),
        NodeContent::Leaf(LeafData::Property(value)) => value.to_json(),
        NodeContent::Leaf(LeafData::Individual(samples)) => samples
            .iter()
            .map(|sample| {
                let mut fields = Map::new();
                fields.insert("timestamp".into(), format_timestamp(sample.timestamp).into());
                fields.insert("value".into(), sample.value.to_json());
                Value::Object(fields)
            })
            .collect(),
        NodeContent::Leaf(LeafData::Object(samples)) => {
            samples.iter().map(object_sample_data).collect()
        }
    }
}

fn object_sample_data(sample: &ObjectSample) -> Value {
    let mut fields = Map::new();
    fields.insert("timestamp".into(), format_timestamp(sample.timestamp).into());
    fields.extend(fields_to_json(&sample.values));
    Value::Object(fields)
}

fn fields_to_json(values: &[(String, AstarteValue)]) -> Map<String, Value> {
    values
        .iter()
        .map(|(field, value)| (field.clone(), value.to_json()))
        .collect()
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(*timestamp))
}

fn serialize_fields<S: Serializer>(
    values: &[(String, AstarteValue)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(values.len()))?;
    for (field, value) in values {
        map.serialize_entry(field, value)?;
    }
    map.end()
}
