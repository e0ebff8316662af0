use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::astarte::endpoint;
use crate::astarte::types::InterfaceDescriptor;
use crate::astarte::value::AstarteValue;
use crate::datetime::parse_timestamp;

use super::{DataKind, DataTree, IndividualSample, LeafData, NodeContent, ObjectSample, TreeNode};

const TIMESTAMP: &str = "timestamp";
const VALUE: &str = "value";

impl DataTree {
    /// Builds the tree for `data`, the AppEngine payload of `interface`
    /// fetched at `base_endpoint` (`""` or `/` for the whole interface).
    ///
    /// Malformed payloads never fail the build: values that do not match
    /// their mapping are kept as strings and samples without a usable
    /// timestamp are dropped.
    pub fn from_device_data(
        interface: &InterfaceDescriptor,
        data: &Value,
        base_endpoint: &str,
    ) -> Self {
        let kind = DataKind::of(interface);

        let segments = endpoint::segments(base_endpoint);
        let root_endpoint = segments
            .iter()
            .fold(String::new(), |path, segment| endpoint::join(&path, segment));
        let root_segment = segments.last().copied().unwrap_or_default();
        let mut root = TreeNode::branch(root_segment, root_endpoint);

        let builder = Builder { interface, kind };
        builder.insert(&mut root, data);

        DataTree {
            interface: interface.clone(),
            kind,
            root,
        }
    }
}

struct Builder<'a> {
    interface: &'a InterfaceDescriptor,
    kind: DataKind,
}

impl Builder<'_> {
    fn insert(&self, node: &mut TreeNode, data: &Value) {
        match (self.kind, data) {
            (_, Value::Null) => {
                debug!(endpoint = %node.endpoint, "skipping unset value");
            }
            (DataKind::Properties, Value::Object(fields)) => self.insert_children(node, fields),
            (DataKind::Properties, value) => {
                let data_type = self.interface.mapping_type(&node.endpoint);
                let value = AstarteValue::from_json(data_type, value);
                set_leaf(node, LeafData::Property(value));
            }
            (DataKind::DatastreamIndividual, Value::Array(samples)) => {
                let samples = samples
                    .iter()
                    .filter_map(|sample| self.individual_sample(&node.endpoint, sample))
                    .collect();
                extend_leaf(node, LeafData::Individual(samples));
            }
            (DataKind::DatastreamIndividual, Value::Object(fields))
                if fields.contains_key(TIMESTAMP) && fields.contains_key(VALUE) =>
            {
                let samples = self
                    .individual_sample(&node.endpoint, data)
                    .into_iter()
                    .collect();
                extend_leaf(node, LeafData::Individual(samples));
            }
            (DataKind::DatastreamObject, Value::Array(samples)) => {
                let samples = samples
                    .iter()
                    .filter_map(|sample| self.object_sample(&node.endpoint, sample))
                    .collect();
                extend_leaf(node, LeafData::Object(samples));
            }
            (DataKind::DatastreamObject, Value::Object(fields))
                if fields.contains_key(TIMESTAMP) =>
            {
                let samples = self
                    .object_sample(&node.endpoint, data)
                    .into_iter()
                    .collect();
                extend_leaf(node, LeafData::Object(samples));
            }
            (_, Value::Object(fields)) => self.insert_children(node, fields),
            (kind, value) => {
                warn!(
                    endpoint = %node.endpoint,
                    ?kind,
                    %value,
                    "ignoring unexpected datastream value"
                );
            }
        }
    }

    fn insert_children(&self, node: &mut TreeNode, fields: &Map<String, Value>) {
        for (segment, data) in fields {
            self.insert(node.child_mut(segment), data);
        }
        node.prune_empty_children();
    }

    fn individual_sample(&self, path: &str, sample: &Value) -> Option<IndividualSample> {
        let timestamp = sample_timestamp(path, sample)?;

        let Some(value) = sample.get(VALUE) else {
            warn!(endpoint = path, "dropping sample without a value");
            return None;
        };

        Some(IndividualSample {
            timestamp,
            value: AstarteValue::from_json(self.interface.mapping_type(path), value),
        })
    }

    fn object_sample(&self, path: &str, sample: &Value) -> Option<ObjectSample> {
        let timestamp = sample_timestamp(path, sample)?;
        let fields = sample.as_object()?;

        let values = fields
            .iter()
            .filter(|(field, _)| field.as_str() != TIMESTAMP)
            .map(|(field, value)| {
                let data_type = self.interface.mapping_type(&endpoint::join(path, field));
                (field.clone(), AstarteValue::from_json(data_type, value))
            })
            .collect();

        Some(ObjectSample { timestamp, values })
    }
}

fn sample_timestamp(path: &str, sample: &Value) -> Option<DateTime<Utc>> {
    let timestamp = sample.get(TIMESTAMP).and_then(parse_timestamp);
    if timestamp.is_none() {
        warn!(endpoint = path, %sample, "dropping sample without a valid timestamp");
    }
    timestamp
}

fn set_leaf(node: &mut TreeNode, leaf: LeafData) {
    if !node.children().is_empty() {
        warn!(endpoint = %node.endpoint, "value found on a branch, dropping its children");
    }
    node.content = NodeContent::Leaf(leaf);
}

/// Appends datastream samples to the leaf, in payload order.
fn extend_leaf(node: &mut TreeNode, leaf: LeafData) {
    let leaf = match (&mut node.content, leaf) {
        (NodeContent::Leaf(LeafData::Individual(samples)), LeafData::Individual(more)) => {
            samples.extend(more);
            return;
        }
        (NodeContent::Leaf(LeafData::Object(samples)), LeafData::Object(more)) => {
            samples.extend(more);
            return;
        }
        (_, leaf) => leaf,
    };
    set_leaf(node, leaf);
}
