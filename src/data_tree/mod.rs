//! Device interface data, reshaped from the nested, path-keyed JSON returned
//! by AppEngine into a tree mirroring the interface endpoints.
//!
//! A tree is built once per fetch from the interface definition and the raw
//! payload ([`DataTree::from_device_data`]) and is then read through the
//! linearization helpers (`to_linearized_data`, `to_last_value`, `to_data`).

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::astarte::endpoint;
use crate::astarte::types::{Aggregation, InterfaceDescriptor, InterfaceType};
use crate::astarte::value::AstarteValue;

mod builder;
mod linearize;

pub use linearize::LinearizedRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Properties,
    DatastreamIndividual,
    DatastreamObject,
}

impl DataKind {
    pub fn of(interface: &InterfaceDescriptor) -> Self {
        match (interface.interface_type, interface.aggregation) {
            (InterfaceType::Properties, _) => Self::Properties,
            (InterfaceType::Datastream, Aggregation::Individual) => Self::DatastreamIndividual,
            (InterfaceType::Datastream, Aggregation::Object) => Self::DatastreamObject,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndividualSample {
    pub timestamp: DateTime<Utc>,
    pub value: AstarteValue,
}

/// One emission of an object aggregated interface: every field sent
/// together, keyed by the last segment of its mapping endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSample {
    pub timestamp: DateTime<Utc>,
    pub values: Vec<(String, AstarteValue)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeafData {
    Property(AstarteValue),
    Individual(Vec<IndividualSample>),
    Object(Vec<ObjectSample>),
}

impl LeafData {
    pub fn sample_count(&self) -> usize {
        match self {
            Self::Property(_) => 1,
            Self::Individual(samples) => samples.len(),
            Self::Object(samples) => samples.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    Branch(Vec<TreeNode>),
    Leaf(LeafData),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub segment: String,
    /// Full path from the interface root, e.g. `/sensors/light/estimated`.
    pub endpoint: String,
    pub content: NodeContent,
}

impl TreeNode {
    fn branch(segment: &str, endpoint: String) -> Self {
        Self {
            segment: segment.to_string(),
            endpoint,
            content: NodeContent::Branch(Vec::new()),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.content, NodeContent::Leaf(_))
    }

    pub fn leaf(&self) -> Option<&LeafData> {
        match &self.content {
            NodeContent::Leaf(leaf) => Some(leaf),
            NodeContent::Branch(_) => None,
        }
    }

    pub fn children(&self) -> &[TreeNode] {
        match &self.content {
            NodeContent::Branch(children) => children,
            NodeContent::Leaf(_) => &[],
        }
    }

    pub fn child(&self, segment: &str) -> Option<&TreeNode> {
        self.children()
            .iter()
            .find(|child| child.segment == segment)
    }

    /// Returns the child for `segment`, creating it if needed. A leaf asked
    /// for a child is turned into a branch.
    fn child_mut(&mut self, segment: &str) -> &mut TreeNode {
        if let NodeContent::Leaf(_) = self.content {
            warn!(endpoint = %self.endpoint, "data found below a leaf, dropping the leaf");
            self.content = NodeContent::Branch(Vec::new());
        }

        let children = match &mut self.content {
            NodeContent::Branch(children) => children,
            NodeContent::Leaf(_) => unreachable!("leaf content was just replaced"),
        };

        let index = match children.iter().position(|child| child.segment == segment) {
            Some(index) => index,
            None => {
                children.push(TreeNode::branch(
                    segment,
                    endpoint::join(&self.endpoint, segment),
                ));
                children.len() - 1
            }
        };

        &mut children[index]
    }

    /// Drops children left without any data, e.g. unset properties.
    fn prune_empty_children(&mut self) {
        if let NodeContent::Branch(children) = &mut self.content {
            children.retain(|child| child.is_leaf() || !child.children().is_empty());
        }
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a TreeNode>) {
        match &self.content {
            NodeContent::Leaf(_) => leaves.push(self),
            NodeContent::Branch(children) => {
                for child in children {
                    child.collect_leaves(leaves);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataTree {
    pub interface: InterfaceDescriptor,
    pub kind: DataKind,
    pub root: TreeNode,
}

impl DataTree {
    /// Leaf nodes in pre-order.
    pub fn leaves(&self) -> Vec<&TreeNode> {
        let mut leaves = Vec::new();
        self.root.collect_leaves(&mut leaves);
        leaves
    }

    /// Looks a node up by its full endpoint.
    pub fn node(&self, path: &str) -> Option<&TreeNode> {
        let root_segments = endpoint::segments(&self.root.endpoint);
        let path_segments = endpoint::segments(path);

        let relative = path_segments.strip_prefix(root_segments.as_slice())?;
        relative
            .iter()
            .try_fold(&self.root, |node, segment| node.child(segment))
    }

    pub fn sample_count(&self) -> usize {
        self.leaves()
            .iter()
            .filter_map(|node| node.leaf())
            .map(LeafData::sample_count)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves().is_empty()
    }
}
