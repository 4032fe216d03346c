//! # Node State
//!
//! Conversion between a live `FunctionNode` and its persisted mapping:
//!
//! ```json
//! { "id": 3, "title": "Script Function", "position": [0.0, 0.0],
//!   "inputs": ["a", "b"], "input_types": {"a": "any", "b": "any"},
//!   "output_name": "result", "function_name": "function_3",
//!   "function_body": "return a + b;" }
//! ```

use crate::descriptor::check_unique;
use crate::error::{DescriptorError, StateError};
use crate::events::NodeEvent;
use crate::ids::NodeId;
use crate::node::FunctionNode;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Generic per-node fields shared by every node type on the canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeEnvelope {
    pub id: NodeId,
    pub title: String,
    #[serde(default)]
    pub position: Vec2,
}

/// Full persisted state of a function node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    #[serde(flatten)]
    pub envelope: NodeEnvelope,
    pub inputs: Vec<String>,
    #[serde(default)]
    pub input_types: BTreeMap<String, String>,
    pub output_name: String,
    pub function_name: String,
    pub function_body: String,
}

impl NodeState {
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// A state mapping where every field is optional.
///
/// Absent fields leave the node's current value in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialNodeState {
    pub id: Option<NodeId>,
    pub title: Option<String>,
    pub position: Option<Vec2>,
    pub inputs: Option<Vec<String>>,
    pub input_types: Option<BTreeMap<String, String>>,
    pub output_name: Option<String>,
    pub function_name: Option<String>,
    pub function_body: Option<String>,
}

impl From<NodeState> for PartialNodeState {
    fn from(state: NodeState) -> Self {
        Self {
            id: Some(state.envelope.id),
            title: Some(state.envelope.title),
            position: Some(state.envelope.position),
            inputs: Some(state.inputs),
            input_types: Some(state.input_types),
            output_name: Some(state.output_name),
            function_name: Some(state.function_name),
            function_body: Some(state.function_body),
        }
    }
}

impl FunctionNode {
    /// Captures the descriptor plus the generic envelope.
    pub fn get_state(&self) -> NodeState {
        let input_types = self
            .sockets()
            .inputs()
            .map(|s| (s.name.clone(), s.data_type.clone()))
            .collect();

        NodeState {
            envelope: NodeEnvelope {
                id: self.id(),
                title: self.title.clone(),
                position: self.position,
            },
            inputs: self.inputs().to_vec(),
            input_types,
            output_name: self.output_name().to_string(),
            function_name: self.function_name().to_string(),
            function_body: self.code_body().to_string(),
        }
    }

    /// Applies a persisted mapping. See `restore`.
    pub fn set_state(&mut self, state: &Value) -> Result<(), StateError> {
        let patch = PartialNodeState::deserialize(state)?;
        self.restore(patch)
    }

    /// Applies the fields present in `patch`, then reconciles the sockets.
    ///
    /// The patch is validated up front; an invalid one changes nothing.
    /// The node id is never taken from the patch.
    pub fn restore(&mut self, patch: PartialNodeState) -> Result<(), StateError> {
        if let Some(inputs) = &patch.inputs {
            check_unique(inputs)?;
        }
        if patch.output_name.as_deref() == Some("") {
            return Err(DescriptorError::EmptyOutputName.into());
        }

        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(position) = patch.position {
            self.position = position;
        }

        let descriptor = self.descriptor_mut();
        if let Some(inputs) = patch.inputs {
            descriptor.set_inputs(inputs)?;
        }
        if let Some(output_name) = patch.output_name {
            descriptor.set_output_name(output_name)?;
        }
        if let Some(body) = patch.function_body {
            descriptor.set_code_body(body);
        }
        if let Some(function_name) = patch.function_name {
            descriptor.set_function_name(function_name);
        }

        let descriptor = self.descriptor().clone();
        let sockets = self.sockets_mut();
        let report = sockets.reconcile(&descriptor);
        if let Some(types) = patch.input_types {
            for (name, data_type) in &types {
                sockets.set_input_type(name, data_type);
            }
        }

        tracing::debug!(
            node_id = %self.id(),
            added = report.added.len(),
            removed = report.removed.len(),
            "Node state restored"
        );
        if report.reordered {
            self.emit(NodeEvent::InputsReordered {
                node_id: self.id(),
                inputs: self.inputs().to_vec(),
            });
        }
        self.emit(NodeEvent::StateRestored {
            node_id: self.id(),
            added: report.added,
            removed: report.removed,
        });
        Ok(())
    }
}
