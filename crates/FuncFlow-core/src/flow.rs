//! # Flow Document
//!
//! In-memory shape of a saved editor session: every node's state plus the
//! global constants. Choosing a path and touching the filesystem is left to
//! the host application.

use crate::env::{ConstantKind, GlobalConstants};
use crate::ids::NodeIdAllocator;
use crate::node::FunctionNode;
use crate::state::{NodeState, PartialNodeState};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorState {
    #[serde(default)]
    pub nodes: Vec<NodeState>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowDocument {
    #[serde(default)]
    pub editor_state: EditorState,
    #[serde(default)]
    pub global_constants: GlobalConstants,
    /// Declared kind per constant. Older documents omit it; kinds are then
    /// inferred from the values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub constant_types: BTreeMap<String, ConstantKind>,
}

impl FlowDocument {
    pub fn capture<'a>(
        nodes: impl IntoIterator<Item = &'a FunctionNode>,
        constants: &GlobalConstants,
    ) -> Self {
        Self {
            editor_state: EditorState {
                nodes: nodes.into_iter().map(FunctionNode::get_state).collect(),
            },
            global_constants: constants.clone(),
            constant_types: constants.kinds(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize flow document")
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse flow document")
    }

    /// Rebuilds the nodes of the document.
    ///
    /// Each node gets a fresh id from `ids`; the allocator is first advanced
    /// past every id in the document so restored and new nodes never clash.
    /// Restored nodes share one `Arc` of the returned constants.
    pub fn restore(
        &self,
        ids: &NodeIdAllocator,
    ) -> Result<(Vec<FunctionNode>, Arc<GlobalConstants>)> {
        for state in &self.editor_state.nodes {
            ids.reserve_through(state.envelope.id)
                .context("Failed to restore flow document")?;
        }

        let mut constants = self.global_constants.clone();
        for (name, kind) in &self.constant_types {
            if let Err(e) = constants.set_kind(name, *kind) {
                tracing::warn!(constant = %name, error = %e, "Ignoring type of unknown constant");
            }
        }
        let constants = Arc::new(constants);
        let mut nodes = Vec::with_capacity(self.editor_state.nodes.len());
        for state in &self.editor_state.nodes {
            let mut node = FunctionNode::new(ids);
            node.restore(PartialNodeState::from(state.clone()))
                .with_context(|| format!("Failed to restore node {}", state.envelope.id))?;
            node.set_globals(constants.clone());
            nodes.push(node);
        }
        tracing::info!(nodes = nodes.len(), constants = constants.len(), "Flow restored");
        Ok((nodes, constants))
    }
}
