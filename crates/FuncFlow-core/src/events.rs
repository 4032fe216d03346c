use crate::ids::NodeId;
use crate::sockets::SocketId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Observable changes to a function node.
///
/// The UI layer subscribes to these instead of the node mutating widgets.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum NodeEvent {
    InputAdded {
        node_id: NodeId,
        name: String,
        /// Position in the parameter list
        index: usize,
    },
    InputRemoved {
        node_id: NodeId,
        name: String,
    },
    InputRenamed {
        node_id: NodeId,
        old: String,
        new: String,
    },
    /// Existing inputs changed their relative order. Carries the full list.
    InputsReordered {
        node_id: NodeId,
        inputs: Vec<String>,
    },
    /// The output socket kept its key; only the label changed.
    OutputRenamed {
        node_id: NodeId,
        socket: SocketId,
        name: String,
    },
    CodeChanged {
        node_id: NodeId,
    },
    /// Sockets were reconciled after a state restore.
    StateRestored {
        node_id: NodeId,
        added: Vec<String>,
        removed: Vec<String>,
    },
    Evaluated {
        node_id: NodeId,
        function_name: String,
        execution_ms: u64,
    },
    EvaluationFailed {
        node_id: NodeId,
        function_name: String,
        error: String,
        /// Unix timestamp in milliseconds
        timestamp: i64,
    },
}

impl NodeEvent {
    pub fn node_id(&self) -> NodeId {
        match self {
            NodeEvent::InputAdded { node_id, .. }
            | NodeEvent::InputRemoved { node_id, .. }
            | NodeEvent::InputRenamed { node_id, .. }
            | NodeEvent::InputsReordered { node_id, .. }
            | NodeEvent::OutputRenamed { node_id, .. }
            | NodeEvent::CodeChanged { node_id }
            | NodeEvent::StateRestored { node_id, .. }
            | NodeEvent::Evaluated { node_id, .. }
            | NodeEvent::EvaluationFailed { node_id, .. } => *node_id,
        }
    }
}

/// Broadcast channel carrying `NodeEvent`s to any number of observers.
#[derive(Clone, Debug)]
pub struct NodeEventBus(pub broadcast::Sender<NodeEvent>);

impl NodeEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self(tx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.0.subscribe()
    }

    /// Publishes an event. Having no subscribers is fine.
    pub fn emit(&self, event: NodeEvent) {
        let _ = self.0.send(event);
    }
}

impl Default for NodeEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
