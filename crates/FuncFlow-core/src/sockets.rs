//! # Socket Set
//!
//! Connection points of a function node, stored in a flat arena (`SlotMap`).
//! The scene wires nodes together by `SocketId`, so a socket's key must stay
//! stable for as long as the socket exists, including across renames.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use slotmap::{SlotMap, new_key_type};

use crate::descriptor::FunctionDescriptor;

pub const ANY_TYPE: &str = "any";

new_key_type! {
    /// Unique identifier for a Socket.
    pub struct SocketId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
}

/// A named connection point on a node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Socket {
    pub id: SocketId,
    pub name: String,
    pub direction: Direction,
    /// Free-form type label shown by the UI ("any", "string", ...).
    pub data_type: String,
    /// Last value written to this socket. Only the output socket is written.
    pub value: Option<Value>,
}

/// Input sockets in parameter order, plus the single output socket.
#[derive(Clone, Debug)]
pub struct SocketSet {
    sockets: SlotMap<SocketId, Socket>,
    inputs: Vec<SocketId>,
    output: SocketId,
}

impl SocketSet {
    /// Builds sockets mirroring `descriptor`, all inputs typed "any".
    pub fn for_descriptor(descriptor: &FunctionDescriptor) -> Self {
        let mut sockets = SlotMap::with_key();
        let output = insert(&mut sockets, descriptor.output_name(), Direction::Output, ANY_TYPE);
        let mut set = Self {
            sockets,
            inputs: Vec::new(),
            output,
        };
        for name in descriptor.inputs() {
            set.push_input(name, ANY_TYPE);
        }
        set
    }

    pub fn get(&self, id: SocketId) -> Option<&Socket> {
        self.sockets.get(id)
    }

    pub fn output(&self) -> &Socket {
        &self.sockets[self.output]
    }

    pub fn output_id(&self) -> SocketId {
        self.output
    }

    /// Input sockets in parameter order.
    pub fn inputs(&self) -> impl Iterator<Item = &Socket> {
        self.inputs.iter().map(move |id| &self.sockets[*id])
    }

    pub fn input_ids(&self) -> &[SocketId] {
        &self.inputs
    }

    pub fn find_input(&self, name: &str) -> Option<&Socket> {
        self.inputs().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }

    pub(crate) fn push_input(&mut self, name: &str, data_type: &str) -> SocketId {
        let id = insert(&mut self.sockets, name, Direction::Input, data_type);
        self.inputs.push(id);
        id
    }

    pub(crate) fn remove_input(&mut self, name: &str) -> Option<Socket> {
        let idx = self
            .inputs
            .iter()
            .position(|id| self.sockets[*id].name == name)?;
        let id = self.inputs.remove(idx);
        self.sockets.remove(id)
    }

    pub(crate) fn rename_input(&mut self, old: &str, new: &str) -> Option<SocketId> {
        let id = self.find_input(old)?.id;
        self.sockets[id].name = new.to_string();
        Some(id)
    }

    pub(crate) fn set_input_type(&mut self, name: &str, data_type: &str) {
        if let Some(id) = self.find_input(name).map(|s| s.id) {
            self.sockets[id].data_type = data_type.to_string();
        }
    }

    /// Relabels the output socket in place. Its key does not change.
    pub(crate) fn rename_output(&mut self, name: &str) {
        self.sockets[self.output].name = name.to_string();
    }

    pub(crate) fn set_output_value(&mut self, value: Value) {
        self.sockets[self.output].value = Some(value);
    }

    /// Brings the socket set in line with `descriptor`.
    ///
    /// Sockets whose name is still listed keep their key (and so their wiring);
    /// stale sockets are destroyed and missing ones created. Input order
    /// afterwards follows the descriptor.
    pub(crate) fn reconcile(&mut self, descriptor: &FunctionDescriptor) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let wanted = descriptor.inputs();

        let stale: Vec<SocketId> = self
            .inputs
            .iter()
            .copied()
            .filter(|id| !wanted.contains(&self.sockets[*id].name))
            .collect();
        for id in &stale {
            if let Some(socket) = self.sockets.remove(*id) {
                report.removed.push(socket.name);
            }
        }
        let kept: Vec<SocketId> = self
            .inputs
            .iter()
            .copied()
            .filter(|id| !stale.contains(id))
            .collect();

        let mut ordered = Vec::with_capacity(wanted.len());
        for name in wanted {
            let existing = self
                .inputs
                .iter()
                .copied()
                .find(|id| self.sockets.get(*id).is_some_and(|s| &s.name == name));
            match existing {
                Some(id) => ordered.push(id),
                None => {
                    ordered.push(insert(&mut self.sockets, name, Direction::Input, ANY_TYPE));
                    report.added.push(name.clone());
                }
            }
        }
        report.reordered = !ordered
            .iter()
            .filter(|id| kept.contains(*id))
            .eq(kept.iter());
        self.inputs = ordered;

        if self.output().name != descriptor.output_name() {
            self.rename_output(descriptor.output_name());
            report.output_renamed = true;
        }
        report
    }
}

fn insert(
    sockets: &mut SlotMap<SocketId, Socket>,
    name: &str,
    direction: Direction,
    data_type: &str,
) -> SocketId {
    sockets.insert_with_key(|key| Socket {
        id: key,
        name: name.to_string(),
        direction,
        data_type: data_type.to_string(),
        value: None,
    })
}

/// What `SocketSet::reconcile` changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReconcileReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Surviving inputs changed their relative order.
    pub reordered: bool,
    pub output_renamed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::NodeId;

    fn names(set: &SocketSet) -> Vec<String> {
        set.inputs().map(|s| s.name.clone()).collect()
    }

    #[test]
    fn mirrors_descriptor_on_creation() {
        let d = FunctionDescriptor::new(NodeId(0));
        let set = SocketSet::for_descriptor(&d);
        assert_eq!(names(&set), ["input1"]);
        assert_eq!(set.output().name, "result");
        assert_eq!(set.output().direction, Direction::Output);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn reconcile_keeps_surviving_keys() {
        let mut d = FunctionDescriptor::new(NodeId(0));
        d.set_inputs(vec!["a".into(), "b".into()]).unwrap();
        let mut set = SocketSet::for_descriptor(&d);
        let b_key = set.find_input("b").unwrap().id;
        let out_key = set.output_id();

        d.set_inputs(vec!["c".into(), "b".into()]).unwrap();
        d.set_output_name("total").unwrap();
        let report = set.reconcile(&d);

        assert_eq!(names(&set), ["c", "b"]);
        assert_eq!(set.find_input("b").unwrap().id, b_key);
        assert_eq!(set.output_id(), out_key);
        assert_eq!(set.output().name, "total");
        assert_eq!(report.added, ["c"]);
        assert_eq!(report.removed, ["a"]);
        assert!(report.output_renamed);
        assert!(!report.reordered);
        assert!(set.get(out_key).is_some());
    }

    #[test]
    fn reconcile_reports_reorders() {
        let mut d = FunctionDescriptor::new(NodeId(0));
        d.set_inputs(vec!["a".into(), "b".into(), "c".into()]).unwrap();
        let mut set = SocketSet::for_descriptor(&d);
        let a_key = set.find_input("a").unwrap().id;

        d.set_inputs(vec!["c".into(), "a".into()]).unwrap();
        let report = set.reconcile(&d);

        assert!(report.reordered);
        assert_eq!(names(&set), ["c", "a"]);
        assert_eq!(set.find_input("a").unwrap().id, a_key);

        // Appending or dropping alone keeps the relative order
        d.set_inputs(vec!["a".into(), "x".into()]).unwrap();
        let report = set.reconcile(&d);
        assert!(!report.reordered);
        assert_eq!(report.removed, ["c"]);
    }
}
