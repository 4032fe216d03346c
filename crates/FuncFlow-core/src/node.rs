//! # Function Node
//!
//! A graph node wrapping one user-authored script function. The node owns its
//! `FunctionDescriptor` and keeps the `SocketSet` in lockstep with it; the
//! surrounding scene decides when to call `evaluate` and which upstream
//! values to pass in.

use crate::descriptor::FunctionDescriptor;
use crate::env::GlobalConstants;
use crate::error::{DescriptorError, EvaluationError, EvaluationFailure};
use crate::events::{NodeEvent, NodeEventBus};
use crate::ids::{NodeId, NodeIdAllocator};
use crate::sockets::{ANY_TYPE, SocketId, SocketSet};
use crate::synth::Synthesizer;
use glam::Vec2;
use rhai::Dynamic;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_TITLE: &str = "Script Function";

#[derive(Debug)]
pub struct FunctionNode {
    descriptor: FunctionDescriptor,
    sockets: SocketSet,
    /// Constants for the current run. Set by the scene before evaluating.
    pub globals_env: Option<Arc<GlobalConstants>>,
    pub title: String,
    /// World-space position on the canvas.
    pub position: Vec2,
    synthesizer: Arc<Synthesizer>,
    events: Option<NodeEventBus>,
}

impl FunctionNode {
    /// Creates a node with one input (`input1`), output `result` and an empty body.
    ///
    /// The synthesizer honours `FUNCFLOW_HOST_FUNCTIONS`; use
    /// `with_synthesizer` to share one explicitly configured instance.
    pub fn new(ids: &NodeIdAllocator) -> Self {
        let descriptor = FunctionDescriptor::new(ids.allocate());
        let sockets = SocketSet::for_descriptor(&descriptor);
        Self {
            descriptor,
            sockets,
            globals_env: None,
            title: DEFAULT_TITLE.to_string(),
            position: Vec2::ZERO,
            synthesizer: Arc::new(Synthesizer::from_env()),
            events: None,
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<Synthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_event_bus(mut self, bus: NodeEventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn id(&self) -> NodeId {
        self.descriptor.id()
    }

    pub fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    pub fn sockets(&self) -> &SocketSet {
        &self.sockets
    }

    pub fn inputs(&self) -> &[String] {
        self.descriptor.inputs()
    }

    pub fn output_name(&self) -> &str {
        self.descriptor.output_name()
    }

    pub fn code_body(&self) -> &str {
        self.descriptor.code_body()
    }

    pub fn function_name(&self) -> &str {
        self.descriptor.function_name()
    }

    pub fn input_type(&self, name: &str) -> Option<&str> {
        self.sockets.find_input(name).map(|s| s.data_type.as_str())
    }

    /// The value written by the last successful evaluation.
    pub fn output_value(&self) -> Option<&Value> {
        self.sockets.output().value.as_ref()
    }

    pub fn set_globals(&mut self, globals: Arc<GlobalConstants>) {
        self.globals_env = Some(globals);
    }

    /// Appends an input parameter typed "any".
    pub fn add_input(&mut self, name: impl Into<String>) -> Result<SocketId, DescriptorError> {
        self.add_typed_input(name, ANY_TYPE)
    }

    /// Appends an input parameter with a type label.
    pub fn add_typed_input(
        &mut self,
        name: impl Into<String>,
        data_type: &str,
    ) -> Result<SocketId, DescriptorError> {
        let name = name.into();
        self.descriptor.push_input(name.clone())?;
        let socket = self.sockets.push_input(&name, data_type);
        tracing::debug!(node_id = %self.id(), input = %name, "Input added");
        self.emit(NodeEvent::InputAdded {
            node_id: self.id(),
            index: self.descriptor.inputs().len() - 1,
            name,
        });
        Ok(socket)
    }

    /// Removes an input and destroys its socket.
    ///
    /// Removing the last remaining input is allowed here; see `remove_last_input`.
    pub fn remove_input(&mut self, name: &str) -> Result<(), DescriptorError> {
        self.descriptor.take_input(name)?;
        self.sockets.remove_input(name);
        tracing::debug!(node_id = %self.id(), input = %name, "Input removed");
        self.emit(NodeEvent::InputRemoved {
            node_id: self.id(),
            name: name.to_string(),
        });
        Ok(())
    }

    /// Renames an input in place. Position and socket key are kept.
    pub fn rename_input(&mut self, old: &str, new: &str) -> Result<SocketId, DescriptorError> {
        self.descriptor.rename_input(old, new)?;
        let socket = self
            .sockets
            .rename_input(old, new)
            .ok_or_else(|| DescriptorError::UnknownInput(old.to_string()))?;
        self.emit(NodeEvent::InputRenamed {
            node_id: self.id(),
            old: old.to_string(),
            new: new.to_string(),
        });
        Ok(socket)
    }

    /// Relabels the output. Connections to the output socket stay attached.
    pub fn rename_output(&mut self, name: impl Into<String>) -> Result<SocketId, DescriptorError> {
        let name = name.into();
        self.descriptor.set_output_name(name.clone())?;
        self.sockets.rename_output(&name);
        let socket = self.sockets.output_id();
        self.emit(NodeEvent::OutputRenamed {
            node_id: self.id(),
            socket,
            name,
        });
        Ok(socket)
    }

    /// Replaces the function body.
    ///
    /// The body is placed inside a generated `fn`, and Rhai only allows `fn`
    /// at the top level of a script. A body declaring its own helper `fn`
    /// therefore fails at synthesis; closures (`|x| x * 2`) work instead.
    pub fn set_code_body(&mut self, code: impl Into<String>) {
        self.descriptor.set_code_body(code);
        self.emit(NodeEvent::CodeChanged { node_id: self.id() });
    }

    /// Replaces the parameter list wholesale and reconciles the sockets.
    pub fn set_inputs(&mut self, inputs: Vec<String>) -> Result<(), DescriptorError> {
        self.descriptor.set_inputs(inputs)?;
        let report = self.sockets.reconcile(&self.descriptor);
        for name in report.removed {
            self.emit(NodeEvent::InputRemoved {
                node_id: self.id(),
                name,
            });
        }
        for name in report.added {
            let index = self.descriptor.input_position(&name).unwrap_or_default();
            self.emit(NodeEvent::InputAdded {
                node_id: self.id(),
                name,
                index,
            });
        }
        if report.reordered {
            self.emit(NodeEvent::InputsReordered {
                node_id: self.id(),
                inputs: self.inputs().to_vec(),
            });
        }
        Ok(())
    }

    /// Appends `input{n}` using the first free `n` starting at `len + 1`.
    pub fn add_next_input(&mut self) -> Result<SocketId, DescriptorError> {
        let mut n = self.descriptor.inputs().len() + 1;
        while self.descriptor.has_input(&format!("input{n}")) {
            n += 1;
        }
        self.add_input(format!("input{n}"))
    }

    /// Drops the last input, always keeping at least one.
    pub fn remove_last_input(&mut self) -> Option<String> {
        if self.descriptor.inputs().len() <= 1 {
            return None;
        }
        let last = self.descriptor.inputs().last()?.clone();
        self.remove_input(&last).ok()?;
        Some(last)
    }

    /// Runs the node's function once and stores the result in the output slot.
    ///
    /// Inputs missing from `values` are passed as `null`. On failure the
    /// descriptor and any previous output value are left untouched.
    ///
    /// Values that the script engine cannot carry exactly fail with
    /// `EvaluationFailure::Conversion`: integers above `i64::MAX` on the way
    /// in, and NaN or infinite floats (which JSON cannot hold) on the way out.
    #[tracing::instrument(skip(self, values), fields(node_id = %self.id(), function = %self.function_name()))]
    pub fn evaluate(&mut self, values: &HashMap<String, Value>) -> Result<(), EvaluationError> {
        let start = Instant::now();

        match self.run(values) {
            Ok(result) => {
                self.sockets.set_output_value(result);
                let execution_ms = start.elapsed().as_millis() as u64;
                tracing::debug!(execution_ms, output = %self.output_name(), "Function evaluated");
                self.emit(NodeEvent::Evaluated {
                    node_id: self.id(),
                    function_name: self.function_name().to_string(),
                    execution_ms,
                });
                Ok(())
            }
            Err(cause) => {
                let err = EvaluationError::new(self.function_name(), cause);
                tracing::error!(error = %err.message, "Function evaluation failed");
                self.emit(NodeEvent::EvaluationFailed {
                    node_id: self.id(),
                    function_name: err.function_name.clone(),
                    error: err.message.clone(),
                    timestamp: chrono::Utc::now().timestamp_millis(),
                });
                Err(err)
            }
        }
    }

    fn run(&self, values: &HashMap<String, Value>) -> Result<Value, EvaluationFailure> {
        let args = self
            .descriptor
            .inputs()
            .iter()
            .map(|name| to_script_value(values.get(name).unwrap_or(&Value::Null)))
            .collect::<Result<Vec<_>, _>>()?;

        let function = self
            .synthesizer
            .synthesize(&self.descriptor, self.globals_env.as_deref())?;
        let result = function.call(args).map_err(EvaluationFailure::Runtime)?;

        check_finite(&result)?;
        rhai::serde::from_dynamic::<Value>(&result).map_err(EvaluationFailure::Conversion)
    }

    pub(crate) fn descriptor_mut(&mut self) -> &mut FunctionDescriptor {
        &mut self.descriptor
    }

    pub(crate) fn sockets_mut(&mut self) -> &mut SocketSet {
        &mut self.sockets
    }

    pub(crate) fn emit(&self, event: NodeEvent) {
        if let Some(bus) = &self.events {
            bus.emit(event);
        }
    }
}

fn to_script_value(value: &Value) -> Result<Dynamic, EvaluationFailure> {
    check_integer_range(value)?;
    rhai::serde::to_dynamic(value).map_err(EvaluationFailure::Conversion)
}

// Script integers are i64; larger JSON integers would silently become floats.
fn check_integer_range(value: &Value) -> Result<(), EvaluationFailure> {
    match value {
        Value::Number(n) if n.is_u64() && !n.is_i64() => Err(EvaluationFailure::Conversion(
            format!("integer {n} is outside the script integer range").into(),
        )),
        Value::Array(items) => items.iter().try_for_each(check_integer_range),
        Value::Object(map) => map.values().try_for_each(check_integer_range),
        _ => Ok(()),
    }
}

fn check_finite(value: &Dynamic) -> Result<(), EvaluationFailure> {
    if let Ok(f) = value.as_float() {
        if !f.is_finite() {
            return Err(EvaluationFailure::Conversion(
                format!("result contains non-finite number {f}").into(),
            ));
        }
    } else if let Some(items) = value.read_lock::<rhai::Array>() {
        items.iter().try_for_each(check_finite)?;
    } else if let Some(map) = value.read_lock::<rhai::Map>() {
        map.values().try_for_each(check_finite)?;
    }
    Ok(())
}
