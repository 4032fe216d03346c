//! # Function Descriptor
//!
//! The pure data that defines what a function node computes. Every other part
//! of the node (sockets, synthesis, persistence) reads from this struct.

use crate::error::DescriptorError;
use crate::ids::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_INPUT: &str = "input1";
pub const DEFAULT_OUTPUT: &str = "result";

/// Editable description of one node's function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    id: NodeId,
    function_name: String,
    inputs: Vec<String>,
    output_name: String,
    code_body: String,
}

impl FunctionDescriptor {
    /// A fresh descriptor: one default input, default output name, empty body.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            function_name: id.function_name(),
            inputs: vec![DEFAULT_INPUT.to_string()],
            output_name: DEFAULT_OUTPUT.to_string(),
            code_body: String::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Parameter names in call order.
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    pub fn code_body(&self) -> &str {
        &self.code_body
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.iter().any(|i| i == name)
    }

    pub fn input_position(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|i| i == name)
    }

    /// Replaces the whole parameter list. Duplicates are rejected.
    pub fn set_inputs(&mut self, inputs: Vec<String>) -> Result<(), DescriptorError> {
        check_unique(&inputs)?;
        self.inputs = inputs;
        Ok(())
    }

    pub fn set_output_name(&mut self, name: impl Into<String>) -> Result<(), DescriptorError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DescriptorError::EmptyOutputName);
        }
        self.output_name = name;
        Ok(())
    }

    pub fn set_code_body(&mut self, code: impl Into<String>) {
        self.code_body = code.into();
    }

    pub(crate) fn set_function_name(&mut self, name: impl Into<String>) {
        self.function_name = name.into();
    }

    pub(crate) fn push_input(&mut self, name: String) -> Result<(), DescriptorError> {
        if self.has_input(&name) {
            return Err(DescriptorError::DuplicateInput(name));
        }
        self.inputs.push(name);
        Ok(())
    }

    pub(crate) fn take_input(&mut self, name: &str) -> Result<usize, DescriptorError> {
        let idx = self
            .input_position(name)
            .ok_or_else(|| DescriptorError::UnknownInput(name.to_string()))?;
        self.inputs.remove(idx);
        Ok(idx)
    }

    pub(crate) fn rename_input(&mut self, old: &str, new: &str) -> Result<usize, DescriptorError> {
        let idx = self
            .input_position(old)
            .ok_or_else(|| DescriptorError::UnknownInput(old.to_string()))?;
        if old != new && self.has_input(new) {
            return Err(DescriptorError::DuplicateInput(new.to_string()));
        }
        self.inputs[idx] = new.to_string();
        Ok(idx)
    }
}

/// Fails on the first name that appears twice.
pub(crate) fn check_unique(names: &[String]) -> Result<(), DescriptorError> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(DescriptorError::DuplicateInput(name.clone()));
        }
    }
    Ok(())
}
