use thiserror::Error;

/// Violations of the function descriptor invariants.
///
/// Raised synchronously by the socket operations; the descriptor is left
/// exactly as it was before the failing call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("input '{0}' already exists")]
    DuplicateInput(String),
    #[error("input '{0}' does not exist")]
    UnknownInput(String),
    #[error("output name must not be empty")]
    EmptyOutputName,
}

/// A restored id is too large to allocate past.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("node id {0} leaves no room for new nodes")]
pub struct IdSpaceExhausted(pub crate::ids::NodeId);

/// The assembled definition source could not be compiled.
#[derive(Error, Debug)]
#[error("failed to compile function source: {cause}")]
pub struct SynthesisError {
    /// The full definition source handed to the compiler.
    pub source_text: String,
    #[source]
    pub cause: rhai::ParseError,
}

/// Underlying reason an evaluation failed.
#[derive(Error, Debug)]
pub enum EvaluationFailure {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error("script error: {0}")]
    Runtime(Box<rhai::EvalAltResult>),
    #[error("value conversion failed: {0}")]
    Conversion(Box<rhai::EvalAltResult>),
}

/// The single failure type surfaced by `FunctionNode::evaluate`.
#[derive(Error, Debug)]
#[error("error in function node '{function_name}': {message}")]
pub struct EvaluationError {
    pub function_name: String,
    pub message: String,
    #[source]
    pub cause: EvaluationFailure,
}

impl EvaluationError {
    pub(crate) fn new(function_name: &str, cause: EvaluationFailure) -> Self {
        Self {
            function_name: function_name.to_string(),
            message: cause.to_string(),
            cause,
        }
    }

    /// True when the failure happened while compiling rather than running.
    pub fn is_synthesis(&self) -> bool {
        matches!(self.cause, EvaluationFailure::Synthesis(_))
    }
}

/// A persisted node state could not be applied.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("malformed node state: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid node state: {0}")]
    Descriptor(#[from] DescriptorError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstantError {
    #[error("constant name cannot be empty")]
    EmptyName,
    #[error("a constant named '{0}' already exists")]
    Duplicate(String),
    #[error("no constant named '{0}'")]
    Unknown(String),
    #[error("could not convert '{text}' to {kind}: {reason}")]
    InvalidValue {
        kind: String,
        text: String,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("function name is required")]
    MissingName,
    #[error("output name is required")]
    MissingOutput,
    #[error("at least one input parameter is required")]
    NoInputs,
    #[error("function code is required")]
    EmptyCode,
    #[error("input '{0}' is listed more than once")]
    DuplicateInput(String),
    #[error("category '{0}' is read-only")]
    ReadOnlyCategory(String),
    #[error("no function '{name}' in category '{category}'")]
    UnknownTemplate { category: String, name: String },
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error("invalid library document: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
