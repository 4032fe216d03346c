//! # Function Synthesis
//!
//! Turns a `FunctionDescriptor` into something callable. Synthesis runs on
//! every evaluation, so edits to the body are picked up without any cache
//! invalidation.
//!
//! The definition source looks like:
//!
//! ```text
//! fn function_3(a, b) {
//!     return a + b
//! }
//! ```
//!
//! Constants are not copied into the source. The engine gets a variable
//! resolver over a private snapshot of the constant table instead.

pub mod host;

use crate::descriptor::FunctionDescriptor;
use crate::env::GlobalConstants;
use crate::error::SynthesisError;
use rhai::{AST, Dynamic, Engine, EvalAltResult, OptimizationLevel, Scope};
use std::collections::BTreeMap;
use std::sync::Arc;

const INDENT: &str = "    ";
const EMPTY_BODY: &str = "return ();";
pub const HOST_FUNCTIONS_ENV: &str = "FUNCFLOW_HOST_FUNCTIONS";

/// Builds definition source from parameter names and body text.
pub fn definition_source(descriptor: &FunctionDescriptor) -> String {
    let params = descriptor.inputs().join(", ");
    let body = if descriptor.code_body().trim().is_empty() {
        EMPTY_BODY
    } else {
        descriptor.code_body()
    };

    let mut source = format!("fn {}({}) {{\n", descriptor.function_name(), params);
    source.push_str(&indent(body));
    if !source.ends_with('\n') {
        source.push('\n');
    }
    source.push('}');
    source
}

/// Prefixes every non-blank line with one indentation level.
fn indent(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + INDENT.len() * 4);
    for line in text.split_inclusive('\n') {
        if !line.trim().is_empty() {
            out.push_str(INDENT);
        }
        out.push_str(line);
    }
    out
}

/// Synthesis settings shared by the nodes of an editor.
#[derive(Clone, Debug)]
pub struct Synthesizer {
    host_functions: bool,
    optimization: OptimizationLevel,
}

impl Default for Synthesizer {
    fn default() -> Self {
        SynthesizerBuilder::new().build()
    }
}

impl Synthesizer {
    pub fn builder() -> SynthesizerBuilder {
        SynthesizerBuilder::new()
    }

    /// Default settings, with host functions controlled by `FUNCFLOW_HOST_FUNCTIONS`.
    pub fn from_env() -> Self {
        let value = std::env::var(HOST_FUNCTIONS_ENV).ok();
        SynthesizerBuilder::new()
            .with_host_functions(host_functions_enabled(value.as_deref()))
            .build()
    }

    pub fn host_functions(&self) -> bool {
        self.host_functions
    }

    pub fn optimization(&self) -> OptimizationLevel {
        self.optimization
    }

    /// Compiles `descriptor` against a private copy of `globals`.
    #[tracing::instrument(skip_all, fields(function = %descriptor.function_name()))]
    pub fn synthesize(
        &self,
        descriptor: &FunctionDescriptor,
        globals: Option<&GlobalConstants>,
    ) -> Result<SynthesizedFunction, SynthesisError> {
        let snapshot = Arc::new(globals.map(GlobalConstants::snapshot).unwrap_or_default());
        let engine = self.engine(snapshot);

        let source_text = definition_source(descriptor);
        let ast = engine
            .compile(&source_text)
            .map_err(|cause| SynthesisError {
                source_text: source_text.clone(),
                cause,
            })?;
        tracing::debug!(params = descriptor.inputs().len(), "Function synthesized");

        Ok(SynthesizedFunction {
            engine,
            ast,
            name: descriptor.function_name().to_string(),
            arity: descriptor.inputs().len(),
            source_text,
        })
    }

    fn engine(&self, constants: Arc<BTreeMap<String, Dynamic>>) -> Engine {
        let mut engine = Engine::new();
        engine.set_optimization_level(self.optimization);
        if self.host_functions {
            host::register_host_functions(&mut engine);
        }

        // Parameters and locals shadow constants. Resolved constants are read-only.
        engine.on_var(move |name, index, context| {
            if index > 0 || context.scope().contains(name) {
                return Ok(None);
            }
            Ok(constants.get(name).cloned())
        });
        engine
    }
}

/// Unset means enabled; `0`, `false` and `off` (any case) disable.
fn host_functions_enabled(value: Option<&str>) -> bool {
    match value {
        Some(v) => !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off"),
        None => true,
    }
}

/// Builder for `Synthesizer`.
#[derive(Clone, Debug)]
pub struct SynthesizerBuilder {
    host_functions: bool,
    optimization: OptimizationLevel,
}

impl Default for SynthesizerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SynthesizerBuilder {
    pub fn new() -> Self {
        Self {
            host_functions: true,
            optimization: OptimizationLevel::Simple,
        }
    }

    /// Enables `read_file`, `write_file` and `run_command` inside scripts.
    pub fn with_host_functions(mut self, enabled: bool) -> Self {
        self.host_functions = enabled;
        self
    }

    pub fn with_optimization(mut self, level: OptimizationLevel) -> Self {
        self.optimization = level;
        self
    }

    pub fn build(self) -> Synthesizer {
        Synthesizer {
            host_functions: self.host_functions,
            optimization: self.optimization,
        }
    }
}

/// A compiled node function, bound to its own engine and constant snapshot.
pub struct SynthesizedFunction {
    engine: Engine,
    ast: AST,
    name: String,
    arity: usize,
    source_text: String,
}

impl SynthesizedFunction {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Invokes the function with positional arguments.
    pub fn call(&self, args: Vec<Dynamic>) -> Result<Dynamic, Box<EvalAltResult>> {
        let mut scope = Scope::new();
        self.engine
            .call_fn::<Dynamic>(&mut scope, &self.ast, &self.name, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::NodeId;
    use serde_json::json;

    fn descriptor(inputs: &[&str], body: &str) -> FunctionDescriptor {
        let mut d = FunctionDescriptor::new(NodeId(1));
        d.set_inputs(inputs.iter().map(|s| s.to_string()).collect())
            .unwrap();
        d.set_code_body(body);
        d
    }

    #[test]
    fn source_is_indented_under_header() {
        let d = descriptor(&["a", "b"], "let c = a + b;\n\nreturn c;");
        assert_eq!(
            definition_source(&d),
            "fn function_1(a, b) {\n    let c = a + b;\n\n    return c;\n}"
        );
    }

    #[test]
    fn blank_body_returns_unit() {
        let d = descriptor(&[], "  \n ");
        assert_eq!(definition_source(&d), "fn function_1() {\n    return ();\n}");

        let f = Synthesizer::default().synthesize(&d, None).unwrap();
        assert!(f.call(vec![]).unwrap().is_unit());
    }

    #[test]
    fn parse_error_carries_source() {
        let d = descriptor(&["a"], "return a +;");
        let err = Synthesizer::default().synthesize(&d, None).err().unwrap();
        assert!(err.source_text.starts_with("fn function_1(a)"));
    }

    #[test]
    fn constants_are_visible_and_shadowable() {
        let mut globals = GlobalConstants::new();
        globals.insert("X", json!(10)).unwrap();

        let d = descriptor(&["a"], "let X = X * 2;\nreturn X + a;");
        let f = Synthesizer::default().synthesize(&d, Some(&globals)).unwrap();
        let out = f.call(vec![Dynamic::from(1_i64)]).unwrap();
        assert_eq!(out.as_int().unwrap(), 21);

        // Original table untouched
        assert_eq!(globals.value("X"), Some(&json!(10)));
    }

    #[test]
    fn parameters_shadow_constants() {
        let mut globals = GlobalConstants::new();
        globals.insert("a", json!(100)).unwrap();

        let d = descriptor(&["a"], "return a;");
        let f = Synthesizer::default().synthesize(&d, Some(&globals)).unwrap();
        assert_eq!(f.call(vec![Dynamic::from(5_i64)]).unwrap().as_int().unwrap(), 5);
    }

    #[test]
    fn host_function_switch_values() {
        assert!(host_functions_enabled(None));
        assert!(host_functions_enabled(Some("1")));
        assert!(host_functions_enabled(Some("yes")));
        for off in ["0", "false", "FALSE", " Off "] {
            assert!(!host_functions_enabled(Some(off)), "{off}");
        }

        let current = std::env::var(HOST_FUNCTIONS_ENV).ok();
        assert_eq!(
            Synthesizer::from_env().host_functions(),
            host_functions_enabled(current.as_deref())
        );
    }

    #[test]
    fn builder_settings_are_applied() {
        let synth = Synthesizer::builder()
            .with_optimization(OptimizationLevel::None)
            .build();
        assert_eq!(synth.optimization(), OptimizationLevel::None);
        assert!(synth.host_functions());

        let d = descriptor(&["a", "b"], "return a - b;");
        let f = synth.synthesize(&d, None).unwrap();
        assert_eq!(f.name(), "function_1");
        assert_eq!(f.arity(), 2);
        assert_eq!(f.source_text(), definition_source(&d));
        let out = f.call(vec![Dynamic::from(5_i64), Dynamic::from(2_i64)]).unwrap();
        assert_eq!(out.as_int().unwrap(), 3);
    }

    #[test]
    fn host_functions_can_be_disabled() {
        let d = descriptor(&[], "return run_command(\"echo hi\");");
        let synth = Synthesizer::builder().with_host_functions(false).build();
        let f = synth.synthesize(&d, None).unwrap();
        assert!(f.call(vec![]).is_err());
    }
}
