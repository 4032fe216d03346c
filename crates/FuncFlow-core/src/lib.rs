//! # FuncFlow Core Library
//!
//! Headless engine behind the script function node: a graph node wrapping a
//! short Rhai function with a configurable parameter list and one named
//! output.
//!
//! ## Architecture
//! - **Descriptor (`src/descriptor.rs`)**: the editable function definition.
//! - **Sockets (`src/sockets.rs`)**: connection points kept in sync with the descriptor.
//! - **Synthesis (`src/synth`)**: compiles a descriptor into a callable, fresh every run.
//! - **Node (`src/node.rs`)**: socket operations and `evaluate`.
//! - **State (`src/state.rs`)**: persisted node mapping, `get_state` / `set_state`.
//!
//! Scheduling nodes and collecting upstream values is the scene's job.

pub mod descriptor;
pub mod env;
pub mod error;
pub mod events;
pub mod flow;
pub mod ids;
pub mod library;
pub mod node;
pub mod sockets;
pub mod state;
pub mod synth;

pub use descriptor::FunctionDescriptor;
pub use env::{ConstantKind, GlobalConstants};
pub use error::{DescriptorError, EvaluationError, IdSpaceExhausted, StateError, SynthesisError};
pub use events::{NodeEvent, NodeEventBus};
pub use ids::{NodeId, NodeIdAllocator};
pub use node::FunctionNode;
pub use synth::{Synthesizer, SynthesizerBuilder};
