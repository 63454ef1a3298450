//! This crate provides the core of Automython, a small scripting language for defining and
//! simulating finite automata and Turing machines. It includes the lexer and backtracking
//! parser, the tree-walking evaluator, and the automaton engine: construction, validation,
//! simulation, transition tables and diagram render requests.

pub mod analyzer;
pub mod ast;
pub mod automaton;
pub mod evaluator;
pub mod graph;
pub mod interpreter;
pub mod lexer;
pub mod loader;
pub mod machine;
pub mod parser;
pub mod simulate;
pub mod table;
pub mod types;
pub mod value;

/// Re-exports the `analyze` function from the analyzer module.
pub use analyzer::analyze;
pub use ast::{Function, Node};
pub use automaton::{Automaton, Dfa, Dtm, Nfa, TapeAction};
pub use evaluator::{evaluate, Binding, Context, Environment, Printable};
pub use graph::{Opener, RenderRequest, Renderer};
/// Re-exports the session driving the statement loop.
pub use interpreter::{Event, Session};
pub use lexer::{Lexer, Token, TokenKind};
/// Re-exports the `ScriptLoader` struct from the loader module.
pub use loader::ScriptLoader;
/// Re-exports the `TuringMachine` struct from the machine module.
pub use machine::TuringMachine;
/// Re-exports the `parse` function from the parser module.
pub use parser::{parse, Parser};
pub use simulate::Trace;
/// Re-exports the shared enums, constants and error types from the types module.
pub use types::{
    AutomatonKind, ConstructionError, Direction, InterpreterError, Mode, SimulationError,
    MAX_EXECUTION_STEPS,
};
pub use value::{Value, ValueType};
