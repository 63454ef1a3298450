//! This module defines the shared constants, small enums and the error taxonomy used
//! throughout the interpreter: lexing, parsing, evaluation and the automaton engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// File extension of Automython script files.
pub const SCRIPT_EXTENSION: &str = "theory";
/// File extensions a diagram can be saved to or opened from.
pub const DIAGRAM_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "svg", "pdf"];
/// Name used for the default diagram path of calls without a receiver.
pub const DEFAULT_DIAGRAM_NAME: &str = "diagram";

/// The symbol reserved for epsilon (lambda) transitions in NFA definitions.
pub const EPSILON: &str = "";
/// How epsilon is shown in finite automaton tables and edges.
pub const LAMBDA_LABEL: &str = "λ";
/// How an empty symbol is shown on Turing machine edges.
pub const EPSILON_LABEL: &str = "ε";
/// Marker for an absent table cell or a dead-end state.
pub const EMPTY_LABEL: &str = "∅";
/// Prefix marking the initial state.
pub const INITIAL_MARKER: &str = "→";
/// Prefix marking a final state.
pub const FINAL_MARKER: &str = "*";

/// Outer retry bound of the NFA witness-path search.
pub const NFA_PATH_ATTEMPTS: usize = 50;
/// Inner retry bound (random walks per outer attempt) of the NFA witness-path search.
pub const NFA_WALK_ATTEMPTS: usize = 20000;
/// The maximum number of steps a Turing machine runs before it is stopped.
pub const MAX_EXECUTION_STEPS: usize = 10000;

/// Returned by NFA path reconstruction when no witness could be found.
pub const NO_PATH_FOUND: &str = "[NO VALID PATH FOUND]\n\
    Try to eliminate lambda transitions and try again.";

/// Returns true if `path` ends in one of the [`DIAGRAM_EXTENSIONS`], ignoring case.
pub fn is_diagram_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    DIAGRAM_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{ext}")))
}

/// The three kinds of machines the language can define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AutomatonKind {
    #[serde(rename = "DFA")]
    Dfa,
    #[serde(rename = "NFA")]
    Nfa,
    #[serde(rename = "DTM")]
    Dtm,
}

impl AutomatonKind {
    /// Maps an automaton keyword (`DFA`, `NFA`, `DTM`) to its kind.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "DFA" => Some(Self::Dfa),
            "NFA" => Some(Self::Nfa),
            "DTM" => Some(Self::Dtm),
            _ => None,
        }
    }
}

impl fmt::Display for AutomatonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            Self::Dfa => "DFA",
            Self::Nfa => "NFA",
            Self::Dtm => "DTM",
        };
        f.write_str(keyword)
    }
}

/// Direction of a Turing machine head move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
    /// Keep the head in the same position.
    None,
}

impl Direction {
    /// Parses the `L`/`R`/`N` notation used in transition tuples.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "L" => Some(Self::Left),
            "R" => Some(Self::Right),
            "N" => Some(Self::None),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> &'static str {
        match self {
            Self::Left => "L",
            Self::Right => "R",
            Self::None => "N",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_symbol())
    }
}

/// How a session reacts to a failed statement.
///
/// - `Interactive` (default): the failure is reported and the next statement runs.
/// - `Batch`: the first failure stops the run, as a script file is expected to be correct.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Interactive,
    Batch,
}

/// Violations of the automaton invariants, detected while constructing a definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// The initial state is not one of the declared states.
    #[error("Initial state '{0}' is not a declared state")]
    MissingInitialState(String),
    /// A transition or final state refers to a state that is not declared.
    #[error("{context} refers to undeclared state '{state}'")]
    DanglingStateReference { state: String, context: String },
    /// A transition uses a symbol outside of the declared alphabet.
    #[error("Symbol '{symbol}' used by {context} is not in the {alphabet}")]
    SymbolNotInAlphabet {
        symbol: String,
        context: String,
        alphabet: String,
    },
    /// The automaton literal received the wrong number of parameters.
    #[error("Invalid parameter size for {kind}: expected {expected}, found {found}")]
    ArityMismatch {
        kind: AutomatonKind,
        expected: String,
        found: usize,
    },
    /// A parameter does not have the shape the definition needs.
    #[error("Parameter '{parameter}' must be {expected}, found {found}")]
    MalformedParameter {
        parameter: String,
        expected: String,
        found: String,
    },
    /// A DFA that is not partial lacks a transition.
    #[error("State '{state}' has no transition on symbol '{symbol}'")]
    MissingTransition { state: String, symbol: String },
    /// A Turing machine transition moves in an unknown direction.
    #[error("Invalid direction '{0}', expected L, R or N")]
    InvalidDirection(String),
}

/// Failures while running an automaton on an input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// The input passed to a simulation is not a string.
    #[error("input_str should be a string, found {0}")]
    InputNotString(String),
}

/// Every error the interpreter can report for a statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpreterError {
    /// No token rule matched the text.
    #[error("Lexical error at line {line}, column {column}: {message}")]
    Lexical {
        message: String,
        line: usize,
        column: usize,
    },
    /// A required token or grammar alternative was absent.
    #[error("Syntax error at line {line}, column {column}: {message} (found {found})")]
    Syntax {
        message: String,
        found: String,
        line: usize,
        column: usize,
    },
    /// A variable or registry lookup missed.
    #[error("Undefined name: {0}")]
    UndefinedName(String),
    /// An automaton definition violates its invariants.
    #[error("Automaton construction error: {0}")]
    Construction(#[from] ConstructionError),
    /// An automaton could not be run on the given input.
    #[error("Automaton simulation error: {0}")]
    Simulation(#[from] SimulationError),
    /// NFA witness reconstruction exhausted its retry budget.
    #[error("{}", NO_PATH_FOUND)]
    PathNotFound,
    /// `+` applied to values it cannot combine.
    #[error("Unsupported operand types for {operator}: {left} and {right}")]
    UnsupportedOperands {
        operator: char,
        left: String,
        right: String,
    },
    /// A function call received arguments it cannot use.
    #[error("Invalid arguments for {function}(): {message}")]
    InvalidArguments { function: String, message: String },
    /// Reading a script or writing an output file failed.
    #[error("File error: {0}")]
    FileError(String),
    /// The rendering collaborator rejected a request.
    #[error("Render error: {0}")]
    RenderError(String),
}

impl InterpreterError {
    /// The source line the error refers to, when it carries one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Lexical { line, .. } | Self::Syntax { line, .. } => Some(*line),
            _ => None,
        }
    }
}
