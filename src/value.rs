//! Runtime values produced by evaluation.

use crate::automaton::Automaton;
use crate::types::AutomatonKind;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

/// A value bound to a name or printed by a script.
///
/// Values are totally ordered so that they can live in sets and serve as dictionary
/// keys; sets and dictionaries iterate in that order, which keeps printing deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    Null,
    Integer(i64),
    Boolean(bool),
    String(String),
    Set(BTreeSet<Value>),
    Dictionary(BTreeMap<Value, Value>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Automaton(Rc<Automaton>),
}

/// The type tag stored next to every binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null,
    Integer,
    Boolean,
    String,
    Set,
    Dictionary,
    List,
    Tuple,
    Dfa,
    Nfa,
    Dtm,
}

impl ValueType {
    /// The automaton kind this tag stands for, if any.
    pub fn automaton_kind(self) -> Option<AutomatonKind> {
        match self {
            Self::Dfa => Some(AutomatonKind::Dfa),
            Self::Nfa => Some(AutomatonKind::Nfa),
            Self::Dtm => Some(AutomatonKind::Dtm),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Set => "set",
            Self::Dictionary => "dictionary",
            Self::List => "list",
            Self::Tuple => "tuple",
            Self::Dfa => "dfa",
            Self::Nfa => "nfa",
            Self::Dtm => "dtm",
        };
        f.write_str(name)
    }
}

impl Value {
    /// The natural type tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Integer(_) => ValueType::Integer,
            Self::Boolean(_) => ValueType::Boolean,
            Self::String(_) => ValueType::String,
            Self::Set(_) => ValueType::Set,
            Self::Dictionary(_) => ValueType::Dictionary,
            Self::List(_) => ValueType::List,
            Self::Tuple(_) => ValueType::Tuple,
            Self::Automaton(automaton) => match automaton.kind() {
                AutomatonKind::Dfa => ValueType::Dfa,
                AutomatonKind::Nfa => ValueType::Nfa,
                AutomatonKind::Dtm => ValueType::Dtm,
            },
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_automaton(&self) -> Option<&Rc<Automaton>> {
        match self {
            Self::Automaton(automaton) => Some(automaton),
            _ => None,
        }
    }

    /// The quoted form used for values nested in containers: `'a'` rather than `a`.
    pub fn repr(&self) -> String {
        match self {
            Self::String(value) => format!("'{}'", value.replace('\'', "\\'")),
            other => other.to_string(),
        }
    }
}

fn join<'a>(values: impl Iterator<Item = &'a Value>) -> String {
    values.map(Value::repr).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("None"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Boolean(true) => f.write_str("True"),
            Self::Boolean(false) => f.write_str("False"),
            Self::String(value) => f.write_str(value),
            Self::Set(values) if values.is_empty() => f.write_str("set()"),
            Self::Set(values) => write!(f, "{{{}}}", join(values.iter())),
            Self::Dictionary(entries) => {
                let entries = entries
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key.repr(), value.repr()))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{{{entries}}}")
            }
            Self::List(values) => write!(f, "[{}]", join(values.iter())),
            Self::Tuple(values) if values.len() == 1 => write!(f, "({},)", values[0].repr()),
            Self::Tuple(values) => write!(f, "({})", join(values.iter())),
            Self::Automaton(automaton) => write!(f, "{automaton}"),
        }
    }
}
