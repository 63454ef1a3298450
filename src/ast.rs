//! Abstract syntax tree produced by the parser.
//!
//! Nodes are plain data: they carry only the fields their meaning needs and never
//! evaluate themselves. Each node also serializes to a tagged record
//! (`{"type": "assignment", ...}`) which is what `--dump-ast` prints.

use crate::types::AutomatonKind;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The reserved functions a script can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Function {
    /// Open a diagram file with the platform viewer.
    Open,
    /// Render an automaton diagram to a file.
    Save,
    /// Run an automaton on an input and return the step table.
    Test,
    /// Return the transition table of an automaton.
    Definition,
}

impl FromStr for Function {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "open" => Ok(Self::Open),
            "save" => Ok(Self::Save),
            "test" => Ok(Self::Test),
            "definition" => Ok(Self::Definition),
            other => Err(format!("Unknown function: {other}")),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Save => "save",
            Self::Test => "test",
            Self::Definition => "definition",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Integer {
        value: i64,
    },
    Boolean {
        value: bool,
    },
    String {
        value: String,
    },
    Variable {
        name: String,
    },
    Binary {
        left: Box<Node>,
        operator: char,
        right: Box<Node>,
    },
    Assignment {
        name: String,
        value: Box<Node>,
    },
    Print {
        value: Box<Node>,
    },
    /// A call like `m.test("ab")`. Standalone calls such as `open("m.png")` have no receiver.
    FunctionCall {
        receiver: Option<String>,
        function: Function,
        args: Vec<Node>,
    },
    /// `{...}`; becomes a dictionary if any element is a key/value pair, a set otherwise.
    Collection {
        elements: Vec<Node>,
    },
    /// A `key: value` pair inside a collection.
    Dictionary {
        key: Box<Node>,
        value: Box<Node>,
    },
    Parameters {
        elements: Vec<Node>,
    },
    Tuple {
        elements: Vec<Node>,
    },
    Automaton {
        kind: AutomatonKind,
        elements: Vec<Node>,
    },
}

impl Node {
    /// The canonical tagged record of this node.
    pub fn to_record(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_function_names() {
        assert_eq!("definition".parse::<Function>(), Ok(Function::Definition));
        assert!("show".parse::<Function>().is_err());
        assert_eq!(Function::Save.to_string(), "save");
    }

    #[test]
    fn test_records_are_tagged() {
        let node = Node::Assignment {
            name: "x".to_string(),
            value: Box::new(Node::Binary {
                left: Box::new(Node::Integer { value: 1 }),
                operator: '+',
                right: Box::new(Node::Variable {
                    name: "y".to_string(),
                }),
            }),
        };

        assert_eq!(
            node.to_record(),
            json!({
                "type": "assignment",
                "name": "x",
                "value": {
                    "type": "binary",
                    "left": {"type": "integer", "value": 1},
                    "operator": "+",
                    "right": {"type": "variable", "name": "y"}
                }
            })
        );
    }

    #[test]
    fn test_automaton_record() {
        let node = Node::Automaton {
            kind: AutomatonKind::Nfa,
            elements: vec![],
        };
        assert_eq!(
            node.to_record(),
            json!({"type": "automaton", "kind": "NFA", "elements": []})
        );
    }
}
