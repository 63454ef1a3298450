//! Render requests: the abstract diagram of an automaton handed to a rendering backend, plus
//! the collaborator traits the evaluator uses to draw and open diagrams.

use crate::{
    automaton::Automaton,
    simulate::{symbol_label, Trace, DTM_START_LABEL},
    types::{InterpreterError, EPSILON, EPSILON_LABEL},
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::Path;

/// Identifier of the invisible node the start arrow leaves from.
pub const START_NODE: &str = "__start__";

const PATH_START_COLOR: (u8, u8, u8) = (0xff, 0xff, 0x00);
const ACCEPTED_COLOR: (u8, u8, u8) = (0x00, 0xff, 0x00);
const REJECTED_COLOR: (u8, u8, u8) = (0xff, 0x00, 0x00);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeShape {
    Circle,
    DoubleCircle,
    Point,
}

impl NodeShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::DoubleCircle => "doublecircle",
            Self::Point => "point",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub id: String,
    pub shape: NodeShape,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayoutDirection {
    #[serde(rename = "LR")]
    LeftToRight,
    #[serde(rename = "TB")]
    TopToBottom,
}

impl LayoutDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeftToRight => "LR",
            Self::TopToBottom => "TB",
        }
    }
}

/// The tape drawn next to a Turing machine diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TapeAnnotation {
    pub title: String,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderRequest {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tape_annotation: Option<TapeAnnotation>,
    pub layout_direction: LayoutDirection,
    pub output_path: String,
}

/// Draws a render request to its output path.
pub trait Renderer {
    fn render(&mut self, request: &RenderRequest) -> Result<(), InterpreterError>;
}

/// Opens a file with the platform viewer.
pub trait Opener {
    fn open(&mut self, path: &Path) -> io::Result<()>;
}

/// `(source, target, label)` of every transition, with display labels.
fn transition_edges(automaton: &Automaton) -> Vec<(String, String, String)> {
    match automaton {
        Automaton::Dfa(dfa) => dfa
            .transitions
            .iter()
            .flat_map(|(from, row)| {
                row.iter().map(move |(symbol, to)| {
                    (from.clone(), to.clone(), symbol_label(symbol).to_string())
                })
            })
            .collect(),
        Automaton::Nfa(nfa) => nfa
            .transitions
            .iter()
            .flat_map(|(from, row)| {
                row.iter().flat_map(move |(symbol, targets)| {
                    targets.iter().map(move |to| {
                        (from.clone(), to.clone(), symbol_label(symbol).to_string())
                    })
                })
            })
            .collect(),
        Automaton::Dtm(dtm) => dtm
            .transitions
            .iter()
            .flat_map(|(from, row)| {
                row.iter().map(move |(read, action)| {
                    let edge_name = |symbol: &str| {
                        if symbol == EPSILON {
                            EPSILON_LABEL.to_string()
                        } else {
                            symbol.to_string()
                        }
                    };
                    let label = format!(
                        "{}/{},{}",
                        edge_name(read),
                        edge_name(&action.write),
                        action.direction
                    );
                    (from.clone(), action.next_state.clone(), label)
                })
            })
            .collect(),
    }
}

/// Linear sRGB interpolation between two colors, as `#rrggbb`.
fn interpolate(start: (u8, u8, u8), end: (u8, u8, u8), t: f64) -> String {
    let channel = |a: u8, b: u8| {
        let value = f64::from(a) + (f64::from(b) - f64::from(a)) * t.clamp(0.0, 1.0);
        value.round() as u8
    };
    format!(
        "#{:02x}{:02x}{:02x}",
        channel(start.0, end.0),
        channel(start.1, end.1),
        channel(start.2, end.2)
    )
}

impl RenderRequest {
    /// Describes the diagram of `automaton`, with the path of `trace` highlighted when given.
    pub fn new(
        automaton: &Automaton,
        trace: Option<&Trace>,
        horizontal: bool,
        output_path: &str,
    ) -> Self {
        let mut nodes = vec![Node {
            id: START_NODE.to_string(),
            shape: NodeShape::Point,
        }];
        nodes.extend(automaton.states().iter().map(|state| Node {
            id: state.clone(),
            shape: if automaton.is_final(state) {
                NodeShape::DoubleCircle
            } else {
                NodeShape::Circle
            },
        }));

        let is_dtm = matches!(automaton, Automaton::Dtm(_));
        let mut edges = vec![Edge {
            from: START_NODE.to_string(),
            to: automaton.initial_state().to_string(),
            label: if is_dtm { DTM_START_LABEL } else { "" }.to_string(),
            color: None,
        }];

        let mut drawn = BTreeSet::new();
        if let Some(trace) = trace {
            let taken: Vec<(&String, &String, &String)> = trace
                .steps
                .iter()
                .filter_map(|step| Some((step.from.as_ref()?, step.to.as_ref()?, &step.label)))
                .collect();
            let end = if trace.accepted {
                ACCEPTED_COLOR
            } else {
                REJECTED_COLOR
            };
            for (i, (from, to, label)) in taken.iter().enumerate() {
                let index = i + 1;
                let t = index as f64 / taken.len() as f64;
                drawn.insert(((*from).clone(), (*to).clone(), (*label).clone()));
                edges.push(Edge {
                    from: (*from).clone(),
                    to: (*to).clone(),
                    label: format!("{label} [#{index}]"),
                    color: Some(interpolate(PATH_START_COLOR, end, t)),
                });
            }
        }

        let mut grouped: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
        for (from, to, label) in transition_edges(automaton) {
            if drawn.contains(&(from.clone(), to.clone(), label.clone())) {
                continue;
            }
            grouped.entry((from, to)).or_default().push(label);
        }
        edges.extend(grouped.into_iter().map(|((from, to), mut labels)| {
            labels.sort();
            Edge {
                from,
                to,
                label: labels.join(","),
                color: None,
            }
        }));

        let tape_annotation = match automaton {
            Automaton::Dtm(dtm) => Some(match trace {
                Some(trace) => {
                    let mut cells = vec!["$".to_string()];
                    cells.extend(trace.input.chars().map(String::from));
                    cells.push(dtm.blank_symbol.clone());
                    cells.push("...".to_string());
                    TapeAnnotation {
                        title: "Initial Tape".to_string(),
                        cells,
                    }
                }
                None => TapeAnnotation {
                    title: "Tape Symbols".to_string(),
                    cells: dtm.tape_symbols.iter().cloned().collect(),
                },
            }),
            _ => None,
        };

        Self {
            nodes,
            edges,
            tape_annotation,
            layout_direction: if horizontal {
                LayoutDirection::LeftToRight
            } else {
                LayoutDirection::TopToBottom
            },
            output_path: output_path.to_string(),
        }
    }

    /// The request as a Graphviz DOT graph.
    pub fn to_dot(&self) -> String {
        Dot(self).to_string()
    }
}

/// Writes a [`RenderRequest`] in the DOT language.
struct Dot<'a>(&'a RenderRequest);

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

impl fmt::Display for Dot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let request = self.0;
        writeln!(f, "digraph {{")?;
        writeln!(f, "    rankdir={};", request.layout_direction.as_str())?;

        for node in &request.nodes {
            let label = if node.shape == NodeShape::Point {
                ""
            } else {
                node.id.as_str()
            };
            writeln!(
                f,
                "    {} [shape={}, label={}];",
                quote(&node.id),
                node.shape.as_str(),
                quote(label)
            )?;
        }

        for edge in &request.edges {
            let color = edge
                .color
                .as_ref()
                .map(|color| format!(", color={}, penwidth=1.5", quote(color)))
                .unwrap_or_default();
            writeln!(
                f,
                "    {} -> {} [label={}{}];",
                quote(&edge.from),
                quote(&edge.to),
                quote(&edge.label),
                color
            )?;
        }

        if let Some(tape) = &request.tape_annotation {
            let record = tape
                .cells
                .iter()
                .map(|cell| cell.replace('|', "\\|"))
                .collect::<Vec<_>>()
                .join(" | ");
            writeln!(f, "    subgraph cluster_tape {{")?;
            writeln!(f, "        label={};", quote(&tape.title))?;
            writeln!(
                f,
                "        tape [shape=record, label={}];",
                quote(&format!("{{ {record} }}"))
            )?;
            writeln!(f, "    }}")?;
        }

        writeln!(f, "}}")
    }
}
