//! This module defines the automaton data model (DFA, NFA and single-tape DTM definitions)
//! and builds validated definitions from the positional parameters of an automaton literal.

use crate::{
    analyzer::analyze,
    types::{AutomatonKind, ConstructionError, Direction, FINAL_MARKER, INITIAL_MARKER},
    value::Value,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A deterministic finite automaton.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Dfa {
    pub states: BTreeSet<String>,
    pub input_symbols: BTreeSet<String>,
    /// `state -> symbol -> next state`
    pub transitions: BTreeMap<String, BTreeMap<String, String>>,
    pub initial_state: String,
    pub final_states: BTreeSet<String>,
    /// When false, every state must define a transition for every input symbol.
    pub allow_partial: bool,
}

/// A nondeterministic finite automaton. The symbol `""` stands for epsilon.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Nfa {
    pub states: BTreeSet<String>,
    pub input_symbols: BTreeSet<String>,
    /// `state -> symbol -> next states`
    pub transitions: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
    pub initial_state: String,
    pub final_states: BTreeSet<String>,
}

/// What a Turing machine does after reading a symbol.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TapeAction {
    pub next_state: String,
    pub write: String,
    pub direction: Direction,
}

/// A deterministic single-tape Turing machine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Dtm {
    pub states: BTreeSet<String>,
    pub input_symbols: BTreeSet<String>,
    pub tape_symbols: BTreeSet<String>,
    /// `state -> read symbol -> action`
    pub transitions: BTreeMap<String, BTreeMap<String, TapeAction>>,
    pub initial_state: String,
    pub blank_symbol: String,
    pub final_states: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind")]
pub enum Automaton {
    #[serde(rename = "DFA")]
    Dfa(Dfa),
    #[serde(rename = "NFA")]
    Nfa(Nfa),
    #[serde(rename = "DTM")]
    Dtm(Dtm),
}

impl Automaton {
    /// Builds and validates an automaton from the evaluated parameters of a literal.
    ///
    /// - DFA: `(states, input_symbols, transitions, initial_state, final_states[, allow_partial])`
    /// - NFA: `(states, input_symbols, transitions, initial_state, final_states)`
    /// - DTM: `(states, input_symbols, tape_symbols, transitions, initial_state, blank_symbol, final_states)`
    pub fn from_parameters(
        kind: AutomatonKind,
        parameters: &[Value],
    ) -> Result<Self, ConstructionError> {
        let automaton = match kind {
            AutomatonKind::Dfa => Self::Dfa(build_dfa(parameters)?),
            AutomatonKind::Nfa => Self::Nfa(build_nfa(parameters)?),
            AutomatonKind::Dtm => Self::Dtm(build_dtm(parameters)?),
        };

        analyze(&automaton)?;
        Ok(automaton)
    }

    pub fn kind(&self) -> AutomatonKind {
        match self {
            Self::Dfa(_) => AutomatonKind::Dfa,
            Self::Nfa(_) => AutomatonKind::Nfa,
            Self::Dtm(_) => AutomatonKind::Dtm,
        }
    }

    pub fn states(&self) -> &BTreeSet<String> {
        match self {
            Self::Dfa(dfa) => &dfa.states,
            Self::Nfa(nfa) => &nfa.states,
            Self::Dtm(dtm) => &dtm.states,
        }
    }

    pub fn initial_state(&self) -> &str {
        match self {
            Self::Dfa(dfa) => &dfa.initial_state,
            Self::Nfa(nfa) => &nfa.initial_state,
            Self::Dtm(dtm) => &dtm.initial_state,
        }
    }

    pub fn final_states(&self) -> &BTreeSet<String> {
        match self {
            Self::Dfa(dfa) => &dfa.final_states,
            Self::Nfa(nfa) => &nfa.final_states,
            Self::Dtm(dtm) => &dtm.final_states,
        }
    }

    pub fn is_final(&self, state: &str) -> bool {
        self.final_states().contains(state)
    }

    /// The state name prefixed with `→` if it is initial and `*` if it is final.
    pub fn state_label(&self, state: &str) -> String {
        let mut label = String::new();
        if state == self.initial_state() {
            label.push_str(INITIAL_MARKER);
        }
        if self.is_final(state) {
            label.push_str(FINAL_MARKER);
        }
        label.push_str(state);
        label
    }

    /// The state name prefixed with `*` if it is final.
    pub fn target_label(&self, state: &str) -> String {
        if self.is_final(state) {
            format!("{FINAL_MARKER}{state}")
        } else {
            state.to_string()
        }
    }
}

fn check_arity(
    kind: AutomatonKind,
    parameters: &[Value],
    allowed: &[usize],
) -> Result<(), ConstructionError> {
    if allowed.contains(&parameters.len()) {
        return Ok(());
    }
    let expected = allowed
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" or ");
    Err(ConstructionError::ArityMismatch {
        kind,
        expected,
        found: parameters.len(),
    })
}

fn build_dfa(parameters: &[Value]) -> Result<Dfa, ConstructionError> {
    check_arity(AutomatonKind::Dfa, parameters, &[5, 6])?;

    let mut transitions = BTreeMap::new();
    for (state, row) in mapping(&parameters[2], "transitions")? {
        let mut targets = BTreeMap::new();
        for (symbol_value, target) in mapping(row, "transitions")? {
            targets.insert(
                symbol(symbol_value, "transition symbol")?,
                symbol(target, "transition target")?,
            );
        }
        transitions.insert(symbol(state, "transition state")?, targets);
    }

    let allow_partial = match parameters.get(5) {
        None => false,
        Some(Value::Boolean(flag)) => *flag,
        Some(other) => return Err(malformed("allow_partial", "a boolean", other)),
    };

    Ok(Dfa {
        states: symbol_set(&parameters[0], "states")?,
        input_symbols: symbol_set(&parameters[1], "input_symbols")?,
        transitions,
        initial_state: symbol(&parameters[3], "initial_state")?,
        final_states: symbol_set(&parameters[4], "final_states")?,
        allow_partial,
    })
}

fn build_nfa(parameters: &[Value]) -> Result<Nfa, ConstructionError> {
    check_arity(AutomatonKind::Nfa, parameters, &[5])?;

    let mut transitions = BTreeMap::new();
    for (state, row) in mapping(&parameters[2], "transitions")? {
        let mut targets = BTreeMap::new();
        for (symbol_value, next) in mapping(row, "transitions")? {
            // A lone state is accepted as shorthand for a one-element set.
            let next_states = match next {
                Value::Set(_) => symbol_set(next, "transition targets")?,
                single => BTreeSet::from([symbol(single, "transition targets")?]),
            };
            targets.insert(symbol(symbol_value, "transition symbol")?, next_states);
        }
        transitions.insert(symbol(state, "transition state")?, targets);
    }

    Ok(Nfa {
        states: symbol_set(&parameters[0], "states")?,
        input_symbols: symbol_set(&parameters[1], "input_symbols")?,
        transitions,
        initial_state: symbol(&parameters[3], "initial_state")?,
        final_states: symbol_set(&parameters[4], "final_states")?,
    })
}

fn build_dtm(parameters: &[Value]) -> Result<Dtm, ConstructionError> {
    check_arity(AutomatonKind::Dtm, parameters, &[7])?;

    let mut transitions = BTreeMap::new();
    for (state, row) in mapping(&parameters[3], "transitions")? {
        let mut actions = BTreeMap::new();
        for (read, action) in mapping(row, "transitions")? {
            actions.insert(symbol(read, "read symbol")?, tape_action(action)?);
        }
        transitions.insert(symbol(state, "transition state")?, actions);
    }

    Ok(Dtm {
        states: symbol_set(&parameters[0], "states")?,
        input_symbols: symbol_set(&parameters[1], "input_symbols")?,
        tape_symbols: symbol_set(&parameters[2], "tape_symbols")?,
        transitions,
        initial_state: symbol(&parameters[4], "initial_state")?,
        blank_symbol: symbol(&parameters[5], "blank_symbol")?,
        final_states: symbol_set(&parameters[6], "final_states")?,
    })
}

/// Reads a `(next_state, write_symbol, direction)` transition target.
fn tape_action(value: &Value) -> Result<TapeAction, ConstructionError> {
    let parts = match value {
        Value::Tuple(parts) | Value::List(parts) if parts.len() == 3 => parts,
        other => {
            return Err(malformed(
                "transitions",
                "a (next_state, write_symbol, direction) tuple",
                other,
            ))
        }
    };

    let direction = symbol(&parts[2], "direction")?;
    Ok(TapeAction {
        next_state: symbol(&parts[0], "next state")?,
        write: symbol(&parts[1], "write symbol")?,
        direction: Direction::from_symbol(&direction)
            .ok_or(ConstructionError::InvalidDirection(direction))?,
    })
}

/// States and symbols are written as strings; integers are accepted for digit symbols.
fn symbol(value: &Value, parameter: &str) -> Result<String, ConstructionError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Integer(number) => Ok(number.to_string()),
        other => Err(malformed(parameter, "a string", other)),
    }
}

fn symbol_set(value: &Value, parameter: &str) -> Result<BTreeSet<String>, ConstructionError> {
    match value {
        Value::Set(items) => items.iter().map(|item| symbol(item, parameter)).collect(),
        Value::List(items) | Value::Tuple(items) => {
            items.iter().map(|item| symbol(item, parameter)).collect()
        }
        other => Err(malformed(parameter, "a set", other)),
    }
}

/// Entries of a dictionary parameter. `{}` evaluates to an empty set and is accepted as an
/// empty dictionary.
fn mapping<'a>(
    value: &'a Value,
    parameter: &str,
) -> Result<Vec<(&'a Value, &'a Value)>, ConstructionError> {
    match value {
        Value::Dictionary(entries) => Ok(entries.iter().collect()),
        Value::Set(items) if items.is_empty() => Ok(Vec::new()),
        other => Err(malformed(parameter, "a dictionary", other)),
    }
}

fn malformed(parameter: &str, expected: &str, found: &Value) -> ConstructionError {
    ConstructionError::MalformedParameter {
        parameter: parameter.to_string(),
        expected: expected.to_string(),
        found: found.value_type().to_string(),
    }
}

fn quoted<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let items = items
        .into_iter()
        .map(|item| format!("'{item}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{items}}}")
}

fn nested<V>(
    transitions: &BTreeMap<String, BTreeMap<String, V>>,
    cell: impl Fn(&V) -> String,
) -> String {
    let rows = transitions
        .iter()
        .map(|(state, row)| {
            let cells = row
                .iter()
                .map(|(symbol, value)| format!("'{symbol}': {}", cell(value)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("'{state}': {{{cells}}}")
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{rows}}}")
}

impl fmt::Display for Automaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dfa(dfa) => write!(
                f,
                "DFA(states={}, input_symbols={}, transitions={}, initial_state='{}', final_states={}, allow_partial={})",
                quoted(&dfa.states),
                quoted(&dfa.input_symbols),
                nested(&dfa.transitions, |next| format!("'{next}'")),
                dfa.initial_state,
                quoted(&dfa.final_states),
                if dfa.allow_partial { "True" } else { "False" },
            ),
            Self::Nfa(nfa) => write!(
                f,
                "NFA(states={}, input_symbols={}, transitions={}, initial_state='{}', final_states={})",
                quoted(&nfa.states),
                quoted(&nfa.input_symbols),
                nested(&nfa.transitions, |next| quoted(next)),
                nfa.initial_state,
                quoted(&nfa.final_states),
            ),
            Self::Dtm(dtm) => write!(
                f,
                "DTM(states={}, input_symbols={}, tape_symbols={}, transitions={}, initial_state='{}', blank_symbol='{}', final_states={})",
                quoted(&dtm.states),
                quoted(&dtm.input_symbols),
                quoted(&dtm.tape_symbols),
                nested(&dtm.transitions, |action| format!(
                    "('{}', '{}', '{}')",
                    action.next_state, action.write, action.direction
                )),
                dtm.initial_state,
                dtm.blank_symbol,
                quoted(&dtm.final_states),
            ),
        }
    }
}

/// Helpers to write automaton parameters in tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn s(text: &str) -> Value {
        Value::String(text.to_string())
    }

    pub fn set(items: &[&str]) -> Value {
        Value::Set(items.iter().map(|item| s(item)).collect())
    }

    pub fn dict(entries: Vec<(Value, Value)>) -> Value {
        Value::Dictionary(entries.into_iter().collect())
    }

    /// Builds `{state: {symbol: target}}` from `(state, symbol, target)` triples.
    pub fn table(rows: &[(&str, &[(&str, Value)])]) -> Value {
        dict(
            rows.iter()
                .map(|(state, cells)| {
                    let row = dict(
                        cells
                            .iter()
                            .map(|(sym, target)| (s(sym), target.clone()))
                            .collect(),
                    );
                    (s(state), row)
                })
                .collect(),
        )
    }

    pub fn action(next: &str, write: &str, direction: &str) -> Value {
        Value::Tuple(vec![s(next), s(write), s(direction)])
    }

    /// States `{S0, S1}` over `{a, b}`; accepts words ending in `a`.
    pub fn ends_with_a() -> Automaton {
        let parameters = vec![
            set(&["S0", "S1"]),
            set(&["a", "b"]),
            table(&[
                ("S0", &[("a", s("S1")), ("b", s("S0"))]),
                ("S1", &[("a", s("S1")), ("b", s("S0"))]),
            ]),
            s("S0"),
            set(&["S1"]),
        ];
        Automaton::from_parameters(AutomatonKind::Dfa, &parameters).unwrap()
    }

    /// Accepts words over `{0, 1}` whose second-to-last symbol is `1`.
    pub fn second_last_is_one() -> Automaton {
        let parameters = vec![
            set(&["q0", "q1", "q2"]),
            set(&["0", "1"]),
            table(&[
                ("q0", &[("0", set(&["q0"])), ("1", set(&["q0", "q1"]))]),
                ("q1", &[("0", set(&["q2"])), ("1", set(&["q2"]))]),
            ]),
            s("q0"),
            set(&["q2"]),
        ];
        Automaton::from_parameters(AutomatonKind::Nfa, &parameters).unwrap()
    }

    /// Accepts `a` followed by any number of `b`, with an epsilon move into the loop.
    pub fn epsilon_nfa() -> Automaton {
        let parameters = vec![
            set(&["p", "q", "r"]),
            set(&["a", "b"]),
            table(&[
                ("p", &[("a", set(&["q"]))]),
                ("q", &[("", set(&["r"]))]),
                ("r", &[("b", set(&["r"]))]),
            ]),
            s("p"),
            set(&["r"]),
        ];
        Automaton::from_parameters(AutomatonKind::Nfa, &parameters).unwrap()
    }

    /// Adds one to a binary number: walks right to the end, then carries leftwards.
    pub fn binary_increment() -> Automaton {
        let parameters = vec![
            set(&["right", "carry", "done"]),
            set(&["0", "1"]),
            set(&["0", "1", "_"]),
            table(&[
                (
                    "right",
                    &[
                        ("0", action("right", "0", "R")),
                        ("1", action("right", "1", "R")),
                        ("_", action("carry", "_", "L")),
                    ],
                ),
                (
                    "carry",
                    &[
                        ("1", action("carry", "0", "L")),
                        ("0", action("done", "1", "N")),
                        ("_", action("done", "1", "N")),
                    ],
                ),
            ]),
            s("right"),
            s("_"),
            set(&["done"]),
        ];
        Automaton::from_parameters(AutomatonKind::Dtm, &parameters).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_build_dfa() {
        let Automaton::Dfa(dfa) = ends_with_a() else {
            panic!("Expected a DFA");
        };
        assert_eq!(dfa.initial_state, "S0");
        assert_eq!(dfa.transitions["S0"]["a"], "S1");
        assert!(!dfa.allow_partial);
    }

    #[test]
    fn test_build_dfa_arity() {
        let error = Automaton::from_parameters(AutomatonKind::Dfa, &[set(&["q"])]).unwrap_err();
        assert_eq!(
            error,
            ConstructionError::ArityMismatch {
                kind: AutomatonKind::Dfa,
                expected: "5 or 6".to_string(),
                found: 1,
            }
        );
    }

    #[test]
    fn test_build_malformed_transitions() {
        let parameters = vec![set(&["q"]), set(&["a"]), s("oops"), s("q"), set(&["q"])];
        let error = Automaton::from_parameters(AutomatonKind::Nfa, &parameters).unwrap_err();
        assert!(matches!(
            error,
            ConstructionError::MalformedParameter { ref found, .. } if found == "string"
        ));
    }

    #[test]
    fn test_build_partial_dfa() {
        let parameters = vec![
            set(&["q", "dead"]),
            set(&["a", "b"]),
            table(&[("q", &[("a", s("q"))]), ("dead", &[])]),
            s("q"),
            set(&["q"]),
            Value::Boolean(true),
        ];
        let automaton = Automaton::from_parameters(AutomatonKind::Dfa, &parameters).unwrap();
        assert_eq!(automaton.kind(), AutomatonKind::Dfa);
    }

    #[test]
    fn test_build_nfa_single_target_shorthand() {
        let parameters = vec![
            set(&["p", "q"]),
            set(&["a"]),
            table(&[("p", &[("a", s("q"))])]),
            s("p"),
            set(&["q"]),
        ];
        let automaton = Automaton::from_parameters(AutomatonKind::Nfa, &parameters).unwrap();
        let Automaton::Nfa(nfa) = automaton else {
            panic!("Expected an NFA");
        };
        assert_eq!(nfa.transitions["p"]["a"], BTreeSet::from(["q".to_string()]));
    }

    #[test]
    fn test_build_dtm() {
        let Automaton::Dtm(dtm) = binary_increment() else {
            panic!("Expected a DTM");
        };
        assert_eq!(dtm.blank_symbol, "_");
        assert_eq!(
            dtm.transitions["carry"]["1"],
            TapeAction {
                next_state: "carry".to_string(),
                write: "0".to_string(),
                direction: Direction::Left,
            }
        );
    }

    #[test]
    fn test_build_dtm_bad_direction() {
        let parameters = vec![
            set(&["q"]),
            set(&["a"]),
            set(&["a", "_"]),
            table(&[("q", &[("a", action("q", "a", "X"))])]),
            s("q"),
            s("_"),
            set(&[]),
        ];
        let error = Automaton::from_parameters(AutomatonKind::Dtm, &parameters).unwrap_err();
        assert_eq!(error, ConstructionError::InvalidDirection("X".to_string()));
    }

    #[test]
    fn test_state_labels() {
        let automaton = ends_with_a();
        assert_eq!(automaton.state_label("S0"), "→S0");
        assert_eq!(automaton.state_label("S1"), "*S1");
        assert_eq!(automaton.target_label("S1"), "*S1");
        assert_eq!(automaton.target_label("S0"), "S0");
    }

    #[test]
    fn test_display() {
        let text = ends_with_a().to_string();
        assert!(text.starts_with("DFA(states={'S0', 'S1'}, input_symbols={'a', 'b'}"));
        assert!(text.contains("'S0': {'a': 'S1', 'b': 'S0'}"));
        assert!(text.ends_with("final_states={'S1'}, allow_partial=False)"));
    }
}
