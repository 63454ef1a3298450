//! Acceptance testing and step traces for every automaton kind.
//!
//! The accept/reject verdict is always computed deterministically. For NFAs a single witness
//! path is then reconstructed by bounded random walks, only to explain the verdict.

use crate::{
    automaton::{Automaton, Dfa, Dtm, Nfa},
    machine::{Configuration, TuringMachine},
    types::{
        AutomatonKind, Direction, InterpreterError, EPSILON, EPSILON_LABEL, LAMBDA_LABEL,
        NFA_PATH_ATTEMPTS, NFA_WALK_ATTEMPTS,
    },
};
use rand::{seq::SliceRandom, Rng};
use std::collections::{BTreeMap, BTreeSet};

/// Label of the synthetic first step of a Turing machine trace, entering the initial state.
pub const DTM_START_LABEL: &str = "$/$,R";

/// One row of a trace. `None` stands for the empty state set of a dead end, or for the
/// missing source of the synthetic start step of a Turing machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep {
    pub from: Option<String>,
    /// The input symbol, or `read/write,move` for Turing machines.
    pub label: String,
    pub to: Option<String>,
}

/// How an automaton processed one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    pub kind: AutomatonKind,
    pub input: String,
    pub accepted: bool,
    pub steps: Vec<TraceStep>,
}

impl Trace {
    pub fn verdict(&self) -> &'static str {
        if self.accepted {
            "Accepted!"
        } else {
            "Rejected..."
        }
    }

    /// `[DFA on "ab" is Accepted!]`
    pub fn header(&self) -> String {
        format!("[{} on \"{}\" is {}]", self.kind, self.input, self.verdict())
    }
}

/// Runs `automaton` on `input` and returns the verdict with the steps taken.
///
/// Fails with [`InterpreterError::PathNotFound`] when no NFA witness path could be found.
pub fn run<R: Rng + ?Sized>(
    automaton: &Automaton,
    input: &str,
    rng: &mut R,
) -> Result<Trace, InterpreterError> {
    log::debug!("Running {} on {:?}", automaton.kind(), input);
    let (accepted, steps) = match automaton {
        Automaton::Dfa(dfa) => dfa_steps(dfa, input),
        Automaton::Nfa(nfa) => {
            let accepted = nfa_accepts(nfa, input);
            (accepted, witness_path(nfa, input, accepted, rng)?)
        }
        Automaton::Dtm(dtm) => dtm_steps(dtm, input),
    };

    Ok(Trace {
        kind: automaton.kind(),
        input: input.to_string(),
        accepted,
        steps,
    })
}

fn symbols(input: &str) -> impl Iterator<Item = String> + '_ {
    input.chars().map(String::from)
}

fn dfa_steps(dfa: &Dfa, input: &str) -> (bool, Vec<TraceStep>) {
    let mut current = dfa.initial_state.clone();
    let mut steps = Vec::new();

    for symbol in symbols(input) {
        let next = dfa
            .transitions
            .get(&current)
            .and_then(|row| row.get(&symbol))
            .cloned();
        steps.push(TraceStep {
            from: Some(current.clone()),
            label: symbol,
            to: next.clone(),
        });
        match next {
            Some(next) => current = next,
            // A partial DFA rejects as soon as it has no move.
            None => return (false, steps),
        }
    }

    (dfa.final_states.contains(&current), steps)
}

/// All states reachable from `states` through epsilon transitions, `states` included.
pub fn epsilon_closure(nfa: &Nfa, states: &BTreeSet<String>) -> BTreeSet<String> {
    let mut closure = states.clone();
    let mut stack: Vec<String> = states.iter().cloned().collect();

    while let Some(state) = stack.pop() {
        let targets = nfa
            .transitions
            .get(&state)
            .and_then(|row| row.get(EPSILON));
        for target in targets.into_iter().flatten() {
            if closure.insert(target.clone()) {
                stack.push(target.clone());
            }
        }
    }

    closure
}

/// States reached from `states` by reading `symbol`, closed under epsilon moves.
fn next_states(nfa: &Nfa, states: &BTreeSet<String>, symbol: &str) -> BTreeSet<String> {
    let moved: BTreeSet<String> = states
        .iter()
        .filter_map(|state| nfa.transitions.get(state))
        .filter_map(|row| row.get(symbol))
        .flatten()
        .cloned()
        .collect();
    epsilon_closure(nfa, &moved)
}

pub fn nfa_accepts(nfa: &Nfa, input: &str) -> bool {
    let start = BTreeSet::from([nfa.initial_state.clone()]);
    let mut current = epsilon_closure(nfa, &start);

    for symbol in symbols(input) {
        current = next_states(nfa, &current, &symbol);
        if current.is_empty() {
            return false;
        }
    }

    current.iter().any(|state| nfa.final_states.contains(state))
}

/// Successors of each single state per input symbol, closed under epsilon moves on both
/// sides, plus the epsilon-closure of each state. Built once per witness search.
struct Moves {
    closures: BTreeMap<String, BTreeSet<String>>,
    successors: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl Moves {
    fn new(nfa: &Nfa, input: &[String]) -> Self {
        let alphabet: BTreeSet<&String> = input.iter().collect();
        let closures: BTreeMap<String, BTreeSet<String>> = nfa
            .states
            .iter()
            .map(|state| {
                let closure = epsilon_closure(nfa, &BTreeSet::from([state.clone()]));
                (state.clone(), closure)
            })
            .collect();

        let successors: BTreeMap<String, BTreeMap<String, Vec<String>>> = closures
            .iter()
            .map(|(state, closure)| {
                let row: BTreeMap<String, Vec<String>> = alphabet
                    .iter()
                    .map(|symbol| {
                        let next = next_states(nfa, closure, symbol);
                        ((*symbol).clone(), next.into_iter().collect())
                    })
                    .collect();
                (state.clone(), row)
            })
            .collect();

        Self {
            closures,
            successors,
        }
    }

    fn successors(&self, state: &str, symbol: &str) -> &[String] {
        self.successors
            .get(state)
            .and_then(|row| row.get(symbol))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn closure_reaches(&self, state: &str, targets: &BTreeSet<String>) -> bool {
        self.closures
            .get(state)
            .is_some_and(|closure| closure.iter().any(|s| targets.contains(s)))
    }
}

/// Reconstructs one path whose outcome agrees with `accepted`.
///
/// Each walk picks a uniformly random successor per symbol. An accepting walk must consume
/// the whole input and stop on a final state; a rejecting walk must consume the whole input
/// or run into a dead end.
pub fn witness_path<R: Rng + ?Sized>(
    nfa: &Nfa,
    input: &str,
    accepted: bool,
    rng: &mut R,
) -> Result<Vec<TraceStep>, InterpreterError> {
    let input: Vec<String> = symbols(input).collect();
    let moves = Moves::new(nfa, &input);

    for attempt in 0..NFA_PATH_ATTEMPTS {
        for _ in 0..NFA_WALK_ATTEMPTS {
            if let Some(path) = random_walk(nfa, &moves, &input, accepted, rng) {
                return Ok(path);
            }
        }
        log::debug!("No witness path in attempt {}", attempt + 1);
    }

    Err(InterpreterError::PathNotFound)
}

fn random_walk<R: Rng + ?Sized>(
    nfa: &Nfa,
    moves: &Moves,
    input: &[String],
    accepted: bool,
    rng: &mut R,
) -> Option<Vec<TraceStep>> {
    let mut current = nfa.initial_state.as_str();
    let mut path = Vec::with_capacity(input.len());

    for symbol in input {
        let Some(next) = moves.successors(current, symbol).choose(rng) else {
            if accepted {
                return None;
            }
            path.push(TraceStep {
                from: Some(current.to_string()),
                label: symbol.clone(),
                to: None,
            });
            return Some(path);
        };

        path.push(TraceStep {
            from: Some(current.to_string()),
            label: symbol.clone(),
            to: Some(next.clone()),
        });
        current = next.as_str();
    }

    if !accepted {
        return Some(path);
    }

    let lands_on_final = if input.is_empty() {
        moves.closure_reaches(current, &nfa.final_states)
    } else {
        nfa.final_states.contains(current)
    };
    lands_on_final.then_some(path)
}

fn edge_symbol(symbol: &str) -> &str {
    if symbol == EPSILON {
        EPSILON_LABEL
    } else {
        symbol
    }
}

/// Symbol shown for an input symbol in finite automaton tables.
pub fn symbol_label(symbol: &str) -> &str {
    if symbol == EPSILON {
        LAMBDA_LABEL
    } else {
        symbol
    }
}

fn dtm_steps(dtm: &Dtm, input: &str) -> (bool, Vec<TraceStep>) {
    let execution = TuringMachine::new(dtm, input).run();

    let mut steps = vec![TraceStep {
        from: None,
        label: DTM_START_LABEL.to_string(),
        to: Some(dtm.initial_state.clone()),
    }];
    steps.extend(
        execution
            .configurations
            .windows(2)
            .map(|pair| dtm_step(&pair[0], &pair[1])),
    );

    (execution.accepted, steps)
}

/// Recovers the move between two consecutive configurations from the head positions, and the
/// read and written symbols from the cell the head left.
fn dtm_step(before: &Configuration, after: &Configuration) -> TraceStep {
    let (direction, cell) = match after.head.cmp(&before.head) {
        std::cmp::Ordering::Greater => (Direction::Right, after.head - 1),
        std::cmp::Ordering::Less => (Direction::Left, after.head + 1),
        std::cmp::Ordering::Equal => (Direction::None, after.head),
    };
    let read = edge_symbol(before.tape.read(cell));
    let write = edge_symbol(after.tape.read(cell));

    TraceStep {
        from: Some(before.state.clone()),
        label: format!("{read}/{write},{direction}"),
        to: Some(after.state.clone()),
    }
}
