//! This module checks automaton definitions against their structural invariants before they are
//! bound to a name: declared states, alphabets, DFA totality and the Turing machine tape alphabet.

use crate::{
    automaton::Automaton,
    types::{ConstructionError, EPSILON},
};
use std::collections::BTreeSet;

/// Analyzes an automaton and returns the first invariant it violates.
///
/// Checks run in a fixed order so the reported error is deterministic. States that cannot be
/// reached from the initial state are legal and only logged.
pub fn analyze(automaton: &Automaton) -> Result<(), ConstructionError> {
    let checks: [fn(&Automaton) -> Result<(), ConstructionError>; 6] = [
        check_initial_state,
        check_final_states,
        check_transition_states,
        check_transition_symbols,
        check_tape_alphabet,
        check_totality,
    ];
    checks.iter().try_for_each(|check| check(automaton))?;

    let unreachable = unreachable_states(automaton);
    if !unreachable.is_empty() {
        log::warn!(
            "{} has states unreachable from '{}': {:?}",
            automaton.kind(),
            automaton.initial_state(),
            unreachable
        );
    }

    Ok(())
}

/// One transition edge: `(source, read symbol, target)`.
type Edge<'a> = (&'a str, &'a str, &'a str);

fn edges(automaton: &Automaton) -> Vec<Edge<'_>> {
    match automaton {
        Automaton::Dfa(dfa) => dfa
            .transitions
            .iter()
            .flat_map(|(from, row)| {
                row.iter()
                    .map(move |(symbol, to)| (from.as_str(), symbol.as_str(), to.as_str()))
            })
            .collect(),
        Automaton::Nfa(nfa) => nfa
            .transitions
            .iter()
            .flat_map(|(from, row)| {
                row.iter().flat_map(move |(symbol, targets)| {
                    targets
                        .iter()
                        .map(move |to| (from.as_str(), symbol.as_str(), to.as_str()))
                })
            })
            .collect(),
        Automaton::Dtm(dtm) => dtm
            .transitions
            .iter()
            .flat_map(|(from, row)| {
                row.iter().map(move |(symbol, action)| {
                    (from.as_str(), symbol.as_str(), action.next_state.as_str())
                })
            })
            .collect(),
    }
}

fn check_initial_state(automaton: &Automaton) -> Result<(), ConstructionError> {
    let initial = automaton.initial_state();
    if automaton.states().contains(initial) {
        Ok(())
    } else {
        Err(ConstructionError::MissingInitialState(initial.to_string()))
    }
}

fn check_final_states(automaton: &Automaton) -> Result<(), ConstructionError> {
    automaton
        .final_states()
        .iter()
        .find(|state| !automaton.states().contains(*state))
        .map_or(Ok(()), |state| {
            Err(ConstructionError::DanglingStateReference {
                state: state.clone(),
                context: "final_states".to_string(),
            })
        })
}

/// Every source and target state of a transition must be declared.
fn check_transition_states(automaton: &Automaton) -> Result<(), ConstructionError> {
    let states = automaton.states();
    for (from, symbol, to) in edges(automaton) {
        if !states.contains(from) {
            return Err(ConstructionError::DanglingStateReference {
                state: from.to_string(),
                context: "transitions".to_string(),
            });
        }
        if !states.contains(to) {
            return Err(ConstructionError::DanglingStateReference {
                state: to.to_string(),
                context: format!("transition '{from}' on '{symbol}'"),
            });
        }
    }

    // A DTM row may exist for a state without any action, edges() would not see it.
    if let Automaton::Dtm(dtm) = automaton {
        if let Some(state) = dtm.transitions.keys().find(|s| !states.contains(*s)) {
            return Err(ConstructionError::DanglingStateReference {
                state: state.clone(),
                context: "transitions".to_string(),
            });
        }
    }

    Ok(())
}

fn check_transition_symbols(automaton: &Automaton) -> Result<(), ConstructionError> {
    let not_in = |symbol: &str, from: &str, alphabet: &str| ConstructionError::SymbolNotInAlphabet {
        symbol: symbol.to_string(),
        context: format!("a transition of '{from}'"),
        alphabet: alphabet.to_string(),
    };

    match automaton {
        Automaton::Dfa(dfa) => {
            for (from, symbol, _) in edges(automaton) {
                if !dfa.input_symbols.contains(symbol) {
                    return Err(not_in(symbol, from, "input_symbols"));
                }
            }
        }
        Automaton::Nfa(nfa) => {
            for (from, symbol, _) in edges(automaton) {
                if symbol != EPSILON && !nfa.input_symbols.contains(symbol) {
                    return Err(not_in(symbol, from, "input_symbols"));
                }
            }
        }
        Automaton::Dtm(dtm) => {
            for (from, row) in &dtm.transitions {
                for (read, action) in row {
                    if !dtm.tape_symbols.contains(read) {
                        return Err(not_in(read, from, "tape_symbols"));
                    }
                    if !dtm.tape_symbols.contains(&action.write) {
                        return Err(not_in(&action.write, from, "tape_symbols"));
                    }
                }
            }
        }
    }

    Ok(())
}

/// The blank symbol and every input symbol must be tape symbols, and blank cannot be an input.
fn check_tape_alphabet(automaton: &Automaton) -> Result<(), ConstructionError> {
    let Automaton::Dtm(dtm) = automaton else {
        return Ok(());
    };

    if !dtm.tape_symbols.contains(&dtm.blank_symbol) {
        return Err(ConstructionError::SymbolNotInAlphabet {
            symbol: dtm.blank_symbol.clone(),
            context: "blank_symbol".to_string(),
            alphabet: "tape_symbols".to_string(),
        });
    }
    if dtm.input_symbols.contains(&dtm.blank_symbol) {
        return Err(ConstructionError::MalformedParameter {
            parameter: "input_symbols".to_string(),
            expected: "a set without the blank symbol".to_string(),
            found: format!("'{}'", dtm.blank_symbol),
        });
    }
    if let Some(symbol) = dtm
        .input_symbols
        .iter()
        .find(|symbol| !dtm.tape_symbols.contains(*symbol))
    {
        return Err(ConstructionError::SymbolNotInAlphabet {
            symbol: symbol.clone(),
            context: "input_symbols".to_string(),
            alphabet: "tape_symbols".to_string(),
        });
    }

    Ok(())
}

/// A DFA must define a move for every (state, symbol) pair unless it allows partial transitions.
fn check_totality(automaton: &Automaton) -> Result<(), ConstructionError> {
    let Automaton::Dfa(dfa) = automaton else {
        return Ok(());
    };
    if dfa.allow_partial {
        return Ok(());
    }

    for state in &dfa.states {
        for symbol in &dfa.input_symbols {
            let defined = dfa
                .transitions
                .get(state)
                .is_some_and(|row| row.contains_key(symbol));
            if !defined {
                return Err(ConstructionError::MissingTransition {
                    state: state.clone(),
                    symbol: symbol.clone(),
                });
            }
        }
    }

    Ok(())
}

/// States that no sequence of transitions leads to from the initial state.
pub fn unreachable_states(automaton: &Automaton) -> BTreeSet<String> {
    let edges = edges(automaton);
    let mut visited = BTreeSet::new();
    let mut queue = vec![automaton.initial_state()];

    while let Some(state) = queue.pop() {
        if !visited.insert(state) {
            continue;
        }
        for &(from, _, to) in &edges {
            if from == state && !visited.contains(to) {
                queue.push(to);
            }
        }
    }

    automaton
        .states()
        .iter()
        .filter(|state| !visited.contains(state.as_str()))
        .cloned()
        .collect()
}
