//! Plain-text tables: transition tables for `definition` and step tables for `test`.

use crate::{
    automaton::Automaton,
    simulate::{symbol_label, Trace},
    types::{AutomatonKind, EMPTY_LABEL},
};
use std::collections::BTreeSet;
use std::fmt;

/// A left-aligned text grid with a header row and an optional caption line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub caption: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .chain(std::iter::once(column))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> fmt::Result {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| {
            let padding = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(f, "{}", line.trim_end())
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(caption) = &self.caption {
            writeln!(f, "{caption}")?;
        }
        let widths = self.widths();
        write_row(f, &self.columns, &widths)?;
        for row in &self.rows {
            write_row(f, row, &widths)?;
        }
        Ok(())
    }
}

/// The transition table of an automaton.
///
/// One row per declared state in sorted order, one column per symbol in sorted order. Row
/// labels carry `→`/`*` markers, destinations carry `*` when final. A cell with several
/// destinations is written as a set, a missing cell as `∅`.
pub fn definition(automaton: &Automaton) -> Table {
    let symbols: BTreeSet<&str> = match automaton {
        Automaton::Dfa(dfa) => dfa
            .input_symbols
            .iter()
            .chain(dfa.transitions.values().flat_map(|row| row.keys()))
            .map(String::as_str)
            .collect(),
        Automaton::Nfa(nfa) => nfa
            .input_symbols
            .iter()
            .chain(nfa.transitions.values().flat_map(|row| row.keys()))
            .map(String::as_str)
            .collect(),
        Automaton::Dtm(dtm) => dtm.tape_symbols.iter().map(String::as_str).collect(),
    };

    let mut columns = vec![String::new()];
    columns.extend(symbols.iter().map(|symbol| symbol_label(symbol).to_string()));

    let rows = automaton
        .states()
        .iter()
        .map(|state| {
            let mut row = vec![automaton.state_label(state)];
            row.extend(symbols.iter().map(|symbol| {
                cell(automaton, state, symbol).unwrap_or_else(|| EMPTY_LABEL.to_string())
            }));
            row
        })
        .collect();

    Table {
        caption: None,
        columns,
        rows,
    }
}

fn cell(automaton: &Automaton, state: &str, symbol: &str) -> Option<String> {
    match automaton {
        Automaton::Dfa(dfa) => dfa
            .transitions
            .get(state)?
            .get(symbol)
            .map(|next| automaton.target_label(next)),
        Automaton::Nfa(nfa) => {
            let targets = nfa.transitions.get(state)?.get(symbol)?;
            let labels: Vec<String> = targets
                .iter()
                .map(|next| automaton.target_label(next))
                .collect();
            match labels.as_slice() {
                [] => None,
                [single] => Some(single.clone()),
                many => Some(format!("{{{}}}", many.join(","))),
            }
        }
        Automaton::Dtm(dtm) => dtm.transitions.get(state)?.get(symbol).map(|action| {
            format!(
                "{},{},{}",
                automaton.target_label(&action.next_state),
                action.write,
                action.direction
            )
        }),
    }
}

/// The step table of a trace, captioned with its verdict.
pub fn steps(automaton: &Automaton, trace: &Trace) -> Table {
    let symbol_column = match trace.kind {
        AutomatonKind::Dtm => "Read/Write/Move:",
        AutomatonKind::Dfa | AutomatonKind::Nfa => "Input symbol:",
    };
    let label = |state: &Option<String>| match state {
        Some(state) => automaton.state_label(state),
        None if trace.kind == AutomatonKind::Dtm => String::new(),
        None => EMPTY_LABEL.to_string(),
    };

    let rows = trace
        .steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            vec![
                (i + 1).to_string(),
                label(&step.from),
                step.label.clone(),
                label(&step.to),
            ]
        })
        .collect();

    Table {
        caption: Some(trace.header()),
        columns: vec![
            "Step:".to_string(),
            "Current state:".to_string(),
            symbol_column.to_string(),
            "New state:".to_string(),
        ],
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::fixtures::*;
    use crate::simulate;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_dfa_definition() {
        let table = definition(&ends_with_a());
        assert_eq!(table.columns, vec!["", "a", "b"]);
        assert_eq!(
            table.rows,
            vec![vec!["→S0", "*S1", "S0"], vec!["*S1", "*S1", "S0"]]
        );
        assert_eq!(table.to_string(), "     a    b\n→S0  *S1  S0\n*S1  *S1  S0\n");
    }

    #[test]
    fn test_definition_is_idempotent() {
        let automaton = second_last_is_one();
        assert_eq!(definition(&automaton).to_string(), definition(&automaton).to_string());
    }

    #[test]
    fn test_nfa_definition_cells() {
        let table = definition(&second_last_is_one());
        assert_eq!(table.columns, vec!["", "0", "1"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["→q0", "q0", "{q0,q1}"],
                vec!["q1", "*q2", "*q2"],
                vec!["*q2", "∅", "∅"],
            ]
        );
    }

    #[test]
    fn test_nfa_lambda_column() {
        let table = definition(&epsilon_nfa());
        assert_eq!(table.columns, vec!["", "λ", "a", "b"]);
        assert_eq!(table.rows[1], vec!["q", "*r", "∅", "∅"]);
    }

    #[test]
    fn test_dtm_definition() {
        let table = definition(&binary_increment());
        assert_eq!(table.columns, vec!["", "0", "1", "_"]);
        assert_eq!(table.rows[0], vec!["carry", "*done,1,N", "carry,0,L", "*done,1,N"]);
        assert_eq!(table.rows[1], vec!["*done", "∅", "∅", "∅"]);
    }

    #[test]
    fn test_step_table() {
        let automaton = ends_with_a();
        let trace = simulate::run(&automaton, "ba", &mut StdRng::seed_from_u64(1)).unwrap();
        let table = steps(&automaton, &trace);

        assert_eq!(table.caption.as_deref(), Some("[DFA on \"ba\" is Accepted!]"));
        assert_eq!(
            table.rows,
            vec![vec!["1", "→S0", "b", "→S0"], vec!["2", "→S0", "a", "*S1"]]
        );
        assert!(table
            .to_string()
            .contains("Step:  Current state:  Input symbol:  New state:"));
    }

    #[test]
    fn test_dtm_step_table() {
        let automaton = binary_increment();
        let trace = simulate::run(&automaton, "", &mut StdRng::seed_from_u64(1)).unwrap();
        let table = steps(&automaton, &trace);

        assert_eq!(table.columns[2], "Read/Write/Move:");
        assert_eq!(table.rows[0], vec!["1", "", "$/$,R", "→right"]);
    }

    #[test]
    fn test_dead_end_row() {
        let automaton = ends_with_a();
        let trace = simulate::run(&automaton, "c", &mut StdRng::seed_from_u64(1)).unwrap();
        let table = steps(&automaton, &trace);
        assert_eq!(table.rows, vec![vec!["1", "→S0", "c", "∅"]]);
    }
}
