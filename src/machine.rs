//! This module defines the `TuringMachine` struct, which runs a single-tape deterministic Turing
//! machine over an input word. It handles the tape, the head movements and the execution of
//! transition rules, and records every configuration it passes through.

use crate::{
    automaton::{Dtm, TapeAction},
    types::{Direction, MAX_EXECUTION_STEPS},
};

/// An unbounded tape. Cells are addressed by absolute position; position 0 holds the first
/// input symbol and positions left of it are reachable by moving left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<String>,
    /// Absolute position of `cells[0]`.
    origin: i64,
    blank: String,
}

impl Tape {
    /// A tape holding one cell per character of `input`, or a single blank for empty input.
    pub fn new(input: &str, blank: &str) -> Self {
        let mut cells: Vec<String> = input.chars().map(String::from).collect();
        if cells.is_empty() {
            cells.push(blank.to_string());
        }
        Self {
            cells,
            origin: 0,
            blank: blank.to_string(),
        }
    }

    /// The symbol at `position`, blank outside the written region.
    pub fn read(&self, position: i64) -> &str {
        usize::try_from(position - self.origin)
            .ok()
            .and_then(|index| self.cells.get(index))
            .map_or(self.blank.as_str(), String::as_str)
    }

    pub fn write(&mut self, position: i64, symbol: &str) {
        while position < self.origin {
            self.cells.insert(0, self.blank.clone());
            self.origin -= 1;
        }
        let index = (position - self.origin) as usize;
        if index >= self.cells.len() {
            self.cells.resize(index + 1, self.blank.clone());
        }
        self.cells[index] = symbol.to_string();
    }

    /// The written cells from the leftmost to the rightmost position.
    pub fn cells(&self) -> &[String] {
        &self.cells
    }
}

/// A snapshot of the machine: `(state, tape, head)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub state: String,
    pub tape: Tape,
    pub head: i64,
}

impl Configuration {
    pub fn symbol(&self) -> &str {
        self.tape.read(self.head)
    }
}

/// The result of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// No transition is defined for the current state and symbol.
    Halt,
}

pub struct TuringMachine<'a> {
    dtm: &'a Dtm,
    configuration: Configuration,
    step_count: usize,
}

impl<'a> TuringMachine<'a> {
    /// Places `input` on the tape with the head on its first symbol.
    pub fn new(dtm: &'a Dtm, input: &str) -> Self {
        Self {
            dtm,
            configuration: Configuration {
                state: dtm.initial_state.clone(),
                tape: Tape::new(input, &dtm.blank_symbol),
                head: 0,
            },
            step_count: 0,
        }
    }

    /// Finds the action for the current state and the symbol under the head.
    pub fn transition(&self) -> Option<&'a TapeAction> {
        self.dtm
            .transitions
            .get(&self.configuration.state)
            .and_then(|row| row.get(self.configuration.symbol()))
    }

    /// Writes, moves and changes state according to the matching transition.
    ///
    /// Reaching a final state does not stop the machine; it halts only when no transition applies.
    pub fn step(&mut self) -> Step {
        let Some(action) = self.transition() else {
            return Step::Halt;
        };

        let head = self.configuration.head;
        self.configuration.tape.write(head, &action.write);
        self.configuration.head = match action.direction {
            Direction::Left => head - 1,
            Direction::Right => head + 1,
            Direction::None => head,
        };
        self.configuration.state = action.next_state.clone();
        self.step_count += 1;

        log::trace!(
            "DTM step {}: {} at {}",
            self.step_count,
            self.configuration.state,
            self.configuration.head
        );
        Step::Continue
    }

    /// Runs the machine until it halts or reaches [`MAX_EXECUTION_STEPS`], returning every
    /// configuration starting with the initial one.
    pub fn run(&mut self) -> Execution {
        let mut configurations = vec![self.configuration.clone()];
        for _ in 0..MAX_EXECUTION_STEPS {
            match self.step() {
                Step::Continue => configurations.push(self.configuration.clone()),
                Step::Halt => {
                    let accepted = self.is_accepting();
                    return Execution {
                        configurations,
                        halted: true,
                        accepted,
                    };
                }
            }
        }

        log::warn!(
            "DTM stopped after {} steps without halting",
            MAX_EXECUTION_STEPS
        );
        Execution {
            configurations,
            halted: false,
            accepted: false,
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn is_accepting(&self) -> bool {
        self.dtm.final_states.contains(&self.configuration.state)
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }
}

/// Every configuration of a run and its verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub configurations: Vec<Configuration>,
    /// False if the run was cut off by the step bound.
    pub halted: bool,
    pub accepted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::{fixtures::binary_increment, Automaton};
    use std::collections::BTreeMap;

    fn increment() -> Dtm {
        match binary_increment() {
            Automaton::Dtm(dtm) => dtm,
            other => panic!("Expected a DTM, found {other}"),
        }
    }

    fn tape_text(configuration: &Configuration) -> String {
        configuration.tape.cells().concat()
    }

    #[test]
    fn test_tape_extends_both_ways() {
        let mut tape = Tape::new("ab", "_");
        assert_eq!(tape.read(-3), "_");
        assert_eq!(tape.read(1), "b");

        tape.write(-2, "x");
        tape.write(4, "y");
        assert_eq!(tape.cells().concat(), "x_ab_y");
        assert_eq!(tape.read(-2), "x");
        assert_eq!(tape.read(0), "a");
    }

    #[test]
    fn test_empty_input_is_single_blank() {
        let tape = Tape::new("", "_");
        assert_eq!(tape.cells(), &["_".to_string()]);
    }

    #[test]
    fn test_single_step() {
        let dtm = increment();
        let mut machine = TuringMachine::new(&dtm, "10");
        assert_eq!(machine.step(), Step::Continue);
        assert_eq!(machine.configuration().state, "right");
        assert_eq!(machine.configuration().head, 1);
        assert_eq!(machine.step_count(), 1);
    }

    #[test]
    fn test_increment_run() {
        let dtm = increment();
        let mut machine = TuringMachine::new(&dtm, "1011");
        let execution = machine.run();

        assert!(execution.halted);
        assert!(execution.accepted);
        let last = execution.configurations.last().unwrap();
        assert_eq!(last.state, "done");
        assert_eq!(tape_text(last), "1100_");
    }

    #[test]
    fn test_increment_carries_past_left_edge() {
        let dtm = increment();
        let mut machine = TuringMachine::new(&dtm, "11");
        let execution = machine.run();

        assert!(execution.accepted);
        let last = execution.configurations.last().unwrap();
        assert_eq!(last.head, -1);
        assert_eq!(tape_text(last), "100_");
    }

    #[test]
    fn test_halts_in_rejection_without_transition() {
        let mut dtm = increment();
        dtm.transitions.remove("carry");
        let mut machine = TuringMachine::new(&dtm, "1");
        let execution = machine.run();

        assert!(execution.halted);
        assert!(!execution.accepted);
        assert_eq!(execution.configurations.last().unwrap().state, "carry");
    }

    #[test]
    fn test_final_state_does_not_stop_the_run() {
        let mut dtm = increment();
        dtm.states.insert("erase".to_string());
        dtm.transitions.insert(
            "done".to_string(),
            BTreeMap::from([(
                "1".to_string(),
                TapeAction {
                    next_state: "erase".to_string(),
                    write: "_".to_string(),
                    direction: Direction::Right,
                },
            )]),
        );
        let mut machine = TuringMachine::new(&dtm, "10");
        let execution = machine.run();

        assert!(execution.halted);
        assert!(!execution.accepted);
        assert!(execution
            .configurations
            .iter()
            .any(|configuration| configuration.state == "done"));
        let last = execution.configurations.last().unwrap();
        assert_eq!(last.state, "erase");
        assert_eq!(tape_text(last), "1__");
    }

    #[test]
    fn test_step_bound() {
        let mut dtm = increment();
        // Spin on the first blank forever.
        dtm.transitions.get_mut("right").unwrap().insert(
            "_".to_string(),
            TapeAction {
                next_state: "right".to_string(),
                write: "_".to_string(),
                direction: Direction::None,
            },
        );
        let mut machine = TuringMachine::new(&dtm, "0");
        let execution = machine.run();

        assert!(!execution.halted);
        assert!(!execution.accepted);
        assert_eq!(execution.configurations.len(), MAX_EXECUTION_STEPS + 1);
    }
}
