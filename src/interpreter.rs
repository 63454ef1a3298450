//! The host statement loop: a [`Session`] parses a block of source line by line, evaluates each
//! statement against its environment and reports what happened as a list of [`Event`]s.

use crate::{
    evaluator::{evaluate, Context, Environment},
    graph::{Opener, Renderer},
    parser::Parser,
    types::{InterpreterError, Mode},
    value::{Value, ValueType},
};
use rand::{rngs::StdRng, SeedableRng};

/// Something the host should show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A value printed by the script.
    Print { value: Value, ty: ValueType },
    /// Feedback that is not script output: construction failures, `open` messages.
    Notice(String),
    /// A statement failed.
    Failure(InterpreterError),
}

/// One interpreter session. The environment lives as long as the session.
pub struct Session {
    mode: Mode,
    env: Environment,
    parser: Parser,
    rng: StdRng,
}

impl Session {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            env: Environment::new(),
            parser: Parser::default(),
            rng: StdRng::from_entropy(),
        }
    }

    /// A session whose NFA path reconstruction is reproducible.
    pub fn with_seed(mode: Mode, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new(mode)
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Runs every statement of `source`.
    ///
    /// Lines are stripped of surrounding whitespace first. A failed statement is reported and
    /// the loop moves on to the next line, except in [`Mode::Batch`] where the first failure
    /// ends the block.
    pub fn run(
        &mut self,
        source: &str,
        renderer: &mut dyn Renderer,
        opener: &mut dyn Opener,
    ) -> Vec<Event> {
        let text = source
            .lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n");
        self.parser.load(&text);

        let mut events = Vec::new();
        self.parser.skip_blank_lines();
        while !self.parser.at_end() {
            let result = self.parser.parse_line().and_then(|node| {
                let mut ctx = Context {
                    renderer: &mut *renderer,
                    opener: &mut *opener,
                    rng: &mut self.rng,
                };
                let top_level_call = matches!(node, crate::ast::Node::FunctionCall { .. });
                evaluate(&node, &mut self.env, &mut ctx).map(|binding| (top_level_call, binding))
            });

            events.extend(
                self.env
                    .drain_diagnostics()
                    .into_iter()
                    .map(Event::Notice),
            );
            events.extend(self.env.drain_output().into_iter().map(|printable| {
                Event::Print {
                    value: printable.value,
                    ty: printable.ty,
                }
            }));

            match result {
                // `open("m.png")` on its own line still tells the user what happened.
                Ok((true, binding)) => {
                    if let Value::String(message) = binding.value {
                        events.push(Event::Notice(message));
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    log::debug!("Statement failed: {error}");
                    events.push(Event::Failure(error));
                    if self.mode == Mode::Batch {
                        self.env.prune();
                        return events;
                    }
                }
            }

            self.env.prune();
            self.parser.skip_blank_lines();
        }

        events
    }

    /// True if any event is a failure.
    pub fn failed(events: &[Event]) -> bool {
        events
            .iter()
            .any(|event| matches!(event, Event::Failure(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::tests::{RecordingOpener, RecordingRenderer};

    fn run(session: &mut Session, source: &str) -> Vec<Event> {
        session.run(
            source,
            &mut RecordingRenderer::default(),
            &mut RecordingOpener::default(),
        )
    }

    fn printed(events: &[Event]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                Event::Print { value, .. } => Some(value.to_string()),
                _ => None,
            })
            .collect()
    }

    const SCRIPT: &str = "
        m = DFA(
            {'S0', 'S1'},
            {'a', 'b'},
            {
                'S0': {'a': 'S1', 'b': 'S0'},
                'S1': {'a': 'S1', 'b': 'S0'}
            },
            'S0',
            {'S1'}
        )

        print(m.test('a'))
        print(m.test(''))
    ";

    #[test]
    fn test_multi_line_script() {
        let mut session = Session::with_seed(Mode::Batch, 1);
        let events = run(&mut session, SCRIPT);

        assert!(!Session::failed(&events));
        let printed = printed(&events);
        assert_eq!(printed.len(), 2);
        assert!(printed[0].starts_with("[DFA on \"a\" is Accepted!]"));
        assert!(printed[1].starts_with("[DFA on \"\" is Rejected...]"));
        assert!(session.environment().dfas.contains_key("m"));
    }

    #[test]
    fn test_interactive_continues_after_failure() {
        let mut session = Session::new(Mode::Interactive);
        let events = run(&mut session, "x = \nprint(1)\nprint(y)\nprint(2)");

        assert_eq!(printed(&events), vec!["1", "2"]);
        let failures: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                Event::Failure(error) => Some(error.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].line(), Some(1));
        assert_eq!(failures[1], InterpreterError::UndefinedName("y".to_string()));
    }

    #[test]
    fn test_bad_multi_line_literal_fails_once() {
        let mut session = Session::new(Mode::Interactive);
        let events = run(
            &mut session,
            "m = DFA(\n  {'q'},\n  oops oops,\n  'q', {'q'}\n)\nprint(1)",
        );

        let failures = events
            .iter()
            .filter(|event| matches!(event, Event::Failure(_)))
            .count();
        assert_eq!(failures, 1);
        assert_eq!(printed(&events), vec!["1"]);
    }

    #[test]
    fn test_batch_stops_at_first_failure() {
        let mut session = Session::new(Mode::Batch);
        let events = run(&mut session, "print(1)\nprint(y)\nprint(2)");

        assert_eq!(printed(&events), vec!["1"]);
        assert!(Session::failed(&events));
    }

    #[test]
    fn test_state_survives_between_blocks() {
        let mut session = Session::new(Mode::Interactive);
        run(&mut session, "x = 'a'");
        let events = run(&mut session, "print(x + 'b')");
        assert_eq!(printed(&events), vec!["ab"]);
    }

    #[test]
    fn test_construction_failure_is_a_notice() {
        let mut session = Session::new(Mode::Batch);
        let events = run(&mut session, "m = NFA({'q'}, {'a'})\nprint(1)");

        assert!(!Session::failed(&events));
        assert!(matches!(&events[0], Event::Notice(message) if message.contains("expected 5")));
        assert_eq!(printed(&events), vec!["1"]);
    }

    #[test]
    fn test_top_level_open_reports_message() {
        let mut session = Session::new(Mode::Interactive);
        let events = run(&mut session, "open('notes.txt')");
        assert_eq!(
            events,
            vec![Event::Notice(
                "The file notes.txt is not an accepted file type to open.".to_string()
            )]
        );
    }

    #[test]
    fn test_seeded_sessions_agree() {
        let script = "n = NFA({'a', 'b'}, {'x'}, {'a': {'x': {'a', 'b'}}, 'b': {'x': {'a', 'b'}}}, 'a', {'b'})\nprint(n.test('xxxx'))";
        let first = run(&mut Session::with_seed(Mode::Batch, 5), script);
        let second = run(&mut Session::with_seed(Mode::Batch, 5), script);
        assert_eq!(printed(&first), printed(&second));
        assert!(printed(&first)[0].starts_with("[NFA on \"xxxx\" is Accepted!]"));
    }
}
