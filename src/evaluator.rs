//! This module walks the AST and evaluates it against an [`Environment`].
//!
//! Evaluation is dynamic: every result is a [`Binding`] carrying a value and its type tag, and
//! the tag travels with the value through assignments. Automaton functions (`save`, `test`,
//! `definition`, `open`) are dispatched to the engine and to the rendering collaborators held
//! in a [`Context`].

use crate::{
    ast::{Function, Node},
    automaton::Automaton,
    graph::{Opener, RenderRequest, Renderer},
    simulate,
    table,
    types::{
        is_diagram_path, AutomatonKind, InterpreterError, SimulationError, DEFAULT_DIAGRAM_NAME,
    },
    value::{Value, ValueType},
};
use rand::RngCore;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::rc::Rc;

/// A value together with its authoritative type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub value: Value,
    pub ty: ValueType,
}

impl Binding {
    pub fn new(value: Value) -> Self {
        let ty = value.value_type();
        Self { value, ty }
    }

    pub fn null() -> Self {
        Self::new(Value::Null)
    }
}

/// An entry of the output queue, produced by `print`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Printable {
    pub label: String,
    pub value: Value,
    pub ty: ValueType,
}

/// Variables, automaton registries and pending output of one session.
#[derive(Debug, Default)]
pub struct Environment {
    pub variables: BTreeMap<String, Binding>,
    pub dfas: BTreeMap<String, Rc<Automaton>>,
    pub nfas: BTreeMap<String, Rc<Automaton>>,
    pub dtms: BTreeMap<String, Rc<Automaton>>,
    output: Vec<Printable>,
    diagnostics: Vec<String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Result<&Binding, InterpreterError> {
        self.variables
            .get(name)
            .ok_or_else(|| InterpreterError::UndefinedName(name.to_string()))
    }

    pub fn registry(&self, kind: AutomatonKind) -> &BTreeMap<String, Rc<Automaton>> {
        match kind {
            AutomatonKind::Dfa => &self.dfas,
            AutomatonKind::Nfa => &self.nfas,
            AutomatonKind::Dtm => &self.dtms,
        }
    }

    fn registry_mut(&mut self, kind: AutomatonKind) -> &mut BTreeMap<String, Rc<Automaton>> {
        match kind {
            AutomatonKind::Dfa => &mut self.dfas,
            AutomatonKind::Nfa => &mut self.nfas,
            AutomatonKind::Dtm => &mut self.dtms,
        }
    }

    /// Binds `name`, keeping the registries in sync with the new type.
    pub fn assign(&mut self, name: &str, binding: Binding) {
        for kind in [AutomatonKind::Dfa, AutomatonKind::Nfa, AutomatonKind::Dtm] {
            self.registry_mut(kind).remove(name);
        }
        if let (Some(kind), Value::Automaton(automaton)) =
            (binding.ty.automaton_kind(), &binding.value)
        {
            self.registry_mut(kind)
                .insert(name.to_string(), Rc::clone(automaton));
        }
        self.variables.insert(name.to_string(), binding);
    }

    /// The automaton bound to `name`, looked up in the registry its type tag selects.
    pub fn automaton(&self, name: &str) -> Result<Rc<Automaton>, InterpreterError> {
        let binding = self.get(name)?;
        binding
            .ty
            .automaton_kind()
            .and_then(|kind| self.registry(kind).get(name))
            .cloned()
            .ok_or_else(|| InterpreterError::InvalidArguments {
                function: name.to_string(),
                message: format!("'{name}' is a {}, not an automaton", binding.ty),
            })
    }

    /// Drops null bindings and registry entries whose name no longer holds that automaton.
    /// The host calls this after every top-level statement.
    pub fn prune(&mut self) {
        self.variables.retain(|_, binding| !binding.value.is_null());
        let variables = &self.variables;
        for (kind, registry) in [
            (AutomatonKind::Dfa, &mut self.dfas),
            (AutomatonKind::Nfa, &mut self.nfas),
            (AutomatonKind::Dtm, &mut self.dtms),
        ] {
            registry.retain(|name, _| {
                variables
                    .get(name)
                    .is_some_and(|binding| binding.ty.automaton_kind() == Some(kind))
            });
        }
    }

    /// Takes everything printed since the last call.
    pub fn drain_output(&mut self) -> Vec<Printable> {
        std::mem::take(&mut self.output)
    }

    /// Takes the construction failures reported since the last call.
    pub fn drain_diagnostics(&mut self) -> Vec<String> {
        std::mem::take(&mut self.diagnostics)
    }
}

/// The collaborators a statement may need besides the environment.
pub struct Context<'a> {
    pub renderer: &'a mut dyn Renderer,
    pub opener: &'a mut dyn Opener,
    pub rng: &'a mut dyn RngCore,
}

/// Evaluates `node` and returns its value with its type.
pub fn evaluate(
    node: &Node,
    env: &mut Environment,
    ctx: &mut Context<'_>,
) -> Result<Binding, InterpreterError> {
    match node {
        Node::Integer { value } => Ok(Binding::new(Value::Integer(*value))),
        Node::Boolean { value } => Ok(Binding::new(Value::Boolean(*value))),
        Node::String { value } => Ok(Binding::new(Value::String(value.clone()))),
        Node::Variable { name } => env.get(name).cloned(),
        Node::Binary {
            left,
            operator,
            right,
        } => {
            let left = evaluate(left, env, ctx)?;
            let right = evaluate(right, env, ctx)?;
            binary(*operator, left, right)
        }
        Node::Collection { elements } => collection(elements, env, ctx),
        Node::Dictionary { key, value } => {
            let key = evaluate(key, env, ctx)?.value;
            let value = evaluate(value, env, ctx)?.value;
            Ok(Binding::new(Value::Tuple(vec![key, value])))
        }
        Node::Parameters { elements } => Ok(Binding::new(Value::List(values(elements, env, ctx)?))),
        Node::Tuple { elements } => Ok(Binding::new(Value::Tuple(values(elements, env, ctx)?))),
        Node::Automaton { kind, elements } => {
            let parameters = values(elements, env, ctx)?;
            Ok(construct(*kind, &parameters, env))
        }
        Node::Print { value } => {
            let mut binding = evaluate(value, env, ctx)?;
            if matches!(&binding.value, Value::List(items) if items.is_empty()) {
                binding = Binding::new(Value::String(String::new()));
            }
            env.output.push(Printable {
                label: "print".to_string(),
                value: binding.value,
                ty: binding.ty,
            });
            Ok(Binding::null())
        }
        Node::Assignment { name, value } => {
            let binding = evaluate(value, env, ctx)?;
            log::debug!("{name} = {} ({})", binding.value, binding.ty);
            env.assign(name, binding);
            Ok(Binding::null())
        }
        Node::FunctionCall {
            receiver,
            function,
            args,
        } => {
            let args = values(args, env, ctx)?;
            call(receiver.as_deref(), *function, args, env, ctx)
        }
    }
}

fn values(
    nodes: &[Node],
    env: &mut Environment,
    ctx: &mut Context<'_>,
) -> Result<Vec<Value>, InterpreterError> {
    nodes
        .iter()
        .map(|node| evaluate(node, env, ctx).map(|binding| binding.value))
        .collect()
}

/// `+`, dispatched on the runtime type of the right operand. The result takes the right
/// operand's type tag.
fn binary(operator: char, left: Binding, right: Binding) -> Result<Binding, InterpreterError> {
    let unsupported = |left: &Binding, right: &Binding| InterpreterError::UnsupportedOperands {
        operator,
        left: left.ty.to_string(),
        right: right.ty.to_string(),
    };
    if operator != '+' {
        return Err(unsupported(&left, &right));
    }

    let number = |value: &Value| match value {
        Value::Integer(n) => Some(*n),
        Value::Boolean(b) => Some(i64::from(*b)),
        _ => None,
    };

    let value = match (&left.value, &right.value) {
        (_, Value::Integer(_) | Value::Boolean(_)) => {
            let (Some(a), Some(b)) = (number(&left.value), number(&right.value)) else {
                return Err(unsupported(&left, &right));
            };
            let sum = a.checked_add(b).ok_or_else(|| InterpreterError::InvalidArguments {
                function: "+".to_string(),
                message: "integer overflow".to_string(),
            })?;
            Value::Integer(sum)
        }
        (Value::String(a), Value::String(b)) => Value::String(format!("{a}{b}")),
        (Value::List(a), Value::List(b)) => Value::List(a.iter().chain(b).cloned().collect()),
        (Value::Tuple(a), Value::Tuple(b)) => Value::Tuple(a.iter().chain(b).cloned().collect()),
        _ => return Err(unsupported(&left, &right)),
    };

    Ok(Binding {
        value,
        ty: right.ty,
    })
}

/// A `{...}` literal: a dictionary if any element is a `key: value` pair, a set otherwise.
/// In a dictionary, a bare element must be a dictionary-valued expression whose entries are
/// merged in.
fn collection(
    elements: &[Node],
    env: &mut Environment,
    ctx: &mut Context<'_>,
) -> Result<Binding, InterpreterError> {
    let is_dictionary = elements
        .iter()
        .any(|element| matches!(element, Node::Dictionary { .. }));

    if !is_dictionary {
        let items: BTreeSet<Value> = values(elements, env, ctx)?.into_iter().collect();
        return Ok(Binding::new(Value::Set(items)));
    }

    let mut entries = BTreeMap::new();
    for element in elements {
        match element {
            Node::Dictionary { key, value } => {
                let key = evaluate(key, env, ctx)?.value;
                let value = evaluate(value, env, ctx)?.value;
                entries.insert(key, value);
            }
            other => match evaluate(other, env, ctx)? {
                Binding {
                    value: Value::Dictionary(nested),
                    ..
                } => entries.extend(nested),
                binding => {
                    return Err(InterpreterError::InvalidArguments {
                        function: "dictionary".to_string(),
                        message: format!("cannot merge a {} into a dictionary", binding.ty),
                    })
                }
            },
        }
    }

    Ok(Binding::new(Value::Dictionary(entries)))
}

/// Builds an automaton. A failed construction is reported and evaluates to null.
fn construct(kind: AutomatonKind, parameters: &[Value], env: &mut Environment) -> Binding {
    match Automaton::from_parameters(kind, parameters) {
        Ok(automaton) => Binding::new(Value::Automaton(Rc::new(automaton))),
        Err(error) => {
            let error = InterpreterError::from(error);
            log::warn!("{kind} construction failed: {error}");
            env.diagnostics.push(error.to_string());
            Binding::null()
        }
    }
}

fn call(
    receiver: Option<&str>,
    function: Function,
    mut args: Vec<Value>,
    env: &mut Environment,
    ctx: &mut Context<'_>,
) -> Result<Binding, InterpreterError> {
    log::debug!("Calling {function} on {receiver:?} with {} arguments", args.len());

    match function {
        Function::Open => Ok(Binding::new(Value::String(open(receiver, args, ctx)))),
        Function::Save => {
            let automaton = target(receiver, function, &mut args, env)?;
            let path = take_path(receiver, &mut args);
            match save(&automaton, &path, args, ctx)? {
                Some(message) => Ok(Binding::new(Value::String(message))),
                None => Ok(Binding::null()),
            }
        }
        Function::Test => {
            let automaton = target(receiver, function, &mut args, env)?;
            let input = args.first().ok_or_else(|| InterpreterError::InvalidArguments {
                function: function.to_string(),
                message: "missing input string".to_string(),
            })?;
            Ok(Binding::new(Value::String(test(&automaton, input, ctx))))
        }
        Function::Definition => {
            let automaton = target(receiver, function, &mut args, env)?;
            let table = table::definition(&automaton).to_string();
            Ok(Binding::new(Value::String(table.trim_end().to_string())))
        }
    }
}

/// The automaton a call works on: the receiver, or the first argument of a call without one.
fn target(
    receiver: Option<&str>,
    function: Function,
    args: &mut Vec<Value>,
    env: &Environment,
) -> Result<Rc<Automaton>, InterpreterError> {
    if let Some(name) = receiver {
        return env.automaton(name);
    }
    match args.first().and_then(Value::as_automaton).cloned() {
        Some(automaton) => {
            args.remove(0);
            Ok(automaton)
        }
        None => Err(InterpreterError::InvalidArguments {
            function: function.to_string(),
            message: "expected an automaton as the first argument".to_string(),
        }),
    }
}

/// Removes and returns an explicit diagram path from the arguments, or the default
/// `<receiver>.png`.
fn take_path(receiver: Option<&str>, args: &mut Vec<Value>) -> String {
    match args.first().and_then(Value::as_str) {
        Some(path) if is_diagram_path(path) => {
            let path = path.to_string();
            args.remove(0);
            path
        }
        _ => format!("{}.png", receiver.unwrap_or(DEFAULT_DIAGRAM_NAME)),
    }
}

fn open(receiver: Option<&str>, mut args: Vec<Value>, ctx: &mut Context<'_>) -> String {
    let path = match args.first() {
        Some(Value::String(path)) if !is_diagram_path(path) => {
            return format!("The file {path} is not an accepted file type to open.")
        }
        _ => take_path(receiver, &mut args),
    };

    if !Path::new(&path).exists() {
        return format!("The file {path} does not exist.");
    }
    match ctx.opener.open(Path::new(&path)) {
        Ok(()) => format!("Opening {path}..."),
        Err(error) => {
            log::warn!("Failed to open {path}: {error}");
            format!("The file {path} does not exist.")
        }
    }
}

/// `save(path?, input?, horizontal?)`
///
/// A run that cannot be simulated is not drawn; its error message is returned instead.
fn save(
    automaton: &Automaton,
    path: &str,
    args: Vec<Value>,
    ctx: &mut Context<'_>,
) -> Result<Option<String>, InterpreterError> {
    let trace = match args.first() {
        None => None,
        Some(Value::String(input)) => match simulate::run(automaton, input, &mut *ctx.rng) {
            Ok(trace) => Some(trace),
            Err(error) => return Ok(Some(error.to_string())),
        },
        Some(other) => {
            let error = SimulationError::InputNotString(other.value_type().to_string());
            return Ok(Some(InterpreterError::from(error).to_string()));
        }
    };
    let horizontal = match args.get(1) {
        None => true,
        Some(Value::Boolean(horizontal)) => *horizontal,
        Some(other) => {
            return Err(InterpreterError::InvalidArguments {
                function: Function::Save.to_string(),
                message: format!("horizontal must be a boolean, found {}", other.value_type()),
            })
        }
    };

    let request = RenderRequest::new(automaton, trace.as_ref(), horizontal, path);
    ctx.renderer.render(&request)?;
    Ok(None)
}

/// The step table of a run, or the message of the error that prevented it.
fn test(automaton: &Automaton, input: &Value, ctx: &mut Context<'_>) -> String {
    let Value::String(input) = input else {
        let error = SimulationError::InputNotString(input.value_type().to_string());
        return InterpreterError::from(error).to_string();
    };
    match simulate::run(automaton, input, &mut *ctx.rng) {
        Ok(trace) => table::steps(automaton, &trace)
            .to_string()
            .trim_end()
            .to_string(),
        Err(error) => error.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::parser::parse;
    use rand::{rngs::StdRng, SeedableRng};
    use std::io;

    /// Records render requests instead of drawing them.
    #[derive(Default)]
    pub struct RecordingRenderer {
        pub requests: Vec<RenderRequest>,
    }

    impl Renderer for RecordingRenderer {
        fn render(&mut self, request: &RenderRequest) -> Result<(), InterpreterError> {
            self.requests.push(request.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct RecordingOpener {
        pub opened: Vec<String>,
    }

    impl Opener for RecordingOpener {
        fn open(&mut self, path: &Path) -> io::Result<()> {
            self.opened.push(path.display().to_string());
            Ok(())
        }
    }

    struct Harness {
        env: Environment,
        renderer: RecordingRenderer,
        opener: RecordingOpener,
        rng: StdRng,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                env: Environment::new(),
                renderer: RecordingRenderer::default(),
                opener: RecordingOpener::default(),
                rng: StdRng::seed_from_u64(11),
            }
        }

        fn run(&mut self, source: &str) -> Result<(), InterpreterError> {
            for node in parse(source)? {
                let mut ctx = Context {
                    renderer: &mut self.renderer,
                    opener: &mut self.opener,
                    rng: &mut self.rng,
                };
                evaluate(&node, &mut self.env, &mut ctx)?;
                self.env.prune();
            }
            Ok(())
        }

        fn printed(&mut self) -> Vec<String> {
            self.env
                .drain_output()
                .into_iter()
                .map(|printable| printable.value.to_string())
                .collect()
        }
    }

    const DFA_SOURCE: &str = "m = DFA({'S0', 'S1'}, {'a', 'b'}, {'S0': {'a': 'S1', 'b': 'S0'}, 'S1': {'a': 'S1', 'b': 'S0'}}, 'S0', {'S1'})";

    #[test]
    fn test_assignment_round_trip() {
        let mut harness = Harness::new();
        harness.run("x = 'hello'\nprint(x)\nn = 41 + 1\nprint(n)").unwrap();
        assert_eq!(harness.printed(), vec!["hello", "42"]);
        assert_eq!(harness.env.get("n").unwrap().ty, ValueType::Integer);
    }

    #[test]
    fn test_plus_takes_right_type() {
        let mut harness = Harness::new();
        harness.run("t = True\nx = 1 + t").unwrap();
        let binding = harness.env.get("x").unwrap();
        assert_eq!(binding.value, Value::Integer(2));
        assert_eq!(binding.ty, ValueType::Boolean);

        harness.run("s = 'ab' + 'cd'").unwrap();
        assert_eq!(harness.env.get("s").unwrap().value, Value::String("abcd".to_string()));
    }

    #[test]
    fn test_plus_rejects_mixed_operands() {
        let mut harness = Harness::new();
        let error = harness.run("x = 'a' + 1").unwrap_err();
        assert_eq!(
            error,
            InterpreterError::UnsupportedOperands {
                operator: '+',
                left: "string".to_string(),
                right: "integer".to_string(),
            }
        );
    }

    #[test]
    fn test_collections() {
        let mut harness = Harness::new();
        harness
            .run("s = {'b', 'a', 'b'}\nd = {'k': 1}\ne = {d, 'j': 2}\nprint(s)\nprint(e)\nprint()")
            .unwrap();
        assert_eq!(harness.printed(), vec!["{'a', 'b'}", "{'j': 2, 'k': 1}", ""]);
    }

    #[test]
    fn test_automaton_registry() {
        let mut harness = Harness::new();
        harness.run(DFA_SOURCE).unwrap();
        assert!(harness.env.dfas.contains_key("m"));
        assert_eq!(harness.env.get("m").unwrap().ty, ValueType::Dfa);

        harness.run("m = 3").unwrap();
        assert!(harness.env.dfas.is_empty());
        assert_eq!(harness.env.get("m").unwrap().ty, ValueType::Integer);
    }

    #[test]
    fn test_failed_construction_binds_null() {
        let mut harness = Harness::new();
        harness
            .run("m = DFA({'q'}, {'a'}, {'q': {'a': 'q'}}, 'missing', {'q'})")
            .unwrap();
        assert!(harness.env.get("m").is_err());
        let diagnostics = harness.env.drain_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].contains("missing"));

        let error = harness.run("print(m.test('a'))").unwrap_err();
        assert_eq!(error, InterpreterError::UndefinedName("m".to_string()));
    }

    #[test]
    fn test_test_and_definition() {
        let mut harness = Harness::new();
        harness.run(DFA_SOURCE).unwrap();
        harness.run("print(m.test('ba'))\nprint(m.definition())").unwrap();
        let printed = harness.printed();
        assert!(printed[0].starts_with("[DFA on \"ba\" is Accepted!]"));
        assert!(printed[1].contains("→S0  *S1  S0"));
    }

    #[test]
    fn test_test_with_non_string_input() {
        let mut harness = Harness::new();
        harness.run(DFA_SOURCE).unwrap();
        harness.run("print(m.test(5))").unwrap();
        assert_eq!(
            harness.printed(),
            vec!["Automaton simulation error: input_str should be a string, found integer"]
        );
    }

    #[test]
    fn test_save_paths() {
        let mut harness = Harness::new();
        harness.run(DFA_SOURCE).unwrap();
        harness.run("m.save()\nm.save('out/m.svg', 'ab', False)").unwrap();

        let requests = &harness.renderer.requests;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].output_path, "m.png");
        assert_eq!(requests[1].output_path, "out/m.svg");
        assert!(requests[1].edges.iter().any(|edge| edge.label == "b [#2]"));
    }

    #[test]
    fn test_save_returns_simulation_errors() {
        let mut harness = Harness::new();
        harness.run(DFA_SOURCE).unwrap();
        harness.run("print(m.save('m.png', 5))\nprint('after')").unwrap();
        assert_eq!(
            harness.printed(),
            vec![
                "Automaton simulation error: input_str should be a string, found integer",
                "after",
            ]
        );
        assert!(harness.renderer.requests.is_empty());
    }

    #[test]
    fn test_save_without_witness_path() {
        let mut harness = Harness::new();
        // Every walk that strays into `d` dies, so no accepting path of this length is found.
        let input = "x".repeat(40);
        let source = format!(
            "n = NFA({{'p', 'd'}}, {{'x'}}, {{'p': {{'x': {{'p', 'd'}}}}}}, 'p', {{'p'}})\n\
             print(n.save('n.png', '{input}'))\nprint('after')"
        );
        harness.run(&source).unwrap();

        let printed = harness.printed();
        assert_eq!(printed.len(), 2);
        assert!(printed[0].starts_with("[NO VALID PATH FOUND]"));
        assert_eq!(printed[1], "after");
        assert!(harness.renderer.requests.is_empty());
    }

    #[test]
    fn test_standalone_save_takes_automaton_argument() {
        let mut harness = Harness::new();
        harness.run(DFA_SOURCE).unwrap();
        harness.run("save(m)").unwrap();
        assert_eq!(harness.renderer.requests[0].output_path, "diagram.png");
    }

    #[test]
    fn test_open_messages() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("m.png");
        std::fs::write(&image, b"png").unwrap();

        let mut harness = Harness::new();
        let source = format!(
            "print(open('notes.txt'))\nprint(open('{}'))\nprint(open('absent.png'))",
            image.display()
        );
        harness.run(&source).unwrap();
        assert_eq!(
            harness.printed(),
            vec![
                "The file notes.txt is not an accepted file type to open.".to_string(),
                format!("Opening {}...", image.display()),
                "The file absent.png does not exist.".to_string(),
            ]
        );
        assert_eq!(harness.opener.opened, vec![image.display().to_string()]);
    }
}
