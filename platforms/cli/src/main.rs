mod render;

use automython::{Event, InterpreterError, Mode, ScriptLoader, Session};
use clap::Parser;
use render::{GraphvizRenderer, ShellOpener};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// The .theory script to run. Starts the interactive loop when omitted.
    script: Option<String>,

    /// Seed for the NFA path search, making test() output reproducible
    #[clap(short, long)]
    seed: Option<u64>,

    /// Print the parsed statements as JSON records instead of running them
    #[clap(long)]
    dump_ast: bool,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return if error.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match &cli.script {
        Some(script) if ScriptLoader::is_script_path(Path::new(script)) => {
            run_file(Path::new(script), &cli)
        }
        Some(_) => {
            eprintln!("Wrong file type. Please pass in a .theory file, e.g.");
            eprintln!("    automython <file-name>.theory");
            ExitCode::FAILURE
        }
        None => {
            run_interactive(&cli);
            ExitCode::SUCCESS
        }
    }
}

fn new_session(mode: Mode, cli: &Cli) -> Session {
    match cli.seed {
        Some(seed) => Session::with_seed(mode, seed),
        None => Session::new(mode),
    }
}

fn run_file(path: &Path, cli: &Cli) -> ExitCode {
    if cli.dump_ast {
        return match ScriptLoader::load_statements(path) {
            Ok(statements) => {
                let records: Vec<_> = statements.iter().map(|node| node.to_record()).collect();
                match serde_json::to_string_pretty(&records) {
                    Ok(json) => {
                        println!("{json}");
                        ExitCode::SUCCESS
                    }
                    Err(e) => {
                        eprintln!("Error: {e}");
                        ExitCode::FAILURE
                    }
                }
            }
            Err(e) => {
                report_failure(&e);
                ExitCode::FAILURE
            }
        };
    }

    let source = match ScriptLoader::load_script(path) {
        Ok(source) => source,
        Err(e) => {
            report_failure(&e);
            return ExitCode::FAILURE;
        }
    };

    let mut session = new_session(Mode::Batch, cli);
    let events = session.run(
        &source,
        &mut GraphvizRenderer::default(),
        &mut ShellOpener,
    );
    show(&events);

    if Session::failed(&events) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_interactive(cli: &Cli) {
    println!(
        "Automython {} on {}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    );
    println!("Enter/Paste your content. Ctrl-D (i.e. EOF) to end input block.");

    let prompt = atty::is(atty::Stream::Stdin);
    let mut session = new_session(Mode::Interactive, cli);
    let mut renderer = GraphvizRenderer::default();
    let mut opener = ShellOpener;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut block: Vec<String> = Vec::new();

    loop {
        if prompt && block.is_empty() {
            print!(">>> ");
            let _ = io::stdout().flush();
        }

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                log::error!("Failed to read input: {e}");
                return;
            }
            None => {
                if !block.is_empty() {
                    show(&session.run(&block.join("\n"), &mut renderer, &mut opener));
                }
                return;
            }
        };

        match line.trim() {
            "exit()" | "quit()" if block.is_empty() => return,
            "exit" | "quit" if block.is_empty() => {
                println!("Use exit() or quit() to exit.");
            }
            "" => {
                if !block.is_empty() {
                    show(&session.run(&block.join("\n"), &mut renderer, &mut opener));
                    block.clear();
                }
            }
            _ => block.push(line),
        }
    }
}

fn show(events: &[Event]) {
    for event in events {
        match event {
            Event::Print { value, .. } => println!("{value}"),
            Event::Notice(message) => println!("{message}"),
            Event::Failure(error) => report_failure(error),
        }
    }
}

fn report_failure(error: &InterpreterError) {
    eprintln!("Error: {error}");
}
