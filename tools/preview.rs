/// Preview: plays a dialogue script in the terminal.
///
/// Usage: preview --scripts <dir> --entry <name> [--state <ron>] [--config <ron>]
///                [--auto] [--seed <n>]
///
/// Choices are read from stdin as option numbers. An empty answer takes the
/// default option, `q` quits. With `--auto` options are picked at random.

use narrative_script::core::choice::ChoicePrompt;
use narrative_script::core::config::SessionConfig;
use narrative_script::core::host::{
    DirLoader, Host, HostInstruction, HostRelay, PageBuffer, ScriptLoader, VecInstructionStream,
};
use narrative_script::core::session::{Session, Step};
use narrative_script::schema::source::{Source, SourceId};
use narrative_script::schema::state::StateTables;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// The single host instruction that invokes the interpreter.
const RUN_SCRIPT: &str = "run_script";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut scripts_dir = None;
    let mut entry = None;
    let mut state_path = None;
    let mut config_path = None;
    let mut auto = false;
    let mut seed: u64 = 42;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--scripts" if i + 1 < args.len() => {
                i += 1;
                scripts_dir = Some(args[i].clone());
            }
            "--entry" if i + 1 < args.len() => {
                i += 1;
                entry = Some(args[i].clone());
            }
            "--state" if i + 1 < args.len() => {
                i += 1;
                state_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--auto" => auto = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let (Some(scripts_dir), Some(entry)) = (scripts_dir, entry) else {
        print_usage();
        std::process::exit(1);
    };

    let config = match config_path {
        Some(ref path) => SessionConfig::load_from_ron(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("ERROR: Failed to load config: {}", e);
            std::process::exit(1);
        }),
        None => SessionConfig::default(),
    };

    let mut state = match state_path {
        Some(ref path) => StateTables::load_from_ron(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("ERROR: Failed to load state: {}", e);
            std::process::exit(1);
        }),
        None => StateTables::default(),
    };

    let loader = DirLoader::new(&scripts_dir);
    let text = match loader.load(&entry) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Playing '{}' ({} variables, {} switches)",
        entry,
        state.variables.len(),
        state.switches.len()
    );
    if auto {
        println!("Auto mode, seed {}", seed);
    }
    println!();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut session = Session::new(config);
    let mut display = PageBuffer::new();
    let mut stream = VecInstructionStream::new(vec![HostInstruction::Raw(RUN_SCRIPT.to_string())]);

    let source = Source::parse(SourceId::Path(entry.clone()), &text);
    let mut step = {
        let mut host = Host {
            variables: &mut state.variables,
            switches: &mut state.switches,
            display: &mut display,
            loader: &loader,
            stream: &mut stream,
        };
        session.step(source, &mut host)
    };

    loop {
        print_pages(&mut display);

        match step {
            Ok(Step::Completed) => break,
            Ok(Step::Suspended(_)) => {}
            Err(e) => {
                eprintln!("ERROR: {}", e);
                std::process::exit(1);
            }
        }

        // Walk the instructions the relay inserted until its return.
        loop {
            let Some(instruction) = stream.advance().cloned() else {
                eprintln!("ERROR: instruction stream ended without a return");
                std::process::exit(1);
            };
            match instruction {
                HostInstruction::Raw(payload) => println!("  [host] {}", payload),
                HostInstruction::ResolveChoice => {
                    let Some(prompt) = display.prompt.take() else {
                        continue;
                    };
                    let answer = if auto {
                        let pick = rng.gen_range(0..prompt.len());
                        print_prompt(&prompt);
                        println!("> {}", pick);
                        Some(pick)
                    } else {
                        ask(&prompt)
                    };
                    if let Some(index) = answer {
                        if let Err(e) = session.choose(index) {
                            println!("  {}", e);
                        }
                    }
                }
                HostInstruction::Return { invoker } => {
                    HostRelay::return_to_invoker(&mut stream, invoker);
                    break;
                }
            }
        }

        let mut host = Host {
            variables: &mut state.variables,
            switches: &mut state.switches,
            display: &mut display,
            loader: &loader,
            stream: &mut stream,
        };
        step = session.resume(&mut host);
    }

    println!("\n=== Final state ===\n");
    match state.to_ron() {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("ERROR: {}", e),
    }
}

fn print_pages(display: &mut PageBuffer) {
    let shown = display.take();
    display.prompt = shown.prompt;
    for page in shown.pages {
        for line in page {
            println!("{}", line);
        }
        println!("  ---");
    }
}

fn print_prompt(prompt: &ChoicePrompt) {
    for (idx, label) in prompt.labels.iter().enumerate() {
        let mut marks = String::new();
        if prompt.default_index == Some(idx) {
            marks.push_str(" (default)");
        }
        if prompt.cancel_index == Some(idx) {
            marks.push_str(" (cancel)");
        }
        println!("  {}) {}{}", idx, label, marks);
    }
}

/// Read an answer from stdin. `None` leaves the choice unanswered.
fn ask(prompt: &ChoicePrompt) -> Option<usize> {
    print_prompt(prompt);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            return None;
        }
        let line = line.trim();
        if line.is_empty() {
            return prompt.default_index;
        }
        if line == "q" || line == "quit" {
            println!("Goodbye.");
            std::process::exit(0);
        }
        match line.parse::<usize>() {
            Ok(index) if index < prompt.len() => return Some(index),
            _ => println!("Pick 0-{}", prompt.len().saturating_sub(1)),
        }
    }
}

fn print_usage() {
    println!("Usage: preview --scripts <dir> --entry <name> [--state <ron>] [--config <ron>]");
    println!("               [--auto] [--seed <n>]");
}
