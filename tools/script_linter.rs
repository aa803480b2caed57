/// Script Linter: checks dialogue scripts for malformed commands and blocks.
///
/// Usage: script_linter <script_path> [--state <state.ron>] [--config <session.ron>]

use narrative_script::core::choice::ChoicePrompt;
use narrative_script::core::config::SessionConfig;
use narrative_script::core::dispatch::CommandRegistry;
use narrative_script::core::expr::{name_shape, referenced_names, NameShape};
use narrative_script::schema::line::{codes, LineKind, ScriptSyntax};
use narrative_script::schema::source::{Source, SourceId};
use narrative_script::schema::state::StateTables;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: script_linter <script_path> [--state <state.ron>] [--config <session.ron>]");
        process::exit(0);
    }

    let script_path = &args[1];
    let mut state_path = None;
    let mut config_path = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--state" if i + 1 < args.len() => {
                i += 1;
                state_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(ref path) => match SessionConfig::load_from_ron(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ERROR: Failed to load config: {}", e);
                process::exit(1);
            }
        },
        None => SessionConfig::default(),
    };

    let state = match state_path {
        Some(ref path) => match StateTables::load_from_ron(Path::new(path)) {
            Ok(state) => Some(state),
            Err(e) => {
                eprintln!("ERROR: Failed to load state: {}", e);
                process::exit(1);
            }
        },
        None => None,
    };

    let mut sources = Vec::new();
    let path = Path::new(script_path);
    if path.is_file() {
        load_script(path, &mut sources);
    } else if path.is_dir() {
        load_scripts_recursive(path, &mut sources);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", script_path);
        process::exit(1);
    }

    println!("Loaded {} scripts", sources.len());

    let linter = Linter {
        syntax: &config.syntax,
        registry: CommandRegistry::with_builtins(),
        state: state.as_ref(),
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for source in &sources {
        linter.lint(source, &mut errors, &mut warnings);
    }

    println!("\n=== Script Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn load_script(path: &Path, sources: &mut Vec<Source>) {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let id = SourceId::Path(path.display().to_string());
            sources.push(Source::parse(id, &text));
        }
        Err(e) => eprintln!("  ERROR loading {}: {}", path.display(), e),
    }
}

fn load_scripts_recursive(dir: &Path, sources: &mut Vec<Source>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut paths: Vec<_> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();
    for path in paths {
        if path.is_dir() {
            load_scripts_recursive(&path, sources);
        } else if path.extension().and_then(|s| s.to_str()) == Some("txt") {
            println!("  Loaded: {}", path.display());
            load_script(&path, sources);
        }
    }
}

/// A construct opened and not yet closed, with the line that opened it.
enum Open {
    If(usize),
    While(usize),
    Choice { at: usize, options: usize },
}

struct Linter<'a> {
    syntax: &'a ScriptSyntax,
    registry: CommandRegistry,
    state: Option<&'a StateTables>,
}

impl Linter<'_> {
    fn lint(&self, source: &Source, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
        let mut open: Vec<Open> = Vec::new();

        for (idx, line) in source.lines().iter().enumerate() {
            let at = format!("{}:{}", source.id, idx + 1);
            let LineKind::Command { code, args } = self.syntax.classify(line) else {
                continue;
            };

            if let Some(option) = self.syntax.option_marker(line) {
                match open.last() {
                    Some(Open::Choice { options, .. }) if option < *options => {}
                    Some(Open::Choice { options, .. }) => errors.push(format!(
                        "{}: option marker {} but the choice has only {} options",
                        at, option, options
                    )),
                    _ => errors.push(format!("{}: option marker {} outside a choice", at, option)),
                }
                continue;
            }

            if !self.registry.contains(code) {
                errors.push(format!("{}: unknown command '{}'", at, code));
                continue;
            }

            match code {
                codes::STATE_IF => {
                    if open.iter().any(|o| matches!(o, Open::If(_))) {
                        warnings.push(format!("{}: nested stateIf inside an if-branch is not supported", at));
                    }
                    self.check_expression(&at, args, errors, warnings);
                    open.push(Open::If(idx));
                }
                codes::ELIF => match open.last() {
                    Some(Open::If(_)) => self.check_expression(&at, args, errors, warnings),
                    _ => errors.push(format!("{}: elif without an open stateIf", at)),
                },
                codes::END_IF => self.close(&mut open, &at, code, |o| matches!(o, Open::If(_)), errors),
                codes::STATE_WHILE => {
                    if open.iter().any(|o| matches!(o, Open::While(_))) {
                        warnings.push(format!("{}: nested stateWhile is not supported", at));
                    }
                    self.check_expression(&at, args, errors, warnings);
                    open.push(Open::While(idx));
                }
                codes::END_WHILE => {
                    self.close(&mut open, &at, code, |o| matches!(o, Open::While(_)), errors)
                }
                codes::STATE_CHOICE => {
                    let options = self.check_choice(&at, args, errors, warnings);
                    open.push(Open::Choice { at: idx, options });
                }
                codes::END_CHOICE => {
                    self.close(&mut open, &at, code, |o| matches!(o, Open::Choice { .. }), errors)
                }
                codes::SET_VAR => match args.split_once('=') {
                    Some((name, expression)) => {
                        self.check_target(&at, name, NameShape::Variable, warnings);
                        self.check_expression(&at, expression, errors, warnings);
                    }
                    None => errors.push(format!("{}: setVar expects '<name> = <expression>'", at)),
                },
                codes::SET_SWITCH => match args.split_once('=') {
                    Some((name, literal)) => {
                        self.check_target(&at, name, NameShape::Switch, warnings);
                        let literal = literal.trim().to_ascii_lowercase();
                        if literal != "true" && literal != "false" {
                            errors.push(format!("{}: setSwitch value must be true or false", at));
                        }
                    }
                    None => errors.push(format!("{}: setSwitch expects '<name> = true|false'", at)),
                },
                codes::FLIP_SWITCH => self.check_target(&at, args, NameShape::Switch, warnings),
                codes::OPEN_EVENT | codes::STATE_COMMAND if args.is_empty() => {
                    errors.push(format!("{}: {} needs an argument", at, code));
                }
                _ => {}
            }
        }

        for construct in open {
            let (line, opener) = match construct {
                Open::If(line) => (line, "stateIf"),
                Open::While(line) => (line, "stateWhile"),
                Open::Choice { at, .. } => (at, "stateChoice"),
            };
            errors.push(format!("{}:{}: unterminated {}", source.id, line + 1, opener));
        }
    }

    fn close(
        &self,
        open: &mut Vec<Open>,
        at: &str,
        code: &str,
        owns: impl Fn(&Open) -> bool,
        errors: &mut Vec<String>,
    ) {
        match open.last() {
            Some(top) if owns(top) => {
                open.pop();
            }
            _ => errors.push(format!("{}: {} without a matching opener", at, code)),
        }
    }

    fn check_expression(&self, at: &str, expression: &str, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
        let names = match referenced_names(expression, self.syntax) {
            Ok(names) => names,
            Err(e) => {
                errors.push(format!("{}: {}", at, e));
                return;
            }
        };
        for name in names {
            match name_shape(name, self.syntax) {
                Ok(shape) => self.check_registered(at, name, shape, warnings),
                Err(e) => errors.push(format!("{}: {}", at, e)),
            }
        }
    }

    /// Assignment targets only have to exist in their table; the name prefix
    /// is not checked.
    fn check_target(&self, at: &str, token: &str, wanted: NameShape, warnings: &mut Vec<String>) {
        let name = self.syntax.format_name(token);
        self.check_registered(at, &name, wanted, warnings);
    }

    fn check_registered(&self, at: &str, name: &str, shape: NameShape, warnings: &mut Vec<String>) {
        let Some(state) = self.state else {
            return;
        };
        let known = match shape {
            NameShape::Variable => state.variables.value(name).is_some(),
            NameShape::Switch => state.switches.value(name).is_some(),
        };
        if !known {
            warnings.push(format!("{}: '{}' is not in the state file", at, name));
        }
    }

    /// Returns the number of options.
    fn check_choice(&self, at: &str, args: &str, errors: &mut Vec<String>, warnings: &mut Vec<String>) -> usize {
        let mut defaults = 0;
        let mut cancels = 0;
        for token in args.split_whitespace() {
            let (_, is_default, is_cancel) = self.syntax.split_option(token);
            defaults += usize::from(is_default);
            cancels += usize::from(is_cancel);
        }
        if defaults > 1 {
            warnings.push(format!("{}: {} options marked default; the first wins", at, defaults));
        }
        if cancels > 1 {
            warnings.push(format!("{}: {} options marked cancel; the first wins", at, cancels));
        }

        let prompt = ChoicePrompt::parse(args, Vec::new(), self.syntax);
        if prompt.is_empty() {
            errors.push(format!("{}: stateChoice has no options", at));
        }
        prompt.len()
    }
}
