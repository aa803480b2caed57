//! WASM bindings for narrative-script: powers the interactive web demo.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

use narrative_script::core::choice::ChoicePrompt;
use narrative_script::core::config::SessionConfig;
use narrative_script::core::error::ScriptError;
use narrative_script::core::host::{
    Host, HostInstruction, HostRelay, MemoryLoader, PageBuffer, ScriptLoader,
    VecInstructionStream,
};
use narrative_script::core::session::{Session, Step};
use narrative_script::schema::source::{Source, SourceId};
use narrative_script::schema::state::StateTables;

// ---------------------------------------------------------------------------
// Embedded demo scripts: compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const STATE: &str = include_str!("../../demo_data/tavern/state.ron");

    pub const SCRIPTS: [(&str, &str); 4] = [
        ("arrival", include_str!("../../demo_data/tavern/arrival.txt")),
        ("rumours", include_str!("../../demo_data/tavern/rumours.txt")),
        ("bard", include_str!("../../demo_data/tavern/bard.txt")),
        ("cellar", include_str!("../../tests/fixtures/scripts/cellar.txt")),
    ];
}

/// The single host instruction that invokes the interpreter.
const RUN_SCRIPT: &str = "run_script";

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct Frame {
    /// `"awaiting_choice"` or `"completed"`.
    status: &'static str,
    pages: Vec<Vec<String>>,
    choice: Option<ChoicePrompt>,
    host_commands: Vec<String>,
    items: Vec<String>,
}

#[derive(serde::Serialize)]
struct StateSnapshot {
    variables: BTreeMap<String, f64>,
    switches: BTreeMap<String, bool>,
}

fn js_error(context: &str, e: impl std::fmt::Display) -> JsError {
    JsError::new(&format!("{context}: {e}"))
}

// ---------------------------------------------------------------------------
// ScriptPlayer: the main WASM-exposed API
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct ScriptPlayer {
    session: Session,
    state: StateTables,
    loader: MemoryLoader,
    display: PageBuffer,
    stream: VecInstructionStream,
    items: Rc<RefCell<Vec<String>>>,
}

#[wasm_bindgen]
impl ScriptPlayer {
    /// Create a player with the embedded tavern scripts and state.
    ///
    /// `config_ron` optionally overrides the session configuration.
    #[wasm_bindgen(constructor)]
    pub fn new(config_ron: Option<String>) -> Result<ScriptPlayer, JsError> {
        let config = match config_ron {
            Some(text) => SessionConfig::parse_ron(&text).map_err(|e| js_error("Invalid config", e))?,
            None => SessionConfig::default(),
        };
        let state = StateTables::parse_ron(data::STATE).map_err(|e| js_error("Invalid state", e))?;

        let mut loader = MemoryLoader::new();
        for (name, text) in data::SCRIPTS {
            loader.insert(name, text);
        }

        let items = Rc::new(RefCell::new(Vec::new()));
        let mut session = Session::new(config);
        let bag = Rc::clone(&items);
        session
            .registry_mut()
            .register("giveItem", move |args, session, host| {
                bag.borrow_mut().push(args.to_string());
                session.diagnostic(host, &format!("[You receive: {}]", args));
                Ok(())
            });

        Ok(ScriptPlayer {
            session,
            state,
            loader,
            display: PageBuffer::new(),
            stream: VecInstructionStream::new(vec![HostInstruction::Raw(RUN_SCRIPT.to_string())]),
            items,
        })
    }

    /// Add or replace a script available to `start` and `openEvent`.
    pub fn add_script(&mut self, name: &str, text: &str) {
        self.loader.insert(name, text);
    }

    pub fn set_variable(&mut self, name: &str, value: f64) {
        self.state.variables.register(name, value);
    }

    pub fn set_switch(&mut self, name: &str, value: bool) {
        self.state.switches.register(name, value);
    }

    /// Start a script by name. Returns a JSON frame.
    ///
    /// Any unfinished run is abandoned first and every script starts again
    /// from its first line.
    pub fn start(&mut self, name: &str) -> Result<String, JsError> {
        let text = self
            .loader
            .load(name)
            .map_err(|e| js_error("Unknown script", e))?;
        self.session.reset();
        self.stream = VecInstructionStream::new(vec![HostInstruction::Raw(RUN_SCRIPT.to_string())]);
        self.display = PageBuffer::new();

        let source = Source::parse(SourceId::Path(name.to_string()), &text);
        let step = {
            let mut host = Host {
                variables: &mut self.state.variables,
                switches: &mut self.state.switches,
                display: &mut self.display,
                loader: &self.loader,
                stream: &mut self.stream,
            };
            self.session.step(source, &mut host)
        };
        let step = step.map_err(|e| js_error("Script error", e))?;
        self.drive(step, Vec::new())
    }

    /// Answer the choice on screen. Returns the next JSON frame.
    pub fn choose(&mut self, index: usize) -> Result<String, JsError> {
        self.session
            .choose(index)
            .map_err(|e| js_error("Invalid choice", e))?;
        let mut host_commands = Vec::new();
        if let Walk::Choice = self.walk(&mut host_commands)? {
            return self.frame("awaiting_choice", host_commands);
        }
        let step = self.resume()?;
        self.drive(step, host_commands)
    }

    /// Return the current variables and switches as JSON.
    pub fn variables_json(&self) -> Result<String, JsError> {
        let snapshot = StateSnapshot {
            variables: self
                .state
                .variables
                .iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
            switches: self
                .state
                .switches
                .iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        };
        serde_json::to_string(&snapshot).map_err(|e| js_error("Serialization error", e))
    }
}

enum Walk {
    /// Stopped on a choice the player has to answer.
    Choice,
    /// Reached the relay's return; the session can resume.
    Returned,
}

// Private helpers
impl ScriptPlayer {
    /// Play the host side of each suspension until a choice needs the
    /// player or the script completes.
    fn drive(&mut self, mut step: Step, mut host_commands: Vec<String>) -> Result<String, JsError> {
        loop {
            if step == Step::Completed {
                return self.frame("completed", host_commands);
            }
            if let Walk::Choice = self.walk(&mut host_commands)? {
                return self.frame("awaiting_choice", host_commands);
            }
            step = self.resume()?;
        }
    }

    /// Execute inserted host instructions. Raw commands are only reported.
    fn walk(&mut self, host_commands: &mut Vec<String>) -> Result<Walk, JsError> {
        loop {
            match self.stream.advance().cloned() {
                Some(HostInstruction::Raw(payload)) => host_commands.push(payload),
                Some(HostInstruction::ResolveChoice) => return Ok(Walk::Choice),
                Some(HostInstruction::Return { invoker }) => {
                    HostRelay::return_to_invoker(&mut self.stream, invoker);
                    return Ok(Walk::Returned);
                }
                None => return Err(JsError::new("Instruction stream ended without a return")),
            }
        }
    }

    fn resume(&mut self) -> Result<Step, JsError> {
        let mut host = Host {
            variables: &mut self.state.variables,
            switches: &mut self.state.switches,
            display: &mut self.display,
            loader: &self.loader,
            stream: &mut self.stream,
        };
        self.session
            .resume(&mut host)
            .map_err(|e: ScriptError| js_error("Script error", e))
    }

    fn frame(&mut self, status: &'static str, host_commands: Vec<String>) -> Result<String, JsError> {
        let shown = self.display.take();
        let frame = Frame {
            status,
            pages: shown.pages,
            choice: shown.prompt,
            host_commands,
            items: self.items.borrow().clone(),
        };
        serde_json::to_string(&frame).map_err(|e| js_error("Serialization error", e))
    }
}
