/// Host collaborators: the display surface, the host instruction stream,
/// script loading, and the relay that stages host commands.
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::core::choice::ChoicePrompt;
use crate::core::error::ScriptError;
use crate::schema::state::Namespace;

/// Where dialogue text and choice prompts go.
pub trait DisplaySurface {
    fn open_page(&mut self);
    fn append_text(&mut self, text: &str);
    /// Show a choice. The host answers later through `Session::choose`.
    fn set_choices(&mut self, prompt: &ChoicePrompt);
}

/// An instruction placed into the host's own instruction stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostInstruction {
    /// An opaque host command payload from `stateCommand`.
    Raw(String),
    /// Wait for the player's answer to the prompt on screen.
    ResolveChoice,
    /// Rewind to the instruction that invoked the interpreter.
    Return { invoker: usize },
}

/// A staged host instruction. A `Return` to the invoker always follows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingHostCommand {
    pub instruction: HostInstruction,
}

/// The host's instruction list, seen through a narrow window.
pub trait InstructionStream {
    fn insert_after_current(&mut self, instruction: HostInstruction);
    fn current_pointer(&self) -> usize;
    fn rewind(&mut self, by: usize);
}

/// Stages pending commands into an instruction stream and unwinds them.
pub struct HostRelay;

impl HostRelay {
    /// Insert the pending instruction, then a `Return` to the current
    /// pointer, directly after the current pointer.
    pub fn stage(stream: &mut dyn InstructionStream, pending: &PendingHostCommand) {
        let invoker = stream.current_pointer();
        // Each insert lands right after the pointer, so insert in reverse.
        stream.insert_after_current(HostInstruction::Return { invoker });
        stream.insert_after_current(pending.instruction.clone());
    }

    /// Called when the host executes `Return { invoker }` at pointer `at`.
    pub fn return_to_invoker(stream: &mut dyn InstructionStream, invoker: usize) {
        let at = stream.current_pointer();
        stream.rewind(at.saturating_sub(invoker));
    }
}

/// An in-memory instruction stream for hosts without one of their own.
#[derive(Debug, Clone, Default)]
pub struct VecInstructionStream {
    instructions: Vec<HostInstruction>,
    pointer: usize,
}

impl VecInstructionStream {
    pub fn new(instructions: Vec<HostInstruction>) -> Self {
        Self {
            instructions,
            pointer: 0,
        }
    }

    /// The instruction under the pointer.
    pub fn current(&self) -> Option<&HostInstruction> {
        self.instructions.get(self.pointer)
    }

    /// Move to the next instruction and return it.
    pub fn advance(&mut self) -> Option<&HostInstruction> {
        if self.pointer < self.instructions.len() {
            self.pointer += 1;
        }
        self.instructions.get(self.pointer)
    }

    pub fn instructions(&self) -> &[HostInstruction] {
        &self.instructions
    }
}

impl InstructionStream for VecInstructionStream {
    fn insert_after_current(&mut self, instruction: HostInstruction) {
        let at = (self.pointer + 1).min(self.instructions.len());
        self.instructions.insert(at, instruction);
    }

    fn current_pointer(&self) -> usize {
        self.pointer
    }

    /// Rewinding drops the instructions stepped back over; they were inserted
    /// by the relay and have already run.
    fn rewind(&mut self, by: usize) {
        let target = self.pointer.saturating_sub(by);
        let end = (self.pointer + 1).min(self.instructions.len());
        if target + 1 < end {
            self.instructions.drain(target + 1..end);
        }
        self.pointer = target;
    }
}

/// Synchronous script loading by name.
pub trait ScriptLoader {
    fn load(&self, name: &str) -> Result<String, ScriptError>;
}

/// Loads scripts from files under a root directory.
#[derive(Debug, Clone)]
pub struct DirLoader {
    root: PathBuf,
    extension: Option<String>,
}

impl DirLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: Some("txt".to_string()),
        }
    }

    /// Extension appended to names that have none. `None` disables it.
    pub fn with_extension(mut self, extension: Option<&str>) -> Self {
        self.extension = extension.map(str::to_string);
        self
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        let path = self.root.join(name);
        match (&self.extension, path.extension()) {
            (Some(ext), None) => path.with_extension(ext),
            _ => path,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ScriptLoader for DirLoader {
    fn load(&self, name: &str) -> Result<String, ScriptError> {
        let inside_root = Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !inside_root {
            return Err(ScriptError::InvalidInput(format!(
                "script name '{}' must be a relative path inside the script root",
                name
            )));
        }
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(ScriptError::SourceNotFound(name.to_string()));
        }
        Ok(std::fs::read_to_string(path)?)
    }
}

/// Scripts held in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    scripts: FxHashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, text: &str) {
        self.scripts.insert(name.to_string(), text.to_string());
    }

    pub fn with(mut self, name: &str, text: &str) -> Self {
        self.insert(name, text);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }
}

impl ScriptLoader for MemoryLoader {
    fn load(&self, name: &str) -> Result<String, ScriptError> {
        self.scripts
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::SourceNotFound(name.to_string()))
    }
}

/// A display surface that records pages and the latest prompt.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageBuffer {
    pub pages: Vec<Vec<String>>,
    pub prompt: Option<ChoicePrompt>,
}

impl PageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All text lines across pages, in display order.
    pub fn lines(&self) -> Vec<String> {
        self.pages.iter().flatten().cloned().collect()
    }

    /// Take everything shown so far, leaving the buffer empty.
    pub fn take(&mut self) -> PageBuffer {
        std::mem::take(self)
    }
}

impl DisplaySurface for PageBuffer {
    fn open_page(&mut self) {
        self.pages.push(Vec::new());
    }

    fn append_text(&mut self, text: &str) {
        match self.pages.last_mut() {
            Some(page) => page.push(text.to_string()),
            None => self.pages.push(vec![text.to_string()]),
        }
    }

    fn set_choices(&mut self, prompt: &ChoicePrompt) {
        self.prompt = Some(prompt.clone());
    }
}

/// Everything the session touches outside itself, borrowed for one call.
pub struct Host<'a> {
    pub variables: &'a mut dyn Namespace<f64>,
    pub switches: &'a mut dyn Namespace<bool>,
    pub display: &'a mut dyn DisplaySurface,
    pub loader: &'a dyn ScriptLoader,
    pub stream: &'a mut dyn InstructionStream,
}
