/// The interpreter session: owns the frame stack, the pending host command
/// and the per-source resume tokens, and drives the line-processing loop.
///
/// The session is a two-state machine from the host's point of view: it is
/// either running a source to completion or suspended while the host carries
/// out a staged instruction. `step` starts a source, `resume` continues after
/// the host is done.
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::core::arith::Value;
use crate::core::choice::ChoicePrompt;
use crate::core::config::{ErrorPolicy, SessionConfig};
use crate::core::dispatch::CommandRegistry;
use crate::core::error::{EvalError, ScriptError};
use crate::core::expr;
use crate::core::host::{Host, HostInstruction, HostRelay, PendingHostCommand};
use crate::schema::line::{LineKind, ScriptSyntax};
use crate::schema::source::{Cursor, Source, SourceId};

/// How a frame ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    /// A loaded script: runs once.
    Source,
    /// An if-branch or choice option body: runs once.
    Block,
    /// A while-loop body: re-runs while `condition` holds.
    Loop { condition: String },
}

#[derive(Debug, Clone)]
struct Frame {
    source: Source,
    /// Next line to process.
    index: usize,
    kind: FrameKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Running,
    /// Waiting for the host to carry out a staged instruction.
    Suspended,
}

/// What a call to `step` or `resume` ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Every frame ran to its end.
    Completed,
    /// The host must carry out this instruction, then call `resume`.
    Suspended(HostInstruction),
}

#[derive(Debug, Clone)]
struct AwaitingChoice {
    prompt: ChoicePrompt,
    chosen: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    registry: CommandRegistry,
    frames: Vec<Frame>,
    status: Status,
    pending: Option<PendingHostCommand>,
    resume_tokens: FxHashMap<SourceId, usize>,
    awaiting_choice: Option<AwaitingChoice>,
    pretext: Option<String>,
    /// Lines on the current page; zero means a new page opens on the next line.
    page_lines: usize,
    next_memory_id: u64,
}

impl Session {
    /// A session with every built-in command.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_registry(config, CommandRegistry::with_builtins())
    }

    pub fn with_registry(config: SessionConfig, registry: CommandRegistry) -> Self {
        Self {
            config,
            registry,
            frames: Vec::new(),
            status: Status::Idle,
            pending: None,
            resume_tokens: FxHashMap::default(),
            awaiting_choice: None,
            pretext: None,
            page_lines: 0,
            next_memory_id: 0,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn syntax(&self) -> &ScriptSyntax {
        &self.config.syntax
    }

    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn pending(&self) -> Option<&PendingHostCommand> {
        self.pending.as_ref()
    }

    /// The prompt waiting for an answer, if any.
    pub fn pending_choice(&self) -> Option<&ChoicePrompt> {
        self.awaiting_choice.as_ref().map(|w| &w.prompt)
    }

    /// The stored resume position for `source`, if one is waiting.
    pub fn resume_token(&self, source: &SourceId) -> Option<Cursor> {
        self.resume_tokens.get(source).map(|&index| Cursor {
            source: source.clone(),
            index,
        })
    }

    /// Number of active frames (the running source plus nested blocks).
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Allocate an opaque id for in-memory lines.
    pub fn memory_id(&mut self) -> SourceId {
        self.next_memory_id += 1;
        SourceId::Memory(self.next_memory_id)
    }

    /// Start running `source`.
    ///
    /// If a resume token is stored for this source it is consumed and
    /// processing starts at its index instead of line 0.
    pub fn step(&mut self, source: Source, host: &mut Host<'_>) -> Result<Step, ScriptError> {
        match self.status {
            Status::Suspended => return Err(ScriptError::AlreadySuspended),
            Status::Running => {
                return Err(ScriptError::InvalidInput(
                    "step called while a source is running; use openEvent instead".to_string(),
                ))
            }
            Status::Idle => {}
        }

        let index = self.resume_tokens.remove(&source.id).unwrap_or(0);
        debug!(source = %source.id, index, "starting source");
        self.frames.push(Frame {
            source,
            index,
            kind: FrameKind::Source,
        });
        self.page_lines = 0;
        self.run(host)
    }

    /// Continue after the host has carried out the staged instruction.
    ///
    /// The innermost frame's resume token is consumed. If a choice was
    /// answered through `choose`, that option's block runs first; if it was
    /// not answered, the cancel option runs when there is one.
    pub fn resume(&mut self, host: &mut Host<'_>) -> Result<Step, ScriptError> {
        if self.status != Status::Suspended {
            return Err(ScriptError::NotSuspended);
        }
        self.pending = None;
        self.page_lines = 0;

        if let Some(frame) = self.frames.last_mut() {
            if let Some(index) = self.resume_tokens.remove(&frame.source.id) {
                frame.index = index;
            }
            debug!(source = %frame.source.id, index = frame.index, "resuming");
        }

        if let Some(waiting) = self.awaiting_choice.take() {
            let lines = match waiting.chosen {
                Some(lines) => Some(lines),
                None => {
                    debug!(cancel = ?waiting.prompt.cancel_index, "choice not answered");
                    waiting
                        .prompt
                        .cancel_index
                        .and_then(|idx| waiting.prompt.resolve(idx))
                }
            };
            if let Some(lines) = lines {
                self.push_block(lines, FrameKind::Block, host);
            }
        }

        self.run(host)
    }

    /// Answer the pending choice. The option's block runs on the next `resume`.
    pub fn choose(&mut self, index: usize) -> Result<(), ScriptError> {
        let waiting = self
            .awaiting_choice
            .as_mut()
            .ok_or(ScriptError::NoPendingChoice)?;
        let count = waiting.prompt.len();
        if index >= count {
            return Err(ScriptError::ChoiceOutOfRange { index, count });
        }
        waiting.chosen = Some(waiting.prompt.resolve(index).unwrap_or_default());
        Ok(())
    }

    /// Drop every frame and any pending work. Resume tokens of named sources
    /// are kept, so the next `step` of a suspended source picks up where it
    /// stopped. Tokens of in-memory block frames are dropped with them.
    pub fn abandon(&mut self) {
        for frame in self.frames.drain(..) {
            if let SourceId::Memory(_) = frame.source.id {
                self.resume_tokens.remove(&frame.source.id);
            }
        }
        self.pending = None;
        self.awaiting_choice = None;
        self.pretext = None;
        self.status = Status::Idle;
    }

    /// Abandon any run and forget every resume token, so the next `step`
    /// of any source starts at line 0.
    pub fn reset(&mut self) {
        self.abandon();
        self.resume_tokens.clear();
    }

    fn run(&mut self, host: &mut Host<'_>) -> Result<Step, ScriptError> {
        self.status = Status::Running;
        match self.run_frames(host) {
            Ok(step) => Ok(step),
            Err(err) => {
                self.abandon();
                Err(err)
            }
        }
    }

    fn run_frames(&mut self, host: &mut Host<'_>) -> Result<Step, ScriptError> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                self.status = Status::Idle;
                return Ok(Step::Completed);
            };

            if frame.index >= frame.source.len() {
                if let FrameKind::Loop { condition } = &frame.kind {
                    let condition = condition.clone();
                    match self.evaluate_condition(&condition, host) {
                        Ok(true) => {
                            if let Some(frame) = self.frames.last_mut() {
                                frame.index = 0;
                            }
                            continue;
                        }
                        Ok(false) => {}
                        Err(err) => self.report("stateWhile", err.into(), host)?,
                    }
                }
                self.frames.pop();
                continue;
            }

            let line = frame.source.lines()[frame.index].clone();
            frame.index += 1;
            self.process_line(&line, host)?;

            if self.pending.is_some() {
                return Ok(self.suspend(host));
            }
        }
    }

    fn process_line(&mut self, line: &str, host: &mut Host<'_>) -> Result<(), ScriptError> {
        match self.config.syntax.classify(line) {
            LineKind::Comment => Ok(()),
            LineKind::Text(text) => {
                self.show_text(text, host);
                Ok(())
            }
            LineKind::Command { code, args } => self.dispatch(code, args, host),
        }
    }

    fn dispatch(&mut self, code: &str, args: &str, host: &mut Host<'_>) -> Result<(), ScriptError> {
        let Some(handler) = self.registry.get(code) else {
            self.diagnostic(host, &format!("Unknown command: {}", code));
            return Ok(());
        };
        trace!(code, args, "dispatch");
        match (*handler)(args, self, host) {
            Ok(()) => Ok(()),
            Err(err) => self.report(code, err, host),
        }
    }

    /// Apply the error policy to a failed command.
    fn report(&mut self, code: &str, err: ScriptError, host: &mut Host<'_>) -> Result<(), ScriptError> {
        match self.config.error_policy {
            ErrorPolicy::Continue => {
                self.diagnostic(host, &format!("Error in {}: {}", code, err));
                Ok(())
            }
            ErrorPolicy::Halt => Err(err),
        }
    }

    fn suspend(&mut self, host: &mut Host<'_>) -> Step {
        let Some(pending) = self.pending.clone() else {
            return Step::Completed;
        };
        if let Some(frame) = self.frames.last() {
            debug!(source = %frame.source.id, index = frame.index, "suspending");
            self.resume_tokens.insert(frame.source.id.clone(), frame.index);
        }
        HostRelay::stage(host.stream, &pending);
        self.status = Status::Suspended;
        self.page_lines = 0;
        Step::Suspended(pending.instruction)
    }

    fn emit_line(&mut self, text: &str, host: &mut Host<'_>) {
        if self.page_lines == 0 || self.page_lines >= self.config.lines_per_page {
            host.display.open_page();
            self.page_lines = 0;
        }
        host.display.append_text(text);
        self.page_lines += 1;
    }

    fn show_text(&mut self, text: &str, host: &mut Host<'_>) {
        match self.pretext.take() {
            Some(prefix) => self.emit_line(&format!("{}{}", prefix, text), host),
            None => self.emit_line(text, host),
        }
    }

    // ----- Handler API -----

    /// Show an in-band diagnostic line and log it.
    pub fn diagnostic(&mut self, host: &mut Host<'_>, message: &str) {
        let at = self
            .frames
            .last()
            .map(|f| format!("{}:{}", f.source.id, f.index));
        warn!(at = at.as_deref().unwrap_or("-"), "{}", message);
        self.emit_line(message, host);
    }

    /// Lines of the innermost frame.
    pub fn current_lines(&self) -> &[String] {
        self.frames.last().map(|f| f.source.lines()).unwrap_or(&[])
    }

    /// Index of the line being processed in the innermost frame.
    pub fn current_index(&self) -> usize {
        self.frames
            .last()
            .map(|f| f.index.saturating_sub(1))
            .unwrap_or(0)
    }

    /// Set the next line the innermost frame will process.
    pub fn jump_to(&mut self, index: usize) {
        if let Some(frame) = self.frames.last_mut() {
            frame.index = index.min(frame.source.len());
        }
    }

    pub fn set_pretext(&mut self, text: &str) {
        self.pretext = Some(text.to_string());
    }

    pub fn evaluate(&self, statement: &str, host: &Host<'_>) -> Result<Value, EvalError> {
        expr::evaluate(statement, &self.config.syntax, &*host.variables, &*host.switches)
    }

    pub fn evaluate_condition(&self, statement: &str, host: &Host<'_>) -> Result<bool, EvalError> {
        expr::evaluate_condition(statement, &self.config.syntax, &*host.variables, &*host.switches)
    }

    pub fn evaluate_number(&self, statement: &str, host: &Host<'_>) -> Result<f64, EvalError> {
        expr::evaluate_number(statement, &self.config.syntax, &*host.variables, &*host.switches)
    }

    /// Run `lines` as a nested block before the current frame continues.
    pub fn push_block(&mut self, lines: Vec<String>, kind: FrameKind, host: &mut Host<'_>) {
        let id = self.memory_id();
        self.push_frame(Source::from_lines(id, lines), kind, host);
    }

    /// Run another source to completion before the current frame continues.
    /// A stored resume token for it is honored.
    pub fn push_source(&mut self, source: Source, host: &mut Host<'_>) {
        self.push_frame(source, FrameKind::Source, host);
    }

    fn push_frame(&mut self, source: Source, kind: FrameKind, host: &mut Host<'_>) {
        if self.frames.len() >= self.config.max_depth {
            self.diagnostic(
                host,
                &format!(
                    "Cannot enter {}: nesting deeper than {} frames",
                    source.id, self.config.max_depth
                ),
            );
            return;
        }
        let index = self.resume_tokens.remove(&source.id).unwrap_or(0);
        trace!(source = %source.id, index, depth = self.frames.len() + 1, "enter frame");
        self.frames.push(Frame {
            source,
            index,
            kind,
        });
    }

    /// Stage an instruction for the host. Processing stops after the
    /// current line.
    pub fn stage_host_command(&mut self, instruction: HostInstruction) -> Result<(), ScriptError> {
        if self.pending.is_some() {
            return Err(ScriptError::HostCommandPending);
        }
        self.pending = Some(PendingHostCommand { instruction });
        Ok(())
    }

    /// Show a choice and wait for the host to collect the answer.
    pub fn present_choice(&mut self, prompt: ChoicePrompt, host: &mut Host<'_>) -> Result<(), ScriptError> {
        self.stage_host_command(HostInstruction::ResolveChoice)?;
        host.display.set_choices(&prompt);
        self.awaiting_choice = Some(AwaitingChoice {
            prompt,
            chosen: None,
        });
        Ok(())
    }
}
