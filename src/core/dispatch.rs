/// Command dispatch: an open registry from command codes to handlers.
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;

use crate::core::commands;
use crate::core::error::ScriptError;
use crate::core::host::Host;
use crate::core::session::Session;
use crate::schema::line::codes;

/// A command handler. Receives the trimmed argument text.
pub type CommandHandler = Rc<dyn Fn(&str, &mut Session, &mut Host<'_>) -> Result<(), ScriptError>>;

#[derive(Clone, Default)]
pub struct CommandRegistry {
    handlers: FxHashMap<String, CommandHandler>,
}

impl CommandRegistry {
    /// An empty registry. Every command will be reported as unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in command.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(codes::PRETEXT, commands::pretext);
        registry.register(codes::SET_SWITCH, commands::set_switch);
        registry.register(codes::FLIP_SWITCH, commands::flip_switch);
        registry.register(codes::SET_VAR, commands::set_var);
        registry.register(codes::STATE_IF, commands::state_if);
        registry.register(codes::STATE_WHILE, commands::state_while);
        registry.register(codes::STATE_CHOICE, commands::state_choice);
        registry.register(codes::OPEN_EVENT, commands::open_event);
        registry.register(codes::STATE_COMMAND, commands::state_command);
        for code in codes::TERMINATORS {
            registry.register(code, move |_, session, host| {
                session.diagnostic(host, &format!("Unexpected {}: no open block", code));
                Ok(())
            });
        }
        registry
    }

    /// Register or replace the handler for `code`.
    pub fn register<F>(&mut self, code: &str, handler: F)
    where
        F: Fn(&str, &mut Session, &mut Host<'_>) -> Result<(), ScriptError> + 'static,
    {
        self.handlers.insert(code.to_string(), Rc::new(handler));
    }

    pub fn unregister(&mut self, code: &str) -> bool {
        self.handlers.remove(code).is_some()
    }

    pub fn get(&self, code: &str) -> Option<CommandHandler> {
        self.handlers.get(code).cloned()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.handlers.contains_key(code)
    }

    /// Registered codes, sorted.
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("codes", &self.codes())
            .finish()
    }
}
