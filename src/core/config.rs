/// Session configuration, loadable from RON.
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::ScriptError;
use crate::schema::line::ScriptSyntax;

/// What happens when a single command fails with an evaluation or input error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ErrorPolicy {
    /// Report the failure as an in-band text line and carry on with the next line.
    #[default]
    Continue,
    /// Stop processing and return the error to the host.
    Halt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub syntax: ScriptSyntax,
    /// Text lines shown per message page before a new page is opened.
    pub lines_per_page: usize,
    /// Maximum number of nested frames (blocks, loops, opened events).
    pub max_depth: usize,
    pub error_policy: ErrorPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            syntax: ScriptSyntax::default(),
            lines_per_page: 4,
            max_depth: 64,
            error_policy: ErrorPolicy::Continue,
        }
    }
}

impl SessionConfig {
    pub fn load_from_ron(path: &Path) -> Result<SessionConfig, ScriptError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<SessionConfig, ScriptError> {
        let config: SessionConfig = ron::from_str(input)?;
        if config.lines_per_page == 0 {
            return Err(ScriptError::InvalidInput(
                "lines_per_page must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }
}
