use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Identifies a script source: a loaded file or an in-memory block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceId {
    /// A script loaded by name through a `ScriptLoader`.
    Path(String),
    /// An opaque token for lines that never came from a file.
    Memory(u64),
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::Path(path) => write!(f, "{}", path),
            SourceId::Memory(token) => write!(f, "<memory #{}>", token),
        }
    }
}

/// An identifier plus its ordered, immutable lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub id: SourceId,
    lines: Rc<[String]>,
}

impl Source {
    /// Split raw script text into lines. Accepts LF and CRLF endings.
    pub fn parse(id: SourceId, text: &str) -> Source {
        Self::from_lines(id, text.lines().map(str::to_string).collect())
    }

    pub fn from_lines(id: SourceId, lines: Vec<String>) -> Source {
        Source {
            id,
            lines: lines.into(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// The next line to process in a given source. Stored as a resume token
/// while the session waits on the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor {
    pub source: SourceId,
    pub index: usize,
}
