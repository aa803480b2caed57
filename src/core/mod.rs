pub mod arith;
pub mod block;
pub mod choice;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod expr;
pub mod host;
pub mod session;

pub use config::{ErrorPolicy, SessionConfig};
pub use error::{ErrorKind, EvalError, ScriptError};
pub use host::{Host, HostInstruction, HostRelay};
pub use session::{Session, Status, Step};
