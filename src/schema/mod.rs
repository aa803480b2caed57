pub mod line;
pub mod source;
pub mod state;
