//! Narrative Script: a line-oriented interpreter for branching game dialogue.
//!
//! Scripts are plain text. Lines are either dialogue text, comments, or fenced
//! commands that read and write game state, branch, loop, offer choices, and
//! hand instructions back to the host game. The interpreter runs inside the
//! host's update loop and suspends whenever the host has work to do.

pub mod core;
pub mod schema;
