//! One-shot terminal commands beside the chat REPL.

pub mod doctor;
pub mod geo;
pub mod weather;
