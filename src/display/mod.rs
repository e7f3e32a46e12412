// src/display/mod.rs
//! Display modules for the command-line front end

pub mod terminal;

pub use terminal::TerminalDisplay;
