//! Session transports.

pub mod console;

pub use console::ConsoleSession;
