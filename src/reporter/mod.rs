//! Reporter module for output formatting

pub mod console;
pub mod json;
pub mod text;

pub use console::ConsoleReporter;
pub use json::JsonReporter;
pub use text::TextReporter;
