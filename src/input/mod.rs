//! Recorded sample input for the command-line driver.

pub mod reader;

pub use reader::{InputError, Recording};
