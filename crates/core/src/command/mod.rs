//! External processes started by the pipeline

pub mod side_command;

pub use side_command::{SideCommand, SideProcess};
