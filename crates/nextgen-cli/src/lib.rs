// Library interface for nextgen-cli
// This allows integration tests to access the command parser.

// NOTE: commands.rs is also declared in main.rs, so we use a path attribute
// to reference the same source file.

#[path = "commands.rs"]
pub mod commands;

pub use commands::{handle_command, resolve_conversation, CommandResult};
