pub mod detection;
pub mod dispatch;
pub mod table;
pub mod types;

pub use detection::detect_command;
pub use dispatch::{CommandContext, CommandDispatcher, CommandHandler, CommandResponse};
pub use table::SoundTable;
pub use types::{Attachment, BuiltinCommand, CommandInvocation, DEFAULT_MARKER};
