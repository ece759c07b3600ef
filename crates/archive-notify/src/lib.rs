mod actions;
mod notifier;
mod payload;

pub use actions::{build_result_actions, CHAT_BOT_SOURCE};
pub use notifier::{NotifyError, Notifier};
pub use payload::{ActionKind, IngestResultPayload, ResultAction};
