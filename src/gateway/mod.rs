//! Completion gateway: response cache, single-flight queue and retry,
//! wired together.

mod builder;
mod completion;
pub mod queue;

pub use builder::{DEFAULT_HISTORY_LIMIT, DEFAULT_SYSTEM_PROMPT, Huginn, HuginnBuilder};
pub use completion::{CompletionGateway, GatewayStats};
pub use queue::{Completion, SingleFlightQueue, Submission};
