pub mod telegram;
pub mod registry;

use serde::{Deserialize, Serialize};

use crate::domain::Notice;

pub use registry::{DispatchContext, DispatcherRegistry};
pub use telegram::{ChannelApi, Downloader, TelegramDispatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatcherKind {
    Telegram,
}

impl DispatcherKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatcherKind::Telegram => "telegram",
        }
    }
}

impl std::fmt::Display for DispatcherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A delivery channel for notices.
pub trait Dispatcher: Send + Sync {
    /// Unique configured name, used in failure records
    fn name(&self) -> &str;

    fn kind(&self) -> DispatcherKind;

    /// Deliver `notice`. Returns true only once the channel confirmed
    /// acceptance; delivery problems are reported as false, never raised.
    fn send(&self, notice: &Notice<'_>) -> bool;
}

impl std::fmt::Debug for dyn Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}[{}]>", self.kind(), self.name())
    }
}
