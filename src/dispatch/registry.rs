use std::sync::Arc;
use std::time::Duration;

use crate::config::DispatcherSettings;
use crate::dispatch::{telegram, Dispatcher, DispatcherKind, Downloader};
use crate::errors::{FeederError, FeederResult};
use crate::http::RetryPolicy;

/// Everything a dispatcher constructor may need besides its own settings.
pub struct DispatchContext<'a> {
    pub bot_token: Option<&'a str>,
    pub downloader: Arc<dyn Downloader>,
    pub upload_extensions: &'a [String],
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

type Constructor = fn(&DispatcherSettings, &DispatchContext<'_>) -> FeederResult<Arc<dyn Dispatcher>>;

/// One constructor per dispatcher kind
const CONSTRUCTORS: &[(DispatcherKind, Constructor)] = &[(DispatcherKind::Telegram, telegram::build)];

fn constructor(kind: DispatcherKind) -> FeederResult<Constructor> {
    CONSTRUCTORS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, build)| *build)
        .ok_or_else(|| FeederError::UnknownDispatcher(kind.to_string()))
}

/// Named dispatchers shared by every source that references them.
pub struct DispatcherRegistry {
    dispatchers: Vec<Arc<dyn Dispatcher>>,
}

impl DispatcherRegistry {
    pub fn new() -> Self {
        Self {
            dispatchers: Vec::new(),
        }
    }

    pub fn from_settings(settings: &[DispatcherSettings], ctx: &DispatchContext<'_>) -> FeederResult<Self> {
        let mut registry = Self::new();
        for entry in settings {
            let build = constructor(entry.kind)?;
            registry.register(build(entry, ctx)?)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, dispatcher: Arc<dyn Dispatcher>) -> FeederResult<()> {
        if self.dispatchers.iter().any(|d| d.name() == dispatcher.name()) {
            return Err(FeederError::Config(format!(
                "duplicate dispatcher name '{}'",
                dispatcher.name()
            )));
        }
        self.dispatchers.push(dispatcher);
        Ok(())
    }

    pub fn get(&self, name: &str) -> FeederResult<Arc<dyn Dispatcher>> {
        self.dispatchers
            .iter()
            .find(|d| d.name() == name)
            .cloned()
            .ok_or_else(|| FeederError::Config(format!("unknown dispatcher '{}'", name)))
    }

    /// Look up every name, keeping the given order
    pub fn resolve(&self, names: &[String]) -> FeederResult<Vec<Arc<dyn Dispatcher>>> {
        names.iter().map(|name| self.get(name)).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.dispatchers.iter().map(|d| d.name()).collect()
    }
}

impl Default for DispatcherRegistry {
    fn default() -> Self {
        Self::new()
    }
}
