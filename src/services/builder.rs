use std::sync::Arc;

use tracing::info;

use crate::config::{Config, Settings};
use crate::dispatch::{DispatchContext, DispatcherRegistry, Downloader};
use crate::errors::FeederResult;
use crate::http::HttpClient;
use crate::services::{Runner, Source};
use crate::sources::ReaderRegistry;
use crate::storage::{FileFailureLog, FileHistoryRepository, FileStorage, HistoryRepository};

/// Wire up readers, dispatchers and file stores for every configured
/// source. Histories are loaded here.
pub fn build_runner(config: &Config, settings: &Settings) -> FeederResult<Runner<FileFailureLog>> {
    let storage = FileStorage::new(&config.dump_dir)?;
    let http = Arc::new(HttpClient::new(
        &settings.user_agent,
        settings.request_timeout(),
        settings.retry_policy(),
    )?);

    let readers = ReaderRegistry::new(Arc::clone(&http));
    let downloader: Arc<dyn Downloader> = http;
    let ctx = DispatchContext {
        bot_token: config.bot_token.as_deref(),
        downloader,
        upload_extensions: &settings.upload_extensions,
        timeout: settings.request_timeout(),
        retry: settings.retry_policy(),
    };
    let dispatchers = DispatcherRegistry::from_settings(&settings.dispatchers, &ctx)?;

    let history: Arc<dyn HistoryRepository> = Arc::new(FileHistoryRepository::new(storage.clone()));
    let sources = settings
        .notice_sources
        .iter()
        .map(|entry| {
            Source::new(
                entry.name.clone(),
                entry.url.clone(),
                settings.max_dump_for(entry),
                dispatchers.resolve(&entry.dispatchers)?,
                readers.get(entry.reader)?,
                Arc::clone(&history),
            )
        })
        .collect::<FeederResult<Vec<_>>>()?;

    info!(
        sources = sources.len(),
        dispatchers = dispatchers.names().len(),
        dump = %storage.root().display(),
        "runner ready"
    );
    Ok(Runner::new(sources, FileFailureLog::new(storage)))
}
