//! Process-wide, read-only-after-startup state shared by every transport
//! adapter: the config snapshot, the record store handle, and the HTTP
//! client used for DoH upstream calls (built once so the configured proxy
//! applies to every request).

use std::sync::Arc;

use crate::config::Config;
use crate::error::app::{self, AppError, ConfigErrorStruct};
use crate::store::memory::MemoryStore;
use crate::store::Store;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> app::Result<Self> {
        let mut builder = reqwest::Client::builder();
        let proxy = &config.service.upstream.http_proxy;
        if !proxy.is_empty() {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| AppError::Config(ConfigErrorStruct::new(format!("invalid upstream.httpProxy: {e}"))))?;
            builder = builder.proxy(proxy);
        }
        let http_client = builder
            .build()
            .map_err(|e| AppError::Config(ConfigErrorStruct::new(format!("failed to build http client: {e}"))))?;

        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

        Ok(AppState {
            config,
            store,
            http_client,
        })
    }
}
