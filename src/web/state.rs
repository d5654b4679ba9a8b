use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::info;

use crate::{
    clipboard::{Clipboard, SystemClipboard},
    config::AppConfig,
    session::SessionStore,
    store::{CloudinaryClient, ImageStore},
};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    sessions: SessionStore,
    store: Arc<dyn ImageStore>,
    clipboard: Arc<dyn Clipboard>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;
        let store = CloudinaryClient::with_client(http, &config.store);
        info!(endpoint = store.endpoint(), "image store configured");

        Ok(Self::with_backends(
            config,
            Arc::new(store),
            Arc::new(SystemClipboard),
        ))
    }

    pub fn with_backends(
        config: AppConfig,
        store: Arc<dyn ImageStore>,
        clipboard: Arc<dyn Clipboard>,
    ) -> Self {
        let sessions = SessionStore::new(config.gate.clone(), config.workflow.clone());
        Self {
            config: Arc::new(config),
            sessions,
            store,
            clipboard,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn store(&self) -> Arc<dyn ImageStore> {
        self.store.clone()
    }

    pub fn clipboard(&self) -> &dyn Clipboard {
        self.clipboard.as_ref()
    }
}
