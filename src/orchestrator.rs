//! When the loader runs relative to access validation
//!
//! A page without an access credential loads every image right away. A
//! page with one reserves two extra progress units (`config` and
//! `comment`), loads what it can without the credential, and defers
//! marked images until a [`GuestSession`] accepts it.

use crate::element::ElementSource;
use crate::loader::{ImageLoader, LoadSummary, LoaderDeps, LoaderSettings};
use crate::registry::ImageRegistry;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// Progress label of the credential check
pub const CONFIG_LABEL: &str = "config";

/// Progress label of the comment fetch
pub const COMMENT_LABEL: &str = "comment";

/// Query parameter that overrides the page credential
pub const CREDENTIAL_PARAM: &str = "k";

/// Access checks and the non-image work that follows them
#[async_trait]
pub trait GuestSession: Send + Sync {
    /// Check `credential` with the backend
    ///
    /// `Ok(false)` and `Err` both mean access was refused.
    async fn validate(&self, credential: &str) -> Result<bool>;

    /// Fetch the page's comments once access was granted
    async fn load_comments(&self) -> Result<()>;
}

/// How the page is loaded
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadMode {
    /// No credential: everything loads at once
    Immediate,
    /// Marked images wait for the credential check
    Gated {
        /// Credential sent to [`GuestSession::validate`]
        credential: String,
    },
}

/// Outcome of the credential check in gated mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// Credential accepted; deferred images were loaded
    Granted,
    /// Credential refused; deferred images stay pending
    Refused,
}

/// What one orchestrated page load did
pub struct PageLoad {
    /// Mode the page ran in
    pub mode: LoadMode,
    /// Credential check result, gated mode only
    pub access: Option<Access>,
    /// The loader, for callers that want to inspect or resume it
    pub loader: Arc<ImageLoader>,
    /// Tally of every load pass, in order
    pub passes: Vec<LoadSummary>,
}

/// Drives the loader according to the page's access mode
pub struct Orchestrator {
    session: Arc<dyn GuestSession>,
    page_credential: Option<String>,
    page_url: Option<Url>,
}

impl Orchestrator {
    /// Orchestrator for a page without a credential
    pub fn new(session: Arc<dyn GuestSession>) -> Self {
        Self {
            session,
            page_credential: None,
            page_url: None,
        }
    }

    /// Credential embedded in the page; empty means none
    pub fn with_page_credential(mut self, credential: impl Into<String>) -> Self {
        self.page_credential = Some(credential.into());
        self
    }

    /// Address the page was opened with, for the query override
    pub fn with_page_url(mut self, url: Url) -> Self {
        self.page_url = Some(url);
        self
    }

    /// Decide the mode from the page credential and the query string
    ///
    /// Only a non-empty page credential gates the page. Once gated, a `k`
    /// query parameter replaces it, even when empty.
    pub fn mode(&self) -> LoadMode {
        let Some(page) = self.page_credential.as_deref().filter(|c| !c.is_empty()) else {
            return LoadMode::Immediate;
        };

        let from_query = self.page_url.as_ref().and_then(|url| {
            url.query_pairs()
                .find(|(name, _)| name == CREDENTIAL_PARAM)
                .map(|(_, value)| value.into_owned())
        });

        LoadMode::Gated {
            credential: from_query.unwrap_or_else(|| page.to_string()),
        }
    }

    /// Register the page's images and load them according to [`mode`](Self::mode)
    pub async fn run(
        &self,
        source: &dyn ElementSource,
        deps: LoaderDeps,
        settings: LoaderSettings,
    ) -> PageLoad {
        let mode = self.mode();
        let sink = deps.sink.clone();

        let credential = match &mode {
            LoadMode::Gated { credential } => credential.clone(),
            LoadMode::Immediate => {
                let loader = Arc::new(ImageRegistry::initialize(source, deps, settings));
                tracing::info!(units = loader.registered(), "loading page images immediately");
                let passes = vec![loader.load().await];
                return PageLoad {
                    mode,
                    access: None,
                    loader,
                    passes,
                };
            }
        };

        // Counted before the images so readiness waits for both steps
        sink.add_unit(CONFIG_LABEL);
        sink.add_unit(COMMENT_LABEL);

        let loader = Arc::new(ImageRegistry::initialize(source, deps, settings));
        let mut passes = Vec::with_capacity(2);

        if loader.has_cache_aside_work() {
            passes.push(loader.load_native().await);
        } else {
            passes.push(loader.load().await);
        }

        let accepted = match self.session.validate(&credential).await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, code = e.error_code(), "credential check failed");
                false
            }
        };

        if !accepted {
            tracing::warn!(
                pending = loader.pending().await,
                "credential refused, marked images stay pending"
            );
            sink.invalid(CONFIG_LABEL);
            return PageLoad {
                mode,
                access: Some(Access::Refused),
                loader,
                passes,
            };
        }

        sink.complete(CONFIG_LABEL);
        if loader.has_cache_aside_work() {
            passes.push(loader.load().await);
        }

        match self.session.load_comments().await {
            Ok(()) => sink.complete(COMMENT_LABEL),
            Err(e) => {
                tracing::warn!(error = %e, "comment fetch failed");
                sink.invalid(COMMENT_LABEL);
            }
        }

        PageLoad {
            mode,
            access: Some(Access::Granted),
            loader,
            passes,
        }
    }
}
