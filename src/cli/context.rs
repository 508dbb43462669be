//! Everything a command needs, passed explicitly.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::cli::output::OutputMode;
use crate::domain::errors::{DomainResult, ValidationError};
use crate::domain::models::{Config, Project};
use crate::domain::ports::Platform;
use crate::infrastructure::api::{build_http_client, ApiClient, ApiClientConfig, HttpPlatform, RetryPolicy};
use crate::infrastructure::auth::{select_grant, Authenticator, GrantClient, TokenCache};
use crate::services::observer::{ObserveOptions, Observation, Observer, ObserverConfig, WorkItem};
use crate::services::resolver::resolve_id;

const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner:.green} {msg}";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Configuration, output mode and platform shared by every command.
pub struct CliContext {
    config: Config,
    output: OutputMode,
    platform: Arc<dyn Platform>,
    shutdown: broadcast::Sender<()>,
}

impl CliContext {
    pub fn new(config: Config, output: OutputMode, platform: Arc<dyn Platform>) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            config,
            output,
            platform,
            shutdown,
        }
    }

    /// Context backed by the HTTP platform. No request is made until a
    /// command needs one.
    pub fn connect(config: Config, output: OutputMode) -> Result<Self> {
        let http = build_http_client(Duration::from_secs(config.request_timeout_secs))
            .context("Failed to build HTTP client")?;
        let grants = GrantClient::new(http.clone(), &config.auth_url, &config.audience)
            .context("Invalid auth URL")?;
        let cache = config
            .auth
            .token_cache_path
            .clone()
            .or_else(TokenCache::default_path)
            .map(TokenCache::new);
        let tokens = Arc::new(Authenticator::new(grants, select_grant(&config.auth), cache));
        let client = ApiClient::new(
            http,
            ApiClientConfig {
                base_url: config.url.clone(),
                retry: RetryPolicy::from_config(&config.retry),
            },
            tokens,
        )
        .context("Invalid API URL")?;
        debug!(url = %config.url, "platform client ready");
        Ok(Self::new(config, output, Arc::new(HttpPlatform::new(client))))
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    pub const fn output(&self) -> OutputMode {
        self.output
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Project from `--project`, falling back to the configured default.
    pub async fn project_id(&self, flag: Option<&str>) -> Result<Uuid> {
        let key = flag
            .map(str::to_string)
            .or_else(|| self.config.project.clone())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ValidationError::empty("project name or ID (pass --project or set RESIM_PROJECT)")
            })?;
        Ok(resolve_id::<Project>(self.platform(), (), &key).await?)
    }

    /// Observer using the configured polling, cancelled by Ctrl-C.
    pub fn observer(&self) -> Observer<'_> {
        Observer::new(self.platform(), ObserverConfig::from(&self.config.poll))
            .with_shutdown(self.shutdown.clone())
    }

    /// Observer wired to Ctrl-C and, in human mode, a spinner on stderr.
    pub fn watch(&self, message: String, quiet: bool) -> Watch<'_> {
        let spinner = (!quiet && !self.output.json && !self.output.github)
            .then(|| spinner(message))
            .flatten();
        let mut observer = self.observer();
        if let Some(bar) = spinner.clone() {
            observer = observer.on_status(move |kind, id, status| {
                bar.set_message(format!("{kind} {id}: {status}"));
            });
        }
        let shutdown = self.shutdown.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown.send(());
            }
        });
        Watch {
            observer,
            spinner,
            interrupt,
        }
    }

    /// Observe `item` behind a spinner unless `quiet` or in a machine mode.
    pub async fn observe(
        &self,
        item: &dyn WorkItem,
        options: &ObserveOptions,
        quiet: bool,
    ) -> DomainResult<Observation> {
        let watch = self.watch(format!("waiting for {} {}", item.kind(), item.id()), quiet);
        watch.observer.observe(item, options).await
    }
}

fn spinner(message: String) -> Option<ProgressBar> {
    if !console::Term::stderr().is_term() {
        return None;
    }
    let style = ProgressStyle::with_template(SPINNER_TEMPLATE)
        .map_or_else(|_| ProgressStyle::default_spinner(), |s| s.tick_chars(SPINNER_CHARS));
    let bar = ProgressBar::new_spinner().with_style(style);
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(80));
    Some(bar)
}

/// A running wait. Dropping it stops the Ctrl-C listener and clears the
/// spinner.
pub struct Watch<'a> {
    pub observer: Observer<'a>,
    spinner: Option<ProgressBar>,
    interrupt: JoinHandle<()>,
}

impl Drop for Watch<'_> {
    fn drop(&mut self) {
        self.interrupt.abort();
        if let Some(bar) = &self.spinner {
            bar.finish_and_clear();
        }
    }
}
