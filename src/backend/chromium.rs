//! Chrome DevTools Protocol backend (chromiumoxide).
//!
//! Scripted sessions launch their own browser process and tear it down on
//! close. Attached sessions open one tab in the user's browser and close
//! only that tab.

use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    Headers, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::stealth::{self, ACCEPT_LANGUAGE, USER_AGENT, VIEWPORT_HEIGHT, VIEWPORT_WIDTH};
use super::{BackendKind, PageProbe, PageSession, SessionFactory};
use crate::error::{Error, Result};
use crate::options::ScrapeOptions;

/// Opens [`ChromiumSession`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumFactory;

impl SessionFactory for ChromiumFactory {
    type Session = ChromiumSession;

    async fn open(&self, kind: BackendKind, options: &ScrapeOptions) -> Result<ChromiumSession> {
        match kind {
            BackendKind::Scripted { headless } => launch(headless, options).await,
            BackendKind::Attached => {
                let endpoint = options.debug_endpoint.as_deref().ok_or_else(|| {
                    Error::UnsupportedEscalation("no debug endpoint configured".to_string())
                })?;
                attach(endpoint).await
            }
        }
    }
}

/// One page plus the browser connection that owns it.
pub struct ChromiumSession {
    kind: BackendKind,
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl std::fmt::Debug for ChromiumSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumSession").field("kind", &self.kind).finish_non_exhaustive()
    }
}

async fn launch(headless: bool, options: &ScrapeOptions) -> Result<ChromiumSession> {
    let mut args: Vec<String> = stealth::LAUNCH_ARGS.iter().map(|a| (*a).to_string()).collect();
    args.push(format!("--user-agent={USER_AGENT}"));

    let mut builder = BrowserConfig::builder()
        .viewport(Some(Viewport {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
            device_scale_factor: Some(1.0),
            ..Default::default()
        }))
        .args(args);
    if !headless {
        builder = builder.with_head();
    }
    if let Some(exe) = &options.chrome_executable {
        builder = builder.chrome_executable(exe);
    }
    if let Some(dir) = &options.user_data_dir {
        builder = builder.user_data_dir(dir);
    }
    let config = builder.build().map_err(Error::BackendLaunchFailure)?;

    debug!(headless, "launching browser");
    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| Error::BackendLaunchFailure(e.to_string()))?;
    let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

    let kind = BackendKind::Scripted { headless };
    open_page(kind, browser, handler, true).await
}

async fn attach(endpoint: &str) -> Result<ChromiumSession> {
    debug!(endpoint, "attaching to running browser");
    let (browser, mut handler) = Browser::connect(endpoint)
        .await
        .map_err(|e| Error::BackendLaunchFailure(format!("cannot attach to {endpoint}: {e}")))?;
    let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

    // The user's own browser keeps its real fingerprint.
    open_page(BackendKind::Attached, browser, handler, false).await
}

async fn open_page(
    kind: BackendKind,
    mut browser: Browser,
    handler: JoinHandle<()>,
    stealth: bool,
) -> Result<ChromiumSession> {
    let page = match prepare_page(&browser, stealth).await {
        Ok(page) => page,
        Err(e) => {
            if matches!(kind, BackendKind::Scripted { .. }) {
                let _ = browser.close().await;
                let _ = browser.wait().await;
            }
            handler.abort();
            return Err(e);
        }
    };
    Ok(ChromiumSession {
        kind,
        browser,
        page,
        handler,
    })
}

async fn prepare_page(browser: &Browser, stealth: bool) -> Result<Page> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| Error::BackendLaunchFailure(format!("cannot open tab: {e}")))?;
    if !stealth {
        return Ok(page);
    }

    // Must run before the first navigation.
    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(stealth::STEALTH_SCRIPT))
        .await
        .map_err(|e| Error::BackendLaunchFailure(format!("stealth script rejected: {e}")))?;

    let mut user_agent = SetUserAgentOverrideParams::new(USER_AGENT);
    user_agent.accept_language = Some(ACCEPT_LANGUAGE.to_string());
    page.execute(user_agent)
        .await
        .map_err(|e| Error::BackendLaunchFailure(format!("user agent override rejected: {e}")))?;

    page.execute(SetExtraHttpHeadersParams::new(Headers::new(stealth::extra_headers())))
        .await
        .map_err(|e| Error::BackendLaunchFailure(format!("header override rejected: {e}")))?;

    Ok(page)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProbe {
    title: String,
    body_text: String,
}

impl ChromiumSession {
    async fn eval<T: serde::de::DeserializeOwned>(&self, script: impl Into<String>) -> Result<T> {
        let script: String = script.into();
        self.page
            .evaluate(script)
            .await
            .map_err(|e| Error::Browser(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| Error::Browser(format!("unexpected script result: {e}")))
    }
}

impl PageSession for ChromiumSession {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(Error::Navigation(e.to_string())),
            Err(_) => Err(Error::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    async fn probe(&self) -> Result<PageProbe> {
        let raw: RawProbe = self.eval(stealth::PROBE_SCRIPT).await?;
        Ok(PageProbe::from_text(raw.title, &raw.body_text))
    }

    async fn count_matches(&self, selector: &str) -> Result<usize> {
        self.eval(stealth::count_script(selector)).await
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.eval::<bool>(stealth::SCROLL_SCRIPT).await.map(|_| ())
    }

    async fn snapshot(&self) -> Result<String> {
        match self.eval::<String>(stealth::SNAPSHOT_SCRIPT).await {
            Ok(html) if !html.is_empty() => Ok(html),
            Ok(_) | Err(_) => {
                warn!("shadow-aware snapshot failed, falling back to page content");
                self.page.content().await.map_err(|e| Error::Browser(e.to_string()))
            }
        }
    }

    async fn close(self) -> Result<()> {
        let Self {
            kind,
            mut browser,
            page,
            handler,
        } = self;

        let page_result = page.close().await;
        if matches!(kind, BackendKind::Scripted { .. }) {
            if let Err(e) = browser.close().await {
                warn!(%kind, error = %e, "browser close failed");
            }
            if let Err(e) = browser.wait().await {
                warn!(%kind, error = %e, "browser process did not exit cleanly");
            }
        }
        handler.abort();

        page_result.map_err(|e| Error::Browser(format!("tab close failed: {e}")))
    }
}
