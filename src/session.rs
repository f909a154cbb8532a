use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{GrantPermissionsParams, PermissionType};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures_util::StreamExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Locator;

/// How often a bounded wait re-checks the page for its element.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Upper bound for a single navigation (load, back, reload).
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum SessionError {
    /// A bounded wait expired; the page is still usable.
    #[error("timed out after {0:?} waiting for {1}")]
    Timeout(Duration, String),

    /// The interaction failed but the session is still alive.
    #[error("page interaction failed: {0}")]
    Interaction(String),

    /// The browser or its connection is gone.
    #[error("rendering session unusable: {0}")]
    Fatal(String),
}

impl SessionError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Fatal(_))
    }
}

impl From<CdpError> for SessionError {
    fn from(err: CdpError) -> Self {
        match err {
            CdpError::Ws(_) | CdpError::NoResponse | CdpError::ChannelSendError(_) => {
                SessionError::Fatal(err.to_string())
            }
            other => SessionError::Interaction(other.to_string()),
        }
    }
}

/// A single browser tab driven one interaction at a time.
///
/// Every method runs to completion (or its bound) before returning; callers
/// must never issue overlapping interactions.
#[async_trait]
pub trait RenderSession: Send {
    async fn load(&mut self, url: &str) -> Result<(), SessionError>;

    /// Full rendered markup of the current document.
    async fn current_markup(&mut self) -> Result<String, SessionError>;

    /// Wait up to `wait` for the element to appear, then click it.
    async fn click(&mut self, target: &Locator, wait: Duration) -> Result<(), SessionError>;

    async fn back(&mut self) -> Result<(), SessionError>;

    async fn refresh(&mut self) -> Result<(), SessionError>;

    /// Empty the system clipboard so the next read only sees fresh text.
    async fn clear_clipboard(&mut self) -> Result<(), SessionError>;

    /// Text currently on the system clipboard, as seen by the page.
    async fn read_clipboard_text(&mut self) -> Result<String, SessionError>;

    async fn quit(&mut self) -> Result<(), SessionError>;
}

/// Browser launch options.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    /// Origin granted clipboard access, e.g. `https://creator.bid`.
    pub clipboard_origin: Option<String>,
}

/// Headless Chrome behind [`RenderSession`].
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeSession {
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        info!("Launching Chrome (headless: {})...", options.headless);

        let mut builder = BrowserConfig::builder().args(vec![
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
        ]);
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("browser config error: {e}"))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chrome")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        // The copy button writes to the clipboard; reading it back needs permission.
        let mut grant = GrantPermissionsParams::builder().permissions(vec![
            PermissionType::ClipboardReadWrite,
            PermissionType::ClipboardSanitizedWrite,
        ]);
        if let Some(origin) = &options.clipboard_origin {
            grant = grant.origin(origin.clone());
        }
        let grant = grant
            .build()
            .map_err(|e| anyhow!("invalid permission request: {e}"))?;
        if let Err(e) = browser.execute(grant).await {
            warn!("Failed to grant clipboard permissions: {e}");
        }

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler.abort();
                return Err(e).context("failed to open a tab");
            }
        };

        info!("Chrome ready");
        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    async fn find(&self, target: &Locator) -> Result<Element, CdpError> {
        match target {
            Locator::Css(css) => self.page.find_element(css.as_str()).await,
            Locator::Xpath(xpath) => self.page.find_xpath(xpath.as_str()).await,
        }
    }

    async fn navigate_with<F>(&self, what: &str, fut: F) -> Result<(), SessionError>
    where
        F: std::future::Future<Output = Result<(), SessionError>>,
    {
        match tokio::time::timeout(NAVIGATION_TIMEOUT, fut).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::Timeout(NAVIGATION_TIMEOUT, what.to_string())),
        }
    }
}

#[async_trait]
impl RenderSession for ChromeSession {
    async fn load(&mut self, url: &str) -> Result<(), SessionError> {
        debug!("Loading {url}");
        let page = &self.page;
        self.navigate_with(url, async move {
            page.goto(url).await?;
            Ok(())
        })
        .await
    }

    async fn current_markup(&mut self) -> Result<String, SessionError> {
        Ok(self.page.content().await?)
    }

    async fn click(&mut self, target: &Locator, wait: Duration) -> Result<(), SessionError> {
        let started = Instant::now();
        loop {
            match self.find(target).await {
                Ok(element) => {
                    element.click().await?;
                    debug!("Clicked {target}");
                    return Ok(());
                }
                Err(e) => {
                    let err = SessionError::from(e);
                    if err.is_fatal() {
                        return Err(err);
                    }
                }
            }
            if started.elapsed() >= wait {
                return Err(SessionError::Timeout(wait, target.to_string()));
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    async fn back(&mut self) -> Result<(), SessionError> {
        let page = &self.page;
        self.navigate_with("history back", async move {
            page.evaluate("window.history.back()").await?;
            Ok(())
        })
        .await
    }

    async fn refresh(&mut self) -> Result<(), SessionError> {
        let page = &self.page;
        self.navigate_with("reload", async move {
            page.reload().await?;
            Ok(())
        })
        .await
    }

    async fn clear_clipboard(&mut self) -> Result<(), SessionError> {
        let params = EvaluateParams::builder()
            .expression("navigator.clipboard.writeText('')")
            .await_promise(true)
            .build()
            .map_err(SessionError::Interaction)?;
        self.page.evaluate_expression(params).await?;
        Ok(())
    }

    async fn read_clipboard_text(&mut self) -> Result<String, SessionError> {
        let params = EvaluateParams::builder()
            .expression("navigator.clipboard.readText()")
            .await_promise(true)
            .build()
            .map_err(SessionError::Interaction)?;
        let result = self.page.evaluate_expression(params).await?;
        let text: Option<String> = result
            .into_value()
            .map_err(|e| SessionError::Interaction(e.to_string()))?;
        Ok(text.unwrap_or_default().trim().to_string())
    }

    async fn quit(&mut self) -> Result<(), SessionError> {
        info!("Closing Chrome");
        let closed = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler.abort();
        closed.map(|_| ()).map_err(SessionError::from)
    }
}
