//! [`PageSession`] backed by a headless Chrome/Chromium over CDP.
//!
//! All DOM interaction goes through `Page::evaluate` with selectors embedded as
//! JSON string literals, so arbitrary selector text cannot break the script.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::Page;
use futures_util::StreamExt;
use rand::seq::SliceRandom;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{PageSession, RevealQuery, SessionError};
use crate::config::{Config, ProxySpec};
use crate::constants::USER_AGENT_POOL;

/// Default viewport width in pixels.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;

/// Default viewport height in pixels.
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 900;

/// How often `wait_for` re-checks the DOM.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Browser launch settings.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub chrome_path: Option<String>,
    pub headless: bool,
    pub proxy: Option<ProxySpec>,
    pub user_agent: String,
    pub page_timeout: Duration,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl SessionOptions {
    /// Build launch settings from configuration, picking a user agent from the
    /// built-in pool when none is configured.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            chrome_path: config.chrome_path.clone(),
            headless: config.headless,
            proxy: config.proxy.clone(),
            user_agent: config.user_agent.clone().unwrap_or_else(pick_user_agent),
            page_timeout: config.page_timeout,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
        }
    }
}

fn pick_user_agent() -> String {
    USER_AGENT_POOL
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENT_POOL[0])
        .to_string()
}

/// One browser with one tab, driven sequentially.
pub struct ChromiumSession {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    page_timeout: Duration,
}

impl ChromiumSession {
    /// Launch the browser and open a blank tab with the configured user agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the browser cannot be started or the tab cannot be created.
    pub async fn launch(options: &SessionOptions) -> Result<Self, SessionError> {
        info!(headless = options.headless, "Launching browser session");

        let mut builder = BrowserConfig::builder()
            .window_size(options.viewport_width, options.viewport_height)
            .request_timeout(options.page_timeout)
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-extensions")
            .arg("--lang=en-US,en");

        if !options.headless {
            builder = builder.with_head();
        }

        if let Some(ref chrome_path) = options.chrome_path {
            builder = builder.chrome_executable(chrome_path);
        }

        if let Some(ref proxy) = options.proxy {
            if proxy.has_credentials() {
                warn!(
                    proxy = %proxy.server_arg(),
                    "Proxy credentials are not passed to Chromium; the proxy must allow this host"
                );
            }
            builder = builder.arg(format!("--proxy-server={}", proxy.server_arg()));
        }

        let browser_config = builder.build().map_err(SessionError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {e}");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::Launch(format!("failed to open tab: {e}")))?;

        page.execute(SetUserAgentOverrideParams::new(options.user_agent.clone()))
            .await
            .map_err(|e| SessionError::Launch(format!("failed to set user agent: {e}")))?;

        info!("Browser session ready");

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            page_timeout: options.page_timeout,
        })
    }

    /// Evaluate a script and decode its result.
    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, SessionError> {
        let value = self.evaluate(&script).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Close the browser and stop its event handler.
    pub async fn shutdown(self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            error!("Failed to close browser: {e}");
        } else {
            info!("Browser shutdown complete");
        }
        self.handler.abort();
    }
}

/// Quote a string as a JavaScript literal.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Attribute set on elements `click_visible` has activated.
const ACTIVATED_ATTR: &str = "data-harvester-activated";

fn click_script(query: &RevealQuery) -> String {
    let needle = query
        .text
        .as_deref()
        .map_or_else(|| "null".to_string(), js_string);
    format!(
        r"(() => {{
            const needle = {needle};
            let clicked = 0;
            for (const el of document.querySelectorAll({selector})) {{
                const rect = el.getBoundingClientRect();
                const style = window.getComputedStyle(el);
                if (rect.width === 0 || rect.height === 0) continue;
                if (style.visibility === 'hidden' || style.display === 'none') continue;
                if (el.hasAttribute({mark})) continue;
                if (needle !== null && !(el.innerText || '').trim().toLowerCase().startsWith(needle)) continue;
                try {{ el.click(); el.setAttribute({mark}, '1'); clicked += 1; }} catch (e) {{}}
            }}
            return clicked;
        }})()",
        selector = js_string(&query.selector),
        mark = js_string(ACTIVATED_ATTR),
    )
}

fn reset_activations_script() -> String {
    format!(
        "document.querySelectorAll('[{ACTIVATED_ATTR}]').forEach((el) => el.removeAttribute('{ACTIVATED_ATTR}')); true"
    )
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        debug!(url = %url, "Navigating");
        let navigation = async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(self.page_timeout, navigation).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SessionError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(SessionError::NavigationTimeout {
                url: url.to_string(),
            }),
        }
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| SessionError::Script(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool, SessionError> {
        let script = format!(
            "document.querySelector({}) !== null",
            js_string(selector)
        );
        let deadline = Instant::now() + timeout;
        loop {
            if self.eval::<bool>(script.clone()).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    async fn count(&self, selector: &str) -> Result<usize, SessionError> {
        self.eval(format!(
            "document.querySelectorAll({}).length",
            js_string(selector)
        ))
        .await
    }

    async fn visible_texts(&self, selector: &str) -> Result<Vec<String>, SessionError> {
        self.eval(format!(
            r"Array.from(document.querySelectorAll({}))
                .filter((el) => el.offsetParent !== null)
                .map((el) => (el.innerText || '').trim())",
            js_string(selector)
        ))
        .await
    }

    async fn click_visible(&self, query: &RevealQuery) -> Result<usize, SessionError> {
        self.eval(click_script(query)).await
    }

    async fn reset_activations(&self) -> Result<(), SessionError> {
        self.eval::<bool>(reset_activations_script()).await.map(|_| ())
    }

    async fn scroll_by(&self, dy: i64) -> Result<(), SessionError> {
        self.eval::<bool>(format!("window.scrollBy(0, {dy}); true"))
            .await
            .map(|_| ())
    }

    async fn scroll_height(&self) -> Result<u64, SessionError> {
        self.eval(
            "Math.max(document.body ? document.body.scrollHeight : 0, document.documentElement.scrollHeight)"
                .to_string(),
        )
        .await
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, SessionError> {
        let result = self
            .page
            .evaluate(script.to_string())
            .await
            .map_err(|e| SessionError::Script(e.to_string()))?;
        Ok(result.into_value()?)
    }

    async fn snapshot(&self) -> Result<String, SessionError> {
        self.page
            .content()
            .await
            .map_err(|e| SessionError::Script(e.to_string()))
    }
}
