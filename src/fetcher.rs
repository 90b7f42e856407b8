use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use reqwest::Client;
use std::ffi::OsStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

use crate::config::ScraperConfig;
use crate::models::FetchStrategy;
use crate::utils::error::{AppError, Result};

/// Produces the HTML of a search results page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    fn strategy(&self) -> FetchStrategy;

    async fn fetch(&self, url: &Url) -> Result<String>;
}

/// Direct GET, no script execution.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Static
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Renders the page in a headless Chrome launched for this fetch alone.
#[derive(Clone)]
pub struct BrowserFetcher {
    config: ScraperConfig,
}

impl BrowserFetcher {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Rendered
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        let config = self.config.clone();
        let url = url.to_string();
        let budget = RenderBudget::new(config.request_timeout());
        let _cancel = CancelOnDrop(Arc::clone(&budget.cancelled));
        // headless_chrome is blocking
        tokio::task::spawn_blocking(move || render_page(&config, &url, &budget))
            .await
            .map_err(|e| AppError::Internal(format!("Browser task failed: {}", e)))?
    }
}

/// Time and cancellation shared between an async fetch and its blocking render.
struct RenderBudget {
    deadline: Instant,
    cancelled: Arc<AtomicBool>,
}

impl RenderBudget {
    fn new(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Flags the render as abandoned when the fetch future goes away, e.g. when
/// the per-source timeout fires.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

pub(crate) fn launch_options(config: &ScraperConfig) -> Result<LaunchOptions<'static>> {
    let mut launch_options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(false) // Often needed in containerized environments
        .idle_browser_timeout(config.request_timeout() + Duration::from_secs(5))
        .args(vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-gpu"),
            OsStr::new("--disable-extensions"),
        ])
        .build()
        .map_err(|e| AppError::browser(format!("Failed to create launch options: {}", e)))?;

    if let Some(chrome_path) = &config.chrome_path {
        launch_options.path = Some(std::path::PathBuf::from(chrome_path));
    }

    Ok(launch_options)
}

/// Closes the tab on every exit path. The browser process itself goes away
/// when the owning `Browser` is dropped right after.
struct TabGuard {
    tab: Arc<Tab>,
}

impl Drop for TabGuard {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(true) {
            debug!("Failed to close tab: {}", e);
        }
    }
}

fn render_page(config: &ScraperConfig, url: &str, budget: &RenderBudget) -> Result<String> {
    let browser = Browser::new(launch_options(config)?)
        .map_err(|e| AppError::browser(format!("Failed to launch browser: {}", e)))?;

    let guard = TabGuard {
        tab: browser
            .new_tab()
            .map_err(|e| AppError::browser(format!("Failed to create tab: {}", e)))?,
    };
    let tab = &guard.tab;

    tab.set_default_timeout(budget.remaining());
    tab.set_user_agent(&config.user_agent, None, None)
        .map_err(|e| AppError::browser(format!("Failed to set user agent: {}", e)))?;

    tab.navigate_to(url)
        .map_err(|e| AppError::browser(format!("Navigation failed: {}", e)))?;
    tab.wait_until_navigated()
        .map_err(|e| AppError::browser(format!("Page load failed: {}", e)))?;

    wait_for_network_idle(tab, config, budget)?;

    tab.get_content()
        .map_err(|e| AppError::browser(format!("Failed to get page content: {}", e)))
}

const RESOURCE_PROBE: &str = "document.readyState === 'complete' \
    ? performance.getEntriesByType('resource').length : -1";

/// Share of the time left after navigation that may go to waiting for the
/// network; the rest is for reading the DOM.
const IDLE_SHARE_PERCENT: u32 = 75;

fn idle_deadline(now: Instant, deadline: Instant) -> Instant {
    now + deadline.saturating_duration_since(now) * IDLE_SHARE_PERCENT / 100
}

/// Decides when a page has gone quiet from successive resource counts.
///
/// The page is idle once at most `max_inflight` new resources finished
/// within one `window` after the document loaded. A negative count means the
/// document is still loading.
#[derive(Debug)]
struct IdleTracker {
    window: Duration,
    max_inflight: i64,
    base: Option<(i64, Instant)>,
}

impl IdleTracker {
    fn new(window: Duration, max_inflight: usize) -> Self {
        Self {
            window,
            max_inflight: max_inflight as i64,
            base: None,
        }
    }

    fn observe(&mut self, count: i64, now: Instant) -> bool {
        if count < 0 {
            self.base = None;
            return false;
        }
        match self.base {
            Some((base, _)) if count - base > self.max_inflight => {
                self.base = Some((count, now));
                false
            }
            Some((_, start)) => now.saturating_duration_since(start) >= self.window,
            None => {
                self.base = Some((count, now));
                false
            }
        }
    }
}

/// Polls until the page is idle. Gives up quietly at its share of the budget
/// and lets the caller read whatever is there; stops with an error once the
/// fetch has been abandoned.
fn wait_for_network_idle(tab: &Tab, config: &ScraperConfig, budget: &RenderBudget) -> Result<()> {
    let until = idle_deadline(Instant::now(), budget.deadline);
    let poll = Duration::from_millis(100);
    let mut tracker = IdleTracker::new(config.network_idle(), config.max_inflight_requests);

    while Instant::now() < until {
        if budget.is_cancelled() {
            return Err(AppError::browser("Render abandoned by caller"));
        }

        let count = tab
            .evaluate(RESOURCE_PROBE, false)
            .ok()
            .and_then(|remote| remote.value)
            .and_then(|value| value.as_i64())
            .unwrap_or(-1);
        if tracker.observe(count, Instant::now()) {
            return Ok(());
        }

        std::thread::sleep(poll);
    }

    warn!(url = %tab.get_url(), "Network never settled, reading DOM anyway");
    Ok(())
}
