//! Shared browser process with reference counting.
//!
//! One Chromium process serves every concurrent crawl session and scrape
//! call in the server. The manager launches it lazily on the first
//! `acquire` and shuts it down when the last handle is released. It is an
//! injectable object, not a global: whoever needs browser access receives
//! an `Arc<BrowserManager>`.

use std::sync::Arc;

use chromiumoxide::browser::Browser;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::CrawlError;
use crate::launch::launch_browser;

struct SharedBrowser {
    browser: Arc<Browser>,
    handler_task: JoinHandle<()>,
    refs: usize,
}

/// Reference-counted owner of the single browser process.
pub struct BrowserManager {
    headless: bool,
    state: Mutex<Option<SharedBrowser>>,
}

impl BrowserManager {
    pub fn new(headless: bool) -> Arc<Self> {
        Arc::new(Self {
            headless,
            state: Mutex::new(None),
        })
    }

    /// Acquire a handle to the shared browser, launching it on first use.
    ///
    /// Launch failure propagates to the caller; there is no retry at this
    /// layer.
    pub async fn acquire(self: &Arc<Self>) -> Result<BrowserHandle, CrawlError> {
        let mut state = self.state.lock().await;

        if let Some(shared) = state.as_mut() {
            shared.refs += 1;
            debug!(refs = shared.refs, "Acquired shared browser");
            return Ok(BrowserHandle {
                browser: Some(Arc::clone(&shared.browser)),
                manager: Arc::clone(self),
            });
        }

        let (browser, handler_task) = launch_browser(self.headless)
            .await
            .map_err(|e| CrawlError::Browser(format!("{e:#}")))?;
        let browser = Arc::new(browser);
        *state = Some(SharedBrowser {
            browser: Arc::clone(&browser),
            handler_task,
            refs: 1,
        });
        debug!("Launched shared browser");

        Ok(BrowserHandle {
            browser: Some(browser),
            manager: Arc::clone(self),
        })
    }

    async fn release(self: Arc<Self>) {
        let mut state = self.state.lock().await;
        let Some(shared) = state.as_mut() else {
            return;
        };

        shared.refs -= 1;
        debug!(refs = shared.refs, "Released shared browser");
        if shared.refs > 0 {
            return;
        }

        // Last user gone: shut the process down
        let Some(shared) = state.take() else { return };
        drop(state);

        match Arc::try_unwrap(shared.browser) {
            Ok(mut browser) => {
                if let Err(e) = browser.close().await {
                    warn!(error = %e, "Failed to close browser");
                }
                let _ = browser.wait().await;
                debug!("Browser process shut down");
            }
            Err(_) => {
                warn!("Browser still has outstanding references, skipping graceful close");
            }
        }
        shared.handler_task.abort();
    }
}

/// Guard over the shared browser; releases its reference on drop.
pub struct BrowserHandle {
    browser: Option<Arc<Browser>>,
    manager: Arc<BrowserManager>,
}

impl BrowserHandle {
    pub fn browser(&self) -> &Browser {
        self.browser.as_ref().expect("held until drop")
    }
}

impl Drop for BrowserHandle {
    fn drop(&mut self) {
        drop(self.browser.take());
        let manager = Arc::clone(&self.manager);
        // Browser shutdown is async work; move it off the destructor
        tokio::spawn(async move { manager.release().await });
    }
}
