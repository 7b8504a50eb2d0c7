use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, anyhow};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::{Page, ScreenshotParams};
use chrono::Utc;
use futures::StreamExt;
use log::{debug, error, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use crate::config::{PortalConfig, PortalCredentials};
use crate::errors::AuthError;
use crate::record::Record;
use crate::table_extract::extract_tables;

const USERNAME_SELECTOR: &str = r#"input[name="username"]"#;
const PASSWORD_SELECTOR: &str = r#"input[name="password"]"#;
const SUBMIT_SELECTOR: &str = r#"button[type="submit"]"#;

// Extra settle after activating the expanded view; the portal re-renders
// the table client-side.
const EXPAND_SETTLE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Navigating,
    Extracting,
    Closed,
}

/// One authenticated browsing session against the portal.
///
/// Owns a headless browser for its whole lifetime and drives a single page
/// through it. One session per extraction run; never shared across
/// concurrent callers.
pub struct PortalSession {
    config: PortalConfig,
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    state: SessionState,
    diagnostics_dir: PathBuf,
}

impl PortalSession {
    /// Launch headless Chromium and open the page this session drives.
    pub async fn launch(config: PortalConfig) -> anyhow::Result<Self> {
        let browser_config = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1920, 1080)
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .build()
            .map_err(|e| anyhow!(e))?;

        info!("starting browser...");
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("failed to launch browser")?;

        // Drain browser events for the life of the session.
        let handler_task = tokio::task::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open page")?;

        let diagnostics_dir = std::env::temp_dir().join("spindle-diagnostics");
        if let Err(e) = std::fs::create_dir_all(&diagnostics_dir) {
            warn!(
                "could not create diagnostics dir {}: {e}",
                diagnostics_dir.display()
            );
        }
        info!("diagnostics directory: {}", diagnostics_dir.display());

        Ok(Self {
            config,
            browser,
            page,
            handler_task,
            state: SessionState::Unauthenticated,
            diagnostics_dir,
        })
    }

    /// Log in to the portal.
    ///
    /// Idempotent: when the portal no longer presents the login surface, the
    /// existing session is accepted as-is and the form is not resubmitted.
    pub async fn login(&mut self, credentials: &PortalCredentials) -> Result<(), AuthError> {
        if credentials.is_blank() {
            return Err(AuthError::new("portal credentials are missing"));
        }

        self.state = SessionState::Authenticating;
        info!("navigating to portal login surface...");
        let login_url = self.config.login_url();
        self.navigate(&login_url)
            .await
            .map_err(|e| AuthError::new(format!("could not reach login page: {e:#}")))?;

        if !self.on_login_page().await {
            info!("already logged in");
            self.state = SessionState::Authenticated;
            return Ok(());
        }

        info!("submitting login form...");
        self.submit_login_form(credentials)
            .await
            .map_err(|e| AuthError::new(format!("could not submit login form: {e:#}")))?;

        if self.on_login_page().await {
            self.state = SessionState::Unauthenticated;
            return Err(AuthError::new(
                "still on login page after submitting credentials",
            ));
        }

        self.state = SessionState::Authenticated;
        info!("login successful");
        Ok(())
    }

    /// Extract every table on the report page for one period.
    ///
    /// Navigation and extraction failures degrade to an empty list with a
    /// diagnostic snapshot, so an empty result is ambiguous between "no
    /// data" and "extraction failed"; callers surface that as a warning
    /// rather than proceeding silently.
    pub async fn scrape_table(
        &mut self,
        period_hint: Option<&str>,
    ) -> Result<Vec<Record>, AuthError> {
        if self.state != SessionState::Authenticated {
            return Err(AuthError::new(
                "scrape_table requires an authenticated session",
            ));
        }

        let url = self.config.report_url(period_hint);
        match period_hint {
            Some(period) => info!("navigating to report page (from {period})..."),
            None => info!("navigating to report page..."),
        }

        self.state = SessionState::Navigating;
        let records = match self.scrape_table_inner(&url).await {
            Ok(records) => records,
            Err(e) => {
                error!("table extraction failed for {url}: {e:#}");
                self.capture_snapshot("extraction-error").await;
                Vec::new()
            }
        };
        self.state = SessionState::Authenticated;
        Ok(records)
    }

    async fn scrape_table_inner(&mut self, url: &str) -> anyhow::Result<Vec<Record>> {
        self.navigate(url).await?;
        sleep(self.config.settle_delay).await;

        if self.try_expand_view().await {
            sleep(EXPAND_SETTLE).await;
        }

        self.state = SessionState::Extracting;
        let html = self.page.content().await?;
        let records = extract_tables(&html);

        if records.is_empty() {
            warn!("no tables found on {url}");
            self.capture_snapshot("no-tables").await;
        } else {
            info!("scraped {} records from {url}", records.len());
        }
        Ok(records)
    }

    /// Probe for the optional expanded-view control. Absence is not a
    /// failure, it just means the page already shows everything it has.
    async fn try_expand_view(&self) -> bool {
        match self
            .page
            .find_element(self.config.expand_control_selector.as_str())
            .await
        {
            Ok(control) => {
                info!("activating expanded view...");
                if let Err(e) = control.click().await {
                    debug!("expanded-view control did not accept the click: {e}");
                    return false;
                }
                true
            }
            Err(_) => {
                debug!("no expanded-view control on this page");
                false
            }
        }
    }

    async fn navigate(&self, url: &str) -> anyhow::Result<()> {
        timeout(self.config.nav_timeout, async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .await
        .with_context(|| format!("navigation to {url} timed out"))??;
        Ok(())
    }

    async fn on_login_page(&self) -> bool {
        match self.page.url().await {
            Ok(Some(url)) => url.to_lowercase().contains("login"),
            // If the location is unknown, assume the worst.
            _ => true,
        }
    }

    async fn submit_login_form(&self, credentials: &PortalCredentials) -> anyhow::Result<()> {
        self.page
            .find_element(USERNAME_SELECTOR)
            .await
            .context("username field not found")?
            .click()
            .await?
            .type_str(&credentials.username)
            .await?;
        self.page
            .find_element(PASSWORD_SELECTOR)
            .await
            .context("password field not found")?
            .click()
            .await?
            .type_str(&credentials.password)
            .await?;
        self.page
            .find_element(SUBMIT_SELECTOR)
            .await
            .context("submit button not found")?
            .click()
            .await?;

        let _ = timeout(self.config.nav_timeout, self.page.wait_for_navigation())
            .await
            .context("post-submit navigation timed out")??;
        sleep(self.config.settle_delay).await;
        Ok(())
    }

    /// Best-effort page screenshot for later inspection.
    async fn capture_snapshot(&self, tag: &str) {
        let params = ScreenshotParams::builder().full_page(true).build();
        match self.page.screenshot(params).await {
            Ok(bytes) => {
                let name = format!("{tag}-{}.png", Utc::now().format("%Y%m%d-%H%M%S"));
                let path = self.diagnostics_dir.join(name);
                match std::fs::write(&path, bytes) {
                    Ok(()) => info!("diagnostic snapshot saved: {}", path.display()),
                    Err(e) => warn!("could not save diagnostic snapshot: {e}"),
                }
            }
            Err(e) => warn!("could not capture diagnostic snapshot: {e}"),
        }
    }

    /// Tear the session down, releasing the browser unconditionally.
    pub async fn close(mut self) {
        self.state = SessionState::Closed;
        if let Err(e) = self.browser.close().await {
            warn!("browser did not close cleanly: {e}");
        }
        self.handler_task.abort();
        info!("browser closed");
    }
}

impl Drop for PortalSession {
    fn drop(&mut self) {
        // Covers panic and early-return paths; a graceful close already
        // aborted this task.
        self.handler_task.abort();
    }
}
