//! Stage 2: screenshots
//!
//! The stage only depends on the file contract: one PNG per URL under
//! `2_screenshots/desktop/`, named by [`url_slug`](crate::stages::url_slug).

use crate::output::read_url_list;
use crate::stages::{run_tool, Stage, StageContext, StageError, StageKind, StageOutput};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Window height multiplier used for full-page captures
const FULL_PAGE_HEIGHT_FACTOR: u32 = 4;

/// Browser viewport for one capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    /// Capture beyond the first screen
    pub full_page: bool,
}

impl Viewport {
    /// Window size handed to the browser
    pub fn window_size(&self) -> (u32, u32) {
        if self.full_page {
            (self.width, self.height * FULL_PAGE_HEIGHT_FACTOR)
        } else {
            (self.width, self.height)
        }
    }
}

/// Something that can render a URL into a PNG file
#[async_trait]
pub trait ScreenshotCapture: Send + Sync {
    async fn capture(&self, url: &str, output: &Path, viewport: Viewport) -> Result<(), StageError>;
}

/// Headless Chrome driven through its `--screenshot` flag
#[derive(Debug, Clone)]
pub struct ChromeScreenshot {
    binary: String,
    timeout: Duration,
}

impl ChromeScreenshot {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ScreenshotCapture for ChromeScreenshot {
    async fn capture(&self, url: &str, output: &Path, viewport: Viewport) -> Result<(), StageError> {
        let (width, height) = viewport.window_size();

        let mut command = tokio::process::Command::new(&self.binary);
        command
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--hide-scrollbars")
            .arg(format!("--window-size={},{}", width, height))
            .arg(format!("--screenshot={}", output.display()))
            .arg(url);

        run_tool(command, &self.binary, self.timeout).await?;

        if !output.exists() {
            return Err(StageError::Tool {
                tool: self.binary.clone(),
                message: format!("no screenshot written for {}", url),
                output: String::new(),
            });
        }
        Ok(())
    }
}

/// Captures every discovered URL
pub struct CaptureStage {
    capture: Arc<dyn ScreenshotCapture>,
}

impl CaptureStage {
    pub fn new(capture: impl ScreenshotCapture + 'static) -> Self {
        Self {
            capture: Arc::new(capture),
        }
    }
}

#[async_trait]
impl Stage for CaptureStage {
    fn kind(&self) -> StageKind {
        StageKind::Screenshots
    }

    async fn run(&self, ctx: &StageContext) -> Result<StageOutput, StageError> {
        ctx.require_inputs(StageKind::Screenshots)?;

        let urls = read_url_list(&ctx.layout.urls_simple_file())?;
        let dir = ctx.layout.screenshots_dir();
        tokio::fs::create_dir_all(&dir).await?;

        let options = &ctx.preset.analysis_options;
        let viewport = Viewport {
            width: options.viewport_width,
            height: options.viewport_height,
            full_page: !options.fast_mode,
        };

        let mut output = StageOutput::default();
        for (index, url) in urls.iter().enumerate() {
            let path = ctx.layout.screenshot_file(url);
            tracing::info!("Capturing [{}/{}] {}", index + 1, urls.len(), url);

            match self.capture.capture(url, &path, viewport).await {
                Ok(()) => {
                    output.items_ok += 1;
                    output.artifact(path);
                }
                Err(e) => {
                    tracing::warn!("Screenshot failed for {}: {}", url, e);
                    output.item_failed(format!("{}: {}", url, e));
                }
            }
        }

        if output.items_ok == 0 {
            return Err(StageError::NoOutput {
                stage: StageKind::Screenshots,
                reason: format!("all {} captures failed", urls.len()),
            });
        }
        Ok(output)
    }
}
