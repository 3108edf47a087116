//! Stage 1: URL discovery

use crate::crawler::{discover, DiscoveryOptions};
use crate::output::write_discovery;
use crate::stages::{Stage, StageContext, StageError, StageKind, StageOutput};
use crate::SweepError;
use async_trait::async_trait;

/// Crawls the preset's start URL into `1_url_discovery/`
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoveryStage;

#[async_trait]
impl Stage for DiscoveryStage {
    fn kind(&self) -> StageKind {
        StageKind::UrlDiscovery
    }

    async fn run(&self, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let options = DiscoveryOptions::from(&ctx.preset.analysis_options);

        let discovery = discover(&ctx.preset.url, &options)
            .await
            .map_err(|e| match e {
                SweepError::Io(io) => StageError::Io(io),
                other => StageError::Config(other.to_string()),
            })?;

        if discovery.urls.is_empty() {
            return Err(StageError::NoOutput {
                stage: StageKind::UrlDiscovery,
                reason: format!("no pages reachable from {}", ctx.preset.url),
            });
        }

        let dir = ctx.layout.stage_dir(StageKind::UrlDiscovery);
        let simple_path = write_discovery(&dir, &discovery)?;

        let mut output = StageOutput {
            items_ok: discovery.urls.len(),
            ..StageOutput::default()
        };
        output.artifact(ctx.layout.urls_file());
        output.artifact(simple_path);
        for skipped in &discovery.stats.pages_skipped {
            output.item_failed(format!("{} [{}] {}", skipped.url, skipped.state, skipped.reason));
        }
        Ok(output)
    }
}
