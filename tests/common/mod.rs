#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cardexport::rendering::layout::{layout_card, CardContent, CardTheme, CARD_SIZE};
use cardexport::{
    CaptureProfile, CapturedBitmap, CardElement, CardExporter, CardSurface, Error, ExporterConfig,
    MemorySink, Rasterizer, Result, SoftwareRasterizer,
};

/// Wraps the software rasterizer: records which tiers ran, fails or delays
/// chosen tiers, and remembers the styles seen during capture.
#[derive(Default)]
pub struct Scripted {
    failures: HashMap<String, Error>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<CaptureProfile>>,
    observed_transform: Mutex<Vec<Option<String>>>,
}

impl Scripted {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, tier: &str, err: Error) -> Self {
        self.failures.insert(tier.to_string(), err);
        self
    }

    pub fn delayed(mut self, tier: &str, delay: Duration) -> Self {
        self.delays.insert(tier.to_string(), delay);
        self
    }

    pub fn tiers_called(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|p| p.name.clone()).collect()
    }

    pub fn profiles_called(&self) -> Vec<CaptureProfile> {
        self.calls.lock().unwrap().clone()
    }

    pub fn observed_transforms(&self) -> Vec<Option<String>> {
        self.observed_transform.lock().unwrap().clone()
    }
}

#[async_trait]
impl Rasterizer for Scripted {
    async fn rasterize(
        &self,
        target: &dyn CardSurface,
        profile: &CaptureProfile,
    ) -> Result<CapturedBitmap> {
        self.calls.lock().unwrap().push(profile.clone());
        self.observed_transform
            .lock()
            .unwrap()
            .push(target.inline_style("transform"));
        if let Some(delay) = self.delays.get(&profile.name) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(err) = self.failures.get(&profile.name) {
            return Err(err.clone());
        }
        SoftwareRasterizer::new().rasterize(target, profile).await
    }
}

pub fn fast_config() -> ExporterConfig {
    ExporterConfig {
        settle_delay_ms: 0,
        multi_format_pause_ms: 0,
        ..Default::default()
    }
}

pub fn exporter_with(
    rasterizer: Arc<Scripted>,
    config: ExporterConfig,
) -> (CardExporter, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let exporter = CardExporter::new(config, sink.clone())
        .expect("valid config")
        .with_rasterizer(rasterizer);
    (exporter, sink)
}

/// A laid-out card with hover styles applied, the way the live preview looks.
pub fn hovered_card(width: u32, height: u32) -> CardElement {
    let content = CardContent {
        name: "Jane Doe".into(),
        title: "Principal Engineer".into(),
        company: "Acme".into(),
        email: "jane@acme.test".into(),
        phone: "+1 555 0100".into(),
        ..Default::default()
    };
    let size = cardexport::Size { width, height };
    let commands = layout_card(&content, &CardTheme::default(), None, size);
    CardElement::new(width, height)
        .with_display_list(commands)
        .with_style("transform", "perspective(1000px) rotateY(5deg) scale(1.02)")
        .with_style("transition", "transform 0.3s ease")
        .with_style("cursor", "pointer")
}

pub fn card_size() -> (u32, u32) {
    (CARD_SIZE.width, CARD_SIZE.height)
}
