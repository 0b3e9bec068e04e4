//! Document chain: page geometry, tiering, library loading

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use cardexport::document::{DocumentBackend, DocumentLoader, PDF_MIME};
use cardexport::{Background, Color, Error, ExportFormat};
use common::{exporter_with, fast_config, hovered_card, Scripted};
use lopdf::{Document, Object};
use sha2::{Digest, Sha256};

fn number(o: &Object) -> f64 {
    match o {
        Object::Integer(i) => *i as f64,
        Object::Real(r) => *r as f64,
        other => panic!("not a number: {:?}", other),
    }
}

fn media_box(bytes: &[u8]) -> Vec<f64> {
    let doc = Document::load_mem(bytes).expect("valid pdf");
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 1, "expected a single page");
    let page_id = *pages.values().next().unwrap();
    let page = doc.get_dictionary(page_id).unwrap();
    page.get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(number)
        .collect()
}

fn image_width(bytes: &[u8]) -> i64 {
    let doc = Document::load_mem(bytes).expect("valid pdf");
    let images: Vec<i64> = doc
        .objects
        .values()
        .filter_map(|o| o.as_stream().ok())
        .filter(|s| {
            s.dict
                .get(b"Subtype")
                .and_then(|n| n.as_name())
                .map(|n| n == b"Image")
                .unwrap_or(false)
        })
        .map(|s| s.dict.get(b"Width").unwrap().as_i64().unwrap())
        .collect();
    assert_eq!(images.len(), 1, "expected exactly one embedded image");
    images[0]
}

#[tokio::test]
async fn page_is_3_5_by_2_inches_for_any_source_size() {
    for (w, h) in [(400, 220), (350, 200), (1000, 1000), (37, 900)] {
        let (ex, sink) = exporter_with(Arc::new(Scripted::new()), fast_config());
        let card = hovered_card(w, h);

        let res = ex.export_pdf(&card, "business-card.pdf").await.unwrap();
        assert_eq!(res.format, ExportFormat::Pdf);
        assert_eq!(res.method.as_deref(), Some("simple"));

        let downloads = sink.downloads();
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].mime_type, PDF_MIME);
        assert_eq!(media_box(&downloads[0].bytes), vec![0.0, 0.0, 252.0, 144.0]);
        // simple tier captures at 2x
        assert_eq!(image_width(&downloads[0].bytes), 2 * w as i64);
    }
}

#[tokio::test]
async fn pdf_falls_back_to_advanced_with_opaque_background() {
    let scripted = Arc::new(
        Scripted::new().failing("simple", Error::CaptureTimeout(15000)),
    );
    let (ex, sink) = exporter_with(scripted.clone(), fast_config());
    let card = hovered_card(350, 200);
    let before = card.inline_styles();

    let res = ex.export_pdf(&card, "card.pdf").await.unwrap();

    assert_eq!(res.method.as_deref(), Some("advanced"));
    let profiles = scripted.profiles_called();
    assert_eq!(profiles.len(), 2);
    assert!(profiles
        .iter()
        .all(|p| p.background == Background::Color(Color::WHITE)));
    assert_eq!(image_width(&sink.downloads()[0].bytes), 1050);
    assert_eq!(card.inline_styles(), before);
}

#[tokio::test]
async fn pdf_chain_has_two_tiers() {
    let scripted = Arc::new(
        Scripted::new()
            .failing("simple", Error::Capture("first".into()))
            .failing("advanced", Error::Capture("second".into())),
    );
    let (ex, sink) = exporter_with(scripted.clone(), fast_config());
    let card = hovered_card(350, 200);

    let err = ex.export_pdf(&card, "card.pdf").await.unwrap_err();
    assert_eq!(
        err,
        Error::AllExportMethodsFailed("Capture failed: second".into())
    );
    assert_eq!(scripted.tiers_called(), ["simple", "advanced"]);
    assert!(sink.is_empty());
}

struct BrokenLoader;

#[async_trait]
impl DocumentLoader for BrokenLoader {
    async fn load(&self) -> cardexport::Result<Arc<dyn DocumentBackend>> {
        Err(Error::Other("chunk load failed".into()))
    }
}

#[tokio::test]
async fn library_load_failure_is_distinct_and_skips_capture() {
    let scripted = Arc::new(Scripted::new());
    let (ex, sink) = exporter_with(scripted.clone(), fast_config());
    let ex = ex.with_document_loader(Arc::new(BrokenLoader));
    let card = hovered_card(350, 200);

    let err = ex.export_pdf(&card, "card.pdf").await.unwrap_err();
    assert_eq!(
        err,
        Error::AllExportMethodsFailed("Failed to load PDF library: chunk load failed".into())
    );
    assert!(scripted.tiers_called().is_empty());
    assert_eq!(card.mutation_count(), 0);
    assert!(sink.is_empty());

    // raster export does not need the library
    assert!(ex.export_png(&card, "card.png").await.is_ok());
}

#[tokio::test]
async fn exports_are_deterministic() {
    let digest = |bytes: &[u8]| hex::encode(Sha256::digest(bytes));
    let mut digests = Vec::new();
    for _ in 0..2 {
        let (ex, sink) = exporter_with(Arc::new(Scripted::new()), fast_config());
        let card = hovered_card(350, 200);
        ex.export_png(&card, "card.png").await.unwrap();
        ex.export_pdf(&card, "card.pdf").await.unwrap();
        let downloads = sink.downloads();
        digests.push((digest(&downloads[0].bytes), digest(&downloads[1].bytes)));
    }
    assert_eq!(digests[0], digests[1]);
}

#[tokio::test]
async fn multi_format_report_settles_each_half() {
    let scripted = Arc::new(Scripted::new());
    let (ex, sink) = exporter_with(scripted, fast_config());
    let ex = ex.with_document_loader(Arc::new(BrokenLoader));
    let card = hovered_card(350, 200);

    let report = ex.export_multiple_formats(&card, "jane-doe").await;

    assert!(report.png.success);
    assert_eq!(report.png.filename, "jane-doe.png");
    assert!(!report.pdf.success);
    assert!(report.pdf.error.as_deref().unwrap().contains("chunk load failed"));
    assert_eq!(sink.len(), 1);
}
