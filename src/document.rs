//! Document composition: a single print-sized PDF page holding the card image
//!
//! The document backend is loaded lazily on the first PDF export through a
//! [`DocumentLoader`]. A failed load is reported as
//! [`Error::DocumentLibraryLoad`] and retried on the next export.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, TextStr};
use tokio::sync::OnceCell;

use crate::download::{Download, DownloadSink};
use crate::rendering::paint::Color;
use crate::rendering::CapturedBitmap;
use crate::{Error, Result};

pub const PDF_MIME: &str = "application/pdf";
pub const POINTS_PER_INCH: f32 = 72.0;

/// Business card trim size in inches
pub const CARD_WIDTH_IN: f32 = 3.5;
pub const CARD_HEIGHT_IN: f32 = 2.0;

const IMAGE_NAME: &[u8] = b"Im1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
}

/// Physical page format. Orientation decides which side is the long one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSetup {
    pub width_in: f32,
    pub height_in: f32,
    pub orientation: Orientation,
}

impl PageSetup {
    pub fn business_card() -> Self {
        Self {
            width_in: CARD_WIDTH_IN,
            height_in: CARD_HEIGHT_IN,
            orientation: Orientation::Landscape,
        }
    }

    /// Page size in inches after applying the orientation
    pub fn size_inches(&self) -> (f32, f32) {
        let long = self.width_in.max(self.height_in);
        let short = self.width_in.min(self.height_in);
        match self.orientation {
            Orientation::Landscape => (long, short),
            Orientation::Portrait => (short, long),
        }
    }

    pub fn size_points(&self) -> (f32, f32) {
        let (w, h) = self.size_inches();
        (w * POINTS_PER_INCH, h * POINTS_PER_INCH)
    }

    /// Placement covering the whole page
    pub fn full_bleed(&self) -> Placement {
        let (width, height) = self.size_inches();
        Placement {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }
}

/// Image rectangle in inches, origin at the top-left corner of the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Opaque 8-bit RGB pixels ready for embedding
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl EmbeddedImage {
    /// Flatten onto white; documents never rely on transparency.
    pub fn from_bitmap(bitmap: &CapturedBitmap) -> Result<Self> {
        if bitmap.is_tainted() {
            return Err(Error::Encode(
                "bitmap is tainted by cross-origin content and cannot be exported".into(),
            ));
        }
        let rgb = bitmap.flatten(Color::WHITE);
        Ok(Self {
            width: rgb.width(),
            height: rgb.height(),
            rgb: rgb.into_raw(),
        })
    }
}

/// A loaded document library
pub trait DocumentBackend: Send + Sync {
    fn name(&self) -> &str;

    fn create(&self, page: PageSetup) -> Result<Box<dyn CardDocument>>;
}

/// A single-page document under construction
pub trait CardDocument: Send {
    fn add_image(&mut self, image: EmbeddedImage, at: Placement) -> Result<()>;

    fn save(self: Box<Self>) -> Result<Vec<u8>>;
}

/// Deferred one-time initialization of the document backend
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn DocumentBackend>>;
}

/// Loads the built-in [`PdfBackend`]
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinDocumentLoader;

#[async_trait]
impl DocumentLoader for BuiltinDocumentLoader {
    async fn load(&self) -> Result<Arc<dyn DocumentBackend>> {
        Ok(Arc::new(PdfBackend))
    }
}

/// PDF output through `pdf-writer`
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfBackend;

impl DocumentBackend for PdfBackend {
    fn name(&self) -> &str {
        "pdf-writer"
    }

    fn create(&self, page: PageSetup) -> Result<Box<dyn CardDocument>> {
        let (w, h) = page.size_inches();
        if !(w > 0.0 && h > 0.0) {
            return Err(Error::DocumentAssemble(format!("invalid page size {}x{}in", w, h)));
        }
        Ok(Box::new(PdfDocument { page, image: None }))
    }
}

struct PdfDocument {
    page: PageSetup,
    image: Option<(EmbeddedImage, Placement)>,
}

impl CardDocument for PdfDocument {
    fn add_image(&mut self, image: EmbeddedImage, at: Placement) -> Result<()> {
        if image.width == 0 || image.height == 0 {
            return Err(Error::DocumentAssemble("image has no pixels".into()));
        }
        let expected = image.width as usize * image.height as usize * 3;
        if image.rgb.len() != expected {
            return Err(Error::DocumentAssemble(format!(
                "expected {} bytes of RGB data, got {}",
                expected,
                image.rgb.len()
            )));
        }
        let (pw, ph) = self.page.size_inches();
        let eps = 1e-4;
        if at.x < -eps || at.y < -eps || at.x + at.width > pw + eps || at.y + at.height > ph + eps
        {
            return Err(Error::DocumentAssemble(format!(
                "placement {:?} exceeds page {}x{}in",
                at, pw, ph
            )));
        }
        if self.image.is_some() {
            return Err(Error::DocumentAssemble("page already holds an image".into()));
        }
        self.image = Some((image, at));
        Ok(())
    }

    fn save(self: Box<Self>) -> Result<Vec<u8>> {
        let (image, at) = self
            .image
            .ok_or_else(|| Error::DocumentSave("document has no content".into()))?;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&image.rgb)
            .map_err(|e| Error::DocumentSave(e.to_string()))?;
        let data = encoder
            .finish()
            .map_err(|e| Error::DocumentSave(e.to_string()))?;

        let catalog_id = Ref::new(1);
        let tree_id = Ref::new(2);
        let page_id = Ref::new(3);
        let image_id = Ref::new(4);
        let content_id = Ref::new(5);
        let info_id = Ref::new(6);

        let (pw, ph) = self.page.size_points();
        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(tree_id);
        pdf.pages(tree_id).kids([page_id]).count(1);

        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, pw, ph));
        page.parent(tree_id);
        page.contents(content_id);
        page.resources().x_objects().pair(Name(IMAGE_NAME), image_id);
        page.finish();

        let mut xobject = pdf.image_xobject(image_id, &data);
        xobject.filter(Filter::FlateDecode);
        xobject.width(image.width as i32);
        xobject.height(image.height as i32);
        xobject.color_space().device_rgb();
        xobject.bits_per_component(8);
        xobject.finish();

        // Image space is the unit square and PDF y grows upwards
        let w = at.width * POINTS_PER_INCH;
        let h = at.height * POINTS_PER_INCH;
        let x = at.x * POINTS_PER_INCH;
        let y = ph - at.y * POINTS_PER_INCH - h;
        let mut content = Content::new();
        content.save_state();
        content.transform([w, 0.0, 0.0, h, x, y]);
        content.x_object(Name(IMAGE_NAME));
        content.restore_state();
        pdf.stream(content_id, &content.finish());

        pdf.document_info(info_id)
            .title(TextStr("Business card"))
            .producer(TextStr("cardexport"));

        Ok(pdf.finish())
    }
}

/// Message of a nested error without its kind prefix
fn cause(err: Error) -> String {
    match err {
        Error::DocumentLibraryLoad(m)
        | Error::DocumentAssemble(m)
        | Error::DocumentSave(m)
        | Error::Download(m) => m,
        other => other.to_string(),
    }
}

/// Embeds captured bitmaps into business-card sized PDF pages.
pub struct DocumentComposer {
    loader: Arc<dyn DocumentLoader>,
    backend: OnceCell<Arc<dyn DocumentBackend>>,
    page: PageSetup,
}

impl DocumentComposer {
    pub fn new(loader: Arc<dyn DocumentLoader>) -> Self {
        Self {
            loader,
            backend: OnceCell::new(),
            page: PageSetup::business_card(),
        }
    }

    pub fn page(&self) -> PageSetup {
        self.page
    }

    pub fn is_loaded(&self) -> bool {
        self.backend.initialized()
    }

    /// The document backend, loading it on first use.
    pub async fn backend(&self) -> Result<Arc<dyn DocumentBackend>> {
        let backend = self
            .backend
            .get_or_try_init(|| async {
                log::debug!("Loading document library");
                let backend = self
                    .loader
                    .load()
                    .await
                    .map_err(|e| Error::DocumentLibraryLoad(cause(e)))?;
                log::debug!("Document library '{}' loaded", backend.name());
                Ok::<_, Error>(backend)
            })
            .await?;
        Ok(Arc::clone(backend))
    }

    /// Build the document and deliver it. Returns the number of bytes written.
    pub async fn export(
        &self,
        bitmap: CapturedBitmap,
        filename: &str,
        sink: &dyn DownloadSink,
    ) -> Result<usize> {
        let backend = self.backend().await?;

        let mut doc = backend
            .create(self.page)
            .map_err(|e| Error::DocumentAssemble(cause(e)))?;

        let image = EmbeddedImage::from_bitmap(&bitmap)?;
        drop(bitmap);

        let (pw, ph) = self.page.size_inches();
        let page_ratio = pw / ph;
        let image_ratio = image.width as f32 / image.height as f32;
        if (image_ratio - page_ratio).abs() / page_ratio > 0.05 {
            log::warn!(
                "Card aspect ratio {:.3} differs from page ratio {:.3}; image will be stretched",
                image_ratio,
                page_ratio
            );
        }

        doc.add_image(image, self.page.full_bleed())
            .map_err(|e| Error::DocumentAssemble(cause(e)))?;
        log::debug!("Image added to PDF");

        let bytes = doc.save().map_err(|e| Error::DocumentSave(cause(e)))?;
        let len = bytes.len();
        sink.deliver(Download {
            filename: filename.to_string(),
            mime_type: PDF_MIME,
            bytes,
        })
        .map_err(|e| Error::DocumentSave(cause(e)))?;
        log::debug!("PDF saved as {}", filename);
        Ok(len)
    }
}
