//! Shared fakes for unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;

use crate::directory::{DirectoryApi, DirectoryError, DirectoryListing, FileEntry, UploadRequest};
use crate::document::{
    is_pdf, DecodedDocument, DecodedHandle, DocumentDecoder, DocumentError, DocumentResult,
    PageLease, PageSize,
};
use crate::fetch::{ContentFetcher, FailureReason, FetchError, FetchedContent, ProbeResult};
use crate::raster::{PageRasterizer, Surface};
use crate::strategy::{EmbedError, EmbedHost};
use crate::viewer::ExternalOpener;

/// In-memory document with 200x100 pages
pub struct FakeDocument {
    pages: usize,
    failing_page: Option<usize>,
}

impl FakeDocument {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            failing_page: None,
        }
    }

    /// Drawing one-based `page` fails
    pub fn failing_page(mut self, page: usize) -> Self {
        self.failing_page = Some(page);
        self
    }
}

impl DecodedDocument for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn page_size(&self, index: usize) -> DocumentResult<PageSize> {
        if index >= self.pages {
            return Err(DocumentError::PageOutOfRange {
                page: index + 1,
                total: self.pages,
            });
        }
        Ok(PageSize::new(200.0, 100.0))
    }

    fn draw_page(&self, index: usize, width: u32, height: u32) -> DocumentResult<Vec<u8>> {
        if self.failing_page == Some(index + 1) {
            return Err(DocumentError::RenderError(format!("page {} is broken", index + 1)));
        }
        Ok(vec![255; width as usize * height as usize * 4])
    }
}

/// Smallest well-formed PDF with one empty page per `(width, height)`
pub fn minimal_pdf(pages: &[(f32, f32)]) -> Vec<u8> {
    let first_page = 3;
    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", first_page + i))
        .collect();

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        ),
    ];
    for (width, height) in pages {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] >>",
            width, height
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, object) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, object).as_bytes());
    }

    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    out
}

/// Serve `router` on an ephemeral local port; returns its origin
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[derive(Clone)]
enum Scripted {
    Content {
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
    Status(u16),
}

/// Fetcher answering from a per-URL script. Unknown URLs are 404.
#[derive(Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, Scripted>>,
    probes: HashMap<String, String>,
    hanging_probe: bool,
    fetch_delay: Option<Duration>,
    fetched: Mutex<Vec<String>>,
    tokens: Mutex<Vec<Option<String>>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe of `url` reports `content_type`
    pub fn with_probe(mut self, url: &str, content_type: &str) -> Self {
        self.probes.insert(url.to_string(), content_type.to_string());
        self
    }

    /// Every probe hangs forever
    pub fn with_hanging_probe(mut self) -> Self {
        self.hanging_probe = true;
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// `url` serves a PDF with `pages` pages
    pub fn with_pdf(self, url: &str, pages: usize) -> Self {
        self.set_pdf(url, pages);
        self
    }

    /// `url` declares a PDF but the bytes do not decode
    pub fn with_corrupt_pdf(self, url: &str) -> Self {
        self.script(
            url,
            Scripted::Content {
                content_type: Some("application/pdf".into()),
                bytes: b"%PDF-1.4\ntruncated".to_vec(),
            },
        );
        self
    }

    /// `url` serves an HTML page, as a login redirect would
    pub fn with_html(self, url: &str) -> Self {
        self.script(
            url,
            Scripted::Content {
                content_type: Some("text/html; charset=utf-8".into()),
                bytes: b"<!doctype html><p>Sign in</p>".to_vec(),
            },
        );
        self
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.script(url, Scripted::Status(status));
        self
    }

    pub fn set_pdf(&self, url: &str, pages: usize) {
        self.script(
            url,
            Scripted::Content {
                content_type: Some("application/pdf".into()),
                bytes: minimal_pdf(&vec![(200.0, 100.0); pages]),
            },
        );
    }

    fn script(&self, url: &str, response: Scripted) {
        self.responses.lock().insert(url.to_string(), response);
    }

    /// URLs passed to `fetch`, in call order
    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }

    /// Tokens passed to `fetch`, in call order
    pub fn tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().clone()
    }
}

#[async_trait]
impl ContentFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, token: Option<&str>) -> Result<FetchedContent, FetchError> {
        self.fetched.lock().push(url.to_string());
        self.tokens.lock().push(token.map(str::to_string));
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.responses.lock().get(url).cloned();
        match scripted {
            Some(Scripted::Content {
                content_type,
                bytes,
            }) => Ok(FetchedContent {
                url: url.to_string(),
                content_type,
                bytes,
            }),
            Some(Scripted::Status(401)) => Err(FetchError::Unauthorized {
                url: url.to_string(),
            }),
            Some(Scripted::Status(status)) => Err(FetchError::CandidateFailed {
                url: url.to_string(),
                reason: FailureReason::Status(status),
            }),
            None => Err(FetchError::CandidateFailed {
                url: url.to_string(),
                reason: FailureReason::Status(404),
            }),
        }
    }

    async fn probe(&self, url: &str, _token: Option<&str>) -> Result<ProbeResult, FetchError> {
        if self.hanging_probe {
            std::future::pending::<()>().await;
        }
        match self.probes.get(url) {
            Some(content_type) => Ok(ProbeResult {
                status: 200,
                content_type: Some(content_type.clone()),
            }),
            None => Err(FetchError::CandidateFailed {
                url: url.to_string(),
                reason: FailureReason::Status(404),
            }),
        }
    }
}

/// Decoder that reads the page count of [`minimal_pdf`] output
#[derive(Default)]
pub struct StubDecoder;

impl StubDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentDecoder for StubDecoder {
    async fn decode(&self, bytes: Vec<u8>, name: &str) -> DocumentResult<DecodedHandle> {
        if !is_pdf(&bytes) {
            return Err(DocumentError::UnsupportedContent(format!("{} is not a PDF", name)));
        }
        let marker = b"/Type /Page /";
        let pages = bytes.windows(marker.len()).filter(|w| w == marker).count();
        if pages == 0 {
            return Err(DocumentError::UnsupportedContent(format!("{} has no page tree", name)));
        }
        Ok(DecodedHandle::new(FakeDocument::new(pages)))
    }
}

/// Rasterizer with per-scale delays that counts its calls
pub struct FakeRasterizer {
    delays: Vec<(f32, Duration)>,
    failing: bool,
    calls: AtomicUsize,
}

impl FakeRasterizer {
    pub fn new() -> Self {
        Self {
            delays: Vec::new(),
            failing: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Renders at `scale` take `delay`; everything else takes 10 ms
    pub fn with_scale_delay(mut self, scale: f32, delay: Duration) -> Self {
        self.delays.push((scale, delay));
        self
    }

    /// Every render fails
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageRasterizer for FakeRasterizer {
    async fn render(
        &self,
        lease: &PageLease,
        page: usize,
        scale: f32,
        generation: u64,
    ) -> DocumentResult<Surface> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self
            .delays
            .iter()
            .find(|(s, _)| (s - scale).abs() < 1e-3)
            .map(|(_, d)| *d)
            .unwrap_or(Duration::from_millis(10));
        tokio::time::sleep(delay).await;

        if self.failing {
            return Err(DocumentError::RenderError("rasterizer unavailable".into()));
        }
        let document = lease.acquire()?;
        let (width, height) = document.page_size(page - 1)?.scaled(scale);
        Ok(Surface {
            page,
            scale,
            generation,
            width,
            height,
            pixels: Arc::new(document.draw_page(page - 1, width, height)?),
        })
    }
}

/// Embed host that either loads at once or never signals
pub struct FakeEmbedHost {
    loads: bool,
}

impl FakeEmbedHost {
    pub fn never() -> Self {
        Self { loads: false }
    }

    pub fn loading() -> Self {
        Self { loads: true }
    }
}

#[async_trait]
impl EmbedHost for FakeEmbedHost {
    async fn load_native(&self, _url: &str) -> Result<(), EmbedError> {
        if !self.loads {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

/// Opener that records its targets
#[derive(Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

impl ExternalOpener for RecordingOpener {
    fn open(&self, target: &str) -> std::io::Result<()> {
        self.opened.lock().push(target.to_string());
        Ok(())
    }
}

/// Directory API serving a one-file listing for every slug except `missing`
#[derive(Default)]
pub struct FakeDirectoryApi {
    delay: Option<Duration>,
    listing_calls: AtomicUsize,
}

impl FakeDirectoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }
}

pub fn sample_entry(id: &str, name: &str) -> FileEntry {
    FileEntry {
        id: id.to_string(),
        name: name.to_string(),
        content_ref: format!("/media/project_files/2024/03/15/{}", name),
        uploaded_at: None,
        description: None,
    }
}

#[async_trait]
impl DirectoryApi for FakeDirectoryApi {
    async fn get_listing(&self, slug: &str) -> Result<DirectoryListing, DirectoryError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if slug == "missing" {
            return Err(DirectoryError::NotFound(slug.to_string()));
        }
        Ok(DirectoryListing {
            name: slug.to_string(),
            description: None,
            page_title: None,
            parent_ref: None,
            subfolders: Vec::new(),
            files: vec![sample_entry("1", "plan.pdf")],
        })
    }

    async fn upload_file(
        &self,
        _slug: &str,
        upload: UploadRequest,
    ) -> Result<FileEntry, DirectoryError> {
        Ok(sample_entry("2", &upload.file_name))
    }

    async fn delete_file(&self, _id: &str) -> Result<(), DirectoryError> {
        Ok(())
    }
}
