// ============================================================================
// IMAGE INGESTION — file picker → data URI → decoded payload, off the UI thread
// ============================================================================
//
// One upload = one PendingUpload. The picker and the read run on a worker
// thread; the result comes back over a channel and is drained by the
// controller once per frame, so surfaces are only ever mutated on the UI
// thread.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::mpsc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat};
use uuid::Uuid;

use crate::controls::UploadTarget;
use crate::error::IngestError;
use crate::{log_info, log_warn};

/// Declared type for files whose extension is not a known image format.
pub const FALLBACK_MIME: &str = "application/octet-stream";

// ============================================================================
// PICKED FILE
// ============================================================================

/// Where a picked file's bytes live until they are read.
#[derive(Clone, Debug)]
pub enum FileSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// A user-selected file: a name, a declared MIME type and its contents.
#[derive(Clone, Debug)]
pub struct PickedFile {
    pub name: String,
    pub mime: String,
    pub source: FileSource,
}

impl PickedFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            mime: mime_for_name(&name),
            name,
            source: FileSource::Path(path),
        }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        Self {
            mime: mime_for_name(&name),
            name,
            source: FileSource::Bytes(bytes),
        }
    }

    /// The part after `/` in the declared type, e.g. `png`.
    pub fn subtype(&self) -> &str {
        self.mime.split('/').nth(1).unwrap_or("")
    }

    pub fn read(&self) -> Result<Vec<u8>, IngestError> {
        match &self.source {
            FileSource::Bytes(bytes) => Ok(bytes.clone()),
            FileSource::Path(path) => std::fs::read(path).map_err(|source| IngestError::Read {
                name: self.name.clone(),
                source,
            }),
        }
    }
}

/// MIME type declared by a file name's extension.
pub fn mime_for_name(name: &str) -> String {
    ImageFormat::from_path(Path::new(name))
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|_| FALLBACK_MIME.to_string())
}

// ============================================================================
// PICKERS
// ============================================================================

pub type PickFuture = Pin<Box<dyn Future<Output = Option<PickedFile>>>>;

/// Something that lets the user choose one file. Resolves to `None` when the
/// chooser is dismissed without a selection.
pub trait FilePicker: Send + Sync {
    fn pick(&self) -> PickFuture;
}

/// Native file chooser. Accepts any file; decoding decides what is an image.
pub struct DialogPicker {
    title: String,
}

impl DialogPicker {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl Default for DialogPicker {
    fn default() -> Self {
        Self::new("Choose an image")
    }
}

impl FilePicker for DialogPicker {
    fn pick(&self) -> PickFuture {
        // No filter: rfd expands extensions to `*.ext`, which would hide
        // extensionless files
        let dialog = rfd::AsyncFileDialog::new().set_title(self.title.as_str());
        Box::pin(async move {
            let handle = dialog.pick_file().await?;
            Some(PickedFile::from_path(handle.path().to_path_buf()))
        })
    }
}

/// Always "picks" the same path. Used by headless mode.
pub struct PathPicker {
    path: PathBuf,
}

impl PathPicker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FilePicker for PathPicker {
    fn pick(&self) -> PickFuture {
        let file = PickedFile::from_path(self.path.clone());
        Box::pin(async move { Some(file) })
    }
}

// ============================================================================
// PAYLOAD
// ============================================================================

/// A self-contained encoded image (`data:` URI) plus its decoded pixels.
/// Only ever built from bytes that decode, so adopting one cannot fail.
#[derive(Clone, Debug)]
pub struct ImagePayload {
    data_uri: String,
    image: DynamicImage,
}

impl ImagePayload {
    pub fn from_data_uri(data_uri: impl Into<String>) -> Result<Self, IngestError> {
        Self::decode_named(data_uri.into(), "payload")
    }

    fn decode_named(data_uri: String, name: &str) -> Result<Self, IngestError> {
        let bytes = decode_data_uri(&data_uri)?;
        let image = image::load_from_memory(&bytes).map_err(|source| IngestError::Decode {
            name: name.to_string(),
            source,
        })?;
        Ok(Self { data_uri, image })
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// `data:<mime>;base64,<payload>` for a picked file.
pub fn read_as_data_uri(file: &PickedFile) -> Result<String, IngestError> {
    let bytes = file.read()?;
    Ok(encode_data_uri(&file.mime, &bytes))
}

pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Raw bytes of a base64 `data:` URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, IngestError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| IngestError::DataUri("missing 'data:' prefix".to_string()))?;
    let (header, body) = rest
        .split_once(',')
        .ok_or_else(|| IngestError::DataUri("missing ',' separator".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(IngestError::DataUri(format!(
            "unsupported encoding in '{}'",
            header
        )));
    }
    STANDARD
        .decode(body)
        .map_err(|e| IngestError::DataUri(e.to_string()))
}

// ============================================================================
// WORKFLOW
// ============================================================================

/// How one ingestion ended.
#[derive(Debug)]
pub enum Ingestion {
    Chosen(ImagePayload),
    /// The picker was dismissed without a selection.
    Cancelled,
}

/// Pick a file, read it as a data URI and decode it.
pub async fn ingest(picker: &dyn FilePicker) -> Result<Ingestion, IngestError> {
    let Some(file) = picker.pick().await else {
        return Ok(Ingestion::Cancelled);
    };
    log_info!(
        "Picked '{}' (declared {}, subtype '{}')",
        file.name,
        file.mime,
        file.subtype()
    );

    let data_uri = read_as_data_uri(&file)?;
    let payload = ImagePayload::decode_named(data_uri, &file.name)?;
    Ok(Ingestion::Chosen(payload))
}

/// An upload that has been started and not yet drained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingUpload {
    pub id: Uuid,
    pub target: UploadTarget,
}

/// Result delivered from an upload worker.
#[derive(Debug)]
pub struct UploadOutcome {
    pub id: Uuid,
    pub target: UploadTarget,
    pub result: Result<Ingestion, IngestError>,
}

/// Runs ingestions on worker threads and hands their results back in order
/// of completion.
pub struct UploadQueue {
    sender: mpsc::Sender<UploadOutcome>,
    receiver: mpsc::Receiver<UploadOutcome>,
    pending: Vec<PendingUpload>,
}

impl Default for UploadQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            pending: Vec::new(),
        }
    }

    /// Start an ingestion and return immediately.
    ///
    /// Each call owns its picker and target, so overlapping uploads never
    /// share state. The picker is dropped by the worker on every exit path.
    pub fn start(&mut self, target: UploadTarget, picker: Arc<dyn FilePicker>) -> Uuid {
        let id = Uuid::new_v4();
        let sender = self.sender.clone();
        self.pending.push(PendingUpload { id, target });

        // Pickers may wait on the user indefinitely, so they get their own
        // thread rather than a slot in the rayon pool used for compositing
        let spawned = std::thread::Builder::new()
            .name(format!("upload-{}", target.label()))
            .spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    pollster::block_on(ingest(picker.as_ref()))
                }))
                .unwrap_or(Err(IngestError::Disconnected));
                let _ = sender.send(UploadOutcome { id, target, result });
            });

        if let Err(e) = spawned {
            log_warn!("Could not start upload worker: {}", e);
            let _ = self.sender.send(UploadOutcome {
                id,
                target,
                result: Err(IngestError::Read {
                    name: target.label().to_string(),
                    source: e,
                }),
            });
        }
        id
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Completed uploads since the last call, without blocking.
    pub fn drain(&mut self) -> Vec<UploadOutcome> {
        let mut done = Vec::new();
        while let Ok(outcome) = self.receiver.try_recv() {
            self.finish(&outcome);
            done.push(outcome);
        }
        done
    }

    /// Block until every started upload has completed.
    pub fn wait(&mut self) -> Vec<UploadOutcome> {
        let mut done = self.drain();
        while !self.pending.is_empty() {
            match self.receiver.recv() {
                Ok(outcome) => {
                    self.finish(&outcome);
                    done.push(outcome);
                }
                Err(_) => break,
            }
        }
        done
    }

    fn finish(&mut self, outcome: &UploadOutcome) {
        self.pending.retain(|p| p.id != outcome.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    struct Dismissed;

    impl FilePicker for Dismissed {
        fn pick(&self) -> PickFuture {
            Box::pin(async { None })
        }
    }

    struct Fixed(PickedFile);

    impl FilePicker for Fixed {
        fn pick(&self) -> PickFuture {
            let file = self.0.clone();
            Box::pin(async move { Some(file) })
        }
    }

    fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img.clone())
            .write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    fn checker() -> RgbaImage {
        RgbaImage::from_fn(5, 3, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 128])
            }
        })
    }

    #[test]
    fn mime_comes_from_extension() {
        assert_eq!(mime_for_name("cat.PNG"), "image/png");
        assert_eq!(mime_for_name("photo.jpg"), "image/jpeg");
        assert_eq!(mime_for_name("notes.txt"), FALLBACK_MIME);
        assert_eq!(PickedFile::from_bytes("a.webp", vec![]).subtype(), "webp");
    }

    #[test]
    fn data_uri_round_trips_bytes() {
        let uri = encode_data_uri("image/png", &[1, 2, 3, 250]);
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(decode_data_uri(&uri).unwrap(), vec![1, 2, 3, 250]);
    }

    #[test]
    fn malformed_data_uris_are_rejected() {
        assert!(matches!(
            decode_data_uri("image/png;base64,AAAA"),
            Err(IngestError::DataUri(_))
        ));
        assert!(matches!(
            decode_data_uri("data:text/plain,hello"),
            Err(IngestError::DataUri(_))
        ));
        assert!(matches!(
            decode_data_uri("data:image/png;base64,@@@"),
            Err(IngestError::DataUri(_))
        ));
    }

    #[test]
    fn ingest_decodes_picked_image() {
        let img = checker();
        let picker = Fixed(PickedFile::from_bytes("checker.png", png_bytes(&img)));
        let outcome = pollster::block_on(ingest(&picker)).unwrap();

        let Ingestion::Chosen(payload) = outcome else {
            panic!("expected a payload");
        };
        assert!(payload.data_uri().starts_with("data:image/png;base64,"));
        assert_eq!(payload.dimensions(), (5, 3));
        assert_eq!(payload.image().to_rgba8(), img);

        let again = ImagePayload::from_data_uri(payload.data_uri()).unwrap();
        assert_eq!(again.image().to_rgba8(), img);
    }

    #[test]
    fn ingest_accepts_misnamed_images() {
        let picker = Fixed(PickedFile::from_bytes("no-extension", png_bytes(&checker())));
        let outcome = pollster::block_on(ingest(&picker)).unwrap();
        assert!(matches!(outcome, Ingestion::Chosen(_)));
    }

    #[test]
    fn extensionless_file_on_disk_is_ingested() {
        let path = std::env::temp_dir().join(format!("rsp-photo-{}", Uuid::new_v4()));
        std::fs::write(&path, png_bytes(&checker())).unwrap();

        let picked = PickedFile::from_path(&path);
        assert_eq!(picked.mime, FALLBACK_MIME);
        let outcome = pollster::block_on(ingest(&PathPicker::new(&path)));
        let _ = std::fs::remove_file(&path);

        let Ok(Ingestion::Chosen(payload)) = outcome else {
            panic!("expected a payload");
        };
        assert_eq!(payload.dimensions(), (5, 3));
    }

    #[test]
    fn dismissed_picker_is_cancelled_not_error() {
        let outcome = pollster::block_on(ingest(&Dismissed)).unwrap();
        assert!(matches!(outcome, Ingestion::Cancelled));
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let picker = Fixed(PickedFile::from_bytes("broken.png", b"not a png".to_vec()));
        let err = pollster::block_on(ingest(&picker)).unwrap_err();
        assert!(matches!(err, IngestError::Decode { ref name, .. } if name == "broken.png"));
    }

    #[test]
    fn missing_path_is_a_read_error() {
        let picker = PathPicker::new("/definitely/not/here.png");
        let err = pollster::block_on(ingest(&picker)).unwrap_err();
        assert!(matches!(err, IngestError::Read { .. }));
    }

    #[test]
    fn queue_delivers_each_upload_once() {
        let mut queue = UploadQueue::new();
        let png = png_bytes(&checker());
        let a = queue.start(
            UploadTarget::Front,
            Arc::new(Fixed(PickedFile::from_bytes("a.png", png.clone()))),
        );
        let b = queue.start(UploadTarget::Back, Arc::new(Dismissed));
        assert_ne!(a, b);
        assert_eq!(queue.in_flight(), 2);

        let done = queue.wait();
        assert_eq!(done.len(), 2);
        assert_eq!(queue.in_flight(), 0);

        let front = done.iter().find(|o| o.id == a).unwrap();
        assert_eq!(front.target, UploadTarget::Front);
        assert!(matches!(front.result, Ok(Ingestion::Chosen(_))));
        let back = done.iter().find(|o| o.id == b).unwrap();
        assert!(matches!(back.result, Ok(Ingestion::Cancelled)));

        assert!(queue.drain().is_empty());
    }
}
