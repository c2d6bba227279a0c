// ============================================================================
// EXPORT — flatten background + cover, encode as PNG, hand to a download sink
// ============================================================================

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::ImageEncoder;
use image::codecs::png::PngEncoder;

use crate::error::ExportError;
use crate::ingest::encode_data_uri;
use crate::log_info;
use crate::surface::Surface;

/// Suggested name for every export.
pub const EXPORT_FILE_NAME: &str = "RainbowScratchPaper Screenshot.png";

/// Declared type of the download. Deliberately not `image/png`, so the host
/// saves it instead of displaying it.
pub const EXPORT_CONTENT_TYPE: &str = "image/octet-stream";

/// Flatten `back` then `front` into a new surface sized like `front`.
pub fn composite(back: &Surface, front: &Surface) -> Surface {
    let (w, h) = front.dimensions();
    let mut out = Surface::new(w, h);
    out.draw_surface(back, 0, 0);
    out.draw_surface(front, 0, 0);
    out
}

/// Lossless PNG bytes of a surface.
pub fn encode_png(surface: &Surface) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    let img = surface.pixels();
    PngEncoder::new(&mut bytes).write_image(
        img.as_raw(),
        img.width(),
        img.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(bytes)
}

/// A one-shot download: a file name, a content type and the encoded bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadLink {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl DownloadLink {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: EXPORT_CONTENT_TYPE.to_string(),
            bytes,
        }
    }

    /// The link target as a self-contained `data:` URI.
    pub fn href(&self) -> String {
        encode_data_uri(&self.content_type, &self.bytes)
    }

    /// Activate the link. The link is consumed either way.
    pub fn click(self, sink: &mut dyn DownloadSink) -> Result<Delivery, ExportError> {
        sink.deliver(self)
    }
}

/// Where a download ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    Written(PathBuf),
    Kept,
    /// The user dismissed the destination prompt.
    Declined,
}

/// The host's "download this file" affordance.
pub trait DownloadSink {
    fn deliver(&mut self, link: DownloadLink) -> Result<Delivery, ExportError>;
}

/// Composite, encode and build the download link for one export.
pub fn build_export(
    back: &Surface,
    front: &Surface,
    file_name: &str,
) -> Result<DownloadLink, ExportError> {
    let flat = composite(back, front);
    let bytes = encode_png(&flat)?;
    log_info!(
        "Export {}x{} encoded to {} bytes",
        flat.width(),
        flat.height(),
        bytes.len()
    );
    Ok(DownloadLink::new(file_name, bytes))
}

// ============================================================================
// SINKS
// ============================================================================

/// Writes every download into a fixed directory.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&mut self, link: DownloadLink) -> Result<Delivery, ExportError> {
        fs::create_dir_all(&self.dir).map_err(|source| ExportError::Write {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.dir.join(&link.file_name);
        write_atomic(&path, &link.bytes)?;
        Ok(Delivery::Written(path))
    }
}

/// Asks for a destination with a native save dialog.
pub struct SaveDialogSink;

impl DownloadSink for SaveDialogSink {
    fn deliver(&mut self, link: DownloadLink) -> Result<Delivery, ExportError> {
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(link.file_name.as_str())
            .add_filter("PNG", &["png"])
            .save_file()
        else {
            return Ok(Delivery::Declined);
        };
        write_atomic(&path, &link.bytes)?;
        Ok(Delivery::Written(path))
    }
}

/// Keeps links in memory.
#[derive(Default)]
pub struct MemorySink {
    pub links: Vec<DownloadLink>,
}

impl DownloadSink for MemorySink {
    fn deliver(&mut self, link: DownloadLink) -> Result<Delivery, ExportError> {
        self.links.push(link);
        Ok(Delivery::Kept)
    }
}

/// Write to `<path>.part`, then rename over `path`.
/// Readers of `path` only ever see a complete file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    let write_err = |source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };

    let result = (|| {
        let file = File::create(&part)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);
        fs::rename(&part, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&part);
        return Err(write_err(e));
    }
    Ok(())
}
