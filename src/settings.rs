use std::path::PathBuf;

use crate::controls::Control;
use crate::export::EXPORT_FILE_NAME;

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;

/// Session configuration. Nothing here outlives the process.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Size of both surfaces and of every export.
    pub width: u32,
    pub height: u32,
    /// Brush selected during startup.
    pub default_brush: Control,
    /// Seed for the startup background; random when `None`.
    pub seed: Option<u64>,
    pub export_file_name: String,
    /// Headless exports go here instead of through a save dialog.
    pub export_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            default_brush: Control::Brush2,
            seed: None,
            export_file_name: EXPORT_FILE_NAME.to_string(),
            export_dir: None,
        }
    }
}

impl Settings {
    /// Clamp dimensions to at least one pixel.
    pub fn normalized(mut self) -> Self {
        self.width = self.width.max(1);
        self.height = self.height.max(1);
        if self.default_brush.brush_index().is_none() {
            self.default_brush = Control::Brush2;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pick_second_brush() {
        let s = Settings::default();
        assert_eq!(s.default_brush, Control::Brush2);
        assert_eq!(s.export_file_name, "RainbowScratchPaper Screenshot.png");
    }

    #[test]
    fn normalized_rejects_degenerate_values() {
        let s = Settings {
            width: 0,
            height: 0,
            default_brush: Control::Save,
            ..Settings::default()
        }
        .normalized();
        assert_eq!((s.width, s.height), (1, 1));
        assert_eq!(s.default_brush, Control::Brush2);
    }
}
