// ============================================================================
// CONTROLLER — owns the menu, the cover and the background, and wires them
// ============================================================================

use std::sync::Arc;

use uuid::Uuid;

use crate::background::Background;
use crate::controls::{Command, Control, UploadTarget, action_bindings, status_bindings};
use crate::error::{ControlError, ExportError, IngestError, WiringError};
use crate::export::{Delivery, DownloadSink, build_export};
use crate::ingest::{FilePicker, Ingestion, UploadOutcome, UploadQueue};
use crate::menu::Menu;
use crate::scratch::{ScratchOff, StrokeEvent};
use crate::settings::Settings;
use crate::{log_err, log_info, log_warn};

pub struct Controller {
    settings: Settings,
    menu: Menu,
    scratch: ScratchOff,
    background: Background,
    uploads: UploadQueue,
    /// Picker used by the upload controls.
    picker: Arc<dyn FilePicker>,
    sink: Box<dyn DownloadSink>,
    /// Consumed by the first background generation.
    startup_seed: Option<u64>,
    last_delivery: Option<Delivery>,
}

impl Controller {
    /// Build the collaborators, bind every control, then run the startup defaults.
    ///
    /// Fails if any control is unbound or bound to a name the menu does not show.
    pub fn new(
        settings: Settings,
        picker: Arc<dyn FilePicker>,
        sink: Box<dyn DownloadSink>,
    ) -> Result<Self, ControlError> {
        Self::with_menu(settings, Menu::new(), picker, sink)
    }

    pub fn with_menu(
        settings: Settings,
        menu: Menu,
        picker: Arc<dyn FilePicker>,
        sink: Box<dyn DownloadSink>,
    ) -> Result<Self, ControlError> {
        let settings = settings.normalized();
        let (w, h) = (settings.width, settings.height);
        let mut controller = Self {
            startup_seed: settings.seed,
            settings,
            menu,
            scratch: ScratchOff::new(w, h),
            background: Background::new(w, h),
            uploads: UploadQueue::new(),
            picker,
            sink,
            last_delivery: None,
        };

        controller.wire()?;
        controller.initialize_defaults()?;
        log_info!("Controller ready ({}x{})", w, h);
        Ok(controller)
    }

    fn wire(&mut self) -> Result<(), WiringError> {
        self.menu.set_status_callbacks(status_bindings())?;
        self.menu.set_action_callbacks(action_bindings())?;
        self.menu.validate()
    }

    /// Exactly two presses, in order: a first background, then the default brush.
    fn initialize_defaults(&mut self) -> Result<(), ControlError> {
        self.click(Control::BackGenerate.name())?;
        self.click(self.settings.default_brush.name())?;
        Ok(())
    }

    /// Press a control by name.
    pub fn click(&mut self, name: &str) -> Result<(), ControlError> {
        let command = self.menu.click(name)?;
        self.execute(command)?;
        Ok(())
    }

    pub fn execute(&mut self, command: Command) -> Result<(), ExportError> {
        match command {
            Command::SetBrushSize(size) => self.scratch.set_brush_size(size),
            Command::ToggleErase => self.scratch.toggle_erase_mode(),
            Command::ResetCover => self.scratch.reset(),
            Command::Upload(target) => {
                self.upload(target);
            }
            Command::GenerateBackground => match self.startup_seed.take() {
                Some(seed) => self.background.generate_with_seed(seed),
                None => self.background.generate(),
            },
            Command::Save => {
                self.save()?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Pointer input — stroke start hides the menu, stroke end shows it
    // ------------------------------------------------------------------

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.scratch.pointer_down(x, y);
        self.sync_menu_visibility();
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.scratch.pointer_move(x, y);
        self.sync_menu_visibility();
    }

    pub fn pointer_up(&mut self) {
        self.scratch.pointer_up();
        self.sync_menu_visibility();
    }

    fn sync_menu_visibility(&mut self) {
        for event in self.scratch.take_stroke_events() {
            match event {
                StrokeEvent::Started => self.menu.hide(),
                StrokeEvent::Ended => self.menu.show(),
            }
        }
    }

    // ------------------------------------------------------------------
    // Uploads
    // ------------------------------------------------------------------

    /// Start an upload with the default picker. Returns at once.
    pub fn upload(&mut self, target: UploadTarget) -> Uuid {
        self.upload_with(target, Arc::clone(&self.picker))
    }

    pub fn upload_with(&mut self, target: UploadTarget, picker: Arc<dyn FilePicker>) -> Uuid {
        let id = self.uploads.start(target, picker);
        log_info!("Upload {} started for the {}", id, target.label());
        id
    }

    pub fn uploads_in_flight(&self) -> usize {
        self.uploads.in_flight()
    }

    /// Hand finished uploads to their surfaces. Never blocks.
    pub fn poll_uploads(&mut self) -> Vec<IngestError> {
        let done = self.uploads.drain();
        self.deliver_all(done)
    }

    /// Block until every started upload has been handed over.
    pub fn wait_uploads(&mut self) -> Vec<IngestError> {
        let done = self.uploads.wait();
        self.deliver_all(done)
    }

    fn deliver_all(&mut self, done: Vec<UploadOutcome>) -> Vec<IngestError> {
        done.into_iter()
            .filter_map(|outcome| self.deliver(outcome).err())
            .collect()
    }

    fn deliver(&mut self, outcome: UploadOutcome) -> Result<(), IngestError> {
        let UploadOutcome { id, target, result } = outcome;
        match result {
            Ok(Ingestion::Chosen(payload)) => {
                let (w, h) = payload.dimensions();
                match target {
                    UploadTarget::Front => self.scratch.adopt_image(&payload),
                    UploadTarget::Back => self.background.adopt_image(&payload),
                }
                log_info!("Upload {} adopted as {} ({}x{})", id, target.label(), w, h);
                Ok(())
            }
            Ok(Ingestion::Cancelled) => {
                log_info!("Upload {} cancelled", id);
                Ok(())
            }
            Err(e) => {
                log_warn!("Upload {} failed, {} left unchanged: {}", id, target.label(), e);
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Flatten both layers and hand the PNG to the download sink.
    pub fn save(&mut self) -> Result<Delivery, ExportError> {
        let link = build_export(
            self.background.surface(),
            self.scratch.surface(),
            &self.settings.export_file_name,
        )?;
        match link.click(self.sink.as_mut()) {
            Ok(delivery) => {
                log_info!("Export delivered: {:?}", delivery);
                self.last_delivery = Some(delivery.clone());
                Ok(delivery)
            }
            Err(e) => {
                log_err!("Export failed: {}", e);
                Err(e)
            }
        }
    }

    pub fn last_delivery(&self) -> Option<&Delivery> {
        self.last_delivery.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn scratch(&self) -> &ScratchOff {
        &self.scratch
    }

    pub fn background(&self) -> &Background {
        &self.background
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::MemorySink;
    use crate::ingest::PickFuture;

    struct NoPicker;

    impl FilePicker for NoPicker {
        fn pick(&self) -> PickFuture {
            Box::pin(async { None })
        }
    }

    fn controller(w: u32, h: u32) -> Controller {
        let settings = Settings {
            width: w,
            height: h,
            seed: Some(11),
            ..Settings::default()
        };
        Controller::new(settings, Arc::new(NoPicker), Box::new(MemorySink::default())).unwrap()
    }

    #[test]
    fn startup_generates_background_and_selects_default_brush() {
        let c = controller(16, 12);
        assert!(c.background().params().is_some());
        assert_eq!(c.scratch().brush_size(), 3);
        assert_eq!(c.menu().active_brush(), Some(Control::Brush2));
        assert!(c.menu().is_visible());
    }

    #[test]
    fn incomplete_menu_fails_at_startup() {
        let menu = Menu::with_layout(vec![Control::Brush1, Control::Save]);
        let err = Controller::with_menu(
            Settings::default(),
            menu,
            Arc::new(NoPicker),
            Box::new(MemorySink::default()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ControlError::Wiring(WiringError::UnknownControl(_))));
    }

    #[test]
    fn stroke_hides_menu_until_release() {
        let mut c = controller(16, 16);
        c.pointer_down(4.0, 4.0);
        assert!(!c.menu().is_visible());
        c.pointer_move(100.0, 100.0);
        assert!(!c.menu().is_visible());
        c.pointer_up();
        assert!(c.menu().is_visible());
    }

    #[test]
    fn cancelled_upload_changes_nothing() {
        let mut c = controller(8, 8);
        let before = c.scratch().surface().clone();
        c.click("front-upload").unwrap();
        assert!(c.wait_uploads().is_empty());
        assert_eq!(c.scratch().surface(), &before);
        assert_eq!(c.uploads_in_flight(), 0);
    }
}
