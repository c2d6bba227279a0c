// ============================================================================
// CONTROLS — closed set of menu controls and the commands they trigger
// ============================================================================

use std::collections::HashMap;

/// Brush sizes, smallest first. `Brush{i}` selects `BRUSH_LADDER[i - 1]`.
pub const BRUSH_LADDER: [u32; 5] = [1, 3, 7, 14, 28];

/// Whether a control reflects a persistent mode or fires once per click.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Status,
    Action,
}

/// Every clickable control the menu can show.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Control {
    Brush1,
    Brush2,
    Brush3,
    Brush4,
    Brush5,
    Eraser,
    FrontRefresh,
    FrontUpload,
    BackUpload,
    BackGenerate,
    Save,
}

impl Control {
    /// All controls in menu display order.
    pub fn all() -> &'static [Control] {
        &[
            Control::Brush1,
            Control::Brush2,
            Control::Brush3,
            Control::Brush4,
            Control::Brush5,
            Control::Eraser,
            Control::FrontRefresh,
            Control::FrontUpload,
            Control::BackUpload,
            Control::BackGenerate,
            Control::Save,
        ]
    }

    /// The brush controls, in ladder order.
    pub fn brushes() -> &'static [Control] {
        &[
            Control::Brush1,
            Control::Brush2,
            Control::Brush3,
            Control::Brush4,
            Control::Brush5,
        ]
    }

    /// Stable identifier used by the registries and the CLI.
    pub fn name(&self) -> &'static str {
        match self {
            Control::Brush1 => "brush-1",
            Control::Brush2 => "brush-2",
            Control::Brush3 => "brush-3",
            Control::Brush4 => "brush-4",
            Control::Brush5 => "brush-5",
            Control::Eraser => "eraser",
            Control::FrontRefresh => "front-refresh",
            Control::FrontUpload => "front-upload",
            Control::BackUpload => "back-upload",
            Control::BackGenerate => "back-generate",
            Control::Save => "save",
        }
    }

    pub fn from_name(name: &str) -> Option<Control> {
        Control::all().iter().copied().find(|c| c.name() == name)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Control::Brush1 => "Fine",
            Control::Brush2 => "Small",
            Control::Brush3 => "Medium",
            Control::Brush4 => "Large",
            Control::Brush5 => "Huge",
            Control::Eraser => "Eraser",
            Control::FrontRefresh => "Reset cover",
            Control::FrontUpload => "Upload cover",
            Control::BackUpload => "Upload background",
            Control::BackGenerate => "New rainbow",
            Control::Save => "Save",
        }
    }

    pub fn kind(&self) -> ControlKind {
        match self {
            Control::Brush1
            | Control::Brush2
            | Control::Brush3
            | Control::Brush4
            | Control::Brush5
            | Control::Eraser => ControlKind::Status,
            _ => ControlKind::Action,
        }
    }

    /// Ladder position (0-based) for brush controls.
    pub fn brush_index(&self) -> Option<usize> {
        Control::brushes().iter().position(|c| c == self)
    }

    /// Brush control for a 1-based ladder position.
    pub fn brush(position: usize) -> Option<Control> {
        position
            .checked_sub(1)
            .and_then(|i| Control::brushes().get(i))
            .copied()
    }
}

/// Which surface an upload is adopted by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UploadTarget {
    /// The scratch-off cover.
    Front,
    /// The revealed background.
    Back,
}

impl UploadTarget {
    pub fn label(&self) -> &'static str {
        match self {
            UploadTarget::Front => "cover",
            UploadTarget::Back => "background",
        }
    }
}

/// Work a control performs when clicked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    SetBrushSize(u32),
    ToggleErase,
    ResetCover,
    Upload(UploadTarget),
    GenerateBackground,
    Save,
}

pub type Registry = HashMap<&'static str, Command>;

/// Status registry: brush ladder plus the eraser toggle.
pub fn status_bindings() -> Registry {
    let mut map: Registry = Control::brushes()
        .iter()
        .zip(BRUSH_LADDER)
        .map(|(control, size)| (control.name(), Command::SetBrushSize(size)))
        .collect();
    map.insert(Control::Eraser.name(), Command::ToggleErase);
    map
}

/// Action registry: one-shot commands.
pub fn action_bindings() -> Registry {
    Registry::from([
        (Control::FrontRefresh.name(), Command::ResetCover),
        (
            Control::FrontUpload.name(),
            Command::Upload(UploadTarget::Front),
        ),
        (
            Control::BackUpload.name(),
            Command::Upload(UploadTarget::Back),
        ),
        (Control::BackGenerate.name(), Command::GenerateBackground),
        (Control::Save.name(), Command::Save),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_name() {
        for control in Control::all() {
            assert_eq!(Control::from_name(control.name()), Some(*control));
        }
        assert_eq!(Control::from_name("brush-6"), None);
    }

    #[test]
    fn ladder_is_strictly_increasing() {
        assert!(BRUSH_LADDER.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn bindings_cover_every_control_once() {
        let status = status_bindings();
        let action = action_bindings();
        for control in Control::all() {
            let in_status = status.contains_key(control.name());
            let in_action = action.contains_key(control.name());
            assert!(in_status ^ in_action, "{} bound wrongly", control.name());
            assert_eq!(in_status, control.kind() == ControlKind::Status);
        }
    }

    #[test]
    fn brush_positions_map_to_ladder() {
        let status = status_bindings();
        for (i, size) in BRUSH_LADDER.iter().enumerate() {
            let control = Control::brush(i + 1).unwrap();
            assert_eq!(control.brush_index(), Some(i));
            assert_eq!(status[control.name()], Command::SetBrushSize(*size));
        }
        assert_eq!(Control::brush(0), None);
        assert_eq!(Control::brush(6), None);
    }
}
