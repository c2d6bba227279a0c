// ============================================================================
// MENU — named controls, their bindings, and show/hide chrome
// ============================================================================

use eframe::egui;

use crate::controls::{Command, Control, ControlKind, Registry};
use crate::error::WiringError;

pub struct Menu {
    /// Known controls, in display order.
    layout: Vec<Control>,
    status: Registry,
    actions: Registry,
    visible: bool,
    /// Selected brush; at most one at a time.
    active_brush: Option<Control>,
    eraser_on: bool,
}

impl Default for Menu {
    fn default() -> Self {
        Self::new()
    }
}

impl Menu {
    pub fn new() -> Self {
        Self::with_layout(Control::all().to_vec())
    }

    pub fn with_layout(layout: Vec<Control>) -> Self {
        Self {
            layout,
            status: Registry::new(),
            actions: Registry::new(),
            visible: true,
            active_brush: None,
            eraser_on: false,
        }
    }

    /// The control called `name`, if this menu shows one.
    pub fn control(&self, name: &str) -> Option<Control> {
        self.layout.iter().copied().find(|c| c.name() == name)
    }

    /// Register status bindings. Rejects the whole map if any name is unknown.
    pub fn set_status_callbacks(&mut self, map: Registry) -> Result<(), WiringError> {
        self.check_names(&map)?;
        self.status.extend(map);
        Ok(())
    }

    /// Register action bindings. Rejects the whole map if any name is unknown.
    pub fn set_action_callbacks(&mut self, map: Registry) -> Result<(), WiringError> {
        self.check_names(&map)?;
        self.actions.extend(map);
        Ok(())
    }

    fn check_names(&self, map: &Registry) -> Result<(), WiringError> {
        match map.keys().find(|name| self.control(name).is_none()) {
            Some(name) => Err(WiringError::UnknownControl(name.to_string())),
            None => Ok(()),
        }
    }

    /// Every shown control must have exactly one binding.
    pub fn validate(&self) -> Result<(), WiringError> {
        for control in &self.layout {
            let name = control.name();
            match (self.status.contains_key(name), self.actions.contains_key(name)) {
                (true, true) => return Err(WiringError::DoubleBound(name.to_string())),
                (false, false) => return Err(WiringError::Unbound(name.to_string())),
                _ => {}
            }
        }
        Ok(())
    }

    pub fn binding(&self, control: Control) -> Option<Command> {
        let name = control.name();
        self.status
            .get(name)
            .or_else(|| self.actions.get(name))
            .copied()
    }

    /// Press a control by name, as if the user clicked it.
    pub fn click(&mut self, name: &str) -> Result<Command, WiringError> {
        let control = self
            .control(name)
            .ok_or_else(|| WiringError::UnknownControl(name.to_string()))?;

        if let Some(command) = self.status.get(name).copied() {
            if control.brush_index().is_some() {
                self.active_brush = Some(control);
            } else {
                self.eraser_on = !self.eraser_on;
            }
            return Ok(command);
        }
        self.actions
            .get(name)
            .copied()
            .ok_or_else(|| WiringError::Unbound(name.to_string()))
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn active_brush(&self) -> Option<Control> {
        self.active_brush
    }

    pub fn eraser_on(&self) -> bool {
        self.eraser_on
    }

    /// Draw the controls. Returns the control clicked this frame.
    pub fn ui(&self, ui: &mut egui::Ui) -> Option<Control> {
        let mut clicked = None;
        ui.horizontal_wrapped(|ui| {
            let mut last_kind = None;
            for control in &self.layout {
                let kind = control.kind();
                if last_kind.is_some_and(|k| k != kind) {
                    ui.separator();
                }
                last_kind = Some(kind);

                let response = match kind {
                    ControlKind::Status => {
                        let selected = if control.brush_index().is_some() {
                            self.active_brush == Some(*control)
                        } else {
                            self.eraser_on
                        };
                        ui.selectable_label(selected, control.label())
                    }
                    ControlKind::Action => ui.button(control.label()),
                };
                if response.clicked() {
                    clicked = Some(*control);
                }
            }
        });
        clicked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::{action_bindings, status_bindings};

    fn wired() -> Menu {
        let mut menu = Menu::new();
        menu.set_status_callbacks(status_bindings()).unwrap();
        menu.set_action_callbacks(action_bindings()).unwrap();
        menu
    }

    #[test]
    fn complete_bindings_validate() {
        assert_eq!(wired().validate(), Ok(()));
    }

    #[test]
    fn missing_binding_is_reported() {
        let mut menu = Menu::new();
        menu.set_status_callbacks(status_bindings()).unwrap();
        assert_eq!(
            menu.validate(),
            Err(WiringError::Unbound("front-refresh".to_string()))
        );
    }

    #[test]
    fn unknown_name_rejects_the_whole_map() {
        let mut menu = Menu::with_layout(vec![Control::Brush1]);
        let err = menu.set_status_callbacks(status_bindings()).unwrap_err();
        assert!(matches!(err, WiringError::UnknownControl(_)));
        assert_eq!(menu.binding(Control::Brush1), None);
    }

    #[test]
    fn double_binding_is_reported() {
        let mut menu = wired();
        menu.set_action_callbacks(Registry::from([("eraser", Command::Save)]))
            .unwrap();
        assert_eq!(
            menu.validate(),
            Err(WiringError::DoubleBound("eraser".to_string()))
        );
    }

    #[test]
    fn later_registration_overwrites() {
        let mut menu = wired();
        menu.set_action_callbacks(Registry::from([("save", Command::ResetCover)]))
            .unwrap();
        assert_eq!(menu.click("save"), Ok(Command::ResetCover));
    }

    #[test]
    fn brush_selection_is_exclusive() {
        let mut menu = wired();
        menu.click("brush-1").unwrap();
        menu.click("brush-4").unwrap();
        assert_eq!(menu.active_brush(), Some(Control::Brush4));
    }

    #[test]
    fn eraser_flips_each_click() {
        let mut menu = wired();
        assert_eq!(menu.click("eraser"), Ok(Command::ToggleErase));
        assert!(menu.eraser_on());
        menu.click("eraser").unwrap();
        assert!(!menu.eraser_on());
    }

    #[test]
    fn unknown_click_is_an_error() {
        assert_eq!(
            wired().click("brush-9"),
            Err(WiringError::UnknownControl("brush-9".to_string()))
        );
    }

    #[test]
    fn show_hide_are_idempotent() {
        let mut menu = Menu::new();
        menu.hide();
        menu.hide();
        assert!(!menu.is_visible());
        menu.show();
        menu.show();
        assert!(menu.is_visible());
    }
}
