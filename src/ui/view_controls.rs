//! View settings: camera behavior, orbit-path visibility, refresh

use std::collections::BTreeSet;

use egui::Ui;

use crate::propagation::OrbitClass;

/// What the user asked for in the top bar and the settings window
#[derive(Clone)]
pub struct ViewControls {
    pub auto_rotate: bool,
    /// Orbit classes whose rings are shown; empty shows every class
    pub visible_classes: BTreeSet<OrbitClass>,
    /// Seconds between re-propagation passes; 0 disables
    pub refresh_secs: u64,
    /// UI max FPS cap
    pub max_fps: f32,
    sync_requested: bool,
    reload_requested: bool,
}

impl Default for ViewControls {
    fn default() -> Self {
        Self {
            auto_rotate: false,
            visible_classes: BTreeSet::new(),
            refresh_secs: 30,
            max_fps: 60.0,
            sync_requested: false,
            reload_requested: false,
        }
    }
}

impl ViewControls {
    pub fn new(auto_rotate: bool, refresh_secs: u64) -> Self {
        Self {
            auto_rotate,
            refresh_secs,
            ..Self::default()
        }
    }

    pub fn show_top_bar(&mut self, ui: &mut Ui, current_time: &str) {
        ui.horizontal(|ui| {
            ui.label(format!("Time: {}", current_time));
            if ui.button("Now").on_hover_text("Propagate to the current time").clicked() {
                self.sync_requested = true;
            }
            if ui
                .button("Reload catalog")
                .on_hover_text("Fetch the catalog again from its source")
                .clicked()
            {
                self.reload_requested = true;
            }
            ui.separator();
            ui.checkbox(&mut self.auto_rotate, "Auto-rotate");
        });
    }

    /// Returns true when the visible class set changed
    pub fn show_settings(&mut self, ui: &mut Ui) -> bool {
        let mut classes_changed = false;

        ui.label("Orbit paths");
        ui.horizontal_wrapped(|ui| {
            for class in OrbitClass::known() {
                let mut shown = self.visible_classes.contains(class);
                if ui.checkbox(&mut shown, class.display_name()).changed() {
                    self.toggle_class(class);
                    classes_changed = true;
                }
            }
        });
        if self.visible_classes.is_empty() {
            ui.small("No class selected: all rings shown");
        }

        ui.separator();
        ui.label("Updates");
        ui.add(egui::Slider::new(&mut self.refresh_secs, 0..=300).text("Refresh (s)"));

        ui.separator();
        ui.label("Performance");
        ui.add(egui::Slider::new(&mut self.max_fps, 20.0..=240.0).text("Max FPS"));

        classes_changed
    }

    pub fn toggle_class(&mut self, class: &OrbitClass) {
        if !self.visible_classes.remove(class) {
            self.visible_classes.insert(class.clone());
        }
    }

    /// Consume a pending "Now" click
    pub fn take_sync_request(&mut self) -> bool {
        std::mem::take(&mut self.sync_requested)
    }

    pub fn take_reload_request(&mut self) -> bool {
        std::mem::take(&mut self.reload_requested)
    }

    pub fn refresh_interval(&self) -> Option<std::time::Duration> {
        (self.refresh_secs > 0).then(|| std::time::Duration::from_secs(self.refresh_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_class_round_trips() {
        let mut controls = ViewControls::default();
        controls.toggle_class(&OrbitClass::Geo);
        assert!(controls.visible_classes.contains(&OrbitClass::Geo));
        controls.toggle_class(&OrbitClass::Geo);
        assert!(controls.visible_classes.is_empty());
    }

    #[test]
    fn test_zero_refresh_disables() {
        assert!(ViewControls::new(false, 0).refresh_interval().is_none());
        assert_eq!(
            ViewControls::new(true, 30).refresh_interval(),
            Some(std::time::Duration::from_secs(30))
        );
    }

    #[test]
    fn test_sync_request_is_consumed_once() {
        let mut controls = ViewControls::default();
        controls.sync_requested = true;
        assert!(controls.take_sync_request());
        assert!(!controls.take_sync_request());
    }

    #[test]
    fn test_reload_request_is_independent_of_sync() {
        let mut controls = ViewControls::default();
        assert!(!controls.take_reload_request());
        controls.reload_requested = true;
        assert!(!controls.take_sync_request());
        assert!(controls.take_reload_request());
        assert!(!controls.take_reload_request());
    }
}
