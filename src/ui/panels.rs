//! UI panels for filtering, browsing and object details

use std::sync::Arc;

use egui::{Color32, RichText, Ui};

use crate::data::{
    constellation_names, status_values, AltitudeBand, Catalog, CatalogObject, FilterState,
    ObjectKind, ObjectStatus, StatusCounts, TYPE_CODES,
};
use crate::propagation::SatelliteState;

/// Events emitted by the side panels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelEvent {
    ClearSelection,
}

/// Filter controls editing a [`FilterState`]
#[derive(Default)]
pub struct FilterPanel {
    pub filter: FilterState,
    /// Choices offered by the controls, refreshed when the catalog changes
    constellations: Vec<String>,
    statuses: Vec<ObjectStatus>,
}

impl FilterPanel {
    pub fn refresh_choices(&mut self, catalog: &Catalog) {
        self.constellations = constellation_names(catalog);
        self.statuses = status_values(catalog);
    }

    /// Returns true when the filter changed
    pub fn show(&mut self, ui: &mut Ui) -> bool {
        let mut changed = false;
        ui.heading("Filter");

        ui.horizontal(|ui| {
            ui.label("Search:");
            if ui.text_edit_singleline(&mut self.filter.search).changed() {
                changed = true;
            }
        });

        egui::ComboBox::from_label("Altitude")
            .selected_text(self.filter.band.label())
            .show_ui(ui, |ui| {
                for band in AltitudeBand::all() {
                    if ui
                        .selectable_value(&mut self.filter.band, *band, band.label())
                        .changed()
                    {
                        changed = true;
                    }
                }
            });

        let status_text = self
            .filter
            .status
            .as_ref()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "any".to_string());
        egui::ComboBox::from_label("Status")
            .selected_text(status_text)
            .show_ui(ui, |ui| {
                if ui
                    .selectable_value(&mut self.filter.status, None, "any")
                    .changed()
                {
                    changed = true;
                }
                for status in &self.statuses {
                    if ui
                        .selectable_value(
                            &mut self.filter.status,
                            Some(status.clone()),
                            status.as_str(),
                        )
                        .changed()
                    {
                        changed = true;
                    }
                }
            });

        ui.separator();
        ui.label("Object types:");
        ui.horizontal_wrapped(|ui| {
            for code in TYPE_CODES {
                let mut enabled = self.filter.types.contains(*code);
                if ui.checkbox(&mut enabled, *code).changed() {
                    self.filter.toggle_type(code);
                    changed = true;
                }
            }
        });

        if !self.constellations.is_empty() {
            ui.separator();
            egui::CollapsingHeader::new(format!(
                "Constellations ({} selected)",
                self.filter.constellations.len()
            ))
            .show(ui, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("constellation_scroll")
                    .max_height(160.0)
                    .show(ui, |ui| {
                        for name in &self.constellations {
                            let mut enabled = self.filter.constellations.contains(name);
                            if ui.checkbox(&mut enabled, name).changed() {
                                self.filter.toggle_constellation(name);
                                changed = true;
                            }
                        }
                    });
            });
        }

        ui.separator();
        let reset = ui.add_enabled(!self.filter.is_pass_through(), egui::Button::new("Show all"));
        if reset.clicked() {
            self.filter = FilterState::default();
            changed = true;
        }

        changed
    }
}

/// Scrolling list of the working set
#[derive(Default)]
pub struct BrowserPanel;

impl BrowserPanel {
    pub fn show(
        &mut self,
        ui: &mut Ui,
        objects: &[Arc<CatalogObject>],
        selected: Option<u32>,
    ) -> Option<u32> {
        let mut new_selection = None;
        ui.label(format!("{} objects in working set", objects.len()));

        let row_height = ui.text_style_height(&egui::TextStyle::Body) + ui.spacing().item_spacing.y;
        egui::ScrollArea::vertical()
            .id_salt("browser_scroll")
            .auto_shrink([false, false])
            .show_rows(ui, row_height, objects.len(), |ui, row_range| {
                for obj in &objects[row_range] {
                    let is_selected = selected == Some(obj.norad_id);
                    let text = RichText::new(obj.display_name()).color(kind_color(obj.kind.as_ref()));
                    let response = ui.selectable_label(is_selected, text);

                    if response.clicked() {
                        new_selection = Some(obj.norad_id);
                    }

                    response.on_hover_ui(|ui| {
                        ui.label(format!("NORAD: {}", obj.norad_id));
                        if let Some(kind) = &obj.kind {
                            ui.label(format!("Type: {}", kind));
                        }
                        if let Some(c) = &obj.constellation {
                            ui.label(format!("Constellation: {}", c));
                        }
                    });
                }
            });

        new_selection
    }
}

fn kind_color(kind: Option<&ObjectKind>) -> Color32 {
    match kind {
        Some(ObjectKind::Satellite) => Color32::from_rgb(100, 200, 100),
        Some(ObjectKind::RocketBody) => Color32::from_rgb(200, 150, 100),
        Some(ObjectKind::Debris) => Color32::from_rgb(150, 150, 150),
        _ => Color32::WHITE,
    }
}

/// Object detail panel
pub struct DetailPanel;

impl DetailPanel {
    pub fn show(
        ui: &mut Ui,
        obj: &CatalogObject,
        state: Option<&SatelliteState>,
    ) -> Option<PanelEvent> {
        ui.heading(obj.display_name());
        ui.separator();

        egui::Grid::new("detail_grid")
            .num_columns(2)
            .spacing([10.0, 4.0])
            .show(ui, |ui| {
                ui.label("NORAD ID:");
                ui.label(format!("{}", obj.norad_id));
                ui.end_row();

                if let Some(designator) = &obj.intl_designator {
                    ui.label("Intl. designator:");
                    ui.label(designator);
                    ui.end_row();
                }

                if let Some(kind) = &obj.kind {
                    ui.label("Type:");
                    ui.label(kind.as_str());
                    ui.end_row();
                }

                if let Some(status) = &obj.status {
                    ui.label("Status:");
                    ui.label(status.as_str());
                    ui.end_row();
                }

                if let Some(constellation) = &obj.constellation {
                    ui.label("Constellation:");
                    ui.label(constellation);
                    ui.end_row();
                }

                if let Some(country) = &obj.country {
                    ui.label("Country:");
                    ui.label(country);
                    ui.end_row();
                }

                if let Some(launch) = &obj.launch_date {
                    ui.label("Launch:");
                    ui.label(launch);
                    ui.end_row();
                }

                if let (Some(perigee), Some(apogee)) = (obj.perigee_km, obj.apogee_km) {
                    ui.label("Perigee / apogee:");
                    ui.label(format!("{:.0} / {:.0} km", perigee, apogee));
                    ui.end_row();
                }

                if let Some(incl) = obj.inclination_deg {
                    ui.label("Inclination:");
                    ui.label(format!("{:.2}°", incl));
                    ui.end_row();
                }
            });

        if let Some(state) = state {
            ui.separator();
            ui.heading("Current State");
            egui::Grid::new("state_grid")
                .num_columns(2)
                .spacing([10.0, 4.0])
                .show(ui, |ui| {
                    ui.label("Altitude:");
                    ui.label(format!("{:.1} km", state.altitude_km));
                    ui.end_row();

                    ui.label("Speed:");
                    ui.label(format!("{:.2} km/s", state.speed_kms));
                    ui.end_row();

                    ui.label("TLE Age:");
                    ui.colored_label(
                        tle_age_color(state.tle_age_days),
                        format!("{:.1} days", state.tle_age_days),
                    );
                    ui.end_row();
                });
        }

        match &obj.tle {
            Some(tle) => {
                ui.separator();
                ui.label("TLE Lines:");
                ui.monospace(&tle.line1);
                ui.monospace(&tle.line2);
            }
            None => {
                ui.separator();
                ui.colored_label(Color32::from_rgb(200, 100, 100), "No TLE available");
            }
        }

        ui.separator();
        if ui.button("Deselect").clicked() {
            return Some(PanelEvent::ClearSelection);
        }
        None
    }
}

fn tle_age_color(age_days: f64) -> Color32 {
    if age_days.abs() < 7.0 {
        Color32::from_rgb(100, 200, 100)
    } else if age_days.abs() < 30.0 {
        Color32::from_rgb(200, 200, 100)
    } else {
        Color32::from_rgb(200, 100, 100)
    }
}

/// Status breakdown of the whole catalog
pub struct StatsPanel;

impl StatsPanel {
    pub fn show(ui: &mut Ui, counts: &StatusCounts, from_service: bool) {
        ui.heading("Statistics");
        egui::Grid::new("stats_grid")
            .num_columns(2)
            .spacing([10.0, 2.0])
            .show(ui, |ui| {
                for (label, value, color) in [
                    ("Active", counts.active, Color32::from_rgb(51, 217, 89)),
                    ("Inactive", counts.inactive, Color32::from_rgb(102, 115, 133)),
                    ("Debris", counts.debris, Color32::from_rgb(255, 140, 25)),
                    ("Other", counts.other, Color32::GRAY),
                ] {
                    ui.colored_label(color, label);
                    ui.label(value.to_string());
                    ui.end_row();
                }
                ui.label("Total");
                ui.label(counts.total().to_string());
                ui.end_row();
            });
        if !from_service {
            ui.small("Aggregated locally");
        }
    }
}

/// Non-blocking notices drawn over the viewport
pub fn draw_advisories(painter: &egui::Painter, rect: egui::Rect, advisories: &[String]) {
    for (i, message) in advisories.iter().enumerate() {
        painter.text(
            rect.left_bottom() + egui::vec2(10.0, -10.0 - i as f32 * 18.0),
            egui::Align2::LEFT_BOTTOM,
            message,
            egui::FontId::proportional(13.0),
            Color32::from_rgb(230, 160, 90),
        );
    }
}
