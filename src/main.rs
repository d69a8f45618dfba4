//! OrbitView - live 3D view of Earth-orbiting objects
//!
//! Objects come from a catalog file or a catalog service, are filtered into a
//! working set, propagated with SGP4 and drawn as markers around a wgpu Earth.

mod config;
mod data;
mod propagation;
mod renderer;
mod snapshot;
mod ui;

use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use eframe::egui;
use glam::Vec2;

use config::{Cli, Command, ViewerConfig};
use data::{
    launch_counts, Catalog, CatalogObject, CatalogQuery, FetchEvent, FetchWorker, StatusCounts,
};
use propagation::{OrbitClass, Propagator};
use renderer::{
    MarkerUpdate, SceneCallback, SceneContext, SceneEvent, SceneManager, SceneState,
    WgpuSurface, WorkingSetPass,
};
use ui::{draw_advisories, BrowserPanel, DetailPanel, FilterPanel, PanelEvent, StatsPanel, ViewControls};

/// Pixels of scroll per zoom step
const SCROLL_ZOOM_SCALE: f32 = 0.01;

pub struct OrbitViewApp {
    config: ViewerConfig,
    fetcher: FetchWorker,
    catalog: Catalog,
    propagator: Propagator,
    working_set: Vec<std::sync::Arc<CatalogObject>>,
    generation: u64,

    scene: SceneManager,
    scene_ctx: SceneContext,

    filter_panel: FilterPanel,
    browser_panel: BrowserPanel,
    view_controls: ViewControls,
    show_settings_window: bool,

    stats: StatusCounts,
    stats_from_service: bool,
    launches: BTreeMap<OrbitClass, usize>,
    /// Fresh service record for the selected object
    selected_detail: Option<CatalogObject>,
    catalog_advisory: Option<String>,
    stats_advisory: Option<String>,
    catalog_loading: bool,

    last_refresh: Instant,
    last_frame_time: Instant,
    last_frame_delta: f32,
}

impl OrbitViewApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: ViewerConfig) -> Result<Self> {
        let scene_ctx = SceneContext {
            aspect_ratio: 16.0 / 9.0,
            selection: None,
            auto_rotate: config.auto_rotate,
        };

        let mut scene = SceneManager::new(config.scene.clone());
        if let Some(wgpu_render_state) = &cc.wgpu_render_state {
            let surface = WgpuSurface::install(wgpu_render_state, 1280, 720);
            scene.mount(&scene_ctx, Box::new(surface))?;
        } else {
            log::warn!("No wgpu render state available, 3D view disabled");
        }

        let mut fetcher = FetchWorker::new(config.source.clone());
        log::info!("Requesting catalog from {}", fetcher.source());
        fetcher.request_catalog(CatalogQuery::default());
        fetcher.request_statistics();
        fetcher.request_launches();

        let mut filter_panel = FilterPanel::default();
        filter_panel.filter = config.initial_filter.clone();

        let mut app = Self {
            view_controls: ViewControls::new(config.auto_rotate, config.refresh_secs),
            config,
            fetcher,
            catalog: Catalog::default(),
            propagator: Propagator::new(),
            working_set: Vec::new(),
            generation: 0,
            scene,
            scene_ctx,
            filter_panel,
            browser_panel: BrowserPanel,
            show_settings_window: false,
            stats: StatusCounts::default(),
            stats_from_service: false,
            launches: BTreeMap::new(),
            selected_detail: None,
            catalog_advisory: None,
            stats_advisory: None,
            catalog_loading: true,
            last_refresh: Instant::now(),
            last_frame_time: Instant::now(),
            last_frame_delta: 0.0,
        };
        app.update_paths();
        Ok(app)
    }

    fn poll_fetches(&mut self) {
        for event in self.fetcher.poll() {
            match event {
                FetchEvent::Catalog { result: Ok(catalog), .. } => self.install_catalog(catalog),
                FetchEvent::Catalog { result: Err(e), .. } => {
                    log::warn!("Catalog unavailable: {}", e);
                    self.catalog_loading = false;
                    self.catalog_advisory = Some(format!("Catalog unavailable: {}", e));
                }
                FetchEvent::Statistics(Ok(counts)) => {
                    self.stats = counts;
                    self.stats_from_service = true;
                    self.stats_advisory = None;
                }
                FetchEvent::Statistics(Err(e)) => {
                    log::warn!("Statistics unavailable, aggregating locally: {}", e);
                    self.stats_from_service = false;
                    self.stats = StatusCounts::from_objects(self.catalog.objects.iter().map(|o| o.as_ref()));
                    self.stats_advisory = Some("Statistics service unavailable".to_string());
                }
                FetchEvent::Launches(Ok(launches)) => {
                    self.launches = launch_counts(&launches);
                    log::info!("{} launches across {} orbit classes", launches.len(), self.launches.len());
                    self.update_paths();
                }
                FetchEvent::Launches(Err(e)) => {
                    log::warn!("Launch service unavailable: {}", e);
                }
                FetchEvent::Object(Ok(object)) => {
                    if self.scene_ctx.selection == Some(object.norad_id) {
                        self.selected_detail = Some(object);
                    }
                }
                FetchEvent::Object(Err(e)) => {
                    log::debug!("Object details unavailable: {}", e);
                }
            }
        }
    }

    fn install_catalog(&mut self, catalog: Catalog) {
        self.catalog_loading = false;
        self.catalog_advisory = None;
        self.filter_panel.refresh_choices(&catalog);
        self.propagator.load_catalog(&catalog);
        if !self.stats_from_service {
            self.stats = StatusCounts::from_objects(catalog.objects.iter().map(|o| o.as_ref()));
        }
        self.catalog = catalog;
        self.recompute();
    }

    /// Filter, propagate and hand the positioned working set to the scene
    fn recompute(&mut self) {
        self.working_set = self.filter_panel.filter.apply(&self.catalog);
        self.generation += 1;

        let objects = self
            .propagator
            .propagate_working_set(&self.working_set, self.config.scene.marker_cap);
        let pass = WorkingSetPass {
            generation: self.generation,
            objects,
        };

        match self.scene.update_markers(&self.scene_ctx, pass) {
            Ok(MarkerUpdate::Applied { markers }) => log::debug!(
                "Working set {} -> {} markers (pass {})",
                self.working_set.len(),
                markers,
                self.generation
            ),
            Ok(_) => {}
            Err(e) => log::debug!("Marker update skipped: {}", e),
        }
        self.last_refresh = Instant::now();
    }

    fn update_paths(&mut self) {
        if let Err(e) = self.scene.update_paths(
            &self.scene_ctx,
            &self.view_controls.visible_classes,
            &self.launches,
        ) {
            log::debug!("Path update skipped: {}", e);
        }
    }

    /// Fetch the catalog again; a response to an earlier request that lands
    /// afterwards is dropped by the worker
    fn reload_catalog(&mut self) {
        log::info!("Reloading catalog from {}", self.fetcher.source());
        self.catalog_advisory = None;
        self.catalog_loading = true;
        self.fetcher.request_catalog(CatalogQuery::default());
        self.fetcher.request_statistics();
        self.fetcher.request_launches();
    }

    fn maybe_refresh(&mut self) {
        if self.view_controls.take_reload_request() {
            self.reload_catalog();
        }

        let due = self
            .view_controls
            .refresh_interval()
            .map(|interval| self.last_refresh.elapsed() >= interval)
            .unwrap_or(false);

        if self.view_controls.take_sync_request() || due {
            self.propagator.sync_to_now();
            if !self.catalog.is_empty() {
                self.recompute();
            } else {
                self.last_refresh = Instant::now();
            }
            self.fetcher.request_statistics();
        }
    }

    fn select(&mut self, selection: Option<u32>) {
        if self.scene_ctx.selection == selection {
            return;
        }
        self.scene_ctx.selection = selection;
        self.selected_detail = None;
        if let Some(norad_id) = selection {
            self.fetcher.request_object(norad_id);
        }
    }

    fn handle_viewport_input(&mut self, response: &egui::Response, ctx: &egui::Context) {
        if response.dragged_by(egui::PointerButton::Primary) {
            let delta = response.drag_delta();
            if let Err(e) = self.scene.drag(Vec2::new(delta.x, delta.y)) {
                log::trace!("{}", e);
            }
        }

        if response.hovered() {
            let scroll = ctx.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                if let Err(e) = self.scene.zoom(scroll * SCROLL_ZOOM_SCALE) {
                    log::trace!("{}", e);
                }
            }
        }

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let rect = response.rect;
                let ndc = Vec2::new(
                    (pos.x - rect.left()) / rect.width() * 2.0 - 1.0,
                    1.0 - (pos.y - rect.top()) / rect.height() * 2.0,
                );
                match self.scene.pick(&self.scene_ctx, ndc) {
                    Ok(Some(SceneEvent::SelectionChanged(norad_id))) => self.select(Some(norad_id)),
                    Ok(None) => {}
                    Err(e) => log::trace!("{}", e),
                }
            }
        }
    }

    fn render_3d_viewport(&mut self, ui: &mut egui::Ui) {
        let viewport_rect = ui.available_rect_before_wrap();
        let pixels_per_point = ui.ctx().pixels_per_point();
        let viewport_width = (viewport_rect.width() * pixels_per_point).round().max(1.0) as u32;
        let viewport_height = (viewport_rect.height() * pixels_per_point).round().max(1.0) as u32;

        let (response, painter) =
            ui.allocate_painter(viewport_rect.size(), egui::Sense::click_and_drag());

        self.handle_viewport_input(&response, ui.ctx());
        self.scene_ctx.aspect_ratio = viewport_rect.width() / viewport_rect.height().max(1.0);
        self.scene_ctx.auto_rotate = self.view_controls.auto_rotate;

        if let Err(e) = self.scene.tick(&self.scene_ctx, Instant::now()) {
            log::trace!("{}", e);
        }

        painter.add(egui_wgpu::Callback::new_paint_callback(
            response.rect,
            SceneCallback {
                viewport_size: (viewport_width, viewport_height),
            },
        ));

        self.draw_viewport_overlay(&painter, response.rect);
    }

    fn draw_viewport_overlay(&self, painter: &egui::Painter, rect: egui::Rect) {
        let camera = self.scene.camera();
        painter.text(
            rect.left_top() + egui::vec2(10.0, 10.0),
            egui::Align2::LEFT_TOP,
            format!(
                "Camera: dist={:.1} az={:.1}° el={:.1}°\n\
                 Drag to orbit | Scroll to zoom | Click a marker to select\n\
                 FPS: {:.0} | Markers: {}",
                camera.distance,
                camera.azimuth.to_degrees(),
                camera.elevation.to_degrees(),
                1.0 / self.last_frame_delta.max(0.001),
                self.scene.marker_count(),
            ),
            egui::FontId::monospace(12.0),
            egui::Color32::from_rgb(150, 150, 150),
        );

        let legend_x = rect.right() - 130.0;
        let legend_y = rect.top() + 20.0;
        for (i, (label, color)) in [
            ("Active", renderer::ACTIVE_GREEN),
            ("Inactive", renderer::INACTIVE_SLATE),
            ("Debris / R/B", renderer::WARNING_ORANGE),
            ("Unknown", renderer::NEUTRAL_GRAY),
        ]
        .iter()
        .enumerate()
        {
            let y = legend_y + i as f32 * 18.0;
            painter.circle_filled(
                egui::pos2(legend_x, y),
                5.0,
                egui::Color32::from_rgb(
                    (color[0] * 255.0) as u8,
                    (color[1] * 255.0) as u8,
                    (color[2] * 255.0) as u8,
                ),
            );
            painter.text(
                egui::pos2(legend_x + 12.0, y),
                egui::Align2::LEFT_CENTER,
                *label,
                egui::FontId::proportional(11.0),
                egui::Color32::from_rgb(180, 180, 180),
            );
        }

        let mut advisories = Vec::new();
        if self.catalog_loading {
            advisories.push(format!("Loading catalog from {}...", self.fetcher.source()));
        }
        advisories.extend(self.catalog_advisory.iter().cloned());
        advisories.extend(self.stats_advisory.iter().cloned());
        if !self.catalog_loading && self.catalog_advisory.is_none() && self.working_set.is_empty() {
            advisories.push("No objects match the current filter".to_string());
        }
        draw_advisories(painter, rect, &advisories);
    }

    fn show_details(&mut self, ctx: &egui::Context) {
        let Some(norad_id) = self.scene_ctx.selection else {
            return;
        };
        let object = match &self.selected_detail {
            Some(detail) => Some(detail.clone()),
            None => self.catalog.get(norad_id).map(|o| o.as_ref().clone()),
        };
        let Some(object) = object else {
            return;
        };
        let state = self.propagator.propagate(norad_id).ok();

        let mut event = None;
        egui::SidePanel::right("right_panel")
            .default_width(320.0)
            .show(ctx, |ui| {
                event = DetailPanel::show(ui, &object, state.as_ref());
            });

        if event == Some(PanelEvent::ClearSelection) {
            self.select(None);
        }
    }
}

impl eframe::App for OrbitViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.last_frame_delta = (now - self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;

        self.poll_fetches();
        self.maybe_refresh();

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("OrbitView");
                ui.separator();
                if ui.button("Settings").clicked() {
                    self.show_settings_window = true;
                }
                ui.separator();
                self.view_controls
                    .show_top_bar(ui, &self.propagator.format_time());
                ui.separator();
                ui.label(format!(
                    "Catalog: {} | Working set: {} | Markers: {}",
                    self.catalog.len(),
                    self.working_set.len(),
                    self.scene.marker_count()
                ));
                if self.scene.state() == SceneState::Ready {
                    ui.separator();
                    ui.label(egui::RichText::new("GPU").color(egui::Color32::GREEN));
                }
            });
        });

        let mut classes_changed = false;
        if self.show_settings_window {
            let mut open = true;
            egui::Window::new("Settings")
                .open(&mut open)
                .resizable(true)
                .show(ctx, |ui| {
                    classes_changed = self.view_controls.show_settings(ui);
                });
            self.show_settings_window = open;
        }
        if classes_changed {
            self.update_paths();
        }

        let mut filter_changed = false;
        let mut browser_selection = None;
        egui::SidePanel::left("left_panel")
            .default_width(300.0)
            .show(ctx, |ui| {
                StatsPanel::show(ui, &self.stats, self.stats_from_service);
                ui.separator();
                filter_changed = self.filter_panel.show(ui);
                ui.separator();
                browser_selection =
                    self.browser_panel
                        .show(ui, &self.working_set, self.scene_ctx.selection);
            });
        if filter_changed {
            self.recompute();
        }
        if browser_selection.is_some() {
            self.select(browser_selection);
        }

        self.show_details(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.render_3d_viewport(ui));

        let frame_delay = 1.0 / self.view_controls.max_fps.clamp(20.0, 240.0);
        ctx.request_repaint_after(std::time::Duration::from_secs_f32(frame_delay));
    }
}

impl Drop for OrbitViewApp {
    fn drop(&mut self) {
        if self.scene.state() == SceneState::Ready {
            if let Err(e) = self.scene.dispose() {
                log::warn!("{}", e);
            }
        }
    }
}

fn run_viewer(config: ViewerConfig) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1600.0, 900.0])
            .with_title("OrbitView"),
        renderer: eframe::Renderer::Wgpu,
        ..Default::default()
    };

    eframe::run_native(
        "OrbitView",
        options,
        Box::new(move |cc| match OrbitViewApp::new(cc, config) {
            Ok(app) => Ok(Box::new(app)),
            Err(e) => {
                log::error!("Failed to initialize app: {}", e);
                Err(e.into())
            }
        }),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {}", e))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().into_command() {
        Command::View(args) => {
            log::info!("Starting OrbitView...");
            run_viewer(ViewerConfig::from_args(args)?)
        }
        Command::Snapshot(args) => snapshot::run_snapshot(args),
    }
}
