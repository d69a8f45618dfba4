//! Scene manager: owns Earth, the starfield, orbit paths and markers, and
//! every resource they hold
//!
//! The manager walks `Uninitialized -> Ready -> Disposed`. Operations check
//! the state and return [`SceneError::InvalidState`] instead of panicking, so
//! a late fetch result arriving after shutdown is harmless.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use glam::{Vec2, Vec3};

use super::camera::{Camera, OrbitControls};
use super::earth::EARTH_FALLBACK_COLOR;
use super::markers::{path_segments, MarkerInstance, OrbitVertex};
use super::picking::{pick_nearest, MARKER_PICK_RADIUS};
use super::resources::{ResourceHandle, ResourceKind, ResourceOwner, ResourceRegistry};
use super::scheduler::{FrameScheduler, FrameTick};
use super::starfield::{
    generate_starfield, StarVertex, DEFAULT_STAR_COUNT, DEFAULT_STAR_EXTENT, DEFAULT_STAR_SEED,
};
use super::surface::RenderSurface;
use super::textures::{TextureData, TextureLoader, TextureStatus};
use crate::data::CatalogObject;
use crate::propagation::{OrbitClass, OrbitPath, OrbitPathCache, PositionedObject, DEFAULT_PATH_POINTS};

pub const DEFAULT_MARKER_CAP: usize = 5000;
const AMBIENT_LIGHT: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    Uninitialized,
    Ready,
    Disposed,
}

impl fmt::Display for SceneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Ready => write!(f, "ready"),
            Self::Disposed => write!(f, "disposed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneError {
    /// Operation not allowed in the current lifecycle state
    InvalidState {
        operation: &'static str,
        state: SceneState,
    },
    /// The host surface rejected a frame
    Surface(String),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState { operation, state } => {
                write!(f, "Cannot {} while scene is {}", operation, state)
            }
            Self::Surface(message) => write!(f, "Render surface error: {}", message),
        }
    }
}

impl std::error::Error for SceneError {}

/// Which entity kinds the manager maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RenderableKind {
    Paths,
    Markers,
    #[default]
    Both,
}

impl RenderableKind {
    pub fn paths(&self) -> bool {
        matches!(self, Self::Paths | Self::Both)
    }

    pub fn markers(&self) -> bool {
        matches!(self, Self::Markers | Self::Both)
    }
}

#[derive(Debug, Clone)]
pub struct SceneConfig {
    /// Most markers materialized per pass
    pub marker_cap: usize,
    /// Points per generated orbit ring
    pub path_points: usize,
    pub star_count: usize,
    pub star_extent: f32,
    pub star_seed: u64,
    pub renderable: RenderableKind,
    /// Earth surface image; `None` keeps the flat color
    pub earth_texture: Option<PathBuf>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            marker_cap: DEFAULT_MARKER_CAP,
            path_points: DEFAULT_PATH_POINTS,
            star_count: DEFAULT_STAR_COUNT,
            star_extent: DEFAULT_STAR_EXTENT,
            star_seed: DEFAULT_STAR_SEED,
            renderable: RenderableKind::Both,
            earth_texture: None,
        }
    }
}

/// Host inputs passed to every manager operation
#[derive(Debug, Clone, Copy)]
pub struct SceneContext {
    pub aspect_ratio: f32,
    pub selection: Option<u32>,
    pub auto_rotate: bool,
}

impl Default for SceneContext {
    fn default() -> Self {
        Self {
            aspect_ratio: 16.0 / 9.0,
            selection: None,
            auto_rotate: false,
        }
    }
}

/// Positioned working set produced by one recompute
#[derive(Debug, Clone)]
pub struct WorkingSetPass {
    pub generation: u64,
    pub objects: Vec<PositionedObject>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerUpdate {
    Applied { markers: usize },
    /// Older than the last applied generation; discarded
    Stale,
    /// Markers are not a maintained renderable kind
    Disabled,
}

/// Emitted by the scene view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    SelectionChanged(u32),
}

/// Snapshot handed to the render surface each tick
#[derive(Clone)]
pub struct SceneFrame {
    pub camera: Camera,
    pub aspect_ratio: f32,
    pub sun_direction: Vec3,
    pub ambient: f32,
    pub earth_color: [f32; 4],
    pub earth_texture: Option<Arc<TextureData>>,
    pub stars: Arc<Vec<StarVertex>>,
    pub markers: Arc<Vec<MarkerInstance>>,
    pub paths: Arc<Vec<OrbitVertex>>,
}

struct EarthEntity {
    texture: Option<ResourceHandle>,
    loader: Option<TextureLoader>,
    texture_data: Option<Arc<TextureData>>,
}

struct MarkerEntity {
    object: Arc<CatalogObject>,
    position: Vec3,
}

struct PathEntity {
    path: OrbitPath,
}

/// Everything the per-frame callback touches
pub struct SceneGraph {
    camera: Camera,
    controls: OrbitControls,
    sun_direction: Vec3,
    registry: ResourceRegistry,
    surface: Option<Box<dyn RenderSurface>>,
    earth: Option<EarthEntity>,
    stars: Arc<Vec<StarVertex>>,
    markers: Vec<MarkerEntity>,
    marker_index: HashMap<u32, usize>,
    paths: BTreeMap<OrbitClass, PathEntity>,
    selection: Option<u32>,
    marker_instances: Arc<Vec<MarkerInstance>>,
    path_vertices: Arc<Vec<OrbitVertex>>,
    surface_failed: bool,
}

impl SceneGraph {
    fn new() -> Self {
        Self {
            camera: Camera::default(),
            controls: OrbitControls::default(),
            sun_direction: Vec3::new(1.0, 0.3, 0.5).normalize(),
            registry: ResourceRegistry::new(),
            surface: None,
            earth: None,
            stars: Arc::new(Vec::new()),
            markers: Vec::new(),
            marker_index: HashMap::new(),
            paths: BTreeMap::new(),
            selection: None,
            marker_instances: Arc::new(Vec::new()),
            path_vertices: Arc::new(Vec::new()),
            surface_failed: false,
        }
    }

    /// Allocate one geometry and one material for an entity
    fn allocate_pair(&mut self, owner: ResourceOwner) {
        self.registry.allocate(ResourceKind::Geometry, owner.clone());
        self.registry.allocate(ResourceKind::Material, owner);
    }

    fn rebuild_marker_instances(&mut self) {
        let selection = self.selection;
        self.marker_instances = Arc::new(
            self.markers
                .iter()
                .map(|m| MarkerInstance::new(m.position, &m.object, selection == Some(m.object.norad_id)))
                .collect(),
        );
    }

    fn rebuild_path_vertices(&mut self) {
        self.path_vertices = Arc::new(
            self.paths
                .values()
                .flat_map(|entity| path_segments(&entity.path))
                .collect(),
        );
    }

    fn clear_markers(&mut self) -> usize {
        let mut released = 0;
        for marker in self.markers.drain(..) {
            released += self
                .registry
                .release_owner(&ResourceOwner::Marker(marker.object.norad_id));
        }
        self.marker_index.clear();
        released
    }

    fn earth_color(&self) -> [f32; 4] {
        EARTH_FALLBACK_COLOR
    }

    fn frame(&self, ctx: &SceneContext) -> SceneFrame {
        SceneFrame {
            camera: self.camera.clone(),
            aspect_ratio: ctx.aspect_ratio,
            sun_direction: self.sun_direction,
            ambient: AMBIENT_LIGHT,
            earth_color: self.earth_color(),
            earth_texture: self.earth.as_ref().and_then(|e| e.texture_data.clone()),
            stars: Arc::clone(&self.stars),
            markers: Arc::clone(&self.marker_instances),
            paths: Arc::clone(&self.path_vertices),
        }
    }

    fn poll_texture(&mut self) {
        let Some(earth) = self.earth.as_mut() else {
            return;
        };
        let Some(loader) = earth.loader.as_mut() else {
            return;
        };
        if !loader.poll() {
            return;
        }

        if let TextureStatus::Ready(texture) = loader.status() {
            earth.texture_data = Some(Arc::clone(texture));
            earth.texture = Some(
                self.registry
                    .allocate(ResourceKind::Texture, ResourceOwner::Earth),
            );
        }
        // Settled either way; a failed load is never retried
        earth.loader = None;
    }
}

/// Per-frame work bound to the scheduler
fn run_frame(graph: &mut SceneGraph, ctx: &SceneContext, tick: FrameTick) {
    graph.poll_texture();

    graph.controls.auto_rotate = ctx.auto_rotate;
    graph.controls.update(&mut graph.camera, tick.dt);

    if graph.selection != ctx.selection {
        graph.selection = ctx.selection;
        graph.rebuild_marker_instances();
    }

    let frame = graph.frame(ctx);
    if let Some(surface) = graph.surface.as_mut() {
        match surface.present(&frame) {
            Ok(()) => graph.surface_failed = false,
            Err(e) => {
                if !graph.surface_failed {
                    log::warn!("{}", e);
                }
                graph.surface_failed = true;
            }
        }
    }
}

pub struct SceneManager {
    config: SceneConfig,
    state: SceneState,
    graph: SceneGraph,
    scheduler: FrameScheduler<SceneGraph, SceneContext>,
    path_cache: OrbitPathCache,
    last_generation: Option<u64>,
    /// Effective class set and launch counts of the last path update
    applied_paths: Option<(BTreeSet<OrbitClass>, BTreeMap<OrbitClass, usize>)>,
}

impl SceneManager {
    pub fn new(config: SceneConfig) -> Self {
        let path_cache = OrbitPathCache::new(config.path_points);
        Self {
            config,
            state: SceneState::Uninitialized,
            graph: SceneGraph::new(),
            scheduler: FrameScheduler::new(run_frame),
            path_cache,
            last_generation: None,
            applied_paths: None,
        }
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    fn require_ready(&self, operation: &'static str) -> Result<(), SceneError> {
        if self.state == SceneState::Ready {
            Ok(())
        } else {
            Err(SceneError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Build the static scene, bind the surface and start the frame loop
    pub fn mount(
        &mut self,
        ctx: &SceneContext,
        surface: Box<dyn RenderSurface>,
    ) -> Result<(), SceneError> {
        if self.state != SceneState::Uninitialized {
            return Err(SceneError::InvalidState {
                operation: "mount",
                state: self.state,
            });
        }

        let graph = &mut self.graph;
        graph.surface = Some(surface);
        graph.registry.allocate(ResourceKind::Surface, ResourceOwner::Surface);
        graph.selection = ctx.selection;
        graph.controls.auto_rotate = ctx.auto_rotate;

        graph.stars = Arc::new(generate_starfield(
            self.config.star_count,
            self.config.star_extent,
            self.config.star_seed,
        ));
        graph.allocate_pair(ResourceOwner::Starfield);

        graph.allocate_pair(ResourceOwner::Earth);
        graph.earth = Some(EarthEntity {
            texture: None,
            loader: self.config.earth_texture.as_ref().map(TextureLoader::spawn),
            texture_data: None,
        });

        self.state = SceneState::Ready;
        self.scheduler.start();
        log::info!(
            "Scene mounted ({} stars, marker cap {}, renderables {:?})",
            graph.stars.len(),
            self.config.marker_cap,
            self.config.renderable
        );
        Ok(())
    }

    /// Replace every marker with the positioned objects of a pass
    pub fn update_markers(
        &mut self,
        ctx: &SceneContext,
        pass: WorkingSetPass,
    ) -> Result<MarkerUpdate, SceneError> {
        self.require_ready("update markers")?;
        if !self.config.renderable.markers() {
            return Ok(MarkerUpdate::Disabled);
        }
        if let Some(last) = self.last_generation {
            if pass.generation < last {
                log::debug!(
                    "Discarding stale pass {} (last applied {})",
                    pass.generation,
                    last
                );
                return Ok(MarkerUpdate::Stale);
            }
        }
        self.last_generation = Some(pass.generation);

        let graph = &mut self.graph;
        let released = graph.clear_markers();

        for positioned in pass.objects {
            if graph.markers.len() >= self.config.marker_cap {
                break;
            }
            let id = positioned.object.norad_id;
            if graph.marker_index.contains_key(&id) {
                continue;
            }
            graph.allocate_pair(ResourceOwner::Marker(id));
            graph.marker_index.insert(id, graph.markers.len());
            graph.markers.push(MarkerEntity {
                object: positioned.object,
                position: positioned.state.position,
            });
        }

        graph.selection = ctx.selection;
        graph.rebuild_marker_instances();
        log::debug!(
            "Pass {}: released {} marker resources, {} markers live",
            pass.generation,
            released,
            graph.markers.len()
        );
        Ok(MarkerUpdate::Applied {
            markers: graph.markers.len(),
        })
    }

    /// Show rings for the visible classes (empty means all known classes).
    /// Returns whether anything changed.
    pub fn update_paths(
        &mut self,
        _ctx: &SceneContext,
        visible: &BTreeSet<OrbitClass>,
        launch_counts: &BTreeMap<OrbitClass, usize>,
    ) -> Result<bool, SceneError> {
        self.require_ready("update paths")?;
        if !self.config.renderable.paths() {
            return Ok(false);
        }

        let effective: BTreeSet<OrbitClass> = if visible.is_empty() {
            OrbitClass::known().iter().cloned().collect()
        } else {
            visible.clone()
        };
        let launches: BTreeMap<OrbitClass, usize> = launch_counts
            .iter()
            .filter(|(class, _)| effective.contains(*class))
            .map(|(class, count)| (class.clone(), *count))
            .collect();

        if let Some((classes, counts)) = &self.applied_paths {
            if *classes == effective && *counts == launches {
                return Ok(false);
            }
        }

        let graph = &mut self.graph;
        let stale: Vec<OrbitClass> = graph
            .paths
            .keys()
            .filter(|class| !effective.contains(*class))
            .cloned()
            .collect();
        for class in stale {
            graph.paths.remove(&class);
            graph.registry.release_owner(&ResourceOwner::OrbitPath(class));
        }

        for class in &effective {
            let launch_count = launches.get(class).copied().unwrap_or(0);
            if let Some(entity) = graph.paths.get_mut(class) {
                entity.path.launch_count = launch_count;
                continue;
            }
            let path = self.path_cache.path(class, None, launch_count);
            graph.allocate_pair(ResourceOwner::OrbitPath(class.clone()));
            graph.paths.insert(class.clone(), PathEntity { path });
        }

        graph.rebuild_path_vertices();
        log::debug!("Showing {} orbit paths", graph.paths.len());
        self.applied_paths = Some((effective, launches));
        Ok(true)
    }

    /// Run one frame of the scheduler
    pub fn tick(&mut self, ctx: &SceneContext, now: Instant) -> Result<bool, SceneError> {
        self.require_ready("tick")?;
        Ok(self.scheduler.tick(&mut self.graph, ctx, now))
    }

    /// Feed a pointer drag (pixels) into the orbit controls
    pub fn drag(&mut self, delta: Vec2) -> Result<(), SceneError> {
        self.require_ready("drag")?;
        self.graph.controls.drag(delta);
        Ok(())
    }

    pub fn zoom(&mut self, delta: f32) -> Result<(), SceneError> {
        self.require_ready("zoom")?;
        self.graph.camera.zoom(delta);
        Ok(())
    }

    /// Nearest marker under the pointer. A miss yields no event and leaves the
    /// selection to the caller unchanged.
    pub fn pick(&self, ctx: &SceneContext, ndc: Vec2) -> Result<Option<SceneEvent>, SceneError> {
        self.require_ready("pick")?;
        let ray = self.graph.camera.ray_from_ndc(ndc, ctx.aspect_ratio);
        let hit = pick_nearest(
            &ray,
            self.graph
                .markers
                .iter()
                .map(|m| (m.object.norad_id, m.position)),
            MARKER_PICK_RADIUS,
        );
        Ok(hit.map(SceneEvent::SelectionChanged))
    }

    /// Release every resource and the surface, stop the loop. Terminal.
    pub fn dispose(&mut self) -> Result<(), SceneError> {
        if self.state != SceneState::Ready {
            return Err(SceneError::InvalidState {
                operation: "dispose",
                state: self.state,
            });
        }

        self.scheduler.stop();
        let graph = &mut self.graph;
        graph.clear_markers();
        graph.paths.clear();
        graph.earth = None;
        graph.stars = Arc::new(Vec::new());
        graph.marker_instances = Arc::new(Vec::new());
        graph.path_vertices = Arc::new(Vec::new());
        if let Some(mut surface) = graph.surface.take() {
            surface.release();
        }
        let released = graph.registry.release_all();

        self.state = SceneState::Disposed;
        log::info!("Scene disposed ({} resources released)", released);
        Ok(())
    }

    pub fn marker_count(&self) -> usize {
        self.graph.markers.len()
    }

    pub fn marker_position(&self, norad_id: u32) -> Option<Vec3> {
        self.graph
            .marker_index
            .get(&norad_id)
            .map(|&i| self.graph.markers[i].position)
    }

    pub fn path_classes(&self) -> Vec<OrbitClass> {
        self.graph.paths.keys().cloned().collect()
    }

    pub fn live_resource_count(&self) -> usize {
        self.graph.registry.live_count()
    }

    pub fn live_marker_count(&self) -> usize {
        self.graph.registry.live_marker_owners()
    }

    pub fn has_earth_texture(&self) -> bool {
        self.graph
            .earth
            .as_ref()
            .map(|e| e.texture.is_some())
            .unwrap_or(false)
    }

    /// Whether a texture load is still outstanding
    pub fn earth_texture_pending(&self) -> bool {
        self.graph
            .earth
            .as_ref()
            .map(|e| e.loader.is_some())
            .unwrap_or(false)
    }

    pub fn camera(&self) -> &Camera {
        &self.graph.camera
    }
}

impl Drop for SceneManager {
    fn drop(&mut self) {
        if self.state == SceneState::Ready {
            let _ = self.dispose();
        }
    }
}
