//! Command-line configuration

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

use crate::data::{AltitudeBand, CatalogSource, FilterState, ObjectStatus};
use crate::propagation::DEFAULT_PATH_POINTS;
use crate::renderer::{
    RenderableKind, SceneConfig, DEFAULT_MARKER_CAP, DEFAULT_STAR_COUNT, DEFAULT_STAR_EXTENT,
    DEFAULT_STAR_SEED,
};

pub const DEFAULT_CATALOG: &str = "data/catalog.json";
pub const DEFAULT_EARTH_TEXTURE: &str = "assets/2k_earth_daymap.jpg";

#[derive(Parser, Debug)]
#[command(name = "orbitview", version, about)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the 3D viewer (default)
    View(ViewArgs),
    /// Propagate the filtered catalog once and write positions as JSON
    Snapshot(SnapshotArgs),
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::View(self.view))
    }
}

/// Working-set filter given on the command line
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Case-insensitive substring of name or NORAD ID
    #[arg(long)]
    pub search: Option<String>,
    /// Perigee band: ALL, LEO, MEO or GEO
    #[arg(long, default_value = "ALL", value_parser = parse_band)]
    pub band: AltitudeBand,
    /// Object type code (repeatable): SATELLITE, DEBRIS, TELESCOPE
    #[arg(long = "type")]
    pub types: Vec<String>,
    /// Constellation name (repeatable)
    #[arg(long = "constellation")]
    pub constellations: Vec<String>,
    /// Exact operational status
    #[arg(long)]
    pub status: Option<String>,
}

fn parse_band(value: &str) -> Result<AltitudeBand, String> {
    AltitudeBand::from_code(value).ok_or_else(|| format!("unknown altitude band '{}'", value))
}

impl FilterArgs {
    pub fn to_filter(&self) -> FilterState {
        FilterState {
            search: self.search.clone().unwrap_or_default(),
            band: self.band,
            constellations: self.constellations.iter().cloned().collect(),
            types: self.types.iter().map(|t| t.to_uppercase()).collect(),
            status: self.status.clone().map(ObjectStatus::from),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    /// Catalog file (.json / .json.gz) or catalog service base URL
    #[arg(long, default_value = DEFAULT_CATALOG)]
    pub source: String,
    /// Most markers shown at once
    #[arg(long, default_value_t = DEFAULT_MARKER_CAP)]
    pub marker_cap: usize,
    /// Points per orbit ring
    #[arg(long, default_value_t = DEFAULT_PATH_POINTS)]
    pub path_points: usize,
    #[arg(long, default_value_t = DEFAULT_STAR_COUNT)]
    pub star_count: usize,
    /// Half-width of the starfield cube in scene units
    #[arg(long, default_value_t = DEFAULT_STAR_EXTENT)]
    pub star_extent: f32,
    /// Which entities the viewer maintains
    #[arg(long, value_enum, default_value_t = RenderableKind::Both)]
    pub renderable: RenderableKind,
    #[arg(long)]
    pub auto_rotate: bool,
    /// Seconds between re-propagation passes (0 disables)
    #[arg(long, default_value_t = 30)]
    pub refresh_secs: u64,
    #[arg(long, default_value = DEFAULT_EARTH_TEXTURE)]
    pub earth_texture: PathBuf,

    #[command(flatten)]
    pub filter: FilterArgs,
}

impl Default for ViewArgs {
    fn default() -> Self {
        Self {
            source: DEFAULT_CATALOG.to_string(),
            marker_cap: DEFAULT_MARKER_CAP,
            path_points: DEFAULT_PATH_POINTS,
            star_count: DEFAULT_STAR_COUNT,
            star_extent: DEFAULT_STAR_EXTENT,
            renderable: RenderableKind::Both,
            auto_rotate: false,
            refresh_secs: 30,
            earth_texture: PathBuf::from(DEFAULT_EARTH_TEXTURE),
            filter: FilterArgs::default(),
        }
    }
}

/// Everything the viewer needs at startup
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub source: CatalogSource,
    pub scene: SceneConfig,
    pub auto_rotate: bool,
    pub refresh_secs: u64,
    pub initial_filter: FilterState,
}

impl ViewerConfig {
    pub fn from_args(args: ViewArgs) -> Result<Self> {
        if args.marker_cap == 0 {
            return Err(anyhow!("marker-cap must be > 0"));
        }
        if args.path_points < 3 {
            return Err(anyhow!("path-points must be at least 3"));
        }
        if !(args.star_extent.is_finite() && args.star_extent > 0.0) {
            return Err(anyhow!("star-extent must be a positive number"));
        }

        Ok(Self {
            source: CatalogSource::parse(&args.source),
            scene: SceneConfig {
                marker_cap: args.marker_cap,
                path_points: args.path_points,
                star_count: args.star_count,
                star_extent: args.star_extent,
                star_seed: DEFAULT_STAR_SEED,
                renderable: args.renderable,
                earth_texture: Some(args.earth_texture),
            },
            auto_rotate: args.auto_rotate,
            refresh_secs: args.refresh_secs,
            initial_filter: args.filter.to_filter(),
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct SnapshotArgs {
    /// Catalog file (.json / .json.gz) or catalog service base URL
    #[arg(long, default_value = DEFAULT_CATALOG)]
    pub source: String,
    /// Output JSON file path
    #[arg(long, default_value = "out/snapshot.json")]
    pub output: PathBuf,
    /// Propagation time (RFC 3339); defaults to now
    #[arg(long, value_parser = parse_time)]
    pub at: Option<DateTime<Utc>>,
    /// Most objects written
    #[arg(long, default_value_t = DEFAULT_MARKER_CAP)]
    pub cap: usize,

    #[command(flatten)]
    pub filter: FilterArgs,
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid time '{}': {}", value, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn view_config(args: &[&str]) -> ViewerConfig {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.into_command() {
            Command::View(view) => ViewerConfig::from_args(view).unwrap(),
            other => panic!("expected view, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let config = view_config(&["orbitview"]);
        assert_eq!(config.scene.marker_cap, 5000);
        assert_eq!(config.scene.path_points, 100);
        assert_eq!(config.scene.star_count, 4000);
        assert_eq!(config.scene.star_extent, 400.0);
        assert_eq!(config.scene.renderable, RenderableKind::Both);
        assert!(!config.auto_rotate);
        assert_eq!(config.refresh_secs, 30);
        assert_eq!(
            config.scene.earth_texture,
            Some(PathBuf::from("assets/2k_earth_daymap.jpg"))
        );
        assert!(config.initial_filter.is_pass_through());
        assert_eq!(config.source, CatalogSource::File(PathBuf::from(DEFAULT_CATALOG)));
    }

    #[test]
    fn test_view_flags_without_subcommand() {
        let config = view_config(&[
            "orbitview",
            "--source",
            "http://localhost:8080/api",
            "--renderable",
            "markers",
            "--auto-rotate",
            "--band",
            "meo",
            "--type",
            "debris",
        ]);
        assert_eq!(
            config.source,
            CatalogSource::Service("http://localhost:8080/api".into())
        );
        assert_eq!(config.scene.renderable, RenderableKind::Markers);
        assert!(config.auto_rotate);
        assert_eq!(config.initial_filter.band, AltitudeBand::Meo);
        assert!(config.initial_filter.types.contains("DEBRIS"));
    }

    #[test]
    fn test_zero_cap_rejected() {
        let cli = Cli::try_parse_from(["orbitview", "view", "--marker-cap", "0"]).unwrap();
        let Command::View(view) = cli.into_command() else {
            panic!("expected view");
        };
        assert!(ViewerConfig::from_args(view).is_err());
    }

    #[test]
    fn test_degenerate_star_extent_rejected() {
        for extent in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let view = ViewArgs {
                star_extent: extent,
                ..ViewArgs::default()
            };
            assert!(ViewerConfig::from_args(view).is_err(), "extent {}", extent);
        }
        let cli = Cli::try_parse_from(["orbitview", "--star-extent", "0"]).unwrap();
        let Command::View(view) = cli.into_command() else {
            panic!("expected view");
        };
        assert!(ViewerConfig::from_args(view).is_err());
    }

    #[test]
    fn test_bad_band_is_a_parse_error() {
        assert!(Cli::try_parse_from(["orbitview", "--band", "LUNAR"]).is_err());
    }

    #[test]
    fn test_snapshot_args() {
        let cli = Cli::try_parse_from([
            "orbitview",
            "snapshot",
            "--at",
            "2024-01-01T12:00:00Z",
            "--status",
            "active",
            "--cap",
            "10",
        ])
        .unwrap();
        let Command::Snapshot(args) = cli.into_command() else {
            panic!("expected snapshot");
        };
        assert_eq!(args.at, Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()));
        assert_eq!(args.cap, 10);
        assert_eq!(args.filter.to_filter().status, Some(ObjectStatus::Active));
        assert_eq!(args.output, PathBuf::from("out/snapshot.json"));
    }
}
