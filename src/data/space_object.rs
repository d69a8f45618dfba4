//! Catalog object data structures matching the catalog service JSON schema

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::propagation::EARTH_RADIUS_KM;

const MU_EARTH_KM3_S2: f64 = 398600.4418;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// An immutable snapshot of the object catalog.
///
/// Objects are shared behind `Arc` so the filter engine, the propagator and the
/// scene markers can all hold the same record without copying it. A reload
/// replaces the whole catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub objects: Vec<Arc<CatalogObject>>,
    /// Where the snapshot came from (file path or service URL)
    pub source: String,
}

impl Catalog {
    pub fn new(objects: Vec<CatalogObject>, source: impl Into<String>) -> Self {
        Self {
            objects: objects.into_iter().map(Arc::new).collect(),
            source: source.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, norad_id: u32) -> Option<&Arc<CatalogObject>> {
        self.objects.iter().find(|obj| obj.norad_id == norad_id)
    }
}

/// A single orbiting object (satellite, debris, rocket body, etc.)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogObject {
    pub norad_id: u32,
    #[serde(default)]
    pub intl_designator: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tle: Option<TleData>,

    #[serde(default)]
    pub apogee_km: Option<f64>,
    #[serde(default)]
    pub perigee_km: Option<f64>,
    #[serde(default)]
    pub inclination_deg: Option<f64>,
    #[serde(default)]
    pub kind: Option<ObjectKind>,
    #[serde(default)]
    pub constellation: Option<String>,
    #[serde(default)]
    pub status: Option<ObjectStatus>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub launch_date: Option<String>,
}

/// Two-Line Element set data for orbit propagation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TleData {
    pub line1: String,
    pub line2: String,
    #[serde(default)]
    pub epoch: Option<String>,
}

/// Object classification as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectKind {
    Satellite,
    Debris,
    RocketBody,
    Telescope,
    LaunchSite,
    Other(String),
}

impl From<String> for ObjectKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "satellite" => Self::Satellite,
            "debris" => Self::Debris,
            "rocket_body" => Self::RocketBody,
            "telescope" => Self::Telescope,
            "launch_site" => Self::LaunchSite,
            _ => Self::Other(value),
        }
    }
}

impl From<ObjectKind> for String {
    fn from(value: ObjectKind) -> Self {
        value.as_str().to_string()
    }
}

impl ObjectKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Satellite => "satellite",
            Self::Debris => "debris",
            Self::RocketBody => "rocket_body",
            Self::Telescope => "telescope",
            Self::LaunchSite => "launch_site",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational status as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectStatus {
    Active,
    Inactive,
    Debris,
    Other(String),
}

impl From<String> for ObjectStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            "debris" => Self::Debris,
            _ => Self::Other(value),
        }
    }
}

impl From<ObjectStatus> for String {
    fn from(value: ObjectStatus) -> Self {
        value.as_str().to_string()
    }
}

impl ObjectStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Debris => "debris",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for ObjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CatalogObject {
    /// Minimal record with only an identifier, used by tests and fixtures.
    pub fn bare(norad_id: u32) -> Self {
        Self {
            norad_id,
            intl_designator: None,
            name: None,
            tle: None,
            apogee_km: None,
            perigee_km: None,
            inclination_deg: None,
            kind: None,
            constellation: None,
            status: None,
            country: None,
            launch_date: None,
        }
    }

    /// Get display name (falls back to NORAD ID if no name)
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("NORAD {}", self.norad_id))
    }

    /// Check if this object carries an element set at all
    pub fn has_tle(&self) -> bool {
        self.tle.is_some()
    }

    /// Fill perigee/apogee/inclination from the element set when the catalog
    /// left them out. Returns true if anything was filled in.
    pub fn enrich_from_tle(&mut self) -> bool {
        if self.perigee_km.is_some() && self.apogee_km.is_some() && self.inclination_deg.is_some()
        {
            return false;
        }
        let Some(tle) = self.tle.as_ref() else {
            return false;
        };
        let Ok(parsed) = satkit::TLE::load_2line(&tle.line1, &tle.line2) else {
            return false;
        };

        let mut changed = false;
        if let Some((perigee, apogee)) =
            perigee_apogee_km(parsed.mean_motion, parsed.eccen)
        {
            if self.perigee_km.is_none() {
                self.perigee_km = Some(perigee);
                changed = true;
            }
            if self.apogee_km.is_none() {
                self.apogee_km = Some(apogee);
                changed = true;
            }
        }
        if self.inclination_deg.is_none() && parsed.inclination.is_finite() {
            self.inclination_deg = Some(parsed.inclination);
            changed = true;
        }
        changed
    }
}

/// Perigee/apogee altitude (km above the mean Earth radius) from mean motion in
/// revolutions per day and eccentricity.
pub fn perigee_apogee_km(mean_motion_rev_day: f64, eccen: f64) -> Option<(f64, f64)> {
    if !mean_motion_rev_day.is_finite() || !eccen.is_finite() {
        return None;
    }
    if mean_motion_rev_day <= 0.0 || !(0.0..1.0).contains(&eccen) {
        return None;
    }

    let n_rad_s = mean_motion_rev_day * (2.0 * std::f64::consts::PI) / SECONDS_PER_DAY;
    let a_km = (MU_EARTH_KM3_S2 / (n_rad_s * n_rad_s)).cbrt();
    if !a_km.is_finite() {
        return None;
    }

    let perigee_km = a_km * (1.0 - eccen) - EARTH_RADIUS_KM;
    let apogee_km = a_km * (1.0 + eccen) - EARTH_RADIUS_KM;
    Some((perigee_km, apogee_km))
}
