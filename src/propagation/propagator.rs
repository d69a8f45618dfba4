//! SGP4 propagation using satkit

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Timelike, Utc};
use glam::Vec3;
use satkit::frametransform;
use satkit::sgp4::{sgp4, SGP4Error};
use satkit::ITRFCoord;

use super::transform::earth_frame_km_to_scene;
use crate::data::{Catalog, CatalogObject, TleData};

/// Propagation result for a single object at one instant
#[derive(Debug, Clone, Copy)]
pub struct SatelliteState {
    /// Earth-fixed position in scene units
    pub position: Vec3,
    /// Inertial speed (km/s), for display
    pub speed_kms: f64,
    /// Height above the WGS84 ellipsoid (km), for display
    pub altitude_km: f64,
    /// Age of the element set in days
    pub tle_age_days: f64,
}

/// Why an object has no position at a given instant
#[derive(Debug, Clone, PartialEq)]
pub enum PropagationFailure {
    /// The catalog record carries no element set
    MissingElements,
    /// The element lines could not be parsed
    MalformedElements { message: String },
    /// SGP4 reported an error
    Numerical { message: String },
    /// SGP4 returned NaN or infinite coordinates
    NonFinite,
    /// The requested time has no satkit representation
    InvalidTime,
}

impl fmt::Display for PropagationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingElements => write!(f, "No element set"),
            Self::MalformedElements { message } => write!(f, "Malformed element set: {}", message),
            Self::Numerical { message } => write!(f, "SGP4 failed: {}", message),
            Self::NonFinite => write!(f, "SGP4 produced non-finite state"),
            Self::InvalidTime => write!(f, "Time out of range"),
        }
    }
}

impl std::error::Error for PropagationFailure {}

/// An object of the working set with its position for the current pass
#[derive(Debug, Clone)]
pub struct PositionedObject {
    pub object: Arc<CatalogObject>,
    pub state: SatelliteState,
}

/// Manages SGP4 propagation for the catalog
pub struct Propagator {
    /// Parsed element sets indexed by NORAD ID
    tles: HashMap<u32, satkit::TLE>,
    /// Time used by the next propagation pass
    current_time: DateTime<Utc>,
}

impl Propagator {
    pub fn new() -> Self {
        Self {
            tles: HashMap::new(),
            current_time: Utc::now(),
        }
    }

    /// Parse and cache element sets for every object in the catalog
    pub fn load_catalog(&mut self, catalog: &Catalog) {
        self.tles.clear();

        for obj in &catalog.objects {
            if let Some(tle_data) = &obj.tle {
                if let Ok(tle) = parse_tle(tle_data) {
                    self.tles.insert(obj.norad_id, tle);
                }
            }
        }

        log::info!(
            "Loaded {} of {} element sets for propagation",
            self.tles.len(),
            catalog.len()
        );
    }

    /// Get current propagation time
    pub fn current_time(&self) -> DateTime<Utc> {
        self.current_time
    }

    pub fn set_time(&mut self, time: DateTime<Utc>) {
        self.current_time = time;
    }

    /// Move the propagation time to the wall clock
    pub fn sync_to_now(&mut self) {
        self.current_time = Utc::now();
    }

    /// Format current time as string
    pub fn format_time(&self) -> String {
        format_time(self.current_time)
    }

    /// Propagate a cached object at the current time
    pub fn propagate(&self, norad_id: u32) -> Result<SatelliteState, PropagationFailure> {
        let tle = self
            .tles
            .get(&norad_id)
            .ok_or(PropagationFailure::MissingElements)?;
        propagate_tle(tle, self.current_time)
    }

    /// Propagate a working set, stopping once `cap` objects have a position.
    /// Failed objects are skipped for this pass only. A repeated id keeps its
    /// first occurrence.
    pub fn propagate_working_set(
        &self,
        objects: &[Arc<CatalogObject>],
        cap: usize,
    ) -> Vec<PositionedObject> {
        let mut positioned = Vec::with_capacity(objects.len().min(cap));
        let mut failures = 0usize;
        let mut seen = HashSet::new();

        for obj in objects {
            if positioned.len() >= cap {
                break;
            }
            if !seen.insert(obj.norad_id) {
                continue;
            }
            let result = match self.tles.get(&obj.norad_id) {
                Some(tle) => propagate_tle(tle, self.current_time),
                None => propagate_object(obj, self.current_time),
            };
            match result {
                Ok(state) => positioned.push(PositionedObject {
                    object: Arc::clone(obj),
                    state,
                }),
                Err(e) => {
                    failures += 1;
                    log::trace!("Skipping NORAD {}: {}", obj.norad_id, e);
                }
            }
        }

        log::debug!(
            "Propagated {} objects ({} failed, cap {})",
            positioned.len(),
            failures,
            cap
        );
        positioned
    }

    /// Get TLE count
    pub fn tle_count(&self) -> usize {
        self.tles.len()
    }
}

impl Default for Propagator {
    fn default() -> Self {
        Self::new()
    }
}

/// Propagate an object straight from its catalog record. Pure function of the
/// record and the instant; the element set is never modified.
pub fn propagate_object(
    obj: &CatalogObject,
    time: DateTime<Utc>,
) -> Result<SatelliteState, PropagationFailure> {
    let tle_data = obj.tle.as_ref().ok_or(PropagationFailure::MissingElements)?;
    let tle = parse_tle(tle_data)?;
    propagate_tle(&tle, time)
}

/// Run SGP4 and convert the TEME state into scene-space Earth-fixed position
pub fn propagate_tle(
    tle: &satkit::TLE,
    time: DateTime<Utc>,
) -> Result<SatelliteState, PropagationFailure> {
    let instant = instant_from_utc(time).ok_or(PropagationFailure::InvalidTime)?;

    let mut tle = tle.clone();
    let (pos, vel, errs) = sgp4(&mut tle, &[instant]);
    check_sgp4_status(&errs)?;

    // pos and vel are in TEME, meters and m/s
    let teme = satkit::types::Vec3::new(pos[(0, 0)], pos[(1, 0)], pos[(2, 0)]);
    let vel_ms = satkit::types::Vec3::new(vel[(0, 0)], vel[(1, 0)], vel[(2, 0)]);
    if teme.iter().chain(vel_ms.iter()).any(|v| !v.is_finite()) {
        return Err(PropagationFailure::NonFinite);
    }

    let itrf = frametransform::qteme2itrf(&instant) * teme;
    let altitude_km = ITRFCoord::from_slice(&[itrf.x, itrf.y, itrf.z])
        .map_err(|e| PropagationFailure::Numerical {
            message: e.to_string(),
        })?
        .hae()
        / 1000.0;

    let position = earth_frame_km_to_scene(itrf.x / 1000.0, itrf.y / 1000.0, itrf.z / 1000.0);
    if !position.is_finite() || !altitude_km.is_finite() {
        return Err(PropagationFailure::NonFinite);
    }

    let tle_age_days = (instant - tle.epoch).as_seconds() / 86400.0;

    Ok(SatelliteState {
        position,
        speed_kms: vel_ms.norm() / 1000.0,
        altitude_km,
        tle_age_days: tle_age_days.abs(),
    })
}

/// First entry of satkit's per-instant status list; anything but success
/// means SGP4 gave up on this element set
fn check_sgp4_status(errs: &[SGP4Error]) -> Result<(), PropagationFailure> {
    match errs.first() {
        None | Some(SGP4Error::SGP4Success) => Ok(()),
        Some(err) => Err(PropagationFailure::Numerical {
            message: err.to_string(),
        }),
    }
}

/// Parse TLE data into satkit TLE
fn parse_tle(tle_data: &TleData) -> Result<satkit::TLE, PropagationFailure> {
    satkit::TLE::load_2line(&tle_data.line1, &tle_data.line2).map_err(|e| {
        log::trace!("Failed to parse TLE: {}", e);
        PropagationFailure::MalformedElements {
            message: e.to_string(),
        }
    })
}

/// Convert a chrono UTC timestamp into a satkit instant
pub fn instant_from_utc(time: DateTime<Utc>) -> Option<satkit::Instant> {
    Some(satkit::Instant::from_datetime(
        time.year(),
        time.month() as i32,
        time.day() as i32,
        time.hour() as i32,
        time.minute() as i32,
        time.second() as f64 + time.nanosecond() as f64 * 1e-9,
    ))
}

/// Format a timestamp the way the status overlay shows it
pub fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{iss, ISS_LINE1, ISS_LINE2};
    use crate::propagation::transform::km_to_scene;
    use chrono::TimeZone;

    fn iss_tle() -> satkit::TLE {
        satkit::TLE::load_2line(ISS_LINE1, ISS_LINE2).unwrap()
    }

    /// Epoch of the ISS fixture (day 24001.5)
    fn iss_epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_propagate_iss_at_epoch() {
        let tle = iss_tle();
        let state = propagate_tle(&tle, iss_epoch()).unwrap();

        assert!(state.position.is_finite());
        assert!(state.altitude_km > 350.0 && state.altitude_km < 450.0, "alt {}", state.altitude_km);
        assert!((state.speed_kms - 7.66).abs() < 0.1, "speed {}", state.speed_kms);
        assert!(state.tle_age_days < 1e-6);

        // Scene radius is the physical radius through the shared factor
        let r = state.position.length() as f64;
        assert!(r > km_to_scene(6700.0) && r < km_to_scene(6850.0), "radius {}", r);
    }

    #[test]
    fn test_propagation_is_pure() {
        let obj = iss();
        let time = iss_epoch() + chrono::Duration::minutes(37);
        let a = propagate_object(&obj, time).unwrap();
        let b = propagate_object(&obj, time).unwrap();
        assert_eq!(a.position, b.position);
        assert_eq!(obj.tle.as_ref().unwrap().line1, ISS_LINE1);
    }

    #[test]
    fn test_missing_and_malformed_elements_fail() {
        let time = iss_epoch();
        let bare = CatalogObject::bare(1);
        assert_eq!(
            propagate_object(&bare, time).unwrap_err(),
            PropagationFailure::MissingElements
        );

        let mut broken = CatalogObject::bare(2);
        broken.tle = Some(TleData {
            line1: "1 garbage".into(),
            line2: "2 garbage".into(),
            epoch: None,
        });
        assert!(matches!(
            propagate_object(&broken, time),
            Err(PropagationFailure::MalformedElements { .. })
        ));
    }

    #[test]
    fn test_working_set_excludes_failures_and_respects_cap() {
        let catalog = Catalog::new(
            vec![iss(), CatalogObject::bare(1), {
                let mut twin = iss();
                twin.norad_id = 99999;
                twin
            }],
            "test",
        );
        let mut propagator = Propagator::new();
        propagator.load_catalog(&catalog);
        propagator.set_time(iss_epoch());
        assert_eq!(propagator.tle_count(), 2);

        let all = propagator.propagate_working_set(&catalog.objects, 10);
        let ids: Vec<u32> = all.iter().map(|p| p.object.norad_id).collect();
        assert_eq!(ids, vec![25544, 99999]);

        let capped = propagator.propagate_working_set(&catalog.objects, 1);
        assert_eq!(capped.len(), 1);

        // The failing object is still in the catalog
        assert!(catalog.get(1).is_some());
        assert!(propagator.propagate(1).is_err());
    }

    #[test]
    fn test_working_set_drops_repeated_ids() {
        let mut renamed = iss();
        renamed.name = Some("ISS (again)".into());
        let mut twin = iss();
        twin.norad_id = 99999;
        let objects: Vec<Arc<CatalogObject>> = vec![
            Arc::new(iss()),
            Arc::new(renamed),
            Arc::new(twin),
            Arc::new(iss()),
        ];
        let catalog = Catalog::new(vec![iss()], "test");
        let mut propagator = Propagator::new();
        propagator.load_catalog(&catalog);
        propagator.set_time(iss_epoch());

        let all = propagator.propagate_working_set(&objects, 10);
        let ids: Vec<u32> = all.iter().map(|p| p.object.norad_id).collect();
        assert_eq!(ids, vec![25544, 99999]);
        assert_eq!(all[0].object.name, iss().name);

        // Duplicates do not use up the cap
        let capped = propagator.propagate_working_set(&objects, 2);
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn test_earth_fixed_position_is_teme_rotated_by_gmst() {
        let time = iss_epoch();
        let instant = instant_from_utc(time).unwrap();
        let (pos, _, _) = sgp4(&mut iss_tle(), &[instant]);
        let (x, y, z) = (pos[(0, 0)], pos[(1, 0)], pos[(2, 0)]);

        let (s, c) = frametransform::gmst(&instant).sin_cos();
        let expected = earth_frame_km_to_scene(
            (c * x + s * y) / 1000.0,
            (-s * x + c * y) / 1000.0,
            z / 1000.0,
        );

        let state = propagate_tle(&iss_tle(), time).unwrap();
        // Polar motion is the only difference, well under a kilometer
        assert!((state.position - expected).length() < 1e-3, "{:?} vs {:?}", state.position, expected);
    }

    #[test]
    fn test_sgp4_error_status_is_numerical_failure() {
        assert!(check_sgp4_status(&[SGP4Error::SGP4Success]).is_ok());
        assert!(matches!(
            check_sgp4_status(&[SGP4Error::SGP4ErrorOrbitDecay]),
            Err(PropagationFailure::Numerical { .. })
        ));
    }

    #[test]
    fn test_instant_from_utc_matches_tle_epoch() {
        let instant = instant_from_utc(iss_epoch()).unwrap();
        let (year, month, day, hour, _, _) = instant.as_datetime();
        assert_eq!((year, month, day, hour), (2024, 1, 1, 12));
        assert!((instant - iss_tle().epoch).as_seconds().abs() < 1.0);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(iss_epoch()), "2024-01-01 12:00:00 UTC");
    }
}
