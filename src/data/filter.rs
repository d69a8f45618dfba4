//! Working-set selection over the catalog

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::{Catalog, CatalogObject, ObjectKind, ObjectStatus};

/// Perigee altitude separating LEO from MEO (km)
pub const LEO_MEO_BOUNDARY_KM: f64 = 2000.0;
/// Geostationary altitude separating MEO from GEO (km)
pub const GEO_ALTITUDE_KM: f64 = 35786.0;

/// Altitude band selected in the filter controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AltitudeBand {
    /// Sentinel: no altitude constraint
    #[default]
    All,
    Leo,
    Meo,
    Geo,
}

impl AltitudeBand {
    pub fn all() -> &'static [AltitudeBand] {
        &[Self::All, Self::Leo, Self::Meo, Self::Geo]
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Leo => "LEO",
            Self::Meo => "MEO",
            Self::Geo => "GEO",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "ALL" | "" => Some(Self::All),
            "LEO" => Some(Self::Leo),
            "MEO" => Some(Self::Meo),
            "GEO" => Some(Self::Geo),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "Show all",
            Self::Leo => "LEO < 2000 km",
            Self::Meo => "MEO 2000-35786 km",
            Self::Geo => "GEO >= 35786 km",
        }
    }

    /// Whether a perigee altitude lies inside this band
    pub fn contains(&self, perigee_km: f64) -> bool {
        match self {
            Self::All => true,
            Self::Leo => perigee_km < LEO_MEO_BOUNDARY_KM,
            Self::Meo => (LEO_MEO_BOUNDARY_KM..GEO_ALTITUDE_KM).contains(&perigee_km),
            Self::Geo => perigee_km >= GEO_ALTITUDE_KM,
        }
    }
}

impl fmt::Display for AltitudeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Type codes offered by the filter controls
pub const TYPE_CODES: &[&str] = &["SATELLITE", "DEBRIS", "TELESCOPE"];

/// Whether a selected type code covers an object classification.
///
/// Unknown codes match nothing.
pub fn type_code_matches(code: &str, kind: &ObjectKind) -> bool {
    match code {
        "SATELLITE" => matches!(kind, ObjectKind::Satellite),
        "DEBRIS" => matches!(kind, ObjectKind::Debris | ObjectKind::RocketBody),
        "TELESCOPE" => matches!(kind, ObjectKind::Telescope),
        _ => false,
    }
}

/// Current query over the catalog
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub search: String,
    pub band: AltitudeBand,
    pub constellations: BTreeSet<String>,
    pub types: BTreeSet<String>,
    pub status: Option<ObjectStatus>,
}

impl FilterState {
    /// True when every stage is unconstrained
    pub fn is_pass_through(&self) -> bool {
        self.search.trim().is_empty()
            && self.band == AltitudeBand::All
            && self.constellations.is_empty()
            && self.types.is_empty()
            && self.status.is_none()
    }

    /// Stage 1: case-insensitive substring of name, designator or catalog id
    pub fn matches_search(&self, obj: &CatalogObject) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        let name_hit = obj
            .name
            .as_deref()
            .map(|name| name.to_lowercase().contains(&needle))
            .unwrap_or(false);
        let designator_hit = obj
            .intl_designator
            .as_deref()
            .map(|d| d.to_lowercase().contains(&needle))
            .unwrap_or(false);
        let id_hit = obj.norad_id.to_string().contains(&needle);

        name_hit || designator_hit || id_hit
    }

    /// Stage 2: perigee inside the selected band; missing perigee fails any
    /// specific band
    pub fn matches_band(&self, obj: &CatalogObject) -> bool {
        if self.band == AltitudeBand::All {
            return true;
        }
        match obj.perigee_km {
            Some(perigee) if perigee.is_finite() => self.band.contains(perigee),
            _ => false,
        }
    }

    /// Stage 3: exact constellation membership (OR within the set)
    pub fn matches_constellation(&self, obj: &CatalogObject) -> bool {
        if self.constellations.is_empty() {
            return true;
        }
        obj.constellation
            .as_ref()
            .map(|c| self.constellations.contains(c))
            .unwrap_or(false)
    }

    /// Stage 4: classification covered by at least one selected type code
    pub fn matches_type(&self, obj: &CatalogObject) -> bool {
        if self.types.is_empty() {
            return true;
        }
        let Some(kind) = obj.kind.as_ref() else {
            return false;
        };
        self.types.iter().any(|code| type_code_matches(code, kind))
    }

    /// Stage 5: exact operational status
    pub fn matches_status(&self, obj: &CatalogObject) -> bool {
        match &self.status {
            None => true,
            Some(wanted) => obj.status.as_ref() == Some(wanted),
        }
    }

    /// Check if an object passes every stage
    pub fn matches(&self, obj: &CatalogObject) -> bool {
        self.matches_search(obj)
            && self.matches_band(obj)
            && self.matches_constellation(obj)
            && self.matches_type(obj)
            && self.matches_status(obj)
    }

    /// Working set in catalog order
    pub fn apply(&self, catalog: &Catalog) -> Vec<Arc<CatalogObject>> {
        catalog
            .objects
            .iter()
            .filter(|obj| self.matches(obj))
            .cloned()
            .collect()
    }

    pub fn toggle_constellation(&mut self, name: &str) {
        if !self.constellations.remove(name) {
            self.constellations.insert(name.to_string());
        }
    }

    pub fn toggle_type(&mut self, code: &str) {
        if !self.types.remove(code) {
            self.types.insert(code.to_string());
        }
    }
}

/// Distinct constellation names in the catalog, sorted
pub fn constellation_names(catalog: &Catalog) -> Vec<String> {
    catalog
        .objects
        .iter()
        .filter_map(|obj| obj.constellation.clone())
        .filter(|c| !c.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct status values in the catalog, sorted
pub fn status_values(catalog: &Catalog) -> Vec<ObjectStatus> {
    catalog
        .objects
        .iter()
        .filter_map(|obj| obj.status.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{described, iss};

    fn band_catalog() -> Catalog {
        Catalog::new(
            vec![
                described(1, "LOW", Some(500.0), None, None),
                described(2, "MID", Some(10000.0), None, None),
                described(3, "HIGH", Some(40000.0), None, None),
            ],
            "test",
        )
    }

    fn ids(set: &[Arc<CatalogObject>]) -> Vec<u32> {
        set.iter().map(|o| o.norad_id).collect()
    }

    #[test]
    fn test_meo_band_scenario() {
        let filter = FilterState {
            band: AltitudeBand::Meo,
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&band_catalog())), vec![2]);
    }

    #[test]
    fn test_pass_through_returns_full_catalog() {
        let filter = FilterState::default();
        assert!(filter.is_pass_through());
        let catalog = band_catalog();
        assert_eq!(ids(&filter.apply(&catalog)), vec![1, 2, 3]);
    }

    #[test]
    fn test_band_boundaries_are_exact() {
        let at_leo_edge = described(1, "A", Some(2000.0), None, None);
        let at_geo_edge = described(2, "B", Some(35786.0), None, None);

        let leo = FilterState { band: AltitudeBand::Leo, ..Default::default() };
        let meo = FilterState { band: AltitudeBand::Meo, ..Default::default() };
        let geo = FilterState { band: AltitudeBand::Geo, ..Default::default() };

        assert!(!leo.matches(&at_leo_edge));
        assert!(meo.matches(&at_leo_edge));
        assert!(!meo.matches(&at_geo_edge));
        assert!(geo.matches(&at_geo_edge));
    }

    #[test]
    fn test_missing_perigee_fails_specific_band() {
        let unknown = described(9, "UNKNOWN", None, None, None);
        let leo = FilterState { band: AltitudeBand::Leo, ..Default::default() };
        assert!(!leo.matches(&unknown));
        assert!(FilterState::default().matches(&unknown));
    }

    #[test]
    fn test_search_matches_name_designator_and_id() {
        let obj = iss();
        let mut filter = FilterState::default();

        filter.search = "zarya".into();
        assert!(filter.matches_search(&obj));
        filter.search = "1998-067".into();
        assert!(filter.matches_search(&obj));
        filter.search = "2554".into();
        assert!(filter.matches_search(&obj));
        filter.search = "  ".into();
        assert!(filter.matches_search(&obj));
        filter.search = "hubble".into();
        assert!(!filter.matches_search(&obj));
    }

    #[test]
    fn test_constellation_exact_membership() {
        let mut starlink = described(1, "STARLINK-1", Some(550.0), None, None);
        starlink.constellation = Some("Starlink".into());
        let mut oneweb = described(2, "ONEWEB-1", Some(1200.0), None, None);
        oneweb.constellation = Some("OneWeb".into());
        let loner = described(3, "LONER", Some(700.0), None, None);

        let mut filter = FilterState::default();
        filter.toggle_constellation("Starlink");
        assert!(filter.matches(&starlink));
        assert!(!filter.matches(&oneweb));
        assert!(!filter.matches(&loner));

        filter.toggle_constellation("OneWeb");
        assert!(filter.matches(&oneweb));

        // Case differs: not an exact match
        filter.constellations.clear();
        filter.constellations.insert("starlink".into());
        assert!(!filter.matches(&starlink));
    }

    #[test]
    fn test_type_mapping() {
        let sat = described(1, "S", None, Some(ObjectKind::Satellite), None);
        let debris = described(2, "D", None, Some(ObjectKind::Debris), None);
        let rocket = described(3, "R", None, Some(ObjectKind::RocketBody), None);
        let scope = described(4, "T", None, Some(ObjectKind::Telescope), None);
        let untyped = described(5, "U", None, None, None);

        let mut filter = FilterState::default();
        filter.toggle_type("DEBRIS");
        assert!(!filter.matches(&sat));
        assert!(filter.matches(&debris));
        assert!(filter.matches(&rocket));
        assert!(!filter.matches(&scope));
        assert!(!filter.matches(&untyped));

        filter.toggle_type("DEBRIS");
        filter.toggle_type("TELESCOPE");
        assert!(filter.matches(&scope));
        assert!(!filter.matches(&debris));
    }

    #[test]
    fn test_unknown_type_code_matches_nothing() {
        let sat = described(1, "S", None, Some(ObjectKind::Satellite), None);
        let mut filter = FilterState::default();
        filter.toggle_type("STATION");
        assert!(!filter.matches(&sat));
    }

    #[test]
    fn test_status_exact_match() {
        let active = described(1, "A", None, None, Some(ObjectStatus::Active));
        let inactive = described(2, "B", None, None, Some(ObjectStatus::Inactive));
        let unset = described(3, "C", None, None, None);

        let filter = FilterState {
            status: Some(ObjectStatus::Active),
            ..Default::default()
        };
        assert!(filter.matches(&active));
        assert!(!filter.matches(&inactive));
        assert!(!filter.matches(&unset));
    }

    #[test]
    fn test_apply_is_idempotent_and_order_independent() {
        let mut objects = vec![
            described(1, "ALPHA", Some(400.0), Some(ObjectKind::Satellite), Some(ObjectStatus::Active)),
            described(2, "BETA", Some(800.0), Some(ObjectKind::Debris), Some(ObjectStatus::Debris)),
            described(3, "ALPHA-2", Some(3000.0), Some(ObjectKind::Satellite), Some(ObjectStatus::Active)),
            described(4, "GAMMA", Some(600.0), Some(ObjectKind::Satellite), Some(ObjectStatus::Inactive)),
        ];
        let filter = FilterState {
            search: "alpha".into(),
            band: AltitudeBand::Leo,
            ..Default::default()
        };

        let catalog = Catalog::new(objects.clone(), "a");
        let once = filter.apply(&catalog);
        let twice = filter.apply(&Catalog {
            objects: once.clone(),
            source: "b".into(),
        });
        assert_eq!(ids(&once), vec![1]);
        assert_eq!(ids(&once), ids(&twice));

        objects.reverse();
        let reversed = filter.apply(&Catalog::new(objects, "c"));
        assert_eq!(ids(&reversed), vec![1]);

        // Stage-by-stage conjunction equals the combined predicate
        for obj in &catalog.objects {
            let staged = filter.matches_status(obj)
                && filter.matches_type(obj)
                && filter.matches_constellation(obj)
                && filter.matches_band(obj)
                && filter.matches_search(obj);
            assert_eq!(staged, filter.matches(obj));
        }
    }

    #[test]
    fn test_band_codes() {
        assert_eq!(AltitudeBand::from_code("meo"), Some(AltitudeBand::Meo));
        assert_eq!(AltitudeBand::from_code("ALL"), Some(AltitudeBand::All));
        assert_eq!(AltitudeBand::from_code("HEO"), None);
    }

    #[test]
    fn test_distinct_control_values() {
        let mut a = described(1, "A", None, None, Some(ObjectStatus::Active));
        a.constellation = Some("Starlink".into());
        let mut b = described(2, "B", None, None, Some(ObjectStatus::Debris));
        b.constellation = Some("GPS".into());
        let mut c = described(3, "C", None, None, Some(ObjectStatus::Active));
        c.constellation = Some("Starlink".into());
        let catalog = Catalog::new(vec![a, b, c], "t");

        assert_eq!(constellation_names(&catalog), vec!["GPS", "Starlink"]);
        assert_eq!(
            status_values(&catalog),
            vec![ObjectStatus::Active, ObjectStatus::Debris]
        );
    }
}
