//! Status-bucket statistics for the "currently in orbit" summary

use serde::{Deserialize, Serialize};

use super::{CatalogObject, ObjectStatus};

/// Object counts by operational status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    #[serde(default)]
    pub active: usize,
    #[serde(default)]
    pub inactive: usize,
    #[serde(default)]
    pub debris: usize,
    #[serde(default)]
    pub other: usize,
}

impl StatusCounts {
    /// Count objects into buckets; missing or unrecognized status lands in
    /// `other`.
    pub fn from_objects<'a, I>(objects: I) -> Self
    where
        I: IntoIterator<Item = &'a CatalogObject>,
    {
        let mut counts = Self::default();
        for obj in objects {
            match obj.status {
                Some(ObjectStatus::Active) => counts.active += 1,
                Some(ObjectStatus::Inactive) => counts.inactive += 1,
                Some(ObjectStatus::Debris) => counts.debris += 1,
                Some(ObjectStatus::Other(_)) | None => counts.other += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.active + self.inactive + self.debris + self.other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::described;

    #[test]
    fn test_debris_active_unset_scenario() {
        let objects = vec![
            described(1, "A", None, None, Some(ObjectStatus::Debris)),
            described(2, "B", None, None, Some(ObjectStatus::Active)),
            described(3, "C", None, None, None),
        ];
        let counts = StatusCounts::from_objects(&objects);
        assert_eq!(
            counts,
            StatusCounts {
                active: 1,
                inactive: 0,
                debris: 1,
                other: 1
            }
        );
    }

    #[test]
    fn test_counts_sum_to_input_size() {
        let statuses = [
            Some(ObjectStatus::Active),
            Some(ObjectStatus::Inactive),
            Some(ObjectStatus::Other("decayed".into())),
            None,
            Some(ObjectStatus::Debris),
            Some(ObjectStatus::Active),
        ];
        let objects: Vec<CatalogObject> = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| described(i as u32, "X", None, None, s.clone()))
            .collect();

        let counts = StatusCounts::from_objects(&objects);
        assert_eq!(counts.total(), objects.len());
        assert_eq!(counts.other, 2);
        // No hidden state between calls
        assert_eq!(StatusCounts::from_objects(&objects), counts);
    }

    #[test]
    fn test_empty_input() {
        let counts = StatusCounts::from_objects(std::iter::empty::<&CatalogObject>());
        assert_eq!(counts.total(), 0);
    }

    #[test]
    fn test_service_payload_shape() {
        let counts: StatusCounts =
            serde_json::from_str(r#"{"active": 10, "inactive": 2, "debris": 30}"#).unwrap();
        assert_eq!(counts.other, 0);
        assert_eq!(counts.total(), 42);
    }
}
