//! `snapshot` command: one propagation pass written to JSON

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::config::SnapshotArgs;
use crate::data::{CatalogObject, CatalogQuery, CatalogSource, StatusCounts};
use crate::propagation::{format_time, propagate_object, scene_to_earth_frame_km, scene_to_km};

#[derive(Debug, Serialize)]
struct SnapshotObject {
    norad_id: u32,
    name: String,
    /// Scene units (km / 1000, Y-up)
    position: [f32; 3],
    /// Earth-fixed kilometers (z toward the north pole)
    position_km: [f64; 3],
    altitude_km: f64,
    speed_kms: f64,
    radius_km: f64,
    tle_age_days: f64,
}

#[derive(Debug, Serialize)]
struct Snapshot {
    generated_at: String,
    time_utc: String,
    source: String,
    total_objects: usize,
    working_set: usize,
    failed: usize,
    statistics: StatusCounts,
    objects: Vec<SnapshotObject>,
}

pub fn run_snapshot(args: SnapshotArgs) -> Result<()> {
    let source = CatalogSource::parse(&args.source);
    let filter = args.filter.to_filter();
    let time = args.at.unwrap_or_else(Utc::now);

    log::info!("Loading catalog from {}...", source);
    // Services apply the single-valued parts server-side
    let catalog = source.load(&CatalogQuery::from_filter(&filter))?;
    let working_set = filter.apply(&catalog);
    // A service download is already narrowed by the filter, so its counts
    // come from the statistics endpoint instead
    let statistics = match source.client() {
        Some(client) => client
            .fetch_statistics()
            .with_context(|| format!("Failed to fetch statistics from {}", client.base_url()))?,
        None => StatusCounts::from_objects(catalog.objects.iter().map(|o| o.as_ref())),
    };

    log::info!(
        "Propagating {} of {} objects to {}",
        working_set.len(),
        catalog.len(),
        format_time(time)
    );

    let snapshot = build_snapshot(&working_set, time, args.cap, |progress| {
        progress.set_style(
            ProgressStyle::with_template(
                "{elapsed_precise} {bar:40.cyan/blue} {pos}/{len} {percent}% ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
        );
    });

    let snapshot = Snapshot {
        source: catalog.source.clone(),
        total_objects: catalog.len(),
        statistics,
        ..snapshot
    };

    write_snapshot(&args.output, &snapshot)?;
    log::info!(
        "Wrote {} positions ({} failed) to {:?}",
        snapshot.objects.len(),
        snapshot.failed,
        args.output
    );
    Ok(())
}

fn build_snapshot(
    working_set: &[Arc<CatalogObject>],
    time: DateTime<Utc>,
    cap: usize,
    style: impl FnOnce(&ProgressBar),
) -> Snapshot {
    let progress = ProgressBar::new(working_set.len() as u64);
    style(&progress);

    let mut objects = Vec::new();
    let mut failed = 0usize;
    for obj in working_set {
        progress.inc(1);
        if objects.len() >= cap {
            continue;
        }
        match propagate_object(obj, time) {
            Ok(state) => objects.push(SnapshotObject {
                norad_id: obj.norad_id,
                name: obj.display_name(),
                position: state.position.to_array(),
                position_km: scene_to_earth_frame_km(state.position),
                altitude_km: state.altitude_km,
                speed_kms: state.speed_kms,
                radius_km: scene_to_km(state.position.length() as f64),
                tle_age_days: state.tle_age_days,
            }),
            Err(e) => {
                failed += 1;
                log::trace!("Skipping NORAD {}: {}", obj.norad_id, e);
            }
        }
    }
    progress.finish_and_clear();

    Snapshot {
        generated_at: Utc::now().to_rfc3339(),
        time_utc: time.to_rfc3339(),
        source: String::new(),
        total_objects: working_set.len(),
        working_set: working_set.len(),
        failed,
        statistics: StatusCounts::from_objects(working_set.iter().map(|o| o.as_ref())),
        objects,
    }
}

fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let file =
        std::fs::File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    serde_json::to_writer_pretty(file, snapshot).context("Failed to write snapshot")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterArgs;
    use std::path::PathBuf;
    use crate::data::fixtures::{described, iss, serve};
    use crate::data::{AltitudeBand, ObjectStatus};
    use chrono::TimeZone;

    #[test]
    fn test_snapshot_counts_failures_and_caps() {
        let working_set: Vec<Arc<CatalogObject>> = vec![
            Arc::new(iss()),
            Arc::new(described(1, "NO ELEMENTS", Some(400.0), None, Some(ObjectStatus::Active))),
        ];
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        let snapshot = build_snapshot(&working_set, time, 10, |_| {});
        assert_eq!(snapshot.working_set, 2);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.objects.len(), 1);
        assert_eq!(snapshot.objects[0].norad_id, 25544);
        assert!((6700.0..6850.0).contains(&snapshot.objects[0].radius_km));
        let [x, y, z] = snapshot.objects[0].position_km;
        assert!(((x * x + y * y + z * z).sqrt() - snapshot.objects[0].radius_km).abs() < 1.0);

        let capped = build_snapshot(&working_set, time, 0, |_| {});
        assert!(capped.objects.is_empty());
        assert_eq!(capped.failed, 0);
    }

    #[test]
    fn test_run_snapshot_writes_json() {
        let dir = std::env::temp_dir().join(format!("orbitview-snapshot-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let catalog_path = dir.join("catalog.json");
        let objects = vec![iss()];
        std::fs::write(&catalog_path, serde_json::to_string(&objects).unwrap()).unwrap();
        let output = dir.join("nested").join("snapshot.json");

        run_snapshot(SnapshotArgs {
            source: catalog_path.display().to_string(),
            output: output.clone(),
            at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()),
            cap: 100,
            filter: Default::default(),
        })
        .unwrap();

        let written: serde_json::Value =
            serde_json::from_reader(std::fs::File::open(&output).unwrap()).unwrap();
        assert_eq!(written["total_objects"], 1);
        assert_eq!(written["objects"][0]["norad_id"], 25544);
        assert_eq!(written["time_utc"], "2024-01-01T12:00:00+00:00");
        let _ = std::fs::remove_dir_all(&dir);
    }

    fn snapshot_args(source: String, output: PathBuf, band: AltitudeBand) -> SnapshotArgs {
        SnapshotArgs {
            source,
            output,
            at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()),
            cap: 100,
            filter: FilterArgs {
                band,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_service_statistics_ignore_the_filter() {
        let base = serve(vec![
            (200, r#"[{"norad_id": 1, "name": "LOW", "status": "active", "perigee_km": 400.0}]"#),
            (200, r#"{"active": 10, "inactive": 5, "debris": 20, "other": 1}"#),
        ]);
        let dir = std::env::temp_dir().join(format!("orbitview-service-{}", std::process::id()));
        let output = dir.join("snapshot.json");

        run_snapshot(snapshot_args(base, output.clone(), AltitudeBand::Leo)).unwrap();

        let written: serde_json::Value =
            serde_json::from_reader(std::fs::File::open(&output).unwrap()).unwrap();
        assert_eq!(written["working_set"], 1);
        assert_eq!(written["statistics"]["active"], 10);
        assert_eq!(written["statistics"]["debris"], 20);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_statistics_cover_the_whole_catalog() {
        let dir = std::env::temp_dir().join(format!("orbitview-file-stats-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let catalog_path = dir.join("catalog.json");
        let objects = vec![
            described(1, "LOW", Some(400.0), None, Some(ObjectStatus::Active)),
            described(2, "HIGH", Some(35786.0), None, Some(ObjectStatus::Inactive)),
            described(3, "MID", Some(20000.0), None, Some(ObjectStatus::Debris)),
        ];
        std::fs::write(&catalog_path, serde_json::to_string(&objects).unwrap()).unwrap();
        let output = dir.join("snapshot.json");

        run_snapshot(snapshot_args(
            catalog_path.display().to_string(),
            output.clone(),
            AltitudeBand::Leo,
        ))
        .unwrap();

        let written: serde_json::Value =
            serde_json::from_reader(std::fs::File::open(&output).unwrap()).unwrap();
        assert_eq!(written["working_set"], 1);
        assert_eq!(written["statistics"]["active"], 1);
        assert_eq!(written["statistics"]["inactive"], 1);
        assert_eq!(written["statistics"]["debris"], 1);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
