//! Catalog loading from local JSON files

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde::Deserialize;

use super::{Catalog, CatalogObject};

/// Accepted top-level layouts of a catalog file
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Wrapped {
        #[serde(default)]
        generated_at: Option<String>,
        #[serde(alias = "items", alias = "data")]
        objects: Vec<CatalogObject>,
    },
    Plain(Vec<CatalogObject>),
}

/// Load a catalog from a `.json` or gzip-compressed `.json.gz` file
pub fn load_catalog_file(path: impl AsRef<Path>) -> Result<Catalog> {
    let path = path.as_ref();
    log::info!("Loading catalog from {:?}", path);

    let file = File::open(path).with_context(|| format!("Failed to open catalog file: {:?}", path))?;
    let reader = BufReader::new(file);

    let is_gzip = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    let objects = if is_gzip {
        parse_catalog(GzDecoder::new(reader))
    } else {
        parse_catalog(reader)
    }
    .with_context(|| format!("Failed to parse catalog JSON: {:?}", path))?;

    Ok(Catalog::new(objects, path.display().to_string()))
}

/// Parse catalog JSON from any reader and run ingest enrichment
pub fn parse_catalog(reader: impl Read) -> Result<Vec<CatalogObject>> {
    let parsed: CatalogFile = serde_json::from_reader(reader)?;
    let mut objects = match parsed {
        CatalogFile::Wrapped {
            generated_at,
            objects,
        } => {
            if let Some(at) = generated_at {
                log::info!("Catalog generated at {}", at);
            }
            objects
        }
        CatalogFile::Plain(objects) => objects,
    };

    let enriched = enrich_objects(&mut objects);
    log::info!(
        "Loaded {} catalog objects ({} enriched from element sets)",
        objects.len(),
        enriched
    );
    Ok(objects)
}

/// Derive missing orbit descriptors from element sets; returns how many
/// objects gained at least one field.
pub fn enrich_objects(objects: &mut [CatalogObject]) -> usize {
    objects
        .iter_mut()
        .map(|obj| obj.enrich_from_tle())
        .filter(|changed| *changed)
        .count()
}
