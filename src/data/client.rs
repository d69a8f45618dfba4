//! Catalog service client and background fetch worker

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{load_catalog_file, parse_catalog, AltitudeBand, Catalog, CatalogObject, FilterState, StatusCounts};
use crate::propagation::OrbitClass;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Failure talking to the catalog service
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Service answered with a non-success status
    Http { status: u16, url: String },
    /// Connection, DNS or timeout failure
    Transport { url: String, message: String },
    /// Body was not the expected JSON
    Decode { url: String, message: String },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { status, url } => write!(f, "HTTP {} from {}", status, url),
            Self::Transport { url, message } => write!(f, "Request to {} failed: {}", url, message),
            Self::Decode { url, message } => write!(f, "Unexpected response from {}: {}", url, message),
        }
    }
}

impl std::error::Error for FetchError {}

/// Server-side filter parameters for `GET /satellites`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogQuery {
    pub kind: Option<String>,
    pub constellation: Option<String>,
    pub status: Option<String>,
    pub band: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl CatalogQuery {
    /// Translate the single-valued parts of a filter into query parameters.
    /// Multi-valued selections stay client side.
    pub fn from_filter(filter: &FilterState) -> Self {
        let single = |set: &std::collections::BTreeSet<String>| {
            if set.len() == 1 {
                set.iter().next().cloned()
            } else {
                None
            }
        };
        let search = filter.search.trim();

        Self {
            kind: single(&filter.types).map(|t| t.to_lowercase()),
            constellation: single(&filter.constellations),
            status: filter.status.as_ref().map(|s| s.as_str().to_string()),
            band: match filter.band {
                AltitudeBand::All => None,
                band => Some(band.code().to_string()),
            },
            search: (!search.is_empty()).then(|| search.to_string()),
            page: None,
            limit: None,
        }
    }

    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &'static str, value: &Option<String>| {
            if let Some(v) = value {
                pairs.push((key, v.clone()));
            }
        };
        push("type", &self.kind);
        push("constellation", &self.constellation);
        push("status", &self.status);
        push("orbit", &self.band);
        push("search", &self.search);
        push("page", &self.page.map(|p| p.to_string()));
        push("limit", &self.limit.map(|l| l.to_string()));
        pairs
    }
}

/// A launch as reported by the launch service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub vehicle: Option<String>,
    #[serde(default)]
    pub launch_date: Option<String>,
    /// Target orbit class code (LEO, GEO, ...)
    #[serde(default, alias = "orbit", alias = "orbit_type")]
    pub target_orbit: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl LaunchRecord {
    pub fn orbit_class(&self) -> Option<OrbitClass> {
        self.target_orbit.as_deref().map(OrbitClass::from_code)
    }
}

/// Number of launches per target orbit class
pub fn launch_counts(launches: &[LaunchRecord]) -> BTreeMap<OrbitClass, usize> {
    let mut counts = BTreeMap::new();
    for class in launches.iter().filter_map(LaunchRecord::orbit_class) {
        *counts.entry(class).or_insert(0) += 1;
    }
    counts
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LaunchBody {
    Wrapped {
        #[serde(alias = "data", alias = "items")]
        launches: Vec<LaunchRecord>,
    },
    Plain(Vec<LaunchRecord>),
}

/// Parse a launch list in either the plain or the wrapped layout
pub fn parse_launches(reader: impl Read) -> serde_json::Result<Vec<LaunchRecord>> {
    Ok(match serde_json::from_reader(reader)? {
        LaunchBody::Wrapped { launches } => launches,
        LaunchBody::Plain(launches) => launches,
    })
}

/// Blocking client for the catalog REST service
#[derive(Clone)]
pub struct RestCatalogClient {
    base_url: String,
    agent: ureq::Agent,
}

impl RestCatalogClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self { base_url, agent }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /satellites`
    pub fn fetch_catalog(&self, query: &CatalogQuery) -> Result<Vec<CatalogObject>, FetchError> {
        let url = format!("{}/satellites", self.base_url);
        let mut request = self.agent.get(&url);
        for (key, value) in query.pairs() {
            request = request.query(key, &value);
        }
        let response = send(request, &url)?;
        parse_catalog(response.into_reader()).map_err(|e| FetchError::Decode {
            url,
            message: format!("{:#}", e),
        })
    }

    /// `GET /satellites/{id}`
    pub fn fetch_object(&self, norad_id: u32) -> Result<CatalogObject, FetchError> {
        let url = format!("{}/satellites/{}", self.base_url, norad_id);
        let mut object: CatalogObject = self.get_json(&url)?;
        object.enrich_from_tle();
        Ok(object)
    }

    /// `GET /statistics`
    pub fn fetch_statistics(&self) -> Result<StatusCounts, FetchError> {
        let url = format!("{}/statistics", self.base_url);
        self.get_json(&url)
    }

    /// `GET /launches`
    pub fn fetch_launches(&self) -> Result<Vec<LaunchRecord>, FetchError> {
        let url = format!("{}/launches", self.base_url);
        let response = send(self.agent.get(&url), &url)?;
        parse_launches(response.into_reader()).map_err(|e| FetchError::Decode {
            url,
            message: e.to_string(),
        })
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let response = send(self.agent.get(url), url)?;
        serde_json::from_reader(response.into_reader()).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

fn send(request: ureq::Request, url: &str) -> Result<ureq::Response, FetchError> {
    log::debug!("GET {}", url);
    request.call().map_err(|e| match e {
        ureq::Error::Status(status, _) => FetchError::Http {
            status,
            url: url.to_string(),
        },
        ureq::Error::Transport(t) => FetchError::Transport {
            url: url.to_string(),
            message: t.to_string(),
        },
    })
}

/// Where the catalog comes from
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogSource {
    File(PathBuf),
    Service(String),
}

impl CatalogSource {
    /// URLs select the service, anything else is a file path
    pub fn parse(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            Self::Service(value.to_string())
        } else {
            Self::File(PathBuf::from(value))
        }
    }

    pub fn client(&self) -> Option<RestCatalogClient> {
        match self {
            Self::Service(url) => Some(RestCatalogClient::new(url.clone())),
            Self::File(_) => None,
        }
    }

    /// Load a full catalog snapshot
    pub fn load(&self, query: &CatalogQuery) -> anyhow::Result<Catalog> {
        match self {
            Self::File(path) => load_catalog_file(path),
            Self::Service(url) => {
                let client = RestCatalogClient::new(url.clone());
                let objects = client.fetch_catalog(query)?;
                log::info!("Fetched {} objects from {}", objects.len(), client.base_url());
                Ok(Catalog::new(objects, client.base_url()))
            }
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Service(url) => f.write_str(url),
        }
    }
}

/// Result delivered by the fetch worker
#[derive(Debug)]
pub enum FetchEvent {
    /// `request` is the id returned by [`FetchWorker::request_catalog`]
    Catalog {
        request: u64,
        result: Result<Catalog, String>,
    },
    Object(Result<CatalogObject, String>),
    Statistics(Result<StatusCounts, String>),
    Launches(Result<Vec<LaunchRecord>, String>),
}

/// Runs catalog I/O on short-lived background threads; results are polled
/// from the UI thread once per frame.
pub struct FetchWorker {
    source: CatalogSource,
    sender: Sender<FetchEvent>,
    receiver: Receiver<FetchEvent>,
    /// Id of the newest catalog request; older responses are dropped
    catalog_request: u64,
}

impl FetchWorker {
    pub fn new(source: CatalogSource) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            source,
            sender,
            receiver,
            catalog_request: 0,
        }
    }

    pub fn source(&self) -> &CatalogSource {
        &self.source
    }

    /// Start a catalog load. Only the response to the latest request is
    /// delivered by [`poll`](Self::poll).
    pub fn request_catalog(&mut self, query: CatalogQuery) -> u64 {
        self.catalog_request += 1;
        let request = self.catalog_request;
        let source = self.source.clone();
        self.spawn(move || FetchEvent::Catalog {
            request,
            result: source.load(&query).map_err(|e| format!("{:#}", e)),
        });
        request
    }

    /// No-op for file sources, which have no per-object endpoint
    pub fn request_object(&self, norad_id: u32) {
        if let Some(client) = self.source.client() {
            self.spawn(move || {
                FetchEvent::Object(client.fetch_object(norad_id).map_err(|e| e.to_string()))
            });
        }
    }

    /// No-op for file sources; the view aggregates locally instead
    pub fn request_statistics(&self) {
        if let Some(client) = self.source.client() {
            self.spawn(move || {
                FetchEvent::Statistics(client.fetch_statistics().map_err(|e| e.to_string()))
            });
        }
    }

    pub fn request_launches(&self) {
        if let Some(client) = self.source.client() {
            self.spawn(move || {
                FetchEvent::Launches(client.fetch_launches().map_err(|e| e.to_string()))
            });
        }
    }

    /// Drain finished requests without blocking
    pub fn poll(&self) -> Vec<FetchEvent> {
        let latest = self.catalog_request;
        self.receiver
            .try_iter()
            .filter(|event| match event {
                FetchEvent::Catalog { request, .. } if *request < latest => {
                    log::debug!("Dropping catalog response {} (latest {})", request, latest);
                    false
                }
                _ => true,
            })
            .collect()
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() -> FetchEvent + Send + 'static,
    {
        let sender = self.sender.clone();
        thread::spawn(move || {
            // Receiver gone means the app is shutting down
            let _ = sender.send(job());
        });
    }
}
