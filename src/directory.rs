// 🗂️ Region Directory - Données Québec datastore client
// Paginated retrieval of the MRC → assessment-roll-URL directory

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ============================================================================
// CONSTANTS
// ============================================================================

/// CKAN datastore_search endpoint for Données Québec
pub const DATASTORE_URL: &str =
    "https://www.donneesquebec.ca/recherche/api/3/action/datastore_search";

/// Resource holding the per-MRC assessment-roll links
pub const ROLL_RESOURCE_ID: &str = "d2db6102-9215-4abc-9b5b-2c37f2e12618";

/// Records per datastore page
pub const PAGE_SIZE: usize = 100;

/// Canonical column names, after trim + lowercase normalization
const NAME_COLUMN: &str = "nom du territoire";
const LINK_COLUMN: &str = "lien";

// ============================================================================
// CORE TYPES
// ============================================================================

/// RegionEntry - one MRC and the URL of its assessment roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionEntry {
    /// Territory display name (unique key in the source dataset)
    pub name: String,

    /// URL of the region's property-roll XML document
    pub source_url: String,
}

/// One raw datastore record: column name → JSON value
pub type DirectoryRecord = HashMap<String, Value>;

/// Expected datastore_search response shape: { result: { records: [..] } }
#[derive(Debug, Deserialize)]
struct DatastoreResponse {
    result: DatastoreResult,
}

#[derive(Debug, Deserialize)]
struct DatastoreResult {
    records: Vec<DirectoryRecord>,
}

// ============================================================================
// TRANSPORT SEAM
// ============================================================================

/// DirectoryApi - transport behind the directory fetch
///
/// Production wraps a blocking HTTP client; tests substitute canned pages.
pub trait DirectoryApi {
    /// Fetch one page of directory records
    ///
    /// Any non-success status or unusable body is an `Err` - the fetcher
    /// turns it into an empty directory.
    fn fetch_page(&self, limit: usize, offset: usize) -> Result<Vec<DirectoryRecord>>;
}

/// Blocking HTTP implementation against the datastore API
pub struct HttpDirectoryApi {
    client: reqwest::blocking::Client,
    base_url: String,
    resource_id: String,
}

impl HttpDirectoryApi {
    /// Create a client against the Données Québec datastore
    pub fn new() -> Result<Self> {
        Self::with_endpoint(DATASTORE_URL, ROLL_RESOURCE_ID)
    }

    /// Create a client against an arbitrary datastore endpoint
    pub fn with_endpoint(base_url: &str, resource_id: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("roll-explorer/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(HttpDirectoryApi {
            client,
            base_url: base_url.to_string(),
            resource_id: resource_id.to_string(),
        })
    }
}

impl DirectoryApi for HttpDirectoryApi {
    fn fetch_page(&self, limit: usize, offset: usize) -> Result<Vec<DirectoryRecord>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("resource_id", self.resource_id.as_str()),
                ("limit", &limit.to_string()),
                ("offset", &offset.to_string()),
            ])
            .send()
            .with_context(|| format!("Datastore request failed at offset {}", offset))?;

        if !response.status().is_success() {
            anyhow::bail!("Datastore returned HTTP {}", response.status());
        }

        let body: DatastoreResponse = response
            .json()
            .context("Datastore response did not match expected shape")?;

        Ok(body.result.records)
    }
}

// ============================================================================
// DIRECTORY FETCHER
// ============================================================================

/// DirectoryFetcher - accumulates the full region directory page by page
pub struct DirectoryFetcher<A: DirectoryApi> {
    api: A,
}

impl DirectoryFetcher<HttpDirectoryApi> {
    /// Fetcher against the production datastore
    pub fn new() -> Result<Self> {
        Ok(DirectoryFetcher {
            api: HttpDirectoryApi::new()?,
        })
    }
}

impl<A: DirectoryApi> DirectoryFetcher<A> {
    /// Fetcher over an arbitrary transport
    pub fn with_api(api: A) -> Self {
        DirectoryFetcher { api }
    }

    /// Fetch the complete directory, sorted ascending by region name
    ///
    /// Never fails: any transport error, a missing canonical column, or an
    /// empty first page yields an empty list ("directory unavailable").
    pub fn fetch_regions(&self) -> Vec<RegionEntry> {
        let mut records: Vec<DirectoryRecord> = Vec::new();
        let mut offset = 0;

        loop {
            let page = match self.api.fetch_page(PAGE_SIZE, offset) {
                Ok(page) => page,
                Err(e) => {
                    warn!("Region directory unavailable: {:#}", e);
                    return Vec::new();
                }
            };

            if offset == 0 && page.is_empty() {
                warn!("Region directory is empty");
                return Vec::new();
            }

            debug!("Fetched {} directory records at offset {}", page.len(), offset);
            let page_len = page.len();
            records.extend(page);

            // A short page signals the end of the data
            if page_len < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }

        match regions_from_records(records) {
            Some(mut regions) => {
                regions.sort_by(|a, b| a.name.cmp(&b.name));
                regions
            }
            None => {
                warn!(
                    "Region directory is missing the '{}' or '{}' column",
                    NAME_COLUMN, LINK_COLUMN
                );
                Vec::new()
            }
        }
    }
}

/// Normalize column names and extract the canonical name/URL columns
///
/// Returns None when either canonical column is absent after normalization -
/// schema drift must not silently produce wrong columns.
fn regions_from_records(records: Vec<DirectoryRecord>) -> Option<Vec<RegionEntry>> {
    let columns: Vec<String> = records
        .first()?
        .keys()
        .map(|k| normalize_column(k))
        .collect();

    if !columns.iter().any(|c| c == NAME_COLUMN) || !columns.iter().any(|c| c == LINK_COLUMN) {
        return None;
    }

    let regions = records
        .into_iter()
        .filter_map(|record| {
            let mut name = None;
            let mut source_url = None;
            for (column, value) in &record {
                match normalize_column(column).as_str() {
                    NAME_COLUMN => name = value.as_str().map(str::to_string),
                    LINK_COLUMN => source_url = value.as_str().map(str::to_string),
                    _ => {}
                }
            }
            match (name, source_url) {
                (Some(name), Some(source_url)) => Some(RegionEntry { name, source_url }),
                _ => {
                    debug!("Skipping directory record with missing name or link");
                    None
                }
            }
        })
        .collect();

    Some(regions)
}

fn normalize_column(column: &str) -> String {
    column.trim().to_lowercase()
}

// ============================================================================
// TESTS
// ============================================================================
