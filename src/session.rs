// 🧭 Session - explicit per-session state for the analysis pipeline
// Owns the region directory and the currently loaded record set

use crate::aggregate::{aggregate, Aggregation};
use crate::buckets::{bucket_codes, BucketKey};
use crate::directory::{DirectoryFetcher, RegionEntry};
use crate::roll::{fetch_roll, parse_roll, ParcelRecord};
use log::info;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// LOAD FAILURE TAXONOMY
// ============================================================================

/// LoadError - why a region failed to load
#[derive(Debug, Error)]
pub enum LoadError {
    /// Network or HTTP failure downloading the roll. The previously loaded
    /// record set is left untouched.
    #[error("roll download failed: {0}")]
    Fetch(anyhow::Error),

    /// Malformed XML or a roll with zero parcel elements. The record set
    /// is cleared rather than left stale.
    #[error("no parcel records found in the roll")]
    NoRecords,
}

/// SelectionOutcome - aggregation result, or the no-data signal
///
/// "Nothing loaded" is distinct from "loaded, but nothing selected": the
/// latter is a zero `Aggregation`, the former is `NoData`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// No record set is loaded (never loaded, or the last load found
    /// nothing)
    NoData,

    /// Totals over the current record set for the given selection
    Ready(Aggregation),
}

// ============================================================================
// SESSION
// ============================================================================

/// Session - one interactive analysis session
///
/// The record set is held behind an `Arc` and replaced by a single pointer
/// swap on load, so a concurrent reader observes either the old set in
/// full or the new set in full, never a mix.
pub struct Session {
    regions: Vec<RegionEntry>,
    records: Option<Arc<Vec<ParcelRecord>>>,
}

impl Session {
    /// Session over an already-fetched region directory
    pub fn new(regions: Vec<RegionEntry>) -> Self {
        Session {
            regions,
            records: None,
        }
    }

    /// Session populated from the production directory
    ///
    /// A directory failure is not fatal: the session simply starts with no
    /// regions to choose from.
    pub fn start() -> Self {
        let regions = match DirectoryFetcher::new() {
            Ok(fetcher) => fetcher.fetch_regions(),
            Err(e) => {
                log::warn!("Region directory unavailable: {:#}", e);
                Vec::new()
            }
        };
        Session::new(regions)
    }

    /// Regions available for loading, sorted by name
    pub fn regions(&self) -> &[RegionEntry] {
        &self.regions
    }

    /// Whether a record set is currently loaded
    pub fn has_data(&self) -> bool {
        self.records.is_some()
    }

    /// Number of records in the loaded set (0 when nothing is loaded)
    pub fn record_count(&self) -> usize {
        self.records.as_ref().map_or(0, |records| records.len())
    }

    /// Shared handle to the loaded record set
    pub fn records(&self) -> Option<Arc<Vec<ParcelRecord>>> {
        self.records.clone()
    }

    /// Download and install a region's roll
    ///
    /// On success returns the record count. The previous set survives a
    /// download failure and is cleared by an empty or malformed roll.
    pub fn load_region(&mut self, url: &str) -> Result<usize, LoadError> {
        let xml = fetch_roll(url).map_err(LoadError::Fetch)?;
        self.install_roll(&xml)
    }

    /// Parse roll bytes and atomically replace the record set
    pub fn install_roll(&mut self, xml: &[u8]) -> Result<usize, LoadError> {
        let records = parse_roll(xml);
        if records.is_empty() {
            self.records = None;
            return Err(LoadError::NoRecords);
        }

        let count = records.len();
        info!("Installed record set with {} parcels", count);
        self.records = Some(Arc::new(records));
        Ok(count)
    }

    /// Bucketed view of the distinct usage codes in the loaded set
    pub fn code_buckets(&self) -> BTreeMap<BucketKey, Vec<String>> {
        match &self.records {
            Some(records) => {
                bucket_codes(records.iter().map(|record| record.usage_code.clone()))
            }
            None => BTreeMap::new(),
        }
    }

    /// Aggregate the loaded set over a selection of usage codes
    pub fn aggregate(&self, selected: &HashSet<String>) -> SelectionOutcome {
        match &self.records {
            Some(records) => SelectionOutcome::Ready(aggregate(records, selected)),
            None => SelectionOutcome::NoData,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_ROLL: &[u8] = b"<root>\
        <RLUEx><RL0105A>1000</RL0105A><RL0311A>2</RL0311A></RLUEx>\
        <RLUEx><RL0105A>1322</RL0105A><RL0311A>4</RL0311A></RLUEx>\
    </root>";

    fn selection(codes: &[&str]) -> HashSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_fresh_session_reports_no_data() {
        let session = Session::new(Vec::new());

        assert!(!session.has_data());
        assert_eq!(session.aggregate(&HashSet::new()), SelectionOutcome::NoData);
        assert_eq!(
            session.aggregate(&selection(&["1000"])),
            SelectionOutcome::NoData
        );
        assert!(session.code_buckets().is_empty());
    }

    #[test]
    fn test_load_then_empty_selection_is_zero_not_no_data() {
        let mut session = Session::new(Vec::new());
        session.install_roll(SMALL_ROLL).unwrap();

        match session.aggregate(&HashSet::new()) {
            SelectionOutcome::Ready(result) => assert_eq!(result, Aggregation::empty()),
            SelectionOutcome::NoData => panic!("loaded session must not report NoData"),
        }
    }

    #[test]
    fn test_install_replaces_previous_set_wholesale() {
        let mut session = Session::new(Vec::new());
        session.install_roll(SMALL_ROLL).unwrap();
        assert_eq!(session.record_count(), 2);

        let other = b"<root><RLUEx><RL0105A>5010</RL0105A><RL0311A>9</RL0311A></RLUEx></root>";
        session.install_roll(other).unwrap();

        assert_eq!(session.record_count(), 1);
        match session.aggregate(&selection(&["1000"])) {
            SelectionOutcome::Ready(result) => assert_eq!(result.building_count, 0),
            SelectionOutcome::NoData => panic!("session has data"),
        }
    }

    #[test]
    fn test_empty_roll_clears_record_set() {
        let mut session = Session::new(Vec::new());
        session.install_roll(SMALL_ROLL).unwrap();

        let outcome = session.install_roll(b"<root></root>");
        assert!(matches!(outcome, Err(LoadError::NoRecords)));
        assert!(!session.has_data());
        assert_eq!(session.aggregate(&selection(&["1000"])), SelectionOutcome::NoData);
    }

    #[test]
    fn test_malformed_roll_clears_record_set() {
        let mut session = Session::new(Vec::new());
        session.install_roll(SMALL_ROLL).unwrap();

        let outcome = session.install_roll(b"<root><RLUEx>");
        assert!(matches!(outcome, Err(LoadError::NoRecords)));
        assert!(!session.has_data());
    }

    #[test]
    fn test_download_failure_leaves_record_set_untouched() {
        let mut session = Session::new(Vec::new());
        session.install_roll(SMALL_ROLL).unwrap();

        // A relative URL fails inside the client before any network I/O
        let outcome = session.load_region("not-a-url");
        assert!(matches!(outcome, Err(LoadError::Fetch(_))));

        assert!(session.has_data());
        assert_eq!(session.record_count(), 2);
    }

    #[test]
    fn test_old_readers_keep_the_old_set_across_reload() {
        let mut session = Session::new(Vec::new());
        session.install_roll(SMALL_ROLL).unwrap();
        let old = session.records().unwrap();

        session
            .install_roll(b"<root><RLUEx><RL0105A>5010</RL0105A></RLUEx></root>")
            .unwrap();

        // The handle taken before the reload still sees the full old set
        assert_eq!(old.len(), 2);
        assert_eq!(session.record_count(), 1);
    }

    #[test]
    fn test_code_buckets_derive_from_loaded_set() {
        let mut session = Session::new(Vec::new());
        session
            .install_roll(
                b"<root>\
                    <RLUEx><RL0105A>1322</RL0105A></RLUEx>\
                    <RLUEx><RL0105A>1000</RL0105A></RLUEx>\
                    <RLUEx></RLUEx>\
                </root>",
            )
            .unwrap();

        let buckets = session.code_buckets();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[&BucketKey::Range(1000)], vec!["1000", "1322"]);
        assert_eq!(buckets[&BucketKey::Unknown], vec!["Unknown"]);
    }
}
