// 📊 Aggregation Engine - filtered totals over the loaded record set
// Pure function of (records, selection); recomputed on every change

use crate::roll::ParcelRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ============================================================================
// RESULT TYPES
// ============================================================================

/// SummaryRow - per-code totals within the current selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// CUBF usage code
    pub usage_code: String,

    /// Number of assessed parcels carrying this code
    pub building_count: u64,

    /// Sum of housing units over those parcels
    pub unit_total: u64,
}

/// Aggregation - totals plus the per-code breakdown
///
/// An empty selection yields the zero Aggregation: that is the idle state
/// of the selection UI, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    /// Number of parcels whose code is in the selection
    pub building_count: u64,

    /// Sum of unit counts over those parcels
    pub unit_total: u64,

    /// One row per selected code present in the data, ascending by code
    pub summary: Vec<SummaryRow>,
}

impl Aggregation {
    /// The zero result, used for the empty selection
    pub fn empty() -> Self {
        Aggregation {
            building_count: 0,
            unit_total: 0,
            summary: Vec::new(),
        }
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Compute filtered totals for a selection of usage codes
///
/// Membership is exact - no prefix or range matching. Codes selected but
/// absent from the data simply contribute nothing.
pub fn aggregate(records: &[ParcelRecord], selected: &HashSet<String>) -> Aggregation {
    if selected.is_empty() {
        return Aggregation::empty();
    }

    let mut building_count: u64 = 0;
    let mut unit_total: u64 = 0;
    let mut groups: BTreeMap<&str, (u64, u64)> = BTreeMap::new();

    for record in records {
        if !selected.contains(&record.usage_code) {
            continue;
        }
        building_count += 1;
        unit_total += u64::from(record.unit_count);

        let group = groups.entry(record.usage_code.as_str()).or_insert((0, 0));
        group.0 += 1;
        group.1 += u64::from(record.unit_count);
    }

    let summary = groups
        .into_iter()
        .map(|(usage_code, (building_count, unit_total))| SummaryRow {
            usage_code: usage_code.to_string(),
            building_count,
            unit_total,
        })
        .collect();

    Aggregation {
        building_count,
        unit_total,
        summary,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<ParcelRecord> {
        vec![
            ParcelRecord { usage_code: "1000".to_string(), unit_count: 1 },
            ParcelRecord { usage_code: "1322".to_string(), unit_count: 4 },
            ParcelRecord { usage_code: "1000".to_string(), unit_count: 2 },
            ParcelRecord { usage_code: "5010".to_string(), unit_count: 0 },
            ParcelRecord { usage_code: "Unknown".to_string(), unit_count: 3 },
        ]
    }

    fn selection(codes: &[&str]) -> HashSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_empty_selection_is_zero_state() {
        let result = aggregate(&records(), &HashSet::new());

        assert_eq!(result, Aggregation::empty());
        assert_eq!(result.building_count, 0);
        assert_eq!(result.unit_total, 0);
        assert!(result.summary.is_empty());
    }

    #[test]
    fn test_filtered_totals_and_grouping() {
        let result = aggregate(&records(), &selection(&["1000", "1322"]));

        assert_eq!(result.building_count, 3);
        assert_eq!(result.unit_total, 7);
        assert_eq!(
            result.summary,
            vec![
                SummaryRow {
                    usage_code: "1000".to_string(),
                    building_count: 2,
                    unit_total: 3,
                },
                SummaryRow {
                    usage_code: "1322".to_string(),
                    building_count: 1,
                    unit_total: 4,
                },
            ]
        );
    }

    #[test]
    fn test_membership_is_exact() {
        // "100" must not prefix-match "1000"
        let result = aggregate(&records(), &selection(&["100"]));
        assert_eq!(result.building_count, 0);
        assert!(result.summary.is_empty());
    }

    #[test]
    fn test_selected_code_absent_from_data() {
        let result = aggregate(&records(), &selection(&["9999", "5010"]));

        assert_eq!(result.building_count, 1);
        assert_eq!(result.unit_total, 0);
        assert_eq!(result.summary.len(), 1);
        assert_eq!(result.summary[0].usage_code, "5010");
    }

    #[test]
    fn test_sentinel_code_is_selectable() {
        let result = aggregate(&records(), &selection(&["Unknown"]));

        assert_eq!(result.building_count, 1);
        assert_eq!(result.unit_total, 3);
    }

    #[test]
    fn test_idempotent() {
        let selected = selection(&["1000", "1322", "Unknown"]);
        let first = aggregate(&records(), &selected);
        let second = aggregate(&records(), &selected);
        assert_eq!(first, second);
    }

    #[test]
    fn test_summary_rows_sum_to_totals() {
        let selected = selection(&["1000", "1322", "5010", "Unknown"]);
        let result = aggregate(&records(), &selected);

        let row_buildings: u64 = result.summary.iter().map(|r| r.building_count).sum();
        let row_units: u64 = result.summary.iter().map(|r| r.unit_total).sum();

        assert_eq!(row_buildings, result.building_count);
        assert_eq!(row_units, result.unit_total);
    }

    #[test]
    fn test_no_records() {
        let result = aggregate(&[], &selection(&["1000"]));
        assert_eq!(result, Aggregation::empty());
    }
}
