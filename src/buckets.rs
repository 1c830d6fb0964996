// 🪣 Code Bucketer - CUBF codes grouped into thousand-aligned ranges
// Derived from the loaded record set, recomputed on every load

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// BUCKET KEY
// ============================================================================

/// BucketKey - a thousand-aligned CUBF range, or the non-numeric bucket
///
/// Variant order matters: the derived `Ord` sorts ranges ascending and
/// places `Unknown` after every range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BucketKey {
    /// Codes whose integer value falls in [start, start + 999]
    Range(u32),
    /// Codes that do not parse as an unsigned integer
    Unknown,
}

impl BucketKey {
    /// Classify one usage code
    ///
    /// Anything that fails the unsigned parse lands in `Unknown`: the
    /// "Unknown" sentinel itself, alphabetic codes, and negative strings
    /// like "-100". Leading-zero codes parse by value ("0042" → bucket 0).
    pub fn for_code(code: &str) -> Self {
        match code.parse::<u32>() {
            Ok(value) => BucketKey::Range((value / 1000) * 1000),
            Err(_) => BucketKey::Unknown,
        }
    }

    /// Display label: the inclusive range, or the fixed non-numeric label
    pub fn label(&self) -> String {
        match self {
            BucketKey::Range(start) => format!("Codes {}–{}", start, start + 999),
            BucketKey::Unknown => "Codes inconnus".to_string(),
        }
    }
}

// ============================================================================
// BUCKETING
// ============================================================================

/// Group distinct usage codes into ordered buckets
///
/// Numeric codes sort numerically within their bucket; the Unknown bucket
/// sorts lexicographically. Bucket iteration order follows `BucketKey`'s
/// ordering, so Unknown always renders last.
pub fn bucket_codes<I>(codes: I) -> BTreeMap<BucketKey, Vec<String>>
where
    I: IntoIterator<Item = String>,
{
    let distinct: BTreeSet<String> = codes.into_iter().collect();

    let mut buckets: BTreeMap<BucketKey, Vec<String>> = BTreeMap::new();
    for code in distinct {
        buckets.entry(BucketKey::for_code(&code)).or_default().push(code);
    }

    for (key, codes) in &mut buckets {
        match key {
            BucketKey::Range(_) => {
                codes.sort_by_key(|code| code.parse::<u32>().unwrap_or(u32::MAX))
            }
            BucketKey::Unknown => codes.sort(),
        }
    }

    buckets
}

// ============================================================================
// TESTS
// ============================================================================
