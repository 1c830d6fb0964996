// Roll Explorer - Core Library
// Quebec property-assessment-roll analysis: directory, parse, bucket, aggregate

pub mod directory;
pub mod roll;
pub mod buckets;
pub mod aggregate;
pub mod session;
pub mod export;

// Re-export commonly used types
pub use directory::{
    DirectoryApi, DirectoryFetcher, DirectoryRecord, HttpDirectoryApi, RegionEntry,
    DATASTORE_URL, PAGE_SIZE, ROLL_RESOURCE_ID,
};
pub use roll::{
    fetch_roll, parse_roll, ParcelRecord,
    PARCEL_TAG, UNIT_COUNT_TAG, UNKNOWN_CODE, USAGE_CODE_TAG,
};
pub use buckets::{bucket_codes, BucketKey};
pub use aggregate::{aggregate, Aggregation, SummaryRow};
pub use session::{LoadError, SelectionOutcome, Session};
pub use export::{summary_csv_string, write_summary_csv};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
