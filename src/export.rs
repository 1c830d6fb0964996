// 💾 Export - CSV rendering of the aggregation summary
// Thin consumer of the core; the CLI prints this to stdout

use crate::aggregate::Aggregation;
use anyhow::{Context, Result};
use std::io::Write;

/// Write the per-code summary rows as CSV, header included
pub fn write_summary_csv<W: Write>(writer: W, aggregation: &Aggregation) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    for row in &aggregation.summary {
        csv.serialize(row).context("Failed to serialize summary row")?;
    }

    csv.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Summary as an in-memory CSV string
pub fn summary_csv_string(aggregation: &Aggregation) -> Result<String> {
    let mut buffer = Vec::new();
    write_summary_csv(&mut buffer, aggregation)?;
    String::from_utf8(buffer).context("CSV output was not UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::SummaryRow;

    #[test]
    fn test_summary_csv() {
        let aggregation = Aggregation {
            building_count: 3,
            unit_total: 7,
            summary: vec![
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
            ],
        };

        let csv = summary_csv_string(&aggregation).unwrap();

        assert_eq!(
            csv,
            "usage_code,building_count,unit_total\n\
             1000,2,3\n\
             1322,1,4\n"
        );
    }

    #[test]
    fn test_empty_summary_yields_no_rows() {
        let csv = summary_csv_string(&Aggregation::empty()).unwrap();
        assert!(csv.is_empty());
    }
}
