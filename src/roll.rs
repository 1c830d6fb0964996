// 📄 Roll Parser - property-roll XML → parcel records
// One ParcelRecord per RLUEx element, with lenient per-field coercion

use anyhow::{Context, Result};
use log::{debug, warn};
use roxmltree::Document;
use serde::{Deserialize, Serialize};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Per-parcel element tag in the provincial roll schema
pub const PARCEL_TAG: &str = "RLUEx";

/// Child element carrying the CUBF usage code
pub const USAGE_CODE_TAG: &str = "RL0105A";

/// Child element carrying the housing-unit count
pub const UNIT_COUNT_TAG: &str = "RL0311A";

/// Sentinel usage code for parcels with no usable CUBF value
pub const UNKNOWN_CODE: &str = "Unknown";

// ============================================================================
// CORE TYPES
// ============================================================================

/// ParcelRecord - one assessed parcel, normalized
///
/// Field defects are repaired, never rejected: a missing or blank usage
/// code becomes the "Unknown" sentinel, a missing or non-integer unit
/// count becomes 0. This leniency is a policy of the source data, where
/// partial records are routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelRecord {
    /// CUBF usage code, trimmed; "Unknown" when absent
    pub usage_code: String,

    /// Housing units on the parcel; 0 when absent or unparsable
    pub unit_count: u32,
}

// ============================================================================
// PARSER
// ============================================================================

/// Parse a property-roll XML document into parcel records
///
/// Matches every `RLUEx` element at any depth, in document order. Returns
/// an empty vec when the input is not well-formed XML - the defect is
/// logged, not propagated.
pub fn parse_roll(xml: &[u8]) -> Vec<ParcelRecord> {
    let text = match std::str::from_utf8(xml) {
        Ok(text) => text,
        Err(e) => {
            warn!("Roll XML is not valid UTF-8: {}", e);
            return Vec::new();
        }
    };

    let document = match Document::parse(text) {
        Ok(document) => document,
        Err(e) => {
            warn!("Roll XML is malformed: {}", e);
            return Vec::new();
        }
    };

    let records: Vec<ParcelRecord> = document
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == PARCEL_TAG)
        .map(parcel_from_element)
        .collect();

    debug!("Parsed {} parcel records", records.len());
    records
}

fn parcel_from_element(element: roxmltree::Node) -> ParcelRecord {
    let usage_code = child_text(&element, USAGE_CODE_TAG)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| {
            debug!("Parcel without usage code, substituting sentinel");
            UNKNOWN_CODE.to_string()
        });

    let unit_count = match child_text(&element, UNIT_COUNT_TAG) {
        Some(text) => text.trim().parse::<u32>().unwrap_or_else(|_| {
            debug!("Unparsable unit count {:?}, substituting 0", text);
            0
        }),
        None => 0,
    };

    ParcelRecord {
        usage_code,
        unit_count,
    }
}

/// Text of the first direct child element with the given tag, if any
fn child_text<'a>(element: &'a roxmltree::Node, tag: &str) -> Option<&'a str> {
    element
        .children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
        .and_then(|child| child.text())
}

// ============================================================================
// ROLL DOWNLOAD
// ============================================================================

/// Download a region's roll XML
///
/// Unlike the directory fetch, a failure here is a real error: the caller
/// must be able to tell the user the load failed and keep its current
/// record set untouched.
pub fn fetch_roll(url: &str) -> Result<Vec<u8>> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("roll-explorer/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Roll download failed: {}", url))?
        .error_for_status()
        .with_context(|| format!("Roll download rejected: {}", url))?;

    let bytes = response
        .bytes()
        .with_context(|| format!("Roll download truncated: {}", url))?;

    debug!("Downloaded {} roll bytes from {}", bytes.len(), url);
    Ok(bytes.to_vec())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_parcels_with_coercions() {
        let xml = b"<root>\
            <RLUEx><RL0105A> 1322 </RL0105A><RL0311A>4</RL0311A></RLUEx>\
            <RLUEx><RL0311A>abc</RL0311A></RLUEx>\
        </root>";

        let records = parse_roll(xml);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].usage_code, "1322");
        assert_eq!(records[0].unit_count, 4);
        assert_eq!(records[1].usage_code, "Unknown");
        assert_eq!(records[1].unit_count, 0);
    }

    #[test]
    fn test_malformed_xml_yields_empty() {
        assert!(parse_roll(b"<root><RLUEx>").is_empty());
        assert!(parse_roll(b"not xml at all").is_empty());
        assert!(parse_roll(&[0xff, 0xfe, 0x00]).is_empty());
    }

    #[test]
    fn test_parcels_found_at_any_depth() {
        let xml = b"<RLM>\
            <RLPROPRIO/>\
            <RLZU><RLUEx><RL0105A>5010</RL0105A><RL0311A>12</RL0311A></RLUEx></RLZU>\
            <RLZU><RLSousZone><RLUEx><RL0105A>1000</RL0105A></RLUEx></RLSousZone></RLZU>\
        </RLM>";

        let records = parse_roll(xml);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].usage_code, "5010");
        assert_eq!(records[1].usage_code, "1000");
        assert_eq!(records[1].unit_count, 0);
    }

    #[test]
    fn test_blank_usage_code_becomes_sentinel() {
        let xml = b"<root><RLUEx><RL0105A>   </RL0105A><RL0311A>2</RL0311A></RLUEx></root>";

        let records = parse_roll(xml);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].usage_code, UNKNOWN_CODE);
        assert_eq!(records[0].unit_count, 2);
    }

    #[test]
    fn test_negative_unit_count_coerces_to_zero() {
        let xml = b"<root><RLUEx><RL0105A>1000</RL0105A><RL0311A>-3</RL0311A></RLUEx></root>";

        let records = parse_roll(xml);
        assert_eq!(records[0].unit_count, 0);
    }

    #[test]
    fn test_document_order_is_preserved() {
        let xml = b"<root>\
            <RLUEx><RL0105A>3000</RL0105A></RLUEx>\
            <RLUEx><RL0105A>1000</RL0105A></RLUEx>\
            <RLUEx><RL0105A>2000</RL0105A></RLUEx>\
        </root>";

        let codes: Vec<String> = parse_roll(xml)
            .into_iter()
            .map(|record| record.usage_code)
            .collect();

        assert_eq!(codes, vec!["3000", "1000", "2000"]);
    }

    #[test]
    fn test_no_parcel_elements_yields_empty() {
        let xml = b"<root><RLPROPRIO><RL0105A>1000</RL0105A></RLPROPRIO></root>";
        assert!(parse_roll(xml).is_empty());
    }
}
