//! Scan text parser
//!
//! Turns the moon scan text produced by the game client (after normalization)
//! into one `YieldRecord` per scanned moon:
//! - Row 0 is the column legend and is skipped
//! - A row containing a space starts a new moon; tabs are stripped from its name
//! - Other rows are `<blank>\t<ore name>\t<fraction>\t<ore type id>\t...`
//! - Rows that cannot be resolved against the material reference are ignored
//!
//! Quantities are floored at every accumulation step so totals match the
//! figures the game itself reports.

use tracing::debug;

use crate::materials::{MaterialReference, HIGH_TIER_ORE_BOUNDARY, REFINED_GOODS_BOUNDARY};
use crate::types::{MaterialId, YieldRecord};

/// Units of ore an automatic extractor pulls per cycle, per unit of fraction
const AUTO_EXTRACTION_MULTIPLIER: f64 = 12.0;

/// Units of ore a manual mining operation yields per cycle, per unit of fraction
const MANUAL_EXTRACTION_MULTIPLIER: f64 = 30.0;

/// Refining efficiency applied to manually mined ore
const MANUAL_REFINE_EFFICIENCY: f64 = 0.87;

/// m3 per unit of manually mined ore, times the chunk scaling of the scan
const MANUAL_VOLUME_FACTOR: u64 = 10 * 100;

/// Marker row the normalization service emits for skyhook entries
const SKYHOOK_MARKER: &str = "skyhook";

pub struct ScanParser<'a> {
    reference: &'a MaterialReference,
}

impl<'a> ScanParser<'a> {
    pub fn new(reference: &'a MaterialReference) -> Self {
        Self { reference }
    }

    /// Parse scan text into yield records, in the order the moons appear
    pub fn parse(&self, text: &str) -> Vec<YieldRecord> {
        let mut records = Vec::new();
        let mut current: Option<YieldRecord> = None;

        for row in text.split('\n').skip(1) {
            let row = row.trim_end_matches('\r');
            if Self::is_header(row) {
                if let Some(done) = current.take() {
                    records.push(done);
                }
                current = Some(YieldRecord::new(row.replace('\t', "")));
                continue;
            }

            if row.is_empty() || row == SKYHOOK_MARKER {
                continue;
            }

            match current.as_mut() {
                Some(record) => self.accumulate(record, row),
                None => debug!("Ignoring scan row before first moon: {:?}", row),
            }
        }

        if let Some(done) = current {
            records.push(done);
        }

        records
    }

    fn is_header(row: &str) -> bool {
        row.contains(' ')
    }

    fn accumulate(&self, record: &mut YieldRecord, row: &str) {
        let Some((quantity, ore_id)) = Self::parse_data_row(row) else {
            debug!("Skipping malformed scan row: {:?}", row);
            return;
        };
        let Some(breakdown) = self.reference.breakdown(ore_id) else {
            debug!("Skipping scan row with unknown ore type {}", ore_id);
            return;
        };

        if ore_id > HIGH_TIER_ORE_BOUNDARY {
            record.volume += (MANUAL_EXTRACTION_MULTIPLIER * quantity).floor() as u64 * MANUAL_VOLUME_FACTOR;
            for portion in breakdown {
                let mined = (portion.quantity * MANUAL_EXTRACTION_MULTIPLIER * quantity).floor();
                let refined = (mined * MANUAL_REFINE_EFFICIENCY).floor() as u64;
                *record.manual_materials.entry(portion.material_type_id).or_insert(0) += refined;
            }
        }

        for portion in breakdown
            .iter()
            .filter(|p| p.material_type_id > REFINED_GOODS_BOUNDARY)
        {
            let amount = (portion.quantity * AUTO_EXTRACTION_MULTIPLIER * quantity).floor() as u64;
            *record.materials.entry(portion.material_type_id).or_insert(0) += amount;
        }
    }

    fn parse_data_row(row: &str) -> Option<(f64, MaterialId)> {
        let mut columns = row.split('\t').skip(2);
        let quantity: f64 = columns.next()?.trim().parse().ok()?;
        let ore_id: MaterialId = columns.next()?.trim().parse().ok()?;
        if !quantity.is_finite() || quantity < 0.0 {
            return None;
        }
        Some((quantity, ore_id))
    }
}

/// Convenience wrapper around `ScanParser::parse`
pub fn parse_scan(text: &str, reference: &MaterialReference) -> Vec<YieldRecord> {
    ScanParser::new(reference).parse(text)
}
