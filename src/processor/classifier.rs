//! Partitioning of a decoded record sequence into per-kind views.

use crate::models::{DecodedRecord, RecordKind};
use std::collections::BTreeMap;

/// Borrowed views over one file's records, in input order
#[derive(Debug, Default)]
pub struct ClassifiedRecords<'a> {
    /// MIR
    pub headers: Vec<&'a DecodedRecord>,
    /// PRR
    pub devices: Vec<&'a DecodedRecord>,
    /// PTR, MPR and FTR
    pub tests: Vec<&'a DecodedRecord>,
    /// HBR and SBR
    pub bins: Vec<&'a DecodedRecord>,
}

impl<'a> ClassifiedRecords<'a> {
    /// Single pass over the records; kinds outside the four views are skipped
    pub fn classify(records: &'a [DecodedRecord]) -> Self {
        let mut classified = Self::default();

        for record in records {
            match record.kind {
                RecordKind::Mir => classified.headers.push(record),
                RecordKind::Prr => classified.devices.push(record),
                RecordKind::Ptr | RecordKind::Mpr | RecordKind::Ftr => {
                    classified.tests.push(record)
                }
                RecordKind::Hbr | RecordKind::Sbr => classified.bins.push(record),
                _ => {}
            }
        }

        classified
    }

    /// Number of records that landed in any view
    pub fn classified_count(&self) -> usize {
        self.headers.len() + self.devices.len() + self.tests.len() + self.bins.len()
    }
}

/// Record counts keyed by kind mnemonic
pub fn count_by_kind(records: &[DecodedRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.kind.to_string()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(kinds: &[RecordKind]) -> Vec<DecodedRecord> {
        kinds.iter().map(|kind| DecodedRecord::new(*kind)).collect()
    }

    #[test]
    fn test_classify_partitions_by_kind() {
        let input = records(&[
            RecordKind::Far,
            RecordKind::Mir,
            RecordKind::Pir,
            RecordKind::Ptr,
            RecordKind::Mpr,
            RecordKind::Prr,
            RecordKind::Ftr,
            RecordKind::Sbr,
            RecordKind::Hbr,
            RecordKind::Mrr,
        ]);

        let classified = ClassifiedRecords::classify(&input);

        assert_eq!(classified.headers.len(), 1);
        assert_eq!(classified.devices.len(), 1);
        assert_eq!(classified.bins.len(), 2);
        let test_kinds: Vec<_> = classified.tests.iter().map(|r| r.kind).collect();
        assert_eq!(
            test_kinds,
            vec![RecordKind::Ptr, RecordKind::Mpr, RecordKind::Ftr]
        );
        assert_eq!(classified.classified_count(), 7);
    }

    #[test]
    fn test_classify_preserves_order_within_view() {
        let input = vec![
            DecodedRecord::new(RecordKind::Prr).with_field("PART_ID", "A"),
            DecodedRecord::new(RecordKind::Ptr),
            DecodedRecord::new(RecordKind::Prr).with_field("PART_ID", "B"),
            DecodedRecord::new(RecordKind::Prr).with_field("PART_ID", "C"),
        ];

        let classified = ClassifiedRecords::classify(&input);
        let labels: Vec<_> = classified
            .devices
            .iter()
            .filter_map(|r| r.field("PART_ID"))
            .collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_unknown_kinds_excluded() {
        let input = records(&[RecordKind::from_header(99, 9), RecordKind::Gdr]);
        let classified = ClassifiedRecords::classify(&input);
        assert_eq!(classified.classified_count(), 0);
    }

    #[test]
    fn test_count_by_kind() {
        let input = records(&[RecordKind::Ptr, RecordKind::Ptr, RecordKind::Prr]);
        let counts = count_by_kind(&input);
        assert_eq!(counts.get("PTR"), Some(&2));
        assert_eq!(counts.get("PRR"), Some(&1));
    }
}
