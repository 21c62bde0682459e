//! Lot, facility and equipment context from the file's header record.
//!
//! Only the first header record is used. STDF files carry one MIR; when a
//! concatenated or repaired file carries more, the later ones are ignored.

use crate::constants::header_fields::*;
use crate::models::{DecodedRecord, Metadata};
use tracing::debug;

/// Build the metadata for one file; all fields are empty without a header
pub fn extract_metadata(headers: &[&DecodedRecord]) -> Metadata {
    let Some(header) = headers.first() else {
        debug!("No header record, metadata left empty");
        return Metadata::default();
    };

    if headers.len() > 1 {
        debug!("Ignoring {} additional header records", headers.len() - 1);
    }

    let field = |primary, fallback| header.field_or(primary, fallback).to_string();

    Metadata {
        facility: field(FACIL_ID, FLOOR_ID),
        operation: field(OPER_NAM, SPEC_NAM),
        lot_name: field(LOT_ID, PART_TYP),
        equipment: field(NODE_NAM, JOB_NAM),
        prog_name: field(JOB_REV, JOB_NAM),
        prog_version: field(SBLOT_ID, JOB_REV),
        start_time: field(START_T, SETUP_T),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordKind;

    #[test]
    fn test_primary_fields() {
        let mir = DecodedRecord::new(RecordKind::Mir)
            .with_field(FACIL_ID, "FAB7")
            .with_field(OPER_NAM, "FT1")
            .with_field(LOT_ID, "LOT42")
            .with_field(NODE_NAM, "TESTER-3")
            .with_field(JOB_REV, "rev2")
            .with_field(SBLOT_ID, "S1")
            .with_field(START_T, "1700000000");

        let metadata = extract_metadata(&[&mir]);

        assert_eq!(metadata.facility, "FAB7");
        assert_eq!(metadata.operation, "FT1");
        assert_eq!(metadata.lot_name, "LOT42");
        assert_eq!(metadata.equipment, "TESTER-3");
        assert_eq!(metadata.prog_name, "rev2");
        assert_eq!(metadata.prog_version, "S1");
        assert_eq!(metadata.start_time, "1700000000");
    }

    #[test]
    fn test_fallback_fields_when_primary_missing_or_empty() {
        let mir = DecodedRecord::new(RecordKind::Mir)
            .with_field(FACIL_ID, "")
            .with_field(FLOOR_ID, "F2")
            .with_field(SPEC_NAM, "spec")
            .with_field(PART_TYP, "P100")
            .with_field(JOB_NAM, "job");

        let metadata = extract_metadata(&[&mir]);

        assert_eq!(metadata.facility, "F2");
        assert_eq!(metadata.operation, "spec");
        assert_eq!(metadata.lot_name, "P100");
        assert_eq!(metadata.equipment, "job");
        assert_eq!(metadata.prog_name, "job");
        assert_eq!(metadata.prog_version, "");
    }

    #[test]
    fn test_no_header_gives_empty_metadata() {
        assert!(extract_metadata(&[]).is_empty());
    }

    #[test]
    fn test_only_first_header_used() {
        let first = DecodedRecord::new(RecordKind::Mir).with_field(LOT_ID, "FIRST");
        let second = DecodedRecord::new(RecordKind::Mir).with_field(LOT_ID, "SECOND");

        assert_eq!(extract_metadata(&[&first, &second]).lot_name, "FIRST");
    }
}
