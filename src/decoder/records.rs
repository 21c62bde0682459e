//! Per-kind STDF V4 record body parsers.
//!
//! Each parser reads fields in specification order and stores them as text
//! under their STDF field names. Parsing stops at the first field the body
//! does not contain, which is how STDF encodes omitted trailing fields.

use super::reader::FieldReader;
use crate::models::{DecodedRecord, RecordKind};

/// STDF sentinel for a missing SOFT_BIN
const MISSING_BIN: u16 = 65535;

/// STDF sentinel for a missing die coordinate
const MISSING_COORD: i16 = -32768;

/// PARM/TEST_FLG bit marking RESULT as invalid
const RESULT_INVALID: u8 = 0x02;

/// Decode one record body into a `DecodedRecord`
pub fn decode_body(kind: RecordKind, body: &[u8], little_endian: bool) -> DecodedRecord {
    let mut record = DecodedRecord::new(kind);
    let mut r = FieldReader::new(body, little_endian);

    // A `None` only means the body ended early; what was read is kept.
    let _ = match kind {
        RecordKind::Far => parse_far(&mut r, &mut record),
        RecordKind::Mir => parse_mir(&mut r, &mut record),
        RecordKind::Mrr => parse_mrr(&mut r, &mut record),
        RecordKind::Hbr => parse_bin(&mut r, &mut record, "HBIN"),
        RecordKind::Sbr => parse_bin(&mut r, &mut record, "SBIN"),
        RecordKind::Wir => parse_wir(&mut r, &mut record),
        RecordKind::Wrr => parse_wrr(&mut r, &mut record),
        RecordKind::Pir => parse_pir(&mut r, &mut record),
        RecordKind::Prr => parse_prr(&mut r, &mut record),
        RecordKind::Ptr => parse_ptr(&mut r, &mut record),
        RecordKind::Mpr => parse_mpr(&mut r, &mut record),
        RecordKind::Ftr => parse_ftr(&mut r, &mut record),
        _ => Some(()),
    };

    record
}

fn put(record: &mut DecodedRecord, key: &str, value: impl ToString) {
    record.fields.insert(key.to_string(), value.to_string());
}

fn put_char(record: &mut DecodedRecord, key: &str, value: char) {
    let text = if value == ' ' || value == '\0' {
        String::new()
    } else {
        value.to_string()
    };
    record.fields.insert(key.to_string(), text);
}

fn put_strings(r: &mut FieldReader, record: &mut DecodedRecord, keys: &[&str]) -> Option<()> {
    for key in keys {
        let value = r.cn()?;
        put(record, key, value);
    }
    Some(())
}

fn parse_far(r: &mut FieldReader, record: &mut DecodedRecord) -> Option<()> {
    put(record, "CPU_TYPE", r.u1()?);
    put(record, "STDF_VER", r.u1()?);
    Some(())
}

fn parse_mir(r: &mut FieldReader, record: &mut DecodedRecord) -> Option<()> {
    put(record, "SETUP_T", r.u4()?);
    put(record, "START_T", r.u4()?);
    put(record, "STAT_NUM", r.u1()?);
    put_char(record, "MODE_COD", r.c1()?);
    put_char(record, "RTST_COD", r.c1()?);
    put_char(record, "PROT_COD", r.c1()?);
    put(record, "BURN_TIM", r.u2()?);
    put_char(record, "CMOD_COD", r.c1()?);
    put_strings(
        r,
        record,
        &[
            "LOT_ID", "PART_TYP", "NODE_NAM", "TSTR_TYP", "JOB_NAM", "JOB_REV", "SBLOT_ID",
            "OPER_NAM", "EXEC_TYP", "EXEC_VER", "TEST_COD", "TST_TEMP", "USER_TXT", "AUX_FILE",
            "PKG_TYP", "FAMLY_ID", "DATE_COD", "FACIL_ID", "FLOOR_ID", "PROC_ID", "OPER_FRQ",
            "SPEC_NAM", "SPEC_VER", "FLOW_ID", "SETUP_ID", "DSGN_REV", "ENG_ID", "ROM_COD",
            "SERL_NUM", "SUPR_NAM",
        ],
    )
}

fn parse_mrr(r: &mut FieldReader, record: &mut DecodedRecord) -> Option<()> {
    put(record, "FINISH_T", r.u4()?);
    put_char(record, "DISP_COD", r.c1()?);
    put_strings(r, record, &["USR_DESC", "EXC_DESC"])
}

fn parse_bin(r: &mut FieldReader, record: &mut DecodedRecord, prefix: &str) -> Option<()> {
    read_head_site(r, record)?;
    put(record, &format!("{prefix}_NUM"), r.u2()?);
    put(record, &format!("{prefix}_CNT"), r.u4()?);
    put_char(record, &format!("{prefix}_PF"), r.c1()?);
    put(record, &format!("{prefix}_NAM"), r.cn()?);
    Some(())
}

fn parse_wir(r: &mut FieldReader, record: &mut DecodedRecord) -> Option<()> {
    let head_num = r.u1()?;
    record.head_num = head_num;
    put(record, "HEAD_NUM", head_num);
    put(record, "SITE_GRP", r.u1()?);
    put(record, "START_T", r.u4()?);
    put(record, "WAFER_ID", r.cn()?);
    Some(())
}

fn parse_wrr(r: &mut FieldReader, record: &mut DecodedRecord) -> Option<()> {
    let head_num = r.u1()?;
    record.head_num = head_num;
    put(record, "HEAD_NUM", head_num);
    put(record, "SITE_GRP", r.u1()?);
    for key in [
        "FINISH_T", "PART_CNT", "RTST_CNT", "ABRT_CNT", "GOOD_CNT", "FUNC_CNT",
    ] {
        put(record, key, r.u4()?);
    }
    put_strings(
        r,
        record,
        &[
            "WAFER_ID", "FABWF_ID", "FRAME_ID", "MASK_ID", "USR_DESC", "EXC_DESC",
        ],
    )
}

fn parse_pir(r: &mut FieldReader, record: &mut DecodedRecord) -> Option<()> {
    read_head_site(r, record)?;
    Some(())
}

fn parse_prr(r: &mut FieldReader, record: &mut DecodedRecord) -> Option<()> {
    read_head_site(r, record)?;
    put(record, "PART_FLG", r.u1()?);
    put(record, "NUM_TEST", r.u2()?);
    put(record, "HARD_BIN", r.u2()?);

    let soft_bin = r.u2()?;
    if soft_bin != MISSING_BIN {
        put(record, "SOFT_BIN", soft_bin);
    }
    let x_coord = r.i2()?;
    if x_coord != MISSING_COORD {
        put(record, "X_COORD", x_coord);
    }
    let y_coord = r.i2()?;
    if y_coord != MISSING_COORD {
        put(record, "Y_COORD", y_coord);
    }

    put(record, "TEST_T", r.u4()?);
    put_strings(r, record, &["PART_ID", "PART_TXT"])?;
    r.skip_bn()
}

/// Shared leading fields of PTR, MPR and FTR
fn parse_test_header(r: &mut FieldReader, record: &mut DecodedRecord) -> Option<u8> {
    let test_num = r.u4()?;
    record.test_num = test_num;
    put(record, "TEST_NUM", test_num);
    read_head_site(r, record)?;
    let test_flg = r.u1()?;
    put(record, "TEST_FLG", test_flg);
    Some(test_flg)
}

fn read_head_site(r: &mut FieldReader, record: &mut DecodedRecord) -> Option<()> {
    let head_num = r.u1()?;
    record.head_num = head_num;
    put(record, "HEAD_NUM", head_num);
    let site_num = r.u1()?;
    record.site_num = site_num;
    put(record, "SITE_NUM", site_num);
    Some(())
}

fn read_test_text(r: &mut FieldReader, record: &mut DecodedRecord) -> Option<()> {
    let test_txt = r.cn()?;
    put(record, "TEST_TXT", &test_txt);
    record.test_txt = test_txt;
    let alarm_id = r.cn()?;
    put(record, "ALARM_ID", &alarm_id);
    record.alarm_id = alarm_id;
    Some(())
}

fn read_units(r: &mut FieldReader, record: &mut DecodedRecord) -> Option<()> {
    let units = r.cn()?;
    put(record, "UNITS", &units);
    record.units = units;
    Some(())
}

fn read_limits(r: &mut FieldReader, record: &mut DecodedRecord) -> Option<()> {
    put(record, "OPT_FLAG", r.u1()?);
    put(record, "RES_SCAL", r.i1()?);
    put(record, "LLM_SCAL", r.i1()?);
    put(record, "HLM_SCAL", r.i1()?);
    put(record, "LO_LIMIT", r.r4()?);
    put(record, "HI_LIMIT", r.r4()?);
    Some(())
}

fn parse_ptr(r: &mut FieldReader, record: &mut DecodedRecord) -> Option<()> {
    let test_flg = parse_test_header(r, record)?;
    put(record, "PARM_FLG", r.u1()?);

    let result = r.r4()?;
    put(record, "RESULT", result);
    if test_flg & RESULT_INVALID == 0 {
        record.result = Some(f64::from(result));
    }

    read_test_text(r, record)?;
    read_limits(r, record)?;

    read_units(r, record)?;
    put_strings(r, record, &["C_RESFMT", "C_LLMFMT", "C_HLMFMT"])?;
    put(record, "LO_SPEC", r.r4()?);
    put(record, "HI_SPEC", r.r4()?);
    Some(())
}

fn parse_mpr(r: &mut FieldReader, record: &mut DecodedRecord) -> Option<()> {
    parse_test_header(r, record)?;
    put(record, "PARM_FLG", r.u1()?);

    let rtn_icnt = r.u2()? as usize;
    let rslt_cnt = r.u2()? as usize;
    put(record, "RTN_ICNT", rtn_icnt);
    put(record, "RSLT_CNT", rslt_cnt);
    r.skip_nibbles(rtn_icnt)?;

    let results = r.r4_array(rslt_cnt)?;
    let joined = results
        .iter()
        .map(f32::to_string)
        .collect::<Vec<_>>()
        .join(",");
    put(record, "RTN_RSLT", joined);

    read_test_text(r, record)?;
    read_limits(r, record)?;
    put(record, "START_IN", r.r4()?);
    put(record, "INCR_IN", r.r4()?);
    r.u2_array(rtn_icnt)?;

    read_units(r, record)?;
    Some(())
}

fn parse_ftr(r: &mut FieldReader, record: &mut DecodedRecord) -> Option<()> {
    parse_test_header(r, record)?;
    put(record, "OPT_FLAG", r.u1()?);
    for key in ["CYCL_CNT", "REL_VADR", "REPT_CNT", "NUM_FAIL"] {
        put(record, key, r.u4()?);
    }
    put(record, "XFAIL_AD", r.i4()?);
    put(record, "YFAIL_AD", r.i4()?);
    put(record, "VECT_OFF", r.i2()?);

    let rtn_icnt = r.u2()? as usize;
    let pgm_icnt = r.u2()? as usize;
    r.u2_array(rtn_icnt)?;
    r.skip_nibbles(rtn_icnt)?;
    r.u2_array(pgm_icnt)?;
    r.skip_nibbles(pgm_icnt)?;
    r.skip_dn()?;

    put_strings(r, record, &["VECT_NAM", "TIME_SET", "OP_CODE"])?;
    read_test_text(r, record)?;
    put_strings(r, record, &["PROG_TXT", "RSLT_TXT"])
}
