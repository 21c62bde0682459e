//! Output column tables and DataFrame packing.
//!
//! Each output table is described once, as an ordered list of fields with
//! a name, a semantic description and a typed accessor. The accessor's
//! variant fixes the storage type, so the Polars schema, the column-name
//! listing and row packing all iterate the same table and cannot drift.

use crate::error::Result;
use crate::models::{DeviceInfo, Measurement};
use polars::prelude::*;

/// Destination storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    UInt8,
    UInt32,
    Int32,
    Float64,
    Utf8,
}

impl StorageType {
    pub fn dtype(self) -> DataType {
        match self {
            StorageType::UInt8 => DataType::UInt8,
            StorageType::UInt32 => DataType::UInt32,
            StorageType::Int32 => DataType::Int32,
            StorageType::Float64 => DataType::Float64,
            StorageType::Utf8 => DataType::String,
        }
    }

    /// Column type as written in warehouse DDL
    pub fn sql_type(self) -> &'static str {
        match self {
            StorageType::UInt8 => "UInt8",
            StorageType::UInt32 => "UInt32",
            StorageType::Int32 => "Int32",
            StorageType::Float64 => "Float64",
            StorageType::Utf8 => "String",
        }
    }
}

/// Typed read access to one field of a row
pub enum Accessor<R> {
    UInt8(fn(&R) -> u8),
    UInt32(fn(&R) -> u32),
    Int32(fn(&R) -> i32),
    Float64(fn(&R) -> f64),
    Utf8(fn(&R) -> &str),
}

/// One column: name, meaning and accessor
pub struct FieldSpec<R> {
    pub name: &'static str,
    pub semantic: &'static str,
    pub accessor: Accessor<R>,
}

impl<R> FieldSpec<R> {
    pub fn storage(&self) -> StorageType {
        match self.accessor {
            Accessor::UInt8(_) => StorageType::UInt8,
            Accessor::UInt32(_) => StorageType::UInt32,
            Accessor::Int32(_) => StorageType::Int32,
            Accessor::Float64(_) => StorageType::Float64,
            Accessor::Utf8(_) => StorageType::Utf8,
        }
    }

    fn column(&self, rows: &[R]) -> Column {
        let name: PlSmallStr = self.name.into();
        let series = match &self.accessor {
            Accessor::UInt8(get) => Series::new(name, rows.iter().map(get).collect::<Vec<u8>>()),
            Accessor::UInt32(get) => Series::new(name, rows.iter().map(get).collect::<Vec<u32>>()),
            Accessor::Int32(get) => Series::new(name, rows.iter().map(get).collect::<Vec<i32>>()),
            Accessor::Float64(get) => {
                Series::new(name, rows.iter().map(get).collect::<Vec<f64>>())
            }
            Accessor::Utf8(get) => Series::new(name, rows.iter().map(get).collect::<Vec<&str>>()),
        };
        Column::from(series)
    }
}

/// Measurement table, in column order
pub static MEASUREMENT_FIELDS: &[FieldSpec<Measurement>] = &[
    FieldSpec {
        name: "device_id",
        semantic: "device identifier",
        accessor: Accessor::UInt32(|m| m.device_id),
    },
    FieldSpec {
        name: "param_id",
        semantic: "parameter identifier",
        accessor: Accessor::UInt32(|m| m.param_id),
    },
    FieldSpec {
        name: "pos_x",
        semantic: "x coordinate",
        accessor: Accessor::Int32(|m| m.pos_x),
    },
    FieldSpec {
        name: "pos_y",
        semantic: "y coordinate",
        accessor: Accessor::Int32(|m| m.pos_y),
    },
    FieldSpec {
        name: "value",
        semantic: "measured value",
        accessor: Accessor::Float64(|m| m.value),
    },
    FieldSpec {
        name: "pass_flag",
        semantic: "device pass flag",
        accessor: Accessor::UInt8(|m| m.pass_flag),
    },
    FieldSpec {
        name: "segment",
        semantic: "segment marker",
        accessor: Accessor::UInt8(|m| m.segment),
    },
    FieldSpec {
        name: "file_token",
        semantic: "input file content token",
        accessor: Accessor::Utf8(|m| m.file_token.as_ref()),
    },
    FieldSpec {
        name: "device_label",
        semantic: "raw device label",
        accessor: Accessor::Utf8(|m| m.device_label.as_ref()),
    },
    FieldSpec {
        name: "param_name",
        semantic: "cleaned parameter name",
        accessor: Accessor::Utf8(|m| m.param_name.as_ref()),
    },
    FieldSpec {
        name: "units",
        semantic: "measurement units",
        accessor: Accessor::Utf8(|m| m.units.as_ref()),
    },
    FieldSpec {
        name: "test_num",
        semantic: "raw test number",
        accessor: Accessor::UInt32(|m| m.test_num),
    },
    FieldSpec {
        name: "test_flg",
        semantic: "raw test flag byte",
        accessor: Accessor::UInt8(|m| m.test_flg),
    },
];

/// Device table, in column order
pub static DEVICE_FIELDS: &[FieldSpec<DeviceInfo>] = &[
    FieldSpec {
        name: "device_id",
        semantic: "device identifier",
        accessor: Accessor::UInt32(|d| d.device_id),
    },
    FieldSpec {
        name: "device_label",
        semantic: "raw device label",
        accessor: Accessor::Utf8(|d| d.device_label.as_ref()),
    },
    FieldSpec {
        name: "bin_code",
        semantic: "bin code",
        accessor: Accessor::Utf8(|d| d.bin_code.as_str()),
    },
    FieldSpec {
        name: "bin_desc",
        semantic: "bin name",
        accessor: Accessor::Utf8(|d| d.bin_desc.as_str()),
    },
    FieldSpec {
        name: "pass_flag",
        semantic: "device pass flag",
        accessor: Accessor::UInt8(|d| d.pass_flag),
    },
    FieldSpec {
        name: "pos_x",
        semantic: "x coordinate",
        accessor: Accessor::Int32(|d| d.pos_x),
    },
    FieldSpec {
        name: "pos_y",
        semantic: "y coordinate",
        accessor: Accessor::Int32(|d| d.pos_y),
    },
    FieldSpec {
        name: "file_token",
        semantic: "input file content token",
        accessor: Accessor::Utf8(|d| d.file_token.as_ref()),
    },
    FieldSpec {
        name: "facility",
        semantic: "test facility",
        accessor: Accessor::Utf8(|d| d.metadata.facility.as_str()),
    },
    FieldSpec {
        name: "operation",
        semantic: "test operation",
        accessor: Accessor::Utf8(|d| d.metadata.operation.as_str()),
    },
    FieldSpec {
        name: "lot_name",
        semantic: "lot name",
        accessor: Accessor::Utf8(|d| d.metadata.lot_name.as_str()),
    },
    FieldSpec {
        name: "equipment",
        semantic: "tester node",
        accessor: Accessor::Utf8(|d| d.metadata.equipment.as_str()),
    },
    FieldSpec {
        name: "prog_name",
        semantic: "test program name",
        accessor: Accessor::Utf8(|d| d.metadata.prog_name.as_str()),
    },
    FieldSpec {
        name: "prog_version",
        semantic: "test program version",
        accessor: Accessor::Utf8(|d| d.metadata.prog_version.as_str()),
    },
    FieldSpec {
        name: "start_time",
        semantic: "run start time",
        accessor: Accessor::Utf8(|d| d.metadata.start_time.as_str()),
    },
];

/// Column names in table order
pub fn column_names<R>(fields: &[FieldSpec<R>]) -> Vec<&'static str> {
    fields.iter().map(|field| field.name).collect()
}

/// Polars schema of a table
pub fn polars_schema<R>(fields: &[FieldSpec<R>]) -> Schema {
    Schema::from_iter(
        fields
            .iter()
            .map(|field| Field::new(field.name.into(), field.storage().dtype())),
    )
}

/// `CREATE TABLE` column list for a table
pub fn column_ddl<R>(fields: &[FieldSpec<R>]) -> String {
    fields
        .iter()
        .map(|field| format!("{} {}", field.name, field.storage().sql_type()))
        .collect::<Vec<_>>()
        .join(",\n")
}

/// Pack rows column by column into a DataFrame
pub fn to_dataframe<R>(fields: &[FieldSpec<R>], rows: &[R]) -> Result<DataFrame> {
    let columns = fields.iter().map(|field| field.column(rows)).collect();
    Ok(DataFrame::new(columns)?)
}

pub fn measurements_to_dataframe(rows: &[Measurement]) -> Result<DataFrame> {
    to_dataframe(MEASUREMENT_FIELDS, rows)
}

pub fn devices_to_dataframe(rows: &[DeviceInfo]) -> Result<DataFrame> {
    to_dataframe(DEVICE_FIELDS, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;
    use std::sync::Arc;

    fn measurement(device_id: u32, value: f64) -> Measurement {
        Measurement {
            device_id,
            param_id: 7,
            pos_x: 1,
            pos_y: -2,
            value,
            pass_flag: 1,
            segment: 0,
            file_token: Arc::from("abc"),
            device_label: Arc::from(format!("D{device_id}")),
            param_name: Arc::from("VDD"),
            units: Arc::from("V"),
            test_num: 1000,
            test_flg: 0,
        }
    }

    #[test]
    fn test_measurement_column_order() {
        assert_eq!(
            column_names(MEASUREMENT_FIELDS),
            vec![
                "device_id",
                "param_id",
                "pos_x",
                "pos_y",
                "value",
                "pass_flag",
                "segment",
                "file_token",
                "device_label",
                "param_name",
                "units",
                "test_num",
                "test_flg",
            ]
        );
    }

    #[test]
    fn test_dataframe_matches_schema() {
        let rows = vec![measurement(0, 1.5), measurement(1, 2.5)];
        let df = measurements_to_dataframe(&rows).unwrap();

        assert_eq!(df.height(), 2);
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, column_names(MEASUREMENT_FIELDS));
        let expected: Vec<DataType> = polars_schema(MEASUREMENT_FIELDS)
            .iter_values()
            .cloned()
            .collect();
        assert_eq!(df.dtypes(), expected);

        let values: Vec<Option<f64>> = df.column("value").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(1.5), Some(2.5)]);
    }

    #[test]
    fn test_empty_rows_give_empty_frame_with_columns() {
        let df = measurements_to_dataframe(&[]).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), MEASUREMENT_FIELDS.len());
    }

    #[test]
    fn test_device_frame_carries_metadata() {
        let metadata = Arc::new(Metadata {
            lot_name: "LOT1".to_string(),
            ..Default::default()
        });
        let device = DeviceInfo {
            device_id: 3,
            device_label: Arc::from("D3"),
            bin_code: "1".to_string(),
            bin_desc: "PASS".to_string(),
            pass_flag: 1,
            pos_x: 4,
            pos_y: 5,
            file_token: Arc::from("abc"),
            metadata,
        };

        let df = devices_to_dataframe(&[device]).unwrap();
        assert_eq!(df.width(), DEVICE_FIELDS.len());
        let lot = df
            .column("lot_name")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .get(0);
        assert_eq!(lot, Some("LOT1"));
    }

    #[test]
    fn test_column_ddl() {
        let ddl = column_ddl(MEASUREMENT_FIELDS);
        assert!(ddl.starts_with("device_id UInt32,\nparam_id UInt32"));
        assert!(ddl.ends_with("test_flg UInt8"));
    }
}
