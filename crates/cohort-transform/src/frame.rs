//! Polars-backed criteria and admission tables.
//!
//! A [`Timeline`] wraps a DataFrame whose key columns carry the canonical names
//! of [`cohort_model::columns`]:
//!
//! | Column         | Type                     | Presence                     |
//! |----------------|--------------------------|------------------------------|
//! | `subject_id`   | Int64                    | always                       |
//! | `admission_id` | Int64                    | always                       |
//! | `stay_id`      | Int64, nullable          | stay-keyed sources           |
//! | `timestamp`    | Datetime(ms), nullable   | time-indexed sources         |
//!
//! Every other column is a criterion, held as Boolean (a flag) or Float64 (a
//! number). A null criterion is *missing*; the outer joins introduce these and
//! imputation removes them.

use polars::prelude::*;

use cohort_model::columns::{ADMISSION_ID, ADMIT_TIME, DISCHARGE_TIME, SUBJECT_ID};
use cohort_model::{Admission, ConfigurationError, EntityKey, KeyPart};

use crate::error::Result;

/// Unit of every datetime column handed between steps.
pub const TIME_UNIT: TimeUnit = TimeUnit::Milliseconds;

pub fn datetime_dtype() -> DataType {
    DataType::Datetime(TIME_UNIT, None)
}

/// Storage kind of a criteria column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Flag,
    Number,
}

impl ColumnKind {
    /// Kind of a criterion of type `dtype`, or `None` when a criterion cannot hold it.
    ///
    /// An all-null column carries no type information and reads as a flag.
    pub fn from_dtype(dtype: &DataType) -> Option<Self> {
        match dtype {
            DataType::Boolean | DataType::Null => Some(ColumnKind::Flag),
            dtype if dtype.is_primitive_numeric() => Some(ColumnKind::Number),
            _ => None,
        }
    }

    pub fn dtype(self) -> DataType {
        match self {
            ColumnKind::Flag => DataType::Boolean,
            ColumnKind::Number => DataType::Float64,
        }
    }

    /// Value used when nothing can be carried forward: `false` or `0`.
    pub fn fill_value(self) -> Expr {
        match self {
            ColumnKind::Flag => lit(false),
            ColumnKind::Number => lit(0.0),
        }
    }

    /// Boolean reading of `column`; numbers are true when non-zero, missing is false.
    pub fn truthy(self, column: &str) -> Expr {
        match self {
            ColumnKind::Flag => col(column).fill_null(lit(false)),
            ColumnKind::Number => col(column).neq(lit(0.0)).fill_null(lit(false)),
        }
    }

    /// Numeric reading of `column`; flags count as 1 / 0, missing as 0.
    pub fn numeric(self, column: &str) -> Expr {
        col(column).cast(DataType::Float64).fill_null(lit(0.0))
    }
}

/// A named criteria table.
#[derive(Debug, Clone)]
pub struct Timeline {
    /// Human-readable table name used in error messages.
    pub name: String,
    pub data: DataFrame,
}

impl Timeline {
    /// Wrap `data`, casting key and criteria columns to their canonical types.
    ///
    /// Subject and admission columns are required; a column of a type its role
    /// cannot hold is a configuration error.
    pub fn new(name: impl Into<String>, data: DataFrame) -> Result<Self> {
        let name = name.into();
        for part in [KeyPart::Subject, KeyPart::Admission] {
            if !data.schema().contains(part.as_str()) {
                return Err(ConfigurationError::MissingKey {
                    table: name,
                    key: part,
                }
                .into());
            }
        }
        let mut casts = Vec::new();
        for (column, dtype) in data.schema().iter() {
            let target = canonical_dtype(&name, column, dtype)?;
            if *dtype != target {
                casts.push(col(column.clone()).strict_cast(target));
            }
        }
        let data = if casts.is_empty() {
            data
        } else {
            data.lazy().with_columns(casts).collect()?
        };
        Ok(Self { name, data })
    }

    /// An admission-keyed table without rows or criteria.
    pub fn empty(name: impl Into<String>) -> Self {
        let schema = Schema::from_iter([
            (PlSmallStr::from(SUBJECT_ID), DataType::Int64),
            (PlSmallStr::from(ADMISSION_ID), DataType::Int64),
        ]);
        Self {
            name: name.into(),
            data: DataFrame::empty_with_schema(&schema),
        }
    }

    /// Wrap the output of a step whose columns are canonical by construction.
    pub(crate) fn from_frame(name: impl Into<String>, data: DataFrame) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.height()
    }

    pub fn is_empty(&self) -> bool {
        self.data.height() == 0
    }

    pub fn lazy(&self) -> LazyFrame {
        self.data.clone().lazy()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.data.schema().contains(name)
    }

    pub fn has_key(&self, part: KeyPart) -> bool {
        self.has_column(part.as_str())
    }

    pub fn require_key(&self, part: KeyPart) -> std::result::Result<(), ConfigurationError> {
        if self.has_key(part) {
            Ok(())
        } else {
            Err(ConfigurationError::MissingKey {
                table: self.name.clone(),
                key: part,
            })
        }
    }

    pub fn require_keys(&self, parts: &[KeyPart]) -> std::result::Result<(), ConfigurationError> {
        parts.iter().try_for_each(|part| self.require_key(*part))
    }

    /// Criteria columns in schema order.
    pub fn criteria(&self) -> Vec<(PlSmallStr, ColumnKind)> {
        self.data
            .schema()
            .iter()
            .filter(|(name, _)| KeyPart::from_column(name.as_str()).is_none())
            .filter_map(|(name, dtype)| Some((name.clone(), ColumnKind::from_dtype(dtype)?)))
            .collect()
    }

    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        if KeyPart::from_column(name).is_some() {
            return None;
        }
        self.data.schema().get(name).and_then(ColumnKind::from_dtype)
    }

    pub fn require_column(&self, name: &str) -> std::result::Result<ColumnKind, ConfigurationError> {
        self.column_kind(name)
            .ok_or_else(|| ConfigurationError::MissingColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    /// Number of records whose `column` reads true.
    pub fn count_flagged(&self, column: &str) -> Result<usize> {
        let kind = self.require_column(column)?;
        let flags = self
            .lazy()
            .select([kind.truthy(column).alias(column)])
            .collect()?;
        Ok(flags.column(column)?.bool()?.num_trues())
    }

    /// Entity key of every record, in row order.
    pub fn entity_keys(&self) -> Result<Vec<EntityKey>> {
        let subjects = self.data.column(SUBJECT_ID)?.i64()?;
        let admissions = self.data.column(ADMISSION_ID)?.i64()?;
        let stays: Vec<Option<i64>> = match self.data.column(KeyPart::Stay.as_str()) {
            Ok(column) => column.i64()?.iter().collect(),
            Err(_) => vec![None; self.len()],
        };
        Ok(subjects
            .iter()
            .zip(admissions.iter())
            .zip(stays)
            .filter_map(|((subject, admission), stay)| {
                let key = EntityKey::new(subject?, admission?);
                Some(match stay {
                    Some(stay) => key.with_stay(stay),
                    None => key,
                })
            })
            .collect())
    }
}

fn canonical_dtype(
    table: &str,
    column: &str,
    dtype: &DataType,
) -> std::result::Result<DataType, ConfigurationError> {
    let target = match KeyPart::from_column(column) {
        Some(KeyPart::Timestamp) => {
            matches!(dtype, DataType::Datetime(_, None) | DataType::Null).then(datetime_dtype)
        }
        Some(_) => {
            (dtype.is_integer() || matches!(dtype, DataType::Null)).then_some(DataType::Int64)
        }
        None => ColumnKind::from_dtype(dtype).map(ColumnKind::dtype),
    };
    target.ok_or_else(|| ConfigurationError::UnsupportedColumn {
        table: table.to_string(),
        column: column.to_string(),
        dtype: dtype.to_string(),
    })
}

/// The admission table: one row per admission window.
#[derive(Debug, Clone)]
pub struct AdmissionTable {
    pub data: DataFrame,
}

impl AdmissionTable {
    const NAME: &'static str = "admissions";

    /// Wrap `data`, which must hold the subject, admission, admit and discharge columns.
    pub fn new(data: DataFrame) -> Result<Self> {
        let mut casts = Vec::new();
        for (column, target) in [
            (SUBJECT_ID, DataType::Int64),
            (ADMISSION_ID, DataType::Int64),
            (ADMIT_TIME, datetime_dtype()),
            (DISCHARGE_TIME, datetime_dtype()),
        ] {
            let Some(dtype) = data.schema().get(column) else {
                return Err(ConfigurationError::MissingColumn {
                    table: Self::NAME.to_string(),
                    column: column.to_string(),
                }
                .into());
            };
            let accepted = match &target {
                DataType::Int64 => dtype.is_integer(),
                _ => matches!(dtype, DataType::Datetime(_, None)),
            };
            if !accepted {
                return Err(ConfigurationError::UnsupportedColumn {
                    table: Self::NAME.to_string(),
                    column: column.to_string(),
                    dtype: dtype.to_string(),
                }
                .into());
            }
            if *dtype != target {
                casts.push(col(column).strict_cast(target));
            }
        }
        let data = if casts.is_empty() {
            data
        } else {
            data.lazy().with_columns(casts).collect()?
        };
        Ok(Self { data })
    }

    pub fn from_admissions(admissions: &[Admission]) -> Result<Self> {
        let subjects: Vec<i64> = admissions.iter().map(|a| a.subject_id.get()).collect();
        let ids: Vec<i64> = admissions.iter().map(|a| a.admission_id.get()).collect();
        let admits: Vec<_> = admissions.iter().map(|a| a.admit_time).collect();
        let discharges: Vec<_> = admissions.iter().map(|a| a.discharge_time).collect();
        let data = DataFrame::new(vec![
            Series::new(SUBJECT_ID.into(), subjects).into_column(),
            Series::new(ADMISSION_ID.into(), ids).into_column(),
            Series::new(ADMIT_TIME.into(), admits).into_column(),
            Series::new(DISCHARGE_TIME.into(), discharges).into_column(),
        ])?;
        Self::new(data)
    }

    pub fn len(&self) -> usize {
        self.data.height()
    }

    pub fn is_empty(&self) -> bool {
        self.data.height() == 0
    }

    pub fn lazy(&self) -> LazyFrame {
        self.data.clone().lazy()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use cohort_model::columns::{STAY_ID, TIMESTAMP};

    use super::*;

    #[test]
    fn new_casts_keys_and_criteria_to_canonical_types() {
        let df = df! {
            SUBJECT_ID => [1i32, 2],
            ADMISSION_ID => [10i32, 20],
            STAY_ID => [Some(100i64), None],
            "sirs" => [2i64, 0],
            "infection" => [Some(true), None],
        }
        .unwrap();
        let timeline = Timeline::new("criteria", df).unwrap();
        let schema = timeline.data.schema();
        assert_eq!(schema.get(SUBJECT_ID), Some(&DataType::Int64));
        assert_eq!(schema.get("sirs"), Some(&DataType::Float64));
        assert!(timeline.has_key(KeyPart::Stay));
        assert!(!timeline.has_key(KeyPart::Timestamp));
        assert_eq!(
            timeline.criteria(),
            vec![
                (PlSmallStr::from("sirs"), ColumnKind::Number),
                (PlSmallStr::from("infection"), ColumnKind::Flag),
            ]
        );
        assert_eq!(timeline.column_kind(STAY_ID), None);
        assert_eq!(timeline.count_flagged("sirs").unwrap(), 1);
        assert_eq!(
            timeline.entity_keys().unwrap(),
            vec![EntityKey::new(1, 10).with_stay(100), EntityKey::new(2, 20)]
        );
    }

    #[test]
    fn subject_and_admission_are_required() {
        let df = df! { SUBJECT_ID => [1i64], "sirs" => [1.0] }.unwrap();
        let err = Timeline::new("criteria", df).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn text_criteria_are_unsupported() {
        let df = df! {
            SUBJECT_ID => [1i64],
            ADMISSION_ID => [10i64],
            "note" => ["fever"],
        }
        .unwrap();
        let err = Timeline::new("notes", df).unwrap_err();
        assert!(matches!(
            err,
            crate::TransformError::Cohort(cohort_model::CohortError::Configuration(
                ConfigurationError::UnsupportedColumn { .. }
            ))
        ));
    }

    #[test]
    fn text_timestamps_are_unsupported() {
        let df = df! {
            SUBJECT_ID => [1i64],
            ADMISSION_ID => [10i64],
            TIMESTAMP => ["2130-04-02 00:00:00"],
        }
        .unwrap();
        assert!(Timeline::new("criteria", df).unwrap_err().is_configuration());
    }

    #[test]
    fn empty_timeline_is_admission_keyed() {
        let timeline = Timeline::empty("infections");
        assert!(timeline.is_empty());
        assert!(timeline.require_keys(KeyPart::ADMISSION).is_ok());
        assert!(timeline.criteria().is_empty());
    }

    #[test]
    fn admission_table_from_typed_rows() {
        let admit = NaiveDate::from_ymd_opt(2130, 4, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let table = AdmissionTable::from_admissions(&[Admission {
            subject_id: 1.into(),
            admission_id: 10.into(),
            admit_time: admit,
            discharge_time: admit + chrono::TimeDelta::hours(30),
        }])
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.data.schema().get(ADMIT_TIME), Some(&datetime_dtype()));

        let missing = df! { SUBJECT_ID => [1i64], ADMISSION_ID => [10i64] }.unwrap();
        assert!(AdmissionTable::new(missing).unwrap_err().is_configuration());
    }
}
