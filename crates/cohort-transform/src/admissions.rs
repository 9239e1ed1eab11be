//! Admission windows: filtering and attachment to the terminal timeline.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDateTime;
use polars::prelude::*;
use tracing::{debug, warn};

use cohort_model::columns::{
    ADMISSION_ID, ADMIT_TIME, DISCHARGE_TIME, STAY_ID, SUBJECT_ID, TIMESTAMP,
};
use cohort_model::{Admission, AdmissionId, LabelingOptions, StayId, SubjectId};

use crate::error::Result;
use crate::frame::{AdmissionTable, Timeline, datetime_dtype};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;
const RELATIVE_HOURS: &str = "relative_hours";
const FLAG: &str = "flag";

/// One terminal-flag observation relative to its admission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartEvent {
    pub stay_id: Option<StayId>,
    /// Hours since admission, unrounded; `None` when the record is untimed.
    pub relative_time: Option<f64>,
    pub flag: bool,
}

/// All terminal-flag observations of one admission, in timeline order.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionTimeline {
    pub admission: Admission,
    pub index_time: NaiveDateTime,
    pub events: Vec<ChartEvent>,
}

impl AdmissionTimeline {
    pub fn subject_id(&self) -> SubjectId {
        self.admission.subject_id
    }

    pub fn admission_id(&self) -> AdmissionId {
        self.admission.admission_id
    }

    /// Stay of the earliest event, if any.
    pub fn first_stay(&self) -> Option<StayId> {
        self.events.iter().find_map(|event| event.stay_id)
    }
}

fn hours_since(start: &str, end: &str) -> Expr {
    (col(end) - col(start))
        .dt()
        .total_milliseconds()
        .cast(DataType::Float64)
        / lit(MILLIS_PER_HOUR)
}

/// Keep admissions lasting at least `min_hours`.
pub fn filter_admissions(admissions: &AdmissionTable, min_hours: f64) -> Result<AdmissionTable> {
    let data = admissions
        .lazy()
        .filter(hours_since(ADMIT_TIME, DISCHARGE_TIME).gt_eq(lit(min_hours)))
        .collect()?;
    debug!(
        total = admissions.len(),
        kept = data.height(),
        min_hours,
        "filtered admissions by length"
    );
    Ok(AdmissionTable { data })
}

/// The `count` smallest distinct subject ids.
pub fn development_subjects<I>(subjects: I, count: usize) -> Vec<SubjectId>
where
    I: IntoIterator<Item = SubjectId>,
{
    subjects
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .take(count)
        .collect()
}

/// Row filter keeping the given subjects.
pub(crate) fn subject_in(subjects: &[SubjectId]) -> Expr {
    let ids: Vec<i64> = subjects.iter().map(|subject| subject.get()).collect();
    col(SUBJECT_ID).is_in(lit(Series::new(SUBJECT_ID.into(), ids)).implode(), false)
}

/// Drop every record whose subject is not in `subjects`.
pub fn retain_subjects(timeline: Timeline, subjects: &[SubjectId]) -> Result<Timeline> {
    let data = timeline.lazy().filter(subject_in(subjects)).collect()?;
    Ok(Timeline::from_frame(timeline.name, data))
}

/// Inner-join the timeline with its admissions on subject + admission.
///
/// Each admission gets its index time and the `flag_column` reading of every
/// record, timed relative to admission. Admissions are returned in order of
/// first appearance in the timeline; records without an admission are dropped.
pub fn attach_admissions(
    timeline: &Timeline,
    admissions: &AdmissionTable,
    flag_column: &str,
    options: &LabelingOptions,
) -> Result<Vec<AdmissionTimeline>> {
    let kind = timeline.require_column(flag_column)?;

    let windows = admissions
        .lazy()
        .unique_stable(
            Some(cols([SUBJECT_ID, ADMISSION_ID])),
            UniqueKeepStrategy::First,
        )
        .collect()?;
    let duplicates = admissions.len() - windows.height();
    if duplicates > 0 {
        warn!(duplicates, "duplicate admission rows ignored, first row kept");
    }

    let stay = if timeline.has_column(STAY_ID) {
        col(STAY_ID)
    } else {
        lit(NULL).cast(DataType::Int64).alias(STAY_ID)
    };
    let timestamp = if timeline.has_column(TIMESTAMP) {
        col(TIMESTAMP)
    } else {
        lit(NULL).cast(datetime_dtype()).alias(TIMESTAMP)
    };
    let keys = [col(SUBJECT_ID), col(ADMISSION_ID)];
    let mut args = JoinArgs::new(JoinType::Inner);
    args.maintain_order = MaintainOrderJoin::Left;
    let joined = timeline
        .lazy()
        .select([
            col(SUBJECT_ID),
            col(ADMISSION_ID),
            stay,
            timestamp,
            kind.truthy(flag_column).alias(FLAG),
        ])
        .join(windows.lazy(), &keys, &keys, args)
        .with_column(hours_since(ADMIT_TIME, TIMESTAMP).alias(RELATIVE_HOURS))
        .collect()?;

    let subjects = joined.column(SUBJECT_ID)?.i64()?;
    let admission_ids = joined.column(ADMISSION_ID)?.i64()?;
    let stays = joined.column(STAY_ID)?.i64()?;
    let admits = joined.column(ADMIT_TIME)?.datetime()?;
    let discharges = joined.column(DISCHARGE_TIME)?.datetime()?;
    let relative = joined.column(RELATIVE_HOURS)?.f64()?;
    let flags = joined.column(FLAG)?.bool()?;

    let mut order: HashMap<(SubjectId, AdmissionId), usize> = HashMap::new();
    let mut attached: Vec<AdmissionTimeline> = Vec::new();
    let rows = subjects
        .iter()
        .zip(admission_ids.iter())
        .zip(admits.as_datetime_iter().zip(discharges.as_datetime_iter()))
        .zip(stays.iter().zip(relative.iter()).zip(flags.iter()));
    for (((subject, admission), (admit, discharge)), ((stay, relative_time), flag)) in rows {
        let (Some(subject), Some(admission), Some(admit_time), Some(discharge_time)) =
            (subject, admission, admit, discharge)
        else {
            continue;
        };
        let key = (SubjectId(subject), AdmissionId(admission));
        let slot = match order.get(&key) {
            Some(slot) => *slot,
            None => {
                let admission = Admission {
                    subject_id: key.0,
                    admission_id: key.1,
                    admit_time,
                    discharge_time,
                };
                let index_time = admission.index_time(options.index_offset_hours)?;
                attached.push(AdmissionTimeline {
                    admission,
                    index_time,
                    events: Vec::new(),
                });
                order.insert(key, attached.len() - 1);
                attached.len() - 1
            }
        };
        attached[slot].events.push(ChartEvent {
            stay_id: stay.map(StayId),
            relative_time,
            flag: flag.unwrap_or(false),
        });
    }
    debug!(
        records = timeline.len(),
        admissions = attached.len(),
        unmatched_records = timeline.len() - joined.height(),
        "attached admissions"
    );
    Ok(attached)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2130, 4, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn admission(subject: i64, hadm: i64, admit: NaiveDateTime, hours: i64) -> Admission {
        Admission {
            subject_id: SubjectId(subject),
            admission_id: AdmissionId(hadm),
            admit_time: admit,
            discharge_time: admit + chrono::TimeDelta::hours(hours),
        }
    }

    fn table(admissions: &[Admission]) -> AdmissionTable {
        AdmissionTable::from_admissions(admissions).unwrap()
    }

    fn shock() -> Timeline {
        let df = df! {
            SUBJECT_ID => [1i64, 9],
            ADMISSION_ID => [10i64, 90],
            STAY_ID => [Some(100i64), None],
            TIMESTAMP => [at(1, 15), at(1, 1)],
            "septic_shock" => [Some(true), None],
        }
        .unwrap();
        Timeline::new("shock", df).unwrap()
    }

    #[test]
    fn filter_keeps_twelve_hours_exactly() {
        let admissions = table(&[
            admission(1, 10, at(1, 0), 12),
            admission(2, 20, at(1, 0), 11),
        ]);
        let kept = filter_admissions(&admissions, 12.0).unwrap();
        assert_eq!(kept.len(), 1);
        let subjects: Vec<Option<i64>> =
            kept.data.column(SUBJECT_ID).unwrap().i64().unwrap().iter().collect();
        assert_eq!(subjects, vec![Some(1)]);
    }

    #[test]
    fn development_subjects_are_smallest_distinct() {
        let ids = [5, 3, 9, 3, 1].map(SubjectId);
        assert_eq!(
            development_subjects(ids, 2),
            vec![SubjectId(1), SubjectId(3)]
        );
        assert_eq!(development_subjects(ids, 0), Vec::<SubjectId>::new());
        assert_eq!(development_subjects(ids, 10).len(), 4);
    }

    #[test]
    fn retain_subjects_filters_rows() {
        let kept = retain_subjects(shock(), &[SubjectId(9)]).unwrap();
        assert_eq!(kept.len(), 1);
        assert!(retain_subjects(shock(), &[]).unwrap().is_empty());
    }

    #[test]
    fn attaches_relative_time_and_index_time() {
        let admissions = table(&[admission(1, 10, at(1, 0), 48)]);
        let attached = attach_admissions(
            &shock(),
            &admissions,
            "septic_shock",
            &LabelingOptions::default(),
        )
        .unwrap();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].index_time, at(1, 12));
        assert_eq!(attached[0].events[0].relative_time, Some(15.0));
        assert!(attached[0].events[0].flag);
        assert_eq!(attached[0].first_stay(), Some(StayId(100)));
    }

    #[test]
    fn duplicate_admission_rows_keep_the_first() {
        let admissions = table(&[
            admission(1, 10, at(1, 0), 48),
            admission(1, 10, at(1, 6), 48),
        ]);
        let attached = attach_admissions(
            &shock(),
            &admissions,
            "septic_shock",
            &LabelingOptions::default(),
        )
        .unwrap();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].admission.admit_time, at(1, 0));
        assert_eq!(attached[0].events.len(), 1);
    }

    #[test]
    fn out_of_range_index_offset_is_fatal() {
        let admissions = table(&[admission(1, 10, at(1, 0), 48)]);
        let options = LabelingOptions {
            index_offset_hours: 1e12,
            ..LabelingOptions::default()
        };
        let err = attach_admissions(&shock(), &admissions, "septic_shock", &options).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn missing_flag_column_is_fatal() {
        let err = attach_admissions(
            &Timeline::empty("shock"),
            &table(&[]),
            "septic_shock",
            &LabelingOptions::default(),
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }
}
