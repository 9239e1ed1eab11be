use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, info_span};

use cohort_cli::config::{OptionOverrides, resolve_options};
use cohort_ingest::{load_admissions, load_diagnoses, load_propensity, load_timeline};
use cohort_match::{caliper_match, overlap_summary};
use cohort_model::ColumnMapping;
use cohort_output::{write_features, write_labels, write_matches};
use cohort_transform::{
    AdmissionTable, CohortPipeline, CohortSources, Timeline, build_diagnosis_features,
};

use crate::cli::{LabelArgs, MatchArgs};
use crate::types::{LabelResult, MatchResult};

pub fn run_label(args: &LabelArgs) -> Result<LabelResult> {
    let span = info_span!("label", data_dir = %args.data_dir.display());
    let _guard = span.enter();
    let started = Instant::now();
    let options = resolve_options(
        args.config.as_deref(),
        OptionOverrides {
            exclusion_window_hours: args.exclusion_window_hours,
            ..OptionOverrides::default()
        },
    )?;
    let mapping = &options.columns;
    let input = |path: &Path| args.data_dir.join(path);

    let sources = CohortSources {
        criteria: read_timeline(&input(&args.criteria), mapping)?,
        infections: args
            .infections
            .iter()
            .map(|path| read_timeline(&input(path), mapping))
            .collect::<Result<_>>()?,
        dysfunction: read_timeline(&input(&args.dysfunction), mapping)?,
        terminal_attributes: args
            .terminal_attributes
            .iter()
            .map(|path| read_timeline(&input(path), mapping))
            .collect::<Result<_>>()?,
        admissions: read_admissions(&input(&args.admissions), mapping)?,
    };
    let admissions = sources.admissions.clone();

    let run = CohortPipeline::new(options.clone())
        .with_subject_limit(args.development_subjects)
        .run(sources)
        .context("label cohort")?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| args.data_dir.join("output"));
    let labels_file = if args.dry_run {
        None
    } else {
        Some(write_labels(&output_dir, &run.labels, &options.columns)?)
    };

    let mut feature_subjects = None;
    let mut features_file = None;
    if let Some(diagnoses) = &args.diagnoses {
        let path = input(diagnoses);
        let diagnoses = load_diagnoses(&path, mapping)
            .with_context(|| format!("load {}", path.display()))?;
        let features =
            build_diagnosis_features(&admissions, &diagnoses, &run.labels, &options.features)
                .context("build diagnosis features")?;
        feature_subjects = Some(features.height());
        if !args.dry_run {
            features_file = Some(write_features(&output_dir, &features, mapping)?);
        }
    }
    info!(
        labels = run.labels.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "label command finished"
    );
    Ok(LabelResult {
        output_dir,
        labels_file,
        features_file,
        feature_subjects,
        labels: run.labels,
        summary: run.summary,
    })
}

pub fn run_match(args: &MatchArgs) -> Result<MatchResult> {
    let span = info_span!("match", scores = %args.scores.display());
    let _guard = span.enter();
    let options = resolve_options(
        args.config.as_deref(),
        OptionOverrides {
            caliper: args.caliper,
            ..OptionOverrides::default()
        },
    )?;
    let records = load_propensity(&args.scores, &options.columns)
        .with_context(|| format!("load {}", args.scores.display()))?;
    let overlap = overlap_summary(&records, &options.matching).context("summarize overlap")?;
    let report = caliper_match(&records, &options.matching).context("match subjects")?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| scores_dir(&args.scores));
    let matches_file = if args.dry_run {
        None
    } else {
        Some(write_matches(&output_dir, &report)?)
    };
    Ok(MatchResult {
        output_dir,
        matches_file,
        report,
        overlap,
    })
}

fn read_timeline(path: &Path, mapping: &ColumnMapping) -> Result<Timeline> {
    let name = path
        .file_stem()
        .map_or_else(|| path.display().to_string(), |stem| stem.to_string_lossy().into_owned());
    let frame =
        load_timeline(path, &name, mapping).with_context(|| format!("load {}", path.display()))?;
    Timeline::new(name, frame).with_context(|| format!("read {}", path.display()))
}

fn read_admissions(path: &Path, mapping: &ColumnMapping) -> Result<AdmissionTable> {
    let frame = load_admissions(path, mapping).with_context(|| format!("load {}", path.display()))?;
    AdmissionTable::new(frame).with_context(|| format!("read {}", path.display()))
}

fn scores_dir(scores: &Path) -> PathBuf {
    match scores.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
