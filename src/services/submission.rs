//! Work submission: batches, sweeps, test-suite runs, reports, workflow runs
//! and debug sessions.
//!
//! Each request type validates itself with no platform access, so mutually
//! exclusive flags and range errors surface before authentication. Only then
//! are name-or-ID references resolved and the work posted.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult, ValidationError};
use crate::domain::models::requests::{
    NewBatch, NewDebugSession, NewReport, NewSweep, NewWorkflowRun, SuiteRun,
};
use crate::domain::models::{
    Batch, Branch, Build, DebugSession, EntityKind, Experience, ExperienceTag, GridSearch,
    MetricsBuild, ParameterMap, ParameterSeparator, Report, Sweep, TestSuite, Workflow,
    WorkflowRun,
};
use crate::domain::ports::Platform;
use crate::services::resolver::{resolve, resolve_id, resolve_ids, resolve_suite};
use crate::services::validation::{
    allowable_failure_percent, at_least, exclusive, one_required, parse_timestamp, parse_uuid,
    require_non_empty, required_together,
};

fn parse_ids(kind: &str, values: &[String]) -> Result<Vec<Uuid>, ValidationError> {
    values.iter().map(|v| parse_uuid(kind, v)).collect()
}

fn percent(value: Option<i64>) -> Result<u8, ValidationError> {
    value.map_or(Ok(0), allowable_failure_percent)
}

fn labels(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Which experiences a batch or sweep runs.
#[derive(Debug, Clone, Default)]
pub struct ExperienceSelection {
    /// `--experience-ids`: IDs only.
    pub ids: Vec<String>,
    /// `--experiences`: names or IDs.
    pub keys: Vec<String>,
    /// `--experience-tag-ids`.
    pub tag_ids: Vec<String>,
    /// `--experience-tag-names`.
    pub tag_names: Vec<String>,
}

impl ExperienceSelection {
    /// At least one source, and tags by ID or by name but not both.
    pub fn validate(&self) -> Result<(), ValidationError> {
        exclusive(&[
            ("experience-tag-ids", !self.tag_ids.is_empty()),
            ("experience-tag-names", !self.tag_names.is_empty()),
        ])?;
        one_required(&[
            ("experience-ids", !self.ids.is_empty()),
            ("experiences", !self.keys.is_empty()),
            ("experience-tag-ids", !self.tag_ids.is_empty()),
            ("experience-tag-names", !self.tag_names.is_empty()),
        ])?;
        parse_ids("experience ID", &self.ids)?;
        parse_ids("experience tag ID", &self.tag_ids)?;
        Ok(())
    }

    /// Resolve to `(experience IDs, tag IDs)`. Tags are expanded server-side.
    pub async fn resolve(
        &self,
        platform: &dyn Platform,
        project: Uuid,
    ) -> DomainResult<(Vec<Uuid>, Vec<Uuid>)> {
        let mut experiences = parse_ids("experience ID", &self.ids)?;
        for id in resolve_ids::<Experience>(platform, project, &self.keys).await? {
            if !experiences.contains(&id) {
                experiences.push(id);
            }
        }
        let tags = if self.tag_names.is_empty() {
            parse_ids("experience tag ID", &self.tag_ids)?
        } else {
            resolve_ids::<ExperienceTag>(platform, project, &self.tag_names).await?
        };
        Ok((experiences, tags))
    }
}

async fn resolve_metrics_build(
    platform: &dyn Platform,
    project: Uuid,
    key: Option<&str>,
) -> DomainResult<Option<Uuid>> {
    match key {
        Some(key) => Ok(Some(resolve_id::<MetricsBuild>(platform, project, key).await?)),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

/// Inputs for `batches create`.
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    pub build: String,
    pub experiences: ExperienceSelection,
    pub metrics_build: Option<String>,
    /// `name:value` pairs.
    pub parameters: Vec<String>,
    pub pool_labels: Vec<String>,
    pub account: Option<String>,
    pub batch_name: Option<String>,
    pub allowable_failure_percent: Option<i64>,
}

impl BatchRequest {
    /// Parsed parameters and failure percent, or the first invalid input.
    pub fn validate(&self) -> Result<(ParameterMap, u8), ValidationError> {
        require_non_empty("build name or ID", &self.build)?;
        self.experiences.validate()?;
        let parameters = ParameterMap::parse(&self.parameters, ParameterSeparator::Colon)?;
        let percent = percent(self.allowable_failure_percent)?;
        Ok((parameters, percent))
    }
}

/// Resolve every reference and create the batch.
pub async fn submit_batch(
    platform: &dyn Platform,
    project: Uuid,
    request: BatchRequest,
) -> DomainResult<Batch> {
    let (parameters, allowable_failure_percent) = request.validate()?;
    let build_id = resolve_id::<Build>(platform, project, &request.build).await?;
    let (experience_ids, experience_tag_ids) =
        request.experiences.resolve(platform, project).await?;
    let metrics_build_id =
        resolve_metrics_build(platform, project, request.metrics_build.as_deref()).await?;

    let body = NewBatch {
        build_id,
        experience_ids,
        experience_tag_ids,
        metrics_build_id,
        parameters,
        pool_labels: labels(request.pool_labels),
        allowable_failure_percent,
        friendly_name: request.batch_name.filter(|n| !n.trim().is_empty()),
        account: request.account,
    };
    let batch = platform
        .create_batch(project, &body)
        .await
        .map_err(DomainError::remote("create", EntityKind::Batch))?;
    info!(batch_id = %batch.id, name = %batch.friendly_name, "submitted batch");
    Ok(batch)
}

// ---------------------------------------------------------------------------
// Sweeps
// ---------------------------------------------------------------------------

/// Inputs for `sweeps create`.
#[derive(Debug, Clone, Default)]
pub struct SweepRequest {
    pub build: String,
    pub experiences: ExperienceSelection,
    pub metrics_build: Option<String>,
    pub parameter_name: Option<String>,
    pub parameter_values: Vec<String>,
    /// JSON grid file, exclusive with the single-axis flags.
    pub grid_search_config: Option<PathBuf>,
    pub pool_labels: Vec<String>,
    pub account: Option<String>,
    pub name: Option<String>,
}

impl SweepRequest {
    /// The grid to sweep, from either the single-axis flags or the file.
    pub fn grid(&self) -> Result<GridSearch, ValidationError> {
        require_non_empty("build name or ID", &self.build)?;
        let single = self.parameter_name.is_some() || !self.parameter_values.is_empty();
        exclusive(&[
            ("parameter-name", single),
            ("grid-search-config", self.grid_search_config.is_some()),
        ])?;
        required_together(&[
            ("parameter-name", self.parameter_name.is_some()),
            ("parameter-values", !self.parameter_values.is_empty()),
        ])?;
        one_required(&[
            ("parameter-name", single),
            ("grid-search-config", self.grid_search_config.is_some()),
        ])?;
        self.experiences.validate()?;
        match (&self.parameter_name, &self.grid_search_config) {
            (Some(name), None) => GridSearch::single(name, self.parameter_values.clone()),
            (None, Some(path)) => GridSearch::from_file(path),
            _ => Err(ValidationError::empty("sweep parameters")),
        }
    }
}

/// Submit a sweep. Returns the sweep and the number of batches it expands to.
pub async fn submit_sweep(
    platform: &dyn Platform,
    project: Uuid,
    request: SweepRequest,
) -> DomainResult<(Sweep, usize)> {
    let grid = request.grid()?;
    let expected = grid.combination_count();
    let build_id = resolve_id::<Build>(platform, project, &request.build).await?;
    let (experience_ids, experience_tag_ids) =
        request.experiences.resolve(platform, project).await?;
    let metrics_build_id =
        resolve_metrics_build(platform, project, request.metrics_build.as_deref()).await?;

    let body = NewSweep {
        build_id,
        experience_ids,
        experience_tag_ids,
        metrics_build_id,
        parameters: grid.parameters().to_vec(),
        pool_labels: labels(request.pool_labels),
        name: request.name.filter(|n| !n.trim().is_empty()),
        account: request.account,
    };
    let sweep = platform
        .create_sweep(project, &body)
        .await
        .map_err(DomainError::remote("create", EntityKind::Sweep))?;
    info!(sweep_id = %sweep.id, batches = expected, "submitted sweep");
    Ok((sweep, expected))
}

// ---------------------------------------------------------------------------
// Test-suite runs
// ---------------------------------------------------------------------------

/// Inputs for `suites run`.
#[derive(Debug, Clone, Default)]
pub struct SuiteRunRequest {
    pub suite: String,
    pub revision: Option<u32>,
    pub build: String,
    pub parameters: Vec<String>,
    pub pool_labels: Vec<String>,
    pub allowable_failure_percent: Option<i64>,
    pub batch_name: Option<String>,
    pub account: Option<String>,
}

/// Launch a batch from a test suite against `request.build`.
pub async fn run_suite(
    platform: &dyn Platform,
    project: Uuid,
    request: SuiteRunRequest,
) -> DomainResult<Batch> {
    require_non_empty("test suite name or ID", &request.suite)?;
    require_non_empty("build name or ID", &request.build)?;
    let parameters = ParameterMap::parse(&request.parameters, ParameterSeparator::Colon)?;
    let allowable_failure_percent = percent(request.allowable_failure_percent)?;

    let suite = resolve_suite(platform, project, &request.suite, request.revision).await?;
    let build_id = resolve_id::<Build>(platform, project, &request.build).await?;
    let body = SuiteRun {
        build_id,
        parameters,
        pool_labels: labels(request.pool_labels),
        allowable_failure_percent,
        batch_name: request.batch_name.filter(|n| !n.trim().is_empty()),
        account: request.account,
    };
    let batch = platform
        .run_suite(project, suite.id, Some(suite.revision), &body)
        .await
        .map_err(DomainError::remote("run", EntityKind::TestSuite))?;
    info!(suite = %suite.id, revision = suite.revision, batch_id = %batch.id, "ran test suite");
    Ok(batch)
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Inputs for `reports create`.
#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    pub suite: String,
    pub revision: Option<u32>,
    pub branch: String,
    pub metrics_build: Option<String>,
    /// Window length in days, ending at `end` (or now).
    pub length_days: Option<i64>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub respect_revision_boundary: bool,
    pub name: Option<String>,
    pub account: Option<String>,
}

impl ReportRequest {
    /// The `[start, end)` window, with `now` standing in for a missing end.
    pub fn window(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), ValidationError> {
        require_non_empty("test suite name or ID", &self.suite)?;
        require_non_empty("branch name or ID", &self.branch)?;
        exclusive(&[
            ("length", self.length_days.is_some()),
            ("start-timestamp", self.start.is_some()),
        ])?;
        exclusive(&[
            ("length", self.length_days.is_some()),
            ("end-timestamp", self.end.is_some()),
        ])?;
        one_required(&[
            ("length", self.length_days.is_some()),
            ("start-timestamp", self.start.is_some()),
        ])?;

        if let Some(days) = self.length_days {
            at_least("length", 1, days)?;
            let start = Duration::try_days(days)
                .and_then(|span| now.checked_sub_signed(span))
                .ok_or_else(|| ValidationError::OutOfRange {
                    field: "length".to_string(),
                    constraint: "a representable number of days".to_string(),
                    value: days.to_string(),
                })?;
            return Ok((start, now));
        }
        let start = match &self.start {
            Some(value) => parse_timestamp("start timestamp", value)?,
            None => return Err(ValidationError::empty("start timestamp")),
        };
        let end = match &self.end {
            Some(value) => parse_timestamp("end timestamp", value)?,
            None => now,
        };
        if end <= start {
            return Err(ValidationError::invalid(
                "end timestamp (must be after the start timestamp)",
                end.to_rfc3339(),
            ));
        }
        Ok((start, end))
    }
}

/// Create a metrics report over a suite's batches on one branch.
pub async fn create_report(
    platform: &dyn Platform,
    project: Uuid,
    request: ReportRequest,
) -> DomainResult<Report> {
    let (start, end) = request.window(Utc::now())?;
    let suite: TestSuite = resolve_suite(platform, project, &request.suite, request.revision).await?;
    let branch_id = resolve_id::<Branch>(platform, project, &request.branch).await?;
    let metrics_build_id =
        match resolve_metrics_build(platform, project, request.metrics_build.as_deref()).await? {
            Some(id) => id,
            None => suite.metrics_build_id.ok_or_else(|| {
                DomainError::Precondition(format!(
                    "test suite {} has no metrics build; pass --metrics-build-id",
                    suite.name
                ))
            })?,
        };
    let name = request
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("{}-r{}-{}", suite.name, suite.revision, end.format("%Y%m%d")));
    let body = NewReport {
        name,
        test_suite_id: suite.id,
        test_suite_revision: suite.revision,
        branch_id,
        metrics_build_id,
        start_timestamp: start,
        end_timestamp: end,
        respect_revision_boundary: request.respect_revision_boundary,
        account: request.account,
    };
    let report = platform
        .create_report(project, &body)
        .await
        .map_err(DomainError::remote("create", EntityKind::Report))?;
    info!(report_id = %report.id, "submitted report");
    Ok(report)
}

// ---------------------------------------------------------------------------
// Workflow runs
// ---------------------------------------------------------------------------

/// Inputs for `workflows runs create`.
#[derive(Debug, Clone, Default)]
pub struct WorkflowRunRequest {
    pub workflow: String,
    pub build: String,
    /// `name=value` pairs.
    pub parameters: Vec<String>,
    pub pool_labels: Vec<String>,
    pub allowable_failure_percent: Option<i64>,
    pub account: Option<String>,
}

/// Start a run of a workflow, returning the resolved workflow with it.
pub async fn run_workflow(
    platform: &dyn Platform,
    project: Uuid,
    request: WorkflowRunRequest,
) -> DomainResult<(Workflow, WorkflowRun)> {
    require_non_empty("workflow name or ID", &request.workflow)?;
    require_non_empty("build name or ID", &request.build)?;
    let parameters = ParameterMap::parse(&request.parameters, ParameterSeparator::Equals)?;
    let allowable_failure_percent = percent(request.allowable_failure_percent)?;

    let workflow = resolve::<Workflow>(platform, project, &request.workflow).await?;
    let build_id = resolve_id::<Build>(platform, project, &request.build).await?;
    let body = NewWorkflowRun {
        build_id,
        parameters,
        pool_labels: labels(request.pool_labels),
        allowable_failure_percent,
        account: request.account,
    };
    let run = platform
        .create_workflow_run(project, workflow.id, &body)
        .await
        .map_err(DomainError::remote("create", EntityKind::WorkflowRun))?;
    info!(workflow = %workflow.id, run = %run.id, "started workflow run");
    Ok((workflow, run))
}

// ---------------------------------------------------------------------------
// Debug sessions
// ---------------------------------------------------------------------------

/// Inputs for `debug`.
#[derive(Debug, Clone, Default)]
pub struct DebugRequest {
    pub build: String,
    pub experience: String,
    /// Replaces the experience entrypoint.
    pub command: Option<String>,
    pub pool_labels: Vec<String>,
}

/// Start an interactive debug session for one experience on a build.
pub async fn start_debug_session(
    platform: &dyn Platform,
    project: Uuid,
    request: DebugRequest,
) -> DomainResult<DebugSession> {
    require_non_empty("build name or ID", &request.build)?;
    require_non_empty("experience name or ID", &request.experience)?;
    let build_id = resolve_id::<Build>(platform, project, &request.build).await?;
    let experience_id = resolve_id::<Experience>(platform, project, &request.experience).await?;
    let body = NewDebugSession {
        build_id,
        experience_id,
        pool_labels: labels(request.pool_labels),
        command: request.command.filter(|c| !c.trim().is_empty()),
    };
    platform
        .create_debug_session(project, &body)
        .await
        .map_err(DomainError::remote("create", EntityKind::DebugSession))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn selection() -> ExperienceSelection {
        ExperienceSelection {
            keys: vec!["E1".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_tag_ids_and_names_are_exclusive() {
        let selection = ExperienceSelection {
            tag_ids: vec![Uuid::new_v4().to_string()],
            tag_names: vec!["nightly".into()],
            ..Default::default()
        };
        let err = selection.validate().unwrap_err();
        assert!(err.to_string().contains("mutually exclusive parameters"));
    }

    #[test]
    fn test_selection_requires_something() {
        let err = ExperienceSelection::default().validate().unwrap_err();
        assert!(matches!(err, ValidationError::MissingOneOf(_)));
    }

    #[test]
    fn test_malformed_experience_id_rejected() {
        let selection = ExperienceSelection {
            ids: vec!["not-a-uuid".into()],
            ..Default::default()
        };
        let err = selection.validate().unwrap_err();
        assert!(err.to_string().starts_with("failed to parse experience ID"));
    }

    #[test]
    fn test_batch_percent_out_of_range() {
        let request = BatchRequest {
            build: "b".into(),
            experiences: selection(),
            allowable_failure_percent: Some(101),
            ..Default::default()
        };
        let err = request.validate().unwrap_err();
        assert!(err
            .to_string()
            .contains("allowable failure percent must be between 0 and 100"));
    }

    #[test]
    fn test_sweep_single_and_grid_are_exclusive() {
        let request = SweepRequest {
            build: "b".into(),
            experiences: selection(),
            parameter_name: Some("p".into()),
            parameter_values: vec!["a".into(), "b".into()],
            grid_search_config: Some(PathBuf::from("grid.json")),
            ..Default::default()
        };
        let err = request.grid().unwrap_err();
        assert!(err.to_string().contains("if any flags in the group"));
    }

    #[test]
    fn test_sweep_name_without_values() {
        let request = SweepRequest {
            build: "b".into(),
            experiences: selection(),
            parameter_name: Some("p".into()),
            ..Default::default()
        };
        let err = request.grid().unwrap_err();
        assert!(matches!(err, ValidationError::RequiredTogether { .. }));
    }

    #[test]
    fn test_sweep_single_axis_count() {
        let request = SweepRequest {
            build: "b".into(),
            experiences: selection(),
            parameter_name: Some("p".into()),
            parameter_values: vec!["a".into(), "b".into(), "c".into()],
            ..Default::default()
        };
        assert_eq!(request.grid().unwrap().combination_count(), 3);
    }

    fn report() -> ReportRequest {
        ReportRequest {
            suite: "nightly".into(),
            branch: "main".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_report_length_window() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let (start, end) = ReportRequest {
            length_days: Some(7),
            ..report()
        }
        .window(now)
        .unwrap();
        assert_eq!(end, now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_report_length_beyond_calendar_is_rejected() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        for days in [1_000_000_000, i64::MAX] {
            let err = ReportRequest {
                length_days: Some(days),
                ..report()
            }
            .window(now)
            .unwrap_err();
            assert!(matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "length"));
        }
    }

    #[test]
    fn test_report_length_excludes_timestamps() {
        let err = ReportRequest {
            length_days: Some(7),
            start: Some("1700000000".into()),
            ..report()
        }
        .window(Utc::now())
        .unwrap_err();
        assert!(err.to_string().contains("mutually exclusive parameters"));
    }

    #[test]
    fn test_report_end_must_follow_start() {
        let err = ReportRequest {
            start: Some("2024-03-10T00:00:00Z".into()),
            end: Some("2024-03-01T00:00:00Z".into()),
            ..report()
        }
        .window(Utc::now())
        .unwrap_err();
        assert!(err.to_string().starts_with("invalid end timestamp"));
    }

    #[test]
    fn test_report_end_defaults_to_now() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let (_, end) = ReportRequest {
            start: Some("2024-03-01T00:00:00Z".into()),
            ..report()
        }
        .window(now)
        .unwrap();
        assert_eq!(end, now);
    }
}
