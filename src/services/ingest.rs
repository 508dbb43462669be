//! Log ingestion: turn existing log files into experiences and run them
//! through the log-ingest build.
//!
//! Missing branch, build, tag and experience records are created on demand,
//! and existing ones are reused, so repeating an ingest with the same inputs
//! submits a new batch over the same experiences.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult, ValidationError};
use crate::domain::models::requests::{NewBatch, NewBuild, NewExperience};
use crate::domain::models::{
    Batch, Branch, Build, EntityKind, Experience, ExperienceTag, MetricsBuild, ParameterMap,
    System, DEFAULT_EXPERIENCE_TIMEOUT_SECS,
};
use crate::domain::ports::Platform;
use crate::services::catalog::{ensure_experience_tags, find_or_create_branch};
use crate::services::resolver::{find_build, resolve, resolve_id};
use crate::services::validation::{exclusive, one_required, require_non_empty, required_together};

/// Image of the shared build that replays ingested logs.
pub const LOG_INGEST_IMAGE: &str = "public.ecr.aws/resim/open-builds/log-ingest:latest";
/// Branch used when `--branch` is not given.
pub const DEFAULT_BRANCH: &str = "log-ingest-branch";
pub const DEFAULT_VERSION: &str = "latest";
/// Tag every ingested experience carries.
pub const INGEST_TAG: &str = "ingested-via-resim";

/// One log to ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSource {
    pub name: String,
    pub location: String,
}

#[derive(Debug, Deserialize)]
struct LogConfigFile {
    #[serde(default)]
    logs: Vec<LogSource>,
}

/// Parse a YAML document with a top-level `logs:` list.
pub fn parse_log_config(text: &str) -> Result<Vec<LogSource>, ValidationError> {
    let file: LogConfigFile = serde_yaml::from_str(text)
        .map_err(|e| ValidationError::parse("log config", "<yaml>", e))?;
    Ok(file.logs)
}

fn load_log_config(path: &Path) -> Result<Vec<LogSource>, ValidationError> {
    let text = std::fs::read_to_string(path).map_err(|e| ValidationError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_log_config(&text)
}

/// Inputs for `ingest`. Exactly one log source and one build source.
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    /// Existing build to run, exclusive with the system/branch/version triple.
    pub build_id: Option<String>,
    pub system: Option<String>,
    pub branch: Option<String>,
    pub version: Option<String>,
    pub metrics_build: Option<String>,
    pub log_name: Option<String>,
    pub log_location: Option<String>,
    /// `name=location` pairs.
    pub logs: Vec<String>,
    /// YAML file listing logs.
    pub config: Option<PathBuf>,
    /// Tags applied next to [`INGEST_TAG`].
    pub tags: Vec<String>,
    pub batch_name: Option<String>,
    pub pool_labels: Vec<String>,
    pub account: Option<String>,
    /// Only reuse existing experiences. A log without one is an error.
    pub reingest: bool,
}

impl IngestRequest {
    fn validate_build_source(&self) -> Result<(), ValidationError> {
        let build_fields = [
            ("system", self.system.is_some()),
            ("branch", self.branch.is_some()),
            ("version", self.version.is_some()),
        ];
        if self.build_id.is_some() && build_fields.iter().any(|(_, set)| *set) {
            let mut set = vec!["build-id".to_string()];
            set.extend(
                build_fields
                    .iter()
                    .filter(|(_, set)| *set)
                    .map(|(name, _)| (*name).to_string()),
            );
            return Err(ValidationError::MutuallyExclusive {
                group: ["build-id", "system", "branch", "version"]
                    .map(String::from)
                    .to_vec(),
                set,
            });
        }
        one_required(&[
            ("build-id", self.build_id.is_some()),
            ("system", self.system.is_some()),
        ])
    }

    /// Validate every input and collect the logs to ingest.
    pub fn sources(&self) -> Result<Vec<LogSource>, ValidationError> {
        self.validate_build_source()?;
        let single = self.log_name.is_some() || self.log_location.is_some();
        let forms = [
            ("log-name", single),
            ("log", !self.logs.is_empty()),
            ("config", self.config.is_some()),
        ];
        exclusive(&forms)?;
        one_required(&forms)?;
        required_together(&[
            ("log-name", self.log_name.is_some()),
            ("log-location", self.log_location.is_some()),
        ])?;

        let sources = match (&self.log_name, &self.log_location, &self.config) {
            (Some(name), Some(location), _) => vec![LogSource {
                name: name.clone(),
                location: location.clone(),
            }],
            (_, _, Some(path)) => load_log_config(path)?,
            _ => self
                .logs
                .iter()
                .map(|pair| {
                    pair.split_once('=')
                        .map(|(name, location)| LogSource {
                            name: name.trim().to_string(),
                            location: location.trim().to_string(),
                        })
                        .ok_or_else(|| ValidationError::invalid("log (expected name=location)", pair))
                })
                .collect::<Result<_, _>>()?,
        };

        if sources.is_empty() {
            return Err(ValidationError::empty("logs"));
        }
        let mut names = BTreeSet::new();
        for source in &sources {
            require_non_empty("log name", &source.name)?;
            require_non_empty("log location", &source.location)?;
            if !names.insert(source.name.as_str()) {
                return Err(ValidationError::DuplicateParameter(source.name.clone()));
            }
        }
        Ok(sources)
    }
}

/// What an ingest created, reused and submitted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub build: Build,
    pub branch: Option<Branch>,
    pub tags: Vec<ExperienceTag>,
    pub experiences: Vec<Experience>,
    /// IDs of experiences created by this ingest.
    #[serde(rename = "createdExperienceIDs")]
    pub created: Vec<Uuid>,
    pub batch: Batch,
}

async fn ingest_build(
    platform: &dyn Platform,
    project: Uuid,
    request: &IngestRequest,
) -> DomainResult<(Build, Option<Branch>, Option<Uuid>)> {
    if let Some(key) = &request.build_id {
        let build = resolve::<Build>(platform, project, key).await?;
        return Ok((build, None, None));
    }
    let system_key = request.system.as_deref().unwrap_or_default();
    let system = resolve_id::<System>(platform, project, system_key).await?;
    let branch_name = request.branch.as_deref().unwrap_or(DEFAULT_BRANCH);
    let version = request.version.as_deref().unwrap_or(DEFAULT_VERSION);
    let branch = find_or_create_branch(platform, project, branch_name, true).await?;

    let build = match find_build(platform, project, system, branch.id, version).await? {
        Some(build) => {
            debug!(build = %build.id, version, "reusing log-ingest build");
            build
        }
        None => {
            let request = NewBuild {
                branch_id: branch.id,
                system_id: system,
                name: format!("log-ingest-{version}"),
                description: "Log ingestion build".to_string(),
                version: version.to_string(),
                image_uri: Some(LOG_INGEST_IMAGE.to_string()),
                build_specification: None,
            };
            let build = platform
                .create_build(project, &request)
                .await
                .map_err(DomainError::remote("create", EntityKind::Build))?;
            info!(build = %build.id, version, "created log-ingest build");
            build
        }
    };
    Ok((build, Some(branch), Some(system)))
}

async fn ingest_experience(
    platform: &dyn Platform,
    project: Uuid,
    source: &LogSource,
    system: Option<Uuid>,
    reingest: bool,
) -> DomainResult<(Experience, bool)> {
    match resolve::<Experience>(platform, project, &source.name).await {
        Ok(experience) => Ok((experience, false)),
        Err(DomainError::NotFound { .. }) if reingest => Err(DomainError::Precondition(format!(
            "experience {} does not exist; ingest it without --reingest first",
            source.name
        ))),
        Err(DomainError::NotFound { .. }) => {
            let request = NewExperience {
                name: source.name.clone(),
                description: format!("Ingested log {}", source.name),
                locations: vec![source.location.clone()],
                container_timeout_seconds: DEFAULT_EXPERIENCE_TIMEOUT_SECS,
                profile: None,
                environment_variables: Vec::new(),
                system_ids: system.into_iter().collect(),
            };
            let experience = platform
                .create_experience(project, &request)
                .await
                .map_err(DomainError::on_create(EntityKind::Experience, &source.name))?;
            info!(experience = %experience.id, name = %experience.name, "created experience for log");
            Ok((experience, true))
        }
        Err(err) => Err(err),
    }
}

/// Find or create the ingest build, an experience per log, and submit one
/// batch over them. Every ingested experience ends up with every tag.
pub async fn ingest(
    platform: &dyn Platform,
    project: Uuid,
    request: IngestRequest,
) -> DomainResult<IngestOutcome> {
    let sources = request.sources()?;
    let (build, branch, system) = ingest_build(platform, project, &request).await?;
    let metrics_build_id = match &request.metrics_build {
        Some(key) => Some(resolve_id::<MetricsBuild>(platform, project, key).await?),
        None => None,
    };

    let mut tag_names = vec![INGEST_TAG.to_string()];
    tag_names.extend(request.tags.iter().cloned());
    let tags = ensure_experience_tags(platform, project, &tag_names).await?;

    let mut experiences = Vec::with_capacity(sources.len());
    let mut created = Vec::new();
    for source in &sources {
        let (experience, is_new) =
            ingest_experience(platform, project, source, system, request.reingest).await?;
        for tag in tags.iter().filter(|t| !experience.tag_ids.contains(&t.id)) {
            platform
                .tag_experience(project, tag.id, experience.id)
                .await
                .map_err(DomainError::remote("tag", EntityKind::Experience))?;
        }
        if is_new {
            created.push(experience.id);
        }
        experiences.push(experience);
    }

    let body = NewBatch {
        build_id: build.id,
        experience_ids: experiences.iter().map(|e| e.id).collect(),
        experience_tag_ids: Vec::new(),
        metrics_build_id,
        parameters: ParameterMap::new(),
        pool_labels: request.pool_labels,
        allowable_failure_percent: 0,
        friendly_name: request.batch_name.filter(|n| !n.trim().is_empty()),
        account: request.account,
    };
    let batch = platform
        .create_batch(project, &body)
        .await
        .map_err(DomainError::remote("create", EntityKind::Batch))?;
    info!(batch = %batch.id, logs = sources.len(), created = created.len(), "submitted ingestion batch");

    Ok(IngestOutcome {
        build,
        branch,
        tags,
        experiences,
        created,
        batch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> IngestRequest {
        IngestRequest {
            system: Some("S1".into()),
            log_name: Some("drive-1".into()),
            log_location: Some("s3://bucket/drive-1/".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_id_excludes_build_triple() {
        let request = IngestRequest {
            build_id: Some(Uuid::new_v4().to_string()),
            ..base()
        };
        let err = request.sources().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("mutually exclusive parameters"));
        assert!(msg.contains("[build-id system]"));
    }

    #[test]
    fn test_system_or_build_id_required() {
        let request = IngestRequest {
            system: None,
            ..base()
        };
        assert!(matches!(
            request.sources(),
            Err(ValidationError::MissingOneOf(_))
        ));
    }

    #[test]
    fn test_log_forms_exclusive() {
        let request = IngestRequest {
            logs: vec!["a=s3://a".into()],
            ..base()
        };
        assert!(request
            .sources()
            .unwrap_err()
            .to_string()
            .contains("mutually exclusive parameters"));
    }

    #[test]
    fn test_log_pairs() {
        let request = IngestRequest {
            log_name: None,
            log_location: None,
            logs: vec!["a=s3://bucket/a".into(), "b=s3://bucket/b?x=1".into()],
            ..base()
        };
        let sources = request.sources().unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[1].location, "s3://bucket/b?x=1");
    }

    #[test]
    fn test_duplicate_log_names() {
        let request = IngestRequest {
            log_name: None,
            log_location: None,
            logs: vec!["a=s3://x".into(), "a=s3://y".into()],
            ..base()
        };
        assert_eq!(
            request.sources().unwrap_err(),
            ValidationError::DuplicateParameter("a".into())
        );
    }

    #[test]
    fn test_parse_log_config() {
        let sources = parse_log_config(
            "logs:\n  - name: a\n    location: s3://bucket/a\n  - name: b\n    location: s3://bucket/b\n",
        )
        .unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name, "a");
    }
}
