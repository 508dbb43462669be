//! Job and report log download.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult, ValidationError};
use crate::domain::models::{EntityKind, JobLog};
use crate::domain::ports::Platform;

/// Archive of user-written files, expanded after download.
pub const LOG_ARCHIVE: &str = "logs.zip";

/// Files every job may produce.
pub const CANONICAL_LOG_FILES: [&str; 7] = [
    "experience-worker.log",
    "metrics-worker.log",
    "experience-container.log",
    "metrics-container.log",
    "resource_metrics.binproto",
    LOG_ARCHIVE,
    "test_length_metric.binproto",
];

/// Every log file one job produced.
pub async fn list_job_logs(
    platform: &dyn Platform,
    project: Uuid,
    batch: Uuid,
    job: Uuid,
) -> DomainResult<Vec<JobLog>> {
    platform
        .list_job_logs(project, batch, job)
        .await
        .map_err(DomainError::remote("list logs for", EntityKind::Job))
}

/// Pick the logs named in `filter`, or every log when it is empty. A name
/// that is neither canonical nor present in `logs` is rejected.
pub fn select_logs(logs: Vec<JobLog>, filter: &[String]) -> Result<Vec<JobLog>, ValidationError> {
    if filter.is_empty() {
        return Ok(logs);
    }
    for name in filter {
        let known = CANONICAL_LOG_FILES.contains(&name.as_str())
            || logs.iter().any(|log| &log.file_name == name);
        if !known {
            return Err(ValidationError::invalid("log file", name));
        }
    }
    let selected: Vec<JobLog> = logs
        .into_iter()
        .filter(|log| filter.contains(&log.file_name))
        .collect();
    for name in filter {
        if !selected.iter().any(|log| &log.file_name == name) {
            warn!(file = %name, "requested log file was not produced by this job");
        }
    }
    Ok(selected)
}

/// Reduce a server-supplied file name to its final component.
fn local_name(file_name: &str) -> Result<PathBuf, ValidationError> {
    Path::new(file_name)
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| ValidationError::invalid("log file name", file_name))
}

/// Download `logs` into `output`, expanding the log archive in place.
/// Returns every file written, relative to `output`, sorted.
pub async fn download_logs(
    platform: &dyn Platform,
    logs: &[JobLog],
    output: &Path,
) -> DomainResult<Vec<PathBuf>> {
    tokio::fs::create_dir_all(output)
        .await
        .map_err(DomainError::io(output))?;

    let mut written = Vec::new();
    for log in logs {
        let name = local_name(&log.file_name)?;
        let destination = output.join(&name);
        debug!(file = %log.file_name, size = log.file_size, "downloading log");
        let content = platform
            .fetch_log(log)
            .await
            .map_err(DomainError::remote("download", EntityKind::Job))?;
        tokio::fs::write(&destination, &content)
            .await
            .map_err(DomainError::io(&destination))?;

        if name.as_os_str() == LOG_ARCHIVE {
            let archive = destination.clone();
            let target = output.to_path_buf();
            let extracted = tokio::task::spawn_blocking(move || extract_archive(&archive, &target))
                .await
                .map_err(|e| DomainError::io(&destination)(std::io::Error::other(e)))??;
            tokio::fs::remove_file(&destination)
                .await
                .map_err(DomainError::io(&destination))?;
            written.extend(extracted);
        } else {
            written.push(name);
        }
    }
    written.sort();
    written.dedup();
    info!(files = written.len(), output = %output.display(), "downloaded logs");
    Ok(written)
}

/// Unpack a zip archive under `target`. Entries that would escape `target`
/// are skipped.
pub fn extract_archive(archive: &Path, target: &Path) -> DomainResult<Vec<PathBuf>> {
    let file = File::open(archive).map_err(DomainError::io(archive))?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| DomainError::io(archive)(std::io::Error::other(e)))?;
    let mut extracted = Vec::new();
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| DomainError::io(archive)(std::io::Error::other(e)))?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "skipping archive entry outside the output directory");
            continue;
        };
        let path = target.join(&relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&path).map_err(DomainError::io(&path))?;
            continue;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DomainError::io(parent))?;
        }
        let mut out = File::create(&path).map_err(DomainError::io(&path))?;
        std::io::copy(&mut entry, &mut out).map_err(DomainError::io(&path))?;
        extracted.push(relative);
    }
    Ok(extracted)
}
