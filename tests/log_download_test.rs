//! Job log listing, filtering and download.

mod common;

use std::io::{Cursor, Write};

use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use resim::adapters::memory::InMemoryPlatform;
use resim::domain::ports::BatchesApi;
use resim::services::log_download::{download_logs, list_job_logs, select_logs, LOG_ARCHIVE};
use resim::services::submission::{self, BatchRequest, ExperienceSelection};

use common::{seeded, temp_dir};

fn archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn test_download_expands_archive() {
    let (platform, fixture) = seeded().await;
    let (project, batch, job) = job_with_logs_on(&platform, fixture.project, fixture.build).await;
    let logs = list_job_logs(&platform, project, batch, job).await.unwrap();
    assert_eq!(logs.len(), 2);

    let dir = temp_dir();
    let written = download_logs(&platform, &logs, dir.path()).await.unwrap();
    assert_eq!(
        written,
        vec![
            "experience-worker.log".into(),
            std::path::PathBuf::from("frames/0001.json"),
            "summary.txt".into(),
        ]
    );
    assert!(!dir.path().join(LOG_ARCHIVE).exists());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("summary.txt")).unwrap(),
        "ok"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("experience-worker.log")).unwrap(),
        "worker started\n"
    );
}

#[tokio::test]
async fn test_filtered_download() {
    let (platform, fixture) = seeded().await;
    let (project, batch, job) = job_with_logs_on(&platform, fixture.project, fixture.build).await;
    let logs = list_job_logs(&platform, project, batch, job).await.unwrap();
    let selected = select_logs(logs, &["experience-worker.log".to_string()]).unwrap();

    let dir = temp_dir();
    let written = download_logs(&platform, &selected, dir.path().join("out").as_path())
        .await
        .unwrap();
    assert_eq!(written, vec![std::path::PathBuf::from("experience-worker.log")]);
    assert!(!dir.path().join("out").join("summary.txt").exists());
}

#[tokio::test]
async fn test_canonical_name_not_produced_is_skipped() {
    let (platform, fixture) = seeded().await;
    let (project, batch, job) = job_with_logs_on(&platform, fixture.project, fixture.build).await;
    let logs = list_job_logs(&platform, project, batch, job).await.unwrap();
    let selected = select_logs(logs, &["metrics-worker.log".to_string()]).unwrap();
    assert!(selected.is_empty());
}

#[tokio::test]
async fn test_unknown_job_is_an_error() {
    let (platform, fixture) = seeded().await;
    let (project, batch, _) = job_with_logs_on(&platform, fixture.project, fixture.build).await;
    let err = list_job_logs(&platform, project, batch, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("list logs for"));
}

/// A single-job batch with a worker log and an archive attached.
async fn job_with_logs_on(
    platform: &InMemoryPlatform,
    project: Uuid,
    build: Uuid,
) -> (Uuid, Uuid, Uuid) {
    let batch = submission::submit_batch(
        platform,
        project,
        BatchRequest {
            build: build.to_string(),
            experiences: ExperienceSelection {
                keys: vec!["E1".into()],
                ..Default::default()
            },
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let job = platform.list_jobs(project, batch.id).await.unwrap()[0].id;
    platform
        .attach_log(job, "experience-worker.log", b"worker started\n".to_vec())
        .await;
    platform
        .attach_log(
            job,
            LOG_ARCHIVE,
            archive(&[("summary.txt", "ok"), ("frames/0001.json", "{}")]),
        )
        .await;
    (project, batch.id, job)
}
