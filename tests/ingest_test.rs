//! Log ingestion end to end against the in-memory platform.

mod common;

use std::io::Write;

use resim::domain::errors::DomainError;
use resim::domain::ports::ExperiencesApi;
use resim::services::ingest::{
    ingest, IngestRequest, DEFAULT_BRANCH, INGEST_TAG, LOG_INGEST_IMAGE,
};

use common::seeded;

fn drive_logs() -> IngestRequest {
    IngestRequest {
        system: Some("S1".into()),
        logs: vec![
            "drive-1=s3://logs/drive-1/".into(),
            "drive-2=s3://logs/drive-2/".into(),
        ],
        tags: vec!["highway".into()],
        metrics_build: Some("M1".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_first_ingest_creates_build_and_experiences() {
    let (platform, fixture) = seeded().await;
    let outcome = ingest(&platform, fixture.project, drive_logs()).await.unwrap();

    assert_eq!(outcome.build.image_uri.as_deref(), Some(LOG_INGEST_IMAGE));
    assert_eq!(outcome.build.version, "latest");
    assert_eq!(
        outcome.branch.as_ref().map(|b| b.name.as_str()),
        Some(DEFAULT_BRANCH)
    );
    assert_eq!(outcome.created.len(), 2);
    assert_eq!(outcome.batch.experience_ids, outcome.created);
    assert_eq!(outcome.batch.metrics_build_id, Some(fixture.metrics_build));

    let names: Vec<&str> = outcome.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec![INGEST_TAG, "highway"]);
    let tagged = platform
        .list_tagged_experiences(fixture.project, outcome.tags[0].id)
        .await
        .unwrap();
    assert_eq!(tagged.len(), 2);
    assert!(outcome
        .experiences
        .iter()
        .all(|e| e.system_ids == vec![fixture.system]));
}

#[tokio::test]
async fn test_repeat_ingest_reuses_everything() {
    let (platform, fixture) = seeded().await;
    let first = ingest(&platform, fixture.project, drive_logs()).await.unwrap();
    let second = ingest(&platform, fixture.project, drive_logs()).await.unwrap();

    assert_eq!(second.build.id, first.build.id);
    assert!(second.created.is_empty());
    assert_eq!(second.batch.experience_ids, first.batch.experience_ids);
    assert_ne!(second.batch.id, first.batch.id);
}

#[tokio::test]
async fn test_repeat_ingest_applies_new_tags_to_existing_experiences() {
    let (platform, fixture) = seeded().await;
    let first = ingest(&platform, fixture.project, drive_logs()).await.unwrap();
    let request = IngestRequest {
        tags: vec!["highway".into(), "night".into()],
        ..drive_logs()
    };
    let second = ingest(&platform, fixture.project, request).await.unwrap();
    assert!(second.created.is_empty());

    let night = second.tags.iter().find(|t| t.name == "night").unwrap();
    let mut tagged: Vec<_> = platform
        .list_tagged_experiences(fixture.project, night.id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    tagged.sort();
    let mut expected = first.batch.experience_ids.clone();
    expected.sort();
    assert_eq!(tagged, expected);

    let highway = second.tags.iter().find(|t| t.name == "highway").unwrap();
    let still_tagged = platform
        .list_tagged_experiences(fixture.project, highway.id)
        .await
        .unwrap();
    assert_eq!(still_tagged.len(), 2);
}

#[tokio::test]
async fn test_new_version_creates_new_build() {
    let (platform, fixture) = seeded().await;
    let first = ingest(&platform, fixture.project, drive_logs()).await.unwrap();
    let request = IngestRequest {
        version: Some("2".into()),
        ..drive_logs()
    };
    let second = ingest(&platform, fixture.project, request).await.unwrap();
    assert_ne!(second.build.id, first.build.id);
    assert_eq!(second.build.version, "2");
}

#[tokio::test]
async fn test_existing_build_by_id() {
    let (platform, fixture) = seeded().await;
    let request = IngestRequest {
        build_id: Some(fixture.build.to_string()),
        log_name: Some("drive-9".into()),
        log_location: Some("s3://logs/drive-9/".into()),
        ..Default::default()
    };
    let outcome = ingest(&platform, fixture.project, request).await.unwrap();
    assert_eq!(outcome.build.id, fixture.build);
    assert!(outcome.branch.is_none());
    assert_eq!(outcome.created.len(), 1);
}

#[tokio::test]
async fn test_reingest_requires_existing_experience() {
    let (platform, fixture) = seeded().await;
    let request = IngestRequest {
        reingest: true,
        ..drive_logs()
    };
    let err = ingest(&platform, fixture.project, request).await.unwrap_err();
    assert!(matches!(err, DomainError::Precondition(_)));
    assert!(err.to_string().contains("drive-1"));
}

#[tokio::test]
async fn test_logs_from_config_file() {
    let (platform, fixture) = seeded().await;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "logs:\n  - name: parked\n    location: s3://logs/parked/\n  - name: city\n    location: s3://logs/city/"
    )
    .unwrap();

    let request = IngestRequest {
        system: Some("S1".into()),
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let outcome = ingest(&platform, fixture.project, request).await.unwrap();
    let names: Vec<&str> = outcome.experiences.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["parked", "city"]);
}

#[tokio::test]
async fn test_invalid_request_sends_nothing() {
    let (platform, fixture) = seeded().await;
    let before = platform.request_count();
    let request = IngestRequest {
        system: Some("S1".into()),
        log_name: Some("drive-1".into()),
        ..Default::default()
    };
    let err = ingest(&platform, fixture.project, request).await.unwrap_err();
    assert!(err.to_string().contains("log-location"));
    assert_eq!(platform.request_count(), before);
}
