//! Waiting on and supervising submitted work against the in-memory platform.

mod common;

use std::time::Duration;

use uuid::Uuid;

use resim::adapters::memory::InMemoryPlatform;
use resim::domain::errors::DomainError;
use resim::domain::models::{JobStatus, WorkStatus};
use resim::domain::ports::BatchesApi;
use resim::services::catalog::{self, SuiteSpec, WorkflowSuiteSpec};
use resim::services::observer::{
    BatchItem, ObserveOptions, Observer, ReportItem, SweepItem, WorkflowRunItem,
};
use resim::services::submission::{
    self, BatchRequest, ExperienceSelection, ReportRequest, SweepRequest, WorkflowRunRequest,
};
use resim::services::supervisor::{supervise, FailureBudget, StopReason, SupervisePolicy};

use common::{fast_polling, seeded, Fixture};

async fn submit(platform: &InMemoryPlatform, fixture: &Fixture) -> BatchItem {
    let batch = submission::submit_batch(
        platform,
        fixture.project,
        BatchRequest {
            build: fixture.build.to_string(),
            experiences: ExperienceSelection {
                keys: vec!["E1".into(), "E2".into(), "E3".into()],
                ..Default::default()
            },
            batch_name: Some("nightly".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    BatchItem {
        project: fixture.project,
        id: batch.id,
    }
}

async fn job_for(platform: &InMemoryPlatform, item: &BatchItem, experience: Uuid) -> Uuid {
    platform
        .list_jobs(item.project, item.id)
        .await
        .unwrap()
        .into_iter()
        .find(|job| job.experience_id == experience)
        .unwrap()
        .id
}

#[tokio::test(start_paused = true)]
async fn test_batch_with_failed_job_settles_failed() {
    let (platform, fixture) = seeded().await;
    let item = submit(&platform, &fixture).await;
    platform
        .script_job(item.id, fixture.experiences[0], vec![JobStatus::Failed])
        .await;

    let observer = Observer::new(&platform, fast_polling());
    let observation = observer
        .observe(&item, &ObserveOptions::default())
        .await
        .unwrap();
    assert_eq!(observation.status, WorkStatus::Failed);
    assert_eq!(observation.history.first(), Some(&WorkStatus::Submitted));
}

#[tokio::test(start_paused = true)]
async fn test_supervise_reruns_errored_job_until_success() {
    let (platform, fixture) = seeded().await;
    let item = submit(&platform, &fixture).await;
    platform
        .script_job(
            item.id,
            fixture.experiences[1],
            vec![JobStatus::Error, JobStatus::Passed],
        )
        .await;
    let errored = job_for(&platform, &item, fixture.experiences[1]).await;

    let observer = Observer::new(&platform, fast_polling());
    let report = supervise(&observer, item, &SupervisePolicy::default())
        .await
        .unwrap();

    assert_eq!(report.final_status, WorkStatus::Succeeded);
    assert_eq!(report.reason, StopReason::Converged);
    assert_eq!(report.attempts, 1);
    assert_eq!(report.reruns, vec![vec![errored]]);
    assert_eq!(platform.reruns().await, vec![(item.id, vec![errored])]);
}

#[tokio::test(start_paused = true)]
async fn test_supervise_stops_after_max_attempts() {
    let (platform, fixture) = seeded().await;
    let item = submit(&platform, &fixture).await;
    platform
        .script_job(item.id, fixture.experiences[2], vec![JobStatus::Error])
        .await;

    let policy = SupervisePolicy {
        max_rerun_attempts: 2,
        ..Default::default()
    };
    let observer = Observer::new(&platform, fast_polling());
    let report = supervise(&observer, item, &policy).await.unwrap();

    assert_eq!(report.final_status, WorkStatus::Error);
    assert_eq!(report.reason, StopReason::AttemptsExhausted);
    assert_eq!(report.attempts, 2);
    assert_eq!(platform.reruns().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_supervise_respects_failure_budget() {
    let (platform, fixture) = seeded().await;
    let item = submit(&platform, &fixture).await;
    for experience in &fixture.experiences[..2] {
        platform
            .script_job(item.id, *experience, vec![JobStatus::Error, JobStatus::Passed])
            .await;
    }

    let policy = SupervisePolicy {
        budget: FailureBudget::MaxFailedJobs(1),
        ..Default::default()
    };
    let observer = Observer::new(&platform, fast_polling());
    let report = supervise(&observer, item, &policy).await.unwrap();

    assert_eq!(report.reason, StopReason::BudgetExceeded);
    assert_eq!(report.attempts, 0);
    assert!(platform.reruns().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_supervise_reruns_failed_jobs_when_asked() {
    let (platform, fixture) = seeded().await;
    let item = submit(&platform, &fixture).await;
    platform
        .script_job(
            item.id,
            fixture.experiences[0],
            vec![JobStatus::Failed, JobStatus::Passed],
        )
        .await;

    let policy = SupervisePolicy {
        rerun_on: [JobStatus::Error, JobStatus::Failed].into(),
        ..Default::default()
    };
    let observer = Observer::new(&platform, fast_polling());
    let report = supervise(&observer, item, &policy).await.unwrap();
    assert_eq!(report.final_status, WorkStatus::Succeeded);
    assert_eq!(report.attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_supervise_wait_timeout() {
    let (platform, fixture) = seeded().await;
    let item = submit(&platform, &fixture).await;
    platform
        .script_batch(item.id, vec![WorkStatus::ExperiencesRunning])
        .await;

    let policy = SupervisePolicy {
        wait_timeout: Some(Duration::from_secs(30)),
        ..Default::default()
    };
    let observer = Observer::new(&platform, fast_polling());
    let err = supervise(&observer, item, &policy).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Timeout {
            status: WorkStatus::ExperiencesRunning,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_sweep_reflects_worst_batch() {
    let (platform, fixture) = seeded().await;
    let (sweep, expected) = submission::submit_sweep(
        &platform,
        fixture.project,
        SweepRequest {
            build: "1.0.0".into(),
            experiences: ExperienceSelection {
                keys: vec!["E1".into()],
                ..Default::default()
            },
            parameter_name: Some("speed".into()),
            parameter_values: vec!["1".into(), "2".into()],
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(expected, 2);
    assert_eq!(sweep.batch_ids.len(), 2);
    platform
        .script_job(sweep.batch_ids[1], fixture.experiences[0], vec![JobStatus::Failed])
        .await;

    let observer = Observer::new(&platform, fast_polling());
    let observation = observer
        .observe(
            &SweepItem {
                project: fixture.project,
                id: sweep.id,
            },
            &ObserveOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(observation.status, WorkStatus::Failed);
    assert!(observation.history.contains(&WorkStatus::BatchesRunning));
}

#[tokio::test(start_paused = true)]
async fn test_stale_status_after_rerun_is_ignored() {
    let (platform, fixture) = seeded().await;
    let item = submit(&platform, &fixture).await;
    platform
        .script_job(
            item.id,
            fixture.experiences[0],
            vec![JobStatus::Error, JobStatus::Passed],
        )
        .await;
    let observer = Observer::new(&platform, fast_polling());
    let first = observer
        .observe(&item, &ObserveOptions::default())
        .await
        .unwrap();
    assert_eq!(first.status, WorkStatus::Error);

    platform
        .script_rerun(
            item.id,
            vec![WorkStatus::Error, WorkStatus::ExperiencesRunning],
        )
        .await;
    let errored = job_for(&platform, &item, fixture.experiences[0]).await;
    platform
        .rerun_batch(item.project, item.id, &[errored])
        .await
        .unwrap();

    let second = observer
        .observe(
            &item,
            &ObserveOptions {
                await_restart: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(second.status, WorkStatus::Succeeded);
    assert_eq!(
        second.history,
        vec![WorkStatus::ExperiencesRunning, WorkStatus::Succeeded]
    );
    assert_eq!(second.polls, 3);
}

async fn regression_suite(platform: &InMemoryPlatform, project: Uuid) {
    catalog::create_suite(
        platform,
        project,
        SuiteSpec {
            name: "regression".into(),
            description: "d".into(),
            system: "S1".into(),
            experiences: vec!["E1".into(), "E2".into()],
            metrics_build: Some("M1".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_report_reaches_terminal_status() {
    let (platform, fixture) = seeded().await;
    regression_suite(&platform, fixture.project).await;
    let report = submission::create_report(
        &platform,
        fixture.project,
        ReportRequest {
            suite: "regression".into(),
            branch: "main".into(),
            length_days: Some(7),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(report.metrics_build_id, fixture.metrics_build);
    platform
        .script_report(report.id, vec![WorkStatus::Running, WorkStatus::Error])
        .await;

    let observation = Observer::new(&platform, fast_polling())
        .observe(
            &ReportItem {
                project: fixture.project,
                id: report.id,
            },
            &ObserveOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(observation.status, WorkStatus::Error);
    assert_eq!(
        observation.history,
        vec![WorkStatus::Running, WorkStatus::Error]
    );
}

#[tokio::test(start_paused = true)]
async fn test_workflow_run_cancellation_is_observed() {
    let (platform, fixture) = seeded().await;
    regression_suite(&platform, fixture.project).await;
    catalog::create_workflow(
        &platform,
        fixture.project,
        "nightly-workflow",
        "d",
        None,
        &[WorkflowSuiteSpec {
            test_suite: "regression".into(),
            enabled: true,
        }],
    )
    .await
    .unwrap();
    let (workflow, run) = submission::run_workflow(
        &platform,
        fixture.project,
        WorkflowRunRequest {
            workflow: "nightly-workflow".into(),
            build: fixture.build.to_string(),
            parameters: vec!["speed=10".into()],
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(run.parameters.get("speed"), Some("10"));
    platform
        .script_workflow_run(run.id, vec![WorkStatus::Running, WorkStatus::Cancelled])
        .await;

    let observation = Observer::new(&platform, fast_polling())
        .observe(
            &WorkflowRunItem {
                project: fixture.project,
                workflow: workflow.id,
                run: run.id,
            },
            &ObserveOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(observation.status, WorkStatus::Cancelled);
}
