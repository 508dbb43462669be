mod common;

use std::collections::{BTreeSet, HashMap};
use std::future::Future;

use proptest::prelude::*;
use uuid::Uuid;

use resim::adapters::memory::InMemoryPlatform;
use resim::domain::models::{
    GridSearch, JobStatus, ParameterMap, ParameterSeparator, SweepParameter, WorkStatus,
};
use resim::domain::ports::BatchesApi;
use resim::services::observer::{BatchItem, ObserveOptions, Observer};
use resim::services::submission::{self, BatchRequest, ExperienceSelection};
use resim::services::supervisor::{supervise, FailureBudget, SupervisePolicy};
use resim::services::validation::{allowable_failure_percent, exclusive, split_list};

use common::{fast_polling, seeded, Fixture};

fn axes() -> impl Strategy<Value = Vec<SweepParameter>> {
    prop::collection::btree_map(
        "[a-z]{1,8}",
        prop::collection::btree_set("[a-z0-9]{1,4}", 1..4),
        1..4,
    )
    .prop_map(|axes| {
        axes.into_iter()
            .map(|(name, values)| SweepParameter {
                name,
                values: values.into_iter().collect(),
            })
            .collect()
    })
}

fn running_status() -> impl Strategy<Value = WorkStatus> {
    prop::sample::select(vec![
        WorkStatus::Submitted,
        WorkStatus::ExperiencesRunning,
        WorkStatus::BatchMetricsQueued,
        WorkStatus::BatchMetricsRunning,
        WorkStatus::Unknown,
    ])
}

fn final_status() -> impl Strategy<Value = WorkStatus> {
    prop::sample::select(WorkStatus::TERMINAL.to_vec())
}

fn any_status() -> impl Strategy<Value = WorkStatus> {
    prop_oneof![running_status(), final_status()]
}

const FINAL_JOB_STATUSES: [JobStatus; 6] = [
    JobStatus::Passed,
    JobStatus::Failed,
    JobStatus::Error,
    JobStatus::Warning,
    JobStatus::Blocker,
    JobStatus::Cancelled,
];

fn job_outcomes() -> impl Strategy<Value = Vec<JobStatus>> {
    prop::collection::vec(prop::sample::select(FINAL_JOB_STATUSES.to_vec()), 1..4)
}

/// Drive `future` on a single-threaded runtime whose clock only moves when
/// every task is idle, so polling intervals cost nothing.
fn block_on_paused<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .expect("build runtime")
        .block_on(future)
}

async fn submit_all(platform: &InMemoryPlatform, fixture: &Fixture) -> BatchItem {
    let batch = submission::submit_batch(
        platform,
        fixture.project,
        BatchRequest {
            build: fixture.build.to_string(),
            experiences: ExperienceSelection {
                keys: vec!["E1".into(), "E2".into(), "E3".into()],
                ..Default::default()
            },
            ..Default::default()
        },
    )
    .await
    .expect("submit batch");
    BatchItem {
        project: fixture.project,
        id: batch.id,
    }
}

/// Scripted statuses, and what the observer saw reading them.
fn observe_script(script: Vec<WorkStatus>, await_restart: bool) -> (WorkStatus, Vec<WorkStatus>, u32) {
    block_on_paused(async move {
        let (platform, fixture) = seeded().await;
        let item = submit_all(&platform, &fixture).await;
        platform.script_batch(item.id, script).await;
        let observation = Observer::new(&platform, fast_polling())
            .observe(
                &item,
                &ObserveOptions {
                    await_restart,
                    ..Default::default()
                },
            )
            .await
            .expect("observe batch");
        (observation.status, observation.history, observation.polls)
    })
}

proptest! {
    /// Every grid point assigns one value to every axis, and the number of
    /// points matches the product of the axis sizes.
    #[test]
    fn prop_grid_points_cover_every_axis(parameters in axes()) {
        let grid = GridSearch::new(parameters.clone()).unwrap();
        let points = grid.combinations();

        let expected: usize = parameters.iter().map(|p| p.values.len()).product();
        prop_assert_eq!(grid.combination_count(), expected);
        prop_assert_eq!(points.len(), expected);

        for point in &points {
            prop_assert_eq!(point.len(), parameters.len());
            for parameter in &parameters {
                let value = point.get(&parameter.name).unwrap();
                prop_assert!(parameter.values.iter().any(|v| v == value));
            }
        }
    }

    /// Distinct axis values yield distinct grid points.
    #[test]
    fn prop_grid_points_are_distinct(parameters in axes()) {
        let parameters: Vec<SweepParameter> = parameters
            .into_iter()
            .map(|p| {
                let values: BTreeSet<String> = p.values.into_iter().collect();
                SweepParameter { name: p.name, values: values.into_iter().collect() }
            })
            .collect();
        let points = GridSearch::new(parameters).unwrap().combinations();
        let unique: BTreeSet<Vec<(String, String)>> = points
            .iter()
            .map(|p| p.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
            .collect();
        prop_assert_eq!(unique.len(), points.len());
    }

    /// Only the first separator splits name from value.
    #[test]
    fn prop_parameter_value_keeps_separators(
        name in "[a-z]{1,10}",
        value in "[a-z0-9:/.]{0,20}",
    ) {
        let raw = format!("{name}:{value}");
        let map = ParameterMap::parse([raw.as_str()], ParameterSeparator::Colon).unwrap();
        prop_assert_eq!(map.get(&name), Some(value.as_str()));
    }

    #[test]
    fn prop_allowable_failure_percent_range(value in -1000i64..1000) {
        let result = allowable_failure_percent(value);
        if (0..=100).contains(&value) {
            prop_assert_eq!(result.unwrap(), u8::try_from(value).unwrap());
        } else {
            prop_assert!(result.is_err());
        }
    }

    /// An exclusive group fails exactly when more than one flag is set.
    #[test]
    fn prop_exclusive_group(flags in prop::collection::vec(any::<bool>(), 1..6)) {
        let names: Vec<String> = (0..flags.len()).map(|i| format!("flag-{i}")).collect();
        let group: Vec<(&str, bool)> = names
            .iter()
            .map(String::as_str)
            .zip(flags.iter().copied())
            .collect();
        let set = flags.iter().filter(|f| **f).count();
        prop_assert_eq!(exclusive(&group).is_err(), set > 1);
    }

    /// Splitting never yields blank entries.
    #[test]
    fn prop_split_list_drops_blanks(values in prop::collection::vec("[a-z ,]{0,12}", 0..5)) {
        for item in split_list(&values) {
            prop_assert!(!item.trim().is_empty());
        }
    }

    /// The observer stops at the first terminal status and never records a
    /// read past it, whatever the platform reports afterwards.
    #[test]
    fn prop_observer_stops_at_first_terminal(
        running in prop::collection::vec(running_status(), 0..6),
        terminal in final_status(),
        after in prop::collection::vec(any_status(), 0..4),
    ) {
        let mut script = running.clone();
        script.push(terminal);
        script.extend(after);

        let (status, history, polls) = observe_script(script, false);

        let mut expected = running;
        expected.push(terminal);
        prop_assert_eq!(status, terminal);
        prop_assert_eq!(history.last(), Some(&terminal));
        prop_assert_eq!(history.iter().filter(|s| s.is_terminal()).count(), 1);
        prop_assert_eq!(polls as usize, expected.len());
        prop_assert_eq!(history, expected);
    }

    /// After a restart, terminal reads left over from the previous attempt
    /// are skipped, and the attempt still ends on exactly one terminal.
    #[test]
    fn prop_observer_skips_stale_terminal_after_restart(
        stale in prop::collection::vec(final_status(), 0..=3),
        running in prop::collection::vec(running_status(), 1..4),
        terminal in final_status(),
    ) {
        let mut script = stale;
        script.extend(running.iter().copied());
        script.push(terminal);

        let (status, history, _) = observe_script(script, true);

        let mut expected = running;
        expected.push(terminal);
        prop_assert_eq!(status, terminal);
        prop_assert_eq!(history, expected);
    }

    /// Supervision never spends more reruns than allowed, and each rerun
    /// covers exactly the jobs whose current status asked for one.
    #[test]
    fn prop_supervisor_reruns_stay_within_policy(
        outcomes in prop::collection::vec(job_outcomes(), 3),
        rerun_on in prop::collection::btree_set(prop::sample::select(FINAL_JOB_STATUSES.to_vec()), 1..4),
        max_rerun_attempts in 0u32..4,
        max_failed_jobs in prop::option::of(1usize..4),
    ) {
        let policy = SupervisePolicy {
            max_rerun_attempts,
            rerun_on: rerun_on.clone(),
            budget: max_failed_jobs.map_or(FailureBudget::default(), FailureBudget::MaxFailedJobs),
            wait_timeout: None,
        };

        let (report, scripts) = block_on_paused(async {
            let (platform, fixture) = seeded().await;
            let item = submit_all(&platform, &fixture).await;
            for (experience, outcome) in fixture.experiences.iter().zip(&outcomes) {
                platform.script_job(item.id, *experience, outcome.clone()).await;
            }
            let jobs = platform.list_jobs(item.project, item.id).await.expect("list jobs");
            let scripts: HashMap<Uuid, Vec<JobStatus>> = jobs
                .iter()
                .map(|job| {
                    let index = fixture
                        .experiences
                        .iter()
                        .position(|e| *e == job.experience_id)
                        .expect("job for a seeded experience");
                    (job.id, outcomes[index].clone())
                })
                .collect();
            let observer = Observer::new(&platform, fast_polling());
            let report = supervise(&observer, item, &policy).await.expect("supervise batch");
            (report, scripts)
        });

        prop_assert!(report.attempts <= max_rerun_attempts);
        prop_assert_eq!(report.reruns.len(), report.attempts as usize);

        let mut generation: HashMap<Uuid, usize> = HashMap::new();
        let current = |generation: &HashMap<Uuid, usize>, job: &Uuid| {
            let script = &scripts[job];
            let index = generation.get(job).copied().unwrap_or(0).min(script.len() - 1);
            script[index]
        };
        for rerun in &report.reruns {
            let wanted: BTreeSet<Uuid> = scripts
                .keys()
                .filter(|job| rerun_on.contains(&current(&generation, *job)))
                .copied()
                .collect();
            let actual: BTreeSet<Uuid> = rerun.iter().copied().collect();
            prop_assert_eq!(actual, wanted);
            if let Some(max) = max_failed_jobs {
                prop_assert!(rerun.len() <= max);
            }
            for job in rerun {
                *generation.entry(*job).or_default() += 1;
            }
        }
    }
}
