//! Common test utilities for integration tests
//!
//! Seeds an in-memory platform with a small project and builds the `resim`
//! command with an isolated environment.

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use assert_cmd::Command;
use tempfile::TempDir;
use uuid::Uuid;

use resim::adapters::memory::InMemoryPlatform;
use resim::domain::models::{Architecture, ResourceRequirements};
use resim::services::catalog::{self, BuildSpec, ExperienceSpec, SystemSpec};
use resim::services::observer::ObserverConfig;

/// IDs of everything [`seeded`] creates.
pub struct Fixture {
    pub project: Uuid,
    pub system: Uuid,
    pub branch: Uuid,
    pub build: Uuid,
    pub metrics_build: Uuid,
    /// `E1`, `E2` and `E3`, in that order.
    pub experiences: Vec<Uuid>,
}

/// A platform holding project `P1` with system `S1`, branch `main`, build
/// `1.0.0`, metrics build `M1` and three experiences.
pub async fn seeded() -> (InMemoryPlatform, Fixture) {
    let platform = InMemoryPlatform::new();
    let project = catalog::create_project(&platform, "P1", "test project")
        .await
        .expect("create project")
        .id;
    let system = catalog::create_system(
        &platform,
        project,
        SystemSpec {
            name: "S1".into(),
            description: "test system".into(),
            build_resources: ResourceRequirements::default(),
            metrics_build_resources: ResourceRequirements::default(),
            architecture: Architecture::Amd64,
        },
    )
    .await
    .expect("create system")
    .id;
    let build = catalog::create_build(
        &platform,
        project,
        BuildSpec {
            system: "S1".into(),
            branch: "main".into(),
            description: "test build".into(),
            version: "1.0.0".into(),
            image: Some("public.ecr.aws/resim/app:1.0.0".into()),
            auto_create_branch: true,
            ..Default::default()
        },
    )
    .await
    .expect("create build");
    let metrics_build = catalog::create_metrics_build(
        &platform,
        project,
        "M1",
        "public.ecr.aws/resim/metrics:1",
        "1",
        &["S1".to_string()],
    )
    .await
    .expect("create metrics build")
    .id;

    let mut experiences = Vec::new();
    for name in ["E1", "E2", "E3"] {
        let experience = catalog::create_experience(
            &platform,
            project,
            ExperienceSpec {
                name: name.into(),
                description: format!("experience {name}"),
                locations: vec![format!("s3://bucket/{name}/")],
                systems: vec!["S1".into()],
                ..Default::default()
            },
        )
        .await
        .expect("create experience");
        experiences.push(experience.id);
    }

    let fixture = Fixture {
        project,
        system,
        branch: build.branch_id,
        build: build.id,
        metrics_build,
        experiences,
    };
    (platform, fixture)
}

/// Observer settings for tests run with a paused clock.
pub const fn fast_polling() -> ObserverConfig {
    ObserverConfig {
        interval: Duration::from_secs(5),
        restart_grace_polls: 3,
        max_consecutive_errors: 2,
    }
}

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// The `resim` binary, run in `dir` with no user config and no ambient
/// `RESIM_*` variables. The API points at an address nothing listens on.
pub fn resim_cmd(dir: &Path) -> Command {
    let mut cmd = assert_cmd::cargo_bin_cmd!("resim");
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env("RESIM_URL", "http://127.0.0.1:9/v1/")
        .env("RESIM_AUTH_URL", "http://127.0.0.1:9/")
        .env("RESIM_CLIENT_ID", "test-client")
        .env("RESIM_CLIENT_SECRET", "test-secret")
        .env_remove("RESIM_PROJECT")
        .env_remove("RESIM_USERNAME")
        .env_remove("RESIM_PASSWORD");
    cmd
}

/// Setup test logging
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
