//! Push the local metrics configuration and its templates to the platform.
//!
//! Layout under the metrics directory:
//! `config.yml` plus `templates/*.liquid`.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult, ValidationError};
use crate::domain::models::requests::MetricsConfigUpdate;
use crate::domain::ports::{Platform, PlatformError};

/// Searched relative to the working directory.
pub const DEFAULT_METRICS_DIR: &str = ".resim/metrics";
pub const CONFIG_FILE: &str = "config.yml";
pub const TEMPLATE_DIR: &str = "templates";
pub const TEMPLATE_EXTENSION: &str = "liquid";

/// Metrics configuration and templates, ready to upload.
#[derive(Debug, Clone)]
pub struct MetricsBundle {
    pub config: String,
    /// `(file name, content)`, sorted by name.
    pub templates: Vec<(String, Vec<u8>)>,
}

/// Read and check the metrics directory.
pub async fn load_bundle(dir: &Path) -> DomainResult<MetricsBundle> {
    let config_path = dir.join(CONFIG_FILE);
    let config = match tokio::fs::read_to_string(&config_path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DomainError::Precondition(format!(
                "failed to find metrics config at {}",
                config_path.display()
            )));
        }
        Err(e) => return Err(DomainError::io(&config_path)(e)),
    };
    serde_yaml::from_str::<serde_yaml::Value>(&config)
        .map_err(|e| ValidationError::parse("metrics config", config_path.display().to_string(), e))?;

    let template_dir = dir.join(TEMPLATE_DIR);
    let mut templates = Vec::new();
    match tokio::fs::read_dir(&template_dir).await {
        Ok(mut entries) => {
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(DomainError::io(&template_dir))?
            {
                let path: PathBuf = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION) {
                    continue;
                }
                let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                    continue;
                };
                let content = tokio::fs::read(&path).await.map_err(DomainError::io(&path))?;
                templates.push((name, content));
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %template_dir.display(), "no templates directory");
        }
        Err(e) => return Err(DomainError::io(&template_dir)(e)),
    }
    templates.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(MetricsBundle { config, templates })
}

/// Sync `dir` to `project`. Returns the uploaded template names.
pub async fn sync(
    platform: &dyn Platform,
    project: Uuid,
    dir: &Path,
    branch: Option<String>,
) -> DomainResult<Vec<String>> {
    let bundle = load_bundle(dir).await?;
    let request = MetricsConfigUpdate {
        config: bundle.config,
        template_names: bundle.templates.iter().map(|(name, _)| name.clone()).collect(),
        branch,
    };
    let uploads = platform
        .sync_metrics_config(project, &request)
        .await
        .map_err(|cause| sync_error("sync metrics config", cause))?;

    let mut uploaded = Vec::with_capacity(bundle.templates.len());
    for (name, content) in bundle.templates {
        let Some(upload) = uploads.iter().find(|u| u.name == name) else {
            return Err(DomainError::Precondition(format!(
                "platform returned no upload location for template {name}"
            )));
        };
        platform
            .upload_template(upload, content)
            .await
            .map_err(|cause| sync_error(&format!("upload template {name}"), cause))?;
        uploaded.push(name);
    }
    info!(templates = uploaded.len(), "synced metrics config");
    Ok(uploaded)
}

fn sync_error(action: &str, cause: PlatformError) -> DomainError {
    DomainError::Precondition(format!("failed to {action}: {cause}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPlatform;
    use crate::domain::models::requests::NewProject;
    use crate::domain::ports::ProjectsApi;

    #[tokio::test]
    async fn test_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_bundle(dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("failed to find metrics config"));
    }

    #[tokio::test]
    async fn test_sync_uploads_templates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "version: 1\ntopics: {}\n").unwrap();
        std::fs::create_dir(dir.path().join(TEMPLATE_DIR)).unwrap();
        std::fs::write(dir.path().join("templates/b.liquid"), "{{ b }}").unwrap();
        std::fs::write(dir.path().join("templates/a.liquid"), "{{ a }}").unwrap();
        std::fs::write(dir.path().join("templates/notes.txt"), "skip").unwrap();

        let platform = InMemoryPlatform::new();
        let project = platform
            .create_project(&NewProject {
                name: "P1".into(),
                description: "d".into(),
            })
            .await
            .unwrap();

        let uploaded = sync(&platform, project.id, dir.path(), Some("main".into()))
            .await
            .unwrap();
        assert_eq!(uploaded, vec!["a.liquid", "b.liquid"]);
        assert_eq!(platform.uploaded("a.liquid").await.unwrap(), b"{{ a }}");
        let sent = platform.last_metrics_config().await.unwrap();
        assert_eq!(sent.template_names, vec!["a.liquid", "b.liquid"]);
        assert_eq!(sent.branch.as_deref(), Some("main"));
    }

    #[tokio::test]
    async fn test_invalid_yaml_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "version: [unclosed").unwrap();
        let err = load_bundle(dir.path()).await.unwrap_err();
        assert!(err.to_string().starts_with("failed to parse metrics config"));
    }
}
