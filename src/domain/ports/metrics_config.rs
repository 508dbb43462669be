//! Metrics configuration synchronization.

use async_trait::async_trait;
use uuid::Uuid;

use super::errors::PlatformResult;
use crate::domain::models::requests::{MetricsConfigUpdate, TemplateUpload};

/// Metrics configuration and template uploads.
#[async_trait]
pub trait MetricsConfigApi: Send + Sync {
    /// Push the configuration and receive one upload destination per template.
    async fn sync_metrics_config(
        &self,
        project: Uuid,
        request: &MetricsConfigUpdate,
    ) -> PlatformResult<Vec<TemplateUpload>>;

    /// Upload one template file to its pre-signed destination.
    async fn upload_template(&self, upload: &TemplateUpload, content: Vec<u8>) -> PlatformResult<()>;
}
