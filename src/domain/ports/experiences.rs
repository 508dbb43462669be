//! Experiences and experience tags.

use async_trait::async_trait;
use uuid::Uuid;

use super::errors::PlatformResult;
use crate::domain::models::requests::{
    ExperienceFilter, ExperienceUpdate, NewExperience, NewExperienceTag,
};
use crate::domain::models::{Experience, ExperienceTag};

/// Experiences, tags and tag membership.
#[async_trait]
pub trait ExperiencesApi: Send + Sync {
    async fn list_experiences(
        &self,
        project: Uuid,
        filter: &ExperienceFilter,
    ) -> PlatformResult<Vec<Experience>>;

    async fn get_experience(&self, project: Uuid, id: Uuid) -> PlatformResult<Experience>;

    async fn create_experience(
        &self,
        project: Uuid,
        request: &NewExperience,
    ) -> PlatformResult<Experience>;

    async fn update_experience(
        &self,
        project: Uuid,
        id: Uuid,
        request: &ExperienceUpdate,
    ) -> PlatformResult<Experience>;

    async fn archive_experience(&self, project: Uuid, id: Uuid) -> PlatformResult<()>;

    async fn restore_experience(&self, project: Uuid, id: Uuid) -> PlatformResult<()>;

    async fn add_system_to_experience(
        &self,
        project: Uuid,
        experience: Uuid,
        system: Uuid,
    ) -> PlatformResult<()>;

    async fn remove_system_from_experience(
        &self,
        project: Uuid,
        experience: Uuid,
        system: Uuid,
    ) -> PlatformResult<()>;

    async fn list_experience_tags(
        &self,
        project: Uuid,
        name: Option<&str>,
    ) -> PlatformResult<Vec<ExperienceTag>>;

    async fn get_experience_tag(&self, project: Uuid, id: Uuid) -> PlatformResult<ExperienceTag>;

    async fn create_experience_tag(
        &self,
        project: Uuid,
        request: &NewExperienceTag,
    ) -> PlatformResult<ExperienceTag>;

    async fn tag_experience(&self, project: Uuid, tag: Uuid, experience: Uuid)
        -> PlatformResult<()>;

    async fn untag_experience(
        &self,
        project: Uuid,
        tag: Uuid,
        experience: Uuid,
    ) -> PlatformResult<()>;

    async fn list_tagged_experiences(
        &self,
        project: Uuid,
        tag: Uuid,
    ) -> PlatformResult<Vec<Experience>>;
}
