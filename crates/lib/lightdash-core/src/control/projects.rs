use serde_json::Value;
use tracing::debug;

use crate::models::ProjectSummary;

use super::{ControlError, ControlResult, LightdashControl, decode_list};

impl LightdashControl {
    /// Resolves the project to operate on: the explicit argument, else the
    /// configured default, else the first project of the organization.
    ///
    /// # Errors
    /// Returns `ControlError::NotFound` if the organization has no projects, or
    /// a client error if listing them fails.
    pub async fn project_uuid(&self, explicit: Option<&str>) -> ControlResult<String> {
        if let Some(uuid) = explicit.map(str::trim).filter(|uuid| !uuid.is_empty()) {
            return Ok(uuid.to_string());
        }
        if let Some(uuid) = &self.default_project {
            return Ok(uuid.clone());
        }

        let projects = self.list_projects().await?;
        let first = projects
            .into_iter()
            .next()
            .ok_or_else(|| ControlError::NotFound("No projects found in organization".to_string()))?;
        debug!(project_uuid = %first.project_uuid, "using first organization project");
        Ok(first.project_uuid)
    }

    /// Lists every project in the organization.
    ///
    /// # Errors
    /// Returns `ControlError` if the request fails or the listing cannot be decoded.
    pub async fn list_projects(&self) -> ControlResult<Vec<ProjectSummary>> {
        let results = self.client.get(&["org", "projects"]).await?;
        decode_list(results)
    }

    /// Fetches full project details.
    ///
    /// # Errors
    /// Returns `ControlError` if the project cannot be resolved or fetched.
    pub async fn get_project(&self, project_uuid: Option<&str>) -> ControlResult<Value> {
        let project = self.project_uuid(project_uuid).await?;
        Ok(self.client.get(&["projects", project.as_str()]).await?)
    }
}
