use serde_json::json;
use tracing::info;

use crate::models::SpaceSummary;
use crate::resolve::find_space;

use super::{ControlError, ControlResult, LightdashControl, decode_list, str_field};

impl LightdashControl {
    /// Lists spaces in the active project.
    ///
    /// # Errors
    /// Returns `ControlError` if the project cannot be resolved or the listing fails.
    pub async fn list_spaces(&self) -> ControlResult<Vec<SpaceSummary>> {
        let project = self.project_uuid(None).await?;
        let results = self
            .client
            .get(&["projects", project.as_str(), "spaces"])
            .await?;
        decode_list(results)
    }

    /// Creates a space and returns its UUID.
    ///
    /// # Errors
    /// Returns `ControlError` if the project cannot be resolved or the API rejects the space.
    pub async fn create_space(&self, name: &str, is_private: bool) -> ControlResult<String> {
        let project = self.project_uuid(None).await?;
        let created = self
            .client
            .post(
                &["projects", project.as_str(), "spaces"],
                &json!({ "name": name, "isPrivate": is_private }),
            )
            .await?;
        let uuid = str_field(&created, "uuid");
        info!(space_uuid = %uuid, "created space");
        Ok(uuid)
    }

    /// Deletes a space by UUID or exact name. Lightdash refuses to delete
    /// spaces that still hold content; that error is returned as-is.
    ///
    /// # Errors
    /// Returns `ControlError::NotFound` if no space matches, or a client error
    /// if the deletion is rejected.
    pub async fn delete_space(&self, space_identifier: &str) -> ControlResult<SpaceSummary> {
        let spaces = self.list_spaces().await?;
        let space = find_space(&spaces, space_identifier)
            .cloned()
            .ok_or_else(|| ControlError::NotFound(format!("Space '{space_identifier}' not found")))?;
        self.client
            .delete(&["spaces", space.uuid.as_str()])
            .await?;
        info!(space_uuid = %space.uuid, "deleted space");
        Ok(space)
    }
}
