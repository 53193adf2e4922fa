//! Remote store interface and the HTTP implementation.
//!
//! The remote backing store is a PostgREST-style REST API, scoped to
//! the authenticated user: one endpoint per table, `upsert` via POST
//! with merge-duplicates resolution, `select` and `delete` via query
//! filters. Link and item tables carry no `user_id` column; their rows
//! are scoped server-side by row-level security on the owning entity.

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::remote::rows::{
    ChecklistRow, ChecklistTagRow, MilestoneItemRow, MilestoneRow, MilestoneTagRow, TagRow,
};
use crate::sync::{SyncError, SyncResult};

/// Per-table operations the sync engine needs from a remote store.
///
/// One method per (table, operation) pair keeps the wire contract
/// explicit. All upserts are idempotent: re-pushing an unchanged row is
/// a no-op side effect.
pub trait RemoteStore: Send + Sync {
    // tags
    fn upsert_tags(
        &self,
        rows: Vec<TagRow>,
    ) -> impl std::future::Future<Output = SyncResult<()>> + Send;
    fn select_tags(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = SyncResult<Vec<TagRow>>> + Send;
    fn delete_tag(
        &self,
        user_id: &str,
        id: Uuid,
    ) -> impl std::future::Future<Output = SyncResult<()>> + Send;

    // simple_checklists
    fn upsert_checklists(
        &self,
        rows: Vec<ChecklistRow>,
    ) -> impl std::future::Future<Output = SyncResult<()>> + Send;
    fn select_checklists(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = SyncResult<Vec<ChecklistRow>>> + Send;
    fn delete_checklist(
        &self,
        user_id: &str,
        id: Uuid,
    ) -> impl std::future::Future<Output = SyncResult<()>> + Send;

    // checklist_tags
    fn upsert_checklist_links(
        &self,
        rows: Vec<ChecklistTagRow>,
    ) -> impl std::future::Future<Output = SyncResult<()>> + Send;
    fn select_checklist_links(
        &self,
    ) -> impl std::future::Future<Output = SyncResult<Vec<ChecklistTagRow>>> + Send;
    /// Delete every link row for one checklist (full-replace contract).
    fn delete_checklist_links(
        &self,
        checklist_id: Uuid,
    ) -> impl std::future::Future<Output = SyncResult<()>> + Send;

    // milestones
    fn upsert_milestones(
        &self,
        rows: Vec<MilestoneRow>,
    ) -> impl std::future::Future<Output = SyncResult<()>> + Send;
    fn select_milestones(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = SyncResult<Vec<MilestoneRow>>> + Send;
    /// Items and link rows cascade away server-side.
    fn delete_milestone(
        &self,
        user_id: &str,
        id: Uuid,
    ) -> impl std::future::Future<Output = SyncResult<()>> + Send;

    // milestone_items
    fn upsert_milestone_items(
        &self,
        rows: Vec<MilestoneItemRow>,
    ) -> impl std::future::Future<Output = SyncResult<()>> + Send;
    fn select_milestone_items(
        &self,
    ) -> impl std::future::Future<Output = SyncResult<Vec<MilestoneItemRow>>> + Send;
    fn delete_milestone_item(
        &self,
        id: Uuid,
    ) -> impl std::future::Future<Output = SyncResult<()>> + Send;

    // milestone_tags
    fn upsert_milestone_links(
        &self,
        rows: Vec<MilestoneTagRow>,
    ) -> impl std::future::Future<Output = SyncResult<()>> + Send;
    fn select_milestone_links(
        &self,
    ) -> impl std::future::Future<Output = SyncResult<Vec<MilestoneTagRow>>> + Send;
    /// Delete every link row for one milestone (full-replace contract).
    fn delete_milestone_links(
        &self,
        milestone_id: Uuid,
    ) -> impl std::future::Future<Output = SyncResult<()>> + Send;
}

/// HTTP remote store client.
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    token: String,
}

impl HttpRemote {
    /// Create a client for a remote endpoint.
    ///
    /// `base_url` is the API root without a trailing slash; `api_key`
    /// identifies the app, `token` the authenticated user.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            token: token.into(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.token)
    }

    /// Map a non-success response to the sync error taxonomy.
    async fn check_status(table: &str, response: reqwest::Response) -> SyncResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            Err(SyncError::Auth(format!("{table}: {status}: {body}")))
        } else {
            Err(SyncError::Network(format!("{table}: {status}: {body}")))
        }
    }

    async fn upsert_rows<T: Serialize + Sync>(&self, table: &str, rows: &[T]) -> SyncResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let response = self
            .request(reqwest::Method::POST, &self.table_url(table))
            .header("Prefer", "resolution=merge-duplicates")
            .json(rows)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("{table}: {e}")))?;
        Self::check_status(table, response).await?;
        Ok(())
    }

    async fn select_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> SyncResult<Vec<T>> {
        let mut request = self
            .request(reqwest::Method::GET, &self.table_url(table))
            .query(&[("select", "*")]);
        for (column, value) in filters {
            request = request.query(&[(*column, format!("eq.{value}"))]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("{table}: {e}")))?;
        let response = Self::check_status(table, response).await?;
        response.json().await.map_err(|e| SyncError::Decode {
            table: table.to_string(),
            message: e.to_string(),
        })
    }

    async fn delete_rows(&self, table: &str, filters: &[(&str, String)]) -> SyncResult<()> {
        let mut request = self.request(reqwest::Method::DELETE, &self.table_url(table));
        for (column, value) in filters {
            request = request.query(&[(*column, format!("eq.{value}"))]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("{table}: {e}")))?;
        Self::check_status(table, response).await?;
        Ok(())
    }
}

impl RemoteStore for HttpRemote {
    async fn upsert_tags(&self, rows: Vec<TagRow>) -> SyncResult<()> {
        self.upsert_rows("tags", &rows).await
    }

    async fn select_tags(&self, user_id: &str) -> SyncResult<Vec<TagRow>> {
        self.select_rows("tags", &[("user_id", user_id.to_string())])
            .await
    }

    async fn delete_tag(&self, user_id: &str, id: Uuid) -> SyncResult<()> {
        self.delete_rows(
            "tags",
            &[("id", id.to_string()), ("user_id", user_id.to_string())],
        )
        .await
    }

    async fn upsert_checklists(&self, rows: Vec<ChecklistRow>) -> SyncResult<()> {
        self.upsert_rows("simple_checklists", &rows).await
    }

    async fn select_checklists(&self, user_id: &str) -> SyncResult<Vec<ChecklistRow>> {
        self.select_rows("simple_checklists", &[("user_id", user_id.to_string())])
            .await
    }

    async fn delete_checklist(&self, user_id: &str, id: Uuid) -> SyncResult<()> {
        self.delete_rows(
            "simple_checklists",
            &[("id", id.to_string()), ("user_id", user_id.to_string())],
        )
        .await
    }

    async fn upsert_checklist_links(&self, rows: Vec<ChecklistTagRow>) -> SyncResult<()> {
        self.upsert_rows("checklist_tags", &rows).await
    }

    async fn select_checklist_links(&self) -> SyncResult<Vec<ChecklistTagRow>> {
        self.select_rows("checklist_tags", &[]).await
    }

    async fn delete_checklist_links(&self, checklist_id: Uuid) -> SyncResult<()> {
        self.delete_rows("checklist_tags", &[("checklist_id", checklist_id.to_string())])
            .await
    }

    async fn upsert_milestones(&self, rows: Vec<MilestoneRow>) -> SyncResult<()> {
        self.upsert_rows("milestones", &rows).await
    }

    async fn select_milestones(&self, user_id: &str) -> SyncResult<Vec<MilestoneRow>> {
        self.select_rows("milestones", &[("user_id", user_id.to_string())])
            .await
    }

    async fn delete_milestone(&self, user_id: &str, id: Uuid) -> SyncResult<()> {
        self.delete_rows(
            "milestones",
            &[("id", id.to_string()), ("user_id", user_id.to_string())],
        )
        .await
    }

    async fn upsert_milestone_items(&self, rows: Vec<MilestoneItemRow>) -> SyncResult<()> {
        self.upsert_rows("milestone_items", &rows).await
    }

    async fn select_milestone_items(&self) -> SyncResult<Vec<MilestoneItemRow>> {
        self.select_rows("milestone_items", &[]).await
    }

    async fn delete_milestone_item(&self, id: Uuid) -> SyncResult<()> {
        self.delete_rows("milestone_items", &[("id", id.to_string())])
            .await
    }

    async fn upsert_milestone_links(&self, rows: Vec<MilestoneTagRow>) -> SyncResult<()> {
        self.upsert_rows("milestone_tags", &rows).await
    }

    async fn select_milestone_links(&self) -> SyncResult<Vec<MilestoneTagRow>> {
        self.select_rows("milestone_tags", &[]).await
    }

    async fn delete_milestone_links(&self, milestone_id: Uuid) -> SyncResult<()> {
        self.delete_rows("milestone_tags", &[("milestone_id", milestone_id.to_string())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let remote = HttpRemote::new("https://api.example.com/", "key", "token");
        assert_eq!(
            remote.table_url("tags"),
            "https://api.example.com/rest/v1/tags"
        );
    }
}
