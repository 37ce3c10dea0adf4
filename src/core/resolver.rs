use crate::adapters::urllist_api::UrlListClient;
use crate::domain::model::RemoteList;
use crate::domain::ports::HttpTransport;
use crate::utils::error::{Result, SyncError};

/// Finds the target list by exact name and reads its current size.
pub struct ListResolver<'c, 'a, T: HttpTransport + ?Sized> {
    client: &'c UrlListClient<'a, T>,
}

impl<'c, 'a, T: HttpTransport + ?Sized> ListResolver<'c, 'a, T> {
    pub fn new(client: &'c UrlListClient<'a, T>) -> Self {
        Self { client }
    }

    pub async fn resolve(&self, list_name: &str) -> Result<RemoteList> {
        let entries = self.client.list_all().await?;

        // 名稱唯一，若重複以第一筆為準
        let position = entries.iter().position(|entry| entry.name == list_name);
        let Some(position) = position else {
            let available: Vec<String> = entries.into_iter().map(|entry| entry.name).collect();
            tracing::warn!("URL list '{}' does not exist in the tenant", list_name);
            return Err(SyncError::ListNotFound {
                name: list_name.to_string(),
                available,
            });
        };
        let entry = &entries[position];

        let id = entry.id.ok_or_else(|| SyncError::UnexpectedResponse {
            operation: "list URL lists".to_string(),
            message: format!("list '{}' has no numeric id", list_name),
        })?;

        tracing::info!("🔎 Found URL list '{}' (id={})", list_name, id);

        let count = self.client.fetch_count(id).await?;
        tracing::info!("Current number of entries in the list: {}", count);

        Ok(RemoteList {
            id,
            name: entry.name.clone(),
            count,
        })
    }
}
