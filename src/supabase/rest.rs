//! PostgREST row access.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{SupabaseClient, check, store_failure, transport_failure};
use crate::error::StoreError;
use crate::store::{Filter, Order, RecordId, RowStore};

impl SupabaseClient {
    /// Build an authorized request against a table.
    async fn table_request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        let bearer = self.bearer().await;
        self.with_api_key(self.http.request(method, self.rest_url(table)))
            .bearer_auth(bearer)
    }

    async fn send(&self, table: &str, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let resp = request
            .send()
            .await
            .map_err(|e| transport_failure(table, e))?;
        check(resp).await.map_err(|failure| store_failure(table, failure))
    }
}

fn id_param(id: RecordId) -> [(&'static str, String); 1] {
    [("id", format!("eq.{id}"))]
}

#[async_trait]
impl RowStore for SupabaseClient {
    async fn select(&self, table: &str, filter: &Filter, order: &Order) -> Result<Vec<Value>, StoreError> {
        let direction = if order.ascending { "asc" } else { "desc" };
        let query = [
            ("select", "*".to_string()),
            (filter.column.as_str(), format!("eq.{}", filter.value)),
            ("order", format!("{}.{direction}", order.column)),
        ];
        let request = self
            .table_request(reqwest::Method::GET, table)
            .await
            .query(&query);

        let resp = self.send(table, request).await?;
        let rows: Vec<Value> = resp.json().await.map_err(|e| StoreError::Decode {
            table: table.to_string(),
            reason: e.to_string(),
        })?;
        debug!(table, count = rows.len(), "Rows fetched");
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<(), StoreError> {
        let request = self
            .table_request(reqwest::Method::POST, table)
            .await
            .header("Prefer", "return=minimal")
            .json(&[row]);
        self.send(table, request).await?;
        debug!(table, "Row inserted");
        Ok(())
    }

    async fn update(&self, table: &str, id: RecordId, patch: Value) -> Result<(), StoreError> {
        let request = self
            .table_request(reqwest::Method::PATCH, table)
            .await
            .query(&id_param(id))
            .json(&patch);
        self.send(table, request).await?;
        debug!(table, id, "Row updated");
        Ok(())
    }

    async fn delete(&self, table: &str, id: RecordId) -> Result<(), StoreError> {
        let request = self
            .table_request(reqwest::Method::DELETE, table)
            .await
            .query(&id_param(id));
        self.send(table, request).await?;
        debug!(table, id, "Row deleted");
        Ok(())
    }
}
