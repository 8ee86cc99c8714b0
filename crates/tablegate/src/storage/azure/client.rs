//! Azure Table storage client.
//!
//! Implements `TableStore` from `tablegate_core::store` over the table
//! service REST API.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, ETAG, IF_MATCH};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use uuid::Uuid;

use tablegate_core::connection::ConnectionDescriptor;
use tablegate_core::entity::{Entity, WILDCARD_ETAG};
use tablegate_core::store::{
    ContinuationToken, EntityQuery, QueryPage, Result, StoreError, TableBatch, TableCreation,
    TableStore, TABLE_ALREADY_EXISTS_CODE,
};

use super::auth::{request_date, SharedKeyLite};
use super::batch::{decode_batch_response, encode_batch, parse_batch_response, Boundaries};
use super::conversions::{entity_from_json, entity_resource, entity_to_json, select_clause};
use super::error::{map_response_error, map_transport_error, parse_error_body, Target};

const API_VERSION: &str = "2019-02-02";
const DATA_SERVICE_VERSION: &str = "3.0;NetFx";
const NO_METADATA: &str = "application/json;odata=nometadata";
// Keeps `@odata.type` annotations on query rows.
const MINIMAL_METADATA: &str = "application/json;odata=minimalmetadata";
const NEXT_PARTITION_KEY_HEADER: &str = "x-ms-continuation-NextPartitionKey";
const NEXT_ROW_KEY_HEADER: &str = "x-ms-continuation-NextRowKey";

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    value: Vec<serde_json::Value>,
}

/// Table service account handle.
///
/// Holds a shared HTTP client and the account's signing key; safe for
/// concurrent use.
#[derive(Debug, Clone)]
pub struct AzureTableStore {
    client: Client,
    endpoint: String,
    account_name: String,
    signer: SharedKeyLite,
}

impl AzureTableStore {
    /// Creates a store for the account described by `descriptor`.
    pub fn new(client: Client, descriptor: &ConnectionDescriptor) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: descriptor.endpoint.trim_end_matches('/').to_string(),
            account_name: descriptor.account_name.clone(),
            signer: SharedKeyLite::new(&descriptor.account_name, &descriptor.account_key)?,
        })
    }

    fn url(&self, resource: &str) -> Result<Url> {
        Url::parse(&format!("{}/{resource}", self.endpoint))
            .map_err(|e| StoreError::ConnectionFailed(format!("invalid endpoint: {e}")))
    }

    /// Builds a signed request with the common service headers.
    fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        self.request_accepting(method, url, NO_METADATA)
    }

    fn request_accepting(
        &self,
        method: Method,
        url: Url,
        accept: &'static str,
    ) -> Result<RequestBuilder> {
        let date = request_date(Utc::now());
        let authorization = self.signer.authorization(&date, url.path())?;

        let mut headers = HeaderMap::new();
        headers.insert("x-ms-version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            "DataServiceVersion",
            HeaderValue::from_static(DATA_SERVICE_VERSION),
        );
        headers.insert(
            "MaxDataServiceVersion",
            HeaderValue::from_static(DATA_SERVICE_VERSION),
        );
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        headers.insert("x-ms-date", header_value(&date)?);
        headers.insert("Authorization", header_value(&authorization)?);

        Ok(self.client.request(method, url).headers(headers))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        request.send().await.map_err(map_transport_error)
    }

    fn query_request(&self, table: &str, query: &EntityQuery) -> Result<RequestBuilder> {
        let mut url = self.url(&format!("{table}()"))?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(filter) = &query.filter {
                pairs.append_pair("$filter", filter);
            }
            if let Some(top) = query.top {
                pairs.append_pair("$top", &top.to_string());
            }
            if let Some(select) = &query.select {
                pairs.append_pair("$select", &select_clause(select));
            }
            if let Some(continuation) = &query.continuation {
                pairs.append_pair("NextPartitionKey", &continuation.next_partition_key);
                pairs.append_pair("NextRowKey", &continuation.next_row_key);
            }
        }
        // An empty query string would still leave a trailing '?'.
        if url.query() == Some("") {
            url.set_query(None);
        }

        self.request_accepting(Method::GET, url, MINIMAL_METADATA)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| StoreError::Serialization(format!("invalid header value: {e}")))
}

fn merge_method() -> Result<Method> {
    Method::from_bytes(b"MERGE").map_err(|e| StoreError::Serialization(e.to_string()))
}

fn etag_of(response: &Response) -> Option<String> {
    response
        .headers()
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn header_str<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

async fn failure(response: Response, target: Target<'_>) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    map_response_error(status, &body, target)
}

#[async_trait]
impl TableStore for AzureTableStore {
    fn account_name(&self) -> &str {
        &self.account_name
    }

    async fn create_table(&self, table: &str) -> Result<TableCreation> {
        let request = self
            .request(Method::POST, self.url("Tables")?)?
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "return-no-content")
            .body(serde_json::json!({ "TableName": table }).to_string());

        let response = self.send(request).await?;
        if response.status().is_success() {
            tracing::info!(account = %self.account_name, table, "Table created");
            return Ok(TableCreation::Created);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT
            && parse_error_body(&body).is_some_and(|(code, _)| code == TABLE_ALREADY_EXISTS_CODE)
        {
            return Ok(TableCreation::AlreadyExists);
        }

        Err(map_response_error(status.as_u16(), &body, Target::Table(table)))
    }

    async fn upsert_merge(&self, table: &str, entity: &Entity) -> Result<Option<String>> {
        let resource = entity_resource(table, &entity.partition_key, &entity.row_key);
        // MERGE without If-Match is insert-or-merge.
        let request = self
            .request(merge_method()?, self.url(&resource)?)?
            .header(CONTENT_TYPE, "application/json")
            .body(entity_to_json(entity).to_string());

        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(failure(
                response,
                Target::Entity {
                    table,
                    partition_key: &entity.partition_key,
                    row_key: &entity.row_key,
                },
            )
            .await);
        }

        Ok(etag_of(&response))
    }

    async fn delete_entity(&self, table: &str, entity: &Entity) -> Result<()> {
        let resource = entity_resource(table, &entity.partition_key, &entity.row_key);
        let request = self
            .request(Method::DELETE, self.url(&resource)?)?
            .header(IF_MATCH, entity.etag.as_deref().unwrap_or(WILDCARD_ETAG));

        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(failure(
                response,
                Target::Entity {
                    table,
                    partition_key: &entity.partition_key,
                    row_key: &entity.row_key,
                },
            )
            .await);
        }

        Ok(())
    }

    async fn commit_batch(&self, batch: &TableBatch) -> Result<Vec<Option<String>>> {
        let boundaries = Boundaries::new(&Uuid::new_v4().to_string());
        let body = encode_batch(&self.endpoint, batch, &boundaries);

        let request = self
            .request(Method::POST, self.url("$batch")?)?
            .header(CONTENT_TYPE, boundaries.content_type())
            .body(body);

        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(failure(response, Target::Table(batch.table())).await);
        }

        let text = response.text().await.map_err(map_transport_error)?;
        let tokens = decode_batch_response(batch, &parse_batch_response(&text))?;
        tracing::debug!(
            account = %self.account_name,
            table = batch.table(),
            operations = batch.len(),
            "Batch committed"
        );
        Ok(tokens)
    }

    async fn query_entities(&self, table: &str, query: &EntityQuery) -> Result<QueryPage> {
        let response = self.send(self.query_request(table, query)?).await?;
        if !response.status().is_success() {
            return Err(failure(response, Target::Table(table)).await);
        }

        let continuation = ContinuationToken::from_parts(
            header_str(&response, NEXT_PARTITION_KEY_HEADER),
            header_str(&response, NEXT_ROW_KEY_HEADER),
        );

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let items = body
            .value
            .into_iter()
            .map(|value| entity_from_json(value, None))
            .collect::<Result<Vec<_>>>()?;

        Ok(QueryPage {
            items,
            continuation,
        })
    }
}
