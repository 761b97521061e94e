//! Qdrant-backed [`VectorStore`] implementation.

use std::collections::HashMap;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointStruct,
    ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder, value::Kind,
};

use crate::vector_store::{
    FieldValue, ScoredVectorPoint, VectorFilter, VectorPoint, VectorStore, VectorStoreError,
};

type QdrantResult<T> = Result<T, Box<qdrant_client::QdrantError>>;

/// Payload field every chunk record carries; used for replacement deletes.
pub const DOCUMENT_ID_FIELD: &str = "document_id";

/// Thin wrapper over [`Qdrant`] encapsulating the collection operations the
/// pipeline needs.
#[derive(Clone)]
pub struct QdrantStore {
    client: Qdrant,
}

impl std::fmt::Debug for QdrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantStore").finish_non_exhaustive()
    }
}

impl QdrantStore {
    /// Create a new `QdrantStore` connected to the given URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the Qdrant client cannot be created.
    pub fn new(url: &str) -> QdrantResult<Self> {
        let client = Qdrant::from_url(url).build().map_err(Box::new)?;
        Ok(Self { client })
    }

    /// Ensure a collection exists with cosine distance vectors.
    ///
    /// Idempotent: no-op if the collection already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if Qdrant cannot be reached or collection creation fails.
    pub async fn ensure_collection(&self, collection: &str, vector_size: u64) -> QdrantResult<()> {
        if self
            .client
            .collection_exists(collection)
            .await
            .map_err(Box::new)?
        {
            return Ok(());
        }
        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection)
                    .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
            )
            .await
            .map_err(Box::new)?;
        tracing::info!(collection, vector_size, "created collection");
        Ok(())
    }

    /// Check whether a collection exists.
    ///
    /// # Errors
    ///
    /// Returns an error if Qdrant cannot be reached.
    pub async fn collection_exists(&self, collection: &str) -> QdrantResult<bool> {
        self.client
            .collection_exists(collection)
            .await
            .map_err(Box::new)
    }

    /// Upsert points into a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub async fn upsert(&self, collection: &str, points: Vec<PointStruct>) -> QdrantResult<()> {
        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points))
            .await
            .map_err(Box::new)?;
        Ok(())
    }

    /// Search for similar vectors, returning scored points with payloads.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails.
    pub async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
        filter: Option<Filter>,
    ) -> QdrantResult<Vec<ScoredPoint>> {
        let mut builder = SearchPointsBuilder::new(collection, vector, limit).with_payload(true);
        if let Some(f) = filter {
            builder = builder.filter(f);
        }
        let results = self.client.search_points(builder).await.map_err(Box::new)?;
        Ok(results.result)
    }

    /// Delete every point whose payload names the given document id.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    pub async fn delete_by_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> QdrantResult<()> {
        let filter = Filter::must(vec![Condition::matches(
            DOCUMENT_ID_FIELD,
            document_id.to_owned(),
        )]);
        self.client
            .delete_points(DeletePointsBuilder::new(collection).points(filter))
            .await
            .map_err(Box::new)?;
        Ok(())
    }
}

impl VectorStore for QdrantStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<(), VectorStoreError>> + Send + '_>,
    > {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.ensure_collection(&collection, vector_size)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))
        })
    }

    fn collection_exists(
        &self,
        collection: &str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<bool, VectorStoreError>> + Send + '_>,
    > {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.collection_exists(&collection)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<(), VectorStoreError>> + Send + '_>,
    > {
        let collection = collection.to_owned();
        Box::pin(async move {
            let qdrant_points: Vec<PointStruct> = points
                .into_iter()
                .map(|p| {
                    let payload: HashMap<String, qdrant_client::qdrant::Value> =
                        serde_json::from_value(serde_json::Value::Object(
                            p.payload.into_iter().collect(),
                        ))
                        .unwrap_or_default();
                    PointStruct::new(p.id, p.vector, payload)
                })
                .collect();
            self.upsert(&collection, qdrant_points)
                .await
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
        filter: Option<VectorFilter>,
    ) -> std::pin::Pin<
        Box<
            dyn std::future::Future<Output = Result<Vec<ScoredVectorPoint>, VectorStoreError>>
                + Send
                + '_,
        >,
    > {
        let collection = collection.to_owned();
        Box::pin(async move {
            let qdrant_filter = filter.map(vector_filter_to_qdrant);
            let results = self
                .search(&collection, vector, limit, qdrant_filter)
                .await
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            Ok(results.into_iter().map(scored_point_to_vector).collect())
        })
    }

    fn delete_by_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<(), VectorStoreError>> + Send + '_>,
    > {
        let collection = collection.to_owned();
        let document_id = document_id.to_owned();
        Box::pin(async move {
            self.delete_by_document(&collection, &document_id)
                .await
                .map_err(|e| VectorStoreError::Delete(e.to_string()))
        })
    }
}

fn vector_filter_to_qdrant(filter: VectorFilter) -> Filter {
    let must: Vec<_> = filter
        .must
        .into_iter()
        .map(field_condition_to_qdrant)
        .collect();
    let must_not: Vec<_> = filter
        .must_not
        .into_iter()
        .map(field_condition_to_qdrant)
        .collect();

    let mut f = Filter::default();
    if !must.is_empty() {
        f.must = must;
    }
    if !must_not.is_empty() {
        f.must_not = must_not;
    }
    f
}

fn field_condition_to_qdrant(cond: crate::FieldCondition) -> Condition {
    match cond.value {
        FieldValue::Integer(v) => Condition::matches(cond.field, v),
        FieldValue::Text(v) => Condition::matches(cond.field, v),
    }
}

fn scored_point_to_vector(point: ScoredPoint) -> ScoredVectorPoint {
    let payload: HashMap<String, serde_json::Value> = point
        .payload
        .into_iter()
        .filter_map(|(k, v)| {
            let json_val = match v.kind? {
                Kind::StringValue(s) => serde_json::Value::String(s),
                Kind::IntegerValue(i) => serde_json::Value::Number(i.into()),
                Kind::DoubleValue(d) => {
                    serde_json::Number::from_f64(d).map(serde_json::Value::Number)?
                }
                Kind::BoolValue(b) => serde_json::Value::Bool(b),
                Kind::ListValue(list) => {
                    let items: Vec<serde_json::Value> = list
                        .values
                        .into_iter()
                        .filter_map(|item| match item.kind? {
                            Kind::StringValue(s) => Some(serde_json::Value::String(s)),
                            Kind::IntegerValue(i) => Some(serde_json::Value::Number(i.into())),
                            _ => None,
                        })
                        .collect();
                    serde_json::Value::Array(items)
                }
                _ => return None,
            };
            Some((k, json_val))
        })
        .collect();

    let id = match point.id.and_then(|pid| pid.point_id_options) {
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(u)) => u,
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    };

    ScoredVectorPoint {
        id,
        score: point.score,
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_valid_url() {
        let store = QdrantStore::new("http://localhost:6334");
        assert!(store.is_ok());
    }

    #[test]
    fn new_invalid_url() {
        let store = QdrantStore::new("not a valid url");
        assert!(store.is_err());
    }

    #[test]
    fn debug_format() {
        let store = QdrantStore::new("http://localhost:6334").unwrap();
        let dbg = format!("{store:?}");
        assert!(dbg.contains("QdrantStore"));
    }

    #[test]
    fn filter_conversion_keeps_conditions() {
        let filter = VectorFilter {
            must: vec![crate::FieldCondition {
                field: "document_id".into(),
                value: FieldValue::Text("abc".into()),
            }],
            must_not: vec![crate::FieldCondition {
                field: "chunk_index".into(),
                value: FieldValue::Integer(3),
            }],
        };
        let qf = vector_filter_to_qdrant(filter);
        assert_eq!(qf.must.len(), 1);
        assert_eq!(qf.must_not.len(), 1);
    }
}
