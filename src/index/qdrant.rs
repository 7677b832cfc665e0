//! Chunk index backed by a Qdrant collection

use std::collections::{BTreeMap, HashMap};

use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CountResponse, CreateCollectionBuilder, DeleteCollectionBuilder, Distance,
    Filter, PointStruct, ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::{debug, info};

use super::models::{rank_hits, SearchHit, StoreStats};
use crate::corpus::ProductCategory;
use crate::error::{Error, Result};
use crate::rag::chunker::{ChunkMetadata, ComplaintChunk};

/// Vector store backed by Qdrant
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    embedding_model: String,
    dimension: usize,
    next_id: u64,
}

impl QdrantStore {
    /// Connect and make sure the collection exists.
    pub async fn connect(
        url: &str,
        collection: &str,
        embedding_model: &str,
        dimension: usize,
    ) -> Result<Self> {
        let client = Qdrant::from_url(url).build()?;
        let mut store = Self {
            client,
            collection: collection.to_string(),
            embedding_model: embedding_model.to_string(),
            dimension,
            next_id: 0,
        };

        store.init_collection().await?;
        store.next_id = store.points_count().await?;
        Ok(store)
    }

    /// Connect to a collection that must already exist.
    pub async fn connect_existing(
        url: &str,
        collection: &str,
        embedding_model: &str,
        dimension: usize,
    ) -> Result<Self> {
        let client = Qdrant::from_url(url).build()?;
        if !client.collection_exists(collection).await? {
            return Err(Error::InputNotFound(format!(
                "Qdrant collection '{}'",
                collection
            )));
        }

        let mut store = Self {
            client,
            collection: collection.to_string(),
            embedding_model: embedding_model.to_string(),
            dimension,
            next_id: 0,
        };
        store.next_id = store.points_count().await?;
        Ok(store)
    }

    async fn init_collection(&self) -> Result<()> {
        if self.client.collection_exists(&self.collection).await? {
            debug!("Collection '{}' already exists", self.collection);
            return Ok(());
        }

        info!("Creating collection '{}'", self.collection);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                ),
            )
            .await?;
        Ok(())
    }

    /// Drop the collection (used before a rebuild).
    pub async fn reset(&mut self) -> Result<()> {
        if self.client.collection_exists(&self.collection).await? {
            self.client
                .delete_collection(DeleteCollectionBuilder::new(&self.collection))
                .await?;
            info!("Deleted collection '{}'", self.collection);
        }
        self.init_collection().await?;
        self.next_id = 0;
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> u64 {
        self.next_id
    }

    pub fn is_empty(&self) -> bool {
        self.next_id == 0
    }

    /// Upsert a batch with sequential ids, waiting for it to be applied.
    pub async fn add_batch(&mut self, batch: Vec<(ComplaintChunk, Vec<f32>)>) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }
        for (_, vector) in &batch {
            if vector.len() != self.dimension {
                return Err(Error::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }

        let start = self.next_id;
        let points: Vec<PointStruct> = batch
            .into_iter()
            .enumerate()
            .map(|(offset, (chunk, vector))| {
                PointStruct::new(start + offset as u64, vector, chunk_payload(&chunk))
            })
            .collect();

        let count = points.len();
        debug!("Upserting {} points to Qdrant", count);
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await?;

        self.next_id += count as u64;
        Ok(count)
    }

    /// The `k` most similar chunks, ordered by score then insertion id.
    pub async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        if k == 0 {
            return Ok(Vec::new());
        }

        // Qdrant picks arbitrarily among points tied at the cut-off, so fetch
        // past it until the k-th score is strictly above the last one seen.
        let mut limit = k * 2;
        loop {
            let response = self
                .client
                .search_points(
                    SearchPointsBuilder::new(&self.collection, vector.to_vec(), limit as u64)
                        .with_payload(true),
                )
                .await?;
            let returned = response.result.len();

            let mut hits: Vec<SearchHit> =
                response.result.into_iter().filter_map(to_hit).collect();
            rank_hits(&mut hits);

            if returned < limit || cutoff_is_settled(&hits, k) {
                hits.truncate(k);
                return Ok(hits);
            }
            debug!("Score tie at rank {}, widening search to {}", k, limit * 2);
            limit *= 2;
        }
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let mut per_category = BTreeMap::new();
        for category in ProductCategory::ALL {
            let response = self
                .client
                .count(
                    CountPointsBuilder::new(&self.collection)
                        .filter(Filter::must([Condition::matches(
                            "product_category",
                            category.as_str().to_string(),
                        )]))
                        .exact(true),
                )
                .await?;
            let count = response.result.map(|r| r.count).unwrap_or(0);
            if count > 0 {
                per_category.insert(category, count);
            }
        }

        Ok(StoreStats {
            collection: self.collection.clone(),
            points_count: self.points_count().await?,
            dimension: self.dimension,
            embedding_model: self.embedding_model.clone(),
            per_category,
        })
    }

    /// Exact point count. Ids are assigned densely from zero and points are
    /// never deleted individually, so this is also the next free id.
    async fn points_count(&self) -> Result<u64> {
        let response = self.client.count(exact_count(&self.collection)).await?;
        Ok(count_of(&response))
    }
}

fn exact_count(collection: &str) -> CountPointsBuilder {
    CountPointsBuilder::new(collection).exact(true)
}

fn count_of(response: &CountResponse) -> u64 {
    response.result.as_ref().map(|r| r.count).unwrap_or(0)
}

/// True when ranks beyond `k` cannot tie with the k-th hit.
fn cutoff_is_settled(ranked: &[SearchHit], k: usize) -> bool {
    match (ranked.get(k.saturating_sub(1)), ranked.last()) {
        (Some(kth), Some(last)) => ranked.len() <= k || kth.score > last.score,
        _ => true,
    }
}

fn chunk_payload(chunk: &ComplaintChunk) -> HashMap<String, QdrantValue> {
    let meta = &chunk.metadata;
    let mut payload: HashMap<String, QdrantValue> = HashMap::new();
    payload.insert("text".into(), chunk.text.clone().into());
    payload.insert("complaint_id".into(), meta.complaint_id.clone().into());
    payload.insert(
        "product_category".into(),
        meta.product_category.as_str().to_string().into(),
    );
    payload.insert("issue".into(), meta.issue.clone().into());
    payload.insert("company".into(), meta.company.clone().into());
    payload.insert("chunk_index".into(), (meta.chunk_index as i64).into());
    payload
}

fn to_hit(point: ScoredPoint) -> Option<SearchHit> {
    let id = match point.id?.point_id_options? {
        PointIdOptions::Num(id) => id,
        PointIdOptions::Uuid(_) => return None,
    };
    let payload = point.payload;

    let chunk = ComplaintChunk {
        text: payload.get("text")?.as_str()?.to_string(),
        metadata: ChunkMetadata {
            complaint_id: payload.get("complaint_id")?.as_str()?.to_string(),
            product_category: payload.get("product_category")?.as_str()?.parse().ok()?,
            issue: payload.get("issue")?.as_str()?.to_string(),
            company: payload.get("company")?.as_str()?.to_string(),
            chunk_index: payload.get("chunk_index")?.as_integer()? as usize,
        },
    };

    Some(SearchHit {
        id,
        chunk,
        score: point.score,
    })
}

trait QdrantValueExt {
    fn as_integer(&self) -> Option<i64>;
    fn as_str(&self) -> Option<&str>;
}

impl QdrantValueExt for QdrantValue {
    fn as_integer(&self) -> Option<i64> {
        match &self.kind {
            Some(Kind::IntegerValue(v)) => Some(*v),
            _ => None,
        }
    }

    fn as_str(&self) -> Option<&str> {
        match &self.kind {
            Some(Kind::StringValue(v)) => Some(v),
            _ => None,
        }
    }
}
