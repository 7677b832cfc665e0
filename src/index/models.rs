//! Data models for the chunk index

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::corpus::ProductCategory;
use crate::rag::chunker::ComplaintChunk;

/// A chunk together with its embedding, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedPoint {
    /// Insertion sequence number; ties in similarity resolve by this
    pub id: u64,
    pub chunk: ComplaintChunk,
    pub vector: Vec<f32>,
}

/// A retrieved chunk and its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: u64,
    pub chunk: ComplaintChunk,
    pub score: f32,
}

/// Index statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub collection: String,
    pub points_count: u64,
    pub dimension: usize,
    pub embedding_model: String,
    pub per_category: BTreeMap<ProductCategory, u64>,
}

/// Header of a local store, written alongside the points file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreManifest {
    pub collection: String,
    pub embedding_model: String,
    pub dimension: usize,
    pub count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoreManifest {
    pub fn new(collection: &str, embedding_model: &str, dimension: usize) -> Self {
        let now = Utc::now();
        Self {
            collection: collection.to_string(),
            embedding_model: embedding_model.to_string(),
            dimension,
            count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Cosine similarity; zero-norm or mismatched vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Order hits by descending score, then ascending insertion id.
/// NaN scores rank last.
pub fn rank_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        rank_key(b.score)
            .total_cmp(&rank_key(a.score))
            .then(a.id.cmp(&b.id))
    });
}

fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::chunker::ChunkMetadata;

    fn hit(id: u64, score: f32) -> SearchHit {
        SearchHit {
            id,
            chunk: ComplaintChunk {
                text: format!("chunk {id}"),
                metadata: ChunkMetadata {
                    complaint_id: id.to_string(),
                    product_category: ProductCategory::CreditCard,
                    issue: "Unknown".into(),
                    company: "Unknown".into(),
                    chunk_index: 0,
                },
            },
            score,
        }
    }

    #[test]
    fn cosine_similarity_handles_edge_cases() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);

        let aligned = cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]);
        assert!((aligned - 1.0).abs() < 1e-6);

        let opposite = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((opposite + 1.0).abs() < 1e-6);
    }

    #[test]
    fn ranking_breaks_ties_by_insertion_order() {
        let mut hits = vec![hit(3, 0.5), hit(1, 0.9), hit(2, 0.5), hit(0, 0.5)];
        rank_hits(&mut hits);

        let ids: Vec<u64> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![1, 0, 2, 3]);
    }

    #[test]
    fn nan_scores_rank_last_with_a_total_order() {
        let mut hits = vec![
            hit(1, f32::NAN),
            hit(2, 0.5),
            hit(3, 0.9),
            hit(4, 0.5),
            hit(0, f32::NAN),
        ];
        rank_hits(&mut hits);

        let ids: Vec<u64> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![3, 2, 4, 0, 1]);
    }

    #[test]
    fn manifest_roundtrips_through_json() {
        let manifest = StoreManifest::new("complaints_rag", "local-hash", 64);
        let json = serde_json::to_string(&manifest).unwrap();
        let back: StoreManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, manifest);
        assert_eq!(back.count, 0);
    }
}
