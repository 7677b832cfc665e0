//! On-disk chunk index: a JSON manifest plus a JSON-lines points file.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::models::{cosine_similarity, rank_hits, IndexedPoint, SearchHit, StoreManifest, StoreStats};
use crate::error::{Error, Result};
use crate::rag::chunker::ComplaintChunk;

const MANIFEST_FILE: &str = "manifest.json";
const POINTS_FILE: &str = "points.jsonl";

/// Brute-force cosine index kept in memory and persisted under `dir`.
#[derive(Debug)]
pub struct LocalVectorStore {
    dir: PathBuf,
    manifest: StoreManifest,
    points: Vec<IndexedPoint>,
}

impl LocalVectorStore {
    /// Open the store in `dir`, creating it when absent. An existing store
    /// must have been built with the same model and dimension.
    pub fn open(dir: &Path, collection: &str, embedding_model: &str, dimension: usize) -> Result<Self> {
        if dir.join(MANIFEST_FILE).exists() {
            let store = Self::open_existing(dir)?;
            if store.manifest.dimension != dimension {
                return Err(Error::DimensionMismatch {
                    expected: store.manifest.dimension,
                    actual: dimension,
                });
            }
            if store.manifest.embedding_model != embedding_model {
                return Err(Error::VectorStoreError(format!(
                    "store at {} was built with '{}', not '{}'",
                    dir.display(),
                    store.manifest.embedding_model,
                    embedding_model
                )));
            }
            if !store.points.is_empty() {
                warn!(
                    "Appending to existing store with {} points",
                    store.points.len()
                );
            }
            return Ok(store);
        }

        fs::create_dir_all(dir)?;
        let store = Self {
            dir: dir.to_path_buf(),
            manifest: StoreManifest::new(collection, embedding_model, dimension),
            points: Vec::new(),
        };
        store.write_manifest()?;
        info!("Created local store '{}' at {}", collection, dir.display());
        Ok(store)
    }

    /// Open a store that must already exist.
    pub fn open_existing(dir: &Path) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(Error::InputNotFound(manifest_path.display().to_string()));
        }

        let manifest: StoreManifest = serde_json::from_str(&fs::read_to_string(&manifest_path)?)?;
        let points = load_points(&dir.join(POINTS_FILE), manifest.dimension)?;

        if points.len() as u64 != manifest.count {
            warn!(
                "Manifest lists {} points but {} were loaded",
                manifest.count,
                points.len()
            );
        }
        debug!("Loaded {} points from {}", points.len(), dir.display());

        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
            points,
        })
    }

    /// Delete a store directory's index files.
    pub fn reset(dir: &Path) -> Result<()> {
        for name in [MANIFEST_FILE, POINTS_FILE] {
            let path = dir.join(name);
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        info!("Reset local store at {}", dir.display());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.manifest.dimension
    }

    pub fn manifest(&self) -> &StoreManifest {
        &self.manifest
    }

    /// Append a batch. Every vector is checked before anything is written.
    pub fn add_batch(&mut self, batch: Vec<(ComplaintChunk, Vec<f32>)>) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }
        for (_, vector) in &batch {
            if vector.len() != self.manifest.dimension {
                return Err(Error::DimensionMismatch {
                    expected: self.manifest.dimension,
                    actual: vector.len(),
                });
            }
        }

        let start = self.points.len() as u64;
        let mut added = Vec::with_capacity(batch.len());
        let mut lines = String::new();
        for (offset, (chunk, vector)) in batch.into_iter().enumerate() {
            let point = IndexedPoint {
                id: start + offset as u64,
                chunk,
                vector,
            };
            lines.push_str(&serde_json::to_string(&point)?);
            lines.push('\n');
            added.push(point);
        }

        self.append_points(lines.as_bytes())?;

        let count = added.len();
        self.points.extend(added);
        self.manifest.count = self.points.len() as u64;
        self.manifest.updated_at = Utc::now();
        self.write_manifest()?;

        debug!("Stored {} points ({} total)", count, self.points.len());
        Ok(count)
    }

    /// The `k` most similar chunks to `vector`.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if vector.len() != self.manifest.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.manifest.dimension,
                actual: vector.len(),
            });
        }

        let mut hits: Vec<SearchHit> = self
            .points
            .iter()
            .map(|point| SearchHit {
                id: point.id,
                chunk: point.chunk.clone(),
                score: cosine_similarity(vector, &point.vector),
            })
            .collect();

        rank_hits(&mut hits);
        hits.truncate(k);
        Ok(hits)
    }

    pub fn stats(&self) -> StoreStats {
        let mut per_category = BTreeMap::new();
        for point in &self.points {
            *per_category
                .entry(point.chunk.metadata.product_category)
                .or_insert(0u64) += 1;
        }

        StoreStats {
            collection: self.manifest.collection.clone(),
            points_count: self.points.len() as u64,
            dimension: self.manifest.dimension,
            embedding_model: self.manifest.embedding_model.clone(),
            per_category,
        }
    }

    /// Append whole lines to the points file; a failed write is cut back
    /// so no partial batch survives a reopen.
    fn append_points(&self, bytes: &[u8]) -> Result<()> {
        let path = self.dir.join(POINTS_FILE);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let previous_len = file.metadata()?.len();

        if let Err(err) = file.write_all(bytes).and_then(|_| file.sync_data()) {
            if let Err(rollback) = file.set_len(previous_len) {
                warn!("Could not roll back {}: {}", path.display(), rollback);
            }
            return Err(err.into());
        }
        Ok(())
    }

    fn write_manifest(&self) -> Result<()> {
        let path = self.dir.join(MANIFEST_FILE);
        let tmp = self.dir.join(format!("{}.tmp", MANIFEST_FILE));
        fs::write(&tmp, serde_json::to_string_pretty(&self.manifest)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

fn load_points(path: &Path, dimension: usize) -> Result<Vec<IndexedPoint>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut points = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let point: IndexedPoint = serde_json::from_str(&line).map_err(|e| {
            Error::VectorStoreError(format!("{} line {}: {}", path.display(), line_no + 1, e))
        })?;
        if point.vector.len() != dimension {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                actual: point.vector.len(),
            });
        }
        points.push(point);
    }
    Ok(points)
}
