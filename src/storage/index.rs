//! Flat, append-only vector index for document chunks.
//!
//! Vectors are position-addressable: the index assigns positions in
//! insertion order and never reorders or removes them. Search is exact
//! brute-force inner product, which is cosine similarity for normalized
//! inputs. The whole index persists as a single binary artifact.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Error, Result};

const MAGIC: &[u8; 4] = b"LVI1";

/// Append-only flat vector index
pub struct FlatIndex {
    dimensions: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index for vectors of the given dimension
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            data: Vec::new(),
        }
    }

    /// Number of vectors stored
    pub fn len(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.data.len() / self.dimensions
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Append a vector, returning its position
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        if vector.len() != self.dimensions {
            return Err(Error::store(format!(
                "Vector dimension mismatch: expected {}, got {}",
                self.dimensions,
                vector.len()
            )));
        }

        let position = self.len();
        self.data.extend_from_slice(vector);
        Ok(position)
    }

    /// Search for the `k` nearest vectors by descending inner product.
    ///
    /// Ties break toward the lower position (earlier insertion wins).
    /// `k` larger than the index size returns all entries; an empty index
    /// returns an empty result.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimensions {
            return Err(Error::store(format!(
                "Query dimension mismatch: expected {}, got {}",
                self.dimensions,
                query.len()
            )));
        }

        if self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(position, vector)| {
                let score: f32 = vector.iter().zip(query).map(|(a, b)| a * b).sum();
                (position, score)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored)
    }

    /// Write the index to a single binary artifact
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);

        writer.write_all(MAGIC)?;
        writer.write_all(&(self.dimensions as u32).to_le_bytes())?;
        writer.write_all(&(self.len() as u64).to_le_bytes())?;
        for value in &self.data {
            writer.write_all(&value.to_le_bytes())?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Load an index from its binary artifact
    pub fn load(path: &Path, dimensions: usize) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(Error::store(format!(
                "Not a vector index artifact: {}",
                path.display()
            )));
        }

        let mut dim_bytes = [0u8; 4];
        reader.read_exact(&mut dim_bytes)?;
        let stored_dimensions = u32::from_le_bytes(dim_bytes) as usize;
        if stored_dimensions != dimensions {
            return Err(Error::store(format!(
                "Index dimension mismatch: expected {}, artifact has {}",
                dimensions, stored_dimensions
            )));
        }

        let mut count_bytes = [0u8; 8];
        reader.read_exact(&mut count_bytes)?;
        let count = u64::from_le_bytes(count_bytes) as usize;

        let mut data = Vec::with_capacity(count * dimensions);
        let mut value_bytes = [0u8; 4];
        for _ in 0..count * dimensions {
            reader.read_exact(&mut value_bytes)?;
            data.push(f32::from_le_bytes(value_bytes));
        }

        Ok(Self { dimensions, data })
    }
}
