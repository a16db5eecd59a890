//! Partitioning of region cells into chunks.
use crate::blocks::{BlockShape, ElementBlocks};
use crate::Real;
use std::iter::FusedIterator;
use std::ops::Range;

/// A chunk of cells together with a freshly zeroed output buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementChunk<'a, T: Real> {
    /// One output block per cell of the chunk.
    pub output: ElementBlocks<T>,
    indices: &'a [usize],
    local: Range<usize>,
}

impl<'a, T: Real> ElementChunk<'a, T> {
    /// The cells of the chunk, as stored in the region.
    pub fn indices(&self) -> &'a [usize] {
        self.indices
    }

    /// The positions of the chunk's cells within the region.
    pub fn local_indices(&self) -> Range<usize> {
        self.local.clone()
    }

    pub fn local_cells(&self) -> Vec<usize> {
        self.local.clone().collect()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Iterator over consecutive chunks of a list of cells.
///
/// Every cell is visited exactly once, in the order of the given list.
#[derive(Debug, Clone)]
pub struct ElementChunks<'a, T> {
    cells: &'a [usize],
    chunk_size: usize,
    block_shape: BlockShape,
    offset: usize,
    marker: std::marker::PhantomData<T>,
}

impl<'a, T: Real> ElementChunks<'a, T> {
    /// Creates chunks of at most `chunk_size` cells, or a single chunk if `chunk_size` is `None`.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is `Some(0)`.
    pub fn new(cells: &'a [usize], chunk_size: Option<usize>, block_shape: BlockShape) -> Self {
        let chunk_size = match chunk_size {
            Some(size) => {
                assert!(size > 0, "Chunk size must be positive");
                size
            }
            None => cells.len().max(1),
        };
        Self {
            cells,
            chunk_size,
            block_shape,
            offset: 0,
            marker: Default::default(),
        }
    }

    /// Total number of chunks covering all cells.
    pub fn num_chunks(&self) -> usize {
        (self.cells.len() + self.chunk_size - 1) / self.chunk_size
    }

    pub fn block_shape(&self) -> BlockShape {
        self.block_shape
    }
}

impl<'a, T: Real> Iterator for ElementChunks<'a, T> {
    type Item = ElementChunk<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.cells.len() {
            return None;
        }
        let begin = self.offset;
        let end = usize::min(begin + self.chunk_size, self.cells.len());
        self.offset = end;
        Some(ElementChunk {
            output: ElementBlocks::zeros(end - begin, self.block_shape),
            indices: &self.cells[begin..end],
            local: begin..end,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.cells.len() - self.offset.min(self.cells.len()) + self.chunk_size - 1) / self.chunk_size;
        (remaining, Some(remaining))
    }
}

impl<'a, T: Real> ExactSizeIterator for ElementChunks<'a, T> {}

impl<'a, T: Real> FusedIterator for ElementChunks<'a, T> {}
