//! Dense arrays of equally-shaped matrix blocks.
//!
//! Per-element outputs and per-quadrature-point data are both stored as a flat sequence of
//! column-major matrix blocks. Every block in an array has the same shape.
use crate::nalgebra::{DMatrix, DMatrixView, DMatrixViewMut, Scalar};
use crate::Real;
use itertools::izip;

/// The shape `(rows, cols)` of a single block.
pub type BlockShape = (usize, usize);

/// A contiguous array of matrix blocks, typically one block per element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementBlocks<T: Scalar> {
    count: usize,
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Real> ElementBlocks<T> {
    pub fn zeros(count: usize, (rows, cols): BlockShape) -> Self {
        Self {
            count,
            rows,
            cols,
            data: vec![T::zero(); count * rows * cols],
        }
    }

    /// Constructs an array holding a single block.
    pub fn from_matrix(matrix: &DMatrix<T>) -> Self {
        Self {
            count: 1,
            rows: matrix.nrows(),
            cols: matrix.ncols(),
            data: matrix.as_slice().to_vec(),
        }
    }

    /// Returns the sum of all blocks.
    pub fn sum(&self) -> DMatrix<T> {
        let mut result = DMatrix::zeros(self.rows, self.cols);
        for i in 0..self.count {
            result += self.block(i);
        }
        result
    }

    pub fn scale_mut(&mut self, factor: T) {
        for x in &mut self.data {
            *x *= factor;
        }
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Adds the blocks of `other` to the blocks of `self`.
    ///
    /// # Panics
    ///
    /// Panics if the number or shape of the blocks differ.
    pub fn accumulate(&mut self, other: &ElementBlocks<T>) {
        assert_eq!(self.count, other.count, "Number of blocks must match");
        assert_eq!(self.block_shape(), other.block_shape(), "Block shapes must match");
        for (a, &b) in izip!(&mut self.data, &other.data) {
            *a += b;
        }
    }
}

impl<T: Scalar> ElementBlocks<T> {
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn block_shape(&self) -> BlockShape {
        (self.rows, self.cols)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub fn block(&self, index: usize) -> DMatrixView<T> {
        assert!(index < self.count, "Block index out of bounds");
        let n = self.rows * self.cols;
        DMatrixView::from_slice(&self.data[index * n..(index + 1) * n], self.rows, self.cols)
    }

    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub fn block_mut(&mut self, index: usize) -> DMatrixViewMut<T> {
        assert!(index < self.count, "Block index out of bounds");
        let n = self.rows * self.cols;
        DMatrixViewMut::from_slice(&mut self.data[index * n..(index + 1) * n], self.rows, self.cols)
    }

    pub fn iter(&self) -> impl Iterator<Item = DMatrixView<T>> {
        (0..self.count).map(move |i| self.block(i))
    }
}

/// Values stored per `(cell, quadrature point)`.
///
/// The array either has one entry per cell, or a single *broadcast* cell shared by all cells. In
/// the latter case, [`entry`](Self::entry) returns the same values for any cell index.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureData<T: Scalar> {
    num_qp: usize,
    blocks: ElementBlocks<T>,
}

impl<T: Real> QuadratureData<T> {
    pub fn zeros(num_cells: usize, num_qp: usize, shape: BlockShape) -> Self {
        Self {
            num_qp,
            blocks: ElementBlocks::zeros(num_cells * num_qp, shape),
        }
    }

    /// Constructs data by calling `f(cell, qp, output)` for every entry.
    pub fn from_fn<F>(num_cells: usize, num_qp: usize, shape: BlockShape, mut f: F) -> Self
    where
        F: FnMut(usize, usize, DMatrixViewMut<T>),
    {
        let mut data = Self::zeros(num_cells, num_qp, shape);
        for cell in 0..num_cells {
            for q in 0..num_qp {
                f(cell, q, data.entry_mut(cell, q));
            }
        }
        data
    }

    /// Restricts the data to the given cells, preserving their order.
    ///
    /// Broadcast data is returned unchanged.
    pub fn gather(&self, cells: &[usize]) -> Self {
        if self.is_broadcast() {
            return self.clone();
        }
        let mut gathered = Self::zeros(cells.len(), self.num_qp, self.value_shape());
        for (k, &cell) in cells.iter().enumerate() {
            for q in 0..self.num_qp {
                gathered.entry_mut(k, q).copy_from(&self.entry(cell, q));
            }
        }
        gathered
    }
}

impl<T: Scalar> QuadratureData<T> {
    pub fn num_cells(&self) -> usize {
        if self.num_qp == 0 {
            0
        } else {
            self.blocks.len() / self.num_qp
        }
    }

    pub fn num_qp(&self) -> usize {
        self.num_qp
    }

    pub fn value_shape(&self) -> BlockShape {
        self.blocks.block_shape()
    }

    /// Whether a single cell of values is shared by all cells.
    pub fn is_broadcast(&self) -> bool {
        self.num_cells() == 1
    }

    pub fn entry(&self, cell: usize, qp: usize) -> DMatrixView<T> {
        let cell = if self.is_broadcast() { 0 } else { cell };
        assert!(qp < self.num_qp, "Quadrature point index out of bounds");
        self.blocks.block(cell * self.num_qp + qp)
    }

    pub fn entry_mut(&mut self, cell: usize, qp: usize) -> DMatrixViewMut<T> {
        assert!(qp < self.num_qp, "Quadrature point index out of bounds");
        self.blocks.block_mut(cell * self.num_qp + qp)
    }
}
