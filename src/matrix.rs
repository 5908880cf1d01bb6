//! Dense matrices of Galois field elements.
//!
//! [`GfMatrix`] is a row-major matrix whose elements live in a shared
//! [`GaloisField`]. It provides the row/column operations that Gauss-Jordan
//! elimination is built from, inversion via
//! [`reduce_and_get_inverse`](GfMatrix::reduce_and_get_inverse), and the
//! reduced Vandermonde construction that makes Reed-Solomon work: a tall
//! matrix whose topmost square is the identity and which stays invertible
//! no matter which rows are deleted down to a square.
//!
//! Dimension and field mismatches between matrices are recoverable
//! [`Error`]s; indexing out of bounds panics.

use std::sync::Arc;

use crate::error::Error;
use crate::gf::GaloisField;

/// A matrix over GF(2^n), row-major.
///
/// Cloning deep-copies the element storage; the field handle is shared.
#[derive(Clone)]
pub struct GfMatrix {
    rows: usize,
    cols: usize,
    field: Arc<GaloisField>,
    data: Vec<u32>,
}

impl std::fmt::Debug for GfMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "GfMatrix {}x{} over {:?}", self.rows, self.cols, self.field)?;
        for row in 0..self.rows {
            for col in 0..self.cols {
                write!(f, "{} ", self.get(row, col))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl GfMatrix {
    /// A zero-filled `rows` x `cols` matrix.
    pub fn new(rows: usize, cols: usize, field: Arc<GaloisField>) -> Self {
        GfMatrix {
            rows,
            cols,
            field,
            data: vec![0; rows * cols],
        }
    }

    /// Build a matrix from explicit row-major data.
    ///
    /// # Errors
    ///
    /// - [`Error::SizeMismatch`] when `data.len() != rows * cols`.
    /// - [`Error::ElementOutOfField`] when any element has bits above the
    ///   field's width.
    pub fn from_data(
        data: Vec<u32>,
        rows: usize,
        cols: usize,
        field: Arc<GaloisField>,
    ) -> Result<Self, Error> {
        if data.len() != rows * cols {
            return Err(Error::SizeMismatch);
        }
        let mask = !(field.overflow_mask() - 1);
        if data.iter().any(|&v| v & mask != 0) {
            return Err(Error::ElementOutOfField);
        }
        Ok(GfMatrix {
            rows,
            cols,
            field,
            data,
        })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The field the elements live in.
    #[inline]
    pub fn field(&self) -> &Arc<GaloisField> {
        &self.field
    }

    /// # Panics
    ///
    /// Panics when the index is out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u32 {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        self.data[row * self.cols + col]
    }

    /// # Panics
    ///
    /// Panics when the index is out of bounds.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: u32) {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, n: usize) -> Vec<u32> {
        (0..self.cols).map(|i| self.get(n, i)).collect()
    }

    pub fn col(&self, n: usize) -> Vec<u32> {
        (0..self.rows).map(|i| self.get(i, n)).collect()
    }

    /// # Panics
    ///
    /// Panics when `data.len() != cols` or `n` is out of bounds.
    pub fn set_row(&mut self, n: usize, data: &[u32]) {
        assert_eq!(data.len(), self.cols, "row length mismatch");
        for (i, &v) in data.iter().enumerate() {
            self.set(n, i, v);
        }
    }

    /// # Panics
    ///
    /// Panics when `data.len() != rows` or `n` is out of bounds.
    pub fn set_col(&mut self, n: usize, data: &[u32]) {
        assert_eq!(data.len(), self.rows, "column length mismatch");
        for (i, &v) in data.iter().enumerate() {
            self.set(i, n, v);
        }
    }

    // ==================== elementary row/column operations ====================

    /// `rows[dest] += rows[src] * factor`
    pub fn row_add_multiple(&mut self, dest: usize, src: usize, factor: u32) {
        for i in 0..self.cols {
            let v = self
                .field
                .add(self.get(dest, i), self.field.multiply(self.get(src, i), factor));
            self.set(dest, i, v);
        }
    }

    /// `rows[dest] *= factor`
    pub fn row_scale(&mut self, dest: usize, factor: u32) {
        for i in 0..self.cols {
            let v = self.field.multiply(self.get(dest, i), factor);
            self.set(dest, i, v);
        }
    }

    pub fn row_swap(&mut self, r1: usize, r2: usize) {
        for i in 0..self.cols {
            let tmp = self.get(r1, i);
            self.set(r1, i, self.get(r2, i));
            self.set(r2, i, tmp);
        }
    }

    /// `cols[dest] += cols[src] * factor`
    pub fn col_add_multiple(&mut self, dest: usize, src: usize, factor: u32) {
        for i in 0..self.rows {
            let v = self
                .field
                .add(self.get(i, dest), self.field.multiply(self.get(i, src), factor));
            self.set(i, dest, v);
        }
    }

    /// `cols[dest] *= factor`
    pub fn col_scale(&mut self, dest: usize, factor: u32) {
        for i in 0..self.rows {
            let v = self.field.multiply(self.get(i, dest), factor);
            self.set(i, dest, v);
        }
    }

    pub fn col_swap(&mut self, c1: usize, c2: usize) {
        for i in 0..self.rows {
            let tmp = self.get(i, c1);
            self.set(i, c1, self.get(i, c2));
            self.set(i, c2, tmp);
        }
    }

    /// Set the top-left square to the identity and everything else to zero.
    pub fn set_identity(&mut self) {
        self.data.fill(0);
        for i in 0..self.rows.min(self.cols) {
            self.set(i, i, 1);
        }
    }

    // ==================== elimination and inversion ====================

    /// Reduce the leftmost `rows` x `rows` square of this matrix to the
    /// identity in place, and return the matrix of row operations applied:
    /// `inv * old_self = new_self`.
    ///
    /// For a square input this is exactly the inverse. For a wider input it
    /// is the same transform, applied to the trailing columns too, which is
    /// what the Vandermonde reduction needs.
    ///
    /// Each pivot is made nonzero by swapping in a row from below, scaled to
    /// 1, then used to clear its column below. A second ascending pass
    /// clears the remaining upper triangle.
    ///
    /// # Errors
    ///
    /// - [`Error::SizeMismatch`] when `cols < rows` (no leftmost square).
    /// - [`Error::NotInvertible`] when some pivot column is all zero.
    pub fn reduce_and_get_inverse(&mut self) -> Result<GfMatrix, Error> {
        if self.cols < self.rows {
            return Err(Error::SizeMismatch);
        }

        let mut inv = GfMatrix::new(self.rows, self.rows, self.field.clone());
        inv.set_identity();

        for row in 0..self.rows {
            if self.get(row, row) == 0 {
                for j in row + 1..self.rows {
                    if self.get(j, row) != 0 {
                        self.row_swap(row, j);
                        inv.row_swap(row, j);
                        break;
                    }
                }
                if self.get(row, row) == 0 {
                    return Err(Error::NotInvertible);
                }
            }

            let factor = self.field.mult_inverse(self.get(row, row))?;
            if factor != 1 {
                self.row_scale(row, factor);
                inv.row_scale(row, factor);
            }

            for j in row + 1..self.rows {
                let factor = self.field.neg(self.get(j, row));
                if factor == 0 {
                    continue;
                }
                self.row_add_multiple(j, row, factor);
                inv.row_add_multiple(j, row, factor);
            }
        }

        // Upper triangular now; clear the remaining above-diagonal slots.
        for row in 1..self.rows {
            for j in (0..row).rev() {
                let factor = self.field.neg(self.get(j, row));
                if factor == 0 {
                    continue;
                }
                self.row_add_multiple(j, row, factor);
                inv.row_add_multiple(j, row, factor);
            }
        }

        Ok(inv)
    }

    /// The inverse of a square matrix, computed on a copy.
    ///
    /// # Errors
    ///
    /// - [`Error::NotSquare`] when the matrix is not square.
    /// - [`Error::NotInvertible`] when it is singular.
    pub fn get_inverse(&self) -> Result<GfMatrix, Error> {
        if self.rows != self.cols {
            return Err(Error::NotSquare);
        }
        self.clone().reduce_and_get_inverse()
    }

    pub fn transpose(&self) -> GfMatrix {
        let mut t = GfMatrix::new(self.cols, self.rows, self.field.clone());
        for row in 0..self.rows {
            for col in 0..self.cols {
                t.set(col, row, self.get(row, col));
            }
        }
        t
    }

    // ==================== Vandermonde construction ====================

    /// Build the reduced Vandermonde matrix: `rows` x `cols`, topmost square
    /// equal to the identity, with the property that deleting any rows down
    /// to a `cols` x `cols` square leaves an invertible matrix.
    ///
    /// Row r of the raw Vandermonde matrix is `[r^0, r^1, ..., r^(cols-1)]`.
    /// Column-reducing the top square to the identity preserves the
    /// any-square-subset-invertible property and makes data blocks pass
    /// through encoding unchanged. The reduction is done with row operations
    /// on the transpose.
    ///
    /// # Errors
    ///
    /// - [`Error::SizeMismatch`] when `cols > rows`.
    /// - [`Error::TooManyBlocks`] when `rows` exceeds the field's element
    ///   count, where distinct rows would stop being distinct points.
    pub fn reduced_vandermonde(
        rows: usize,
        cols: usize,
        field: Arc<GaloisField>,
    ) -> Result<GfMatrix, Error> {
        if cols > rows {
            return Err(Error::SizeMismatch);
        }
        if rows > field.max_blocks() {
            return Err(Error::TooManyBlocks {
                total: rows,
                max: field.max_blocks(),
            });
        }

        let mut m = GfMatrix::new(rows, cols, field);
        for row in 0..rows {
            for col in 0..cols {
                let v = m.field.power(row as u32, col as u32);
                m.set(row, col, v);
            }
        }

        // The reduction needs column operations here; row-reduce the
        // transpose instead.
        let mut t = m.transpose();
        t.reduce_and_get_inverse()?;
        Ok(t.transpose())
    }

    // ==================== products ====================

    /// `result = self * v`, accumulated column by column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SizeMismatch`] when `v.len() != cols`.
    pub fn mul_vector(&self, v: &[u32]) -> Result<Vec<u32>, Error> {
        if v.len() != self.cols {
            return Err(Error::SizeMismatch);
        }
        let mut result = vec![0u32; self.rows];
        for (col, &factor) in v.iter().enumerate() {
            if factor == 0 {
                continue;
            }
            for row in 0..self.rows {
                result[row] = self
                    .field
                    .add(result[row], self.field.multiply(self.get(row, col), factor));
            }
        }
        Ok(result)
    }

    /// `m1 * m2`.
    ///
    /// # Errors
    ///
    /// - [`Error::FieldMismatch`] when the operands use different fields.
    /// - [`Error::SizeMismatch`] when `m1.cols != m2.rows`.
    pub fn matmul(m1: &GfMatrix, m2: &GfMatrix) -> Result<GfMatrix, Error> {
        if m1.field != m2.field {
            return Err(Error::FieldMismatch);
        }
        if m1.cols != m2.rows {
            return Err(Error::SizeMismatch);
        }
        let mut r = GfMatrix::new(m1.rows, m2.cols, m1.field.clone());
        for col in 0..m2.cols {
            let product = m1.mul_vector(&m2.col(col))?;
            r.set_col(col, &product);
        }
        Ok(r)
    }
}

// ==================== vector helpers ====================

/// Inner product of two equal-length vectors.
///
/// # Panics
///
/// Panics on unequal lengths.
pub fn vector_dot(v1: &[u32], v2: &[u32], field: &GaloisField) -> u32 {
    assert_eq!(v1.len(), v2.len(), "vector length mismatch");
    v1.iter()
        .zip(v2.iter())
        .fold(0, |acc, (&a, &b)| field.add(acc, field.multiply(a, b)))
}

/// `dest = v1 + v2`. `dest` may alias either input slice's source data since
/// all three are distinct borrows here.
///
/// # Panics
///
/// Panics on unequal lengths.
pub fn vector_add(dest: &mut [u32], v1: &[u32], v2: &[u32], field: &GaloisField) {
    assert!(
        v1.len() == dest.len() && v2.len() == dest.len(),
        "vector length mismatch"
    );
    for i in 0..dest.len() {
        dest[i] = field.add(v1[i], v2[i]);
    }
}

/// `dest += v * factor`
///
/// # Panics
///
/// Panics on unequal lengths.
pub fn vector_add_multiple(dest: &mut [u32], v: &[u32], factor: u32, field: &GaloisField) {
    assert_eq!(dest.len(), v.len(), "vector length mismatch");
    for i in 0..dest.len() {
        dest[i] = field.add(dest[i], field.multiply(v[i], factor));
    }
}

/// `v *= factor` elementwise.
pub fn vector_scale(v: &mut [u32], factor: u32, field: &GaloisField) {
    for elem in v.iter_mut() {
        *elem = field.multiply(*elem, factor);
    }
}
