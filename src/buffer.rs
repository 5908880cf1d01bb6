//! Owned fixed-length byte storage for one block.
//!
//! [`BlockBuffer`] is deliberately minimal: a heap allocation whose length
//! never changes after construction. Borrowing the contents via
//! [`as_slice`](BlockBuffer::as_slice) / [`as_mut_slice`](BlockBuffer::as_mut_slice)
//! is the window in which the engine's bulk field operations touch the
//! bytes; the borrow checker guarantees the region cannot move or be
//! resized underneath them.

/// A fixed-length byte buffer holding one block's contents.
#[derive(Clone, PartialEq, Eq)]
pub struct BlockBuffer {
    data: Box<[u8]>,
}

impl std::fmt::Debug for BlockBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlockBuffer({} bytes)", self.data.len())
    }
}

impl BlockBuffer {
    /// A zero-filled buffer of the given size.
    pub fn new(size_in_bytes: usize) -> Self {
        BlockBuffer {
            data: vec![0; size_in_bytes].into_boxed_slice(),
        }
    }

    /// Take ownership of existing bytes.
    pub fn from_vec(data: Vec<u8>) -> Self {
        BlockBuffer {
            data: data.into_boxed_slice(),
        }
    }

    /// Length in bytes. Fixed for the buffer's lifetime.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Overwrite every byte with zero.
    pub fn zero_fill(&mut self) {
        self.data.fill(0);
    }

    /// Copy this buffer's contents into another buffer of the same length.
    ///
    /// # Panics
    ///
    /// Panics on a length mismatch.
    pub fn copy_to(&self, dest: &mut BlockBuffer) {
        assert_eq!(self.len(), dest.len(), "buffer length mismatch");
        dest.data.copy_from_slice(&self.data);
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl From<Vec<u8>> for BlockBuffer {
    fn from(data: Vec<u8>) -> Self {
        BlockBuffer::from_vec(data)
    }
}
