//! Blocks: the unit the erasure engine encodes and recovers.
//!
//! Every block carries its index within the stripe, its role (data or
//! parity), and two state flags. [`BlockFlag::NeedsGenerating`] marks a
//! block whose contents are unknown (a parity block not yet computed, or a
//! lost block awaiting recovery). [`BlockFlag::ZeroFilled`] marks a data
//! block known to contain only zeroes, which lets the engine skip its
//! buffer entirely; such a block may have no buffer at all.
//!
//! The two flags contradict each other, and a zero-filled parity block is
//! meaningless, so every flag mutation re-validates the combination and
//! panics on violation. Catching that state the moment it is created is
//! worth far more than a recoverable error nobody can act on.

use crate::buffer::BlockBuffer;

/// Whether a block holds original data or computed parity.
///
/// Data blocks occupy indices `0..num_data`; parity blocks continue from
/// `num_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRole {
    Data,
    Parity,
}

/// Per-block state flags. See the module docs for their meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFlag {
    /// Contents unknown: awaiting parity generation or recovery.
    NeedsGenerating,
    /// Contents known to be all zeroes; the buffer may be absent.
    ZeroFilled,
}

/// One erasure-coded block: index, role, flags, and optional storage.
#[derive(Debug)]
pub struct Block {
    index: usize,
    role: BlockRole,
    needs_generating: bool,
    zero_filled: bool,
    buffer: Option<BlockBuffer>,
}

impl Block {
    /// An intact block with the given storage.
    pub fn new(index: usize, role: BlockRole, buffer: BlockBuffer) -> Self {
        Block {
            index,
            role,
            needs_generating: false,
            zero_filled: false,
            buffer: Some(buffer),
        }
    }

    /// A block whose contents are unknown and must be computed into the
    /// given buffer: a fresh parity block or a lost block being recovered.
    pub fn needs_generating(index: usize, role: BlockRole, buffer: BlockBuffer) -> Self {
        Block {
            index,
            role,
            needs_generating: true,
            zero_filled: false,
            buffer: Some(buffer),
        }
    }

    /// A data block known to be all zeroes, carrying no storage.
    ///
    /// # Panics
    ///
    /// Panics when `role` is [`BlockRole::Parity`].
    pub fn zero_filled(index: usize, role: BlockRole) -> Self {
        let block = Block {
            index,
            role,
            needs_generating: false,
            zero_filled: true,
            buffer: None,
        };
        block.validate();
        block
    }

    fn validate(&self) {
        assert!(
            !(self.needs_generating && self.zero_filled),
            "block cannot both need generating, which means its contents are unknown, \
             and be zero filled, which means its contents are known to be zeroes"
        );
        assert!(
            !(self.role == BlockRole::Parity && self.zero_filled),
            "assuming a parity block is zero filled makes no sense"
        );
    }

    /// Index within the stripe's full block list.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn role(&self) -> BlockRole {
        self.role
    }

    #[inline]
    pub fn is_data(&self) -> bool {
        self.role == BlockRole::Data
    }

    #[inline]
    pub fn is_parity(&self) -> bool {
        self.role == BlockRole::Parity
    }

    /// True when the contents are known and usable as a recovery input.
    #[inline]
    pub fn is_intact(&self) -> bool {
        !self.needs_generating
    }

    /// True when the block is waiting to be computed (generation or
    /// recovery).
    #[inline]
    pub fn needs_recovery(&self) -> bool {
        self.needs_generating
    }

    #[inline]
    pub fn is_zero_filled(&self) -> bool {
        self.zero_filled
    }

    /// True when the block has no buffer or a zero-length one.
    #[inline]
    pub fn is_zero_length(&self) -> bool {
        self.buffer.as_ref().map_or(true, BlockBuffer::is_empty)
    }

    #[inline]
    pub fn has_flag(&self, flag: BlockFlag) -> bool {
        match flag {
            BlockFlag::NeedsGenerating => self.needs_generating,
            BlockFlag::ZeroFilled => self.zero_filled,
        }
    }

    /// Set or clear a flag, re-validating the combination.
    ///
    /// # Panics
    ///
    /// Panics when the resulting flag combination is contradictory.
    pub fn set_flag(&mut self, flag: BlockFlag, value: bool) {
        match flag {
            BlockFlag::NeedsGenerating => self.needs_generating = value,
            BlockFlag::ZeroFilled => self.zero_filled = value,
        }
        self.validate();
    }

    pub fn clear_flag(&mut self, flag: BlockFlag) {
        self.set_flag(flag, false);
    }

    #[inline]
    pub fn buffer(&self) -> Option<&BlockBuffer> {
        self.buffer.as_ref()
    }

    #[inline]
    pub fn buffer_mut(&mut self) -> Option<&mut BlockBuffer> {
        self.buffer.as_mut()
    }
}
