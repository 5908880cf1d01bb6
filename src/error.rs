//! Error types for field construction, matrix algebra, and recovery.
//!
//! Only *recoverable* and *construction-time* failures live here. Invariant
//! violations (invalid flag combinations, mismatched buffer sizes, using a
//! block against its declared role) indicate a caller or library bug and
//! panic instead; see the crate-level docs for the two error channels.

/// Errors that can occur while building fields and matrices or while
/// setting up an encode/decode session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Field size exponent outside the supported 2..=30 range.
    #[error("galois field size out of range: {numbits} bits (supported: 2..=30)")]
    FieldSizeOutOfRange {
        /// The rejected field size exponent.
        numbits: u32,
    },

    /// The polynomial's degree bit does not match the field size.
    #[error("polynomial 0x{polynomial:x} does not have degree {numbits}")]
    InvalidPolynomialDegree {
        /// Field size exponent.
        numbits: u32,
        /// The rejected polynomial.
        polynomial: u32,
    },

    /// The polynomial is not primitive: the generator's powers do not visit
    /// every nonzero field element before cycling back to 1.
    #[error("not a primitive polynomial: {numbits} bit 0x{polynomial:x}")]
    InvalidPolynomial {
        /// Field size exponent.
        numbits: u32,
        /// The rejected polynomial.
        polynomial: u32,
    },

    /// Multiplicative inverse of zero requested.
    #[error("divide by zero in galois field")]
    DivideByZero,

    /// Matrix or vector dimensions do not line up for the requested
    /// operation.
    #[error("matrix/vector size mismatch")]
    SizeMismatch,

    /// Inverse requested of a non-square matrix.
    #[error("attempt to invert a non-square matrix")]
    NotSquare,

    /// A matrix element does not fit in the field's bit width.
    #[error("matrix element does not fit in the galois field")]
    ElementOutOfField,

    /// Two matrices built over different fields were combined.
    #[error("matrices use different galois fields")]
    FieldMismatch,

    /// Gauss-Jordan elimination found a pivot column with no nonzero entry.
    #[error("matrix not invertible")]
    NotInvertible,

    /// More blocks requested than the field can address.
    #[error("too many total blocks for galois field: {total} blocks vs max of {max}")]
    TooManyBlocks {
        /// Requested total block count (data + parity).
        total: usize,
        /// Maximum block count representable in the field.
        max: usize,
    },

    /// Fewer surviving blocks than data blocks at recovery time. The one
    /// user-actionable error: report "insufficient redundancy" and give up.
    #[error("not enough blocks to recover: have {have} of {need} needed")]
    NotEnoughBlocks {
        /// Number of intact blocks available.
        have: usize,
        /// Number of blocks required (the original data-block count).
        need: usize,
    },

    /// The field is too wide for the engine's vectorized element types.
    #[error("no supported element width for a {numbits} bit field")]
    UnsupportedFieldWidth {
        /// Field size exponent.
        numbits: u32,
    },

    /// A stripe driver stream whose length does not match the stripe
    /// layout.
    #[error("stream {index} is {len} bytes, expected {expected}")]
    StreamLengthMismatch {
        /// Index of the offending stream.
        index: usize,
        /// Its actual length in bytes.
        len: u64,
        /// The length the stripe layout requires.
        expected: u64,
    },

    /// An I/O failure from one of the stripe driver's streams, propagated
    /// unchanged.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
