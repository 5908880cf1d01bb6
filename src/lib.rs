//! gfstripe - Vandermonde Reed-Solomon erasure coding over GF(2^n)
//!
//! This library encodes `num_data` equal-size data blocks into `num_parity`
//! parity blocks such that any combination of up to `num_parity` blocks,
//! data or parity, can be destroyed and recovered bit-exactly.
//!
//! The generator is a reduced Vandermonde matrix over a Galois field chosen
//! at run time (the built-in [`gf8`]/[`gf16`] cover up to 65536 blocks per
//! stripe; arbitrary fields from 2 to 30 bits are supported). Encoding and
//! recovery are *resumable*: a session is set up once and fed blocks in any
//! batching, so only a couple of blocks ever need to be in memory. The
//! [`StripeDriver`] builds on that to erasure-code whole streams a stripe
//! at a time.
//!
//! # Example
//!
//! ```rust
//! use gfstripe::{Block, BlockBuffer, BlockFlag, BlockRole, engine};
//!
//! // Three data blocks and two parity blocks of 4 bytes each.
//! let mut blocks: Vec<Block> = vec![
//!     Block::new(0, BlockRole::Data, BlockBuffer::from_vec(vec![1, 2, 3, 4])),
//!     Block::new(1, BlockRole::Data, BlockBuffer::from_vec(vec![5, 6, 7, 8])),
//!     Block::new(2, BlockRole::Data, BlockBuffer::from_vec(vec![9, 10, 11, 12])),
//!     Block::needs_generating(3, BlockRole::Parity, BlockBuffer::new(4)),
//!     Block::needs_generating(4, BlockRole::Parity, BlockBuffer::new(4)),
//! ];
//! engine::generate_parity(&mut blocks, None).unwrap();
//! for block in &mut blocks {
//!     block.set_flag(BlockFlag::NeedsGenerating, false);
//! }
//!
//! // Any two blocks may now be lost. Lose a data and a parity block:
//! let lost = blocks[1].buffer().unwrap().clone();
//! blocks[1].set_flag(BlockFlag::NeedsGenerating, true);
//! blocks[4].set_flag(BlockFlag::NeedsGenerating, true);
//! engine::zero_fill_targets(&mut blocks);
//!
//! engine::recover_all(&mut blocks, 3, 2, None, true).unwrap();
//! assert_eq!(blocks[1].buffer().unwrap(), &lost);
//! ```

pub mod block;
pub mod buffer;
pub mod engine;
pub mod error;
pub mod gf;
pub mod matrix;
pub mod stripe;

pub use block::{Block, BlockFlag, BlockRole};
pub use buffer::BlockBuffer;
pub use engine::{
    begin_generate, begin_recover, generate, generate_parity, recover, recover_all,
    GenerationInfo, RecoveryInfo,
};
pub use error::Error;
pub use gf::{gf16, gf4, gf8, ElementWidth, GaloisField};
pub use matrix::GfMatrix;
pub use stripe::StripeDriver;
