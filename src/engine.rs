//! Encode and decode sessions.
//!
//! Parity generation multiplies the reduced Vandermonde generation matrix
//! by the vector of data blocks:
//!
//! ```text
//! | 1 0 0 |          | d1 |
//! | 0 1 0 | | d1 |   | d2 |
//! | 0 0 1 | | d2 | = | d3 |
//! | a b c | | d3 |   | p1 |
//! | d e f |          | p2 |
//! ```
//!
//! The identity on top means data blocks pass through unchanged; only the
//! parity rows are ever computed. Recovery deletes the rows of the lost
//! blocks, keeps the first `num_data` surviving rows, and inverts the
//! resulting square so that multiplying the inverse by the vector of
//! surviving blocks yields the original data vector.
//!
//! Both directions are *resumable*: a session is a matrix in a
//! [`GenerationInfo`] / [`RecoveryInfo`] plus any number of partial calls.
//! Each call processes the cross product of the input blocks and target
//! blocks it was given, adding each input's contribution into each target.
//! As long as every (input, target) pair is processed exactly once and
//! every target buffer starts zero-filled, any batching order produces
//! bit-identical results to a single full call. Nothing tracks which pairs
//! have been processed; feeding a pair twice silently corrupts the targets.
//! The info structs are immutable and reusable across stripes.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::block::Block;
use crate::error::Error;
use crate::gf::{gf16, gf8, ElementWidth, GaloisField};
use crate::matrix::GfMatrix;

// ==================== session state ====================

/// Everything needed for incremental parity generation. Built once by
/// [`begin_generate`], never modified, reusable for any number of stripes.
#[derive(Debug)]
pub struct GenerationInfo {
    /// `num_total` x `num_data`; multiply by the data vector to get the
    /// concatenated data+parity vector.
    matrix: GfMatrix,
    num_data: usize,
    num_parity: usize,
    width: ElementWidth,
}

impl GenerationInfo {
    #[inline]
    pub fn num_data(&self) -> usize {
        self.num_data
    }

    #[inline]
    pub fn num_parity(&self) -> usize {
        self.num_parity
    }

    #[inline]
    pub fn num_total(&self) -> usize {
        self.num_data + self.num_parity
    }

    #[inline]
    pub fn field(&self) -> &Arc<GaloisField> {
        self.matrix.field()
    }

    #[inline]
    pub fn element_width(&self) -> ElementWidth {
        self.width
    }

    /// The generation matrix itself.
    #[inline]
    pub fn matrix(&self) -> &GfMatrix {
        &self.matrix
    }
}

/// Everything needed for incremental recovery. Built once by
/// [`begin_recover`], never modified, reusable across stripe segments.
#[derive(Debug)]
pub struct RecoveryInfo {
    /// Multiply by the recovery vector (the selected surviving blocks, in
    /// ascending index order) to get the original data vector, extended
    /// with the parity vector when `recovering_parity` is set.
    matrix: GfMatrix,
    num_data: usize,
    num_parity: usize,
    width: ElementWidth,
    /// Original block index -> column in the recovery vector.
    positions: BTreeMap<usize, usize>,
    recovering_parity: bool,
}

impl RecoveryInfo {
    #[inline]
    pub fn num_data(&self) -> usize {
        self.num_data
    }

    #[inline]
    pub fn num_parity(&self) -> usize {
        self.num_parity
    }

    #[inline]
    pub fn num_total(&self) -> usize {
        self.num_data + self.num_parity
    }

    #[inline]
    pub fn field(&self) -> &Arc<GaloisField> {
        self.matrix.field()
    }

    #[inline]
    pub fn element_width(&self) -> ElementWidth {
        self.width
    }

    /// Whether this session can also rebuild lost parity blocks.
    #[inline]
    pub fn recovering_parity(&self) -> bool {
        self.recovering_parity
    }

    /// True when the block's intact contents are one of the recovery
    /// inputs. Extraneous intact blocks return false and are ignored by
    /// [`recover`].
    pub fn is_block_needed_for_recovery(&self, index: usize) -> bool {
        self.positions.contains_key(&index)
    }
}

fn pick_field(field: Option<Arc<GaloisField>>, num_total: usize) -> Arc<GaloisField> {
    field.unwrap_or_else(|| {
        if num_total <= gf8().max_blocks() {
            gf8()
        } else {
            gf16()
        }
    })
}

// ==================== parity generation ====================

/// Start a parity-generation session.
///
/// With `field` of `None`, the 8 bit field is used when the total block
/// count fits, the 16 bit field otherwise.
///
/// # Errors
///
/// - [`Error::TooManyBlocks`] when `num_data + num_parity` exceeds the
///   field's element count.
/// - [`Error::UnsupportedFieldWidth`] for fields wider than 16 bits.
pub fn begin_generate(
    num_data: usize,
    num_parity: usize,
    field: Option<Arc<GaloisField>>,
) -> Result<GenerationInfo, Error> {
    let num_total = num_data + num_parity;
    let field = pick_field(field, num_total);
    if num_total > field.max_blocks() {
        return Err(Error::TooManyBlocks {
            total: num_total,
            max: field.max_blocks(),
        });
    }
    let width = ElementWidth::for_field(&field)?;

    debug!(
        num_data,
        num_parity,
        numbits = field.numbits(),
        "building generation matrix"
    );

    Ok(GenerationInfo {
        matrix: GfMatrix::reduced_vandermonde(num_total, num_data, field)?,
        num_data,
        num_parity,
        width,
    })
}

/// Data-side validation shared by the partial generation entry points.
/// Returns false when the block is zero filled and contributes nothing.
fn check_generate_source(data: &Block, info: &GenerationInfo) -> bool {
    assert!(data.is_data(), "non data block in the data block list");
    if data.is_zero_filled() {
        return false;
    }
    assert!(
        data.is_intact(),
        "block that needs processing passed as a data source"
    );
    assert!(
        data.index() < info.num_data,
        "block index out of bounds: data block {}",
        data.index()
    );
    assert!(
        !data.is_zero_length(),
        "data block {} has no buffer",
        data.index()
    );
    true
}

/// Fold one data block's contribution into one parity block. The data
/// block must already have passed [`check_generate_source`].
fn generate_pair(data: &Block, parity: &mut Block, info: &GenerationInfo) {
    assert!(parity.is_parity(), "non parity block in the parity block list");
    let row = parity.index();
    let col = data.index();
    assert!(
        row >= info.num_data && row < info.num_total(),
        "block index out of bounds: parity block {row}"
    );
    assert!(!parity.is_zero_length(), "parity block {row} has no buffer");

    let factor = info.matrix.get(row, col);
    let src = data
        .buffer()
        .expect("data block buffer checked by caller")
        .as_slice();
    let dest = parity
        .buffer_mut()
        .expect("parity block buffer checked above")
        .as_mut_slice();
    assert_eq!(
        dest.len(),
        src.len(),
        "block size mismatch: blocks {col} and {row}"
    );

    info.field().add_multiple_of_block(dest, src, factor, info.width);
}

/// Add the given data blocks' contributions into the given parity blocks.
///
/// Any subset of the data blocks may be passed with any subset of the
/// parity blocks; see the module docs for the exactly-once batching
/// contract. Parity buffers must be zero filled before their first call.
/// Data blocks marked zero filled are skipped, since adding a multiple of
/// zeroes is a no-op.
///
/// # Panics
///
/// Panics on blocks with the wrong role in either list, a data block that
/// itself needs processing, an out-of-range index, a missing buffer, or
/// mismatched buffer sizes.
pub fn generate(data_blocks: &[Block], parity_blocks: &mut [Block], info: &GenerationInfo) {
    for data_block in data_blocks {
        if !check_generate_source(data_block, info) {
            continue;
        }
        for parity_block in parity_blocks.iter_mut() {
            generate_pair(data_block, parity_block, info);
        }
    }
}

/// Split one immutable source and one mutable target out of the same
/// slice.
fn source_and_target(blocks: &mut [Block], src: usize, dest: usize) -> (&Block, &mut Block) {
    assert_ne!(src, dest, "source and target are the same block");
    if src < dest {
        let (head, tail) = blocks.split_at_mut(dest);
        (&head[src], &mut tail[0])
    } else {
        let (head, tail) = blocks.split_at_mut(src);
        (&tail[0], &mut head[dest])
    }
}

/// [`generate`] over a mixed list, split by role. Same partial semantics
/// and batching contract.
pub fn generate_blocks(blocks: &mut [Block], info: &GenerationInfo) {
    let data_indices: Vec<usize> = (0..blocks.len()).filter(|&i| blocks[i].is_data()).collect();
    let parity_indices: Vec<usize> =
        (0..blocks.len()).filter(|&i| blocks[i].is_parity()).collect();

    for &d in &data_indices {
        if !check_generate_source(&blocks[d], info) {
            continue;
        }
        for &p in &parity_indices {
            let (data, parity) = source_and_target(blocks, d, p);
            generate_pair(data, parity, info);
        }
    }
}

/// Run a complete generation session over a mixed block list: every parity
/// block is fully generated from every data block in one call.
///
/// Parity buffers must be zero filled on entry. Block counts are taken
/// from the list's roles.
///
/// # Errors
///
/// Same as [`begin_generate`].
pub fn generate_parity(blocks: &mut [Block], field: Option<Arc<GaloisField>>) -> Result<(), Error> {
    let num_data = blocks.iter().filter(|b| b.is_data()).count();
    let num_parity = blocks.len() - num_data;
    let info = begin_generate(num_data, num_parity, field)?;
    generate_blocks(blocks, &info);
    Ok(())
}

// ==================== recovery ====================

/// Start a recovery session.
///
/// `have[i]` is true when block `i` (stripe-wide index, data blocks first)
/// is intact and usable as a recovery input. The generation matrix is
/// rebuilt, the rows of lost blocks deleted, and the first `num_data`
/// surviving rows in index order inverted; extra intact blocks beyond
/// those are simply never selected. With `recover_parity` set the inverse
/// is pre-multiplied by the full generation matrix so lost parity rows can
/// be rebuilt in the same pass.
///
/// # Errors
///
/// - [`Error::NotEnoughBlocks`] when fewer than `num_data` blocks survive.
/// - [`Error::TooManyBlocks`] / [`Error::UnsupportedFieldWidth`] as for
///   [`begin_generate`].
///
/// # Panics
///
/// Panics when `have.len() != num_data + num_parity`.
pub fn begin_recover(
    have: &[bool],
    num_data: usize,
    num_parity: usize,
    field: Option<Arc<GaloisField>>,
    recover_parity: bool,
) -> Result<RecoveryInfo, Error> {
    let num_total = num_data + num_parity;
    assert_eq!(have.len(), num_total, "block count mismatch");

    let field = pick_field(field, num_total);
    if num_total > field.max_blocks() {
        return Err(Error::TooManyBlocks {
            total: num_total,
            max: field.max_blocks(),
        });
    }
    let width = ElementWidth::for_field(&field)?;

    let original = GfMatrix::reduced_vandermonde(num_total, num_data, field.clone())?;
    let mut erased = GfMatrix::new(num_data, num_data, field);
    let mut positions = BTreeMap::new();

    let mut next_row = 0;
    for (i, &intact) in have.iter().enumerate() {
        if next_row == num_data {
            break;
        }
        if !intact {
            continue;
        }
        erased.set_row(next_row, &original.row(i));
        positions.insert(i, next_row);
        next_row += 1;
    }
    if next_row != num_data {
        return Err(Error::NotEnoughBlocks {
            have: next_row,
            need: num_data,
        });
    }

    let inverse = erased.get_inverse()?;
    let matrix = if recover_parity {
        // Chaining the generation matrix onto the inverse turns
        // recovered data straight back into parity rows as well.
        GfMatrix::matmul(&original, &inverse)?
    } else {
        inverse
    };

    debug!(
        num_data,
        num_parity,
        recover_parity,
        inputs = ?positions.keys().collect::<Vec<_>>(),
        "built recovery matrix"
    );

    Ok(RecoveryInfo {
        matrix,
        num_data,
        num_parity,
        width,
        positions,
        recovering_parity: recover_parity,
    })
}

/// Fold one present block's contribution into one block being recovered.
fn recover_pair(present: &Block, target: &mut Block, col: usize, info: &RecoveryInfo) {
    let row = target.index();
    if target.is_data() {
        assert!(row < info.num_data, "not a valid data block index: {row}");
    } else {
        assert!(
            info.recovering_parity,
            "attempt to recover parity in a session begun without parity recovery"
        );
        assert!(
            row >= info.num_data && row < info.num_total(),
            "not a valid parity block index: {row}"
        );
    }
    assert!(
        target.needs_recovery(),
        "block {row} does not need recovering"
    );
    assert!(!target.is_zero_length(), "recovery target {row} has no buffer");
    assert!(
        row < info.matrix.rows() && col < info.matrix.cols(),
        "invalid matrix coordinates"
    );

    let factor = info.matrix.get(row, col);
    let src = present
        .buffer()
        .expect("present block buffer checked by caller")
        .as_slice();
    let dest = target
        .buffer_mut()
        .expect("target buffer checked above")
        .as_mut_slice();
    assert_eq!(
        dest.len(),
        src.len(),
        "block size mismatch: blocks {} and {row}",
        present.index()
    );

    info.field().add_multiple_of_block(dest, src, factor, info.width);
}

/// Present-side validation. Returns the block's recovery-vector column, or
/// `None` when the block contributes nothing (extraneous or zero filled).
fn check_recover_source(present: &Block, info: &RecoveryInfo) -> Option<usize> {
    assert!(present.is_intact(), "block without valid data passed as present");
    let col = *info.positions.get(&present.index())?;
    if present.is_zero_filled() {
        return None;
    }
    assert!(
        !present.is_zero_length(),
        "block {} has no buffer and is not marked zero filled",
        present.index()
    );
    Some(col)
}

/// Add the given present blocks' contributions into the given blocks being
/// recovered.
///
/// Partial like [`generate`]: any subset of the present blocks with any
/// subset of the recovery targets, each pair exactly once, targets zero
/// filled before their first call. Intact blocks that are not among the
/// session's selected inputs are ignored, so passing every surviving block
/// is always safe. Zero filled present blocks are skipped.
///
/// # Panics
///
/// Panics on a present block that is not intact, a target that does not
/// need recovery or whose index is invalid for its role, a parity target
/// in a data-only session, a missing buffer, or mismatched buffer sizes.
pub fn recover(present_blocks: &[Block], blocks_to_recover: &mut [Block], info: &RecoveryInfo) {
    for present in present_blocks {
        let Some(col) = check_recover_source(present, info) else {
            continue;
        };
        for target in blocks_to_recover.iter_mut() {
            recover_pair(present, target, col, info);
        }
    }
}

/// [`recover`] over a mixed list: intact blocks are the inputs, blocks
/// needing recovery (data only, unless the session recovers parity) are
/// the targets. Same partial semantics.
pub fn recover_blocks(blocks: &mut [Block], info: &RecoveryInfo) {
    let present_indices: Vec<usize> =
        (0..blocks.len()).filter(|&i| blocks[i].is_intact()).collect();
    let target_indices: Vec<usize> = (0..blocks.len())
        .filter(|&i| {
            blocks[i].needs_recovery() && (info.recovering_parity || blocks[i].is_data())
        })
        .collect();

    for &p in &present_indices {
        let Some(col) = check_recover_source(&blocks[p], info) else {
            continue;
        };
        for &t in &target_indices {
            let (present, target) = source_and_target(blocks, p, t);
            recover_pair(present, target, col, info);
        }
    }
}

/// Run a complete recovery session over a mixed block list.
///
/// Intact flags are derived from the blocks; buffers of blocks needing
/// recovery must be zero filled on entry.
///
/// # Errors
///
/// Same as [`begin_recover`].
pub fn recover_all(
    blocks: &mut [Block],
    num_data: usize,
    num_parity: usize,
    field: Option<Arc<GaloisField>>,
    recover_parity: bool,
) -> Result<(), Error> {
    let mut have = vec![false; num_data + num_parity];
    for block in blocks.iter() {
        if block.is_intact() {
            have[block.index()] = true;
        }
    }
    let info = begin_recover(&have, num_data, num_parity, field, recover_parity)?;
    recover_blocks(blocks, &info);
    Ok(())
}

/// Zero-fill the buffer of every block that needs recovery, readying the
/// accumulation targets of a fresh session.
pub fn zero_fill_targets(blocks: &mut [Block]) {
    for block in blocks.iter_mut() {
        if block.needs_recovery() {
            if let Some(buffer) = block.buffer_mut() {
                buffer.zero_fill();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockFlag, BlockRole};
    use crate::buffer::BlockBuffer;
    use crate::gf::gf4;
    use rand::prelude::*;

    /// A 4+3 stripe in the 8 bit field where the last data block is a
    /// zero filled placeholder.
    fn sample_stripe() -> Vec<Block> {
        let mut blocks = vec![
            Block::new(0, BlockRole::Data, BlockBuffer::from_vec(vec![1, 2, 3, 10])),
            Block::new(1, BlockRole::Data, BlockBuffer::from_vec(vec![4, 5, 6, 11])),
            Block::new(2, BlockRole::Data, BlockBuffer::from_vec(vec![7, 8, 9, 0])),
            Block::zero_filled(3, BlockRole::Data),
        ];
        for i in 4..7 {
            blocks.push(Block::needs_generating(i, BlockRole::Parity, BlockBuffer::new(4)));
        }
        blocks
    }

    fn buffer_copies(blocks: &[Block]) -> Vec<Option<Vec<u8>>> {
        blocks
            .iter()
            .map(|b| b.buffer().map(|buf| buf.as_slice().to_vec()))
            .collect()
    }

    fn mark_generated(blocks: &mut [Block]) {
        for b in blocks.iter_mut() {
            b.set_flag(BlockFlag::NeedsGenerating, false);
        }
    }

    fn kill(blocks: &mut [Block], indices: &[usize]) {
        for b in blocks.iter_mut() {
            if indices.contains(&b.index()) {
                b.set_flag(BlockFlag::ZeroFilled, false);
                b.set_flag(BlockFlag::NeedsGenerating, true);
                if b.buffer().is_none() {
                    *b = Block::needs_generating(b.index(), b.role(), BlockBuffer::new(4));
                }
            }
        }
    }

    #[test]
    fn test_generate_then_recover_with_zero_filled_block() {
        let mut blocks = sample_stripe();
        generate_parity(&mut blocks, None).unwrap();
        mark_generated(&mut blocks);
        let originals = buffer_copies(&blocks);

        // Lose two data blocks and a parity block; the zero filled
        // placeholder counts among the survivors.
        kill(&mut blocks, &[1, 2, 4]);
        zero_fill_targets(&mut blocks);
        recover_all(&mut blocks, 4, 3, None, true).unwrap();

        for (block, original) in blocks.iter().zip(originals.iter()) {
            match original {
                Some(bytes) => assert_eq!(
                    block.buffer().unwrap().as_slice(),
                    bytes.as_slice(),
                    "block {} not recovered",
                    block.index()
                ),
                None => assert!(block.is_zero_filled()),
            }
        }
    }

    #[test]
    fn test_recovery_ignores_extraneous_intact_blocks() {
        let mut blocks = sample_stripe();
        generate_parity(&mut blocks, None).unwrap();
        mark_generated(&mut blocks);
        let originals = buffer_copies(&blocks);

        // Only one block lost but all six survivors passed in; the two
        // that are not selected as inputs must be silently skipped.
        kill(&mut blocks, &[2]);
        zero_fill_targets(&mut blocks);
        recover_all(&mut blocks, 4, 3, None, true).unwrap();
        assert_eq!(
            blocks[2].buffer().unwrap().as_slice(),
            originals[2].as_ref().unwrap().as_slice()
        );
    }

    #[test]
    fn test_batched_generation_matches_one_shot() {
        let info = begin_generate(4, 3, None).unwrap();

        let mut one_shot = sample_stripe();
        let (data, parity) = one_shot.split_at_mut(4);
        generate(data, parity, &info);
        let expected = buffer_copies(&one_shot);

        // Partition the (data, parity) pair set three different ways.
        let mut batched = sample_stripe();
        {
            let (data, parity) = batched.split_at_mut(4);
            // One data block at a time against all parity blocks.
            for d in data.chunks(1) {
                generate(d, parity, &info);
            }
        }
        assert_eq!(buffer_copies(&batched), expected);

        let mut batched = sample_stripe();
        {
            let (data, parity) = batched.split_at_mut(4);
            // One parity block at a time against all data blocks.
            for p in parity.chunks_mut(1) {
                generate(data, p, &info);
            }
        }
        assert_eq!(buffer_copies(&batched), expected);

        let mut batched = sample_stripe();
        {
            let (data, parity) = batched.split_at_mut(4);
            // Ragged mix: pairs (0..2 x 0), (0..2 x 1..3), (2..4 x all).
            let (p0, p_rest) = parity.split_at_mut(1);
            generate(&data[..2], p0, &info);
            generate(&data[..2], p_rest, &info);
            generate(&data[2..], parity, &info);
        }
        assert_eq!(buffer_copies(&batched), expected);
    }

    #[test]
    fn test_batched_recovery_matches_one_shot() {
        let mut blocks = sample_stripe();
        generate_parity(&mut blocks, None).unwrap();
        mark_generated(&mut blocks);
        let originals = buffer_copies(&blocks);

        kill(&mut blocks, &[0, 5]);
        zero_fill_targets(&mut blocks);

        let mut have = vec![true; 7];
        have[0] = false;
        have[5] = false;
        let info = begin_recover(&have, 4, 3, None, true).unwrap();

        // Feed the present blocks in two batches against both targets.
        let present: Vec<usize> = (0..7).filter(|i| ![0usize, 5].contains(i)).collect();
        for chunk in present.chunks(2) {
            for &p in chunk {
                let Some(col) = check_recover_source(&blocks[p], &info) else {
                    continue;
                };
                for &t in &[0usize, 5] {
                    let (src, dest) = source_and_target(&mut blocks, p, t);
                    recover_pair(src, dest, col, &info);
                }
            }
        }

        assert_eq!(
            blocks[0].buffer().unwrap().as_slice(),
            originals[0].as_ref().unwrap().as_slice()
        );
        assert_eq!(
            blocks[5].buffer().unwrap().as_slice(),
            originals[5].as_ref().unwrap().as_slice()
        );
    }

    #[test]
    fn test_not_enough_blocks_payload() {
        let mut have = vec![true; 6];
        // 4 data + 2 parity, 3 blocks lost: only 3 of the needed 4 remain.
        have[0] = false;
        have[2] = false;
        have[5] = false;
        let err = begin_recover(&have, 4, 2, None, true).unwrap_err();
        assert!(matches!(err, Error::NotEnoughBlocks { have: 3, need: 4 }));
    }

    #[test]
    fn test_too_many_blocks_for_field() {
        let err = begin_generate(200, 100, Some(gf8())).unwrap_err();
        assert!(matches!(err, Error::TooManyBlocks { total: 300, max: 256 }));
    }

    #[test]
    fn test_auto_field_selection() {
        assert_eq!(begin_generate(200, 56, None).unwrap().field().numbits(), 8);
        assert_eq!(begin_generate(200, 57, None).unwrap().field().numbits(), 16);
    }

    #[test]
    fn test_round_trip_in_small_field() {
        let mut blocks: Vec<Block> = (0..3)
            .map(|i| {
                // Elements must stay below 16 in the 4 bit field.
                Block::new(
                    i,
                    BlockRole::Data,
                    BlockBuffer::from_vec(vec![(i as u8 + 1) * 3 % 16, 7, 0, 15]),
                )
            })
            .collect();
        for i in 3..5 {
            blocks.push(Block::needs_generating(i, BlockRole::Parity, BlockBuffer::new(4)));
        }
        generate_parity(&mut blocks, Some(gf4())).unwrap();
        mark_generated(&mut blocks);
        let originals = buffer_copies(&blocks);

        kill(&mut blocks, &[0, 4]);
        zero_fill_targets(&mut blocks);
        recover_all(&mut blocks, 3, 2, Some(gf4()), true).unwrap();
        assert_eq!(buffer_copies(&blocks), originals);
    }

    #[test]
    fn test_random_erasure_patterns() {
        let num_data = 6;
        let num_parity = 4;
        let block_size = 32;
        let mut rng = StdRng::seed_from_u64(0xec0de);

        for _ in 0..20 {
            let mut blocks: Vec<Block> = (0..num_data)
                .map(|i| {
                    let mut data = vec![0u8; block_size];
                    rng.fill_bytes(&mut data);
                    Block::new(i, BlockRole::Data, BlockBuffer::from_vec(data))
                })
                .collect();
            for i in num_data..num_data + num_parity {
                blocks.push(Block::needs_generating(
                    i,
                    BlockRole::Parity,
                    BlockBuffer::new(block_size),
                ));
            }
            generate_parity(&mut blocks, None).unwrap();
            mark_generated(&mut blocks);
            let originals = buffer_copies(&blocks);

            let mut indices: Vec<usize> = (0..num_data + num_parity).collect();
            indices.shuffle(&mut rng);
            let killed = &indices[..num_parity];
            for b in blocks.iter_mut() {
                if killed.contains(&b.index()) {
                    b.set_flag(BlockFlag::NeedsGenerating, true);
                }
            }
            zero_fill_targets(&mut blocks);
            recover_all(&mut blocks, num_data, num_parity, None, true).unwrap();
            assert_eq!(buffer_copies(&blocks), originals, "killed {killed:?}");
        }
    }

    #[test]
    fn test_data_only_recovery_leaves_parity_alone() {
        let mut blocks = sample_stripe();
        generate_parity(&mut blocks, None).unwrap();
        mark_generated(&mut blocks);
        let originals = buffer_copies(&blocks);

        kill(&mut blocks, &[1, 5]);
        zero_fill_targets(&mut blocks);
        recover_all(&mut blocks, 4, 3, None, false).unwrap();

        assert_eq!(
            blocks[1].buffer().unwrap().as_slice(),
            originals[1].as_ref().unwrap().as_slice()
        );
        // The lost parity block was a target of nothing and stays zeroed.
        assert!(blocks[5].buffer().unwrap().as_slice().iter().all(|&b| b == 0));
        assert!(blocks[5].needs_recovery());
    }

    #[test]
    #[should_panic(expected = "session begun without parity recovery")]
    fn test_parity_target_in_data_only_session_panics() {
        let info = begin_recover(&[true, true, false, true], 3, 1, None, false).unwrap();
        let present = vec![
            Block::new(0, BlockRole::Data, BlockBuffer::from_vec(vec![1])),
            Block::new(1, BlockRole::Data, BlockBuffer::from_vec(vec![2])),
            Block::new(3, BlockRole::Data, BlockBuffer::from_vec(vec![3])),
        ];
        let mut target = vec![Block::needs_generating(
            3,
            BlockRole::Parity,
            BlockBuffer::new(1),
        )];
        recover(&present, &mut target, &info);
    }

    #[test]
    #[should_panic(expected = "needs processing passed as a data source")]
    fn test_unintact_data_source_panics() {
        let info = begin_generate(2, 1, None).unwrap();
        let data = vec![Block::needs_generating(0, BlockRole::Data, BlockBuffer::new(4))];
        let mut parity = vec![Block::needs_generating(2, BlockRole::Parity, BlockBuffer::new(4))];
        generate(&data, &mut parity, &info);
    }

    #[test]
    #[should_panic(expected = "non parity block")]
    fn test_data_block_in_parity_list_panics() {
        let info = begin_generate(2, 1, None).unwrap();
        let data = vec![Block::new(0, BlockRole::Data, BlockBuffer::new(4))];
        let mut parity = vec![Block::new(1, BlockRole::Data, BlockBuffer::new(4))];
        generate(&data, &mut parity, &info);
    }

    #[test]
    #[should_panic(expected = "block size mismatch")]
    fn test_mismatched_block_sizes_panic() {
        let info = begin_generate(2, 1, None).unwrap();
        let data = vec![Block::new(0, BlockRole::Data, BlockBuffer::new(4))];
        let mut parity = vec![Block::needs_generating(2, BlockRole::Parity, BlockBuffer::new(8))];
        generate(&data, &mut parity, &info);
    }

    #[test]
    fn test_is_block_needed_for_recovery() {
        let info = begin_recover(&[true, false, true, true, true], 3, 2, None, true).unwrap();
        assert!(info.is_block_needed_for_recovery(0));
        assert!(!info.is_block_needed_for_recovery(1));
        assert!(info.is_block_needed_for_recovery(2));
        assert!(info.is_block_needed_for_recovery(3));
        // Three inputs were enough; the last survivor is extraneous.
        assert!(!info.is_block_needed_for_recovery(4));
    }
}
