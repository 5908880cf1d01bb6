//! Erasure coding over streams instead of in-memory blocks.
//!
//! [`StripeDriver`] breaks a set of equal-length seekable streams into
//! stripes of fixed-size blocks and runs one partial encode or decode step
//! per stripe, so only one block buffer per stream is ever resident. Each
//! stream backs one block slot; a slot whose block is permanently zero
//! filled may have no stream at all.
//!
//! Per stripe the driver reads every block that serves as an input, zero
//! fills every block about to be computed, runs the partial operation over
//! the whole block list, and writes the computed buffers back. A block can
//! never be both read and written within one stripe; hitting that state
//! means the flag bookkeeping is broken and the driver panics.
//!
//! Streams are owned by the driver and closed when it is dropped (or
//! handed back by [`into_streams`](StripeDriver::into_streams)).

use std::io::{Read, Seek, SeekFrom, Write};

use tracing::debug;

use crate::block::Block;
use crate::engine;
use crate::error::Error;

/// Runs stripe-at-a-time parity generation and recovery over streams.
#[derive(Debug)]
pub struct StripeDriver<S> {
    blocks: Vec<Block>,
    streams: Vec<Option<S>>,
    num_data: usize,
    num_parity: usize,
    stripes_per_stream: u64,
    streams_need_reset: bool,
}

impl<S: Read + Write + Seek> StripeDriver<S> {
    /// Pair up blocks and streams and validate the stripe layout.
    ///
    /// Each stream's length must equal `stripes_per_stream` times its
    /// block's buffer size. Streams are rewound to the start. A `None`
    /// stream is only legal for a zero filled block.
    ///
    /// # Errors
    ///
    /// - [`Error::StreamLengthMismatch`] when a stream's length does not
    ///   fit the layout.
    /// - [`Error::Io`] on seek failures during validation.
    ///
    /// # Panics
    ///
    /// Panics when the block and stream lists differ in length, or a
    /// non-zero-filled block has no stream.
    pub fn new(
        blocks: Vec<Block>,
        mut streams: Vec<Option<S>>,
        num_data: usize,
        num_parity: usize,
        stripes_per_stream: u64,
    ) -> Result<Self, Error> {
        assert_eq!(
            blocks.len(),
            streams.len(),
            "one stream slot required per block"
        );

        for (i, (block, stream)) in blocks.iter().zip(streams.iter_mut()).enumerate() {
            let Some(stream) = stream.as_mut() else {
                assert!(
                    block.is_zero_filled(),
                    "block {i} has no stream and is not marked zero filled"
                );
                continue;
            };
            let block_size = block
                .buffer()
                .map(|b| b.len() as u64)
                .unwrap_or_default();
            let expected = stripes_per_stream * block_size;
            let len = stream.seek(SeekFrom::End(0))?;
            if len != expected {
                return Err(Error::StreamLengthMismatch {
                    index: i,
                    len,
                    expected,
                });
            }
            stream.seek(SeekFrom::Start(0))?;
        }

        Ok(StripeDriver {
            blocks,
            streams,
            num_data,
            num_parity,
            stripes_per_stream,
            streams_need_reset: false,
        })
    }

    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Hand the streams back, consuming the driver.
    pub fn into_streams(self) -> Vec<Option<S>> {
        self.streams
    }

    fn reset_streams_if_needed(&mut self) -> Result<(), Error> {
        if self.streams_need_reset {
            for stream in self.streams.iter_mut().flatten() {
                stream.seek(SeekFrom::Start(0))?;
            }
        }
        self.streams_need_reset = true;
        Ok(())
    }

    /// Read every input block's next stripe and zero the buffers about to
    /// be computed.
    fn advance_pre(&mut self, needs_reading: &[bool], needs_writing: &[bool]) -> Result<(), Error> {
        for (i, block) in self.blocks.iter_mut().enumerate() {
            assert!(
                !(needs_reading[i] && needs_writing[i]),
                "block {i} marked for both reading and writing in the same stripe"
            );
            if needs_reading[i] {
                let stream = self.streams[i]
                    .as_mut()
                    .expect("readable block validated to have a stream");
                let buffer = block
                    .buffer_mut()
                    .expect("readable block validated to have a buffer");
                stream.read_exact(buffer.as_mut_slice())?;
            }
            if needs_writing[i] {
                block
                    .buffer_mut()
                    .expect("writable block validated to have a buffer")
                    .zero_fill();
            }
        }
        Ok(())
    }

    /// Write every computed buffer back to its stream.
    fn advance_post(&mut self, needs_writing: &[bool]) -> Result<(), Error> {
        for (i, block) in self.blocks.iter().enumerate() {
            if needs_writing[i] {
                let stream = self.streams[i]
                    .as_mut()
                    .expect("writable block validated to have a stream");
                stream.write_all(
                    block
                        .buffer()
                        .expect("writable block validated to have a buffer")
                        .as_slice(),
                )?;
            }
        }
        Ok(())
    }

    /// (Re)create the parity streams whose blocks are marked as needing
    /// generation. Every data block must be intact.
    ///
    /// # Errors
    ///
    /// Session setup errors from [`engine::begin_generate`], stream length
    /// problems as [`Error::Io`].
    ///
    /// # Panics
    ///
    /// Panics when a data block is not intact or a non-parity block is
    /// marked as needing generation.
    pub fn generate_parity(&mut self) -> Result<(), Error> {
        self.reset_streams_if_needed()?;
        let info = engine::begin_generate(self.num_data, self.num_parity, None)?;

        let needs_reading: Vec<bool> = self
            .blocks
            .iter()
            .map(|b| {
                b.is_data() && !b.is_zero_filled() && {
                    assert!(
                        b.is_intact(),
                        "all data blocks must be intact when generating parity"
                    );
                    true
                }
            })
            .collect();
        let needs_writing: Vec<bool> = self
            .blocks
            .iter()
            .map(|b| {
                b.needs_recovery() && {
                    assert!(
                        b.is_parity(),
                        "all data blocks must be intact when generating parity"
                    );
                    true
                }
            })
            .collect();

        debug!(
            stripes = self.stripes_per_stream,
            num_data = self.num_data,
            num_parity = self.num_parity,
            "generating parity across streams"
        );

        for _ in 0..self.stripes_per_stream {
            self.advance_pre(&needs_reading, &needs_writing)?;
            engine::generate_blocks(&mut self.blocks, &info);
            self.advance_post(&needs_writing)?;
        }
        Ok(())
    }

    /// Rebuild the streams whose blocks are marked as needing generation,
    /// data and parity alike, from the intact streams.
    ///
    /// # Errors
    ///
    /// [`Error::NotEnoughBlocks`] and the other session setup errors from
    /// [`engine::begin_recover`], stream problems as [`Error::Io`].
    pub fn recover(&mut self) -> Result<(), Error> {
        self.reset_streams_if_needed()?;

        let mut have = vec![false; self.num_data + self.num_parity];
        for block in &self.blocks {
            if block.is_intact() {
                have[block.index()] = true;
            }
        }
        let info = engine::begin_recover(&have, self.num_data, self.num_parity, None, true)?;

        let needs_reading: Vec<bool> = self
            .blocks
            .iter()
            .map(|b| !b.is_zero_filled() && info.is_block_needed_for_recovery(b.index()))
            .collect();
        let needs_writing: Vec<bool> = self.blocks.iter().map(Block::needs_recovery).collect();

        debug!(
            stripes = self.stripes_per_stream,
            num_data = self.num_data,
            num_parity = self.num_parity,
            "recovering streams"
        );

        for _ in 0..self.stripes_per_stream {
            self.advance_pre(&needs_reading, &needs_writing)?;
            engine::recover_blocks(&mut self.blocks, &info);
            self.advance_post(&needs_writing)?;
        }
        Ok(())
    }
}
