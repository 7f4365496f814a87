// SPDX-License-Identifier: GPL-3.0-only
//! EDID retrieval by chained block reads.
//!
//! The device only exposes 128-byte DDC reads at a given offset, so the
//! full EDID is assembled block by block. Block 0 announces how many
//! extension blocks follow at byte 0x7E; each extension is read in turn.
//! A short read of a later block ends the data (the count can overstate
//! what the display actually serves), but a short first block means no
//! display data at all and is a hard failure.

use std::io;
use std::path::Path;

use crate::error::{Result, TvError};

/// Size of one EDID block on the wire.
pub const EDID_BLOCK_SIZE: usize = 128;

/// Offset of the extension count within block 0.
pub const EXTENSION_COUNT_OFFSET: usize = 0x7e;

/// Interface for the raw block reads the assembly is built on.
/// Implemented by the client.
pub trait BlockReader {
    /// Read up to `length` bytes at `offset`. Fewer bytes than requested
    /// (including zero) means the data ends before `offset + length`.
    fn ddc_read(&self, offset: u32, length: u32) -> Result<Vec<u8>>;
}

/// A complete EDID: always a positive multiple of 128 bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdidBuffer {
    bytes: Vec<u8>,
}

impl EdidBuffer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of 128-byte blocks actually read.
    pub fn block_count(&self) -> usize {
        self.bytes.len() / EDID_BLOCK_SIZE
    }

    /// Extension count announced by block 0. May exceed
    /// `block_count() - 1` when later reads came up short.
    pub fn announced_extensions(&self) -> u8 {
        self.bytes[EXTENSION_COUNT_OFFSET]
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, &self.bytes)
    }
}

/// Read the full EDID from `reader`.
pub fn read_edid<R: BlockReader>(reader: &R) -> Result<EdidBuffer> {
    let first = reader.ddc_read(0, EDID_BLOCK_SIZE as u32)?;
    if first.len() < EDID_BLOCK_SIZE {
        return Err(TvError::EdidShortFirstBlock { got: first.len() });
    }

    let extensions = first[EXTENSION_COUNT_OFFSET];
    let mut bytes = first;
    bytes.truncate(EDID_BLOCK_SIZE);

    for block in 1..=u32::from(extensions) {
        let offset = block * EDID_BLOCK_SIZE as u32;
        let chunk = reader.ddc_read(offset, EDID_BLOCK_SIZE as u32)?;
        if chunk.len() < EDID_BLOCK_SIZE {
            debug!(
                "EDID ends early: block {block} returned {} of {EDID_BLOCK_SIZE} bytes",
                chunk.len()
            );
            break;
        }
        bytes.extend_from_slice(&chunk[..EDID_BLOCK_SIZE]);
    }

    Ok(EdidBuffer { bytes })
}
