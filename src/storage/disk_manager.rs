//! Disk Manager - the file an index is saved to.
//!
//! An index lives in memory and is written out whole. The file is nothing
//! more than its blocks, each zero-padded to a full page, so block `N`
//! starts at byte `N × BLOCK_SIZE` and the block count is the file length
//! divided by the page size.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::trace;

use crate::common::config::{BLOCK_SIZE, MAX_BLOCKS};
use crate::common::{BlockId, Error, Result};
use crate::storage::Block;

/// Block-granular access to one index file.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Block 0 │ Block 1 │ Block 2 │  ...    │ Block N │
/// │ (meta)  │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Whole-index transfers go through [`write_blocks`](Self::write_blocks)
/// and [`read_blocks`](Self::read_blocks); the per-block calls exist for
/// inspecting or patching a single block.
///
/// Nothing is flushed until [`sync`](Self::sync) (which `write_blocks`
/// calls once at the end).
pub struct DiskManager {
    file: File,
    block_count: usize,
}

impl DiskManager {
    /// Create a new, empty index file.
    ///
    /// # Errors
    /// Fails if the file already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        Ok(Self { file, block_count: 0 })
    }

    /// Open an existing index file.
    ///
    /// # Errors
    /// Returns `Error::InvariantViolation` if the file length is not a whole
    /// number of blocks, or an I/O error if it cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let len = file.metadata()?.len();
        if len % BLOCK_SIZE as u64 != 0 {
            return Err(Error::InvariantViolation(format!(
                "index file is {} bytes, not a whole number of {}-byte blocks",
                len, BLOCK_SIZE
            )));
        }

        Ok(Self {
            file,
            block_count: (len / BLOCK_SIZE as u64) as usize,
        })
    }

    /// Open the index file at `path`, creating an empty one if missing.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Replace the file contents with `blocks`, in order, then sync.
    ///
    /// Blocks are only ever appended to an index, so the file may grow but
    /// never shrink.
    ///
    /// # Errors
    /// - `Error::InvariantViolation` if the file already holds more blocks
    /// - `Error::IndexFull` if there are more blocks than ids
    pub fn write_blocks<'a, I>(&mut self, blocks: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Block>,
        I::IntoIter: ExactSizeIterator,
    {
        let blocks = blocks.into_iter();
        let count = blocks.len();
        if count < self.block_count {
            return Err(Error::InvariantViolation(format!(
                "file holds {} blocks but only {} are being saved",
                self.block_count, count
            )));
        }
        if count > MAX_BLOCKS {
            return Err(Error::IndexFull);
        }

        self.file.set_len(Self::offset_of(count))?;
        self.file.seek(SeekFrom::Start(0))?;
        let mut out = BufWriter::new(&self.file);
        for block in blocks {
            out.write_all(&block.to_page())?;
        }
        out.flush()?;
        drop(out);

        self.block_count = count;
        self.sync()?;
        trace!(blocks = count, "wrote index file");
        Ok(())
    }

    /// Read every block, each a full `BLOCK_SIZE` bytes.
    pub fn read_blocks(&mut self) -> Result<Vec<Block>> {
        let mut bytes = Vec::with_capacity(self.file_size() as usize);
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_to_end(&mut bytes)?;

        Ok(bytes.chunks_exact(BLOCK_SIZE).map(Block::from_bytes).collect())
    }

    /// Read one block as a full `BLOCK_SIZE` page.
    ///
    /// # Errors
    /// Returns `Error::BlockNotFound` past the end of the file.
    pub fn read_block(&mut self, block_id: BlockId) -> Result<Block> {
        self.seek_to(block_id)?;
        let mut page = [0u8; BLOCK_SIZE];
        self.file.read_exact(&mut page)?;
        Ok(Block::from_bytes(&page))
    }

    /// Overwrite one existing block, zero-padding it to a full page.
    ///
    /// # Errors
    /// Returns `Error::BlockNotFound` past the end of the file.
    pub fn write_block(&mut self, block_id: BlockId, block: &Block) -> Result<()> {
        self.seek_to(block_id)?;
        self.file.write_all(&block.to_page())?;
        Ok(())
    }

    /// Append one zeroed block.
    ///
    /// # Errors
    /// Returns `Error::IndexFull` once every 2-byte block id is taken.
    pub fn allocate_block(&mut self) -> Result<BlockId> {
        if self.block_count >= MAX_BLOCKS {
            return Err(Error::IndexFull);
        }
        let block_id = BlockId::new(self.block_count as u16);
        self.file.set_len(Self::offset_of(self.block_count + 1))?;
        self.block_count += 1;
        Ok(block_id)
    }

    /// Flush all writes to stable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Size of the index file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        Self::offset_of(self.block_count)
    }

    fn seek_to(&mut self, block_id: BlockId) -> Result<()> {
        if block_id.index() >= self.block_count {
            return Err(Error::BlockNotFound(block_id.0));
        }
        self.file.seek(SeekFrom::Start(Self::offset_of(block_id.index())))?;
        Ok(())
    }

    #[inline]
    fn offset_of(blocks: usize) -> u64 {
        (blocks as u64) * (BLOCK_SIZE as u64)
    }
}

// ============================================================================
// TESTS
// ============================================================================
