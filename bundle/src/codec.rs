//! Frame blocks into bundle bodies.
//!
//! A bundle body starts with an 8 byte header (`dbin`, a version byte, and the `BLK` content
//! type) followed by a sequence of blocks, each prefixed with its encoded length as a big-endian
//! `u32`. A body that ends right after the header is a valid, empty bundle.

use crate::{pipe, Block, Error};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use commonware_codec::Write;
use futures::{Stream, StreamExt};

/// Magic bytes opening every bundle.
pub const MAGIC: &[u8; 4] = b"dbin";

/// Version of the framing.
pub const VERSION: u8 = 1;

/// Content type of framed records.
pub const CONTENT_TYPE: &[u8; 3] = b"BLK";

const HEADER_LEN: usize = MAGIC.len() + 1 + CONTENT_TYPE.len();

const LEN_PREFIX: usize = 4;

fn header(buf: &mut impl BufMut) {
    buf.put_slice(MAGIC);
    buf.put_u8(VERSION);
    buf.put_slice(CONTENT_TYPE);
}

/// Encode a complete bundle body in memory.
pub fn encode(blocks: &[Block]) -> Bytes {
    let mut buf = BytesMut::new();
    header(&mut buf);
    for block in blocks {
        frame(block, &mut buf);
    }
    buf.freeze()
}

fn frame(block: &Block, buf: &mut BytesMut) {
    let len = block.encoded_len();
    buf.reserve(LEN_PREFIX + len);
    buf.put_u32(len as u32);
    block.write(buf);
}

/// Lazily decodes blocks from a stream of bundle chunks.
///
/// Chunk boundaries are arbitrary: a block may span any number of chunks.
pub struct Decoder<R> {
    reader: R,
    buffer: BytesMut,
    header: bool,
    max_block_size: usize,
}

impl<R: Stream<Item = Result<Bytes, Error>> + Unpin> Decoder<R> {
    /// Create a decoder that rejects blocks larger than `max_block_size` bytes.
    pub fn new(reader: R, max_block_size: usize) -> Self {
        Self {
            reader,
            buffer: BytesMut::new(),
            header: false,
            max_block_size,
        }
    }

    /// Decode the next block, or `None` once the body ends on a frame boundary.
    pub async fn next(&mut self) -> Result<Option<Block>, Error> {
        if !self.header {
            if !self.fill(HEADER_LEN).await? {
                return Err(Error::Truncated);
            }
            if &self.buffer[..MAGIC.len()] != MAGIC
                || self.buffer[MAGIC.len()] != VERSION
                || &self.buffer[MAGIC.len() + 1..HEADER_LEN] != CONTENT_TYPE
            {
                return Err(Error::InvalidHeader);
            }
            self.buffer.advance(HEADER_LEN);
            self.header = true;
        }

        if !self.fill(LEN_PREFIX).await? {
            if self.buffer.is_empty() {
                return Ok(None);
            }
            return Err(Error::Truncated);
        }
        let mut prefix = [0u8; LEN_PREFIX];
        prefix.copy_from_slice(&self.buffer[..LEN_PREFIX]);
        let len = u32::from_be_bytes(prefix) as usize;
        if len > self.max_block_size {
            return Err(Error::BlockTooLarge(len));
        }
        if !self.fill(LEN_PREFIX + len).await? {
            return Err(Error::Truncated);
        }
        self.buffer.advance(LEN_PREFIX);
        let mut record = self.buffer.split_to(len).freeze();
        let block = Block::read_from(&mut record)?;
        if record.has_remaining() {
            return Err(Error::InvalidBlock("trailing bytes in record"));
        }
        Ok(Some(block))
    }

    /// Buffer at least `len` bytes, returning false if the stream ends first.
    async fn fill(&mut self, len: usize) -> Result<bool, Error> {
        while self.buffer.len() < len {
            match self.reader.next().await {
                Some(chunk) => self.buffer.extend_from_slice(&chunk?),
                None => return Ok(false),
            }
        }
        Ok(true)
    }
}

/// Encodes blocks into a [pipe::Writer], flushing whenever `flush_threshold` bytes are buffered.
pub struct Encoder {
    writer: pipe::Writer,
    buffer: BytesMut,
    flush_threshold: usize,
}

impl Encoder {
    pub fn new(writer: pipe::Writer, flush_threshold: usize) -> Self {
        let mut buffer = BytesMut::with_capacity(flush_threshold);
        header(&mut buffer);
        Self {
            writer,
            buffer,
            flush_threshold,
        }
    }

    pub async fn encode(&mut self, block: &Block) -> Result<(), Error> {
        let len = block.encoded_len();
        if u32::try_from(len).is_err() {
            return Err(Error::BlockTooLarge(len));
        }
        frame(block, &mut self.buffer);
        if self.buffer.len() >= self.flush_threshold {
            self.flush().await?;
        }
        Ok(())
    }

    /// Flush buffered bytes and mark the end of the body.
    ///
    /// Dropping an [Encoder] without calling this aborts the body.
    pub async fn finish(mut self) -> Result<(), Error> {
        self.flush().await?;
        self.writer.close().await
    }

    async fn flush(&mut self) -> Result<(), Error> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = self.buffer.split().freeze();
        self.writer.write(chunk).await
    }
}
