use crate::Error;
use std::fmt;

/// Number of leading characters of a block id that encode its height.
const NUM_PREFIX: usize = 8;

/// Extract the height encoded in the prefix of a self-describing block id.
pub fn block_num(id: &str) -> Result<u64, Error> {
    let prefix = id
        .get(..NUM_PREFIX)
        .ok_or_else(|| Error::InvalidId(id.to_string()))?;
    u32::from_str_radix(prefix, 16)
        .map(u64::from)
        .map_err(|_| Error::InvalidId(id.to_string()))
}

/// Reference to a block by identifier and height.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockRef {
    id: String,
    num: u64,
}

impl BlockRef {
    /// Create a reference from an explicit id and height.
    pub fn new(id: impl Into<String>, num: u64) -> Self {
        Self { id: id.into(), num }
    }

    /// Create a reference from a self-describing id, deriving the height from its prefix.
    pub fn from_id(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        let num = block_num(&id)?;
        Ok(Self { id, num })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn num(&self) -> u64 {
        self.num
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.num, self.id)
    }
}

/// An entry of a persisted block index.
///
/// Several rows may share the same height when competing forks were observed. Only the id is
/// unique.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexRow {
    /// The indexed block.
    pub block: BlockRef,
    /// Identifier of the block's parent.
    pub previous_id: String,
    /// Whether the block is known to be final.
    pub irreversible: bool,
}

impl IndexRow {
    pub fn id(&self) -> &str {
        self.block.id()
    }

    pub fn num(&self) -> u64 {
        self.block.num()
    }
}
