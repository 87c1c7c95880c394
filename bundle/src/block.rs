//! Block records stored in bundles.
//!
//! Every variable-length field is prefixed with its length as a big-endian `u32`. Strings must be
//! valid UTF-8.

use crate::Error;
use bytes::{Buf, BufMut, Bytes};
use commonware_codec::{ReadExt, Write};
use std::mem::size_of;

/// Size of a length prefix.
const LEN_PREFIX: usize = 4;

/// Tag written before an absent [Filtering].
const UNFILTERED: u8 = 0;

/// Tag written before a present [Filtering].
const FILTERED: u8 = 1;

/// A block as stored in a bundle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    pub id: String,
    pub number: u64,
    pub previous_id: String,
    /// Milliseconds since the unix epoch.
    pub timestamp: u64,
    pub producer: String,
    pub transactions: Vec<Transaction>,
    /// Set once a filter has been applied to the block.
    pub filtering: Option<Filtering>,
}

/// A transaction included in a [Block].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transaction {
    pub id: String,
    pub actions: Vec<Action>,
}

/// A single contract invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Action {
    /// Contract executing the action.
    pub account: String,
    pub name: String,
    /// Accounts that authorized the action.
    pub authorization: Vec<String>,
    pub data: Bytes,
}

/// Record of the filter applied to a [Block].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filtering {
    pub include: String,
    pub exclude: String,
    /// Number of transactions before any filter was applied.
    pub unfiltered_transactions: u32,
    /// Number of actions before any filter was applied.
    pub unfiltered_actions: u32,
}

impl Block {
    /// Number of actions across all transactions.
    pub fn actions(&self) -> usize {
        self.transactions.iter().map(|tx| tx.actions.len()).sum()
    }

    /// Exact number of bytes written by [Write::write].
    pub fn encoded_len(&self) -> usize {
        str_len(&self.id)
            + size_of::<u64>()
            + str_len(&self.previous_id)
            + size_of::<u64>()
            + str_len(&self.producer)
            + LEN_PREFIX
            + self
                .transactions
                .iter()
                .map(Transaction::encoded_len)
                .sum::<usize>()
            + 1
            + self.filtering.as_ref().map_or(0, Filtering::encoded_len)
    }

    /// Read a block from `buf`, consuming exactly the bytes it occupies.
    pub fn read_from(buf: &mut impl Buf) -> Result<Self, Error> {
        let id = read_str(buf)?;
        let number = u64::read(buf)?;
        let previous_id = read_str(buf)?;
        let timestamp = u64::read(buf)?;
        let producer = read_str(buf)?;
        let count = read_len(buf)?;
        let mut transactions = Vec::with_capacity(count.min(buf.remaining()));
        for _ in 0..count {
            transactions.push(Transaction::read_from(buf)?);
        }
        let filtering = match u8::read(buf)? {
            UNFILTERED => None,
            FILTERED => Some(Filtering::read_from(buf)?),
            _ => return Err(Error::InvalidBlock("unknown filtering tag")),
        };
        Ok(Self {
            id,
            number,
            previous_id,
            timestamp,
            producer,
            transactions,
            filtering,
        })
    }
}

impl Write for Block {
    fn write(&self, buf: &mut impl BufMut) {
        write_str(&self.id, buf);
        self.number.write(buf);
        write_str(&self.previous_id, buf);
        self.timestamp.write(buf);
        write_str(&self.producer, buf);
        write_len(self.transactions.len(), buf);
        for tx in &self.transactions {
            tx.write(buf);
        }
        match &self.filtering {
            None => UNFILTERED.write(buf),
            Some(filtering) => {
                FILTERED.write(buf);
                filtering.write(buf);
            }
        }
    }
}

impl Transaction {
    fn encoded_len(&self) -> usize {
        str_len(&self.id)
            + LEN_PREFIX
            + self.actions.iter().map(Action::encoded_len).sum::<usize>()
    }

    fn read_from(buf: &mut impl Buf) -> Result<Self, Error> {
        let id = read_str(buf)?;
        let count = read_len(buf)?;
        let mut actions = Vec::with_capacity(count.min(buf.remaining()));
        for _ in 0..count {
            actions.push(Action::read_from(buf)?);
        }
        Ok(Self { id, actions })
    }
}

impl Write for Transaction {
    fn write(&self, buf: &mut impl BufMut) {
        write_str(&self.id, buf);
        write_len(self.actions.len(), buf);
        for action in &self.actions {
            action.write(buf);
        }
    }
}

impl Action {
    fn encoded_len(&self) -> usize {
        str_len(&self.account)
            + str_len(&self.name)
            + LEN_PREFIX
            + self.authorization.iter().map(|a| str_len(a)).sum::<usize>()
            + LEN_PREFIX
            + self.data.len()
    }

    fn read_from(buf: &mut impl Buf) -> Result<Self, Error> {
        let account = read_str(buf)?;
        let name = read_str(buf)?;
        let count = read_len(buf)?;
        let mut authorization = Vec::with_capacity(count.min(buf.remaining()));
        for _ in 0..count {
            authorization.push(read_str(buf)?);
        }
        let data = read_bytes(buf)?;
        Ok(Self {
            account,
            name,
            authorization,
            data,
        })
    }
}

impl Write for Action {
    fn write(&self, buf: &mut impl BufMut) {
        write_str(&self.account, buf);
        write_str(&self.name, buf);
        write_len(self.authorization.len(), buf);
        for authorization in &self.authorization {
            write_str(authorization, buf);
        }
        write_bytes(&self.data, buf);
    }
}

impl Filtering {
    fn encoded_len(&self) -> usize {
        str_len(&self.include) + str_len(&self.exclude) + 2 * size_of::<u32>()
    }

    fn read_from(buf: &mut impl Buf) -> Result<Self, Error> {
        Ok(Self {
            include: read_str(buf)?,
            exclude: read_str(buf)?,
            unfiltered_transactions: u32::read(buf)?,
            unfiltered_actions: u32::read(buf)?,
        })
    }
}

impl Write for Filtering {
    fn write(&self, buf: &mut impl BufMut) {
        write_str(&self.include, buf);
        write_str(&self.exclude, buf);
        self.unfiltered_transactions.write(buf);
        self.unfiltered_actions.write(buf);
    }
}

fn str_len(value: &str) -> usize {
    LEN_PREFIX + value.len()
}

fn write_len(len: usize, buf: &mut impl BufMut) {
    u32::try_from(len)
        .expect("length exceeds u32")
        .write(buf);
}

fn write_bytes(value: &[u8], buf: &mut impl BufMut) {
    write_len(value.len(), buf);
    buf.put_slice(value);
}

fn write_str(value: &str, buf: &mut impl BufMut) {
    write_bytes(value.as_bytes(), buf);
}

fn read_len(buf: &mut impl Buf) -> Result<usize, Error> {
    Ok(u32::read(buf)? as usize)
}

fn read_bytes(buf: &mut impl Buf) -> Result<Bytes, Error> {
    let len = read_len(buf)?;
    if buf.remaining() < len {
        return Err(Error::Codec(commonware_codec::Error::EndOfBuffer));
    }
    Ok(buf.copy_to_bytes(len))
}

fn read_str(buf: &mut impl Buf) -> Result<String, Error> {
    let bytes = read_bytes(buf)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| Error::InvalidBlock("string is not utf-8"))
}
