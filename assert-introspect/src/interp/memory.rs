//! Byte memory behind pointers
//!
//! Every string literal, array and address-taken variable owns a block.
//! Blocks never move; each one gets a distinct base so pointers can be
//! printed and compared as numbers.

use super::error::{InterpResult, RuntimeError};
use super::value::{Address, Region};

/// First block base, so no valid pointer prints as zero
const BASE: u64 = 0x1000;
const ALIGN: u64 = 16;

#[derive(Debug)]
struct Block {
    bytes: Vec<u8>,
    base: u64,
    read_only: bool,
}

#[derive(Debug)]
pub struct Memory {
    blocks: Vec<Block>,
    next_base: u64,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            next_base: BASE,
        }
    }

    /// Allocate a block holding `bytes`
    pub fn alloc(&mut self, bytes: Vec<u8>, read_only: bool) -> Address {
        let base = self.next_base;
        let span = (bytes.len() as u64).max(1);
        self.next_base = (base + span).div_ceil(ALIGN) * ALIGN;
        self.blocks.push(Block { bytes, base, read_only });
        Address::block(self.blocks.len() - 1)
    }

    /// A read-only, NUL-terminated copy of `text`
    pub fn alloc_str(&mut self, text: &str) -> Address {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        self.alloc(bytes, true)
    }

    /// The address as a number, as `%p` shows it
    pub fn numeric(&self, addr: Address) -> u64 {
        match addr.region {
            Region::Null => addr.offset as u64,
            Region::Block(b) => self.blocks.get(b).map_or(0, |block| block.base).wrapping_add(addr.offset as u64),
        }
    }

    fn locate(&self, addr: Address, action: &str) -> InterpResult<(&Block, usize)> {
        let Region::Block(b) = addr.region else {
            return Err(RuntimeError::invalid_pointer(action));
        };
        let block = self.blocks.get(b).ok_or_else(|| RuntimeError::invalid_pointer(action))?;
        let offset = usize::try_from(addr.offset).map_err(|_| RuntimeError::invalid_pointer(action))?;
        if offset > block.bytes.len() {
            return Err(RuntimeError::invalid_pointer(action));
        }
        Ok((block, offset))
    }

    /// Bytes from `addr` up to, not including, the terminating NUL
    pub fn read_cstr(&self, addr: Address) -> InterpResult<Vec<u8>> {
        let (block, offset) = self.locate(addr, "read a string")?;
        let rest = &block.bytes[offset..];
        match rest.iter().position(|b| *b == 0) {
            Some(end) => Ok(rest[..end].to_vec()),
            None => Err(RuntimeError::invalid_pointer("read an unterminated string")),
        }
    }

    /// Copy `bytes` to `addr`
    pub fn write(&mut self, addr: Address, bytes: &[u8]) -> InterpResult<()> {
        let (block, offset) = self.locate(addr, "write")?;
        if block.read_only || offset + bytes.len() > block.bytes.len() {
            return Err(RuntimeError::invalid_pointer("write"));
        }
        let Region::Block(b) = addr.region else {
            return Err(RuntimeError::invalid_pointer("write"));
        };
        self.blocks[b].bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}
