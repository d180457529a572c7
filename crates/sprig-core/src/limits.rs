//! Input limits for selector compilation and traversal

use crate::error::{Error, Result};

/// Maximum selector length (4KB)
pub const MAX_SELECTOR_LEN: usize = 4096;

/// Maximum nesting of `{...}` blocks (16)
pub const MAX_BLOCK_DEPTH: usize = 16;

/// Default ceiling on nodes visited by a single traversal (100000)
pub const MAX_TRAVERSAL_NODES: usize = 100_000;

/// Validate selector length
pub fn validate_selector(selector: &str) -> Result<()> {
    if selector.len() > MAX_SELECTOR_LEN {
        return Err(Error::SelectorTooLong {
            len: selector.len(),
            max: MAX_SELECTOR_LEN,
        });
    }
    Ok(())
}

/// Validate block nesting depth
pub fn validate_block_depth(depth: usize) -> Result<()> {
    if depth > MAX_BLOCK_DEPTH {
        return Err(Error::NestingTooDeep {
            depth,
            max: MAX_BLOCK_DEPTH,
        });
    }
    Ok(())
}
