//! Transport limits
//!
//! Every bound a marshaller has to honour comes from here, so code above the
//! ABI never hard-codes register counts or console sizes.

use crate::{MSG_MAX_BYTES, UTCB_GENERIC_DATA_SIZE, VCON_WRITE_SIZE};

/// Transport-defined limits a marshaller has to honour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Message registers per IPC
    pub max_words: usize,
    /// Payload bytes per IPC
    pub max_bytes: usize,
    /// Bytes per console write
    pub vcon_write_size: usize,
}

impl Limits {
    /// Limits of the kernel this crate was built for
    pub const fn current() -> Self {
        Self {
            max_words: UTCB_GENERIC_DATA_SIZE,
            max_bytes: MSG_MAX_BYTES,
            vcon_write_size: VCON_WRITE_SIZE,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_match_constants() {
        let limits = Limits::current();
        assert_eq!(limits.max_words, 63);
        assert_eq!(limits.max_bytes, limits.max_words * crate::WORD_BYTES);
        assert!(limits.vcon_write_size < limits.max_bytes);
        assert_eq!(Limits::default(), limits);
    }
}
