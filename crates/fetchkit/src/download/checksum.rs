//! Checksum accumulation and verification for downloaded bytes

use std::fmt;

use sha2::digest::DynDigest;

use super::error::{DownloadError, Result};

/// Accumulates a running digest over every byte written to the temp file and
/// compares the final hex digest against the expected value. The hash is fed
/// from the copy loop, not from a second read of the file.
pub(crate) struct ChecksumVerifier {
    hasher: Box<dyn DynDigest + Send>,
    expected: String,
}

impl ChecksumVerifier {
    pub(crate) fn new(hasher: Box<dyn DynDigest + Send>, expected: String) -> Self {
        Self { hasher, expected }
    }

    pub(crate) fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Consumes the verifier and checks the accumulated digest.
    pub(crate) fn verify(mut self) -> Result<()> {
        let actual = hex::encode(self.hasher.finalize_reset());
        if actual != self.expected {
            return Err(DownloadError::ChecksumMismatch {
                expected: self.expected,
                actual,
            });
        }

        Ok(())
    }
}

impl fmt::Debug for ChecksumVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChecksumVerifier")
            .field("expected", &self.expected)
            .finish_non_exhaustive()
    }
}
