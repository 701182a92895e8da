//! Hashing port - one-way password digests

use crate::domain::result::Result;

/// Password hashing capability
///
/// Implementations produce a salted, self-describing digest and can later
/// check a plaintext against it. A failure to produce a digest must surface as
/// `Error::HashingFailure`.
pub trait PasswordHasher: Send + Sync {
    /// Produce a digest for a plaintext secret
    fn hash(&self, password: &str) -> Result<String>;

    /// Report whether `password` matches a digest produced by `hash`
    ///
    /// A malformed digest is treated as a mismatch.
    fn verify(&self, password: &str, digest: &str) -> bool;
}
