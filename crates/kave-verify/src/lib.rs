//! Content digests for mirrored files.
//!
//! The manifest and the local checker must agree on one algorithm; this crate
//! fixes it to SHA3-512 and exposes it through the minimal [`Hasher`] trait so
//! the streaming paths stay algorithm-agnostic.
//!
//! # Example
//!
//! ```
//! use kave_verify::{Digest, Hasher, Sha3_512Hasher};
//!
//! let mut hasher = Sha3_512Hasher::new();
//! hasher.update(b"hello ");
//! hasher.update(b"world");
//! assert_eq!(Digest::from_bytes(&hasher.finalize()), Digest::of(b"hello world"));
//! ```

pub use self::digest::{DIGEST_HEX_LEN, Digest};
pub use self::error::{Result, VerifyError};
pub use self::file::{digest_file, digest_reader};
pub use self::hasher::{Hasher, Sha3_512Hasher};

mod digest;
mod error;
mod file;
mod hasher;
