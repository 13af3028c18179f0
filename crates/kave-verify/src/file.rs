use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::Path;

use crate::digest::Digest;
use crate::error::{Result, VerifyError};
use crate::hasher::{Hasher, Sha3_512Hasher};

const BUF_SIZE: usize = 64 * 1024;

/// Hash everything `reader` yields.
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<Digest> {
    let mut hasher = Sha3_512Hasher::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(Digest::from_bytes(&hasher.finalize()))
}

/// Digest of the file at `path`.
///
/// `Ok(None)` when nothing is there or the path is a directory; directories
/// are never hashed.
pub fn digest_file(path: impl AsRef<Path>) -> Result<Option<Digest>> {
    let path = path.as_ref();
    let io_err = |source| VerifyError::Io {
        path: path.to_path_buf(),
        source,
    };

    match path.metadata() {
        Ok(m) if m.is_dir() => return Ok(None),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(e)),
    }

    let file = File::open(path).map_err(io_err)?;
    digest_reader(file).map(Some).map_err(io_err)
}
