use std::{
    fs::File,
    io::{self, Read},
    path::Path,
};

use sealed_core::ContentDigest;
use sha2::{Digest, Sha256};

/// Read size for streaming a file through the hasher.
pub const CHUNK_SIZE: usize = 4096;

/// SHA-256 of a file's contents, streamed in fixed-size chunks so memory stays bounded.
pub fn digest_file(path: &Path) -> io::Result<ContentDigest> {
    let mut file = File::open(path)?;
    digest_reader(&mut file)
}

fn digest_reader<R: Read>(reader: &mut R) -> io::Result<ContentDigest> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        hasher.update(&buf[..n]);
    }
    Ok(ContentDigest::from_bytes(hasher.finalize().into()))
}

pub fn digest_bytes(data: &[u8]) -> ContentDigest {
    ContentDigest::from_bytes(Sha256::digest(data).into())
}
