//! Streaming checksum computation
//!
//! Both domains render leaf checksums as `sha2:<hex>` so the diff engine and
//! the post-copy verification compare like against like. The prefix names the
//! algorithm the way the remote store tags its catalog checksums.

use sha2::{Digest, Sha256};
use tidesync_types::Result;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Chunk size for streamed hashing and copies
pub const CHUNK_SIZE: usize = 128 * 1024;

/// Prefix identifying the checksum algorithm
pub const CHECKSUM_PREFIX: &str = "sha2:";

/// Hash an async byte stream to completion
pub async fn checksum_reader<R>(mut reader: R) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(render_digest(&hasher.finalize()))
}

/// Hash an in-memory byte slice
pub fn checksum_bytes(bytes: &[u8]) -> String {
    render_digest(&Sha256::digest(bytes))
}

fn render_digest(digest: &[u8]) -> String {
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("{CHECKSUM_PREFIX}{hex}")
}
