use bytes::Bytes;
use depot_storage::{ByteStream, StorageError, StorageResult};

/// Generate deterministic test data using a seeded pseudo-random generator.
pub fn seeded_bytes(seed: u64, len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    let mut state = seed;

    for chunk in data.chunks_mut(8) {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }

    Bytes::from(data)
}

/// Split `data` into a stream of `chunk_size` pieces.
#[allow(dead_code)]
pub fn byte_stream(data: Bytes, chunk_size: usize) -> ByteStream {
    let mut chunks: Vec<StorageResult<Bytes>> = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let end = (offset + chunk_size).min(data.len());
        chunks.push(Ok(data.slice(offset..end)));
        offset = end;
    }
    Box::pin(futures::stream::iter(chunks))
}

/// A stream that yields `good` bytes and then fails mid-transfer.
#[allow(dead_code)]
pub fn failing_stream(good: Bytes) -> ByteStream {
    Box::pin(futures::stream::iter(vec![
        Ok(good),
        Err(StorageError::Interrupted("connection reset".to_string())),
    ]))
}
