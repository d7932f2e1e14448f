//! Pull-based decryption of an encrypted byte source.
//!
//! Ciphertext is pulled in fill cycles. A cycle that fills the work buffer
//! decrypts everything except its last block, which is carried into the next
//! cycle: only when the source runs dry do we know which block is the final
//! one and therefore which one carries padding.

use std::io::{self, Read};
use std::mem;

use tracing::{debug, trace, warn};

use crate::{BlockTransform, DecryptError};

/// Default number of cipher blocks decrypted per fill cycle
pub const DEFAULT_BLOCKS_PER_FILL: usize = 256;

/// Tuning for [`DecryptingReader`]
#[derive(Debug, Clone)]
pub struct DecryptConfig {
    /// Blocks per fill cycle. The work buffers hold two more.
    pub blocks_per_fill: usize,
}

impl Default for DecryptConfig {
    fn default() -> Self {
        Self {
            blocks_per_fill: DEFAULT_BLOCKS_PER_FILL,
        }
    }
}

/// A work buffer that is wiped when dropped
struct WorkBuffer(Vec<u8>);

impl Drop for WorkBuffer {
    fn drop(&mut self) {
        self.0.fill(0);
    }
}

/// Wraps a ciphertext source and yields plaintext.
pub struct DecryptingReader<R, T> {
    source: R,
    transform: T,
    block_size: usize,
    ciphertext: WorkBuffer,
    plaintext: WorkBuffer,
    /// Ciphertext carried over from the previous cycle
    carry: usize,
    read_offset: usize,
    available: usize,
    finished: bool,
    /// Set by a failed decryption; every later read reports it again
    failed: Option<DecryptError>,
    produced: u64,
}

impl<R: Read, T: BlockTransform> DecryptingReader<R, T> {
    /// Wraps `source` with the default fill size
    pub fn new(source: R, transform: T) -> Self {
        Self::with_config(source, transform, &DecryptConfig::default())
    }

    /// Wraps `source`, sizing the work buffers from `config`
    pub fn with_config(source: R, transform: T, config: &DecryptConfig) -> Self {
        let block_size = transform.block_size().max(1);
        let capacity = block_size * (config.blocks_per_fill.max(1) + 2);

        Self {
            source,
            transform,
            block_size,
            ciphertext: WorkBuffer(vec![0; capacity]),
            plaintext: WorkBuffer(vec![0; capacity]),
            carry: 0,
            read_offset: 0,
            available: 0,
            finished: false,
            failed: None,
            produced: 0,
        }
    }

    /// Plaintext bytes handed out so far
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// True once the final block has been decrypted
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The wrapped source
    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Gives the source back. Undelivered plaintext is discarded.
    pub fn into_inner(self) -> R {
        self.source
    }

    fn fill(&mut self) -> io::Result<()> {
        let capacity = self.ciphertext.0.len();
        let mut filled = self.carry;

        while filled < capacity {
            match self.source.read(&mut self.ciphertext.0[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // Keep what was read so a retry resumes from here.
                    self.carry = filled;
                    return Err(e);
                }
            }
        }

        self.read_offset = 0;

        if filled == capacity {
            let interior = capacity - self.block_size;
            self.plaintext.0[..self.block_size]
                .copy_from_slice(&self.ciphertext.0[interior..capacity]);
            if let Err(e) = self
                .transform
                .transform_blocks(&mut self.ciphertext.0[..interior])
            {
                warn!(ciphertext = interior, error = %e, "block decryption failed");
                return Err(self.fail(e));
            }

            mem::swap(&mut self.ciphertext, &mut self.plaintext);
            self.carry = self.block_size;
            self.available = interior;
            trace!(bytes = interior, "decrypted interior blocks");
            return Ok(());
        }

        self.finished = true;
        self.carry = 0;

        if filled == 0 {
            self.available = 0;
            debug!(total = self.produced, "encrypted stream ended");
            return Ok(());
        }

        let length = match self.transform.transform_final(&mut self.ciphertext.0[..filled]) {
            Ok(length) => length,
            Err(e) => {
                warn!(ciphertext = filled, error = %e, "final block decryption failed");
                return Err(self.fail(e));
            }
        };

        mem::swap(&mut self.ciphertext, &mut self.plaintext);
        self.available = length;
        debug!(
            total = self.produced + length as u64,
            "decrypted final block"
        );
        Ok(())
    }

    fn fail(&mut self, error: DecryptError) -> io::Error {
        self.carry = 0;
        self.read_offset = 0;
        self.available = 0;
        self.failed = Some(error.clone());
        into_io(error)
    }
}

impl<R: Read, T: BlockTransform> Read for DecryptingReader<R, T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if let Some(error) = &self.failed {
            return Err(into_io(error.clone()));
        }

        while self.read_offset == self.available {
            if self.finished {
                return Ok(0);
            }
            self.fill()?;
        }

        let count = buf.len().min(self.available - self.read_offset);
        buf[..count].copy_from_slice(&self.plaintext.0[self.read_offset..self.read_offset + count]);
        self.read_offset += count;
        self.produced += count as u64;
        Ok(count)
    }
}

fn into_io(error: DecryptError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Aes128CbcTransform;
    use crate::test_support::encrypt;

    const KEY: [u8; 16] = [0x2B; 16];
    const IV: [u8; 16] = *b"initializationiv";

    /// Hands out at most `step` bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let count = buf.len().min(self.step).min(self.data.len());
            buf[..count].copy_from_slice(&self.data[..count]);
            self.data = &self.data[count..];
            Ok(count)
        }
    }

    fn reader<'a>(
        ciphertext: &'a [u8],
        step: usize,
        blocks_per_fill: usize,
    ) -> DecryptingReader<Trickle<'a>, Aes128CbcTransform> {
        DecryptingReader::with_config(
            Trickle {
                data: ciphertext,
                step,
            },
            Aes128CbcTransform::new(&KEY, &IV).unwrap(),
            &DecryptConfig { blocks_per_fill },
        )
    }

    fn read_in_chunks<R: Read>(reader: &mut R, chunk: usize) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; chunk];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    #[test]
    fn test_rechunking_reproduces_plaintext() {
        for length in [1usize, 15, 16, 17, 31, 32, 33, 47, 48, 200, 1000] {
            let plaintext: Vec<u8> = (0..length).map(|i| (i * 31 % 251) as u8).collect();
            let ciphertext = encrypt(&KEY, &IV, &plaintext);

            for blocks_per_fill in [1, 2, 5, 256] {
                for step in [1, 7, 16, 1024] {
                    for chunk in [1, 3, 16, 50, 4096] {
                        let mut reader = reader(&ciphertext, step, blocks_per_fill);
                        let out = read_in_chunks(&mut reader, chunk).unwrap();
                        assert_eq!(
                            out, plaintext,
                            "length {length} blocks {blocks_per_fill} step {step} chunk {chunk}"
                        );
                        assert!(reader.is_finished());
                        assert_eq!(reader.produced(), length as u64);
                    }
                }
            }
        }
    }

    #[test]
    fn test_empty_source_is_end_of_stream() {
        let mut reader = reader(&[], 16, 4);
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert!(reader.is_finished());
    }

    #[test]
    fn test_exact_buffer_multiple_keeps_padding_for_final() {
        // 3 blocks of plaintext pad to 4 blocks, exactly one full cycle of
        // a 2 block configuration.
        let plaintext = vec![0xA5u8; 48];
        let ciphertext = encrypt(&KEY, &IV, &plaintext);
        assert_eq!(ciphertext.len(), 64);

        let mut reader = reader(&ciphertext, 64, 2);
        assert_eq!(read_in_chunks(&mut reader, 64).unwrap(), plaintext);
    }

    #[test]
    fn test_misaligned_ciphertext_is_fatal() {
        let mut ciphertext = encrypt(&KEY, &IV, b"0123456789");
        ciphertext.push(0);

        let mut reader = reader(&ciphertext, 16, 4);
        let err = read_in_chunks(&mut reader, 16).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        let inner = err
            .get_ref()
            .and_then(|e| e.downcast_ref::<DecryptError>())
            .cloned();
        assert_eq!(inner, Some(DecryptError::MisalignedFinalBlock(17)));
    }

    fn decrypt_error(err: &io::Error) -> Option<DecryptError> {
        err.get_ref()
            .and_then(|e| e.downcast_ref::<DecryptError>())
            .cloned()
    }

    #[test]
    fn test_failure_is_reported_on_every_read() {
        let mut ciphertext = encrypt(&KEY, &IV, b"0123456789");
        ciphertext.push(0);

        let mut reader = reader(&ciphertext, 16, 4);
        let mut buf = [0u8; 16];
        for _ in 0..3 {
            let err = reader.read(&mut buf).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidData);
            assert_eq!(
                decrypt_error(&err),
                Some(DecryptError::MisalignedFinalBlock(17))
            );
        }
    }

    /// Fails every interior block, like a transform that lost its state.
    struct Broken;

    impl BlockTransform for Broken {
        fn block_size(&self) -> usize {
            16
        }

        fn transform_blocks(&mut self, _data: &mut [u8]) -> crate::Result<()> {
            Err(DecryptError::Finished)
        }

        fn transform_final(&mut self, data: &mut [u8]) -> crate::Result<usize> {
            Ok(data.len())
        }
    }

    #[test]
    fn test_interior_failure_poisons_reader() {
        let ciphertext = vec![0u8; 16 * 8];
        let mut reader = DecryptingReader::with_config(
            &ciphertext[..],
            Broken,
            &DecryptConfig { blocks_per_fill: 1 },
        );

        let mut buf = [0u8; 64];
        let first = reader.read(&mut buf).unwrap_err();
        assert_eq!(decrypt_error(&first), Some(DecryptError::Finished));
        let second = reader.read(&mut buf).unwrap_err();
        assert_eq!(decrypt_error(&second), Some(DecryptError::Finished));
        assert_eq!(reader.produced(), 0);
    }

    /// Fails once with a transient error after handing out `before` bytes.
    struct Flaky<'a> {
        data: &'a [u8],
        before: usize,
        failed: bool,
    }

    impl Read for Flaky<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.before == 0 && !self.failed {
                self.failed = true;
                return Err(io::Error::new(io::ErrorKind::TimedOut, "stalled"));
            }
            let limit = if self.failed { buf.len() } else { self.before };
            let count = buf.len().min(limit).min(self.data.len());
            buf[..count].copy_from_slice(&self.data[..count]);
            self.data = &self.data[count..];
            self.before -= count.min(self.before);
            Ok(count)
        }
    }

    #[test]
    fn test_source_error_keeps_partial_ciphertext() {
        let plaintext: Vec<u8> = (0..90u8).collect();
        let ciphertext = encrypt(&KEY, &IV, &plaintext);
        let source = Flaky {
            data: &ciphertext,
            before: 21,
            failed: false,
        };
        let mut reader = DecryptingReader::with_config(
            source,
            Aes128CbcTransform::new(&KEY, &IV).unwrap(),
            &DecryptConfig { blocks_per_fill: 8 },
        );

        let mut buf = [0u8; 128];
        let err = reader.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert_eq!(read_in_chunks(&mut reader, 128).unwrap(), plaintext);
    }

    #[test]
    fn test_corrupt_padding_is_fatal() {
        let plaintext = vec![1u8; 100];
        let mut ciphertext = encrypt(&KEY, &IV, &plaintext);
        let last = ciphertext.len() - 17;
        ciphertext[last] ^= 0x55;

        let mut reader = reader(&ciphertext, 1024, 1);
        let err = read_in_chunks(&mut reader, 1024).unwrap_err();
        let inner = err
            .get_ref()
            .and_then(|e| e.downcast_ref::<DecryptError>())
            .cloned();
        assert_eq!(inner, Some(DecryptError::Padding));
    }

    #[test]
    fn test_into_inner_returns_source() {
        let ciphertext = encrypt(&KEY, &IV, b"abc");
        let mut reader = reader(&ciphertext, 4, 1);
        let mut buf = [0u8; 1];
        assert_eq!(reader.read(&mut buf).unwrap(), 1);
        assert_eq!(&buf, b"a");
        assert_eq!(reader.get_ref().step, 4);
        let source = reader.into_inner();
        assert!(source.data.is_empty());
    }
}
