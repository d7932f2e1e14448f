use std::fmt;

use aes::Aes128;
use cipher::generic_array::GenericArray;
use cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};

use crate::{DecryptError, Result};

type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// AES block size in bytes
pub const AES_BLOCK_SIZE: usize = 16;

/// A block cipher decryptor as seen by [`DecryptingReader`](crate::DecryptingReader).
///
/// Interior calls receive whole blocks and keep chaining state; the final
/// call receives the last blocks of the stream and removes the padding.
pub trait BlockTransform {
    /// Size of one input block in bytes
    fn block_size(&self) -> usize;

    /// Decrypts whole blocks in place. More ciphertext follows.
    fn transform_blocks(&mut self, data: &mut [u8]) -> Result<()>;

    /// Decrypts the last blocks in place, strips the padding and returns
    /// the plaintext length.
    fn transform_final(&mut self, data: &mut [u8]) -> Result<usize>;
}

impl<T: BlockTransform + ?Sized> BlockTransform for Box<T> {
    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    fn transform_blocks(&mut self, data: &mut [u8]) -> Result<()> {
        (**self).transform_blocks(data)
    }

    fn transform_final(&mut self, data: &mut [u8]) -> Result<usize> {
        (**self).transform_final(data)
    }
}

/// AES-128-CBC with PKCS#7 padding, the `METHOD=AES-128` of HLS
pub struct Aes128CbcTransform {
    decryptor: Option<Aes128CbcDec>,
}

impl Aes128CbcTransform {
    /// Creates a decryptor from a 16 byte key and IV
    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self> {
        if key.len() != AES_BLOCK_SIZE {
            return Err(DecryptError::InvalidKeyLength(key.len()));
        }
        if iv.len() != AES_BLOCK_SIZE {
            return Err(DecryptError::InvalidIvLength(iv.len()));
        }

        let decryptor = Aes128CbcDec::new_from_slices(key, iv)
            .map_err(|_| DecryptError::InvalidKeyLength(key.len()))?;

        Ok(Self {
            decryptor: Some(decryptor),
        })
    }

    fn decryptor(&mut self) -> Result<&mut Aes128CbcDec> {
        self.decryptor.as_mut().ok_or(DecryptError::Finished)
    }
}

impl fmt::Debug for Aes128CbcTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aes128CbcTransform")
            .field("finished", &self.decryptor.is_none())
            .finish_non_exhaustive()
    }
}

impl BlockTransform for Aes128CbcTransform {
    fn block_size(&self) -> usize {
        AES_BLOCK_SIZE
    }

    fn transform_blocks(&mut self, data: &mut [u8]) -> Result<()> {
        if data.len() % AES_BLOCK_SIZE != 0 {
            return Err(DecryptError::MisalignedBlocks(data.len()));
        }

        let decryptor = self.decryptor()?;
        for block in data.chunks_exact_mut(AES_BLOCK_SIZE) {
            decryptor.decrypt_block_mut(GenericArray::from_mut_slice(block));
        }
        Ok(())
    }

    fn transform_final(&mut self, data: &mut [u8]) -> Result<usize> {
        if data.is_empty() || data.len() % AES_BLOCK_SIZE != 0 {
            return Err(DecryptError::MisalignedFinalBlock(data.len()));
        }

        let decryptor = self.decryptor.take().ok_or(DecryptError::Finished)?;
        decryptor
            .decrypt_padded_mut::<Pkcs7>(data)
            .map(|plaintext| plaintext.len())
            .map_err(|_| DecryptError::Padding)
    }
}
