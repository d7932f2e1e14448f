use aes::Aes128;
use cipher::{BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};

/// AES-128-CBC + PKCS#7, the way a packager writes an encrypted segment.
pub(crate) fn encrypt(key: &[u8; 16], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0u8; plaintext.len() + 16];
    buffer[..plaintext.len()].copy_from_slice(plaintext);
    let len = cbc::Encryptor::<Aes128>::new(key.into(), iv.into())
        .encrypt_padded_mut::<Pkcs7>(&mut buffer, plaintext.len())
        .unwrap()
        .len();
    buffer.truncate(len);
    buffer
}
