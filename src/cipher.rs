use std::str::FromStr;

use openssl::symm::{Cipher as SslCipher, Crypter, Mode};

use crate::error::{Error as PkiError, ErrorKind, PkiResult};

/// Indicate the algorithm protecting the private section of an OpenSSH v1
/// key container
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(non_camel_case_types)]
#[non_exhaustive]
pub enum Cipher {
    Aes128_Cbc,
    Aes192_Cbc,
    Aes256_Cbc,
    Aes128_Ctr,
    Aes192_Ctr,
    Aes256_Ctr,
    TDes_Cbc,
    Null,
}

impl Cipher {
    /// Encrypt the data
    ///
    /// Mostly used by the container serializer; the input is expected to be
    /// padded to the block size already.
    pub fn encrypt(self, src: &[u8], key: &[u8], iv: &[u8]) -> PkiResult<Vec<u8>> {
        if self.is_null() {
            return Ok(src.to_vec());
        }
        self.crypt(Mode::Encrypt, src, key, iv)
    }

    /// Decrypt the data
    pub fn decrypt(self, src: &[u8], key: &[u8], iv: &[u8]) -> PkiResult<Vec<u8>> {
        if self.is_null() {
            return Ok(src.to_vec());
        }
        self.crypt(Mode::Decrypt, src, key, iv)
    }

    fn crypt(self, mode: Mode, src: &[u8], key: &[u8], iv: &[u8]) -> PkiResult<Vec<u8>> {
        let cipher = self.ssl_cipher();
        let mut crypter = Crypter::new(cipher, mode, key, Some(iv))?;
        // The container carries its own 1,2,3... padding
        crypter.pad(false);
        let mut buf = vec![0; src.len() + cipher.block_size()];
        let mut n = crypter.update(src, &mut buf)?;
        n += crypter.finalize(&mut buf[n..])?;
        buf.truncate(n);
        Ok(buf)
    }

    fn ssl_cipher(self) -> SslCipher {
        use Cipher::*;
        match self {
            Aes128_Cbc => SslCipher::aes_128_cbc(),
            Aes192_Cbc => SslCipher::aes_192_cbc(),
            Aes256_Cbc => SslCipher::aes_256_cbc(),
            Aes128_Ctr => SslCipher::aes_128_ctr(),
            Aes192_Ctr => SslCipher::aes_192_ctr(),
            Aes256_Ctr => SslCipher::aes_256_ctr(),
            TDes_Cbc => SslCipher::des_ede3_cbc(),
            Null => unreachable!("null cipher has no backend"),
        }
    }

    /// Return the required key length in bytes
    pub fn key_len(self) -> usize {
        use Cipher::*;
        match self {
            Aes128_Cbc | Aes128_Ctr => 16,
            Aes192_Cbc | Aes192_Ctr | TDes_Cbc => 24,
            Aes256_Cbc | Aes256_Ctr => 32,
            Null => 0,
        }
    }

    /// Return the required IV length in bytes
    pub fn iv_len(self) -> usize {
        use Cipher::*;
        match self {
            TDes_Cbc => 8,
            Null => 0,
            _ => 16,
        }
    }

    /// Return the block size of the algorithm
    ///
    /// The null cipher reports 8, the minimum alignment of the OpenSSH v1
    /// private section.
    pub fn block_size(self) -> usize {
        use Cipher::*;
        match self {
            TDes_Cbc | Null => 8,
            _ => 16,
        }
    }

    /// Return the name used in OpenSSH key containers
    pub fn name(self) -> &'static str {
        use Cipher::*;
        match self {
            Aes128_Cbc => "aes128-cbc",
            Aes192_Cbc => "aes192-cbc",
            Aes256_Cbc => "aes256-cbc",
            Aes128_Ctr => "aes128-ctr",
            Aes192_Ctr => "aes192-ctr",
            Aes256_Ctr => "aes256-ctr",
            TDes_Cbc => "3des-cbc",
            Null => "none",
        }
    }

    /// Return `true` if `Cipher::Null`
    #[inline]
    pub fn is_null(self) -> bool {
        self == Cipher::Null
    }

    /// Return `true` if not `Cipher::Null`
    #[inline]
    pub fn is_some(self) -> bool {
        self != Cipher::Null
    }
}

impl FromStr for Cipher {
    type Err = PkiError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Cipher::*;
        match s {
            "3des-cbc" => Ok(TDes_Cbc),
            "aes128-cbc" => Ok(Aes128_Cbc),
            "aes192-cbc" => Ok(Aes192_Cbc),
            "aes256-cbc" | "rijndael-cbc@lysator.liu.se" => Ok(Aes256_Cbc),
            "aes128-ctr" => Ok(Aes128_Ctr),
            "aes192-ctr" => Ok(Aes192_Ctr),
            "aes256-ctr" => Ok(Aes256_Ctr),
            "none" => Ok(Null),
            _ => Err(ErrorKind::UnsupportedCipher.into()),
        }
    }
}
