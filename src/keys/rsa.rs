use openssl::bn::{BigNum, BigNumContext, BigNumRef};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private, Public};
use openssl::rsa::{Rsa, RsaPrivateKeyBuilder};
use openssl::sign::{Signer, Verifier};

use crate::error::{ErrorKind, PkiResult};
use crate::keytype::DigestAlgorithm;

const RSA_MIN_SIZE: usize = 1024;
const RSA_DEFAULT_BITS: u32 = 2048;

fn digest_of(hash: DigestAlgorithm) -> PkiResult<MessageDigest> {
    match hash {
        // ssh-rsa means SHA-1
        DigestAlgorithm::Sha1 | DigestAlgorithm::Auto => Ok(MessageDigest::sha1()),
        DigestAlgorithm::Sha256 => Ok(MessageDigest::sha256()),
        DigestAlgorithm::Sha512 => Ok(MessageDigest::sha512()),
        _ => Err(ErrorKind::IncompatibleHash.into()),
    }
}

/// Represent the RSA public key
#[derive(Debug, Clone)]
pub struct RsaPublicKey {
    rsa: Rsa<Public>,
}

impl RsaPublicKey {
    /// Create an RSA public key from the public components
    pub fn new(n: BigNum, e: BigNum) -> PkiResult<Self> {
        Ok(RsaPublicKey {
            rsa: Rsa::from_public_components(n, e)?,
        })
    }

    pub(crate) fn from_ossl_rsa(rsa: Rsa<Public>) -> Self {
        RsaPublicKey { rsa }
    }

    pub(crate) fn n(&self) -> &BigNumRef {
        self.rsa.n()
    }
    pub(crate) fn e(&self) -> &BigNumRef {
        self.rsa.e()
    }

    pub fn size(&self) -> usize {
        self.rsa.n().num_bits() as usize
    }

    /// Verify a raw modulus-width signature over `data` hashed with `hash`
    pub fn verify(&self, data: &[u8], sig: &[u8], hash: DigestAlgorithm) -> PkiResult<bool> {
        if self.size() < RSA_MIN_SIZE {
            return Err(ErrorKind::InvalidKeySize.into());
        }
        let pkey = PKey::from_rsa(self.rsa.clone())?;
        let mut veri = Verifier::new(digest_of(hash)?, &pkey)?;
        veri.update(data)?;
        Ok(veri.verify(sig)?)
    }
}

impl PartialEq for RsaPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.n() == other.n() && self.e() == other.e()
    }
}

/// Represent the RSA key pair
#[derive(Clone)]
pub struct RsaKeyPair {
    rsa: Rsa<Private>,
}

impl RsaKeyPair {
    /// Generate an RSA key pair
    ///
    /// The bits parameter should be `>= 1024` and `<= 16384`, or `0` to use
    /// the default length (2048 bits).
    pub fn generate(bits: usize) -> PkiResult<Self> {
        let bits = match bits {
            0 => RSA_DEFAULT_BITS,
            1024..=16384 => bits as u32,
            _ => return Err(ErrorKind::InvalidKeySize.into()),
        };
        Ok(RsaKeyPair {
            rsa: Rsa::generate(bits)?,
        })
    }

    pub(crate) fn from_ossl_rsa(rsa: Rsa<Private>) -> Self {
        RsaKeyPair { rsa }
    }

    pub(crate) fn ossl_rsa(&self) -> &Rsa<Private> {
        &self.rsa
    }

    /// Rebuild a key pair from the container components
    ///
    /// `iqmp` is carried by the container but openssl re-derives the CRT
    /// parameters itself, so only `n, e, d, p, q` feed the builder.
    pub(crate) fn from_components(
        n: BigNum,
        e: BigNum,
        d: BigNum,
        p: BigNum,
        q: BigNum,
    ) -> PkiResult<Self> {
        let rsa = RsaPrivateKeyBuilder::new(n, e, d)?.set_factors(p, q)?.build();
        Ok(RsaKeyPair { rsa })
    }

    pub(crate) fn n(&self) -> &BigNumRef {
        self.rsa.n()
    }
    pub(crate) fn e(&self) -> &BigNumRef {
        self.rsa.e()
    }
    pub(crate) fn d(&self) -> &BigNumRef {
        self.rsa.d()
    }
    pub(crate) fn p(&self) -> Option<&BigNumRef> {
        self.rsa.p()
    }
    pub(crate) fn q(&self) -> Option<&BigNumRef> {
        self.rsa.q()
    }

    /// `q^-1 mod p`, recomputed when the key was built without CRT parameters
    pub(crate) fn iqmp(&self) -> PkiResult<BigNum> {
        if let Some(iqmp) = self.rsa.iqmp() {
            return Ok(iqmp.to_owned()?);
        }
        let (p, q) = match (self.rsa.p(), self.rsa.q()) {
            (Some(p), Some(q)) => (p, q),
            _ => return Err(ErrorKind::InvalidKeyFormat.into()),
        };
        let mut ctx = BigNumContext::new()?;
        let mut iqmp = BigNum::new()?;
        iqmp.mod_inverse(q, p, &mut ctx)?;
        Ok(iqmp)
    }

    pub fn size(&self) -> usize {
        self.rsa.n().num_bits() as usize
    }

    /// Clone the public parts to generate a public key
    pub fn clone_public_key(&self) -> PkiResult<RsaPublicKey> {
        let n = self.n().to_owned()?;
        let e = self.e().to_owned()?;
        RsaPublicKey::new(n, e)
    }

    /// Sign `data` with the given digest, returning modulus-width raw bytes
    pub fn sign(&self, data: &[u8], hash: DigestAlgorithm) -> PkiResult<Vec<u8>> {
        if self.size() < RSA_MIN_SIZE {
            return Err(ErrorKind::InvalidKeySize.into());
        }
        let pkey = PKey::from_rsa(self.rsa.clone())?;
        let mut signer = Signer::new(digest_of(hash)?, &pkey)?;
        signer.update(data)?;
        Ok(signer.sign_to_vec()?)
    }

    pub fn verify(&self, data: &[u8], sig: &[u8], hash: DigestAlgorithm) -> PkiResult<bool> {
        self.clone_public_key()?.verify(data, sig, hash)
    }
}

impl PartialEq for RsaKeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.n() == other.n() && self.e() == other.e() && self.d() == other.d()
    }
}
