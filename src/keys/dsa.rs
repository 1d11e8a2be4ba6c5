use openssl::bn::{BigNum, BigNumRef};
use openssl::dsa::{Dsa, DsaSig};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private, Public};
use openssl::sign::{Signer, Verifier};

use crate::error::{ErrorKind, PkiResult};

const DSA_DEFAULT_BITS: u32 = 1024;
// ssh-dss signatures are fixed at two 160-bit halves
const DSA_SIG_HALF: usize = 20;

/// Represent the DSA public key
#[derive(Debug, Clone)]
pub struct DsaPublicKey {
    dsa: Dsa<Public>,
}

impl DsaPublicKey {
    /// Create a DSA public key from its components
    pub fn new(p: BigNum, q: BigNum, g: BigNum, y: BigNum) -> PkiResult<Self> {
        let dsa = Dsa::from_public_components(p, q, g, y)?;
        Ok(DsaPublicKey { dsa })
    }

    pub(crate) fn from_ossl_dsa(dsa: Dsa<Public>) -> Self {
        DsaPublicKey { dsa }
    }

    pub(crate) fn p(&self) -> &BigNumRef {
        self.dsa.p()
    }
    pub(crate) fn q(&self) -> &BigNumRef {
        self.dsa.q()
    }
    pub(crate) fn g(&self) -> &BigNumRef {
        self.dsa.g()
    }
    pub(crate) fn pub_key(&self) -> &BigNumRef {
        self.dsa.pub_key()
    }

    pub fn size(&self) -> usize {
        self.dsa.p().num_bits() as usize
    }

    /// Verify a raw `r ∥ s` signature over `data`
    pub fn verify(&self, data: &[u8], sig: &[u8]) -> PkiResult<bool> {
        if sig.len() != DSA_SIG_HALF * 2 {
            return Err(ErrorKind::InvalidKeyFormat.into());
        }
        let r = BigNum::from_slice(&sig[..DSA_SIG_HALF])?;
        let s = BigNum::from_slice(&sig[DSA_SIG_HALF..])?;
        let der = DsaSig::from_private_components(r, s)?.to_der()?;

        let pkey = PKey::from_dsa(self.dsa.clone())?;
        let mut veri = Verifier::new(MessageDigest::sha1(), &pkey)?;
        veri.update(data)?;
        Ok(veri.verify(&der)?)
    }
}

impl PartialEq for DsaPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.p() == other.p()
            && self.q() == other.q()
            && self.g() == other.g()
            && self.pub_key() == other.pub_key()
    }
}

/// Represent the DSA key pair
#[derive(Clone)]
pub struct DsaKeyPair {
    dsa: Dsa<Private>,
}

impl DsaKeyPair {
    /// Generate a DSA key pair
    ///
    /// The bits parameter should be `1024` bits or `0` to use the default.
    pub fn generate(bits: usize) -> PkiResult<Self> {
        let bits = if bits == 0 {
            DSA_DEFAULT_BITS
        } else {
            bits as u32
        };
        Ok(DsaKeyPair {
            dsa: Dsa::generate(bits)?,
        })
    }

    pub(crate) fn from_ossl_dsa(dsa: Dsa<Private>) -> Self {
        DsaKeyPair { dsa }
    }

    pub(crate) fn ossl_dsa(&self) -> &Dsa<Private> {
        &self.dsa
    }

    /// Rebuild a key pair from the container components
    pub(crate) fn from_components(
        p: BigNum,
        q: BigNum,
        g: BigNum,
        y: BigNum,
        x: BigNum,
    ) -> PkiResult<Self> {
        let dsa = Dsa::from_private_components(p, q, g, x, y)?;
        Ok(DsaKeyPair { dsa })
    }

    pub(crate) fn p(&self) -> &BigNumRef {
        self.dsa.p()
    }
    pub(crate) fn q(&self) -> &BigNumRef {
        self.dsa.q()
    }
    pub(crate) fn g(&self) -> &BigNumRef {
        self.dsa.g()
    }
    pub(crate) fn pub_key(&self) -> &BigNumRef {
        self.dsa.pub_key()
    }
    pub(crate) fn priv_key(&self) -> &BigNumRef {
        self.dsa.priv_key()
    }

    pub fn size(&self) -> usize {
        self.dsa.p().num_bits() as usize
    }

    /// Clone the public parts to generate a public key
    pub fn clone_public_key(&self) -> PkiResult<DsaPublicKey> {
        let p = self.p().to_owned()?;
        let q = self.q().to_owned()?;
        let g = self.g().to_owned()?;
        let y = self.pub_key().to_owned()?;
        DsaPublicKey::new(p, q, g, y)
    }

    /// Sign `data`, returning the raw 40-byte `r ∥ s` form
    pub fn sign(&self, data: &[u8]) -> PkiResult<Vec<u8>> {
        let pkey = PKey::from_dsa(self.dsa.clone())?;
        let mut signer = Signer::new(MessageDigest::sha1(), &pkey)?;
        signer.update(data)?;
        let der = signer.sign_to_vec()?;

        let sig = DsaSig::from_der(&der)?;
        let mut raw = vec![0u8; DSA_SIG_HALF * 2];
        pad_into(sig.r(), &mut raw[..DSA_SIG_HALF])?;
        pad_into(sig.s(), &mut raw[DSA_SIG_HALF..])?;
        Ok(raw)
    }

    pub fn verify(&self, data: &[u8], sig: &[u8]) -> PkiResult<bool> {
        self.clone_public_key()?.verify(data, sig)
    }
}

impl PartialEq for DsaKeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.pub_key() == other.pub_key() && self.priv_key() == other.priv_key()
    }
}

// Left-pad a bignum into a fixed-width big-endian field.
pub(crate) fn pad_into(n: &BigNumRef, out: &mut [u8]) -> PkiResult<()> {
    let bytes = n.to_vec();
    if bytes.len() > out.len() {
        return Err(ErrorKind::InvalidKeySize.into());
    }
    let offset = out.len() - bytes.len();
    for b in out[..offset].iter_mut() {
        *b = 0;
    }
    out[offset..].copy_from_slice(&bytes);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dsa_sign_roundtrip() {
        let key = DsaKeyPair::generate(0).unwrap();
        let sig = key.sign(b"dss test message").unwrap();
        assert_eq!(sig.len(), 40);
        assert!(key.verify(b"dss test message", &sig).unwrap());
        assert!(!key.verify(b"dss test messagf", &sig).unwrap());
    }

    #[test]
    fn dsa_public_clone_matches() {
        let key = DsaKeyPair::generate(1024).unwrap();
        let pubkey = key.clone_public_key().unwrap();
        assert_eq!(pubkey.size(), 1024);
        assert_eq!(pubkey, key.clone_public_key().unwrap());
    }
}
