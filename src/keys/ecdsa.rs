use std::convert::TryFrom;
use std::str::FromStr;

use openssl::bn::{BigNum, BigNumContext, BigNumRef};
use openssl::ec::{EcGroup, EcGroupRef, EcKey, EcPoint, EcPointRef, PointConversionForm};
use openssl::ecdsa::EcdsaSig;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private, Public};
use openssl::sign::{Signer, Verifier};

use super::dsa::pad_into;
use crate::error::{Error as PkiError, ErrorKind, PkiResult};
use crate::keytype::{DigestAlgorithm, KeyAlgorithm};

/// The NIST curves usable with `ecdsa-sha2-*` keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    Nistp256,
    Nistp384,
    Nistp521,
}

impl EcCurve {
    pub fn size(self) -> usize {
        match self {
            EcCurve::Nistp256 => 256,
            EcCurve::Nistp384 => 384,
            EcCurve::Nistp521 => 521,
        }
    }

    /// Width in bytes of one coordinate (and of one signature half)
    pub fn field_len(self) -> usize {
        match self {
            EcCurve::Nistp256 => 32,
            EcCurve::Nistp384 => 48,
            EcCurve::Nistp521 => 66,
        }
    }

    pub fn nid(self) -> Nid {
        match self {
            EcCurve::Nistp256 => Nid::X9_62_PRIME256V1,
            EcCurve::Nistp384 => Nid::SECP384R1,
            EcCurve::Nistp521 => Nid::SECP521R1,
        }
    }

    pub(crate) fn from_nid(nid: Nid) -> PkiResult<Self> {
        match nid {
            Nid::X9_62_PRIME256V1 => Ok(EcCurve::Nistp256),
            Nid::SECP384R1 => Ok(EcCurve::Nistp384),
            Nid::SECP521R1 => Ok(EcCurve::Nistp521),
            _ => Err(ErrorKind::UnsupportedCurve.into()),
        }
    }

    /// The key algorithm tag this curve belongs to
    pub fn algorithm(self) -> KeyAlgorithm {
        match self {
            EcCurve::Nistp256 => KeyAlgorithm::EcdsaP256,
            EcCurve::Nistp384 => KeyAlgorithm::EcdsaP384,
            EcCurve::Nistp521 => KeyAlgorithm::EcdsaP521,
        }
    }

    pub(crate) fn from_algorithm(alg: KeyAlgorithm) -> PkiResult<Self> {
        match alg.plain() {
            KeyAlgorithm::EcdsaP256 | KeyAlgorithm::SkEcdsa => Ok(EcCurve::Nistp256),
            KeyAlgorithm::EcdsaP384 => Ok(EcCurve::Nistp384),
            KeyAlgorithm::EcdsaP521 => Ok(EcCurve::Nistp521),
            _ => Err(ErrorKind::UnsupportedCurve.into()),
        }
    }

    /// The digest bound to this curve
    pub fn digest(self) -> DigestAlgorithm {
        match self {
            EcCurve::Nistp256 => DigestAlgorithm::Sha256,
            EcCurve::Nistp384 => DigestAlgorithm::Sha384,
            EcCurve::Nistp521 => DigestAlgorithm::Sha512,
        }
    }

    fn message_digest(self) -> MessageDigest {
        match self {
            EcCurve::Nistp256 => MessageDigest::sha256(),
            EcCurve::Nistp384 => MessageDigest::sha384(),
            EcCurve::Nistp521 => MessageDigest::sha512(),
        }
    }

    /// The curve identifier inside key blobs ("nistp256", ...)
    pub fn ident(self) -> &'static str {
        match self {
            EcCurve::Nistp256 => "nistp256",
            EcCurve::Nistp384 => "nistp384",
            EcCurve::Nistp521 => "nistp521",
        }
    }
}

impl FromStr for EcCurve {
    type Err = PkiError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nistp256" => Ok(EcCurve::Nistp256),
            "nistp384" => Ok(EcCurve::Nistp384),
            "nistp521" => Ok(EcCurve::Nistp521),
            _ => Err(ErrorKind::UnsupportedCurve.into()),
        }
    }
}

impl TryFrom<EcCurve> for EcGroup {
    type Error = PkiError;
    fn try_from(curve: EcCurve) -> Result<Self, Self::Error> {
        Ok(EcGroup::from_curve_name(curve.nid())?)
    }
}

/// Represent the EcDSA public key
#[derive(Debug, Clone)]
pub struct EcDsaPublicKey {
    key: EcKey<Public>,
    curve: EcCurve,
}

impl EcDsaPublicKey {
    pub fn new(group: &EcGroupRef, public_key: &EcPointRef) -> PkiResult<Self> {
        let curve = match group.curve_name() {
            Some(nid) => EcCurve::from_nid(nid)?,
            None => return Err(ErrorKind::UnsupportedCurve.into()),
        };
        Ok(EcDsaPublicKey {
            key: EcKey::from_public_key(group, public_key)?,
            curve,
        })
    }

    /// Create a public key from the curve and the SEC1 uncompressed point
    pub fn from_bytes(curve: EcCurve, point: &[u8]) -> PkiResult<Self> {
        let group = EcGroup::try_from(curve)?;
        let mut bn_ctx = BigNumContext::new()?;
        let point = EcPoint::from_bytes(&group, point, &mut bn_ctx)?;
        EcDsaPublicKey::new(&group, &point)
    }

    pub(crate) fn from_ossl_ec(key: EcKey<Public>) -> PkiResult<Self> {
        let curve = match key.group().curve_name() {
            Some(nid) => EcCurve::from_nid(nid)?,
            None => return Err(ErrorKind::UnsupportedCurve.into()),
        };
        Ok(EcDsaPublicKey { key, curve })
    }

    pub fn curve(&self) -> EcCurve {
        self.curve
    }

    pub fn size(&self) -> usize {
        self.curve.size()
    }

    /// The SEC1 uncompressed point
    pub(crate) fn point_bytes(&self) -> PkiResult<Vec<u8>> {
        let mut bn_ctx = BigNumContext::new()?;
        Ok(self.key.public_key().to_bytes(
            self.key.group(),
            PointConversionForm::UNCOMPRESSED,
            &mut bn_ctx,
        )?)
    }

    /// Verify a fixed-width `r ∥ s` signature over `data`
    pub fn verify(&self, data: &[u8], sig: &[u8]) -> PkiResult<bool> {
        let half = self.curve.field_len();
        if sig.len() != half * 2 {
            return Err(ErrorKind::InvalidKeyFormat.into());
        }
        let r = BigNum::from_slice(&sig[..half])?;
        let s = BigNum::from_slice(&sig[half..])?;
        let der = EcdsaSig::from_private_components(r, s)?.to_der()?;

        let pkey = PKey::from_ec_key(self.key.clone())?;
        let mut veri = Verifier::new(self.curve.message_digest(), &pkey)?;
        veri.update(data)?;
        Ok(veri.verify(&der)?)
    }
}

impl PartialEq for EcDsaPublicKey {
    fn eq(&self, other: &Self) -> bool {
        if self.curve != other.curve {
            return false;
        }
        let mut bn_ctx = match BigNumContext::new() {
            Ok(ctx) => ctx,
            Err(_) => return false,
        };
        self.key
            .public_key()
            .eq(self.key.group(), other.key.public_key(), &mut bn_ctx)
            .unwrap_or(false)
    }
}

/// Represent the EcDSA key pair
#[derive(Clone)]
pub struct EcDsaKeyPair {
    key: EcKey<Private>,
    curve: EcCurve,
}

impl EcDsaKeyPair {
    /// Generate a key pair on the given curve
    pub fn generate(curve: EcCurve) -> PkiResult<Self> {
        let group = EcGroup::try_from(curve)?;
        Ok(EcDsaKeyPair {
            key: EcKey::generate(&group)?,
            curve,
        })
    }

    pub(crate) fn from_ossl_ec(key: EcKey<Private>) -> PkiResult<Self> {
        let curve = match key.group().curve_name() {
            Some(nid) => EcCurve::from_nid(nid)?,
            None => return Err(ErrorKind::UnsupportedCurve.into()),
        };
        Ok(EcDsaKeyPair { key, curve })
    }

    pub(crate) fn ossl_ec(&self) -> &EcKey<Private> {
        &self.key
    }

    /// Rebuild a key pair from the curve, public point, and private scalar
    pub(crate) fn from_bytes(curve: EcCurve, point: &[u8], scalar: &BigNumRef) -> PkiResult<Self> {
        let group = EcGroup::try_from(curve)?;
        let mut bn_ctx = BigNumContext::new()?;
        let point = EcPoint::from_bytes(&group, point, &mut bn_ctx)?;
        let key = EcKey::from_private_components(&group, scalar, &point)?;
        key.check_key()?;
        Ok(EcDsaKeyPair { key, curve })
    }

    pub fn curve(&self) -> EcCurve {
        self.curve
    }

    pub fn size(&self) -> usize {
        self.curve.size()
    }

    pub(crate) fn point_bytes(&self) -> PkiResult<Vec<u8>> {
        let mut bn_ctx = BigNumContext::new()?;
        Ok(self.key.public_key().to_bytes(
            self.key.group(),
            PointConversionForm::UNCOMPRESSED,
            &mut bn_ctx,
        )?)
    }

    pub(crate) fn private_scalar(&self) -> &BigNumRef {
        self.key.private_key()
    }

    /// Clone the public parts to generate a public key
    pub fn clone_public_key(&self) -> PkiResult<EcDsaPublicKey> {
        EcDsaPublicKey::new(self.key.group(), self.key.public_key())
    }

    /// Sign `data`, returning `r ∥ s` with both halves padded to the curve
    /// field width
    pub fn sign(&self, data: &[u8]) -> PkiResult<Vec<u8>> {
        let pkey = PKey::from_ec_key(self.key.clone())?;
        let mut signer = Signer::new(self.curve.message_digest(), &pkey)?;
        signer.update(data)?;
        let der = signer.sign_to_vec()?;

        let sig = EcdsaSig::from_der(&der)?;
        let half = self.curve.field_len();
        let mut raw = vec![0u8; half * 2];
        pad_into(sig.r(), &mut raw[..half])?;
        pad_into(sig.s(), &mut raw[half..])?;
        Ok(raw)
    }

    pub fn verify(&self, data: &[u8], sig: &[u8]) -> PkiResult<bool> {
        self.clone_public_key()?.verify(data, sig)
    }
}

impl PartialEq for EcDsaKeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.curve == other.curve && self.private_scalar() == other.private_scalar()
    }
}

impl std::fmt::Debug for EcDsaKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcDsaKeyPair")
            .field("curve", &self.curve)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ecdsa_sign_every_curve() {
        for curve in [EcCurve::Nistp256, EcCurve::Nistp384, EcCurve::Nistp521] {
            let key = EcDsaKeyPair::generate(curve).unwrap();
            let sig = key.sign(b"ecdsa test message").unwrap();
            assert_eq!(sig.len(), curve.field_len() * 2);
            assert!(key.verify(b"ecdsa test message", &sig).unwrap());
            assert!(!key.verify(b"ecdsa test messagf", &sig).unwrap());
        }
    }

    #[test]
    fn ecdsa_point_roundtrip() {
        let key = EcDsaKeyPair::generate(EcCurve::Nistp256).unwrap();
        let rebuilt = EcDsaKeyPair::from_bytes(
            EcCurve::Nistp256,
            &key.point_bytes().unwrap(),
            key.private_scalar(),
        )
        .unwrap();
        assert_eq!(key, rebuilt);
        assert_eq!(key.clone_public_key().unwrap(), rebuilt.clone_public_key().unwrap());
    }

    #[test]
    fn curve_names() {
        assert_eq!(EcCurve::from_str("nistp384").unwrap(), EcCurve::Nistp384);
        assert!(EcCurve::from_str("nistp224").is_err());
        assert_eq!(EcCurve::Nistp521.algorithm(), KeyAlgorithm::EcdsaP521);
    }
}
