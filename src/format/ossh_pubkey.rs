use std::io::Cursor;
use std::str::FromStr;

use crate::error::{ErrorKind, PkiResult};
use crate::keys::ecdsa::{EcCurve, EcDsaPublicKey};
use crate::keys::ed25519::Ed25519PublicKey;
use crate::keys::{dsa::DsaPublicKey, rsa::RsaPublicKey, PublicKey, PublicKeyData};
use crate::keytype::KeyAlgorithm;
use crate::sshbuf::{SshReadExt, SshWriteExt};

const ED25519_KEY_LEN: usize = 32;

/// Parse the one-line authorized-keys format:
/// `<algorithm-name> <base64-blob> [<comment>]`
pub(crate) fn parse_authorized_line(keystr: &str) -> PkiResult<PublicKey> {
    let key_split: Vec<&str> = keystr.split_ascii_whitespace().collect();
    if key_split.len() < 2 || key_split.len() > 3 {
        return Err(ErrorKind::InvalidKeyFormat.into());
    }
    let line_alg = KeyAlgorithm::from_name(key_split[0]);
    if line_alg == KeyAlgorithm::Unknown {
        return Err(ErrorKind::UnsupportedType.into());
    }
    let blob = base64::decode(key_split[1])?;
    let mut pubkey = decode_pubkey_blob(&blob)?;
    if pubkey.algorithm() != line_alg {
        return Err(ErrorKind::InvalidKeyFormat.into());
    }
    if key_split.len() == 3 {
        *pubkey.comment_mut() = key_split[2].into();
    }
    Ok(pubkey)
}

/// Serialize a public key into the one-line authorized-keys format
pub(crate) fn serialize_authorized_line(key: &PublicKey, comment: &str) -> PkiResult<String> {
    let blob = key.blob()?;
    let mut line = format!("{} {}", key.name(), base64::encode(&blob));
    if !comment.is_empty() {
        line.push(' ');
        line.push_str(comment);
    }
    Ok(line)
}

/// Decode a public key blob as specified in RFC 4253 §6.6 (and RFC 5656 §3.1
/// for the EC types)
pub(crate) fn decode_pubkey_blob(blob: &[u8]) -> PkiResult<PublicKey> {
    let mut reader = Cursor::new(blob);
    let type_name = reader.read_utf8()?;
    let algorithm = match type_name.as_str() {
        // Deprecated generic identifier: the curve comes from the body
        "ssh-ecdsa" | "ecdsa" => KeyAlgorithm::Ecdsa,
        name => KeyAlgorithm::from_name(name),
    };

    match algorithm {
        KeyAlgorithm::Unknown | KeyAlgorithm::Rsa1 => Err(ErrorKind::UnsupportedType.into()),
        alg if alg.is_cert() => decode_cert_blob(blob, alg, &mut reader),
        alg => {
            let (algorithm, data) = decode_pubkey_body(&mut reader, alg)?;
            Ok(PublicKey::from_parts(algorithm, data, None))
        }
    }
}

// The certificate itself is preserved verbatim; only the embedded public key
// components are materialized.
fn decode_cert_blob(
    blob: &[u8],
    algorithm: KeyAlgorithm,
    reader: &mut Cursor<&[u8]>,
) -> PkiResult<PublicKey> {
    let _nonce = reader.read_string()?;
    let (_, data) = decode_pubkey_body(reader, algorithm.plain())?;
    // Serial, principals, validity and the CA signature stay unparsed in the
    // attached buffer.
    Ok(PublicKey::from_parts(algorithm, data, Some(blob.to_vec())))
}

fn decode_ecdsa_component(
    reader: &mut Cursor<&[u8]>,
    expected: Option<EcCurve>,
) -> PkiResult<EcDsaPublicKey> {
    let ident = reader.read_utf8()?;
    let curve = EcCurve::from_str(&ident)?;
    if let Some(expected) = expected {
        if curve != expected {
            return Err(ErrorKind::InvalidKeyFormat.into());
        }
    }
    let point = reader.read_string()?;
    EcDsaPublicKey::from_bytes(curve, &point)
}

fn decode_ed25519_component(reader: &mut Cursor<&[u8]>) -> PkiResult<Ed25519PublicKey> {
    let pubkey = reader.read_string()?;
    if pubkey.len() != ED25519_KEY_LEN {
        return Err(ErrorKind::InvalidKeyFormat.into());
    }
    Ed25519PublicKey::from_bytes(&pubkey)
}

fn decode_pubkey_body(
    reader: &mut Cursor<&[u8]>,
    algorithm: KeyAlgorithm,
) -> PkiResult<(KeyAlgorithm, PublicKeyData)> {
    let data = match algorithm {
        KeyAlgorithm::Dss => {
            let p = reader.read_mpint()?;
            let q = reader.read_mpint()?;
            let g = reader.read_mpint()?;
            let y = reader.read_mpint()?;
            PublicKeyData::Dsa(DsaPublicKey::new(p, q, g, y)?)
        }
        KeyAlgorithm::Rsa => {
            let e = reader.read_mpint()?;
            let n = reader.read_mpint()?;
            PublicKeyData::Rsa(RsaPublicKey::new(n, e)?)
        }
        KeyAlgorithm::Ecdsa
        | KeyAlgorithm::EcdsaP256
        | KeyAlgorithm::EcdsaP384
        | KeyAlgorithm::EcdsaP521 => {
            let expected = match algorithm {
                // The deprecated generic tag resolves to whatever curve the
                // blob carries.
                KeyAlgorithm::Ecdsa => None,
                alg => Some(EcCurve::from_algorithm(alg)?),
            };
            let key = decode_ecdsa_component(reader, expected)?;
            let fixed = key.curve().algorithm();
            return Ok((fixed, PublicKeyData::Ecdsa(key)));
        }
        KeyAlgorithm::Ed25519 => PublicKeyData::Ed25519(decode_ed25519_component(reader)?),
        KeyAlgorithm::SkEcdsa => {
            let key = decode_ecdsa_component(reader, Some(EcCurve::Nistp256))?;
            let application = reader.read_utf8()?;
            PublicKeyData::SkEcdsa { key, application }
        }
        KeyAlgorithm::SkEd25519 => {
            let key = decode_ed25519_component(reader)?;
            let application = reader.read_utf8()?;
            PublicKeyData::SkEd25519 { key, application }
        }
        #[cfg(feature = "post-quantum")]
        alg if alg.is_hybrid() => {
            let classical = match alg.hybrid_classical() {
                Some(KeyAlgorithm::Rsa) => {
                    let e = reader.read_mpint()?;
                    let n = reader.read_mpint()?;
                    PublicKeyData::Rsa(RsaPublicKey::new(n, e)?)
                }
                Some(KeyAlgorithm::EcdsaP256) => PublicKeyData::Ecdsa(decode_ecdsa_component(
                    reader,
                    Some(EcCurve::Nistp256),
                )?),
                _ => return Err(ErrorKind::UnsupportedType.into()),
            };
            let pq_pk = reader.read_string()?;
            PublicKeyData::Hybrid {
                classical: Box::new(classical),
                oqs: crate::keys::oqs::OqsPublicKey::from_bytes(alg, &pq_pk)?,
            }
        }
        #[cfg(feature = "post-quantum")]
        alg if alg.is_oqs() => {
            let pq_pk = reader.read_string()?;
            PublicKeyData::Oqs(crate::keys::oqs::OqsPublicKey::from_bytes(alg, &pq_pk)?)
        }
        _ => return Err(ErrorKind::UnsupportedType.into()),
    };
    Ok((algorithm, data))
}

/// Encode the RFC 4253 public key blob for a non-certificate key
pub(crate) fn encode_pubkey_blob(
    algorithm: KeyAlgorithm,
    data: &PublicKeyData,
) -> PkiResult<Vec<u8>> {
    let name = algorithm.name().ok_or(ErrorKind::UnsupportedType)?;
    let mut buf = Cursor::new(Vec::new());
    buf.write_utf8(name)?;
    encode_pubkey_body(&mut buf, data)?;
    Ok(buf.into_inner())
}

fn encode_pubkey_body(buf: &mut Cursor<Vec<u8>>, data: &PublicKeyData) -> PkiResult<()> {
    match data {
        PublicKeyData::Dsa(key) => {
            buf.write_mpint(key.p())?;
            buf.write_mpint(key.q())?;
            buf.write_mpint(key.g())?;
            buf.write_mpint(key.pub_key())?;
        }
        PublicKeyData::Rsa(key) => {
            buf.write_mpint(key.e())?;
            buf.write_mpint(key.n())?;
        }
        PublicKeyData::Ecdsa(key) => {
            buf.write_utf8(key.curve().ident())?;
            buf.write_string(&key.point_bytes()?)?;
        }
        PublicKeyData::Ed25519(key) => {
            buf.write_string(key.as_bytes())?;
        }
        PublicKeyData::SkEcdsa { key, application } => {
            buf.write_utf8(key.curve().ident())?;
            buf.write_string(&key.point_bytes()?)?;
            buf.write_utf8(application)?;
        }
        PublicKeyData::SkEd25519 { key, application } => {
            buf.write_string(key.as_bytes())?;
            buf.write_utf8(application)?;
        }
        #[cfg(feature = "post-quantum")]
        PublicKeyData::Oqs(key) => {
            buf.write_string(key.as_bytes())?;
        }
        #[cfg(feature = "post-quantum")]
        PublicKeyData::Hybrid { classical, oqs } => {
            encode_pubkey_body(buf, classical)?;
            buf.write_string(oqs.as_bytes())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::keys::KeyPair;

    #[test]
    fn pubkey_blob_roundtrip() {
        for (alg, bits) in [
            (KeyAlgorithm::Rsa, 1024),
            (KeyAlgorithm::Dss, 1024),
            (KeyAlgorithm::EcdsaP256, 0),
            (KeyAlgorithm::Ed25519, 0),
        ] {
            let pubkey = KeyPair::generate(alg, bits)
                .unwrap()
                .clone_public_key()
                .unwrap();
            let blob = pubkey.blob().unwrap();
            let parsed = decode_pubkey_blob(&blob).unwrap();
            assert!(parsed == pubkey, "{:?} blob mismatch", alg);
        }
    }

    #[test]
    fn authorized_line_roundtrip() {
        let mut pubkey = KeyPair::generate(KeyAlgorithm::Ed25519, 0)
            .unwrap()
            .clone_public_key()
            .unwrap();
        *pubkey.comment_mut() = "user@host".into();
        let line = pubkey.serialize().unwrap();
        assert!(line.starts_with("ssh-ed25519 "));
        assert!(line.ends_with(" user@host"));

        let parsed = parse_authorized_line(&line).unwrap();
        assert!(parsed == pubkey);
        assert_eq!(parsed.comment(), "user@host");
    }

    #[test]
    fn authorized_line_rejects_garbage() {
        assert!(parse_authorized_line("ssh-ed25519").is_err());
        assert!(parse_authorized_line("ssh-frobnicate QUJD comment").is_err());
        assert!(parse_authorized_line("ssh-ed25519 ,,notb64,, comment").is_err());
        assert!(parse_authorized_line("a b c d").is_err());
    }

    #[test]
    fn blob_type_must_match_line_type() {
        let pubkey = KeyPair::generate(KeyAlgorithm::Ed25519, 0)
            .unwrap()
            .clone_public_key()
            .unwrap();
        let line = format!("ssh-rsa {}", base64::encode(pubkey.blob().unwrap()));
        assert!(parse_authorized_line(&line).is_err());
    }
}
