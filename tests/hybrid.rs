#![cfg(feature = "post-quantum")]

use sshpki::error::ErrorKind;
use sshpki::keys::KeyParts;
use sshpki::signature::sign_data;
use sshpki::{pki, DigestAlgorithm, KeyAlgorithm, KeyPair, Signature};

mod utils;

#[test]
fn pure_pq_sign_verify() {
    let session = utils::MockSession::default();
    let keypair = KeyPair::generate(KeyAlgorithm::Dilithium2, 0).unwrap();
    let pubkey = keypair.clone_public_key().unwrap();

    let blob = sign_data(&keypair, b"pq message", DigestAlgorithm::Auto, false)
        .unwrap()
        .to_blob()
        .unwrap();
    let sig = Signature::from_blob(&blob, &pubkey).unwrap();
    assert!(pki::signature_verify(&session, &sig, &pubkey, b"pq message").is_ok());
    assert!(pki::signature_verify(&session, &sig, &pubkey, b"pq messagf").is_err());
}

// The hybrid blob is u32 len | classical blob | u32 len | pq signature;
// destroying the PQ half must break verification even though the classical
// half is intact.
#[test]
fn hybrid_blob_layout_and_both_halves_required() {
    let session = utils::MockSession::default();
    let keypair = KeyPair::generate(KeyAlgorithm::Rsa3072Dilithium2, 0).unwrap();
    let pubkey = keypair.clone_public_key().unwrap();

    let blob = sign_data(&keypair, b"hybrid message", DigestAlgorithm::Sha256, false)
        .unwrap()
        .to_blob()
        .unwrap();

    // Decompose the framing
    let len_c = u32::from_be_bytes([blob[0], blob[1], blob[2], blob[3]]) as usize;
    let classical = &blob[4..4 + len_c];
    let len_pq_off = 4 + len_c;
    let len_pq = u32::from_be_bytes([
        blob[len_pq_off],
        blob[len_pq_off + 1],
        blob[len_pq_off + 2],
        blob[len_pq_off + 3],
    ]) as usize;
    assert_eq!(blob.len(), 4 + len_c + 4 + len_pq);

    // The classical half keeps the RSA identifier
    assert_eq!(&classical[4..16], b"rsa-sha2-256");

    let sig = Signature::from_blob(&blob, &pubkey).unwrap();
    assert!(pki::signature_verify(&session, &sig, &pubkey, b"hybrid message").is_ok());

    // Zero out the PQ portion: classical alone must not be enough
    let mut tampered = blob.clone();
    for byte in tampered[len_pq_off + 4..].iter_mut() {
        *byte = 0;
    }
    let verified = Signature::from_blob(&tampered, &pubkey)
        .and_then(|sig| pki::signature_verify(&session, &sig, &pubkey, b"hybrid message"));
    assert!(verified.is_err());
}

#[test]
fn ecdsa_hybrid_signs_under_the_hybrid_identifier() {
    let session = utils::MockSession::default();
    let keypair = KeyPair::generate(KeyAlgorithm::P256Dilithium2, 0).unwrap();
    let pubkey = keypair.clone_public_key().unwrap();

    let blob = sign_data(&keypair, b"m", DigestAlgorithm::Sha256, false)
        .unwrap()
        .to_blob()
        .unwrap();
    let len_c = u32::from_be_bytes([blob[0], blob[1], blob[2], blob[3]]) as usize;
    let classical = &blob[4..4 + len_c];
    assert_eq!(&classical[4..4 + "ssh-p256-dilithium2".len()], b"ssh-p256-dilithium2");

    let sig = Signature::from_blob(&blob, &pubkey).unwrap();
    assert!(pki::signature_verify(&session, &sig, &pubkey, b"m").is_ok());
}

#[test]
fn hybrid_container_roundtrip() {
    let keypair = KeyPair::generate(KeyAlgorithm::Rsa3072Falcon512, 0).unwrap();
    let container = keypair.serialize(Some("hunter2")).unwrap();
    let parsed = KeyPair::from_keystr(&container, Some("hunter2")).unwrap();
    assert!(parsed.compare(&keypair, KeyParts::Private));
    assert!(parsed.compare(&keypair, KeyParts::Public));
}

#[test]
fn sha1_is_refused_for_hybrids() {
    let keypair = KeyPair::generate(KeyAlgorithm::P256Falcon512, 0).unwrap();
    let err = sign_data(&keypair, b"m", DigestAlgorithm::Sha1, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleHash);
}
