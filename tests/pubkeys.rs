use sshpki::error::ErrorKind;
use sshpki::sshbuf::SshWriteExt;
use sshpki::{pki, KeyAlgorithm, KeyPair, PublicKey};

mod utils;

// Golden vector: a real ssh-ed25519 authorized-keys entry
#[test]
fn authorized_keys_known_vector() {
    use hex_literal::hex;

    const LINE: &str =
        "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIMoWBluPErgKhNja3lHEf7ie6AVzR24mPRd742xEYodC";
    const RAW_KEY: [u8; 32] =
        hex!("ca16065b8f12b80a84d8dade51c47fb89ee80573476e263d177be36c44628742");

    let pubkey = PublicKey::from_keystr(LINE).unwrap();
    assert_eq!(pubkey.algorithm(), KeyAlgorithm::Ed25519);

    let mut expected = Vec::new();
    expected.write_utf8("ssh-ed25519").unwrap();
    expected.write_string(&RAW_KEY).unwrap();
    assert_eq!(pubkey.blob().unwrap(), expected);

    // Serialization reproduces the line byte for byte
    assert_eq!(pubkey.serialize().unwrap(), LINE);
}

#[test]
fn authorized_keys_line_import() {
    let keypair = KeyPair::generate(KeyAlgorithm::Ed25519, 0).unwrap();
    let line = format!(
        "ssh-ed25519 {} user@host\n",
        pki::export_pubkey_base64(&keypair.clone_public_key().unwrap()).unwrap()
    );

    let pubkey = PublicKey::from_keystr(&line).unwrap();
    assert_eq!(pubkey.algorithm(), KeyAlgorithm::Ed25519);
    assert_eq!(pubkey.name(), "ssh-ed25519");
    assert_eq!(pubkey.comment(), "user@host");
    assert!(pubkey == keypair.clone_public_key().unwrap());
}

#[test]
fn authorized_keys_line_without_comment() {
    let keypair = KeyPair::generate(KeyAlgorithm::EcdsaP256, 0).unwrap();
    let line = keypair.serialize_publickey().unwrap();
    let pubkey = PublicKey::from_keystr(&line).unwrap();
    assert_eq!(pubkey.name(), "ecdsa-sha2-nistp256");
}

#[test]
fn pubkey_of_private_container() {
    let keypair = KeyPair::generate(KeyAlgorithm::Ed25519, 0).unwrap();
    let container = keypair.serialize(None).unwrap();
    // The public half comes out of the container without the passphrase
    let pubkey = PublicKey::from_keystr(&container).unwrap();
    utils::fingerprint_assert(&pubkey, &keypair.clone_public_key().unwrap());
}

// Build a v01 certificate around a public key: type string, nonce, the
// public key components, then CA metadata this layer keeps opaque.
fn fake_ed25519_cert(keypair: &KeyPair) -> Vec<u8> {
    let pub_blob = keypair.clone_public_key().unwrap().blob().unwrap();
    // Strip the type string from the plain blob to get the raw components
    let inner = &pub_blob[4 + "ssh-ed25519".len()..];

    let mut cert = Vec::new();
    cert.write_utf8("ssh-ed25519-cert-v01@openssh.com").unwrap();
    cert.write_string(&[0x42u8; 8]).unwrap(); // nonce
    cert.extend_from_slice(inner);
    // serial, type, key id, principals, validity, options, reserved,
    // signature key and signature are preserved verbatim but never parsed
    cert.extend_from_slice(&1u64.to_be_bytes());
    cert.write_uint32(1).unwrap();
    cert.write_utf8("test-identity").unwrap();
    cert.write_string(b"").unwrap();
    cert.extend_from_slice(&0u64.to_be_bytes());
    cert.extend_from_slice(&u64::MAX.to_be_bytes());
    cert.write_string(b"").unwrap();
    cert.write_string(b"").unwrap();
    cert.write_string(b"").unwrap();
    cert.write_string(b"ca-key-blob").unwrap();
    cert.write_string(b"ca-signature").unwrap();
    cert
}

#[test]
fn certificate_import_and_attach() {
    let mut keypair = KeyPair::generate(KeyAlgorithm::Ed25519, 0).unwrap();
    let cert_blob = fake_ed25519_cert(&keypair);

    let certkey = pki::import_cert_blob(&cert_blob).unwrap();
    assert_eq!(certkey.algorithm(), KeyAlgorithm::Ed25519Cert);
    assert!(certkey.is_cert());
    assert_eq!(certkey.algorithm().plain(), KeyAlgorithm::Ed25519);
    // The whole certificate is preserved bit-exact
    assert_eq!(certkey.blob().unwrap(), cert_blob);

    // Attaching once succeeds, twice fails
    pki::copy_cert_to_privkey(&certkey, &mut keypair).unwrap();
    assert_eq!(keypair.cert_blob().unwrap(), cert_blob.as_slice());
    let err = pki::copy_cert_to_privkey(&certkey, &mut keypair).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn attach_refuses_non_certificates() {
    let mut keypair = KeyPair::generate(KeyAlgorithm::Ed25519, 0).unwrap();
    let plain = keypair.clone_public_key().unwrap();
    let err = pki::copy_cert_to_privkey(&plain, &mut keypair).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn cert_authorized_line_roundtrip() {
    let keypair = KeyPair::generate(KeyAlgorithm::Ed25519, 0).unwrap();
    let cert_blob = fake_ed25519_cert(&keypair);
    let certkey = pki::import_cert_blob(&cert_blob).unwrap();

    let line = certkey.serialize().unwrap();
    assert!(line.starts_with("ssh-ed25519-cert-v01@openssh.com "));
    let reimported = PublicKey::from_keystr(&line).unwrap();
    assert_eq!(reimported.blob().unwrap(), cert_blob);
}

#[test]
fn pubkey_base64_type_check() {
    let keypair = KeyPair::generate(KeyAlgorithm::Ed25519, 0).unwrap();
    let b64 = pki::export_pubkey_base64(&keypair.clone_public_key().unwrap()).unwrap();

    assert!(pki::import_pubkey_base64(&b64, KeyAlgorithm::Ed25519).is_ok());
    let err = pki::import_pubkey_base64(&b64, KeyAlgorithm::Rsa).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidKeyFormat);
}

#[test]
fn legacy_aliases_resolve_on_import() {
    // "ecdsa" and "ssh-ecdsa" are accepted for nistp256 keys
    let keypair = KeyPair::generate(KeyAlgorithm::EcdsaP256, 0).unwrap();
    let b64 = pki::export_pubkey_base64(&keypair.clone_public_key().unwrap()).unwrap();
    for alias in ["ecdsa", "ssh-ecdsa"] {
        let line = format!("{} {}", alias, b64);
        let pubkey = PublicKey::from_keystr(&line).unwrap();
        assert_eq!(pubkey.algorithm(), KeyAlgorithm::EcdsaP256);
    }
}

#[test]
fn demoted_copy_has_no_private_part() {
    let keypair = KeyPair::generate(KeyAlgorithm::EcdsaP384, 0).unwrap();
    let pubkey = pki::export_privkey_to_pubkey(&keypair).unwrap();
    assert!(pubkey.is_public());
    assert!(!pubkey.is_private());
    assert_eq!(pubkey.algorithm(), keypair.algorithm());
}

#[test]
fn sk_pubkey_blob_roundtrip() {
    use sshpki::keys::ed25519::Ed25519KeyPair;

    let inner = Ed25519KeyPair::generate().unwrap();
    let mut blob = Vec::new();
    blob.write_utf8("sk-ssh-ed25519@openssh.com").unwrap();
    blob.write_string(inner.public_bytes()).unwrap();
    blob.write_utf8("ssh:").unwrap();

    let pubkey = pki::import_pubkey_blob(&blob).unwrap();
    assert_eq!(pubkey.algorithm(), KeyAlgorithm::SkEd25519);
    assert_eq!(pubkey.sk_application(), Some("ssh:"));
    assert_eq!(pubkey.blob().unwrap(), blob);
}
