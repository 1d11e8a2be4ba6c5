//! SSH public key infrastructure
//!
//! This crate implements the PKI subsystem of an SSH implementation: it
//! parses, validates, generates, serializes, signs with, and verifies with
//! SSH-protocol asymmetric keys and certificates.
//!
//! # Example
//! ```no_run
//! use sshpki::cipher::Cipher;
//! use sshpki::{KeyAlgorithm, KeyPair};
//!
//! # fn main() -> Result<(), sshpki::error::Error> {
//! let keypair = KeyPair::generate(KeyAlgorithm::Ed25519, 0)?;
//! let container = keypair.serialize_openssh(Some("hunter2"), Cipher::Aes256_Ctr)?;
//! let public_line = keypair.serialize_publickey()?;
//! # let _ = (container, public_line);
//! # Ok(())
//! # }
//! ```
//!
//! Post-quantum and hybrid classical+PQ algorithms are available behind the
//! `post-quantum` feature.

/// Symmetric ciphers protecting OpenSSH v1 containers
pub mod cipher;
/// Containing the error type of this crate
pub mod error;
/// Serialize/Deserialize key files
mod format;
/// Representing different types of public/private keys
pub mod keys;
/// The algorithm registry
pub mod keytype;
/// PKCS#11 URI handling
pub mod pkcs11;
/// The import/export/sign/verify façade
pub mod pki;
/// The read-only session view and the agent seam
pub mod session;
/// Signature values and the signing/verification engine
pub mod signature;
/// Extension to read/write ssh data type representations defined in [RFC 4251](https://tools.ietf.org/html/rfc4251#section-5)
pub mod sshbuf;

pub use error::{Error, ErrorKind, PkiResult};
pub use format::AuthCallback;
pub use keys::{FingerprintHash, KeyPair, KeyParts, PublicKey};
pub use keytype::{DigestAlgorithm, KeyAlgorithm};
pub use session::{AgentSigner, Session};
pub use signature::Signature;
