use log::warn;

/// The digest used when producing or checking a signature
///
/// `Auto` marks algorithms that define their own hashing (Ed25519 and the
/// pure post-quantum schemes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    Auto,
}

impl DigestAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha384 => "sha384",
            DigestAlgorithm::Sha512 => "sha512",
            DigestAlgorithm::Auto => "auto",
        }
    }
}

/// An enum over every key algorithm this crate understands
///
/// Certificate variants are distinct tags; [`plain()`](#method.plain) strips
/// them. `Ecdsa` is the deprecated generic tag kept only to accept legacy
/// identifiers, `Rsa1` is recognized but rejected on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Dss,
    Rsa,
    Rsa1,
    Ecdsa,
    EcdsaP256,
    EcdsaP384,
    EcdsaP521,
    Ed25519,
    DssCert,
    RsaCert,
    EcdsaP256Cert,
    EcdsaP384Cert,
    EcdsaP521Cert,
    Ed25519Cert,
    SkEcdsa,
    SkEd25519,
    SkEcdsaCert,
    SkEd25519Cert,
    #[cfg(feature = "post-quantum")]
    Dilithium2,
    #[cfg(feature = "post-quantum")]
    Falcon512,
    #[cfg(feature = "post-quantum")]
    SphincsSha2128f,
    #[cfg(feature = "post-quantum")]
    Rsa3072Dilithium2,
    #[cfg(feature = "post-quantum")]
    Rsa3072Falcon512,
    #[cfg(feature = "post-quantum")]
    Rsa3072SphincsSha2128f,
    #[cfg(feature = "post-quantum")]
    P256Dilithium2,
    #[cfg(feature = "post-quantum")]
    P256Falcon512,
    #[cfg(feature = "post-quantum")]
    P256SphincsSha2128f,
    Unknown,
}

struct AlgorithmInfo {
    tag: KeyAlgorithm,
    name: &'static str,
    plain: KeyAlgorithm,
    digest: DigestAlgorithm,
}

// One row per identifier the wire can carry. Every helper below reads a
// column of this table so that a new tag cannot be half-registered.
#[rustfmt::skip]
static ALGORITHMS: &[AlgorithmInfo] = &[
    AlgorithmInfo { tag: KeyAlgorithm::Dss,           name: "ssh-dss",                  plain: KeyAlgorithm::Dss,       digest: DigestAlgorithm::Sha1 },
    AlgorithmInfo { tag: KeyAlgorithm::Rsa,           name: "ssh-rsa",                  plain: KeyAlgorithm::Rsa,       digest: DigestAlgorithm::Sha1 },
    AlgorithmInfo { tag: KeyAlgorithm::Ecdsa,         name: "ssh-ecdsa",                plain: KeyAlgorithm::Ecdsa,     digest: DigestAlgorithm::Auto },
    AlgorithmInfo { tag: KeyAlgorithm::EcdsaP256,     name: "ecdsa-sha2-nistp256",      plain: KeyAlgorithm::EcdsaP256, digest: DigestAlgorithm::Sha256 },
    AlgorithmInfo { tag: KeyAlgorithm::EcdsaP384,     name: "ecdsa-sha2-nistp384",      plain: KeyAlgorithm::EcdsaP384, digest: DigestAlgorithm::Sha384 },
    AlgorithmInfo { tag: KeyAlgorithm::EcdsaP521,     name: "ecdsa-sha2-nistp521",      plain: KeyAlgorithm::EcdsaP521, digest: DigestAlgorithm::Sha512 },
    AlgorithmInfo { tag: KeyAlgorithm::Ed25519,       name: "ssh-ed25519",              plain: KeyAlgorithm::Ed25519,   digest: DigestAlgorithm::Auto },
    AlgorithmInfo { tag: KeyAlgorithm::DssCert,       name: "ssh-dss-cert-v01@openssh.com",             plain: KeyAlgorithm::Dss,       digest: DigestAlgorithm::Sha1 },
    AlgorithmInfo { tag: KeyAlgorithm::RsaCert,       name: "ssh-rsa-cert-v01@openssh.com",             plain: KeyAlgorithm::Rsa,       digest: DigestAlgorithm::Sha1 },
    AlgorithmInfo { tag: KeyAlgorithm::EcdsaP256Cert, name: "ecdsa-sha2-nistp256-cert-v01@openssh.com", plain: KeyAlgorithm::EcdsaP256, digest: DigestAlgorithm::Sha256 },
    AlgorithmInfo { tag: KeyAlgorithm::EcdsaP384Cert, name: "ecdsa-sha2-nistp384-cert-v01@openssh.com", plain: KeyAlgorithm::EcdsaP384, digest: DigestAlgorithm::Sha384 },
    AlgorithmInfo { tag: KeyAlgorithm::EcdsaP521Cert, name: "ecdsa-sha2-nistp521-cert-v01@openssh.com", plain: KeyAlgorithm::EcdsaP521, digest: DigestAlgorithm::Sha512 },
    AlgorithmInfo { tag: KeyAlgorithm::Ed25519Cert,   name: "ssh-ed25519-cert-v01@openssh.com",         plain: KeyAlgorithm::Ed25519,   digest: DigestAlgorithm::Auto },
    AlgorithmInfo { tag: KeyAlgorithm::SkEcdsa,       name: "sk-ecdsa-sha2-nistp256@openssh.com",       plain: KeyAlgorithm::SkEcdsa,   digest: DigestAlgorithm::Sha256 },
    AlgorithmInfo { tag: KeyAlgorithm::SkEd25519,     name: "sk-ssh-ed25519@openssh.com",               plain: KeyAlgorithm::SkEd25519, digest: DigestAlgorithm::Auto },
    AlgorithmInfo { tag: KeyAlgorithm::SkEcdsaCert,   name: "sk-ecdsa-sha2-nistp256-cert-v01@openssh.com", plain: KeyAlgorithm::SkEcdsa,   digest: DigestAlgorithm::Sha256 },
    AlgorithmInfo { tag: KeyAlgorithm::SkEd25519Cert, name: "sk-ssh-ed25519-cert-v01@openssh.com",         plain: KeyAlgorithm::SkEd25519, digest: DigestAlgorithm::Auto },
];

#[cfg(feature = "post-quantum")]
#[rustfmt::skip]
static PQ_ALGORITHMS: &[AlgorithmInfo] = &[
    AlgorithmInfo { tag: KeyAlgorithm::Dilithium2,             name: "ssh-dilithium2",                 plain: KeyAlgorithm::Dilithium2,             digest: DigestAlgorithm::Auto },
    AlgorithmInfo { tag: KeyAlgorithm::Falcon512,              name: "ssh-falcon512",                  plain: KeyAlgorithm::Falcon512,              digest: DigestAlgorithm::Auto },
    AlgorithmInfo { tag: KeyAlgorithm::SphincsSha2128f,        name: "ssh-sphincssha2128fsimple",      plain: KeyAlgorithm::SphincsSha2128f,        digest: DigestAlgorithm::Auto },
    AlgorithmInfo { tag: KeyAlgorithm::Rsa3072Dilithium2,      name: "ssh-rsa3072-dilithium2",         plain: KeyAlgorithm::Rsa3072Dilithium2,      digest: DigestAlgorithm::Sha256 },
    AlgorithmInfo { tag: KeyAlgorithm::Rsa3072Falcon512,       name: "ssh-rsa3072-falcon512",          plain: KeyAlgorithm::Rsa3072Falcon512,       digest: DigestAlgorithm::Sha256 },
    AlgorithmInfo { tag: KeyAlgorithm::Rsa3072SphincsSha2128f, name: "ssh-rsa3072-sphincssha2128fsimple", plain: KeyAlgorithm::Rsa3072SphincsSha2128f, digest: DigestAlgorithm::Sha256 },
    AlgorithmInfo { tag: KeyAlgorithm::P256Dilithium2,         name: "ssh-p256-dilithium2",            plain: KeyAlgorithm::P256Dilithium2,         digest: DigestAlgorithm::Sha256 },
    AlgorithmInfo { tag: KeyAlgorithm::P256Falcon512,          name: "ssh-p256-falcon512",             plain: KeyAlgorithm::P256Falcon512,          digest: DigestAlgorithm::Sha256 },
    AlgorithmInfo { tag: KeyAlgorithm::P256SphincsSha2128f,    name: "ssh-p256-sphincssha2128fsimple", plain: KeyAlgorithm::P256SphincsSha2128f,    digest: DigestAlgorithm::Sha256 },
];

#[cfg(not(feature = "post-quantum"))]
static PQ_ALGORITHMS: &[AlgorithmInfo] = &[];

fn rows() -> impl Iterator<Item = &'static AlgorithmInfo> {
    ALGORITHMS.iter().chain(PQ_ALGORITHMS.iter())
}

impl KeyAlgorithm {
    fn info(self) -> Option<&'static AlgorithmInfo> {
        rows().find(|info| info.tag == self)
    }

    /// The canonical SSH identifier, or `None` for `Rsa1` and `Unknown`
    pub fn name(self) -> Option<&'static str> {
        self.info().map(|info| info.name)
    }

    /// Parse a key algorithm name, including the legacy aliases
    pub fn from_name(name: &str) -> KeyAlgorithm {
        match name {
            "rsa" => return KeyAlgorithm::Rsa,
            "dsa" => return KeyAlgorithm::Dss,
            "ssh-ecdsa" | "ecdsa" => return KeyAlgorithm::EcdsaP256,
            _ => (),
        }
        rows()
            .find(|info| info.name == name && info.tag != KeyAlgorithm::Ecdsa)
            .map_or(KeyAlgorithm::Unknown, |info| info.tag)
    }

    /// Parse a signature algorithm name
    ///
    /// Like [`from_name()`](#method.from_name), except that the RFC 8332
    /// SHA-2 identifiers map back to the RSA key algorithm.
    pub fn from_signature_name(name: &str) -> KeyAlgorithm {
        match name {
            "rsa-sha2-256" | "rsa-sha2-512" => KeyAlgorithm::Rsa,
            _ => KeyAlgorithm::from_name(name),
        }
    }

    /// The digest implied by a signature algorithm name
    ///
    /// Unknown names yield `Auto` with a warning, matching the behavior of
    /// existing deployments.
    pub fn hash_from_name(name: &str) -> DigestAlgorithm {
        match name {
            "rsa-sha2-256" => return DigestAlgorithm::Sha256,
            "rsa-sha2-512" => return DigestAlgorithm::Sha512,
            _ => (),
        }
        match rows().find(|info| info.name == name) {
            Some(info) => info.digest,
            None => {
                warn!("Unknown signature name {}", name);
                DigestAlgorithm::Auto
            }
        }
    }

    /// The digest this algorithm signs with by default
    pub fn default_digest(self) -> DigestAlgorithm {
        self.info().map_or(DigestAlgorithm::Auto, |info| info.digest)
    }

    /// Strip the certificate wrapping from the tag
    pub fn plain(self) -> KeyAlgorithm {
        self.info().map_or(self, |info| info.plain)
    }

    pub fn is_cert(self) -> bool {
        self.plain() != self && self != KeyAlgorithm::Unknown
    }

    pub fn is_sk(self) -> bool {
        matches!(
            self,
            KeyAlgorithm::SkEcdsa
                | KeyAlgorithm::SkEd25519
                | KeyAlgorithm::SkEcdsaCert
                | KeyAlgorithm::SkEd25519Cert
        )
    }

    /// The on-the-wire signature algorithm identifier for this key signing
    /// with the given digest
    ///
    /// Only RSA (and its certificate variant) actually varies with the
    /// digest; everything else signs under its own identifier.
    pub fn signature_name(self, digest: DigestAlgorithm) -> Option<&'static str> {
        match self {
            KeyAlgorithm::Rsa => match digest {
                DigestAlgorithm::Sha256 => Some("rsa-sha2-256"),
                DigestAlgorithm::Sha512 => Some("rsa-sha2-512"),
                DigestAlgorithm::Sha1 | DigestAlgorithm::Auto => Some("ssh-rsa"),
                _ => None,
            },
            KeyAlgorithm::RsaCert => match digest {
                DigestAlgorithm::Sha256 => Some("rsa-sha2-256-cert-v01@openssh.com"),
                DigestAlgorithm::Sha512 => Some("rsa-sha2-512-cert-v01@openssh.com"),
                DigestAlgorithm::Sha1 | DigestAlgorithm::Auto => {
                    Some("ssh-rsa-cert-v01@openssh.com")
                }
                _ => None,
            },
            _ => self.name(),
        }
    }

    /// `true` for pure post-quantum and hybrid tags
    pub fn is_oqs(self) -> bool {
        match self {
            #[cfg(feature = "post-quantum")]
            KeyAlgorithm::Dilithium2
            | KeyAlgorithm::Falcon512
            | KeyAlgorithm::SphincsSha2128f => true,
            _ => self.is_hybrid(),
        }
    }

    pub fn is_hybrid(self) -> bool {
        self.is_rsa_hybrid() || self.is_ecdsa_hybrid()
    }

    pub fn is_rsa_hybrid(self) -> bool {
        match self {
            #[cfg(feature = "post-quantum")]
            KeyAlgorithm::Rsa3072Dilithium2
            | KeyAlgorithm::Rsa3072Falcon512
            | KeyAlgorithm::Rsa3072SphincsSha2128f => true,
            _ => false,
        }
    }

    pub fn is_ecdsa_hybrid(self) -> bool {
        match self {
            #[cfg(feature = "post-quantum")]
            KeyAlgorithm::P256Dilithium2
            | KeyAlgorithm::P256Falcon512
            | KeyAlgorithm::P256SphincsSha2128f => true,
            _ => false,
        }
    }

    /// The OQS mechanism backing a post-quantum or hybrid tag
    #[cfg(feature = "post-quantum")]
    pub fn oqs_algorithm(self) -> Option<oqs::sig::Algorithm> {
        use oqs::sig::Algorithm;
        match self {
            KeyAlgorithm::Dilithium2 | KeyAlgorithm::Rsa3072Dilithium2 | KeyAlgorithm::P256Dilithium2 => {
                Some(Algorithm::Dilithium2)
            }
            KeyAlgorithm::Falcon512 | KeyAlgorithm::Rsa3072Falcon512 | KeyAlgorithm::P256Falcon512 => {
                Some(Algorithm::Falcon512)
            }
            KeyAlgorithm::SphincsSha2128f
            | KeyAlgorithm::Rsa3072SphincsSha2128f
            | KeyAlgorithm::P256SphincsSha2128f => Some(Algorithm::SphincsSha2128fSimple),
            _ => None,
        }
    }

    /// The classical half of a hybrid tag
    pub fn hybrid_classical(self) -> Option<KeyAlgorithm> {
        if self.is_rsa_hybrid() {
            Some(KeyAlgorithm::Rsa)
        } else if self.is_ecdsa_hybrid() {
            Some(KeyAlgorithm::EcdsaP256)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn name_tag_roundtrip() {
        for info in rows() {
            if info.tag == KeyAlgorithm::Ecdsa {
                // The deprecated generic tag parses as P-256.
                assert_eq!(KeyAlgorithm::from_name(info.name), KeyAlgorithm::EcdsaP256);
            } else {
                assert_eq!(KeyAlgorithm::from_name(info.name), info.tag);
            }
        }
        assert_eq!(KeyAlgorithm::from_name("ssh-rsa1"), KeyAlgorithm::Unknown);
        assert_eq!(KeyAlgorithm::from_name(""), KeyAlgorithm::Unknown);
    }

    #[test]
    fn legacy_aliases() {
        assert_eq!(KeyAlgorithm::from_name("rsa"), KeyAlgorithm::Rsa);
        assert_eq!(KeyAlgorithm::from_name("dsa"), KeyAlgorithm::Dss);
        assert_eq!(KeyAlgorithm::from_name("ecdsa"), KeyAlgorithm::EcdsaP256);
        assert_eq!(KeyAlgorithm::from_name("ssh-ecdsa"), KeyAlgorithm::EcdsaP256);
    }

    #[test]
    fn signature_names() {
        assert_eq!(
            KeyAlgorithm::from_signature_name("rsa-sha2-256"),
            KeyAlgorithm::Rsa
        );
        assert_eq!(
            KeyAlgorithm::from_signature_name("rsa-sha2-512"),
            KeyAlgorithm::Rsa
        );
        assert_eq!(
            KeyAlgorithm::Rsa.signature_name(DigestAlgorithm::Sha512),
            Some("rsa-sha2-512")
        );
        assert_eq!(
            KeyAlgorithm::Rsa.signature_name(DigestAlgorithm::Sha1),
            Some("ssh-rsa")
        );
        assert_eq!(
            KeyAlgorithm::RsaCert.signature_name(DigestAlgorithm::Sha256),
            Some("rsa-sha2-256-cert-v01@openssh.com")
        );
        assert_eq!(
            KeyAlgorithm::Ed25519.signature_name(DigestAlgorithm::Auto),
            Some("ssh-ed25519")
        );
    }

    #[test]
    fn hash_table() {
        assert_eq!(KeyAlgorithm::hash_from_name("ssh-rsa"), DigestAlgorithm::Sha1);
        assert_eq!(KeyAlgorithm::hash_from_name("ssh-dss"), DigestAlgorithm::Sha1);
        assert_eq!(
            KeyAlgorithm::hash_from_name("rsa-sha2-256"),
            DigestAlgorithm::Sha256
        );
        assert_eq!(
            KeyAlgorithm::hash_from_name("rsa-sha2-512"),
            DigestAlgorithm::Sha512
        );
        assert_eq!(
            KeyAlgorithm::hash_from_name("ecdsa-sha2-nistp384"),
            DigestAlgorithm::Sha384
        );
        assert_eq!(
            KeyAlgorithm::hash_from_name("ecdsa-sha2-nistp521"),
            DigestAlgorithm::Sha512
        );
        assert_eq!(
            KeyAlgorithm::hash_from_name("sk-ecdsa-sha2-nistp256@openssh.com"),
            DigestAlgorithm::Sha256
        );
        assert_eq!(
            KeyAlgorithm::hash_from_name("ssh-ed25519"),
            DigestAlgorithm::Auto
        );
        // Unknown identifiers fall back to Auto.
        assert_eq!(
            KeyAlgorithm::hash_from_name("ssh-nonsense"),
            DigestAlgorithm::Auto
        );
    }

    #[test]
    fn plain_projection_is_idempotent() {
        for info in rows() {
            assert_eq!(info.tag.plain().plain(), info.tag.plain());
        }
    }

    #[test]
    fn cert_suffix_matches_predicate() {
        for info in rows() {
            assert_eq!(
                info.tag.is_cert(),
                info.name.ends_with("-cert-v01@openssh.com")
            );
        }
    }

    #[cfg(feature = "post-quantum")]
    #[test]
    fn hybrid_classification() {
        assert!(KeyAlgorithm::Rsa3072Dilithium2.is_hybrid());
        assert!(KeyAlgorithm::Rsa3072Dilithium2.is_rsa_hybrid());
        assert!(KeyAlgorithm::P256Falcon512.is_ecdsa_hybrid());
        assert!(KeyAlgorithm::Dilithium2.is_oqs());
        assert!(!KeyAlgorithm::Dilithium2.is_hybrid());
        assert_eq!(
            KeyAlgorithm::Rsa3072Dilithium2.hybrid_classical(),
            Some(KeyAlgorithm::Rsa)
        );
        assert_eq!(
            KeyAlgorithm::P256Dilithium2.hybrid_classical(),
            Some(KeyAlgorithm::EcdsaP256)
        );
    }
}
