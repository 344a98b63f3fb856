use std::fmt;

use ring::signature::{self, RsaPublicKeyComponents, UnparsedPublicKey};

/// DNSSEC algorithm numbers (RFC 4034, 5155, 5702, 6605, 8080, 8624)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DnsSecAlgorithm {
    RsaMd5 = 1,
    DH = 2,
    DSA = 3,
    RsaSha1 = 5,
    DsaNsec3Sha1 = 6,
    RsaSha1Nsec3Sha1 = 7,
    RsaSha256 = 8,
    RsaSha512 = 10,
    EccGost = 12,
    EcdsaP256Sha256 = 13,
    EcdsaP384Sha384 = 14,
    Ed25519 = 15,
    Ed448 = 16,
}

impl DnsSecAlgorithm {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::RsaMd5),
            2 => Some(Self::DH),
            3 => Some(Self::DSA),
            5 => Some(Self::RsaSha1),
            6 => Some(Self::DsaNsec3Sha1),
            7 => Some(Self::RsaSha1Nsec3Sha1),
            8 => Some(Self::RsaSha256),
            10 => Some(Self::RsaSha512),
            12 => Some(Self::EccGost),
            13 => Some(Self::EcdsaP256Sha256),
            14 => Some(Self::EcdsaP384Sha384),
            15 => Some(Self::Ed25519),
            16 => Some(Self::Ed448),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Algorithms this crate can verify signatures for
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            Self::RsaSha1
                | Self::RsaSha1Nsec3Sha1
                | Self::RsaSha256
                | Self::RsaSha512
                | Self::EcdsaP256Sha256
                | Self::EcdsaP384Sha384
                | Self::Ed25519
        )
    }

    /// Recommended for signing per RFC 8624
    pub fn is_recommended(&self) -> bool {
        matches!(
            self,
            Self::RsaSha256 | Self::EcdsaP256Sha256 | Self::Ed25519
        )
    }

    fn is_rsa(&self) -> bool {
        matches!(
            self,
            Self::RsaMd5 | Self::RsaSha1 | Self::RsaSha1Nsec3Sha1 | Self::RsaSha256 | Self::RsaSha512
        )
    }

    /// Check `sig` over `message` with a DNSKEY public key in its DNS
    /// encoding. Malformed keys or signatures simply fail.
    pub fn verify(&self, public_key: &[u8], message: &[u8], sig: &[u8]) -> bool {
        match self {
            Self::RsaSha1 | Self::RsaSha1Nsec3Sha1 => verify_rsa(
                &signature::RSA_PKCS1_1024_8192_SHA1_FOR_LEGACY_USE_ONLY,
                public_key,
                message,
                sig,
            ),
            Self::RsaSha256 => verify_rsa(
                &signature::RSA_PKCS1_1024_8192_SHA256_FOR_LEGACY_USE_ONLY,
                public_key,
                message,
                sig,
            ),
            Self::RsaSha512 => verify_rsa(
                &signature::RSA_PKCS1_1024_8192_SHA512_FOR_LEGACY_USE_ONLY,
                public_key,
                message,
                sig,
            ),
            Self::EcdsaP256Sha256 => {
                verify_ecdsa(&signature::ECDSA_P256_SHA256_FIXED, 64, public_key, message, sig)
            }
            Self::EcdsaP384Sha384 => {
                verify_ecdsa(&signature::ECDSA_P384_SHA384_FIXED, 96, public_key, message, sig)
            }
            Self::Ed25519 => {
                public_key.len() == 32
                    && UnparsedPublicKey::new(&signature::ED25519, public_key)
                        .verify(message, sig)
                        .is_ok()
            }
            _ => false,
        }
    }

    /// Estimated key strength in bits. RSA sizes come from the modulus,
    /// curve algorithms have fixed sizes.
    pub fn key_length_bits(&self, public_key: &[u8]) -> Option<u32> {
        match self {
            Self::EcdsaP256Sha256 | Self::Ed25519 => Some(256),
            Self::EcdsaP384Sha384 => Some(384),
            Self::Ed448 => Some(448),
            rsa if rsa.is_rsa() => {
                let (_, modulus) = split_rsa_key(public_key)?;
                let leading = modulus.iter().take_while(|b| **b == 0).count();
                let significant = &modulus[leading..];
                let first = *significant.first()?;
                Some((significant.len() as u32 - 1) * 8 + (8 - first.leading_zeros()))
            }
            _ => None,
        }
    }
}

/// Split an RFC 3110 RSA public key into (exponent, modulus)
fn split_rsa_key(key: &[u8]) -> Option<(&[u8], &[u8])> {
    let (exp_len, rest) = match *key.first()? {
        0 => {
            let len = u16::from_be_bytes([*key.get(1)?, *key.get(2)?]) as usize;
            (len, &key[3..])
        }
        len => (len as usize, &key[1..]),
    };
    if exp_len == 0 || rest.len() <= exp_len {
        return None;
    }
    Some(rest.split_at(exp_len))
}

fn verify_rsa(
    params: &'static signature::RsaParameters,
    public_key: &[u8],
    message: &[u8],
    sig: &[u8],
) -> bool {
    let Some((e, n)) = split_rsa_key(public_key) else {
        return false;
    };
    RsaPublicKeyComponents { n, e }
        .verify(params, message, sig)
        .is_ok()
}

fn verify_ecdsa(
    alg: &'static signature::EcdsaVerificationAlgorithm,
    key_len: usize,
    public_key: &[u8],
    message: &[u8],
    sig: &[u8],
) -> bool {
    if public_key.len() != key_len {
        return false;
    }
    // DNSKEY carries the raw point; ring wants the uncompressed SEC1 form
    let mut point = Vec::with_capacity(key_len + 1);
    point.push(0x04);
    point.extend_from_slice(public_key);
    UnparsedPublicKey::new(alg, &point)
        .verify(message, sig)
        .is_ok()
}

impl fmt::Display for DnsSecAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RsaMd5 => "RSAMD5",
            Self::DH => "DH",
            Self::DSA => "DSA",
            Self::RsaSha1 => "RSASHA1",
            Self::DsaNsec3Sha1 => "DSA-NSEC3-SHA1",
            Self::RsaSha1Nsec3Sha1 => "RSASHA1-NSEC3-SHA1",
            Self::RsaSha256 => "RSASHA256",
            Self::RsaSha512 => "RSASHA512",
            Self::EccGost => "ECC-GOST",
            Self::EcdsaP256Sha256 => "ECDSAP256SHA256",
            Self::EcdsaP384Sha384 => "ECDSAP384SHA384",
            Self::Ed25519 => "ED25519",
            Self::Ed448 => "ED448",
        };
        f.write_str(name)
    }
}

/// Mnemonic for an algorithm number, falling back to `ALG<n>`
pub fn algorithm_name(value: u8) -> String {
    DnsSecAlgorithm::from_u8(value)
        .map(|a| a.to_string())
        .unwrap_or_else(|| format!("ALG{}", value))
}
