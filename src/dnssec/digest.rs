use std::fmt;

use ring::digest;

/// DS digest types (RFC 4034, 4509, 6605)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DigestType {
    Sha1 = 1,
    Sha256 = 2,
    Gost94 = 3,
    Sha384 = 4,
}

impl DigestType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Sha1),
            2 => Some(Self::Sha256),
            3 => Some(Self::Gost94),
            4 => Some(Self::Sha384),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn is_supported(&self) -> bool {
        self.ring_algorithm().is_some()
    }

    pub fn digest_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 | Self::Gost94 => 32,
            Self::Sha384 => 48,
        }
    }

    fn ring_algorithm(&self) -> Option<&'static digest::Algorithm> {
        match self {
            Self::Sha1 => Some(&digest::SHA1_FOR_LEGACY_USE_ONLY),
            Self::Sha256 => Some(&digest::SHA256),
            Self::Sha384 => Some(&digest::SHA384),
            Self::Gost94 => None,
        }
    }

    /// Hash `data`, `None` when the digest type is not implemented
    pub fn digest(&self, data: &[u8]) -> Option<Vec<u8>> {
        self.ring_algorithm()
            .map(|alg| digest::digest(alg, data).as_ref().to_vec())
    }
}

impl fmt::Display for DigestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => write!(f, "SHA-1"),
            Self::Sha256 => write!(f, "SHA-256"),
            Self::Gost94 => write!(f, "GOST R 34.11-94"),
            Self::Sha384 => write!(f, "SHA-384"),
        }
    }
}
