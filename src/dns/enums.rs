use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resource record types the validator needs to name. Anything else is
/// carried through as `Unknown` with its numeric value.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DNSResourceType {
    #[default]
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    TXT,
    AAAA,
    SRV,
    NAPTR,
    DNAME,
    OPT,
    DS,
    SSHFP,
    RRSIG,
    NSEC,
    DNSKEY,
    NSEC3,
    NSEC3PARAM,
    TLSA,
    CDS,
    CDNSKEY,
    SVCB,
    HTTPS,
    CAA,
    Unknown(u16),
}

const NAMED_TYPES: &[(DNSResourceType, u16, &str)] = &[
    (DNSResourceType::A, 1, "A"),
    (DNSResourceType::NS, 2, "NS"),
    (DNSResourceType::CNAME, 5, "CNAME"),
    (DNSResourceType::SOA, 6, "SOA"),
    (DNSResourceType::PTR, 12, "PTR"),
    (DNSResourceType::MX, 15, "MX"),
    (DNSResourceType::TXT, 16, "TXT"),
    (DNSResourceType::AAAA, 28, "AAAA"),
    (DNSResourceType::SRV, 33, "SRV"),
    (DNSResourceType::NAPTR, 35, "NAPTR"),
    (DNSResourceType::DNAME, 39, "DNAME"),
    (DNSResourceType::OPT, 41, "OPT"),
    (DNSResourceType::DS, 43, "DS"),
    (DNSResourceType::SSHFP, 44, "SSHFP"),
    (DNSResourceType::RRSIG, 46, "RRSIG"),
    (DNSResourceType::NSEC, 47, "NSEC"),
    (DNSResourceType::DNSKEY, 48, "DNSKEY"),
    (DNSResourceType::NSEC3, 50, "NSEC3"),
    (DNSResourceType::NSEC3PARAM, 51, "NSEC3PARAM"),
    (DNSResourceType::TLSA, 52, "TLSA"),
    (DNSResourceType::CDS, 59, "CDS"),
    (DNSResourceType::CDNSKEY, 60, "CDNSKEY"),
    (DNSResourceType::SVCB, 64, "SVCB"),
    (DNSResourceType::HTTPS, 65, "HTTPS"),
    (DNSResourceType::CAA, 257, "CAA"),
];

impl DNSResourceType {
    /// Types whose RDATA embeds domain names that must be lowercased and
    /// decompressed for canonical form (RFC 4034 6.2, RFC 6840 5.1).
    pub fn has_embedded_names(&self) -> bool {
        matches!(
            self,
            DNSResourceType::NS
                | DNSResourceType::CNAME
                | DNSResourceType::SOA
                | DNSResourceType::PTR
                | DNSResourceType::MX
                | DNSResourceType::SRV
                | DNSResourceType::DNAME
        )
    }
}

impl From<u16> for DNSResourceType {
    fn from(value: u16) -> Self {
        NAMED_TYPES
            .iter()
            .find(|(_, code, _)| *code == value)
            .map(|(t, _, _)| *t)
            .unwrap_or(DNSResourceType::Unknown(value))
    }
}

impl From<DNSResourceType> for u16 {
    fn from(value: DNSResourceType) -> Self {
        match value {
            DNSResourceType::Unknown(code) => code,
            named => NAMED_TYPES
                .iter()
                .find(|(t, _, _)| *t == named)
                .map(|(_, code, _)| *code)
                .unwrap_or_default(),
        }
    }
}

impl fmt::Display for DNSResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DNSResourceType::Unknown(code) => write!(f, "TYPE{}", code),
            named => {
                let label = NAMED_TYPES
                    .iter()
                    .find(|(t, _, _)| t == named)
                    .map(|(_, _, label)| *label)
                    .unwrap_or("?");
                f.write_str(label)
            }
        }
    }
}

impl FromStr for DNSResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if let Some((t, _, _)) = NAMED_TYPES.iter().find(|(_, _, label)| *label == upper) {
            return Ok(*t);
        }
        // RFC 3597 generic form
        upper
            .strip_prefix("TYPE")
            .and_then(|n| n.parse::<u16>().ok())
            .map(DNSResourceType::from)
            .ok_or_else(|| format!("unknown record type '{}'", s))
    }
}

impl From<DNSResourceType> for String {
    fn from(value: DNSResourceType) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for DNSResourceType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DNSResourceClass {
    #[default]
    IN,
    CH,
    HS,
    Other(u16),
}

impl From<u16> for DNSResourceClass {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceClass::IN,
            3 => DNSResourceClass::CH,
            4 => DNSResourceClass::HS,
            other => DNSResourceClass::Other(other),
        }
    }
}

impl From<DNSResourceClass> for u16 {
    fn from(value: DNSResourceClass) -> Self {
        match value {
            DNSResourceClass::IN => 1,
            DNSResourceClass::CH => 3,
            DNSResourceClass::HS => 4,
            DNSResourceClass::Other(other) => other,
        }
    }
}
