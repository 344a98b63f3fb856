use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::ParseError;

/// Maximum length of a single label in octets (RFC 1035 2.3.4)
pub const MAX_LABEL_LEN: usize = 63;

/// Maximum length of a full name in wire format (RFC 1035 2.3.4)
pub const MAX_NAME_LEN: usize = 255;

/// Maximum number of compression pointers followed while decoding one name
const MAX_POINTER_HOPS: usize = 64;

/// A fully-qualified, lowercase domain name.
///
/// Labels are stored leaf-first without the root label, so `www.example.com.`
/// is `["www", "example", "com"]` and the root zone is the empty list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainName {
    labels: Vec<String>,
}

/// Errors produced when a textual domain name is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("domain name is empty")]
    Empty,
    #[error("empty label in '{0}'")]
    EmptyLabel(String),
    #[error("label '{0}' exceeds 63 octets")]
    LabelTooLong(String),
    #[error("domain name exceeds 255 octets")]
    NameTooLong,
    #[error("invalid character {1:?} in label '{0}'")]
    InvalidCharacter(String, char),
}

impl DomainName {
    /// The root zone `.`
    pub fn root() -> Self {
        Self { labels: Vec::new() }
    }

    /// Parse a user-supplied host name, with or without the trailing dot.
    ///
    /// Only letters, digits, hyphens and underscores are accepted, and the
    /// result is lowercased.
    pub fn parse(input: &str) -> Result<Self, NameError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(NameError::Empty);
        }
        if trimmed == "." {
            return Ok(Self::root());
        }

        let body = trimmed.strip_suffix('.').unwrap_or(trimmed);
        let mut labels = Vec::new();
        for label in body.split('.') {
            if label.is_empty() {
                return Err(NameError::EmptyLabel(trimmed.to_string()));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(NameError::LabelTooLong(label.to_string()));
            }
            if let Some(c) = label
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
            {
                return Err(NameError::InvalidCharacter(label.to_string(), c));
            }
            labels.push(label.to_ascii_lowercase());
        }

        Self::from_labels(labels).ok_or(NameError::NameTooLong)
    }

    /// Build a name from leaf-first labels, checking only the length limits
    /// that the wire format imposes. Used for names decoded from responses.
    pub fn from_labels<I, S>(labels: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels: Vec<String> = labels
            .into_iter()
            .map(|l| l.as_ref().to_ascii_lowercase())
            .collect();
        if labels
            .iter()
            .any(|l| l.is_empty() || l.len() > MAX_LABEL_LEN)
        {
            return None;
        }
        let name = Self { labels };
        if name.wire_len() > MAX_NAME_LEN {
            return None;
        }
        Some(name)
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Leaf-first labels
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn first_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    /// Immediate parent, `None` for the root
    pub fn parent(&self) -> Option<DomainName> {
        if self.is_root() {
            None
        } else {
            Some(Self {
                labels: self.labels[1..].to_vec(),
            })
        }
    }

    /// Keep only the rightmost `count` labels
    pub fn trim_to(&self, count: usize) -> DomainName {
        let count = count.min(self.labels.len());
        Self {
            labels: self.labels[self.labels.len() - count..].to_vec(),
        }
    }

    /// Prepend a label, e.g. `example.com.` + `www`
    pub fn prepend(&self, label: &str) -> Option<DomainName> {
        let mut labels = Vec::with_capacity(self.labels.len() + 1);
        labels.push(label.to_string());
        labels.extend(self.labels.iter().cloned());
        Self::from_labels(labels)
    }

    /// `*.<self>`
    pub fn wildcard(&self) -> Option<DomainName> {
        self.prepend("*")
    }

    /// True when `self` equals `ancestor` or lies below it
    pub fn is_subdomain_of(&self, ancestor: &DomainName) -> bool {
        self.labels.len() >= ancestor.labels.len()
            && self.labels[self.labels.len() - ancestor.labels.len()..] == ancestor.labels[..]
    }

    /// Longest name that both `self` and `other` are subdomains of
    pub fn common_ancestor(&self, other: &DomainName) -> DomainName {
        let shared = self
            .labels
            .iter()
            .rev()
            .zip(other.labels.iter().rev())
            .take_while(|(a, b)| a == b)
            .count();
        self.trim_to(shared)
    }

    /// Every zone boundary from the root down to `self`, root first.
    ///
    /// `www.example.com.` yields `[".", "com.", "example.com.", "www.example.com."]`.
    pub fn hierarchy(&self) -> Vec<DomainName> {
        (0..=self.labels.len()).map(|n| self.trim_to(n)).collect()
    }

    /// Uncompressed, lowercase wire form
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len());
        self.write_wire(&mut out);
        out
    }

    pub fn write_wire(&self, out: &mut Vec<u8>) {
        for label in &self.labels {
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
        out.push(0);
    }

    pub fn wire_len(&self) -> usize {
        self.labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1
    }

    /// Canonical DNS name order (RFC 4034 6.1): labels compared right to
    /// left as lowercase octet strings, absent labels sorting first.
    pub fn canonical_cmp(&self, other: &DomainName) -> Ordering {
        let mut left = self.labels.iter().rev();
        let mut right = other.labels.iter().rev();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(a), Some(b)) => match a.as_bytes().cmp(b.as_bytes()) {
                    Ordering::Equal => continue,
                    unequal => return unequal,
                },
            }
        }
    }

    /// Decode a possibly-compressed name starting at `offset` in `packet`.
    ///
    /// Returns the name and the offset just past it in the original
    /// position (a pointer counts as two octets).
    pub fn decode(packet: &[u8], offset: usize) -> Result<(DomainName, usize), ParseError> {
        let mut labels = Vec::new();
        let mut pos = offset;
        let mut end = None;
        let mut hops = 0;

        loop {
            let len = *packet.get(pos).ok_or(ParseError::InvalidLabel)? as usize;
            match len & 0xC0 {
                0x00 => {
                    if len == 0 {
                        pos += 1;
                        break;
                    }
                    let label = packet
                        .get(pos + 1..pos + 1 + len)
                        .ok_or(ParseError::InvalidLabel)?;
                    let label =
                        std::str::from_utf8(label).map_err(|_| ParseError::InvalidLabel)?;
                    labels.push(label.to_string());
                    pos += 1 + len;
                }
                0xC0 => {
                    let low = *packet.get(pos + 1).ok_or(ParseError::InvalidLabel)? as usize;
                    if end.is_none() {
                        end = Some(pos + 2);
                    }
                    hops += 1;
                    if hops > MAX_POINTER_HOPS {
                        return Err(ParseError::InvalidLabel);
                    }
                    let target = ((len & 0x3F) << 8) | low;
                    if target >= pos {
                        // forward or self pointers would loop
                        return Err(ParseError::InvalidLabel);
                    }
                    pos = target;
                }
                _ => return Err(ParseError::InvalidLabel),
            }
        }

        let name = DomainName::from_labels(labels).ok_or(ParseError::InvalidLabel)?;
        Ok((name, end.unwrap_or(pos)))
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }
        for label in &self.labels {
            write!(f, "{}.", label)?;
        }
        Ok(())
    }
}

impl FromStr for DomainName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DomainName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "." {
            return Ok(Self::root());
        }
        // Serialized names may carry wildcard or hashed labels that the
        // strict host-name parser rejects.
        let body = value.strip_suffix('.').unwrap_or(&value);
        Self::from_labels(body.split('.')).ok_or(NameError::EmptyLabel(value))
    }
}

impl From<DomainName> for String {
    fn from(name: DomainName) -> Self {
        name.to_string()
    }
}

impl PartialOrd for DomainName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DomainName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical_cmp(other)
    }
}
