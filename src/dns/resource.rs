use super::{
    ParseError,
    common::{read_u16, read_u32},
    enums::{DNSResourceClass, DNSResourceType},
    name::DomainName,
};

/// A resource record with its RDATA held in canonical wire form:
/// embedded names decompressed and lowercased.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSResource {
    pub name: DomainName,
    pub rtype: DNSResourceType,
    pub rclass: DNSResourceClass,
    /// Raw class field, which OPT records reuse as the UDP payload size
    pub raw_class: u16,
    pub ttl: u32,
    pub rdata: Vec<u8>,
}

impl DNSResource {
    pub fn new(name: DomainName, rtype: DNSResourceType, ttl: u32, rdata: Vec<u8>) -> Self {
        Self {
            name,
            rtype,
            rclass: DNSResourceClass::IN,
            raw_class: 1,
            ttl,
            rdata,
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        self.name.write_wire(out);
        out.extend_from_slice(&u16::from(self.rtype).to_be_bytes());
        out.extend_from_slice(&self.raw_class.to_be_bytes());
        out.extend_from_slice(&self.ttl.to_be_bytes());
        out.extend_from_slice(&(self.rdata.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.rdata);
    }

    pub fn decode(packet: &[u8], offset: usize) -> Result<(Self, usize), ParseError> {
        let (name, pos) = DomainName::decode(packet, offset)?;
        let rtype: DNSResourceType = read_u16(packet, pos)?.into();
        let raw_class = read_u16(packet, pos + 2)?;
        let ttl = read_u32(packet, pos + 4)?;
        let rdlength = read_u16(packet, pos + 8)? as usize;
        let start = pos + 10;
        let end = start + rdlength;
        if end > packet.len() {
            return Err(ParseError::Truncated(start));
        }

        let rdata = if rtype.has_embedded_names() {
            canonical_rdata(packet, rtype, start, end)?
        } else {
            packet[start..end].to_vec()
        };

        Ok((
            DNSResource {
                name,
                rtype,
                rclass: raw_class.into(),
                raw_class,
                ttl,
                rdata,
            },
            end,
        ))
    }
}

/// Rebuild RDATA with its names expanded from compression pointers
fn canonical_rdata(
    packet: &[u8],
    rtype: DNSResourceType,
    start: usize,
    end: usize,
) -> Result<Vec<u8>, ParseError> {
    let mut out = Vec::with_capacity(end - start);
    let mut pos = start;

    let fixed_prefix = match rtype {
        DNSResourceType::MX => 2,
        DNSResourceType::SRV => 6,
        _ => 0,
    };
    out.extend_from_slice(packet.get(pos..pos + fixed_prefix).ok_or(ParseError::Truncated(pos))?);
    pos += fixed_prefix;

    let name_count = if rtype == DNSResourceType::SOA { 2 } else { 1 };
    for _ in 0..name_count {
        let (name, next) = DomainName::decode(packet, pos)?;
        name.write_wire(&mut out);
        pos = next;
    }

    if pos > end {
        return Err(ParseError::InvalidRdata(rtype.to_string()));
    }
    // SOA serial/refresh/retry/expire/minimum
    out.extend_from_slice(&packet[pos..end]);
    Ok(out)
}
