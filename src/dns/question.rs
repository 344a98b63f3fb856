use super::{
    ParseError,
    common::read_u16,
    enums::{DNSResourceClass, DNSResourceType},
    name::DomainName,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSQuestion {
    pub name: DomainName,
    pub qtype: DNSResourceType,
    pub qclass: DNSResourceClass,
}

impl DNSQuestion {
    pub fn new(name: DomainName, qtype: DNSResourceType) -> Self {
        Self {
            name,
            qtype,
            qclass: DNSResourceClass::IN,
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        self.name.write_wire(out);
        out.extend_from_slice(&u16::from(self.qtype).to_be_bytes());
        out.extend_from_slice(&u16::from(self.qclass).to_be_bytes());
    }

    /// Decode a question at `offset`, returning it with the offset of the
    /// next section entry
    pub fn decode(packet: &[u8], offset: usize) -> Result<(Self, usize), ParseError> {
        let (name, pos) = DomainName::decode(packet, offset)?;
        let qtype = read_u16(packet, pos)?.into();
        let qclass = read_u16(packet, pos + 2)?.into();
        Ok((
            DNSQuestion {
                name,
                qtype,
                qclass,
            },
            pos + 4,
        ))
    }
}
