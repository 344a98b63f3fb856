//! Minimal DNS wire codec: enough to send DNSSEC-aware queries and read
//! the answer, authority and additional sections of the replies.

pub mod common;
pub mod edns;
pub mod enums;
pub mod header;
pub mod name;
pub mod question;
pub mod resource;

use bitstream_io::{BigEndian, BitReader, BitWriter};
use common::PacketComponent;
use edns::EdnsOpt;
use enums::DNSResourceType;
use header::{DNSHeader, HEADER_LEN};
use name::DomainName;
use question::DNSQuestion;
use resource::DNSResource;
use tracing::trace;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSPacket {
    pub header: DNSHeader,
    pub questions: Vec<DNSQuestion>,
    pub answers: Vec<DNSResource>,
    pub authorities: Vec<DNSResource>,
    pub resources: Vec<DNSResource>,
    /// EDNS0 OPT record, lifted out of the additional section
    pub edns: Option<EdnsOpt>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid DNS header")]
    InvalidHeader,
    #[error("Invalid DNS label")]
    InvalidLabel,
    #[error("Packet truncated at offset {0}")]
    Truncated(usize),
    #[error("Invalid {0} record data")]
    InvalidRdata(String),
    #[error("Invalid bit stream: {0}")]
    InvalidBitStream(String),
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::InvalidBitStream(e.to_string())
    }
}

impl DNSPacket {
    /// Build a recursive query for `name`/`qtype` with the DO and CD bits set,
    /// so the resolver returns signatures without filtering bogus data.
    pub fn query(id: u16, name: &DomainName, qtype: DNSResourceType, payload_size: u16) -> Self {
        DNSPacket {
            header: DNSHeader {
                id,
                rd: true,
                cd: true,
                qdcount: 1,
                ..Default::default()
            },
            questions: vec![DNSQuestion::new(name.clone(), qtype)],
            edns: Some(EdnsOpt::dnssec_ok(payload_size)),
            ..Default::default()
        }
    }

    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        trace!("Parsing DNS packet, size: {} bytes", buf.len());
        if buf.len() < HEADER_LEN {
            return Err(ParseError::InvalidHeader);
        }
        let mut reader = BitReader::<_, BigEndian>::new(buf);
        let mut packet = DNSPacket::default();
        packet.header.read(&mut reader)?;

        let mut pos = HEADER_LEN;
        for _ in 0..packet.header.qdcount {
            let (question, next) = DNSQuestion::decode(buf, pos)?;
            packet.questions.push(question);
            pos = next;
        }
        for _ in 0..packet.header.ancount {
            let (record, next) = DNSResource::decode(buf, pos)?;
            packet.answers.push(record);
            pos = next;
        }
        for _ in 0..packet.header.nscount {
            let (record, next) = DNSResource::decode(buf, pos)?;
            packet.authorities.push(record);
            pos = next;
        }
        for _ in 0..packet.header.arcount {
            let (record, next) = DNSResource::decode(buf, pos)?;
            pos = next;
            if record.rtype == DNSResourceType::OPT && record.name.is_root() {
                packet.edns = Some(EdnsOpt::parse_from_resource(
                    record.raw_class,
                    record.ttl,
                    &record.rdata,
                )?);
                continue;
            }
            packet.resources.push(record);
        }

        Ok(packet)
    }

    pub fn serialize(&self) -> Result<Vec<u8>, ParseError> {
        let mut buf = Vec::new();
        let mut header = self.header.clone();
        header.qdcount = self.questions.len() as u16;
        header.ancount = self.answers.len() as u16;
        header.nscount = self.authorities.len() as u16;
        header.arcount = self.resources.len() as u16 + self.edns.is_some() as u16;
        {
            let mut writer: BitWriter<&mut Vec<u8>, BigEndian> = BitWriter::new(&mut buf);
            header.write(&mut writer)?;
        }

        for question in &self.questions {
            question.write(&mut buf);
        }
        for record in self
            .answers
            .iter()
            .chain(&self.authorities)
            .chain(&self.resources)
        {
            record.write(&mut buf);
        }
        if let Some(edns) = &self.edns {
            edns.write(&mut buf);
        }

        Ok(buf)
    }

    /// Effective response code, folding in the EDNS extended bits
    pub fn rcode(&self) -> u16 {
        let extended = self.edns.as_ref().map(|e| e.extended_rcode).unwrap_or(0);
        ((extended as u16) << 4) | self.header.rcode as u16
    }

    /// All records across the answer and authority sections
    pub fn records(&self) -> impl Iterator<Item = &DNSResource> {
        self.answers.iter().chain(&self.authorities)
    }
}
