use super::ParseError;

/// DNSSEC OK bit in the EDNS flags word (RFC 3225)
const DO_BIT: u16 = 0x8000;

/// EDNS0 OPT pseudo-record (RFC 6891)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdnsOpt {
    pub udp_payload_size: u16,
    pub extended_rcode: u8,
    pub version: u8,
    pub flags: u16,
    pub options: Vec<(u16, Vec<u8>)>,
}

impl Default for EdnsOpt {
    fn default() -> Self {
        Self {
            udp_payload_size: 1232,
            extended_rcode: 0,
            version: 0,
            flags: 0,
            options: Vec::new(),
        }
    }
}

impl EdnsOpt {
    /// OPT record advertising `payload_size` with the DO bit set
    pub fn dnssec_ok(payload_size: u16) -> Self {
        Self {
            udp_payload_size: payload_size,
            flags: DO_BIT,
            ..Self::default()
        }
    }

    pub fn do_flag(&self) -> bool {
        self.flags & DO_BIT != 0
    }

    /// Interpret the class/TTL/RDATA of an OPT record.
    /// CLASS carries the payload size and TTL packs
    /// extended RCODE, version and flags.
    pub fn parse_from_resource(class: u16, ttl: u32, rdata: &[u8]) -> Result<Self, ParseError> {
        let mut options = Vec::new();
        let mut pos = 0;
        while pos + 4 <= rdata.len() {
            let code = u16::from_be_bytes([rdata[pos], rdata[pos + 1]]);
            let len = u16::from_be_bytes([rdata[pos + 2], rdata[pos + 3]]) as usize;
            pos += 4;
            let data = rdata
                .get(pos..pos + len)
                .ok_or_else(|| ParseError::InvalidRdata("OPT".to_string()))?;
            options.push((code, data.to_vec()));
            pos += len;
        }

        Ok(Self {
            udp_payload_size: class,
            extended_rcode: (ttl >> 24) as u8,
            version: (ttl >> 16) as u8,
            flags: ttl as u16,
            options,
        })
    }

    /// Append the OPT record to `out` in wire form
    pub fn write(&self, out: &mut Vec<u8>) {
        let ttl = ((self.extended_rcode as u32) << 24)
            | ((self.version as u32) << 16)
            | self.flags as u32;
        let mut rdata = Vec::new();
        for (code, data) in &self.options {
            rdata.extend_from_slice(&code.to_be_bytes());
            rdata.extend_from_slice(&(data.len() as u16).to_be_bytes());
            rdata.extend_from_slice(data);
        }

        out.push(0);
        out.extend_from_slice(&41u16.to_be_bytes());
        out.extend_from_slice(&self.udp_payload_size.to_be_bytes());
        out.extend_from_slice(&ttl.to_be_bytes());
        out.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        out.extend_from_slice(&rdata);
    }
}
