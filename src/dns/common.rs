use bitstream_io::{BitReader, BitWriter, Endianness};

use super::ParseError;

/// Fixed-layout wire structures that are read and written bit by bit.
///
/// Variable-length sections that may contain compression pointers are
/// decoded by offset instead, since they need the whole packet.
pub trait PacketComponent {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError>;
    fn read<E: Endianness>(&mut self, reader: &mut BitReader<&[u8], E>) -> Result<(), ParseError>;
}

/// Read a big-endian u16 at `offset`
pub(crate) fn read_u16(buf: &[u8], offset: usize) -> Result<u16, ParseError> {
    buf.get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(ParseError::Truncated(offset))
}

/// Read a big-endian u32 at `offset`
pub(crate) fn read_u32(buf: &[u8], offset: usize) -> Result<u32, ParseError> {
    buf.get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(ParseError::Truncated(offset))
}
