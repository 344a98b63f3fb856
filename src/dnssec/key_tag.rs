/// Key tag of a DNSKEY (RFC 4034 Appendix B): a ones-complement style
/// checksum over the RDATA. Algorithm 1 uses the low modulus octets instead.
pub fn calculate_key_tag(flags: u16, protocol: u8, algorithm: u8, public_key: &[u8]) -> u16 {
    if algorithm == 1 {
        return match public_key {
            [.., hi, lo] => u16::from_be_bytes([*hi, *lo]),
            _ => 0,
        };
    }

    let [f0, f1] = flags.to_be_bytes();
    let header = [f0, f1, protocol, algorithm];
    // header is even-length so key octets keep their parity
    let sum: u32 = header
        .iter()
        .chain(public_key)
        .enumerate()
        .map(|(i, &b)| if i % 2 == 0 { (b as u32) << 8 } else { b as u32 })
        .sum();

    (sum.wrapping_add(sum >> 16) & 0xFFFF) as u16
}
