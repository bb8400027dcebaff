const POLYNOMIAL: u16 = 0x1021;
const INITIAL: u16 = 0xFFFF;

/// CRC-16/CCITT-FALSE: init 0xFFFF, poly 0x1021, MSB first, no final XOR.
pub fn crc16(data: impl AsRef<[u8]>) -> u16 {
    let mut crc = INITIAL;

    for byte in data.as_ref() {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }

    crc
}

/// Checksum rendered the way the `63` trailer carries it.
pub fn crc16_hex(data: impl AsRef<[u8]>) -> String {
    format!("{:04X}", crc16(data))
}
