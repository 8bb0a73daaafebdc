//! CRC-16 used by the 2JCIE-BU01 serial frame protocol.

/// Compute the CRC-16 over `bytes`.
///
/// Reflected variant with polynomial 0xA001 and initial value 0xFFFF, no
/// final XOR (CRC-16/MODBUS). Serialized little-endian on the wire.
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in bytes {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            let lsb = crc & 1;
            crc >>= 1;
            if lsb == 1 {
                crc ^= 0xA001;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // Standard CRC-16/MODBUS check value for "123456789".
        assert_eq!(crc16(b"123456789"), 0x4B37);
    }

    #[test]
    fn test_empty_input_is_initial_value() {
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn test_read_command_frame() {
        // Read command for register 0x5021, CRC over the full frame prefix.
        let frame = [0x52, 0x42, 0x05, 0x00, 0x01, 0x21, 0x50];
        let crc = crc16(&frame);
        assert_eq!(crc.to_le_bytes(), [0xE2, 0x4B]);
    }

    #[test]
    fn test_single_bit_flips_always_detected() {
        // CRC16 detects any single-bit corruption; check exhaustively over
        // every bit of a representative frame.
        let frame: Vec<u8> = (0u8..32).collect();
        let reference = crc16(&frame);
        for byte in 0..frame.len() {
            for bit in 0..8 {
                let mut corrupted = frame.clone();
                corrupted[byte] ^= 1 << bit;
                assert_ne!(
                    crc16(&corrupted),
                    reference,
                    "flip of byte {byte} bit {bit} went undetected"
                );
            }
        }
    }
}
