//! Shared fixtures for unit tests.

use crate::schema::{ADV_SENSOR_AND_CALCULATION, ADV_SENSOR_DATA};

/// Sensing field block: temperature 27.93 degC, humidity 54.21 %RH,
/// light 1000 lx, pressure 1013.250 hPa, noise 40.15 dB, eTVOC 20 ppb,
/// eCO2 500 ppm.
pub const SENSING_BLOCK: [u8; 16] = [
    0xE9, 0x0A, // temperature 2793
    0x2D, 0x15, // humidity 5421
    0xE8, 0x03, // light 1000
    0x02, 0x76, 0x0F, 0x00, // pressure 1013250
    0xAF, 0x0F, // noise 4015
    0x14, 0x00, // eTVOC 20
    0xF4, 0x01, // eCO2 500
];

/// Calculation field block: THI 72.50, WBGT 25.10 degC, vibration 0,
/// SI 12.3 kine, PGA 45.6 gal, seismic intensity 1.234.
pub const CALCULATION_BLOCK: [u8; 11] = [
    0x52, 0x1C, // thi 7250
    0xCE, 0x09, // wbgt 2510
    0x00, // vibration
    0x7B, 0x00, // si 123
    0xC8, 0x01, // pga 456
    0xD2, 0x04, // seismic_intensity 1234
];

/// Acceleration block: X -10.2 gal, Y 2.5 gal, Z 980.7 gal.
pub const ACCELERATION_BLOCK: [u8; 6] = [
    0x9A, 0xFF, // acc_x -102
    0x19, 0x00, // acc_y 25
    0x4F, 0x26, // acc_z 9807
];

/// 19-byte passive-scan advertisement (datatype 0x01).
pub fn simple_packet(seq: u8) -> Vec<u8> {
    let mut packet = vec![ADV_SENSOR_DATA, seq];
    packet.extend_from_slice(&SENSING_BLOCK);
    packet.push(0x00); // reserved
    packet
}

/// 19-byte indication half of a split advertisement (datatype 0x03).
pub fn indication_packet(seq: u8) -> Vec<u8> {
    let mut packet = vec![ADV_SENSOR_AND_CALCULATION, seq];
    packet.extend_from_slice(&SENSING_BLOCK);
    packet.push(0x00); // reserved
    packet
}

/// 27-byte scan-response half of a split advertisement (datatype 0x03).
pub fn response_packet(seq: u8) -> Vec<u8> {
    let mut packet = vec![ADV_SENSOR_AND_CALCULATION, seq];
    packet.extend_from_slice(&CALCULATION_BLOCK);
    packet.extend_from_slice(&ACCELERATION_BLOCK);
    packet.extend_from_slice(&[0u8; 8]); // reserved
    packet
}
