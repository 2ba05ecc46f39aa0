//! Integrity checksum of the control report.
//!
//! The device expects a CRC-16/USB (reflected polynomial 0x8005, initial
//! value 0xFFFF, output XOR 0xFFFF) over a fixed span that skips the report
//! id and the trailing checksum itself. The checksum is stored big-endian.

use byteorder::{BigEndian, ByteOrder};

use crate::protocol::commands::{CHECKSUM_LENGTH, CHECKSUM_START, CONTROL_REPORT_SIZE};

/// Reflected form of the 0x8005 polynomial.
const CRC16_POLY_REFLECTED: u16 = 0xA001;

/// Offset of the stored checksum in the control report.
pub const CHECKSUM_OFFSET: usize = CHECKSUM_START + CHECKSUM_LENGTH;

/// CRC-16/USB over `bytes`.
pub fn crc16_usb(bytes: &[u8]) -> u16 {
    let mut crc = 0xFFFFu16;
    for &b in bytes {
        crc ^= b as u16;
        for _ in 0..8 {
            let mask = 0u16.wrapping_sub(crc & 1);
            crc = (crc >> 1) ^ (CRC16_POLY_REFLECTED & mask);
        }
    }
    crc ^ 0xFFFF
}

/// Compute the checksum of an encoded control report.
pub fn compute(report: &[u8; CONTROL_REPORT_SIZE]) -> u16 {
    crc16_usb(&report[CHECKSUM_START..CHECKSUM_OFFSET])
}

/// Checksum stored in an encoded control report.
pub fn stored(report: &[u8; CONTROL_REPORT_SIZE]) -> u16 {
    BigEndian::read_u16(&report[CHECKSUM_OFFSET..])
}

/// Whether the stored checksum matches the computed one.
pub fn validate(report: &[u8; CONTROL_REPORT_SIZE]) -> bool {
    compute(report) == stored(report)
}

/// Recompute and store the checksum in place.
pub fn seal(report: &mut [u8; CONTROL_REPORT_SIZE]) -> u16 {
    let checksum = compute(report);
    BigEndian::write_u16(&mut report[CHECKSUM_OFFSET..], checksum);
    checksum
}
