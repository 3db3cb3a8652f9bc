//! # CRC-7 Implementation
//!
//! Optional CRC byte appended to Maestro serial commands when the
//! controller's "Enable CRC" setting is on.
//!
//! **Polynomial**: 0x91 (x^7 + x^3 + 1, processed LSB first)
//! **Initial Value**: 0x00

/// CRC-7 polynomial, bit-reversed for LSB-first processing
const CRC7_POLY: u8 = 0x91;

/// Precomputed CRC7 lookup table
const CRC7_TABLE: [u8; 256] = generate_crc7_table();

/// Generate CRC7 lookup table at compile time
const fn generate_crc7_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u8;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x01) != 0 {
                crc ^= CRC7_POLY;
            }
            crc >>= 1;
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Calculate the CRC-7 of a complete Maestro command
///
/// # Arguments
///
/// * `data` - Command bytes, including the Pololu start byte when present
///
/// # Returns
///
/// * `u8` - CRC byte to append (always below 0x80)
///
/// # Examples
///
/// ```
/// use maestro_drive::maestro::crc::crc7;
///
/// assert_eq!(crc7(&[0x83, 0x01]), 0x17);
/// ```
pub fn crc7(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;

    for &byte in data {
        crc = CRC7_TABLE[(crc ^ byte) as usize];
    }

    crc
}

/// Bitwise CRC-7, used to check the lookup table
#[cfg(test)]
fn crc7_slow(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;

    for &byte in data {
        crc ^= byte;

        for _ in 0..8 {
            if (crc & 0x01) != 0 {
                crc ^= CRC7_POLY;
            }
            crc >>= 1;
        }
    }

    crc
}
