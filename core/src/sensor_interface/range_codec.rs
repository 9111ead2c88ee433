//! Six-bit character encoding used by the scanning rangefinder.
//!
//! Every character carries one digit, `codepoint - 0x30`, so the printable
//! range `'0'..='o'` maps onto `0..=63`. Digits are concatenated MSB-first.

use crate::prelude::{CoreError, CoreResult};

const DIGIT_BASE: u8 = b'0';
const DIGIT_BITS: u32 = 6;
const DIGIT_MASK: u32 = 0x3F;

pub struct RangeValueCodec;

impl RangeValueCodec {
    /// Largest value a group of `width` characters can carry.
    pub fn max_value(width: usize) -> u32 {
        (1u32 << (DIGIT_BITS * width as u32)) - 1
    }

    /// Decodes a 2- or 3-character group into a range value.
    pub fn decode(group: &[u8]) -> CoreResult<u32> {
        if group.len() != 2 && group.len() != 3 {
            return Err(CoreError::Format {
                index: 0,
                reason: format!("group of {} characters, expected 2 or 3", group.len()),
            });
        }
        if group == b"000" {
            return Ok(0);
        }

        let mut value = 0u32;
        for (position, &byte) in group.iter().enumerate() {
            let digit = Self::digit(byte).ok_or_else(|| CoreError::Format {
                index: position,
                reason: format!("character 0x{:02X} outside the encoding range", byte),
            })?;
            value = (value << DIGIT_BITS) | digit;
        }
        Ok(value)
    }

    /// Encodes `value` into `width` characters (2 or 3).
    pub fn encode(value: u32, width: usize) -> CoreResult<String> {
        if width != 2 && width != 3 {
            return Err(CoreError::InvalidParameter(format!(
                "group width {} is not 2 or 3",
                width
            )));
        }
        if value > Self::max_value(width) {
            return Err(CoreError::InvalidParameter(format!(
                "value {} does not fit in {} characters",
                value, width
            )));
        }

        let encoded = (0..width)
            .rev()
            .map(|shift| {
                let digit = (value >> (DIGIT_BITS * shift as u32)) & DIGIT_MASK;
                char::from(DIGIT_BASE + digit as u8)
            })
            .collect();
        Ok(encoded)
    }

    /// SCIP line checksum: low six bits of the byte sum, offset into the digit range.
    pub fn line_checksum(line: &[u8]) -> u8 {
        let sum: u32 = line.iter().map(|&b| u32::from(b)).sum();
        (sum & DIGIT_MASK) as u8 + DIGIT_BASE
    }

    fn digit(byte: u8) -> Option<u32> {
        // (cp - '!' + 33) - 48 collapses to cp - '0'
        let digit = i32::from(byte) - i32::from(b'!') + 33 - 48;
        if (0..=DIGIT_MASK as i32).contains(&digit) {
            Some(digit as u32)
        } else {
            None
        }
    }
}
