use crate::cursor::Cursor;
use crate::error::DecodeError;
use crate::prelude::*;

use chrono::{DateTime, Utc};

/// First holding register of the SunSpec inverter model block.
pub const BLOCK_START: u16 = 40069;

/// Number of registers read per poll.
pub const BLOCK_LENGTH: usize = 38;

/// Raw reading reserved by the firmware to mean "measurement not available",
/// as distinct from a true zero.
pub const NOT_IMPLEMENTED: u16 = 65535;

/// A contiguous run of holding registers as fetched from the inverter.
/// Immutable once constructed; one decode call owns it exclusively.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterBlock(Vec<u16>);

impl RegisterBlock {
    pub fn new(registers: Vec<u16>) -> Self {
        Self(registers)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders the registers as raw bytes, most-significant byte and
    /// most-significant word first, matching the device's layout.
    pub fn as_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.0.len() * 2);
        for register in &self.0 {
            bytes.extend_from_slice(&register.to_be_bytes());
        }
        bytes
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    U16,
    I16,
    U32,
}

impl Width {
    pub fn bytes(self) -> usize {
        match self {
            Width::U16 | Width::I16 => 2,
            Width::U32 => 4,
        }
    }
}

/// One decoded measurement: where it sits in the block and how wide it is.
/// Offsets are bytes relative to block start, straight from the SolarEdge
/// register map documentation.
#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub width: Width,
}

/// A run of fields governed by one shared scale factor. The map places the
/// factor adjacent to its group, usually after it, hence the cursor rewinds
/// in `decode`.
#[derive(Debug)]
pub struct FieldGroup {
    pub scale_offset: usize,
    pub fields: &'static [FieldSpec],
}

macro_rules! field {
    ($name:expr, $offset:expr, $width:ident) => {
        FieldSpec {
            name: $name,
            offset: $offset,
            width: Width::$width,
        }
    };
}

pub static FIELD_GROUPS: &[FieldGroup] = &[
    // registers 40071-40074, scale at 40075
    FieldGroup {
        scale_offset: 12,
        fields: &[
            field!("AC Total Current", 4, U16),
            field!("AC Current phase A", 6, U16),
            field!("AC Current phase B", 8, U16),
            field!("AC Current phase C", 10, U16),
        ],
    },
    // registers 40079-40081, scale at 40082
    FieldGroup {
        scale_offset: 26,
        fields: &[
            field!("AC Voltage phase A", 20, U16),
            field!("AC Voltage phase B", 22, U16),
            field!("AC Voltage phase C", 24, U16),
        ],
    },
    // register 40083, scale at 40084
    FieldGroup {
        scale_offset: 30,
        fields: &[field!("AC Power output", 28, I16)],
    },
    // registers 40093-40094, scale at 40095
    FieldGroup {
        scale_offset: 52,
        fields: &[field!("AC Lifetimeproduction", 48, U32)],
    },
    // register 40096, scale at 40097
    FieldGroup {
        scale_offset: 56,
        fields: &[field!("DC Current", 54, U16)],
    },
    // register 40098, scale at 40099
    FieldGroup {
        scale_offset: 60,
        fields: &[field!("DC Voltage", 58, U16)],
    },
    // register 40100, scale at 40101
    FieldGroup {
        scale_offset: 64,
        fields: &[field!("DC Power input", 62, I16)],
    },
];

/// One complete set of decoded measurements from one poll cycle. A fresh
/// `Sample` is built per decode call; nothing is reused across cycles, so a
/// field missing from a future layout can never leak a stale reading.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub fields: Vec<(&'static str, Option<f64>)>,
}

impl Sample {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, v)| *v)
    }
}

#[derive(Clone, Copy, Debug)]
enum RawValue {
    U16(u16),
    I16(i16),
    U32(u32),
}

impl RawValue {
    /// Sentinel test on the unscaled reading. For 16-bit values the check is
    /// on the bit pattern, so a signed reading of -1 counts too; the 32-bit
    /// lifetime counter uses the same reserved value.
    fn is_not_implemented(self) -> bool {
        match self {
            RawValue::U16(v) => v == NOT_IMPLEMENTED,
            RawValue::I16(v) => v as u16 == NOT_IMPLEMENTED,
            RawValue::U32(v) => v == u32::from(NOT_IMPLEMENTED),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            RawValue::U16(v) => f64::from(v),
            RawValue::I16(v) => f64::from(v),
            RawValue::U32(v) => f64::from(v),
        }
    }
}

/// Decodes one register block into one timestamped sample.
///
/// Pure and single-pass over the static field table: for each group, seek to
/// the scale factor, then rewind to each field and apply `10^exponent` to its
/// raw reading. Sentinel readings and scale overflows resolve to absent
/// fields; only a structurally short block fails the whole decode.
pub fn decode(block: &RegisterBlock) -> Result<Sample, DecodeError> {
    if block.len() < BLOCK_LENGTH {
        return Err(DecodeError::MalformedBlock {
            got: block.len(),
            need: BLOCK_LENGTH,
        });
    }

    let bytes = block.as_bytes();
    let mut cursor = Cursor::new(&bytes);
    let mut fields = Vec::with_capacity(FIELD_GROUPS.iter().map(|g| g.fields.len()).sum());

    for group in FIELD_GROUPS {
        cursor.skip(group.scale_offset as i64 - cursor.position() as i64)?;
        let exponent = cursor.read_i16()?;
        let multiplier = 10f64.powi(i32::from(exponent));

        for spec in group.fields {
            cursor.skip(spec.offset as i64 - cursor.position() as i64)?;
            let raw = match spec.width {
                Width::U16 => RawValue::U16(cursor.read_u16()?),
                Width::I16 => RawValue::I16(cursor.read_i16()?),
                Width::U32 => RawValue::U32(cursor.read_u32()?),
            };
            fields.push((spec.name, scale_value(spec.name, raw, multiplier)));
        }
    }

    Ok(Sample {
        time: Utc::now(),
        fields,
    })
}

/// Applies a group's multiplier to one raw reading. Sentinel readings are
/// absent rather than zero; a non-finite product is absent too and only
/// costs that one field.
fn scale_value(name: &str, raw: RawValue, multiplier: f64) -> Option<f64> {
    if raw.is_not_implemented() {
        return None;
    }

    let value = raw.as_f64() * multiplier;
    if !value.is_finite() {
        warn!("decode of {} failed: {:?} overflows at scale {:e}", name, raw, multiplier);
        return None;
    }

    Some(trunc_float(value))
}

/// Rounds to the two-decimal precision the store expects.
fn trunc_float(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_table_fits_block() {
        let block_bytes = BLOCK_LENGTH * 2;
        for group in FIELD_GROUPS {
            assert!(group.scale_offset + 2 <= block_bytes);
            for spec in group.fields {
                assert!(spec.offset + spec.width.bytes() <= block_bytes);
            }
        }
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(trunc_float(0.125), 0.13);
        assert_eq!(trunc_float(-450.0), -450.0);
        assert_eq!(trunc_float(1.2345), 1.23);
    }
}
