//! Compact wire form of a tag override.
//!
//! A record is `{"f": "<flags>", "l": <length>}` where flags holds one letter per enabled option
//! in the fixed order `d p m r g` (see [`Flag`]).  Older releases stored the length as text, decode
//! accepts that and reports it so the caller can write the record back in the current form.

use crate::error::DecodeError;
use crate::options::{Flag, HashSettings};
use serde_json::{json, Value};

/// Field holding the packed flag letters.
pub const FLAGS_FIELD: &str = "f";
/// Field holding the length.
pub const LENGTH_FIELD: &str = "l";

/// A decoded override.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    /// The settings, always in the current in-memory shape.
    pub settings: HashSettings,
    /// True if the record used an older representation and should be rewritten.
    pub legacy: bool,
}

/// Pack the enabled flags into their letter string.
pub fn pack_flags(settings: &HashSettings) -> String {
    Flag::ALL
        .into_iter()
        .filter(|f| settings.flag(*f))
        .map(Flag::letter)
        .collect()
}

/// Encode settings as a full snapshot record.
pub fn encode(settings: &HashSettings) -> Value {
    json!({
        FLAGS_FIELD: pack_flags(settings),
        LENGTH_FIELD: settings.length,
    })
}

/// Decode a stored record.
/// Unknown flag letters are ignored so a newer writer does not break an older reader.
pub fn decode(value: &Value) -> Result<Decoded, DecodeError> {
    let record = value.as_object().ok_or(DecodeError::NotAnObject)?;
    let flags = record
        .get(FLAGS_FIELD)
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingFlags)?;
    let length = record.get(LENGTH_FIELD).ok_or(DecodeError::MissingLength)?;
    let (length, legacy) = decode_length(length)?;

    let mut settings = HashSettings {
        length,
        ..HashSettings::default()
    };
    for flag in Flag::ALL {
        settings.set_flag(flag, false);
    }
    for letter in flags.chars() {
        if let Some(flag) = Flag::from_letter(letter) {
            settings.set_flag(flag, true);
        }
    }
    Ok(Decoded { settings, legacy })
}

/// Decode an optional record, an absent record means "no override".
pub fn decode_opt(value: Option<&Value>) -> Result<Option<Decoded>, DecodeError> {
    value.map(decode).transpose()
}

/// Read a length that may be an integer or (legacy) a decimal string.
/// Returns the length and true if it was the legacy text form.
pub(crate) fn decode_length(value: &Value) -> Result<(u32, bool), DecodeError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(|n| (n, false))
            .ok_or_else(|| DecodeError::InvalidLength(n.to_string())),
        Value::String(s) => s
            .trim()
            .parse::<u32>()
            .map(|n| (n, true))
            .map_err(|_| DecodeError::InvalidLength(s.clone())),
        other => Err(DecodeError::InvalidLength(other.to_string())),
    }
}
