use super::{structs::{TypedValue, ValueKind}, P1Error};
use chrono::{FixedOffset, NaiveDateTime, TimeZone, Utc};
use log::debug;

const CET_OFFSET_SECS: i32 = 3600;
const CEST_OFFSET_SECS: i32 = 2 * 3600;

pub fn decode(raw_line: &str, kind: ValueKind) -> Result<TypedValue, P1Error> {
    // Example rows:
    // 0-0:1.0.0(211216104026W)
    // 1-0:1.8.1(003382.357*kWh)
    // 1-0:1.7.0(00.412*kW)
    // 1-0:32.7.0(229.8*V)
    // 0-0:96.14.0(0002)
    let value = extract_value_field(raw_line)?;

    let decoded = match kind {
        ValueKind::Energy | ValueKind::Power | ValueKind::Voltage => {
            TypedValue::Number(parse_unit_value(value, kind)?)
        }
        ValueKind::Timestamp => TypedValue::Timestamp(timestamp_to_utc(value)?),
        ValueKind::Boolean => TypedValue::Text(value.trim_start_matches('0').to_string()),
        ValueKind::Opaque => TypedValue::Text(value.to_string()),
    };

    debug!("Decoded {:?} value {:?} from '{}'", kind, decoded, raw_line);
    Ok(decoded)
}

/// Returns the text between the first `(` and the `)` following it.
pub fn extract_value_field(raw_line: &str) -> Result<&str, P1Error> {
    let start = raw_line
        .find('(')
        .ok_or_else(|| P1Error::InvalidDataLine(raw_line.to_string()))?
        + 1;

    let length = raw_line[start..]
        .find(')')
        .ok_or_else(|| P1Error::InvalidDataLine(raw_line.to_string()))?;

    Ok(&raw_line[start..start + length])
}

fn parse_unit_value(value: &str, kind: ValueKind) -> Result<f64, P1Error> {
    let invalid = || P1Error::InvalidValue { kind, value: value.to_string() };

    let suffix_len = kind.unit_suffix_len().ok_or_else(invalid)?;
    let number = value
        .len()
        .checked_sub(suffix_len)
        .and_then(|end| value.get(..end))
        .ok_or_else(invalid)?;

    match number.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(invalid()),
    }
}

/// Converts a P1 timestamp (`YYMMDDhhmmssX`) to UTC.
///
/// The trailing flag says whether the meter clock runs on summer time (`S`)
/// or winter time (anything else). The meter's own flag is trusted rather
/// than the Europe/Amsterdam calendar rules, so the offset is fixed per flag.
pub fn timestamp_to_utc(value: &str) -> Result<String, P1Error> {
    let invalid = || P1Error::InvalidValue {
        kind: ValueKind::Timestamp,
        value: value.to_string(),
    };

    let bytes = value.as_bytes();
    if bytes.len() != 13 || !bytes[..12].iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }

    let naive = NaiveDateTime::parse_from_str(&value[..12], "%y%m%d%H%M%S").map_err(|_| invalid())?;

    let offset_secs = if bytes[12] == b'S' { CEST_OFFSET_SECS } else { CET_OFFSET_SECS };
    let offset = FixedOffset::east_opt(offset_secs).ok_or_else(invalid)?;
    let local = offset.from_local_datetime(&naive).single().ok_or_else(invalid)?;

    Ok(local.with_timezone(&Utc).format("%Y-%m-%dT%H:%M:%S.000Z").to_string())
}
