use crate::models::Coordinate;

/// Errors decoding a Google encoded polyline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolylineError {
    #[error("polyline ends in the middle of a number at byte {0}")]
    UnexpectedEnd(usize),

    #[error("invalid polyline character {0:?} at byte {1}")]
    InvalidCharacter(char, usize),

    #[error("polyline number at byte {0} is too long")]
    ValueOverflow(usize),
}

/// Decode a Google Maps encoded polyline into coordinates.
///
/// The format stores signed deltas at 1e-5 precision, five bits per byte,
/// offset by 63 to stay printable. Directions responses carry route
/// geometry this way (`overview_polyline.points`).
pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut coordinates = Vec::new();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while index < bytes.len() {
        lat += decode_value(bytes, &mut index)?;
        lng += decode_value(bytes, &mut index)?;
        coordinates.push(Coordinate::new(lat as f64 / 1e5, lng as f64 / 1e5));
    }

    Ok(coordinates)
}

fn decode_value(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let mut shift = 0u32;
    let mut result: i64 = 0;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(PolylineError::UnexpectedEnd(*index));
        };
        if !(63..=126).contains(&byte) {
            return Err(PolylineError::InvalidCharacter(byte as char, *index));
        }
        let chunk = i64::from(byte - 63);
        *index += 1;

        // A coordinate delta never needs more than 64 bits; a longer run of
        // continuation bytes is garbage input, not a bigger number.
        if shift >= 64 {
            return Err(PolylineError::ValueOverflow(*index - 1));
        }
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < 0x20 {
            break;
        }
    }

    // Low bit carries the sign.
    if result & 1 == 1 {
        Ok(!(result >> 1))
    } else {
        Ok(result >> 1)
    }
}

/// Encode coordinates as a Google Maps polyline (inverse of [`decode`]).
pub fn encode(path: &[Coordinate]) -> String {
    let mut out = String::new();
    let mut previous_lat: i64 = 0;
    let mut previous_lng: i64 = 0;

    for coordinate in path {
        let lat = (coordinate.latitude * 1e5).round() as i64;
        let lng = (coordinate.longitude * 1e5).round() as i64;
        encode_value(lat - previous_lat, &mut out);
        encode_value(lng - previous_lng, &mut out);
        previous_lat = lat;
        previous_lng = lng;
    }

    out
}

fn encode_value(value: i64, out: &mut String) {
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };
    while v >= 0x20 {
        out.push((((v & 0x1f) | 0x20) as u8 + 63) as char);
        v >>= 5;
    }
    out.push((v as u8 + 63) as char);
}
