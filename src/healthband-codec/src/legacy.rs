//! The `X: 1.2, Y: 3.4, Z: 5.6` text form older desktop builds displayed and
//! wrote to their CSV logs. Only used at the edges (log rows, terminal
//! output); readings are stored typed.

use crate::{DecodeError, Vector3, helpers::parse_finite};

const LABELS: [&str; 3] = ["X:", "Y:", "Z:"];

pub fn format_triple(v: Vector3) -> String {
    format!("X: {}, Y: {}, Z: {}", v.x, v.y, v.z)
}

pub fn parse_triple(text: &str) -> Result<Vector3, DecodeError> {
    let parts = text.split(',').map(str::trim).collect::<Vec<_>>();
    if parts.len() != LABELS.len() {
        return Err(DecodeError::WrongArity {
            expected: LABELS.len(),
            found: parts.len(),
        });
    }

    let mut values = [0.0; 3];
    for ((slot, part), label) in values.iter_mut().zip(parts).zip(LABELS) {
        let number = part
            .strip_prefix(label)
            .ok_or_else(|| DecodeError::InvalidNumber(part.to_owned()))?;
        *slot = parse_finite(number.trim())?;
    }

    Ok(values.into())
}
