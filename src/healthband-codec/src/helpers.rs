use crate::error::DecodeError;

type Result<T> = std::result::Result<T, DecodeError>;

/// Text view over a raw notification payload.
///
/// The band sends every reading as UTF-8 text; triples are comma separated.
pub trait TextPayload {
    fn text(&self) -> Result<&str>;

    fn fields<const N: usize>(&self) -> Result<[f64; N]> {
        let text = self.text()?;
        let parts = text.split(',').map(str::trim).collect::<Vec<_>>();
        if parts.len() != N {
            return Err(DecodeError::WrongArity {
                expected: N,
                found: parts.len(),
            });
        }

        let mut out = [0.0; N];
        for (slot, part) in out.iter_mut().zip(parts) {
            *slot = parse_finite(part)?;
        }
        Ok(out)
    }

    fn scalar(&self) -> Result<f64> {
        let [value] = self.fields::<1>()?;
        Ok(value)
    }

    /// Step counts may arrive as `"42"` or `"42.0"`; fractions round to the
    /// nearest step.
    fn count(&self) -> Result<u64> {
        let text = self.text()?;
        if let Ok(count) = text.parse::<u64>() {
            return Ok(count);
        }

        let value = parse_finite(text)?;
        if value < 0.0 || value > u64::MAX as f64 {
            return Err(DecodeError::InvalidNumber(text.to_owned()));
        }
        Ok(value.round() as u64)
    }
}

impl TextPayload for [u8] {
    fn text(&self) -> Result<&str> {
        let text = std::str::from_utf8(self).map_err(|_| DecodeError::InvalidUtf8)?;
        // firmware occasionally pads with NUL
        let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
        if text.is_empty() {
            return Err(DecodeError::EmptyPayload);
        }
        Ok(text)
    }
}

pub(crate) fn parse_finite(text: &str) -> Result<f64> {
    let value = text
        .parse::<f64>()
        .map_err(|_| DecodeError::InvalidNumber(text.to_owned()))?;
    if !value.is_finite() {
        return Err(DecodeError::NonFiniteNumber(text.to_owned()));
    }
    Ok(value)
}
