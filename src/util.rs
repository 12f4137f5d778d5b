//! Small capture-adjacent helpers: FOURCC codes and time strings.

use anyhow::{anyhow, Result};

/// Decode a packed FOURCC code into its four-character string.
pub fn decode_fourcc(code: u32) -> String {
    (0..4)
        .map(|i| ((code >> (8 * i)) & 0xFF) as u8 as char)
        .collect()
}

/// Pack a four-character codec tag into a FOURCC code.
pub fn fourcc_code(tag: &str) -> Result<u32> {
    let bytes = tag.as_bytes();
    if bytes.len() != 4 {
        return Err(anyhow!("FOURCC tag must be exactly 4 characters: '{tag}'"));
    }
    Ok(bytes
        .iter()
        .enumerate()
        .fold(0u32, |acc, (i, &b)| acc | ((b as u32) << (8 * i))))
}

/// Parse a `[HH:]MM:SS[.mmm]` time string into seconds.
///
/// The fractional part is milliseconds, matching the `1:23.500` style used
/// in capture range settings.
pub fn parse_time(time_str: &str) -> Result<f64> {
    let (clock, millis) = match time_str.split_once('.') {
        Some((clock, frac)) => {
            let millis: u32 = frac
                .parse()
                .map_err(|_| anyhow!("invalid millisecond part in time '{time_str}'"))?;
            (clock, f64::from(millis) / 1000.0)
        }
        None => (time_str, 0.0),
    };

    if clock.split(':').count() > 3 {
        return Err(anyhow!("too many ':' components in time '{time_str}'"));
    }

    let mut seconds = 0.0;
    for (weight, part) in [1.0, 60.0, 3600.0].iter().zip(clock.rsplit(':')) {
        let value: u32 = part
            .parse()
            .map_err(|_| anyhow!("invalid time component '{part}' in '{time_str}'"))?;
        seconds += weight * f64::from(value);
    }

    Ok(seconds + millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourcc_round_trip() -> Result<()> {
        let code = fourcc_code("MJPG")?;
        assert_eq!(decode_fourcc(code), "MJPG");
        Ok(())
    }

    #[test]
    fn fourcc_rejects_wrong_length() {
        assert!(fourcc_code("H264X").is_err());
        assert!(fourcc_code("AVC").is_err());
    }

    #[test]
    fn parses_plain_seconds() -> Result<()> {
        assert_eq!(parse_time("42")?, 42.0);
        Ok(())
    }

    #[test]
    fn parses_minutes_and_millis() -> Result<()> {
        assert_eq!(parse_time("1:23.500")?, 83.5);
        assert_eq!(parse_time("2:00:01")?, 7201.0);
        Ok(())
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_time("abc").is_err());
        assert!(parse_time("1:2:3:4").is_err());
    }
}
