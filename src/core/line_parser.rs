//! Line classifier: one glove serial line → `GloveLine`
//!
//! Priority order:
//! 1. finger name          `thumb` | `index` | `middle` | `ring` | `pinkie`
//! 2. bitfield             `flex b0 b1 b2 b3 b4` (each 0 or 1)
//! 3. analog               `flexa v0 v1 v2 v3 v4`
//! 4. shake                `shake`
//! 5. accelerometer        any three numbers

use glam::Vec3;
use lazy_static::lazy_static;
use regex::Regex;

use crate::config::AccelFormat;
use crate::types::{Finger, GloveLine};

lazy_static! {
    // Three signed numbers, decimal point or comma, anything non-numeric between
    static ref RE_TRIPLE: Regex = Regex::new(
        r"([-+]?\d+(?:[.,]\d+)?)[^\d+-]+([-+]?\d+(?:[.,]\d+)?)[^\d+-]+([-+]?\d+(?:[.,]\d+)?)"
    ).unwrap();
}

/// Stateless classifier for glove lines
#[derive(Debug, Clone, Copy, Default)]
pub struct LineParser {
    accel_format: AccelFormat,
}

impl LineParser {
    /// Create new parser
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accel_format(accel_format: AccelFormat) -> Self {
        Self { accel_format }
    }

    /// Classify one raw line; `None` means ignore it
    pub fn parse(&self, raw: &str) -> Option<GloveLine> {
        let line = raw.trim();
        if line.is_empty() {
            return None;
        }
        let low = line.to_lowercase();

        if let Some(finger) = Finger::from_name(&low) {
            return Some(GloveLine::Finger(finger));
        }

        if let Some(rest) = keyword_args(&low, "flex") {
            let values = parse_five(rest)?;
            let mut bits = [0u8; 5];
            for (b, v) in bits.iter_mut().zip(values) {
                *b = match v {
                    0 => 0,
                    1 => 1,
                    _ => return None,
                };
            }
            return Some(GloveLine::Flex(bits));
        }

        if let Some(rest) = keyword_args(&low, "flexa") {
            return parse_five(rest).map(GloveLine::FlexAnalog);
        }

        if low == "shake" {
            return Some(GloveLine::Shake);
        }

        self.parse_accel(line).map(GloveLine::Accel)
    }

    fn parse_accel(&self, line: &str) -> Option<Vec3> {
        match self.accel_format {
            AccelFormat::Tolerant => parse_triple(line),
            AccelFormat::Csv => parse_csv(line),
        }
    }
}

/// Arguments after `keyword`, which must be followed by whitespace or end the line
fn keyword_args<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    if rest.is_empty() {
        return Some(rest);
    }
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Exactly five integers separated by spaces, tabs or commas
fn parse_five(rest: &str) -> Option<[i32; 5]> {
    let tokens: Vec<&str> = rest
        .split(|c: char| c == ' ' || c == '\t' || c == ',')
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.len() != 5 {
        return None;
    }
    let mut out = [0i32; 5];
    for (slot, tok) in out.iter_mut().zip(tokens) {
        *slot = tok.parse().ok()?;
    }
    Some(out)
}

fn parse_triple(line: &str) -> Option<Vec3> {
    let caps = RE_TRIPLE.captures(line)?;
    let x = parse_decimal(caps.get(1)?.as_str())?;
    let y = parse_decimal(caps.get(2)?.as_str())?;
    let z = parse_decimal(caps.get(3)?.as_str())?;
    Some(Vec3::new(x, y, z))
}

fn parse_csv(line: &str) -> Option<Vec3> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 3 {
        return None;
    }
    let x = finite(parts[0].parse().ok()?)?;
    let y = finite(parts[1].parse().ok()?)?;
    let z = finite(parts[2].parse().ok()?)?;
    Some(Vec3::new(x, y, z))
}

/// Decimal comma → point; overflow to infinity is rejected
fn parse_decimal(s: &str) -> Option<f32> {
    finite(s.replace(',', ".").parse().ok()?)
}

fn finite(v: f32) -> Option<f32> {
    Some(v).filter(|v| v.is_finite())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finger_names_case_insensitive() {
        let p = LineParser::new();
        assert_eq!(p.parse("Thumb\r"), Some(GloveLine::Finger(Finger::Thumb)));
        assert_eq!(p.parse("  pinkie "), Some(GloveLine::Finger(Finger::Pinkie)));
        assert_eq!(p.parse("thumbs"), None);
    }

    #[test]
    fn test_flex_bitfield() {
        let p = LineParser::new();
        assert_eq!(p.parse("flex 1 0 1 1 1"), Some(GloveLine::Flex([1, 0, 1, 1, 1])));
        assert_eq!(p.parse("FLEX 1,1,0\t0 0"), Some(GloveLine::Flex([1, 1, 0, 0, 0])));
    }

    #[test]
    fn test_flex_rejects_wrong_arity_and_values() {
        let p = LineParser::new();
        assert_eq!(p.parse("flex 1 0 1 1"), None);
        assert_eq!(p.parse("flex 1 0 1 1 1 1"), None);
        assert_eq!(p.parse("flex 1 0 2 1 1"), None);
        assert_eq!(p.parse("flex 1 0 x 1 1"), None);
        assert_eq!(p.parse("flex"), None);
    }

    #[test]
    fn test_flexa_is_not_flex() {
        let p = LineParser::new();
        assert_eq!(
            p.parse("flexa 242 450 229 500 266"),
            Some(GloveLine::FlexAnalog([242, 450, 229, 500, 266]))
        );
        assert_eq!(p.parse("flexa 1 2 3"), None);
    }

    #[test]
    fn test_shake() {
        let p = LineParser::new();
        assert_eq!(p.parse("SHAKE"), Some(GloveLine::Shake));
        assert_eq!(p.parse("shaker"), None);
    }

    #[test]
    fn test_accel_tolerant_separators() {
        let p = LineParser::new();
        assert_eq!(
            p.parse("X: 1.05  Y: 1.90  Z: 10.21"),
            Some(GloveLine::Accel(Vec3::new(1.05, 1.90, 10.21)))
        );
        assert_eq!(
            p.parse("-1.53\t-9.02\t0.16"),
            Some(GloveLine::Accel(Vec3::new(-1.53, -9.02, 0.16)))
        );
    }

    #[test]
    fn test_accel_decimal_comma() {
        let p = LineParser::new();
        assert_eq!(
            p.parse("10,37; 0,24; 1,92"),
            Some(GloveLine::Accel(Vec3::new(10.37, 0.24, 1.92)))
        );
    }

    #[test]
    fn test_accel_csv_mode() {
        let p = LineParser::with_accel_format(AccelFormat::Csv);
        assert_eq!(p.parse("1.5,2.5,3.5"), Some(GloveLine::Accel(Vec3::new(1.5, 2.5, 3.5))));
        assert_eq!(p.parse("1.5 2.5 3.5"), None);
    }

    #[test]
    fn test_accel_overflow_is_dropped() {
        let huge = "9".repeat(45);
        let p = LineParser::new();
        assert_eq!(p.parse(&format!("{} 1 1", huge)), None);
        assert_eq!(p.parse("1 2 nan"), None);

        let csv = LineParser::with_accel_format(AccelFormat::Csv);
        assert_eq!(csv.parse(&format!("1,{},1", huge)), None);
        assert_eq!(csv.parse("inf,1,1"), None);
        assert_eq!(csv.parse("NaN,1,1"), None);
    }

    #[test]
    fn test_noise_is_ignored() {
        let p = LineParser::new();
        assert_eq!(p.parse(""), None);
        assert_eq!(p.parse("hello glove"), None);
        assert_eq!(p.parse("1 2"), None);
    }
}
