//! d3-style number format specifiers.
//!
//! Supports `[[fill]align][sign][$][0][width][,][.precision][type]` with the
//! types `f`, `d`, `%`, `e`, `s` (SI prefix), and none (shortest, or
//! `precision` significant digits).

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static SPECIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?P<fill>.)?(?P<align>[<>=^]))?(?P<sign>[+\- ])?(?P<currency>\$)?(?P<zero>0)?(?P<width>\d+)?(?P<comma>,)?(?:\.(?P<precision>\d+))?(?P<kind>[a-z%])?$")
        .unwrap()
});

const DEFAULT_PRECISION: usize = 6;
// Padding beyond this is never a real chart label.
const MAX_WIDTH: usize = 256;

const SI_PREFIXES: [&str; 17] = [
    "y", "z", "a", "f", "p", "n", "\u{b5}", "m", "", "k", "M", "G", "T", "P", "E", "Z", "Y",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("invalid number format specifier `{0}`")]
    InvalidSpecifier(String),
    #[error("unsupported number format type `{kind}` in `{specifier}`")]
    UnsupportedType { specifier: String, kind: char },
    #[error("number format {field} in `{specifier}` exceeds {max}")]
    TooLarge {
        specifier: String,
        field: &'static str,
        max: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
    /// Padding goes between the sign and the digits.
    AfterSign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Minus,
    Plus,
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Fixed,
    Integer,
    Percent,
    Exponent,
    SiPrefix,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
    fill: char,
    align: Align,
    sign: Sign,
    currency: bool,
    width: usize,
    comma: bool,
    precision: Option<usize>,
    kind: FormatKind,
}

impl NumberFormat {
    pub fn parse(specifier: &str) -> Result<Self, FormatError> {
        let caps = SPECIFIER_RE
            .captures(specifier)
            .ok_or_else(|| FormatError::InvalidSpecifier(specifier.to_string()))?;

        let mut fill = caps
            .name("fill")
            .and_then(|m| m.as_str().chars().next())
            .unwrap_or(' ');
        let mut align = match caps.name("align").map(|m| m.as_str()) {
            Some("<") => Align::Left,
            Some("^") => Align::Center,
            Some("=") => Align::AfterSign,
            _ => Align::Right,
        };
        let sign = match caps.name("sign").map(|m| m.as_str()) {
            Some("+") => Sign::Plus,
            Some(" ") => Sign::Space,
            _ => Sign::Minus,
        };
        if caps.name("zero").is_some() {
            fill = '0';
            align = Align::AfterSign;
        }
        let width = match caps.name("width") {
            Some(m) => parse_bounded(specifier, "width", m.as_str(), MAX_WIDTH)?,
            None => 0,
        };
        let kind = match caps.name("kind").map(|m| m.as_str()) {
            None => FormatKind::General,
            Some("f") => FormatKind::Fixed,
            Some("d") => FormatKind::Integer,
            Some("%") => FormatKind::Percent,
            Some("e") => FormatKind::Exponent,
            Some("s") => FormatKind::SiPrefix,
            Some(other) => {
                return Err(FormatError::UnsupportedType {
                    specifier: specifier.to_string(),
                    kind: other.chars().next().unwrap_or('?'),
                });
            }
        };
        // Same bounds as d3: significant-digit types keep at least one digit.
        let precision = match caps.name("precision") {
            Some(m) => {
                let digits = parse_bounded(specifier, "precision", m.as_str(), usize::MAX)?;
                Some(match kind {
                    FormatKind::SiPrefix | FormatKind::General => digits.clamp(1, 21),
                    _ => digits.min(20),
                })
            }
            None => None,
        };

        Ok(Self {
            fill,
            align,
            sign,
            currency: caps.name("currency").is_some(),
            width,
            comma: caps.name("comma").is_some(),
            precision,
            kind,
        })
    }

    pub fn format(&self, value: f64) -> String {
        if !value.is_finite() {
            return value.to_string();
        }
        let magnitude = value.abs();
        let mut body = match self.kind {
            FormatKind::Fixed => fixed(magnitude, self.precision.unwrap_or(DEFAULT_PRECISION)),
            FormatKind::Integer => fixed(magnitude, 0),
            FormatKind::Percent => {
                fixed(magnitude * 100.0, self.precision.unwrap_or(DEFAULT_PRECISION))
            }
            FormatKind::Exponent => exponent(magnitude, self.precision.unwrap_or(DEFAULT_PRECISION)),
            FormatKind::SiPrefix => si_prefix(magnitude, self.precision),
            FormatKind::General => general(magnitude, self.precision),
        };
        if self.comma {
            body = group_thousands(&body);
        }
        if self.kind == FormatKind::Percent {
            body.push('%');
        }

        // A value that rounds to zero loses its minus sign.
        let negative = value < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0');
        let mut prefix = String::new();
        match (negative, self.sign) {
            (true, _) => prefix.push('-'),
            (false, Sign::Plus) => prefix.push('+'),
            (false, Sign::Space) => prefix.push(' '),
            (false, Sign::Minus) => {}
        }
        if self.currency {
            prefix.push('$');
        }

        let len = prefix.chars().count() + body.chars().count();
        let pad = self.width.saturating_sub(len);
        let padding: String = std::iter::repeat_n(self.fill, pad).collect();
        match self.align {
            Align::Left => format!("{prefix}{body}{padding}"),
            Align::AfterSign => format!("{prefix}{padding}{body}"),
            Align::Center => {
                let left: String = std::iter::repeat_n(self.fill, pad / 2).collect();
                let right: String = std::iter::repeat_n(self.fill, pad - pad / 2).collect();
                format!("{left}{prefix}{body}{right}")
            }
            Align::Right => format!("{padding}{prefix}{body}"),
        }
    }
}

fn parse_bounded(
    specifier: &str,
    field: &'static str,
    digits: &str,
    max: usize,
) -> Result<usize, FormatError> {
    let too_large = || FormatError::TooLarge {
        specifier: specifier.to_string(),
        field,
        max,
    };
    let value = digits.parse::<usize>().map_err(|_| too_large())?;
    if value > max {
        return Err(too_large());
    }
    Ok(value)
}

/// Fixed notation, rounding halves away from zero.
fn fixed(value: f64, precision: usize) -> String {
    let rounded = if precision <= 15 {
        let factor = 10f64.powi(precision as i32);
        let scaled = (value * factor).round() / factor;
        if scaled.is_finite() { scaled } else { value }
    } else {
        value
    };
    format!("{rounded:.precision$}")
}

fn exponent(value: f64, precision: usize) -> String {
    let raw = format!("{value:.precision$e}");
    match raw.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => raw,
    }
}

fn general(value: f64, precision: Option<usize>) -> String {
    match precision {
        Some(digits) => {
            let digits = digits.max(1);
            let rounded: f64 = format!("{:.*e}", digits - 1, value)
                .parse()
                .unwrap_or(value);
            format!("{rounded}")
        }
        None => format!("{value}"),
    }
}

/// Scales into the nearest power-of-1000 prefix. Rounding to `precision`
/// significant digits happens first so 999.9 at `.3s` becomes `1.00k`.
fn si_prefix(value: f64, precision: Option<usize>) -> String {
    let digits = precision.unwrap_or(DEFAULT_PRECISION).max(1);
    let rounded: f64 = format!("{:.*e}", digits - 1, value)
        .parse()
        .unwrap_or(value);
    let exponent = if rounded == 0.0 {
        0
    } else {
        ((rounded.log10() / 3.0).floor() as i32).clamp(-8, 8)
    };
    let scaled = rounded / 10f64.powi(exponent * 3);
    let body = match precision {
        Some(_) => {
            let integer_digits = if scaled == 0.0 {
                1
            } else {
                scaled.abs().log10().floor() as i64 + 1
            };
            let decimals = (digits as i64 - integer_digits).max(0) as usize;
            format!("{scaled:.decimals$}")
        }
        None => format!("{scaled}"),
    };
    format!("{body}{}", SI_PREFIXES[(exponent + 8) as usize])
}

fn group_thousands(body: &str) -> String {
    let (int_part, rest) = match body.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => body.split_at(idx),
        None => (body, ""),
    };
    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(body.len() + digits.len() / 3);
    for (idx, ch) in digits.iter().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*ch);
    }
    grouped.push_str(rest);
    grouped
}

/// Thousands-grouped integer (`",.0f"`), used for header/footer counts.
pub fn format_count(value: f64) -> String {
    static COUNT: Lazy<NumberFormat> = Lazy::new(|| NumberFormat::parse(",.0f").unwrap());
    COUNT.format(value)
}

/// Thousands-grouped percentage with one decimal (`",.1%"`).
pub fn format_rate(rate: f64) -> String {
    static RATE: Lazy<NumberFormat> = Lazy::new(|| NumberFormat::parse(",.1%").unwrap());
    RATE.format(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(spec: &str, value: f64) -> String {
        NumberFormat::parse(spec).unwrap().format(value)
    }

    #[test]
    fn groups_integers() {
        assert_eq!(fmt(",.0f", 19485.0), "19,485");
        assert_eq!(fmt(",.0f", 1234567.891), "1,234,568");
        assert_eq!(fmt(",.0f", 999.0), "999");
        assert_eq!(fmt(",.0f", -14030.0), "-14,030");
        assert_eq!(fmt(",.0f", 0.0), "0");
        assert_eq!(fmt(",.2f", 1234.5), "1,234.50");
    }

    #[test]
    fn formats_percentages() {
        assert_eq!(fmt(",.1%", 0.72004), "72.0%");
        assert_eq!(fmt(",.1%", 0.0394), "3.9%");
        assert_eq!(fmt(",.1%", 0.0), "0.0%");
        assert_eq!(fmt(",.1%", 12.5), "1,250.0%");
        assert_eq!(fmt(".0%", 0.125), "13%");
    }

    #[test]
    fn rounds_halves_away_from_zero() {
        assert_eq!(fmt(".0f", 2.5), "3");
        assert_eq!(fmt("d", 0.5), "1");
        assert_eq!(fmt(",.0f", -0.2), "0");
    }

    #[test]
    fn handles_sign_width_and_fill() {
        assert_eq!(fmt("+,d", 5.0), "+5");
        assert_eq!(fmt(" d", 5.0), " 5");
        assert_eq!(fmt("8,.0f", 1234.0), "   1,234");
        assert_eq!(fmt("<6d", 42.0), "42    ");
        assert_eq!(fmt("*^7d", 42.0), "**42***");
        assert_eq!(fmt("08.2f", -3.14159), "-0003.14");
        assert_eq!(fmt("$,.2f", 1500.0), "$1,500.00");
    }

    #[test]
    fn formats_exponent_and_general() {
        assert_eq!(fmt(".2e", 12345.0), "1.23e+4");
        assert_eq!(fmt(".1e", 0.00042), "4.2e-4");
        assert_eq!(fmt("", 1.5), "1.5");
        assert_eq!(fmt(".3", 3.14159), "3.14");
    }

    #[test]
    fn formats_si_prefixes() {
        assert_eq!(fmt("s", 1500.0), "1.5k");
        assert_eq!(fmt(".3s", 19485.0), "19.5k");
        assert_eq!(fmt(".3s", 999.9), "1.00k");
        assert_eq!(fmt("s", 2_000_000.0), "2M");
        assert_eq!(fmt("s", 0.0), "0");
        assert_eq!(fmt(".2s", 0.0042), "4.2m");
    }

    #[test]
    fn rejects_bad_specifiers() {
        assert!(matches!(
            NumberFormat::parse("not a format"),
            Err(FormatError::InvalidSpecifier(_))
        ));
        assert_eq!(
            NumberFormat::parse(",.1q"),
            Err(FormatError::UnsupportedType {
                specifier: ",.1q".to_string(),
                kind: 'q'
            })
        );
    }

    #[test]
    fn clamps_precision_to_d3_bounds() {
        assert_eq!(fmt(".20000000f", 1.0), format!("1.{}", "0".repeat(20)));
        assert_eq!(fmt(".0s", 1700.0), "2k");
        assert_eq!(fmt(".99e", 1.0), format!("1.{}e+0", "0".repeat(20)));
    }

    #[test]
    fn rejects_oversized_width_and_precision() {
        assert_eq!(
            NumberFormat::parse("999999999d"),
            Err(FormatError::TooLarge {
                specifier: "999999999d".to_string(),
                field: "width",
                max: MAX_WIDTH,
            })
        );
        assert!(matches!(
            NumberFormat::parse(".99999999999999999999999f"),
            Err(FormatError::TooLarge { field: "precision", .. })
        ));
        assert_eq!(fmt("256d", 1.0).len(), 256);
    }

    #[test]
    fn shared_formatters() {
        assert_eq!(format_count(5455.0), "5,455");
        assert_eq!(format_rate(0.2799), "28.0%");
    }
}
