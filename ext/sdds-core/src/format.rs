//! Text rendering and parsing of native values
//!
//! Used for fixed parameter values, ASCII pages and header attributes.
//! Two renderers exist: the canonical one (shortest text that parses back
//! to the same value) and a printf-style one driven by a field's format
//! string.

use crate::{NativeValue, Result, SddsError, TypeTag};
use std::sync::Arc;

const EXP_LOW: f64 = 1e-5;
const EXP_HIGH: f64 = 1e16;
/// Largest width or precision a format string may request
pub const MAX_FIELD_WIDTH: usize = 1024;

/// Round a value through the `%.6E` text form and narrow it to `f32`.
///
/// Every float32 stored or fetched through the handle API passes through
/// here so binary and ASCII files carry the same digits.
pub fn round_float32(v: f64) -> f32 {
    round_six_digits(v) as f32
}

/// The `%.6E` round trip without the narrowing, for values read back out
/// of a float32 buffer
pub fn round_six_digits(v: f64) -> f64 {
    if !v.is_finite() {
        return v;
    }
    format!("{:.6e}", v).parse::<f64>().unwrap_or(v)
}

fn canonical_f64(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let a = v.abs();
    if a == 0.0 || (EXP_LOW..EXP_HIGH).contains(&a) {
        format!("{}", v)
    } else {
        format!("{:e}", v)
    }
}

fn canonical_f32(v: f32) -> String {
    if !v.is_finite() {
        return canonical_f64(v as f64);
    }
    let a = v.abs() as f64;
    if a == 0.0 || (EXP_LOW..EXP_HIGH).contains(&a) {
        format!("{}", v)
    } else {
        format!("{:e}", v)
    }
}

/// Shortest text that reads back as the same value
pub fn format_canonical(value: &NativeValue) -> String {
    match value {
        NativeValue::Int16(v) => v.to_string(),
        NativeValue::UInt16(v) => v.to_string(),
        NativeValue::Int32(v) => v.to_string(),
        NativeValue::UInt32(v) => v.to_string(),
        NativeValue::Int64(v) => v.to_string(),
        NativeValue::UInt64(v) => v.to_string(),
        NativeValue::Float32(v) => canonical_f32(v.0),
        NativeValue::Float64(v) => canonical_f64(v.0),
        NativeValue::Char(c) => char_text(*c),
        NativeValue::String(s) => s.to_string(),
    }
}

/// The Latin-1 byte of the first character of `text`, 0 when empty.
/// `None` when that character lies above U+00FF.
pub fn char_byte(text: &str) -> Option<u8> {
    match text.chars().next() {
        None => Some(0),
        Some(c) => u8::try_from(u32::from(c)).ok(),
    }
}

/// Latin-1 text of a char value, empty for 0
pub fn char_text(c: u8) -> String {
    if c == 0 {
        String::new()
    } else {
        (c as char).to_string()
    }
}

/// Render with `format_string` when given, canonically otherwise
pub fn format_value(value: &NativeValue, format_string: Option<&str>) -> Result<String> {
    match format_string {
        Some(fmt) if !fmt.is_empty() => format_printf(fmt, value),
        _ => Ok(format_canonical(value)),
    }
}

/// Parse text into a value of `tag`.
///
/// Integer tags accept decimal or float text and wrap to the tag's width.
/// `char` takes the Latin-1 byte of the first character; `string` keeps
/// the text verbatim.
pub fn parse_value(text: &str, tag: TypeTag) -> Result<NativeValue> {
    match tag {
        TypeTag::String => Ok(NativeValue::String(Arc::from(text))),
        TypeTag::Char => char_byte(text).map(NativeValue::Char).ok_or_else(|| {
            SddsError::format(format!("{:?} does not start with a Latin-1 character", text))
        }),
        TypeTag::Float32 | TypeTag::Float64 => {
            let v = parse_f64(text)?;
            NativeValue::from_f64(tag, v)
        }
        _ => {
            let t = text.trim();
            let t = t.strip_prefix('+').unwrap_or(t);
            match t.parse::<i128>() {
                Ok(v) => NativeValue::from_i128(tag, v),
                Err(e) => match parse_f64(t) {
                    Ok(v) if v.is_finite() => NativeValue::from_i128(tag, v.trunc() as i128),
                    _ => Err(SddsError::format(format!(
                        "invalid {} value {:?}: {}",
                        tag, text, e
                    ))),
                },
            }
        }
    }
}

fn parse_f64(text: &str) -> Result<f64> {
    let t = text.trim();
    let t = t.strip_prefix('+').unwrap_or(t);
    // Fortran-style exponents show up in hand-written files.
    let normalized;
    let t = if t.contains(|c: char| c == 'd' || c == 'D') && !t.eq_ignore_ascii_case("nan") {
        normalized = t.replace(|c: char| c == 'd' || c == 'D', "e");
        normalized.as_str()
    } else {
        t
    };
    Ok(t.parse::<f64>()?)
}

/// One parsed `%...` conversion
#[derive(Debug, Clone, Default, PartialEq)]
struct Directive {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alt: bool,
    width: usize,
    precision: Option<usize>,
    conv: char,
}

/// Render a value through a printf-style format string.
///
/// Supports flags `-+ 0#`, width, precision, and the conversions
/// `d i u x X o e E f F g G s c %`. Length modifiers are accepted and
/// ignored. Text outside the conversion is copied through.
pub fn format_printf(fmt: &str, value: &NativeValue) -> Result<String> {
    let mut out = String::new();
    let mut chars = fmt.chars().peekable();
    let mut used = false;
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }
        let directive = parse_directive(&mut chars, fmt)?;
        if used {
            return Err(SddsError::format(format!(
                "format string {:?} has more than one conversion",
                fmt
            )));
        }
        out.push_str(&render(&directive, value, fmt)?);
        used = true;
    }
    Ok(out)
}

type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

/// Parse flags, width, precision and conversion following a `%`
fn parse_directive(chars: &mut Chars<'_>, fmt: &str) -> Result<Directive> {
    let mut directive = Directive::default();
    while let Some(&f) = chars.peek() {
        match f {
            '-' => directive.left = true,
            '+' => directive.plus = true,
            ' ' => directive.space = true,
            '0' => directive.zero = true,
            '#' => directive.alt = true,
            _ => break,
        }
        chars.next();
    }
    directive.width = take_number(chars, fmt)?.unwrap_or(0);
    if chars.peek() == Some(&'.') {
        chars.next();
        directive.precision = Some(take_number(chars, fmt)?.unwrap_or(0));
    }
    while matches!(chars.peek(), Some('h' | 'l' | 'L' | 'q' | 'j' | 'z' | 't')) {
        chars.next();
    }
    directive.conv = chars
        .next()
        .ok_or_else(|| SddsError::format(format!("incomplete conversion in {:?}", fmt)))?;
    Ok(directive)
}

fn take_number(chars: &mut Chars<'_>, fmt: &str) -> Result<Option<usize>> {
    let mut n: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        let next = n
            .unwrap_or(0)
            .checked_mul(10)
            .and_then(|v| v.checked_add(d as usize))
            .filter(|&v| v <= MAX_FIELD_WIDTH)
            .ok_or_else(|| {
                SddsError::format(format!(
                    "width or precision in {:?} exceeds {}",
                    fmt, MAX_FIELD_WIDTH
                ))
            })?;
        n = Some(next);
        chars.next();
    }
    Ok(n)
}

/// Check the conversions of `fmt` without rendering anything
pub fn check_format_string(fmt: &str) -> Result<()> {
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            continue;
        }
        parse_directive(&mut chars, fmt)?;
    }
    Ok(())
}

fn render(directive: &Directive, value: &NativeValue, fmt: &str) -> Result<String> {
    let (sign, body) = match directive.conv {
        'd' | 'i' => {
            let v = int_of(value);
            let digits = v.unsigned_abs().to_string();
            (sign_of(directive, v < 0), pad_precision(digits, directive.precision))
        }
        'u' | 'x' | 'X' | 'o' => {
            let v = unsigned_of(value);
            let digits = match directive.conv {
                'u' => v.to_string(),
                'x' => format!("{:x}", v),
                'X' => format!("{:X}", v),
                _ => format!("{:o}", v),
            };
            let digits = pad_precision(digits, directive.precision);
            let prefix = match (directive.alt && v != 0, directive.conv) {
                (true, 'x') => "0x",
                (true, 'X') => "0X",
                (true, 'o') if !digits.starts_with('0') => "0",
                _ => "",
            };
            (prefix.to_string(), digits)
        }
        'e' | 'E' | 'f' | 'F' | 'g' | 'G' => {
            let v = float_of(value);
            let body = if !v.is_finite() {
                let t = if v.is_nan() { "nan" } else { "inf" };
                if directive.conv.is_ascii_uppercase() {
                    t.to_ascii_uppercase()
                } else {
                    t.to_string()
                }
            } else {
                let p = directive.precision.unwrap_or(6);
                match directive.conv {
                    'e' | 'E' => exp_form(v.abs(), p, directive.conv == 'E'),
                    'f' | 'F' => fixed_form(v.abs(), p, directive.alt),
                    _ => general_form(v.abs(), p, directive.alt, directive.conv == 'G'),
                }
            };
            (sign_of(directive, v.is_sign_negative() && v != 0.0), body)
        }
        's' => {
            let text = format_canonical(value);
            let text = match directive.precision {
                Some(p) => text.chars().take(p).collect(),
                None => text,
            };
            return Ok(pad(directive, String::new(), text, false));
        }
        'c' => {
            let c = match value {
                NativeValue::Char(c) => *c,
                NativeValue::String(s) => char_byte(s).ok_or_else(|| {
                    SddsError::format(format!("{:?} is not a Latin-1 character", &**s))
                })?,
                other => int_of(other) as u8,
            };
            return Ok(pad(directive, String::new(), char_text(c), false));
        }
        other => {
            return Err(SddsError::format(format!(
                "unsupported conversion %{} in {:?}",
                other, fmt
            )))
        }
    };
    let numeric_zero = directive.zero && !(directive.precision.is_some() && "diuxXo".contains(directive.conv));
    Ok(pad(directive, sign, body, numeric_zero))
}

fn sign_of(directive: &Directive, negative: bool) -> String {
    if negative {
        "-".to_string()
    } else if directive.plus {
        "+".to_string()
    } else if directive.space {
        " ".to_string()
    } else {
        String::new()
    }
}

fn pad_precision(digits: String, precision: Option<usize>) -> String {
    match precision {
        Some(0) if digits == "0" => String::new(),
        Some(p) if digits.len() < p => format!("{}{}", "0".repeat(p - digits.len()), digits),
        _ => digits,
    }
}

fn pad(directive: &Directive, prefix: String, body: String, zero_fill: bool) -> String {
    let len = prefix.chars().count() + body.chars().count();
    if len >= directive.width {
        return format!("{}{}", prefix, body);
    }
    let fill = directive.width - len;
    if directive.left {
        format!("{}{}{}", prefix, body, " ".repeat(fill))
    } else if zero_fill {
        format!("{}{}{}", prefix, "0".repeat(fill), body)
    } else {
        format!("{}{}{}", " ".repeat(fill), prefix, body)
    }
}

fn int_of(value: &NativeValue) -> i128 {
    match value {
        NativeValue::String(s) => parse_f64(s).map(|v| v as i128).unwrap_or(0),
        NativeValue::Char(c) => *c as i128,
        other => other
            .as_i128()
            .or_else(|| other.as_f64().map(|v| v as i128))
            .unwrap_or(0),
    }
}

fn unsigned_of(value: &NativeValue) -> u128 {
    let v = int_of(value);
    if v < 0 {
        (v as i64 as u64) as u128
    } else {
        v as u128
    }
}

fn float_of(value: &NativeValue) -> f64 {
    match value {
        NativeValue::String(s) => parse_f64(s).unwrap_or(0.0),
        NativeValue::Char(c) => *c as f64,
        other => other.as_f64().unwrap_or(0.0),
    }
}

// C-style exponent: at least two exponent digits, explicit sign.
fn exp_form(v: f64, precision: usize, upper: bool) -> String {
    let s = format!("{:.*e}", precision, v);
    let (mantissa, exp) = s.split_once('e').unwrap_or((s.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    let e = if upper { 'E' } else { 'e' };
    format!("{}{}{}{:02}", mantissa, e, sign, exp.abs())
}

fn fixed_form(v: f64, precision: usize, alt: bool) -> String {
    let mut s = format!("{:.*}", precision, v);
    if alt && precision == 0 {
        s.push('.');
    }
    s
}

fn general_form(v: f64, precision: usize, alt: bool, upper: bool) -> String {
    let p = precision.max(1);
    let exponent = if v == 0.0 {
        0
    } else {
        let s = format!("{:.*e}", p - 1, v);
        s.split_once('e')
            .and_then(|(_, e)| e.parse::<i32>().ok())
            .unwrap_or(0)
    };
    let mut s = if exponent < -4 || exponent >= p as i32 {
        exp_form(v, p - 1, upper)
    } else {
        fixed_form(v, (p as i32 - 1 - exponent) as usize, alt)
    };
    if !alt {
        s = strip_trailing_zeros(&s);
    }
    s
}

fn strip_trailing_zeros(s: &str) -> String {
    let (mantissa, exp) = match s.find(|c: char| c == 'e' || c == 'E') {
        Some(i) => s.split_at(i),
        None => (s, ""),
    };
    if !mantissa.contains('.') {
        return s.to_string();
    }
    let trimmed = mantissa.trim_end_matches('0').trim_end_matches('.');
    format!("{}{}", trimmed, exp)
}

/// Quote and escape a string token when it would not survive
/// whitespace-delimited reading
pub fn quote_token(text: &str) -> String {
    quote_bytes(text.as_bytes())
}

/// Byte-level variant of [`quote_token`]. Bytes that are not valid UTF-8
/// are written as octal escapes.
pub fn quote_bytes(bytes: &[u8]) -> String {
    let bare = !bytes.is_empty()
        && bytes[0] != b'!'
        && bytes
            .iter()
            .all(|b| (0x21..0x7f).contains(b) && *b != b'"' && *b != b'\\');
    if bare {
        return bytes.iter().map(|&b| b as char).collect();
    }
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    match simdutf8::basic::from_utf8(bytes) {
        Ok(text) => {
            for c in text.chars() {
                push_escaped(&mut out, c as u32, Some(c));
            }
        }
        Err(_) => {
            for &b in bytes {
                let c = if b < 0x80 { Some(b as char) } else { None };
                push_escaped(&mut out, b as u32, c);
            }
        }
    }
    out.push('"');
    out
}

fn push_escaped(out: &mut String, code: u32, c: Option<char>) {
    match c {
        Some('"') => out.push_str("\\\""),
        Some('\\') => out.push_str("\\\\"),
        Some('\n') => out.push_str("\\n"),
        Some('\t') => out.push_str("\\t"),
        Some(c) if code >= 0x20 && code != 0x7f => out.push(c),
        _ => out.push_str(&format!("\\{:03o}", code)),
    }
}

/// Render one ASCII data cell
pub fn format_cell(value: &NativeValue, format_string: Option<&str>) -> Result<String> {
    match value {
        NativeValue::String(s) => {
            let text = match format_string {
                Some(f) if !f.is_empty() => format_printf(f, value)?,
                _ => s.to_string(),
            };
            Ok(quote_token(&text))
        }
        NativeValue::Char(c) => {
            if *c == 0 {
                Ok("\"\"".to_string())
            } else {
                Ok(quote_bytes(&[*c]))
            }
        }
        NativeValue::Float32(v) => Ok(canonical_f32(v.0)),
        NativeValue::Float64(v) => Ok(canonical_f64(v.0)),
        other => Ok(format_value(other, format_string)?.trim().to_string()),
    }
}
