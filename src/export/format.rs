//! Numeric text formatting for X3D fields.
//!
//! X3D numbers are written with a bounded number of significant digits,
//! trailing zeros removed, switching to exponent notation for very large or
//! very small magnitudes (the C `%g` conversion).

use std::fmt::Write;

/// Significant digits for positions and normals.
pub const POSITION_DIGITS: usize = 6;
/// Significant digits for texture coordinates.
pub const UV_DIGITS: usize = 4;
/// Significant digits for per-face vertex colors.
pub const VERTEX_COLOR_DIGITS: usize = 4;
/// Significant digits for material, fog and sky colors.
pub const COLOR_DIGITS: usize = 3;

/// Format `value` with at most `digits` significant digits.
pub fn fmt_g(value: f32, digits: usize) -> String {
    let mut out = String::new();
    push_g(&mut out, value, digits);
    out
}

/// Append `value` formatted with at most `digits` significant digits.
pub fn push_g(out: &mut String, value: f32, digits: usize) {
    let value = value as f64;
    let digits = digits.max(1);

    if value == 0.0 {
        out.push('0');
        return;
    }
    if value.is_nan() {
        out.push_str("nan");
        return;
    }
    if value.is_infinite() {
        out.push_str(if value > 0.0 { "inf" } else { "-inf" });
        return;
    }

    // Round to the requested digits first; the exponent after rounding picks
    // the notation.
    let sci = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exponent < -4 || exponent >= digits as i32 {
        out.push_str(strip_zeros(mantissa));
        let sign = if exponent < 0 { '-' } else { '+' };
        write!(out, "e{}{:02}", sign, exponent.abs()).unwrap();
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        let fixed = format!("{:.*}", decimals, value);
        out.push_str(strip_zeros(&fixed));
    }
}

/// Fixed-point formatting with `decimals` digits after the point.
pub fn fmt_fixed(value: f32, decimals: usize) -> String {
    // no "-0.00"
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{:.*}", decimals, value)
}

fn strip_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Space-separated values, each formatted with `digits` significant digits.
pub fn join_g(values: &[f32], digits: usize) -> String {
    let mut out = String::with_capacity(values.len() * (digits + 3));
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        push_g(&mut out, *v, digits);
    }
    out
}

/// Space-separated fixed-point values.
pub fn join_fixed(values: &[f32], decimals: usize) -> String {
    values
        .iter()
        .map(|v| fmt_fixed(*v, decimals))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Clamp each channel into `[0, 1]`.
pub fn clamp_color(color: [f32; 3]) -> [f32; 3] {
    color.map(|c| c.clamp(0.0, 1.0))
}

/// A clamped color as `"r g b"` with color precision.
pub fn color(color: [f32; 3]) -> String {
    join_g(&clamp_color(color), COLOR_DIGITS)
}

/// Append a list of tuples, each tuple followed by a space (the layout of
/// X3D multi-value fields).
pub fn push_tuples<const N: usize>(out: &mut String, items: &[[f32; N]], digits: usize) {
    for item in items {
        for v in item {
            push_g(out, *v, digits);
            out.push(' ');
        }
    }
}

/// Append integer indices, each followed by a space.
pub fn push_indices(out: &mut String, indices: &[i32]) {
    for i in indices {
        write!(out, "{} ", i).unwrap();
    }
}
