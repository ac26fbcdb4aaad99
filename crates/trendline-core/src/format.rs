//! Display formatting shared by the report payloads.

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    let rounded = (value * factor).round() / factor;
    // Collapse -0.0 so it never renders with a sign.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// `1234567` -> `"1,234,567"`.
pub fn format_count(value: i64) -> String {
    let digits = group_thousands(&value.unsigned_abs().to_string());
    if value < 0 {
        format!("-{digits}")
    } else {
        digits
    }
}

/// Fixed-point with thousands separators: `(1234.5, 2)` -> `"1,234.50"`.
pub fn format_decimal(value: f64, places: u32) -> String {
    let rounded = round_to(value, places);
    let fixed = format!("{:.*}", places as usize, rounded.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (fixed, None),
    };
    let sign = if rounded < 0.0 { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{sign}{}.{frac}", group_thousands(&int_part)),
        None => format!("{sign}{}", group_thousands(&int_part)),
    }
}

/// Prefix non-negative values with an explicit `+`.
pub fn signed(formatted: String, non_negative: bool) -> String {
    if non_negative {
        format!("+{formatted}")
    } else {
        formatted
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
