//! Numeric values of literal token text.

/// Value of an integer literal: optional sign, optional `0b`/`0o`/`0d`/`0x`
/// prefix, then at least one digit of that base.
pub fn int_value(text: &str) -> Option<i128> {
    let (negative, rest) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let bytes = rest.as_bytes();
    let (radix, digits) = match (bytes.first(), bytes.get(1)) {
        (Some(b'0'), Some(b'b' | b'B')) => (2, &rest[2..]),
        (Some(b'0'), Some(b'o' | b'O')) => (8, &rest[2..]),
        (Some(b'0'), Some(b'd' | b'D')) => (10, &rest[2..]),
        (Some(b'0'), Some(b'x' | b'X')) => (16, &rest[2..]),
        _ => (10, rest),
    };

    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }

    let value = i128::from_str_radix(digits, radix).ok()?;
    Some(if negative { -value } else { value })
}

/// Value of a float literal (`1.5`, `-2e3`, `6.02E+23`).
pub fn float_value(text: &str) -> Option<f64> {
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_prefixes() {
        assert_eq!(int_value("0b101"), Some(5));
        assert_eq!(int_value("0o17"), Some(15));
        assert_eq!(int_value("0d42"), Some(42));
        assert_eq!(int_value("0xFF"), Some(255));
        assert_eq!(int_value("0XfF"), Some(255));
    }

    #[test]
    fn test_signs() {
        assert_eq!(int_value("-5"), Some(-5));
        assert_eq!(int_value("+5"), Some(5));
        assert_eq!(int_value("-0x80"), Some(-128));
    }

    #[test]
    fn test_plain_decimal() {
        assert_eq!(int_value("0"), Some(0));
        assert_eq!(int_value("007"), Some(7));
        assert_eq!(int_value("18446744073709551615"), Some(u64::MAX as i128));
    }

    #[test]
    fn test_malformed() {
        assert_eq!(int_value(""), None);
        assert_eq!(int_value("-"), None);
        assert_eq!(int_value("0x"), None);
        assert_eq!(int_value("0b2"), None);
        assert_eq!(int_value("0x-1"), None);
    }

    #[test]
    fn test_floats() {
        assert_eq!(float_value("3.25"), Some(3.25));
        assert_eq!(float_value("-2e3"), Some(-2000.0));
        assert_eq!(float_value("+1.5E-1"), Some(0.15));
        assert_eq!(float_value("1e"), None);
    }
}
