/// Null, empty, or the literal `NULL` in any case.
pub fn is_null(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => {
            let v = v.trim();
            v.is_empty() || v.eq_ignore_ascii_case("null")
        }
    }
}

/// Coerce a station id to a non-negative integer. Whole floats (`7000.0`,
/// as spreadsheets and older exports write them) are accepted; fractions,
/// NaN, infinities and negatives are not.
pub fn parse_station_id(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if is_null(Some(s)) {
        return None;
    }
    if let Ok(v) = s.parse::<i64>() {
        return (v >= 0).then_some(v);
    }
    let f: f64 = s.parse().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f >= 0.0 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_like_values() {
        assert!(is_null(None));
        assert!(is_null(Some("")));
        assert!(is_null(Some(" NULL ")));
        assert!(is_null(Some("null")));
        assert!(!is_null(Some("Bay St")));
        assert!(!is_null(Some("0")));
    }

    #[test]
    fn station_ids() {
        assert_eq!(parse_station_id("7021"), Some(7021));
        assert_eq!(parse_station_id(" 7021 "), Some(7021));
        assert_eq!(parse_station_id("7021.0"), Some(7021));
        assert_eq!(parse_station_id("0"), Some(0));
        assert_eq!(parse_station_id("7021.5"), None);
        assert_eq!(parse_station_id("NaN"), None);
        assert_eq!(parse_station_id("inf"), None);
        assert_eq!(parse_station_id("-4"), None);
        assert_eq!(parse_station_id("NULL"), None);
        assert_eq!(parse_station_id("Bay St"), None);
    }
}
