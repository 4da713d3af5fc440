use chrono::{NaiveDate, NaiveTime};

pub const KNOTS_TO_MPS: f64 = 0.514444;
pub const KMH_TO_MPS: f64 = 1.0 / 3.6;

pub fn float(field: &str) -> Option<f64> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Like [`float`], but values outside `[min, max]` count as not reported.
pub fn within(field: &str, min: f64, max: f64) -> Option<f64> {
    float(field).filter(|v| (min..=max).contains(v))
}

pub fn uint(field: &str) -> Option<u32> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    field.parse().ok()
}

/// `ddmm.mmmm` + `N`/`S` into signed decimal degrees.
pub fn latitude(value: &str, hemisphere: &str) -> Option<f64> {
    let degrees = angle(value, 90.0)?;
    match hemisphere.trim() {
        "N" | "n" => Some(degrees),
        "S" | "s" => Some(-degrees),
        _ => None,
    }
}

/// `dddmm.mmmm` + `E`/`W` into signed decimal degrees.
pub fn longitude(value: &str, hemisphere: &str) -> Option<f64> {
    let degrees = angle(value, 180.0)?;
    match hemisphere.trim() {
        "E" | "e" => Some(degrees),
        "W" | "w" => Some(-degrees),
        _ => None,
    }
}

fn angle(value: &str, limit: f64) -> Option<f64> {
    let raw = float(value)?;
    if raw < 0.0 {
        return None;
    }
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    if minutes >= 60.0 {
        return None;
    }
    let decimal = degrees + minutes / 60.0;
    (decimal <= limit).then_some(decimal)
}

/// `hhmmss[.sss]`, fractional part truncated to milliseconds.
pub fn time(field: &str) -> Option<NaiveTime> {
    let field = field.trim();
    let (base, frac) = match field.split_once('.') {
        Some((base, frac)) => (base, frac),
        None => (field, ""),
    };
    if base.len() != 6 || !base.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour: u32 = base[0..2].parse().ok()?;
    let minute: u32 = base[2..4].parse().ok()?;
    let second: u32 = base[4..6].parse().ok()?;
    let millis: u32 = format!("{:0<3}", &frac[..frac.len().min(3)]).parse().ok()?;
    NaiveTime::from_hms_milli_opt(hour, minute, second, millis)
}

/// `ddmmyy`; two-digit years below 80 are 20xx.
pub fn date(field: &str) -> Option<NaiveDate> {
    let field = field.trim();
    if field.len() != 6 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let day: u32 = field[0..2].parse().ok()?;
    let month: u32 = field[2..4].parse().ok()?;
    let yy: i32 = field[4..6].parse().ok()?;
    let year = if yy < 80 { 2000 + yy } else { 1900 + yy };
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latitude_and_longitude_decode_to_signed_degrees() {
        let lat = latitude("3723.2475", "N").unwrap();
        assert!((lat - 37.387458).abs() < 1e-6);
        let lon = longitude("12202.3456", "W").unwrap();
        assert!((lon + 122.039093).abs() < 1e-6);
    }

    #[test]
    fn empty_or_invalid_coordinates_are_missing() {
        assert_eq!(latitude("", "N"), None);
        assert_eq!(latitude("3723.2475", ""), None);
        assert_eq!(latitude("3775.0000", "N"), None);
        assert_eq!(longitude("18130.0000", "E"), None);
    }

    #[test]
    fn time_keeps_milliseconds() {
        let t = time("123519.25").unwrap();
        assert_eq!(t, NaiveTime::from_hms_milli_opt(12, 35, 19, 250).unwrap());
        assert_eq!(time("123519").unwrap(), NaiveTime::from_hms_opt(12, 35, 19).unwrap());
        assert_eq!(time("12351"), None);
        assert_eq!(time("256000"), None);
    }

    #[test]
    fn date_pivots_two_digit_years() {
        assert_eq!(date("230394"), NaiveDate::from_ymd_opt(1994, 3, 23));
        assert_eq!(date("150324"), NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(date("320124"), None);
    }

    #[test]
    fn out_of_range_magnitudes_are_not_reported() {
        assert_eq!(within("1e200", 0.0, 99.0), None);
        assert_eq!(within("-1", 0.0, 99.0), None);
        assert_eq!(within("42", 0.0, 99.0), Some(42.0));
        assert_eq!(within("99", 0.0, 99.0), Some(99.0));
    }

    #[test]
    fn zero_is_a_value_not_a_gap() {
        assert_eq!(float("0.0"), Some(0.0));
        assert_eq!(float(""), None);
        assert_eq!(uint("00"), Some(0));
    }
}
