use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};


/// A value cannot be converted to the requested type.
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[error("'{value}' is not a valid {target} value")]
pub struct FormatError {
    /// The rejected text.
    pub value: String,
    /// Name of the target type.
    pub target: &'static str,
}

impl FormatError {
    fn new(value: &str, target: &'static str) -> Self {
        FormatError { value: value.to_string(), target }
    }
}


/// Types that can be parsed from the lexical form of an XML value.
///
/// Lexical rules follow XML Schema, not Rust's `FromStr`.
pub trait FromXmlValue: Sized {
    /// Parses a value that is already trimmed of surrounding whitespace.
    fn from_xml_value(text: &str) -> Result<Self, FormatError>;
}

/// Converts an XML value to a typed one.
///
/// Surrounding XML whitespace is ignored.
///
/// # Examples
///
/// ```
/// use xmlnav::convert;
///
/// assert_eq!(convert::<bool>(" 1 "), Ok(true));
/// assert_eq!(convert::<i64>("10000000000000000"), Ok(10000000000000000));
/// assert!(convert::<i32>("1.0").is_err());
/// assert_eq!(convert::<f64>("-INF"), Ok(f64::NEG_INFINITY));
/// ```
pub fn convert<T: FromXmlValue>(text: &str) -> Result<T, FormatError> {
    T::from_xml_value(text.trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\r')))
}


impl FromXmlValue for String {
    fn from_xml_value(text: &str) -> Result<Self, FormatError> {
        Ok(text.to_string())
    }
}

impl FromXmlValue for bool {
    fn from_xml_value(text: &str) -> Result<Self, FormatError> {
        match text {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            _ => Err(FormatError::new(text, "boolean")),
        }
    }
}

fn is_integer_lexical(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|c| c.is_ascii_digit())
}

impl FromXmlValue for i32 {
    fn from_xml_value(text: &str) -> Result<Self, FormatError> {
        if !is_integer_lexical(text) {
            return Err(FormatError::new(text, "int"));
        }

        text.parse().map_err(|_| FormatError::new(text, "int"))
    }
}

impl FromXmlValue for i64 {
    fn from_xml_value(text: &str) -> Result<Self, FormatError> {
        if !is_integer_lexical(text) {
            return Err(FormatError::new(text, "long"));
        }

        text.parse().map_err(|_| FormatError::new(text, "long"))
    }
}

impl FromXmlValue for f64 {
    fn from_xml_value(text: &str) -> Result<Self, FormatError> {
        match text {
            "INF" | "+INF" => return Ok(f64::INFINITY),
            "-INF" => return Ok(f64::NEG_INFINITY),
            "NaN" => return Ok(f64::NAN),
            _ => {}
        }

        // Rust also accepts `inf`, `infinity` and `nan` spellings.
        let valid = !text.is_empty() && text.bytes().all(|c| {
            c.is_ascii_digit() || matches!(c, b'+' | b'-' | b'.' | b'e' | b'E')
        });

        if !valid {
            return Err(FormatError::new(text, "double"));
        }

        text.parse().map_err(|_| FormatError::new(text, "double"))
    }
}

impl FromXmlValue for NaiveDate {
    fn from_xml_value(text: &str) -> Result<Self, FormatError> {
        let (local, offset) = split_timezone(text).ok_or_else(|| FormatError::new(text, "date"))?;
        let date = NaiveDate::parse_from_str(local, "%Y-%m-%d")
            .map_err(|_| FormatError::new(text, "date"))?;

        match offset {
            None => Ok(date),
            Some(offset) => Ok(to_utc(date.and_time(NaiveTime::MIN), offset).date()),
        }
    }
}

impl FromXmlValue for NaiveDateTime {
    fn from_xml_value(text: &str) -> Result<Self, FormatError> {
        let (local, offset) = split_timezone(text)
            .ok_or_else(|| FormatError::new(text, "dateTime"))?;

        let dt = if local.contains('T') {
            NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M:%S%.f")
                .map_err(|_| FormatError::new(text, "dateTime"))?
        } else {
            NaiveDate::parse_from_str(local, "%Y-%m-%d")
                .map_err(|_| FormatError::new(text, "dateTime"))?
                .and_time(NaiveTime::MIN)
        };

        match offset {
            None => Ok(dt),
            Some(offset) => Ok(to_utc(dt, offset)),
        }
    }
}

/// Splits a trailing `Z` or `±hh:mm` timezone.
///
/// Returns `None` when the timezone is malformed.
fn split_timezone(text: &str) -> Option<(&str, Option<FixedOffset>)> {
    if let Some(local) = text.strip_suffix('Z') {
        return Some((local, FixedOffset::east_opt(0)));
    }

    // `yyyy-mm-dd` is the shortest value that can carry a timezone.
    if text.len() >= 16 && text.is_char_boundary(text.len() - 6) {
        let (local, tz) = text.split_at(text.len() - 6);
        if tz.starts_with(['+', '-']) && tz.as_bytes()[3] == b':' {
            let hours: i32 = tz.get(1..3)?.parse().ok()?;
            let minutes: i32 = tz.get(4..6)?.parse().ok()?;
            if hours > 14 || minutes > 59 {
                return None;
            }

            let secs = (hours * 60 + minutes) * 60;
            let offset = if tz.starts_with('-') {
                FixedOffset::west_opt(secs)
            } else {
                FixedOffset::east_opt(secs)
            };

            return Some((local, Some(offset?)));
        }
    }

    Some((text, None))
}

fn to_utc(dt: NaiveDateTime, offset: FixedOffset) -> NaiveDateTime {
    dt - TimeDelta::seconds(i64::from(offset.local_minus_utc()))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans() {
        assert_eq!(convert::<bool>("true"), Ok(true));
        assert_eq!(convert::<bool>("0"), Ok(false));
        assert!(convert::<bool>("1.0").is_err());
        assert!(convert::<bool>("TRUE").is_err());
    }

    #[test]
    fn integers() {
        assert_eq!(convert::<i32>("-42"), Ok(-42));
        assert_eq!(convert::<i32>("+7"), Ok(7));
        assert!(convert::<i32>("2147483648").is_err());
        assert!(convert::<i64>("0x10000000000000000").is_err());
        assert!(convert::<i64>("-").is_err());
    }

    #[test]
    fn doubles() {
        assert_eq!(convert::<f64>("3.14159265359"), Ok(3.14159265359));
        assert_eq!(convert::<f64>("1e3"), Ok(1000.0));
        assert!(convert::<f64>("NaN").unwrap().is_nan());
        assert!(convert::<f64>("inf").is_err());
        assert!(convert::<f64>("nan").is_err());
        assert!(convert::<f64>("").is_err());
    }

    #[test]
    fn dates() {
        let d = NaiveDate::from_ymd_opt(2005, 12, 13).unwrap();
        assert_eq!(convert::<NaiveDate>("2005-12-13"), Ok(d));
        assert_eq!(convert::<NaiveDate>("2005-12-13Z"), Ok(d));
        assert!(convert::<NaiveDate>("2005-13-13").is_err());
    }

    #[test]
    fn date_times() {
        let dt = NaiveDate::from_ymd_opt(2005, 12, 13).unwrap().and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(convert::<NaiveDateTime>("2005-12-13T10:30:00"), Ok(dt));
        assert_eq!(convert::<NaiveDateTime>("2005-12-13T12:30:00+02:00"), Ok(dt));
        assert_eq!(convert::<NaiveDateTime>("2005-12-13T09:30:00-01:00"), Ok(dt));
        assert_eq!(
            convert::<NaiveDateTime>("2005-12-13"),
            Ok(NaiveDate::from_ymd_opt(2005, 12, 13).unwrap().and_hms_opt(0, 0, 0).unwrap())
        );
        assert!(convert::<NaiveDateTime>("2005-12-13T10:30:00+25:00").is_err());
    }
}
