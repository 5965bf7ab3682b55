//! `show_time` input accepts both the ISO `T` separator and a plain space.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};

const FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

pub fn parse(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "Datetime has wrong format: {:?}. Use YYYY-MM-DD HH:MM[:SS]",
            raw
        ))
    })
}

pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("Datetime has wrong format: {:?}", raw))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn accepts_space_and_t_separators() {
        let expected = NaiveDate::from_ymd_opt(2022, 6, 2)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap();

        assert_eq!(parse("2022-06-02 14:00:00"), Some(expected));
        assert_eq!(parse("2022-06-02T14:00:00"), Some(expected));
        assert_eq!(parse("2022-06-02 14:00"), Some(expected));
    }

    #[test]
    fn rejects_dates_without_time() {
        assert_eq!(parse("2022-06-02"), None);
        assert_eq!(parse("tomorrow"), None);
    }
}
