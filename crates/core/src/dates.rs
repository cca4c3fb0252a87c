use chrono::{Local, NaiveDate, TimeDelta};

/// Format used for every date on the wire and in storage.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Expiry suggested for new items when the user has not entered one.
pub const DEFAULT_SHELF_LIFE_DAYS: i64 = 7;

/// Today's date in the local timezone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Expiry date pre-filled on forms and receipt drafts.
pub fn default_expiry(purchase_date: NaiveDate) -> NaiveDate {
    purchase_date + TimeDelta::days(DEFAULT_SHELF_LIFE_DAYS)
}

/// Strict `YYYY-MM-DD` parse; surrounding whitespace is ignored.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), ISO_DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_expiry_is_one_week_later() {
        let d = NaiveDate::from_ymd_opt(2024, 12, 28).unwrap();
        assert_eq!(default_expiry(d), NaiveDate::from_ymd_opt(2025, 1, 4).unwrap());
    }

    #[test]
    fn parse_iso_date_accepts_padded_input() {
        assert_eq!(
            parse_iso_date(" 2024-03-15 "),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
    }

    #[test]
    fn parse_iso_date_rejects_other_formats() {
        assert_eq!(parse_iso_date("2024/03/15"), None);
        assert_eq!(parse_iso_date("03-15-2024"), None);
        assert_eq!(parse_iso_date("2024-02-30"), None);
        assert_eq!(parse_iso_date(""), None);
    }
}
