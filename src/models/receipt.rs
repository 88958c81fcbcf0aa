//! Pending receipt models and storage key layout.

use chrono::NaiveDate;

use crate::utils::sanitize_filename;

/// Every pending receipt is stored with this extension, whatever its format.
pub const RECEIPT_EXTENSION: &str = "png";

/// One file handed to the intake, in submission order.
#[derive(Debug, Clone)]
pub struct ReceiptUpload {
    /// Name the file had on the client side (for messages only).
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ReceiptUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Validated event metadata shared by every receipt of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDetails {
    pub name: String,
    pub date: NaiveDate,
}

impl EventDetails {
    /// Key-safe slug of the event name.
    pub fn slug(&self) -> String {
        sanitize_filename(&self.name)
    }

    /// Date in the compact `YYMMDD` form used in keys.
    pub fn compact_date(&self) -> String {
        self.date.format("%y%m%d").to_string()
    }
}

/// Storage key for the `index`-th (1-based) receipt of an event.
///
/// Layout: `{prefix}{YYMMDD}-{slug}-{index}.png`
pub fn receipt_key(prefix: &str, event: &EventDetails, index: usize) -> String {
    format!(
        "{}{}-{}-{}.{}",
        prefix,
        event.compact_date(),
        event.slug(),
        index,
        RECEIPT_EXTENSION
    )
}

/// Key a pending object is moved to once it has been submitted.
///
/// Keys outside `pending_prefix` keep their full path under `archive_prefix`.
pub fn archive_key(key: &str, pending_prefix: &str, archive_prefix: &str) -> String {
    let relative = key.strip_prefix(pending_prefix).unwrap_or(key);
    format!("{}{}", archive_prefix, relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str, date: &str) -> EventDetails {
        EventDetails {
            name: name.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        }
    }

    #[test]
    fn test_receipt_key() {
        let e = event("Summer BBQ", "2024-07-04");
        assert_eq!(receipt_key("new/", &e, 1), "new/240704-summer-bbq-1.png");
        assert_eq!(receipt_key("new/", &e, 2), "new/240704-summer-bbq-2.png");
    }

    #[test]
    fn test_receipt_key_pads_date() {
        let e = event("Picnic", "2025-01-02");
        assert_eq!(e.compact_date(), "250102");
        assert_eq!(receipt_key("new/", &e, 1), "new/250102-picnic-1.png");
    }

    #[test]
    fn test_archive_key() {
        assert_eq!(
            archive_key("new/250102-picnic-1.png", "new/", "submitted/"),
            "submitted/250102-picnic-1.png"
        );
        assert_eq!(
            archive_key("other/x.png", "new/", "submitted/"),
            "submitted/other/x.png"
        );
    }
}
