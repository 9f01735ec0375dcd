use std::fmt;

use serde::{Deserialize, Serialize};

const KILOBYTE: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SizeUnit {
    Byte,
    Kilobyte,
    Megabyte,
    Gigabyte,
    Terabyte,
}

impl SizeUnit {
    const DESCENDING: [SizeUnit; 4] = [
        SizeUnit::Terabyte,
        SizeUnit::Gigabyte,
        SizeUnit::Megabyte,
        SizeUnit::Kilobyte,
    ];

    pub fn bytes(self) -> u64 {
        match self {
            SizeUnit::Byte => 1,
            SizeUnit::Kilobyte => KILOBYTE,
            SizeUnit::Megabyte => KILOBYTE.pow(2),
            SizeUnit::Gigabyte => KILOBYTE.pow(3),
            SizeUnit::Terabyte => KILOBYTE.pow(4),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SizeUnit::Byte => "byte",
            SizeUnit::Kilobyte => "KB",
            SizeUnit::Megabyte => "MB",
            SizeUnit::Gigabyte => "GB",
            SizeUnit::Terabyte => "TB",
        }
    }
}

/// A byte count scaled to the largest unit it reaches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FileSize {
    pub value: f64,
    pub unit: SizeUnit,
}

impl FileSize {
    pub fn from_bytes(bytes: u64) -> Self {
        let unit = SizeUnit::DESCENDING
            .into_iter()
            .find(|unit| bytes >= unit.bytes())
            .unwrap_or(SizeUnit::Byte);

        Self {
            value: bytes as f64 / unit.bytes() as f64,
            unit,
        }
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            SizeUnit::Byte => write!(f, "{} {}", self.value, self.unit.label()),
            unit => write!(f, "{:.2} {}", self.value, unit.label()),
        }
    }
}

pub fn format_size(bytes: u64) -> String {
    FileSize::from_bytes(bytes).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_the_largest_reached_unit() {
        assert_eq!(FileSize::from_bytes(0).unit, SizeUnit::Byte);
        assert_eq!(FileSize::from_bytes(1023).unit, SizeUnit::Byte);
        assert_eq!(FileSize::from_bytes(1024).unit, SizeUnit::Kilobyte);
        assert_eq!(FileSize::from_bytes(5 * 1024 * 1024).unit, SizeUnit::Megabyte);
        assert_eq!(FileSize::from_bytes(3 * KILOBYTE.pow(4)).unit, SizeUnit::Terabyte);
    }

    #[test]
    fn formats_with_unit_labels() {
        assert_eq!(format_size(512), "512 byte");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(10 * 1024 * 1024), "10.00 MB");
        assert_eq!(format_size(KILOBYTE.pow(3) / 4), "256.00 MB");
    }
}
