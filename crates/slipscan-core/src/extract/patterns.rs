//! Regex patterns for Thai payment slip extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Amount cascade. Order matters: the first pattern that yields a
    // parseable number wins, so labeled forms sit above bare numbers.
    pub static ref AMOUNT_PATTERNS: Vec<Regex> = vec![
        // "จำนวนเงิน" label directly before the number
        Regex::new(r"จำนวนเงิน\s*(\d{1,3}(?:,\d{3})*\.\d{2})").unwrap(),
        // "จำนวน:" label with trailing currency word
        Regex::new(r"จำนวน:\s*(\d{1,3}(?:,\d{3})*\.\d{2})\s*บาท").unwrap(),
        // "จำนวน" label with trailing currency word
        Regex::new(r"จำนวน\s+(\d{1,3}(?:,\d{3})*\.\d{2})\s*บาท").unwrap(),
        // Bare number followed by the currency word
        Regex::new(r"(\d{1,3}(?:,\d{3})*\.\d{2})\s*บาท").unwrap(),
        // Keyword anywhere on the line before the number
        Regex::new(r"(?:จำนวน|amount|เงิน).*?(\d{1,3}(?:,\d{3})*\.\d{2})").unwrap(),
        // Unlabeled number with thousands grouping
        Regex::new(r"\b(\d{1,3}(?:,\d{3})*\.\d{2})\b").unwrap(),
        // Short unlabeled number without a leading zero
        Regex::new(r"\b([1-9]\d{1,2}\.\d{2})\b").unwrap(),
        // Common transfer amounts, kept as a last-resort net
        Regex::new(r"(70\.00|520\.00|1,000\.00|10,000\.00|100,000\.00|1,000,000\.00)").unwrap(),
    ];

    // Numeric substring inside a matched amount region
    pub static ref DECIMAL_NUMBER: Regex = Regex::new(
        r"(\d{1,3}(?:,\d{3})*\.\d{2})"
    ).unwrap();

    // Date cascade. Thai month abbreviations first (June leads, the rest
    // in calendar order), then the international numeric shapes.
    pub static ref DATE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(\d{1,2})\s*มิ\.ย\.\s*(\d{2,4})").unwrap(),
        Regex::new(r"(\d{1,2})\s*ม\.ค\.\s*(\d{2,4})").unwrap(),
        Regex::new(r"(\d{1,2})\s*ก\.พ\.\s*(\d{2,4})").unwrap(),
        Regex::new(r"(\d{1,2})\s*มี\.ค\.\s*(\d{2,4})").unwrap(),
        Regex::new(r"(\d{1,2})\s*เม\.ย\.\s*(\d{2,4})").unwrap(),
        Regex::new(r"(\d{1,2})\s*พ\.ค\.\s*(\d{2,4})").unwrap(),
        Regex::new(r"(\d{1,2})\s*ก\.ค\.\s*(\d{2,4})").unwrap(),
        Regex::new(r"(\d{1,2})\s*ส\.ค\.\s*(\d{2,4})").unwrap(),
        Regex::new(r"(\d{1,2})\s*ก\.ย\.\s*(\d{2,4})").unwrap(),
        Regex::new(r"(\d{1,2})\s*ต\.ค\.\s*(\d{2,4})").unwrap(),
        Regex::new(r"(\d{1,2})\s*พ\.ย\.\s*(\d{2,4})").unwrap(),
        Regex::new(r"(\d{1,2})\s*ธ\.ค\.\s*(\d{2,4})").unwrap(),
        Regex::new(r"\d{1,2}/\d{1,2}/\d{4}").unwrap(),
        Regex::new(r"\d{1,2}-\d{1,2}-\d{4}").unwrap(),
        Regex::new(r"\d{4}/\d{1,2}/\d{1,2}").unwrap(),
        Regex::new(r"\d{4}-\d{1,2}-\d{1,2}").unwrap(),
    ];

    // Buddhist-era signals: a 25xx year or a plausible 2-digit year.
    // Loose on purpose; conversion rewrites nothing it does not recognize.
    pub static ref BUDDHIST_YEAR_SIGNAL: Regex = Regex::new(
        r"25\d{2}|6[0-9]|7[0-9]"
    ).unwrap();

    pub static ref FOUR_DIGIT_BE_YEAR: Regex = Regex::new(
        r"25\d{2}"
    ).unwrap();

    pub static ref TWO_DIGIT_BE_YEAR: Regex = Regex::new(
        r"\b([6-7]\d)\b"
    ).unwrap();

    pub static ref WHITESPACE: Regex = Regex::new(
        r"\s+"
    ).unwrap();
}

/// Thai month abbreviations and their zero-padded month numbers, in
/// calendar order. Conversion scans this table from January.
pub const THAI_MONTHS: [(&str, &str); 12] = [
    ("ม.ค.", "01"),
    ("ก.พ.", "02"),
    ("มี.ค.", "03"),
    ("เม.ย.", "04"),
    ("พ.ค.", "05"),
    ("มิ.ย.", "06"),
    ("ก.ค.", "07"),
    ("ส.ค.", "08"),
    ("ก.ย.", "09"),
    ("ต.ค.", "10"),
    ("พ.ย.", "11"),
    ("ธ.ค.", "12"),
];
