//! Storage Key Derivation
//!
//! Every upload is stored under a name built from the calendar month it
//! arrived in, not from the name the client sent:
//!
//! ```text
//! report.pdf  uploaded 2024-09-15  ->  September_2024.pdf
//! invoice.pdf uploaded 2024-09-20  ->  September_2024.pdf   (overwrites)
//! ```
//!
//! Keys collide for every upload in the same month sharing an extension,
//! and the later upload wins. The `digest` strategy appends a short content
//! hash for deployments that cannot tolerate the overwrite.

use chrono::{Datelike, Month};
use sha2::{Digest, Sha256};
use std::str::FromStr;

/// Hex characters of the content digest kept in `digest` keys
const DIGEST_LEN: usize = 8;

/// Language used for the month part of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonthLocale {
    /// Indonesian month names (`Januari` .. `Desember`)
    #[default]
    Indonesian,
    English,
}

const INDONESIAN_MONTHS: [&str; 12] = [
    "Januari", "Februari", "Maret", "April", "Mei", "Juni",
    "Juli", "Agustus", "September", "Oktober", "November", "Desember",
];

impl MonthLocale {
    /// Full month name for a 1-based month number
    pub fn month_name(&self, month: u32) -> &'static str {
        let index = (month.clamp(1, 12) - 1) as usize;
        match self {
            MonthLocale::Indonesian => INDONESIAN_MONTHS[index],
            MonthLocale::English => Month::try_from(index as u8 + 1)
                .map(|m| m.name())
                .unwrap_or("January"),
        }
    }
}

impl FromStr for MonthLocale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "id" | "id-id" | "indonesian" => Ok(MonthLocale::Indonesian),
            "en" | "en-us" | "en-gb" | "english" => Ok(MonthLocale::English),
            other => Err(format!("Unknown filename locale: {}", other)),
        }
    }
}

/// How the final key is assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStrategy {
    /// `{Month}_{Year}{.ext}`, last write in a month wins
    #[default]
    Monthly,
    /// `{Month}_{Year}_{sha256[..8]}{.ext}`
    Digest,
}

impl FromStr for KeyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(KeyStrategy::Monthly),
            "digest" | "hash" => Ok(KeyStrategy::Digest),
            other => Err(format!("Unknown filename strategy: {}", other)),
        }
    }
}

/// Extension of `name` including the leading dot, or `""`.
///
/// Only the last path segment is inspected. A name whose only dot is its
/// first character (`.env`) has no extension, nor does a name made of dots.
pub fn extension_of(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let Some(dot) = base.rfind('.') else {
        return "";
    };
    if base[..dot].chars().all(|c| c == '.') {
        return "";
    }
    &base[dot..]
}

/// `{Month}_{Year}{.ext}` using Indonesian month names
pub fn derive_key(original_name: &str, now: &impl Datelike) -> String {
    KeyDeriver::default().derive(original_name, &[], now)
}

/// Derives storage keys from upload metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyDeriver {
    pub locale: MonthLocale,
    pub strategy: KeyStrategy,
}

impl KeyDeriver {
    pub fn new(locale: MonthLocale, strategy: KeyStrategy) -> Self {
        Self { locale, strategy }
    }

    /// Build the key for an upload. `content` is only read by the digest strategy.
    pub fn derive(&self, original_name: &str, content: &[u8], now: &impl Datelike) -> String {
        let month = self.locale.month_name(now.month());
        let ext = extension_of(original_name);

        match self.strategy {
            KeyStrategy::Monthly => format!("{}_{:04}{}", month, now.year(), ext),
            KeyStrategy::Digest => {
                let digest = hex::encode(Sha256::digest(content));
                format!("{}_{:04}_{}{}", month, now.year(), &digest[..DIGEST_LEN], ext)
            }
        }
    }
}
