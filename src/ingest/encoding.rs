use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt};

/// Text encodings a delimited file may be decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[serde(alias = "utf-8")]
    Utf8,
    /// ISO-8859-1. Every byte is a valid code point, so this never fails.
    #[serde(alias = "latin-1", alias = "iso-8859-1")]
    Latin1,
}

impl Encoding {
    /// `None` if `bytes` is not valid in this encoding.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
            Encoding::Latin1 => {
                if bytes.is_ascii() {
                    // ascii is identical in both; skip the copy
                    std::str::from_utf8(bytes).ok().map(Cow::Borrowed)
                } else {
                    Some(Cow::Owned(bytes.iter().map(|&b| b as char).collect()))
                }
            }
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Utf8 => f.write_str("utf-8"),
            Encoding::Latin1 => f.write_str("iso-8859-1"),
        }
    }
}
