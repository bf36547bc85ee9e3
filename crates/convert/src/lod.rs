use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// A level of detail selector such as `"0"` or `"2.2"`.
///
/// Always a single digit, optionally followed by a dot and a single digit, so
/// it is safe to embed in file names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Lod(String);

impl Lod {
    /// The four levels of detail exported per document unless configured
    /// otherwise, in export order.
    pub fn defaults() -> Vec<Lod> {
        ["0", "1.2", "1.3", "2.2"].into_iter().map(|s| Lod(s.to_string())).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_valid(s: &str) -> bool {
        match s.as_bytes() {
            [major] => major.is_ascii_digit(),
            [major, b'.', minor] => major.is_ascii_digit() && minor.is_ascii_digit(),
            _ => false,
        }
    }
}

impl FromStr for Lod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !Self::is_valid(s) {
            exn::bail!(ErrorKind::InvalidLod(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Lod {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Lod> for String {
    fn from(lod: Lod) -> Self {
        lod.0
    }
}

impl Display for Lod {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}
