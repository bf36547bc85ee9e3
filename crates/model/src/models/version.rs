use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// The `major.minor` schema version a CityJSON document declares.
///
/// Patch components (`"1.0.3"`) are accepted and discarded; they never
/// change the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaVersion {
    pub major: u8,
    pub minor: u8,
}

impl SchemaVersion {
    pub const V1_0: Self = Self::new(1, 0);
    pub const V1_1: Self = Self::new(1, 1);
    pub const V2_0: Self = Self::new(2, 0);

    /// Versions the loader accepts, oldest first.
    pub const SUPPORTED: [Self; 3] = [Self::V1_0, Self::V1_1, Self::V2_0];

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(self)
    }

    /// Still loadable, but superseded.
    pub fn is_deprecated(&self) -> bool {
        *self == Self::V1_0
    }
}

impl FromStr for SchemaVersion {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let major = parts.next().ok_or(())?.parse().map_err(|_| ())?;
        let minor = parts.next().ok_or(())?.parse().map_err(|_| ())?;
        if let Some(patch) = parts.next() {
            patch.parse::<u16>().map_err(|_| ())?;
        }
        if parts.next().is_some() {
            return Err(());
        }
        Ok(Self { major, minor })
    }
}

impl Display for SchemaVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
