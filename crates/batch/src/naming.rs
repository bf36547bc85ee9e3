//! Path conventions shared by every stage.
//!
//! All paths of one source document derive from its directory and the stem
//! `<name>` in front of `.city.json`:
//!
//! | Path                | Form                    |
//! |---------------------|-------------------------|
//! | compressed source   | `<name>.city.json.gz`   |
//! | plain source        | `<name>.city.json`      |
//! | per-LOD artifact    | `<name>-<lod>.ifc`      |
//! | archive             | `<name>.ifc.zip`        |
//! | partial archive     | `<name>.ifc.zip.part`   |

use cjifc_convert::Lod;
use std::path::{Path, PathBuf};

pub const COMPRESSED_SUFFIX: &str = ".city.json.gz";
pub const PLAIN_SUFFIX: &str = ".city.json";
pub const ARTIFACT_SUFFIX: &str = ".ifc";
pub const ARCHIVE_SUFFIX: &str = ".ifc.zip";
pub const PARTIAL_SUFFIX: &str = ".part";

/// The `<name>` of a source document and the directory it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceName {
    dir: PathBuf,
    stem: String,
}

impl SourceName {
    /// Accepts a compressed or plain source path; anything else is `None`.
    ///
    /// Suffix matching is case-sensitive, so `A.CITY.JSON` is not a source.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let file_name = path.file_name()?.to_str()?;
        let stem = file_name
            .strip_suffix(COMPRESSED_SUFFIX)
            .or_else(|| file_name.strip_suffix(PLAIN_SUFFIX))
            .filter(|stem| !stem.is_empty())?;
        Some(Self {
            dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            stem: stem.to_string(),
        })
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn compressed(&self) -> PathBuf {
        self.sibling(COMPRESSED_SUFFIX)
    }

    pub fn plain(&self) -> PathBuf {
        self.sibling(PLAIN_SUFFIX)
    }

    pub fn artifact(&self, lod: &Lod) -> PathBuf {
        self.dir.join(format!("{}-{lod}{ARTIFACT_SUFFIX}", self.stem))
    }

    pub fn archive(&self) -> PathBuf {
        self.sibling(ARCHIVE_SUFFIX)
    }

    pub fn partial_archive(&self) -> PathBuf {
        self.dir.join(format!("{}{ARCHIVE_SUFFIX}{PARTIAL_SUFFIX}", self.stem))
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{suffix}", self.stem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("data/a.city.json", "data", "a")]
    #[case("data/a.city.json.gz", "data", "a")]
    #[case("/abs/tile.1-2.city.json", "/abs", "tile.1-2")]
    #[case("b.city.json", "", "b")]
    fn accepts_sources(#[case] path: &str, #[case] dir: &str, #[case] stem: &str) {
        let name = SourceName::from_path(path).unwrap();
        assert_eq!(name.dir(), Path::new(dir));
        assert_eq!(name.stem(), stem);
    }

    #[rstest]
    #[case("a.json")]
    #[case("a.city.json.zip")]
    #[case("a.CITY.JSON")]
    #[case(".city.json")]
    #[case("a.ifc.zip")]
    #[case("")]
    fn rejects_everything_else(#[case] path: &str) {
        assert_eq!(SourceName::from_path(path), None);
    }

    #[test]
    fn derived_paths() {
        let name = SourceName::from_path("tiles/a.city.json.gz").unwrap();
        assert_eq!(name.compressed(), Path::new("tiles/a.city.json.gz"));
        assert_eq!(name.plain(), Path::new("tiles/a.city.json"));
        assert_eq!(name.archive(), Path::new("tiles/a.ifc.zip"));
        assert_eq!(name.partial_archive(), Path::new("tiles/a.ifc.zip.part"));
        let lod: Lod = "1.2".parse().unwrap();
        assert_eq!(name.artifact(&lod), Path::new("tiles/a-1.2.ifc"));
    }

    #[test]
    fn plain_and_compressed_share_a_name() {
        assert_eq!(SourceName::from_path("x/a.city.json"), SourceName::from_path("x/a.city.json.gz"));
    }
}
