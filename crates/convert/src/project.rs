use serde::{Deserialize, Serialize};

/// Project-level attribution written into every artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectMetadata {
    pub name_project: String,
    pub name_site: String,
    pub person_family: String,
    pub person_given: String,
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self {
            name_project: "3DBAG Project".to_string(),
            name_site: "3DBAG Site".to_string(),
            person_family: "3Dgeoinfo".to_string(),
            person_given: "3DGI/".to_string(),
        }
    }
}
