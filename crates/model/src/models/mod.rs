mod model;
mod version;

pub use self::model::Model;
pub use self::version::SchemaVersion;
