use crate::models::error::SError;
use camino::Utf8Path;

pub struct Toml;

impl Toml {
    /// Writes through a sibling temp file and renames it over `path`, so a
    /// crash never leaves a half-written document behind.
    pub fn write<T: serde::Serialize>(path: &Utf8Path, data: &T) -> Result<(), SError> {
        let text = toml::to_string(data)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn read<T: serde::de::DeserializeOwned>(path: &Utf8Path) -> Result<T, SError> {
        let s = std::fs::read_to_string(path)?;
        toml::from_str::<T>(&s).map_err(|e| SError::ParseError(format!("{path}: {e}")))
    }
}
