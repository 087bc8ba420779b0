//! Configuration access port trait.

use crate::domain::error::ValmoError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// A key that must be present and non-empty.
    fn require_string(&self, section: &str, key: &str) -> Result<String, ValmoError> {
        self.get_string(section, key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ValmoError::ConfigMissing {
                section: section.to_string(),
                key: key.to_string(),
            })
    }
}
