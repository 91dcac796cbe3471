//! Post-binding validation of holders.

use crate::schema::OptionsHolder;

/// Checks a bound holder. Pluggable on [`crate::OptionsExtractor`].
pub trait OptionsValidator: Send + Sync {
    /// Return the reason the holder is invalid, if it is.
    fn validate(&self, holder: &dyn OptionsHolder) -> Result<(), String>;
}

/// Delegates to [`OptionsHolder::check`].
#[derive(Debug, Default, Clone, Copy)]
pub struct HolderValidator;

impl OptionsValidator for HolderValidator {
    fn validate(&self, holder: &dyn OptionsHolder) -> Result<(), String> {
        holder.check()
    }
}
