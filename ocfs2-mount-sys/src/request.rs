// SPDX-License-Identifier: GPL-3.0-only

use crate::error::{MountError, Result};
use crate::options::{TranslatedOptions, translate};

/// What the caller asked for, as read from the command line
///
/// Built once by the argument reader and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountRequest {
    pub device: Option<String>,
    pub mountpoint: Option<String>,
    /// The `-o` string exactly as given
    pub raw_options: Option<String>,
    pub verbose: u8,
    /// Set by `-n`
    pub skip_table_update: bool,
}

/// A request that passed validation and had its options translated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMount {
    pub device: String,
    pub mountpoint: String,
    pub raw_options: Option<String>,
    pub options: TranslatedOptions,
}

impl MountRequest {
    pub fn is_verbose(&self) -> bool {
        self.verbose > 0
    }

    /// Check device and mountpoint are present and translate the options
    pub fn validate(&self) -> Result<ValidatedMount> {
        let device = non_empty(&self.device).ok_or(MountError::MissingDevice)?;
        let mountpoint = non_empty(&self.mountpoint).ok_or(MountError::MissingMountpoint)?;

        let options = self
            .raw_options
            .as_deref()
            .map(translate)
            .unwrap_or_default();

        Ok(ValidatedMount {
            device: device.to_string(),
            mountpoint: mountpoint.to_string(),
            raw_options: self.raw_options.clone(),
            options,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}
