use std::path::Path;

use anyhow::Error;

use super::RawConfig;
use crate::{catalogue::signature::load_custom_signatures, logger::error};

/// Validate the configuration file loaded at the provided path, plus any custom
/// signature catalogue it can reach through the environment.
///
/// An explicit error is returned if configuration loading fails; otherwise, errors
/// are simply printed to STDERR using the [`logger::error`](crate::logger::error)
/// macro.
pub fn report_config_errors<P: AsRef<Path>>(path: P) -> Result<(), Error> {
    let raw_config = RawConfig::load(path, true)?;

    if raw_config.batch_size == 0 || raw_config.batch_size > 1024 {
        error!(
            "Config 'batch_size' must be between 1 and 1024, found {}",
            raw_config.batch_size
        );
    }

    for puid in raw_config
        .rerun_puids
        .iter()
        .chain(raw_config.markup_mismatch_puids.iter())
    {
        if puid.is_empty() {
            error!("Config contains an empty PUID entry");
        }
    }

    if let Err(err) = load_custom_signatures(None) {
        error!("Failed to load custom signature catalogue: {err}");
    }

    Ok(())
}
