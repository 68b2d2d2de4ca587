// These warnings conflict with the Garde validator API.
#![allow(clippy::trivially_copy_pass_by_ref, clippy::ptr_arg)]

use crate::utils::PrintErrorChain;
use std::{fs, io, path::PathBuf};

pub fn is_file_directory_exists(path: &PathBuf, _: &()) -> garde::Result {
    let Some(path) = path.parent() else {
        return Ok(());
    };

    if path.as_os_str().is_empty() {
        return Ok(());
    }

    let dpath = path.display();

    let is_exists = path.try_exists().map_err(IoValidationError)?;
    if !is_exists {
        return Err(garde::Error::new(format!("path '{dpath}' does not exists")));
    }

    let metadata = fs::metadata(path).map_err(IoValidationError)?;
    if !metadata.is_dir() {
        return Err(garde::Error::new(format!("'{dpath}' is not a directory")));
    }

    Ok(())
}

struct IoValidationError(io::Error);

impl From<IoValidationError> for garde::Error {
    fn from(error: IoValidationError) -> Self {
        garde::Error::new(format!(
            "io error during validation: {err}",
            err = PrintErrorChain(&error.0)
        ))
    }
}
