//! Database credentials, loaded once at startup from a my.cnf-style file.
//!
//! The file is the operator's existing `~/.my.cnf`; only the `[mysql]`
//! section's `user` and `password` keys are read. No INI crate is pulled
//! in for this: the format consumed here is a flat section with `key =
//! value` lines, and anything fancier in the file is simply skipped.

use std::path::Path;

use crate::error::{Error, Result};

/// Immutable database credentials for the control connection.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    /// Load credentials from the `[mysql]` section of the given file.
    ///
    /// Fatal if the file is unreadable or either key is missing: recovery
    /// must not start without a working control connection.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;

        let mut user = None;
        let mut password = None;
        let mut in_mysql_section = false;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                in_mysql_section = section.trim() == "mysql";
                continue;
            }
            if !in_mysql_section {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "user" => user = Some(value.trim().to_string()),
                    "password" => password = Some(value.trim().to_string()),
                    _ => {}
                }
            }
        }

        match (user, password) {
            (Some(user), Some(password)) => Ok(Self { user, password }),
            _ => Err(Error::Credentials(format!(
                "{} has no [mysql] section with user and password",
                path.display()
            ))),
        }
    }
}
