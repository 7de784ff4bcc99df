//! Environment-driven configuration.

use crate::schema::SchemaFormat;
use std::env;
use tracing::warn;

/// Environment variable naming the default schema format.
pub const SCHEMA_FORMAT_ENV: &str = "TOOLSPEC_SCHEMA_FORMAT";

/// The schema format to use when a caller does not pick one explicitly:
/// `TOOLSPEC_SCHEMA_FORMAT` when set to a valid format name
/// (`base`, `gorilla`, `claude`), otherwise [`SchemaFormat::Base`].
pub fn default_format() -> SchemaFormat {
    match env::var(SCHEMA_FORMAT_ENV) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!(
                value = value.as_str(),
                "ignoring invalid {SCHEMA_FORMAT_ENV}, using base"
            );
            SchemaFormat::default()
        }),
        Err(_) => SchemaFormat::default(),
    }
}
