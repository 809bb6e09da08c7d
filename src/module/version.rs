//! Module API Version
//!
//! The module contract version is defined in Cargo.toml under
//! `package.metadata.devpanel.api_version` and stamped in at build time.

// Include the build-generated API version constant
include!(concat!(env!("OUT_DIR"), "/version_api.rs"));

/// Current module API version (YYYYMMDD)
pub fn get_api_version() -> u32 {
    MODULE_API_VERSION
}

/// Major component used for compatibility checks (the year)
pub fn major_version(api_version: u32) -> u32 {
    api_version / 10000
}

/// Render a YYYYMMDD version as YYYY-MM-DD
pub fn version_to_date_string(version: u32) -> String {
    let year = version / 10000;
    let month = (version % 10000) / 100;
    let day = version % 100;
    format!("{year:04}-{month:02}-{day:02}")
}
