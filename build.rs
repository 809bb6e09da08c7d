use std::env;
use std::fs;
use std::path::Path;

const METADATA_KEY: &str = "devpanel";

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let manifest = fs::read_to_string(Path::new(&manifest_dir).join("Cargo.toml"))
        .expect("Failed to read Cargo.toml");
    let manifest: toml::Value = manifest.parse()
        .expect("Failed to parse Cargo.toml");

    let api_version = manifest
        .get("package")
        .and_then(|p| p.get("metadata"))
        .and_then(|m| m.get(METADATA_KEY))
        .and_then(|d| d.get("api_version"))
        .and_then(|v| v.as_integer())
        .expect("Failed to find package.metadata.devpanel.api_version in Cargo.toml");

    // Module compatibility compares the year, so the value must be YYYYMMDD
    let month = (api_version % 10000) / 100;
    let day = api_version % 100;
    if !(10_000_000..=99_999_999).contains(&api_version) || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        panic!("package.metadata.devpanel.api_version must be a YYYYMMDD date, got {}", api_version);
    }

    let generated = format!(
        "// Generated by build.rs from package.metadata.{}.api_version\n\
         pub const MODULE_API_VERSION: u32 = {};\n",
        METADATA_KEY, api_version
    );
    let out_dir = env::var("OUT_DIR").unwrap();
    fs::write(Path::new(&out_dir).join("version_api.rs"), generated)
        .expect("Failed to write version_api.rs");

    println!("cargo:rerun-if-changed=Cargo.toml");
}
