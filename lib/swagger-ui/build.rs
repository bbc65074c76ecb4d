//! Embeds everything under `third_party/` into the library.
//!
//! The generated table lists each file's slash-separated name relative to
//! the crate root, its contents (via `include_bytes!()`) and its
//! modification time.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use anyhow::Context;
use walkdir::WalkDir;

fn main() -> anyhow::Result<()> {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=third_party");

    let manifest_dir = PathBuf::from(
        env::var_os("CARGO_MANIFEST_DIR").context("CARGO_MANIFEST_DIR is not set")?,
    );
    let out_dir = PathBuf::from(env::var_os("OUT_DIR").context("OUT_DIR is not set")?);

    let mut table = String::from("pub(crate) static ASSETS: &[EmbeddedAsset] = &[\n");

    for entry in WalkDir::new(manifest_dir.join("third_party")).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let name = path
            .strip_prefix(&manifest_dir)?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let modified = entry
            .metadata()?
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);

        table.push_str(&format!(
            "    EmbeddedAsset::new({name:?}, include_bytes!({:?}), {modified}),\n",
            path.display().to_string(),
        ));
    }

    table.push_str("];\n");

    let bundle = out_dir.join("bundle.rs");
    fs::write(&bundle, table).with_context(|| format!("Unable to write {}", bundle.display()))?;

    Ok(())
}
