//! Layering guardrails.
//!
//! - `xspec_core` is the shared vocabulary and stays free of dependencies.
//! - The pipeline talks to transformation engines only through the `Engine` / `Program` traits; the
//!   external-process engine is picked by configuration, never named inside `src/pipeline`.

use std::fs;
use std::path::Path;

#[test]
fn vocabulary_crate_has_no_dependencies() {
    let manifest = include_str!("../crates/xspec_core/Cargo.toml");
    let mut in_dependencies = false;

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        if line.starts_with('[') {
            in_dependencies = line == "[dependencies]";
            continue;
        }
        if !in_dependencies || line.is_empty() || line.starts_with('#') {
            continue;
        }
        panic!("`xspec_core` must not have [dependencies]; found `{line}`");
    }
}

#[test]
fn pipeline_does_not_name_a_concrete_engine() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src/pipeline");
    for entry in fs::read_dir(&dir).unwrap().flatten() {
        let path = entry.path();
        let contents = fs::read_to_string(&path).unwrap();
        for (idx, line) in contents.lines().enumerate() {
            let code = line.split("//").next().unwrap_or("");
            assert!(
                !code.contains("ProcessEngine") && !code.contains("engine::process"),
                "{}:{}: the pipeline must go through the Engine trait: {}",
                path.display(),
                idx + 1,
                line.trim()
            );
        }
    }
}
