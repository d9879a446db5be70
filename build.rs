use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use std::{env, fs, io};

const ENV_PREFIX: &str = "TIERSYNC_";

fn source_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut pending = vec![root.to_path_buf()];
    let mut files = Vec::new();
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                files.push(path);
            }
        }
    }
    Ok(files)
}

// Bare prefixes and fragments ending in `_` come from format strings.
fn env_names(source: &str) -> impl Iterator<Item = &str> {
    source
        .split(|c: char| !(c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'))
        .filter(|token| {
            token.len() > ENV_PREFIX.len() && token.starts_with(ENV_PREFIX) && !token.ends_with('_')
        })
}

fn render_allowlist(names: &BTreeSet<String>) -> String {
    let mut out = String::from("pub const GENERATED_ENV_ALLOWLIST: &[&str] = &[\n");
    for name in names {
        let _ = writeln!(out, "    {name:?},");
    }
    out.push_str("];\n");
    out
}

fn main() -> io::Result<()> {
    let mut names = BTreeSet::new();
    for file in source_files(Path::new("src"))? {
        if let Ok(source) = fs::read_to_string(&file) {
            names.extend(env_names(&source).map(str::to_string));
        }
    }

    let out_dir = env::var_os("OUT_DIR").ok_or_else(|| io::Error::other("OUT_DIR is not set"))?;
    fs::write(
        Path::new(&out_dir).join("tiersync_env_allowlist.rs"),
        render_allowlist(&names),
    )?;

    let version = env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    println!("cargo:rustc-env=BUILD_UUID={version}-{stamp:x}");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src");
    Ok(())
}
