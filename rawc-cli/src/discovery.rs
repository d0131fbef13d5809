//! Mod discovery: turns a mods directory on disk into the ordered list of
//! [`rawc::mods::ModDescriptor`] the core compiles. Each mod lives in its own
//! subdirectory with a `mod_info.txt` (name and version, one per line) and an
//! `objects/` folder of raw files.

use anyhow::{Context, Result};
use rawc::mods::ModDescriptor;
use std::fs;
use std::path::Path;

/// Reads every mod subdirectory under `mods_dir`, in load order, and builds
/// its [`ModDescriptor`]. A mod missing `mod_info.txt` is skipped with a
/// warning rather than failing the whole run.
pub fn discover_mods(mods_dir: &Path) -> Result<Vec<ModDescriptor>> {
    let dir_names = ordered_mod_dirs(mods_dir)?;
    let mut mods = Vec::new();
    for dir_name in dir_names {
        let mod_path = mods_dir.join(&dir_name);
        match read_mod_descriptor(&mod_path) {
            Ok(descriptor) => mods.push(descriptor),
            Err(e) => log::warn!("skipping mod {dir_name}: {e:#}"),
        }
    }
    Ok(mods)
}

/// Lists the mod directory names in the order they should be loaded: the
/// order named in `load_order.txt` at the mods root, if present, with any
/// directory it doesn't mention appended afterward in alphabetical order.
/// Otherwise, alphabetical order.
fn ordered_mod_dirs(mods_dir: &Path) -> Result<Vec<String>> {
    let mut present: Vec<String> = fs::read_dir(mods_dir)
        .with_context(|| format!("could not read mods directory {}", mods_dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    present.sort();

    let load_order_path = mods_dir.join("load_order.txt");
    let Ok(contents) = fs::read_to_string(&load_order_path) else {
        return Ok(present);
    };

    let mut ordered = Vec::new();
    for line in contents.lines() {
        let name = line.trim();
        if name.is_empty() {
            continue;
        }
        if let Some(pos) = present.iter().position(|p| p == name) {
            ordered.push(present.remove(pos));
        } else {
            log::warn!("load_order.txt names {name}, which has no matching mod directory");
        }
    }
    ordered.extend(present);
    Ok(ordered)
}

fn read_mod_descriptor(mod_path: &Path) -> Result<ModDescriptor> {
    let info_path = mod_path.join("mod_info.txt");
    let contents = fs::read_to_string(&info_path)
        .with_context(|| format!("could not read {}", info_path.display()))?;
    let mut lines = contents.lines();
    let name = lines
        .next()
        .and_then(|line| line.strip_prefix("name:"))
        .with_context(|| format!("{} is missing a name: line", info_path.display()))?
        .trim();
    let version = lines
        .next()
        .and_then(|line| line.strip_prefix("version:"))
        .with_context(|| format!("{} is missing a version: line", info_path.display()))?
        .trim();

    let file_names = list_object_files(&mod_path.join("objects"));
    Ok(ModDescriptor::new(name, version, mod_path, file_names))
}

fn list_object_files(objects_dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(objects_dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_mod(mods_dir: &Path, dir_name: &str, name: &str, version: &str, files: &[&str]) {
        let mod_path = mods_dir.join(dir_name);
        let objects = mod_path.join("objects");
        fs::create_dir_all(&objects).unwrap();
        fs::write(mod_path.join("mod_info.txt"), format!("name:{name}\nversion:{version}\n")).unwrap();
        for file in files {
            fs::write(objects.join(file), "creature_x\n[OBJECT:CREATURE]").unwrap();
        }
    }

    #[test]
    fn test_discover_mods_alphabetical_without_load_order() {
        let dir = tempfile::tempdir().unwrap();
        write_mod(dir.path(), "zz_mod", "Zeta", "1.0", &["a.txt"]);
        write_mod(dir.path(), "aa_mod", "Alpha", "1.0", &["b.txt"]);

        let mods = discover_mods(dir.path()).unwrap();
        let names: Vec<_> = mods.iter().map(|m| m.name.to_string()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn test_discover_mods_honors_load_order_file() {
        let dir = tempfile::tempdir().unwrap();
        write_mod(dir.path(), "aa_mod", "Alpha", "1.0", &[]);
        write_mod(dir.path(), "zz_mod", "Zeta", "1.0", &[]);
        fs::write(dir.path().join("load_order.txt"), "zz_mod\naa_mod\n").unwrap();

        let mods = discover_mods(dir.path()).unwrap();
        let names: Vec<_> = mods.iter().map(|m| m.name.to_string()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn test_mod_missing_info_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("broken_mod/objects")).unwrap();
        write_mod(dir.path(), "ok_mod", "Ok", "2.0", &[]);

        let mods = discover_mods(dir.path()).unwrap();
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].name.as_str(), "Ok");
    }
}
