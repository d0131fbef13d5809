//! The Writer (§4.6): emits one output file per non-empty super-category,
//! skipping removed objects, or deletes a category's file if it ends up
//! empty.

use crate::compiler::CompiledStore;
use crate::schema::{self, SuperCategory};
use crate::{Error, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub fn write_all(compiled: &CompiledStore, output_path: &Path) -> Result<()> {
    for &super_cat in schema::DATA_SUPER_CATEGORIES {
        write_category(compiled, super_cat, output_path)?;
    }
    Ok(())
}

fn write_category(compiled: &CompiledStore, super_cat: SuperCategory, output_path: &Path) -> Result<()> {
    let stem = super_cat.file_stem();
    let super_name = schema::SUPER_CATEGORIES
        .entries()
        .find(|(_, &cat)| cat == super_cat)
        .map(|(name, _)| *name)
        .expect("every SuperCategory has a reverse entry in SUPER_CATEGORIES");
    let path = output_path.join(format!("{stem}_compiled.txt"));

    let mut body = Vec::new();
    let mut count = 0usize;
    for &object_type in super_cat.object_types() {
        for obj in compiled.objects(object_type) {
            if obj.is_removed {
                continue;
            }
            count += 1;
            body.push(b'\n');
            body.extend_from_slice(
                format!("{} {}, {}\n", obj.provenance.mod_name, obj.provenance.mod_version, obj.provenance.source_file)
                    .as_bytes(),
            );
            body.extend_from_slice(format!("[{object_type}:{}]\n", obj.id).as_bytes());
            for token in &obj.tokens {
                body.extend_from_slice(format!("\t{token}\n").as_bytes());
            }
        }
    }

    if count == 0 {
        if path.exists() {
            std::fs::remove_file(&path).map_err(|source| Error::Io { path: path.clone(), source })?;
        }
        return Ok(());
    }

    let mut file = File::create(&path).map_err(|source| Error::Io { path: path.clone(), source })?;
    write_latin1(&mut file, &format!("{stem}_compiled\n\n[OBJECT:{super_name}]\n"), &path)?;
    file.write_all(&body).map_err(|source| Error::Io { path: path.clone(), source })?;
    write_latin1(&mut file, &format!("\n{count} raw objects in this compiled file.\n"), &path)?;
    Ok(())
}

/// Writes `text` as Latin-1 bytes (byte-identity with its code points, the
/// same mapping the lexer uses on read).
fn write_latin1(file: &mut File, text: &str, path: &Path) -> Result<()> {
    let bytes: Vec<u8> = text.chars().map(|c| c as u32 as u8).collect();
    file.write_all(&bytes).map_err(|source| Error::Io { path: path.to_path_buf(), source })
}
