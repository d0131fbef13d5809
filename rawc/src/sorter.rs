//! The file sorter (§4.2): orders a mod's files by the header (first
//! non-empty line) against the fixed priority list in
//! [`crate::schema::HEADER_LOAD_ORDER`].

use crate::schema::HEADER_LOAD_ORDER;
use std::path::Path;

/// Finds the longest header prefix in [`HEADER_LOAD_ORDER`] that `first_line`
/// starts with, returning its rank (index in the list). Ties are broken by
/// list order: a later, equal-length match never replaces an earlier one.
pub fn match_header(first_line: &str) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (rank, header) in HEADER_LOAD_ORDER.iter().enumerate() {
        if first_line.starts_with(header) {
            let len = header.len();
            if best.map_or(true, |(best_len, _)| len > best_len) {
                best = Some((len, rank));
            }
        }
    }
    best.map(|(_, rank)| rank)
}

/// Orders `file_names` (found under `objects_dir`) by header priority.
/// Files whose header doesn't match anything in the priority list, or that
/// can't be read, are silently dropped. Within a priority group, the
/// original `file_names` order is preserved.
pub fn sort_files(objects_dir: &Path, file_names: &[String]) -> Vec<String> {
    let mut groups: Vec<Vec<String>> = (0..HEADER_LOAD_ORDER.len()).map(|_| Vec::new()).collect();
    for file_name in file_names {
        let path = objects_dir.join(file_name);
        let first_line = match read_first_line(&path) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("could not read {} to sort it: {e}", path.display());
                continue;
            }
        };
        match match_header(&first_line) {
            Some(rank) => groups[rank].push(file_name.clone()),
            None => tracing::debug!("{} has no recognized header; skipping it", path.display()),
        }
    }
    groups.into_iter().flatten().collect()
}

/// Reads just the first line of a file, decoded the same Latin-1-as-identity
/// way the lexer treats the rest of the file.
fn read_first_line(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    let end = bytes.iter().position(|&b| b == b'\n').unwrap_or(bytes.len());
    let mut line: String = bytes[..end].iter().map(|&b| b as char).collect();
    if line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_match_header_picks_longest_prefix() {
        assert_eq!(match_header("item_standard"), Some(9));
        assert_eq!(match_header("o_template_demo"), Some(0));
    }

    #[test]
    fn test_match_header_unrecognized_returns_none() {
        assert_eq!(match_header("notes_for_myself"), None);
    }

    #[test]
    fn test_sort_files_orders_by_priority_not_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let objects = dir.path().join("objects");
        fs::create_dir(&objects).unwrap();
        fs::write(objects.join("a.txt"), "creature_a\n[OBJECT:CREATURE]").unwrap();
        fs::write(objects.join("b.txt"), "o_template_b\n[OBJECT:OBJECT_TEMPLATE]").unwrap();
        fs::write(objects.join("c.txt"), "item_c\n[OBJECT:ITEM]").unwrap();

        let files = vec!["a.txt".to_string(), "b.txt".to_string(), "c.txt".to_string()];
        let sorted = sort_files(&objects, &files);
        assert_eq!(sorted, vec!["b.txt", "c.txt", "a.txt"]);
    }

    #[test]
    fn test_sort_files_drops_unmatched_and_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let objects = dir.path().join("objects");
        fs::create_dir(&objects).unwrap();
        fs::write(objects.join("a.txt"), "creature_a\n[OBJECT:CREATURE]").unwrap();
        fs::write(objects.join("notes.txt"), "just some notes").unwrap();

        let files =
            vec!["a.txt".to_string(), "notes.txt".to_string(), "missing.txt".to_string()];
        let sorted = sort_files(&objects, &files);
        assert_eq!(sorted, vec!["a.txt"]);
    }
}
