//! The Reader/Editor pass (§4.4): a single left-to-right scan over a mod's
//! sorted files that creates objects, creates templates, and applies EDIT
//! blocks against objects already in the store.

use crate::convert::ConvertBlock;
use crate::mods::ModDescriptor;
use crate::schema::{self, ALWAYS_POSSIBLE_OBJECT_TYPES};
use crate::sorter;
use crate::store::{ObjectRef, ObjectStore, ObjectTemplate, Provenance, RawObject};
use crate::token::{join_colon, Token};
use crate::{lexer, Error, Result};
use smol_str::SmolStr;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// What the scan is currently appending body tokens to.
enum FileState {
    None,
    New(ObjectRef),
    Template(Rc<RefCell<ObjectTemplate>>),
    Edit(EditState),
}

struct EditState {
    object_type: &'static str,
    selected: Vec<ObjectRef>,
    convert: Option<ConvertBlock>,
}

/// One selection clause from the `SEL_BY_*` grammar (§4.4.2).
enum Criterion {
    Id(SmolStr),
    Class(SmolStr),
    /// `SEL_BY_TAG`: matches a token whose leading fragments equal this list.
    Tag(Vec<SmolStr>),
    /// `SEL_BY_TAG_PRECISE`: matches a token whose fragments equal this list exactly.
    TagPrecise(Vec<SmolStr>),
}

enum Criteria {
    All,
    Clauses(Vec<Criterion>),
}

const SELECTOR_MARKERS: [&str; 4] =
    ["SEL_BY_ID", "SEL_BY_CLASS", "SEL_BY_TAG", "SEL_BY_TAG_PRECISE"];

/// Parses a criteria argument run (`ALL`, or a sequence of `SEL_BY_*`
/// clauses where `SEL_BY_TAG`/`SEL_BY_TAG_PRECISE` consume every fragment up
/// to the next marker).
fn parse_criteria(args: &[SmolStr]) -> Criteria {
    if args.first().map(SmolStr::as_str) == Some("ALL") {
        return Criteria::All;
    }
    let mut clauses = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let marker = args[i].as_str();
        if !SELECTOR_MARKERS.contains(&marker) {
            i += 1;
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while end < args.len() && !SELECTOR_MARKERS.contains(&args[end].as_str()) {
            end += 1;
        }
        let run = &args[start..end];
        match marker {
            "SEL_BY_ID" => clauses.push(Criterion::Id(run.first().cloned().unwrap_or_default())),
            "SEL_BY_CLASS" => {
                clauses.push(Criterion::Class(run.first().cloned().unwrap_or_default()))
            }
            "SEL_BY_TAG" => clauses.push(Criterion::Tag(run.to_vec())),
            "SEL_BY_TAG_PRECISE" => clauses.push(Criterion::TagPrecise(run.to_vec())),
            _ => unreachable!(),
        }
        i = end;
    }
    Criteria::Clauses(clauses)
}

fn criterion_matches(obj: &RawObject, criterion: &Criterion) -> bool {
    match criterion {
        Criterion::Id(id) => obj.id.as_str() == id.as_str(),
        Criterion::Class(class) => obj.tokens.iter().any(|t| {
            matches!(t.name(), "OBJECT_CLASS" | "CREATURE_CLASS")
                && t.args().first().map(SmolStr::as_str) == Some(class.as_str())
        }),
        Criterion::Tag(prefix) => obj.tokens.iter().any(|t| {
            let f = t.fragments();
            f.len() >= prefix.len() && f[..prefix.len()] == prefix[..]
        }),
        Criterion::TagPrecise(exact) => obj.tokens.iter().any(|t| t.fragments() == exact.as_slice()),
    }
}

fn select(store: &ObjectStore, object_type: &str, criteria: &Criteria) -> Vec<ObjectRef> {
    let Some(list) = store.normal(object_type) else { return Vec::new() };
    match criteria {
        Criteria::All => list.iter().cloned().collect(),
        Criteria::Clauses(clauses) => list
            .iter()
            .filter(|obj_ref| {
                let obj = obj_ref.borrow();
                clauses.iter().all(|c| criterion_matches(&obj, c))
            })
            .cloned()
            .collect(),
    }
}

fn plus_select(selected: &mut Vec<ObjectRef>, additional: Vec<ObjectRef>) {
    for obj in additional {
        if !selected.iter().any(|s| Rc::ptr_eq(s, &obj)) {
            selected.push(obj);
        }
    }
}

fn unselect(selected: &mut Vec<ObjectRef>, to_remove: Vec<ObjectRef>) {
    selected.retain(|s| !to_remove.iter().any(|r| Rc::ptr_eq(s, r)));
}

/// Reads every file of one mod, in sorted order, into `store`.
pub fn read_mod(store: &mut ObjectStore, mod_descriptor: &ModDescriptor) -> Result<()> {
    let objects_dir = mod_descriptor.objects_dir();
    if !objects_dir.is_dir() {
        tracing::warn!(
            "mod \"{}\" has no objects directory at {}; treating it as empty",
            mod_descriptor.name,
            objects_dir.display()
        );
        return Ok(());
    }
    let sorted = sorter::sort_files(&objects_dir, &mod_descriptor.file_names);
    for file_name in sorted {
        let path = objects_dir.join(&file_name);
        let bytes =
            std::fs::read(&path).map_err(|source| Error::Io { path: path.clone(), source })?;
        let tokens = lexer::lex(&bytes);
        read_file(store, mod_descriptor, &file_name, tokens);
    }
    Ok(())
}

fn read_file(store: &mut ObjectStore, mod_descriptor: &ModDescriptor, file_name: &str, tokens: Vec<Token>) {
    let mut pos_object_types: HashSet<&'static str> =
        ALWAYS_POSSIBLE_OBJECT_TYPES.iter().copied().collect();
    let mut state = FileState::None;

    for token in tokens {
        if token.name() == "OBJECT" {
            match token.args().first() {
                Some(arg) => match schema::SUPER_CATEGORIES.get(arg.as_str()) {
                    Some(&super_cat) => {
                        pos_object_types = super_cat.object_types().iter().copied().collect();
                        pos_object_types.extend(ALWAYS_POSSIBLE_OBJECT_TYPES.iter().copied());
                    }
                    None => tracing::warn!(
                        "{file_name}: OBJECT references unknown super-category \"{arg}\""
                    ),
                },
                None => tracing::warn!("{file_name}: OBJECT token with no super-category"),
            }
            continue;
        }

        if pos_object_types.contains(token.name()) {
            commit(store, std::mem::replace(&mut state, FileState::None));
            state = begin_object(mod_descriptor, file_name, &token, &pos_object_types, store);
            continue;
        }

        dispatch_body(store, &mut state, file_name, token);
    }

    commit(store, state);
}

fn commit(store: &mut ObjectStore, state: FileState) {
    match state {
        FileState::None | FileState::Edit(_) => {}
        FileState::New(obj) => store.insert_normal(obj),
        FileState::Template(tmpl) => store.insert_template(tmpl),
    }
}

fn begin_object(
    mod_descriptor: &ModDescriptor,
    file_name: &str,
    token: &Token,
    pos_object_types: &HashSet<&'static str>,
    store: &ObjectStore,
) -> FileState {
    let provenance = || Provenance {
        mod_name: mod_descriptor.name.clone(),
        mod_version: mod_descriptor.version.clone(),
        source_file: SmolStr::new(file_name),
    };

    match token.name() {
        "EDIT" => {
            let args = token.args();
            let Some(type_arg) = args.first() else {
                tracing::warn!("{file_name}: EDIT header with no target type");
                return FileState::None;
            };
            let Some(object_type) = schema::canonical_object_type(type_arg) else {
                tracing::warn!("{file_name}: EDIT references unknown object type \"{type_arg}\"");
                return FileState::None;
            };
            let criteria = parse_criteria(&args[1..]);
            let selected = select(store, object_type, &criteria);
            FileState::Edit(EditState { object_type, selected, convert: None })
        }
        "OBJECT_TEMPLATE" => {
            let args = token.args();
            let (Some(type_arg), Some(id)) = (args.first(), args.get(1)) else {
                tracing::warn!("{file_name}: OBJECT_TEMPLATE header missing type or id");
                return FileState::None;
            };
            let Some(object_type) = schema::canonical_object_type(type_arg) else {
                tracing::warn!(
                    "{file_name}: OBJECT_TEMPLATE references unknown object type \"{type_arg}\""
                );
                return FileState::None;
            };
            let tmpl = ObjectTemplate::new(object_type, id.clone(), provenance());
            FileState::Template(Rc::new(RefCell::new(tmpl)))
        }
        name => {
            // `pos_object_types.contains(name)` was already checked by the caller.
            let object_type = *pos_object_types.get(name).expect("checked by caller");
            let Some(id) = token.args().first() else {
                tracing::warn!("{file_name}: {name} header with no id");
                return FileState::None;
            };
            let obj = RawObject::new(object_type, id.clone(), provenance());
            FileState::New(Rc::new(RefCell::new(obj)))
        }
    }
}

fn dispatch_body(store: &ObjectStore, state: &mut FileState, file_name: &str, token: Token) {
    match state {
        FileState::None => {}
        FileState::New(obj) => obj.borrow_mut().tokens.push(token),
        FileState::Template(tmpl) => {
            let wrapped = if schema::TEMPLATE_OP_TOKENS.contains(token.name()) {
                token
            } else {
                wrap_as_ot_add_tag(&token)
            };
            tmpl.borrow_mut().tokens.push(wrapped);
        }
        FileState::Edit(edit) => dispatch_edit(store, edit, file_name, token),
    }
}

fn wrap_as_ot_add_tag(token: &Token) -> Token {
    let mut fragments = vec![SmolStr::new("OT_ADD_TAG")];
    fragments.extend(token.fragments().iter().cloned());
    Token::new(fragments)
}

fn dispatch_edit(store: &ObjectStore, edit: &mut EditState, file_name: &str, token: Token) {
    if let Some(convert) = &mut edit.convert {
        match token.name() {
            "CST_TARGET" => convert.set_target(join_colon(token.args())),
            "CST_REPLACEMENT" => {
                let replacement = join_colon(token.args());
                for obj in &edit.selected {
                    convert.apply_replacement(&mut obj.borrow_mut().tokens, &replacement);
                }
                edit.convert = None;
            }
            // Any other token terminates the block; it is consumed, not appended
            // (matches the compiler's OT_CONVERT_TAG quirk, §4.5/§9(b)).
            _ => edit.convert = None,
        }
        return;
    }

    match token.name() {
        "PLUS_SELECT" => {
            let additional = select(store, edit.object_type, &parse_criteria(token.args()));
            plus_select(&mut edit.selected, additional);
        }
        "UNSELECT" => {
            let to_remove = select(store, edit.object_type, &parse_criteria(token.args()));
            unselect(&mut edit.selected, to_remove);
        }
        "ADD_SPEC_TAG" => {
            let Some((name, rest)) = token.args().split_first() else {
                tracing::warn!("{file_name}: ADD_SPEC_TAG with no name");
                return;
            };
            if !schema::SPECIAL_TOKENS.contains(name.as_str()) {
                tracing::warn!("{file_name}: ADD_SPEC_TAG names unknown special token \"{name}\"");
                return;
            }
            let mut fragments = vec![name.clone()];
            fragments.extend(rest.iter().cloned());
            let new_token = Token::new(fragments);
            for obj in &edit.selected {
                obj.borrow_mut().tokens.push(new_token.clone());
            }
        }
        "REMOVE_SPEC_TAG" => {
            let Some((name, rest)) = token.args().split_first() else {
                tracing::warn!("{file_name}: REMOVE_SPEC_TAG with no name");
                return;
            };
            if !schema::SPECIAL_TOKENS.contains(name.as_str()) {
                tracing::warn!(
                    "{file_name}: REMOVE_SPEC_TAG names unknown special token \"{name}\""
                );
                return;
            }
            let mut prefix = vec![name.clone()];
            prefix.extend(rest.iter().cloned());
            for obj in &edit.selected {
                obj.borrow_mut().tokens.retain(|t| {
                    let f = t.fragments();
                    !(f.len() >= prefix.len() && f[..prefix.len()] == prefix[..])
                });
            }
        }
        "CONVERT_SPEC_TAG" => {
            let Some(name) = token.args().first() else {
                tracing::warn!("{file_name}: CONVERT_SPEC_TAG with no name");
                return;
            };
            if !schema::SPECIAL_TOKENS.contains(name.as_str()) {
                tracing::warn!(
                    "{file_name}: CONVERT_SPEC_TAG names unknown special token \"{name}\""
                );
                return;
            }
            edit.convert = Some(ConvertBlock::new(vec![name.clone()]));
        }
        name => {
            let wrapped =
                if schema::is_verbatim_in_edit_body(name) { token.clone() } else { wrap_as_ot_add_tag(&token) };
            for obj in &edit.selected {
                obj.borrow_mut().tokens.push(wrapped.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ObjectStore;

    fn mod_desc(dir: &std::path::Path, files: Vec<&str>) -> ModDescriptor {
        ModDescriptor::new("vanilla", "1.0", dir, files.into_iter().map(String::from).collect())
    }

    #[test]
    fn test_template_add_remove_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let objects = dir.path().join("objects");
        std::fs::create_dir(&objects).unwrap();
        std::fs::write(
            objects.join("t.txt"),
            "o_template_demo\n[OBJECT:OBJECT_TEMPLATE]\n[OBJECT_TEMPLATE:CREATURE:TOUGH]\n\
             [OT_ADD_TAG:BIOME:MOUNTAIN]\n[OT_REMOVE_TAG:BIOME:FOREST]",
        )
        .unwrap();
        std::fs::write(
            objects.join("c.txt"),
            "creature_demo\n[OBJECT:CREATURE]\n[CREATURE:BEAR]\n[BIOME:FOREST]\n\
             [USE_OBJECT_TEMPLATE:TOUGH]",
        )
        .unwrap();

        let mut store = ObjectStore::new();
        let md = mod_desc(dir.path(), vec!["t.txt", "c.txt"]);
        read_mod(&mut store, &md).unwrap();

        let templates = store.templates("CREATURE").unwrap();
        assert_eq!(templates.len(), 1);
        let tmpl = templates.get("TOUGH").unwrap().borrow();
        assert_eq!(tmpl.tokens.len(), 2);
        assert_eq!(tmpl.tokens[0], Token::new(["OT_ADD_TAG", "BIOME", "MOUNTAIN"]));

        let creatures = store.normal("CREATURE").unwrap();
        let bear = creatures.get("BEAR").unwrap().borrow();
        assert_eq!(bear.tokens.len(), 2);
        assert_eq!(bear.tokens[0], Token::new(["BIOME", "FOREST"]));
        assert_eq!(bear.tokens[1], Token::new(["USE_OBJECT_TEMPLATE", "TOUGH"]));
    }

    #[test]
    fn test_edit_plus_select_and_unselect_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let objects = dir.path().join("objects");
        std::fs::create_dir(&objects).unwrap();
        std::fs::write(
            objects.join("c.txt"),
            "creature_demo\n[OBJECT:CREATURE]\n\
             [CREATURE:BEAR]\n[OBJECT_CLASS:MAMMAL]\n\
             [CREATURE:PIG]\n[OBJECT_CLASS:MAMMAL]\n\
             [CREATURE:SNAKE]\n[OBJECT_CLASS:REPTILE]\n\
             [EDIT:CREATURE:SEL_BY_CLASS:MAMMAL][UNSELECT:SEL_BY_ID:PIG][ATTRIBUTE:TOUGH]",
        )
        .unwrap();

        let mut store = ObjectStore::new();
        let md = mod_desc(dir.path(), vec!["c.txt"]);
        read_mod(&mut store, &md).unwrap();

        // A non-special EDIT body token is wrapped as OT_ADD_TAG before being
        // pushed onto the selected objects (§4.4.1), so the raw store holds
        // the wrapped form, not the bare tag.
        let creatures = store.normal("CREATURE").unwrap();
        let bear = creatures.get("BEAR").unwrap().borrow();
        assert!(bear.tokens.contains(&Token::new(["OT_ADD_TAG", "ATTRIBUTE", "TOUGH"])));
        let pig = creatures.get("PIG").unwrap().borrow();
        assert!(!pig.tokens.contains(&Token::new(["OT_ADD_TAG", "ATTRIBUTE", "TOUGH"])));
        let snake = creatures.get("SNAKE").unwrap().borrow();
        assert!(!snake.tokens.contains(&Token::new(["OT_ADD_TAG", "ATTRIBUTE", "TOUGH"])));
    }

    #[test]
    fn test_missing_objects_dir_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ObjectStore::new();
        let md = mod_desc(dir.path(), vec![]);
        assert!(read_mod(&mut store, &md).is_ok());
    }

    #[test]
    fn test_remove_spec_tag_prefix_match() {
        let dir = tempfile::tempdir().unwrap();
        let objects = dir.path().join("objects");
        std::fs::create_dir(&objects).unwrap();
        std::fs::write(
            objects.join("c.txt"),
            "creature_demo\n[OBJECT:CREATURE]\n[CREATURE:BEAR]\n[GO_TO_TAG:FOO]\n\
             [EDIT:CREATURE:SEL_BY_ID:BEAR][REMOVE_SPEC_TAG:GO_TO_TAG:FOO]",
        )
        .unwrap();
        let mut store = ObjectStore::new();
        let md = mod_desc(dir.path(), vec!["c.txt"]);
        read_mod(&mut store, &md).unwrap();
        let bear = store.normal("CREATURE").unwrap().get("BEAR").unwrap().borrow();
        assert!(bear.tokens.is_empty());
    }
}
