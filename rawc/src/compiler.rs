//! The Compiler Pass (§4.5): recursively expands every stored object and
//! template into a "compiled" counterpart by executing the embedded
//! directive DSL, with lazy on-demand resolution and cycle detection.

use crate::convert::ConvertBlock;
use crate::schema;
use crate::store::{ObjectRef, ObjectStore, ObjectTemplate, Provenance};
use crate::token::{join_colon, Token};
use crate::{Error, Result};
use smol_str::SmolStr;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A fully expanded object, ready for the writer.
#[derive(Debug)]
pub struct CompiledObject {
    pub object_type: &'static str,
    pub id: SmolStr,
    pub tokens: Vec<Token>,
    pub is_removed: bool,
    pub provenance: Provenance,
}

/// A fully expanded template body — never written, only consumed by
/// `USE_OBJECT_TEMPLATE`/`COPY_TAGS_FROM`.
#[derive(Debug)]
pub struct CompiledTemplate {
    pub object_type: &'static str,
    pub id: SmolStr,
    pub tokens: Vec<Token>,
}

/// Every compiled normal object, grouped by object type, in the same order
/// the Reader's object lists held them (including any orphaned duplicate-id
/// entries — see §9(a)).
pub struct CompiledStore {
    normal: HashMap<&'static str, Vec<Rc<CompiledObject>>>,
}

impl CompiledStore {
    pub fn objects(&self, object_type: &str) -> &[Rc<CompiledObject>] {
        self.normal.get(object_type).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Normal,
    Template,
}

pub struct Compiler<'a> {
    store: &'a ObjectStore,
    compiled_normal: RefCell<HashMap<(&'static str, SmolStr), Rc<CompiledObject>>>,
    compiled_templates: RefCell<HashMap<(&'static str, SmolStr), Rc<CompiledTemplate>>>,
    stack: RefCell<Vec<(Kind, &'static str, SmolStr)>>,
}

impl<'a> Compiler<'a> {
    pub fn new(store: &'a ObjectStore) -> Self {
        Self {
            store,
            compiled_normal: RefCell::new(HashMap::new()),
            compiled_templates: RefCell::new(HashMap::new()),
            stack: RefCell::new(Vec::new()),
        }
    }

    /// Compiles every object type in schema order, templates before normal
    /// objects within each type (§5). Lazy recursion through
    /// `COPY_TAGS_FROM`/`USE_OBJECT_TEMPLATE` may compile some objects
    /// earlier than this walk reaches them; the per-id memoization makes
    /// that safe.
    pub fn compile_all(&self) -> Result<CompiledStore> {
        let mut normal: HashMap<&'static str, Vec<Rc<CompiledObject>>> = HashMap::new();
        for &super_cat in schema::DATA_SUPER_CATEGORIES {
            for &object_type in super_cat.object_types() {
                if let Some(templates) = self.store.templates(object_type) {
                    for tmpl_ref in templates.iter() {
                        let id = tmpl_ref.borrow().id.clone();
                        self.resolve_template(object_type, &id)?;
                    }
                }
                let mut compiled_list = Vec::new();
                if let Some(list) = self.store.normal(object_type) {
                    for obj_ref in list.iter() {
                        compiled_list.push(self.compile_normal_standalone(obj_ref)?);
                    }
                }
                normal.insert(object_type, compiled_list);
            }
        }
        Ok(CompiledStore { normal })
    }

    fn push_stack(&self, kind: Kind, object_type: &'static str, id: &SmolStr) -> Result<()> {
        let mut stack = self.stack.borrow_mut();
        if stack.iter().any(|(k, t, i)| *k == kind && *t == object_type && i == id) {
            let mut chain: Vec<String> = stack.iter().map(|(_, _, i)| i.to_string()).collect();
            chain.push(id.to_string());
            return Err(Error::CyclicCopy { chain });
        }
        stack.push((kind, object_type, id.clone()));
        Ok(())
    }

    fn pop_stack(&self) {
        self.stack.borrow_mut().pop();
    }

    /// Resolves `id` via the object-type's id map (always the newest
    /// definition for a duplicate id, matching `COPY_TAGS_FROM`/
    /// `USE_OBJECT_TEMPLATE`'s by-id semantics), compiling it on first use.
    fn resolve_normal(&self, object_type: &'static str, id: &str) -> Result<Option<Rc<CompiledObject>>> {
        let Some(list) = self.store.normal(object_type) else { return Ok(None) };
        let Some(obj_ref) = list.get(id) else { return Ok(None) };
        let obj_ref = obj_ref.clone();
        Ok(Some(self.compile_normal_cached(object_type, SmolStr::new(id), &obj_ref)?))
    }

    fn resolve_template(&self, object_type: &'static str, id: &str) -> Result<Option<Rc<CompiledTemplate>>> {
        let key = (object_type, SmolStr::new(id));
        if let Some(existing) = self.compiled_templates.borrow().get(&key) {
            return Ok(Some(existing.clone()));
        }
        let Some(list) = self.store.templates(object_type) else { return Ok(None) };
        let Some(tmpl_ref) = list.get(id) else { return Ok(None) };
        let tmpl_ref = tmpl_ref.clone();
        let id = SmolStr::new(id);
        self.push_stack(Kind::Template, object_type, &id)?;
        let result = self.compile_template_body(&tmpl_ref, object_type, &id);
        self.pop_stack();
        let compiled = Rc::new(result?);
        self.compiled_templates.borrow_mut().insert((object_type, id), compiled.clone());
        Ok(Some(compiled))
    }

    fn compile_normal_cached(
        &self,
        object_type: &'static str,
        id: SmolStr,
        obj_ref: &ObjectRef,
    ) -> Result<Rc<CompiledObject>> {
        if let Some(existing) = self.compiled_normal.borrow().get(&(object_type, id.clone())) {
            return Ok(existing.clone());
        }
        self.push_stack(Kind::Normal, object_type, &id)?;
        let result = self.compile_normal_body(obj_ref, object_type, &id);
        self.pop_stack();
        let compiled = Rc::new(result?);
        self.compiled_normal.borrow_mut().insert((object_type, id), compiled.clone());
        Ok(compiled)
    }

    /// Compiles a specific object instance, independent of whatever the id
    /// map currently points at. Used for the writer-facing walk over the
    /// order list, where a stale duplicate-id object (§9(a)) must still be
    /// compiled and emitted even though the id map has moved on.
    fn compile_normal_standalone(&self, obj_ref: &ObjectRef) -> Result<Rc<CompiledObject>> {
        let (object_type, id) = {
            let obj = obj_ref.borrow();
            (obj.object_type, obj.id.clone())
        };
        let is_canonical = self
            .store
            .normal(object_type)
            .and_then(|list| list.get(id.as_str()))
            .map(|canonical| Rc::ptr_eq(canonical, obj_ref))
            .unwrap_or(false);
        if is_canonical {
            Ok(self.resolve_normal(object_type, id.as_str())?.expect("just confirmed present"))
        } else {
            self.push_stack(Kind::Normal, object_type, &id)?;
            let result = self.compile_normal_body(obj_ref, object_type, &id);
            self.pop_stack();
            Ok(Rc::new(result?))
        }
    }

    fn compile_normal_body(
        &self,
        obj_ref: &ObjectRef,
        object_type: &'static str,
        id: &SmolStr,
    ) -> Result<CompiledObject> {
        let (source_tokens, provenance) = {
            let obj = obj_ref.borrow();
            (obj.tokens.clone(), obj.provenance.clone())
        };
        let mut out: Vec<Token> = Vec::new();
        let mut cursor: usize = 0;
        let mut is_removed = false;
        let mut convert: Option<ConvertBlock> = None;

        for token in &source_tokens {
            if let Some(block) = &mut convert {
                match token.name() {
                    "OTCT_TARGET" => block.set_target(join_colon(token.args())),
                    "OTCT_REPLACEMENT" => {
                        let replacement = join_colon(token.args());
                        block.apply_replacement(&mut out, &replacement);
                        convert = None;
                    }
                    _ => convert = None,
                }
                continue;
            }

            match token.name() {
                "GO_TO_END" => cursor = out.len(),
                "GO_TO_START" => cursor = 0,
                "GO_TO_TAG" => cursor = go_to_tag(&out, token.args()).unwrap_or(cursor),
                "COPY_TAGS_FROM" => {
                    let Some((ref_id, raw_args)) = token.args().split_first() else {
                        tracing::warn!("COPY_TAGS_FROM with no id");
                        continue;
                    };
                    match self.resolve_normal(object_type, ref_id)? {
                        Some(compiled) => {
                            let processed = preprocess_args(raw_args);
                            let copied = substitute_tokens(&compiled.tokens, &processed);
                            let n = copied.len();
                            out.splice(cursor..cursor, copied);
                            cursor += n;
                        }
                        None => tracing::warn!(
                            "COPY_TAGS_FROM references unknown {object_type}:{ref_id}"
                        ),
                    }
                }
                "REMOVE_OBJECT" => is_removed = true,
                "USE_OBJECT_TEMPLATE" => {
                    let Some((tmpl_id, raw_args)) = token.args().split_first() else {
                        tracing::warn!("USE_OBJECT_TEMPLATE with no id");
                        continue;
                    };
                    match self.resolve_template(object_type, tmpl_id)? {
                        Some(compiled) => {
                            let processed = preprocess_args(raw_args);
                            let substituted = substitute_tokens(&compiled.tokens, &processed);
                            cursor = apply_template(&mut out, cursor, &substituted, &processed);
                        }
                        None => tracing::warn!(
                            "USE_OBJECT_TEMPLATE references unknown template {object_type}:{tmpl_id}"
                        ),
                    }
                }
                "OT_ADD_TAG" => match token_from_args(token.args()) {
                    Some(new_token) => {
                        out.insert(cursor, new_token);
                        cursor += 1;
                    }
                    None => tracing::warn!("OT_ADD_TAG with no payload"),
                },
                "OT_REMOVE_TAG" => cursor = remove_matching(&mut out, token.args(), cursor),
                "OT_CONVERT_TAG" => convert = Some(ConvertBlock::new(token.args().to_vec())),
                _ => {
                    out.insert(cursor, token.clone());
                    cursor += 1;
                }
            }
        }

        Ok(CompiledObject { object_type, id: id.clone(), tokens: out, is_removed, provenance })
    }

    fn compile_template_body(
        &self,
        tmpl_ref: &Rc<RefCell<ObjectTemplate>>,
        object_type: &'static str,
        id: &SmolStr,
    ) -> Result<CompiledTemplate> {
        let source_tokens = tmpl_ref.borrow().tokens.clone();
        let mut out: Vec<Token> = Vec::new();
        let mut cursor: usize = 0;

        for token in &source_tokens {
            match token.name() {
                "GO_TO_END" => cursor = out.len(),
                "GO_TO_START" => cursor = 0,
                "GO_TO_TAG" => cursor = go_to_tag(&out, token.args()).unwrap_or(cursor),
                "COPY_TAGS_FROM" => {
                    let Some((ref_id, raw_args)) = token.args().split_first() else {
                        tracing::warn!("COPY_TAGS_FROM with no id");
                        continue;
                    };
                    match self.resolve_template(object_type, ref_id)? {
                        Some(compiled) => {
                            let processed = preprocess_args(raw_args);
                            let copied = substitute_tokens(&compiled.tokens, &processed);
                            let n = copied.len();
                            out.splice(cursor..cursor, copied);
                            cursor += n;
                        }
                        None => tracing::warn!(
                            "COPY_TAGS_FROM references unknown template {object_type}:{ref_id}"
                        ),
                    }
                }
                // OT_* ops are not interpreted here; a template body is just
                // the literal sequence of ops replayed at USE_OBJECT_TEMPLATE
                // time (§4.5, template-only directives).
                _ => {
                    out.insert(cursor, token.clone());
                    cursor += 1;
                }
            }
        }

        Ok(CompiledTemplate { object_type, id: id.clone(), tokens: out })
    }
}

fn go_to_tag(out: &[Token], args: &[SmolStr]) -> Option<usize> {
    let target = join_colon(args);
    out.iter().position(|t| t.colon_joined().starts_with(&target))
}

fn token_from_args(args: &[SmolStr]) -> Option<Token> {
    if args.is_empty() {
        None
    } else {
        Some(Token::new(args.to_vec()))
    }
}

fn remove_matching(out: &mut Vec<Token>, prefix: &[SmolStr], cursor: usize) -> usize {
    if prefix.is_empty() {
        tracing::warn!("OT_REMOVE_TAG with no payload");
        return cursor;
    }
    let before = out.len();
    out.retain(|t| {
        let f = t.fragments();
        !(f.len() >= prefix.len() && f[..prefix.len()] == prefix[..])
    });
    let removed = before - out.len();
    cursor.saturating_sub(removed)
}

/// Rewrites `|` to `:` inside each argument, per §4.5.1 step 1.
fn preprocess_args(args: &[SmolStr]) -> Vec<String> {
    args.iter().map(|a| a.replace('|', ":")).collect()
}

/// Substitutes `!ARG<i>` in every fragment of every token, in reverse index
/// order so `!ARG10` never gets clipped by a `!ARG1` replacement (§4.5.1
/// step 2, verified by the reverse-substitution test below).
fn substitute_tokens(tokens: &[Token], processed_args: &[String]) -> Vec<Token> {
    tokens
        .iter()
        .map(|t| {
            let fragments: Vec<SmolStr> =
                t.fragments().iter().map(|f| substitute_fragment(f, processed_args)).collect();
            Token::new(fragments)
        })
        .collect()
}

fn substitute_fragment(fragment: &SmolStr, processed_args: &[String]) -> SmolStr {
    let mut out = fragment.to_string();
    for i in (1..=processed_args.len()).rev() {
        let placeholder = format!("!ARG{i}");
        if out.contains(&placeholder) {
            out = out.replace(&placeholder, &processed_args[i - 1]);
        }
    }
    SmolStr::new(out)
}

/// Parses a conditional tag directive's `<n>:<val>:<payload…>` args against
/// the call's processed arguments, returning the payload if `<n>` selects a
/// value equal to `<val>` (§4.5.2).
fn conditional_payload(directive_args: &[SmolStr], processed_args: &[String]) -> Option<Vec<SmolStr>> {
    if directive_args.len() < 2 {
        tracing::warn!("conditional tag directive missing <n>/<val>");
        return None;
    }
    let n_str = &directive_args[0];
    let val = &directive_args[1];
    let payload = &directive_args[2..];
    let n: usize = match n_str.as_str().parse() {
        Ok(n) if n >= 1 => n,
        _ => {
            tracing::warn!("malformed conditional index \"{n_str}\"");
            return None;
        }
    };
    let actual = processed_args.get(n - 1).map(String::as_str).unwrap_or("");
    (actual == val.as_str()).then(|| payload.to_vec())
}

/// Applies a compiled, argument-substituted template body against `out` at
/// cursor `cursor`, returning the updated cursor (§4.5.2).
fn apply_template(out: &mut Vec<Token>, mut cursor: usize, tokens: &[Token], processed_args: &[String]) -> usize {
    let mut convert: Option<ConvertBlock> = None;

    for token in tokens {
        if let Some(block) = &mut convert {
            match token.name() {
                "OTCT_TARGET" => block.set_target(join_colon(token.args())),
                "OTCT_REPLACEMENT" => {
                    let replacement = join_colon(token.args());
                    block.apply_replacement(out, &replacement);
                    convert = None;
                }
                _ => convert = None,
            }
            continue;
        }

        match token.name() {
            "OT_ADD_TAG" => match token_from_args(token.args()) {
                Some(new_token) => {
                    out.insert(cursor, new_token);
                    cursor += 1;
                }
                None => tracing::warn!("OT_ADD_TAG with no payload"),
            },
            "OT_REMOVE_TAG" => cursor = remove_matching(out, token.args(), cursor),
            "OT_CONVERT_TAG" => convert = Some(ConvertBlock::new(token.args().to_vec())),
            "OT_ADD_CTAG" => {
                if let Some(payload) = conditional_payload(token.args(), processed_args) {
                    if let Some(new_token) = token_from_args(&payload) {
                        out.insert(cursor, new_token);
                        cursor += 1;
                    }
                }
            }
            "OT_REMOVE_CTAG" => {
                if let Some(payload) = conditional_payload(token.args(), processed_args) {
                    cursor = remove_matching(out, &payload, cursor);
                }
            }
            "OT_CONVERT_CTAG" => {
                if let Some(payload) = conditional_payload(token.args(), processed_args) {
                    convert = Some(ConvertBlock::new(payload));
                }
            }
            // Template bodies contain only OT ops; anything else outside a
            // convert block is ignored (§4.5.2).
            _ => {}
        }
    }

    cursor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ObjectStore, Provenance, RawObject};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn provenance() -> Provenance {
        Provenance { mod_name: "vanilla".into(), mod_version: "1.0".into(), source_file: "f.txt".into() }
    }

    fn normal(store: &mut ObjectStore, object_type: &'static str, id: &str, tokens: &[Token]) -> ObjectRef {
        let mut obj = RawObject::new(object_type, id, provenance());
        obj.tokens = tokens.to_vec();
        let obj_ref = Rc::new(RefCell::new(obj));
        store.insert_normal(obj_ref.clone());
        obj_ref
    }

    fn template(store: &mut ObjectStore, object_type: &'static str, id: &str, tokens: &[Token]) {
        let mut tmpl = ObjectTemplate::new(object_type, id, provenance());
        tmpl.tokens = tokens.to_vec();
        store.insert_template(Rc::new(RefCell::new(tmpl)));
    }

    #[test]
    fn test_template_add_remove() {
        let mut store = ObjectStore::new();
        template(
            &mut store,
            "CREATURE",
            "TOUGH",
            &[Token::new(["OT_ADD_TAG", "BIOME", "MOUNTAIN"]), Token::new(["OT_REMOVE_TAG", "BIOME", "FOREST"])],
        );
        normal(
            &mut store,
            "CREATURE",
            "BEAR",
            &[Token::new(["BIOME", "FOREST"]), Token::new(["USE_OBJECT_TEMPLATE", "TOUGH"])],
        );

        let compiled = Compiler::new(&store).compile_all().unwrap();
        let bear = &compiled.objects("CREATURE")[0];
        assert_eq!(bear.tokens, vec![Token::new(["BIOME", "MOUNTAIN"])]);
    }

    #[test]
    fn test_argument_substitution_reverse_order() {
        let mut store = ObjectStore::new();
        template(
            &mut store,
            "CREATURE",
            "T",
            &[Token::new(["OT_ADD_TAG", "X", "!ARG1"]), Token::new(["OT_ADD_TAG", "Y", "!ARG10"])],
        );
        let args: Vec<&str> = vec!["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];
        let mut use_args = vec!["USE_OBJECT_TEMPLATE".to_string(), "T".to_string()];
        use_args.extend(args.iter().map(|s| s.to_string()));
        normal(&mut store, "CREATURE", "OBJ", &[Token::new(use_args)]);

        let compiled = Compiler::new(&store).compile_all().unwrap();
        let obj = &compiled.objects("CREATURE")[0];
        assert_eq!(obj.tokens, vec![Token::new(["X", "a"]), Token::new(["Y", "j"])]);
    }

    #[test]
    fn test_copy_tags_from_cycle_is_fatal() {
        let mut store = ObjectStore::new();
        normal(&mut store, "CREATURE", "A", &[Token::new(["COPY_TAGS_FROM", "B"])]);
        normal(&mut store, "CREATURE", "B", &[Token::new(["COPY_TAGS_FROM", "A"])]);

        let result = Compiler::new(&store).compile_all();
        assert!(matches!(result, Err(Error::CyclicCopy { .. })));
    }

    #[test]
    fn test_go_to_tag_prefix_matching() {
        let mut store = ObjectStore::new();
        normal(
            &mut store,
            "CREATURE",
            "X",
            &[
                Token::new(["A", "1"]),
                Token::new(["B", "2", "3"]),
                Token::new(["C", "4"]),
                Token::new(["GO_TO_TAG", "B"]),
                Token::new(["OT_ADD_TAG", "Z"]),
            ],
        );

        let compiled = Compiler::new(&store).compile_all().unwrap();
        let obj = &compiled.objects("CREATURE")[0];
        assert_eq!(
            obj.tokens,
            vec![
                Token::new(["A", "1"]),
                Token::new(["Z"]),
                Token::new(["B", "2", "3"]),
                Token::new(["C", "4"]),
            ]
        );
    }

    #[test]
    fn test_remove_object_flag() {
        let mut store = ObjectStore::new();
        normal(&mut store, "CREATURE", "X", &[Token::new(["REMOVE_OBJECT"])]);

        let compiled = Compiler::new(&store).compile_all().unwrap();
        let obj = &compiled.objects("CREATURE")[0];
        assert!(obj.is_removed);
    }

    #[test]
    fn test_conditional_ctag_applies_only_on_match() {
        let mut store = ObjectStore::new();
        template(
            &mut store,
            "CREATURE",
            "T",
            &[Token::new(["OT_ADD_CTAG", "1", "yes", "FLAG", "ON"])],
        );
        normal(
            &mut store,
            "CREATURE",
            "MATCH",
            &[Token::new(["USE_OBJECT_TEMPLATE", "T", "yes"])],
        );
        normal(
            &mut store,
            "CREATURE",
            "NOMATCH",
            &[Token::new(["USE_OBJECT_TEMPLATE", "T", "no"])],
        );

        let compiled = Compiler::new(&store).compile_all().unwrap();
        let objects = compiled.objects("CREATURE");
        let matched = objects.iter().find(|o| o.id == "MATCH").unwrap();
        let unmatched = objects.iter().find(|o| o.id == "NOMATCH").unwrap();
        assert_eq!(matched.tokens, vec![Token::new(["FLAG", "ON"])]);
        assert!(unmatched.tokens.is_empty());
    }

    #[test]
    fn test_use_object_template_unknown_id_is_noop() {
        let mut store = ObjectStore::new();
        normal(&mut store, "CREATURE", "X", &[Token::new(["USE_OBJECT_TEMPLATE", "MISSING"])]);

        let compiled = Compiler::new(&store).compile_all().unwrap();
        let obj = &compiled.objects("CREATURE")[0];
        assert!(obj.tokens.is_empty());
    }

    #[test]
    fn test_ot_remove_tag_clamps_cursor_to_zero() {
        let mut store = ObjectStore::new();
        normal(
            &mut store,
            "CREATURE",
            "X",
            &[Token::new(["A"]), Token::new(["GO_TO_START"]), Token::new(["OT_REMOVE_TAG", "A"])],
        );

        let compiled = Compiler::new(&store).compile_all().unwrap();
        let obj = &compiled.objects("CREATURE")[0];
        assert!(obj.tokens.is_empty());
    }
}
