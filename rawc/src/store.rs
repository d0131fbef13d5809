//! The in-memory object catalog: per-type ordered lists plus id maps for
//! normal objects, and a separate id-only index for templates (§4.3).

use crate::token::Token;
use smol_str::SmolStr;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Where a stored object's body came from: which mod, which version, which
/// file within that mod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub mod_name: SmolStr,
    pub mod_version: SmolStr,
    pub source_file: SmolStr,
}

/// An addressable entity: a category tag, an id, and an ordered token body.
#[derive(Debug)]
pub struct RawObject {
    pub object_type: &'static str,
    pub id: SmolStr,
    pub tokens: Vec<Token>,
    pub provenance: Provenance,
}

impl RawObject {
    pub fn new(object_type: &'static str, id: impl Into<SmolStr>, provenance: Provenance) -> Self {
        Self { object_type, id: id.into(), tokens: Vec::new(), provenance }
    }
}

/// A reusable parameterized object body. Same shape as [`RawObject`]; kept
/// as a distinct type because templates and normal objects live in disjoint
/// id namespaces and are compiled by different rules (§4.5).
#[derive(Debug)]
pub struct ObjectTemplate {
    pub object_type: &'static str,
    pub id: SmolStr,
    pub tokens: Vec<Token>,
    pub provenance: Provenance,
}

impl ObjectTemplate {
    pub fn new(object_type: &'static str, id: impl Into<SmolStr>, provenance: Provenance) -> Self {
        Self { object_type, id: id.into(), tokens: Vec::new(), provenance }
    }
}

pub type ObjectRef = Rc<RefCell<RawObject>>;
pub type TemplateRef = Rc<RefCell<ObjectTemplate>>;

/// An ordered list of objects paired with an id map, per §4.3.
///
/// `insert` always appends to the order list, even for a duplicate id; the
/// id map is overwritten to point at the newest object. This means a
/// duplicate id leaves the list holding an object no longer reachable by
/// id — documented as-specified in §9 ambiguity (a), not silently fixed.
#[derive(Debug)]
pub struct ObjectList<T> {
    order: Vec<Rc<RefCell<T>>>,
    by_id: HashMap<SmolStr, Rc<RefCell<T>>>,
}

impl<T> Default for ObjectList<T> {
    fn default() -> Self {
        Self { order: Vec::new(), by_id: HashMap::new() }
    }
}

impl<T> ObjectList<T> {
    pub fn insert(&mut self, id: SmolStr, obj: Rc<RefCell<T>>) {
        self.order.push(obj.clone());
        if self.by_id.insert(id.clone(), obj).is_some() {
            tracing::warn!(
                "duplicate object id \"{id}\": the id map now points at the newer \
                 definition, but the writer emits objects in insertion order and will \
                 still see the older one"
            );
        }
    }

    pub fn remove(&mut self, id: &str, obj: &Rc<RefCell<T>>) {
        self.by_id.remove(id);
        self.order.retain(|candidate| !Rc::ptr_eq(candidate, obj));
    }

    pub fn get(&self, id: &str) -> Option<&Rc<RefCell<T>>> {
        self.by_id.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<RefCell<T>>> {
        self.order.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }
}

/// The full object catalog built by the Reader pass and read by the
/// Compiler pass. Keyed by object-type name (always one of the `&'static
/// str`s in [`crate::schema`]).
#[derive(Debug, Default)]
pub struct ObjectStore {
    normal: HashMap<&'static str, ObjectList<RawObject>>,
    templates: HashMap<&'static str, ObjectList<ObjectTemplate>>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normal(&self, object_type: &str) -> Option<&ObjectList<RawObject>> {
        self.normal.get(object_type)
    }

    pub fn normal_mut(&mut self, object_type: &'static str) -> &mut ObjectList<RawObject> {
        self.normal.entry(object_type).or_default()
    }

    pub fn templates(&self, object_type: &str) -> Option<&ObjectList<ObjectTemplate>> {
        self.templates.get(object_type)
    }

    pub fn templates_mut(&mut self, object_type: &'static str) -> &mut ObjectList<ObjectTemplate> {
        self.templates.entry(object_type).or_default()
    }

    /// Inserts a freshly-read object into its type's catalog.
    pub fn insert_normal(&mut self, obj: ObjectRef) {
        let (object_type, id) = {
            let borrowed = obj.borrow();
            (borrowed.object_type, borrowed.id.clone())
        };
        self.normal_mut(object_type).insert(id, obj);
    }

    /// Removes a specific object (by identity) from its type's catalog.
    pub fn remove_normal(&mut self, obj: &ObjectRef) {
        let (object_type, id) = {
            let borrowed = obj.borrow();
            (borrowed.object_type, borrowed.id.clone())
        };
        self.normal_mut(object_type).remove(&id, obj);
    }

    /// Records a freshly-read template under its type's id map.
    pub fn insert_template(&mut self, tmpl: TemplateRef) {
        let (object_type, id) = {
            let borrowed = tmpl.borrow();
            (borrowed.object_type, borrowed.id.clone())
        };
        self.templates_mut(object_type).insert(id, tmpl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provenance() -> Provenance {
        Provenance {
            mod_name: "vanilla".into(),
            mod_version: "1.0".into(),
            source_file: "creature_standard.txt".into(),
        }
    }

    #[test]
    fn test_insert_and_get_by_id() {
        let mut store = ObjectStore::new();
        let obj = Rc::new(RefCell::new(RawObject::new("CREATURE", "BEAR", provenance())));
        store.insert_normal(obj);
        assert_eq!(store.normal("CREATURE").unwrap().len(), 1);
        assert!(store.normal("CREATURE").unwrap().get("BEAR").is_some());
    }

    #[test]
    fn test_duplicate_id_keeps_both_in_list_but_map_has_newest() {
        let mut store = ObjectStore::new();
        let first = Rc::new(RefCell::new(RawObject::new("CREATURE", "BEAR", provenance())));
        let second = Rc::new(RefCell::new(RawObject::new("CREATURE", "BEAR", provenance())));
        store.insert_normal(first.clone());
        store.insert_normal(second.clone());
        let list = store.normal("CREATURE").unwrap();
        assert_eq!(list.len(), 2);
        assert!(Rc::ptr_eq(list.get("BEAR").unwrap(), &second));
    }

    #[test]
    fn test_remove_normal_drops_from_both_structures() {
        let mut store = ObjectStore::new();
        let obj = Rc::new(RefCell::new(RawObject::new("CREATURE", "BEAR", provenance())));
        store.insert_normal(obj.clone());
        store.remove_normal(&obj);
        assert!(store.normal("CREATURE").unwrap().is_empty());
        assert!(store.normal("CREATURE").unwrap().get("BEAR").is_none());
    }

    #[test]
    fn test_templates_are_indexed_separately_from_normal_objects() {
        let mut store = ObjectStore::new();
        let tmpl = Rc::new(RefCell::new(ObjectTemplate::new("CREATURE", "TOUGH", provenance())));
        store.insert_template(tmpl);
        assert!(store.normal("CREATURE").is_none());
        assert!(store.templates("CREATURE").unwrap().get("TOUGH").is_some());
    }
}
