//! Static schema tables: the super-category → object-type mapping, the
//! super-category → output file stem mapping, the header load order, and
//! the token classification sets.
//!
//! Grounded directly in `object_types`, `object_type_file_names`, and
//! `header_load_order` from `raw_handler.py`; `CREATURE_VARIATION`'s
//! absence from `object_types` there is preserved here rather than added
//! (see DESIGN.md).

use phf::{phf_map, phf_set};

/// The top-level `OBJECT:<SUPER>` grouping. Determines which object types
/// may begin a new object in a file, and which output file an object lands
/// in once compiled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SuperCategory {
    BodyDetailPlan,
    Body,
    Building,
    Creature,
    DescriptorColor,
    DescriptorPattern,
    DescriptorShape,
    Entity,
    Inorganic,
    Interaction,
    Item,
    Language,
    MaterialTemplate,
    Plant,
    Reaction,
    TissueTemplate,
    Edit,
    ObjectTemplate,
}

impl SuperCategory {
    /// The object types belonging to this super-category, in the order
    /// `raw_handler.py` declares them.
    pub fn object_types(self) -> &'static [&'static str] {
        use SuperCategory::*;
        match self {
            BodyDetailPlan => &["BODY_DETAIL_PLAN"],
            Body => &["BODY", "BODYGLOSS"],
            Building => &["BUILDING_WORKSHOP"],
            Creature => &["CREATURE"],
            DescriptorColor => &["COLOR"],
            DescriptorPattern => &["COLOR_PATTERN"],
            DescriptorShape => &["SHAPE"],
            Entity => &["ENTITY"],
            Inorganic => &["INORGANIC"],
            Interaction => &["INTERACTION"],
            Item => &[
                "ITEM_AMMO",
                "ITEM_ARMOR",
                "ITEM_FOOD",
                "ITEM_GLOVES",
                "ITEM_HELM",
                "ITEM_INSTRUMENT",
                "ITEM_PANTS",
                "ITEM_SHIELD",
                "ITEM_SIEGEAMMO",
                "ITEM_SHOES",
                "ITEM_TOOL",
                "ITEM_TOY",
                "ITEM_TRAPCOMP",
                "ITEM_WEAPON",
            ],
            Language => &["TRANSLATION", "SYMBOL", "WORD"],
            MaterialTemplate => &["MATERIAL_TEMPLATE"],
            Plant => &["PLANT"],
            Reaction => &["REACTION"],
            TissueTemplate => &["TISSUE_TEMPLATE"],
            Edit => &["EDIT"],
            ObjectTemplate => &["OBJECT_TEMPLATE"],
        }
    }

    /// The canonical output file stem, e.g. `"item"` for `item_compiled.txt`.
    pub fn file_stem(self) -> &'static str {
        use SuperCategory::*;
        match self {
            BodyDetailPlan => "b_detail_plan",
            Body => "body",
            Building => "building",
            Creature => "creature",
            DescriptorColor => "descriptor_color",
            DescriptorPattern => "descriptor_pattern",
            DescriptorShape => "descriptor_shape",
            Entity => "entity",
            Inorganic => "inorganic",
            Interaction => "interaction",
            Item => "item",
            Language => "language",
            MaterialTemplate => "material_template",
            Plant => "plant",
            Reaction => "reaction",
            TissueTemplate => "tissue_template",
            Edit => "edit",
            ObjectTemplate => "object_template",
        }
    }
}

/// Maps an `OBJECT:<SUPER>` token's argument to its super-category.
pub static SUPER_CATEGORIES: phf::Map<&'static str, SuperCategory> = phf_map! {
    "BODY_DETAIL_PLAN" => SuperCategory::BodyDetailPlan,
    "BODY" => SuperCategory::Body,
    "BUILDING" => SuperCategory::Building,
    "CREATURE" => SuperCategory::Creature,
    "DESCRIPTOR_COLOR" => SuperCategory::DescriptorColor,
    "DESCRIPTOR_PATTERN" => SuperCategory::DescriptorPattern,
    "DESCRIPTOR_SHAPE" => SuperCategory::DescriptorShape,
    "ENTITY" => SuperCategory::Entity,
    "INORGANIC" => SuperCategory::Inorganic,
    "INTERACTION" => SuperCategory::Interaction,
    "ITEM" => SuperCategory::Item,
    "LANGUAGE" => SuperCategory::Language,
    "MATERIAL_TEMPLATE" => SuperCategory::MaterialTemplate,
    "PLANT" => SuperCategory::Plant,
    "REACTION" => SuperCategory::Reaction,
    "TISSUE_TEMPLATE" => SuperCategory::TissueTemplate,
    "EDIT" => SuperCategory::Edit,
    "OBJECT_TEMPLATE" => SuperCategory::ObjectTemplate,
};

/// Maps a concrete object type (e.g. `"CREATURE"`, `"ITEM_WEAPON"`) back to
/// the super-category that owns it.
pub static OBJECT_TYPE_SUPER_CATEGORY: phf::Map<&'static str, SuperCategory> = phf_map! {
    "BODY_DETAIL_PLAN" => SuperCategory::BodyDetailPlan,
    "BODY" => SuperCategory::Body,
    "BODYGLOSS" => SuperCategory::Body,
    "BUILDING_WORKSHOP" => SuperCategory::Building,
    "CREATURE" => SuperCategory::Creature,
    "COLOR" => SuperCategory::DescriptorColor,
    "COLOR_PATTERN" => SuperCategory::DescriptorPattern,
    "SHAPE" => SuperCategory::DescriptorShape,
    "ENTITY" => SuperCategory::Entity,
    "INORGANIC" => SuperCategory::Inorganic,
    "INTERACTION" => SuperCategory::Interaction,
    "ITEM_AMMO" => SuperCategory::Item,
    "ITEM_ARMOR" => SuperCategory::Item,
    "ITEM_FOOD" => SuperCategory::Item,
    "ITEM_GLOVES" => SuperCategory::Item,
    "ITEM_HELM" => SuperCategory::Item,
    "ITEM_INSTRUMENT" => SuperCategory::Item,
    "ITEM_PANTS" => SuperCategory::Item,
    "ITEM_SHIELD" => SuperCategory::Item,
    "ITEM_SIEGEAMMO" => SuperCategory::Item,
    "ITEM_SHOES" => SuperCategory::Item,
    "ITEM_TOOL" => SuperCategory::Item,
    "ITEM_TOY" => SuperCategory::Item,
    "ITEM_TRAPCOMP" => SuperCategory::Item,
    "ITEM_WEAPON" => SuperCategory::Item,
    "TRANSLATION" => SuperCategory::Language,
    "SYMBOL" => SuperCategory::Language,
    "WORD" => SuperCategory::Language,
    "MATERIAL_TEMPLATE" => SuperCategory::MaterialTemplate,
    "PLANT" => SuperCategory::Plant,
    "REACTION" => SuperCategory::Reaction,
    "TISSUE_TEMPLATE" => SuperCategory::TissueTemplate,
    "EDIT" => SuperCategory::Edit,
    "OBJECT_TEMPLATE" => SuperCategory::ObjectTemplate,
};

/// Every data-bearing super-category, in the order the compiler and writer
/// walk them. `Edit` and `ObjectTemplate` are synthetic and excluded: `EDIT`
/// never owns stored objects and `OBJECT_TEMPLATE` is never written.
pub static DATA_SUPER_CATEGORIES: &[SuperCategory] = &[
    SuperCategory::BodyDetailPlan,
    SuperCategory::Body,
    SuperCategory::Building,
    SuperCategory::Creature,
    SuperCategory::DescriptorColor,
    SuperCategory::DescriptorPattern,
    SuperCategory::DescriptorShape,
    SuperCategory::Entity,
    SuperCategory::Inorganic,
    SuperCategory::Interaction,
    SuperCategory::Item,
    SuperCategory::Language,
    SuperCategory::MaterialTemplate,
    SuperCategory::Plant,
    SuperCategory::Reaction,
    SuperCategory::TissueTemplate,
];

/// The type names that are always eligible to begin a new object, in every
/// file, regardless of what `OBJECT:<SUPER>` was last seen.
pub static ALWAYS_POSSIBLE_OBJECT_TYPES: &[&str] = &["EDIT", "OBJECT_TEMPLATE"];

/// An identity map used to recover a `&'static str` object-type name from a
/// token fragment borrowed out of a mod file (e.g. an `EDIT` or
/// `OBJECT_TEMPLATE` header's target type, which isn't necessarily one of
/// the current file's declared `pos_object_types`).
pub static CANONICAL_OBJECT_TYPE: phf::Map<&'static str, &'static str> = phf_map! {
    "BODY_DETAIL_PLAN" => "BODY_DETAIL_PLAN",
    "BODY" => "BODY",
    "BODYGLOSS" => "BODYGLOSS",
    "BUILDING_WORKSHOP" => "BUILDING_WORKSHOP",
    "CREATURE" => "CREATURE",
    "COLOR" => "COLOR",
    "COLOR_PATTERN" => "COLOR_PATTERN",
    "SHAPE" => "SHAPE",
    "ENTITY" => "ENTITY",
    "INORGANIC" => "INORGANIC",
    "INTERACTION" => "INTERACTION",
    "ITEM_AMMO" => "ITEM_AMMO",
    "ITEM_ARMOR" => "ITEM_ARMOR",
    "ITEM_FOOD" => "ITEM_FOOD",
    "ITEM_GLOVES" => "ITEM_GLOVES",
    "ITEM_HELM" => "ITEM_HELM",
    "ITEM_INSTRUMENT" => "ITEM_INSTRUMENT",
    "ITEM_PANTS" => "ITEM_PANTS",
    "ITEM_SHIELD" => "ITEM_SHIELD",
    "ITEM_SIEGEAMMO" => "ITEM_SIEGEAMMO",
    "ITEM_SHOES" => "ITEM_SHOES",
    "ITEM_TOOL" => "ITEM_TOOL",
    "ITEM_TOY" => "ITEM_TOY",
    "ITEM_TRAPCOMP" => "ITEM_TRAPCOMP",
    "ITEM_WEAPON" => "ITEM_WEAPON",
    "TRANSLATION" => "TRANSLATION",
    "SYMBOL" => "SYMBOL",
    "WORD" => "WORD",
    "MATERIAL_TEMPLATE" => "MATERIAL_TEMPLATE",
    "PLANT" => "PLANT",
    "REACTION" => "REACTION",
    "TISSUE_TEMPLATE" => "TISSUE_TEMPLATE",
    "EDIT" => "EDIT",
    "OBJECT_TEMPLATE" => "OBJECT_TEMPLATE",
};

/// Looks up the canonical `&'static str` for an object-type name, if it's
/// one the schema recognizes.
pub fn canonical_object_type(name: &str) -> Option<&'static str> {
    CANONICAL_OBJECT_TYPE.get(name).copied()
}

/// The header-prefix load order from `raw_handler.py` (`o_template` is
/// listed first there as well, so templates always compile before anything
/// that might reference them via `USE_OBJECT_TEMPLATE`). `c_variation` is
/// kept in the list to preserve header-matching order even though the
/// legacy syntax updater it served is out of scope.
pub static HEADER_LOAD_ORDER: &[&str] = &[
    "o_template",
    "language",
    "descriptor_shape",
    "descriptor_color",
    "descriptor_pattern",
    "material_template",
    "inorganic",
    "plant",
    "tissue_template",
    "item",
    "building",
    "b_detail_plan",
    "body",
    "c_variation",
    "creature",
    "entity",
    "reaction",
    "interaction",
    "edit",
];

/// Directive names valid in a normal object's body (and, via `ADD_SPEC_TAG`/
/// `REMOVE_SPEC_TAG`, addable from inside an `EDIT` block).
pub static SPECIAL_TOKENS: phf::Set<&'static str> = phf_set! {
    "GO_TO_END",
    "GO_TO_START",
    "GO_TO_TAG",
    "COPY_TAGS_FROM",
    "REMOVE_OBJECT",
    "USE_OBJECT_TEMPLATE",
};

/// Template-operation token names: the vocabulary of an `OBJECT_TEMPLATE`
/// body, also usable inline in EDIT blocks and normal object bodies.
pub static TEMPLATE_OP_TOKENS: phf::Set<&'static str> = phf_set! {
    "OT_ADD_TAG",
    "OT_REMOVE_TAG",
    "OT_CONVERT_TAG",
    "OTCT_TARGET",
    "OTCT_REPLACEMENT",
    "OT_ADD_CTAG",
    "OT_REMOVE_CTAG",
    "OT_CONVERT_CTAG",
};

/// True if `name` is usable verbatim (unwrapped) inside an `EDIT` block body
/// — the union `raw_handler.py`'s reader checks before falling back to
/// wrapping a token as `OT_ADD_TAG`.
pub fn is_verbatim_in_edit_body(name: &str) -> bool {
    SPECIAL_TOKENS.contains(name) || TEMPLATE_OP_TOKENS.contains(name)
}
