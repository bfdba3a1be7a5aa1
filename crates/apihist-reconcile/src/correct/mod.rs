//! Filling in what the legacy format could not express.
//!
//! Correction is a fixed list of units, each declared once with the entity
//! kind it applies to. [`correct`] runs them in order, every unit over every
//! matching entity, pairing each entity with its nearest counterpart in the
//! [`ReferenceChain`]. The known-defect [`cleanup`] runs before and after
//! the units.

pub mod cleanup;
pub mod fields;
pub mod tags;
pub mod types;

use crate::chain::ReferenceChain;
use crate::corpus::TypeCorpus;
use apihist::v1::{
    Callback, Class, Enum, EnumItem, Event, Function, Member, MemberKind, Property, Snapshot,
    TypeRef,
};
use cleanup::DefectRemoval;
use serde::Serialize;
use tracing::{debug, warn};

/// A corrector bound to the entity kind it visits.
#[derive(Clone, Copy)]
pub enum Unit {
    Root(fn(&mut Snapshot, &mut Context<'_>)),
    Class(fn(&mut Class, Option<&Class>, &mut Context<'_>)),
    Property(fn(&mut Property, Option<&Property>, &mut Context<'_>)),
    Function(fn(&mut Function, Option<&Function>, &mut Context<'_>)),
    Event(fn(&mut Event, Option<&Event>, &mut Context<'_>)),
    Callback(fn(&mut Callback, Option<&Callback>, &mut Context<'_>)),
    Enum(fn(&mut Enum, Option<&Enum>, &mut Context<'_>)),
    EnumItem(fn(&mut EnumItem, Option<&EnumItem>, &mut Context<'_>)),
}

#[derive(Clone, Copy)]
pub struct CorrectorUnit {
    pub name: &'static str,
    pub unit: Unit,
}

const fn unit(name: &'static str, kind: Unit) -> CorrectorUnit {
    CorrectorUnit { name, unit: kind }
}

/// Every correction, in the order it runs.
pub static UNITS: &[CorrectorUnit] = &[
    unit("enum-backport", Unit::Root(types::backport_enums)),
    unit("type-category", Unit::Property(types::property)),
    unit("type-category", Unit::Function(types::function)),
    unit("type-category", Unit::Callback(types::callback)),
    unit("parameters", Unit::Function(types::function_parameters)),
    unit("parameters", Unit::Event(types::event_parameters)),
    unit("parameters", Unit::Callback(types::callback_parameters)),
    unit("fields", Unit::Class(fields::class)),
    unit("fields", Unit::Property(fields::property)),
    unit("tags", Unit::Class(tags::class)),
    unit("tags", Unit::Property(tags::property)),
    unit("tags", Unit::Function(tags::function)),
    unit("tags", Unit::Event(tags::event)),
    unit("tags", Unit::Callback(tags::callback)),
    unit("tags", Unit::Enum(tags::enumeration)),
    unit("tags", Unit::EnumItem(tags::enum_item)),
];

// ============================================================================
// Report
// ============================================================================

/// A type reference whose category could not be found anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedType {
    pub location: String,
    pub name: String,
}

/// A type name the corpus knows under several categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousType {
    pub location: String,
    pub name: String,
    pub chosen: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorrectionReport {
    pub unresolved_types: Vec<UnresolvedType>,
    pub ambiguous_types: Vec<AmbiguousType>,
    pub removed: Vec<DefectRemoval>,
    /// Number of enums copied in from the chain.
    pub backported_enums: usize,
}

// ============================================================================
// Context
// ============================================================================

/// Shared state handed to every unit.
pub struct Context<'a> {
    pub corpus: &'a TypeCorpus,
    pub chain: &'a ReferenceChain,
    pub report: CorrectionReport,
    location: String,
}

impl<'a> Context<'a> {
    pub fn new(corpus: &'a TypeCorpus, chain: &'a ReferenceChain) -> Self {
        Self {
            corpus,
            chain,
            report: CorrectionReport::default(),
            location: String::new(),
        }
    }

    /// `Owner` or `Owner.Name` of the entity being corrected.
    pub fn location(&self) -> &str {
        &self.location
    }

    fn locate(&mut self, owner: &str, name: Option<&str>) {
        self.location.clear();
        self.location.push_str(owner);
        if let Some(name) = name {
            self.location.push('.');
            self.location.push_str(name);
        }
    }

    pub fn unresolved_type(&mut self, ty: &TypeRef) {
        debug!("No category for type {} at {}", ty.name, self.location);
        self.report.unresolved_types.push(UnresolvedType {
            location: self.location.clone(),
            name: ty.name.clone(),
        });
    }

    pub fn ambiguous_type(&mut self, name: &str, chosen: &str, categories: &[String]) {
        warn!(
            "Type {} at {} has categories {:?}; using {}",
            name, self.location, categories, chosen
        );
        self.report.ambiguous_types.push(AmbiguousType {
            location: self.location.clone(),
            name: name.to_string(),
            chosen: chosen.to_string(),
            categories: categories.to_vec(),
        });
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Correct `snapshot` against the chain and corpus.
///
/// Only `snapshot` is modified. The chain is read through shared references
/// and the corpus is only queried.
pub fn correct(
    snapshot: &mut Snapshot,
    chain: &ReferenceChain,
    corpus: &TypeCorpus,
) -> CorrectionReport {
    // Reports never name a removed member; the second pass covers backported enums.
    let mut removed = cleanup::cleanup(snapshot);
    let mut ctx = Context::new(corpus, chain);
    for unit in UNITS {
        run_unit(unit, snapshot, &mut ctx);
    }
    let mut report = ctx.report;
    removed.extend(cleanup::cleanup(snapshot));
    report.removed = removed;
    report
}

fn run_unit(unit: &CorrectorUnit, snapshot: &mut Snapshot, ctx: &mut Context<'_>) {
    let chain = ctx.chain;
    match unit.unit {
        Unit::Root(f) => f(snapshot, ctx),
        Unit::Class(f) => {
            for class in &mut snapshot.classes {
                ctx.locate(&class.name, None);
                let reference = chain.find_class(&class.name);
                f(class, reference, ctx);
            }
        }
        Unit::Property(f) => each_member(snapshot, ctx, MemberKind::Property, |m, r, ctx| {
            if let Member::Property(p) = m {
                f(p, r.and_then(Member::as_property), ctx);
            }
        }),
        Unit::Function(f) => each_member(snapshot, ctx, MemberKind::Function, |m, r, ctx| {
            if let Member::Function(func) = m {
                f(func, r.and_then(Member::as_function), ctx);
            }
        }),
        Unit::Event(f) => each_member(snapshot, ctx, MemberKind::Event, |m, r, ctx| {
            if let Member::Event(e) = m {
                f(e, r.and_then(Member::as_event), ctx);
            }
        }),
        Unit::Callback(f) => each_member(snapshot, ctx, MemberKind::Callback, |m, r, ctx| {
            if let Member::Callback(c) = m {
                f(c, r.and_then(Member::as_callback), ctx);
            }
        }),
        Unit::Enum(f) => {
            for enumeration in &mut snapshot.enums {
                ctx.locate(&enumeration.name, None);
                let reference = chain.find_enum(&enumeration.name);
                f(enumeration, reference, ctx);
            }
        }
        Unit::EnumItem(f) => {
            for enumeration in &mut snapshot.enums {
                for item in &mut enumeration.items {
                    ctx.locate(&enumeration.name, Some(&item.name));
                    let reference = chain.find_enum_item(&enumeration.name, &item.name);
                    f(item, reference, ctx);
                }
            }
        }
    }
}

fn each_member<'a>(
    snapshot: &mut Snapshot,
    ctx: &mut Context<'a>,
    kind: MemberKind,
    mut visit: impl FnMut(&mut Member, Option<&'a Member>, &mut Context<'a>),
) {
    let chain = ctx.chain;
    for class in &mut snapshot.classes {
        for member in &mut class.members {
            if member.kind() != kind {
                continue;
            }
            ctx.locate(&class.name, Some(member.name()));
            let reference = chain.find_member(&class.name, member.name(), kind);
            visit(member, reference, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::FrozenSnapshot;
    use apihist::v1::{PropertySecurity, Serialization};

    fn reference() -> Snapshot {
        let mut size = Property::new("Size", TypeRef::new("DataType", "Vector3"));
        size.category = "Part".into();
        size.serialization = Some(Serialization {
            can_load: true,
            can_save: true,
        });
        Snapshot::new()
            .with_class(
                Class::new("Part")
                    .with_superclass("BasePart")
                    .with_member(size)
                    .with_member(
                        Function::new("Resize", TypeRef::new("Primitive", "bool"))
                            .with_parameter(TypeRef::new("Enum", "NormalId"), "normalId"),
                    ),
            )
            .with_enum(Enum::new("NormalId").with_item("Top", 1))
    }

    fn legacy() -> Snapshot {
        Snapshot::new().with_class(
            Class::new("Part")
                .with_member(
                    Property::new("Size", TypeRef::uncategorized("Vector3"))
                        .with_tag("ScriptWriteRestricted: [Developer]"),
                )
                .with_member(
                    Function::new("Resize", TypeRef::uncategorized("bool"))
                        .with_parameter(TypeRef::uncategorized("NormalId"), "normalId")
                        .with_tag("LocalUserSecurity"),
                )
                .with_member(Property::new("Mystery", TypeRef::uncategorized("Gizmo"))),
        )
    }

    fn corpus_for(snapshot: &Snapshot) -> TypeCorpus {
        let corpus = TypeCorpus::historical();
        corpus.register_snapshot(snapshot);
        corpus
    }

    #[test]
    fn test_units_registry_order() {
        let names: Vec<&str> = UNITS.iter().map(|u| u.name).collect();
        let mut seen: Vec<&str> = Vec::new();
        for name in names {
            if seen.last() != Some(&name) {
                assert!(!seen.contains(&name), "unit {} is split", name);
                seen.push(name);
            }
        }
        assert_eq!(
            seen,
            ["enum-backport", "type-category", "parameters", "fields", "tags"]
        );
    }

    #[test]
    fn test_correct_end_to_end() {
        let reference = reference();
        let corpus = corpus_for(&reference);
        let chain = ReferenceChain::new(FrozenSnapshot::freeze("reference", reference));

        let mut snapshot = legacy();
        let report = correct(&mut snapshot, &chain, &corpus);

        let part = snapshot.class("Part").unwrap();
        assert_eq!(part.superclass, "BasePart");

        let size = part.member("Size").and_then(Member::as_property).unwrap();
        assert_eq!(size.value_type, TypeRef::new("DataType", "Vector3"));
        assert_eq!(size.category, "Part");
        assert!(size.serialization.is_some());
        assert_eq!(
            size.security,
            PropertySecurity {
                read: "None".into(),
                write: "Developer".into()
            }
        );
        assert!(size.tags.is_empty());

        let resize = part.member("Resize").and_then(Member::as_function).unwrap();
        assert_eq!(resize.return_type.category, "Primitive");
        assert_eq!(resize.parameters[0].ty.category, "Enum");
        assert_eq!(resize.security, "LocalUserSecurity");

        // Enums were backported from the reference.
        assert_eq!(snapshot.enums.len(), 1);
        assert_eq!(report.backported_enums, 1);

        assert_eq!(report.unresolved_types.len(), 1);
        assert_eq!(report.unresolved_types[0].location, "Part.Mystery");
        assert_eq!(report.unresolved_types[0].name, "Gizmo");
    }

    #[test]
    fn test_correct_leaves_chain_untouched() {
        let reference = reference();
        let corpus = corpus_for(&reference);
        let frozen = FrozenSnapshot::freeze("reference", reference.clone());
        let chain = ReferenceChain::new(frozen.clone());

        let mut snapshot = legacy();
        correct(&mut snapshot, &chain, &corpus);
        assert_eq!(frozen.snapshot(), &reference);
    }

    #[test]
    fn test_correct_runs_cleanup() {
        let corpus = TypeCorpus::new();
        let chain = ReferenceChain::empty();
        let mut snapshot = Snapshot::new().with_class(
            Class::new("DataModel")
                .with_member(Function::new("Loaded", TypeRef::new("Primitive", "bool")))
                .with_member(Event::new("Loaded")),
        );
        let report = correct(&mut snapshot, &chain, &corpus);
        assert_eq!(snapshot.classes[0].members.len(), 1);
        assert_eq!(report.removed.len(), 1);
    }

    #[test]
    fn test_removed_members_are_not_reported() {
        let corpus = TypeCorpus::new();
        let chain = ReferenceChain::empty();
        let mut snapshot = Snapshot::new().with_class(
            Class::new("DataModel")
                .with_member(Function::new("Loaded", TypeRef::uncategorized("bool")))
                .with_member(Event::new("Loaded"))
                .with_member(Property::new("JobId", TypeRef::uncategorized("Gizmo"))),
        );
        let report = correct(&mut snapshot, &chain, &corpus);

        let locations: Vec<&str> = report
            .unresolved_types
            .iter()
            .map(|t| t.location.as_str())
            .collect();
        assert_eq!(locations, ["DataModel.JobId"]);
        assert_eq!(report.removed.len(), 1);
        assert!(snapshot.classes[0].member_of_kind("Loaded", MemberKind::Function).is_none());
    }

    #[test]
    fn test_backported_defects_are_cleaned() {
        let reference = Snapshot::new().with_enum(
            Enum::new("KeyCode")
                .with_item("KeypadEquals", 272)
                .with_item("KeypadEquals", 272),
        );
        let corpus = corpus_for(&reference);
        let chain = ReferenceChain::new(FrozenSnapshot::freeze("reference", reference));

        let mut snapshot = Snapshot::new();
        let report = correct(&mut snapshot, &chain, &corpus);
        assert_eq!(report.backported_enums, 1);
        assert_eq!(snapshot.enumeration("KeyCode").unwrap().items.len(), 1);
        assert_eq!(report.removed.len(), 1);
    }

    #[test]
    fn test_correct_is_stable_on_second_pass() {
        let reference = reference();
        let corpus = corpus_for(&reference);
        let chain = ReferenceChain::new(FrozenSnapshot::freeze("reference", reference));

        let mut snapshot = legacy();
        correct(&mut snapshot, &chain, &corpus);
        let once = snapshot.clone();
        correct(&mut snapshot, &chain, &corpus);
        assert_eq!(snapshot, once);
    }
}
