//! Type categories, canonical type names, and the enum list.

use super::Context;
use apihist::v1::{Callback, Event, Function, Parameter, Property, Snapshot, TypeRef};
use tracing::debug;

/// Type names used only by the legacy format. A matched reference type
/// always supplies the current spelling; without one, the canonical name is
/// used where one exists.
const LEGACY_TYPE_NAMES: &[(&str, Option<&str>)] = &[
    ("CoordinateFrame", Some("CFrame")),
    ("Connection", Some("RBXScriptConnection")),
    ("EventInstance", Some("RBXScriptSignal")),
    ("Rect2D", Some("Rect")),
    // Became the name of the changed property's type.
    ("Property", None),
];

/// Give a snapshot without enums the enum list of the nearest snapshot that
/// has one.
pub fn backport_enums(snapshot: &mut Snapshot, ctx: &mut Context<'_>) {
    if !snapshot.enums.is_empty() {
        return;
    }
    if let Some(enums) = ctx.chain.nearest_enums() {
        debug!("Backporting {} enums", enums.len());
        snapshot.enums = enums.to_vec();
        ctx.report.backported_enums = enums.len();
    }
}

pub fn property(current: &mut Property, reference: Option<&Property>, ctx: &mut Context<'_>) {
    correct_type(&mut current.value_type, reference.map(|r| &r.value_type), ctx);
}

pub fn function(current: &mut Function, reference: Option<&Function>, ctx: &mut Context<'_>) {
    correct_type(&mut current.return_type, reference.map(|r| &r.return_type), ctx);
}

pub fn callback(current: &mut Callback, reference: Option<&Callback>, ctx: &mut Context<'_>) {
    correct_type(&mut current.return_type, reference.map(|r| &r.return_type), ctx);
}

pub fn function_parameters(
    current: &mut Function,
    reference: Option<&Function>,
    ctx: &mut Context<'_>,
) {
    correct_parameters(
        &mut current.parameters,
        reference.map(|r| r.parameters.as_slice()),
        ctx,
    );
}

pub fn event_parameters(current: &mut Event, reference: Option<&Event>, ctx: &mut Context<'_>) {
    correct_parameters(
        &mut current.parameters,
        reference.map(|r| r.parameters.as_slice()),
        ctx,
    );
}

pub fn callback_parameters(
    current: &mut Callback,
    reference: Option<&Callback>,
    ctx: &mut Context<'_>,
) {
    correct_parameters(
        &mut current.parameters,
        reference.map(|r| r.parameters.as_slice()),
        ctx,
    );
}

/// Pair each parameter with the reference parameter of the same name, else
/// the one at the same position.
pub fn correct_parameters(
    params: &mut [Parameter],
    reference: Option<&[Parameter]>,
    ctx: &mut Context<'_>,
) {
    for (i, param) in params.iter_mut().enumerate() {
        let matched = reference.and_then(|r| {
            r.iter()
                .find(|p| p.name == param.name)
                .or_else(|| r.get(i))
        });
        correct_type(&mut param.ty, matched.map(|p| &p.ty), ctx);
    }
}

/// Canonicalize the name of `ty`, then fill an empty category from the
/// reference type or, failing that, from the corpus.
pub fn correct_type(ty: &mut TypeRef, reference: Option<&TypeRef>, ctx: &mut Context<'_>) {
    let legacy_name = canonicalize(ty, reference);

    if ty.is_categorized() {
        return;
    }
    if let Some(reference) = reference.filter(|r| r.name == ty.name && r.is_categorized()) {
        ty.category = reference.category.clone();
        return;
    }

    let inferred = ctx
        .corpus
        .best(&ty.name)
        .or_else(|| legacy_name.and_then(|name| ctx.corpus.best(name)));
    match inferred {
        Some(inferred) => {
            if inferred.is_ambiguous() {
                ctx.ambiguous_type(&ty.name, &inferred.category, &inferred.alternatives);
            }
            ty.category = inferred.category;
        }
        None => ctx.unresolved_type(ty),
    }
}

/// Rewrite a legacy type name. Returns the legacy name if it was replaced.
fn canonicalize(ty: &mut TypeRef, reference: Option<&TypeRef>) -> Option<&'static str> {
    let &(legacy, canonical) = LEGACY_TYPE_NAMES.iter().find(|(legacy, _)| *legacy == ty.name)?;
    let replacement = match (reference, canonical) {
        (Some(reference), _) if !reference.name.is_empty() => reference.name.clone(),
        (_, Some(canonical)) => canonical.to_string(),
        _ => return None,
    };
    if replacement == ty.name {
        return None;
    }
    ty.name = replacement;
    Some(legacy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{FrozenSnapshot, ReferenceChain};
    use crate::correct::CorrectionReport;
    use crate::corpus::TypeCorpus;
    use apihist::v1::Enum;

    fn with_ctx(corpus: &TypeCorpus, f: impl FnOnce(&mut Context<'_>)) -> CorrectionReport {
        let chain = ReferenceChain::empty();
        let mut ctx = Context::new(corpus, &chain);
        f(&mut ctx);
        ctx.report
    }

    #[test]
    fn test_category_from_reference() {
        let corpus = TypeCorpus::new();
        let mut ty = TypeRef::uncategorized("Vector3");
        let report = with_ctx(&corpus, |ctx| {
            correct_type(&mut ty, Some(&TypeRef::new("DataType", "Vector3")), ctx)
        });
        assert_eq!(ty.category, "DataType");
        assert!(report.unresolved_types.is_empty());
    }

    #[test]
    fn test_category_from_corpus_when_reference_differs() {
        let corpus = TypeCorpus::new();
        corpus.register(&TypeRef::new("DataType", "Vector3"));
        let mut ty = TypeRef::uncategorized("Vector3");
        with_ctx(&corpus, |ctx| {
            correct_type(&mut ty, Some(&TypeRef::new("DataType", "Vector2")), ctx)
        });
        assert_eq!(ty, TypeRef::new("DataType", "Vector3"));
    }

    #[test]
    fn test_authored_category_is_kept() {
        let corpus = TypeCorpus::new();
        let mut ty = TypeRef::new("Class", "Instance");
        with_ctx(&corpus, |ctx| {
            correct_type(&mut ty, Some(&TypeRef::new("Enum", "Instance")), ctx)
        });
        assert_eq!(ty.category, "Class");
    }

    #[test]
    fn test_unknown_type_is_reported() {
        let corpus = TypeCorpus::new();
        let mut ty = TypeRef::uncategorized("Gizmo");
        let report = with_ctx(&corpus, |ctx| correct_type(&mut ty, None, ctx));
        assert!(ty.category.is_empty());
        assert_eq!(report.unresolved_types.len(), 1);
        assert_eq!(report.unresolved_types[0].name, "Gizmo");
    }

    #[test]
    fn test_ambiguous_corpus_hit_is_reported() {
        let corpus = TypeCorpus::new();
        corpus.register(&TypeRef::new("Enum", "Material"));
        corpus.register(&TypeRef::new("Class", "Material"));
        let mut ty = TypeRef::uncategorized("Material");
        let report = with_ctx(&corpus, |ctx| correct_type(&mut ty, None, ctx));
        assert_eq!(ty.category, "Enum");
        assert_eq!(report.ambiguous_types.len(), 1);
        assert_eq!(report.ambiguous_types[0].categories, ["Enum", "Class"]);
    }

    #[test]
    fn test_legacy_name_without_reference() {
        let corpus = TypeCorpus::historical();
        let mut ty = TypeRef::uncategorized("CoordinateFrame");
        with_ctx(&corpus, |ctx| correct_type(&mut ty, None, ctx));
        // CFrame is unknown here, so the historical CoordinateFrame entry is used.
        assert_eq!(ty, TypeRef::new("DataType", "CFrame"));
    }

    #[test]
    fn test_legacy_name_takes_reference_spelling() {
        let corpus = TypeCorpus::new();
        let mut ty = TypeRef::uncategorized("Property");
        with_ctx(&corpus, |ctx| {
            correct_type(&mut ty, Some(&TypeRef::new("Primitive", "string")), ctx)
        });
        assert_eq!(ty, TypeRef::new("Primitive", "string"));
    }

    #[test]
    fn test_property_type_kept_without_reference() {
        let corpus = TypeCorpus::new();
        let mut ty = TypeRef::uncategorized("Property");
        let report = with_ctx(&corpus, |ctx| correct_type(&mut ty, None, ctx));
        assert_eq!(ty.name, "Property");
        assert_eq!(report.unresolved_types.len(), 1);
    }

    #[test]
    fn test_parameters_match_by_name_then_position() {
        let corpus = TypeCorpus::new();
        let reference = [
            Parameter::new(TypeRef::new("Primitive", "bool"), "recursive"),
            Parameter::new(TypeRef::new("Primitive", "string"), "name"),
        ];
        let mut params = vec![
            Parameter::new(TypeRef::uncategorized("string"), "name"),
            Parameter::new(TypeRef::uncategorized("bool"), "deep"),
            Parameter::new(TypeRef::uncategorized("int"), "extra"),
        ];
        let report = with_ctx(&corpus, |ctx| {
            correct_parameters(&mut params, Some(&reference), ctx)
        });
        // By name.
        assert_eq!(params[0].ty.category, "Primitive");
        // By position: index 1 pairs with "name" (string), so bool stays open.
        assert!(params[1].ty.category.is_empty());
        // Nothing at index 2.
        assert!(params[2].ty.category.is_empty());
        assert_eq!(report.unresolved_types.len(), 2);
    }

    #[test]
    fn test_backport_enums() {
        let corpus = TypeCorpus::new();
        let chain = ReferenceChain::new(FrozenSnapshot::freeze(
            "reference",
            Snapshot::new().with_enum(Enum::new("KeyCode")),
        ));
        let mut ctx = Context::new(&corpus, &chain);
        let mut snapshot = Snapshot::new();
        backport_enums(&mut snapshot, &mut ctx);
        assert_eq!(snapshot.enums.len(), 1);

        // A snapshot with its own enums keeps them.
        let mut own = Snapshot::new().with_enum(Enum::new("Material"));
        backport_enums(&mut own, &mut ctx);
        assert_eq!(own.enums[0].name, "Material");
    }
}
