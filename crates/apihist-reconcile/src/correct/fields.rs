use super::Context;
use apihist::v1::{Class, Property};

/// Superclasses of classes removed before the legacy format listed any.
const DEFAULT_SUPERCLASSES: &[(&str, &str)] = &[("PseudoPlayer", "Instance")];

pub fn class(current: &mut Class, reference: Option<&Class>, _ctx: &mut Context<'_>) {
    match reference {
        Some(reference) => {
            if current.superclass.is_empty() {
                current.superclass = reference.superclass.clone();
            }
            if current.memory_category.is_empty() {
                current.memory_category = reference.memory_category.clone();
            }
        }
        None if current.superclass.is_empty() => {
            if let Some((_, superclass)) = DEFAULT_SUPERCLASSES
                .iter()
                .find(|(name, _)| *name == current.name)
            {
                current.superclass = superclass.to_string();
            }
        }
        None => {}
    }
}

pub fn property(current: &mut Property, reference: Option<&Property>, _ctx: &mut Context<'_>) {
    let Some(reference) = reference else {
        return;
    };
    if current.category.is_empty() {
        current.category = reference.category.clone();
    }
    if current.serialization.is_none() {
        current.serialization = reference.serialization;
    }
}
