use crate::types::{LegacyClass, LegacyDump, LegacyEnum, LegacyMember, LegacyMemberKind};
use apihist::v1::{
    Callback, Class, Enum, EnumItem, Event, Function, Member, Parameter, Property,
    PropertySecurity, Snapshot, Tags, TypeRef,
};

/// Tag given to functions declared with the `YieldFunction` keyword.
pub const YIELDS_TAG: &str = "Yields";

/// Map a legacy dump onto the structured schema.
///
/// Order and duplicates are preserved. Every type reference is left
/// uncategorized, security classifiers stay empty, and no property gets
/// serialization flags: the legacy format carries none of these.
pub fn materialize(dump: &LegacyDump) -> Snapshot {
    Snapshot {
        classes: dump.classes.iter().map(materialize_class).collect(),
        enums: dump.enums.iter().map(materialize_enum).collect(),
        ..Snapshot::new()
    }
}

fn materialize_class(class: &LegacyClass) -> Class {
    Class {
        name: class.name.clone(),
        superclass: class.superclass.clone().unwrap_or_default(),
        memory_category: String::new(),
        members: class.members.iter().map(materialize_member).collect(),
        tags: tags(&class.tags),
    }
}

fn materialize_member(member: &LegacyMember) -> Member {
    let name = member.name.clone();
    let value_type = || TypeRef::uncategorized(member.value_type.clone().unwrap_or_default());
    let parameters = || -> Vec<Parameter> {
        member
            .parameters
            .iter()
            .map(|p| Parameter {
                ty: TypeRef::uncategorized(p.ty.as_str()),
                name: p.name.clone(),
                default: p.default.clone(),
            })
            .collect()
    };
    let mut tags = tags(&member.tags);

    match member.kind {
        LegacyMemberKind::Property => Member::Property(Property {
            name,
            category: String::new(),
            value_type: value_type(),
            security: PropertySecurity::default(),
            serialization: None,
            tags,
        }),
        LegacyMemberKind::Function | LegacyMemberKind::YieldFunction => {
            if member.kind == LegacyMemberKind::YieldFunction {
                tags.insert(YIELDS_TAG);
            }
            Member::Function(Function {
                name,
                parameters: parameters(),
                return_type: value_type(),
                security: String::new(),
                tags,
            })
        }
        LegacyMemberKind::Event => Member::Event(Event {
            name,
            parameters: parameters(),
            security: String::new(),
            tags,
        }),
        LegacyMemberKind::Callback => Member::Callback(Callback {
            name,
            parameters: parameters(),
            return_type: value_type(),
            security: String::new(),
            tags,
        }),
    }
}

fn materialize_enum(enumeration: &LegacyEnum) -> Enum {
    Enum {
        name: enumeration.name.clone(),
        items: enumeration
            .items
            .iter()
            .map(|item| EnumItem {
                name: item.name.clone(),
                value: item.value,
                tags: tags(&item.tags),
            })
            .collect(),
        tags: tags(&enumeration.tags),
    }
}

fn tags(legacy: &[String]) -> Tags {
    legacy.iter().map(String::as_str).collect()
}
