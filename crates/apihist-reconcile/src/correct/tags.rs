//! Security classifiers hidden in tags, legacy tag spellings, and tags that
//! were only recorded in later snapshots.

use super::Context;
use apihist::v1::{Callback, Class, Enum, EnumItem, Event, Function, MemberKind, Property, Tags};

pub const WRITE_RESTRICTED_PREFIX: &str = "ScriptWriteRestricted: [";

/// Classifier used when no security tag is present.
pub const DEFAULT_SECURITY: &str = "None";

const COMMON_RENAMES: &[(&str, &str)] = &[
    ("notbrowsable", "NotBrowsable"),
    ("deprecated", "Deprecated"),
];
const CLASS_RENAMES: &[(&str, &str)] = &[("notCreatable", "NotCreatable")];
const PROPERTY_RENAMES: &[(&str, &str)] = &[("hidden", "Hidden"), ("readonly", "ReadOnly")];

const CLASS_INHERITED: &[&str] = &["NotCreatable", "Service", "NotReplicated", "PlayerReplicated"];
const PROPERTY_INHERITED: &[&str] = &["NotReplicated"];

pub fn class(current: &mut Class, reference: Option<&Class>, _ctx: &mut Context<'_>) {
    rename(&mut current.tags, CLASS_RENAMES);
    if let Some(reference) = reference {
        inherit(&mut current.tags, &reference.tags, CLASS_INHERITED);
    }
    rename(&mut current.tags, COMMON_RENAMES);

    // WaitForChild could yield long before the Yields tag existed.
    if current.name == "Instance" {
        if let Some(wait) = current.member_of_kind_mut("WaitForChild", MemberKind::Function) {
            let tags = wait.tags_mut();
            if !tags.contains("Yields") {
                tags.insert("CanYield");
            }
        }
    }
}

pub fn property(current: &mut Property, reference: Option<&Property>, _ctx: &mut Context<'_>) {
    let write = take_write_restriction(&mut current.tags);
    let security = take_security(&mut current.tags);

    if let Some(write) = write {
        current.security.write = write;
    } else if let Some(security) = &security {
        current.security.write = security.clone();
    }
    if let Some(security) = security {
        current.security.read = security;
    }
    default_security(&mut current.security.read);
    default_security(&mut current.security.write);

    rename(&mut current.tags, PROPERTY_RENAMES);
    if let Some(reference) = reference {
        inherit(&mut current.tags, &reference.tags, PROPERTY_INHERITED);
    }
    rename(&mut current.tags, COMMON_RENAMES);
}

pub fn function(current: &mut Function, _reference: Option<&Function>, _ctx: &mut Context<'_>) {
    member_security(&mut current.security, &mut current.tags);
    rename(&mut current.tags, COMMON_RENAMES);
}

pub fn event(current: &mut Event, _reference: Option<&Event>, _ctx: &mut Context<'_>) {
    member_security(&mut current.security, &mut current.tags);
    rename(&mut current.tags, COMMON_RENAMES);
}

pub fn callback(current: &mut Callback, _reference: Option<&Callback>, _ctx: &mut Context<'_>) {
    member_security(&mut current.security, &mut current.tags);
    rename(&mut current.tags, COMMON_RENAMES);
}

pub fn enumeration(current: &mut Enum, _reference: Option<&Enum>, _ctx: &mut Context<'_>) {
    rename(&mut current.tags, COMMON_RENAMES);
}

pub fn enum_item(current: &mut EnumItem, _reference: Option<&EnumItem>, _ctx: &mut Context<'_>) {
    rename(&mut current.tags, COMMON_RENAMES);
}

// ============================================================================
// Helpers
// ============================================================================

fn member_security(security: &mut String, tags: &mut Tags) {
    if let Some(tag) = take_security(tags) {
        *security = tag;
    }
    default_security(security);
}

fn default_security(security: &mut String) {
    if security.is_empty() {
        *security = DEFAULT_SECURITY.to_string();
    }
}

/// Remove a `ScriptWriteRestricted: [X]` tag and return `X`.
fn take_write_restriction(tags: &mut Tags) -> Option<String> {
    let tag = tags
        .iter()
        .find(|t| t.starts_with(WRITE_RESTRICTED_PREFIX))?
        .to_string();
    tags.remove(&tag);
    let inner = &tag[WRITE_RESTRICTED_PREFIX.len()..];
    Some(inner.strip_suffix(']').unwrap_or(inner).trim().to_string())
}

/// Remove every tag naming a security classifier and return the first.
fn take_security(tags: &mut Tags) -> Option<String> {
    let found: Vec<String> = tags
        .iter()
        .filter(|t| is_security_tag(t))
        .map(str::to_string)
        .collect();
    for tag in &found {
        tags.remove(tag);
    }
    found.into_iter().next()
}

fn is_security_tag(tag: &str) -> bool {
    tag.to_ascii_lowercase().contains("security")
}

fn rename(tags: &mut Tags, renames: &[(&str, &str)]) {
    for (from, to) in renames {
        tags.rename(from, to);
    }
}

fn inherit(tags: &mut Tags, reference: &Tags, inherited: &[&str]) {
    for tag in inherited {
        if reference.contains(tag) {
            tags.insert(*tag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ReferenceChain;
    use crate::corpus::TypeCorpus;
    use apihist::v1::TypeRef;

    fn run<T>(f: impl FnOnce(&mut Context<'_>) -> T) -> T {
        let corpus = TypeCorpus::new();
        let chain = ReferenceChain::empty();
        f(&mut Context::new(&corpus, &chain))
    }

    fn prop(tags: &[&str]) -> Property {
        let mut p = Property::new("Velocity", TypeRef::new("DataType", "Vector3"));
        p.tags = tags.iter().copied().collect();
        p
    }

    #[test]
    fn test_write_restriction() {
        let mut p = prop(&["ScriptWriteRestricted: [Developer]"]);
        run(|ctx| property(&mut p, None, ctx));
        assert_eq!(p.security.write, "Developer");
        assert_eq!(p.security.read, "None");
        assert!(p.tags.is_empty());
    }

    #[test]
    fn test_write_restriction_with_security_suffix() {
        let mut p = prop(&["ScriptWriteRestricted: [NotAccessibleSecurity]"]);
        run(|ctx| property(&mut p, None, ctx));
        assert_eq!(p.security.write, "NotAccessibleSecurity");
        assert_eq!(p.security.read, "None");
    }

    #[test]
    fn test_security_sets_read_and_write() {
        let mut p = prop(&["LocalUserSecurity", "hidden"]);
        run(|ctx| property(&mut p, None, ctx));
        assert_eq!(p.security.read, "LocalUserSecurity");
        assert_eq!(p.security.write, "LocalUserSecurity");
        assert_eq!(p.tags.as_slice(), ["Hidden"]);
    }

    #[test]
    fn test_write_restriction_wins_regardless_of_order() {
        for tags in [
            ["RobloxScriptSecurity", "ScriptWriteRestricted: [PluginSecurity]"],
            ["ScriptWriteRestricted: [PluginSecurity]", "RobloxScriptSecurity"],
        ] {
            let mut p = prop(&tags);
            run(|ctx| property(&mut p, None, ctx));
            assert_eq!(p.security.read, "RobloxScriptSecurity");
            assert_eq!(p.security.write, "PluginSecurity");
            assert!(p.tags.is_empty());
        }
    }

    #[test]
    fn test_lowercase_security_tag() {
        let mut f = Function::new("Kick", TypeRef::new("Primitive", "void")).with_tag("security");
        run(|ctx| function(&mut f, None, ctx));
        assert_eq!(f.security, "security");
        assert!(f.tags.is_empty());
    }

    #[test]
    fn test_member_security_default() {
        let mut e = Event::new("Changed").with_tag("deprecated");
        run(|ctx| event(&mut e, None, ctx));
        assert_eq!(e.security, "None");
        assert_eq!(e.tags.as_slice(), ["Deprecated"]);
    }

    #[test]
    fn test_existing_security_is_kept() {
        let mut f = Function::new("Kick", TypeRef::new("Primitive", "void"));
        f.security = "PluginSecurity".into();
        run(|ctx| function(&mut f, None, ctx));
        assert_eq!(f.security, "PluginSecurity");
    }

    #[test]
    fn test_property_renames_and_inherit() {
        let reference = prop(&["NotReplicated", "Hidden"]);
        let mut p = prop(&["readonly", "notbrowsable"]);
        run(|ctx| property(&mut p, Some(&reference), ctx));
        assert_eq!(p.tags.as_slice(), ["ReadOnly", "NotBrowsable", "NotReplicated"]);
    }

    #[test]
    fn test_class_tags() {
        let reference = Class::new("Workspace")
            .with_tag("Service")
            .with_tag("NotCreatable")
            .with_tag("Deprecated");
        let mut current = Class::new("Workspace").with_tag("notCreatable");
        run(|ctx| class(&mut current, Some(&reference), ctx));
        // Deprecated is not inherited.
        assert_eq!(current.tags.as_slice(), ["NotCreatable", "Service"]);
    }

    #[test]
    fn test_wait_for_child_can_yield() {
        let mut instance = Class::new("Instance").with_member(Function::new(
            "WaitForChild",
            TypeRef::new("Class", "Instance"),
        ));
        run(|ctx| class(&mut instance, None, ctx));
        assert!(instance.members[0].tags().contains("CanYield"));

        let mut yielding = Class::new("Instance").with_member(
            Function::new("WaitForChild", TypeRef::new("Class", "Instance")).with_tag("Yields"),
        );
        run(|ctx| class(&mut yielding, None, ctx));
        assert!(!yielding.members[0].tags().contains("CanYield"));
    }

    #[test]
    fn test_enum_renames() {
        let mut e = Enum::new("Material");
        e.tags.insert("notbrowsable");
        run(|ctx| enumeration(&mut e, None, ctx));
        assert_eq!(e.tags.as_slice(), ["NotBrowsable"]);

        let mut item = EnumItem::new("Plastic", 256);
        item.tags.insert("deprecated");
        run(|ctx| enum_item(&mut item, None, ctx));
        assert_eq!(item.tags.as_slice(), ["Deprecated"]);
    }
}
