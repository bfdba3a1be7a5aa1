//! Line-oriented reader for legacy text dumps.
//!
//! Each non-blank line declares one entity:
//!
//! ```text
//! Class Name [: Superclass] [tag]...
//!     Property Type Class.Name [tag]...
//!     Function Type Class:Name(Type name [= default], ...) [tag]...
//!     YieldFunction Type Class:Name(...) [tag]...
//!     Event Class.Name(...) [tag]...
//!     Callback Type Class.Name(...) [tag]...
//! Enum Name [tag]...
//!     EnumItem Enum.Name : Value [tag]...
//! ```
//!
//! Members belong to the most recent `Class`, items to the most recent `Enum`.
//! Tags are the bracketed groups trailing a declaration; a group may nest
//! brackets, as in `[ScriptWriteRestricted: [NotAccessibleSecurity]]`.

use crate::error::{ParseError, Result};
use crate::types::{
    LegacyClass, LegacyDump, LegacyEnum, LegacyEnumItem, LegacyMember, LegacyMemberKind,
    LegacyParameter,
};

type LineResult<T> = std::result::Result<T, String>;

/// Parse a legacy dump from raw bytes.
pub fn parse(bytes: &[u8]) -> Result<LegacyDump> {
    parse_str(std::str::from_utf8(bytes)?)
}

/// Parse a legacy dump from text. Stops at the first line it cannot read.
pub fn parse_str(text: &str) -> Result<LegacyDump> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut dump = LegacyDump::default();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        read_line(&mut dump, line).map_err(|message| ParseError::syntax(index + 1, message))?;
    }
    Ok(dump)
}

fn read_line(dump: &mut LegacyDump, line: &str) -> LineResult<()> {
    let (decl, tags) = split_tags(line)?;
    let (keyword, rest) = match decl.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (decl, ""),
    };
    match keyword {
        "Class" => dump.classes.push(read_class(rest, tags)?),
        "Enum" => dump.enums.push(LegacyEnum {
            name: single_name(rest, "enum")?.to_string(),
            items: Vec::new(),
            tags,
        }),
        "EnumItem" => {
            let (owner, item) = read_enum_item(rest, tags)?;
            let Some(enumeration) = dump.enums.last_mut() else {
                return Err(format!("enum item {owner}.{} outside of an enum", item.name));
            };
            if enumeration.name != owner {
                return Err(format!(
                    "enum item {owner}.{} inside enum {}",
                    item.name, enumeration.name
                ));
            }
            enumeration.items.push(item);
        }
        other => {
            let Some(kind) = LegacyMemberKind::from_keyword(other) else {
                return Err(format!("unknown declaration {other:?}"));
            };
            let (owner, member) = read_member(kind, rest, tags)?;
            let Some(class) = dump.classes.last_mut() else {
                return Err(format!("member {owner}.{} outside of a class", member.name));
            };
            if class.name != owner {
                return Err(format!(
                    "member {owner}.{} inside class {}",
                    member.name, class.name
                ));
            }
            class.members.push(member);
        }
    }
    Ok(())
}

// ============================================================================
// Declarations
// ============================================================================

fn read_class(rest: &str, tags: Vec<String>) -> LineResult<LegacyClass> {
    let (name, superclass) = match rest.split_once(':') {
        Some((name, superclass)) => (
            single_name(name, "class")?,
            Some(single_name(superclass, "superclass")?.to_string()),
        ),
        None => (single_name(rest, "class")?, None),
    };
    Ok(LegacyClass {
        name: name.to_string(),
        superclass,
        members: Vec::new(),
        tags,
    })
}

fn read_enum_item(rest: &str, tags: Vec<String>) -> LineResult<(&str, LegacyEnumItem)> {
    let (qualified, value) = rest
        .split_once(':')
        .ok_or_else(|| format!("enum item {rest:?} has no value"))?;
    let (owner, name) = split_qualified(qualified.trim())?;
    let value = value
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("enum item {qualified:?}: bad value {:?}: {e}", value.trim()))?;
    Ok((
        owner,
        LegacyEnumItem {
            name: name.to_string(),
            value,
            tags,
        },
    ))
}

fn read_member(
    kind: LegacyMemberKind,
    rest: &str,
    tags: Vec<String>,
) -> LineResult<(&str, LegacyMember)> {
    let (value_type, rest) = if kind.is_typed() {
        let (ty, rest) = rest
            .split_once(char::is_whitespace)
            .ok_or_else(|| format!("{kind} {rest:?} is missing a type or a name"))?;
        (Some(ty.to_string()), rest.trim())
    } else {
        (None, rest)
    };

    let (qualified, parameters) = if kind.has_parameters() {
        let open = rest
            .find('(')
            .ok_or_else(|| format!("{kind} {rest:?} has no parameter list"))?;
        let inner = rest[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| format!("{kind} {rest:?} has an unterminated parameter list"))?;
        (rest[..open].trim(), read_parameters(inner)?)
    } else {
        (rest, Vec::new())
    };

    let (owner, name) = split_qualified(single_name(qualified, kind.keyword())?)?;
    Ok((
        owner,
        LegacyMember {
            kind,
            name: name.to_string(),
            value_type,
            parameters,
            tags,
        },
    ))
}

fn read_parameters(list: &str) -> LineResult<Vec<LegacyParameter>> {
    if list.trim().is_empty() {
        return Ok(Vec::new());
    }
    split_top_level(list)
        .into_iter()
        .map(|param| {
            let (decl, default) = match param.split_once('=') {
                Some((decl, default)) => (decl.trim(), Some(default.trim().to_string())),
                None => (param.trim(), None),
            };
            let mut words = decl.split_whitespace();
            match (words.next(), words.next(), words.next()) {
                (Some(ty), Some(name), None) => Ok(LegacyParameter {
                    ty: ty.to_string(),
                    name: name.to_string(),
                    default,
                }),
                _ => Err(format!("malformed parameter {:?}", param.trim())),
            }
        })
        .collect()
}

// ============================================================================
// Lexical helpers
// ============================================================================

/// Peel trailing bracketed tag groups off a declaration, keeping their order.
fn split_tags(line: &str) -> LineResult<(&str, Vec<String>)> {
    let mut rest = line.trim_end();
    let mut tags = Vec::new();
    while rest.ends_with(']') {
        let open = matching_open(rest).ok_or("unbalanced ']' in tag list")?;
        let tag = rest[open + 1..rest.len() - 1].trim();
        if !tag.is_empty() {
            tags.push(tag.to_string());
        }
        rest = rest[..open].trim_end();
    }
    tags.reverse();
    Ok((rest, tags))
}

/// Index of the `[` matching the `]` that ends `s`.
fn matching_open(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices().rev() {
        match c {
            ']' => depth += 1,
            '[' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that are not nested in brackets or quotes.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '(' | '[' | '{' if !quoted => depth += 1,
            ')' | ']' | '}' if !quoted => depth -= 1,
            ',' if !quoted && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn single_name<'a>(s: &'a str, what: &str) -> LineResult<&'a str> {
    let s = s.trim();
    if s.is_empty() {
        return Err(format!("{what} has no name"));
    }
    if s.contains(char::is_whitespace) {
        return Err(format!("{what} name {s:?} contains whitespace"));
    }
    Ok(s)
}

/// `Owner.Name` or `Owner:Name`.
fn split_qualified(s: &str) -> LineResult<(&str, &str)> {
    match s.split_once(['.', ':']) {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
            Ok((owner.trim(), name.trim()))
        }
        _ => Err(format!("{s:?} is not a qualified name")),
    }
}
