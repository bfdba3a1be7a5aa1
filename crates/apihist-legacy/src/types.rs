//! The legacy dump tree, exactly as the text describes it.
//!
//! Nothing here is categorized or corrected. Names may repeat within a scope
//! and tags keep their original legacy spelling.

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyDump {
    pub classes: Vec<LegacyClass>,
    pub enums: Vec<LegacyEnum>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyClass {
    pub name: String,
    pub superclass: Option<String>,
    pub members: Vec<LegacyMember>,
    pub tags: Vec<String>,
}

/// Member keywords of the legacy format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyMemberKind {
    Property,
    Function,
    /// A function that may yield; later dumps express this as a tag.
    YieldFunction,
    Event,
    Callback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyMember {
    pub kind: LegacyMemberKind,
    pub name: String,
    /// Value type of a property, return type of a function or callback.
    pub value_type: Option<String>,
    pub parameters: Vec<LegacyParameter>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyParameter {
    pub ty: String,
    pub name: String,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyEnum {
    pub name: String,
    pub items: Vec<LegacyEnumItem>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyEnumItem {
    pub name: String,
    pub value: i64,
    pub tags: Vec<String>,
}

impl LegacyMemberKind {
    pub fn keyword(self) -> &'static str {
        match self {
            LegacyMemberKind::Property => "Property",
            LegacyMemberKind::Function => "Function",
            LegacyMemberKind::YieldFunction => "YieldFunction",
            LegacyMemberKind::Event => "Event",
            LegacyMemberKind::Callback => "Callback",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "Property" => Some(LegacyMemberKind::Property),
            "Function" => Some(LegacyMemberKind::Function),
            "YieldFunction" => Some(LegacyMemberKind::YieldFunction),
            "Event" => Some(LegacyMemberKind::Event),
            "Callback" => Some(LegacyMemberKind::Callback),
            _ => None,
        }
    }

    /// Whether the declaration carries a type before the qualified name.
    pub fn is_typed(self) -> bool {
        !matches!(self, LegacyMemberKind::Event)
    }

    /// Whether the declaration carries a parameter list.
    pub fn has_parameters(self) -> bool {
        !matches!(self, LegacyMemberKind::Property)
    }
}

impl fmt::Display for LegacyMemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl LegacyDump {
    /// Number of classes, members, enums, and enum items.
    pub fn len(&self) -> usize {
        self.classes.iter().map(|c| 1 + c.members.len()).sum::<usize>()
            + self.enums.iter().map(|e| 1 + e.items.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.enums.is_empty()
    }
}
