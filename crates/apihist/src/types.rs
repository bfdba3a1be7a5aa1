use serde::{Deserialize, Serialize};
use std::fmt;

/// Schema version written by this crate.
pub const SCHEMA_VERSION: u32 = 1;

fn schema_version() -> u32 {
    SCHEMA_VERSION
}

// ============================================================================
// Snapshot
// ============================================================================

/// One build's complete interface description in the structured schema.
///
/// Classes and enums keep their authored order. Names are expected to be
/// unique within each scope, but a freshly materialized snapshot may still
/// carry duplicates until conflict resolution has run, so lookups by name
/// always return the *first* match.
///
/// # JSON shape
///
/// ```json
/// {
///   "Version": 1,
///   "Classes": [
///     {
///       "Name": "Part",
///       "Superclass": "BasePart",
///       "MemoryCategory": "PhysicsParts",
///       "Members": [
///         {
///           "MemberType": "Property",
///           "Name": "Shape",
///           "Category": "Part",
///           "ValueType": { "Category": "Enum", "Name": "PartType" },
///           "Security": { "Read": "None", "Write": "None" },
///           "Serialization": { "CanLoad": true, "CanSave": true }
///         }
///       ]
///     }
///   ],
///   "Enums": [
///     { "Name": "PartType", "Items": [ { "Name": "Ball", "Value": 0 } ] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Snapshot {
    #[serde(default = "schema_version")]
    pub version: u32,
    #[serde(default)]
    pub classes: Vec<Class>,
    #[serde(default)]
    pub enums: Vec<Enum>,
}

/// A class and its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Class {
    pub name: String,
    #[serde(default)]
    pub superclass: String,
    #[serde(default)]
    pub memory_category: String,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
}

/// A class member, tagged by `MemberType` in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "MemberType")]
pub enum Member {
    Property(Property),
    Function(Function),
    Event(Event),
    Callback(Callback),
}

/// Discriminant of [`Member`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemberKind {
    Property,
    Function,
    Event,
    Callback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Property {
    pub name: String,
    /// Grouping shown by editors (e.g. `"Appearance"`), not a type category.
    #[serde(default)]
    pub category: String,
    pub value_type: TypeRef,
    #[serde(default)]
    pub security: PropertySecurity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialization: Option<Serialization>,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
}

/// Read and write security classifiers of a property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PropertySecurity {
    #[serde(default)]
    pub read: String,
    #[serde(default)]
    pub write: String,
}

/// Load/save capability of a property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Serialization {
    pub can_load: bool,
    pub can_save: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    pub return_type: TypeRef,
    #[serde(default)]
    pub security: String,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub security: String,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Callback {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    pub return_type: TypeRef,
    #[serde(default)]
    pub security: String,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    #[serde(rename = "Type")]
    pub ty: TypeRef,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A reference to a named type.
///
/// An empty `category` means the category is not known yet. Legacy dumps
/// never carry categories, so every reference starts out this way and is
/// filled in during correction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TypeRef {
    #[serde(default)]
    pub category: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Enum {
    pub name: String,
    #[serde(default)]
    pub items: Vec<EnumItem>,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnumItem {
    pub name: String,
    pub value: i64,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
}

// ============================================================================
// Tags
// ============================================================================

/// An ordered set of opaque tag strings.
///
/// Serialized as a plain JSON array. Insertion ignores tags already present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<String>);

impl Tags {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    /// Add a tag. Returns `false` if it was already present.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.contains(&tag) {
            return false;
        }
        self.0.push(tag);
        true
    }

    /// Remove a tag. Returns `false` if it was not present.
    pub fn remove(&mut self, tag: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|t| t != tag);
        self.0.len() != before
    }

    /// Replace `from` with `to` at the same position.
    ///
    /// If `to` is already present, `from` is simply removed.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        let Some(pos) = self.0.iter().position(|t| t == from) else {
            return false;
        };
        if self.contains(to) {
            self.0.remove(pos);
        } else {
            self.0[pos] = to.to_string();
        }
        true
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for Tags {
    fn from(tags: Vec<String>) -> Self {
        tags.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for tag in iter {
            tags.insert(tag);
        }
        tags
    }
}

// ============================================================================
// Convenience methods
// ============================================================================

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl Snapshot {
    /// Create an empty snapshot at the current schema version.
    pub fn new() -> Self {
        Self {
            version: SCHEMA_VERSION,
            classes: Vec::new(),
            enums: Vec::new(),
        }
    }

    /// Decode a snapshot from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Decode a snapshot from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Encode to compact JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Encode to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// First class with the given name.
    pub fn class(&self, name: &str) -> Option<&Class> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn class_mut(&mut self, name: &str) -> Option<&mut Class> {
        self.classes.iter_mut().find(|c| c.name == name)
    }

    /// First enum with the given name.
    pub fn enumeration(&self, name: &str) -> Option<&Enum> {
        self.enums.iter().find(|e| e.name == name)
    }

    pub fn enumeration_mut(&mut self, name: &str) -> Option<&mut Enum> {
        self.enums.iter_mut().find(|e| e.name == name)
    }

    pub fn with_class(mut self, class: Class) -> Self {
        self.classes.push(class);
        self
    }

    pub fn with_enum(mut self, enumeration: Enum) -> Self {
        self.enums.push(enumeration);
        self
    }
}

impl Class {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: String::new(),
            memory_category: String::new(),
            members: Vec::new(),
            tags: Tags::new(),
        }
    }

    pub fn with_superclass(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = superclass.into();
        self
    }

    pub fn with_member(mut self, member: impl Into<Member>) -> Self {
        self.members.push(member.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag);
        self
    }

    /// First member with the given name, of any kind.
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name() == name)
    }

    /// First member with the given name and kind.
    pub fn member_of_kind(&self, name: &str, kind: MemberKind) -> Option<&Member> {
        self.members
            .iter()
            .find(|m| m.kind() == kind && m.name() == name)
    }

    pub fn member_of_kind_mut(&mut self, name: &str, kind: MemberKind) -> Option<&mut Member> {
        self.members
            .iter_mut()
            .find(|m| m.kind() == kind && m.name() == name)
    }
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Property(p) => &p.name,
            Member::Function(f) => &f.name,
            Member::Event(e) => &e.name,
            Member::Callback(c) => &c.name,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self {
            Member::Property(p) => p.name = name,
            Member::Function(f) => f.name = name,
            Member::Event(e) => e.name = name,
            Member::Callback(c) => c.name = name,
        }
    }

    pub fn kind(&self) -> MemberKind {
        match self {
            Member::Property(_) => MemberKind::Property,
            Member::Function(_) => MemberKind::Function,
            Member::Event(_) => MemberKind::Event,
            Member::Callback(_) => MemberKind::Callback,
        }
    }

    pub fn tags(&self) -> &Tags {
        match self {
            Member::Property(p) => &p.tags,
            Member::Function(f) => &f.tags,
            Member::Event(e) => &e.tags,
            Member::Callback(c) => &c.tags,
        }
    }

    pub fn tags_mut(&mut self) -> &mut Tags {
        match self {
            Member::Property(p) => &mut p.tags,
            Member::Function(f) => &mut f.tags,
            Member::Event(e) => &mut e.tags,
            Member::Callback(c) => &mut c.tags,
        }
    }

    /// Parameters of a function, event, or callback. Properties have none.
    pub fn parameters(&self) -> &[Parameter] {
        match self {
            Member::Property(_) => &[],
            Member::Function(f) => &f.parameters,
            Member::Event(e) => &e.parameters,
            Member::Callback(c) => &c.parameters,
        }
    }

    pub fn as_property(&self) -> Option<&Property> {
        match self {
            Member::Property(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Member::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Member::Event(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            Member::Callback(c) => Some(c),
            _ => None,
        }
    }
}

impl From<Property> for Member {
    fn from(p: Property) -> Self {
        Member::Property(p)
    }
}

impl From<Function> for Member {
    fn from(f: Function) -> Self {
        Member::Function(f)
    }
}

impl From<Event> for Member {
    fn from(e: Event) -> Self {
        Member::Event(e)
    }
}

impl From<Callback> for Member {
    fn from(c: Callback) -> Self {
        Member::Callback(c)
    }
}

impl MemberKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberKind::Property => "Property",
            MemberKind::Function => "Function",
            MemberKind::Event => "Event",
            MemberKind::Callback => "Callback",
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Property {
    pub fn new(name: impl Into<String>, value_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            category: String::new(),
            value_type,
            security: PropertySecurity::default(),
            serialization: None,
            tags: Tags::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag);
        self
    }
}

impl Function {
    pub fn new(name: impl Into<String>, return_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            return_type,
            security: String::new(),
            tags: Tags::new(),
        }
    }

    pub fn with_parameter(mut self, ty: TypeRef, name: impl Into<String>) -> Self {
        self.parameters.push(Parameter::new(ty, name));
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag);
        self
    }
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            security: String::new(),
            tags: Tags::new(),
        }
    }

    pub fn with_parameter(mut self, ty: TypeRef, name: impl Into<String>) -> Self {
        self.parameters.push(Parameter::new(ty, name));
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag);
        self
    }
}

impl Callback {
    pub fn new(name: impl Into<String>, return_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            return_type,
            security: String::new(),
            tags: Tags::new(),
        }
    }

    pub fn with_parameter(mut self, ty: TypeRef, name: impl Into<String>) -> Self {
        self.parameters.push(Parameter::new(ty, name));
        self
    }
}

impl Parameter {
    pub fn new(ty: TypeRef, name: impl Into<String>) -> Self {
        Self {
            ty,
            name: name.into(),
            default: None,
        }
    }
}

impl TypeRef {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }

    /// A reference whose category is not known yet.
    pub fn uncategorized(name: impl Into<String>) -> Self {
        Self {
            category: String::new(),
            name: name.into(),
        }
    }

    pub fn is_categorized(&self) -> bool {
        !self.category.is_empty()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.category.is_empty() {
            write!(f, "?:{}", self.name)
        } else {
            write!(f, "{}:{}", self.category, self.name)
        }
    }
}

impl Enum {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            tags: Tags::new(),
        }
    }

    pub fn with_item(mut self, name: impl Into<String>, value: i64) -> Self {
        self.items.push(EnumItem::new(name, value));
        self
    }

    /// First item with the given name.
    pub fn item(&self, name: &str) -> Option<&EnumItem> {
        self.items.iter().find(|i| i.name == name)
    }
}

impl EnumItem {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
            tags: Tags::new(),
        }
    }
}
