#![doc = include_str!("../README.md")]

mod query;
mod types;

pub mod v1 {
    //! Versioned public API for snapshot types and queries.
    //!
    //! # Snapshot tree
    //!
    //! - [`Snapshot`]: one build's classes and enums, with the JSON codec
    //! - [`Class`]: name, superclass, memory category, members, tags
    //! - [`Member`]: a [`Property`], [`Function`], [`Event`], or [`Callback`]
    //! - [`Enum`] and [`EnumItem`]
    //!
    //! # Leaf values
    //!
    //! - [`TypeRef`]: `(category, name)`; an empty category is unresolved
    //! - [`Parameter`]: typed, named, optionally defaulted argument
    //! - [`PropertySecurity`], [`Serialization`]: property classifiers and flags
    //! - [`Tags`]: ordered tag set
    //!
    //! # Example: find what still needs a category
    //!
    //! ```
    //! use apihist::v1::*;
    //!
    //! let snapshot = Snapshot::new().with_class(
    //!     Class::new("Workspace").with_member(
    //!         Function::new("Raycast", TypeRef::uncategorized("RaycastResult"))
    //!             .with_parameter(TypeRef::new("DataType", "Vector3"), "origin"),
    //!     ),
    //! );
    //!
    //! let open = query::uncategorized_types(&snapshot);
    //! assert_eq!(open.len(), 1);
    //! assert_eq!(open[0].0, "Workspace.Raycast");
    //! assert_eq!(open[0].1.name, "RaycastResult");
    //! ```

    /// Traversal and duplicate detection over a [`Snapshot`].
    pub mod query {
        pub use crate::query::{
            Duplicate, Scope, duplicates, entity_counts, member_types, uncategorized_types,
            visit_types,
        };
    }
    pub use crate::types::{
        Callback, Class, Enum, EnumItem, Event, Function, Member, MemberKind, Parameter,
        Property, PropertySecurity, SCHEMA_VERSION, Serialization, Snapshot, Tags, TypeRef,
    };
}
