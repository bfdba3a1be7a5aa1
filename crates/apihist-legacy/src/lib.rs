#![doc = include_str!("../README.md")]

pub mod error;
pub mod materialize;
pub mod reader;
pub mod types;

pub use error::{ParseError, Result};
pub use materialize::{YIELDS_TAG, materialize};
pub use reader::{parse, parse_str};
pub use types::{
    LegacyClass, LegacyDump, LegacyEnum, LegacyEnumItem, LegacyMember, LegacyMemberKind,
    LegacyParameter,
};

/// Parse legacy dump bytes and materialize them in one step.
///
/// # Example
///
/// ```rust
/// let text = "Class Instance\n\tProperty bool Instance.Archivable\n";
/// let snapshot = apihist_legacy::read_snapshot(text.as_bytes())?;
/// assert_eq!(snapshot.classes[0].members.len(), 1);
/// # Ok::<(), apihist_legacy::ParseError>(())
/// ```
pub fn read_snapshot(bytes: &[u8]) -> Result<apihist::v1::Snapshot> {
    Ok(materialize(&parse(bytes)?))
}
