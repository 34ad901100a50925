//! Identifier types.
//!
//! OMOP concept ids and codeset ids are signed 64-bit integers. The
//! hierarchy flattener uses `-1` as a virtual super-root, so ids are
//! kept signed.

/// An OMOP concept identifier.
///
/// # Examples
///
/// ```
/// use termhub_types::ConceptId;
///
/// let type_2_diabetes: ConceptId = 201826;
/// ```
pub type ConceptId = i64;

/// A concept set version identifier.
pub type CodesetId = i64;

/// Synthetic id seeding hierarchy traversal from a virtual super-root.
///
/// Never present in source data.
pub const PLACEHOLDER_ROOT: ConceptId = -1;
