//! abt-model
//!
//! In-memory entity model shared by the declared side (YAML document) and the
//! deployment side (remote listing calls).
//!
//! - Three entity kinds: [`Source`], [`Destination`], [`Link`].
//! - Identity is `(id, name)`: an id match wins, otherwise an exact,
//!   case-sensitive name match.
//! - Both sides convert through the same `from_record` functions, so identity
//!   comparison never depends on where an entity came from.
//!
//! Pure data + lookups. No IO.

mod collection;
mod record;
mod types;

pub use collection::{identity_matches, resolve_id_by_name, EntityCollection, EntitySet};
pub use record::{DestinationRecord, LinkRecord, SourceRecord, TypeRecord};
pub use types::*;
