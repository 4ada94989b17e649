//! Schema discovery.
//!
//! - `resolver`: decides which relations a request may see
//! - `assembler`: builds the catalog (columns, keys, join templates)
//! - `descriptions`: static, externally editable description table

pub mod assembler;
pub mod descriptions;
pub mod resolver;

pub use assembler::MetadataAssembler;
pub use descriptions::Descriptions;
pub use resolver::{AllowEntry, ResolvedRelations, ResolverPolicy, SchemaResolver};
