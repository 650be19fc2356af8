//! Tools for deprecating, superseding, cloning, merging and exporting
//! Who's On First gazetteer records.

pub mod cli;
pub mod config;
pub mod edtf;
pub mod error;
pub mod export;
pub mod iterate;
pub mod logging;
pub mod merge;
pub mod ops;
pub mod output;
pub mod path;
pub mod pool;
pub mod query;
pub mod record;
pub mod relations;
pub mod store;
pub mod supersede;
pub mod update;

pub use error::{Error, Result};
pub use record::Record;
pub use relations::{merge_ids, Relation, RelationField};
pub use supersede::{Coordinator, Outcome};
