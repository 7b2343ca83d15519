//! Persistence of archived binlogs and of the collection cursor.

pub mod blob;
pub mod cursor;
