mod base;
mod collector;
mod extractor;
mod source;
mod storage;

pub use base::*;
pub use collector::*;
pub use extractor::*;
pub use source::*;
pub use storage::*;
