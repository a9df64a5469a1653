//! Helpers shared by the resolver and the inferrer: Avro names, the generic
//! placeholder type, structural hashing, traversal and inlining.

pub mod generic;
pub mod hash;
pub mod inline;
pub mod names;
pub mod traversal;

pub use generic::*;
pub use hash::*;
pub use inline::*;
pub use names::*;
pub use traversal::*;
