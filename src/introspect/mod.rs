// Sat Oct 17 2026 - Alex

pub mod classifier;
pub mod error;
pub mod introspector;
pub mod record;
pub mod verdict;

pub use classifier::PointerClassifier;
pub use error::IntrospectError;
pub use introspector::{Introspector, IntrospectorBuilder};
pub use record::{AncestorFailure, FieldRecord, FieldReport, FieldValue, MethodRecord};
pub use verdict::{ObjectVerdict, Rejection};
