//! Sprig Bind - Populate typed values from selector matches
//!
//! Types describe their fields as selector bindings; a [`Binder`] runs those
//! selectors against a node graph and converts what they match.

pub mod binder;
pub mod error;
pub mod value;

pub use binder::{Bindable, Binder, BindingKind, Cardinality, FieldBinding};
pub use error::{BindError, BindResult, ValueError};
pub use value::{read_as, JsonValueReader, ValueReader};
