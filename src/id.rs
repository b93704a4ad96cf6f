//! Object identifiers.
//!
//! Nodes, pins and links live in separate identifier spaces. Each space is a
//! distinct newtype over an application supplied key `K`, so a `PinId<u64>`
//! can never be passed where a `NodeId<u64>` is expected.
//!
//! The engine only relies on the [`ObjectKey`] contract: equality, ordering,
//! hashing, a distinguished invalid value and a canonical string round-trip
//! used by the settings bridge. Native integers and `String` implement it out
//! of the box; composite keys implement it themselves:
//!
//! ```
//! use blueprint_canvas::ObjectKey;
//!
//! #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
//! struct PortKey {
//!     node: String,
//!     index: u32,
//! }
//!
//! impl ObjectKey for PortKey {
//!     fn invalid() -> Self {
//!         PortKey { node: String::new(), index: 0 }
//!     }
//!
//!     fn to_canonical(&self) -> String {
//!         format!("{}/{}", self.node, self.index)
//!     }
//!
//!     fn from_canonical(text: &str) -> Option<Self> {
//!         let (node, index) = text.rsplit_once('/')?;
//!         Some(PortKey { node: node.to_owned(), index: index.parse().ok()? })
//!     }
//! }
//! ```

use std::fmt;
use std::hash::Hash;

/// Contract every identifier key has to fulfil.
pub trait ObjectKey: Clone + Eq + Ord + Hash + fmt::Debug + 'static {
    /// The sentinel that never names an object.
    fn invalid() -> Self;

    /// Canonical textual form, stable across sessions.
    fn to_canonical(&self) -> String;

    /// Inverse of [`to_canonical`](Self::to_canonical). Returns `None` for
    /// text that does not name a key.
    fn from_canonical(text: &str) -> Option<Self>;

    fn is_valid(&self) -> bool {
        *self != Self::invalid()
    }
}

macro_rules! integer_keys {
    ($($ty:ty),*) => {
        $(
            impl ObjectKey for $ty {
                fn invalid() -> Self {
                    0
                }

                fn to_canonical(&self) -> String {
                    self.to_string()
                }

                fn from_canonical(text: &str) -> Option<Self> {
                    text.trim().parse().ok()
                }
            }
        )*
    };
}

integer_keys!(u32, u64, usize, i32, i64);

impl ObjectKey for String {
    fn invalid() -> Self {
        String::new()
    }

    fn to_canonical(&self) -> String {
        self.clone()
    }

    fn from_canonical(text: &str) -> Option<Self> {
        if text.is_empty() {
            None
        } else {
            Some(text.to_owned())
        }
    }
}

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name<K = u64>(pub K);

        impl<K: ObjectKey> $name<K> {
            pub const KIND: &'static str = $label;

            pub fn new(key: K) -> Self {
                Self(key)
            }

            /// The invalid sentinel for this identifier space.
            pub fn invalid() -> Self {
                Self(K::invalid())
            }

            pub fn is_valid(&self) -> bool {
                self.0.is_valid()
            }

            pub fn key(&self) -> &K {
                &self.0
            }

            /// Canonical string form used as the persistence key.
            pub fn as_string(&self) -> String {
                self.0.to_canonical()
            }

            pub fn from_string(text: &str) -> Option<Self> {
                K::from_canonical(text).map(Self)
            }
        }

        impl<K: fmt::Debug> fmt::Debug for $name<K> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", $label, self.0)
            }
        }

        impl<K> From<K> for $name<K> {
            fn from(key: K) -> Self {
                Self(key)
            }
        }
    };
}

object_id!(
    /// Identifies a node.
    NodeId,
    "node"
);
object_id!(
    /// Identifies a pin. Pin ids are unique across the whole editor, not per node.
    PinId,
    "pin"
);
object_id!(
    /// Identifies a link.
    LinkId,
    "link"
);

/// Direction of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinKind {
    Input,
    Output,
}
