use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global string interner for identifiers — fast comparisons, low memory.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Monotonic counter shared by all `fresh()` calls: ids handed out during a
/// session are never reused, even across identifier types.
fn next_serial() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Spur);

        impl $name {
            /// Intern a string, or return the existing key if already interned.
            pub fn intern(s: &str) -> Self {
                $name(INTERNER.get_or_intern(s))
            }

            /// Resolve back to a string slice.
            pub fn as_str(&self) -> &'static str {
                INTERNER.resolve(&self.0)
            }

            /// Generate a unique id with a prefix (e.g. `rectangle_7`).
            pub fn fresh(prefix: &str) -> Self {
                Self::intern(&format!("{prefix}_{}", next_serial()))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok($name::intern(&s))
            }
        }
    };
}

interned_id! {
    /// Stable identifier for a diagram element. Interned `Spur` — 4 bytes,
    /// Copy, Eq, Hash in O(1).
    ElementId
}

interned_id! {
    /// Stable identifier for a connection between two elements.
    ConnectionId
}

interned_id! {
    /// Identifier for an externally-owned layer.
    LayerId
}

interned_id! {
    /// Shape-type tag selecting rendering and sizing behavior via the
    /// shape registry. Unknown tags are legal and resolve to a fallback.
    ShapeTag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = ElementId::intern("login_box");
        let b = ElementId::intern("login_box");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "login_box");
    }

    #[test]
    fn fresh_ids_are_unique() {
        let a = ElementId::fresh("rectangle");
        let b = ElementId::fresh("rectangle");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("rectangle_"));
    }

    #[test]
    fn fresh_never_reuses_across_types() {
        let a = ElementId::fresh("x");
        let b = ConnectionId::fresh("x");
        assert_ne!(a.as_str(), b.as_str());
    }
}
