use std::fmt;

/// Produces the initial value of every object the pool allocates.
///
/// `Default` and `Clone` are only required where an initializer is created, not by the pool.
pub(crate) enum Initializer<T> {
    Default(fn() -> T),

    Prototype { prototype: T, clone: fn(&T) -> T },
}

impl<T> Initializer<T> {
    #[must_use]
    pub(crate) fn from_default() -> Self
    where
        T: Default,
    {
        Self::Default(T::default)
    }

    #[must_use]
    pub(crate) fn from_prototype(prototype: T) -> Self
    where
        T: Clone,
    {
        Self::Prototype {
            prototype,
            clone: T::clone,
        }
    }

    #[must_use]
    pub(crate) fn create(&self) -> T {
        match self {
            Self::Default(default) => default(),
            Self::Prototype { prototype, clone } => clone(prototype),
        }
    }

    #[must_use]
    pub(crate) fn prototype(&self) -> Option<&T> {
        match self {
            Self::Default(_) => None,
            Self::Prototype { prototype, .. } => Some(prototype),
        }
    }
}

impl<T> fmt::Debug for Initializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default(_) => f.write_str("Default"),
            Self::Prototype { .. } => f.write_str("Prototype"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_initializer_has_no_prototype() {
        let initializer = Initializer::<String>::from_default();

        assert_eq!(initializer.create(), "");
        assert!(initializer.prototype().is_none());
    }

    #[test]
    fn prototype_initializer_clones() {
        let initializer = Initializer::from_prototype(vec![1, 2, 3]);

        assert_eq!(initializer.create(), vec![1, 2, 3]);
        assert_eq!(initializer.create(), vec![1, 2, 3]);
        assert_eq!(initializer.prototype(), Some(&vec![1, 2, 3]));
    }
}
