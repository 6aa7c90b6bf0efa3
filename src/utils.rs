//! Class-name helpers built on the shared [`ClassNameCache`](crate::cache::ClassNameCache).

use crate::cache::{with_class_cache, ClassNameCache};

/// Anything that may contribute a class-name fragment.
///
/// `None` and empty strings contribute nothing.
pub trait ClassFragment {
    fn fragment(&self) -> Option<&str>;
}

impl ClassFragment for str {
    fn fragment(&self) -> Option<&str> {
        (!self.is_empty()).then_some(self)
    }
}

impl ClassFragment for String {
    fn fragment(&self) -> Option<&str> {
        self.as_str().fragment()
    }
}

impl<T: ClassFragment + ?Sized> ClassFragment for &T {
    fn fragment(&self) -> Option<&str> {
        (**self).fragment()
    }
}

impl<T: ClassFragment> ClassFragment for Option<T> {
    fn fragment(&self) -> Option<&str> {
        self.as_ref().and_then(ClassFragment::fragment)
    }
}

/// Join fragments through the shared cache.
///
/// ```
/// use route_preload::utils::cn;
/// assert_eq!(cn(["btn", "", "btn-primary"]), "btn btn-primary");
/// ```
pub fn cn<I>(fragments: I) -> String
where
    I: IntoIterator,
    I::Item: ClassFragment,
{
    let items: Vec<I::Item> = fragments.into_iter().collect();
    let parts: Vec<Option<&str>> = items.iter().map(ClassFragment::fragment).collect();
    with_class_cache(|cache| cache.compute(&parts))
}

/// Join fragments of mixed types through the shared cache.
///
/// ```
/// use route_preload::cn;
/// let active = true;
/// assert_eq!(cn!("tab", active.then_some("tab-active"), None::<&str>), "tab tab-active");
/// ```
#[macro_export]
macro_rules! cn {
    ($($fragment:expr),* $(,)?) => {
        $crate::cache::with_class_cache(|cache| {
            cache.compute(&[$($crate::utils::ClassFragment::fragment(&$fragment)),*])
        })
    };
}

/// Accumulates class-name fragments before a single `build`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassNameBuilder {
    fragments: Vec<String>,
}

impl ClassNameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, fragment: impl ClassFragment) -> &mut Self {
        if let Some(f) = fragment.fragment() {
            self.fragments.push(f.to_string());
        }
        self
    }

    pub fn add_if(&mut self, condition: bool, fragment: impl ClassFragment) -> &mut Self {
        if condition {
            self.add(fragment);
        }
        self
    }

    pub fn add_if_else(
        &mut self,
        condition: bool,
        when_true: impl ClassFragment,
        when_false: impl ClassFragment,
    ) -> &mut Self {
        if condition {
            self.add(when_true)
        } else {
            self.add(when_false)
        }
    }

    pub fn add_many<I>(&mut self, fragments: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: ClassFragment,
    {
        for fragment in fragments {
            self.add(fragment);
        }
        self
    }

    /// Join through the shared cache.
    pub fn build(&self) -> String {
        with_class_cache(|cache| self.build_with(cache))
    }

    pub fn build_with(&self, cache: &mut ClassNameCache) -> String {
        let parts: Vec<Option<&str>> = self.fragments.iter().map(|f| Some(f.as_str())).collect();
        cache.compute(&parts)
    }

    pub fn reset(&mut self) -> &mut Self {
        self.fragments.clear();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_impls_treat_empty_as_absent() {
        assert_eq!("".fragment(), None);
        assert_eq!("a".fragment(), Some("a"));
        assert_eq!(String::new().fragment(), None);
        assert_eq!(None::<&str>.fragment(), None);
        assert_eq!(Some("x").fragment(), Some("x"));
        assert_eq!(Some(String::from("y")).fragment(), Some("y"));
    }

    #[test]
    fn cn_joins_through_shared_cache() {
        assert_eq!(cn(["flex", "", "gap-2"]), "flex gap-2");
        assert_eq!(cn([Some("a"), None, Some("b")]), "a b");
        assert_eq!(cn(Vec::<String>::new()), "");
    }

    #[test]
    fn macro_accepts_mixed_fragment_types() {
        let owned = String::from("rounded");
        let disabled = false;
        let result = crate::cn!("card", owned, disabled.then_some("opacity-50"), "");
        assert_eq!(result, "card rounded");
    }

    #[test]
    fn builder_conditionals() {
        let mut builder = ClassNameBuilder::new();
        builder
            .add("btn")
            .add_if(true, "btn-lg")
            .add_if(false, "hidden")
            .add_if_else(false, "on", "off")
            .add_many(["", "shadow", "ring"]);
        assert_eq!(builder.build(), "btn btn-lg off shadow ring");
    }

    #[test]
    fn builder_reset_chains() {
        let mut builder = ClassNameBuilder::new();
        builder.add("a").add("b");
        assert_eq!(builder.reset().add("c").build(), "c");
    }

    #[test]
    fn builder_build_with_uses_given_cache() {
        let mut cache = ClassNameCache::with_capacity(4);
        let mut builder = ClassNameBuilder::new();
        builder.add("x").add("y");
        assert_eq!(builder.build_with(&mut cache), "x y");
        assert_eq!(builder.build_with(&mut cache), "x y");
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn empty_builder_builds_empty_string() {
        let builder = ClassNameBuilder::new();
        assert!(builder.is_empty());
        assert_eq!(builder.build(), "");
    }
}
