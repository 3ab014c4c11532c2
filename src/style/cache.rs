//! The style interning table.
//!
//! One cache lives for the duration of a rendering session and is passed
//! explicitly to everything that creates styles. Entries are never evicted.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use super::{Style, StyleData};

#[derive(Debug, Default)]
pub struct StyleCache {
    interned: RefCell<HashSet<Rc<StyleData>>>,
}

impl StyleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The root style: every property at its initial value, nothing set.
    pub fn default_style(&self) -> Style {
        self.intern(StyleData::default())
    }

    /// Return the shared style equal to `data`, inserting it on first sight.
    pub fn intern(&self, data: StyleData) -> Style {
        let mut interned = self.interned.borrow_mut();
        if let Some(existing) = interned.get(&data) {
            return Style::from_interned(Rc::clone(existing));
        }
        let shared = Rc::new(data);
        interned.insert(Rc::clone(&shared));
        Style::from_interned(shared)
    }

    /// Number of distinct styles seen so far.
    pub fn len(&self) -> usize {
        self.interned.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.interned.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Declaration;

    #[test]
    fn default_style_is_shared() {
        let cache = StyleCache::new();
        assert_eq!(cache.default_style(), cache.default_style());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_values_get_distinct_entries() {
        let cache = StyleCache::new();
        let base = cache.default_style();
        base.set(&cache, &[Declaration::FontSize(10.0)]);
        base.set(&cache, &[Declaration::FontSize(11.0)]);
        base.set(&cache, &[Declaration::FontSize(10.0)]);
        assert_eq!(cache.len(), 3);
    }
}
