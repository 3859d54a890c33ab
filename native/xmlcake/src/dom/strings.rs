//! String interning for names, attribute values and character data
//!
//! Id 0 is the empty string. The pool only grows, so an id handed out once
//! stays valid for the life of the document, including for nodes created
//! after parsing.

use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
pub struct StringPool {
    strings: Vec<Arc<str>>,
    ids: HashMap<Arc<str>, u32>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StringPool {
    pub fn new() -> Self {
        let empty: Arc<str> = Arc::from("");
        StringPool {
            strings: vec![Arc::clone(&empty)],
            ids: HashMap::from([(empty, 0)]),
        }
    }

    /// Id of `s`, adding it if it is new
    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.ids.get(s) {
            return id;
        }
        let id = self.strings.len() as u32;
        let shared: Arc<str> = Arc::from(s);
        self.strings.push(Arc::clone(&shared));
        self.ids.insert(shared, id);
        id
    }

    /// Intern reader output; invalid UTF-8 is replaced lossily
    pub fn intern_bytes(&mut self, bytes: &[u8]) -> u32 {
        self.intern(&String::from_utf8_lossy(bytes))
    }

    pub fn get(&self, id: u32) -> Option<&str> {
        self.strings.get(id as usize).map(|s| &**s)
    }

    /// Id of an already interned string, without inserting
    pub fn lookup(&self, s: &str) -> Option<u32> {
        self.ids.get(s).copied()
    }

    /// Distinct strings held, the empty string included
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedupes() {
        let mut pool = StringPool::new();
        let a = pool.intern("hello");
        assert_eq!(pool.intern_bytes(b"hello"), a);
        assert_ne!(pool.intern("world"), a);
        assert_eq!(pool.get(a), Some("hello"));
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_empty_string_is_reserved() {
        let mut pool = StringPool::new();
        assert!(pool.is_empty());
        assert_eq!(pool.intern(""), 0);
        assert_eq!(pool.get(0), Some(""));
        assert_eq!(pool.get(99), None);
    }

    #[test]
    fn test_lookup_does_not_insert() {
        let mut pool = StringPool::new();
        let id = pool.intern("name");
        assert_eq!(pool.lookup("name"), Some(id));
        assert_eq!(pool.lookup("missing"), None);
        assert_eq!(pool.len(), 2);
    }
}
