use crate::models::PageContent;
use indexmap::IndexMap;
use serde_json::Value;

/// Build the composite `"<page_key>.<field_key>"` ledger key.
pub(crate) fn content_key(page_key: &str, field_key: &str) -> String {
    format!("{page_key}.{field_key}")
}

/// Split a composite key on its first `.`.
///
/// Page keys never contain dots; field keys may. Keys without a dot, or with
/// an empty side, are rejected.
pub(crate) fn split_content_key(key: &str) -> Option<(&str, &str)> {
    let (page_key, field_key) = key.split_once('.')?;
    if page_key.trim().is_empty() || field_key.is_empty() {
        None
    } else {
        Some((page_key, field_key))
    }
}

/// Uncommitted field edits keyed by composite key.
///
/// Last write wins per key. A key keeps the position of its first insert, so
/// pages are reconciled in the order they were first edited.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ChangeLedger {
    entries: IndexMap<String, Value>,
}

/// Ledger entries grouped by page, in first-edit order.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct PageBatch {
    pub pages: IndexMap<String, PageContent>,
    /// Keys that could not be split into page and field.
    pub malformed: Vec<String>,
}

impl ChangeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value that was replaced, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Pages with at least one well-formed entry, in first-edit order.
    pub fn page_keys(&self) -> Vec<String> {
        self.group_by_page().pages.into_keys().collect()
    }

    pub fn group_by_page(&self) -> PageBatch {
        let mut batch = PageBatch::default();
        for (key, value) in &self.entries {
            match split_content_key(key) {
                Some((page_key, field_key)) => {
                    batch
                        .pages
                        .entry(page_key.to_string())
                        .or_default()
                        .insert(field_key.to_string(), value.clone());
                }
                None => batch.malformed.push(key.clone()),
            }
        }
        batch
    }

    /// Remove entries that a save persisted.
    ///
    /// An entry goes only if its page is in `saved_pages` and its value is
    /// still the one captured in `snapshot`; edits made while the save was in
    /// flight survive for the next save. Malformed keys can never be saved
    /// and are dropped.
    pub fn remove_saved(&mut self, snapshot: &ChangeLedger, saved_pages: &[String]) {
        self.entries.retain(|key, value| {
            let Some((page_key, _)) = split_content_key(key) else {
                return false;
            };
            let page_saved = saved_pages.iter().any(|p| p == page_key);
            !(page_saved && snapshot.get(key) == Some(&*value))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_content_key_uses_first_dot() {
        assert_eq!(split_content_key("homepage.heroTitle"), Some(("homepage", "heroTitle")));
        assert_eq!(
            split_content_key("homepage.stats.first"),
            Some(("homepage", "stats.first"))
        );
        assert_eq!(split_content_key("homepage"), None);
        assert_eq!(split_content_key(".heroTitle"), None);
        assert_eq!(split_content_key("homepage."), None);
        assert_eq!(content_key("about", "title"), "about.title");
    }

    #[test]
    fn test_reinsert_overwrites_and_keeps_one_entry() {
        let mut ledger = ChangeLedger::new();
        assert!(ledger.insert("homepage.heroTitle", json!("First")).is_none());
        let replaced = ledger.insert("homepage.heroTitle", json!("Second"));

        assert_eq!(replaced, Some(json!("First")));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get("homepage.heroTitle"), Some(&json!("Second")));
    }

    #[test]
    fn test_group_by_page_keeps_first_edit_order() {
        let mut ledger = ChangeLedger::new();
        ledger.insert("homepage.heroTitle", json!("A"));
        ledger.insert("about.title", json!("B"));
        ledger.insert("homepage.stat1", json!("99,999+ Listings"));
        ledger.insert("homepage.heroTitle", json!("A2"));
        ledger.insert("broken", json!("x"));

        let batch = ledger.group_by_page();
        let pages: Vec<&str> = batch.pages.keys().map(|k| k.as_str()).collect();
        assert_eq!(pages, vec!["homepage", "about"]);
        assert_eq!(batch.pages["homepage"]["heroTitle"], json!("A2"));
        assert_eq!(batch.pages["homepage"]["stat1"], json!("99,999+ Listings"));
        assert_eq!(batch.pages["about"].len(), 1);
        assert_eq!(batch.malformed, vec!["broken".to_string()]);
    }

    #[test]
    fn test_remove_saved_keeps_unsaved_pages_and_newer_edits() {
        let mut ledger = ChangeLedger::new();
        ledger.insert("homepage.heroTitle", json!("A"));
        ledger.insert("homepage.stat1", json!("1"));
        ledger.insert("about.title", json!("B"));
        let snapshot = ledger.clone();

        // Edited again while the save was in flight.
        ledger.insert("homepage.stat1", json!("2"));

        ledger.remove_saved(&snapshot, &["homepage".to_string()]);

        assert_eq!(ledger.get("homepage.heroTitle"), None);
        assert_eq!(ledger.get("homepage.stat1"), Some(&json!("2")));
        assert_eq!(ledger.get("about.title"), Some(&json!("B")));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_remove_saved_drops_malformed_keys() {
        let mut ledger = ChangeLedger::new();
        ledger.insert("homepage.", json!("x"));
        ledger.insert("homepage.heroTitle", json!("A"));
        let snapshot = ledger.clone();

        ledger.remove_saved(&snapshot, &["homepage".to_string()]);

        assert!(ledger.is_empty());
    }

    #[test]
    fn test_page_keys_skip_malformed() {
        let mut ledger = ChangeLedger::new();
        ledger.insert("about.title", json!("B"));
        ledger.insert("broken", json!("x"));
        ledger.insert("homepage.stat1", json!("1"));
        ledger.insert("about.body", json!("C"));

        assert_eq!(ledger.page_keys(), vec!["about".to_string(), "homepage".to_string()]);
    }
}
