pub(crate) fn now_ms() -> i64 {
    js_sys::Date::now().round() as i64
}

/// Display title for a page, derived from its key: `"homepage"` -> `"Homepage"`.
pub(crate) fn page_title_from_key(page_key: &str) -> String {
    let mut chars = page_key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `["Homepage"]` -> `"Homepage"`, `["A", "B", "C"]` -> `"A, B and C"`.
pub(crate) fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_title_from_key() {
        assert_eq!(page_title_from_key("homepage"), "Homepage");
        assert_eq!(page_title_from_key("about-us"), "About-us");
        assert_eq!(page_title_from_key("Faq"), "Faq");
        assert_eq!(page_title_from_key("école"), "École");
        assert_eq!(page_title_from_key(""), "");
    }

    #[test]
    fn test_join_names() {
        assert_eq!(join_names(&[]), "");
        assert_eq!(join_names(&["Homepage".to_string()]), "Homepage");
        assert_eq!(
            join_names(&["Homepage".to_string(), "About".to_string()]),
            "Homepage and About"
        );
        assert_eq!(
            join_names(&["A".to_string(), "B".to_string(), "C".to_string()]),
            "A, B and C"
        );
    }
}
