//! Search, filter and pagination over loaded lists.

use serde::{Deserialize, Serialize};

pub const MAX_PER_PAGE: u64 = 500;

/// Text fields a list search looks at.
pub trait Searchable {
    fn search_fields(&self) -> Vec<Option<&str>>;

    fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.search_fields()
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

pub fn search<T: Searchable>(items: Vec<T>, needle: Option<&str>) -> Vec<T> {
    match needle {
        Some(needle) => items.into_iter().filter(|item| item.matches(needle)).collect(),
        None => items,
    }
}

/// Applies the search term, then cuts out the requested 1-based page.
/// Without `per_page` everything lands on one page; an explicit `per_page`
/// is capped at [`MAX_PER_PAGE`].
pub fn list<T: Searchable>(items: Vec<T>, params: &ListParams) -> Listing<T> {
    let items = search(items, params.search.as_deref());
    paginate(items, params.page, params.per_page)
}

pub fn paginate<T>(items: Vec<T>, page: Option<u64>, per_page: Option<u64>) -> Listing<T> {
    let total = items.len() as u64;
    let per_page = match per_page {
        Some(n) => n.clamp(1, MAX_PER_PAGE),
        None => total.max(1),
    };
    let total_pages = total.div_ceil(per_page).max(1);
    let page = page.unwrap_or(1).clamp(1, total_pages);

    let start = ((page - 1) * per_page) as usize;
    let items = items
        .into_iter()
        .skip(start)
        .take(per_page as usize)
        .collect();

    Listing {
        items,
        total,
        page,
        per_page,
        total_pages,
    }
}
