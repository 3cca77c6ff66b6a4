//! Pure formatting and aggregation helpers used by the page loaders.
//!
//! None of these fail: malformed input degrades to `0` or an empty value.

use crate::pokemon::ChainLink;
use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_WINDOW: u32 = 5;

static TRAILING_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)/$").expect("trailing id pattern is valid"));

/// Numeric id at the end of a resource URL such as
/// `https://pokeapi.co/api/v2/pokemon/25/`. Returns 0 when there is none.
pub fn extract_id(url: &str) -> u32 {
    TRAILING_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
        .unwrap_or(0)
}

/// `"mr-mime"` -> `"Mr Mime"`.
pub fn title_case(name: &str) -> String {
    name.split('-')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Species names of an evolution tree in pre-order, siblings in the order
/// the API returned them.
pub fn flatten_chain(root: &ChainLink) -> Vec<String> {
    let mut names = Vec::new();
    let mut stack = vec![root];
    while let Some(link) = stack.pop() {
        names.push(link.species.name.clone());
        stack.extend(link.evolves_to.iter().rev());
    }
    names
}

pub fn total_pages(count: u32, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

/// Page numbers to render as links around `current_page`.
///
/// The window is pinned to the first pages while the current page is
/// within half a window of the start, pinned to the last pages near the
/// end, and centered otherwise.
pub fn pagination_window(current_page: u32, total_pages: u32, window_size: u32) -> Vec<u32> {
    if total_pages <= window_size {
        return (1..=total_pages).collect();
    }
    let half = window_size / 2;
    let first = if current_page <= half + 1 {
        1
    } else if current_page >= total_pages - half {
        total_pages - window_size + 1
    } else {
        current_page - half
    };
    (first..first + window_size).collect()
}

pub fn artwork_url(sprite_base_url: &str, id: u32) -> String {
    format!("{}/{}.png", sprite_base_url.trim_end_matches('/'), id)
}

pub fn dex_number(id: u32) -> String {
    format!("#{:03}", id)
}

/// Share of the 255 stat ceiling, capped at 100.
pub fn stat_percentage(base_stat: u32) -> f64 {
    (base_stat as f64 / 255.0 * 100.0).min(100.0)
}
