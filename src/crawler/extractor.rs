//! Link and form extraction from HTML

use crate::models::FormDescriptor;
use scraper::{Html, Selector};
use url::Url;

/// Links whose URL contains this (case-insensitive) end the session when visited
const LOGOUT_MARKER: &str = "logout";

/// True when following `url` would terminate the authenticated session
pub fn is_logout_link(url: &str) -> bool {
    url.to_lowercase().contains(LOGOUT_MARKER)
}

/// Extracts absolute `a[href]` targets in document order. Cross-origin links are kept,
/// logout links are dropped.
pub fn extract_links(page_url: &Url, html: &str) -> Vec<String> {
    select_links(page_url, html, "a[href]")
}

/// Extracts links matching a CSS selector (e.g. a navigation menu), logout excluded
pub fn extract_menu_links(page_url: &Url, html: &str, selector: &str) -> Vec<String> {
    select_links(page_url, html, selector)
}

fn select_links(page_url: &Url, html: &str, selector: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_url(page_url, href))
        .filter(|url| !is_logout_link(url))
        .collect()
}

/// Extracts every form with its resolved action, method and named fields
pub fn extract_forms(page_url: &Url, html: &str) -> Vec<FormDescriptor> {
    let document = Html::parse_document(html);
    let (Ok(form_selector), Ok(input_selector)) = (
        Selector::parse("form"),
        Selector::parse("input, textarea, select"),
    ) else {
        return Vec::new();
    };

    document
        .select(&form_selector)
        .map(|form| {
            let action = form
                .value()
                .attr("action")
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .and_then(|a| page_url.join(a).ok())
                .unwrap_or_else(|| page_url.clone());

            let method = match form.value().attr("method") {
                Some(m) if m.trim().eq_ignore_ascii_case("post") => "POST",
                _ => "GET",
            };

            let inputs = form
                .select(&input_selector)
                .filter_map(|input| input.value().attr("name"))
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();

            FormDescriptor {
                action: action.to_string(),
                method: method.to_string(),
                inputs,
            }
        })
        .collect()
}

/// Resolves a potentially relative URL against the page URL
fn resolve_url(base_url: &Url, raw: &str) -> Option<String> {
    let trimmed = raw.trim();

    if trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with("mailto:")
        || trimmed.starts_with("tel:")
        || trimmed.starts_with("javascript:")
        || trimmed.starts_with("data:")
    {
        return None;
    }

    let mut resolved = base_url.join(trimmed).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);

    Some(resolved.to_string())
}
