//! Authenticated web crawler
//!
//! Breadth-first traversal of same-origin links starting from the post-login
//! navigation menu. One coordinating loop owns the queue and visited-set; page
//! fetches for a BFS layer run concurrently under the client's in-flight cap.

pub mod extractor;

use crate::http::Session;
use crate::models::{PageRecord, ScanConfig};
use futures::stream::{self, StreamExt};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, warn};
use url::Url;

/// FIFO of (URL, depth) pairs. A URL is accepted at most once and never past `max_depth`.
#[derive(Debug)]
pub struct CrawlQueue {
    queue: VecDeque<(String, u32)>,
    visited: HashSet<String>,
    max_depth: u32,
}

impl CrawlQueue {
    pub fn new(max_depth: u32) -> Self {
        Self {
            queue: VecDeque::new(),
            visited: HashSet::new(),
            max_depth,
        }
    }

    /// Enqueues `url` unless it is too deep or was already accepted. Returns whether it was added.
    pub fn enqueue(&mut self, url: &str, depth: u32) -> bool {
        if depth > self.max_depth {
            return false;
        }
        if !self.visited.insert(normalize_url(url)) {
            return false;
        }
        self.queue.push_back((url.to_string(), depth));
        true
    }

    /// Dequeues every entry sharing the depth of the queue head
    pub fn next_layer(&mut self) -> Vec<(String, u32)> {
        let Some(&(_, depth)) = self.queue.front() else {
            return Vec::new();
        };
        let mut layer = Vec::new();
        while let Some((_, d)) = self.queue.front() {
            if *d != depth {
                break;
            }
            if let Some(entry) = self.queue.pop_front() {
                layer.push(entry);
            }
        }
        layer
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Number of distinct URLs ever accepted
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

/// BFS crawler bound to an authenticated session
pub struct Crawler<'a> {
    session: &'a Session,
    max_depth: u32,
    max_pages: usize,
    concurrency: usize,
}

impl<'a> Crawler<'a> {
    pub fn new(session: &'a Session, config: &ScanConfig) -> Self {
        Self {
            session,
            max_depth: config.max_depth,
            max_pages: config.max_pages.max(1),
            concurrency: config.concurrency.max(1),
        }
    }

    /// Crawls from `seeds` and returns one record per fetched page, in BFS order
    pub async fn crawl(&self, seeds: &[String]) -> Vec<PageRecord> {
        let origin = self.session.base_url().origin();
        let mut queue = CrawlQueue::new(self.max_depth);
        for seed in seeds {
            if extractor::is_logout_link(seed) {
                continue;
            }
            queue.enqueue(seed, 0);
        }

        let client = self.session.client();
        let mut pages: Vec<PageRecord> = Vec::new();

        while !queue.is_empty() && pages.len() < self.max_pages {
            let mut layer = queue.next_layer();
            layer.truncate(self.max_pages - pages.len());
            let fetched: Vec<_> = stream::iter(layer)
                .map(|(url, depth)| async move {
                    let result = client.get(&url).await;
                    (url, depth, result)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

            for (url, depth, result) in fetched {
                let response = match result {
                    Ok(r) => r,
                    Err(e) => {
                        debug!("Crawler failed to fetch {url}: {e}");
                        continue;
                    }
                };

                let page_url = match Url::parse(&url) {
                    Ok(u) => u,
                    Err(e) => {
                        warn!("Crawler skipping unparseable URL {url}: {e}");
                        continue;
                    }
                };

                let links = extractor::extract_links(&page_url, &response.body);
                let forms = extractor::extract_forms(&page_url, &response.body);

                for link in &links {
                    let same_origin = Url::parse(link)
                        .map(|l| l.origin() == origin)
                        .unwrap_or(false);
                    if same_origin {
                        queue.enqueue(link, depth + 1);
                    }
                }

                debug!(
                    "Crawled {url} (depth {depth}): {} links, {} forms",
                    links.len(),
                    forms.len()
                );
                pages.push(PageRecord { url, forms, links });

                if pages.len() >= self.max_pages {
                    info!("Crawler reached max page limit ({})", self.max_pages);
                    break;
                }
            }
        }

        info!(
            "Crawler finished: {} pages recorded, {} URLs seen",
            pages.len(),
            queue.visited_count()
        );
        pages
    }
}

/// Seeds the crawl from the landing page's navigation menu plus any configured
/// seeds on the target's origin. Falls back to the target URL when neither yields
/// anything.
pub async fn discover_seeds(session: &Session, config: &ScanConfig) -> Vec<String> {
    let mut seeds = Vec::new();
    let landing = session.base_url().clone();

    match session.client().get(landing.as_str()).await {
        Ok(response) => {
            let menu = extractor::extract_menu_links(
                &landing,
                &response.body,
                &config.endpoints.menu_selector,
            );
            info!("Found {} navigation menu links", menu.len());
            seeds.extend(menu);
        }
        Err(e) => warn!("Could not fetch landing page {landing}: {e}"),
    }

    for extra in &config.seeds {
        match session.resolve(extra) {
            Ok(url) => seeds.push(url),
            Err(e) => warn!("Ignoring invalid seed '{extra}': {e}"),
        }
    }

    let origin = landing.origin();
    seeds.retain(|seed| {
        let same_origin = Url::parse(seed)
            .map(|u| u.origin() == origin)
            .unwrap_or(false);
        if !same_origin {
            warn!("Ignoring seed outside the target origin: {seed}");
        }
        same_origin
    });

    if seeds.is_empty() {
        seeds.push(landing.to_string());
    }

    let mut seen = HashSet::new();
    seeds.retain(|s| seen.insert(normalize_url(s)));
    seeds
}

/// Normalizes a URL for deduplication (strips trailing slash, fragment)
fn normalize_url(url: &str) -> String {
    if let Ok(mut parsed) = Url::parse(url) {
        parsed.set_fragment(None);
        let mut result = parsed.to_string();
        if result.ends_with('/') && result.len() > 1 {
            result.pop();
        }
        result
    } else {
        url.to_string()
    }
}
