use crate::output::Row;
use crate::page::{topic_from_address, FetchMode, PageFetcher};
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

/// Rows gathered by one walk, unique by video URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkResult {
    pub seed: String,
    pub rows: Vec<Row>,
    pub pages_visited: usize,
}

impl WalkResult {
    /// Drops every row whose video URL was already seen, keeping the first.
    pub fn dedup_by_video_url(&mut self) {
        let mut seen = HashSet::new();
        self.rows.retain(|row| seen.insert(row.video_url.clone()));
    }
}

/// Random walk over the tag graph starting from one seed page.
pub struct TagWalker {
    fetcher: PageFetcher,
    rng: StdRng,
}

impl TagWalker {
    pub fn new(fetcher: PageFetcher, seed: u64) -> Self {
        TagWalker {
            fetcher,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Visits `seed_address` then follows up to `steps` randomly chosen
    /// related tags. Fetch failures end the walk; they are never returned.
    pub async fn walk(&mut self, seed_address: &str, steps: usize) -> WalkResult {
        let mut result = WalkResult {
            seed: seed_address.to_string(),
            ..WalkResult::default()
        };

        let mut next_tag = self.visit(seed_address, &mut result).await;
        for step in 0..steps {
            let tag = match next_tag.take() {
                Some(tag) => tag,
                None => {
                    debug!("Walk from {} stopped after {} of {} steps", seed_address, step, steps);
                    break;
                }
            };
            let address = match self.fetcher.tag_address(&tag) {
                Ok(address) => address,
                Err(e) => {
                    error!("Couldn't build address for tag {}: {}", tag, e);
                    break;
                }
            };
            next_tag = self.visit(&address, &mut result).await;
        }

        let collected = result.rows.len();
        result.dedup_by_video_url();
        info!(
            "Walk from {} visited {} pages, kept {} of {} rows",
            seed_address,
            result.pages_visited,
            result.rows.len(),
            collected
        );
        result
    }

    async fn visit(&mut self, address: &str, result: &mut WalkResult) -> Option<String> {
        match self.fetcher.fetch(address, FetchMode::Walk, &mut self.rng).await {
            Ok(page) => {
                let topic = topic_from_address(address);
                result.pages_visited += 1;
                result
                    .rows
                    .extend(page.cards.into_iter().map(|card| Row::from_card(card, &topic)));
                page.next_tag
            }
            Err(e) => {
                error!("Couldn't crawl links for URL {}: {}", address, e);
                None
            }
        }
    }
}
