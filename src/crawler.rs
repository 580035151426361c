use crate::errors::{Error, Result};
use crate::output::{self, OutputTarget};
use crate::page::{FetchMode, PageFetcher, PageSelectors, DEFAULT_BASE_URL, DEFAULT_COOKIE};
use crate::walker::TagWalker;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Number of walks running at the same time.
    pub concurrency: usize,
    /// Master seed; every walker's generator is derived from it.
    pub seed: u64,
    pub base_url: String,
    pub cookie: String,
    pub selectors: PageSelectors,
    /// Directory the temporary per-walk files are created under.
    pub work_root: PathBuf,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        CrawlerConfig {
            concurrency: 5,
            seed: 13,
            base_url: DEFAULT_BASE_URL.to_string(),
            cookie: DEFAULT_COOKIE.to_string(),
            selectors: PageSelectors::default(),
            work_root: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrawlSummary {
    pub seeds: usize,
    pub rows_written: usize,
    pub output: PathBuf,
    pub elapsed: Duration,
}

pub struct Crawler {
    config: CrawlerConfig,
    fetcher: PageFetcher,
}

impl Crawler {
    pub fn new(config: CrawlerConfig) -> Result<Self> {
        let fetcher = PageFetcher::new(&config.base_url, &config.cookie, &config.selectors)?;
        Ok(Crawler { config, fetcher })
    }

    /// Walks `steps` hops from every seed tag and writes the merged rows
    /// to `output`. With no seed tags, seeds come from the default feed.
    pub async fn run(&self, seed_tags: &[String], steps: usize, output: &OutputTarget) -> Result<CrawlSummary> {
        let start = Instant::now();
        let mut master = StdRng::seed_from_u64(self.config.seed);

        let addresses = self
            .resolve_seeds(seed_tags, &mut master)
            .await
            .iter()
            .map(|tag| self.fetcher.tag_address(tag))
            .collect::<Result<Vec<_>>>()?;
        let seeds = addresses.len();
        info!("Crawl for {} tags with {} pages per tag...", seeds, steps);

        let work_dir = tempfile::Builder::new()
            .prefix("TMP")
            .tempdir_in(&self.config.work_root)?;

        let mut jobs = Vec::with_capacity(seeds);
        for (index, address) in addresses.into_iter().enumerate() {
            let walker_seed: u64 = master.random();
            let fetcher = self.fetcher.clone();
            let path = work_dir.path().join(format!("tmp_{}.csv", index));

            jobs.push(async move {
                let result = TagWalker::new(fetcher, walker_seed).walk(&address, steps).await;
                output::write_csv(&path, &result.rows)?;
                debug!("Walk from {} wrote {} rows to {}", result.seed, result.rows.len(), path.display());
                Ok::<_, Error>(path)
            });
        }
        let intermediates = run_pool(jobs, self.config.concurrency).await?;

        let mut rows = Vec::new();
        for path in &intermediates {
            rows.extend(output::read_csv(path)?);
        }
        output.write(&rows)?;
        work_dir.close()?;

        let elapsed = start.elapsed();
        info!("Done in {:.2} seconds", elapsed.as_secs_f64());

        Ok(CrawlSummary {
            seeds,
            rows_written: rows.len(),
            output: output.path().to_path_buf(),
            elapsed,
        })
    }

    /// Tag paths to start walks from.
    async fn resolve_seeds(&self, seed_tags: &[String], rng: &mut StdRng) -> Vec<String> {
        if !seed_tags.is_empty() {
            return seed_tags
                .iter()
                .map(|tag| format!("/tag/{}", tag.trim_start_matches('#')))
                .collect();
        }

        let feed = match self.fetcher.feed_address() {
            Ok(feed) => feed,
            Err(e) => {
                warn!("No feed address for {}: {}", self.config.base_url, e);
                return Vec::new();
            }
        };
        let discovered = self
            .fetcher
            .fetch_or_empty(&feed, FetchMode::Discover, rng)
            .await
            .related_tags;
        if discovered.is_empty() {
            warn!("No seed tags discovered on {}", feed);
        }
        discovered
    }
}

/// Runs `jobs` with at most `width` in flight and returns their outputs in
/// job order. The first failure aborts every job still queued or running.
async fn run_pool<T, F>(jobs: Vec<F>, width: usize) -> Result<Vec<T>>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let permits = Arc::new(Semaphore::new(width.max(1)));
    let count = jobs.len();
    let mut tasks = JoinSet::new();

    for (index, job) in jobs.into_iter().enumerate() {
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| format!("worker pool closed: {}", e))?;
            job.await.map(|output| (index, output))
        });
    }

    let mut outputs: Vec<Option<T>> = (0..count).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        // returning early drops `tasks`, which aborts the rest
        let (index, output) = joined??;
        outputs[index] = Some(output);
    }
    Ok(outputs.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    #[test]
    fn test_default_config() {
        let config = CrawlerConfig::default();
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.seed, 13);
        assert_eq!(config.base_url, "https://www.tiktok.com");
    }

    #[test]
    fn test_bad_base_url_is_rejected() {
        let config = CrawlerConfig {
            base_url: "not a url".to_string(),
            ..CrawlerConfig::default()
        };
        assert!(Crawler::new(config).is_err());
    }

    type Job = Pin<Box<dyn Future<Output = Result<usize>> + Send>>;

    #[tokio::test]
    async fn test_pool_keeps_job_order() {
        let jobs: Vec<Job> = (0..5usize)
            .map(|i| -> Job {
                Box::pin(async move {
                    sleep(Duration::from_millis(((5 - i) * 10) as u64)).await;
                    Ok::<_, Error>(i)
                })
            })
            .collect();

        assert_eq!(run_pool(jobs, 3).await.unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_pool_bounds_jobs_in_flight() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let jobs: Vec<Job> = (0..8usize)
            .map(|i| -> Job {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                Box::pin(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, Error>(i)
                })
            })
            .collect();

        run_pool(jobs, 3).await.unwrap();

        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_pool_failure_aborts_other_jobs() {
        let finished = Arc::new(AtomicUsize::new(0));
        let mut jobs: Vec<Job> = vec![Box::pin(async { Err::<usize, Error>("walk failed".into()) })];
        for i in 1..4usize {
            let finished = Arc::clone(&finished);
            jobs.push(Box::pin(async move {
                sleep(Duration::from_millis(100)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(i)
            }));
        }

        assert!(run_pool(jobs, 4).await.is_err());
        sleep(Duration::from_millis(300)).await;

        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_supplied_tags_become_tag_paths() {
        let crawler = Crawler::new(CrawlerConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let seeds = crawler
            .resolve_seeds(&["dance".to_string(), "#comedy".to_string()], &mut rng)
            .await;

        assert_eq!(seeds, vec!["/tag/dance", "/tag/comedy"]);
    }
}
