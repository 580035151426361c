//! Tag page retrieval and extraction.
//!
//! A tag page carries two things we care about: links to related tags,
//! which drive the walk, and content cards, which become output rows.

use crate::errors::{ErrorKind, Result};
use log::{debug, error};
use rand::seq::IndexedRandom;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, REFERER, USER_AGENT};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use std::sync::Arc;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.tiktok.com";

/// Path of the platform's default feed, used to discover seed tags.
pub const FEED_PATH: &str = "/foryou";

pub const DEFAULT_COOKIE: &str = "prov=6bb44cc9-dfe4-1b95-a65d-5250b3b4c9fb; _ga=GA1.2.1363624981.1550767314; __qca=P0-1074700243-1550767314392; notice-ctt=4%3B1550784035760; _gid=GA1.2.1415061800.1552935051; acct=t=4CnQ70qSwPMzOe6jigQlAR28TSW%2fMxzx&s=32zlYt1%2b3TBwWVaCHxH%2bl5aDhLjmq4Xr";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/72.0.3626.121 Safari/537.36";
const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8";
const BROWSER_REFERER: &str = "https://www.google.com/";
const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9,";

/// CSS selectors for the two element classes a tag page is mined for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelectors {
    pub tag_link: String,
    pub card: String,
}

impl Default for PageSelectors {
    fn default() -> Self {
        PageSelectors {
            tag_link: "a.tiktok-q3q1i1-StyledCommonLink.ejg0rhn4".to_string(),
            card: "div.tiktok-yz6ijl-DivWrapper.e1cg0wnj1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Only collect related tags (seed discovery from the default feed).
    Discover,
    /// Collect content cards and pick the next tag to visit.
    Walk,
}

/// One visible video on a tag page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub username: String,
    pub video_url: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPage {
    /// Distinct tag paths linked from the page, sorted.
    pub related_tags: Vec<String>,
    pub cards: Vec<Card>,
    pub next_tag: Option<String>,
}

/// Compiled selectors plus the extraction rules applied to a fetched page.
pub struct PageParser {
    tag_link: Selector,
    card: Selector,
    anchor: Selector,
    image: Selector,
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| {
        ErrorKind::InvalidSelector(selector.to_string(), format!("{:?}", e)).into()
    })
}

impl PageParser {
    pub fn new(selectors: &PageSelectors) -> Result<Self> {
        Ok(PageParser {
            tag_link: compile(&selectors.tag_link)?,
            card: compile(&selectors.card)?,
            anchor: compile("a")?,
            image: compile("img")?,
        })
    }

    pub fn parse<R>(&self, html: &str, page_url: &Url, mode: FetchMode, rng: &mut R) -> Result<TagPage>
    where
        R: Rng + ?Sized,
    {
        let document = Html::parse_document(html);
        let related_tags = self.related_tags(&document, page_url);

        if mode == FetchMode::Discover {
            return Ok(TagPage {
                related_tags,
                ..TagPage::default()
            });
        }

        let cards = document
            .select(&self.card)
            .map(|card| self.parse_card(card, page_url))
            .collect::<Result<Vec<_>>>()?;
        let next_tag = related_tags.choose(rng).cloned();

        Ok(TagPage {
            related_tags,
            cards,
            next_tag,
        })
    }

    fn related_tags(&self, document: &Html, page_url: &Url) -> Vec<String> {
        let own_path = page_url.path().to_lowercase();

        document
            .select(&self.tag_link)
            .filter_map(|link| link.value().attr("href"))
            .filter_map(|href| page_url.join(href).ok())
            .map(|url| url.path().to_string())
            .filter(|path| path.contains("/tag") && path.to_lowercase() != own_path)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn parse_card(&self, card: ElementRef, page_url: &Url) -> Result<Card> {
        let href = card
            .select(&self.anchor)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| ErrorKind::MalformedCard(page_url.to_string(), "video link"))?;
        let description = card
            .select(&self.image)
            .next()
            .and_then(|img| img.value().attr("alt"))
            .ok_or_else(|| ErrorKind::MalformedCard(page_url.to_string(), "image description"))?;

        let video_url = page_url.join(href)?;
        let username = video_url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .unwrap_or_default()
            .to_string();

        Ok(Card {
            username,
            video_url: video_url.to_string(),
            description: description.to_string(),
        })
    }
}

/// HTTP side of the page fetcher. Cheap to clone; clones share the
/// connection pool and compiled selectors.
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
    parser: Arc<PageParser>,
    base_url: Url,
}

impl PageFetcher {
    pub fn new(base_url: &str, cookie: &str, selectors: &PageSelectors) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
        headers.insert(REFERER, HeaderValue::from_static(BROWSER_REFERER));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE));
        headers.insert(
            COOKIE,
            HeaderValue::from_str(cookie).map_err(|e| format!("invalid cookie header: {}", e))?,
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(PageFetcher {
            client,
            parser: Arc::new(PageParser::new(selectors)?),
            base_url: Url::parse(base_url)?,
        })
    }

    /// Absolute address of a tag path such as `/tag/dance`.
    pub fn tag_address(&self, tag: &str) -> Result<String> {
        let path = tag.split('?').next().unwrap_or(tag);
        Ok(self.base_url.join(path)?.to_string())
    }

    pub fn feed_address(&self) -> Result<String> {
        self.tag_address(FEED_PATH)
    }

    pub async fn fetch<R>(&self, address: &str, mode: FetchMode, rng: &mut R) -> Result<TagPage>
    where
        R: Rng + ?Sized,
    {
        let page_url = Url::parse(address)?;
        debug!("Fetching {} ({:?})", address, mode);

        let response = self.client.get(page_url.clone()).send().await?.error_for_status()?;
        let html = response.text().await?;

        self.parser.parse(&html, &page_url, mode, rng)
    }

    /// Like [`fetch`](Self::fetch), but a failure is logged and turned
    /// into an empty page.
    pub async fn fetch_or_empty<R>(&self, address: &str, mode: FetchMode, rng: &mut R) -> TagPage
    where
        R: Rng + ?Sized,
    {
        match self.fetch(address, mode, rng).await {
            Ok(page) => page,
            Err(e) => {
                error!("Couldn't crawl links for URL {}: {}", address, e);
                TagPage::default()
            }
        }
    }
}

/// Topic label for a page: its trailing path segment, query removed and
/// percent-decoded.
pub fn topic_from_address(address: &str) -> String {
    let without_query = address
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or(address);
    let segment = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    String::from_utf8_lossy(&urlencoding::decode_binary(segment.as_bytes())).into_owned()
}
