//! Fixture pages and mock server helpers shared by the integration tests.

use mockito::{Mock, Server, ServerGuard};
use tagwalk::{Crawler, CrawlerConfig};
use tempfile::TempDir;

/// Builds a tag page with the given related tag links and video cards.
#[allow(dead_code)]
pub fn tag_page(tags: &[&str], videos: &[(&str, &str)]) -> String {
    let links: String = tags
        .iter()
        .map(|tag| {
            format!(
                r#"<a class="tiktok-q3q1i1-StyledCommonLink ejg0rhn4" href="{}?lang=en">{}</a>"#,
                tag, tag
            )
        })
        .collect();
    let cards: String = videos
        .iter()
        .map(|(href, alt)| {
            format!(
                r#"<div class="tiktok-yz6ijl-DivWrapper e1cg0wnj1"><a href="{}"><img src="/thumb.jpg" alt="{}"></a></div>"#,
                href, alt
            )
        })
        .collect();
    format!(
        "<!DOCTYPE html><html><head><title>tags</title></head><body><div>{}</div><div>{}</div></body></html>",
        links, cards
    )
}

/// Three distinct videos attributed to the given topic.
#[allow(dead_code)]
pub fn videos(topic: &str) -> Vec<(String, String)> {
    (1..=3)
        .map(|i| {
            (
                format!("https://www.tiktok.com/@{}_user{}/video/{}", topic, i, i),
                format!("{} clip {}", topic, i),
            )
        })
        .collect()
}

#[allow(dead_code)]
pub fn as_refs(videos: &[(String, String)]) -> Vec<(&str, &str)> {
    videos.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect()
}

#[allow(dead_code)]
pub async fn html_mock(server: &mut ServerGuard, path: &str, html: &str) -> Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(html)
        .create_async()
        .await
}

/// Serves `html` for every GET.
#[allow(dead_code)]
pub async fn html_mock_any(server: &mut ServerGuard, html: &str) -> Mock {
    server
        .mock("GET", mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(html)
        .create_async()
        .await
}

#[allow(dead_code)]
pub async fn error_mock(server: &mut ServerGuard, path: &str, status: usize) -> Mock {
    server
        .mock("GET", path)
        .with_status(status)
        .with_body("Error")
        .create_async()
        .await
}

#[allow(dead_code)]
pub async fn setup_mock_server() -> ServerGuard {
    Server::new_async().await
}

/// Crawler pointed at the mock server, with temp files under `work_root`.
#[allow(dead_code)]
pub fn crawler_for(server: &ServerGuard, work_root: &TempDir) -> Crawler {
    Crawler::new(CrawlerConfig {
        concurrency: 2,
        base_url: server.url(),
        work_root: work_root.path().to_path_buf(),
        ..CrawlerConfig::default()
    })
    .unwrap()
}
