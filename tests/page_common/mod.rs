//! Shared fixtures for the page loading tests

use pageimg::{CacheBackend, Config};
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config pointing the sqlite backend into `dir`
pub fn sqlite_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.cache.backend = CacheBackend::Sqlite;
    config.cache.database_path = dir.join("cache.db");
    config
}

/// Serve `body` as a PNG at `route`, expecting exactly `hits` requests
pub async fn mount_png(server: &MockServer, route: &str, body: &[u8], hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body.to_vec())
                .insert_header("content-type", "image/png"),
        )
        .expect(hits)
        .mount(server)
        .await;
}

/// A page with two marked images sharing one URL, one other marked image
/// and one plain image
pub fn wedding_page() -> &'static str {
    r#"
    <section id="gallery">
      <img id="cover" data-src="/img/cover.png" alt="cover">
      <img id="logo" src="/static/logo.svg">
      <img id="groom" data-src='/img/groom.png'>
      <img id="cover-again" data-src="/img/cover.png">
    </section>
    "#
}
