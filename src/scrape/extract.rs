// src/scrape/extract.rs
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::app::data::MovieRecord;
use crate::error::FetchError;

static POSTER_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.poster.js_item").expect("poster selector"));
static TITLE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.poster__title").expect("title selector"));
static ART_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.poster__art").expect("art selector"));

// background-image: url("..."), url('...') or url(...)
static STYLE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"url\(\s*(?:"([^"]*)"|'([^']*)'|([^)\s]*))\s*\)"#).expect("style url pattern")
});

/// Pull `(title, poster_url)` pairs out of a rendered profile list.
///
/// Cards without a title or art element are skipped. An art element whose
/// style carries no `url(...)` means the markup changed under us and the
/// whole page is rejected. Repeated cards (scroll re-renders) collapse to
/// their first occurrence.
pub fn extract_movies(html: &str) -> Result<Vec<MovieRecord>, FetchError> {
    let doc = Html::parse_document(html);

    let mut found = Vec::new();
    let mut cards = 0usize;
    for card in doc.select(&POSTER_SEL) {
        cards += 1;
        if let Some(record) = movie_from_card(card)? {
            found.push(record);
        }
    }

    let movies: Vec<MovieRecord> = found.into_iter().unique().collect();
    debug!("extracted {} movies from {} poster cards", movies.len(), cards);
    Ok(movies)
}

fn movie_from_card(card: ElementRef<'_>) -> Result<Option<MovieRecord>, FetchError> {
    let (Some(title_el), Some(art_el)) = (
        card.select(&TITLE_SEL).next(),
        card.select(&ART_SEL).next(),
    ) else {
        return Ok(None);
    };

    let title = title_el.text().collect::<String>().trim().to_string();
    let style = art_el.value().attr("style").unwrap_or_default();
    let poster_url = style_background_url(style).ok_or_else(|| {
        FetchError::Parse(format!("poster art for `{title}` has no background url"))
    })?;

    Ok(Some(MovieRecord::new(title, poster_url)))
}

/// First `url(...)` in an inline style, quotes stripped.
pub fn style_background_url(style: &str) -> Option<String> {
    let caps = STYLE_URL.captures(style)?;
    (1..=3)
        .filter_map(|i| caps.get(i))
        .map(|m| m.as_str().trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{extract_movies, style_background_url};
    use crate::app::data::MovieRecord;
    use crate::error::FetchError;

    fn card(title: &str, url: &str) -> String {
        format!(
            r#"<a class="poster js_item" href="/m/1">
                 <div class="poster__art" style="background-image: url(&quot;{url}&quot;);"></div>
                 <div class="poster__title"> {title} </div>
               </a>"#
        )
    }

    fn page(cards: &[String]) -> String {
        format!("<html><body><div class=\"profile\">{}</div></body></html>", cards.join("\n"))
    }

    #[test]
    fn identical_cards_collapse_to_one_record() {
        let html = page(&[
            card("Dune", "http://x/1.jpg"),
            card("Dune", "http://x/1.jpg"),
            card("Arrival", "http://x/2.jpg"),
        ]);
        let movies = extract_movies(&html).unwrap();
        assert_eq!(
            movies,
            vec![
                MovieRecord::new("Dune", "http://x/1.jpg"),
                MovieRecord::new("Arrival", "http://x/2.jpg"),
            ]
        );
    }

    #[test]
    fn same_title_different_poster_is_kept() {
        let html = page(&[card("Dune", "http://x/1.jpg"), card("Dune", "http://x/9.jpg")]);
        assert_eq!(extract_movies(&html).unwrap().len(), 2);
    }

    #[test]
    fn cards_missing_parts_are_skipped() {
        let html = page(&[
            r#"<a class="poster js_item"><div class="poster__title">No art</div></a>"#.to_string(),
            r#"<a class="poster js_item"><div class="poster__art" style="url('http://x/3.jpg')"></div></a>"#
                .to_string(),
            card("Heat", "http://x/4.jpg"),
        ]);
        let movies = extract_movies(&html).unwrap();
        assert_eq!(movies, vec![MovieRecord::new("Heat", "http://x/4.jpg")]);
    }

    #[test]
    fn page_without_cards_is_empty_not_an_error() {
        let movies = extract_movies("<html><body><p>private profile</p></body></html>").unwrap();
        assert!(movies.is_empty());
    }

    #[test]
    fn art_without_url_rejects_the_page() {
        let html = page(&[
            r#"<a class="poster js_item"><div class="poster__art" style="color: red"></div><div class="poster__title">Odd</div></a>"#
                .to_string(),
        ]);
        assert!(matches!(extract_movies(&html), Err(FetchError::Parse(_))));
    }

    #[test]
    fn style_url_accepts_all_quote_styles() {
        assert_eq!(
            style_background_url(r#"background-image: url("http://a/1.jpg");"#).as_deref(),
            Some("http://a/1.jpg")
        );
        assert_eq!(
            style_background_url("background: url('http://a/2.jpg') no-repeat").as_deref(),
            Some("http://a/2.jpg")
        );
        assert_eq!(
            style_background_url("background:url(http://a/3.jpg)").as_deref(),
            Some("http://a/3.jpg")
        );
        assert_eq!(style_background_url("background: none"), None);
    }
}
