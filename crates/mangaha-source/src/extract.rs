//! CSS selector walks over fetched documents.
//!
//! Every site-specific selector lives here. Functions take raw bytes and never
//! fail: a node that cannot be found yields an empty or default value so that
//! markup drift degrades output instead of aborting a scrape.

use std::collections::BTreeSet;

use mangaha_lib::prelude::*;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

macro_rules! selector {
    ($name:ident, $css:expr) => {
        static $name: Lazy<Selector> =
            Lazy::new(|| Selector::parse($css).expect(concat!("invalid selector ", $css)));
    };
}

selector!(CHAPTER_IMAGE, "img.wp-manga-chapter-img");
selector!(HEADING, "h1");
selector!(POSTER, "div.summary_image a img.img-responsive");
selector!(SUMMARY, "div.manga-summary");
selector!(GENRES, "div.genres-content a");
selector!(STATUS, "div.summary-content div.tags-content");
selector!(AVERAGE_RATE, "span#averagerate");
selector!(CHAPTER_ITEM, "li.wp-manga-chapter");
selector!(LINK, "a");
selector!(IMG, "img");
selector!(SEARCH_ROW, "div.row.c-tabs-item__content");
selector!(SEARCH_SIDE, "div.c-image-hover a");
selector!(SEARCH_GENRES, "div.mg_genres div.summary-content a");
selector!(SEARCH_STATUS, "div.mg_status div.summary-content");
selector!(SEARCH_VOTES, "span.total_votes");
selector!(SEARCH_LATEST, "div.latest-chap a");
selector!(SERIES_COUNT, "div.h4");
selector!(SERIES_LINK, "h3 a");

fn parse(html: &[u8]) -> Html {
    Html::parse_document(&String::from_utf8_lossy(html))
}

fn text(el: ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn attr(el: ElementRef, name: &str) -> String {
    el.value().attr(name).unwrap_or_default().trim().to_string()
}

fn first<'a>(el: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    el.select(selector).next()
}

fn first_text(el: ElementRef, selector: &Selector) -> String {
    first(el, selector).map(text).unwrap_or_default()
}

fn leading_number(s: &str) -> usize {
    s.split_whitespace()
        .next()
        .and_then(|n| n.replace(',', "").parse().ok())
        .unwrap_or_default()
}

fn rating(s: &str) -> f64 {
    s.trim().parse().unwrap_or_default()
}

/// Ordered page images of a chapter, numbered from 0 in document order.
pub fn extract_images(html: &[u8]) -> Vec<PageInfo> {
    let document = parse(html);

    document
        .select(&CHAPTER_IMAGE)
        .filter_map(|img| {
            let url = img
                .value()
                .attr("src")
                .or_else(|| img.value().attr("data-src"))
                .map(str::trim)?;
            (!url.is_empty()).then(|| url.to_string())
        })
        .enumerate()
        .map(|(i, url)| PageInfo::new(i as i64, url))
        .collect()
}

pub fn extract_manga_details(url: &str, html: &[u8]) -> MangaInfo {
    let document = parse(html);
    let root = document.root_element();

    let chapters = root
        .select(&CHAPTER_ITEM)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .filter_map(|item| first(item, &LINK))
        .enumerate()
        .map(|(i, link)| ChapterInfo {
            order_no: i as i64,
            url: attr(link, "href"),
            title: text(link),
        })
        .collect();

    MangaInfo {
        url: url.to_string(),
        title: first_text(root, &HEADING),
        poster_url: first(root, &POSTER)
            .map(|img| attr(img, "src"))
            .unwrap_or_default(),
        description: first_text(root, &SUMMARY),
        genres: root.select(&GENRES).map(text).collect(),
        status: first_text(root, &STATUS),
        rating: rating(&first_text(root, &AVERAGE_RATE)),
        chapters,
    }
}

/// Total hits announced in the heading of a search page, e.g. `27 results for "x"`.
pub fn extract_result_count(html: &[u8]) -> usize {
    let document = parse(html);
    leading_number(&first_text(document.root_element(), &HEADING))
}

pub fn extract_search_results(html: &[u8]) -> Vec<SearchResult> {
    let document = parse(html);

    document
        .select(&SEARCH_ROW)
        .map(|row| {
            let side = first(row, &SEARCH_SIDE);
            let latest_chapter = first(row, &SEARCH_LATEST).map(|link| LatestChapter {
                url: attr(link, "href"),
                title: text(link),
            });

            SearchResult {
                url: side.map(|a| attr(a, "href")).unwrap_or_default(),
                title: side.map(|a| attr(a, "title")).unwrap_or_default(),
                poster_url: side
                    .and_then(|a| first(a, &IMG))
                    .map(|img| attr(img, "src"))
                    .unwrap_or_default(),
                genres: row.select(&SEARCH_GENRES).map(text).collect(),
                status: first_text(row, &SEARCH_STATUS),
                rating: rating(&first_text(row, &SEARCH_VOTES)),
                latest_chapter,
            }
        })
        .collect()
}

/// Total series announced on the series listing, e.g. `130 results`.
pub fn extract_series_count(html: &[u8]) -> usize {
    let document = parse(html);
    leading_number(&first_text(document.root_element(), &SERIES_COUNT))
}

pub fn extract_series_links(html: &[u8]) -> BTreeSet<String> {
    let document = parse(html);

    document
        .select(&SERIES_LINK)
        .map(|a| attr(a, "href"))
        .filter(|href| !href.is_empty())
        .collect()
}
