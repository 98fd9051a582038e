use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::domain::NoticeContent;
use crate::errors::{FeederError, FeederResult};
use crate::http::HttpClient;
use crate::sources::traits::{FeedReader, ReaderKind};

const HTML_TYPES: &[&str] = &["text/html", "application/xhtml"];

/// Reads notice boards laid out as a table: each notice row holds a link
/// cell and a date cell. Highlighted or pinned rows carry an `id` or
/// `style` attribute and are skipped.
pub struct HtmlTableReader {
    http: Arc<HttpClient>,
}

impl HtmlTableReader {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

impl FeedReader for HtmlTableReader {
    fn kind(&self) -> ReaderKind {
        ReaderKind::HtmlTable
    }

    fn read(&self, address: &str, max_items: usize) -> FeederResult<Vec<NoticeContent>> {
        let page = self.http.fetch_page(address, HTML_TYPES)?;
        parse_notices(&page.text(), address, max_items)
    }
}

/// Extract notices from the first `<tbody>` of `html`, resolving links
/// against `base_url`.
pub fn parse_notices(html: &str, base_url: &str, max_items: usize) -> FeederResult<Vec<NoticeContent>> {
    let base = Url::parse(base_url).map_err(|e| FeederError::InvalidUrl(format!("{base_url}: {e}")))?;
    let document = Html::parse_document(html);

    let tbody_selector = Selector::parse("tbody").expect("static selector");
    let row_selector = Selector::parse("tr").expect("static selector");

    let Some(tbody) = document.select(&tbody_selector).next() else {
        return Ok(Vec::new());
    };

    Ok(tbody
        .select(&row_selector)
        .filter(|tr| tr.value().attr("id").is_none() && tr.value().attr("style").is_none())
        .filter_map(|tr| scrape_row(tr, &base))
        .take(max_items)
        .collect())
}

fn scrape_row(tr: ElementRef<'_>, base: &Url) -> Option<NoticeContent> {
    let cell_selector = Selector::parse("td").expect("static selector");
    let link_selector = Selector::parse("a").expect("static selector");

    let cells: Vec<ElementRef<'_>> = tr.select(&cell_selector).collect();
    if cells.len() != 2 {
        return None;
    }

    let anchor = cells[0].select(&link_selector).next()?;
    let title: String = anchor.text().collect();
    let href = anchor.value().attr("href")?.trim();
    if title.trim().is_empty() || href.is_empty() {
        return None;
    }

    let date: String = cells[1].text().collect();
    if date.trim().is_empty() {
        return None;
    }

    let link = base.join(href).ok()?;
    Some(NoticeContent::new(&title, &date, link.as_str()))
}
