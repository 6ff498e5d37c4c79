use scraper::{ElementRef, Html, Selector};

use super::{company_from_url, ParsedPosting, SourceKind};
use crate::error::{Error, Result};
use crate::http::HttpClient;

pub fn parse(http: &dyn HttpClient, url: &str) -> Result<ParsedPosting> {
    let response = http.get(url)?.error_for_status(url)?;
    parse_html(url, &response.body)
}

/// Extract a posting from a Greenhouse board page. Greenhouse pages carry no posting date.
pub fn parse_html(url: &str, html: &str) -> Result<ParsedPosting> {
    let document = Html::parse_document(html);

    let title_container = select_first(&document, url, ".job__title")?;
    let heading = Selector::parse("h1").map_err(|e| Error::invalid(url, e))?;
    let title = title_container
        .select(&heading)
        .next()
        .ok_or_else(|| Error::missing(url, ".job__title h1"))?;
    let location = select_first(&document, url, ".job__location")?;
    let description = select_first(&document, url, ".job__description")?;

    Ok(ParsedPosting {
        company: company_from_url(url),
        title: element_text(title),
        location: element_text(location),
        description: element_text(description),
        posted_date: None,
        source: SourceKind::Greenhouse,
    })
}

fn select_first<'a>(document: &'a Html, url: &str, selector: &str) -> Result<ElementRef<'a>> {
    let parsed = Selector::parse(selector).map_err(|e| Error::invalid(url, e))?;
    document
        .select(&parsed)
        .next()
        .ok_or_else(|| Error::missing(url, selector))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
