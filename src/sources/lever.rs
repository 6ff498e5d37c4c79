use scraper::{Html, Selector};
use serde_json::Value;

use super::{company_from_url, parse_posted_date, ParsedPosting, SourceKind};
use crate::error::{Error, Result};
use crate::http::HttpClient;

const LD_JSON_SELECTOR: &str = r#"script[type="application/ld+json"]"#;

pub fn parse(http: &dyn HttpClient, url: &str) -> Result<ParsedPosting> {
    let response = http.get(url)?.error_for_status(url)?;
    parse_html(url, &response.body)
}

/// Extract a posting from the JSON-LD block Lever embeds in each posting page.
///
/// Only a missing or undecodable block is an error; individual fields default to empty.
pub fn parse_html(url: &str, html: &str) -> Result<ParsedPosting> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(LD_JSON_SELECTOR).map_err(|e| Error::invalid(url, e))?;
    let script = document
        .select(&selector)
        .next()
        .ok_or_else(|| Error::missing(url, "application/ld+json script"))?;

    let raw = script.text().collect::<String>();
    let data: Value = serde_json::from_str(&raw).map_err(|e| Error::invalid(url, e))?;

    Ok(ParsedPosting {
        company: company_from_url(url),
        title: string_field(&data, "title"),
        location: job_location(&data),
        description: string_field(&data, "description"),
        posted_date: data
            .get("datePosted")
            .and_then(Value::as_str)
            .and_then(parse_posted_date),
        source: SourceKind::Lever,
    })
}

fn string_field(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// `jobLocation` is either one place or a list of them; lists are joined with `/`.
fn job_location(data: &Value) -> String {
    match data.get("jobLocation") {
        Some(Value::Array(places)) => places
            .iter()
            .filter_map(locality)
            .collect::<Vec<_>>()
            .join("/"),
        Some(place) => locality(place).unwrap_or_default().to_string(),
        None => String::new(),
    }
}

fn locality(place: &Value) -> Option<&str> {
    place
        .get("address")?
        .get("addressLocality")?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    const URL: &str = "https://jobs.lever.co/acme/abc-123";

    fn page(ld_json: &str) -> String {
        format!(
            r#"<html><head><script type="application/ld+json">{}</script></head><body></body></html>"#,
            ld_json
        )
    }

    fn posting_json(job_location: Value) -> String {
        json!({
            "@context": "http://schema.org",
            "@type": "JobPosting",
            "title": "Data Engineer",
            "jobLocation": job_location,
            "description": "<p>Build pipelines</p>",
            "datePosted": "2024-01-15",
        })
        .to_string()
    }

    #[test]
    fn test_single_location() {
        let html = page(&posting_json(json!({"address": {"addressLocality": "San Francisco"}})));
        let posting = parse_html(URL, &html).unwrap();
        assert_eq!(posting.company, "acme");
        assert_eq!(posting.title, "Data Engineer");
        assert_eq!(posting.location, "San Francisco");
        assert_eq!(posting.description, "<p>Build pipelines</p>");
        assert_eq!(posting.posted_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(posting.source, SourceKind::Lever);
    }

    #[test]
    fn test_multiple_locations_joined_in_order() {
        let html = page(&posting_json(json!([
            {"address": {"addressLocality": "San Francisco"}},
            {"address": {"addressLocality": "New York"}},
        ])));
        let posting = parse_html(URL, &html).unwrap();
        assert_eq!(posting.location, "San Francisco/New York");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let html = page(r#"{"@type": "JobPosting"}"#);
        let posting = parse_html(URL, &html).unwrap();
        assert_eq!(posting.title, "");
        assert_eq!(posting.location, "");
        assert_eq!(posting.description, "");
        assert_eq!(posting.posted_date, None);
    }

    #[test]
    fn test_missing_script_block() {
        let err = parse_html(URL, "<html><body><p>No script here</p></body></html>").unwrap_err();
        match err {
            Error::MissingElement { url, element } => {
                assert_eq!(url, URL);
                assert!(element.contains("application/ld+json"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_json_is_distinct_failure() {
        let err = parse_html(URL, &page("{not json")).unwrap_err();
        assert!(matches!(err, Error::InvalidDocument { ref url, .. } if url == URL));
    }

    #[test]
    fn test_fetch_goes_through_http_client() {
        let http = crate::http::testing::FakeHttp::new();
        http.respond(
            URL,
            200,
            page(&posting_json(json!({"address": {"addressLocality": "Austin"}}))),
        );
        let posting = parse(&http, URL).unwrap();
        assert_eq!(posting.location, "Austin");
    }
}
