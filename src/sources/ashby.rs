use chrono::NaiveDate;
use serde_json::{json, Value};

use super::{company_from_url, parse_posted_date, url_segment, ParsedPosting, SourceKind};
use crate::error::{Error, Result};
use crate::http::HttpClient;

pub const ENDPOINT: &str = "https://jobs.ashbyhq.com/api/non-user-graphql?op=ApiJobPosting";

const JOB_POSTING_QUERY: &str = r#"
query ApiJobPosting($organizationHostedJobsPageName: String!, $jobPostingId: String!) {
  jobPosting(
    organizationHostedJobsPageName: $organizationHostedJobsPageName
    jobPostingId: $jobPostingId
  ) {
    id
    title
    departmentName
    teamNames
    locationName
    locationAddress
    workplaceType
    employmentType
    descriptionHtml
    linkedData
    isListed
    isConfidential
    publishedDate
    applicationDeadline
    secondaryLocationNames
    compensationTierSummary
    compensationTierGuideUrl
    scrapeableCompensationSalarySummary
  }
}
"#;

/// Look a posting up through Ashby's public GraphQL API rather than scraping the page,
/// which is rendered client-side.
pub fn parse(http: &dyn HttpClient, url: &str) -> Result<ParsedPosting> {
    let company = company_from_url(url);
    if company.is_empty() {
        return Err(Error::missing(url, "organization path segment"));
    }
    let posting_id = url_segment(url, 4)
        .map(|id| id.split(['?', '#']).next().unwrap_or(id))
        .ok_or_else(|| Error::missing(url, "job posting id path segment"))?;

    let request = json!({
        "operationName": "ApiJobPosting",
        "variables": {
            "organizationHostedJobsPageName": company,
            "jobPostingId": posting_id,
        },
        "query": JOB_POSTING_QUERY,
    });
    let response = http.post_json(ENDPOINT, &request)?.error_for_status(ENDPOINT)?;
    let body: Value = serde_json::from_str(&response.body).map_err(|e| Error::invalid(url, e))?;
    from_response(url, company, &body)
}

fn from_response(url: &str, company: String, body: &Value) -> Result<ParsedPosting> {
    let data = body
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| Error::missing(url, "data"))?;

    let posting = match data.get("jobPosting") {
        Some(Value::Null) => return Err(Error::NoData { url: url.to_string() }),
        Some(p) if p.is_object() => p,
        Some(_) => return Err(Error::invalid(url, "jobPosting is not an object")),
        None => return Err(Error::missing(url, "jobPosting")),
    };

    Ok(ParsedPosting {
        company,
        title: string_field(posting, "title"),
        location: string_field(posting, "locationName"),
        description: string_field(posting, "descriptionHtml"),
        posted_date: date_posted(posting),
        source: SourceKind::Ashby,
    })
}

fn string_field(posting: &Value, key: &str) -> String {
    posting
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

// linkedData is a JSON scalar; some postings send it pre-serialized as a string.
fn date_posted(posting: &Value) -> Option<NaiveDate> {
    let linked = posting.get("linkedData")?;
    let decoded;
    let linked = match linked {
        Value::String(raw) => {
            decoded = serde_json::from_str::<Value>(raw).ok()?;
            &decoded
        }
        other => other,
    };
    linked
        .get("datePosted")
        .and_then(Value::as_str)
        .and_then(parse_posted_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{Call, FakeHttp};

    const URL: &str = "https://jobs.ashbyhq.com/acme/abc-123";
    const ENDPOINT_PATH: &str = "https://jobs.ashbyhq.com/api/non-user-graphql";

    fn respond(body: Value) -> FakeHttp {
        let http = FakeHttp::new();
        http.respond(ENDPOINT_PATH, 200, body.to_string());
        http
    }

    #[test]
    fn test_happy_path() {
        let http = respond(json!({"data": {"jobPosting": {
            "title": "Data Engineer",
            "locationName": "Remote",
            "descriptionHtml": "<p>Description</p>",
            "linkedData": {"datePosted": "2024-01-15"},
        }}}));

        let posting = parse(&http, URL).unwrap();

        assert_eq!(posting.company, "acme");
        assert_eq!(posting.title, "Data Engineer");
        assert_eq!(posting.location, "Remote");
        assert_eq!(posting.description, "<p>Description</p>");
        assert_eq!(posting.posted_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(posting.source, SourceKind::Ashby);
    }

    #[test]
    fn test_query_variables_come_from_url() {
        let http = respond(json!({"data": {"jobPosting": {"title": "DE"}}}));
        parse(&http, "https://jobs.ashbyhq.com/acme/abc-123?utm_source=google").unwrap();

        let calls = http.calls.borrow();
        let Call::Post(url, body) = &calls[0] else {
            panic!("expected POST, got {:?}", calls[0]);
        };
        assert_eq!(url, ENDPOINT);
        assert_eq!(body["variables"]["organizationHostedJobsPageName"], "acme");
        assert_eq!(body["variables"]["jobPostingId"], "abc-123");
        assert!(body["query"].as_str().unwrap().contains("descriptionHtml"));
    }

    #[test]
    fn test_null_job_posting_is_upstream_failure() {
        let http = respond(json!({"data": {"jobPosting": null}}));
        let err = parse(&http, URL).unwrap_err();
        match err {
            Error::NoData { url } => assert_eq!(url, URL),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_missing_linked_data_gives_no_date() {
        let http = respond(json!({"data": {"jobPosting": {
            "title": "Data Engineer",
            "locationName": "Remote",
            "descriptionHtml": "<p>Description</p>",
            "linkedData": null,
        }}}));
        let posting = parse(&http, URL).unwrap();
        assert_eq!(posting.posted_date, None);

        let http = respond(json!({"data": {"jobPosting": {"title": "Data Engineer"}}}));
        let posting = parse(&http, URL).unwrap();
        assert_eq!(posting.posted_date, None);
        assert_eq!(posting.location, "");
    }

    #[test]
    fn test_linked_data_as_serialized_string() {
        let http = respond(json!({"data": {"jobPosting": {
            "title": "DE",
            "linkedData": "{\"datePosted\": \"2024-03-02T00:00:00Z\"}",
        }}}));
        let posting = parse(&http, URL).unwrap();
        assert_eq!(posting.posted_date, NaiveDate::from_ymd_opt(2024, 3, 2));
    }

    #[test]
    fn test_absent_job_posting_key_is_structural_failure() {
        let http = respond(json!({"data": {}}));
        let err = parse(&http, URL).unwrap_err();
        assert!(matches!(err, Error::MissingElement { ref element, .. } if element == "jobPosting"));
        assert_eq!(err.kind(), "structure");
    }

    #[test]
    fn test_missing_data_is_structural_failure() {
        let http = respond(json!({"errors": [{"message": "boom"}]}));
        let err = parse(&http, URL).unwrap_err();
        assert!(matches!(err, Error::MissingElement { ref element, .. } if element == "data"));
    }

    #[test]
    fn test_url_without_posting_id() {
        let http = FakeHttp::new();
        let err = parse(&http, "https://jobs.ashbyhq.com/acme").unwrap_err();
        assert_eq!(err.kind(), "structure");
        assert_eq!(http.call_count(), 0);
    }
}
