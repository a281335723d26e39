//! Status classification for fetched handle pages.
//!
//! The remote service encodes availability in the free-text `og:description`
//! meta tag, with overlapping vocabulary across states. Classification is
//! ordered first-match-wins so that "taken" supersedes "for sale" supersedes
//! "available", and the captcha check runs only when no status phrase matched
//! (a challenge page mentioning unrelated words must not win over a real
//! status).

use crate::types::HandleStatus;
use scraper::{Html, Selector};

/// Classify a raw response body into a [`HandleStatus`].
///
/// Total function: any input maps to a status, never an error. Given the
/// same body it always returns the same status.
///
/// Decision order:
/// 1. description contains "is taken" -> `Taken`
/// 2. description contains "buy" or "make an offer" -> `ForSale`
/// 3. description contains "find active auctions" or "available" -> `Available`
/// 4. body carries a captcha marker -> `CaptchaChallenge`
/// 5. otherwise -> `Undetermined`
pub fn classify(body: &str) -> HandleStatus {
    let document = Html::parse_document(body);

    if let Some(description) = extract_og_description(&document) {
        let description = description.to_lowercase();

        if description.contains("is taken") {
            return HandleStatus::Taken;
        }
        if description.contains("buy") || description.contains("make an offer") {
            return HandleStatus::ForSale;
        }
        if description.contains("find active auctions") || description.contains("available") {
            return HandleStatus::Available;
        }
    }

    if has_captcha_marker(&document, body) {
        return HandleStatus::CaptchaChallenge;
    }

    HandleStatus::Undetermined
}

/// Pull the content of `<meta property="og:description">`, if present.
fn extract_og_description(document: &Html) -> Option<String> {
    let selector = Selector::parse(r#"meta[property="og:description"]"#).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(str::to_string)
}

/// Challenge detection: a `div.captcha` element, or the word anywhere in the
/// raw body (challenge pages are not guaranteed to keep their markup stable).
fn has_captcha_marker(document: &Html, body: &str) -> bool {
    if let Ok(selector) = Selector::parse("div.captcha") {
        if document.select(&selector).next().is_some() {
            return true;
        }
    }
    body.to_lowercase().contains("captcha")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_description(description: &str) -> String {
        format!(
            r#"<html><head><meta property="og:description" content="{}"></head><body></body></html>"#,
            description
        )
    }

    #[test]
    fn test_taken() {
        let body = page_with_description("This username is taken.");
        assert_eq!(classify(&body), HandleStatus::Taken);
    }

    #[test]
    fn test_for_sale_buy() {
        let body = page_with_description("Buy this username on the marketplace");
        assert_eq!(classify(&body), HandleStatus::ForSale);
    }

    #[test]
    fn test_for_sale_make_an_offer() {
        let body = page_with_description("Username up for grabs, make an offer");
        assert_eq!(classify(&body), HandleStatus::ForSale);
    }

    #[test]
    fn test_available() {
        let body = page_with_description("This username is available for registration");
        assert_eq!(classify(&body), HandleStatus::Available);
    }

    #[test]
    fn test_available_auctions_phrase() {
        let body = page_with_description("Find active auctions for collectible usernames");
        assert_eq!(classify(&body), HandleStatus::Available);
    }

    #[test]
    fn test_taken_wins_over_available() {
        // Priority rule: "is taken" supersedes "available" phrasing in the
        // same description.
        let body = page_with_description("This username is taken. Similar names available.");
        assert_eq!(classify(&body), HandleStatus::Taken);
    }

    #[test]
    fn test_offer_wins_over_available() {
        // "make an offer" precedes the "available" rule when "is taken" is
        // absent.
        let body = page_with_description("This username is available. Make an offer.");
        assert_eq!(classify(&body), HandleStatus::ForSale);
    }

    #[test]
    fn test_case_insensitive_matching() {
        let body = page_with_description("THIS USERNAME IS TAKEN");
        assert_eq!(classify(&body), HandleStatus::Taken);
    }

    #[test]
    fn test_captcha_div() {
        let body = r#"<html><body><div class="captcha">prove you are human</div></body></html>"#;
        assert_eq!(classify(body), HandleStatus::CaptchaChallenge);
    }

    #[test]
    fn test_captcha_plain_text() {
        let body = "<html><body>Please solve the CAPTCHA to continue</body></html>";
        assert_eq!(classify(body), HandleStatus::CaptchaChallenge);
    }

    #[test]
    fn test_status_phrase_wins_over_captcha() {
        // Captcha detection is a fallback only: a page that carries a real
        // status phrase classifies by the phrase even if it mentions captcha.
        let body = r#"<html><head><meta property="og:description" content="This username is available"></head><body>captcha</body></html>"#;
        assert_eq!(classify(body), HandleStatus::Available);
    }

    #[test]
    fn test_undetermined_no_description() {
        let body = "<html><body><p>Nothing to see here</p></body></html>";
        assert_eq!(classify(body), HandleStatus::Undetermined);
    }

    #[test]
    fn test_undetermined_unrecognized_description() {
        let body = page_with_description("Something entirely different");
        assert_eq!(classify(&body), HandleStatus::Undetermined);
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(classify(""), HandleStatus::Undetermined);
    }

    #[test]
    fn test_idempotent() {
        let body = page_with_description("This username is taken.");
        let first = classify(&body);
        let second = classify(&body);
        assert_eq!(first, second);
    }
}
