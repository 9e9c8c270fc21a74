//! Link and open tracking
//!
//! Rewrites anchor hrefs in personalized HTML to tracked redirect URLs
//! and builds the invisible open-tracking pixel. Both rewrites are
//! applied exactly once per personalization pass; reapplying would
//! double-encode the destination URLs.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Matches `href` attributes in either quote style. The regex crate has
/// no backreferences, so the two styles are separate alternatives.
static HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("href pattern is valid")
});

/// Rewrite every anchor href to a tracked redirect
///
/// The original destination survives as the percent-encoded `url` query
/// parameter. `mailto:`, `tel:`, and in-page `#fragment` links pass
/// through untouched, as does the bare `#` unsubscribe placeholder used
/// by test sends.
#[must_use]
pub fn wrap_links_with_tracking(html: &str, click_base_url: &str) -> String {
    HREF.replace_all(html, |caps: &Captures<'_>| {
        let original = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str());

        if should_skip(original) {
            caps[0].to_string()
        } else {
            format!(
                "href=\"{click_base_url}?url={}\"",
                urlencoding::encode(original)
            )
        }
    })
    .into_owned()
}

fn should_skip(href: &str) -> bool {
    href.is_empty()
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
}

/// Click-tracking redirect base for one recipient of one campaign
#[must_use]
pub fn click_tracking_base(base_url: &str, campaign_id: i64, email: &str) -> String {
    format!(
        "{base_url}/api/track/click/{campaign_id}/{}",
        urlencoding::encode(email)
    )
}

/// Invisible 1x1 open-tracking pixel, appended once per rendered email
#[must_use]
pub fn open_tracking_pixel(base_url: &str, campaign_id: i64, email: &str) -> String {
    format!(
        "<img src=\"{base_url}/api/track/open/{campaign_id}/{}\" width=\"1\" height=\"1\" style=\"display:none !important;\" alt=\"\" />",
        urlencoding::encode(email)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLICK_BASE: &str = "https://x.io/api/track/click/7/jane%40example.com";

    #[test]
    fn test_rewrites_absolute_and_relative_hrefs() {
        let html = r#"<a href="https://shop.example.com/sale?ref=1">Sale</a> <a href="/pricing">Pricing</a>"#;
        let out = wrap_links_with_tracking(html, CLICK_BASE);
        assert!(out.contains(&format!(
            "href=\"{CLICK_BASE}?url=https%3A%2F%2Fshop.example.com%2Fsale%3Fref%3D1\""
        )));
        assert!(out.contains(&format!("href=\"{CLICK_BASE}?url=%2Fpricing\"")));
    }

    #[test]
    fn test_skips_mailto_tel_and_fragments() {
        let html = r##"<a href="mailto:team@example.com">mail</a>
<a href="tel:+15551234567">call</a>
<a href="#section-2">jump</a>
<a href="#">unsubscribe placeholder</a>"##;
        assert_eq!(wrap_links_with_tracking(html, CLICK_BASE), html);
    }

    #[test]
    fn test_single_quoted_hrefs() {
        let html = "<a href='https://example.com/a'>a</a>";
        let out = wrap_links_with_tracking(html, CLICK_BASE);
        assert!(out.contains("url=https%3A%2F%2Fexample.com%2Fa"));
    }

    #[test]
    fn test_empty_href_untouched() {
        let html = r#"<a href="">nothing</a>"#;
        assert_eq!(wrap_links_with_tracking(html, CLICK_BASE), html);
    }

    #[test]
    fn test_open_pixel_shape() {
        let pixel = open_tracking_pixel("https://x.io", 7, "jane@example.com");
        assert!(pixel.contains("https://x.io/api/track/open/7/jane%40example.com"));
        assert!(pixel.contains("width=\"1\""));
        assert!(pixel.contains("display:none"));
    }

    #[test]
    fn test_click_base_encodes_email() {
        assert_eq!(
            click_tracking_base("https://x.io", 7, "jane@example.com"),
            CLICK_BASE
        );
    }
}
