//! Allow-list HTML cleaning for user-authored post bodies.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use ammonia::Builder as AmmoniaBuilder;
use serde::Serialize;
use tracing::error;
use url::Url;

use crate::config::{DEFAULT_STATIC_IMAGE_PREFIX, DEFAULT_TRUSTED_IMAGE_ORIGIN, SanitizerSettings};

const ALLOWED_TAGS: [&str; 16] = [
    "p", "b", "strong", "h1", "h2", "h3", "ul", "ol", "li", "a", "code", "pre", "span", "img",
    "details", "summary",
];
const DATA_IMAGE_PREFIX: &str = "data:image/";
const SNIPPET_CHARS: usize = 100;

/// HTML that has been through [`HtmlSanitizer`].
///
/// Storage write parameters only accept this type, so unsanitised markup
/// cannot be persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SanitizedHtml(String);

impl SanitizedHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SanitizedHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where images and links may point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizerPolicy {
    /// Same-site path prefix for uploaded images, e.g. `/static/images/`.
    pub static_image_prefix: String,
    /// Absolute origins whose images may be embedded, without trailing slash.
    pub trusted_image_origins: Vec<String>,
    /// Whether inline `data:image/...` sources are kept.
    pub allow_data_images: bool,
}

impl Default for SanitizerPolicy {
    fn default() -> Self {
        Self {
            static_image_prefix: DEFAULT_STATIC_IMAGE_PREFIX.to_string(),
            trusted_image_origins: vec![DEFAULT_TRUSTED_IMAGE_ORIGIN.to_string()],
            allow_data_images: true,
        }
    }
}

impl From<&SanitizerSettings> for SanitizerPolicy {
    fn from(settings: &SanitizerSettings) -> Self {
        Self {
            static_image_prefix: settings.static_image_prefix.clone(),
            trusted_image_origins: settings.trusted_image_origins.clone(),
            allow_data_images: settings.allow_data_images,
        }
    }
}

impl SanitizerPolicy {
    pub fn allows_image_source(&self, src: &str) -> bool {
        let src = src.trim();

        if src.starts_with(&self.static_image_prefix) {
            return !src.split('/').any(|segment| segment == "..");
        }

        if self.allow_data_images && starts_with_ignore_case(src, DATA_IMAGE_PREFIX) {
            return true;
        }

        self.trusted_image_origins.iter().any(|origin| {
            src.strip_prefix(origin.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }

    pub fn allows_link(&self, href: &str) -> bool {
        Url::parse(href.trim())
            .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
            .unwrap_or(false)
    }
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Reduces arbitrary HTML to a fixed tag and attribute allow-list.
///
/// Disallowed tags are unwrapped (their text survives), comments are removed,
/// and no attributes are added to the output.
pub struct HtmlSanitizer {
    builder: AmmoniaBuilder<'static>,
    policy: Arc<SanitizerPolicy>,
}

impl HtmlSanitizer {
    pub fn new(policy: SanitizerPolicy) -> Self {
        let policy = Arc::new(policy);
        Self {
            builder: build_builder(Arc::clone(&policy)),
            policy,
        }
    }

    pub fn policy(&self) -> &SanitizerPolicy {
        &self.policy
    }

    pub fn clean(&self, raw: &str) -> SanitizedHtml {
        self.clean_with_context(raw, "content")
    }

    /// Clean `raw`; `context` labels the log line if the HTML engine fails.
    ///
    /// A failure yields empty output rather than the unfiltered input.
    pub fn clean_with_context(&self, raw: &str, context: &str) -> SanitizedHtml {
        if raw.is_empty() {
            return SanitizedHtml::default();
        }

        match catch_unwind(AssertUnwindSafe(|| self.builder.clean(raw).to_string())) {
            Ok(cleaned) => SanitizedHtml(restore_pre_newlines(&cleaned)),
            Err(_) => {
                let snippet: String = raw.chars().take(SNIPPET_CHARS).collect();
                error!(
                    context,
                    input_len = raw.len(),
                    snippet = %snippet,
                    "HTML sanitization failed; discarding content"
                );
                SanitizedHtml::default()
            }
        }
    }
}

impl Default for HtmlSanitizer {
    fn default() -> Self {
        Self::new(SanitizerPolicy::default())
    }
}

/// Parsing drops one newline directly after `<pre>` and serialization does not
/// put it back, so re-emit it wherever the body starts with a newline. Without
/// this each pass would eat another leading blank line.
fn restore_pre_newlines(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let Some(len) = tag_len(&rest[start..]) else {
            out.push_str(&rest[start..]);
            return out;
        };
        let tag = &rest[start..start + len];
        out.push_str(tag);
        rest = &rest[start + len..];

        if is_pre_start_tag(tag) && rest.starts_with('\n') {
            out.push('\n');
        }
    }

    out.push_str(rest);
    out
}

/// Byte length of the tag at the head of `html`, skipping over quoted attribute values.
fn tag_len(html: &str) -> Option<usize> {
    let mut quoted = false;
    for (idx, ch) in html.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            '>' if !quoted => return Some(idx + 1),
            _ => {}
        }
    }
    None
}

fn is_pre_start_tag(tag: &str) -> bool {
    tag.strip_prefix("<pre")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|next| next == '>' || next.is_ascii_whitespace())
}

fn build_builder(policy: Arc<SanitizerPolicy>) -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    builder.tags(HashSet::from(ALLOWED_TAGS));
    builder.clean_content_tags(HashSet::new());
    builder.generic_attributes(HashSet::from(["class", "id"]));
    builder.tag_attributes(HashMap::from([
        ("a", HashSet::from(["href"])),
        ("img", HashSet::from(["src"])),
        ("details", HashSet::from(["open"])),
    ]));
    builder.url_schemes(HashSet::from(["http", "https", "data"]));
    builder.link_rel(None);
    builder.strip_comments(true);

    builder.attribute_filter(move |element, attribute, value| {
        let keep = match (element, attribute) {
            ("a", "href") => policy.allows_link(value),
            ("img", "src") => policy.allows_image_source(value),
            _ => true,
        };
        keep.then_some(Cow::Borrowed(value))
    });

    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(raw: &str) -> String {
        HtmlSanitizer::default().clean(raw).into_inner()
    }

    #[test]
    fn unknown_tags_are_unwrapped_keeping_text() {
        assert_eq!(clean("<div><em>hi</em> there</div>"), "hi there");
        assert_eq!(clean("<p>a<script>x()</script>b</p>"), "<p>ax()b</p>");
    }

    #[test]
    fn allowed_structure_survives() {
        let html = "<h2 id=\"intro\">Intro</h2><ul class=\"list\"><li><strong>one</strong></li></ul>";
        assert_eq!(clean(html), html);
    }

    #[test]
    fn event_handlers_and_styles_are_dropped() {
        assert_eq!(
            clean("<p onclick=\"steal()\" style=\"color:red\">x</p>"),
            "<p>x</p>"
        );
    }

    #[test]
    fn links_must_be_absolute_http() {
        assert_eq!(
            clean("<a href=\"https://example.com/a\">ok</a>"),
            "<a href=\"https://example.com/a\">ok</a>"
        );
        assert_eq!(clean("<a href=\"javascript:alert(1)\">x</a>"), "<a>x</a>");
        assert_eq!(clean("<a href=\"/relative\">x</a>"), "<a>x</a>");
        assert_eq!(clean("<a href=\"mailto:a@b.c\">x</a>"), "<a>x</a>");
    }

    #[test]
    fn no_rel_is_injected() {
        assert!(!clean("<a href=\"https://example.com\">x</a>").contains("rel="));
    }

    #[test]
    fn image_sources_follow_policy() {
        assert!(clean("<img src=\"/static/images/cat.png\">").contains("src="));
        assert!(clean("<img src=\"https://jake.tw/cat.png\">").contains("src="));
        assert!(clean("<img src=\"data:image/png;base64,AAAA\">").contains("src="));
        assert!(!clean("<img src=\"https://evil.example/cat.png\">").contains("src="));
        assert!(!clean("<img src=\"https://jake.tw.evil.example/cat.png\">").contains("src="));
        assert!(!clean("<img src=\"/static/images/../secret.png\">").contains("src="));
        assert!(!clean("<img src=\"/uploads/cat.png\">").contains("src="));
    }

    #[test]
    fn data_images_can_be_disabled() {
        let sanitizer = HtmlSanitizer::new(SanitizerPolicy {
            allow_data_images: false,
            ..SanitizerPolicy::default()
        });
        let html = sanitizer.clean("<img src=\"data:image/png;base64,AAAA\">");
        assert!(!html.as_str().contains("src="));
    }

    #[test]
    fn details_open_is_kept_and_comments_removed() {
        let html = clean("<details open><summary>More</summary><!-- hidden -->body</details>");
        assert!(html.starts_with("<details open"));
        assert!(!html.contains("hidden"));
        assert!(html.contains("<summary>More</summary>"));
    }

    #[test]
    fn cleaning_is_idempotent() {
        let samples = [
            "<p>Hello <b>world</b></p>",
            "<div><a href=\"https://x.io\" onclick=\"y\">l</a><script>if (a < b) {}</script></div>",
            "<details open><summary>s</summary><pre><code>let x = 1;</code></pre></details>",
            "plain & text < with > symbols",
            "<img src=\"/static/images/a.png\" alt=\"a\"><span class=\"c\">t</span>",
            "<pre>\n\nx</pre>",
            "<pre class=\"rs\">\n\n\nfn main() {}\n</pre>",
            "<pre><div>\nx</div></pre>",
            "<pre><code>\nlet a = 1;</code></pre>",
            "<div><section><p>a</p><div>b<em>c</em></div></section></div>",
            "<p><div>inner</div></p>",
            "<textarea>\n<b>raw</b></textarea>",
            "<xmp>\n<i>raw</i> & more</xmp>",
            "<span class=\"<pre>\n\">t</span>",
        ];
        let sanitizer = HtmlSanitizer::default();
        for sample in samples {
            let once = sanitizer.clean(sample);
            let twice = sanitizer.clean(once.as_str());
            assert_eq!(once, twice, "not idempotent for {sample}");
        }
    }

    #[test]
    fn pre_keeps_its_leading_blank_line() {
        let sanitizer = HtmlSanitizer::default();
        let once = sanitizer.clean("<pre>\n\nx</pre>");
        assert_eq!(once.as_str(), "<pre>\n\nx</pre>");
        assert_eq!(sanitizer.clean(once.as_str()), once);

        assert_eq!(clean("<pre>\nx</pre>"), "<pre>x</pre>");
    }

    #[test]
    fn newline_fixup_only_touches_pre_start_tags() {
        assert_eq!(restore_pre_newlines("<pre>\nx</pre>"), "<pre>\n\nx</pre>");
        assert_eq!(
            restore_pre_newlines("<pre class=\"a\">\nx</pre>"),
            "<pre class=\"a\">\n\nx</pre>"
        );
        assert_eq!(restore_pre_newlines("<p>\nx</p>"), "<p>\nx</p>");
        assert_eq!(restore_pre_newlines("<pres>\nx</pres>"), "<pres>\nx</pres>");
        assert_eq!(
            restore_pre_newlines("<span title=\"<pre>\n\">t</span>"),
            "<span title=\"<pre>\n\">t</span>"
        );
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(HtmlSanitizer::default().clean("").is_empty());
    }
}
