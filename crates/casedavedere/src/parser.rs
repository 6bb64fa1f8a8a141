use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::types::{ListingField, PropertyRecord};

/// A label cell class together with the sibling class holding its value and the
/// markers that can appear in the label.
struct LabelTier {
    label: &'static str,
    value_tag: &'static str,
    value_class: &'static str,
    markers: &'static [(&'static str, ListingField)],
}

const LABEL_TIERS: &[LabelTier] = &[
    LabelTier {
        label: "span.titolo51",
        value_tag: "span",
        value_class: "titolo6",
        markers: &[("CODICE IMMOBILE:", ListingField::Code)],
    },
    LabelTier {
        label: "td",
        value_tag: "td",
        value_class: "cella",
        markers: &[
            ("Superficie:", ListingField::Area),
            ("Costo:", ListingField::Price),
        ],
    },
    LabelTier {
        label: "td.cella51",
        value_tag: "td",
        value_class: "cella61",
        markers: &[
            ("Piani:", ListingField::MaxFloor),
            ("Locali:", ListingField::Rooms),
            ("Ascensore:", ListingField::Elevator),
            ("Garage/Box:", ListingField::Box),
        ],
    },
    LabelTier {
        label: "td.cella5",
        value_tag: "td",
        value_class: "cella6",
        markers: &[
            ("Piano:", ListingField::Floor),
            ("Balcone:", ListingField::Balconies),
        ],
    },
];

/// An anchor found on a search results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLink {
    pub href: Option<String>,
    /// Outer HTML of the `table.imm` the anchor sits in.
    pub fragment: String,
}

impl ListingLink {
    /// The href, if it is an absolute http(s) URL worth fetching.
    pub fn target(&self) -> Option<&str> {
        self.href.as_deref().filter(|href| is_listing_url(href))
    }
}

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn first_token(text: &str) -> String {
    text.replace("\\t", "")
        .replace("\\n", "")
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

fn next_sibling_with_class<'a>(
    element: ElementRef<'a>,
    tag: &str,
    class: &str,
) -> Option<ElementRef<'a>> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| {
            sibling.value().name() == tag && sibling.value().classes().any(|c| c == class)
        })
}

pub(crate) fn is_listing_url(href: &str) -> bool {
    Url::parse(href)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

/// Builds a record from a detail page. Returns `None` only for an empty page.
pub fn parse_listing(html: &str, link: &str, fragment: &str) -> Option<PropertyRecord> {
    if html.trim().is_empty() {
        return None;
    }

    let document = Html::parse_document(html);
    let mut record = PropertyRecord::new(link, fragment);

    for tier in LABEL_TIERS {
        let label_selector = Selector::parse(tier.label).unwrap();

        for label in document.select(&label_selector) {
            let text = elem_text(label);
            let Some(&(_, field)) = tier
                .markers
                .iter()
                .find(|(marker, _)| text.contains(marker))
            else {
                continue;
            };

            if record.is_set(field) {
                continue;
            }

            if let Some(value) = next_sibling_with_class(label, tier.value_tag, tier.value_class) {
                let token = first_token(&elem_text(value));
                if !record.apply(field, &token) {
                    log::debug!("Ignoring {:?} token '{}' on {}", field, token, link);
                }
            }
        }
    }

    Some(record)
}

/// Collects every `a.citta` in a `tr.imm` of a `table.imm`, in document order.
pub fn parse_listing_links(html: &str) -> Vec<ListingLink> {
    let document = Html::parse_document(html);
    let table_selector = Selector::parse("table.imm").unwrap();
    let row_selector = Selector::parse("tr.imm").unwrap();
    let anchor_selector = Selector::parse("a.citta").unwrap();

    let mut links = Vec::new();

    for table in document.select(&table_selector) {
        let fragment = table.html();
        for row in table.select(&row_selector) {
            for anchor in row.select(&anchor_selector) {
                links.push(ListingLink {
                    href: anchor.value().attr("href").map(str::to_string),
                    fragment: fragment.clone(),
                });
            }
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const LINK: &str = "https://www.casedavedere.it/immobile/12-345";

    #[test]
    fn test_parse_listing_from_fixture() {
        let html = fs::read_to_string("fixtures/listing_detail.html")
            .expect("Failed to read sample HTML file");

        let record = parse_listing(&html, LINK, "<table class=\"imm\"></table>")
            .expect("Failed to parse listing");

        assert_eq!(record.link, LINK);
        assert_eq!(record.code.as_deref(), Some("12-345"));
        assert_eq!(record.area, Some(85));
        assert_eq!(record.price, Some(159000));
        assert_eq!(record.floor, Some(3));
        assert_eq!(record.max_floor, Some(5));
        assert_eq!(record.rooms, Some(4));
        assert_eq!(record.balconies, Some(2));
        assert_eq!(record.has_box, Some(false));
        assert_eq!(record.has_elevator, Some(true));
    }

    #[test]
    fn test_empty_page_yields_nothing() {
        assert!(parse_listing("", LINK, "").is_none());
        assert!(parse_listing("   \n", LINK, "").is_none());
    }

    #[test]
    fn test_missing_markers_leave_fields_absent() {
        let html = r#"
            <table>
                <tr><td class="cella51">Locali:</td><td class="cella61">3</td></tr>
                <tr><td class="cella51">Ascensore:</td></tr>
                <tr><td>Costo:</td><td class="cella">Trattativa riservata</td></tr>
            </table>
        "#;

        let record = parse_listing(html, LINK, "").expect("Failed to parse");

        assert_eq!(record.rooms, Some(3));
        assert!(record.has_elevator.is_none());
        assert!(record.price.is_none());
        assert!(record.code.is_none());
        assert!(record.area.is_none());
    }

    #[test]
    fn test_value_must_be_in_matching_tier() {
        let html = r#"
            <table>
                <tr><td class="cella5">Piano:</td><td class="cella61">2</td><td class="cella6">4</td></tr>
            </table>
        "#;

        let record = parse_listing(html, LINK, "").expect("Failed to parse");

        assert_eq!(record.floor, Some(4));
    }

    #[test]
    fn test_first_valid_match_wins() {
        let html = r#"
            <table>
                <tr><td>Superficie:</td><td class="cella">n.d.</td></tr>
                <tr><td>Superficie:</td><td class="cella">70 mq</td></tr>
                <tr><td>Superficie:</td><td class="cella">90 mq</td></tr>
            </table>
        "#;

        let record = parse_listing(html, LINK, "").expect("Failed to parse");

        assert_eq!(record.area, Some(70));
    }

    #[test]
    fn test_escape_artifacts_are_stripped() {
        let html = r#"
            <span class="titolo51">CODICE IMMOBILE:</span>
            <span class="titolo6">\t\n 7-81 \n</span>
        "#;

        let record = parse_listing(html, LINK, "").expect("Failed to parse");

        assert_eq!(record.code.as_deref(), Some("7-81"));
    }

    #[test]
    fn test_parse_listing_links() {
        let html = fs::read_to_string("fixtures/search_page.html")
            .expect("Failed to read sample HTML file");

        let links = parse_listing_links(&html);

        assert_eq!(links.len(), 3);
        assert_eq!(
            links[0].target(),
            Some("https://www.casedavedere.it/immobile/12-345")
        );
        assert!(links[0].fragment.starts_with("<table class=\"imm\""));
        assert!(links[0].fragment.contains("Monterotondo"));
        assert_eq!(links[1].target(), None);
        assert_eq!(links[2].href, None);
    }

    #[test]
    fn test_anchors_outside_listing_rows_are_ignored() {
        let html = r#"
            <table class="imm">
                <tr><td><a class="citta" href="https://www.casedavedere.it/immobile/1-1">A</a></td></tr>
            </table>
            <a class="citta" href="https://www.casedavedere.it/immobile/2-2">B</a>
        "#;

        assert!(parse_listing_links(html).is_empty());
    }

    #[test]
    fn test_is_listing_url() {
        assert!(is_listing_url("https://www.casedavedere.it/immobile/1-1"));
        assert!(is_listing_url("http://example.com/x"));
        assert!(!is_listing_url("/immobile/1-1"));
        assert!(!is_listing_url("javascript:void(0)"));
        assert!(!is_listing_url("mailto:info@casedavedere.it"));
    }
}
