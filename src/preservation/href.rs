//! Resolves the URL a viewer lands on when opening a link.

use super::{format_available, ArchivedFormat, ArtifactKind};
use crate::models::{Link, LinkType, LinksRouteTo};
use crate::schemas::SchemaEnum;

/// Pick the destination for `link` given the viewer's routing preference.
///
/// Never fails: whenever the preferred artifact is missing the raw URL is
/// returned instead. A link's own type outranks the preference for PDF and
/// image links, except that `ORIGINAL` on a `url` link is checked first.
pub fn generate_link_href(
    link: &Link,
    route_to: LinksRouteTo,
    instance_url: Option<&str>,
) -> String {
    let raw = || link.url.clone().unwrap_or_default();
    let preserved = |format: ArchivedFormat| {
        format!(
            "{}/preserved/{}?format={}",
            instance_url.unwrap_or(""),
            link.id,
            format.as_str()
        )
    };

    if route_to == LinksRouteTo::Original && link.link_type == LinkType::Url {
        raw()
    } else if route_to == LinksRouteTo::Pdf || link.link_type == LinkType::Pdf {
        if !format_available(link, ArtifactKind::Pdf) {
            return raw();
        }
        preserved(ArchivedFormat::Pdf)
    } else if route_to == LinksRouteTo::Readable && link.link_type == LinkType::Url {
        if !format_available(link, ArtifactKind::Readable) {
            return raw();
        }
        preserved(ArchivedFormat::Readability)
    } else if route_to == LinksRouteTo::Screenshot || link.link_type == LinkType::Image {
        if !format_available(link, ArtifactKind::Image) {
            return raw();
        }
        let is_png = link.image.as_deref().is_some_and(|p| p.ends_with("png"));
        preserved(if is_png {
            ArchivedFormat::Png
        } else {
            ArchivedFormat::Jpeg
        })
    } else if route_to == LinksRouteTo::Monolith {
        if !format_available(link, ArtifactKind::Monolith) {
            return raw();
        }
        preserved(ArchivedFormat::Monolith)
    } else {
        raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LinkCollectionRef;
    use crate::preservation::{PENDING, UNAVAILABLE};

    const BASE: Option<&str> = Some("https://example.com");

    fn link(id: i64, link_type: LinkType, url: Option<&str>) -> Link {
        Link {
            id,
            name: "Example".to_string(),
            link_type,
            url: url.map(str::to_string),
            description: String::new(),
            icon: None,
            icon_weight: None,
            color: None,
            collection_id: 1,
            collection: LinkCollectionRef {
                id: 1,
                name: "Unorganized".to_string(),
                owner_id: 1,
            },
            tags: vec![],
            image: None,
            pdf: None,
            readable: None,
            monolith: None,
            last_preserved: None,
            pinned: false,
            href: String::new(),
            created_by_id: 1,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
            version: 1,
        }
    }

    fn fully_preserved(id: i64, url: &str) -> Link {
        let mut l = link(id, LinkType::Url, Some(url));
        l.image = Some(format!("archives/1/{id}.png"));
        l.pdf = Some(format!("archives/1/{id}.pdf"));
        l.readable = Some(format!("archives/1/{id}_readability.txt"));
        l.monolith = Some(format!("archives/1/{id}.html"));
        l
    }

    #[test]
    fn test_original_returns_raw_url_even_with_artifacts() {
        let l = fully_preserved(7, "https://a.com");
        assert_eq!(
            generate_link_href(&l, LinksRouteTo::Original, BASE),
            "https://a.com"
        );
    }

    #[test]
    fn test_original_without_url_is_empty() {
        let l = link(7, LinkType::Url, None);
        assert_eq!(generate_link_href(&l, LinksRouteTo::Original, BASE), "");
    }

    #[test]
    fn test_pdf_preference_with_artifact() {
        let mut l = link(42, LinkType::Url, Some("https://a.com"));
        l.pdf = Some("archives/1/42.pdf".to_string());
        assert_eq!(
            generate_link_href(&l, LinksRouteTo::Pdf, BASE),
            "https://example.com/preserved/42?format=pdf"
        );
    }

    #[test]
    fn test_missing_artifacts_fall_back_to_raw_url() {
        let l = link(3, LinkType::Url, Some("https://a.com"));
        for pref in [
            LinksRouteTo::Pdf,
            LinksRouteTo::Readable,
            LinksRouteTo::Screenshot,
            LinksRouteTo::Monolith,
            LinksRouteTo::Details,
        ] {
            assert_eq!(generate_link_href(&l, pref, BASE), "https://a.com");
        }
    }

    #[test]
    fn test_pending_and_unavailable_are_not_available() {
        let mut l = link(3, LinkType::Url, Some("https://a.com"));
        l.monolith = Some(PENDING.to_string());
        l.readable = Some(UNAVAILABLE.to_string());
        assert_eq!(
            generate_link_href(&l, LinksRouteTo::Monolith, BASE),
            "https://a.com"
        );
        assert_eq!(
            generate_link_href(&l, LinksRouteTo::Readable, BASE),
            "https://a.com"
        );
    }

    #[test]
    fn test_readable_and_monolith_formats() {
        let l = fully_preserved(5, "https://a.com");
        assert_eq!(
            generate_link_href(&l, LinksRouteTo::Readable, BASE),
            "https://example.com/preserved/5?format=readability"
        );
        assert_eq!(
            generate_link_href(&l, LinksRouteTo::Monolith, BASE),
            "https://example.com/preserved/5?format=monolith"
        );
    }

    #[test]
    fn test_image_suffix_selects_png_or_jpeg() {
        let mut l = link(9, LinkType::Image, None);
        l.image = Some("archives/1/9.png".to_string());
        assert_eq!(
            generate_link_href(&l, LinksRouteTo::Original, BASE),
            "https://example.com/preserved/9?format=png"
        );

        l.image = Some("archives/1/9.jpeg".to_string());
        assert_eq!(
            generate_link_href(&l, LinksRouteTo::Original, BASE),
            "https://example.com/preserved/9?format=jpeg"
        );

        l.image = Some("archives/1/9.webp".to_string());
        assert_eq!(
            generate_link_href(&l, LinksRouteTo::Screenshot, BASE),
            "https://example.com/preserved/9?format=jpeg"
        );
    }

    #[test]
    fn test_link_type_overrides_preference() {
        // A pdf link opens its PDF even when the viewer prefers monolith.
        let mut l = link(11, LinkType::Pdf, None);
        l.pdf = Some("archives/1/11.pdf".to_string());
        l.monolith = Some("archives/1/11.html".to_string());
        assert_eq!(
            generate_link_href(&l, LinksRouteTo::Monolith, BASE),
            "https://example.com/preserved/11?format=pdf"
        );
        // ORIGINAL only short-circuits url links.
        assert_eq!(
            generate_link_href(&l, LinksRouteTo::Original, BASE),
            "https://example.com/preserved/11?format=pdf"
        );
    }

    #[test]
    fn test_readable_preference_ignored_for_image_links() {
        let mut l = link(12, LinkType::Image, None);
        l.readable = Some("archives/1/12_readability.txt".to_string());
        l.image = Some("archives/1/12.png".to_string());
        assert_eq!(
            generate_link_href(&l, LinksRouteTo::Readable, BASE),
            "https://example.com/preserved/12?format=png"
        );
    }

    #[test]
    fn test_monolith_missing_falls_back() {
        let l = link(1, LinkType::Url, Some("https://a.com"));
        assert_eq!(
            generate_link_href(&l, LinksRouteTo::Monolith, BASE),
            "https://a.com"
        );
    }

    #[test]
    fn test_without_instance_url_is_relative() {
        let mut l = link(42, LinkType::Url, Some("https://a.com"));
        l.pdf = Some("archives/1/42.pdf".to_string());
        assert_eq!(
            generate_link_href(&l, LinksRouteTo::Pdf, None),
            "/preserved/42?format=pdf"
        );
    }
}
