//! Preserved artifacts: formats, availability checks, link routing and storage.

mod href;
mod storage;

pub use href::*;
pub use storage::*;

use crate::models::{AccountSettings, Link, LinkType, Tag};
use crate::schemas::SchemaEnum;

/// Artifact field value while a capture is in flight.
pub const PENDING: &str = "pending";
/// Artifact field value when capture is disabled or failed.
pub const UNAVAILABLE: &str = "unavailable";

/// Format selector used in `/preserved/<id>?format=<fmt>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchivedFormat {
    Png,
    Jpeg,
    Pdf,
    Readability,
    Monolith,
}

impl SchemaEnum for ArchivedFormat {
    const ALL: &'static [Self] = &[
        ArchivedFormat::Png,
        ArchivedFormat::Jpeg,
        ArchivedFormat::Pdf,
        ArchivedFormat::Readability,
        ArchivedFormat::Monolith,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            ArchivedFormat::Png => "png",
            ArchivedFormat::Jpeg => "jpeg",
            ArchivedFormat::Pdf => "pdf",
            ArchivedFormat::Readability => "readability",
            ArchivedFormat::Monolith => "monolith",
        }
    }
}

impl ArchivedFormat {
    /// The link field this format is stored in.
    pub fn kind(&self) -> ArtifactKind {
        match self {
            ArchivedFormat::Png | ArchivedFormat::Jpeg => ArtifactKind::Image,
            ArchivedFormat::Pdf => ArtifactKind::Pdf,
            ArchivedFormat::Readability => ArtifactKind::Readable,
            ArchivedFormat::Monolith => ArtifactKind::Monolith,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ArchivedFormat::Png => "image/png",
            ArchivedFormat::Jpeg => "image/jpeg",
            ArchivedFormat::Pdf => "application/pdf",
            ArchivedFormat::Readability => "text/plain; charset=utf-8",
            ArchivedFormat::Monolith => "text/html; charset=utf-8",
        }
    }

    /// File name suffix under `archives/<collectionId>/<linkId>`.
    fn file_suffix(&self) -> &'static str {
        match self {
            ArchivedFormat::Png => ".png",
            ArchivedFormat::Jpeg => ".jpeg",
            ArchivedFormat::Pdf => ".pdf",
            ArchivedFormat::Readability => "_readability.txt",
            ArchivedFormat::Monolith => ".html",
        }
    }
}

/// The four artifact slots a link has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Image,
    Pdf,
    Readable,
    Monolith,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Image,
        ArtifactKind::Pdf,
        ArtifactKind::Readable,
        ArtifactKind::Monolith,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "image",
            ArtifactKind::Pdf => "pdf",
            ArtifactKind::Readable => "readable",
            ArtifactKind::Monolith => "monolith",
        }
    }

    pub fn value<'a>(&self, link: &'a Link) -> Option<&'a str> {
        match self {
            ArtifactKind::Image => link.image.as_deref(),
            ArtifactKind::Pdf => link.pdf.as_deref(),
            ArtifactKind::Readable => link.readable.as_deref(),
            ArtifactKind::Monolith => link.monolith.as_deref(),
        }
    }
}

/// Which artifacts new links get captured as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchivePreferences {
    pub screenshot: bool,
    pub monolith: bool,
    pub pdf: bool,
    pub readable: bool,
}

impl ArchivePreferences {
    pub fn from_account(account: &AccountSettings) -> Self {
        Self {
            screenshot: account.archive_as_screenshot,
            monolith: account.archive_as_monolith,
            pdf: account.archive_as_pdf,
            readable: account.archive_as_readable,
        }
    }

    /// Apply per-tag overrides: any tag saying `true` wins, otherwise any
    /// tag saying `false`, otherwise the account default stands.
    pub fn with_tag_overrides(self, tags: &[Tag]) -> Self {
        fn resolve(default: bool, values: impl Iterator<Item = Option<bool>>) -> bool {
            let values: Vec<bool> = values.flatten().collect();
            if values.contains(&true) {
                true
            } else if values.contains(&false) {
                false
            } else {
                default
            }
        }

        Self {
            screenshot: resolve(self.screenshot, tags.iter().map(|t| t.archive_as_screenshot)),
            monolith: resolve(self.monolith, tags.iter().map(|t| t.archive_as_monolith)),
            pdf: resolve(self.pdf, tags.iter().map(|t| t.archive_as_pdf)),
            readable: resolve(self.readable, tags.iter().map(|t| t.archive_as_readable)),
        }
    }

    fn enabled(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::Image => self.screenshot,
            ArtifactKind::Pdf => self.pdf,
            ArtifactKind::Readable => self.readable,
            ArtifactKind::Monolith => self.monolith,
        }
    }

    /// Starting value of the `kind` slot on a new link: queued (`None`) or
    /// unavailable. Uploaded pdf and image links only wait for their own file.
    pub fn initial_state(&self, link_type: LinkType, kind: ArtifactKind) -> Option<&'static str> {
        let wanted = match link_type {
            LinkType::Url => self.enabled(kind),
            LinkType::Pdf => kind == ArtifactKind::Pdf,
            LinkType::Image => kind == ArtifactKind::Image,
        };
        if wanted {
            None
        } else {
            Some(UNAVAILABLE)
        }
    }
}

/// Whether the artifact in `kind` has been captured and can be served.
pub fn format_available(link: &Link, kind: ArtifactKind) -> bool {
    is_stored(kind.value(link))
}

/// True for a storage path, false for absent, pending or unavailable.
pub fn is_stored(value: Option<&str>) -> bool {
    matches!(value, Some(v) if !v.is_empty() && v != PENDING && v != UNAVAILABLE)
}
