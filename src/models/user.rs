//! Account models: settings, public profile and the email-change notice.

use serde::{Deserialize, Serialize};

use crate::schemas::SchemaEnum;

/// Which representation of a link opens by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinksRouteTo {
    #[default]
    Original,
    Pdf,
    Readable,
    Monolith,
    Screenshot,
    Details,
}

impl SchemaEnum for LinksRouteTo {
    const ALL: &'static [Self] = &[
        LinksRouteTo::Original,
        LinksRouteTo::Pdf,
        LinksRouteTo::Readable,
        LinksRouteTo::Monolith,
        LinksRouteTo::Screenshot,
        LinksRouteTo::Details,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            LinksRouteTo::Original => "ORIGINAL",
            LinksRouteTo::Pdf => "PDF",
            LinksRouteTo::Readable => "READABLE",
            LinksRouteTo::Monolith => "MONOLITH",
            LinksRouteTo::Screenshot => "SCREENSHOT",
            LinksRouteTo::Details => "DETAILS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AiTaggingMethod {
    #[default]
    Disabled,
    Generate,
    Existing,
    Predefined,
}

impl SchemaEnum for AiTaggingMethod {
    const ALL: &'static [Self] = &[
        AiTaggingMethod::Disabled,
        AiTaggingMethod::Generate,
        AiTaggingMethod::Existing,
        AiTaggingMethod::Predefined,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            AiTaggingMethod::Disabled => "DISABLED",
            AiTaggingMethod::Generate => "GENERATE",
            AiTaggingMethod::Existing => "EXISTING",
            AiTaggingMethod::Predefined => "PREDEFINED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
    #[default]
    Auto,
}

impl SchemaEnum for Theme {
    const ALL: &'static [Self] = &[Theme::Dark, Theme::Light, Theme::Auto];

    fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
            Theme::Auto => "auto",
        }
    }
}

/// A user's own view of their account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSettings {
    pub id: i64,
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    pub archive_as_screenshot: bool,
    pub archive_as_monolith: bool,
    #[serde(rename = "archiveAsPDF")]
    pub archive_as_pdf: bool,
    pub archive_as_readable: bool,
    pub archive_as_wayback_machine: bool,
    pub links_route_to: LinksRouteTo,
    pub ai_tagging_method: AiTaggingMethod,
    pub ai_predefined_tags: Vec<String>,
    pub ai_tag_existing_links: bool,
    pub locale: String,
    pub is_private: bool,
    pub prevent_duplicate_links: bool,
    pub collection_order: Vec<i64>,
    pub whitelisted_users: Vec<String>,
    pub referred_by: Option<String>,
    pub theme: Theme,
    pub readable_font_family: Option<String>,
    pub readable_font_size: Option<String>,
    pub readable_line_height: Option<String>,
    pub readable_line_width: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip)]
    pub password_hash: Option<String>,
}

impl AccountSettings {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            username: self.username.clone(),
            image: self.image.clone(),
        }
    }

    pub fn public_profile(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name.clone(),
            username: self.username.clone(),
            image: self.image.clone(),
            archive_as_screenshot: self.archive_as_screenshot,
            archive_as_monolith: self.archive_as_monolith,
            archive_as_pdf: self.archive_as_pdf,
        }
    }

    /// Whether `viewer` may read this profile.
    pub fn visible_to(&self, viewer: &AccountSettings) -> bool {
        if !self.is_private || self.id == viewer.id {
            return true;
        }
        viewer
            .username
            .as_ref()
            .is_some_and(|name| self.whitelisted_users.iter().any(|w| w == name))
    }
}

/// Minimal identity shown next to collection members.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub name: Option<String>,
    pub username: Option<String>,
    pub image: Option<String>,
}

/// Profile visible to other users.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub name: Option<String>,
    pub username: Option<String>,
    pub image: Option<String>,
    pub archive_as_screenshot: bool,
    pub archive_as_monolith: bool,
    #[serde(rename = "archiveAsPDF")]
    pub archive_as_pdf: bool,
}

/// What the client shows before confirming an email change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailChangeNotice {
    pub old_email: Option<String>,
    pub new_email: String,
    pub requires_password: bool,
    pub warnings: Vec<String>,
}

pub const EMAIL_CHANGE_WARNING: &str =
    "Changing your email also changes the address you sign in with.";
pub const STRIPE_UPDATE_NOTE: &str = "Your billing email will be updated as well.";

impl EmailChangeNotice {
    pub fn new(
        account: &AccountSettings,
        new_email: String,
        stripe_enabled: bool,
        google_sso_enabled: bool,
    ) -> Self {
        let mut warnings = vec![EMAIL_CHANGE_WARNING.to_string()];
        if stripe_enabled {
            warnings.push(STRIPE_UPDATE_NOTE.to_string());
        }
        if google_sso_enabled {
            warnings.push(sso_removal_warning("Google"));
        }
        Self {
            old_email: account.email.clone(),
            new_email,
            requires_password: account.password_hash.is_some(),
            warnings,
        }
    }
}

pub fn sso_removal_warning(service: &str) -> String {
    format!("Any {service} single sign-on linked to this account will be removed.")
}
