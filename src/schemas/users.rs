//! Account creation and update schemas.
//!
//! Which identity field is mandatory depends on whether outbound email is
//! configured: with email, accounts are keyed by a normalized address;
//! without it, by a lowercase username.

use serde_json::Value;

use super::{Format, Input, Presence, Text, ValidationErrors};
use crate::models::{AiTaggingMethod, LinksRouteTo, Theme};

const NAME: Text = Text::optional().trim().min(1).max(50);
const PASSWORD: Text = Text::optional().min(8).max(2048);
const EMAIL: Text = Text::required().trim().lowercase().format(Format::Email);
const USERNAME: Text = Text::required().trim().format(Format::Username);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostUser {
    pub name: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub invite: Option<bool>,
}

impl PostUser {
    pub fn parse(value: &Value, email_enabled: bool) -> Result<Self, ValidationErrors> {
        let mut input = Input::new(value);
        let name = input.text("name", NAME);
        let password = input.text("password", PASSWORD);
        let (email, username) = identity(&mut input, email_enabled);
        let invite = input.boolean("invite", Presence::Optional);
        input.finish()?;
        Ok(Self {
            name,
            password,
            email,
            username,
            invite,
        })
    }
}

/// Email and username under the active delivery mode.
fn identity(input: &mut Input<'_>, email_enabled: bool) -> (Option<String>, Option<String>) {
    if email_enabled {
        let email = input.text("email", EMAIL);
        let username = input.text("username", Text { presence: Presence::Optional, ..USERNAME });
        (email, username)
    } else {
        let email = input.text("email", Text::nullish());
        let username = input.text("username", USERNAME);
        (email, username)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    /// `Some(None)` clears the avatar.
    pub image: Option<Option<String>>,
    /// Current password, required to confirm an email change.
    pub password: Option<String>,
    pub new_password: Option<String>,
    pub old_password: Option<String>,
    pub archive_as_screenshot: Option<bool>,
    pub archive_as_monolith: Option<bool>,
    pub archive_as_pdf: Option<bool>,
    pub archive_as_readable: Option<bool>,
    pub archive_as_wayback_machine: Option<bool>,
    pub ai_tagging_method: Option<AiTaggingMethod>,
    pub ai_predefined_tags: Option<Vec<String>>,
    pub ai_tag_existing_links: Option<bool>,
    pub locale: Option<String>,
    pub is_private: Option<bool>,
    pub prevent_duplicate_links: Option<bool>,
    pub collection_order: Option<Vec<i64>>,
    pub links_route_to: Option<LinksRouteTo>,
    pub whitelisted_users: Option<Vec<String>>,
    pub referred_by: Option<Option<String>>,
}

impl UpdateUser {
    pub fn parse(value: &Value, email_enabled: bool) -> Result<Self, ValidationErrors> {
        let mut input = Input::new(value);
        let (email, username) = identity(&mut input, email_enabled);
        let parsed = Self {
            name: input.text("name", NAME),
            email,
            username,
            image: input.nullable_text("image", Text::nullish()),
            password: input.text("password", PASSWORD),
            new_password: input.text("newPassword", PASSWORD),
            old_password: input.text("oldPassword", PASSWORD),
            archive_as_screenshot: input.boolean("archiveAsScreenshot", Presence::Optional),
            archive_as_monolith: input.boolean("archiveAsMonolith", Presence::Optional),
            archive_as_pdf: input.boolean("archiveAsPDF", Presence::Optional),
            archive_as_readable: input.boolean("archiveAsReadable", Presence::Optional),
            archive_as_wayback_machine: input
                .boolean("archiveAsWaybackMachine", Presence::Optional),
            ai_tagging_method: input.choice("aiTaggingMethod", Presence::Optional),
            ai_predefined_tags: input.texts(
                "aiPredefinedTags",
                Presence::Optional,
                Some(20),
                Text::required().trim().max(20),
            ),
            ai_tag_existing_links: input.boolean("aiTagExistingLinks", Presence::Optional),
            locale: input.text("locale", Text::optional().max(20)),
            is_private: input.boolean("isPrivate", Presence::Optional),
            prevent_duplicate_links: input.boolean("preventDuplicateLinks", Presence::Optional),
            collection_order: input.integers("collectionOrder", Presence::Optional),
            links_route_to: input.choice("linksRouteTo", Presence::Optional),
            whitelisted_users: input.texts(
                "whitelistedUsers",
                Presence::Optional,
                None,
                Text::required().max(50),
            ),
            referred_by: input.nullable_text("referredBy", Text::nullish().max(100)),
        };
        input.finish()?;
        Ok(parsed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateUserPreference {
    pub theme: Option<Theme>,
    pub readable_font_family: Option<String>,
    pub readable_font_size: Option<String>,
    pub readable_line_height: Option<String>,
    pub readable_line_width: Option<String>,
}

impl UpdateUserPreference {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        const SETTING: Text = Text::optional().trim().max(100);
        let mut input = Input::new(value);
        let parsed = Self {
            theme: input.choice("theme", Presence::Optional),
            readable_font_family: input.text("readableFontFamily", SETTING),
            readable_font_size: input.text("readableFontSize", SETTING),
            readable_line_height: input.text("readableLineHeight", SETTING),
            readable_line_width: input.text("readableLineWidth", SETTING),
        };
        input.finish()?;
        Ok(parsed)
    }
}

/// Body of an email-change preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailChange {
    pub email: String,
}

impl EmailChange {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut input = Input::new(value);
        let email = input.text("email", EMAIL);
        input.finish()?;
        Ok(Self {
            email: email.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_user_with_email_normalizes_address() {
        let parsed = PostUser::parse(
            &json!({ "name": " Alice ", "email": "  Alice@Example.COM ", "password": "hunter2hunter2" }),
            true,
        )
        .unwrap();
        assert_eq!(parsed.email.as_deref(), Some("alice@example.com"));
        assert_eq!(parsed.name.as_deref(), Some("Alice"));
        assert!(parsed.username.is_none());
    }

    #[test]
    fn test_post_user_with_email_requires_email() {
        let errors = PostUser::parse(&json!({ "username": "alice" }), true).unwrap_err();
        assert_eq!(errors.messages_for("email"), vec!["Required"]);
    }

    #[test]
    fn test_post_user_without_email_requires_username() {
        let errors = PostUser::parse(&json!({ "email": "a@b.co" }), false).unwrap_err();
        assert_eq!(errors.messages_for("username"), vec!["Required"]);

        let parsed = PostUser::parse(&json!({ "username": "  alice_01 " }), false).unwrap();
        assert_eq!(parsed.username.as_deref(), Some("alice_01"));
    }

    #[test]
    fn test_update_user_username_rules_without_email() {
        for bad in ["Alice", "ab", "has space", "x".repeat(51).as_str()] {
            let result = UpdateUser::parse(&json!({ "username": bad }), false);
            assert!(result.is_err(), "{bad:?} should be rejected");
        }
        for good in ["abc", "a-b_c", "x".repeat(50).as_str()] {
            let parsed = UpdateUser::parse(&json!({ "username": good }), false).unwrap();
            assert_eq!(parsed.username.as_deref(), Some(good));
        }
        let errors = UpdateUser::parse(&json!({}), false).unwrap_err();
        assert_eq!(errors.messages_for("username"), vec!["Required"]);
    }

    #[test]
    fn test_update_user_with_email_makes_username_optional() {
        let parsed = UpdateUser::parse(&json!({ "email": "new@example.com" }), true).unwrap();
        assert!(parsed.username.is_none());
        assert!(UpdateUser::parse(&json!({ "email": "new@example.com", "username": "BAD" }), true)
            .is_err());
    }

    #[test]
    fn test_update_user_field_bounds() {
        let errors = UpdateUser::parse(
            &json!({
                "username": "alice",
                "linksRouteTo": "SOMEWHERE",
                "aiPredefinedTags": ["ok", "this tag is far too long to keep"],
                "locale": "x".repeat(21),
                "referredBy": null,
                "collectionOrder": [1, "2"]
            }),
            false,
        )
        .unwrap_err();
        assert_eq!(errors.messages_for("linksRouteTo").len(), 1);
        assert_eq!(
            errors.messages_for("aiPredefinedTags.1"),
            vec!["String must contain at most 20 character(s)"]
        );
        assert_eq!(
            errors.messages_for("locale"),
            vec!["String must contain at most 20 character(s)"]
        );
        assert_eq!(
            errors.messages_for("collectionOrder.1"),
            vec!["Expected number, received string"]
        );
        assert!(errors.messages_for("referredBy").is_empty());
    }

    #[test]
    fn test_update_user_image_null_clears() {
        let parsed =
            UpdateUser::parse(&json!({ "username": "alice", "image": null }), false).unwrap();
        assert_eq!(parsed.image, Some(None));
        let parsed = UpdateUser::parse(&json!({ "username": "alice" }), false).unwrap();
        assert_eq!(parsed.image, None);
    }

    #[test]
    fn test_update_preferences() {
        let parsed = UpdateUserPreference::parse(&json!({
            "theme": "dark",
            "readableFontSize": " 18px "
        }))
        .unwrap();
        assert_eq!(parsed.theme, Some(Theme::Dark));
        assert_eq!(parsed.readable_font_size.as_deref(), Some("18px"));
        assert!(UpdateUserPreference::parse(&json!({ "theme": "sepia" })).is_err());
    }

    #[test]
    fn test_email_change_normalizes() {
        let parsed = EmailChange::parse(&json!({ "email": " New@Example.com" })).unwrap();
        assert_eq!(parsed.email, "new@example.com");
        assert!(EmailChange::parse(&json!({ "email": "nope" })).is_err());
    }
}
