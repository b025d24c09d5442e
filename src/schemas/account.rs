//! Session, password-reset, email-verification and access-token request shapes.
//!
//! No route in this crate consumes these; the session and email flows that
//! submit them run upstream, and they are kept as validation contracts.

use serde_json::Value;

use super::{Format, Input, Presence, SchemaEnum, Text, ValidationErrors};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgotPassword {
    pub email: String,
}

impl ForgotPassword {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut input = Input::new(value);
        let email = input.text("email", Text::required().format(Format::Email));
        input.finish()?;
        Ok(Self {
            email: email.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetPassword {
    pub token: String,
    pub password: String,
}

impl ResetPassword {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut input = Input::new(value);
        let token = input.text("token", Text::required());
        let password = input.text("password", Text::required().min(8));
        input.finish()?;
        Ok(Self {
            token: token.unwrap_or_default(),
            password: password.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyEmail {
    pub token: String,
}

impl VerifyEmail {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut input = Input::new(value);
        let token = input.text("token", Text::required());
        input.finish()?;
        Ok(Self {
            token: token.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostSession {
    pub username: String,
    pub password: String,
    pub session_name: Option<String>,
}

impl PostSession {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut input = Input::new(value);
        let username = input.text("username", Text::required().min(3).max(50));
        let password = input.text("password", Text::required().min(8));
        let session_name = input.text("sessionName", Text::optional().trim().max(50));
        input.finish()?;
        Ok(Self {
            username: username.unwrap_or_default(),
            password: password.unwrap_or_default(),
            session_name,
        })
    }
}

/// Lifetime options for personal access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenExpiry {
    SevenDays,
    OneMonth,
    TwoMonths,
    ThreeMonths,
    Never,
}

impl SchemaEnum for TokenExpiry {
    const ALL: &'static [Self] = &[
        TokenExpiry::SevenDays,
        TokenExpiry::OneMonth,
        TokenExpiry::TwoMonths,
        TokenExpiry::ThreeMonths,
        TokenExpiry::Never,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            TokenExpiry::SevenDays => "sevenDays",
            TokenExpiry::OneMonth => "oneMonth",
            TokenExpiry::TwoMonths => "twoMonths",
            TokenExpiry::ThreeMonths => "threeMonths",
            TokenExpiry::Never => "never",
        }
    }
}

impl TokenExpiry {
    /// Lifetime in days; `None` never expires.
    pub fn days(&self) -> Option<i64> {
        match self {
            TokenExpiry::SevenDays => Some(7),
            TokenExpiry::OneMonth => Some(30),
            TokenExpiry::TwoMonths => Some(60),
            TokenExpiry::ThreeMonths => Some(90),
            TokenExpiry::Never => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostToken {
    pub name: String,
    pub expires: TokenExpiry,
}

impl PostToken {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut input = Input::new(value);
        let name = input.text("name", Text::required().max(50));
        let expires = input.choice::<TokenExpiry>("expires", Presence::Required);
        input.finish()?;
        Ok(Self {
            name: name.unwrap_or_default(),
            expires: expires.unwrap_or(TokenExpiry::SevenDays),
        })
    }
}
