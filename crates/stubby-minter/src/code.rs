use crate::error::MintError;
use std::fmt::Display;
use stubby_core::ShortToken;

const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 32;

/// The code a resource was minted under.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MintedCode {
    /// A system-generated token.
    Generated(ShortToken),
    /// A user-provided custom alias.
    Custom(String),
}

impl MintedCode {
    /// Validates a custom alias.
    ///
    /// Valid aliases are 3-32 characters and contain only `[a-zA-Z0-9_-]`.
    pub fn custom(alias: impl Into<String>) -> Result<Self, MintError> {
        let alias = alias.into();
        Self::validate(&alias)?;
        Ok(Self::Custom(alias))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        match self {
            MintedCode::Generated(token) => token.as_str(),
            MintedCode::Custom(alias) => alias.as_str(),
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, MintedCode::Custom(_))
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self)
    }

    fn validate(alias: &str) -> Result<(), MintError> {
        if alias.len() < MIN_LENGTH || alias.len() > MAX_LENGTH {
            return Err(MintError::InvalidAlias(format!(
                "length must be between {} and {}, got {}",
                MIN_LENGTH,
                MAX_LENGTH,
                alias.len()
            )));
        }

        if !alias
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(MintError::InvalidAlias(format!(
                "must contain only alphanumeric characters, hyphens, or underscores: '{}'",
                alias
            )));
        }

        Ok(())
    }
}

impl From<ShortToken> for MintedCode {
    fn from(token: ShortToken) -> Self {
        MintedCode::Generated(token)
    }
}

impl Display for MintedCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
