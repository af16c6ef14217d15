//! Stripe connected-account identifier.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`AccountId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountIdError {
    /// The input is empty or only whitespace.
    #[error("account ID is required")]
    Empty,
    /// The input does not carry the `acct_` prefix.
    #[error("account ID must start with '{prefix}'")]
    MissingPrefix {
        /// Required prefix.
        prefix: &'static str,
    },
    /// The input contains characters other than ASCII alphanumerics and `_`.
    #[error("account ID contains invalid characters")]
    InvalidCharacters,
}

/// Identifier of a Stripe Express connected account (`acct_...`).
///
/// Once bound to a coach the ID never changes, so it doubles as the secondary
/// lookup key of the coach store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Prefix every Stripe account ID carries.
    pub const PREFIX: &'static str = "acct_";

    /// Parse an `AccountId`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is blank, lacks the `acct_` prefix, or
    /// contains anything besides ASCII alphanumerics and underscores.
    pub fn parse(s: &str) -> Result<Self, AccountIdError> {
        let s = s.trim();

        if s.is_empty() {
            return Err(AccountIdError::Empty);
        }

        let Some(rest) = s.strip_prefix(Self::PREFIX) else {
            return Err(AccountIdError::MissingPrefix {
                prefix: Self::PREFIX,
            });
        };

        if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(AccountIdError::InvalidCharacters);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the account ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AccountId {
    type Error = AccountIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for AccountId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for AccountId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for AccountId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(AccountId::parse("acct_1").unwrap().as_str(), "acct_1");
        assert_eq!(
            AccountId::parse(" acct_1Nv0FGQ9RKHgCVdK ").unwrap().as_str(),
            "acct_1Nv0FGQ9RKHgCVdK"
        );
    }

    #[test]
    fn test_parse_blank() {
        assert_eq!(AccountId::parse(""), Err(AccountIdError::Empty));
        assert_eq!(AccountId::parse("  "), Err(AccountIdError::Empty));
    }

    #[test]
    fn test_parse_requires_prefix() {
        assert!(matches!(
            AccountId::parse("cus_123"),
            Err(AccountIdError::MissingPrefix { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_bare_prefix_and_junk() {
        assert_eq!(
            AccountId::parse("acct_"),
            Err(AccountIdError::InvalidCharacters)
        );
        assert_eq!(
            AccountId::parse("acct_12/../x"),
            Err(AccountIdError::InvalidCharacters)
        );
    }

    #[test]
    fn test_serde_validates() {
        let id: AccountId = serde_json::from_str("\"acct_9\"").unwrap();
        assert_eq!(id.to_string(), "acct_9");
        assert!(serde_json::from_str::<AccountId>("\"9\"").is_err());
    }
}
