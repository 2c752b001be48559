use serde::{Deserialize, Deserializer, Serialize, de::Error};

/// A string wrapper that ensures the string contains something other
/// than whitespace. Used for free-text fields which are required for
/// auditing, like admin decision reasons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Returns None if the string is empty after trimming. The stored
    /// value is trimmed.
    pub fn from_string(text: String) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == text.len() {
            Some(Self(text))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for NonEmptyString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_string(s).ok_or_else(|| Error::custom("NonEmptyString cannot be empty"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_string_creation() {
        assert!(NonEmptyString::from_string("test".to_string()).is_some());
        assert!(NonEmptyString::from_string("".to_string()).is_none());
        assert!(NonEmptyString::from_string(" \n\t".to_string()).is_none());
    }

    #[test]
    fn test_non_empty_string_is_trimmed() {
        let s = NonEmptyString::from_string("  duplicate report \n".to_string()).unwrap();
        assert_eq!(s.as_str(), "duplicate report");
        assert_eq!(s.into_string(), "duplicate report");
    }

    #[test]
    fn test_deserialize_failure_whitespace() {
        let result: Result<NonEmptyString, _> = serde_json::from_str("\"  \"");
        assert!(result.is_err());
    }
}
