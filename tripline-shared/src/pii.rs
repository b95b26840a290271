use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Booking contact email that keeps the full address out of Debug and log
/// output. Formatting reveals just enough to correlate support tickets —
/// the first character of the local part and the domain — while API
/// responses still serialize the real address.
#[derive(Clone, Deserialize)]
pub struct MaskedEmail(String);

impl MaskedEmail {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for MaskedEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.split_once('@') {
            Some((local, domain)) => match local.chars().next() {
                Some(first) => write!(f, "{}***@{}", first, domain),
                None => write!(f, "***@{}", domain),
            },
            // Not an address shape; reveal nothing.
            None => write!(f, "********"),
        }
    }
}

impl fmt::Debug for MaskedEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Serialize for MaskedEmail {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}
