//! Ad impression types.

use serde::{Deserialize, Serialize};

use crate::ParseEnumError;

/// Ad network that served the impression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdPlatform {
    Admob,
    Adsense,
    Unity,
    Direct,
}

impl AdPlatform {
    /// Stable string form used in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            AdPlatform::Admob => "admob",
            AdPlatform::Adsense => "adsense",
            AdPlatform::Unity => "unity",
            AdPlatform::Direct => "direct",
        }
    }

    /// Parse the database string form.
    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "admob" => Ok(AdPlatform::Admob),
            "adsense" => Ok(AdPlatform::Adsense),
            "unity" => Ok(AdPlatform::Unity),
            "direct" => Ok(AdPlatform::Direct),
            other => Err(ParseEnumError {
                kind: "ad platform",
                value: other.to_string(),
            }),
        }
    }
}

/// Client metadata supplied by the playback tracker.
///
/// Used by the fraud heuristic and stored verbatim for moderation review.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientMeta {
    /// Crude bot check over the user agent. Real fraud policy lives
    /// outside the ledger; this only catches self-identified crawlers.
    pub fn looks_like_bot(&self) -> bool {
        match &self.user_agent {
            Some(ua) => {
                let ua = ua.to_ascii_lowercase();
                ua.contains("bot") || ua.contains("crawler") || ua.contains("spider")
            }
            None => false,
        }
    }
}
