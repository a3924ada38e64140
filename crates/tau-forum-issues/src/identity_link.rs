//! Back-reference links that tie a GitHub issue or comment to its Discord origin.
//!
//! The link is the only association between the two sides: it is rendered into
//! every mirrored body and recovered from it on reconciliation.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

pub const IDENTITY_LINK_ORIGIN: &str = "https://discord.com";
const IDENTITY_LINK_PATTERN: &str = r"https://discord\.com/channels/(\d+)/(\d+)/(\d+)(/|\d|[A-Za-z_])?";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Decoded Discord origin of a mirrored issue or comment.
pub struct IdentityLink {
    pub guild_id: String,
    pub channel_id: String,
    pub message_id: String,
}

impl IdentityLink {
    pub fn new(
        guild_id: impl Into<String>,
        channel_id: impl Into<String>,
        message_id: impl Into<String>,
    ) -> Self {
        Self {
            guild_id: guild_id.into(),
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }

    pub fn url(&self) -> String {
        encode_identity_link(&self.guild_id, &self.channel_id, &self.message_id)
    }
}

impl fmt::Display for IdentityLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

fn identity_link_regex() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(IDENTITY_LINK_PATTERN).ok())
        .as_ref()
}

/// Renders the Discord message URL used as the identity token.
pub fn encode_identity_link(guild_id: &str, channel_id: &str, message_id: &str) -> String {
    format!("{IDENTITY_LINK_ORIGIN}/channels/{guild_id}/{channel_id}/{message_id}")
}

/// Drops the scheme from identity-link URLs in user text so the rendered
/// body keeps a single decodable link.
pub fn neutralize_identity_links(text: &str) -> String {
    let prefix = format!("{IDENTITY_LINK_ORIGIN}/channels/");
    let Some(bare) = prefix.strip_prefix("https://") else {
        return text.to_string();
    };
    text.replace(prefix.as_str(), bare)
}

/// Returns every well-formed identity link in `body`, in order of appearance.
///
/// A match followed by another path segment, or by more identifier characters,
/// is not a message link and is skipped.
pub fn collect_identity_links(body: &str) -> Vec<IdentityLink> {
    let Some(pattern) = identity_link_regex() else {
        return Vec::new();
    };
    pattern
        .captures_iter(body)
        .filter(|captures| captures.get(4).is_none())
        .filter_map(|captures| {
            let guild_id = captures.get(1)?.as_str();
            let channel_id = captures.get(2)?.as_str();
            let message_id = captures.get(3)?.as_str();
            Some(IdentityLink::new(guild_id, channel_id, message_id))
        })
        .collect()
}

/// Decodes the first identity link in `body`. `None` means the body is not
/// a mirrored thread and callers skip it.
pub fn decode_identity_link(body: &str) -> Option<IdentityLink> {
    collect_identity_links(body).into_iter().next()
}
