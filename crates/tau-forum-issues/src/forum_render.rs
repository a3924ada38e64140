//! GitHub markdown rendering for mirrored Discord messages.

use crate::chat_message::{ChatAttachment, ChatMessage};
use crate::identity_link::neutralize_identity_links;

pub const DEFAULT_AVATAR_URL: &str = "https://cdn.discordapp.com/embed/avatars/0.png";
const BOT_MARKER: &str = "`BOT`";
const SUPPORTED_IMAGE_CONTENT_TYPES: &[&str] =
    &["image/png", "image/jpeg", "image/gif", "image/webp"];

/// Returns true when the attachment can be inlined as a GitHub image.
pub fn is_supported_image_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        return false;
    };
    let normalized = content_type.to_ascii_lowercase();
    let base = normalized
        .split(';')
        .next()
        .map(str::trim)
        .unwrap_or(normalized.as_str());
    SUPPORTED_IMAGE_CONTENT_TYPES.contains(&base)
}

fn escape_link_text(value: &str) -> String {
    value.replace('[', "\\[").replace(']', "\\]")
}

fn render_image_attachment(attachment: &ChatAttachment) -> String {
    format!(
        "![{}]({})",
        escape_link_text(attachment.name.trim()),
        attachment.url.trim()
    )
}

/// Renders a Discord message as an issue or comment body.
///
/// The author badge and the author name both link to the message's identity
/// link. Message links quoted in the text lose their scheme, so the body
/// carries exactly one distinct link URL.
pub fn render_message_body(message: &ChatMessage) -> String {
    let link = message.identity_link().url();
    let author = escape_link_text(message.author.display_name.trim());
    let avatar = message
        .author
        .avatar_url
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_AVATAR_URL);

    let mut rendered = format!(
        "<kbd>[![{author}]({avatar})]({link})</kbd> [{author}]({link})  {BOT_MARKER}\n\n{}",
        neutralize_identity_links(message.content.trim_end())
    );
    let images = message
        .attachments
        .iter()
        .filter(|attachment| is_supported_image_content_type(attachment.content_type.as_deref()))
        .map(render_image_attachment)
        .collect::<Vec<_>>();
    if !images.is_empty() {
        rendered.push('\n');
        rendered.push_str(&images.join("\n"));
    }
    rendered
}
