//! Slack message payloads.

use serde::{Deserialize, Serialize};

/// Legacy message attachment.
///
/// See <https://api.slack.com/reference/messaging/attachments>.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub fallback: String,
    /// Hex color for the attachment strip
    pub color: String,
    pub title: String,
    pub title_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer_icon: Option<String>,
}

/// Body shared by `chat.postMessage` and `chat.update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    pub attachments: Vec<Attachment>,
    pub parse: String,
    pub link_names: u8,
    pub unfurl_links: bool,
    pub unfurl_media: bool,
    pub as_user: bool,
    pub mrkdwn: bool,
}

impl Default for ChatMessage {
    fn default() -> Self {
        Self {
            text: String::new(),
            username: None,
            icon_url: None,
            attachments: Vec::new(),
            parse: "full".to_string(),
            link_names: 1,
            unfurl_links: true,
            unfurl_media: false,
            as_user: false,
            mrkdwn: true,
        }
    }
}

impl ChatMessage {
    /// Message carrying a single attachment.
    pub fn with_attachment(attachment: Attachment) -> Self {
        Self {
            attachments: vec![attachment],
            ..Self::default()
        }
    }
}

/// Where a posted message landed. `ts` is Slack's message handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

/// Entry of `conversations.list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_member: bool,
    #[serde(default)]
    pub num_members: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_post_options() {
        let message = ChatMessage::with_attachment(Attachment {
            fallback: "t".to_string(),
            color: "#B7E0ED".to_string(),
            title: "t".to_string(),
            title_link: "https://stackoverflow.com/q/1".to_string(),
            ..Default::default()
        });

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["parse"], "full");
        assert_eq!(json["link_names"], 1);
        assert_eq!(json["unfurl_links"], true);
        assert_eq!(json["unfurl_media"], false);
        assert_eq!(json["as_user"], false);
        assert_eq!(json["mrkdwn"], true);
        assert!(json.get("text").is_none());
        assert!(json.get("username").is_none());

        let attachment = &json["attachments"][0];
        assert_eq!(attachment["color"], "#B7E0ED");
        assert!(attachment.get("footer").is_none());
    }
}
