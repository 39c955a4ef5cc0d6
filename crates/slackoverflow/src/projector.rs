//! Question → Slack message rendering.

use notify::{Attachment, ChatMessage};
use store::{QuestionRecord, UserRecord};

pub const COLOR_ANSWERED: &str = "#30AC1F";
pub const COLOR_UNANSWERED: &str = "#B7E0ED";
pub const THUMB_UP: &str = ":+1:";
pub const THUMB_DOWN: &str = ":-1:";
pub const FOOTER: &str = "slackoverflow";

/// Footer icon used when no team icon is configured.
pub const FALLBACK_FOOTER_ICON: &str = "https://aframe.io/images/aframe-logo-192.png";

/// Display name used for owners without a stored profile.
const ANONYMOUS: &str = "Anonymous";

pub fn color(question: &QuestionRecord) -> &'static str {
    if question.is_answered {
        COLOR_ANSWERED
    } else {
        COLOR_UNANSWERED
    }
}

pub fn thumb(question: &QuestionRecord) -> &'static str {
    if question.score < 0 {
        THUMB_DOWN
    } else {
        THUMB_UP
    }
}

/// Full message of a tracked question.
pub fn render(
    question: &QuestionRecord,
    user: Option<&UserRecord>,
    team_icon: Option<&str>,
) -> ChatMessage {
    let display_name = user
        .map(|u| u.display_name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(ANONYMOUS);

    let mut message = ChatMessage::with_attachment(Attachment {
        text: Some(format!(
            ":pencil: {} :speech_balloon: {} {} {} :eye: {}",
            question.answer_count,
            question.comment_count,
            thumb(question),
            question.score,
            question.view_count,
        )),
        footer: Some(FOOTER.to_string()),
        footer_icon: Some(
            team_icon
                .filter(|icon| !icon.is_empty())
                .unwrap_or(FALLBACK_FOOTER_ICON)
                .to_string(),
        ),
        ..header(question)
    });
    message.username = Some(format!("{display_name} asked on {}:", question.site));
    message.icon_url = user
        .map(|u| u.profile_image.clone())
        .filter(|image| !image.is_empty());
    message
}

/// Final message of a question leaving the tracked window: title and color only.
pub fn render_retired(question: &QuestionRecord) -> ChatMessage {
    ChatMessage::with_attachment(header(question))
}

fn header(question: &QuestionRecord) -> Attachment {
    Attachment {
        fallback: question.title.clone(),
        title: question.title.clone(),
        title_link: question.link.clone(),
        color: color(question).to_string(),
        ..Attachment::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(score: i64, answered: bool) -> QuestionRecord {
        QuestionRecord {
            id: 42,
            title: "How do I rotate an entity?".to_string(),
            link: "https://stackoverflow.com/q/42".to_string(),
            site: "stackoverflow".to_string(),
            score,
            is_answered: answered,
            answer_count: 1,
            comment_count: 2,
            view_count: 30,
            ..Default::default()
        }
    }

    fn user() -> UserRecord {
        UserRecord {
            id: 7,
            display_name: "vr dev".to_string(),
            profile_image: "https://example.com/7.png".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_unanswered() {
        let message = render(&question(5, false), Some(&user()), None);
        let attachment = &message.attachments[0];

        assert_eq!(message.username.as_deref(), Some("vr dev asked on stackoverflow:"));
        assert_eq!(message.icon_url.as_deref(), Some("https://example.com/7.png"));
        assert_eq!(attachment.color, COLOR_UNANSWERED);
        assert_eq!(attachment.title_link, "https://stackoverflow.com/q/42");
        assert_eq!(
            attachment.text.as_deref(),
            Some(":pencil: 1 :speech_balloon: 2 :+1: 5 :eye: 30")
        );
        assert_eq!(attachment.footer.as_deref(), Some("slackoverflow"));
        assert_eq!(attachment.footer_icon.as_deref(), Some(FALLBACK_FOOTER_ICON));
    }

    #[test]
    fn test_render_answered_negative() {
        let message = render(&question(-2, true), Some(&user()), Some("https://team/icon.png"));
        let attachment = &message.attachments[0];

        assert_eq!(attachment.color, COLOR_ANSWERED);
        assert!(attachment.text.as_deref().unwrap().contains(":-1: -2"));
        assert_eq!(attachment.footer_icon.as_deref(), Some("https://team/icon.png"));
    }

    #[test]
    fn test_zero_score_is_thumb_up() {
        assert_eq!(thumb(&question(0, false)), THUMB_UP);
    }

    #[test]
    fn test_render_without_user() {
        let message = render(&question(0, false), None, Some(""));
        assert_eq!(message.username.as_deref(), Some("Anonymous asked on stackoverflow:"));
        assert!(message.icon_url.is_none());
        assert_eq!(
            message.attachments[0].footer_icon.as_deref(),
            Some(FALLBACK_FOOTER_ICON)
        );
    }

    #[test]
    fn test_render_retired_is_stripped() {
        let message = render_retired(&question(3, true));
        let attachment = &message.attachments[0];

        assert_eq!(attachment.title, "How do I rotate an entity?");
        assert_eq!(attachment.fallback, attachment.title);
        assert_eq!(attachment.color, COLOR_ANSWERED);
        assert!(attachment.text.is_none());
        assert!(attachment.footer.is_none());
        assert!(attachment.footer_icon.is_none());
        assert!(message.username.is_none());
    }
}
