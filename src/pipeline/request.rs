//! Request assembly: text + encoded images → chat-completions request body.
//!
//! Every request holds exactly one `user` message whose content is the text
//! part followed by image parts. The two submission patterns differ only in
//! how images are grouped:
//!
//! * [`build_batched`]: one request carrying every image, in page order.
//! * [`build_per_page`]: one request per image, each repeating the text.

use crate::config::{AskConfig, DetailLevel};
use crate::error::PdfAskError;
use crate::pipeline::encode::EncodedImage;
use serde::{Deserialize, Serialize};

/// Outbound chat-completions body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

/// One element of a message's `content` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// `data:<mime>;base64,<payload>`
    pub url: String,
    pub detail: DetailLevel,
}

impl ChatRequest {
    /// Number of image parts across all messages.
    pub fn image_count(&self) -> usize {
        self.parts()
            .filter(|p| matches!(p, ContentPart::ImageUrl { .. }))
            .count()
    }

    /// Number of text parts across all messages.
    pub fn text_count(&self) -> usize {
        self.parts()
            .filter(|p| matches!(p, ContentPart::Text { .. }))
            .count()
    }

    fn parts(&self) -> impl Iterator<Item = &ContentPart> {
        self.messages.iter().flat_map(|m| m.content.iter())
    }
}

impl From<&EncodedImage> for ContentPart {
    fn from(img: &EncodedImage) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: img.to_data_url(),
                detail: img.detail,
            },
        }
    }
}

/// One request whose single user message holds `text` and every image.
pub fn build_batched(
    text: &str,
    images: &[EncodedImage],
    config: &AskConfig,
) -> Result<ChatRequest, PdfAskError> {
    let text = checked_text(text)?;
    let mut content = Vec::with_capacity(images.len() + 1);
    content.push(ContentPart::Text { text });
    content.extend(images.iter().map(ContentPart::from));
    Ok(user_request(content, config))
}

/// One request per image, in the same order as `images`.
pub fn build_per_page(
    text: &str,
    images: &[EncodedImage],
    config: &AskConfig,
) -> Result<Vec<ChatRequest>, PdfAskError> {
    let text = checked_text(text)?;
    Ok(images
        .iter()
        .map(|img| {
            let content = vec![
                ContentPart::Text { text: text.clone() },
                ContentPart::from(img),
            ];
            user_request(content, config)
        })
        .collect())
}

fn checked_text(text: &str) -> Result<String, PdfAskError> {
    if text.trim().is_empty() {
        return Err(PdfAskError::EmptyQuestion);
    }
    Ok(text.to_string())
}

fn user_request(content: Vec<ContentPart>, config: &AskConfig) -> ChatRequest {
    ChatRequest {
        model: config.model.clone(),
        messages: vec![ChatMessage {
            role: Role::User,
            content,
        }],
        max_tokens: config.max_tokens,
    }
}
