//! Text parts sent alongside the page images.
//!
//! The text part is normally the user's question verbatim. The only fixed
//! prompt is [`CLASSIFICATION_PROMPT`], used when the config selects
//! [`PromptSource::Classification`].

use crate::config::PromptSource;
use crate::error::PdfAskError;

/// Fixed prompt asking the model to classify the attached document.
pub const CLASSIFICATION_PROMPT: &str = r#"You are a document classification assistant. The attached images are the pages of a single document.

1. DOCUMENT TYPE
   - Name the kind of document (for example: invoice, receipt, contract, bank statement, letter, form, scientific paper, slide deck, manual)
   - If none fits, describe it in a few words

2. EVIDENCE
   - List the visual and textual cues that support the classification (titles, logos, tables, signatures, layout)

3. KEY FIELDS
   - Extract the identifying fields typical for that type (issuer, recipient, dates, reference numbers, totals) when they are legible

4. CONFIDENCE
   - State high, medium or low confidence and what would change it

Answer in Markdown. Do not invent values that are not visible on the pages."#;

/// Text part for a submission.
///
/// For [`PromptSource::Question`] the question must contain something other
/// than whitespace. [`PromptSource::Classification`] ignores the question.
pub fn resolve_prompt(question: &str, source: PromptSource) -> Result<String, PdfAskError> {
    match source {
        PromptSource::Question => {
            if question.trim().is_empty() {
                return Err(PdfAskError::EmptyQuestion);
            }
            Ok(question.to_string())
        }
        PromptSource::Classification => Ok(CLASSIFICATION_PROMPT.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_passes_through_unchanged() {
        let text = resolve_prompt("  What color is the background? ", PromptSource::Question).unwrap();
        assert_eq!(text, "  What color is the background? ");
    }

    #[test]
    fn blank_question_rejected() {
        for q in ["", "   ", "\n\t"] {
            assert!(matches!(
                resolve_prompt(q, PromptSource::Question),
                Err(PdfAskError::EmptyQuestion)
            ));
        }
    }

    #[test]
    fn classification_ignores_question() {
        let text = resolve_prompt("", PromptSource::Classification).unwrap();
        assert_eq!(text, CLASSIFICATION_PROMPT);
        assert!(text.contains("DOCUMENT TYPE"));
    }
}
