//! Reply-section extraction and text-to-speech.
//!
//! Only the persona's labeled "Practice" section of a reply is read aloud.
//! If the model's output does not contain the marker, nothing is spoken -
//! better silent than reading score tables and markdown at the user.

use std::fmt;

use regex::Regex;
use tracing::{debug, info};

const TRANSLATE_TTS_URL: &str = "https://translate.google.com/translate_tts";

/// Failure during audio generation. Logged and skipped by the engine; the
/// text reply is unaffected.
#[derive(Debug)]
pub struct SynthesisError(pub String);

impl fmt::Display for SynthesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "synthesis failed: {}", self.0)
    }
}

impl std::error::Error for SynthesisError {}

/// Matcher for one persona's labeled reply section.
///
/// Built from the marker word so personas can change their template without
/// touching the extractor. Matches a bolded `**Word...:**` label and captures
/// everything after it to the end of the reply, across newlines.
pub struct ReplyMarker {
    pattern: Regex,
}

impl ReplyMarker {
    /// Marker for a `**{word}...:**` section (e.g. `**Practice/Chat:**`).
    pub fn bold_section(word: &str) -> Self {
        // Compile-time-constant shape; only `word` varies and is escaped.
        let pattern = Regex::new(&format!(
            r"(?s)\*\*{}[^:\n]*:\*\*(.*)",
            regex::escape(word)
        ))
        .expect("marker pattern is valid");
        Self { pattern }
    }

    /// The raw section text after the marker, or `None` if the reply does
    /// not follow the template. A missing marker is not an error.
    pub fn extract<'a>(&self, reply: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(reply)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }
}

/// Speech synthesizer backed by the Google Translate TTS endpoint.
pub struct Synthesizer {
    client: reqwest::Client,
    emphasis: Regex,
    disallowed: Regex,
}

impl Synthesizer {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            emphasis: Regex::new(r"[*_~]").expect("valid pattern"),
            disallowed: Regex::new(r#"[^\w\s,.:;?!'"]"#).expect("valid pattern"),
        }
    }

    /// Extract and clean the speakable section of a reply.
    ///
    /// Returns `None` when the marker is absent or nothing speakable
    /// remains after cleanup.
    pub fn prepare(&self, reply: &str, marker: &ReplyMarker) -> Option<String> {
        let section = marker.extract(reply)?;

        let text = self.emphasis.replace_all(section, "");
        let text = self.disallowed.replace_all(&text, "");
        let text = text.trim();

        if text.is_empty() {
            debug!("Nothing speakable left after cleanup");
            return None;
        }
        Some(text.to_string())
    }

    /// Synthesize English speech for cleaned text. Returns raw audio bytes;
    /// the caller sends them and drops them.
    pub async fn speak(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let preview: String = text.chars().take(50).collect();
        info!("🗣️ Speaking: \"{preview}\"");

        let response = self
            .client
            .get(TRANSLATE_TTS_URL)
            .query(&[("ie", "UTF-8"), ("client", "tw-ob"), ("tl", "en"), ("q", text)])
            .send()
            .await
            .map_err(|e| SynthesisError(format!("TTS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SynthesisError(format!(
                "TTS returned {}",
                response.status()
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SynthesisError(format!("failed to read TTS audio: {e}")))?;

        debug!("Got {} bytes of audio", audio.len());
        Ok(audio.to_vec())
    }
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn practice() -> ReplyMarker {
        ReplyMarker::bold_section("Practice")
    }

    #[test]
    fn test_extracts_text_after_marker() {
        let reply = "📊 **Score: 80**\n📝 **Correction:** fixed\n🗣️ **Practice:** What did you eat today?";
        assert_eq!(
            practice().extract(reply),
            Some(" What did you eat today?")
        );
    }

    #[test]
    fn test_marker_tolerates_suffix_wording() {
        let reply = "🗣️ **Practice/Chat:** Tell me more!";
        assert_eq!(practice().extract(reply), Some(" Tell me more!"));
    }

    #[test]
    fn test_missing_marker_is_none() {
        assert_eq!(practice().extract("plain reply, no sections"), None);
        assert_eq!(practice().extract("**Tip:** something"), None);
    }

    #[test]
    fn test_capture_spans_multiple_lines() {
        let reply = "**Practice:** First line.\nSecond line.";
        assert_eq!(
            practice().extract(reply),
            Some(" First line.\nSecond line.")
        );
    }

    #[test]
    fn test_prepare_cleans_markdown_and_emoji() {
        let synth = Synthesizer::new();
        let reply = "🗣️ **Practice:** What did *you* eat 🍎 today?";
        assert_eq!(
            synth.prepare(reply, &practice()).as_deref(),
            Some("What did you eat  today?")
        );
    }

    #[test]
    fn test_prepare_keeps_allowed_punctuation() {
        let synth = Synthesizer::new();
        let reply = "**Practice:** Don't stop; ask: \"why, me?\" now!";
        assert_eq!(
            synth.prepare(reply, &practice()).as_deref(),
            Some("Don't stop; ask: \"why, me?\" now!")
        );
    }

    #[test]
    fn test_prepare_none_when_no_marker() {
        let synth = Synthesizer::new();
        assert_eq!(synth.prepare("no sections here", &practice()), None);
    }

    #[test]
    fn test_prepare_none_when_only_noise_remains() {
        let synth = Synthesizer::new();
        let reply = "**Practice:** 🎉✨ ** ~~ __ ";
        assert_eq!(synth.prepare(reply, &practice()), None);
    }

    #[test]
    fn test_tutor_scenario_feeds_cleaned_practice_line() {
        // Reply for "I has a apple" under the tutor persona.
        let synth = Synthesizer::new();
        let reply = "📊 **Score: 60**\n📝 **Correction:** I ~~has~~ **have** an apple\n💡 **Tip:** Use 'an' before vowels\n🗣️ **Practice:** What did you eat today?";
        assert_eq!(
            synth.prepare(reply, &practice()).as_deref(),
            Some("What did you eat today?")
        );
    }
}
