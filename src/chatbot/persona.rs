//! Persona definitions - the fixed system prompts the bot can speak as.
//!
//! A persona is chosen per invocation and never stored with conversation
//! history. Switching persona mid-conversation only changes the instruction
//! used to seed a *new* history; an existing history keeps whatever priming
//! it was created with.

/// Which system prompt to use for one model invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    /// English tutor with score/correction/tip/practice output sections.
    Tutor,
    /// Plain A2-English rewriter, no analysis sections.
    Simplifier,
}

/// Canned model acknowledgment used as the second half of the priming pair.
pub const PRIMING_ACK: &str = "Understood. I am ready.";

/// Instruction appended after an inline audio part so the model treats the
/// recording as the student's utterance rather than data to describe.
pub const AUDIO_FOLLOW_UP: &str =
    "Listen to this voice message, transcribe what the student said, and respond \
     following your output format.";

const TUTOR_INSTRUCTION: &str = r#"You are 'Daily Speaker', an English Tutor.

CRITICAL RULES:
1. **Memory:** You remember everything the user says. Use the conversation history!
2. **Analysis:** Correct the grammar/spelling of the user's input.
3. **Interaction:** If the user asks a question (like "what is my name?"), ANSWER IT in the 'Practice' section.

OUTPUT FORMAT:
📊 **Score: [0-100]**
📝 **Correction:** (Strike errors ~~like this~~ and **bold** corrections)
💡 **Tip:** (Short tip for the student)
🗣️ **Practice/Chat:** (Answer the user's question OR ask a follow-up question to keep the chat going)"#;

const SIMPLIFIER_INSTRUCTION: &str =
    "You are a Text Simplifier. Rewrite in simple A2 English. No analysis.";

impl Persona {
    /// The full system instruction text for this persona.
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::Tutor => TUTOR_INSTRUCTION,
            Self::Simplifier => SIMPLIFIER_INSTRUCTION,
        }
    }

    /// The bolded marker word whose section should be read aloud, if any.
    ///
    /// The simplifier produces no labeled sections, so nothing is spoken.
    pub fn speech_marker(&self) -> Option<&'static str> {
        match self {
            Self::Tutor => Some("Practice"),
            Self::Simplifier => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tutor_instruction_has_output_sections() {
        let text = Persona::Tutor.instruction();
        assert!(text.contains("**Score:"));
        assert!(text.contains("**Correction:**"));
        assert!(text.contains("**Practice/Chat:**"));
    }

    #[test]
    fn test_simplifier_has_no_marker() {
        assert_eq!(Persona::Simplifier.speech_marker(), None);
        assert_eq!(Persona::Tutor.speech_marker(), Some("Practice"));
    }
}
