//! Free-text command grammar.
//!
//! Incoming user messages are trimmed, lowercased and run through an ordered
//! rule table. Each rule either looks for one of its phrases anywhere in the
//! text ([`MatchMode::Contains`]) or requires the whole text to equal one of
//! them ([`MatchMode::Exact`]). The first matching rule decides the
//! [`CommandKind`].

use serde::{Deserialize, Serialize};

/// What a free-text message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// The client reports that uploading is finished.
    UploadComplete,
    /// The client asks to retry a failed dispatch.
    Retry,
    /// A bare acknowledgement ("ok", "yes") that does not trigger anything.
    Affirmation,
    /// Anything else.
    Unrecognized,
}

impl CommandKind {
    /// Whether this command should run the dispatch decision.
    pub fn is_trigger(self) -> bool {
        matches!(self, CommandKind::UploadComplete | CommandKind::Retry)
    }
}

/// How a rule's phrases are compared against the normalised text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Contains,
    Exact,
}

#[derive(Debug, Clone)]
struct Rule {
    mode: MatchMode,
    phrases: Vec<String>,
    kind: CommandKind,
}

impl Rule {
    fn matches(&self, text: &str) -> bool {
        match self.mode {
            MatchMode::Contains => self.phrases.iter().any(|p| text.contains(p.as_str())),
            MatchMode::Exact => self.phrases.iter().any(|p| text == p),
        }
    }
}

/// Phrase lists used to build a [`CommandGrammar`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPhrases {
    /// Substrings that mark an upload as complete.
    #[serde(default = "default_upload_complete")]
    pub upload_complete_phrases: Vec<String>,
    /// Whole-message keywords that request a retry.
    #[serde(default = "default_retry")]
    pub retry_keywords: Vec<String>,
    /// Whole-message acknowledgements.
    #[serde(default = "default_affirmation")]
    pub affirmation_keywords: Vec<String>,
}

fn default_upload_complete() -> Vec<String> {
    ["upload done", "uploaded", "done uploading", "upload complete", "files are ready"]
        .map(String::from)
        .to_vec()
}

fn default_retry() -> Vec<String> {
    ["retry", "try again"].map(String::from).to_vec()
}

fn default_affirmation() -> Vec<String> {
    ["yes", "ok", "okay", "sure", "thanks"].map(String::from).to_vec()
}

impl Default for CommandPhrases {
    fn default() -> Self {
        Self {
            upload_complete_phrases: default_upload_complete(),
            retry_keywords: default_retry(),
            affirmation_keywords: default_affirmation(),
        }
    }
}

/// Ordered rule table turning free text into a [`CommandKind`].
#[derive(Debug, Clone)]
pub struct CommandGrammar {
    rules: Vec<Rule>,
}

impl CommandGrammar {
    /// Builds the grammar. Rule priority: upload-complete, retry, affirmation.
    pub fn new(phrases: &CommandPhrases) -> Self {
        let normalise = |list: &[String]| -> Vec<String> {
            list.iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect()
        };
        Self {
            rules: vec![
                Rule {
                    mode: MatchMode::Contains,
                    phrases: normalise(&phrases.upload_complete_phrases),
                    kind: CommandKind::UploadComplete,
                },
                Rule {
                    mode: MatchMode::Exact,
                    phrases: normalise(&phrases.retry_keywords),
                    kind: CommandKind::Retry,
                },
                Rule {
                    mode: MatchMode::Exact,
                    phrases: normalise(&phrases.affirmation_keywords),
                    kind: CommandKind::Affirmation,
                },
            ],
        }
    }

    /// Interprets a message.
    pub fn parse(&self, message: &str) -> CommandKind {
        let text = message.trim().to_lowercase();
        if text.is_empty() {
            return CommandKind::Unrecognized;
        }
        self.rules
            .iter()
            .find(|rule| rule.matches(&text))
            .map_or(CommandKind::Unrecognized, |rule| rule.kind)
    }
}

impl Default for CommandGrammar {
    fn default() -> Self {
        Self::new(&CommandPhrases::default())
    }
}
