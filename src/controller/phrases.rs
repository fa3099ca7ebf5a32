//! Case-insensitive phrase spotting in transcripts.

/// A small set of accepted phrase spellings.
///
/// A transcript matches when it contains any phrase as a substring,
/// ignoring case.  Transcription of short names is noisy, so callers list
/// several spellings rather than relying on fuzzy matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhraseMatcher {
    phrases: Vec<String>,
}

impl PhraseMatcher {
    /// Build from configured phrases.  Blank entries are dropped.
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { phrases }
    }

    /// The first phrase found in `transcript`, if any.
    pub fn find(&self, transcript: &str) -> Option<&str> {
        let haystack = transcript.to_lowercase();
        self.phrases
            .iter()
            .find(|p| haystack.contains(p.as_str()))
            .map(String::as_str)
    }

    pub fn matches(&self, transcript: &str) -> bool {
        self.find(transcript).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}
