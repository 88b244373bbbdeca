use core_types::TagSet;

/// Capability interface for attaching emotion and pattern tags to journal
/// text. In production this is backed by an external NLP service; the core's
/// correctness never depends on which backend is plugged in, and absence of
/// tags must not block any downstream computation.
pub trait Tagger: Send + Sync {
    fn tag(&self, text: &str) -> TagSet;
}

/// A deterministic, dependency-free tagger backed by a fixed keyword lexicon.
///
/// This is the stub implementation used in tests and in the demo pipeline.
/// Matching is case-insensitive on whole words; the same text always yields
/// the same tag set.
#[derive(Debug, Default)]
pub struct KeywordTagger;

/// Keyword → emotion tag lexicon. First element matches, second is the tag.
const EMOTION_LEXICON: &[(&str, &str)] = &[
    ("fomo", "fomo"),
    ("chase", "fomo"),
    ("chased", "fomo"),
    ("revenge", "revenge"),
    ("angry", "revenge"),
    ("anxious", "anxious"),
    ("nervous", "anxious"),
    ("worried", "anxious"),
    ("hesitant", "hesitant"),
    ("hesitated", "hesitant"),
    ("confident", "confident"),
    ("calm", "calm"),
    ("patient", "calm"),
    ("bored", "bored"),
    ("tired", "fatigued"),
    ("exhausted", "fatigued"),
];

const PATTERN_LEXICON: &[(&str, &str)] = &[
    ("breakout", "breakout"),
    ("breakdown", "breakout"),
    ("reversal", "reversal"),
    ("fade", "reversal"),
    ("faded", "reversal"),
    ("pullback", "pullback"),
    ("retest", "pullback"),
    ("chop", "chop"),
    ("choppy", "chop"),
    ("range", "chop"),
    ("news", "news"),
    ("fomc", "news"),
    ("cpi", "news"),
    ("overtraded", "overtrading"),
    ("overtrading", "overtrading"),
    ("scalp", "scalp"),
    ("scalped", "scalp"),
];

impl Tagger for KeywordTagger {
    fn tag(&self, text: &str) -> TagSet {
        let mut tags = TagSet::default();
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            for (keyword, tag) in EMOTION_LEXICON {
                if word == *keyword {
                    tags.emotion_tags.insert((*tag).to_string());
                }
            }
            for (keyword, tag) in PATTERN_LEXICON {
                if word == *keyword {
                    tags.pattern_tags.insert((*tag).to_string());
                }
            }
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagging_is_deterministic_and_case_insensitive() {
        let tagger = KeywordTagger;
        let a = tagger.tag("Chased the BREAKOUT, felt anxious after.");
        let b = tagger.tag("Chased the BREAKOUT, felt anxious after.");
        assert_eq!(a, b);
        assert!(a.emotion_tags.contains("fomo"));
        assert!(a.emotion_tags.contains("anxious"));
        assert!(a.pattern_tags.contains("breakout"));
    }

    #[test]
    fn untagged_text_yields_empty_set() {
        let tags = KeywordTagger.tag("entered at the open, nothing notable");
        assert!(tags.emotion_tags.is_empty());
        assert!(tags.pattern_tags.is_empty());
    }
}
