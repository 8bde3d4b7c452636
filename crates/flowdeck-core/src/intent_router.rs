use flowdeck_types::Intent;

/// A keyword and the weight it contributes toward its intent if found in
/// the prompt (case-insensitively, whole-word).
struct Keyword {
    word: &'static str,
    weight: u32,
}

const CODING_KEYWORDS: &[Keyword] = &[
    Keyword { word: "function", weight: 3 },
    Keyword { word: "bug", weight: 3 },
    Keyword { word: "refactor", weight: 3 },
    Keyword { word: "implement", weight: 3 },
    Keyword { word: "fix", weight: 2 },
    Keyword { word: "test", weight: 2 },
    Keyword { word: "compile", weight: 2 },
    Keyword { word: "code", weight: 2 },
    Keyword { word: "api", weight: 1 },
    Keyword { word: "class", weight: 1 },
    Keyword { word: "module", weight: 1 },
];

const RESEARCH_KEYWORDS: &[Keyword] = &[
    Keyword { word: "research", weight: 3 },
    Keyword { word: "compare", weight: 2 },
    Keyword { word: "investigate", weight: 3 },
    Keyword { word: "survey", weight: 2 },
    Keyword { word: "summarize", weight: 2 },
    Keyword { word: "explain", weight: 1 },
    Keyword { word: "documentation", weight: 2 },
    Keyword { word: "paper", weight: 2 },
];

const WRITING_KEYWORDS: &[Keyword] = &[
    Keyword { word: "write", weight: 2 },
    Keyword { word: "draft", weight: 3 },
    Keyword { word: "essay", weight: 3 },
    Keyword { word: "email", weight: 2 },
    Keyword { word: "blog", weight: 2 },
    Keyword { word: "readme", weight: 2 },
    Keyword { word: "copy", weight: 1 },
];

const VISION_KEYWORDS: &[Keyword] = &[
    Keyword { word: "image", weight: 3 },
    Keyword { word: "screenshot", weight: 3 },
    Keyword { word: "diagram", weight: 2 },
    Keyword { word: "photo", weight: 2 },
    Keyword { word: "ui", weight: 1 },
    Keyword { word: "mockup", weight: 2 },
];

fn score(prompt_lower: &str, keywords: &[Keyword]) -> u32 {
    keywords
        .iter()
        .filter(|k| contains_word(prompt_lower, k.word))
        .map(|k| k.weight)
        .sum()
}

/// Whole-word, case-insensitive containment check. `prompt_lower` must
/// already be lowercased by the caller so this runs once per prompt
/// instead of once per keyword.
fn contains_word(prompt_lower: &str, word: &str) -> bool {
    prompt_lower.split(|c: char| !c.is_alphanumeric()).any(|tok| tok == word)
}

/// Classify a user prompt into one of {coding, research, writing, vision,
/// general} by weighted keyword scoring (spec §2). Ties are broken by
/// declaration order below, with `General` as the floor when nothing
/// scores above zero.
pub fn classify_intent(prompt: &str) -> Intent {
    let lower = prompt.to_lowercase();
    let scored = [
        (Intent::Coding, score(&lower, CODING_KEYWORDS)),
        (Intent::Research, score(&lower, RESEARCH_KEYWORDS)),
        (Intent::Writing, score(&lower, WRITING_KEYWORDS)),
        (Intent::Vision, score(&lower, VISION_KEYWORDS)),
    ];

    scored
        .into_iter()
        .filter(|(_, s)| *s > 0)
        .max_by_key(|(_, s)| *s)
        .map(|(intent, _)| intent)
        .unwrap_or(Intent::General)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_a_coding_task() {
        assert_eq!(
            classify_intent("add a function add(a,b) to util.go"),
            Intent::Coding
        );
    }

    #[test]
    fn classifies_a_research_task() {
        assert_eq!(
            classify_intent("research and compare the top three vector databases"),
            Intent::Research
        );
    }

    #[test]
    fn classifies_a_writing_task() {
        assert_eq!(classify_intent("draft a blog post about our release"), Intent::Writing);
    }

    #[test]
    fn classifies_a_vision_task() {
        assert_eq!(
            classify_intent("look at this screenshot and find the broken layout"),
            Intent::Vision
        );
    }

    #[test]
    fn falls_back_to_general_when_nothing_matches() {
        assert_eq!(classify_intent("hello there"), Intent::General);
    }

    #[test]
    fn does_not_match_substrings_of_other_words() {
        // "uibuntu" should not trip the "ui" keyword.
        assert_eq!(classify_intent("install uibuntu on my server"), Intent::General);
    }
}
