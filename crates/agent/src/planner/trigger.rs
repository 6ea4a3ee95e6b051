//! Plan trigger heuristic.
//!
//! Decides whether a task is involved enough to be worth a plan. False
//! negatives leave the loop unstructured; false positives only cost one
//! extra generation call.

/// Tasks shorter than this (in characters) never get a plan.
pub const MIN_PLAN_TASK_CHARS: usize = 50;

/// Lower-case phrases that signal multi-step or research intent.
const PLAN_KEYWORDS: &[&str] = &[
    "research",
    "analyze",
    "analyse",
    "compare",
    "summarize",
    "summarise",
    "search for",
    "investigate",
    "find out",
    "look up",
    "gather",
    "step",
    "then",
    "first",
    "finally",
    "afterwards",
    "comprehensive",
    "detailed",
    "in-depth",
    "multiple",
    "report",
];

/// Whether `task` should get an execution plan before the loop starts.
pub fn should_create_plan(task: &str) -> bool {
    if task.chars().count() < MIN_PLAN_TASK_CHARS {
        return false;
    }
    let lowered = task.to_lowercase();
    PLAN_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_is_too_short_to_plan() {
        assert!(!should_create_plan("hi"));
    }

    #[test]
    fn keyword_task_under_the_length_floor_does_not_plan() {
        // "research" and "summarize" both match, but 32 characters is below
        // the 50-character floor and the floor is checked first.
        let task = "research and summarize AI trends";
        assert_eq!(task.chars().count(), 32);
        assert!(!should_create_plan(task));
    }

    #[test]
    fn long_research_task_plans() {
        let task = "Please research and summarize the most important AI trends of this year";
        assert!(task.chars().count() >= MIN_PLAN_TASK_CHARS);
        assert!(should_create_plan(task));
    }

    #[test]
    fn keywords_match_case_insensitively() {
        assert!(should_create_plan(
            "FIRST fetch the release notes for the new version, THEN list the breaking changes"
        ));
    }

    #[test]
    fn long_chatter_without_keywords_does_not_plan() {
        let task = "I just wanted to say thank you so much for the help you gave me yesterday!";
        assert!(task.chars().count() >= MIN_PLAN_TASK_CHARS);
        assert!(!should_create_plan(task));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 30 multi-byte characters plus a keyword stay under the floor.
        let task = format!("{} research", "é".repeat(30));
        assert!(task.len() >= MIN_PLAN_TASK_CHARS);
        assert!(!should_create_plan(&task));
    }
}
