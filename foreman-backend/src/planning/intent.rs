use regex::Regex;

/// What the scratchpad says the agent is about to do
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedIntent {
    /// Every broker tool name mentioned, most recently mentioned first
    pub tool_names: Vec<String>,
    /// The text mentions `execute_tool` explicitly
    pub explicit_request: bool,
}

/// Decides whether reasoning text announces an upcoming tool call
pub trait IntentClassifier: Send + Sync {
    /// `None` means pure reflection: no plan should be derived
    fn detect(&self, text: &str) -> Option<DetectedIntent>;
}

/// Matches upper-case `DOMAIN_ACTION` tokens for the known integration domains.
pub struct LexicalIntentClassifier {
    pattern: Option<Regex>,
}

impl LexicalIntentClassifier {
    pub fn new(domains: &[String]) -> Self {
        let mut prefixes: Vec<String> = domains
            .iter()
            .map(|d| d.trim().to_uppercase())
            .filter(|d| !d.is_empty())
            .collect();
        // longest first so GOOGLEDRIVE wins over GOOGLE
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        prefixes.dedup();

        let pattern = if prefixes.is_empty() {
            None
        } else {
            let alternatives = prefixes
                .iter()
                .map(|p| regex::escape(p))
                .collect::<Vec<_>>()
                .join("|");
            let source = format!(r"\b((?:{})_[A-Z0-9]+(?:_[A-Z0-9]+)*)\b", alternatives);
            match Regex::new(&source) {
                Ok(re) => Some(re),
                Err(e) => {
                    log::error!("[PLAN] Invalid tool-name pattern {}: {}", source, e);
                    None
                }
            }
        };

        LexicalIntentClassifier { pattern }
    }
}

impl DetectedIntent {
    /// The tool most likely about to be called
    pub fn tool_name(&self) -> Option<&str> {
        self.tool_names.first().map(String::as_str)
    }
}

impl IntentClassifier for LexicalIntentClassifier {
    fn detect(&self, text: &str) -> Option<DetectedIntent> {
        let mut tool_names: Vec<String> = Vec::new();
        if let Some(re) = &self.pattern {
            // Recaps of search results come before the decision
            for caps in re.captures_iter(text).collect::<Vec<_>>().into_iter().rev() {
                if let Some(m) = caps.get(1) {
                    if !tool_names.iter().any(|n| n == m.as_str()) {
                        tool_names.push(m.as_str().to_string());
                    }
                }
            }
        }
        let explicit_request = text.to_lowercase().contains("execute_tool");

        if tool_names.is_empty() && !explicit_request {
            return None;
        }
        Some(DetectedIntent {
            tool_names,
            explicit_request,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> LexicalIntentClassifier {
        let domains: Vec<String> = ["github", "asana", "google", "googledrive"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        LexicalIntentClassifier::new(&domains)
    }

    #[test]
    fn test_pure_reflection_yields_nothing() {
        assert!(classifier().detect("Let me reflect on what I learned so far.").is_none());
    }

    #[test]
    fn test_latest_mention_comes_first() {
        let intent = classifier()
            .detect(
                "search_tools returned GITHUB_FIND_PULL_REQUESTS and GITHUB_LIST_PULL_REQUESTS. \
                 I will call GITHUB_LIST_PULL_REQUESTS with owner='acme'",
            )
            .unwrap();
        assert_eq!(intent.tool_name(), Some("GITHUB_LIST_PULL_REQUESTS"));
        assert_eq!(
            intent.tool_names,
            vec!["GITHUB_LIST_PULL_REQUESTS", "GITHUB_FIND_PULL_REQUESTS"]
        );
        assert!(!intent.explicit_request);
    }

    #[test]
    fn test_longest_domain_prefix_wins() {
        let intent = classifier().detect("Next: GOOGLEDRIVE_FIND_FILE name='x'").unwrap();
        assert_eq!(intent.tool_name(), Some("GOOGLEDRIVE_FIND_FILE"));
    }

    #[test]
    fn test_keyword_without_tool_name() {
        let intent = classifier().detect("I should use Execute_Tool for this").unwrap();
        assert!(intent.tool_names.is_empty());
        assert!(intent.explicit_request);
    }

    #[test]
    fn test_unknown_domain_and_lowercase_ignored() {
        assert!(classifier().detect("call SLACK_POST_MESSAGE or github_get_repo").is_none());
    }

    #[test]
    fn test_no_domains_only_keyword() {
        let empty = LexicalIntentClassifier::new(&[]);
        assert!(empty.detect("GITHUB_GET_REPO").is_none());
        assert!(empty.detect("execute_tool now").is_some());
    }
}
