use super::IntentStrategy;
use crate::intent::{Action, Condition, Intent};
use async_trait::async_trait;
use regex::Regex;

/// Pattern-rule parser for the fixed command grammar.
///
/// Recognizes on/off commands aimed at a light, lamp or scene, plus
/// optional "after <time>" and presence guards. Anything else is no match.
pub struct RuleParser {
    turn_on: Regex,
    turn_off: Regex,
    area_target: Regex,
    target_after_action: Regex,
    any_target: Regex,
    after_time: Regex,
    presence: Regex,
}

impl RuleParser {
    pub fn new() -> Self {
        Self {
            turn_on: pattern(r"\b(?:turn on|switch on|enable)\b"),
            turn_off: pattern(r"\b(?:turn off|switch off|disable)\b"),
            area_target: pattern(
                r"(hallway|kitchen|bedroom|living|bathroom|garage)[ -]?(light|lamp|scene)",
            ),
            target_after_action: pattern(
                r"^\s*(?:(?:the|a|an|my)\s+)?(?:([a-z\-\s]*?)\s+)?(light|lamp|scene)",
            ),
            any_target: pattern(r"([a-z\-\s]+?)\s+(light|lamp|scene)"),
            // H:MM first so "after 7:30" is not read as "after 7"
            after_time: pattern(r"after\s+(\d{1,2}:\d{2})|after\s+(\d{1,2})\s*(am|pm)?"),
            presence: pattern(r"someone is home|anyone home|if.*home"),
        }
    }

    /// Parse a prompt. `None` if either the action or the target is missing.
    pub fn parse(&self, prompt: &str) -> Option<Intent> {
        let text = prompt.trim().to_lowercase();

        let (action, action_end) = self.detect_action(&text)?;
        let (target, area) = self.detect_target(&text, action_end)?;

        let mut intent = Intent::new(action, target);
        intent.area = area;
        intent.conditions = self.extract_conditions(&text);
        Some(intent)
    }

    /// Action plus the byte offset where the action phrase ends
    fn detect_action(&self, text: &str) -> Option<(Action, usize)> {
        if let Some(m) = self.turn_on.find(text) {
            return Some((Action::TurnOn, m.end()));
        }
        self.turn_off.find(text).map(|m| (Action::TurnOff, m.end()))
    }

    /// Target phrase and, when a known area keyword was used, that area
    fn detect_target(&self, text: &str, action_end: usize) -> Option<(String, Option<String>)> {
        if let Some(caps) = self.area_target.captures(text) {
            let area = caps[1].to_string();
            return Some((format!("{} {}", area, &caps[2]), Some(area)));
        }

        let rest = &text[action_end..];
        let caps = self
            .target_after_action
            .captures(rest)
            .or_else(|| self.any_target.captures(text))?;

        let class = &caps[2];
        let words = caps
            .get(1)
            .map(|m| strip_article(m.as_str().trim()))
            .unwrap_or("");
        if words.is_empty() {
            return Some((class.to_string(), None));
        }
        Some((format!("{} {}", words, class), None))
    }

    /// Time guard first, then presence. Never affects parse success.
    fn extract_conditions(&self, text: &str) -> Vec<Condition> {
        let mut conditions = Vec::new();

        if let Some(value) = self.after_time_value(text) {
            conditions.push(Condition::after_time(value));
        }
        if self.presence.is_match(text) {
            conditions.push(Condition::presence());
        }

        conditions
    }

    fn after_time_value(&self, text: &str) -> Option<String> {
        let caps = self.after_time.captures(text)?;

        if let Some(explicit) = caps.get(1) {
            return Some(explicit.as_str().to_string());
        }

        let mut hour: u32 = caps.get(2)?.as_str().parse().ok()?;
        if caps.get(3).map(|m| m.as_str()) == Some("pm") && hour < 12 {
            hour += 12;
        }
        Some(format!("{:02}:00", hour))
    }
}

impl Default for RuleParser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntentStrategy for RuleParser {
    fn name(&self) -> &str {
        "rules"
    }

    async fn try_parse(&self, prompt: &str) -> Option<Intent> {
        self.parse(prompt)
    }
}

/// Drop one leading "the", "a", "an" or "my" from a target phrase
fn strip_article(words: &str) -> &str {
    for article in ["the", "a", "an", "my"] {
        if words == article {
            return "";
        }
        if let Some(rest) = words.strip_prefix(article) {
            if let Some(rest) = rest.strip_prefix(char::is_whitespace) {
                return rest.trim_start();
            }
        }
    }
    words
}

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("built-in prompt pattern must compile")
}
