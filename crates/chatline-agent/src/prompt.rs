// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly: system prompt per language and history windowing per
//! memory mode.

use chatline_config::model::GenerationConfig;
use chatline_core::{
    GenerationPlan, GenerationRequest, Language, MemoryMode, MessageDescriptor, Role, Turn,
};

const SYSTEM_PROMPT_EN: &str = "You are a helpful AI assistant with memory capabilities. \
You can remember and refer to previous messages in our conversation. When providing code \
examples, always format them using Markdown code blocks with proper syntax highlighting, \
for example ```python for Python or ```javascript for JavaScript. Provide complete, working \
examples when possible. Refer back to earlier parts of the conversation when it helps keep \
answers coherent.";

const SYSTEM_PROMPT_FR: &str = "Vous êtes un assistant IA utile avec des capacités de mémoire. \
Vous pouvez vous souvenir et faire référence aux messages précédents de notre conversation. \
Lorsque vous fournissez des exemples de code, formatez-les toujours dans des blocs de code \
Markdown avec la coloration syntaxique appropriée, par exemple ```python pour Python ou \
```javascript pour JavaScript. Fournissez des exemples complets et fonctionnels quand c'est \
possible. Appuyez-vous sur les échanges précédents quand cela rend les réponses plus cohérentes.";

/// Characters of each older turn kept in a summary digest.
const SUMMARY_EXCERPT_CHARS: usize = 80;

pub fn system_prompt(language: Language) -> &'static str {
    match language {
        Language::En => SYSTEM_PROMPT_EN,
        Language::Fr => SYSTEM_PROMPT_FR,
    }
}

/// Rough token estimate: one token per four characters, at least one.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4).max(1)
}

/// Builds [`GenerationRequest`]s from a plan and the loaded history.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    history_turns: usize,
    token_budget: usize,
    summary_recent_turns: usize,
}

impl PromptBuilder {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            history_turns: config.history_turns,
            token_budget: config.token_budget,
            summary_recent_turns: config.summary_recent_turns,
        }
    }

    /// Window `history` (oldest first) according to `mode`.
    pub fn window(&self, history: &[Turn], mode: MemoryMode) -> Vec<Turn> {
        match mode {
            MemoryMode::Buffer => last_n(history, self.history_turns).to_vec(),
            MemoryMode::TokenBuffer => {
                let mut used = 0;
                let mut kept = 0;
                for turn in history.iter().rev() {
                    let cost = estimate_tokens(&turn.content);
                    if used + cost > self.token_budget {
                        break;
                    }
                    used += cost;
                    kept += 1;
                }
                last_n(history, kept).to_vec()
            }
            MemoryMode::Summary => {
                let history = last_n(history, self.history_turns);
                let split = history.len().saturating_sub(self.summary_recent_turns);
                let (older, recent) = history.split_at(split);
                let mut window = Vec::with_capacity(recent.len() + 1);
                if !older.is_empty() {
                    window.push(summarize(older));
                }
                window.extend_from_slice(recent);
                window
            }
        }
    }

    pub fn build(
        &self,
        plan: GenerationPlan,
        descriptor: &MessageDescriptor,
        history: &[Turn],
        language: Language,
        mode: MemoryMode,
    ) -> GenerationRequest {
        GenerationRequest {
            plan,
            system_prompt: system_prompt(language).to_string(),
            history: self.window(history, mode),
            user_text: descriptor.normalized_text.clone(),
        }
    }
}

fn last_n(turns: &[Turn], n: usize) -> &[Turn] {
    &turns[turns.len().saturating_sub(n)..]
}

fn summarize(turns: &[Turn]) -> Turn {
    let lines: Vec<String> = turns
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
                Role::System => "System",
            };
            let mut excerpt: String = turn.content.chars().take(SUMMARY_EXCERPT_CHARS).collect();
            if turn.content.chars().count() > SUMMARY_EXCERPT_CHARS {
                excerpt.push_str("...");
            }
            format!("- {speaker}: {excerpt}")
        })
        .collect();
    Turn {
        role: Role::System,
        content: format!("Summary of the earlier conversation:\n{}", lines.join("\n")),
    }
}

#[cfg(test)]
mod tests {
    use chatline_core::{LengthClass, RouteTier};

    use super::*;

    fn conversation(turns: usize) -> Vec<Turn> {
        (0..turns)
            .map(|n| {
                if n % 2 == 0 {
                    Turn::user(format!("question {n}"))
                } else {
                    Turn::assistant(format!("answer {n}"))
                }
            })
            .collect()
    }

    fn builder() -> PromptBuilder {
        PromptBuilder::new(&GenerationConfig::default())
    }

    #[test]
    fn prompt_follows_language() {
        assert!(system_prompt(Language::En).starts_with("You are a helpful AI assistant"));
        assert!(system_prompt(Language::Fr).starts_with("Vous êtes un assistant IA"));
    }

    #[test]
    fn buffer_keeps_last_twenty_turns() {
        let window = builder().window(&conversation(30), MemoryMode::Buffer);
        assert_eq!(window.len(), 20);
        assert_eq!(window[0].content, "question 10");
        assert_eq!(window[19].content, "answer 29");
    }

    #[test]
    fn token_buffer_respects_budget() {
        let builder = PromptBuilder::new(&GenerationConfig {
            token_budget: 10,
            ..GenerationConfig::default()
        });
        // 16 chars each, so 4 estimated tokens per turn: two fit in 10.
        let history = vec![
            Turn::user("aaaaaaaaaaaaaaaa"),
            Turn::assistant("bbbbbbbbbbbbbbbb"),
            Turn::user("cccccccccccccccc"),
        ];
        let window = builder.window(&history, MemoryMode::TokenBuffer);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].content, "bbbbbbbbbbbbbbbb");
    }

    #[test]
    fn summary_condenses_older_turns() {
        let window = builder().window(&conversation(10), MemoryMode::Summary);
        assert_eq!(window.len(), 5);
        assert_eq!(window[0].role, Role::System);
        assert!(window[0].content.contains("- User: question 0"));
        assert!(window[0].content.contains("- Assistant: answer 5"));
        assert_eq!(window[1].content, "question 6");
    }

    #[test]
    fn short_history_is_not_summarized() {
        let window = builder().window(&conversation(3), MemoryMode::Summary);
        assert_eq!(window, conversation(3));
    }

    #[test]
    fn build_uses_normalized_text_and_plan() {
        let plan = GenerationPlan {
            tier: RouteTier::Code,
            backend_id: "deepseek-coder".into(),
            temperature: 0.3,
            max_tokens: 1024,
            context_window: 4096,
        };
        let descriptor = MessageDescriptor {
            normalized_text: "fix my sql".into(),
            length_class: LengthClass::Simple,
            is_question: false,
            is_code_request: true,
            quick_reply: None,
        };
        let request = builder().build(
            plan.clone(),
            &descriptor,
            &conversation(2),
            Language::En,
            MemoryMode::Buffer,
        );
        assert_eq!(request.plan, plan);
        assert_eq!(request.user_text, "fix my sql");
        assert_eq!(request.history.len(), 2);
        assert_eq!(request.system_prompt, system_prompt(Language::En));
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
