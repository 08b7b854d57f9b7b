//! 有界对话历史

use std::collections::VecDeque;

use medassist_core::models::ChatMessage;

pub const DEFAULT_CONTEXT_MESSAGES: usize = 4;
pub const DEFAULT_MAX_MESSAGES: usize = 20;

/// 对话历史
///
/// 只保留最近 `max_messages` 条，生成时只取最近 `context_messages` 条作为上下文。
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: VecDeque<ChatMessage>,
    context_messages: usize,
    max_messages: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_MESSAGES, DEFAULT_MAX_MESSAGES)
    }
}

impl ConversationHistory {
    pub fn new(context_messages: usize, max_messages: usize) -> Self {
        let max_messages = max_messages.max(context_messages);
        Self {
            messages: VecDeque::with_capacity(max_messages),
            context_messages,
            max_messages,
        }
    }

    /// 记录一轮问答
    pub fn record_exchange(&mut self, question: &str, answer: &str) {
        self.push(ChatMessage::user(question));
        self.push(ChatMessage::assistant(answer));
    }

    fn push(&mut self, message: ChatMessage) {
        if self.max_messages == 0 {
            return;
        }
        if self.messages.len() == self.max_messages {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    /// 生成时使用的上下文窗口
    pub fn context(&self) -> Vec<ChatMessage> {
        let skip = self.messages.len().saturating_sub(self.context_messages);
        self.messages.iter().skip(skip).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medassist_core::models::ChatRole;
    use proptest::prelude::*;

    #[test]
    fn test_context_window_is_most_recent() {
        let mut history = ConversationHistory::default();
        for i in 0..3 {
            history.record_exchange(&format!("问{}", i), &format!("答{}", i));
        }

        let context = history.context();
        assert_eq!(context.len(), 4);
        assert_eq!(context[0].content, "问1");
        assert_eq!(context[0].role, ChatRole::User);
        assert_eq!(context[3].content, "答2");
    }

    #[test]
    fn test_store_is_capped() {
        let mut history = ConversationHistory::new(4, 6);
        for i in 0..10 {
            history.record_exchange(&format!("问{}", i), "答");
        }
        assert_eq!(history.len(), 6);
        assert_eq!(history.context()[0].content, "问8");

        history.clear();
        assert!(history.is_empty());
        assert!(history.context().is_empty());
    }

    #[test]
    fn test_cap_never_below_window() {
        let mut history = ConversationHistory::new(4, 2);
        history.record_exchange("a", "b");
        history.record_exchange("c", "d");
        assert_eq!(history.context().len(), 4);
    }

    proptest! {
        #[test]
        fn property_bounds_hold(context in 0usize..8, max in 0usize..24, rounds in 0usize..30) {
            let mut history = ConversationHistory::new(context, max);
            for i in 0..rounds {
                history.record_exchange(&i.to_string(), "答");
            }
            prop_assert!(history.len() <= max.max(context));
            prop_assert!(history.context().len() <= context);
            prop_assert_eq!(history.context().len(), context.min(history.len()));
        }
    }
}
