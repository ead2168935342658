use crate::archive::{RawConversation, RawNode};
use crate::classify::classify_parts;
use crate::types::{Author, Message};
use std::collections::HashSet;

/// How the leaf-to-root walk ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraversalOutcome {
    /// Reached a node without a parent
    Complete,
    /// The conversation has no `current_node`
    MissingCurrentNode,
    /// A referenced node id is absent from the mapping
    MissingNode(String),
    /// A parent link pointed back to an already visited node
    Cycle(String),
}

impl TraversalOutcome {
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Messages of one conversation, root to leaf
#[derive(Debug, Clone)]
pub struct Linearized {
    pub messages: Vec<Message>,
    pub outcome: TraversalOutcome,
    /// Nodes walked, including the ones that produced no message
    pub nodes_visited: usize,
}

/// Turns one conversation tree into the ordered message sequence of its active branch
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationLinearizer;

impl ConversationLinearizer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Walk from `current_node` up the parent links.
    ///
    /// Never fails: a missing node or a cycle ends the walk and the collected
    /// prefix (closest to the leaf) is returned.
    #[must_use]
    pub fn linearize(&self, conversation: &RawConversation) -> Linearized {
        let mut messages = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();

        let Some(mut current) = conversation.current_node.clone() else {
            log::warn!(
                "Conversation {} has no current node; skipping",
                conversation.id()
            );
            return Linearized {
                messages,
                outcome: TraversalOutcome::MissingCurrentNode,
                nodes_visited: 0,
            };
        };

        let outcome = loop {
            if !visited.insert(current.clone()) {
                log::warn!(
                    "Conversation {} has a parent cycle at node {current}",
                    conversation.id()
                );
                break TraversalOutcome::Cycle(current);
            }

            let Some(node) = conversation.node(&current) else {
                log::warn!(
                    "Conversation {} references missing node {current}",
                    conversation.id()
                );
                break TraversalOutcome::MissingNode(current);
            };

            if let Some(message) = self.clean_node(conversation, &current, &node) {
                messages.push(message);
            }

            match node.parent {
                Some(parent) if !parent.is_empty() => current = parent,
                _ => break TraversalOutcome::Complete,
            }
        };

        messages.reverse();
        log::debug!(
            "Conversation {}: {} messages from {} nodes ({:?})",
            conversation.id(),
            messages.len(),
            visited.len(),
            outcome
        );

        Linearized {
            messages,
            outcome,
            nodes_visited: visited.len(),
        }
    }

    /// Classify one node; `None` when it carries nothing worth keeping
    fn clean_node(
        &self,
        conversation: &RawConversation,
        key: &str,
        node: &RawNode,
    ) -> Option<Message> {
        let raw = node.message.as_ref()?;
        let content = raw.content.as_ref()?;
        if !content.is_textual() || content.parts().is_empty() {
            return None;
        }

        let user_system_message = raw.is_user_system_message();
        if raw.author.role == "system" && !user_system_message {
            return None;
        }

        let id = node.id.as_deref().unwrap_or(key);
        let fragments = classify_parts(content.parts(), id);

        Message::new(
            id,
            conversation.id(),
            conversation.title(),
            Author::normalize(&raw.author.role, user_system_message),
            fragments,
            node.parent.clone(),
            node.children.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::parse_archive;
    use crate::types::Fragment;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn node(id: &str, parent: Option<&str>, role: Option<&str>, parts: Value) -> (String, Value) {
        let message = role.map(|role| {
            json!({
                "author": {"role": role},
                "metadata": {},
                "content": {"content_type": "text", "parts": parts},
            })
        });
        (
            id.to_string(),
            json!({"id": id, "parent": parent, "children": [], "message": message}),
        )
    }

    fn conversation(current: Option<&str>, nodes: Vec<(String, Value)>) -> RawConversation {
        let mapping: serde_json::Map<String, Value> = nodes.into_iter().collect();
        let raw = json!([{
            "title": "T",
            "conversation_id": "c1",
            "current_node": current,
            "mapping": mapping,
        }]);
        parse_archive(raw.to_string().as_bytes())
            .unwrap()
            .pop()
            .unwrap()
    }

    fn ids(linearized: &Linearized) -> Vec<&str> {
        linearized.messages.iter().map(Message::id).collect()
    }

    #[test]
    fn walks_root_to_leaf() {
        let conv = conversation(
            Some("c"),
            vec![
                node("root", None, None, json!([])),
                node("a", Some("root"), Some("user"), json!(["Hi"])),
                node("b", Some("a"), Some("assistant"), json!(["Hello!"])),
                node("c", Some("b"), Some("user"), json!(["Thanks"])),
                node("branch", Some("a"), Some("assistant"), json!(["Other"])),
            ],
        );
        let out = ConversationLinearizer::new().linearize(&conv);
        assert_eq!(ids(&out), vec!["a", "b", "c"]);
        assert_eq!(out.outcome, TraversalOutcome::Complete);
        assert_eq!(out.nodes_visited, 4);
        assert_eq!(out.messages[1].author(), &Author::ChatGpt);
        assert_eq!(out.messages[1].parent_id(), Some("a"));
    }

    #[test]
    fn empty_node_is_dropped_but_traversal_continues() {
        let conv = conversation(
            Some("b"),
            vec![
                node("a", None, Some("user"), json!(["Hi"])),
                node("gap", Some("a"), Some("assistant"), json!([""])),
                node("b", Some("gap"), Some("assistant"), json!(["Hello!"])),
            ],
        );
        let out = ConversationLinearizer::new().linearize(&conv);
        assert_eq!(ids(&out), vec!["a", "b"]);
        assert_eq!(out.messages[1].parent_id(), Some("gap"));
    }

    #[test]
    fn system_messages_need_user_flag() {
        let mut nodes = vec![
            node("sys", None, Some("system"), json!(["hidden prompt"])),
            node("a", Some("sys"), Some("user"), json!(["Hi"])),
        ];
        let (id, mut custom) = node("custom", Some("a"), Some("system"), json!(["I am a cat"]));
        custom["message"]["metadata"] = json!({"is_user_system_message": true});
        nodes.push((id, custom));

        let out = ConversationLinearizer::new().linearize(&conversation(Some("custom"), nodes));
        assert_eq!(ids(&out), vec!["a", "custom"]);
        assert_eq!(out.messages[1].author(), &Author::CustomUserInfo);
    }

    #[test]
    fn non_text_content_types_are_skipped() {
        let (id, mut code) = node("code", None, Some("assistant"), json!(["print(1)"]));
        code["message"]["content"]["content_type"] = json!("code");
        let out = ConversationLinearizer::new().linearize(&conversation(
            Some("b"),
            vec![
                (id, code),
                node("b", Some("code"), Some("tool"), json!(["done"])),
            ],
        ));
        assert_eq!(ids(&out), vec!["b"]);
    }

    #[test]
    fn multimodal_parts_are_classified() {
        let (id, mut mm) = node(
            "m",
            None,
            Some("user"),
            json!([
                "look",
                {"content_type": "image_asset_pointer", "asset_pointer": "file://img"},
            ]),
        );
        mm["message"]["content"]["content_type"] = json!("multimodal_text");
        let out = ConversationLinearizer::new().linearize(&conversation(Some("m"), vec![(id, mm)]));
        assert_eq!(out.messages.len(), 1);
        assert_eq!(out.messages[0].parts().len(), 2);
        assert!(matches!(out.messages[0].parts()[1], Fragment::Asset(_)));
    }

    #[test]
    fn missing_node_keeps_collected_suffix() {
        let conv = conversation(
            Some("b"),
            vec![
                node("a", Some("ghost"), Some("user"), json!(["Hi"])),
                node("b", Some("a"), Some("assistant"), json!(["Hello!"])),
            ],
        );
        let out = ConversationLinearizer::new().linearize(&conv);
        assert_eq!(ids(&out), vec!["a", "b"]);
        assert_eq!(out.outcome, TraversalOutcome::MissingNode("ghost".into()));
    }

    #[test]
    fn missing_current_node_yields_nothing() {
        let conv = conversation(None, vec![node("a", None, Some("user"), json!(["Hi"]))]);
        let out = ConversationLinearizer::new().linearize(&conv);
        assert!(out.messages.is_empty());
        assert_eq!(out.outcome, TraversalOutcome::MissingCurrentNode);
    }

    #[test]
    fn parent_cycle_terminates() {
        let conv = conversation(
            Some("a"),
            vec![
                node("a", Some("b"), Some("assistant"), json!(["one"])),
                node("b", Some("a"), Some("user"), json!(["two"])),
            ],
        );
        let out = ConversationLinearizer::new().linearize(&conv);
        assert_eq!(ids(&out), vec!["b", "a"]);
        assert_eq!(out.outcome, TraversalOutcome::Cycle("a".into()));
    }
}
