use crate::store::MessageStore;
use crate::types::Message;
use std::collections::HashSet;

/// An assistant reply and the user message it answers
#[derive(Debug, Clone, Copy)]
pub struct ContextPair<'a> {
    pub context: Option<&'a Message>,
    pub reply: &'a Message,
}

/// Nearest user-equivalent ancestor of `reply`.
///
/// Follows `parent_id` links through `store`. Stops with `None` when the chain ends, an id
/// is not in the store, or an id repeats.
#[must_use]
pub fn find_user_context<'a>(reply: &Message, store: &'a MessageStore) -> Option<&'a Message> {
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(reply.id());

    let mut next = reply.parent_id();
    while let Some(id) = next {
        if !visited.insert(id) {
            log::warn!("Parent cycle while pairing reply {} at {id}", reply.id());
            return None;
        }
        let message = store.get_by_id(id)?;
        if message.author().is_user_equivalent() {
            return Some(message);
        }
        next = message.parent_id();
    }
    None
}

/// Every assistant reply in store order, paired with its context
pub fn reply_pairs(store: &MessageStore) -> impl Iterator<Item = ContextPair<'_>> {
    store
        .iter()
        .filter(|message| message.author().is_reply())
        .map(move |reply| ContextPair {
            context: find_user_context(reply, store),
            reply,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Author, Fragment};

    fn msg(id: &str, author: Author, parent: Option<&str>) -> Message {
        Message::new(
            id,
            "c1",
            "title",
            author,
            vec![Fragment::Text(format!("text of {id}"))],
            parent.map(str::to_string),
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn immediate_parent_user() {
        let store: MessageStore = vec![
            msg("u", Author::User, None),
            msg("r", Author::ChatGpt, Some("u")),
        ]
        .into_iter()
        .collect();
        let reply = store.get_by_id("r").unwrap();
        assert_eq!(find_user_context(reply, &store).map(Message::id), Some("u"));
    }

    #[test]
    fn skips_assistant_ancestors() {
        let store: MessageStore = vec![
            msg("u", Author::User, None),
            msg("t", Author::ChatGpt, Some("u")),
            msg("r", Author::ChatGpt, Some("t")),
        ]
        .into_iter()
        .collect();
        let reply = store.get_by_id("r").unwrap();
        assert_eq!(find_user_context(reply, &store).map(Message::id), Some("u"));
    }

    #[test]
    fn custom_user_info_counts_as_user() {
        let store: MessageStore = vec![
            msg("info", Author::CustomUserInfo, None),
            msg("r", Author::ChatGpt, Some("info")),
        ]
        .into_iter()
        .collect();
        let reply = store.get_by_id("r").unwrap();
        assert_eq!(
            find_user_context(reply, &store).map(Message::id),
            Some("info")
        );
    }

    #[test]
    fn assistant_only_chain_has_no_context() {
        let store: MessageStore = vec![
            msg("a", Author::ChatGpt, None),
            msg("r", Author::ChatGpt, Some("a")),
        ]
        .into_iter()
        .collect();
        let reply = store.get_by_id("r").unwrap();
        assert!(find_user_context(reply, &store).is_none());
    }

    #[test]
    fn unresolved_parent_has_no_context() {
        let store: MessageStore = vec![msg("r", Author::ChatGpt, Some("dropped"))]
            .into_iter()
            .collect();
        let reply = store.get_by_id("r").unwrap();
        assert!(find_user_context(reply, &store).is_none());
    }

    #[test]
    fn cycle_terminates() {
        let store: MessageStore = vec![
            msg("x", Author::ChatGpt, Some("y")),
            msg("y", Author::Other("critic".into()), Some("x")),
            msg("r", Author::ChatGpt, Some("x")),
        ]
        .into_iter()
        .collect();
        let reply = store.get_by_id("r").unwrap();
        assert!(find_user_context(reply, &store).is_none());

        let self_loop: MessageStore = vec![msg("s", Author::ChatGpt, Some("s"))]
            .into_iter()
            .collect();
        let reply = self_loop.get_by_id("s").unwrap();
        assert!(find_user_context(reply, &self_loop).is_none());
    }

    #[test]
    fn pairs_only_replies_in_store_order() {
        let store: MessageStore = vec![
            msg("u1", Author::User, None),
            msg("r1", Author::ChatGpt, Some("u1")),
            msg("u2", Author::User, Some("r1")),
            msg("r2", Author::ChatGpt, Some("u2")),
        ]
        .into_iter()
        .collect();
        let pairs: Vec<(Option<&str>, &str)> = reply_pairs(&store)
            .map(|p| (p.context.map(Message::id), p.reply.id()))
            .collect();
        assert_eq!(pairs, vec![(Some("u1"), "r1"), (Some("u2"), "r2")]);
    }
}
