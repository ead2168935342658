//! # TreeGPT Conversation
//!
//! Reconstructs linear message sequences from branching chat-export archives.
//!
//! ## Architecture
//!
//! ```text
//! conversations.json
//!     │
//!     ├──> Archive reader (serde)
//!     │      └─> RawConversation { mapping: node id -> JSON, decoded per node }
//!     │
//!     ├──> ConversationLinearizer
//!     │      ├─ Walk current leaf -> root via parent links
//!     │      ├─ Normalize author roles
//!     │      ├─ Classify parts into Fragment { text | transcript | asset }
//!     │      └─ Emit Message[] root -> leaf
//!     │
//!     ├──> MessageStore
//!     │      └─ Lookup by id / by conversation
//!     │
//!     └──> Context pairing
//!            └─ Nearest user-authored ancestor for every assistant reply
//! ```
//!
//! ## Example
//!
//! ```rust
//! use treegpt_conversation::{parse_archive, ConversationLinearizer, MessageStore, reply_pairs};
//!
//! let raw = br#"[{
//!     "title": "Greeting",
//!     "conversation_id": "c1",
//!     "current_node": "b",
//!     "mapping": {
//!         "a": {"id": "a", "parent": null, "children": ["b"],
//!               "message": {"author": {"role": "user"},
//!                           "content": {"content_type": "text", "parts": ["Hi"]}}},
//!         "b": {"id": "b", "parent": "a", "children": [],
//!               "message": {"author": {"role": "assistant"},
//!                           "content": {"content_type": "text", "parts": ["Hello!"]}}}
//!     }
//! }]"#;
//!
//! let conversations = parse_archive(raw).unwrap();
//! let linearizer = ConversationLinearizer::new();
//! let mut store = MessageStore::new();
//! for conversation in &conversations {
//!     store.add_all(linearizer.linearize(conversation).messages);
//! }
//!
//! let pairs: Vec<_> = reply_pairs(&store).collect();
//! assert_eq!(pairs.len(), 1);
//! assert_eq!(pairs[0].context.map(|m| m.id()), Some("a"));
//! ```

mod archive;
mod classify;
mod error;
mod linearizer;
mod pairer;
mod store;
mod types;

pub use archive::{
    load_archive, parse_archive, RawAuthor, RawContent, RawConversation, RawMessage, RawNode,
};
pub use classify::{classify_part, classify_parts, PartOutcome};
pub use error::{ConversationError, Result};
pub use linearizer::{ConversationLinearizer, Linearized, TraversalOutcome};
pub use pairer::{find_user_context, reply_pairs, ContextPair};
pub use store::MessageStore;
pub use types::{Author, Fragment, Message};
