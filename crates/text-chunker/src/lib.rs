//! # TreeGPT Text Chunker
//!
//! Token-bounded splitting of long texts for fixed-capacity embedding models.
//!
//! ## Approach
//!
//! Chunks are cut on whitespace word boundaries. Words are appended to a pending
//! buffer and the buffer is re-tokenized after each word; once the count reaches
//! the limit the buffer becomes a chunk. The last word may therefore push a chunk
//! slightly past the limit.
//!
//! ```text
//! text
//!     │
//!     ├──> split on whitespace -> words
//!     │
//!     ├──> accumulate words, count tokens of "w1 w2 .. wn"
//!     │      └─ count >= max_tokens -> emit chunk, reset buffer
//!     │
//!     └──> trailing buffer -> final chunk
//! ```
//!
//! ## Example
//!
//! ```rust
//! use treegpt_text_chunker::{ChunkerConfig, TextChunker, WhitespaceTokenCounter};
//!
//! let chunker = TextChunker::new(ChunkerConfig { max_tokens: 3 }).unwrap();
//! let chunks = chunker
//!     .chunk("one two three four five", &WhitespaceTokenCounter)
//!     .unwrap();
//! assert_eq!(chunks, vec!["one two three", "four five"]);
//! ```

mod chunker;
mod config;
mod error;
mod tokenizer;

pub use chunker::{chunk_text, TextChunker};
pub use config::{ChunkerConfig, DEFAULT_MAX_TOKENS};
pub use error::{ChunkerError, Result};
pub use tokenizer::{HfTokenCounter, TokenCounter, WhitespaceTokenCounter};
