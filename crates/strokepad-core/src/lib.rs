//! Core editing engine for strokepad: the document/item model, the
//! reversible command stack, per-tool interaction state machines, and the
//! document persistence codec.
//!
//! Everything here is single-threaded and event-driven: mutations happen
//! synchronously on the thread that owns the [`scene::Scene`], in direct
//! response to a pointer/keyboard event or a save/load call.

pub mod assets;
pub mod codec;
pub mod command;
pub mod document;
pub mod error;
pub mod item;
pub mod scene;
pub mod style;
pub mod tools;

pub use assets::{ImportKind, Vectorizer};
pub use codec::LoadedDocument;
pub use command::{Command, CommandStack, HISTORY_CAPACITY, HistoryEvent, HistoryObserver};
pub use document::{Document, ItemSnapshot};
pub use error::DocumentError;
pub use item::{Item, ItemId, ItemKind};
pub use scene::{Alignment, PointerEvent, PointerModifiers, Scene, Tool, ToolSettings};
