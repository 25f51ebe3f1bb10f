//! Per-tool interaction state machines. Each tool is a small module of
//! free functions over the scene, driven by pointer events: `Idle ->
//! Active -> (Committing | Cancelled) -> Idle`, with the active state
//! held in a per-tool struct owned by the scene.

pub mod frame;
pub mod label;
pub mod path;
pub mod scale;
pub mod sculpt;
pub mod text;
