//! Workspace-level integration tests live under `tests/`; this crate has
//! no runtime code of its own.
