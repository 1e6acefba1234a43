//! Cross-crate integration tests for Pledge live in `tests/`.
