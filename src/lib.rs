//! Workspace-level integration tests for PhaseTrack live in `tests/`.
