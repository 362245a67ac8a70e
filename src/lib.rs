// Snapshot model and stream decoding
pub mod snapshot;

// Per-entity status history
pub mod history;

// Liveness timer
pub mod watchdog;

// Long-poll client state machine and driver
pub mod connection;

// Display boundary
pub mod presenter;

// Diagram entity discovery
pub mod diagram;

// Standalone file preview
pub mod preview;

// Behavior-tree log model and validation
pub mod event;

// Server-side status board
pub mod state;

// HTTP APIs
pub mod api;

// Configuration
pub mod config;
