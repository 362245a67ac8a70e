// Server-side status state: latest snapshot and demo feed

mod board;
mod demo;

pub use board::StatusBoard;
pub use demo::run_demo_feed;
