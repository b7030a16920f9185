// Client-side prediction module for reducing input lag in multiplayer
//
// This module implements client-side prediction with server reconciliation:
// 1. The client predicts movement locally for instant feedback
// 2. The server stays authoritative and simulates every saved move
// 3. Saved moves are buffered, merged when redundant, and replayed in
//    order when an authoritative correction arrives

pub mod move_buffer;
pub mod prediction_data;
pub mod reconciliation;
pub mod saved_move;

pub use move_buffer::PredictionBuffer;
pub use prediction_data::{NetworkPrediction, PredictionData};
pub use reconciliation::{ReconciliationEngine, Snapshot};
pub use saved_move::SavedMove;
