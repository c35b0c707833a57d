//! UI components for the arrivals board.

pub mod board_view;

pub use board_view::BoardApp;
