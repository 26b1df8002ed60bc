//! 电脑对手：带 alpha-beta 剪枝的 minimax（困难）与故意放水的启发式（简单）。

pub mod minimax;

pub use minimax::{choose_move, choose_move_with, AiAgent, AiConfig, AiDecision, AiDifficulty, WIN_SCORE};
