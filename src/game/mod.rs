//! 游戏核心逻辑模块（棋盘判定、规则引擎、比分记录）。

pub mod board;
pub mod rules;
pub mod scores;
pub mod state;

pub use board::{
    evaluate,
    is_game_over,
    Board,
    BoardParseError,
    Cell,
    Line,
    Mark,
    Outcome,
    BOARD_SIZE,
    CENTER,
    CORNERS,
    EDGES,
    LINES,
};
pub use rules::{RuleEngine, RuleError, RuleResolution};
pub use scores::{
    GameRecord,
    ScoreBoard,
    Standings,
    HISTORY_STORAGE_KEY,
    RECENT_HISTORY_LEN,
    SCORES_STORAGE_KEY,
};
pub use state::{GameEvent, GameMode, GameState, COMPUTER_MARK, HUMAN_MARK};
