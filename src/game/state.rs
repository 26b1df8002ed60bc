use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::board::{Board, Mark, Outcome};
use crate::ai::AiDifficulty;

/// 人机模式下人类固定执 X 先手，电脑执 O。
pub const HUMAN_MARK: Mark = Mark::X;
pub const COMPUTER_MARK: Mark = Mark::O;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Friend,
    Ai,
}

impl GameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Friend => "friend",
            GameMode::Ai => "ai",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "friend" | "pvp" => Ok(GameMode::Friend),
            "ai" | "computer" => Ok(GameMode::Ai),
            _ => Err(()),
        }
    }
}

/// 游戏事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    MovePlayed {
        mark: Mark,
        cell: usize,
    },
    AiMoveChosen {
        #[serde(skip_serializing_if = "Option::is_none")]
        cell: Option<usize>,
        positions: u64,
        duration_ms: u64,
    },
    GameWon {
        winner: Mark,
    },
    GameDrawn,
    GameRestarted {
        mode: GameMode,
        difficulty: AiDifficulty,
    },
}

/// 一局对局的完整状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    pub board: Board,
    pub next: Mark,
    pub mode: GameMode,
    #[serde(default)]
    pub difficulty: AiDifficulty,
    #[serde(default)]
    pub outcome: Outcome,
    /// 本局结果是否已计入比分，保证每局只记一次。
    #[serde(default)]
    pub scored: bool,
    #[serde(default)]
    pub ai_thinking_ms: u64,
    #[serde(default)]
    pub positions_evaluated: u64,
}

impl GameState {
    pub fn new(mode: GameMode, difficulty: AiDifficulty) -> Self {
        Self {
            board: Board::empty(),
            next: HUMAN_MARK,
            mode,
            difficulty,
            outcome: Outcome::Ongoing,
            scored: false,
            ai_thinking_ms: 0,
            positions_evaluated: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_finished()
    }

    pub fn computer_mark(&self) -> Option<Mark> {
        match self.mode {
            GameMode::Ai => Some(COMPUTER_MARK),
            GameMode::Friend => None,
        }
    }

    pub fn is_computer_turn(&self) -> bool {
        !self.is_finished() && self.computer_mark() == Some(self.next)
    }

    pub fn reset(&mut self) {
        self.board = Board::empty();
        self.next = HUMAN_MARK;
        self.outcome = Outcome::Ongoing;
        self.scored = false;
        self.ai_thinking_ms = 0;
        self.positions_evaluated = 0;
    }
}

impl Default for GameState {
    fn default() -> Self {
        GameState::new(GameMode::Ai, AiDifficulty::default())
    }
}
