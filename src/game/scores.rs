//! 比分与历史记录。JSON 结构与前端 localStorage 中保存的数据保持兼容。

use serde::{Deserialize, Serialize};

use super::board::{Mark, Outcome};
use super::state::{GameMode, GameState};
use crate::ai::AiDifficulty;

pub const SCORES_STORAGE_KEY: &str = "ticTacToeScores";
pub const HISTORY_STORAGE_KEY: &str = "ticTacToeHistory";
/// 前端历史面板展示的条数。
pub const RECENT_HISTORY_LEN: usize = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoreBoard {
    pub x_wins: u32,
    pub o_wins: u32,
    pub draws: u32,
    pub current_streak: u32,
    pub max_streak: u32,
    pub last_winner: Option<Mark>,
}

impl ScoreBoard {
    /// 计入一局结果；`Ongoing` 不做任何修改。
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Ongoing => return,
            Outcome::Winner(winner) => {
                match winner {
                    Mark::X => self.x_wins += 1,
                    Mark::O => self.o_wins += 1,
                }
                self.current_streak = if self.last_winner == Some(winner) {
                    self.current_streak + 1
                } else {
                    1
                };
            }
            Outcome::Draw => {
                self.draws += 1;
                self.current_streak = 0;
            }
        }
        self.max_streak = self.max_streak.max(self.current_streak);
        self.last_winner = outcome.winner();
    }

    pub fn games_played(&self) -> u32 {
        self.x_wins + self.o_wins + self.draws
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub game_number: u32,
    pub result: String,
    pub opponent: String,
    pub timestamp: String,
    pub mode: GameMode,
    pub difficulty: Option<AiDifficulty>,
}

impl GameRecord {
    fn describe(outcome: Outcome, mode: GameMode) -> Option<(&'static str, &'static str)> {
        let friend = mode == GameMode::Friend;
        match outcome {
            Outcome::Winner(Mark::X) => Some(("X win", if friend { "O lose" } else { "AI lose" })),
            Outcome::Winner(Mark::O) => {
                Some(("O win", if friend { "X lose" } else { "Player lose" }))
            }
            Outcome::Draw => Some(("Draw", "Tie")),
            Outcome::Ongoing => None,
        }
    }
}

/// 比分与历史的组合，负责“每局只记一次”。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Standings {
    pub scores: ScoreBoard,
    pub history: Vec<GameRecord>,
}

impl Standings {
    pub fn new(scores: ScoreBoard, history: Vec<GameRecord>) -> Self {
        Self { scores, history }
    }

    pub fn from_json(scores_json: Option<&str>, history_json: Option<&str>) -> Result<Self, serde_json::Error> {
        let scores = match scores_json {
            Some(json) => serde_json::from_str(json)?,
            None => ScoreBoard::default(),
        };
        let history = match history_json {
            Some(json) => serde_json::from_str(json)?,
            None => Vec::new(),
        };
        Ok(Self::new(scores, history))
    }

    pub fn scores_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.scores)
    }

    pub fn history_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.history)
    }

    /// 若对局已结束且尚未计分，则更新比分并追加一条历史记录。
    pub fn record_game(&mut self, state: &mut GameState, timestamp: impl Into<String>) -> Option<GameRecord> {
        if state.scored {
            return None;
        }
        let (result, opponent) = GameRecord::describe(state.outcome, state.mode)?;

        self.scores.record(state.outcome);
        let record = GameRecord {
            game_number: self.history.len() as u32 + 1,
            result: result.to_string(),
            opponent: opponent.to_string(),
            timestamp: timestamp.into(),
            mode: state.mode,
            difficulty: match state.mode {
                GameMode::Ai => Some(state.difficulty),
                GameMode::Friend => None,
            },
        };
        self.history.push(record.clone());
        state.scored = true;

        log::info!(
            "game {} finished: {} ({}), streak {}",
            record.game_number,
            record.result,
            record.opponent,
            self.scores.current_streak
        );
        Some(record)
    }

    /// 最近 `count` 局，最新的在前。
    pub fn recent(&self, count: usize) -> Vec<&GameRecord> {
        self.history.iter().rev().take(count).collect()
    }

    pub fn reset(&mut self) {
        self.scores = ScoreBoard::default();
        self.history.clear();
        log::info!("scores and history reset");
    }
}
