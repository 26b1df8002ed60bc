use serde::{Deserialize, Serialize};

use super::{
    board::{evaluate, Mark, Outcome, BOARD_SIZE},
    state::{GameEvent, GameMode, GameState},
};
use crate::ai::{AiAgent, AiDecision, AiDifficulty};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    GameFinished,
    NotPlayerTurn,
    NotComputerTurn,
    InvalidCell { cell: usize },
    CellOccupied { cell: usize, mark: Mark },
    /// 双方棋子数不可能出现在合法对局中（X 先手，每步交替）。
    InconsistentBoard { x: usize, o: usize },
    TurnMismatch { expected: Mark, found: Mark },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: GameState,
    pub events: Vec<GameEvent>,
    pub outcome: Outcome,
}

impl RuleResolution {
    pub fn new(state: GameState, mut events: Vec<GameEvent>) -> Self {
        let outcome = state.outcome;
        let has_event = events
            .iter()
            .any(|event| matches!(event, GameEvent::GameWon { .. } | GameEvent::GameDrawn));
        if !has_event {
            match outcome {
                Outcome::Winner(winner) => events.push(GameEvent::GameWon { winner }),
                Outcome::Draw => events.push(GameEvent::GameDrawn),
                Outcome::Ongoing => {}
            }
        }

        Self {
            state,
            events,
            outcome,
        }
    }
}

#[derive(Debug, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    fn ensure_unfinished(state: &GameState) -> Result<(), RuleError> {
        if state.is_finished() {
            return Err(RuleError::GameFinished);
        }
        Ok(())
    }

    fn ensure_cell_open(state: &GameState, cell: usize) -> Result<(), RuleError> {
        if cell >= BOARD_SIZE {
            return Err(RuleError::InvalidCell { cell });
        }
        if let Some(mark) = state.board.get(cell) {
            return Err(RuleError::CellOccupied { cell, mark });
        }
        Ok(())
    }

    /// 人类玩家落子。好友模式下双方轮流，人机模式下只接受 X。
    pub fn play_move(&mut self, state: &mut GameState, cell: usize) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_unfinished(state)?;
        if state.is_computer_turn() {
            return Err(RuleError::NotPlayerTurn);
        }
        Self::ensure_cell_open(state, cell)?;

        Ok(Self::place(state, cell))
    }

    fn ensure_computer_turn(state: &GameState) -> Result<Mark, RuleError> {
        Self::ensure_unfinished(state)?;
        state
            .computer_mark()
            .filter(|mark| *mark == state.next)
            .ok_or(RuleError::NotComputerTurn)
    }

    /// 让电脑在当前局面上决策并落子。决策基于棋盘快照，
    /// 并把思考耗时与搜索节点数写回状态。
    pub fn apply_ai_move(
        &mut self,
        state: &mut GameState,
        agent: &mut AiAgent,
    ) -> Result<(AiDecision, Vec<GameEvent>), RuleError> {
        let computer = Self::ensure_computer_turn(state)?;
        let snapshot = state.board;
        let decision = agent.decide_move(&snapshot, computer);
        let events = self.apply_ai_decision(state, &decision)?;
        Ok((decision, events))
    }

    /// 落下一个事先算好的电脑决策（例如延迟思考后返回的结果）。
    /// 校验全部通过之前不修改状态。
    pub fn apply_ai_decision(
        &mut self,
        state: &mut GameState,
        decision: &AiDecision,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_computer_turn(state)?;
        if let Some(cell) = decision.cell {
            Self::ensure_cell_open(state, cell)?;
        }

        state.ai_thinking_ms = decision.duration_ms;
        state.positions_evaluated = decision.positions;
        let mut events = vec![GameEvent::AiMoveChosen {
            cell: decision.cell,
            positions: decision.positions,
            duration_ms: decision.duration_ms,
        }];
        if let Some(cell) = decision.cell {
            events.extend(Self::place(state, cell));
        }
        Ok(events)
    }

    /// 校验外部载入的状态：轮到谁必须与棋子数一致，结果按棋盘重新判定。
    pub fn restore(&mut self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        let x = state.board.count(Mark::X);
        let o = state.board.count(Mark::O);
        let expected = if x == o {
            Mark::X
        } else if x == o + 1 {
            Mark::O
        } else {
            return Err(RuleError::InconsistentBoard { x, o });
        };
        if state.next != expected {
            return Err(RuleError::TurnMismatch {
                expected,
                found: state.next,
            });
        }

        Ok(Self::check_victory(state).into_iter().collect())
    }

    pub fn restart(&mut self, state: &mut GameState) -> Vec<GameEvent> {
        state.reset();
        vec![GameEvent::GameRestarted {
            mode: state.mode,
            difficulty: state.difficulty,
        }]
    }

    pub fn change_mode(
        &mut self,
        state: &mut GameState,
        mode: GameMode,
        difficulty: AiDifficulty,
    ) -> Vec<GameEvent> {
        state.mode = mode;
        state.difficulty = difficulty;
        self.restart(state)
    }

    pub fn check_victory(state: &mut GameState) -> Option<GameEvent> {
        state.outcome = evaluate(&state.board);
        match state.outcome {
            Outcome::Winner(winner) => Some(GameEvent::GameWon { winner }),
            Outcome::Draw => Some(GameEvent::GameDrawn),
            Outcome::Ongoing => None,
        }
    }

    fn place(state: &mut GameState, cell: usize) -> Vec<GameEvent> {
        let mark = state.next;
        state.board.place(cell, mark);
        state.next = mark.opponent();

        let mut events = vec![GameEvent::MovePlayed { mark, cell }];
        events.extend(Self::check_victory(state));
        events
    }
}
