pub mod ai;
pub mod game;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_json;
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{choose_move, choose_move_with, AiAgent, AiConfig, AiDecision, AiDifficulty, WIN_SCORE};
pub use game::{
    evaluate, is_game_over, Board, BoardParseError, Cell, GameEvent, GameMode, GameRecord,
    GameState, Mark, Outcome, RuleEngine, RuleError, RuleResolution, ScoreBoard, Standings,
    BOARD_SIZE, HISTORY_STORAGE_KEY, LINES, RECENT_HISTORY_LEN, SCORES_STORAGE_KEY,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
    utils::init_logging(log::LevelFilter::Info);
}

/// 安装浏览器控制台日志，返回实际生效的级别。
#[wasm_bindgen(js_name = "initLogging")]
pub fn init_logging(level: Option<String>) -> String {
    utils::init_logging(utils::parse_level(level.as_deref())).to_string()
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

/// 以 JSON 兼容方式序列化：`None` 变为 `null` 而不是 `undefined`。
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn parse_difficulty(value: Option<&str>) -> AiDifficulty {
    value
        .and_then(|value| AiDifficulty::from_str(value).ok())
        .unwrap_or_default()
}

fn parse_mode(value: Option<&str>) -> Result<GameMode, JsValue> {
    match value {
        None => Ok(GameMode::Ai),
        Some(value) => GameMode::from_str(value)
            .map_err(|_| JsValue::from_str(&format!("unknown game mode {value:?}"))),
    }
}

fn make_agent(difficulty: AiDifficulty, seed: Option<u32>) -> AiAgent {
    let config = AiConfig::from_difficulty(difficulty);
    match seed {
        Some(seed) => AiAgent::with_seed(config, u64::from(seed)),
        None => AiAgent::new(config),
    }
}

#[derive(Serialize)]
struct MoveResponse {
    resolution: RuleResolution,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<GameRecord>,
    scores: ScoreBoard,
}

#[derive(Serialize)]
struct AiMoveResponse {
    decision: AiDecision,
    applied: MoveResponse,
}

#[wasm_bindgen]
pub struct GameEngine {
    state: GameState,
    standings: Standings,
    agent: AiAgent,
    rules: RuleEngine,
}

#[wasm_bindgen]
impl GameEngine {
    /// `scores_json` / `history_json` 为前端 localStorage 中保存的原始字符串。
    #[wasm_bindgen(constructor)]
    pub fn new(
        mode: Option<String>,
        difficulty: Option<String>,
        scores_json: Option<String>,
        history_json: Option<String>,
    ) -> Result<GameEngine, JsValue> {
        let mode = parse_mode(mode.as_deref())?;
        let difficulty = parse_difficulty(difficulty.as_deref());
        let standings = Standings::from_json(scores_json.as_deref(), history_json.as_deref())
            .map_err(serde_to_js_error)?;
        Ok(GameEngine {
            state: GameState::new(mode, difficulty),
            standings,
            agent: make_agent(difficulty, None),
            rules: RuleEngine::new(),
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    /// 载入外部保存的状态。结果按棋盘重新判定，轮次与棋子数不符时拒绝。
    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let mut state: GameState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.rules.restore(&mut state).map_err(to_js_error)?;
        if state.difficulty != self.agent.config().difficulty {
            self.agent = make_agent(state.difficulty, None);
        }
        self.state = state;
        Ok(())
    }

    /// 固定简单模式的随机种子，便于复现。
    pub fn set_seed(&mut self, seed: u32) {
        self.agent = make_agent(self.state.difficulty, Some(seed));
    }

    pub fn play_move(&mut self, cell: usize) -> Result<String, JsValue> {
        let events = self
            .rules
            .play_move(&mut self.state, cell)
            .map_err(to_js_error)?;
        let response = self.settle(events);
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }

    pub fn apply_ai_move(&mut self) -> Result<String, JsValue> {
        let (decision, events) = self
            .rules
            .apply_ai_move(&mut self.state, &mut self.agent)
            .map_err(to_js_error)?;
        let applied = self.settle(events);
        let response = AiMoveResponse { decision, applied };
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }

    /// 延迟后在当前棋盘快照上计算电脑落子，不修改引擎状态；
    /// 结果交给 `apply_ai_decision` 落子。未指定 `delay_ms` 时按配置随机取 500–1500ms。
    pub fn think_ai(&mut self, delay_ms: Option<u32>) -> Promise {
        let delay = delay_ms.unwrap_or_else(|| self.agent.think_delay_ms());
        let job = self.ai_job();

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let json = serde_json::to_string(&job.run()).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }

    /// 落下 `think_ai` 返回的决策（JSON 字符串）。
    pub fn apply_ai_decision(&mut self, decision_json: &str) -> Result<String, JsValue> {
        let decision: AiDecision =
            serde_json::from_str(decision_json).map_err(serde_to_js_error)?;
        let events = self
            .rules
            .apply_ai_decision(&mut self.state, &decision)
            .map_err(to_js_error)?;
        let applied = self.settle(events);
        let response = AiMoveResponse { decision, applied };
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }

    pub fn restart(&mut self) -> Result<String, JsValue> {
        let events = self.rules.restart(&mut self.state);
        let response = self.settle(events);
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }

    pub fn change_mode(&mut self, mode: &str, difficulty: Option<String>) -> Result<String, JsValue> {
        let mode = parse_mode(Some(mode))?;
        let difficulty = parse_difficulty(difficulty.as_deref());
        if difficulty != self.agent.config().difficulty {
            self.agent = make_agent(difficulty, None);
        }
        let events = self.rules.change_mode(&mut self.state, mode, difficulty);
        let response = self.settle(events);
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }

    pub fn scores_json(&self) -> Result<String, JsValue> {
        self.standings.scores_json().map_err(serde_to_js_error)
    }

    pub fn history_json(&self) -> Result<String, JsValue> {
        self.standings.history_json().map_err(serde_to_js_error)
    }

    pub fn recent_history_json(&self, count: Option<usize>) -> Result<String, JsValue> {
        let recent = self.standings.recent(count.unwrap_or(RECENT_HISTORY_LEN));
        serde_json::to_string(&recent).map_err(serde_to_js_error)
    }

    pub fn reset_scores(&mut self) -> Result<String, JsValue> {
        self.standings.reset();
        self.scores_json()
    }

    #[wasm_bindgen(getter)]
    pub fn finished(&self) -> bool {
        self.state.is_finished()
    }

    #[wasm_bindgen(getter)]
    pub fn computer_turn(&self) -> bool {
        self.state.is_computer_turn()
    }
}

/// 一次待执行的电脑决策：棋盘快照加上从引擎派生的代理。
struct AiJob {
    board: Board,
    computer: Mark,
    agent: AiAgent,
}

impl AiJob {
    fn run(mut self) -> AiDecision {
        self.agent.decide_move(&self.board, self.computer)
    }
}

impl GameEngine {
    fn ai_job(&mut self) -> AiJob {
        AiJob {
            board: self.state.board,
            computer: self.state.computer_mark().unwrap_or(game::COMPUTER_MARK),
            agent: self.agent.fork(),
        }
    }

    fn settle(&mut self, events: Vec<GameEvent>) -> MoveResponse {
        let record = if self.state.is_finished() {
            self.standings
                .record_game(&mut self.state, utils::timestamp_label())
        } else {
            None
        };
        MoveResponse {
            resolution: RuleResolution::new(self.state.clone(), events),
            record,
            scores: self.standings.scores.clone(),
        }
    }
}

/// 返回空棋盘。
#[wasm_bindgen(js_name = "createEmptyBoard")]
pub fn create_empty_board() -> Result<JsValue, JsValue> {
    to_js(&Board::empty())
}

/// 判定胜负，返回 `null`、`"X"`、`"O"` 或 `"Draw"`。
#[wasm_bindgen(js_name = "evaluateBoard")]
pub fn evaluate_board(board: JsValue) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    to_js(&evaluate(&board))
}

#[wasm_bindgen(js_name = "isGameOver")]
pub fn is_game_over_js(board: JsValue) -> Result<bool, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    Ok(is_game_over(&board))
}

#[wasm_bindgen(js_name = "emptyCells")]
pub fn empty_cells(board: JsValue) -> Result<Vec<usize>, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    Ok(board.empty_cells().collect())
}

/// 为电脑（O）选择落子，返回 `AiDecision`（包含 `cell` 与 `positions`）。
#[wasm_bindgen(js_name = "chooseMove")]
pub fn choose_move_js(
    board: JsValue,
    difficulty: Option<String>,
    seed: Option<u32>,
) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    let mut agent = make_agent(parse_difficulty(difficulty.as_deref()), seed);
    let decision = agent.decide_move(&board, game::COMPUTER_MARK);
    to_js(&decision)
}

#[wasm_bindgen(js_name = "scoresStorageKey")]
pub fn scores_storage_key() -> String {
    SCORES_STORAGE_KEY.to_string()
}

#[wasm_bindgen(js_name = "historyStorageKey")]
pub fn history_storage_key() -> String {
    HISTORY_STORAGE_KEY.to_string()
}
