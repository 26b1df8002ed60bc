use std::fmt;
use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::game::{evaluate, Board, Mark, Outcome, CORNERS, EDGES, LINES};
use crate::utils::Stopwatch;

/// 终局基础分：电脑获胜记 `WIN_SCORE - depth`，对手获胜记 `-WIN_SCORE + depth`。
pub const WIN_SCORE: i32 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiDifficulty {
    Easy,
    #[default]
    Hard,
}

impl AiDifficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            AiDifficulty::Easy => "easy",
            AiDifficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for AiDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiDifficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(AiDifficulty::Easy),
            "hard" => Ok(AiDifficulty::Hard),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub difficulty: AiDifficulty,
    /// 前端模拟“思考”时的随机延迟区间（毫秒）。
    pub min_delay_ms: u32,
    pub max_delay_ms: u32,
}

impl AiConfig {
    pub fn from_difficulty(difficulty: AiDifficulty) -> Self {
        Self {
            difficulty,
            min_delay_ms: 500,
            max_delay_ms: 1500,
        }
    }

    pub fn with_delay(mut self, min_delay_ms: u32, max_delay_ms: u32) -> Self {
        self.min_delay_ms = min_delay_ms.min(max_delay_ms);
        self.max_delay_ms = max_delay_ms.max(min_delay_ms);
        self
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig::from_difficulty(AiDifficulty::default())
    }
}

/// 一次决策的结果。`cell` 为 `None` 表示棋盘已满，调用方不应落子。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiDecision {
    pub cell: Option<usize>,
    pub positions: u64,
    pub difficulty: AiDifficulty,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
}

struct SearchStats {
    nodes: u64,
}

impl SearchStats {
    fn new() -> Self {
        Self { nodes: 0 }
    }
}

pub struct AiAgent {
    config: AiConfig,
    rng: SmallRng,
}

impl AiAgent {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(config: AiConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// 为 `computer` 一方选出落子位置。棋盘只读，搜索过程中只操作副本。
    pub fn decide_move(&mut self, board: &Board, computer: Mark) -> AiDecision {
        decide(self.config.difficulty, board, computer, &mut self.rng)
    }

    /// 派生一个配置相同的新代理，随机源由当前代理播种。
    /// 固定种子后，派生出的代理同样可复现。
    pub fn fork(&mut self) -> AiAgent {
        AiAgent::with_seed(self.config.clone(), self.rng.gen())
    }

    /// 在配置的区间内随机取一个思考延迟。
    pub fn think_delay_ms(&mut self) -> u32 {
        if self.config.max_delay_ms <= self.config.min_delay_ms {
            return self.config.min_delay_ms;
        }
        self.rng
            .gen_range(self.config.min_delay_ms..=self.config.max_delay_ms)
    }
}

/// 以 `O` 作为电脑一方选择落子，返回 `(格子, 搜索节点数)`。
pub fn choose_move(board: &Board, difficulty: AiDifficulty) -> (Option<usize>, u64) {
    choose_move_with(board, difficulty, &mut SmallRng::from_entropy())
}

/// 同 `choose_move`，简单模式的随机选择使用调用方提供的随机源。
pub fn choose_move_with<R: Rng + ?Sized>(
    board: &Board,
    difficulty: AiDifficulty,
    rng: &mut R,
) -> (Option<usize>, u64) {
    let decision = decide(difficulty, board, Mark::O, rng);
    (decision.cell, decision.positions)
}

fn decide<R: Rng + ?Sized>(
    difficulty: AiDifficulty,
    board: &Board,
    computer: Mark,
    rng: &mut R,
) -> AiDecision {
    let start = Stopwatch::start();
    let mut stats = SearchStats::new();

    let (cell, score) = match difficulty {
        AiDifficulty::Hard => best_move(board, computer, &mut stats),
        AiDifficulty::Easy => (easy_move(board, computer, rng), None),
    };

    let decision = AiDecision {
        cell,
        positions: stats.nodes,
        difficulty,
        duration_ms: start.elapsed_ms(),
        score,
    };
    log::debug!(
        "{difficulty} ai as {computer} on {board}: cell {:?}, {} positions",
        decision.cell,
        decision.positions
    );
    decision
}

fn terminal_score(outcome: Outcome, depth: i32, computer: Mark) -> Option<i32> {
    match outcome {
        Outcome::Winner(mark) if mark == computer => Some(WIN_SCORE - depth),
        Outcome::Winner(_) => Some(-WIN_SCORE + depth),
        Outcome::Draw => Some(0),
        Outcome::Ongoing => None,
    }
}

fn best_move(board: &Board, computer: Mark, stats: &mut SearchStats) -> (Option<usize>, Option<i32>) {
    let mut best_cell = None;
    let mut best_score = i32::MIN;

    for cell in board.empty_cells() {
        let child = board.with_mark(cell, computer);
        // 每个候选都用完整窗口独立搜索，根节点不做剪枝。
        let score = minimax(&child, 0, false, i32::MIN, i32::MAX, computer, stats);
        if score > best_score {
            best_score = score;
            best_cell = Some(cell);
        }
    }

    (best_cell, best_cell.map(|_| best_score))
}

fn minimax(
    board: &Board,
    depth: i32,
    maximizing: bool,
    mut alpha: i32,
    mut beta: i32,
    computer: Mark,
    stats: &mut SearchStats,
) -> i32 {
    stats.nodes += 1;

    if let Some(score) = terminal_score(evaluate(board), depth, computer) {
        return score;
    }

    if maximizing {
        let mut value = i32::MIN;
        for cell in board.empty_cells() {
            let child = board.with_mark(cell, computer);
            let score = minimax(&child, depth + 1, false, alpha, beta, computer, stats);
            value = value.max(score);
            alpha = alpha.max(score);
            if beta <= alpha {
                break;
            }
        }
        value
    } else {
        let opponent = computer.opponent();
        let mut value = i32::MAX;
        for cell in board.empty_cells() {
            let child = board.with_mark(cell, opponent);
            let score = minimax(&child, depth + 1, true, alpha, beta, computer, stats);
            value = value.min(score);
            beta = beta.min(score);
            if beta <= alpha {
                break;
            }
        }
        value
    }
}

/// 简单模式：故意放水。对手已有两子连线且第三格为空时直接让出该格；
/// 否则依次随机选择角、边，最后才是中心。
fn easy_move<R: Rng + ?Sized>(board: &Board, computer: Mark, rng: &mut R) -> Option<usize> {
    let opponent = computer.opponent();

    for line in LINES {
        let opponent_cells = line
            .iter()
            .filter(|&&index| board.get(index) == Some(opponent))
            .count();
        if opponent_cells == 2 {
            if let Some(&gap) = line.iter().find(|&&index| board.get(index).is_none()) {
                return Some(gap);
            }
        }
    }

    let corners: Vec<usize> = CORNERS
        .iter()
        .copied()
        .filter(|&index| board.is_empty_cell(index))
        .collect();
    if let Some(&cell) = corners.choose(rng) {
        return Some(cell);
    }

    let edges: Vec<usize> = EDGES
        .iter()
        .copied()
        .filter(|&index| board.is_empty_cell(index))
        .collect();
    if let Some(&cell) = edges.choose(rng) {
        return Some(cell);
    }

    let remaining: Vec<usize> = board.empty_cells().collect();
    remaining.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::CENTER;

    fn board(s: &str) -> Board {
        s.parse().expect("board literal should parse")
    }

    fn agent(difficulty: AiDifficulty) -> AiAgent {
        AiAgent::with_seed(AiConfig::from_difficulty(difficulty), 7)
    }

    #[test]
    fn hard_blocks_immediate_threat() {
        let decision = agent(AiDifficulty::Hard).decide_move(&board("XX./.O./..."), Mark::O);
        assert_eq!(decision.cell, Some(2));
        assert_eq!(decision.positions, 220);
        assert_eq!(decision.score, Some(0));
    }

    #[test]
    fn hard_takes_immediate_win_over_block() {
        let decision = agent(AiDifficulty::Hard).decide_move(&board("OO./XX./..."), Mark::O);
        assert_eq!(decision.cell, Some(2));
        assert_eq!(decision.score, Some(WIN_SCORE));
        assert_eq!(decision.positions, 64);
    }

    #[test]
    fn hard_answers_corner_opening_with_center() {
        let decision = agent(AiDifficulty::Hard).decide_move(&board("X../.../..."), Mark::O);
        assert_eq!(decision.cell, Some(CENTER));
        assert_eq!(decision.positions, 6304);
    }

    #[test]
    fn hard_empty_board_regression() {
        let (cell, positions) = choose_move(&Board::empty(), AiDifficulty::Hard);
        assert_eq!(cell, Some(0));
        assert_eq!(positions, 34_202);
    }

    #[test]
    fn single_empty_cell_is_chosen_by_both_difficulties() {
        let b = board("XOX/XOO/OX.");
        let hard = agent(AiDifficulty::Hard).decide_move(&b, Mark::O);
        assert_eq!(hard.cell, Some(8));
        assert_eq!(hard.positions, 1);

        let easy = agent(AiDifficulty::Easy).decide_move(&b, Mark::O);
        assert_eq!(easy.cell, Some(8));
        assert_eq!(easy.positions, 0);
    }

    #[test]
    fn full_board_yields_no_move() {
        let b = board("XOX/XOO/OXX");
        for difficulty in [AiDifficulty::Easy, AiDifficulty::Hard] {
            let (cell, positions) = choose_move(&b, difficulty);
            assert_eq!(cell, None);
            assert_eq!(positions, 0);
        }
    }

    #[test]
    fn search_does_not_mutate_input_board() {
        let b = board("X../.O./..X");
        let before = b;
        let _ = agent(AiDifficulty::Hard).decide_move(&b, Mark::O);
        assert_eq!(b, before);
    }

    fn assert_never_loses(b: Board, human_to_move: bool, hard: &mut AiAgent) {
        match evaluate(&b) {
            Outcome::Winner(Mark::X) => panic!("computer lost on {b}"),
            Outcome::Winner(Mark::O) | Outcome::Draw => return,
            Outcome::Ongoing => {}
        }

        if human_to_move {
            for cell in b.empty_cells() {
                assert_never_loses(b.with_mark(cell, Mark::X), false, hard);
            }
        } else {
            let decision = hard.decide_move(&b, Mark::O);
            let cell = decision.cell.expect("ongoing board has an empty cell");
            assert!(b.is_empty_cell(cell));
            assert_never_loses(b.with_mark(cell, Mark::O), true, hard);
        }
    }

    #[test]
    fn hard_never_loses_moving_second() {
        let mut hard = agent(AiDifficulty::Hard);
        assert_never_loses(Board::empty(), true, &mut hard);
    }

    #[test]
    fn hard_never_loses_moving_first() {
        let mut hard = agent(AiDifficulty::Hard);
        assert_never_loses(Board::empty(), false, &mut hard);
    }

    #[test]
    fn hard_self_play_is_a_draw() {
        let mut hard = agent(AiDifficulty::Hard);
        let mut b = Board::empty();
        let mut to_move = Mark::X;
        while !evaluate(&b).is_finished() {
            let cell = hard
                .decide_move(&b, to_move)
                .cell
                .expect("unfinished board has a move");
            b.place(cell, to_move);
            to_move = to_move.opponent();
        }
        assert_eq!(evaluate(&b), Outcome::Draw);
    }

    #[test]
    fn hard_prefers_faster_win() {
        // O 可以立即在 6 完成对角线，也可以先走别处再赢；深度惩罚保证选最快的。
        let decision = agent(AiDifficulty::Hard).decide_move(&board("X.O/XO./..X"), Mark::O);
        assert_eq!(decision.cell, Some(6));
        assert_eq!(decision.score, Some(WIN_SCORE));
    }

    #[test]
    fn easy_hands_over_opponent_two_in_a_row() {
        let cases = [
            ("XX./.O./...", 2),
            ("X.X/.O./...", 1),
            (".XX/.O./...", 0),
            (".../X../X..", 0),
            ("..O/.X./..X", 0),
            ("O../.X./X..", 2),
        ];
        for (literal, expected) in cases {
            for seed in 0..8 {
                let mut easy = AiAgent::with_seed(AiConfig::from_difficulty(AiDifficulty::Easy), seed);
                let decision = easy.decide_move(&board(literal), Mark::O);
                assert_eq!(decision.cell, Some(expected), "board {literal}");
                assert_eq!(decision.positions, 0);
            }
        }
    }

    #[test]
    fn easy_ignores_its_own_winning_line() {
        // O 有两子连线但简单模式不会去补，而是按角落优先随机落子。
        for seed in 0..16 {
            let mut easy = AiAgent::with_seed(AiConfig::from_difficulty(AiDifficulty::Easy), seed);
            let cell = easy
                .decide_move(&board("XO./.OX/..."), Mark::O)
                .cell
                .expect("board has empty cells");
            assert!([2, 6, 8].contains(&cell), "seed {seed} picked {cell}");
        }
    }

    #[test]
    fn easy_fallback_prefers_corners_then_edges_then_center() {
        for seed in 0..16 {
            let mut easy = AiAgent::with_seed(AiConfig::from_difficulty(AiDifficulty::Easy), seed);

            let opening = easy.decide_move(&Board::empty(), Mark::O).cell;
            assert!(opening.is_some_and(|cell| CORNERS.contains(&cell)));

            let corners_taken = board("XOX/.../O.O");
            let edge = easy.decide_move(&corners_taken, Mark::O).cell;
            assert!(edge.is_some_and(|cell| EDGES.contains(&cell)));

            let center_only = board("XOX/X.O/OXO");
            assert_eq!(easy.decide_move(&center_only, Mark::O).cell, Some(CENTER));
        }
    }

    #[test]
    fn easy_is_reproducible_with_same_seed() {
        let picks = |seed| {
            let mut easy = AiAgent::with_seed(AiConfig::from_difficulty(AiDifficulty::Easy), seed);
            (0..10)
                .map(|_| easy.decide_move(&Board::empty(), Mark::O).cell)
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(42), picks(42));
    }

    #[test]
    fn choose_move_with_uses_supplied_rng() {
        let mut rng = SmallRng::seed_from_u64(13);
        let (opening, positions) = choose_move_with(&Board::empty(), AiDifficulty::Easy, &mut rng);
        assert!(opening.is_some_and(|cell| CORNERS.contains(&cell)));
        assert_eq!(positions, 0);

        let (edge, _) = choose_move_with(&board("XOX/.../O.O"), AiDifficulty::Easy, &mut rng);
        assert!(edge.is_some_and(|cell| EDGES.contains(&cell)));

        let (gift, _) = choose_move_with(&board("XX./.O./..."), AiDifficulty::Easy, &mut rng);
        assert_eq!(gift, Some(2));

        let picks = |seed| {
            let mut rng = SmallRng::seed_from_u64(seed);
            (0..10)
                .map(|_| choose_move_with(&Board::empty(), AiDifficulty::Easy, &mut rng).0)
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(21), picks(21));
    }

    #[test]
    fn hard_choose_move_with_ignores_rng() {
        let mut rng = SmallRng::seed_from_u64(0);
        assert_eq!(
            choose_move_with(&board("XX./.O./..."), AiDifficulty::Hard, &mut rng),
            (Some(2), 220)
        );
    }

    #[test]
    fn forked_agents_follow_the_parent_seed() {
        let forks = |seed| {
            let mut parent = AiAgent::with_seed(AiConfig::from_difficulty(AiDifficulty::Easy), seed);
            (0..6)
                .map(|_| parent.fork().decide_move(&Board::empty(), Mark::O).cell)
                .collect::<Vec<_>>()
        };
        assert_eq!(forks(3), forks(3));

        let mut parent = AiAgent::with_seed(AiConfig::from_difficulty(AiDifficulty::Hard), 3);
        assert_eq!(parent.fork().config().difficulty, AiDifficulty::Hard);
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("EASY".parse::<AiDifficulty>(), Ok(AiDifficulty::Easy));
        assert_eq!("hard".parse::<AiDifficulty>(), Ok(AiDifficulty::Hard));
        assert!("expert".parse::<AiDifficulty>().is_err());
        assert_eq!(AiDifficulty::default(), AiDifficulty::Hard);
    }

    #[test]
    fn think_delay_stays_in_configured_range() {
        let config = AiConfig::from_difficulty(AiDifficulty::Hard).with_delay(100, 200);
        let mut agent = AiAgent::with_seed(config, 3);
        for _ in 0..50 {
            let delay = agent.think_delay_ms();
            assert!((100..=200).contains(&delay));
        }
        let mut fixed = AiAgent::with_seed(AiConfig::default().with_delay(0, 0), 3);
        assert_eq!(fixed.think_delay_ms(), 0);
    }
}
