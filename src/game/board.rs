use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 棋盘格子数量（3×3）。
pub const BOARD_SIZE: usize = 9;

/// 一条连线的三个格子下标。
pub type Line = [usize; 3];

/// 全部 8 条胜利连线：先三行，再三列，最后两条对角线。
pub const LINES: [Line; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

pub const CORNERS: [usize; 4] = [0, 2, 6, 8];
pub const EDGES: [usize; 4] = [1, 3, 5, 7];
pub const CENTER: usize = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn opponent(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mark::X => "X",
            Mark::O => "O",
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mark {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "X" | "x" => Ok(Mark::X),
            "O" | "o" => Ok(Mark::O),
            _ => Err(()),
        }
    }
}

pub type Cell = Option<Mark>;

/// 3×3 棋盘快照，按行优先存储。序列化后与前端的 `(string | null)[]` 数组一致。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Board {
    cells: [Cell; BOARD_SIZE],
}

impl Board {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_cells(cells: [Cell; BOARD_SIZE]) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[Cell; BOARD_SIZE] {
        &self.cells
    }

    /// Out-of-range indices read as `None`.
    pub fn get(&self, index: usize) -> Cell {
        self.cells.get(index).copied().flatten()
    }

    pub fn is_empty_cell(&self, index: usize) -> bool {
        index < BOARD_SIZE && self.cells[index].is_none()
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(index, _)| index)
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn count(&self, mark: Mark) -> usize {
        self.cells.iter().filter(|cell| **cell == Some(mark)).count()
    }

    pub fn place(&mut self, index: usize, mark: Mark) {
        self.cells[index] = Some(mark);
    }

    /// 返回落子后的新棋盘，原棋盘保持不变。
    pub fn with_mark(&self, index: usize, mark: Mark) -> Board {
        let mut next = *self;
        next.place(index, mark);
        next
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, cells) in self.cells.chunks(3).enumerate() {
            if row > 0 {
                f.write_str("/")?;
            }
            for cell in cells {
                f.write_str(cell.map(Mark::as_str).unwrap_or("."))?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardParseError {
    InvalidLength { found: usize },
    InvalidSymbol { symbol: char },
}

impl fmt::Display for BoardParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardParseError::InvalidLength { found } => {
                write!(f, "expected {BOARD_SIZE} cells, found {found}")
            }
            BoardParseError::InvalidSymbol { symbol } => write!(f, "invalid cell symbol {symbol:?}"),
        }
    }
}

impl std::error::Error for BoardParseError {}

/// 解析紧凑写法，例如 `"XX..O...."`；`/` 与空白会被忽略。
impl FromStr for Board {
    type Err = BoardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbols: Vec<char> = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '/')
            .collect();
        if symbols.len() != BOARD_SIZE {
            return Err(BoardParseError::InvalidLength {
                found: symbols.len(),
            });
        }

        let mut cells = [None; BOARD_SIZE];
        for (cell, symbol) in cells.iter_mut().zip(symbols) {
            *cell = match symbol {
                'X' | 'x' => Some(Mark::X),
                'O' | 'o' => Some(Mark::O),
                '.' | '_' | '-' => None,
                other => return Err(BoardParseError::InvalidSymbol { symbol: other }),
            };
        }
        Ok(Board { cells })
    }
}

/// 对局结果。序列化为 `null`、`"X"`、`"O"` 或 `"Draw"`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Outcome {
    #[default]
    Ongoing,
    Winner(Mark),
    Draw,
}

impl Outcome {
    pub fn is_finished(self) -> bool {
        !matches!(self, Outcome::Ongoing)
    }

    pub fn winner(self) -> Option<Mark> {
        match self {
            Outcome::Winner(mark) => Some(mark),
            _ => None,
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Outcome::Ongoing => serializer.serialize_none(),
            Outcome::Winner(mark) => serializer.serialize_str(mark.as_str()),
            Outcome::Draw => serializer.serialize_str("Draw"),
        }
    }
}

impl<'de> Deserialize<'de> for Outcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)?.as_deref() {
            None => Ok(Outcome::Ongoing),
            Some("Draw") => Ok(Outcome::Draw),
            Some(other) => other
                .parse::<Mark>()
                .map(Outcome::Winner)
                .map_err(|_| D::Error::custom(format!("unknown outcome {other:?}"))),
        }
    }
}

/// 判定胜负：按固定顺序扫描 8 条连线，第一条三子相同的连线决定胜者；
/// 没有胜者且棋盘已满则为平局，否则对局继续。
pub fn evaluate(board: &Board) -> Outcome {
    for [a, b, c] in LINES {
        if let Some(mark) = board.cells[a] {
            if board.cells[b] == Some(mark) && board.cells[c] == Some(mark) {
                return Outcome::Winner(mark);
            }
        }
    }

    if board.is_full() {
        Outcome::Draw
    } else {
        Outcome::Ongoing
    }
}

pub fn is_game_over(board: &Board) -> bool {
    evaluate(board).is_finished()
}
