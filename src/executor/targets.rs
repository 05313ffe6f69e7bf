use serde::{Deserialize, Serialize};

use crate::analysis::types::Letter;
use crate::perception::types::Point;

/// A single point the driver will act on. Lower `priority` is tried first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickTarget {
    pub point: Point,
    /// Name of the layout or detector the point came from.
    pub origin_system: String,
    pub priority: u32,
}

impl ClickTarget {
    pub fn new(point: Point, origin_system: impl Into<String>, priority: u32) -> Self {
        Self {
            point,
            origin_system: origin_system.into(),
            priority,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragPair {
    pub from: Point,
    pub to: Point,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragTarget {
    pub from: Point,
    pub to: Point,
    pub origin_system: String,
    pub priority: u32,
}

/// One guessed screen layout for a closed-form question type.
/// New layouts are added by appending a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoordinateTable {
    TrueFalse {
        name: String,
        true_at: Point,
        false_at: Point,
    },
    MultipleChoice {
        name: String,
        a: Point,
        b: Point,
        c: Point,
        d: Point,
    },
}

impl CoordinateTable {
    pub fn name(&self) -> &str {
        match self {
            CoordinateTable::TrueFalse { name, .. } | CoordinateTable::MultipleChoice { name, .. } => name,
        }
    }

    pub fn true_false_point(&self, value: bool) -> Option<Point> {
        match self {
            CoordinateTable::TrueFalse { true_at, false_at, .. } => {
                Some(if value { *true_at } else { *false_at })
            }
            CoordinateTable::MultipleChoice { .. } => None,
        }
    }

    pub fn letter_point(&self, letter: Letter) -> Option<Point> {
        match self {
            CoordinateTable::MultipleChoice { a, b, c, d, .. } => Some(match letter {
                Letter::A => *a,
                Letter::B => *b,
                Letter::C => *c,
                Letter::D => *d,
            }),
            CoordinateTable::TrueFalse { .. } => None,
        }
    }
}

/// Every fixed screen position the resolver can fall back to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layouts {
    /// Declaration order is fallback order.
    pub tables: Vec<CoordinateTable>,
    pub fill_blank_fallback: Vec<Point>,
    pub submit: Vec<Point>,
    pub matching_pairs: Vec<DragPair>,
}

fn tf(name: &str, true_at: (i32, i32), false_at: (i32, i32)) -> CoordinateTable {
    CoordinateTable::TrueFalse {
        name: name.into(),
        true_at: true_at.into(),
        false_at: false_at.into(),
    }
}

fn mc(name: &str, pts: [(i32, i32); 4]) -> CoordinateTable {
    let [a, b, c, d] = pts.map(Point::from);
    CoordinateTable::MultipleChoice {
        name: name.into(),
        a,
        b,
        c,
        d,
    }
}

fn points(raw: &[(i32, i32)]) -> Vec<Point> {
    raw.iter().copied().map(Point::from).collect()
}

impl Default for Layouts {
    fn default() -> Self {
        Self {
            tables: vec![
                tf("tf_system_1", (919, 638), (967, 578)),
                tf("tf_system_2", (850, 600), (1050, 600)),
                tf("tf_system_3", (800, 650), (1100, 650)),
                mc("mc_system_1", [(400, 500), (400, 550), (400, 600), (400, 650)]),
                mc("mc_system_2", [(1130, 707), (1175, 558), (1000, 600), (1050, 650)]),
                mc("mc_system_3", [(600, 450), (600, 500), (600, 550), (600, 600)]),
                mc("mc_system_4", [(500, 400), (500, 450), (500, 500), (500, 550)]),
            ],
            fill_blank_fallback: points(&[
                (1055, 623),
                (1173, 638),
                (900, 600),
                (1200, 650),
                (800, 580),
                (1000, 580),
                (1100, 620),
                (950, 650),
            ]),
            submit: points(&[
                (960, 983),
                (960, 950),
                (1000, 983),
                (920, 983),
                (960, 1000),
                (900, 983),
                (1020, 983),
                (880, 950),
            ]),
            matching_pairs: [400, 450, 500, 550]
                .into_iter()
                .map(|y| DragPair {
                    from: Point::new(600, y),
                    to: Point::new(1200, y),
                })
                .collect(),
        }
    }
}
