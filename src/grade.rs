use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::QuizError;
use crate::models::Difficulty;
use crate::random::RandomSource;

pub const MIN_GRADE: u8 = 1;
pub const MAX_GRADE: u8 = 12;

/// School grade, always within 1..=12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Grade(u8);

impl Grade {
    pub const FIRST: Grade = Grade(MIN_GRADE);

    pub fn new(grade: i64) -> Result<Self, QuizError> {
        if (MIN_GRADE as i64..=MAX_GRADE as i64).contains(&grade) {
            Ok(Grade(grade as u8))
        } else {
            Err(QuizError::GradeOutOfRange(grade))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Uniform draw over 1..=12.
    pub fn random<R: RandomSource>(rng: &mut R) -> Self {
        Grade(rng.int_in(MIN_GRADE as i64, MAX_GRADE as i64) as u8)
    }

    pub fn all() -> impl Iterator<Item = Grade> {
        (MIN_GRADE..=MAX_GRADE).map(Grade)
    }

    pub fn band(self) -> GradeBand {
        match self.0 {
            1..=2 => GradeBand::Elementary1,
            3..=4 => GradeBand::Elementary2,
            5..=6 => GradeBand::Intermediate1,
            7..=8 => GradeBand::Intermediate2,
            9..=10 => GradeBand::Advanced1,
            _ => GradeBand::Advanced2,
        }
    }

    pub fn config(self) -> &'static GradeConfig {
        config_for(self)
    }

    pub fn difficulty(self) -> Difficulty {
        difficulty_for(self)
    }
}

impl TryFrom<u8> for Grade {
    type Error = QuizError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Grade::new(value as i64)
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> u8 {
        grade.0
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GradeBand {
    Elementary1,
    Elementary2,
    Intermediate1,
    Intermediate2,
    Advanced1,
    Advanced2,
}

impl GradeBand {
    pub fn name(self) -> &'static str {
        match self {
            GradeBand::Elementary1 => "elementary1",
            GradeBand::Elementary2 => "elementary2",
            GradeBand::Intermediate1 => "intermediate1",
            GradeBand::Intermediate2 => "intermediate2",
            GradeBand::Advanced1 => "advanced1",
            GradeBand::Advanced2 => "advanced2",
        }
    }
}

impl fmt::Display for GradeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Root,
    Log,
}

impl Operation {
    pub fn symbol(self) -> &'static str {
        match self {
            Operation::Add => "+",
            Operation::Subtract => "-",
            Operation::Multiply => "×",
            Operation::Divide => "÷",
            Operation::Power => "^",
            Operation::Root => "√",
            Operation::Log => "log",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Arithmetic profile shared by every grade in a band.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeConfig {
    pub operations: &'static [Operation],
    pub max_number: i64,
    pub allow_negatives: bool,
    pub allow_decimals: bool,
}

impl GradeConfig {
    pub fn supports(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }

    /// Results beyond this magnitude are redrawn.
    pub fn magnitude_ceiling(&self) -> f64 {
        (self.max_number * 10) as f64
    }
}

use Operation::{Add, Divide, Log, Multiply, Power, Root, Subtract};

static ELEMENTARY_1: GradeConfig = GradeConfig {
    operations: &[Add, Subtract],
    max_number: 20,
    allow_negatives: false,
    allow_decimals: false,
};

static ELEMENTARY_2: GradeConfig = GradeConfig {
    operations: &[Add, Subtract, Multiply, Divide],
    max_number: 100,
    allow_negatives: false,
    allow_decimals: false,
};

static INTERMEDIATE_1: GradeConfig = GradeConfig {
    operations: &[Add, Subtract, Multiply, Divide],
    max_number: 1000,
    allow_negatives: true,
    allow_decimals: true,
};

static INTERMEDIATE_2: GradeConfig = GradeConfig {
    operations: &[Add, Subtract, Multiply, Divide, Power],
    max_number: 100,
    allow_negatives: true,
    allow_decimals: true,
};

static ADVANCED_1: GradeConfig = GradeConfig {
    operations: &[Add, Subtract, Multiply, Divide, Power, Root],
    max_number: 200,
    allow_negatives: true,
    allow_decimals: true,
};

static ADVANCED_2: GradeConfig = GradeConfig {
    operations: &[Add, Subtract, Multiply, Divide, Power, Root, Log],
    max_number: 500,
    allow_negatives: true,
    allow_decimals: true,
};

pub fn config_for(grade: Grade) -> &'static GradeConfig {
    match grade.band() {
        GradeBand::Elementary1 => &ELEMENTARY_1,
        GradeBand::Elementary2 => &ELEMENTARY_2,
        GradeBand::Intermediate1 => &INTERMEDIATE_1,
        GradeBand::Intermediate2 => &INTERMEDIATE_2,
        GradeBand::Advanced1 => &ADVANCED_1,
        GradeBand::Advanced2 => &ADVANCED_2,
    }
}

pub fn difficulty_for(grade: Grade) -> Difficulty {
    match grade.get() {
        1..=4 => Difficulty::Easy,
        5..=8 => Difficulty::Medium,
        _ => Difficulty::Hard,
    }
}
