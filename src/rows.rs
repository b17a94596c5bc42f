use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const MIN_AGE: i32 = 25;
pub const MAX_AGE: i32 = 70;

/// Column list shared by every insert path. The identity key is left to the server.
pub const COLUMNS: [&str; 2] = ["name", "age"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedRow {
    pub name: String,
    pub age: i32,
}

impl GeneratedRow {
    pub fn with_age(age: i32) -> Self {
        GeneratedRow {
            name: format!("Someone {} year old", age),
            age,
        }
    }

    /// `('Someone 42 year old', 42)`
    pub fn values_clause(&self) -> String {
        format!("({}, {})", sql_literal(&self.name), self.age)
    }
}

/// Quotes `text` as a SQL string literal.
pub fn sql_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Source of random rows. Seed it for reproducible runs.
#[derive(Debug, Clone)]
pub struct RowGenerator {
    rng: StdRng,
}

impl RowGenerator {
    pub fn from_os_rng() -> Self {
        RowGenerator { rng: StdRng::from_os_rng() }
    }

    pub fn seeded(seed: u64) -> Self {
        RowGenerator { rng: StdRng::seed_from_u64(seed) }
    }

    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_os_rng(),
        }
    }

    pub fn next_row(&mut self) -> GeneratedRow {
        GeneratedRow::with_age(self.rng.random_range(MIN_AGE..MAX_AGE))
    }
}

/// In-memory table handed to a bulk transfer in one piece.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowBuffer {
    rows: Vec<GeneratedRow>,
}

impl RowBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        RowBuffer { rows: Vec::with_capacity(capacity) }
    }

    pub fn fill(generator: &mut RowGenerator, count: usize) -> Self {
        let mut buffer = RowBuffer::with_capacity(count);
        for _ in 0..count {
            buffer.push(generator.next_row());
        }
        buffer
    }

    pub fn push(&mut self, row: GeneratedRow) {
        self.rows.push(row);
    }

    pub fn columns(&self) -> &'static [&'static str] {
        &COLUMNS
    }

    pub fn rows(&self) -> &[GeneratedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
