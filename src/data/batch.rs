use serde::{Serialize, Deserialize};

/// One next-location example: user `uid` is at `current_loc` and moves to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub uid: usize,
    pub current_loc: usize,
    pub target: usize,
}

/// Column-oriented mini-batch; the three vectors are parallel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub uid: Vec<usize>,
    pub current_loc: Vec<usize>,
    pub target: Vec<usize>,
}

impl Batch {
    pub fn from_samples<'a, I>(samples: I) -> Batch
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        let mut batch = Batch::default();
        for s in samples {
            batch.uid.push(s.uid);
            batch.current_loc.push(s.current_loc);
            batch.target.push(s.target);
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }
}
