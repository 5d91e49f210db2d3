/// Rows of one source file, restricted to allow-listed columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    /// Column names exactly as the file spells them.
    pub headers: Vec<String>,
    /// One entry per record, aligned with `headers`. Empty cells are `None`.
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a block (one sheet, usually) whose header may differ from
    /// what is already held. Columns are unioned by exact name; cells for
    /// columns a block lacks are `None`.
    pub fn append(&mut self, headers: Vec<String>, rows: Vec<Vec<Option<String>>>) {
        let positions: Vec<usize> = headers
            .iter()
            .map(|h| match self.headers.iter().position(|x| x == h) {
                Some(i) => i,
                None => {
                    self.headers.push(h.clone());
                    self.headers.len() - 1
                }
            })
            .collect();

        let width = self.headers.len();
        for row in &mut self.rows {
            row.resize(width, None);
        }
        self.rows.reserve(rows.len());
        for row in rows {
            let mut aligned = vec![None; width];
            for (cell, &pos) in row.into_iter().zip(&positions) {
                aligned[pos] = cell;
            }
            self.rows.push(aligned);
        }
    }
}
