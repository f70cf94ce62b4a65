use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use std::collections::HashMap;

/// A worksheet held in memory with random access by `(row, col)`.
#[derive(Clone, Debug, Default)]
pub struct Sheet {
    /// Source file name
    pub file_name: String,
    /// Worksheet tab name
    pub name: String,
    /// Stored cells in reading order
    pub cells: Vec<Cell>,
    positions: HashMap<(usize, usize), usize>,
}

impl Sheet {
    pub fn new(file_name: &str, name: &str) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Adds a cell; a later cell at the same position replaces the earlier one.
    pub fn push(&mut self, cell: Cell) {
        let position = (cell.row, cell.col);
        match self.positions.get(&position) {
            Some(index) => self.cells[*index] = cell,
            None => {
                self.positions.insert(position, self.cells.len());
                self.cells.push(cell);
            }
        }
    }

    /// Convenience for building grids by hand: stores `value` as text.
    pub fn set_text(&mut self, row: usize, col: usize, value: &str) {
        self.push(Cell { row, col, kind: CellType::InlineString, value: value.to_owned() });
    }

    /// Convenience for building grids by hand: stores `value` as a number.
    pub fn set_number(&mut self, row: usize, col: usize, value: &str) {
        self.push(Cell { row, col, kind: CellType::Number, value: value.to_owned() });
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.positions.get(&(row, col)).map(|index| &self.cells[*index])
    }

    /// Canonical text at a position; a missing cell reads as empty text.
    pub fn text(&self, row: usize, col: usize) -> String {
        self.cell(row, col).map(Cell::text).unwrap_or_default()
    }

    /// Whether the cell at a position stores text (as opposed to a number, boolean, etc.).
    pub fn is_text(&self, row: usize, col: usize) -> bool {
        self.cell(row, col).map(|cell| cell.kind.is_text()).unwrap_or(false)
    }

    /// All stored cells of one row, ordered by column.
    pub fn row(&self, row: usize) -> Vec<&Cell> {
        let mut cells: Vec<&Cell> = self.cells.iter().filter(|cell| cell.row == row).collect();
        cells.sort_by_key(|cell| cell.col);
        cells
    }

    /// Replaces shared-string indexes with their text. Returns the first
    /// out-of-range index, if any.
    pub(crate) fn resolve_shared_strings(&mut self, shared_strings: &[String]) -> Result<(), (String, String)> {
        for cell in self.cells.iter_mut().filter(|cell| cell.kind == CellType::SharedString) {
            let text = cell.value
                .parse::<usize>()
                .ok()
                .and_then(|index| shared_strings.get(index));
            match text {
                Some(text) => {
                    cell.kind = CellType::InlineString;
                    cell.value = text.to_owned();
                }
                None => return Err((cell.reference(), cell.value.to_owned())),
            }
        }
        Ok(())
    }
}
