//! A1-style cell references.

/// Converts a zero-based column index to its letters (`0` → `A`, `27` → `AB`).
pub fn col_to_letters(col: usize) -> String {
    let mut letters = Vec::new();
    let mut index = col + 1;
    while index > 0 {
        let remainder = (index - 1) % 26;
        letters.push(b'A' + remainder as u8);
        index = (index - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Renders a zero-based `(row, col)` as an A1 reference (`(4, 1)` → `B5`).
pub fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", col_to_letters(col), row + 1)
}

/// Parses an A1 reference into a zero-based `(row, col)`; `$` anchors are ignored.
pub fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let col = letters
        .chars()
        .try_fold(0usize, |acc, c| {
            let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
            acc.checked_mul(26)?.checked_add(digit)
        })?;
    let row = digits.parse::<usize>().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}
