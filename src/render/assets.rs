//! Backdrop loading for the grid
//!
//! A backdrop is a plain text file whose characters are tiled across the
//! grid. Missing or unreadable files never stop the game; callers fall back
//! to [`Backdrop::dotted`].

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::game::Position;

#[derive(Error, Debug)]
pub enum AssetLoadError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} has no visible characters", path.display())]
    Empty { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backdrop {
    rows: Vec<Vec<char>>,
}

impl Backdrop {
    pub fn dotted() -> Self {
        Self {
            rows: vec![vec!['.']],
        }
    }

    /// Character for a cell, tiling the pattern in both directions
    pub fn glyph_at(&self, pos: Position) -> char {
        let row = &self.rows[wrap(pos.y, self.rows.len())];
        row[wrap(pos.x, row.len())]
    }
}

/// Index of `coord` in a pattern of `len` repeating entries
fn wrap(coord: i32, len: usize) -> usize {
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    usize::try_from(i64::from(coord).rem_euclid(len)).unwrap_or(0)
}

impl Default for Backdrop {
    fn default() -> Self {
        Self::dotted()
    }
}

pub fn load_background(path: &Path) -> Result<Backdrop, AssetLoadError> {
    let text = fs::read_to_string(path).map_err(|source| AssetLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let rows: Vec<Vec<char>> = text
        .lines()
        .map(|line| line.trim_end().chars().collect::<Vec<_>>())
        .filter(|row| !row.is_empty())
        .collect();

    if rows.is_empty() {
        return Err(AssetLoadError::Empty {
            path: path.to_path_buf(),
        });
    }

    Ok(Backdrop { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_and_tile() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ab").unwrap();
        writeln!(file, "c").unwrap();

        let backdrop = load_background(file.path()).unwrap();

        assert_eq!(backdrop.glyph_at(Position::new(0, 0)), 'a');
        assert_eq!(backdrop.glyph_at(Position::new(3, 0)), 'b');
        assert_eq!(backdrop.glyph_at(Position::new(5, 1)), 'c');
        assert_eq!(backdrop.glyph_at(Position::new(0, 2)), 'a');
    }

    #[test]
    fn test_missing_file() {
        let result = load_background(Path::new("/nonexistent/backdrop.txt"));
        assert!(matches!(result, Err(AssetLoadError::Io { .. })));
    }

    #[test]
    fn test_blank_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "   ").unwrap();
        assert!(matches!(
            load_background(file.path()),
            Err(AssetLoadError::Empty { .. })
        ));
    }
}
