/// Binary level file codec.
///
/// ## Layout (little-endian, no magic, no version header):
///   ```text
///   i32 width
///   i32 height
///   height rows of exactly `width` tile bytes, row-major, no padding
///   i32 player_x
///   i32 player_y
///   ```
///
/// ## Tile bytes:
///   'x' wall   '_' empty   's' start   'f' finish   'd' trap
///
/// Width and height outside (0, 100] are rejected before any row is
/// parsed, so a hostile header never drives an allocation.

use std::io;
use std::path::Path;

use thiserror::Error;

use crate::domain::tile::Tile;

/// Largest accepted level edge.
pub const MAX_DIM: i32 = 100;

#[derive(Debug, Error)]
pub enum LevelFileError {
    #[error("could not read level file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid level dimensions: {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },
    #[error("level file truncated: need {expected} bytes, have {found}")]
    Truncated { expected: usize, found: usize },
}

/// A fully parsed level file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelData {
    pub width: usize,
    pub height: usize,
    pub tiles: Vec<Vec<Tile>>,
    pub player_x: i32,
    pub player_y: i32,
}

/// Decode a level from raw bytes.
pub fn decode(bytes: &[u8]) -> Result<LevelData, LevelFileError> {
    let mut cur = Cursor { bytes, pos: 0 };
    let width = cur.read_i32()?;
    let height = cur.read_i32()?;

    if width <= 0 || width > MAX_DIM || height <= 0 || height > MAX_DIM {
        return Err(LevelFileError::InvalidDimensions { width, height });
    }

    let (w, h) = (width as usize, height as usize);
    let mut tiles = Vec::with_capacity(h);
    for _ in 0..h {
        let row = cur.read_bytes(w)?;
        tiles.push(row.iter().map(|&b| Tile::from_byte(b)).collect());
    }

    let player_x = cur.read_i32()?;
    let player_y = cur.read_i32()?;

    Ok(LevelData { width: w, height: h, tiles, player_x, player_y })
}

/// Encode a grid plus player start into the on-disk byte image.
pub fn encode(tiles: &[Vec<Tile>], player_x: i32, player_y: i32) -> Vec<u8> {
    let height = tiles.len();
    let width = tiles.first().map_or(0, |row| row.len());

    let mut out = Vec::with_capacity(16 + width * height);
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(height as i32).to_le_bytes());
    for row in tiles {
        out.extend(row.iter().map(|t| t.to_byte()));
    }
    out.extend_from_slice(&player_x.to_le_bytes());
    out.extend_from_slice(&player_y.to_le_bytes());
    out
}

/// Read and decode a level file.
pub fn load(path: &Path) -> Result<LevelData, LevelFileError> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

// ── Byte cursor ──

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], LevelFileError> {
        if self.pos + n > self.bytes.len() {
            return Err(LevelFileError::Truncated {
                expected: self.pos + n,
                found: self.bytes.len(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_i32(&mut self) -> Result<i32, LevelFileError> {
        let b = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_from(rows: &[&str]) -> Vec<Vec<Tile>> {
        rows.iter()
            .map(|row| row.bytes().map(Tile::from_byte).collect())
            .collect()
    }

    #[test]
    fn encode_decode_round_trip() {
        let tiles = grid_from(&[
            "xxxxxx",
            "xs__fx",
            "x_d__x",
            "xxxxxx",
        ]);
        let bytes = encode(&tiles, 1, 1);
        let data = decode(&bytes).unwrap();
        assert_eq!(data.width, 6);
        assert_eq!(data.height, 4);
        assert_eq!(data.tiles, tiles);
        assert_eq!((data.player_x, data.player_y), (1, 1));
    }

    #[test]
    fn exact_byte_layout() {
        let tiles = grid_from(&["xx", "sf"]);
        let bytes = encode(&tiles, 0, 1);
        let mut expected = vec![];
        expected.extend_from_slice(&2i32.to_le_bytes());
        expected.extend_from_slice(&2i32.to_le_bytes());
        expected.extend_from_slice(b"xxsf");
        expected.extend_from_slice(&0i32.to_le_bytes());
        expected.extend_from_slice(&1i32.to_le_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn rejects_zero_and_oversized_dimensions() {
        for (w, h) in [(0, 5), (5, 0), (-3, 5), (101, 5), (5, 101)] {
            let mut bytes = vec![];
            bytes.extend_from_slice(&(w as i32).to_le_bytes());
            bytes.extend_from_slice(&(h as i32).to_le_bytes());
            assert!(matches!(
                decode(&bytes),
                Err(LevelFileError::InvalidDimensions { .. })
            ));
        }
    }

    #[test]
    fn boundary_dimension_100_accepted() {
        let tiles = vec![vec![Tile::Empty; 100]; 100];
        let bytes = encode(&tiles, 1, 1);
        let data = decode(&bytes).unwrap();
        assert_eq!((data.width, data.height), (100, 100));
    }

    #[test]
    fn rejects_truncated_payload() {
        let tiles = grid_from(&["xxx", "x_x", "xxx"]);
        let mut bytes = encode(&tiles, 1, 1);
        bytes.truncate(bytes.len() - 6);
        assert!(matches!(decode(&bytes), Err(LevelFileError::Truncated { .. })));
    }

    #[test]
    fn unknown_tile_bytes_become_empty() {
        let mut bytes = vec![];
        bytes.extend_from_slice(&2i32.to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(b"P!");
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        let data = decode(&bytes).unwrap();
        assert_eq!(data.tiles[0], vec![Tile::Empty, Tile::Empty]);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("nope.bin")).unwrap_err();
        assert!(matches!(err, LevelFileError::Io(_)));
    }

    #[test]
    fn load_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let tiles = grid_from(&["xxxx", "xsfx", "xxxx"]);
        let path = dir.path().join("tiny.bin");
        std::fs::write(&path, encode(&tiles, 1, 1)).unwrap();
        let data = load(&path).unwrap();
        assert_eq!(data.tiles, tiles);
        assert_eq!((data.width, data.height), (4, 3));
    }
}
