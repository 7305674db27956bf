//! Large ("gridcular") pattern dictionary.
//!
//! Twelve concentric neighborhoods of a point (9 to 141 offsets, radius
//! up to 7) are hashed into 64-bit Zobrist signatures; a big
//! open-addressed table maps signatures to a move probability learned
//! offline. Matching extends the signature ring by ring and keeps the
//! widest hit, so more specific shapes override smaller ones.
//!
//! The table is populated from two text files:
//! - `patterns.prob`: `prob t1 t2 (s:spatial_id)` per line
//! - `patterns.spat`: `id radius pattern_string` per line, inserted under
//!   all 8 board symmetries with identical id and probability
//!
//! Signatures are computed against a second board with a 7-wide
//! out-of-board border ([`LargeBoard`]), wide enough that no offset of
//! the outermost ring needs a bounds test.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;
use tracing::info;

use goban::board::{Point, Position, N};
use goban::rng::Lcg32;

/// Offsets in the widest neighborhood.
pub const MAX_PATTERN_DIST: usize = 141;

/// Default log2 of the hash table size.
const DEFAULT_KEY_BITS: u32 = 25;

/// Row stride of the bordered pattern board.
const LARGE_W: usize = N + 7;
/// Size of the bordered pattern board. The border is 7 wide, the
/// maximum gridcular radius; this invariant ties the two tables below
/// to the board geometry.
const LARGE_BOARDSIZE: usize = (N + 14) * (N + 7);

/// Gridcular neighborhood offsets `(x, y)`, ordered so that each ring
/// extends the previous one. Symmetric under the dihedral group.
#[rustfmt::skip]
const GRIDCULAR_SEQ: [(i32, i32); MAX_PATTERN_DIST] = [
    (0,0),                                                            // size 1
    (0,1), (0,-1), (1,0), (-1,0), (1,1), (-1,1), (1,-1), (-1,-1),
    (0,2), (0,-2), (2,0), (-2,0),                                     // size 2
    (1,2), (-1,2), (1,-2), (-1,-2), (2,1), (-2,1), (2,-1), (-2,-1),   // size 3
    (0,3), (0,-3), (2,2), (-2,2), (2,-2), (-2,-2), (3,0), (-3,0),     // size 4
    (1,3), (-1,3), (1,-3), (-1,-3), (3,1), (-3,1), (3,-1), (-3,-1),   // size 5
    (0,4), (0,-4), (2,3), (-2,3), (2,-3), (-2,-3), (3,2), (-3,2),     // size 6
    (3,-2), (-3,-2), (4,0), (-4,0),
    (1,4), (-1,4), (1,-4), (-1,-4), (3,3), (-3,3), (3,-3), (-3,-3),   // size 7
    (4,1), (-4,1), (4,-1), (-4,-1),
    (0,5), (0,-5), (2,4), (-2,4), (2,-4), (-2,-4), (4,2), (-4,2),     // size 8
    (4,-2), (-4,-2), (5,0), (-5,0),
    (1,5), (-1,5), (1,-5), (-1,-5), (3,4), (-3,4), (3,-4), (-3,-4),   // size 9
    (4,3), (-4,3), (4,-3), (-4,-3), (5,1), (-5,1), (5,-1), (-5,-1),
    (0,6), (0,-6), (2,5), (-2,5), (2,-5), (-2,-5), (4,4), (-4,4),     // size 10
    (4,-4), (-4,-4), (5,2), (-5,2), (5,-2), (-5,-2), (6,0), (-6,0),
    (1,6), (-1,6), (1,-6), (-1,-6), (3,5), (-3,5), (3,-5), (-3,-5),   // size 11
    (5,3), (-5,3), (5,-3), (-5,-3), (6,1), (-6,1), (6,-1), (-6,-1),
    (0,7), (0,-7), (2,6), (-2,6), (2,-6), (-2,-6), (4,5), (-4,5),     // size 12
    (4,-5), (-4,-5), (5,4), (-5,4), (5,-4), (-5,-4), (6,2), (-6,2),
    (6,-2), (-6,-2), (7,0), (-7,0),
];

/// Cumulative offset count of each neighborhood size.
pub const GRIDCULAR_SIZE: [usize; 13] = [0, 9, 13, 21, 29, 37, 49, 61, 73, 89, 105, 121, 141];

/// Step primes for double hashing, selected by four key bits.
const PRIMES: [usize; 32] = [
    5, 11, 37, 103, 293, 991, 2903, 9931,
    7, 19, 73, 10009, 11149, 12553, 6229, 10181,
    1013, 1583, 2503, 3491, 4637, 5501, 6571, 7459,
    8513, 9433, 10433, 11447, 11887, 12409, 2221, 4073,
];

/// Errors while reading the pattern files.
#[derive(Debug, Error)]
pub enum PatternLoadError {
    #[error("cannot open pattern file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("read error in pattern file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Board copy with a 7-wide out-of-board border, used only for
/// signature computation.
pub struct LargeBoard {
    cells: [u8; LARGE_BOARDSIZE],
}

impl LargeBoard {
    pub fn new() -> Self {
        Self {
            cells: [b'#'; LARGE_BOARDSIZE],
        }
    }

    /// Snapshot a position into the bordered layout.
    pub fn from_position(pos: &Position) -> Self {
        let mut board = Self::new();
        board.copy_from(pos);
        board
    }

    pub fn copy_from(&mut self, pos: &Position) {
        for y in 0..N {
            for x in 0..N {
                let pt = (y + 1) * (N + 1) + x + 1;
                let lpt = (y + 7) * LARGE_W + x + 7;
                self.cells[lpt] = pos.color[pt];
            }
        }
    }

    /// Translate a board point into this layout.
    pub fn coord(pt: Point) -> usize {
        let y = pt / (N + 1) - 1;
        let x = pt % (N + 1) - 1;
        (y + 7) * LARGE_W + x + 7
    }
}

impl Default for LargeBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    /// 64-bit Zobrist signature; 0 marks an empty slot, so no real
    /// pattern may hash to 0 (2^-64 per pattern, accepted).
    key: u64,
    id: u32,
    prob: f32,
}

/// Open-addressed, double-hashed dictionary of large patterns.
pub struct LargePatternDict {
    table: Vec<Slot>,
    key_bits: u32,
    zobrist: [[u64; 4]; MAX_PATTERN_DIST],
    seq1d: [isize; MAX_PATTERN_DIST],
    loaded: bool,
}

impl LargePatternDict {
    /// Dictionary with the production table size (2^25 slots).
    pub fn new() -> Self {
        Self::with_key_bits(DEFAULT_KEY_BITS)
    }

    /// Dictionary with a reduced table, for tests.
    pub fn with_key_bits(key_bits: u32) -> Self {
        // The Zobrist words come from a fixed-seed stream so the
        // dictionary is identical across runs and independent of the
        // gameplay seed.
        let mut rng = Lcg32::new(1);
        let mut zobrist = [[0u64; 4]; MAX_PATTERN_DIST];
        for row in zobrist.iter_mut() {
            for word in row.iter_mut() {
                let hi = rng.next() as u64;
                let lo = rng.next() as u64;
                *word = (hi << 32) | lo;
            }
        }
        let mut seq1d = [0isize; MAX_PATTERN_DIST];
        for (d, (x, y)) in GRIDCULAR_SEQ.iter().enumerate() {
            seq1d[d] = *x as isize - *y as isize * LARGE_W as isize;
        }
        Self {
            table: vec![Slot::default(); 1 << key_bits],
            key_bits,
            zobrist,
            seq1d,
            loaded: false,
        }
    }

    /// True once a spatial dictionary has been read.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Number of occupied slots.
    pub fn entries(&self) -> usize {
        self.table.iter().filter(|s| s.key != 0).count()
    }

    /// Zobrist color class of a board/pattern cell.
    /// 0 empty, 1 out, 2 other (`O`/`x`), 3 ours (`X`).
    fn stone_color(c: u8) -> usize {
        match c {
            b'.' => 0,
            b'O' | b'x' => 2,
            b'X' => 3,
            _ => 1,
        }
    }

    /// Signature of a full pattern string.
    fn zobrist_hash(&self, pat: &[u8]) -> u64 {
        let mut k = 0u64;
        for (i, &c) in pat.iter().enumerate() {
            k ^= self.zobrist[i][Self::stone_color(c)];
        }
        k
    }

    /// Extend a signature by ring `size` around `lpt`.
    fn update_hash(&self, board: &LargeBoard, lpt: usize, size: usize, mut k: u64) -> u64 {
        for i in GRIDCULAR_SIZE[size - 1]..GRIDCULAR_SIZE[size] {
            let cell = board.cells[(lpt as isize + self.seq1d[i]) as usize];
            k ^= self.zobrist[i][Self::stone_color(cell)];
        }
        k
    }

    /// Probe slot for `key`: the matching slot, or the empty slot where
    /// it would be inserted. Probe indices stay in `[0, len)`.
    fn find(&self, key: u64) -> usize {
        debug_assert_ne!(key, 0);
        let len = self.table.len();
        let mut h = ((key >> 20) as usize) & (len - 1);
        let h2 = PRIMES[((key >> (20 + self.key_bits)) & 15) as usize];
        while self.table[h].key != key {
            if self.table[h].key == 0 {
                return h;
            }
            h = (h + h2) % len;
        }
        h
    }

    /// Insert a pattern; false if the key is already present.
    fn insert(&mut self, key: u64, id: u32, prob: f32) -> bool {
        let i = self.find(key);
        if self.table[i].key == 0 {
            self.table[i] = Slot { key, id, prob };
            true
        } else {
            false
        }
    }

    /// Load both pattern files and mark the dictionary usable.
    ///
    /// Returns the number of spatial patterns read. On error the
    /// dictionary stays unloaded and every probability query returns -1.
    pub fn load(&mut self, prob_path: &Path, spat_path: &Path) -> Result<usize, PatternLoadError> {
        let probs = load_prob_file(prob_path)?;
        let npats = self.load_spat_file(spat_path, &probs)?;
        self.loaded = true;
        let entries = self.entries();
        info!(
            patterns = npats,
            entries,
            fill_pct = 100.0 * entries as f64 / self.table.len() as f64,
            "large pattern dictionary loaded"
        );
        Ok(npats)
    }

    fn load_spat_file(&mut self, path: &Path, probs: &[f32]) -> Result<usize, PatternLoadError> {
        let file = File::open(path).map_err(|source| PatternLoadError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let perms = permutations();
        let mut npats = 0;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|source| PatternLoadError::Read {
                path: path.display().to_string(),
                source,
            })?;
            let Some((id, pat)) = parse_spat_line(&line) else {
                continue;
            };
            let prob = probs.get(id as usize).copied().unwrap_or(0.0);
            for perm in &perms {
                let permuted: Vec<u8> = (0..pat.len()).map(|k| pat[perm[k]]).collect();
                let key = self.zobrist_hash(&permuted);
                self.insert(key, id, prob);
            }
            npats += 1;
        }
        Ok(npats)
    }

    /// Probability of a move at `pt` given the widest matching pattern,
    /// or -1 if none matches (or no dictionary is loaded).
    ///
    /// The probe stops early once a non-matching radius strictly exceeds
    /// the last matched one: wider shapes embed narrower ones, so a miss
    /// past the match horizon cannot be overtaken.
    pub fn probability(&self, board: &LargeBoard, pt: Point) -> f64 {
        if !self.loaded {
            return -1.0;
        }
        let lpt = LargeBoard::coord(pt);
        let mut prob = -1.0;
        let mut matched_len = 0usize;
        let mut non_matched_len = 0usize;
        let mut k = 0u64;
        for s in 1..13 {
            let len = GRIDCULAR_SIZE[s];
            k = self.update_hash(board, lpt, s, k);
            let i = self.find(k);
            if self.table[i].key == k {
                prob = self.table[i].prob as f64;
                matched_len = len;
            } else if matched_len < non_matched_len && non_matched_len < len {
                break;
            } else {
                non_matched_len = len;
            }
        }
        prob
    }

    /// All pattern ids matching at `pt`, smallest neighborhood first.
    pub fn matching_ids(&self, board: &LargeBoard, pt: Point) -> Vec<(u32, f32)> {
        let mut ids = Vec::new();
        if !self.loaded {
            return ids;
        }
        let lpt = LargeBoard::coord(pt);
        let mut k = 0u64;
        for s in 1..13 {
            k = self.update_hash(board, lpt, s, k);
            let i = self.find(k);
            if self.table[i].key == k {
                ids.push((self.table[i].id, self.table[i].prob));
            }
        }
        ids
    }
}

impl Default for LargePatternDict {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LargePatternDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LargePatternDict")
            .field("key_bits", &self.key_bits)
            .field("loaded", &self.loaded)
            .field("entries", &self.entries())
            .finish()
    }
}

/// Read the probability file into an id-indexed table.
fn load_prob_file(path: &Path) -> Result<Vec<f32>, PatternLoadError> {
    let file = File::open(path).map_err(|source| PatternLoadError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let mut entries = Vec::new();
    let mut max_id = 0u32;
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| PatternLoadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        if let Some((prob, id)) = parse_prob_line(&line) {
            max_id = max_id.max(id);
            entries.push((id, prob));
        }
    }
    let mut probs = vec![0.0f32; max_id as usize + 1];
    for (id, prob) in entries {
        probs[id as usize] = prob;
    }
    Ok(probs)
}

/// Parse `prob t1 t2 (s:id)`. Comment (`#`) and malformed lines yield
/// `None` and are skipped.
fn parse_prob_line(line: &str) -> Option<(f32, u32)> {
    if line.starts_with('#') {
        return None;
    }
    let mut parts = line.split_whitespace();
    let prob: f32 = parts.next()?.parse().ok()?;
    let _t1 = parts.next()?;
    let _t2 = parts.next()?;
    let tag = parts.next()?;
    let id: u32 = tag.strip_prefix("(s:")?.strip_suffix(')')?.parse().ok()?;
    Some((prob, id))
}

/// Parse `id radius pattern_string` (the radius is display-only).
fn parse_spat_line(line: &str) -> Option<(u32, Vec<u8>)> {
    if line.starts_with('#') {
        return None;
    }
    let mut parts = line.split_whitespace();
    let id: u32 = parts.next()?.parse().ok()?;
    let _radius = parts.next()?;
    let pat = parts.next()?.as_bytes().to_vec();
    Some((id, pat))
}

/// The 8 index permutations of the gridcular sequence under board
/// symmetries. Each ring maps onto itself, so a permuted index never
/// leaves the prefix of a shorter pattern.
fn permutations() -> Vec<[usize; MAX_PATTERN_DIST]> {
    let to_1d = |seq: &[(i32, i32); MAX_PATTERN_DIST]| {
        let mut out = [0isize; MAX_PATTERN_DIST];
        for (i, (x, y)) in seq.iter().enumerate() {
            out[i] = *x as isize - *y as isize * LARGE_W as isize;
        }
        out
    };
    let base1d = to_1d(&GRIDCULAR_SEQ);
    let index_of = |d: isize| {
        base1d
            .iter()
            .position(|&b| b == d)
            .expect("symmetry image missing from gridcular sequence")
    };

    let apply = |seq: &[(i32, i32); MAX_PATTERN_DIST], f: &dyn Fn(i32, i32) -> (i32, i32)| {
        let mut out = *seq;
        for cell in out.iter_mut() {
            *cell = f(cell.0, cell.1);
        }
        out
    };

    let mut perms = Vec::with_capacity(8);
    let base = GRIDCULAR_SEQ;
    for rotated in [base, apply(&base, &|x, y| (-y, x))] {
        for vflipped in [rotated, apply(&rotated, &|x, y| (-x, y))] {
            for seq in [vflipped, apply(&vflipped, &|x, y| (x, -y))] {
                let seq1d = to_1d(&seq);
                let mut perm = [0usize; MAX_PATTERN_DIST];
                for (i, d) in seq1d.iter().enumerate() {
                    perm[i] = index_of(*d);
                }
                perms.push(perm);
            }
        }
    }
    debug_assert!(perms[0].iter().enumerate().all(|(i, &p)| i == p));
    perms
}

#[cfg(test)]
mod tests {
    use super::*;
    use goban::coords::parse_coord;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("tengen-{}-{}", std::process::id(), name));
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_prob_line() {
        let (prob, id) = parse_prob_line("1.000 2 2 (s:410926)").unwrap();
        assert!((prob - 1.0).abs() < 1e-6);
        assert_eq!(id, 410926);
        assert_eq!(parse_prob_line("# comment"), None);
        assert_eq!(parse_prob_line("garbage"), None);
    }

    #[test]
    fn test_parse_spat_line() {
        let (id, pat) = parse_spat_line("410926 5 .OOXXXX..O...XX......").unwrap();
        assert_eq!(id, 410926);
        assert_eq!(pat, b".OOXXXX..O...XX......".to_vec());
        assert_eq!(parse_spat_line("# comment"), None);
    }

    #[test]
    fn test_zobrist_is_deterministic() {
        let a = LargePatternDict::with_key_bits(10);
        let b = LargePatternDict::with_key_bits(10);
        assert_eq!(a.zobrist_hash(b".X.O.X.O."), b.zobrist_hash(b".X.O.X.O."));
        assert_ne!(a.zobrist_hash(b".X.O.X.O."), 0);
    }

    #[test]
    fn test_insert_find_roundtrip() {
        let mut dict = LargePatternDict::with_key_bits(12);
        let key = dict.zobrist_hash(b"XXOO.....");
        assert!(dict.insert(key, 7, 0.5));
        assert!(!dict.insert(key, 7, 0.5), "duplicate keys are rejected");
        let i = dict.find(key);
        assert_eq!(dict.table[i].id, 7);
    }

    #[test]
    fn test_probe_wraparound_stays_in_bounds() {
        let mut dict = LargePatternDict::with_key_bits(4);
        // Flood a tiny table so probes must wrap.
        for i in 0..12u32 {
            let key = dict.zobrist_hash(format!("pattern{i}").as_bytes());
            dict.insert(key, i, 0.1);
        }
        let probe = dict.zobrist_hash(b"not-inserted");
        let slot = dict.find(probe);
        assert!(slot < dict.table.len());
    }

    #[test]
    fn test_permutations_identity_and_ring_closure() {
        let perms = permutations();
        assert_eq!(perms.len(), 8);
        for (i, &p) in perms[0].iter().enumerate() {
            assert_eq!(i, p, "first permutation must be the identity");
        }
        // Every symmetry maps each ring onto itself.
        for perm in &perms {
            for s in 1..13 {
                let (lo, hi) = (GRIDCULAR_SIZE[s - 1], GRIDCULAR_SIZE[s]);
                for &img in &perm[lo..hi] {
                    assert!(img >= lo && img < hi, "ring {s} not closed");
                }
            }
        }
    }

    #[test]
    fn test_unloaded_dictionary_matches_nothing() {
        let dict = LargePatternDict::with_key_bits(10);
        let board = LargeBoard::from_position(&Position::new());
        assert_eq!(dict.probability(&board, parse_coord("G7").unwrap()), -1.0);
        assert!(dict.matching_ids(&board, parse_coord("G7").unwrap()).is_empty());
    }

    #[test]
    fn test_load_inserts_all_symmetries() {
        let prob = write_temp("sym.prob", "0.500 1 1 (s:77)\n");
        let spat = write_temp("sym.spat", "# header\n77 3 .XO.X....O..O\n");
        let mut dict = LargePatternDict::with_key_bits(16);
        let npats = dict.load(&prob, &spat).unwrap();
        assert_eq!(npats, 1);
        assert!(dict.is_loaded());

        let perms = permutations();
        let pat = b".XO.X....O..O";
        for perm in &perms {
            let permuted: Vec<u8> = (0..pat.len()).map(|k| pat[perm[k]]).collect();
            let key = dict.zobrist_hash(&permuted);
            let i = dict.find(key);
            assert_eq!(dict.table[i].key, key, "symmetry image missing");
            assert_eq!(dict.table[i].id, 77);
            assert!((dict.table[i].prob - 0.5).abs() < 1e-6);
        }
        let _ = std::fs::remove_file(prob);
        let _ = std::fs::remove_file(spat);
    }

    #[test]
    fn test_empty_neighborhood_pattern_matches_center() {
        // A size-1 pattern of nine empties matches any open-center point.
        let prob = write_temp("empty.prob", "0.250 1 1 (s:42)\n");
        let spat = write_temp("empty.spat", "42 2 .........\n");
        let mut dict = LargePatternDict::with_key_bits(16);
        dict.load(&prob, &spat).unwrap();

        let board = LargeBoard::from_position(&Position::new());
        let g7 = parse_coord("G7").unwrap();
        let p = dict.probability(&board, g7);
        assert!((p - 0.25).abs() < 1e-6, "expected 0.25, got {p}");
        let ids: Vec<u32> = dict.matching_ids(&board, g7).iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![42]);
        let _ = std::fs::remove_file(prob);
        let _ = std::fs::remove_file(spat);
    }

    #[test]
    fn test_missing_files_error_and_leave_dictionary_empty() {
        let mut dict = LargePatternDict::with_key_bits(10);
        let err = dict.load(Path::new("/nonexistent.prob"), Path::new("/nonexistent.spat"));
        assert!(err.is_err());
        assert!(!dict.is_loaded());
        assert_eq!(dict.entries(), 0);
    }
}
