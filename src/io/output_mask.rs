//! Output file name masks (§6): a time series is a zero-padded index
//! embedded in an otherwise fixed name, `prefix_####.ssf`. Given one
//! filename, the mask, its padding width and that file's index can all be
//! recovered, which is what a resume reader needs to find the rest of the
//! series.

use std::path::{Path, PathBuf};

use crate::error::{IoError, IoResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMask {
    pub prefix: String,
    pub suffix: String,
    pub width: usize,
}

impl OutputMask {
    /// Parses `prefix_####.ssf`-style filenames: the run of digits
    /// immediately before the extension is the index; everything before and
    /// after it is the fixed prefix/suffix.
    pub fn from_filename(path: &Path) -> IoResult<(Self, usize)> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| IoError::BadFileMask { path: path.to_path_buf() })?;

        let digit_end = name
            .rfind(|c: char| c.is_ascii_digit())
            .ok_or_else(|| IoError::BadFileMask { path: path.to_path_buf() })?;
        let digit_start = name[..=digit_end]
            .rfind(|c: char| !c.is_ascii_digit())
            .map(|i| i + 1)
            .unwrap_or(0);
        if digit_start > digit_end {
            return Err(IoError::BadFileMask { path: path.to_path_buf() });
        }

        let digits = &name[digit_start..=digit_end];
        let index: usize = digits.parse().map_err(|_| IoError::BadFileMask { path: path.to_path_buf() })?;
        let mask = OutputMask {
            prefix: name[..digit_start].to_string(),
            suffix: name[digit_end + 1..].to_string(),
            width: digits.len(),
        };
        Ok((mask, index))
    }

    pub fn format(&self, index: usize) -> String {
        format!("{}{:0width$}{}", self.prefix, index, self.suffix, width = self.width)
    }

    /// Enumerates `path_for(first)..=path_for(last)` against `dir`, without
    /// touching the filesystem — existence is the caller's concern.
    pub fn sequence(&self, dir: &Path, first: usize, last: usize) -> Vec<PathBuf> {
        (first..=last).map(|i| dir.join(self.format(i))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_mask_and_index_from_a_zero_padded_filename() {
        let (mask, index) = OutputMask::from_filename(Path::new("/out/impact_0042.ssf")).unwrap();
        assert_eq!(index, 42);
        assert_eq!(mask.prefix, "impact_");
        assert_eq!(mask.suffix, ".ssf");
        assert_eq!(mask.width, 4);
        assert_eq!(mask.format(7), "impact_0007.ssf");
    }

    #[test]
    fn sequence_enumerates_the_full_zero_padded_run() {
        let mask = OutputMask { prefix: "snap_".to_string(), suffix: ".ssf".to_string(), width: 3 };
        let paths = mask.sequence(Path::new("/out"), 0, 2);
        assert_eq!(paths, vec![
            PathBuf::from("/out/snap_000.ssf"),
            PathBuf::from("/out/snap_001.ssf"),
            PathBuf::from("/out/snap_002.ssf"),
        ]);
    }

    #[test]
    fn filenames_without_a_digit_run_are_rejected() {
        assert!(OutputMask::from_filename(Path::new("no_digits_here.ssf")).is_err());
    }
}
