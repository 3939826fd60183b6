//! Integer-width variant selection
//!
//! Each stage executable is compiled for a fixed integer width. The narrowest
//! width able to address the data is chosen; every check routes a size equal
//! to the ceiling to the wide variant.

use std::fmt;
use std::path::{Path, PathBuf};

/// Largest value below which 32-bit unsigned indices are safe (2^32 - 1)
pub const U32_CEILING: u64 = u32::MAX as u64;

/// Largest value below which 32-bit signed indices are safe (2^31 - 1)
pub const I32_CEILING: u64 = i32::MAX as u64;

/// Bytes per word of the parse artifact
pub const PARSE_WORD_BYTES: u64 = 4;

/// Integer width a variant was compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Width {
    W32,
    W64,
}

impl Width {
    /// Narrow unless `size` reaches `ceiling`
    pub fn for_size(size: u64, ceiling: u64) -> Width {
        if size >= ceiling { Width::W64 } else { Width::W32 }
    }

    /// Numeral tag as persisted in the mode record
    pub fn tag(self) -> u32 {
        match self {
            Width::W32 => 32,
            Width::W64 => 64,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Width> {
        match tag {
            32 => Some(Width::W32),
            64 => Some(Width::W64),
            _ => None,
        }
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bit", self.tag())
    }
}

/// Width for the inverted-list stage, from the parse size in words
pub fn parse_width(parse_words: u64) -> Width {
    Width::for_size(parse_words, U32_CEILING)
}

/// Width of the dictionary suffix array, from the dictionary size in bytes
pub fn dict_width(dict_chars: u64) -> Width {
    Width::for_size(dict_chars, I32_CEILING)
}

/// Width of the index builder and of every later query, from the input size
pub fn index_width(input_bytes: u64) -> Width {
    Width::for_size(input_bytes, U32_CEILING)
}

/// Combined choice for the eBWT builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EbwtVariant {
    pub dict: Width,
    pub parse: Width,
}

/// Resolves stage executables inside a build directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    bin_dir: PathBuf,
}

impl Toolchain {
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
        }
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    pub fn parser(&self) -> PathBuf {
        self.bin_dir.join("circpfpNT.x")
    }

    pub fn inverted_list(&self, parse: Width) -> PathBuf {
        self.bin_dir.join(match parse {
            Width::W32 => "parsebwtNT.x",
            Width::W64 => "parsebwtNT64.x",
        })
    }

    pub fn ebwt(&self, variant: EbwtVariant) -> PathBuf {
        self.bin_dir.join(match (variant.dict, variant.parse) {
            (Width::W32, Width::W32) => "bebwtNT.x",
            (Width::W32, Width::W64) => "bebwtNTp64.x",
            (Width::W64, Width::W32) => "bebwtNTd64.x",
            (Width::W64, Width::W64) => "bebwtNT64.x",
        })
    }

    /// Index builder, also the query binary for indexes built with it
    pub fn index(&self, width: Width) -> PathBuf {
        self.bin_dir.join(match width {
            Width::W32 => "er-index",
            Width::W64 => "er-index64",
        })
    }
}
