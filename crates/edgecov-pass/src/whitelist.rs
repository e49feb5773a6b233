//! Selective instrumentation by source file.

use std::path::Path;

use edgecov_ir::{Block, DebugLoc, SourceLoc};

use crate::error::ConfigError;

/// Resolves a block to the source location it was compiled from.
pub trait SourceLocationResolver {
    /// Best-effort (file, line) of `block`. `None` if nothing is known.
    fn resolve(&self, block: &Block) -> Option<SourceLoc>;
}

/// Resolver over the debug locations attached to instructions.
///
/// Looks at whatever sits at the block's first insertion point. The
/// inlined-from location wins when it resolves to a real file; otherwise
/// the immediate location is used.
#[derive(Clone, Copy, Debug, Default)]
pub struct DebugLocResolver;

impl SourceLocationResolver for DebugLocResolver {
    fn resolve(&self, block: &Block) -> Option<SourceLoc> {
        let loc = block.debug_loc_at(block.first_insertion_point())?;
        let valid = |l: &DebugLoc| Some(l.source_loc()).filter(SourceLoc::is_valid);
        loc.original().and_then(valid).or_else(|| valid(loc))
    }
}

/// Filename suffixes to instrument. Empty means everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Whitelist {
    entries: Vec<String>,
}

impl Whitelist {
    /// A whitelist that admits every block.
    #[must_use]
    pub const fn allow_all() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build from explicit entries. Blank entries are dropped.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|e| e.as_ref().trim().to_string())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Parse newline-separated entries.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self::from_entries(text.lines())
    }

    /// Load entries from a file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::WhitelistUnreadable` if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text =
            std::fs::read_to_string(path).map_err(|source| ConfigError::WhitelistUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::parse(&text))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Check if `file` ends with any entry.
    ///
    /// This is a plain string suffix test with no path-separator boundary:
    /// `oo.c` matches `foo.c` as well as `src/oo.c`.
    #[must_use]
    pub fn matches(&self, file: &str) -> bool {
        self.entries.iter().any(|suffix| file.ends_with(suffix.as_str()))
    }

    /// Decide whether `block` may be instrumented.
    ///
    /// Blocks whose location cannot be resolved are eligible.
    pub fn is_eligible<R>(&self, resolver: &R, block: &Block) -> bool
    where
        R: SourceLocationResolver + ?Sized,
    {
        if self.is_empty() {
            return true;
        }
        resolver
            .resolve(block)
            .is_none_or(|loc| self.matches(&loc.file))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use edgecov_ir::{BlockId, InstKind, Instr, Operand, Type, ValueId};

    use super::*;

    fn block_at(loc: Option<DebugLoc>) -> Block {
        let mut block = Block::new(BlockId(0), "b");
        block.instructions.push(
            Instr::new(
                Some(ValueId(0)),
                InstKind::Load {
                    ty: Type::I8,
                    ptr: Operand::Arg(0),
                },
            )
            .with_debug_loc(loc),
        );
        block
    }

    #[test]
    fn test_empty_whitelist_admits_everything() {
        let wl = Whitelist::allow_all();
        assert!(wl.is_eligible(&DebugLocResolver, &block_at(None)));
        assert!(wl.is_eligible(&DebugLocResolver, &block_at(Some(DebugLoc::new("x.c", 1)))));
    }

    #[test]
    fn test_suffix_match() {
        let wl = Whitelist::from_entries(["parser.c", "lib/util.c"]);
        assert!(wl.matches("/home/me/src/parser.c"));
        assert!(wl.matches("parser.c"));
        assert!(wl.matches("/x/lib/util.c"));
        assert!(!wl.matches("/x/util.c"));
        assert!(!wl.matches("parser.cc"));
    }

    #[test]
    fn test_suffix_match_has_no_path_boundary() {
        // Kept deliberately: an entry matches the tail of a longer file name.
        let wl = Whitelist::from_entries(["oo.c"]);
        assert!(wl.matches("foo.c"));
        assert!(wl.matches("/src/oo.c"));
    }

    #[test]
    fn test_unresolved_location_is_eligible() {
        let wl = Whitelist::from_entries(["only.c"]);
        assert!(wl.is_eligible(&DebugLocResolver, &block_at(None)));
        assert!(wl.is_eligible(&DebugLocResolver, &block_at(Some(DebugLoc::new("", 4)))));
    }

    #[test]
    fn test_original_location_preferred() {
        let wl = Whitelist::from_entries(["header.h"]);
        let inlined = DebugLoc::new("main.c", 10).inlined_from(DebugLoc::new("inc/header.h", 3));
        assert!(wl.is_eligible(&DebugLocResolver, &block_at(Some(inlined))));

        let wl = Whitelist::from_entries(["main.c"]);
        let inlined = DebugLoc::new("main.c", 10).inlined_from(DebugLoc::new("inc/header.h", 3));
        assert!(!wl.is_eligible(&DebugLocResolver, &block_at(Some(inlined))));
    }

    #[test]
    fn test_original_without_file_falls_back_to_immediate() {
        let wl = Whitelist::from_entries(["main.c"]);
        let loc = DebugLoc::new("src/main.c", 10).inlined_from(DebugLoc::new("", 0));
        assert!(wl.is_eligible(&DebugLocResolver, &block_at(Some(loc))));

        let loc = DebugLoc::new("src/other.c", 10).inlined_from(DebugLoc::new("", 0));
        assert!(!wl.is_eligible(&DebugLocResolver, &block_at(Some(loc))));
    }

    #[test]
    fn test_unknown_original_falls_back_to_immediate() {
        let loc = DebugLoc::new("src/main.c", 10).inlined_from(DebugLoc::new("??", 0));
        assert_eq!(
            DebugLocResolver.resolve(&block_at(Some(loc.clone()))),
            Some(SourceLoc::new("src/main.c", 10))
        );

        let wl = Whitelist::from_entries(["main.c"]);
        assert!(wl.is_eligible(&DebugLocResolver, &block_at(Some(loc))));
        let loc = DebugLoc::new("src/other.c", 10).inlined_from(DebugLoc::new("??", 0));
        assert!(!wl.is_eligible(&DebugLocResolver, &block_at(Some(loc))));
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let wl = Whitelist::parse("a.c\r\n\n  \nb.c\n");
        assert_eq!(wl.entries(), ["a.c".to_string(), "b.c".to_string()]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "first.c").expect("write");
        writeln!(file, "second.c").expect("write");
        let wl = Whitelist::load(file.path()).expect("readable whitelist");
        assert_eq!(wl.len(), 2);
        assert!(wl.matches("/a/second.c"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = Whitelist::load(&dir.path().join("nope.txt")).expect_err("missing file");
        assert!(matches!(err, ConfigError::WhitelistUnreadable { .. }));
    }
}
