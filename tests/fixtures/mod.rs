//! Fake stage executables written as shell scripts
#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Write an executable `/bin/sh` script
pub fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("Failed to make script executable");
    path
}

/// Parser: writes the parse, dictionary and offsets of `$1`
pub const PARSER: &str = r#"echo "parsing $1"
printf 'abcdefghijklmnop' > "$1.eparse"
printf 'abcdefghijklmnop' > "$1.eparse_old"
printf 'ACGT' > "$1.edict"
printf '0' > "$1.offset"
printf '0' > "$1.offset_old"
"#;

pub const INVERTED_LIST: &str = r#"echo "inverted list $@"
printf 'x' > "$1.eocc"
"#;

pub const EBWT: &str = r#"echo "ebwt $@" >&2
printf 'x' > "$1.fchar"
printf 'x' > "$1.start"
printf 'x' > "$1.sdsl"
"#;

/// Index builder and query binary in one: builds on `-c`, records queries otherwise
pub const ER_INDEX: &str = r#"input="$1"
shift
case " $* " in
  *" -c "*) echo "building $input"; printf 'index' > "$input.eri" ;;
  *) echo "$@" >> "$input.queries" ;;
esac
"#;

pub const FAILING: &str = r#"echo "stage failed on $1" >&2
exit 3
"#;

/// Directory of fake executables named like the real build tree
pub fn build_dir(root: &Path) -> PathBuf {
    let dir = root.join("build");
    fs::create_dir_all(&dir).expect("Failed to create build dir");
    script(&dir, "circpfpNT.x", PARSER);
    script(&dir, "parsebwtNT.x", INVERTED_LIST);
    script(&dir, "parsebwtNT64.x", INVERTED_LIST);
    for name in ["bebwtNT.x", "bebwtNTp64.x", "bebwtNTd64.x", "bebwtNT64.x"] {
        script(&dir, name, EBWT);
    }
    script(&dir, "er-index", ER_INDEX);
    script(&dir, "er-index64", ER_INDEX);
    dir
}

pub const FASTA: &str = ">seq1\nACGTACGTAC\nGTACGT\n>seq2\nTTTTGGGGCC\n>seq3\nACGT\n";
