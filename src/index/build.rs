use crate::command::{FormatError, Params, StageSpec};
use crate::index::artifacts::{
    self, CleanupReport, DICT_SUFFIX, PARSE_SUFFIX, artifact_path, file_size, index_path,
};
use crate::index::mode::{self, ModeError};
use crate::index::variant::{
    self, EbwtVariant, PARSE_WORD_BYTES, Toolchain, Width,
};
use crate::output::{Console, format_secs};
use crate::pipeline::{Pipeline, PipelineFailure, Stage};
use crate::supervise::{LogSink, Runner};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

pub const PARSE_LABEL: &str = "Parsing";
pub const INVERTED_LIST_LABEL: &str = "Computing inverted list of parse's eBWT";
pub const EBWT_LABEL: &str = "Computing the eBWT and the GCA-samples of the input";
pub const INDEX_LABEL: &str = "Computing the extended r-index of the input";

/// Tunables passed through to the stage executables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildParams {
    /// Sliding window size for prefix-free parsing
    pub window: u32,
    /// Hash modulus for prefix-free parsing
    pub modulus: u32,
    /// Bitvector block size for predecessor queries
    pub block: u32,
    /// Sample only the first rotation of each sequence
    pub first_rotation: bool,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            window: 10,
            modulus: 100,
            block: 2,
            first_rotation: false,
        }
    }
}

impl BuildParams {
    fn to_params(self, input: &Path) -> Params {
        Params::new()
            .path("input", input)
            .int("window", self.window.into())
            .int("modulus", self.modulus.into())
            .int("block", self.block.into())
            .switch("first", self.first_rotation)
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("input file {} does not exist", .0.display())]
    InputMissing(PathBuf),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Stage(#[from] PipelineFailure),

    #[error("cannot measure {}: {source}", .path.display())]
    Measure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Mode(#[from] ModeError),
}

/// What a successful construction decided and produced
#[derive(Debug)]
pub struct BuildSummary {
    pub parse_words: u64,
    pub dict_chars: u64,
    pub input_bytes: u64,
    pub index_bytes: u64,
    pub ebwt: EbwtVariant,
    pub index_width: Width,
    pub cleanup: CleanupReport,
    pub elapsed: Duration,
}

pub fn parse_spec(toolchain: &Toolchain) -> StageSpec {
    StageSpec::new(PARSE_LABEL, toolchain.parser())
        .positional("input")
        .option("-w", "window")
        .option("-p", "modulus")
}

pub fn inverted_list_spec(toolchain: &Toolchain, parse: Width) -> StageSpec {
    StageSpec::new(INVERTED_LIST_LABEL, toolchain.inverted_list(parse))
        .positional("input")
        .option("-w", "window")
}

/// eBWT in run-length format plus GCA samples
pub fn ebwt_spec(toolchain: &Toolchain, variant: EbwtVariant) -> StageSpec {
    StageSpec::new(EBWT_LABEL, toolchain.ebwt(variant))
        .positional("input")
        .option("-w", "window")
        .fixed("-r")
        .fixed("-s")
        .switch("-f", "first")
}

pub fn index_spec(toolchain: &Toolchain, width: Width) -> StageSpec {
    StageSpec::new(INDEX_LABEL, toolchain.index(width))
        .positional("input")
        .fixed("-c")
        .option("-b", "block")
        .switch("-f", "first")
}

fn measure(path: PathBuf) -> Result<u64, BuildError> {
    file_size(&path).map_err(|source| BuildError::Measure { path, source })
}

fn stage(spec: StageSpec, params: &Params) -> Result<Stage, FormatError> {
    let invocation = spec.format(params)?;
    Ok(Stage::new(spec.label, invocation))
}

/// Build the extended r-index of `input`.
///
/// Parsing, inverted list and eBWT run first; their intermediate files are
/// deleted once all three succeed. The index builder runs last and only
/// after it succeeds is the width decision persisted. Any earlier record is
/// dropped up front so a failed rebuild never looks queryable.
pub fn construct<R: Runner>(
    runner: &mut R,
    toolchain: &Toolchain,
    input: &Path,
    params: &BuildParams,
    log: &LogSink,
    console: Console,
) -> Result<BuildSummary, BuildError> {
    if !input.is_file() {
        return Err(BuildError::InputMissing(input.to_path_buf()));
    }

    let start = Instant::now();
    let values = params.to_params(input);
    mode::clear_mode(input)?;

    let mut pipeline = Pipeline::new(runner, log, console);

    pipeline.run_stage(stage(parse_spec(toolchain), &values)?)?;

    let parse_words = measure(artifact_path(input, PARSE_SUFFIX))? / PARSE_WORD_BYTES;
    console.info(&format!("Parse contains {} words.", parse_words));
    let parse = variant::parse_width(parse_words);
    console.info(&format!("IL creation running in {} mode", parse));

    pipeline.run_stage(stage(inverted_list_spec(toolchain, parse), &values)?)?;

    let dict_chars = measure(artifact_path(input, DICT_SUFFIX))?;
    console.info(&format!("Dictionary contains {} characters.", dict_chars));
    let ebwt = EbwtVariant {
        dict: variant::dict_width(dict_chars),
        parse,
    };
    console.info(&format!("Dict SA running in {} mode", ebwt.dict));

    pipeline.run_stage(stage(ebwt_spec(toolchain, ebwt), &values)?)?;

    console.info("Deleting auxiliary files");
    let cleanup = artifacts::remove_intermediates(input);
    for (path, e) in &cleanup.skipped {
        console.warn(&format!("could not remove {}: {}", path.display(), e));
    }

    let input_bytes = measure(input.to_path_buf())?;
    let index_width = variant::index_width(input_bytes);
    pipeline.run_stage(stage(index_spec(toolchain, index_width), &values)?)?;

    let index_bytes = measure(index_path(input))?;
    mode::write_mode(input, index_width)?;

    let elapsed = start.elapsed();
    console.info(&format!("Total construction time: {}", format_secs(elapsed)));

    console.info(&format!("Original input size: {} bytes", input_bytes));
    console.info(&format!("Extended r-index size: {} bytes", index_bytes));

    Ok(BuildSummary {
        parse_words,
        dict_chars,
        input_bytes,
        index_bytes,
        ebwt,
        index_width,
        cleanup,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Invocation;
    use crate::index::artifacts::INTERMEDIATE_SUFFIXES;
    use crate::index::variant::{I32_CEILING, U32_CEILING};
    use crate::pipeline::testing::ScriptedRunner;
    use std::fs::File;
    use tempfile::tempdir;

    /// Sparse file of `len` bytes
    fn sized(path: &Path, len: u64) {
        File::create(path).unwrap().set_len(len).unwrap();
    }

    /// Runner that materialises each stage's outputs with the given sizes
    fn fake_stages(parse_bytes: u64, dict_bytes: u64) -> ScriptedRunner {
        ScriptedRunner {
            on_run: Some(Box::new(move |inv: &Invocation| {
                let input = PathBuf::from(&inv.arguments()[0]);
                match inv.label() {
                    PARSE_LABEL => {
                        sized(&artifact_path(&input, "eparse"), parse_bytes);
                        sized(&artifact_path(&input, "edict"), dict_bytes);
                        sized(&artifact_path(&input, "offset"), 8);
                    }
                    INVERTED_LIST_LABEL => sized(&artifact_path(&input, "eocc"), 8),
                    EBWT_LABEL => {
                        for suffix in ["fchar", "start", "sdsl"] {
                            sized(&artifact_path(&input, suffix), 8);
                        }
                    }
                    INDEX_LABEL => sized(&index_path(&input), 64),
                    _ => {}
                }
            })),
            ..Default::default()
        }
    }

    fn setup(input_len: u64) -> (tempfile::TempDir, PathBuf, LogSink) {
        let dir = tempdir().unwrap();
        let input = dir.path().join("reads.fa");
        sized(&input, input_len);
        let log = LogSink::open(dir.path().join("reads.fa.log")).unwrap();
        (dir, input, log)
    }

    fn program_names(runner: &ScriptedRunner) -> Vec<String> {
        runner
            .calls
            .iter()
            .map(|c| c.program().file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_small_input_uses_narrow_variants() {
        let (_dir, input, log) = setup(1000);
        let tc = Toolchain::new("/opt/build");
        let mut runner = fake_stages(400, 100);

        let summary = construct(
            &mut runner,
            &tc,
            &input,
            &BuildParams::default(),
            &log,
            Console::default(),
        )
        .unwrap();

        assert_eq!(
            program_names(&runner),
            ["circpfpNT.x", "parsebwtNT.x", "bebwtNT.x", "er-index"]
        );
        assert_eq!(summary.parse_words, 100);
        assert_eq!(summary.index_width, Width::W32);
        assert_eq!(mode::read_mode(&input).unwrap(), Width::W32);
        assert_eq!(summary.index_bytes, 64);
    }

    #[test]
    fn test_stage_arguments() {
        let (_dir, input, log) = setup(10);
        let tc = Toolchain::new("/opt/build");
        let mut runner = fake_stages(4, 4);
        let params = BuildParams {
            window: 6,
            modulus: 20,
            block: 4,
            first_rotation: true,
        };

        construct(&mut runner, &tc, &input, &params, &log, Console::default()).unwrap();

        let tail: Vec<String> = runner
            .calls
            .iter()
            .map(|c| {
                c.arguments()[1..]
                    .iter()
                    .map(|a| a.to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        assert_eq!(
            tail,
            ["-w 6 -p 20", "-w 6", "-w 6 -r -s -f", "-c -b 4 -f"]
        );
    }

    #[test]
    fn test_intermediates_removed_and_index_kept() {
        let (_dir, input, log) = setup(1000);
        let mut runner = fake_stages(40, 10);

        let summary = construct(
            &mut runner,
            &Toolchain::new("/opt/build"),
            &input,
            &BuildParams::default(),
            &log,
            Console::default(),
        )
        .unwrap();

        for suffix in INTERMEDIATE_SUFFIXES {
            assert!(!artifact_path(&input, suffix).exists(), "{} left", suffix);
        }
        assert!(index_path(&input).exists());
        assert!(mode::mode_path(&input).exists());
        assert_eq!(summary.cleanup.removed.len(), 7);
    }

    #[test]
    fn test_large_dictionary_selects_wide_dict_variant() {
        let (_dir, input, log) = setup(1000);
        let mut runner = fake_stages(40, I32_CEILING);

        let summary = construct(
            &mut runner,
            &Toolchain::new("/opt/build"),
            &input,
            &BuildParams::default(),
            &log,
            Console::default(),
        )
        .unwrap();

        assert_eq!(program_names(&runner)[2], "bebwtNTd64.x");
        assert_eq!(summary.ebwt.dict, Width::W64);
        assert_eq!(summary.ebwt.parse, Width::W32);
    }

    #[test]
    fn test_large_parse_selects_wide_parse_variants() {
        let (_dir, input, log) = setup(1000);
        let mut runner = fake_stages(U32_CEILING * PARSE_WORD_BYTES, 10);

        construct(
            &mut runner,
            &Toolchain::new("/opt/build"),
            &input,
            &BuildParams::default(),
            &log,
            Console::default(),
        )
        .unwrap();

        let names = program_names(&runner);
        assert_eq!(names[1], "parsebwtNT64.x");
        assert_eq!(names[2], "bebwtNTp64.x");
        assert_eq!(names[3], "er-index");
    }

    #[test]
    fn test_input_at_ceiling_builds_and_records_wide_index() {
        let (_dir, input, log) = setup(U32_CEILING);
        let mut runner = fake_stages(40, 10);

        let summary = construct(
            &mut runner,
            &Toolchain::new("/opt/build"),
            &input,
            &BuildParams::default(),
            &log,
            Console::default(),
        )
        .unwrap();

        assert_eq!(program_names(&runner)[3], "er-index64");
        assert_eq!(summary.index_width, Width::W64);
        assert_eq!(mode::read_mode(&input).unwrap(), Width::W64);
    }

    #[test]
    fn test_failure_stops_construction_and_keeps_artifacts() {
        let (_dir, input, log) = setup(1000);
        let mut runner = fake_stages(40, 10);
        runner.fail_labels.push(EBWT_LABEL.to_string());

        let err = construct(
            &mut runner,
            &Toolchain::new("/opt/build"),
            &input,
            &BuildParams::default(),
            &log,
            Console::default(),
        )
        .unwrap_err();

        match err {
            BuildError::Stage(f) => assert_eq!(f.position, 3),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(runner.calls.len(), 3);
        assert!(artifact_path(&input, "eparse").exists());
        assert!(matches!(
            mode::read_mode(&input),
            Err(ModeError::MissingMode { .. })
        ));
    }

    #[test]
    fn test_failed_rebuild_drops_previous_mode() {
        let (_dir, input, log) = setup(1000);
        mode::write_mode(&input, Width::W64).unwrap();

        let mut runner = fake_stages(40, 10);
        runner.fail_labels.push(INDEX_LABEL.to_string());

        assert!(
            construct(
                &mut runner,
                &Toolchain::new("/opt/build"),
                &input,
                &BuildParams::default(),
                &log,
                Console::default(),
            )
            .is_err()
        );
        assert!(!mode::mode_path(&input).exists());
    }

    #[test]
    fn test_index_builder_without_output_leaves_no_mode() {
        let (_dir, input, log) = setup(1000);
        let mut stages = fake_stages(40, 10);
        let mut materialise = stages.on_run.take().unwrap();
        let mut runner = ScriptedRunner {
            on_run: Some(Box::new(move |inv: &Invocation| {
                if inv.label() != INDEX_LABEL {
                    materialise(inv);
                }
            })),
            ..Default::default()
        };

        let err = construct(
            &mut runner,
            &Toolchain::new("/opt/build"),
            &input,
            &BuildParams::default(),
            &log,
            Console::default(),
        )
        .unwrap_err();

        assert!(matches!(err, BuildError::Measure { .. }));
        assert!(!mode::mode_path(&input).exists());
    }

    #[test]
    fn test_missing_input() {
        let dir = tempdir().unwrap();
        let log = LogSink::open(dir.path().join("x.log")).unwrap();
        let mut runner = ScriptedRunner::default();

        let err = construct(
            &mut runner,
            &Toolchain::new("/opt/build"),
            &dir.path().join("absent.fa"),
            &BuildParams::default(),
            &log,
            Console::default(),
        )
        .unwrap_err();

        assert!(matches!(err, BuildError::InputMissing(_)));
        assert!(runner.calls.is_empty());
    }
}
