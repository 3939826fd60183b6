use crate::index::artifacts::{file_size, index_path, leftover_intermediates, log_path};
use crate::index::mode::{self, ModeError};
use crate::output::format_size;
use anyhow::Result;
use std::path::Path;

/// Display the on-disk index state of an input
pub fn show_status(input: &Path) -> Result<()> {
    println!("Index Status");
    println!("============");
    println!();
    println!("Input:            {}", input.display());
    println!("Input size:       {}", describe_size(input));

    let mode = match mode::read_mode(input) {
        Ok(width) => width.to_string(),
        Err(ModeError::MissingMode { .. }) => "none (not constructed)".to_string(),
        Err(e) => return Err(e.into()),
    };
    println!("Mode:             {}", mode);

    let index = index_path(input);
    println!("Index file:       {}", index.display());
    println!("Index size:       {}", describe_size(&index));
    println!("Log file:         {}", log_path(input).display());

    let leftovers = leftover_intermediates(input);
    if !leftovers.is_empty() {
        println!();
        println!("Intermediate files left from an unfinished construction:");
        for path in leftovers {
            println!("  {} ({})", path.display(), describe_size(&path));
        }
    }

    Ok(())
}

fn describe_size(path: &Path) -> String {
    match file_size(path) {
        Ok(size) => format_size(size),
        Err(_) => "missing".to_string(),
    }
}
