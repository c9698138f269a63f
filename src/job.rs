//! Command-line sort jobs: read inputs, sort or check, write output

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use crate::config::SortConfig;
use crate::core_sort::CoreSort;
use crate::error::{SortContext, SortResult};
use crate::method::{KeyLookup, MethodSpec};
use crate::zero_copy::{load_lookup_table, InputBuffer};
use crate::{EXIT_FAILURE, EXIT_SUCCESS};

/// Run one job described by `config` and return the process exit code
pub fn run(config: &SortConfig) -> SortResult<i32> {
    config.validate()?;

    let lookup = match &config.lookup_file {
        Some(file) => {
            let table: Arc<dyn KeyLookup> = Arc::new(load_lookup_table(Path::new(file))?);
            Some(table)
        }
        None => None,
    };
    let spec = config.method_spec(lookup)?;
    tracing::debug!(method = %spec, "starting sort job");

    let names = if config.reading_from_stdin() {
        vec!["-".to_string()]
    } else {
        config.input_files.clone()
    };
    let inputs = names
        .iter()
        .map(|name| InputBuffer::open_named(name))
        .collect::<SortResult<Vec<_>>>()?;

    let engine = CoreSort::new();
    let terminator = config.line_terminator();

    if config.check {
        return check_sorted(&engine, &inputs, &spec, terminator);
    }

    let mut lines = Vec::new();
    for input in &inputs {
        lines.extend(input.lines(terminator)?);
    }

    engine.sort(&mut lines, &spec)?;
    if config.unique {
        engine.dedup(&mut lines, &spec)?;
    }

    // Rendered in full and unmapped before the output is opened, so `-o`
    // may name an input
    let rendered = render_lines(&lines, terminator);
    drop(lines);
    drop(inputs);
    write_output(config, &rendered)?;

    Ok(EXIT_SUCCESS)
}

/// Report the first out-of-order line of each input
fn check_sorted(
    engine: &CoreSort,
    inputs: &[InputBuffer],
    spec: &MethodSpec,
    terminator: u8,
) -> SortResult<i32> {
    for input in inputs {
        let lines = input.lines(terminator)?;
        if let Some(index) = engine.is_sorted(&lines, spec)? {
            eprintln!("dtsort: {}:{}: disorder", input.name(), index + 1);
            return Ok(EXIT_FAILURE);
        }
    }
    Ok(EXIT_SUCCESS)
}

fn render_lines(lines: &[&str], terminator: u8) -> Vec<u8> {
    let capacity = lines.iter().map(|line| line.len() + 1).sum();
    let mut out = Vec::with_capacity(capacity);
    for line in lines {
        out.extend_from_slice(line.as_bytes());
        out.push(terminator);
    }
    out
}

fn write_output(config: &SortConfig, data: &[u8]) -> SortResult<()> {
    match &config.output_file {
        Some(path) => {
            let file = File::create(path).with_file_context(path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(data).with_file_context(path)?;
            writer.flush().with_file_context(path)?;
        }
        None => {
            let mut writer = BufWriter::new(io::stdout().lock());
            writer.write_all(data)?;
            writer.flush()?;
        }
    }
    Ok(())
}
