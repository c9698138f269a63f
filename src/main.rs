//! dtsort: sort lines of text by a named, type-aware method
//!
//! Reads lines from files or standard input, sorts them with one of the
//! library's methods and writes them to standard output or a file.

use std::process;

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::Level;

use datatype_sort::{
    comparator::Priority,
    config::{parse_method_list, FieldKey, SortConfig},
    error::{SortError, SortResult},
    registry::Registry,
    run, EXIT_SUCCESS,
};

fn main() {
    let matches = build_cli().get_matches();
    init_logging(matches.get_flag("debug"));

    match execute(&matches) {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("dtsort: {e}");
            process::exit(e.exit_code());
        }
    }
}

fn init_logging(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn execute(matches: &ArgMatches) -> SortResult<i32> {
    if matches.get_flag("list-methods") {
        print!("{}", method_listing());
        return Ok(EXIT_SUCCESS);
    }

    let config = parse_config_from_matches(matches)?;
    run(&config)
}

fn build_cli() -> Command {
    Command::new("dtsort")
        .version(env!("CARGO_PKG_VERSION"))
        .override_usage("dtsort [OPTION]... [FILE]...")
        .about("Sort lines of text by a type-aware method")
        .long_about("Sort lines of text by a type-aware method.\n\nMethods include numerical, alphabetic, alphanumeric, random, version, date, ip, nosort, length, split, domain, numdomain, path, numpath, partial, line and numline. Prefix a method with rev_ to reverse it.")

        // Input files
        .arg(Arg::new("files")
            .help("Input files to sort (use '-' or omit for stdin)")
            .num_args(0..)
            .value_name("FILE"))

        // Method selection
        .arg(Arg::new("method")
            .short('m')
            .long("method")
            .help("Sort by METHOD (default: alphabetic)")
            .value_name("METHOD")
            .default_value("alphabetic"))
        .arg(Arg::new("reverse")
            .short('r')
            .long("reverse")
            .help("Reverse the result of comparisons")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("priority")
            .short('p')
            .long("priority")
            .help("Most significant end for split: lms or rms")
            .value_name("PRIORITY")
            .value_parser(["lms", "rms", "LMS", "RMS"]))
        .arg(Arg::new("separator")
            .short('t')
            .long("separator")
            .help("Regular expression separating pieces or fields")
            .value_name("REGEX"))
        .arg(Arg::new("key")
            .short('k')
            .long("key")
            .help("Field to compare for partial, line and numline")
            .long_help("Field to compare for partial, line and numline.\n\nKEYDEF is FIELD[:METHOD[,METHOD]...] where FIELD is a 0-based field index and the methods compare that field in order. Repeat -k for more fields; the first is the most significant.\n\nExamples:\n  2               - compare field 2 alphabetically\n  0:rev_numerical - compare field 0 numerically, largest first\n  1:date,ip       - compare field 1 as a date, then as an IP")
            .value_name("KEYDEF")
            .action(ArgAction::Append))
        .arg(Arg::new("backup")
            .short('b')
            .long("backup")
            .help("Backup method for length, sub-method for split")
            .value_name("METHOD")
            .action(ArgAction::Append))
        .arg(Arg::new("lookup")
            .short('l')
            .long("lookup")
            .help("Compare values looked up in FILE (key<TAB>value lines)")
            .value_name("FILE"))

        // Output options
        .arg(Arg::new("unique")
            .short('u')
            .long("unique")
            .help("Output only the first of an equal run")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("check")
            .short('c')
            .long("check")
            .help("Check for sorted input; do not sort")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("zero-terminated")
            .short('z')
            .long("zero-terminated")
            .help("Line delimiter is NUL, not newline")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("output")
            .short('o')
            .long("output")
            .help("Write result to FILE instead of standard output")
            .value_name("FILE"))

        // Diagnostics
        .arg(Arg::new("debug")
            .long("debug")
            .help("Log method resolution and sorting to stderr")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("list-methods")
            .long("list-methods")
            .help("List supported methods and their arguments, then exit")
            .action(ArgAction::SetTrue))
}

/// One line per registered method: name, then argument usage
fn method_listing() -> String {
    let entries = Registry::get().entries();
    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
    entries
        .iter()
        .map(|e| format!("{:width$}  {}\n", e.name, e.usage))
        .collect()
}

/// Parse configuration from command line matches
fn parse_config_from_matches(matches: &ArgMatches) -> SortResult<SortConfig> {
    let mut config = SortConfig::new();

    if let Some(method) = matches.get_one::<String>("method") {
        config.method = method.clone();
    }
    config.reverse = matches.get_flag("reverse");
    config.unique = matches.get_flag("unique");
    config.check = matches.get_flag("check");
    config.zero_terminated = matches.get_flag("zero-terminated");
    config.debug = matches.get_flag("debug");

    if let Some(flag) = matches.get_one::<String>("priority") {
        config.priority = Some(
            Priority::from_flag(flag)
                .ok_or_else(|| SortError::parse_error(&format!("invalid priority: {flag}")))?,
        );
    }

    config.separator = matches.get_one::<String>("separator").cloned();

    if let Some(keys) = matches.get_many::<String>("key") {
        for keydef in keys {
            config.keys.push(FieldKey::parse(keydef)?);
        }
    }

    if let Some(backups) = matches.get_many::<String>("backup") {
        for list in backups {
            config.backups.extend(parse_method_list(list)?);
        }
    }

    config.lookup_file = matches.get_one::<String>("lookup").cloned();
    config.output_file = matches.get_one::<String>("output").cloned();
    config.input_files = matches
        .get_many::<String>("files")
        .unwrap_or_default()
        .cloned()
        .collect();

    config.validate()?;

    Ok(config)
}
