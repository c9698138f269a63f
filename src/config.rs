//! Configuration management for command-line sort jobs

use crate::comparator::Priority;
use crate::error::{SortError, SortResult};
use crate::method::{split_reverse_prefix, KeyLookup, MethodArg, MethodSpec};
use crate::registry::{is_valid_method, Category, Registry};
use std::str::FromStr;
use std::sync::Arc;

/// Field key for partial-element sorting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKey {
    /// Field number (0-based)
    pub index: usize,
    /// Methods applied to the field, in order; empty means alphabetic
    pub methods: Vec<String>,
}

impl FieldKey {
    /// Parse a field key from a string like "2" or "1:rev_numerical,alphabetic"
    pub fn parse(keydef: &str) -> SortResult<Self> {
        let (field, methods) = match keydef.split_once(':') {
            Some((field, methods)) => (field, Some(methods)),
            None => (keydef, None),
        };

        let field = field.trim();
        if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SortError::parse_error(&format!(
                "invalid field specification: {keydef}"
            )));
        }
        let index = field
            .parse::<usize>()
            .map_err(|_| SortError::parse_error(&format!("invalid field number: {field}")))?;

        let methods = match methods {
            Some(list) => parse_method_list(list)?,
            None => Vec::new(),
        };

        Ok(Self { index, methods })
    }
}

impl FromStr for FieldKey {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse a comma-separated list of method names, each checked against the registry
pub fn parse_method_list(list: &str) -> SortResult<Vec<String>> {
    list.split(',')
        .map(str::trim)
        .map(|name| {
            if is_valid_method(name) {
                Ok(name.to_string())
            } else {
                Err(SortError::invalid_method(name))
            }
        })
        .collect()
}

/// Main configuration structure for sort jobs
#[derive(Debug, Clone)]
pub struct SortConfig {
    /// Method name, optionally with the `rev_` prefix
    pub method: String,
    /// Reverse the method's order
    pub reverse: bool,
    /// Piece priority for the split method
    pub priority: Option<Priority>,
    /// Separator pattern for split and partial methods
    pub separator: Option<String>,
    /// Field keys for partial and line methods
    pub keys: Vec<FieldKey>,
    /// Backup methods (length) or sub-methods (split)
    pub backups: Vec<String>,
    /// Tab-separated lookup table file
    pub lookup_file: Option<String>,
    /// Output only the first of a run of equal lines
    pub unique: bool,
    /// Check if input is already sorted
    pub check: bool,
    /// Use zero bytes as line terminators instead of newlines
    pub zero_terminated: bool,
    /// Output file path
    pub output_file: Option<String>,
    /// Files to read from (if not specified, use stdin)
    pub input_files: Vec<String>,
    /// Debug logging
    pub debug: bool,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            method: "alphabetic".to_string(),
            reverse: false,
            priority: None,
            separator: None,
            keys: Vec::new(),
            backups: Vec::new(),
            lookup_file: None,
            unique: false,
            check: false,
            zero_terminated: false,
            output_file: None,
            input_files: Vec::new(),
            debug: false,
        }
    }
}

impl SortConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the method name
    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_string();
        self
    }

    /// Enable reverse sorting
    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Set the separator pattern
    pub fn with_separator(mut self, separator: Option<String>) -> Self {
        self.separator = separator;
        self
    }

    /// Add a field key
    pub fn add_key(mut self, key: FieldKey) -> Self {
        self.keys.push(key);
        self
    }

    /// Add a backup method
    pub fn add_backup(mut self, method: &str) -> Self {
        self.backups.push(method.to_string());
        self
    }

    /// Enable unique output
    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Enable check mode
    pub fn with_check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    /// Set output file
    pub fn with_output_file(mut self, output_file: Option<String>) -> Self {
        self.output_file = output_file;
        self
    }

    /// Set input files
    pub fn with_input_files(mut self, files: Vec<String>) -> Self {
        self.input_files = files;
        self
    }

    /// Category of the configured method
    fn category(&self) -> SortResult<Category> {
        let (name, _) = split_reverse_prefix(&self.method);
        Registry::get()
            .find(name)
            .map(|entry| entry.category)
            .ok_or_else(|| SortError::invalid_method(&self.method))
    }

    /// Validate configuration for consistency
    pub fn validate(&self) -> SortResult<()> {
        if self.check && self.unique {
            return Err(SortError::conflicting_options(
                "--check is incompatible with --unique",
            ));
        }

        let category = self.category()?;
        let (name, _) = split_reverse_prefix(&self.method);

        if name == "function" {
            return Err(SortError::conflicting_options(
                "the function method is only available to library callers",
            ));
        }

        match category {
            Category::Partial => {
                if self.keys.is_empty() {
                    return Err(SortError::conflicting_options(&format!(
                        "{name} needs at least one --key"
                    )));
                }
                if name != "partial" && self.keys.len() > 1 {
                    return Err(SortError::conflicting_options(&format!(
                        "{name} takes exactly one --key"
                    )));
                }
                if name != "partial" && !self.keys[0].methods.is_empty() {
                    return Err(SortError::conflicting_options(&format!(
                        "{name} does not take methods in its --key"
                    )));
                }
            }
            _ if !self.keys.is_empty() => {
                return Err(SortError::conflicting_options(&format!(
                    "--key is only valid with partial, line and numline, not {name}"
                )));
            }
            _ => {}
        }

        if !self.backups.is_empty() && name != "length" && name != "split" {
            return Err(SortError::conflicting_options(&format!(
                "--backup is only valid with length and split, not {name}"
            )));
        }

        if self.priority.is_some() && name != "split" {
            return Err(SortError::conflicting_options(
                "--priority is only valid with split",
            ));
        }

        if self.separator.is_some() && matches!(category, Category::Unambiguous | Category::Ambiguous) {
            return Err(SortError::conflicting_options(&format!(
                "--separator is not valid with {name}"
            )));
        }

        for backup in &self.backups {
            if !is_valid_method(backup) {
                return Err(SortError::invalid_method(backup));
            }
        }

        Ok(())
    }

    /// Build the method spec this configuration describes
    ///
    /// The lookup table, if any, translates whole lines for most methods and
    /// selected fields for partial and line methods.
    pub fn method_spec(&self, lookup: Option<Arc<dyn KeyLookup>>) -> SortResult<MethodSpec> {
        let category = self.category()?;
        let mut spec = MethodSpec::new(&self.method);
        if self.reverse {
            spec = spec.reverse();
        }

        let mut args = Vec::new();
        let backups = || MethodArg::Methods(self.backups.iter().map(|m| MethodSpec::new(m)).collect());

        match category {
            Category::Unambiguous => args.extend(lookup.map(MethodArg::Lookup)),
            Category::Ambiguous => {
                args.extend(lookup.map(MethodArg::Lookup));
                if !self.backups.is_empty() {
                    args.push(backups());
                }
            }
            Category::Split if spec.name == "split" => {
                if let Some(priority) = self.priority {
                    args.push(MethodArg::text(match priority {
                        Priority::Lms => "lms",
                        Priority::Rms => "rms",
                    }));
                }
                args.extend(self.separator.as_deref().map(MethodArg::text));
                args.extend(lookup.map(MethodArg::Lookup));
                if !self.backups.is_empty() {
                    args.push(backups());
                }
            }
            Category::Split => {
                args.extend(self.separator.as_deref().map(MethodArg::text));
                args.extend(lookup.map(MethodArg::Lookup));
            }
            Category::Partial if spec.name == "partial" => {
                args.extend(self.separator.as_deref().map(MethodArg::text));
                for key in &self.keys {
                    args.push(MethodArg::Field(key.index));
                    args.extend(lookup.clone().map(MethodArg::Lookup));
                    if !key.methods.is_empty() {
                        args.push(MethodArg::Methods(
                            key.methods.iter().map(|m| MethodSpec::new(m)).collect(),
                        ));
                    }
                }
            }
            Category::Partial => {
                let key = self
                    .keys
                    .first()
                    .ok_or_else(|| SortError::conflicting_options("missing --key"))?;
                args.push(MethodArg::Field(key.index));
                args.extend(self.separator.as_deref().map(MethodArg::text));
                args.extend(lookup.map(MethodArg::Lookup));
            }
        }

        spec.args = args;
        Ok(spec)
    }

    /// Check if reading from stdin
    pub fn reading_from_stdin(&self) -> bool {
        self.input_files.is_empty() || (self.input_files.len() == 1 && self.input_files[0] == "-")
    }

    /// Check if writing to stdout
    pub fn writing_to_stdout(&self) -> bool {
        self.output_file.is_none()
    }

    /// Line terminator byte
    pub fn line_terminator(&self) -> u8 {
        if self.zero_terminated {
            b'\0'
        } else {
            b'\n'
        }
    }
}

/// Builder pattern for creating configurations
pub struct SortConfigBuilder {
    config: SortConfig,
}

impl SortConfigBuilder {
    /// Start building a new configuration
    pub fn new() -> Self {
        Self {
            config: SortConfig::default(),
        }
    }

    /// Set method name
    pub fn method(mut self, method: &str) -> Self {
        self.config.method = method.to_string();
        self
    }

    /// Enable reverse sorting
    pub fn reverse(mut self) -> Self {
        self.config.reverse = true;
        self
    }

    /// Set split priority
    pub fn priority(mut self, priority: Priority) -> Self {
        self.config.priority = Some(priority);
        self
    }

    /// Set separator pattern
    pub fn separator(mut self, separator: &str) -> Self {
        self.config.separator = Some(separator.to_string());
        self
    }

    /// Add a field key
    pub fn key(mut self, key: FieldKey) -> Self {
        self.config.keys.push(key);
        self
    }

    /// Add a backup method
    pub fn backup(mut self, method: &str) -> Self {
        self.config.backups.push(method.to_string());
        self
    }

    /// Set lookup table file
    pub fn lookup_file(mut self, file: String) -> Self {
        self.config.lookup_file = Some(file);
        self
    }

    /// Enable unique output
    pub fn unique(mut self) -> Self {
        self.config.unique = true;
        self
    }

    /// Enable check mode
    pub fn check(mut self) -> Self {
        self.config.check = true;
        self
    }

    /// Enable zero-terminated lines
    pub fn zero_terminated(mut self) -> Self {
        self.config.zero_terminated = true;
        self
    }

    /// Set output file
    pub fn output_file(mut self, file: String) -> Self {
        self.config.output_file = Some(file);
        self
    }

    /// Enable debug logging
    pub fn debug(mut self) -> Self {
        self.config.debug = true;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> SortResult<SortConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for SortConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Preset configurations for common use cases
pub mod presets {
    use super::*;

    /// Configuration for numeric sorting
    pub fn numeric() -> SortConfig {
        SortConfig::new().with_method("numerical")
    }

    /// Configuration for version sorting
    pub fn version() -> SortConfig {
        SortConfig::new().with_method("version")
    }

    /// Configuration for IP and CIDR sorting
    pub fn ip() -> SortConfig {
        SortConfig::new().with_method("ip")
    }

    /// Configuration for host names, most significant label last
    pub fn domain() -> SortConfig {
        SortConfig::new().with_method("domain")
    }

    /// Configuration for file paths
    pub fn path() -> SortConfig {
        SortConfig::new().with_method("path")
    }

    /// Configuration for reverse sorting
    pub fn reverse() -> SortConfig {
        SortConfig::new().with_reverse(true)
    }
}
