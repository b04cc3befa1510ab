use crate::error;
use crate::index;

/// Environment variable consulted when `--data-dir` is not given.
pub const DATA_DIR_ENV: &str = "INDEX_OVERLAP_DATA_DIR";

/// Structure representing command-line arguments.
#[derive(Debug)]
pub struct Args {
    pub data_dir: std::path::PathBuf,
    pub threads: Option<usize>,
    pub pretty: bool,
    pub verbose: bool,
    pub quiet: bool,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Providers,
    Indices { source: String },
    Components { code: String, source: String },
    Overlap(Selection),
    Heatmap(Selection),
}

/// Where the index selection of an overlap/heatmap request comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Repeated `--index SOURCE:CODE[:NAME]` arguments.
    Inline(Vec<String>),
    /// JSON body `{"indices": [...]}` read from a file, or stdin for `-`.
    Request(std::path::PathBuf),
}

#[derive(Debug, serde::Deserialize)]
struct SelectionRequest {
    #[serde(default)]
    indices: Vec<SelectionRow>,
}

/// One entry of a request body. The source stays text until `IndexSource::from_str`
/// so an unknown provider surfaces as `UnsupportedSource`, not a parse failure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SelectionRow {
    code: String,
    name: String,
    source: String,
}

impl SelectionRow {
    fn into_index_ref(self) -> error::Result<index::IndexRef> {
        let code = self.code.trim();
        let source = self.source.trim();
        if code.is_empty() || source.is_empty() {
            return Err(error::OverlapError::Validation(format!(
                "request entry needs code and source, got {:?}",
                self
            )));
        }
        let name = match self.name.trim() {
            "" => code,
            name => name,
        };

        Ok(index::IndexRef {
            code: code.to_string(),
            name: name.to_string(),
            source: source.parse()?,
        })
    }
}

/// Command-line arguments parser using Clap.
impl Args {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    #[cfg(test)]
    /// Parses an explicit argument list.
    ///
    /// # Errors
    /// * If required arguments are missing or invalid.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &clap::ArgMatches) -> Self {
        let string = |m: &clap::ArgMatches, id: &str| m.get_one::<String>(id).cloned().unwrap_or_default();

        let command = match matches.subcommand() {
            Some(("indices", sub)) => Command::Indices { source: string(sub, "source") },
            Some(("components", sub)) => Command::Components {
                code: string(sub, "code"),
                source: string(sub, "source"),
            },
            Some(("overlap", sub)) => Command::Overlap(selection(sub)),
            Some(("heatmap", sub)) => Command::Heatmap(selection(sub)),
            _ => Command::Providers,
        };

        Args {
            data_dir: matches
                .get_one::<std::path::PathBuf>("data-dir")
                .cloned()
                .unwrap_or_else(|| std::path::PathBuf::from("data")),
            threads: matches.get_one::<usize>("threads").cloned(),
            pretty: matches.get_flag("pretty"),
            verbose: matches.get_flag("verbose"),
            quiet: matches.get_flag("quiet"),
            command,
        }
    }
}

fn command() -> clap::Command {
    let source_arg = clap::Arg::new("source")
        .short('s')
        .long("source")
        .help("Index provider: cs (China Securities Index) or cni (CNI Index)")
        .required(true)
        .num_args(1);

    clap::Command::new("index-overlap")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compare constituent overlap of market indices")
        .subcommand_required(true)
        .arg(
            clap::Arg::new("data-dir")
                .short('d')
                .long("data-dir")
                .env(DATA_DIR_ENV)
                .help("Directory with exported provider tables")
                .default_value("data")
                .value_parser(clap::value_parser!(std::path::PathBuf))
                .global(true),
        )
        .arg(
            clap::Arg::new("threads")
                .short('t')
                .long("threads")
                .help("Number of threads used to load index tables (default: all available)")
                .num_args(1)
                .value_parser(clap::builder::ValueParser::new(parse_usize_positive))
                .global(true),
        )
        .arg(
            clap::Arg::new("pretty")
                .long("pretty")
                .help("Pretty-print JSON output")
                .action(clap::ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log cache and fetch details")
                .action(clap::ArgAction::SetTrue)
                .conflicts_with("quiet")
                .global(true),
        )
        .arg(
            clap::Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only log warnings and errors, hide progress")
                .action(clap::ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(clap::Command::new("providers").about("List supported index providers"))
        .subcommand(
            clap::Command::new("indices")
                .about("List the indices published by a provider")
                .arg(source_arg.clone()),
        )
        .subcommand(
            clap::Command::new("components")
                .about("Show the normalized constituents of one index")
                .arg(
                    clap::Arg::new("code")
                        .short('c')
                        .long("code")
                        .help("Index code, e.g. 000300")
                        .required(true)
                        .num_args(1),
                )
                .arg(source_arg),
        )
        .subcommand(selection_args(
            clap::Command::new("overlap").about("Pairwise shared constituent count and weight (2+ indices)"),
        ))
        .subcommand(selection_args(
            clap::Command::new("heatmap").about("Per-index, per-stock weight matrix (1+ indices)"),
        ))
}

fn selection_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        clap::Arg::new("index")
            .short('i')
            .long("index")
            .help("Selected index as SOURCE:CODE[:NAME], repeatable")
            .action(clap::ArgAction::Append)
            .num_args(1),
    )
    .arg(
        clap::Arg::new("request")
            .short('r')
            .long("request")
            .help("JSON request file {\"indices\": [{code, name, source}]}, - for stdin")
            .num_args(1)
            .value_parser(clap::value_parser!(std::path::PathBuf))
            .conflicts_with("index"),
    )
    .group(
        clap::ArgGroup::new("selection")
            .args(["index", "request"])
            .required(true),
    )
}

fn selection(matches: &clap::ArgMatches) -> Selection {
    match matches.get_one::<std::path::PathBuf>("request") {
        Some(path) => Selection::Request(path.clone()),
        None => Selection::Inline(
            matches
                .get_many::<String>("index")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
        ),
    }
}

/// Validates that the number of threads is a positive integer.
///
/// # Arguments
/// * `s` - String representation of the number of threads.
///
/// # Returns
/// * `Result<usize>` - Validated number of threads.
fn parse_usize_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("Must be a positive integer".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("Not a valid number: {}", e)),
    }
}

/// Parses `SOURCE:CODE[:NAME]`; the code doubles as the name when none is given.
pub fn parse_index_arg(value: &str) -> error::Result<index::IndexRef> {
    let mut parts = value.splitn(3, ':');
    let source = parts.next().unwrap_or_default().trim();
    let code = parts.next().unwrap_or_default().trim();
    let name = parts.next().map(str::trim).unwrap_or(code);

    if source.is_empty() || code.is_empty() || name.is_empty() {
        return Err(error::OverlapError::Validation(format!(
            "expected SOURCE:CODE[:NAME], got {:?}",
            value
        )));
    }

    Ok(index::IndexRef {
        code: code.to_string(),
        name: name.to_string(),
        source: source.parse()?,
    })
}

/// Materializes the selected indices, reading the request body if needed.
pub fn load_selection(selection: &Selection) -> error::Result<Vec<index::IndexRef>> {
    match selection {
        Selection::Inline(values) => values.iter().map(|value| parse_index_arg(value)).collect(),
        Selection::Request(path) => {
            let read = if path.as_os_str() == "-" {
                std::io::read_to_string(std::io::stdin())
            } else {
                std::fs::read_to_string(path)
            };
            let body = read.map_err(|e| {
                error::OverlapError::Validation(format!("cannot read request {}: {}", path.display(), e))
            })?;

            let request: SelectionRequest = serde_json::from_str(&body)
                .map_err(|e| error::OverlapError::Validation(format!("malformed request body: {}", e)))?;
            request.indices.into_iter().map(SelectionRow::into_index_ref).collect()
        }
    }
}
