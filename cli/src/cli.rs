use clap::{Args, Parser, Subcommand};

use tagsieve::tags::tokenizer::DEFAULT_MAX_TERMS;

pub const APP_NAME: &str = "tagsieve";

pub const ENV_LOG: &str = "TAGSIEVE_LOG";
pub const ENV_DATABASE_URL: &str = "TAGSIEVE_DATABASE_URL";

#[derive(Parser)]
#[command(name = "tagsieve")]
#[command(version, about = "Filter expression compiler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Parse a tag expression and print the extracted structure as JSON
    Parse(ParseArgs),
    /// Compile tag and condition inputs into a WHERE clause with bound values
    Compile(CompileArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ParseArgs {
    /// Tag expression, e.g. "(cute OR funny) AND !spoiler"
    pub query: String,

    /// Column name recorded in the parsed output
    #[arg(long, default_value = "tags")]
    pub column: String,

    /// Enable every strict check (empty input, term limit, parens, quotes)
    #[arg(long)]
    pub strict: bool,

    /// Term limit enforced when --strict is set
    #[arg(long, default_value_t = DEFAULT_MAX_TERMS)]
    pub max_terms: usize,

    /// Keep repeated terms instead of dropping them
    #[arg(long)]
    pub keep_duplicates: bool,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

#[derive(Args, Clone, Debug)]
pub struct CompileArgs {
    /// Tag expression compiled against the tag column
    #[arg(long, value_name = "EXPR")]
    pub tags: Option<String>,

    /// Condition tree JSON: one object or an array of them
    #[arg(long, value_name = "JSON")]
    pub conditions: Option<String>,

    /// Column holding the tag array
    #[arg(long, default_value = "tags")]
    pub tag_column: String,

    /// Translate * and ? in tag terms into SQL wildcards
    #[arg(long)]
    pub wildcards: bool,

    /// Treat the tag column as a child table and compare this column in it
    #[arg(long, value_name = "COLUMN")]
    pub value_column: Option<String>,

    /// SQL dialect used to flatten the tag array (sqlite or postgres)
    #[arg(long, default_value = "sqlite", value_parser = parse_dialect)]
    pub dialect: DialectChoice,

    /// SQLite URL to run the compiled clause against
    #[arg(long, value_name = "URL", env = ENV_DATABASE_URL)]
    pub execute: Option<String>,

    /// Table the executed query selects from
    #[arg(long, default_value = "posts", requires = "execute")]
    pub table: String,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

/// Registry declarations shared by both subcommands.
#[derive(Args, Clone, Debug)]
pub struct RegistryArgs {
    /// Symbolic modifier, repeatable: symbol=list:field (e.g. ^=boosts:boost)
    #[arg(long = "modifier", value_name = "SPEC", value_parser = parse_modifier)]
    pub modifiers: Vec<ModifierSpec>,

    /// Colon-prefixed special key to recognize, repeatable (e.g. source)
    #[arg(long = "special", value_name = "KEY")]
    pub specials: Vec<String>,
}

/// One symbolic modifier declaration: `symbol=list:field`.
#[derive(Debug, Clone)]
pub struct ModifierSpec {
    pub symbol: char,
    pub list: String,
    pub field: String,
}

#[derive(Debug, Clone, Copy)]
pub enum DialectChoice {
    Sqlite,
    Postgres,
}

/// Parse a modifier declaration from CLI/env string
fn parse_modifier(s: &str) -> Result<ModifierSpec, String> {
    let invalid = || {
        format!(
            "Invalid modifier '{}'. Expected symbol=list:field, e.g. ^=boosts:boost",
            s
        )
    };
    let mut chars = s.chars();
    let symbol = chars.next().ok_or_else(invalid)?;
    let rest = chars.as_str().strip_prefix('=').ok_or_else(invalid)?;
    let (list, field) = rest.split_once(':').ok_or_else(invalid)?;
    if list.is_empty() || field.is_empty() {
        return Err(invalid());
    }
    Ok(ModifierSpec {
        symbol,
        list: list.to_string(),
        field: field.to_string(),
    })
}

/// Parse dialect from CLI/env string
fn parse_dialect(s: &str) -> Result<DialectChoice, String> {
    match s.to_lowercase().as_str() {
        "sqlite" => Ok(DialectChoice::Sqlite),
        "postgres" | "postgresql" => Ok(DialectChoice::Postgres),
        _ => Err(format!(
            "Invalid dialect '{}'. Valid options: sqlite, postgres",
            s
        )),
    }
}

/// Parse CLI arguments and return the selected command
pub fn parse() -> Commands {
    Cli::parse().command
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_spec_round_trip() {
        let spec = parse_modifier("^=boosts:boost").unwrap();
        assert_eq!(spec.symbol, '^');
        assert_eq!(spec.list, "boosts");
        assert_eq!(spec.field, "boost");
    }

    #[test]
    fn test_modifier_spec_rejects_malformed() {
        assert!(parse_modifier("").is_err());
        assert!(parse_modifier("^").is_err());
        assert!(parse_modifier("^=boosts").is_err());
        assert!(parse_modifier("^=:boost").is_err());
    }

    #[test]
    fn test_dialect_names() {
        assert!(matches!(parse_dialect("SQLite"), Ok(DialectChoice::Sqlite)));
        assert!(matches!(
            parse_dialect("postgresql"),
            Ok(DialectChoice::Postgres)
        ));
        assert!(parse_dialect("oracle").is_err());
    }
}
