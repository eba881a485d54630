//! Command dispatch

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqlitePool, TypeInfo, ValueRef};

use tagsieve::condition::{Condition, ConditionCompiler, parse_conditions};
use tagsieve::dialect::{PostgresDialect, SqlDialect, SqliteDialect};
use tagsieve::params::SqlParams;
use tagsieve::tags::{SpecialRegistry, StrictMode, TagCompiler, TagQueryParser, TokenizerOptions};
use tagsieve::value::SqlValue;

use crate::cli::{
    self, APP_NAME, Commands, CompileArgs, DialectChoice, ENV_LOG, ParseArgs, RegistryArgs,
};

pub struct App;

impl App {
    /// Run the tool with CLI argument parsing
    pub async fn run() -> Result<()> {
        Self::init_logging();

        tracing::debug!("Application starting");

        let command = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Commands::Parse(args) => Self::parse_expression(&args),
            Commands::Compile(args) => Self::compile(&args).await,
        }
    }

    fn parse_expression(args: &ParseArgs) -> Result<()> {
        let options = TokenizerOptions {
            max_terms: args.max_terms,
            dedupe: !args.keep_duplicates,
            strict: if args.strict {
                StrictMode::all()
            } else {
                StrictMode::off()
            },
        };
        let mut parser = TagQueryParser::new(args.column.clone()).with_options(options);
        Self::register(parser.specials_mut(), &args.registry)?;

        let parsed = parser.parse(&args.query)?;
        println!("{}", serde_json::to_string_pretty(&parsed.to_json())?);
        Ok(())
    }

    async fn compile(args: &CompileArgs) -> Result<()> {
        if args.tags.is_none() && args.conditions.is_none() {
            anyhow::bail!("nothing to compile: pass --tags and/or --conditions");
        }

        let mut params = SqlParams::new();
        let mut fragments = Vec::new();

        if let Some(json) = &args.conditions {
            let compiler = ConditionCompiler::new();
            for condition in Self::read_conditions(json)? {
                fragments.push(compiler.compile(&condition, &mut params)?);
            }
        }

        if let Some(expression) = &args.tags {
            let mut parser = TagQueryParser::new(args.tag_column.clone());
            Self::register(parser.specials_mut(), &args.registry)?;

            let mut filter = parser.parse(expression)?.filter(args.wildcards);
            filter.value_alias = args.value_column.clone();

            let dialect: &dyn SqlDialect = match args.dialect {
                DialectChoice::Sqlite => &SqliteDialect,
                DialectChoice::Postgres => &PostgresDialect,
            };
            fragments.push(TagCompiler::new().compile(&filter, dialect, &mut params));
        }

        let clause = match fragments.as_slice() {
            [] => "1".to_string(),
            [single] => single.clone(),
            _ => {
                let wrapped: Vec<String> = fragments.iter().map(|f| format!("({})", f)).collect();
                wrapped.join(" AND ")
            }
        };

        let output = serde_json::json!({
            "sql": clause,
            "values": params.values(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);

        if let Some(url) = &args.execute {
            Self::execute(url, &args.table, &clause, params.values()).await?;
        }
        Ok(())
    }

    fn register(registry: &mut SpecialRegistry, args: &RegistryArgs) -> Result<()> {
        for modifier in &args.modifiers {
            registry.add_modifier(
                modifier.symbol,
                modifier.list.as_str(),
                modifier.field.as_str(),
            )?;
        }
        for key in &args.specials {
            registry.add_special(key.as_str(), None)?;
        }
        Ok(())
    }

    /// Accept either one condition object or an array of them.
    fn read_conditions(json: &str) -> Result<Vec<Condition>> {
        if json.trim_start().starts_with('[') {
            return Ok(parse_conditions(json)?);
        }
        let value = serde_json::from_str(json).context("reading condition JSON")?;
        Ok(vec![Condition::from_json(value)?])
    }

    async fn execute(url: &str, table: &str, clause: &str, values: &[SqlValue]) -> Result<()> {
        let pool = SqlitePool::connect(url)
            .await
            .with_context(|| format!("connecting to {}", url))?;

        let sql = format!("SELECT * FROM {} WHERE {}", table, clause);
        tracing::debug!(sql = %sql, bound = values.len(), "Executing compiled query");

        let mut query = sqlx::query(&sql);
        for value in values {
            query = match value {
                SqlValue::Null => query.bind(Option::<String>::None),
                SqlValue::Bool(b) => query.bind(*b),
                SqlValue::Integer(i) => query.bind(*i),
                SqlValue::Float(f) => query.bind(*f),
                SqlValue::Text(s) => query.bind(s.as_str()),
            };
        }
        let rows = query.fetch_all(&pool).await?;

        if let Some(first) = rows.first() {
            let header: Vec<&str> = first.columns().iter().map(|c| c.name()).collect();
            println!("{}", header.join("\t"));
        }
        for row in &rows {
            let cells = (0..row.len())
                .map(|index| Self::render_cell(row, index))
                .collect::<Result<Vec<String>>>()?;
            println!("{}", cells.join("\t"));
        }
        println!("({} rows)", rows.len());
        Ok(())
    }

    /// Decode by the cell's declared type; SQLite columns are dynamically typed.
    fn render_cell(row: &SqliteRow, index: usize) -> Result<String> {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok("NULL".to_string());
        }
        Ok(match raw.type_info().name() {
            "INTEGER" => row.try_get::<i64, _>(index)?.to_string(),
            "REAL" => row.try_get::<f64, _>(index)?.to_string(),
            "TEXT" => row.try_get::<String, _>(index)?,
            other => format!("<{}>", other.to_ascii_lowercase()),
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }
}
