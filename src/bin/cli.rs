use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use bug_wars_ai::compiler::{Diagnostic, ScriptCompiler};
use bug_wars_ai::dsl::codegen::Bytecode;
use bug_wars_ai::dsl::{self, disasm, lexer, parser};
use bug_wars_ai::error::AppError;
use bug_wars_ai::library::ScriptLibrary;
use bug_wars_ai::settings::{self, AppSettings};
use bug_wars_ai::{logging, paths};

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "bugwars-cli", about = "Bug Wars AI script compiler", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config directory override
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Script library file, overriding the configured path
    #[arg(long, global = true)]
    scripts: Option<PathBuf>,

    /// Output raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    /// Log pipeline detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a stored script by id
    Compile { id: i64 },
    /// Compile a script file and report the first error with line and column
    Check { file: PathBuf },
    /// Print the token stream of a script file
    Tokens { file: PathBuf },
    /// Print the parsed syntax tree of a script file
    Ast { file: PathBuf },
    /// Compile a stored script and print an instruction listing
    Disasm { id: i64 },
    /// Compile a stored script and print the commands the bug would perform
    Replay {
        id: i64,
        /// Instruction budget (defaults to the max_replay_steps setting)
        #[arg(long)]
        max_steps: Option<usize>,
    },
    /// Write default settings and an empty script library
    InitSettings {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
}

/// What a subcommand produced: a line for humans plus structured data.
#[derive(Debug)]
struct CliOutput {
    message: String,
    data: Value,
}

impl CliOutput {
    fn new(message: impl Into<String>, data: impl Serialize) -> Self {
        Self {
            message: message.into(),
            data: serde_json::to_value(data).unwrap_or(Value::Null),
        }
    }
}

// ── Context ──────────────────────────────────────────────────────

struct Context {
    app_config_dir: PathBuf,
    settings: AppSettings,
}

impl Context {
    fn from_cli(cli: &Cli) -> Self {
        let app_config_dir = cli
            .config_dir
            .clone()
            .unwrap_or_else(paths::default_config_dir);
        let mut settings = settings::load_or_default(&app_config_dir);
        if let Some(scripts) = &cli.scripts {
            settings.scripts_path.clone_from(scripts);
        }
        Self {
            app_config_dir,
            settings,
        }
    }

    fn library(&self) -> Result<ScriptLibrary, AppError> {
        Ok(ScriptLibrary::load(&self.settings.scripts_path)?)
    }

    fn compile(&self, id: i64) -> Result<Bytecode, AppError> {
        let library = self.library()?;
        ScriptCompiler::new(&library)
            .compile(id)
            .map_err(AppError::from)
    }
}

fn read_script(file: &Path) -> Result<String, AppError> {
    Ok(std::fs::read_to_string(file)?)
}

/// Stage errors from a local file carry line:col in the detail.
fn file_parse_error(err: &dsl::error::CompileError, text: &str) -> AppError {
    let mut diagnostic = Diagnostic::parse_error(err);
    diagnostic.detail = Some(err.format_with_source(text));
    diagnostic.into()
}

// ── Commands ─────────────────────────────────────────────────────

fn run(ctx: &Context, command: &Commands) -> Result<CliOutput, AppError> {
    match command {
        Commands::Compile { id } => {
            let code = ctx.compile(*id)?;
            Ok(CliOutput::new(
                format!("Script {id}: {} instructions", code.instruction_count()),
                serde_json::json!({ "id": id, "bytecode": code }),
            ))
        }
        Commands::Check { file } => {
            let text = read_script(file)?;
            let code = dsl::compile_source(&text).map_err(|e| file_parse_error(&e, &text))?;
            Ok(CliOutput::new(
                format!("{}: ok, {} instructions", file.display(), code.instruction_count()),
                code,
            ))
        }
        Commands::Tokens { file } => {
            let text = read_script(file)?;
            let tokens = lexer::lex(&text).map_err(|e| file_parse_error(&e, &text))?;
            let listing = tokens
                .iter()
                .map(|t| format!("{:>5}..{:<5} {:?} {}", t.span.start, t.span.end, t.kind, t.lexeme))
                .collect::<Vec<_>>()
                .join("\n");
            Ok(CliOutput::new(listing, tokens))
        }
        Commands::Ast { file } => {
            let text = read_script(file)?;
            let program =
                parser::parse(lexer::tokenize(&text)).map_err(|e| file_parse_error(&e, &text))?;
            Ok(CliOutput::new(
                format!("{} top-level statements", program.body.len()),
                program,
            ))
        }
        Commands::Disasm { id } => {
            let code = ctx.compile(*id)?;
            let listing = disasm::disassemble(code.as_slice())?;
            let instructions = disasm::decode(code.as_slice()).unwrap_or_default();
            Ok(CliOutput::new(listing.trim_end(), instructions))
        }
        Commands::Replay { id, max_steps } => {
            let code = ctx.compile(*id)?;
            let budget = max_steps.unwrap_or(ctx.settings.max_replay_steps);
            let performed = disasm::replay(code.as_slice(), budget)?;
            let lines = performed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            Ok(CliOutput::new(lines, performed))
        }
        Commands::InitSettings { force } => init_settings(ctx, *force),
    }
}

fn init_settings(ctx: &Context, force: bool) -> Result<CliOutput, AppError> {
    let settings_path = paths::settings_path(&ctx.app_config_dir);
    if settings_path.exists() && !force {
        return Err(AppError::InvalidArgument {
            message: format!(
                "{} already exists (use --force to overwrite)",
                settings_path.display()
            ),
        });
    }
    settings::save_settings(&ctx.app_config_dir, &ctx.settings).map_err(|e| {
        AppError::SettingsSaveError {
            message: e.to_string(),
        }
    })?;
    if !ctx.settings.scripts_path.exists() {
        ScriptLibrary::write_file(&ctx.settings.scripts_path, &[])?;
    }
    Ok(CliOutput::new(
        format!("Wrote {}", settings_path.display()),
        &ctx.settings,
    ))
}

// ── Output formatting ────────────────────────────────────────────

fn print_output(output: &CliOutput, raw_json: bool) {
    if raw_json {
        let json = serde_json::json!({
            "ok": true,
            "message": output.message,
            "data": output.data,
        });
        println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        return;
    }
    println!("{}", output.message);
}

fn print_error(error: &AppError, raw_json: bool) {
    if raw_json {
        let json = serde_json::json!({ "ok": false, "error": error });
        println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        return;
    }
    eprintln!("Error: {error}");
}

// ── Main ─────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    let ctx = Context::from_cli(&cli);

    let filter = if cli.verbose {
        "debug"
    } else {
        ctx.settings.log_filter.as_str()
    };
    logging::init(filter);

    match run(&ctx, &cli.command) {
        Ok(output) => print_output(&output, cli.json),
        Err(e) => {
            print_error(&e, cli.json);
            process::exit(1);
        }
    }
}
