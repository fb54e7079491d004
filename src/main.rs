use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use satchel::config::Config;
use satchel::errors::{Result, ToolError};
use satchel::sql::{PairSort, SanitizeOptions, SplitOptions};
use satchel::{flatten, hours, launch, portal, scaffold, serve, site, sql, tidy};
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "satchel")]
#[command(author, version, about = "A toolbag for recurring design-office chores")]
struct Args {
    /// Config file (default: walk up to the nearest satchel.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge an audit-trail CSV into a static HTML diff portal
    Portal {
        /// Change event CSV (default: from config)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory for index.html and assets (default: from config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Open the generated page in the browser
        #[arg(long)]
        open: bool,
    },

    /// Build or serve the markdown knowledge base
    Site {
        #[command(subcommand)]
        command: SiteCommand,
    },

    /// Groom Access SQL dumps: sanitize, restore, split, link analysis
    Sql {
        #[command(subcommand)]
        command: SqlCommand,
    },

    /// Sort loose files into extension folders
    Tidy {
        /// Directory to sort (default: from config)
        #[arg(long)]
        target: Option<PathBuf>,

        /// Print planned moves without touching anything
        #[arg(long)]
        dry_run: bool,

        #[command(subcommand)]
        command: Option<TidyCommand>,
    },

    /// Flatten a JSON file into a leveled TSV
    Flatten {
        /// Input file (default: newest *.json in the current directory)
        input: Option<PathBuf>,

        /// Output name prefix
        #[arg(long, default_value = "output")]
        out_prefix: String,

        /// Directory previous outputs are moved into
        #[arg(long, default_value = "old")]
        keep_old_dir: String,
    },

    /// Aggregate a timesheet CSV into detail and monthly summaries
    Hours {
        /// Timesheet CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Keep only rows whose client or project name matches
        #[arg(long)]
        project: Option<String>,

        /// Keep only rows for this employee
        #[arg(long)]
        employee: Option<String>,

        /// Output directory (default: from config)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Also write the styled HTML summary page
        #[arg(long)]
        html: bool,
    },

    /// Open configured folders and URLs by name
    Launch {
        /// Entry name to launch
        name: Option<String>,

        /// Page the entry lives on, when names repeat across pages
        #[arg(long)]
        page: Option<String>,

        /// List every page and entry
        #[arg(long)]
        list: bool,

        /// Interactive picker
        #[arg(long)]
        tui: bool,

        /// Print what would open instead of opening it
        #[arg(long)]
        dry_run: bool,

        /// Launcher file (default: from config)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Scaffold a fresh tool project directory
    New {
        /// Project name, used as the directory name
        name: String,

        /// Parent directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum SiteCommand {
    /// Render every changed page and the index
    Build {
        /// Rebuild even pages whose sources are unchanged
        #[arg(long)]
        force: bool,
    },

    /// Preview the site and host the meta-editor admin page
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3210")]
        port: u16,

        /// Rebuild when the md directory changes
        #[arg(long)]
        watch: bool,

        /// Open the browser once the server is up
        #[arg(long)]
        open: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SqlCommand {
    /// Clean formatter-hostile Access SQL inside an audit TSV
    Sanitize {
        /// Headerless TSV with a SQL column (auto-detected)
        #[arg(short, long)]
        input: PathBuf,

        /// Cleaned CSV output (original columns + converted_sql + notes)
        #[arg(long)]
        out_csv: Option<PathBuf>,

        /// Converted SQL-only output
        #[arg(long)]
        out_sql: Option<PathBuf>,

        /// Formatter-safe SQL output
        #[arg(long)]
        out_safe: Option<PathBuf>,

        /// Where existing outputs are archived first
        #[arg(long)]
        archive_dir: Option<PathBuf>,
    },

    /// Swap formatter placeholders back to the original glyphs
    Restore {
        /// Formatter-safe SQL file
        input: PathBuf,

        /// Output path (default: <input>_restored.sql)
        output: Option<PathBuf>,
    },

    /// Split a dump into one numbered file per statement
    Split {
        /// SQL dump
        input: PathBuf,

        /// Parent of the timestamped run directory
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Run directory name prefix
        #[arg(long)]
        prefix: Option<String>,

        /// CSV whose rows become header comments, one per statement
        #[arg(long)]
        meta_csv: Option<PathBuf>,

        /// Meta columns used for the comments
        #[arg(long, value_delimiter = ',')]
        comment_cols: Vec<String>,

        /// Keep over-split statements instead of merging fragments
        #[arg(long)]
        no_sync: bool,
    },

    /// Extract JOIN link rows from .sql files into a CSV
    Links {
        /// A .sql file or a directory scanned recursively
        input: PathBuf,

        /// Output CSV
        #[arg(long, default_value = "join_links.csv")]
        out: PathBuf,
    },

    /// Aggregate a links CSV into table-pair counts
    Pairs {
        /// Links CSV written by `sql links`
        #[arg(long, default_value = "join_links.csv")]
        input: PathBuf,

        /// Output CSV
        #[arg(long, default_value = "join_pairs.csv")]
        out: PathBuf,

        /// Row order in the output
        #[arg(long, default_value = "count", value_parser = ["count", "table"])]
        sort: String,
    },
}

#[derive(Subcommand, Debug)]
enum TidyCommand {
    /// Keep the newest dated revisions per base name, move the rest to old/
    Revisions {
        /// Directory to prune (default: from config)
        #[arg(long)]
        target: Option<PathBuf>,

        /// Revisions kept per base name (default: from config)
        #[arg(long)]
        keep: Option<usize>,

        /// Print the plan without moving anything
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        match &e {
            ToolError::Input(input) => {
                eprintln!("{} {}", "[INPUT ERROR]".red().bold(), input);
            }
            other => eprintln!("{} {}", "Error:".red().bold(), other),
        }
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Completion { shell } => {
            let mut cmd = Args::command();
            clap_complete::generate(shell, &mut cmd, "satchel", &mut io::stdout());
            Ok(())
        }
        command => {
            let config = Config::load(args.config.as_deref())?;
            dispatch(command, &config)
        }
    }
}

fn dispatch(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Portal {
            input,
            output,
            open,
        } => {
            portal::run(&config.portal, input.as_deref(), output.as_deref(), open)?;
        }
        Command::Site { command } => match command {
            SiteCommand::Build { force } => {
                site::build(&config.site, force)?;
            }
            SiteCommand::Serve { port, watch, open } => {
                serve::run(&config.site, port, watch, open)?;
            }
        },
        Command::Sql { command } => match command {
            SqlCommand::Sanitize {
                input,
                out_csv,
                out_sql,
                out_safe,
                archive_dir,
            } => {
                let opts = SanitizeOptions {
                    out_csv,
                    out_sql,
                    out_safe,
                    archive_dir,
                };
                sql::sanitize(&input, &opts)?;
            }
            SqlCommand::Restore { input, output } => {
                sql::restore_file(&input, output.as_deref())?;
            }
            SqlCommand::Split {
                input,
                out_dir,
                prefix,
                meta_csv,
                comment_cols,
                no_sync,
            } => {
                let opts = SplitOptions {
                    out_dir,
                    prefix,
                    meta_csv,
                    comment_cols,
                    no_sync,
                };
                sql::split(&input, &opts)?;
            }
            SqlCommand::Links { input, out } => {
                sql::run_links(&input, &out)?;
            }
            SqlCommand::Pairs { input, out, sort } => {
                let sort = match sort.as_str() {
                    "table" => PairSort::Table,
                    _ => PairSort::Count,
                };
                sql::run_pairs(&input, &out, sort)?;
            }
        },
        Command::Tidy {
            target,
            dry_run,
            command,
        } => match command {
            // `tidy --dry-run revisions` and `tidy revisions --dry-run`
            // both mean a dry run
            Some(TidyCommand::Revisions {
                target: rev_target,
                keep,
                dry_run: rev_dry,
            }) => {
                let target = rev_target.or(target);
                tidy::prune_revisions(&config.tidy, target.as_deref(), keep, rev_dry || dry_run)?;
            }
            None => {
                tidy::sort_files(&config.tidy, target.as_deref(), dry_run)?;
            }
        },
        Command::Flatten {
            input,
            out_prefix,
            keep_old_dir,
        } => {
            flatten::run(input.as_deref(), &out_prefix, &keep_old_dir)?;
        }
        Command::Hours {
            input,
            project,
            employee,
            out_dir,
            html,
        } => {
            hours::run(
                &config.hours,
                &input,
                project.as_deref(),
                employee.as_deref(),
                out_dir.as_deref(),
                html,
            )?;
        }
        Command::Launch {
            name,
            page,
            list,
            tui,
            dry_run,
            file,
        } => {
            launch::run(
                &config.launch,
                file.as_deref(),
                name.as_deref(),
                page.as_deref(),
                list,
                tui,
                dry_run,
            )?;
        }
        Command::New { name, dir } => {
            scaffold::run(&name, &dir)?;
        }
        Command::Completion { .. } => unreachable!("handled before config load"),
    }
    Ok(())
}
