use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use is_terminal::IsTerminal;
use nogit::areas::refs::HeadState;
use nogit::areas::repository::Repository;
use nogit::artifacts::core::PagerWriter;
use nogit::artifacts::log::rev_list::WalkOrder;
use nogit::commands::plumbing::cat_file::CatFileMode;
use nogit::commands::plumbing::hash_object::hash_file;
use nogit::commands::porcelain::checkout::DETACHMENT_NOTICE;
use nogit::commands::porcelain::clone::{CloneOptions, default_clone_directory};
use nogit::commands::porcelain::commit::CommitOptions;
use nogit::commands::porcelain::config::ConfigOptions;
use nogit::commands::porcelain::log::DEFAULT_LOG_LIMIT;
use nogit::commands::porcelain::remote::RemoteAddOptions;
use nogit::commands::porcelain::rev_list::RevListOptions;
use nogit::errors::RepositoryError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "NOGIT_LOG";

#[derive(Parser)]
#[command(
    name = "nogit",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "A git-compatible version control core",
    long_about = "nogit reads and writes git repositories: loose objects, the index, refs and config. \
    It covers the everyday local workflow; there is no network transport.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "init",
        about = "Create an empty repository",
        long_about = "Creates a repository in the current directory or at the specified path."
    )]
    Init {
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<PathBuf>,
        #[arg(long, help = "Create a bare repository")]
        bare: bool,
    },
    #[command(name = "add", about = "Add file contents to the index")]
    Add {
        #[arg(index = 1, required = true, help = "Files or directories to stage")]
        paths: Vec<PathBuf>,
    },
    #[command(
        name = "checkout",
        about = "Switch branches or detach HEAD at a commit",
        long_about = "Checks out a branch when one with that name exists; otherwise the target \
        must be a (possibly abbreviated) commit id, and HEAD is detached there."
    )]
    Checkout {
        #[arg(index = 1, help = "Branch name or commit id")]
        target: String,
    },
    #[command(
        name = "clone",
        about = "Clone a local repository into a new directory"
    )]
    Clone {
        #[arg(index = 1, help = "Path or file:// URL of the source repository")]
        repository: String,
        #[arg(index = 2, help = "Destination directory")]
        directory: Option<PathBuf>,
        #[arg(long, help = "Directory from which templates will be used")]
        template: Option<PathBuf>,
        #[arg(long, help = "Make a bare repository")]
        bare: bool,
        #[arg(long, help = "Mirror every ref of the source (implies --bare)")]
        mirror: bool,
    },
    #[command(
        name = "commit",
        about = "Record the index as a new commit",
        long_about = "Creates a commit from the index on top of HEAD. The identity comes from \
        GIT_AUTHOR_* / GIT_COMMITTER_* or user.name and user.email."
    )]
    Commit {
        #[arg(short, long, help = "The commit message")]
        message: String,
        #[arg(short, long, help = "Extended description, after a blank line")]
        description: Option<String>,
    },
    #[command(name = "config", about = "Get or set repository options")]
    Config {
        #[arg(long, value_name = "KEY", conflicts_with_all = ["key", "value"], help = "Print the value of a key")]
        get: Option<String>,
        #[arg(index = 1, requires = "value", help = "Key to set, as section[.subsection].name")]
        key: Option<String>,
        #[arg(index = 2, help = "Value to set")]
        value: Option<String>,
    },
    #[command(
        name = "remote",
        about = "Manage the set of tracked repositories",
        long_about = "Without a subcommand, lists the configured remotes. Remotes are only \
        recorded in the config; nothing is fetched."
    )]
    Remote {
        #[arg(short, long, global = true, help = "Show the url after each name")]
        verbose: bool,
        #[command(subcommand)]
        action: Option<RemoteCommands>,
    },
    #[command(name = "log", about = "Show recent commits from HEAD")]
    Log {
        #[arg(short = 'n', long = "max-count", default_value_t = DEFAULT_LOG_LIMIT)]
        limit: usize,
    },
    #[command(
        name = "rev-list",
        about = "List commits reachable from a commit, newest first"
    )]
    RevList {
        #[arg(index = 1, help = "Commit id, branch or other revision")]
        commit: String,
        #[arg(short = 'n', long = "max-count", help = "Limit the number of commits listed")]
        max_count: Option<usize>,
        #[arg(long, help = "Order by commit date only")]
        date_order: bool,
    },
    #[command(name = "status", about = "Show the working tree status")]
    Status,
    #[command(
        name = "hash-object",
        about = "Compute the object id of a file and optionally store it",
        long_about = "Hashes a file as a blob. With -w the blob is written to the object database."
    )]
    HashObject {
        #[arg(short, long, help = "Write the object to the object database")]
        write: bool,
        #[arg(index = 1)]
        file: PathBuf,
    },
    #[command(name = "cat-file", about = "Print an object's type, size or content")]
    CatFile {
        #[arg(short = 't', group = "mode", help = "Print the object type")]
        object_type: bool,
        #[arg(short = 's', group = "mode", help = "Print the object size")]
        size: bool,
        #[arg(short = 'p', group = "mode", help = "Pretty-print the object content")]
        pretty: bool,
        #[arg(index = 1, help = "Object id or revision")]
        object: String,
    },
    #[command(name = "write-tree", about = "Create tree objects from the index")]
    WriteTree,
}

#[derive(Subcommand)]
enum RemoteCommands {
    #[command(name = "add", about = "Add a remote named <name> for the repository at <url>")]
    Add {
        #[arg(short, long, value_name = "BRANCH", help = "Track only this branch")]
        track: Option<String>,
        #[arg(short, long, value_name = "BRANCH", help = "Point refs/remotes/<name>/HEAD at this branch")]
        master: Option<String>,
        #[arg(index = 1)]
        name: String,
        #[arg(index = 2)]
        url: String,
    },
    #[command(name = "list", about = "List the configured remotes")]
    List,
}

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));

    let result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    if let Err(error) = result {
        eprintln!("Log system initialization failed: {error}");
    }
}

fn current_dir() -> Result<PathBuf> {
    Ok(std::env::current_dir()?.canonicalize()?)
}

fn open_repository() -> Result<Repository> {
    Repository::discover(current_dir()?)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(match path.is_absolute() {
        true => path.to_path_buf(),
        false => current_dir()?.join(path),
    })
}

/// Page through `output` when stdout is a terminal and NO_PAGER is unset.
fn print_paged(output: &str) -> Result<()> {
    if std::env::var_os("NO_PAGER").is_some() || !std::io::stdout().is_terminal() {
        print!("{output}");
        return Ok(());
    }

    let pager = minus::Pager::new();
    let mut writer = PagerWriter::new(pager.clone());
    write!(writer, "{output}")?;
    minus::page_all(pager)?;

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { path, bare } => {
            let path = match path {
                Some(path) => absolute(&path)?,
                None => current_dir()?,
            };
            let repository = Repository::init(&path, bare)?;
            println!(
                "Initialized empty Git repository in {}/",
                repository.git_dir().display()
            );
        }
        Commands::Add { paths } => {
            let repository = open_repository()?;
            let paths = paths
                .iter()
                .map(|path| absolute(path))
                .collect::<Result<Vec<_>>>()?;
            repository.add(&paths).await?;
        }
        Commands::Checkout { target } => {
            let repository = open_repository()?;
            let ref_name = repository.checkout(&target).await?;

            match repository.refs().head_state()? {
                HeadState::Detached(oid) => {
                    eprint!("{DETACHMENT_NOTICE}");
                    let commit = repository.get_head_commit()?;
                    eprintln!(
                        "HEAD is now at {} {}",
                        oid.to_short_oid(),
                        commit.short_message()
                    );
                }
                _ => eprintln!(
                    "Switched to branch '{}'",
                    ref_name.trim_start_matches("refs/heads/")
                ),
            }
        }
        Commands::Clone {
            repository,
            directory,
            template,
            bare,
            mirror,
        } => {
            let options = CloneOptions {
                template: template.map(|template| absolute(&template)).transpose()?,
                bare,
                mirror,
            };
            let directory = match directory {
                Some(directory) => directory,
                None => default_clone_directory(&repository, options.is_bare())?,
            };
            let directory = absolute(&directory)?;

            eprintln!("Cloning into '{}'...", directory.display());
            Repository::clone_repository(&repository, &directory, &options).await?;
        }
        Commands::Commit {
            message,
            description,
        } => {
            let repository = open_repository()?;
            let state = repository.refs().head_state()?;
            let options = CommitOptions {
                message,
                description,
            };

            let commit_oid = repository.commit(&options)?;
            let commit = repository.database().load_commit(&commit_oid)?;
            let (branch, root) = match state {
                HeadState::Attached(branch) => (branch.to_string(), ""),
                HeadState::Unborn(branch) => (branch.to_string(), " (root-commit)"),
                HeadState::Detached(_) => ("detached HEAD".to_string(), ""),
            };
            println!(
                "[{branch}{root} {}] {}",
                commit_oid.to_short_oid(),
                commit.short_message()
            );
        }
        Commands::Config { get, key, value } => {
            let repository = open_repository()?;
            let options = ConfigOptions {
                get,
                set: key.zip(value),
            };
            let value = repository.config_command(&options)?;
            if options.get.is_some() {
                println!("{value}");
            }
        }
        Commands::Remote { verbose, action } => {
            let repository = open_repository()?;
            match action {
                Some(RemoteCommands::Add {
                    track,
                    master,
                    name,
                    url,
                }) => {
                    repository.remote_add(&name, &url, &RemoteAddOptions { track, master })?;
                }
                Some(RemoteCommands::List) | None => {
                    for remote in repository.remotes()? {
                        match (verbose, remote.url) {
                            (true, Some(url)) => {
                                println!("{}\t{url} (fetch)", remote.name);
                                println!("{}\t{url} (push)", remote.name);
                            }
                            _ => println!("{}", remote.name),
                        }
                    }
                }
            }
        }
        Commands::Log { limit } => {
            let repository = open_repository()?;
            let output = repository
                .log(limit)?
                .iter()
                .map(|entry| entry.render())
                .collect::<Vec<_>>()
                .join("\n");
            print_paged(&output)?;
        }
        Commands::RevList {
            commit,
            max_count,
            date_order,
        } => {
            let repository = open_repository()?;
            let options = RevListOptions {
                max_count,
                order: match date_order {
                    true => WalkOrder::Date,
                    false => WalkOrder::Topological,
                },
            };
            for oid in repository.rev_list(&commit, options)? {
                println!("{oid}");
            }
        }
        Commands::Status => {
            let repository = open_repository()?;
            let report = repository.status()?;
            for (category, line) in report.lines() {
                println!("{} {line}", category.colored_label());
            }
        }
        Commands::HashObject { write, file } => {
            let file = absolute(&file)?;
            let oid = match write {
                true => open_repository()?.hash_object(&file, true)?,
                false => hash_file(&file)?,
            };
            println!("{oid}");
        }
        Commands::CatFile {
            object_type,
            size,
            pretty: _,
            object,
        } => {
            let repository = open_repository()?;
            let mode = if object_type {
                CatFileMode::Type
            } else if size {
                CatFileMode::Size
            } else {
                CatFileMode::Pretty
            };
            std::io::stdout().write_all(&repository.cat_file(&object, mode)?)?;
        }
        Commands::WriteTree => {
            let repository = open_repository()?;
            println!("{}", repository.write_tree()?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            let code = RepositoryError::find(&error)
                .map(RepositoryError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}
