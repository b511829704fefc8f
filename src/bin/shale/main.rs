use anyhow::Result;

mod cli;
mod cmd_cleanup;
mod cmd_commit;
mod cmd_doctor;
mod cmd_init;
mod cmd_label;
mod cmd_list;
mod cmd_mounts;
mod cmd_prepare;
mod cmd_remove;
mod cmd_stat;
mod cmd_status;
mod cmd_usage;
mod cmd_view;
mod util;

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Init { path } => cmd_init::exec(path),
        cli::Cmd::Stat { path, key, json } => cmd_stat::exec(path, key, json),
        cli::Cmd::List {
            path,
            name,
            kind,
            parent,
            label,
            json,
        } => cmd_list::exec(path, name, kind, parent, label, json),
        cli::Cmd::Prepare {
            path,
            key,
            parent,
            label,
            json,
        } => cmd_prepare::exec(path, key, parent, label, json),
        cli::Cmd::View {
            path,
            key,
            parent,
            label,
            json,
        } => cmd_view::exec(path, key, parent, label, json),
        cli::Cmd::Mounts { path, key, json } => cmd_mounts::exec(path, key, json),
        cli::Cmd::Commit {
            path,
            key,
            name,
            label,
        } => cmd_commit::exec(path, key, name, label),
        cli::Cmd::Remove { path, key } => cmd_remove::exec(path, key),
        cli::Cmd::Usage { path, key, json } => cmd_usage::exec(path, key, json),
        cli::Cmd::Label {
            path,
            key,
            set,
            unset,
            json,
        } => cmd_label::exec(path, key, set, unset, json),
        cli::Cmd::Cleanup { path } => cmd_cleanup::exec(path),
        cli::Cmd::Doctor { path, json } => cmd_doctor::exec(path, json),
        cli::Cmd::Status { path, json } => cmd_status::exec(path, json),
    }
}
