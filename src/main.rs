use clap::Parser;
use colored::Colorize;
use git_haul::classify;
use git_haul::cli::{self, Cli, Target};
use git_haul::config::Config;
use git_haul::constants::INTERRUPTED_EXIT_CODE;
use git_haul::github::{self, Listing};
use git_haul::interrupt::CancelToken;
use git_haul::output::{self, OutputSink, Reporter};
use git_haul::repo::SyncLayout;
use git_haul::runner::SystemRunner;
use git_haul::ssh;
use git_haul::sync::{self, AssumeYes, Confirm, PromptConfirm, SyncContext};
use std::process::ExitCode;
use std::time::Instant;

enum RunEnd {
    Completed,
    Interrupted,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.config();
    let sink = OutputSink::spawn(&config);

    let result = run(&cli, &config, sink.reporter());
    sink.finish();

    match result {
        Ok(RunEnd::Completed) => ExitCode::SUCCESS,
        Ok(RunEnd::Interrupted) => {
            eprintln!("\n{}", "Interrupted by user".red().bold());
            ExitCode::from(INTERRUPTED_EXIT_CODE as u8)
        }
        Err(e) => {
            eprintln!("{} {:#}", "FATAL:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, config: &Config, reporter: &Reporter) -> anyhow::Result<RunEnd> {
    let target = Target::parse(&cli.target)?;
    let org = target.resolve_org(cli.org.as_deref())?;
    let root = cli::resolve_root(&cli.local_root)?;
    let runner = SystemRunner;

    if !cli.skip_ssh_check {
        let stream = ssh::verify_access(&runner, &target.user, &target.alias)?;
        reporter.success(format!(
            "SSH authentication to {} verified for user {} (message in {})",
            target.alias, target.user, stream
        ));
    }

    let listing = match org.as_deref() {
        Some(org) => {
            reporter.info(format!(
                "{} {}{} {}{} {}",
                "Listing repositories for organization".cyan().bold(),
                org.white().bold(),
                ", authenticating as user".cyan().bold(),
                target.user.white().bold(),
                " via SSH alias".cyan().bold(),
                target.alias.white().bold(),
            ));
            Listing::Org(org)
        }
        None => {
            reporter.info(format!(
                "{} {}{} {}",
                "Listing repositories for user".cyan().bold(),
                target.user.white().bold(),
                ", authenticating via SSH alias".cyan().bold(),
                target.alias.white().bold(),
            ));
            Listing::User(&target.user)
        }
    };
    let repos = github::list_repositories(&listing)?;
    if repos.is_empty() {
        anyhow::bail!("No repositories found for this user or organization.");
    }

    let cancel = CancelToken::new();
    cancel.install_ctrlc()?;
    let pool = sync::worker_pool(config)?;
    let ctx = SyncContext {
        runner: &runner,
        config,
        reporter,
        cancel: &cancel,
        pool: &pool,
    };
    let layout = SyncLayout::new(&root, target.alias.as_str());

    reporter.info(format!(
        "{} {}",
        "Working in:".cyan(),
        root.display().to_string().white().bold()
    ));
    reporter.flush();

    let Some(records) = classify::classify_all(&repos, &layout, &ctx) else {
        return Ok(RunEnd::Interrupted);
    };
    reporter.info(output::format_status_table(
        "Initial Repository Status Summary",
        &records,
    ));

    let prompt = PromptConfirm::new(&cancel);
    let confirm: &dyn Confirm = if config.assume_yes {
        &AssumeYes
    } else {
        &prompt
    };
    let started = Instant::now();
    let results = sync::reconcile(&records, &ctx, confirm);

    if config.is_quiet() {
        reporter.flush();
        println!("{}", output::format_quiet_summary(&results));
    } else if !results.is_empty() {
        reporter.info(output::format_action_summary(&results, started.elapsed()));
    }
    if cancel.is_cancelled() {
        return Ok(RunEnd::Interrupted);
    }

    reporter.flush();
    let Some(post) = classify::classify_all(&repos, &layout, &ctx) else {
        return Ok(RunEnd::Interrupted);
    };
    reporter.info(output::format_status_table(
        "Post-Action Repository Status Summary",
        &post,
    ));
    reporter.success("All done.");

    Ok(RunEnd::Completed)
}
