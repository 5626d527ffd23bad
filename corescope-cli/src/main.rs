//! `corescope` command-line front end.

mod cli;

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use corescope_chem::NativeToolkit;
use corescope_engine::{
    analyze_cores, core_smarts_from_table, parse_smiles_records, EngineConfig, MatchOrchestrator,
    PatternLibrary, SessionSettings, SubsetRepository,
};
use corescope_table::{LoadPolicy, ResultTable};

use cli::{AnalyzeArgs, Cli, Command, InputOptions, MatchArgs, SortArgs};

fn main() -> ExitCode {
    let cli = cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Everything the commands work on, loaded once.
struct Session {
    orchestrator: MatchOrchestrator<NativeToolkit>,
    repo: SubsetRepository,
    library: PatternLibrary,
    table: Option<ResultTable>,
}

fn resolve_settings(inputs: &InputOptions) -> Result<SessionSettings> {
    let mut settings = SessionSettings {
        molecule_file: inputs.molecules.clone(),
        smarts_file: inputs.smarts.clone(),
        mdl_query_file: inputs.mdl.clone(),
        data_file: inputs.data.clone(),
    };
    if let Some(path) = &inputs.session {
        let saved = SessionSettings::load(path)
            .with_context(|| format!("reading session {}", path.display()))?;
        settings.merge_missing(saved);
    }
    if let Some(path) = &inputs.save_session {
        settings
            .save(path)
            .with_context(|| format!("writing session {}", path.display()))?;
    }
    Ok(settings)
}

fn load_session(inputs: &InputOptions) -> Result<Session> {
    let settings = resolve_settings(inputs)?;
    let config = EngineConfig {
        core_prefix: inputs.core_prefix.clone(),
        load_policy: if inputs.strict_table {
            LoadPolicy::Abort
        } else {
            LoadPolicy::SkipRow
        },
        ..EngineConfig::default()
    };
    let orchestrator = MatchOrchestrator::new(NativeToolkit, config);

    let mut repo = SubsetRepository::new();
    if let Some(path) = &settings.molecule_file {
        let text = read(path)?;
        let parsed = parse_smiles_records(&text, orchestrator.toolkit());
        for (line, e) in &parsed.failures {
            warn!(file = %path.display(), line, %e, "skipped molecule");
        }
        repo.add_records(parsed.records);
        info!(molecules = repo.len(), "molecules loaded");
    }

    let mut library = PatternLibrary::new(orchestrator.config().core_prefix.clone());
    if let Some(path) = &settings.smarts_file {
        library
            .read_smarts_file(path)
            .with_context(|| format!("reading SMARTS file {}", path.display()))?;
    }
    if let Some(path) = &settings.mdl_query_file {
        library
            .read_mdl_query_file(path)
            .with_context(|| format!("reading MDL query file {}", path.display()))?;
    }

    let table = match &settings.data_file {
        Some(path) => {
            let (table, report) = ResultTable::from_path(path, orchestrator.config().load_policy)
                .with_context(|| format!("loading data table {}", path.display()))?;
            if !report.anomalies.is_empty() {
                warn!(skipped = report.anomalies.len(), "malformed table rows skipped");
            }
            Some(table)
        }
        None => None,
    };

    Ok(Session {
        orchestrator,
        repo,
        library,
        table,
    })
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn run(cli: Cli) -> Result<()> {
    let mut session = load_session(&cli.inputs)?;
    match cli.command {
        Command::Match(args) => run_match(&mut session, &args),
        Command::Analyze(args) => run_analyze(&mut session, &args),
        Command::Sort(args) => run_sort(&session, &args),
        Command::Canon => {
            for rec in session.repo.records() {
                println!("{}\t{}", rec.canonical, rec.name);
            }
            Ok(())
        }
        Command::ExportSmarts { output } => {
            session.library.save_smarts_file(&output)?;
            Ok(())
        }
    }
}

fn run_match(session: &mut Session, args: &MatchArgs) -> Result<()> {
    let names: Vec<&str> = session.library.all_patterns().map(|p| p.name.as_str()).collect();
    let selection: Vec<usize> = if args.patterns.is_empty() {
        (0..names.len()).collect()
    } else {
        let mut picked = Vec::new();
        for wanted in &args.patterns {
            match names.iter().position(|n| n == wanted) {
                Some(i) => picked.push(i),
                None => bail!("no pattern named '{wanted}'"),
            }
        }
        picked
    };

    let (result, failures) = session.orchestrator.match_into_subsets(
        &mut session.repo,
        &session.library,
        &selection,
        !args.single,
    )?;
    for e in &failures {
        eprintln!("skipped: {e}");
    }

    let records = session.repo.records();
    println!("# matched: {}", result.matched.len());
    for &i in &result.matched {
        println!("{}\t{}", records[i].smiles, records[i].name);
    }
    if args.show_unmatched {
        println!("# unmatched: {}", result.unmatched.len());
        for &i in &result.unmatched {
            println!("{}\t{}", records[i].smiles, records[i].name);
        }
    }
    Ok(())
}

fn run_analyze(session: &mut Session, args: &AnalyzeArgs) -> Result<()> {
    let Some(table) = &session.table else {
        bail!("core analysis needs a data table (--data)");
    };
    if args.import_core_smarts {
        for (name, smarts) in core_smarts_from_table(table)? {
            session.library.add_smarts_definition(&name, &smarts, args.overwrite);
        }
    }

    let analysis = analyze_cores(&session.orchestrator, &session.repo, &session.library, table)?;
    for e in &analysis.failures {
        eprintln!("skipped: {e}");
    }
    info!(rows = analysis.rows_updated, "table rows updated");

    let csv = table.to_csv_string()?;
    match &args.output {
        Some(path) => fs::write(path, csv).with_context(|| format!("writing {}", path.display()))?,
        None => print!("{csv}"),
    }
    Ok(())
}

fn run_sort(session: &Session, args: &SortArgs) -> Result<()> {
    let Some(table) = &session.table else {
        bail!("sorting needs a data table (--data)");
    };
    let Some(col) = table.column_index_by_name(&args.column) else {
        bail!("no column named '{}'", args.column);
    };
    table.sort(col, !args.descending)?;
    print!("{}", table.to_csv_string()?);
    Ok(())
}
