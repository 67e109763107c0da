use clap::Args;
use collections_strategy::accounts::{load_accounts_from_path, reapply_all, Account};
use collections_strategy::error::AppError;
use collections_strategy::strategy::{PriorityScale, RuleSet, StrategyGraph};
use std::fmt::Write as _;
use std::fs::File;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ClassifyArgs {
    /// Accounts to classify (CSV, or JSON when the file ends in .json)
    #[arg(long)]
    pub(crate) accounts: PathBuf,
    /// JSON rule list replacing the standard rules
    #[arg(long)]
    pub(crate) rules: Option<PathBuf>,
    /// Print evaluated accounts as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Strategy graph document (JSON)
    #[arg(long)]
    pub(crate) strategy: PathBuf,
    /// Accounts to evaluate (CSV, or JSON when the file ends in .json)
    #[arg(long)]
    pub(crate) accounts: PathBuf,
    /// Print evaluated accounts as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Strategy graph document (JSON)
    #[arg(long)]
    pub(crate) strategy: PathBuf,
}

pub(crate) fn run_classify(args: ClassifyArgs) -> Result<(), AppError> {
    let rules = match &args.rules {
        Some(path) => RuleSet::from_reader(File::open(path)?)?,
        None => RuleSet::standard(),
    };
    let accounts = load_accounts_from_path(&args.accounts)?;
    let evaluated = reapply_all(&accounts, &rules);
    print!("{}", render_accounts(&evaluated, args.json)?);
    Ok(())
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let graph = StrategyGraph::from_path(&args.strategy)?;
    let accounts = load_accounts_from_path(&args.accounts)?;
    let evaluated = reapply_all(&accounts, &graph);
    print!("{}", render_accounts(&evaluated, args.json)?);
    Ok(())
}

pub(crate) fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let graph = StrategyGraph::from_path(&args.strategy)?;
    print!("{}", render_validation(&graph));
    Ok(())
}

pub(crate) fn render_accounts(accounts: &[Account], json: bool) -> Result<String, AppError> {
    if json {
        let mut body = serde_json::to_string_pretty(accounts).map_err(std::io::Error::from)?;
        body.push('\n');
        return Ok(body);
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<14} {:>14} {:>6} {:>9}  {:<10} NEXT ACTION",
        "ACCOUNT", "BALANCE", "DAYS", "PRIORITY", "STATE"
    );
    for account in accounts {
        let priority = match (account.priority, account.priority_scale) {
            (Some(value), Some(PriorityScale::LowerIsUrgent)) => format!("{value} (lo)"),
            (Some(value), Some(PriorityScale::HigherIsUrgent)) => format!("{value} (hi)"),
            (Some(value), None) => value.to_string(),
            (None, _) => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "{:<14} {:>14} {:>6} {:>9}  {:<10} {}",
            account.account_number,
            account
                .outstanding_balance
                .map(|balance| format!("{balance:.2}"))
                .unwrap_or_else(|| "-".to_string()),
            account
                .days_in_arrears
                .map(|days| format!("{days}"))
                .unwrap_or_else(|| "-".to_string()),
            priority,
            account
                .delinquency_state
                .map(|state| state.label())
                .unwrap_or("-"),
            account.next_action.as_deref().unwrap_or("-"),
        );
    }
    let _ = writeln!(out, "{} account(s)", accounts.len());
    Ok(out)
}

pub(crate) fn render_validation(graph: &StrategyGraph) -> String {
    let mut out = String::new();
    let entry = graph
        .entry_node()
        .map(|node| node.id.to_string())
        .unwrap_or_else(|| "none".to_string());
    let _ = writeln!(out, "{} node(s), entry: {}", graph.nodes().len(), entry);

    let issues = graph.validate();
    if issues.is_empty() {
        let _ = writeln!(out, "no issues found");
    } else {
        for issue in &issues {
            let _ = writeln!(out, "- {}", issue.summary());
        }
        let _ = writeln!(out, "{} issue(s)", issues.len());
    }
    out
}
