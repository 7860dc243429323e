use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{Write, stdout};
use uuid::Uuid;

use crate::application::{AppContext, seed_demo_data};
use crate::config::Config;
use crate::domain::{
    BudgetPatch, BudgetPeriod, BudgetProgress, BudgetScope, Cents, DEFAULT_CATEGORIES, DateRange,
    NewBudget, NewTransaction, TransactionFilter, TransactionKind, TransactionPatch, TransactionSort, User,
    YearMonth, format_cents, parse_amount,
};
use crate::io::Exporter;

/// Pocketbook - Personal Finance Tracker
#[derive(Parser)]
#[command(name = "pocketbook")]
#[command(about = "Track income and expenses, set budgets and see where the money goes")]
#[command(version)]
pub struct Cli {
    /// Database file path (overrides POCKETBOOK_DATABASE)
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// Username or email to act as
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Account password
    #[arg(
        short,
        long,
        global = true,
        env = "POCKETBOOK_PASSWORD",
        hide_env_values = true
    )]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Create an account (uses --password for the new password)
    Register {
        /// Username (at least 3 characters)
        username: String,

        /// Email address for reset links and reminders
        #[arg(long)]
        email: String,
    },

    /// Check credentials
    Login,

    /// Change the password of the --user account
    Passwd {
        /// New password (at least 6 characters)
        #[arg(long)]
        new_password: String,
    },

    /// Send a password reset code to an email address
    ForgotPassword {
        /// Email address of the account
        email: String,
    },

    /// Set a new password using a reset code
    ResetPassword {
        /// Reset code from the notification
        token: String,

        /// New password (at least 6 characters)
        #[arg(long)]
        new_password: String,
    },

    /// Send the username of an account to its email address
    ForgotUsername {
        /// Email address of the account
        email: String,
    },

    /// Transaction commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Budget management commands
    #[command(subcommand)]
    Budget(BudgetCommands),

    /// Generate reports and analytics
    #[command(subcommand)]
    Report(ReportCommands),

    /// Savings goal commands
    #[command(subcommand)]
    Savings(SavingsCommands),

    /// Reset the demo account (demo / demo123) with sample data
    Seed,
}

/// Date window shared by listing, export and report commands.
#[derive(Args, Debug, Clone, Default)]
pub struct RangeArgs {
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,

    /// Calendar month (YYYY-MM)
    #[arg(long, conflicts_with_all = ["from", "to", "week"])]
    pub month: Option<String>,

    /// Week preset: this, last (weeks start on Monday)
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub week: Option<String>,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Record a transaction
    Add {
        /// Amount (e.g., "50.00" or "50")
        amount: String,

        /// Kind: expense, income
        #[arg(short, long, default_value = "expense")]
        kind: String,

        /// Category (defaults to "Other")
        #[arg(short, long)]
        category: Option<String>,

        /// Description
        #[arg(short, long)]
        description: Option<String>,

        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List transactions
    List {
        #[command(flatten)]
        range: RangeArgs,

        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,

        /// Filter by kind: expense, income
        #[arg(short, long)]
        kind: Option<String>,

        /// Sort: date_desc, date_asc, amount_desc, amount_asc, category_asc, category_desc
        #[arg(short, long, default_value = "date_desc")]
        sort: String,

        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Edit a transaction
    Edit {
        /// Transaction ID
        id: String,

        /// New amount
        #[arg(short, long)]
        amount: Option<String>,

        /// New kind: expense, income
        #[arg(short, long)]
        kind: Option<String>,

        /// New category
        #[arg(short, long)]
        category: Option<String>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,

        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a transaction
    Delete {
        /// Transaction ID
        id: String,
    },

    /// Export transactions
    Export {
        #[command(flatten)]
        range: RangeArgs,

        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json (json includes budgets and savings)
        #[arg(short, long, default_value = "csv")]
        format: String,
    },

    /// Show the suggested categories
    Categories,
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Create a budget
    Create {
        /// Spending limit (e.g., "400" or "400.00")
        amount: String,

        /// Category to limit (omit for an overall budget)
        #[arg(short, long)]
        category: Option<String>,

        /// Budget month (YYYY-MM, defaults to the current month)
        #[arg(long, conflicts_with_all = ["start", "end"])]
        month: Option<String>,

        /// Period start (YYYY-MM-DD)
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// Period end (YYYY-MM-DD)
        #[arg(long, requires = "start")]
        end: Option<String>,
    },

    /// List all budgets
    List,

    /// Edit a budget
    Edit {
        /// Budget ID
        id: String,

        /// New limit
        #[arg(short, long)]
        amount: Option<String>,

        /// New category
        #[arg(short, long, conflicts_with = "overall")]
        category: Option<String>,

        /// Make this an overall budget
        #[arg(long)]
        overall: bool,

        /// New period start (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// New period end (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },

    /// Delete a budget
    Delete {
        /// Budget ID
        id: String,
    },

    /// Show budget status (spending vs limit)
    Status {
        /// Budgets for exactly this month (YYYY-MM)
        #[arg(long, conflicts_with = "date")]
        month: Option<String>,

        /// Budgets active on this date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Expense totals per category
    Categories {
        #[command(flatten)]
        range: RangeArgs,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Income, expense and net per month
    Monthly {
        #[command(flatten)]
        range: RangeArgs,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Balance after each transaction
    Balance {
        #[command(flatten)]
        range: RangeArgs,

        /// Opening balance (defaults to everything before --from)
        #[arg(long)]
        opening: Option<String>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Total income, expense and net
    Summary {
        #[command(flatten)]
        range: RangeArgs,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum SavingsCommands {
    /// Show the savings goal
    Show,

    /// Set the savings target
    Target {
        /// Target amount
        amount: String,

        /// Deadline (YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<String>,
    },

    /// Add to the amount saved
    Contribute {
        /// Amount to add
        amount: String,
    },
}

impl Cli {
    pub async fn run(self, mut config: Config) -> Result<()> {
        if let Some(database) = &self.database {
            config.database_path = database.clone();
        }
        let database_path = config.database_path.clone();
        let ctx = AppContext::open(config).await?;

        match self.command {
            Commands::Init => {
                println!("Database initialized: {}", database_path);
            }

            Commands::Register { ref username, ref email } => {
                let password = self
                    .password
                    .as_deref()
                    .context("Choose a password with --password (or POCKETBOOK_PASSWORD)")?;
                let user = ctx.auth()?.register(username, email, password).await?;
                println!("Registered {} ({})", user.username, user.email);
            }

            Commands::Login => {
                let user = self.login(&ctx).await?;
                println!("Logged in as {} ({})", user.username, user.email);
            }

            Commands::Passwd { ref new_password } => {
                let user = self.login(&ctx).await?;
                let old_password = self.password.as_deref().unwrap_or_default();
                ctx.auth()?
                    .change_password(&user, old_password, new_password)
                    .await?;
                println!("Password changed.");
            }

            Commands::ForgotPassword { ref email } => {
                ctx.auth()?.request_password_reset(email).await;
                println!("If an account uses that email, a reset code is on its way.");
            }

            Commands::ResetPassword {
                ref token,
                ref new_password,
            } => {
                ctx.auth()?.consume_reset_token(token, new_password).await?;
                println!("Password updated. You can log in now.");
            }

            Commands::ForgotUsername { ref email } => {
                ctx.auth()?.request_username_reminder(email).await;
                println!("If an account uses that email, its username is on its way.");
            }

            Commands::Tx(TxCommands::Categories) => print_categories(),

            Commands::Tx(ref tx_cmd) => {
                let user = self.login(&ctx).await?;
                run_tx_command(&ctx, &user, tx_cmd).await?;
            }

            Commands::Budget(ref budget_cmd) => {
                let user = self.login(&ctx).await?;
                run_budget_command(&ctx, &user, budget_cmd).await?;
            }

            Commands::Report(ref report_cmd) => {
                let user = self.login(&ctx).await?;
                run_report_command(&ctx, &user, report_cmd).await?;
            }

            Commands::Savings(ref savings_cmd) => {
                let user = self.login(&ctx).await?;
                run_savings_command(&ctx, &user, savings_cmd).await?;
            }

            Commands::Seed => {
                let report = seed_demo_data(&ctx).await?;
                if report.created_user {
                    println!("Created demo user with password 'demo123'");
                } else {
                    println!("Demo user already exists");
                }
                println!(
                    "Seeded {} transactions and {} budgets.",
                    report.transactions, report.budgets
                );
            }
        }

        Ok(())
    }

    async fn login(&self, ctx: &AppContext) -> Result<User> {
        let (Some(user), Some(password)) = (self.user.as_deref(), self.password.as_deref()) else {
            anyhow::bail!("This command needs --user and --password (or POCKETBOOK_PASSWORD)");
        };
        Ok(ctx.auth()?.authenticate(user, password).await?)
    }
}

fn print_categories() {
    for category in DEFAULT_CATEGORIES {
        println!("{}", category);
    }
}

async fn run_tx_command(ctx: &AppContext, user: &User, cmd: &TxCommands) -> Result<()> {
    let service = ctx.transactions();

    match cmd {
        TxCommands::Add {
            amount,
            kind,
            category,
            description,
            date,
        } => {
            let input = NewTransaction {
                date: match date {
                    Some(date) => parse_date(date)?,
                    None => ctx.clock.today(),
                },
                kind: parse_kind(kind)?,
                category: category.clone().unwrap_or_default(),
                description: description.clone().unwrap_or_default(),
                amount_cents: parse_money(amount)?,
            };
            let tx = service.create(user.id, input).await?;
            println!(
                "Recorded {}: {} {} on {} ({})",
                tx.kind,
                format_cents(tx.amount_cents),
                tx.category,
                tx.date,
                tx.id
            );
        }

        TxCommands::List {
            range,
            category,
            kind,
            sort,
            limit,
        } => {
            let filter = TransactionFilter {
                range: resolve_range(range, ctx.clock.today())?,
                category: category.clone(),
                kind: kind.as_deref().map(parse_kind).transpose()?,
                limit: *limit,
            };
            let sort: TransactionSort = sort.parse().map_err(|e| {
                anyhow::anyhow!(
                    "{}. Valid: date_desc, date_asc, amount_desc, amount_asc, category_asc, category_desc",
                    e
                )
            })?;

            let transactions = service.list(user.id, &filter, sort).await?;
            if transactions.is_empty() {
                println!("No transactions found.");
            } else {
                println!(
                    "{:<36} {:<10} {:<8} {:<15} {:<25} {:>12}",
                    "ID", "DATE", "KIND", "CATEGORY", "DESCRIPTION", "AMOUNT"
                );
                println!("{}", "-".repeat(111));
                for tx in transactions {
                    println!(
                        "{:<36} {:<10} {:<8} {:<15} {:<25} {:>12}",
                        tx.id,
                        tx.date,
                        tx.kind,
                        truncate(&tx.category, 15),
                        truncate(&tx.description, 25),
                        format_cents(tx.signed_amount())
                    );
                }
            }
        }

        TxCommands::Edit {
            id,
            amount,
            kind,
            category,
            description,
            date,
        } => {
            let patch = TransactionPatch {
                date: date.as_deref().map(parse_date).transpose()?,
                kind: kind.as_deref().map(parse_kind).transpose()?,
                category: category.clone(),
                description: description.clone(),
                amount_cents: amount.as_deref().map(parse_money).transpose()?,
            };
            if patch.is_empty() {
                anyhow::bail!("Nothing to change. Pass at least one of --amount, --kind, --category, --description, --date");
            }
            let tx = service.update(user.id, parse_id(id)?, patch).await?;
            println!(
                "Updated transaction {}: {} {} {} on {}",
                tx.id,
                tx.kind,
                format_cents(tx.amount_cents),
                tx.category,
                tx.date
            );
        }

        TxCommands::Delete { id } => {
            let id = parse_id(id)?;
            service.delete(user.id, id).await?;
            println!("Deleted transaction {}", id);
        }

        TxCommands::Export {
            range,
            category,
            output,
            format,
        } => {
            let exporter = Exporter::new(ctx);
            let writer: Box<dyn Write> = match output {
                Some(path) => {
                    let file = File::create(path)
                        .with_context(|| format!("Failed to create output file: {}", path))?;
                    Box::new(file)
                }
                None => Box::new(stdout()),
            };

            match format.as_str() {
                "csv" => {
                    let filter = TransactionFilter {
                        range: resolve_range(range, ctx.clock.today())?,
                        category: category.clone(),
                        ..TransactionFilter::default()
                    };
                    let count = exporter.transactions_csv(user.id, &filter, writer).await?;
                    if output.is_some() {
                        eprintln!("Exported {} transactions", count);
                    }
                }
                "json" => {
                    let snapshot = exporter.user_json(user.id, writer).await?;
                    if output.is_some() {
                        eprintln!(
                            "Exported {} transactions and {} budgets",
                            snapshot.transactions.len(),
                            snapshot.budgets.len()
                        );
                    }
                }
                _ => anyhow::bail!("Invalid export format '{}'. Valid formats: csv, json", format),
            }
        }

        TxCommands::Categories => print_categories(),
    }

    Ok(())
}

async fn run_budget_command(ctx: &AppContext, user: &User, cmd: &BudgetCommands) -> Result<()> {
    let service = ctx.budgets();

    match cmd {
        BudgetCommands::Create {
            amount,
            category,
            month,
            start,
            end,
        } => {
            let period = match (month, start, end) {
                (Some(month), _, _) => BudgetPeriod::month(parse_month(month)?),
                (None, Some(start), Some(end)) => BudgetPeriod::new(parse_date(start)?, parse_date(end)?),
                _ => BudgetPeriod::month(YearMonth::of(ctx.clock.today())),
            };
            let budget = service
                .create_budget(
                    user.id,
                    NewBudget {
                        scope: BudgetScope::from_category(category.as_deref()),
                        period,
                        limit_cents: parse_money(amount)?,
                    },
                )
                .await?;
            println!(
                "Created budget: {} {} from {} to {} ({})",
                budget.scope,
                format_cents(budget.limit_cents),
                budget.period.start,
                budget.period.end,
                budget.id
            );
        }

        BudgetCommands::List => {
            let budgets = service.list_budgets(user.id).await?;
            if budgets.is_empty() {
                println!("No budgets found.");
            } else {
                println!(
                    "{:<36} {:<15} {:<10} {:<10} {:>12}",
                    "ID", "SCOPE", "START", "END", "LIMIT"
                );
                println!("{}", "-".repeat(87));
                for budget in budgets {
                    println!(
                        "{:<36} {:<15} {:<10} {:<10} {:>12}",
                        budget.id,
                        truncate(&budget.scope.to_string(), 15),
                        budget.period.start,
                        budget.period.end,
                        format_cents(budget.limit_cents)
                    );
                }
            }
        }

        BudgetCommands::Edit {
            id,
            amount,
            category,
            overall,
            start,
            end,
        } => {
            let scope = if *overall {
                Some(BudgetScope::Overall)
            } else {
                category
                    .as_deref()
                    .map(|c| BudgetScope::from_category(Some(c)))
            };
            let patch = BudgetPatch {
                scope,
                period_start: start.as_deref().map(parse_date).transpose()?,
                period_end: end.as_deref().map(parse_date).transpose()?,
                limit_cents: amount.as_deref().map(parse_money).transpose()?,
            };
            let budget = service.update_budget(user.id, parse_id(id)?, patch).await?;
            println!(
                "Updated budget {}: {} {} from {} to {}",
                budget.id,
                budget.scope,
                format_cents(budget.limit_cents),
                budget.period.start,
                budget.period.end
            );
        }

        BudgetCommands::Delete { id } => {
            let id = parse_id(id)?;
            service.delete_budget(user.id, id).await?;
            println!("Deleted budget {}", id);
        }

        BudgetCommands::Status { month, date } => {
            let progress = match (month, date) {
                (Some(month), _) => {
                    service
                        .compute(user.id, BudgetPeriod::month(parse_month(month)?))
                        .await?
                }
                (None, Some(date)) => service.compute_active(user.id, parse_date(date)?).await?,
                (None, None) => service.compute_active(user.id, ctx.clock.today()).await?,
            };
            print_budget_status(&progress);
        }
    }

    Ok(())
}

fn print_budget_status(progress: &[BudgetProgress]) {
    if progress.is_empty() {
        println!("No budgets found.");
        return;
    }

    println!(
        "{:<15} {:<23} {:>12} {:>12} {:>12} {:>8}",
        "SCOPE", "PERIOD", "LIMIT", "SPENT", "REMAINING", "USED"
    );
    println!("{}", "-".repeat(87));
    for p in progress {
        println!(
            "{:<15} {:<23} {:>12} {:>12} {:>12} {:>7.1}%{}",
            truncate(&p.budget.scope.to_string(), 15),
            format!("{} - {}", p.budget.period.start, p.budget.period.end),
            format_cents(p.budget.limit_cents),
            format_cents(p.spent),
            format_cents(p.remaining),
            p.display_percent(),
            if p.is_over_budget() { "  OVER" } else { "" }
        );
    }
}

async fn run_report_command(ctx: &AppContext, user: &User, cmd: &ReportCommands) -> Result<()> {
    let service = ctx.reports();
    let today = ctx.clock.today();

    match cmd {
        ReportCommands::Categories { range, format } => {
            let range = resolve_range(range, today)?;
            let breakdown = service.category_breakdown(user.id, range).await?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&breakdown)?);
                return Ok(());
            }

            println!("Spending by Category");
            println!("Period: {}", describe_range(&range));
            println!();
            if breakdown.is_empty() {
                println!("No expenses in this period.");
                return Ok(());
            }
            println!("{:<20} {:>12} {:>8}", "CATEGORY", "TOTAL", "PERCENT");
            println!("{}", "-".repeat(42));
            for (category, amount) in breakdown.largest_first() {
                println!(
                    "{:<20} {:>12} {:>7.1}%",
                    truncate(category, 20),
                    format_cents(amount),
                    breakdown.share(category)
                );
            }
            println!("{}", "-".repeat(42));
            println!("{:<20} {:>12}", "TOTAL", format_cents(breakdown.total));
        }

        ReportCommands::Monthly { range, format } => {
            let range = resolve_range(range, today)?;
            let months = service.monthly_net(user.id, range).await?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&months)?);
                return Ok(());
            }

            println!("Monthly Net");
            println!();
            if months.is_empty() {
                println!("No transactions in this period.");
                return Ok(());
            }
            println!(
                "{:<8} {:>12} {:>12} {:>12}",
                "MONTH", "INCOME", "EXPENSE", "NET"
            );
            println!("{}", "-".repeat(47));
            for month in &months {
                println!(
                    "{:<8} {:>12} {:>12} {:>12}",
                    month.month,
                    format_cents(month.income),
                    format_cents(month.expense),
                    format_cents(month.net)
                );
            }
        }

        ReportCommands::Balance {
            range,
            opening,
            format,
        } => {
            let range = resolve_range(range, today)?;
            let opening = opening.as_deref().map(parse_money).transpose()?;
            let points = service.running_balance(user.id, range, opening).await?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&points)?);
                return Ok(());
            }

            println!("Running Balance");
            println!("Period: {}", describe_range(&range));
            println!();
            if points.is_empty() {
                println!("No transactions in this period.");
                return Ok(());
            }
            println!("{:<10} {:<36} {:>12}", "DATE", "TRANSACTION", "BALANCE");
            println!("{}", "-".repeat(60));
            for point in &points {
                println!(
                    "{:<10} {:<36} {:>12}",
                    point.date,
                    point.transaction_id,
                    format_cents(point.balance)
                );
            }
        }

        ReportCommands::Summary { range, format } => {
            let range = resolve_range(range, today)?;
            let totals = service.summary(user.id, range).await?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&totals)?);
                return Ok(());
            }

            println!("Summary");
            println!("Period: {}", describe_range(&range));
            println!();
            println!("Total Income:   {:>15}", format_cents(totals.income));
            println!("Total Expense:  {:>15}", format_cents(totals.expense));
            println!("{}", "-".repeat(32));
            println!("Net:            {:>15}", format_cents(totals.net));
        }
    }

    Ok(())
}

async fn run_savings_command(ctx: &AppContext, user: &User, cmd: &SavingsCommands) -> Result<()> {
    let service = ctx.savings();

    let goal = match cmd {
        SavingsCommands::Show => service.get_or_create(user.id).await?,
        SavingsCommands::Target { amount, deadline } => {
            let deadline = deadline.as_deref().map(parse_date).transpose()?;
            service
                .set_target(user.id, parse_money(amount)?, deadline)
                .await?
        }
        SavingsCommands::Contribute { amount } => {
            service
                .add_contribution(user.id, parse_money(amount)?)
                .await?
        }
    };

    println!("Savings goal: {}", goal.name);
    println!("  Target:   {:>12}", format_cents(goal.target_cents));
    println!("  Saved:    {:>12}", format_cents(goal.current_cents));
    println!("  Progress: {:>11.1}%", goal.percent());
    if let Some(deadline) = goal.deadline {
        println!("  Deadline: {:>12}", deadline);
    }
    if goal.is_reached() {
        println!("  Goal reached!");
    }

    Ok(())
}

fn resolve_range(args: &RangeArgs, today: NaiveDate) -> Result<DateRange> {
    if let Some(month) = &args.month {
        return Ok(DateRange::month(parse_month(month)?));
    }
    if let Some(week) = &args.week {
        return match week.as_str() {
            "this" => Ok(DateRange::this_week(today)),
            "last" => Ok(DateRange::last_week(today)),
            _ => anyhow::bail!("Invalid week '{}'. Valid: this, last", week),
        };
    }
    Ok(DateRange {
        from: args.from.as_deref().map(parse_date).transpose()?,
        to: args.to.as_deref().map(parse_date).transpose()?,
    })
}

fn describe_range(range: &DateRange) -> String {
    match (range.from, range.to) {
        (Some(from), Some(to)) => format!("{} to {}", from, to),
        (Some(from), None) => format!("from {}", from),
        (None, Some(to)) => format!("until {}", to),
        (None, None) => "all time".to_string(),
    }
}

fn parse_money(amount: &str) -> Result<Cents> {
    parse_amount(amount)
        .with_context(|| format!("Invalid amount '{}'. Use '50.00' or '50'", amount))
}

fn parse_kind(kind: &str) -> Result<TransactionKind> {
    kind.parse()
        .map_err(|e| anyhow::anyhow!("{}. Valid kinds: expense, income", e))
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id.trim()).context("Invalid ID format (expected UUID)")
}

fn parse_month(month: &str) -> Result<YearMonth> {
    month
        .parse()
        .map_err(|e| anyhow::anyhow!("{}. Use YYYY-MM", e))
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD", date_str))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    #[test]
    fn test_resolve_range_presets() {
        let month = RangeArgs {
            month: Some("2024-02".into()),
            ..RangeArgs::default()
        };
        let range = resolve_range(&month, today()).unwrap();
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(range.to, NaiveDate::from_ymd_opt(2024, 2, 29));

        let week = RangeArgs {
            week: Some("last".into()),
            ..RangeArgs::default()
        };
        let range = resolve_range(&week, today()).unwrap();
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2024, 3, 4));
        assert_eq!(range.to, NaiveDate::from_ymd_opt(2024, 3, 10));

        assert_eq!(
            resolve_range(&RangeArgs::default(), today()).unwrap(),
            DateRange::all()
        );
    }

    #[test]
    fn test_resolve_range_rejects_bad_input() {
        let bad_week = RangeArgs {
            week: Some("next".into()),
            ..RangeArgs::default()
        };
        assert!(resolve_range(&bad_week, today()).is_err());

        let bad_date = RangeArgs {
            from: Some("14/03/2024".into()),
            ..RangeArgs::default()
        };
        assert!(resolve_range(&bad_date, today()).is_err());
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("Groceries", 20), "Groceries");
        assert_eq!(truncate("Café et croissants", 8), "Café ...");
    }

    #[test]
    fn test_cli_parses_global_credentials() {
        let cli = Cli::try_parse_from([
            "pocketbook",
            "tx",
            "add",
            "12.50",
            "--category",
            "Food",
            "--user",
            "alice",
            "--password",
            "secret1",
        ])
        .unwrap();
        assert_eq!(cli.user.as_deref(), Some("alice"));
        assert!(matches!(cli.command, Commands::Tx(TxCommands::Add { .. })));
    }
}
