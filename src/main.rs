use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use installments::config::{
    config_dir, load_accounts, load_clients, load_config, load_state, save_state, Config,
    ACCOUNTS_TEMPLATE, CLIENTS_TEMPLATE, CONFIG_TEMPLATE,
};
use installments::error::{LedgerError, Result};
use installments::ledger::{
    create_entry, edit_plan_amount, update_entry_terms, EntryDraft, EntryId, EntryKind,
    Installment, LedgerEntry, LedgerStore, TermsChange,
};
use installments::money::{format_currency, format_date, parse_currency, LocaleConfig, Money};
use installments::payment::{
    Balance, PaymentEntry, PaymentGateway, PaymentMethod, PaymentReconciler, PaymentRequest,
};
use installments::plan::{self, compute_balance, EditWarning, PlanInputs};

#[derive(Parser)]
#[command(name = "installments")]
#[command(
    version,
    about = "Installment plans and payment reconciliation for collection contracts",
    long_about = None
)]
struct Cli {
    /// Path to config directory (default: XDG config dir or ~/.installments)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with template files
    Init,

    /// List configured clients
    Clients,

    /// List settlement accounts and their balances
    Accounts,

    /// Show ledger status
    Status,

    /// Preview an installment plan without saving anything
    Simulate {
        /// Total value (e.g., 1.234,56)
        #[arg(long)]
        total: String,

        /// Down payment excluded from the plan
        #[arg(long, default_value = "0")]
        down_payment: String,

        /// Number of installments
        #[arg(long)]
        installments: i64,

        /// Issue date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Open a new debit or credit entry for a client
    Add {
        /// Client identifier from clients.toml
        #[arg(short, long)]
        client: String,

        /// debit (client owes) or credit (company owes)
        #[arg(short, long, default_value = "debit")]
        kind: String,

        /// Free-form description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Total value (e.g., 1.234,56)
        #[arg(long)]
        total: String,

        /// Down payment excluded from the plan
        #[arg(long, default_value = "0")]
        down_payment: String,

        /// Number of installments (default from config.toml)
        #[arg(short, long)]
        installments: Option<u32>,

        /// Issue date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Change the terms of an entry and regenerate its plan
    Terms {
        /// Entry id
        entry: EntryId,

        #[arg(long)]
        total: Option<String>,

        #[arg(long)]
        down_payment: Option<String>,

        #[arg(short, long)]
        installments: Option<u32>,

        /// Issue date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// List entries
    List {
        /// Number of entries to show (default: all)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the installment plan of an entry
    Plan {
        /// Entry id
        entry: EntryId,
    },

    /// Change the amount of one installment; the last one absorbs the difference
    EditInstallment {
        /// Entry id
        entry: EntryId,

        /// Installment number (1-based)
        number: u32,

        /// New amount (e.g., 40,00)
        amount: String,
    },

    /// Record a payment against an installment or a single-payment entry
    Pay {
        /// Installment id or single-payment entry id
        target: EntryId,

        /// Payment amount
        amount: String,

        /// Settlement account from accounts.toml
        #[arg(short, long)]
        account: Option<String>,

        /// pix, cash, bank-transfer, credit-card, debit-card, boleto or other
        #[arg(short, long, default_value = "pix")]
        method: String,

        /// Payment date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,

        #[arg(short, long, default_value = "")]
        notes: String,
    },

    /// Change the amount (and optionally the date) of a recorded payment
    EditPayment {
        /// Payment id
        payment: u32,

        /// New amount
        amount: String,

        /// New date (YYYY-MM-DD, default: keep)
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a recorded payment
    RemovePayment {
        /// Payment id
        payment: u32,
    },

    /// Show payment history for an entry or installment
    Payments {
        /// Entry id or installment id
        target: EntryId,
    },

    /// Print an entry with its plan and payments as JSON
    Export {
        /// Entry id
        entry: EntryId,
    },
}

fn main() {
    installments::init_tracing();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Clients => cmd_clients(&cfg_dir),
        Commands::Accounts => cmd_accounts(&cfg_dir),
        Commands::Status => cmd_status(&cfg_dir),
        Commands::Simulate {
            total,
            down_payment,
            installments,
            date,
        } => cmd_simulate(&cfg_dir, &total, &down_payment, installments, date),
        Commands::Add {
            client,
            kind,
            description,
            total,
            down_payment,
            installments,
            date,
        } => cmd_add(
            &cfg_dir,
            &client,
            &kind,
            description,
            &total,
            &down_payment,
            installments,
            date,
        ),
        Commands::Terms {
            entry,
            total,
            down_payment,
            installments,
            date,
        } => cmd_terms(&cfg_dir, entry, total, down_payment, installments, date),
        Commands::List { limit } => cmd_list(&cfg_dir, limit),
        Commands::Plan { entry } => cmd_plan(&cfg_dir, entry),
        Commands::EditInstallment {
            entry,
            number,
            amount,
        } => cmd_edit_installment(&cfg_dir, entry, number, &amount),
        Commands::Pay {
            target,
            amount,
            account,
            method,
            date,
            notes,
        } => cmd_pay(&cfg_dir, target, &amount, account, &method, date, notes),
        Commands::EditPayment {
            payment,
            amount,
            date,
        } => cmd_edit_payment(&cfg_dir, payment, &amount, date),
        Commands::RemovePayment { payment } => cmd_remove_payment(&cfg_dir, payment),
        Commands::Payments { target } => cmd_payments(&cfg_dir, target),
        Commands::Export { entry } => cmd_export(&cfg_dir, entry),
    }
}

fn ensure_initialized(cfg_dir: &Path) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(LedgerError::ConfigNotFound(cfg_dir.to_path_buf()));
    }
    Ok(())
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| LedgerError::InvalidDate(value.to_string()))
}

fn date_or_today(value: Option<String>, config: &Config) -> Result<NaiveDate> {
    match value {
        Some(s) => parse_date(&s),
        None => Ok(config.company.today()),
    }
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    use std::fs;

    if cfg_dir.exists() {
        return Err(LedgerError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;
    fs::write(cfg_dir.join("clients.toml"), CLIENTS_TEMPLATE)?;
    fs::write(cfg_dir.join("accounts.toml"), ACCOUNTS_TEMPLATE)?;

    println!("Initialized installments config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit your company details:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!(
        "  2. Add your clients:           $EDITOR {}/clients.toml",
        cfg_dir.display()
    );
    println!(
        "  3. Configure accounts:         $EDITOR {}/accounts.toml",
        cfg_dir.display()
    );
    println!();
    println!("Then open your first entry:");
    println!("  installments add --client <client-id> --total <amount> --installments <n>");

    Ok(())
}

// Table row structs for tabled
#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "DOCUMENT")]
    document: String,
}

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "BALANCE")]
    balance: String,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "CLIENT")]
    client: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
    #[tabled(rename = "PLAN")]
    plan: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

#[derive(Tabled)]
struct InstallmentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "#")]
    number: u32,
    #[tabled(rename = "DUE")]
    due: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
    #[tabled(rename = "PAID")]
    paid: String,
    #[tabled(rename = "BALANCE")]
    balance: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

#[derive(Tabled)]
struct PaymentRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "FOR")]
    parent: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
    #[tabled(rename = "METHOD")]
    method: String,
    #[tabled(rename = "ACCOUNT")]
    account: String,
    #[tabled(rename = "NOTES")]
    notes: String,
}

/// Append TOTAL / PAID / OUTSTANDING rows under the money column of a
/// rounded table. Columns left of `amount_col` are merged into the label
/// cell and columns to its right are closed off.
fn add_financial_footer(table: &str, amount_col: usize, rows: &[(&str, String)]) -> String {
    let lines: Vec<&str> = table.lines().collect();
    if lines.len() < 4 || rows.is_empty() {
        return table.to_string();
    }

    // Parse the top border to discover column widths
    let Some(inner) = lines[0]
        .strip_prefix('╭')
        .and_then(|s| s.strip_suffix('╮'))
    else {
        return table.to_string();
    };

    let widths: Vec<usize> = inner.split('┬').map(|p| p.chars().count()).collect();
    if amount_col == 0 || widths.len() <= amount_col {
        return table.to_string();
    }

    let left = &widths[..amount_col];
    let left_width = left.iter().sum::<usize>() + left.len() - 1;
    let amount_width = widths[amount_col];
    let tail = &widths[amount_col + 1..];

    let join = |ws: &[usize]| -> String {
        ws.iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("┴")
    };

    let mut out = lines[..lines.len() - 1].join("\n");
    out.push('\n');

    out.push_str(&format!("├{}┼{}", join(left), "─".repeat(amount_width)));
    if tail.is_empty() {
        out.push_str("┤\n");
    } else {
        out.push_str(&format!("┼{}╯\n", join(tail)));
    }

    for (idx, (label, value)) in rows.iter().enumerate() {
        out.push_str(&format!(
            "│ {:>left$} │ {:>amount$} │\n",
            label,
            value,
            left = left_width - 2,
            amount = amount_width - 2
        ));
        if idx < rows.len() - 1 {
            out.push_str(&format!(
                "├{}┼{}┤\n",
                "─".repeat(left_width),
                "─".repeat(amount_width)
            ));
        }
    }

    out.push_str(&format!(
        "╰{}┴{}╯",
        "─".repeat(left_width),
        "─".repeat(amount_width)
    ));

    out
}

fn plan_table(plan: &[Installment], locale: &LocaleConfig) -> String {
    let rows: Vec<InstallmentRow> = plan
        .iter()
        .map(|i| InstallmentRow {
            id: i.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
            number: i.installment_number,
            due: format_date(i.due_date, locale),
            amount: format_currency(i.expected_amount, locale),
            paid: format_currency(i.paid_amount, locale),
            balance: format_currency(compute_balance(i), locale),
            status: i.status.to_string(),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// List configured clients
fn cmd_clients(cfg_dir: &Path) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let clients = load_clients(cfg_dir)?;

    if clients.is_empty() {
        println!("No clients configured.");
        println!("Add clients to: {}/clients.toml", cfg_dir.display());
        return Ok(());
    }

    let mut sorted: Vec<_> = clients.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);

    let rows: Vec<ClientRow> = sorted
        .iter()
        .map(|(id, client)| ClientRow {
            id: id.to_string(),
            name: client.name.clone(),
            document: client.document.clone().unwrap_or_default(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

/// List settlement accounts with the net amount that moved through them
fn cmd_accounts(cfg_dir: &Path) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let config = load_config(cfg_dir)?;
    let accounts = load_accounts(cfg_dir)?;
    let state = load_state(cfg_dir)?;

    if accounts.is_empty() {
        println!("No accounts configured.");
        println!("Add accounts to: {}/accounts.toml", cfg_dir.display());
        return Ok(());
    }

    let mut sorted: Vec<_> = accounts.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);

    let rows: Vec<AccountRow> = sorted
        .iter()
        .map(|(id, account)| AccountRow {
            id: id.to_string(),
            name: account.name.clone(),
            kind: account.kind.to_string(),
            balance: format_currency(state.account_balance(id), &config.locale),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

/// Show ledger status
fn cmd_status(cfg_dir: &Path) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let config = load_config(cfg_dir)?;
    let clients = load_clients(cfg_dir)?;
    let accounts = load_accounts(cfg_dir)?;
    let state = load_state(cfg_dir)?;
    let locale = &config.locale;

    let open: Vec<&LedgerEntry> = state.open_entries().collect();
    let receivable: Money = open
        .iter()
        .filter(|e| e.kind == EntryKind::Debit)
        .map(|e| e.outstanding())
        .sum();
    let payable: Money = open
        .iter()
        .filter(|e| e.kind == EntryKind::Credit)
        .map(|e| e.outstanding())
        .sum();

    println!("Ledger Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("Company:          {}", config.company.name);
    println!(
        "Today:            {}",
        format_date(config.company.today(), locale)
    );
    println!("Clients:          {}", clients.len());
    println!("Accounts:         {}", accounts.len());
    println!("Entries:          {} ({} open)", state.entries.len(), open.len());
    println!("Receivable:       {}", format_currency(receivable, locale));
    println!("Payable:          {}", format_currency(payable, locale));

    if !state.entries.is_empty() {
        println!();
        println!("Recent entries:");
        for entry in state.entries.iter().rev().take(5) {
            println!(
                "  #{} - {} - {} - {}",
                entry.id.unwrap_or_default(),
                entry.client,
                format_currency(entry.financed(), locale),
                entry.status
            );
        }
    }

    Ok(())
}

/// Preview a plan without touching the state file
fn cmd_simulate(
    cfg_dir: &Path,
    total: &str,
    down_payment: &str,
    installments: i64,
    date: Option<String>,
) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let config = load_config(cfg_dir)?;
    let locale = &config.locale;

    config.installments.check_count(installments)?;
    let inputs = PlanInputs {
        total_value: parse_currency(total, locale)?,
        down_payment: parse_currency(down_payment, locale)?,
        installments_number: installments,
        issue_date: Some(date_or_today(date, &config)?),
    };
    let preview = plan::generate(&inputs, &[]);

    if preview.is_empty() {
        println!("Plan not ready: check the total, down payment and installment count.");
        return Ok(());
    }

    println!("{}", plan_table(&preview, locale));
    println!(
        "Financed: {} in {} installment(s)",
        format_currency(inputs.financed(), locale),
        preview.len()
    );
    Ok(())
}

/// Open a new entry
#[allow(clippy::too_many_arguments)]
fn cmd_add(
    cfg_dir: &Path,
    client_id: &str,
    kind: &str,
    description: String,
    total: &str,
    down_payment: &str,
    installments: Option<u32>,
    date: Option<String>,
) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let config = load_config(cfg_dir)?;
    let clients = load_clients(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;
    let locale = &config.locale;

    let client = clients
        .get(client_id)
        .ok_or_else(|| LedgerError::ClientNotFound(client_id.to_string()))?;

    let count = installments.unwrap_or(config.installments.default_count);
    config.installments.check_count(i64::from(count))?;

    let draft = EntryDraft {
        kind: kind.parse()?,
        client: client_id.to_string(),
        description,
        issue_date: date_or_today(date, &config)?,
        total_value: parse_currency(total, locale)?,
        down_payment: parse_currency(down_payment, locale)?,
        installments_number: count,
    };

    let entry = create_entry(&mut state, draft)?;
    save_state(cfg_dir, &state)?;

    println!(
        "Created entry #{} ({})",
        entry.id.unwrap_or_default(),
        entry.kind
    );
    println!("  Client:   {}", client.name);
    println!("  Total:    {}", format_currency(entry.total_value, locale));
    println!("  Down:     {}", format_currency(entry.down_payment, locale));
    if entry.has_plan() {
        println!("{}", plan_table(&entry.installments, locale));
    } else {
        println!(
            "  Single payment of {} (pay with id {})",
            format_currency(entry.financed(), locale),
            entry.id.unwrap_or_default()
        );
    }

    Ok(())
}

/// Change the generating inputs of an entry
fn cmd_terms(
    cfg_dir: &Path,
    entry_id: EntryId,
    total: Option<String>,
    down_payment: Option<String>,
    installments: Option<u32>,
    date: Option<String>,
) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let config = load_config(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;
    let locale = &config.locale;

    if let Some(count) = installments {
        config.installments.check_count(i64::from(count))?;
    }

    let change = TermsChange {
        total_value: total.map(|t| parse_currency(&t, locale)).transpose()?,
        down_payment: down_payment
            .map(|d| parse_currency(&d, locale))
            .transpose()?,
        installments_number: installments,
        issue_date: date.map(|d| parse_date(&d)).transpose()?,
    };

    let entry = update_entry_terms(&mut state, entry_id, change)?;
    save_state(cfg_dir, &state)?;

    println!("Updated entry #{entry_id}");
    println!("  Total:    {}", format_currency(entry.total_value, locale));
    println!("  Down:     {}", format_currency(entry.down_payment, locale));
    if entry.has_plan() {
        println!("{}", plan_table(&entry.installments, locale));
    }

    Ok(())
}

/// List entries with a TOTAL / PAID / OUTSTANDING footer
fn cmd_list(cfg_dir: &Path, limit: Option<usize>) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let config = load_config(cfg_dir)?;
    let state = load_state(cfg_dir)?;
    let locale = &config.locale;

    if state.entries.is_empty() {
        println!("No entries yet.");
        return Ok(());
    }

    let entries: Vec<&LedgerEntry> = state.entries.iter().rev().collect();
    let entries = match limit {
        Some(n) => &entries[..n.min(entries.len())],
        None => &entries[..],
    };

    let rows: Vec<EntryRow> = entries
        .iter()
        .map(|e| EntryRow {
            id: format!("#{}", e.id.unwrap_or_default()),
            date: format_date(e.issue_date, locale),
            client: e.client.clone(),
            amount: format_currency(e.financed(), locale),
            plan: if e.has_plan() {
                format!("{}x", e.installments.len())
            } else {
                "single".to_string()
            },
            status: e.status.to_string(),
        })
        .collect();

    let shown_total: Money = entries.iter().map(|e| e.financed()).sum();
    let shown_paid: Money = entries.iter().map(|e| e.paid_amount).sum();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    let table = add_financial_footer(
        &table,
        3,
        &[
            ("TOTAL", format_currency(shown_total, locale)),
            ("(-) PAID", format_currency(shown_paid, locale)),
            (
                "(=) OUTSTANDING",
                format_currency(shown_total - shown_paid, locale),
            ),
        ],
    );
    println!("{table}");

    println!();
    println!("Total: {} entries", state.entries.len());
    println!("Use an installment id with pay/payments (see 'installments plan <entry>')");

    Ok(())
}

/// Show the plan of an entry
fn cmd_plan(cfg_dir: &Path, entry_id: EntryId) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let config = load_config(cfg_dir)?;
    let state = load_state(cfg_dir)?;
    let locale = &config.locale;

    let entry = state.entry(entry_id)?;

    println!(
        "Entry #{} - {} - {} ({})",
        entry_id,
        entry.client,
        format_date(entry.issue_date, locale),
        entry.kind
    );
    if !entry.description.is_empty() {
        println!("  {}", entry.description);
    }
    println!(
        "  Total {} (down payment {})",
        format_currency(entry.total_value, locale),
        format_currency(entry.down_payment, locale)
    );

    if entry.has_plan() {
        println!("{}", plan_table(&entry.installments, locale));
    } else {
        println!(
            "  Single payment: {} paid of {} (Status: {})",
            format_currency(entry.paid_amount, locale),
            format_currency(entry.financed(), locale),
            entry.status
        );
    }
    println!(
        "Outstanding: {}",
        format_currency(entry.outstanding(), locale)
    );

    Ok(())
}

/// Edit one installment amount
fn cmd_edit_installment(
    cfg_dir: &Path,
    entry_id: EntryId,
    number: u32,
    amount: &str,
) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let config = load_config(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;
    let locale = &config.locale;

    let new_amount = parse_currency(amount, locale)?;
    let outcome = edit_plan_amount(
        &mut state,
        entry_id,
        number,
        new_amount,
        config.installments.overflow_policy,
    )?;

    match &outcome.warning {
        Some(EditWarning::OverflowRejected { excess }) => {
            eprintln!(
                "Warning: amount exceeds the remaining balance by {}; plan unchanged",
                format_currency(*excess, locale)
            );
        }
        Some(EditWarning::LastInstallmentForced { entered, forced }) => {
            eprintln!(
                "Warning: installment {} must be {} to match the total (entered {})",
                number,
                format_currency(*forced, locale),
                format_currency(*entered, locale)
            );
            save_state(cfg_dir, &state)?;
        }
        _ => {
            save_state(cfg_dir, &state)?;
            println!("Updated installment {number} of entry #{entry_id}");
        }
    }

    println!("{}", plan_table(&outcome.plan, locale));
    Ok(())
}

/// Record a payment
fn cmd_pay(
    cfg_dir: &Path,
    target: EntryId,
    amount: &str,
    account: Option<String>,
    method: &str,
    date: Option<String>,
    notes: String,
) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let config = load_config(cfg_dir)?;
    let accounts = load_accounts(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;
    let locale = &config.locale;

    if let Some(account) = &account {
        if !accounts.contains_key(account) {
            return Err(LedgerError::AccountNotFound(account.clone()));
        }
    }

    let request = PaymentRequest {
        parent_entry_id: target,
        amount: parse_currency(amount, locale)?,
        date: date_or_today(date, &config)?,
        method: method.parse::<PaymentMethod>()?,
        notes,
        account: account.unwrap_or_default(),
    };

    let balance = PaymentReconciler::new(&mut state).register_payment(&request)?;
    save_state(cfg_dir, &state)?;

    print_payment_result(
        &format!(
            "Recorded {} payment for #{}",
            format_currency(request.amount, locale),
            target
        ),
        &balance,
        locale,
    );
    Ok(())
}

fn print_payment_result(headline: &str, balance: &Balance, locale: &LocaleConfig) {
    if balance.remaining <= Money::ZERO {
        println!("{headline} (fully paid)");
    } else {
        println!(
            "{headline} ({} remaining)",
            format_currency(balance.remaining, locale)
        );
    }
}

/// Edit a recorded payment
fn cmd_edit_payment(
    cfg_dir: &Path,
    payment_id: u32,
    amount: &str,
    date: Option<String>,
) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let config = load_config(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;
    let locale = &config.locale;

    let new_amount = parse_currency(amount, locale)?;
    let new_date = match date {
        Some(d) => parse_date(&d)?,
        None => state.payment(payment_id)?.date,
    };

    let balance =
        PaymentReconciler::new(&mut state).edit_payment(payment_id, new_amount, new_date)?;
    save_state(cfg_dir, &state)?;

    print_payment_result(
        &format!(
            "Updated payment {} to {}",
            payment_id,
            format_currency(new_amount, locale)
        ),
        &balance,
        locale,
    );
    Ok(())
}

/// Delete a recorded payment
fn cmd_remove_payment(cfg_dir: &Path, payment_id: u32) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let config = load_config(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;
    let locale = &config.locale;

    let removed = state.payment(payment_id)?;
    let balance = PaymentReconciler::new(&mut state).delete_payment(payment_id)?;
    save_state(cfg_dir, &state)?;

    print_payment_result(
        &format!(
            "Removed {} payment {} from #{}",
            format_currency(removed.amount, locale),
            payment_id,
            removed.parent_entry_id
        ),
        &balance,
        locale,
    );
    Ok(())
}

/// Show payment history for an entry or installment
fn cmd_payments(cfg_dir: &Path, target: EntryId) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let config = load_config(cfg_dir)?;
    let state = load_state(cfg_dir)?;
    let locale = &config.locale;

    let entry = state
        .owning_entry(target)
        .ok_or(LedgerError::EntryNotFound(target))?;

    // An entry with a plan shows the payments of all its installments
    let (parents, expected, paid, status) = if entry.id == Some(target) && entry.has_plan() {
        let parents: Vec<EntryId> = entry.installments.iter().filter_map(|i| i.id).collect();
        (parents, entry.financed(), entry.paid_amount, entry.status)
    } else {
        let payments = state.payments_for(target)?;
        let balance = Balance::from_payments(state.expected_amount_of(target)?, &payments);
        (vec![target], balance.expected, balance.paid, balance.status)
    };

    let payments: Vec<&PaymentEntry> = state
        .payments
        .iter()
        .filter(|p| parents.contains(&p.parent_entry_id))
        .collect();

    println!("Payments for #{target}");

    if payments.is_empty() {
        println!("  No payments recorded.");
    } else {
        let rows: Vec<PaymentRow> = payments
            .iter()
            .map(|p| PaymentRow {
                id: p.id,
                parent: match state.installment(p.parent_entry_id) {
                    Some(i) => format!(
                        "#{} ({}/{})",
                        p.parent_entry_id,
                        i.installment_number,
                        entry.installments.len()
                    ),
                    None => format!("#{}", p.parent_entry_id),
                },
                date: format_date(p.date, locale),
                amount: format_currency(p.amount, locale),
                method: p.method.to_string(),
                account: p.account.clone(),
                notes: p.notes.clone(),
            })
            .collect();

        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }

    println!(
        "Total paid: {} / {} (Status: {})",
        format_currency(paid, locale),
        format_currency(expected, locale),
        status
    );

    Ok(())
}

#[derive(Serialize)]
struct EntryExport<'a> {
    entry: &'a LedgerEntry,
    payments: Vec<&'a PaymentEntry>,
}

/// Print an entry with its plan and payments as JSON
fn cmd_export(cfg_dir: &Path, entry_id: EntryId) -> Result<()> {
    ensure_initialized(cfg_dir)?;
    let state = load_state(cfg_dir)?;

    let entry = state
        .entries
        .iter()
        .find(|e| e.id == Some(entry_id))
        .ok_or(LedgerError::EntryNotFound(entry_id))?;

    let mut parents: Vec<EntryId> = entry.installments.iter().filter_map(|i| i.id).collect();
    parents.push(entry_id);

    let export = EntryExport {
        entry,
        payments: state
            .payments
            .iter()
            .filter(|p| parents.contains(&p.parent_entry_id))
            .collect(),
    };

    let json = serde_json::to_string_pretty(&export).map_err(|e| {
        LedgerError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })?;
    println!("{json}");
    Ok(())
}
