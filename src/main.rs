use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use invoicekit::config::{
    config_dir, load_config, load_draft, load_state, save_draft, save_state, Config,
    CONFIG_TEMPLATE,
};
use invoicekit::error::{InvoiceError, Result};
use invoicekit::flow::{Generation, GenerationFlow};
use invoicekit::invoice::amount::{format_money, format_quantity, parse_amount};
use invoicekit::invoice::{
    compute_due_date, format_invoice_number, next_sequence, DueDate, InvoiceDetails,
    InvoiceFormState, InvoiceTemplate, LineItem, LineItemPatch, PaymentTerms, WizardStep,
};
use invoicekit::logging;
use invoicekit::services::{
    ActivityKind, EmailKind, FileProfileStore, HostedIdentity, HttpDocumentGenerator, HttpMailer,
    HttpPaymentGateway, Identity, IdentityService, Mailer, ProfileStore, ServiceClient,
};

#[derive(Parser)]
#[command(name = "invoicekit")]
#[command(version, about = "Draft, validate and generate invoices", long_about = None)]
struct Cli {
    /// Path to config directory (default: XDG config dir or ~/.invoicekit)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a template config.toml
    Init,

    /// Create a new draft invoice from the configured defaults
    New {
        /// Client name
        #[arg(long)]
        client: Option<String>,

        /// Client email
        #[arg(long)]
        email: Option<String>,

        /// Issue date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,

        /// Draft file to write (default: ./<invoice-number>.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show a draft with its line items and totals
    Show {
        /// Draft file
        draft: PathBuf,

        /// Builder step to show: template, branding, details or preview
        #[arg(long, default_value = "preview")]
        step: WizardStep,
    },

    /// Check whether a draft is ready to generate
    Check {
        /// Draft file
        draft: PathBuf,
    },

    /// Add, update or remove line items
    Item {
        #[command(subcommand)]
        action: ItemAction,
    },

    /// Set payment terms on a draft and re-derive its due date
    Terms {
        /// Draft file
        draft: PathBuf,

        /// due_on_receipt, net_15, net_30, net_45, net_60 or custom
        terms: PaymentTerms,

        /// Due date for custom terms (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },

    /// Compute a due date
    DueDate {
        /// Issue date (YYYY-MM-DD)
        #[arg(long)]
        issued: String,

        /// Payment terms code
        #[arg(long, default_value = "net_30")]
        terms: PaymentTerms,
    },

    /// Generate the invoice document (or start checkout when no free downloads remain)
    Generate {
        /// Draft file
        draft: PathBuf,

        /// Output file (default: <invoice-number>.pdf next to the draft)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show account, allowance and numbering status
    Status,

    /// Sign in to your account
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Create an account
    Signup {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        name: String,
    },

    /// Sign out
    Logout,

    /// List recorded activity
    Activity {
        /// Number of entries to show (default: all)
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
enum ItemAction {
    /// Append a line item
    Add {
        draft: PathBuf,

        #[arg(short, long, default_value = "")]
        description: String,

        #[arg(short, long, default_value = "1")]
        quantity: String,

        #[arg(short, long, default_value = "0")]
        rate: String,
    },

    /// Change fields of a line item (1-based index from 'show')
    Update {
        draft: PathBuf,

        index: usize,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        quantity: Option<String>,

        #[arg(short, long)]
        rate: Option<String>,
    },

    /// Remove a line item (1-based index from 'show')
    Remove { draft: PathBuf, index: usize },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);

    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::New {
            client,
            email,
            date,
            output,
        } => cmd_new(&cfg_dir, client, email, date, output),
        Commands::Show { draft, step } => cmd_show(&draft, step),
        Commands::Check { draft } => cmd_check(&draft),
        Commands::Item { action } => cmd_item(action),
        Commands::Terms { draft, terms, due } => cmd_terms(&draft, terms, due),
        Commands::DueDate { issued, terms } => cmd_due_date(&issued, terms),
        Commands::Generate { draft, output } => cmd_generate(&cfg_dir, &draft, output),
        Commands::Status => cmd_status(&cfg_dir),
        Commands::Login { email, password } => cmd_login(&cfg_dir, &email, &password),
        Commands::Signup {
            email,
            password,
            name,
        } => cmd_signup(&cfg_dir, &email, &password, &name),
        Commands::Logout => cmd_logout(&cfg_dir),
        Commands::Activity { limit } => cmd_activity(&cfg_dir, limit),
    }
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| InvoiceError::InvalidDate(input.to_string()))
}

fn currency_symbol(code: &str) -> String {
    match code.to_ascii_uppercase().as_str() {
        "USD" | "CAD" | "AUD" => "$".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        "JPY" => "¥".to_string(),
        other => format!("{other} "),
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%B %d, %Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Convert a 1-based index from the command line.
fn resolve_index(index: usize, count: usize) -> Result<usize> {
    if index == 0 || index > count {
        return Err(InvoiceError::InvalidLineItemIndex { index, count });
    }
    Ok(index - 1)
}

/// Identity from the stored session, if any.
fn current_identity(cfg_dir: &Path) -> Result<Identity> {
    let state = load_state(cfg_dir)?;
    Ok(Identity::from_user(state.session.map(|s| s.user)))
}

fn hosted_identity(cfg_dir: &Path, config: &Config) -> Result<HostedIdentity> {
    let auth_url = config
        .services
        .auth_url
        .as_deref()
        .ok_or(InvoiceError::NotConfigured("auth"))?;
    let identity = HostedIdentity::new(
        ServiceClient::from_settings(&config.services),
        auth_url,
        cfg_dir.to_path_buf(),
    );
    identity.subscribe(Box::new(|who: &Identity| {
        tracing::info!(user_id = who.user_id(), "session changed");
    }));
    Ok(identity)
}

fn mailer(config: &Config) -> Option<HttpMailer> {
    config
        .services
        .email_url
        .as_deref()
        .map(|url| HttpMailer::new(ServiceClient::from_settings(&config.services), url))
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    if cfg_dir.exists() {
        return Err(InvoiceError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;

    println!("Initialized invoicekit config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit your company details and service endpoints:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!("  2. Start a draft:  invoicekit new --client \"Client Name\"");
    println!("  3. Add items:      invoicekit item add <draft> -d \"Consulting\" -q 8 -r 150");
    println!("  4. Generate:       invoicekit generate <draft>");

    Ok(())
}

/// Create a new draft
fn cmd_new(
    cfg_dir: &Path,
    client: Option<String>,
    email: Option<String>,
    date: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;

    let today = Local::now().date_naive();
    let issue_date = match date {
        Some(text) => parse_date(&text)?,
        None => today,
    };

    let year = today.year();
    let seq = next_sequence(state.counter.last_number, state.counter.last_year, year);
    let number = format_invoice_number(&config.invoice.number_format, year, seq);

    let mut form = InvoiceFormState {
        template: config.invoice.template,
        tax_rate: config.invoice.tax_rate,
        company: config.company.clone(),
        details: InvoiceDetails {
            number: number.clone(),
            currency: config.invoice.currency.clone(),
            payment_terms: config.invoice.payment_terms,
            ..InvoiceDetails::default()
        },
        line_items: vec![LineItem::default()],
        ..InvoiceFormState::default()
    };
    form.client.name = client.unwrap_or_default();
    form.client.email = email.unwrap_or_default();
    form.set_issue_date(Some(issue_date));

    let path = output.unwrap_or_else(|| PathBuf::from(format!("{number}.toml")));
    if path.exists() {
        return Err(InvoiceError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} already exists", path.display()),
        )));
    }
    save_draft(&path, &form)?;

    state.counter.last_number = seq;
    state.counter.last_year = year;
    save_state(cfg_dir, &state)?;

    println!("Created draft {}", number);
    println!("  Due:    {}", format_date(form.details.due_date));
    println!("  Saved:  {}", path.display());

    Ok(())
}

#[derive(Tabled)]
struct LineItemRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
    #[tabled(rename = "QTY")]
    quantity: String,
    #[tabled(rename = "RATE")]
    rate: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
}

/// Print one builder step of a draft; `preview` shows the whole invoice
fn cmd_show(draft: &Path, step: WizardStep) -> Result<()> {
    let mut form = load_draft(draft)?;
    form.details.refresh_due_date();
    let symbol = currency_symbol(&form.details.currency);

    println!("Invoice {}", form.details.number);
    println!("{}", "-".repeat(50));

    match step {
        WizardStep::Template => {
            println!("Template:  {}", form.template);
            let names: Vec<&str> = InvoiceTemplate::ALL.iter().map(|t| t.name()).collect();
            println!("Available: {}", names.join(", "));
        }
        WizardStep::Branding => {
            let branding = &form.branding;
            let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
            println!("Logo:         {}", or_dash(&branding.logo_url));
            println!("Accent color: {}", or_dash(&branding.accent_color));
            println!("Notes:        {}", or_dash(&branding.notes));
        }
        WizardStep::Details => print_details(&form, &symbol),
        WizardStep::Preview => {
            println!("Template:  {}", form.template);
            print_details(&form, &symbol);
            println!();
            match form.validate() {
                Ok(()) => println!("Status:    ready"),
                Err(failure) => println!("Status:    incomplete ({failure})"),
            }
        }
    }

    if step != WizardStep::Preview {
        println!();
        println!(
            "Step {}/{}: {} (next: --step {})",
            step.position() + 1,
            WizardStep::all().len(),
            step,
            step.next()
        );
    }

    Ok(())
}

fn print_details(form: &InvoiceFormState, symbol: &str) {
    println!("From:      {}", form.company.name);
    println!("Bill to:   {}", form.client.name);
    println!("Issued:    {}", format_date(form.details.issue_date));
    println!(
        "Due:       {} ({})",
        format_date(form.details.due_date),
        form.details.payment_terms.label()
    );
    println!();

    let rows: Vec<LineItemRow> = form
        .line_items
        .iter()
        .enumerate()
        .map(|(idx, item)| LineItemRow {
            index: idx + 1,
            description: item.description().to_string(),
            quantity: format_quantity(item.quantity()),
            rate: format_money(item.rate(), symbol),
            amount: format_money(item.amount(), symbol),
        })
        .collect();

    if rows.is_empty() {
        println!("No line items.");
    } else {
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }

    let totals = form.totals();
    println!();
    println!("Subtotal:  {}", format_money(totals.subtotal, symbol));
    println!(
        "Tax ({}%): {}",
        format_quantity(form.tax_rate),
        format_money(totals.tax_amount, symbol)
    );
    println!("Total:     {}", format_money(totals.total, symbol));

    if !form.details.late_fee_rate.is_zero() || !form.details.late_fee_amount.is_zero() {
        println!(
            "Late fee:  {}% / {} (not included in total)",
            format_quantity(form.details.late_fee_rate),
            format_money(form.details.late_fee_amount, symbol)
        );
    }
}

/// Validate a draft
fn cmd_check(draft: &Path) -> Result<()> {
    let mut form = load_draft(draft)?;
    form.details.refresh_due_date();
    form.validate()?;

    let symbol = currency_symbol(&form.details.currency);
    println!(
        "{} is ready to generate (total {})",
        form.details.number.trim(),
        format_money(form.totals().total, &symbol)
    );
    Ok(())
}

fn cmd_item(action: ItemAction) -> Result<()> {
    match action {
        ItemAction::Add {
            draft,
            description,
            quantity,
            rate,
        } => {
            let mut form = load_draft(&draft)?;
            let idx = form.add_line_item();
            let patch = LineItemPatch {
                description: Some(description),
                quantity: Some(parse_amount(&quantity)),
                rate: Some(parse_amount(&rate)),
            };
            let item = form.update_line_item(idx, patch)?.clone();
            save_draft(&draft, &form)?;
            print_item("Added", idx + 1, &item, &form);
        }
        ItemAction::Update {
            draft,
            index,
            description,
            quantity,
            rate,
        } => {
            let mut form = load_draft(&draft)?;
            let idx = resolve_index(index, form.line_items.len())?;
            let patch = LineItemPatch {
                description,
                quantity: quantity.as_deref().map(parse_amount),
                rate: rate.as_deref().map(parse_amount),
            };
            if patch.is_empty() {
                println!("Nothing to update.");
                return Ok(());
            }
            let item = form.update_line_item(idx, patch)?.clone();
            save_draft(&draft, &form)?;
            print_item("Updated", index, &item, &form);
        }
        ItemAction::Remove { draft, index } => {
            let mut form = load_draft(&draft)?;
            let idx = resolve_index(index, form.line_items.len())?;
            let removed = form.remove_line_item(idx)?;
            save_draft(&draft, &form)?;
            print_item("Removed", index, &removed, &form);
            if form.line_items.is_empty() {
                println!("  Note: the draft has no line items left");
            }
        }
    }
    Ok(())
}

fn print_item(verb: &str, index: usize, item: &LineItem, form: &InvoiceFormState) {
    let symbol = currency_symbol(&form.details.currency);
    println!(
        "{verb} item #{index}: {} ({} x {} = {})",
        item.description(),
        format_quantity(item.quantity()),
        format_money(item.rate(), &symbol),
        format_money(item.amount(), &symbol)
    );
    println!("  Total:  {}", format_money(form.totals().total, &symbol));
}

fn cmd_terms(draft: &Path, terms: PaymentTerms, due: Option<String>) -> Result<()> {
    let mut form = load_draft(draft)?;
    let manual = due.as_deref().map(parse_date).transpose()?;
    if manual.is_some() && terms != PaymentTerms::Custom {
        tracing::warn!(%terms, "--due is only used with custom terms");
    }
    form.set_payment_terms(terms, manual);
    save_draft(draft, &form)?;

    println!("Payment terms: {}", terms.label());
    println!("Due date:      {}", format_date(form.details.due_date));
    Ok(())
}

fn cmd_due_date(issued: &str, terms: PaymentTerms) -> Result<()> {
    let issue_date = parse_date(issued)?;
    match compute_due_date(Some(issue_date), terms) {
        DueDate::Date(due) => println!("{due}"),
        DueDate::Keep => println!("Custom terms: the due date is set manually"),
        DueDate::Unset => println!("No due date"),
    }
    Ok(())
}

/// Generate the invoice document through the configured services
fn cmd_generate(cfg_dir: &Path, draft: &Path, output: Option<PathBuf>) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let form = load_draft(draft)?;
    let identity = current_identity(cfg_dir)?;

    let document_url = config
        .services
        .document_url
        .as_deref()
        .ok_or(InvoiceError::NotConfigured("document"))?;
    let payment_url = config
        .services
        .payment_url
        .as_deref()
        .ok_or(InvoiceError::NotConfigured("payment"))?;

    let client = ServiceClient::from_settings(&config.services);
    let documents = HttpDocumentGenerator::new(client.clone(), document_url);
    let payments = HttpPaymentGateway::new(client, payment_url);
    let profiles = FileProfileStore::new(cfg_dir.to_path_buf());
    let mailer = mailer(&config);

    let mut flow = GenerationFlow::new(
        &documents,
        &payments,
        &profiles,
        config.entitlements,
        config.services.download_price,
    );
    if let Some(mailer) = &mailer {
        flow = flow.with_mailer(mailer);
    }

    let symbol = currency_symbol(&form.details.currency);
    match flow.run(&form, &identity)? {
        Generation::Document {
            number,
            bytes,
            totals,
            downloads_used,
        } => {
            let path = output.unwrap_or_else(|| {
                draft
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(format!("{number}.pdf"))
            });
            fs::write(&path, &bytes)?;

            println!("Generated {}", number);
            println!("  Client: {}", form.client.name);
            println!("  Total:  {}", format_money(totals.total, &symbol));
            println!("  Saved:  {}", path.display());
            let profile = profiles.get_profile(identity.user_id())?;
            if profile.is_premium {
                println!("  Plan:   premium");
            } else {
                let limit = config.entitlements.limit_for(identity.is_signed_in());
                println!("  Free downloads used: {}/{}", downloads_used, limit);
            }
        }
        Generation::PaymentRequired {
            number,
            amount,
            session,
        } => {
            println!("Free downloads used up.");
            println!(
                "Complete payment of {} to download {}:",
                format_money(amount, &symbol),
                number
            );
            match session.url {
                Some(url) => println!("  {url}"),
                None => println!("  Checkout session: {}", session.session_id),
            }
        }
    }

    Ok(())
}

/// Show account and numbering status
fn cmd_status(cfg_dir: &Path) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let state = load_state(cfg_dir)?;
    let identity = Identity::from_user(state.session.as_ref().map(|s| s.user.clone()));
    let profile = state
        .profiles
        .get(identity.user_id())
        .cloned()
        .unwrap_or_default();

    let year = Local::now().year();
    let next_seq = next_sequence(state.counter.last_number, state.counter.last_year, year);
    let next_number = format_invoice_number(&config.invoice.number_format, year, next_seq);

    println!("Invoice Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("Company:          {}", config.company.name);
    match identity.user() {
        Some(user) => println!("Signed in as:     {}", user.email),
        None => println!("Signed in as:     guest"),
    }
    if profile.is_premium {
        println!("Plan:             premium");
    } else {
        println!(
            "Free downloads:   {}/{}",
            profile.downloads_used,
            config.entitlements.limit_for(identity.is_signed_in())
        );
    }
    println!(
        "Currency:         {} ({})",
        config.invoice.currency, config.invoice.currency_symbol
    );
    println!("Payment terms:    {}", config.invoice.payment_terms.label());
    println!("Next invoice:     {}", next_number);

    Ok(())
}

fn cmd_login(cfg_dir: &Path, email: &str, password: &str) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let identity = hosted_identity(cfg_dir, &config)?;
    let user = identity.sign_in(email, password)?;

    FileProfileStore::new(cfg_dir.to_path_buf()).record_activity(
        &user.id,
        ActivityKind::SignIn,
        &serde_json::json!({ "email": user.email }),
    )?;

    println!("Signed in as {}", user.email);
    Ok(())
}

fn cmd_signup(cfg_dir: &Path, email: &str, password: &str, name: &str) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let identity = hosted_identity(cfg_dir, &config)?;
    let user = identity.sign_up(email, password, name)?;

    FileProfileStore::new(cfg_dir.to_path_buf()).record_activity(
        &user.id,
        ActivityKind::SignUp,
        &serde_json::json!({ "email": user.email }),
    )?;

    if let Some(mailer) = mailer(&config) {
        let data = serde_json::json!({ "name": user.name.as_deref().unwrap_or(name) });
        if let Err(e) = mailer.send(&user.email, EmailKind::Welcome, &data) {
            tracing::warn!(error = %e, "welcome email failed");
        }
    }

    if identity.current_user().is_some() {
        println!("Account created, signed in as {}", user.email);
    } else {
        println!("Account created. Check {} to confirm it, then run 'invoicekit login'.", user.email);
    }
    Ok(())
}

fn cmd_logout(cfg_dir: &Path) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let identity = hosted_identity(cfg_dir, &config)?;
    let Some(user) = identity.current_user() else {
        println!("Not signed in.");
        return Ok(());
    };

    identity.sign_out()?;
    FileProfileStore::new(cfg_dir.to_path_buf()).record_activity(
        &user.id,
        ActivityKind::SignOut,
        &serde_json::json!({}),
    )?;

    println!("Signed out {}", user.email);
    Ok(())
}

#[derive(Tabled)]
struct ActivityRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "WHEN")]
    at: String,
    #[tabled(rename = "USER")]
    user: String,
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "DETAILS")]
    details: String,
}

/// List recorded activity, newest first
fn cmd_activity(cfg_dir: &Path, limit: Option<usize>) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(InvoiceError::ConfigNotFound(cfg_dir.to_path_buf()));
    }

    let state = load_state(cfg_dir)?;
    if state.activity.is_empty() {
        println!("No activity recorded yet.");
        return Ok(());
    }

    let shown = limit.unwrap_or(state.activity.len());
    let rows: Vec<ActivityRow> = state
        .activity
        .iter()
        .rev()
        .take(shown)
        .enumerate()
        .map(|(idx, entry)| ActivityRow {
            index: idx + 1,
            at: entry.at.format("%Y-%m-%d %H:%M").to_string(),
            user: entry.user_id.clone(),
            kind: entry.kind.clone(),
            details: entry.payload.clone(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();
    println!("Total: {} entries", state.activity.len());

    Ok(())
}
