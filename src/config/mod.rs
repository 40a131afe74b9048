mod settings;
pub mod state;

pub use settings::{Config, InvoiceSettings, ServiceSettings, API_KEY_ENV};
pub use state::{ActivityEntry, Counter, SessionRecord, State};

use crate::error::{InvoiceError, Result};
use crate::invoice::InvoiceFormState;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (XDG config dir, or ~/.invoicekit/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "invoicekit") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to ~/.invoicekit/
    let home = std::env::var_os("HOME").map(PathBuf::from).ok_or_else(|| {
        InvoiceError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".invoicekit"))
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    if !config_dir.exists() {
        return Err(InvoiceError::ConfigNotFound(config_dir.to_path_buf()));
    }
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(InvoiceError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| InvoiceError::ConfigParse { path, source: e })
}

/// Load state.toml (creates default if missing)
pub fn load_state(config_dir: &Path) -> Result<State> {
    let path = config_dir.join("state.toml");
    if !path.exists() {
        return Ok(State::default());
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| InvoiceError::ConfigParse { path, source: e })
}

/// Save state.toml
pub fn save_state(config_dir: &Path, state: &State) -> Result<()> {
    let content = toml::to_string_pretty(state).map_err(|e| InvoiceError::Serialize {
        what: "state".to_string(),
        reason: e.to_string(),
    })?;
    fs::write(config_dir.join("state.toml"), content)?;
    Ok(())
}

/// Load a draft invoice file
pub fn load_draft(path: &Path) -> Result<InvoiceFormState> {
    if !path.exists() {
        return Err(InvoiceError::DraftNotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| InvoiceError::DraftParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write a draft invoice file
pub fn save_draft(path: &Path, form: &InvoiceFormState) -> Result<()> {
    let content = toml::to_string_pretty(form).map_err(|e| InvoiceError::Serialize {
        what: "draft".to_string(),
        reason: e.to_string(),
    })?;
    fs::write(path, content)?;
    tracing::debug!(path = %path.display(), "draft saved");
    Ok(())
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[company]
name = "Your Company Name"
address = "123 Business Street, San Francisco, CA 94102"
email = "billing@yourcompany.com"
phone = ""

[invoice]
number_format = "INV-{year}-{seq:04}"  # e.g., INV-2026-0001
currency = "USD"
currency_symbol = "$"
payment_terms = "net_30"   # due_on_receipt, net_15, net_30, net_45, net_60, custom
tax_rate = 0               # percentage, e.g. 8.25
template = "standard"      # standard, modern, minimal, corporate

[services]
document_url = "https://api.example.com/generate-invoice"
payment_url = "https://api.example.com/create-checkout-session"
# email_url = "https://api.example.com/send-email"
# auth_url = "https://your-project.example.co"
# api_key = ""             # or set INVOICEKIT_API_KEY
timeout_secs = 30
download_price = 2.99

[entitlements]
guest_limit = 1
member_limit = 2
"#;
