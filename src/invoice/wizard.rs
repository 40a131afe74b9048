use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::InvoiceError;

/// Steps of the invoice builder, in display order.
///
/// Navigation is free-form: any step can be jumped to regardless of whether
/// earlier steps are complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    #[default]
    Template,
    Branding,
    Details,
    Preview,
}

impl WizardStep {
    pub fn all() -> [WizardStep; 4] {
        [
            WizardStep::Template,
            WizardStep::Branding,
            WizardStep::Details,
            WizardStep::Preview,
        ]
    }

    pub fn position(self) -> usize {
        self as usize
    }

    /// Following step; stays on `Preview`.
    pub fn next(self) -> WizardStep {
        Self::all()
            .get(self.position() + 1)
            .copied()
            .unwrap_or(self)
    }

    /// Preceding step; stays on `Template`.
    pub fn previous(self) -> WizardStep {
        match self.position() {
            0 => self,
            n => Self::all()[n - 1],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WizardStep::Template => "template",
            WizardStep::Branding => "branding",
            WizardStep::Details => "details",
            WizardStep::Preview => "preview",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WizardStep {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::all()
            .into_iter()
            .find(|step| step.name() == needle)
            .ok_or_else(|| InvoiceError::UnknownWizardStep(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_forward_and_back() {
        let mut step = WizardStep::default();
        let mut seen = vec![step];
        while step != WizardStep::Preview {
            step = step.next();
            seen.push(step);
        }
        assert_eq!(seen, WizardStep::all());
        assert_eq!(WizardStep::Preview.next(), WizardStep::Preview);
        assert_eq!(WizardStep::Details.previous(), WizardStep::Branding);
        assert_eq!(WizardStep::Template.previous(), WizardStep::Template);
    }

    #[test]
    fn parses_names() {
        assert_eq!("Preview".parse::<WizardStep>().unwrap(), WizardStep::Preview);
        assert!("checkout".parse::<WizardStep>().is_err());
    }
}
