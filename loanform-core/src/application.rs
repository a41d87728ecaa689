//! The loan application form.
//!
//! Field names and option labels are the ones the prediction endpoint reads.
//! Values are sent as text exactly as entered; numeric validation is left to
//! the server, whose complaint comes back as an application failure.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::payload::FormPayload;

/// Field names in the order the model consumes them.
pub const FIELD_ORDER: [&str; 12] = [
    "age",
    "maritalStatus",
    "employmentStatus",
    "educationLevel",
    "annualIncome",
    "netWorth",
    "creditScore",
    "totalLiabilities",
    "totalDebtToIncomeRatio",
    "loanAmount",
    "loanDuration",
    "interestRate",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaritalStatus {
    Divorced,
    Married,
    Single,
    Widowed,
}

impl MaritalStatus {
    pub const ALL: [MaritalStatus; 4] = [
        MaritalStatus::Divorced,
        MaritalStatus::Married,
        MaritalStatus::Single,
        MaritalStatus::Widowed,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MaritalStatus::Divorced => "Divorced",
            MaritalStatus::Married => "Married",
            MaritalStatus::Single => "Single",
            MaritalStatus::Widowed => "Widowed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmploymentStatus {
    Employed,
    #[serde(rename = "Self-Employed")]
    SelfEmployed,
    Unemployed,
}

impl EmploymentStatus {
    pub const ALL: [EmploymentStatus; 3] = [
        EmploymentStatus::Employed,
        EmploymentStatus::SelfEmployed,
        EmploymentStatus::Unemployed,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EmploymentStatus::Employed => "Employed",
            EmploymentStatus::SelfEmployed => "Self-Employed",
            EmploymentStatus::Unemployed => "Unemployed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EducationLevel {
    Associate,
    Bachelor,
    Doctorate,
    #[serde(rename = "High School")]
    HighSchool,
    Master,
}

impl EducationLevel {
    pub const ALL: [EducationLevel; 5] = [
        EducationLevel::Associate,
        EducationLevel::Bachelor,
        EducationLevel::Doctorate,
        EducationLevel::HighSchool,
        EducationLevel::Master,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EducationLevel::Associate => "Associate",
            EducationLevel::Bachelor => "Bachelor",
            EducationLevel::Doctorate => "Doctorate",
            EducationLevel::HighSchool => "High School",
            EducationLevel::Master => "Master",
        }
    }
}

macro_rules! display_label {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        })*
    };
}

display_label!(MaritalStatus, EmploymentStatus, EducationLevel);

/// A filled-in loan application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplication {
    pub age: f64,
    pub marital_status: MaritalStatus,
    pub employment_status: EmploymentStatus,
    pub education_level: EducationLevel,
    pub annual_income: f64,
    pub net_worth: f64,
    pub credit_score: f64,
    pub total_liabilities: f64,
    pub total_debt_to_income_ratio: f64,
    pub loan_amount: f64,
    /// Months.
    pub loan_duration: f64,
    pub interest_rate: f64,
}

impl LoanApplication {
    /// Parse an application from TOML.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
    }

    /// Load an application from a `.toml` or `.json` file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => ConfigError::Invalid {
                message: format!("cannot read {}: {}", path.display(), e),
            },
        })?;
        let is_json = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Form fields in model order.
    pub fn to_payload(&self) -> FormPayload {
        let values = [
            self.age.to_string(),
            self.marital_status.label().to_string(),
            self.employment_status.label().to_string(),
            self.education_level.label().to_string(),
            self.annual_income.to_string(),
            self.net_worth.to_string(),
            self.credit_score.to_string(),
            self.total_liabilities.to_string(),
            self.total_debt_to_income_ratio.to_string(),
            self.loan_amount.to_string(),
            self.loan_duration.to_string(),
            self.interest_rate.to_string(),
        ];
        FIELD_ORDER
            .iter()
            .zip(values)
            .fold(FormPayload::new(), |payload, (name, value)| {
                payload.with_text(*name, value)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
age = 35
maritalStatus = "Married"
employmentStatus = "Self-Employed"
educationLevel = "High School"
annualIncome = 55000
netWorth = 120000.5
creditScore = 710
totalLiabilities = 15000
totalDebtToIncomeRatio = 0.28
loanAmount = 20000
loanDuration = 36
interestRate = 0.07
"#;

    #[test]
    fn test_parse_toml_application() {
        let app = LoanApplication::from_toml_str(SAMPLE).unwrap();
        assert_eq!(app.employment_status, EmploymentStatus::SelfEmployed);
        assert_eq!(app.education_level, EducationLevel::HighSchool);
        assert_eq!(app.age, 35.0);
    }

    #[test]
    fn test_payload_follows_model_order() {
        let app = LoanApplication::from_toml_str(SAMPLE).unwrap();
        let payload = app.to_payload();
        let names: Vec<&str> = payload.names().collect();
        assert_eq!(names, FIELD_ORDER.to_vec());
        assert_eq!(
            payload.get("employmentStatus").and_then(|v| v.as_text()),
            Some("Self-Employed")
        );
        assert_eq!(
            payload.get("netWorth").and_then(|v| v.as_text()),
            Some("120000.5")
        );
        assert_eq!(payload.get("age").and_then(|v| v.as_text()), Some("35"));
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let bad = SAMPLE.replace("\"Married\"", "\"Engaged\"");
        let err = LoanApplication::from_toml_str(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_load_json_application() {
        let app = LoanApplication::from_toml_str(SAMPLE).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        std::fs::write(&path, serde_json::to_string(&app).unwrap()).unwrap();

        let loaded = LoanApplication::load(&path).unwrap();
        assert_eq!(loaded, app);
    }

    #[test]
    fn test_load_missing_file() {
        let err = LoanApplication::load(Path::new("/nonexistent/app.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_load_unreadable_file_is_not_reported_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let err = LoanApplication::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("app.toml"));
    }

    #[test]
    fn test_labels_cover_every_option() {
        let marital: Vec<String> = MaritalStatus::ALL.iter().map(|m| m.to_string()).collect();
        assert_eq!(marital, vec!["Divorced", "Married", "Single", "Widowed"]);
        assert_eq!(EmploymentStatus::ALL.len(), 3);
        assert_eq!(EducationLevel::ALL[3].label(), "High School");
    }
}
