use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{deserialize_optional_wire_date, deserialize_wire_date};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AccountType {
    #[serde(alias = "corrente")]
    Checking,
    #[serde(alias = "poupanca")]
    Savings,
    #[serde(alias = "cartao")]
    CreditCard,
    #[serde(alias = "investimento")]
    Investment,
}

/// Money movement relative to the owning account. Independent of the sign of `amount`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionDirection {
    #[serde(alias = "entrada")]
    Inflow,
    #[serde(alias = "saida")]
    Outflow,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub balance: f64,
    pub institution: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub description: String,
    pub amount: f64,
    #[serde(deserialize_with = "deserialize_wire_date")]
    pub date: NaiveDate,
    pub category: String,
    /// Expected to match an `Account::id` in the same request. Not checked.
    pub account_id: String,
    #[serde(rename = "type")]
    pub direction: TransactionDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Rendered as an explicit `null` when absent.
    #[serde(default, deserialize_with = "deserialize_optional_wire_date")]
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub user_question: String,
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    pub goals: Vec<Goal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResponse {
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisResponse {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            timestamp: Utc::now(),
        }
    }
}
