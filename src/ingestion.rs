use crate::error::{AnalysisError, Result};
use crate::schema::{Account, AnalysisRequest, Goal, Transaction};
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A request body whose top-level shape has been checked but whose records
/// have not been parsed yet.
#[derive(Debug, Clone)]
pub struct RawAnalysisPayload {
    pub user_question: String,
    pub accounts: Vec<Value>,
    pub transactions: Vec<Value>,
    pub goals: Vec<Value>,
}

impl RawAnalysisPayload {
    /// Checks that `userQuestion` is a non-empty string and that the three
    /// collections are arrays. Records themselves are left untouched.
    pub fn from_body(body: Value) -> Result<Self> {
        let mut fields = match body {
            Value::Object(fields) => fields,
            _ => return Err(AnalysisError::InvalidQuestion),
        };

        let user_question = match fields.remove("userQuestion") {
            Some(Value::String(question)) if !question.is_empty() => question,
            _ => return Err(AnalysisError::InvalidQuestion),
        };

        Ok(Self {
            user_question,
            accounts: take_array(&mut fields, "accounts")?,
            transactions: take_array(&mut fields, "transactions")?,
            goals: take_array(&mut fields, "goals")?,
        })
    }

    /// Parses every record, turning wire dates into calendar dates.
    pub fn normalize(self) -> Result<AnalysisRequest> {
        let accounts: Vec<Account> = parse_records("accounts", self.accounts)?;
        let transactions: Vec<Transaction> = parse_records("transactions", self.transactions)?;
        let goals: Vec<Goal> = parse_records("goals", self.goals)?;

        debug!(
            "Normalized {} accounts, {} transactions and {} goals",
            accounts.len(),
            transactions.len(),
            goals.len()
        );

        Ok(AnalysisRequest {
            user_question: self.user_question,
            accounts,
            transactions,
            goals,
        })
    }
}

/// Parses a raw request body. An unparseable body is reported as invalid
/// financial data rather than a framework rejection so callers always get
/// the `{ "error": ... }` shape.
pub fn parse_body(bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes)
        .map_err(|e| AnalysisError::InvalidFinancialData(format!("malformed JSON body: {}", e)))
}

pub fn parse_analysis_request(body: Value) -> Result<AnalysisRequest> {
    RawAnalysisPayload::from_body(body)?.normalize()
}

fn take_array(fields: &mut Map<String, Value>, key: &str) -> Result<Vec<Value>> {
    match fields.remove(key) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(AnalysisError::InvalidFinancialData(format!(
            "'{}' must be an array",
            key
        ))),
        None => Err(AnalysisError::InvalidFinancialData(format!(
            "'{}' is missing",
            key
        ))),
    }
}

fn parse_records<T: DeserializeOwned>(collection: &str, items: Vec<Value>) -> Result<Vec<T>> {
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            serde_json::from_value(item).map_err(|e| {
                AnalysisError::InvalidFinancialData(format!("{} #{}: {}", collection, idx, e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn valid_body() -> Value {
        json!({
            "userQuestion": "How much did I spend on food?",
            "accounts": [
                { "id": "acc-1", "name": "Nubank", "type": "checking", "balance": 1000, "institution": "Nubank" }
            ],
            "transactions": [
                {
                    "id": "tx-1",
                    "description": "iFood",
                    "amount": 50,
                    "date": "2024-06-02T12:00:00.000Z",
                    "category": "Food",
                    "accountId": "acc-1",
                    "type": "outflow"
                }
            ],
            "goals": [
                { "id": "g-1", "name": "Vacation", "targetAmount": 3000, "currentAmount": 800, "targetDate": "2024-12-20" },
                { "id": "g-2", "name": "Laptop", "targetAmount": 2000, "currentAmount": 100 }
            ]
        })
    }

    #[test]
    fn test_valid_body_is_normalized() {
        let request = parse_analysis_request(valid_body()).unwrap();

        assert_eq!(request.user_question, "How much did I spend on food?");
        assert_eq!(request.accounts.len(), 1);
        assert_eq!(
            request.transactions[0].date,
            NaiveDate::from_ymd_opt(2024, 6, 2).unwrap()
        );
        assert_eq!(request.goals[0].target_date, NaiveDate::from_ymd_opt(2024, 12, 20));
        assert_eq!(request.goals[1].target_date, None);
    }

    #[test]
    fn test_question_must_be_non_empty_string() {
        for question in [json!(null), json!(""), json!(42), json!(["why?"])] {
            let mut body = valid_body();
            body["userQuestion"] = question;
            let err = RawAnalysisPayload::from_body(body).unwrap_err();
            assert!(matches!(err, AnalysisError::InvalidQuestion));
        }

        let mut body = valid_body();
        body.as_object_mut().unwrap().remove("userQuestion");
        assert!(matches!(
            RawAnalysisPayload::from_body(body),
            Err(AnalysisError::InvalidQuestion)
        ));

        assert!(matches!(
            RawAnalysisPayload::from_body(json!([1, 2, 3])),
            Err(AnalysisError::InvalidQuestion)
        ));
    }

    #[test]
    fn test_collections_must_be_arrays() {
        for key in ["accounts", "transactions", "goals"] {
            let mut body = valid_body();
            body[key] = json!({ "not": "an array" });
            let err = RawAnalysisPayload::from_body(body).unwrap_err();
            assert!(matches!(err, AnalysisError::InvalidFinancialData(_)), "{}", key);

            let mut body = valid_body();
            body.as_object_mut().unwrap().remove(key);
            let err = RawAnalysisPayload::from_body(body).unwrap_err();
            assert!(matches!(err, AnalysisError::InvalidFinancialData(_)), "{}", key);
        }
    }

    #[test]
    fn test_shape_check_does_not_parse_records() {
        let mut body = valid_body();
        body["transactions"][0]["date"] = json!("not a date");

        let raw = RawAnalysisPayload::from_body(body).unwrap();
        let err = raw.normalize().unwrap_err();
        match err {
            AnalysisError::InvalidFinancialData(detail) => {
                assert!(detail.starts_with("transactions #0"), "{}", detail)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_body() {
        assert!(parse_body(b"{\"userQuestion\": ").is_err());
        assert_eq!(parse_body(b"{}").unwrap(), json!({}));
    }
}
