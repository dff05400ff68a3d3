// Prompt template for the personal-finance assistant.
//
// The rules below are the only steering the model gets. Changing them changes
// answer behaviour for every caller.

use serde::Serialize;

use crate::error::Result;
use crate::schema::{Account, AnalysisRequest, Goal, Transaction};

pub const ASSISTANT_PREAMBLE: &str = r#"# CONTEXT
You are an Expert Personal Finance Assistant. Your mission is to analyze the user's financial data to provide clear answers, useful insights and practical recommendations. Always answer in Markdown.

## IMPORTANT RULES
1. Rely ONLY on the data provided. Never invent transactions or balances.
2. Do not give specific investment advice (e.g. "Buy shares of company X").
3. Be neutral and objective. Use constructive, non-judgmental language.
4. If the question is ambiguous, ask for clarification.
5. Always reinforce that the analysis is secure and private."#;

pub const FINANCIAL_DATA_HEADER: &str = "# FINANCIAL DATA";
pub const ACCOUNTS_LABEL: &str = "## ACCOUNTS";
pub const TRANSACTIONS_LABEL: &str = "## TRANSACTIONS";
pub const GOALS_LABEL: &str = "## GOALS";
pub const QUESTION_HEADER: &str = "# USER QUESTION";
pub const CLOSING_CUE: &str = "# YOUR ANALYSIS\n(Begin your answer here)";

/// Renders the three collections as labeled, 2-space indented JSON sections.
///
/// Dates come out as `YYYY-MM-DD`; a goal without a target date carries
/// `"targetDate": null`.
pub fn format_financial_data(
    accounts: &[Account],
    transactions: &[Transaction],
    goals: &[Goal],
) -> Result<String> {
    Ok(format!(
        "{}\n{}\n\n{}\n{}\n\n{}\n{}",
        ACCOUNTS_LABEL,
        to_pretty_json(accounts)?,
        TRANSACTIONS_LABEL,
        to_pretty_json(transactions)?,
        GOALS_LABEL,
        to_pretty_json(goals)?
    ))
}

/// Builds the complete prompt. Pure: the same request always yields the same bytes.
pub fn build_prompt(request: &AnalysisRequest) -> Result<String> {
    let financial_data = format_financial_data(
        &request.accounts,
        &request.transactions,
        &request.goals,
    )?;

    Ok(format!(
        "{}\n\n{}\n{}\n\n{}\n\"{}\"\n\n{}",
        ASSISTANT_PREAMBLE,
        FINANCIAL_DATA_HEADER,
        financial_data,
        QUESTION_HEADER,
        request.user_question,
        CLOSING_CUE
    ))
}

fn to_pretty_json<T: Serialize>(records: &[T]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AccountType, TransactionDirection};
    use chrono::NaiveDate;

    fn sample_request() -> AnalysisRequest {
        AnalysisRequest {
            user_question: "Can I afford a trip in December?".to_string(),
            accounts: vec![Account {
                id: "acc-1".to_string(),
                name: "Main".to_string(),
                account_type: AccountType::Checking,
                balance: 2450.75,
                institution: "Nubank".to_string(),
            }],
            transactions: vec![Transaction {
                id: "tx-1".to_string(),
                description: "Salary".to_string(),
                amount: 5000.0,
                date: NaiveDate::from_ymd_opt(2024, 7, 5).unwrap(),
                category: "Income".to_string(),
                account_id: "acc-1".to_string(),
                direction: TransactionDirection::Inflow,
                notes: Some("July".to_string()),
            }],
            goals: vec![
                Goal {
                    id: "g-1".to_string(),
                    name: "Trip".to_string(),
                    target_amount: 4000.0,
                    current_amount: 1500.0,
                    description: None,
                    target_date: NaiveDate::from_ymd_opt(2024, 12, 1),
                },
                Goal {
                    id: "g-2".to_string(),
                    name: "Reserve".to_string(),
                    target_amount: 10000.0,
                    current_amount: 0.0,
                    description: Some("Emergency fund".to_string()),
                    target_date: None,
                },
            ],
        }
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let request = sample_request();
        let first = build_prompt(&request).unwrap();
        let second = build_prompt(&request.clone()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_prompt_sections_in_order() {
        let prompt = build_prompt(&sample_request()).unwrap();

        let markers = [
            "# CONTEXT",
            "## IMPORTANT RULES",
            FINANCIAL_DATA_HEADER,
            ACCOUNTS_LABEL,
            TRANSACTIONS_LABEL,
            GOALS_LABEL,
            QUESTION_HEADER,
            "\"Can I afford a trip in December?\"",
            CLOSING_CUE,
        ];
        let positions: Vec<usize> = markers
            .iter()
            .map(|m| prompt.find(m).unwrap_or_else(|| panic!("missing {}", m)))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{:?}", positions);
        assert!(prompt.ends_with(CLOSING_CUE));
    }

    #[test]
    fn test_prompt_contains_all_five_rules() {
        let prompt = build_prompt(&sample_request()).unwrap();
        for rule in ["1. Rely ONLY", "2. Do not give", "3. Be neutral", "4. If the question", "5. Always reinforce"] {
            assert!(prompt.contains(rule), "{}", rule);
        }
    }

    #[test]
    fn test_dates_and_null_target_date() {
        let prompt = build_prompt(&sample_request()).unwrap();
        assert!(prompt.contains("\"date\": \"2024-07-05\""));
        assert!(prompt.contains("\"targetDate\": \"2024-12-01\""));
        assert!(prompt.contains("\"targetDate\": null"));
        assert!(prompt.contains("\"type\": \"checking\""));
        assert!(prompt.contains("\"type\": \"inflow\""));
    }

    #[test]
    fn test_empty_collections_render_as_empty_arrays() {
        let data = format_financial_data(&[], &[], &[]).unwrap();
        assert_eq!(data, "## ACCOUNTS\n[]\n\n## TRANSACTIONS\n[]\n\n## GOALS\n[]");
    }
}
