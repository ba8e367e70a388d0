// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Finance assistant: turns a forecast snapshot into prompt text and sends it
//! to an OpenAI-compatible chat completions endpoint.

use crate::config::Settings;
use crate::error::MoneyError;
use crate::forecast::ForecastSnapshot;
use crate::utils::{fmt_opt_money, http_client};
use anyhow::Result;
use serde::{Deserialize, Serialize};

pub const SYSTEM_PROMPT: &str = r#"You are a helpful, cautious personal finance assistant for an app called "Money Manager".

You are given a summary of the user's real financial analytics (balances, predicted expenses/income,
top spending categories, and model quality). Use ONLY this data and general money management
knowledge to answer questions.

Constraints:
- Do NOT give investment or trading recommendations for specific stocks, crypto, or complex products.
- Instead, focus on budgeting, spending control, emergency funds, saving habits, and general advice.
- Highlight risky behaviours gently (e.g. overspending, negative cashflow).
- Keep answers short and clear (3-6 short paragraphs or bullet points).
- If something is uncertain because the data is missing, say so.
- Always remind that this is not professional financial advice."#;

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 400;

fn fmt_opt_rmse(v: Option<f64>, label: &str) -> Option<String> {
    v.map(|r| format!("{} {:.2}", label, r))
}

/// Plain-text analytics summary the assistant answers from.
pub fn analytics_summary(username: &str, snapshot: &ForecastSnapshot, label: &str) -> String {
    let top = if snapshot.top_categories.is_empty() {
        "No strong spending categories yet.".to_string()
    } else {
        snapshot
            .top_categories
            .iter()
            .map(|c| format!("{} ({} {:.2})", c.name, label, c.total.round_dp(2)))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let rmse_expense =
        fmt_opt_rmse(snapshot.rmse_expense(), label).unwrap_or_else(|| "N/A".to_string());
    let rmse_income = if snapshot.has_income_data() {
        fmt_opt_rmse(snapshot.rmse_income(), label)
    } else {
        None
    }
    .unwrap_or_else(|| "N/A or no income data".to_string());

    format!(
        "User: {user} | History window: last {months} month(s).\n\
         \n\
         Current balance (all accounts combined): {label} {balance:.2}\n\
         \n\
         Predicted next 30 days:\n\
         - Expenses: {exp}\n\
         - Income:   {inc}\n\
         \n\
         Expected balance in 30 days: {expected}\n\
         Net 30-day cash flow (income - expense): {net}\n\
         \n\
         Top spending categories recently:\n\
         {top}\n\
         \n\
         Model quality (approximate):\n\
         - Expense model RMSE: {rmse_expense}\n\
         - Income model RMSE:  {rmse_income}",
        user = username,
        months = snapshot.months,
        balance = snapshot.current_balance.round_dp(2),
        exp = fmt_opt_money(snapshot.predicted_30d_expense.as_ref(), label),
        inc = fmt_opt_money(snapshot.predicted_30d_income.as_ref(), label),
        expected = fmt_opt_money(snapshot.expected_balance_30.as_ref(), label),
        net = fmt_opt_money(snapshot.net_30.as_ref(), label),
    )
}

pub fn user_prompt(summary: &str, question: &str) -> String {
    format!(
        "Here is my analytics summary:\n\n{}\n\nNow my question is:\n{}\n",
        summary, question
    )
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Blocking client for `/v1/chat/completions`.
pub struct ChatClient {
    http: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl ChatClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            base_url: settings.openai_base_url.trim_end_matches('/').to_string(),
            model: settings.openai_model.clone(),
            api_key: settings.require_openai_api_key()?.to_string(),
        })
    }

    pub fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };
        tracing::debug!(model = %self.model, "sending chat completion");
        let resp = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| MoneyError::Assistant(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(MoneyError::Assistant(format!("status {}: {}", status, body)).into());
        }
        let parsed: ChatCompletionResponse = resp
            .json()
            .map_err(|e| MoneyError::Assistant(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| MoneyError::Assistant("empty response".into()).into())
    }
}
