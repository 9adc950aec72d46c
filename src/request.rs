use serde::Serialize;
use serde_json::Value;

use crate::models::ValidatedInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    fn get(path: String) -> Self {
        Self {
            method: HttpMethod::Get,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    fn post<B: Serialize>(path: String, body: &B) -> serde_json::Result<Self> {
        Ok(Self {
            method: HttpMethod::Post,
            path,
            query: Vec::new(),
            body: Some(serde_json::to_value(body)?),
        })
    }

    fn with_query<F: Serialize>(mut self, filters: &F, path_fields: &[&str]) -> serde_json::Result<Self> {
        self.query = query_pairs(serde_json::to_value(filters)?, path_fields);
        Ok(self)
    }
}

fn query_pairs(value: Value, path_fields: &[&str]) -> Vec<(String, String)> {
    let Value::Object(fields) = value else {
        return Vec::new();
    };
    fields
        .into_iter()
        .filter(|(key, _)| !path_fields.contains(&key.as_str()))
        .filter_map(|(key, value)| {
            let rendered = match value {
                Value::Null => return None,
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            Some((key, rendered))
        })
        .collect()
}

const ACCOUNT_ID: &[&str] = &["account_id"];

impl ValidatedInput {
    // Withdrawals are not account-scoped; the whole record, account_id included, is the body.
    pub fn to_request(&self) -> serde_json::Result<RequestDescriptor> {
        match self {
            Self::ListPositions(input) => RequestDescriptor::get(format!(
                "/trading/accounts/{}/positions",
                input.account_id
            ))
            .with_query(input, ACCOUNT_ID),
            Self::GetPosition(input) => RequestDescriptor::get(format!(
                "/trading/accounts/{}/positions/{}",
                input.account_id, input.position_id
            ))
            .with_query(input, &["account_id", "position_id"]),
            Self::ListOrders(input) => RequestDescriptor::get(format!(
                "/trading/accounts/{}/orders",
                input.account_id
            ))
            .with_query(input, ACCOUNT_ID),
            Self::CreateOrder(input) => RequestDescriptor::post(
                format!("/trading/accounts/{}/orders", input.account_id),
                &input.order,
            ),
            Self::GetOrderStatus(input) => Ok(RequestDescriptor::get(format!(
                "/trading/orders/{}",
                input.order_id
            ))),
            Self::ListAssets(input) => {
                RequestDescriptor::get("/assets".to_string()).with_query(input, &[])
            }
            Self::SearchAssets(input) => {
                RequestDescriptor::get("/assets/search".to_string()).with_query(input, &[])
            }
            Self::ListTransactions(input) => RequestDescriptor::get(format!(
                "/wallet/accounts/{}/transactions",
                input.account_id
            ))
            .with_query(input, ACCOUNT_ID),
            Self::FundAccount(input) => RequestDescriptor::post(
                format!("/wallet/accounts/{}/funding", input.account_id),
                &input.request,
            ),
            Self::WithdrawFunds(input) => {
                RequestDescriptor::post("/wallet/withdrawals".to_string(), input)
            }
            Self::ListAccounts => Ok(RequestDescriptor::get("/accounts".to_string())),
            Self::GetAccount(input) => Ok(RequestDescriptor::get(format!(
                "/accounts/{}",
                input.account_id
            ))),
        }
    }
}
