use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    client::Transport,
    envelope::ToolResult,
    error::DispatchError,
    models::{
        AssetClass, AssetStatus, CommissionType, CryptoAsset, CryptoNetwork, FiatCurrency,
        FiatMethod, FundingType, OrderSide, OrderStatus, OrderType, TimeInForce,
        TransactionStatus, TransactionType,
    },
    schema::{self, argument_object, Validator, MAX_PAGE_LIMIT},
};

pub const ORDER_CREATED: &str = "Order created successfully!";
pub const FUNDING_SUBMITTED: &str = "Funding request submitted successfully!";
pub const WITHDRAWAL_SUBMITTED: &str = "Withdrawal request submitted successfully!";

pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    validator: Validator,
    confirmation: Option<&'static str>,
}

impl ToolSpec {
    fn new(
        name: &'static str,
        description: &'static str,
        input_schema: Value,
        validator: Validator,
    ) -> Self {
        Self {
            name,
            description,
            input_schema,
            validator,
            confirmation: None,
        }
    }

    fn confirmed_with(mut self, line: &'static str) -> Self {
        self.confirmation = Some(line);
        self
    }

    pub fn takes_account_id(&self) -> bool {
        self.input_schema["properties"].get("account_id").is_some()
    }

    // With a configured default account, `account_id` is no longer required
    // from the caller.
    pub fn definition(&self, account_id_optional: bool) -> Value {
        let mut input_schema = self.input_schema.clone();
        if account_id_optional {
            let emptied = match input_schema.get_mut("required").and_then(Value::as_array_mut) {
                Some(required) => {
                    required.retain(|field| field != "account_id");
                    required.is_empty()
                }
                None => false,
            };
            if emptied {
                if let Some(schema) = input_schema.as_object_mut() {
                    schema.remove("required");
                }
            }
        }

        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": input_schema,
        })
    }
}

pub struct ToolRegistry {
    tools: Vec<ToolSpec>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: tool_specs(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    pub fn definitions(&self, account_id_optional: bool) -> Vec<Value> {
        self.tools
            .iter()
            .map(|tool| tool.definition(account_id_optional))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

pub struct Dispatcher {
    registry: ToolRegistry,
    transport: Arc<dyn Transport>,
    default_account_id: Option<String>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, default_account_id: Option<String>) -> Self {
        Self {
            registry: ToolRegistry::new(),
            transport,
            default_account_id,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn tool_definitions(&self) -> Vec<Value> {
        self.registry.definitions(self.default_account_id.is_some())
    }

    // Validation and upstream failures come back as error envelopes; only an
    // unregistered name or an internal fault is an `Err`.
    pub async fn dispatch(&self, name: &str, arguments: &Value) -> Result<ToolResult, DispatchError> {
        let Some(spec) = self.registry.get(name) else {
            return Err(DispatchError::UnknownTool(name.to_string()));
        };

        let trace_id = Uuid::new_v4();
        let span = info_span!("tool_call", tool = spec.name, trace_id = %trace_id);
        self.run(spec, arguments).instrument(span).await
    }

    async fn run(&self, spec: &ToolSpec, arguments: &Value) -> Result<ToolResult, DispatchError> {
        let mut args = match argument_object(arguments) {
            Ok(args) => args,
            Err(err) => {
                warn!(issues = %err, "Rejected tool arguments");
                return Ok(ToolResult::invalid_input(&err));
            }
        };
        self.apply_default_account(spec, &mut args);

        let input = match (spec.validator)(&args) {
            Ok(input) => input,
            Err(err) => {
                warn!(issues = %err, "Rejected tool arguments");
                return Ok(ToolResult::invalid_input(&err));
            }
        };

        let request = input.to_request().map_err(|e| DispatchError::Unexpected {
            tool: spec.name.to_string(),
            source: e.into(),
        })?;

        match self.transport.execute(&request).await {
            Ok(payload) => {
                info!(method = request.method.as_str(), path = %request.path, "Tool executed successfully");
                Ok(ToolResult::success(&payload, spec.confirmation))
            }
            Err(err) => {
                warn!(error = %err, "Bluum API call failed");
                Ok(ToolResult::upstream_failure(&err))
            }
        }
    }

    fn apply_default_account(&self, spec: &ToolSpec, args: &mut Map<String, Value>) {
        let Some(default) = &self.default_account_id else {
            return;
        };
        if spec.takes_account_id() && !args.contains_key("account_id") {
            args.insert("account_id".to_string(), Value::String(default.clone()));
        }
    }
}

fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new(
            "list_positions",
            "View current portfolio positions for an account, including quantity, cost basis, current value, and unrealized profit/loss. Optionally refresh live prices from market data providers.",
            object_schema(
                json!({
                    "account_id": uuid_prop("The account ID to retrieve positions for"),
                    "symbol": string_prop("Filter positions by ticker symbol (e.g., AAPL)"),
                    "non_zero_only": flag_prop("Only return positions with non-zero quantity"),
                    "refresh_prices": flag_prop("Fetch live prices from market data providers (adds latency but provides real-time data)"),
                }),
                &["account_id"],
            ),
            schema::validate_list_positions,
        ),
        ToolSpec::new(
            "get_position",
            "Retrieve detailed information about a specific position, including P/L calculations and optionally live market prices with source and confidence metadata.",
            object_schema(
                json!({
                    "account_id": uuid_prop("The account ID"),
                    "position_id": uuid_prop("The position ID to retrieve"),
                    "refresh_prices": flag_prop("Fetch live price from market data providers"),
                }),
                &["account_id", "position_id"],
            ),
            schema::validate_get_position,
        ),
        ToolSpec::new(
            "list_orders",
            "List trading orders for a specific account with optional filtering by status, symbol, or side. Supports pagination.",
            object_schema(
                with_pagination(
                    json!({
                        "account_id": uuid_prop("The account ID to retrieve orders for"),
                        "status": enum_prop(OrderStatus::VALUES, "Filter orders by status"),
                        "symbol": string_prop("Filter orders by ticker symbol (e.g., AAPL)"),
                        "side": enum_prop(OrderSide::VALUES, "Filter orders by side (buy or sell)"),
                    }),
                    "orders",
                ),
                &["account_id"],
            ),
            schema::validate_list_orders,
        ),
        ToolSpec::new(
            "create_order",
            "Place a new trading order (buy or sell) for a specific account. Supports market orders (immediate execution at current price) and limit orders (execution at specific price). IMPORTANT: For limit orders, limit_price is required.",
            object_schema(
                json!({
                    "account_id": uuid_prop("The account ID to place the order for"),
                    "symbol": string_prop("Ticker symbol of the asset to trade (e.g., AAPL, TSLA, BTC)"),
                    "qty": string_prop("Quantity of shares to trade (as a string, can be fractional like \"10.5\")"),
                    "side": enum_prop(OrderSide::VALUES, "Whether to buy or sell the asset"),
                    "type": enum_prop(OrderType::VALUES, "Order type: \"market\" executes immediately at current price, \"limit\" executes only at specified price or better"),
                    "time_in_force": enum_prop(TimeInForce::VALUES, "How long the order remains active: \"day\" expires at end of trading day, \"gtc\" (good till canceled) remains active until filled or canceled"),
                    "limit_price": string_prop("Price limit for limit orders (required when type is \"limit\"). Must be a valid number as a string."),
                    "client_order_id": string_prop("Optional client-provided identifier for tracking"),
                    "commission": string_prop("Optional commission amount to charge"),
                    "commission_type": enum_prop(CommissionType::VALUES, "Commission calculation method: notional (per order), qty (per share), bps (basis points)"),
                }),
                &["account_id", "symbol", "qty", "side", "type", "time_in_force"],
            ),
            schema::validate_create_order,
        )
        .confirmed_with(ORDER_CREATED),
        ToolSpec::new(
            "get_order_status",
            "Retrieve the current status and details of a specific order by its order ID.",
            object_schema(
                json!({ "order_id": uuid_prop("The order ID to retrieve") }),
                &["order_id"],
            ),
            schema::validate_get_order,
        ),
        ToolSpec::new(
            "list_assets",
            "Retrieve a list of tradable assets (stocks, crypto) available on the platform. Can filter by asset class or tradability status.",
            object_schema(
                json!({
                    "asset_class": enum_prop(AssetClass::VALUES, "Filter by asset class: us_equity for stocks or crypto for cryptocurrencies"),
                    "tradable": { "type": "boolean", "description": "Filter for assets that are currently tradable (true) or not tradable (false)" },
                }),
                &[],
            ),
            schema::validate_list_assets,
        ),
        ToolSpec::new(
            "search_assets",
            "Search for assets by ticker symbol, name, or partial match. More flexible than list_assets for finding specific securities. Supports fuzzy matching.",
            object_schema(
                with_pagination(
                    json!({
                        "q": string_prop("Search query - ticker, company name, or partial match (e.g., \"app\" matches AAPL, \"tesla\" matches TSLA)"),
                        "status": enum_prop(AssetStatus::VALUES, "Filter by asset status"),
                        "asset_class": enum_prop(AssetClass::VALUES, "Filter by asset class"),
                        "tradable": { "type": "boolean", "description": "Filter for assets that are currently tradable" },
                    }),
                    "results",
                ),
                &[],
            ),
            schema::validate_search_assets,
        ),
        ToolSpec::new(
            "list_transactions",
            "View transaction history for an account, including deposits and withdrawals. Supports filtering by type, status, funding type, and date range.",
            object_schema(
                with_pagination(
                    json!({
                        "account_id": uuid_prop("The account ID to retrieve transactions for"),
                        "type": enum_prop(TransactionType::VALUES, "Filter transactions by type"),
                        "status": enum_prop(TransactionStatus::VALUES, "Filter transactions by status"),
                        "funding_type": enum_prop(FundingType::VALUES, "Filter by funding type: fiat (bank transfer) or crypto (cryptocurrency)"),
                        "date_from": string_prop("Filter transactions from this date (YYYY-MM-DD format)"),
                        "date_to": string_prop("Filter transactions to this date (YYYY-MM-DD format)"),
                    }),
                    "transactions",
                ),
                &["account_id"],
            ),
            schema::validate_list_transactions,
        ),
        ToolSpec::new(
            "fund_account",
            "Deposit funds into an investment account via fiat (ACH/wire) or crypto transfer. The transaction will be processed asynchronously.",
            funding_schema(
                "The account ID to fund",
                "Amount to deposit (as a string, e.g., \"5000.00\")",
                "Funding method details (fiat or crypto)",
                "Optional description for the funding transaction",
            ),
            schema::validate_fund_account,
        )
        .confirmed_with(FUNDING_SUBMITTED),
        ToolSpec::new(
            "withdraw_funds",
            "Withdraw funds from an investment account via fiat (ACH/wire) or crypto transfer. The transaction will be processed asynchronously.",
            funding_schema(
                "The account ID to withdraw from",
                "Amount to withdraw (as a string, e.g., \"1000.00\")",
                "Withdrawal method details (fiat or crypto)",
                "Optional description for the withdrawal transaction",
            ),
            schema::validate_withdraw_funds,
        )
        .confirmed_with(WITHDRAWAL_SUBMITTED),
        ToolSpec::new(
            "list_accounts",
            "List all investment accounts accessible with the current API credentials.",
            object_schema(json!({}), &[]),
            schema::validate_list_accounts,
        ),
        ToolSpec::new(
            "get_account",
            "Retrieve detailed information about a specific account, including status, balance, enabled assets, and contact information.",
            object_schema(
                json!({ "account_id": uuid_prop("The account ID to retrieve") }),
                &["account_id"],
            ),
            schema::validate_get_account,
        ),
    ]
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    let mut schema = json!({ "type": "object", "properties": properties });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

fn uuid_prop(description: &str) -> Value {
    json!({ "type": "string", "format": "uuid", "description": description })
}

fn string_prop(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn flag_prop(description: &str) -> Value {
    json!({ "type": "boolean", "default": false, "description": description })
}

fn enum_prop(values: &[&str], description: &str) -> Value {
    json!({ "type": "string", "enum": values, "description": description })
}

fn with_pagination(mut properties: Value, noun: &str) -> Value {
    properties["limit"] = json!({
        "type": "integer",
        "minimum": 1,
        "maximum": MAX_PAGE_LIMIT,
        "default": 50,
        "description": format!("Maximum number of {noun} to return"),
    });
    properties["offset"] = json!({
        "type": "integer",
        "minimum": 0,
        "default": 0,
        "description": format!("Number of {noun} to skip (for pagination)"),
    });
    properties
}

fn funding_schema(account: &str, amount: &str, details: &str, description: &str) -> Value {
    object_schema(
        json!({
            "account_id": uuid_prop(account),
            "amount": string_prop(amount),
            "funding_details": {
                "type": "object",
                "description": details,
                "oneOf": [
                    {
                        "type": "object",
                        "properties": {
                            "funding_type": { "type": "string", "const": "fiat" },
                            "fiat_currency": { "type": "string", "enum": FiatCurrency::VALUES },
                            "bank_account_id": { "type": "string" },
                            "method": { "type": "string", "enum": FiatMethod::VALUES },
                        },
                        "required": ["funding_type", "fiat_currency", "bank_account_id", "method"],
                    },
                    {
                        "type": "object",
                        "properties": {
                            "funding_type": { "type": "string", "const": "crypto" },
                            "crypto_asset": { "type": "string", "enum": CryptoAsset::VALUES },
                            "wallet_address": { "type": "string" },
                            "network": { "type": "string", "enum": CryptoNetwork::VALUES },
                        },
                        "required": ["funding_type", "crypto_asset", "wallet_address", "network"],
                    },
                ],
            },
            "description": string_prop(description),
            "external_reference_id": string_prop("Optional external reference ID for tracking"),
        }),
        &["account_id", "amount", "funding_details"],
    )
}
