use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::{
    error::{FieldIssue, ValidationError},
    models::{
        AssetClass, AssetStatus, ClosedEnum, CommissionType, CreateOrderInput, CryptoAsset,
        CryptoFundingDetails, CryptoNetwork, FiatCurrency, FiatFundingDetails, FiatMethod,
        FundRequest, FundingDetails, FundingInput, FundingType, GetAccountInput, GetOrderInput,
        GetPositionInput, ListAssetsInput, ListOrdersInput, ListPositionsInput,
        ListTransactionsInput, OrderRequest, OrderSide, OrderStatus, OrderType, Pagination,
        SearchAssetsInput, TimeInForce, TransactionStatus, TransactionType, ValidatedInput,
    },
};

pub const MAX_PAGE_LIMIT: u64 = 100;

const ACCOUNT_ID_MESSAGE: &str = "Invalid account ID format";
const DATE_MESSAGE: &str = "Date must be in YYYY-MM-DD format";

pub type Validator = fn(&Map<String, Value>) -> Result<ValidatedInput, ValidationError>;

// ASCII digits only; `\d` would also accept other Unicode decimal digits.
fn decimal_pattern() -> &'static Regex {
    static DECIMAL: OnceLock<Regex> = OnceLock::new();
    DECIMAL.get_or_init(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("decimal regex is valid"))
}

fn date_pattern() -> &'static Regex {
    static DATE: OnceLock<Regex> = OnceLock::new();
    DATE.get_or_init(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date regex is valid"))
}

// Canonical 8-4-4-4-12 hex form only.
pub fn is_canonical_uuid(value: &str) -> bool {
    value.len() == 36 && uuid::Uuid::try_parse(value).is_ok()
}

pub fn is_decimal(value: &str) -> bool {
    decimal_pattern().is_match(value)
}

pub fn is_date(value: &str) -> bool {
    date_pattern().is_match(value)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn expected(kind: &str, got: &Value) -> String {
    format!("Expected {kind}, received {}", json_type(got))
}

fn enum_message(values: &[&str], received: &str) -> String {
    let expected = values
        .iter()
        .map(|v| format!("'{v}'"))
        .collect::<Vec<_>>()
        .join(" | ");
    format!("Invalid enum value. Expected {expected}, received '{received}'")
}

struct Fields<'a> {
    args: &'a Map<String, Value>,
    prefix: String,
    issues: Vec<FieldIssue>,
}

impl<'a> Fields<'a> {
    fn new(args: &'a Map<String, Value>) -> Self {
        Self {
            args,
            prefix: String::new(),
            issues: Vec::new(),
        }
    }

    fn nested(args: &'a Map<String, Value>, parent: &str) -> Self {
        Self {
            args,
            prefix: format!("{parent}."),
            issues: Vec::new(),
        }
    }

    fn issue(&mut self, key: &str, message: impl Into<String>) {
        self.issues
            .push(FieldIssue::new(format!("{}{key}", self.prefix), message));
    }

    fn absorb(&mut self, child: Fields<'_>) {
        self.issues.extend(child.issues);
    }

    fn present(&mut self, key: &str, required: bool) -> Option<&'a Value> {
        let value = self.args.get(key);
        if value.is_none() && required {
            self.issue(key, "Required");
        }
        value
    }

    fn text(&mut self, key: &str, required: bool) -> Option<String> {
        match self.present(key, required)? {
            Value::String(s) => Some(s.clone()),
            other => {
                let message = expected("string", other);
                self.issue(key, message);
                None
            }
        }
    }

    fn string(&mut self, key: &str) -> Option<String> {
        self.text(key, false)
    }

    fn require_non_empty(&mut self, key: &str, message: &str) -> Option<String> {
        let value = self.text(key, true)?;
        if value.is_empty() {
            self.issue(key, message);
            return None;
        }
        Some(value)
    }

    fn require_uuid(&mut self, key: &str, message: &str) -> Option<String> {
        let value = self.text(key, true)?;
        if !is_canonical_uuid(&value) {
            self.issue(key, message);
            return None;
        }
        Some(value)
    }

    fn matching(
        &mut self,
        key: &str,
        required: bool,
        check: fn(&str) -> bool,
        message: &str,
    ) -> Option<String> {
        let value = self.text(key, required)?;
        if !check(&value) {
            self.issue(key, message);
            return None;
        }
        Some(value)
    }

    fn decimal(&mut self, key: &str, message: &str) -> Option<String> {
        self.matching(key, false, is_decimal, message)
    }

    fn require_decimal(&mut self, key: &str, message: &str) -> Option<String> {
        self.matching(key, true, is_decimal, message)
    }

    fn date(&mut self, key: &str) -> Option<String> {
        self.matching(key, false, is_date, DATE_MESSAGE)
    }

    fn boolean(&mut self, key: &str) -> Option<bool> {
        match self.present(key, false)? {
            Value::Bool(b) => Some(*b),
            other => {
                let message = expected("boolean", other);
                self.issue(key, message);
                None
            }
        }
    }

    fn flag(&mut self, key: &str) -> bool {
        self.boolean(key).unwrap_or(false)
    }

    fn choice_of<E: ClosedEnum>(&mut self, key: &str, required: bool) -> Option<E> {
        let raw = self.text(key, required)?;
        let parsed = E::parse(&raw);
        if parsed.is_none() {
            self.issue(key, enum_message(E::VALUES, &raw));
        }
        parsed
    }

    fn choice<E: ClosedEnum>(&mut self, key: &str) -> Option<E> {
        self.choice_of(key, false)
    }

    fn require_choice<E: ClosedEnum>(&mut self, key: &str) -> Option<E> {
        self.choice_of(key, true)
    }

    fn integer(&mut self, key: &str, min: u64, max: u64, default: u64) -> u64 {
        let Some(value) = self.present(key, false) else {
            return default;
        };
        let Value::Number(number) = value else {
            let message = expected("number", value);
            self.issue(key, message);
            return default;
        };
        let whole = if let Some(n) = number.as_i64() {
            i128::from(n)
        } else if let Some(n) = number.as_u64() {
            i128::from(n)
        } else {
            let float = number.as_f64().unwrap_or(f64::NAN);
            if !float.is_finite() || float.fract() != 0.0 {
                self.issue(key, "Expected integer, received float");
                return default;
            }
            float as i128
        };
        if whole < i128::from(min) {
            self.issue(key, format!("Number must be greater than or equal to {min}"));
            return default;
        }
        if whole > i128::from(max) {
            self.issue(key, format!("Number must be less than or equal to {max}"));
            return default;
        }
        u64::try_from(whole).unwrap_or(default)
    }

    fn pagination(&mut self) -> Pagination {
        let defaults = Pagination::default();
        let limit = self.integer("limit", 1, MAX_PAGE_LIMIT, u64::from(defaults.limit));
        let offset = self.integer("offset", 0, u64::MAX, defaults.offset);
        Pagination {
            limit: u32::try_from(limit).unwrap_or(defaults.limit),
            offset,
        }
    }

    fn funding_details(&mut self) -> Option<FundingDetails> {
        const KEY: &str = "funding_details";
        let details = match self.present(KEY, true)? {
            Value::Object(map) => map,
            other => {
                let message = expected("object", other);
                self.issue(KEY, message);
                return None;
            }
        };

        let mut inner = Fields::nested(details, &format!("{}{KEY}", self.prefix));
        let discriminant = details
            .get("funding_type")
            .and_then(Value::as_str)
            .and_then(FundingType::parse);

        let parsed = match discriminant {
            None => {
                inner.issue(
                    "funding_type",
                    "Invalid discriminator value. Expected 'fiat' | 'crypto'",
                );
                None
            }
            Some(FundingType::Fiat) => {
                let fiat_currency = inner.require_choice::<FiatCurrency>("fiat_currency");
                let bank_account_id =
                    inner.require_non_empty("bank_account_id", "Bank account ID is required");
                let method = inner.require_choice::<FiatMethod>("method");
                (|| {
                    Some(FundingDetails::Fiat(FiatFundingDetails {
                        fiat_currency: fiat_currency?,
                        bank_account_id: bank_account_id?,
                        method: method?,
                    }))
                })()
            }
            Some(FundingType::Crypto) => {
                let crypto_asset = inner.require_choice::<CryptoAsset>("crypto_asset");
                let wallet_address =
                    inner.require_non_empty("wallet_address", "Wallet address is required");
                let network = inner.require_choice::<CryptoNetwork>("network");
                (|| {
                    Some(FundingDetails::Crypto(CryptoFundingDetails {
                        crypto_asset: crypto_asset?,
                        wallet_address: wallet_address?,
                        network: network?,
                    }))
                })()
            }
        };

        self.absorb(inner);
        parsed
    }

    fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, ValidationError> {
        if !self.issues.is_empty() {
            return Err(ValidationError {
                issues: self.issues,
            });
        }
        build().ok_or_else(|| ValidationError::single("", "Invalid input"))
    }
}

pub fn validate_list_positions(args: &Map<String, Value>) -> Result<ValidatedInput, ValidationError> {
    let mut f = Fields::new(args);
    let account_id = f.require_uuid("account_id", ACCOUNT_ID_MESSAGE);
    let symbol = f.string("symbol");
    let non_zero_only = f.flag("non_zero_only");
    let refresh_prices = f.flag("refresh_prices");
    f.finish(|| {
        Some(ValidatedInput::ListPositions(ListPositionsInput {
            account_id: account_id?,
            symbol,
            non_zero_only,
            refresh_prices,
        }))
    })
}

pub fn validate_get_position(args: &Map<String, Value>) -> Result<ValidatedInput, ValidationError> {
    let mut f = Fields::new(args);
    let account_id = f.require_uuid("account_id", ACCOUNT_ID_MESSAGE);
    let position_id = f.require_uuid("position_id", "Invalid position ID format");
    let refresh_prices = f.flag("refresh_prices");
    f.finish(|| {
        Some(ValidatedInput::GetPosition(GetPositionInput {
            account_id: account_id?,
            position_id: position_id?,
            refresh_prices,
        }))
    })
}

pub fn validate_list_orders(args: &Map<String, Value>) -> Result<ValidatedInput, ValidationError> {
    let mut f = Fields::new(args);
    let account_id = f.require_uuid("account_id", ACCOUNT_ID_MESSAGE);
    let status = f.choice::<OrderStatus>("status");
    let symbol = f.string("symbol");
    let side = f.choice::<OrderSide>("side");
    let pagination = f.pagination();
    f.finish(|| {
        Some(ValidatedInput::ListOrders(ListOrdersInput {
            account_id: account_id?,
            status,
            symbol,
            side,
            pagination,
        }))
    })
}

pub fn validate_create_order(args: &Map<String, Value>) -> Result<ValidatedInput, ValidationError> {
    let mut f = Fields::new(args);
    let account_id = f.require_uuid("account_id", ACCOUNT_ID_MESSAGE);
    let symbol = f.require_non_empty("symbol", "Symbol is required");
    let qty = f.require_decimal("qty", "Quantity must be a valid number");
    let side = f.require_choice::<OrderSide>("side");
    let order_type = f.require_choice::<OrderType>("type");
    let time_in_force = f.require_choice::<TimeInForce>("time_in_force");
    let limit_price = f.decimal("limit_price", "Limit price must be a valid number");
    let client_order_id = f.string("client_order_id");
    let commission = f.decimal("commission", "Commission must be a valid number");
    let commission_type = f.choice::<CommissionType>("commission_type");

    if order_type == Some(OrderType::Limit) && !args.contains_key("limit_price") {
        f.issue("limit_price", "limit_price is required when order type is limit");
    }

    f.finish(|| {
        Some(ValidatedInput::CreateOrder(CreateOrderInput {
            account_id: account_id?,
            order: OrderRequest {
                symbol: symbol?,
                qty: qty?,
                side: side?,
                order_type: order_type?,
                time_in_force: time_in_force?,
                limit_price,
                client_order_id,
                commission,
                commission_type,
            },
        }))
    })
}

pub fn validate_get_order(args: &Map<String, Value>) -> Result<ValidatedInput, ValidationError> {
    let mut f = Fields::new(args);
    let order_id = f.require_uuid("order_id", "Invalid order ID format");
    f.finish(|| {
        Some(ValidatedInput::GetOrderStatus(GetOrderInput {
            order_id: order_id?,
        }))
    })
}

pub fn validate_list_assets(args: &Map<String, Value>) -> Result<ValidatedInput, ValidationError> {
    let mut f = Fields::new(args);
    let asset_class = f.choice::<AssetClass>("asset_class");
    let tradable = f.boolean("tradable");
    f.finish(|| {
        Some(ValidatedInput::ListAssets(ListAssetsInput {
            asset_class,
            tradable,
        }))
    })
}

pub fn validate_search_assets(args: &Map<String, Value>) -> Result<ValidatedInput, ValidationError> {
    let mut f = Fields::new(args);
    let q = f.string("q");
    let status = f.choice::<AssetStatus>("status");
    let asset_class = f.choice::<AssetClass>("asset_class");
    let tradable = f.boolean("tradable");
    let pagination = f.pagination();
    f.finish(|| {
        Some(ValidatedInput::SearchAssets(SearchAssetsInput {
            q,
            status,
            asset_class,
            tradable,
            pagination,
        }))
    })
}

pub fn validate_list_transactions(
    args: &Map<String, Value>,
) -> Result<ValidatedInput, ValidationError> {
    let mut f = Fields::new(args);
    let account_id = f.require_uuid("account_id", ACCOUNT_ID_MESSAGE);
    let transaction_type = f.choice::<TransactionType>("type");
    let status = f.choice::<TransactionStatus>("status");
    let funding_type = f.choice::<FundingType>("funding_type");
    let date_from = f.date("date_from");
    let date_to = f.date("date_to");
    let pagination = f.pagination();
    f.finish(|| {
        Some(ValidatedInput::ListTransactions(ListTransactionsInput {
            account_id: account_id?,
            transaction_type,
            status,
            funding_type,
            date_from,
            date_to,
            pagination,
        }))
    })
}

fn funding_input(args: &Map<String, Value>) -> Result<FundingInput, ValidationError> {
    let mut f = Fields::new(args);
    let account_id = f.require_uuid("account_id", ACCOUNT_ID_MESSAGE);
    let amount = f.require_decimal("amount", "Amount must be a valid number");
    let funding_details = f.funding_details();
    let description = f.string("description");
    let external_reference_id = f.string("external_reference_id");
    f.finish(|| {
        Some(FundingInput {
            account_id: account_id?,
            request: FundRequest {
                amount: amount?,
                funding_details: funding_details?,
                description,
                external_reference_id,
            },
        })
    })
}

pub fn validate_fund_account(args: &Map<String, Value>) -> Result<ValidatedInput, ValidationError> {
    funding_input(args).map(ValidatedInput::FundAccount)
}

pub fn validate_withdraw_funds(args: &Map<String, Value>) -> Result<ValidatedInput, ValidationError> {
    funding_input(args).map(ValidatedInput::WithdrawFunds)
}

pub fn validate_list_accounts(_args: &Map<String, Value>) -> Result<ValidatedInput, ValidationError> {
    Ok(ValidatedInput::ListAccounts)
}

pub fn validate_get_account(args: &Map<String, Value>) -> Result<ValidatedInput, ValidationError> {
    let mut f = Fields::new(args);
    let account_id = f.require_uuid("account_id", ACCOUNT_ID_MESSAGE);
    f.finish(|| {
        Some(ValidatedInput::GetAccount(GetAccountInput {
            account_id: account_id?,
        }))
    })
}

pub fn argument_object(raw: &Value) -> Result<Map<String, Value>, ValidationError> {
    match raw {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map.clone()),
        other => Err(ValidationError::single("", expected("object", other))),
    }
}
