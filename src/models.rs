use serde::{Serialize, Serializer};

pub trait ClosedEnum: Sized + Copy {
    const VALUES: &'static [&'static str];

    fn parse(value: &str) -> Option<Self>;
}

macro_rules! closed_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const VALUES: &'static [&'static str] = &[$($wire),+];

            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($wire => Some(Self::$variant),)+
                    _ => None,
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl ClosedEnum for $name {
            const VALUES: &'static [&'static str] = $name::VALUES;

            fn parse(value: &str) -> Option<Self> {
                $name::parse(value)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }
    };
}

closed_enum!(OrderSide { Buy => "buy", Sell => "sell" });
closed_enum!(OrderType { Market => "market", Limit => "limit" });
closed_enum!(TimeInForce { Day => "day", Gtc => "gtc" });
closed_enum!(OrderStatus {
    Accepted => "accepted",
    Filled => "filled",
    PartiallyFilled => "partially_filled",
    Canceled => "canceled",
    Rejected => "rejected",
});
closed_enum!(
    CommissionType {
        Notional => "notional",
        Qty => "qty",
        Bps => "bps",
    }
);
closed_enum!(AssetClass { UsEquity => "us_equity", Crypto => "crypto" });
closed_enum!(AssetStatus { Active => "active", Inactive => "inactive" });
closed_enum!(TransactionType { Deposit => "deposit", Withdrawal => "withdrawal" });
closed_enum!(TransactionStatus {
    Pending => "pending",
    Processing => "processing",
    Settled => "settled",
    Failed => "failed",
    Canceled => "canceled",
});
closed_enum!(FundingType { Fiat => "fiat", Crypto => "crypto" });
closed_enum!(FiatCurrency { Usd => "USD" });
closed_enum!(FiatMethod { Ach => "ach", Wire => "wire" });
closed_enum!(CryptoAsset {
    Btc => "BTC",
    Eth => "ETH",
    Usdc => "USDC",
    Usdt => "USDT",
});
closed_enum!(CryptoNetwork {
    Bitcoin => "Bitcoin",
    Ethereum => "Ethereum",
    Polygon => "Polygon",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListPositionsInput {
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub non_zero_only: bool,
    pub refresh_prices: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetPositionInput {
    pub account_id: String,
    pub position_id: String,
    pub refresh_prices: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListOrdersInput {
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<OrderSide>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub qty: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_type: Option<CommissionType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateOrderInput {
    pub account_id: String,
    #[serde(flatten)]
    pub order: OrderRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetOrderInput {
    pub order_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListAssetsInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_class: Option<AssetClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tradable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchAssetsInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AssetStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_class: Option<AssetClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tradable: Option<bool>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListTransactionsInput {
    pub account_id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TransactionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding_type: Option<FundingType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiatFundingDetails {
    pub fiat_currency: FiatCurrency,
    pub bank_account_id: String,
    pub method: FiatMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CryptoFundingDetails {
    pub crypto_asset: CryptoAsset,
    pub wallet_address: String,
    pub network: CryptoNetwork,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "funding_type", rename_all = "lowercase")]
pub enum FundingDetails {
    Fiat(FiatFundingDetails),
    Crypto(CryptoFundingDetails),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundRequest {
    pub amount: String,
    pub funding_details: FundingDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_reference_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundingInput {
    pub account_id: String,
    #[serde(flatten)]
    pub request: FundRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetAccountInput {
    pub account_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedInput {
    ListPositions(ListPositionsInput),
    GetPosition(GetPositionInput),
    ListOrders(ListOrdersInput),
    CreateOrder(CreateOrderInput),
    GetOrderStatus(GetOrderInput),
    ListAssets(ListAssetsInput),
    SearchAssets(SearchAssetsInput),
    ListTransactions(ListTransactionsInput),
    FundAccount(FundingInput),
    WithdrawFunds(FundingInput),
    ListAccounts,
    GetAccount(GetAccountInput),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn closed_enums_parse_only_wire_spellings() {
        assert_eq!(OrderStatus::parse("partially_filled"), Some(OrderStatus::PartiallyFilled));
        assert_eq!(OrderStatus::parse("Filled"), None);
        assert_eq!(CryptoAsset::parse("btc"), None);
        assert_eq!(FiatCurrency::Usd.as_str(), "USD");
        assert_eq!(CryptoNetwork::VALUES, &["Bitcoin", "Ethereum", "Polygon"]);
    }

    #[test]
    fn funding_details_serialize_with_inline_tag() {
        let details = FundingDetails::Crypto(CryptoFundingDetails {
            crypto_asset: CryptoAsset::Usdc,
            wallet_address: "0xabc".to_string(),
            network: CryptoNetwork::Polygon,
        });
        assert_eq!(
            serde_json::to_value(&details).unwrap(),
            json!({
                "funding_type": "crypto",
                "crypto_asset": "USDC",
                "wallet_address": "0xabc",
                "network": "Polygon"
            })
        );
    }

    #[test]
    fn order_request_skips_absent_optionals() {
        let order = OrderRequest {
            symbol: "AAPL".to_string(),
            qty: "1.5".to_string(),
            side: OrderSide::Sell,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Gtc,
            limit_price: Some("190.25".to_string()),
            client_order_id: None,
            commission: None,
            commission_type: None,
        };
        assert_eq!(
            serde_json::to_value(&order).unwrap(),
            json!({
                "symbol": "AAPL",
                "qty": "1.5",
                "side": "sell",
                "type": "limit",
                "time_in_force": "gtc",
                "limit_price": "190.25"
            })
        );
    }
}
