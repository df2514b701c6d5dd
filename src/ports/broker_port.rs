//! Brokerage port: account lookup and order submission.
//!
//! Only the interface ships. An implementation receives its [`BrokerCredentials`]
//! explicitly at construction; nothing is read from global state.

use crate::domain::error::SignalError;
use crate::ports::config_port::ConfigPort;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn requires_price(&self) -> bool {
        matches!(self, OrderType::Limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeInForce {
    #[default]
    Day,
    GoodTillCancel,
    ImmediateOrCancel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub quantity: f64,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub limit_price: Option<f64>,
    pub time_in_force: TimeInForce,
}

impl OrderRequest {
    pub fn market(symbol: &str, quantity: f64, side: OrderSide) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            quantity,
            side,
            order_type: OrderType::Market,
            limit_price: None,
            time_in_force: TimeInForce::Day,
        }
    }

    pub fn limit(symbol: &str, quantity: f64, side: OrderSide, price: f64) -> Self {
        Self {
            order_type: OrderType::Limit,
            limit_price: Some(price),
            ..Self::market(symbol, quantity, side)
        }
    }

    /// Reject requests a broker would bounce: non-positive quantity, or a limit
    /// order without a positive price.
    pub fn validate(&self) -> Result<(), SignalError> {
        if !(self.quantity.is_finite() && self.quantity > 0.0) {
            return Err(SignalError::Broker {
                reason: format!("quantity must be positive, got {}", self.quantity),
            });
        }
        if self.order_type.requires_price() {
            match self.limit_price {
                Some(p) if p.is_finite() && p > 0.0 => {}
                _ => {
                    return Err(SignalError::Broker {
                        reason: format!("limit order for {} needs a positive price", self.symbol),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountSummary {
    pub account_id: String,
    pub cash: f64,
    pub buying_power: f64,
    pub equity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Accepted,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderAck {
    pub order_id: String,
    pub request: OrderRequest,
    pub status: OrderStatus,
}

/// Keys for a brokerage REST API. `Debug` never prints the secrets.
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerCredentials {
    pub api_key: String,
    pub secret_key: String,
    pub base_url: String,
}

impl BrokerCredentials {
    /// Read `[broker] api_key`, `secret_key` and `base_url`. Only a `BrokerPort`
    /// implementation needs these; the signal commands never read `[broker]`.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SignalError> {
        let get = |key: &str| {
            config
                .get_string("broker", key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| SignalError::ConfigMissing {
                    section: "broker".to_string(),
                    key: key.to_string(),
                })
        };
        Ok(Self {
            api_key: get("api_key")?,
            secret_key: get("secret_key")?,
            base_url: get("base_url")?,
        })
    }
}

impl fmt::Debug for BrokerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerCredentials")
            .field("api_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

pub trait BrokerPort {
    fn account(&self) -> Result<AccountSummary, SignalError>;
    fn submit_order(&self, request: OrderRequest) -> Result<OrderAck, SignalError>;
    fn orders(&self) -> Result<Vec<OrderAck>, SignalError>;
}
