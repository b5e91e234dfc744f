//! Coin registry.
//!
//! Authoritative symbol -> `Coin` map. Per-entry locking through `DashMap`
//! keeps a coin's fields and moving average consistent for readers, who only
//! ever get cloned snapshots. No map guard is held while calling into the
//! connection.

use coinwatch_core::{category, trade_stream, validate_symbol, Coin, Diagnostics, Severity, TradeUpdate};
use coinwatch_ws::Connection;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Symbol-keyed collection of tracked coins.
pub struct CoinRegistry {
    coins: DashMap<String, Coin>,
    connection: RwLock<Weak<Connection>>,
    window_size: NonZeroUsize,
    diagnostics: Arc<dyn Diagnostics>,
}

impl CoinRegistry {
    /// Create an empty registry. Every coin it creates uses `window_size`.
    pub fn new(window_size: NonZeroUsize, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            coins: DashMap::new(),
            connection: RwLock::new(Weak::new()),
            window_size,
            diagnostics,
        }
    }

    fn diag(&self, severity: Severity, message: &str) {
        self.diagnostics
            .record(severity, category::REGISTRY, message);
    }

    /// Attach the connection used for subscription side effects.
    ///
    /// Only a weak reference is kept.
    pub fn set_connection(&self, connection: &Arc<Connection>) {
        *self.connection.write() = Arc::downgrade(connection);
    }

    pub fn clear_connection(&self) {
        *self.connection.write() = Weak::new();
    }

    pub fn has_connection(&self) -> bool {
        self.connection.read().strong_count() > 0
    }

    /// The attached connection if it is alive and connected.
    fn live_connection(&self, action: &str) -> Option<Arc<Connection>> {
        let Some(connection) = self.connection.read().upgrade() else {
            self.diagnostics.record(
                Severity::Info,
                category::SUBSCRIPTION,
                &format!("{action} skipped, no connection attached"),
            );
            return None;
        };
        if !connection.is_connected() {
            self.diagnostics.record(
                Severity::Warning,
                category::SUBSCRIPTION,
                &format!("{action} skipped, connection is {}", connection.state()),
            );
            return None;
        }
        Some(connection)
    }

    /// Start tracking `symbols`. Returns the newly inserted symbols, in
    /// input order.
    ///
    /// Blank symbols are skipped and existing symbols keep their state.
    /// Newly inserted symbols are subscribed when the connection is up.
    pub fn add_coins<S: AsRef<str>>(&self, symbols: &[S]) -> Vec<String> {
        if symbols.is_empty() {
            self.diag(Severity::Debug, "add_coins called with no symbols");
            return Vec::new();
        }

        let mut added = Vec::new();
        for symbol in symbols {
            let symbol = symbol.as_ref();
            if let Err(e) = validate_symbol(symbol) {
                self.diag(Severity::Warning, &format!("skipping symbol: {e}"));
                continue;
            }

            match self.coins.entry(symbol.to_string()) {
                Entry::Occupied(_) => {
                    self.diag(Severity::Debug, &format!("{symbol} already tracked"));
                }
                Entry::Vacant(slot) => {
                    slot.insert(Coin::new(symbol, self.window_size));
                    added.push(symbol.to_string());
                }
            }
        }

        if !added.is_empty() {
            debug!(added = ?added, total = self.coins.len(), "Coins added");
            if let Some(connection) = self.live_connection("subscribe") {
                let streams: Vec<String> = added.iter().map(|s| trade_stream(s)).collect();
                connection.subscribe_to_streams(&streams);
            }
        }
        added
    }

    /// Stop tracking `symbols`. Returns the symbols actually removed.
    ///
    /// Absent symbols are ignored. Removed symbols are unsubscribed when the
    /// connection is up.
    pub fn remove_coins<S: AsRef<str>>(&self, symbols: &[S]) -> Vec<String> {
        let removed: Vec<String> = symbols
            .iter()
            .filter_map(|symbol| self.coins.remove(symbol.as_ref()).map(|(key, _)| key))
            .collect();

        if !removed.is_empty() {
            debug!(removed = ?removed, total = self.coins.len(), "Coins removed");
            if let Some(connection) = self.live_connection("unsubscribe") {
                let streams: Vec<String> = removed.iter().map(|s| trade_stream(s)).collect();
                connection.unsubscribe_from_streams(&streams);
            }
        }
        removed
    }

    /// Apply a trade to its coin. Returns false for untracked symbols.
    ///
    /// Trades are applied in arrival order even when the trade id goes
    /// backwards; that case only records a debug diagnostic.
    pub fn update_coin_data(&self, trade: &TradeUpdate) -> bool {
        let previous_id = match self.coins.get_mut(&trade.symbol) {
            Some(mut coin) => {
                let previous = coin.has_traded().then(|| coin.last_trade_id());
                coin.update_trade(trade);
                previous
            }
            None => {
                self.diag(
                    Severity::Warning,
                    &format!("trade for unknown coin {}", trade.symbol),
                );
                return false;
            }
        };

        if let Some(previous) = previous_id.filter(|prev| trade.trade_id < *prev) {
            self.diag(
                Severity::Debug,
                &format!(
                    "{} trade id went backwards: {} -> {}",
                    trade.symbol, previous, trade.trade_id
                ),
            );
        }
        true
    }

    /// Snapshots of every coin, sorted by symbol.
    pub fn all_coins(&self) -> Vec<Coin> {
        let mut coins: Vec<Coin> = self.coins.iter().map(|entry| entry.value().clone()).collect();
        coins.sort_by(|a, b| a.symbol().cmp(b.symbol()));
        coins
    }

    /// Tracked symbols, sorted.
    pub fn all_coin_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.coins.iter().map(|entry| entry.key().clone()).collect();
        symbols.sort();
        symbols
    }

    pub fn has_coin(&self, symbol: &str) -> bool {
        self.coins.contains_key(symbol)
    }

    /// Snapshot of one coin.
    pub fn get_coin(&self, symbol: &str) -> Option<Coin> {
        self.coins.get(symbol).map(|coin| coin.value().clone())
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    pub fn window_size(&self) -> NonZeroUsize {
        self.window_size
    }
}
