//! Console table of tracked coins.

use chrono::Local;
use coinwatch_core::Coin;
use std::fmt::Write;

/// ANSI clear-screen and cursor-home.
pub const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

const RULE_WIDTH: usize = 78;

/// Last trade time in local time with millisecond precision, `-` before
/// the first trade.
pub fn format_trade_time(coin: &Coin) -> String {
    coin.last_trade_at()
        .map(|at| {
            at.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string())
}

/// Render one table of `coins`, in the order given.
pub fn render_table(coins: &[Coin]) -> String {
    let mut out = String::new();
    let rule = "-".repeat(RULE_WIDTH);

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "{:<12} {:>16} {:>16} {:>6}  {:<23}",
        "Symbol", "Price", "Average", "Ready", "Last Update"
    );
    let _ = writeln!(out, "{rule}");

    if coins.is_empty() {
        let _ = writeln!(out, "(no coins tracked)");
    }

    for coin in coins {
        let ma = coin.moving_average();
        let ready = if ma.is_ready() {
            "yes".to_string()
        } else {
            format!("{}/{}", ma.len(), ma.window_size())
        };
        let _ = writeln!(
            out,
            "{:<12} {:>16.6} {:>16.6} {:>6}  {:<23}",
            coin.symbol(),
            coin.price(),
            ma.value(),
            ready,
            format_trade_time(coin)
        );
    }
    let _ = writeln!(out, "{rule}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinwatch_core::TradeUpdate;
    use std::num::NonZeroUsize;

    fn coin_with_trades(symbol: &str, prices: &[f64]) -> Coin {
        let mut coin = Coin::new(symbol, NonZeroUsize::new(2).unwrap());
        for (i, price) in prices.iter().enumerate() {
            coin.update_trade(&TradeUpdate {
                symbol: symbol.to_string(),
                price: *price,
                trade_id: i as i64 + 1,
                trade_quantity: 1.0,
                trade_time: 1_700_000_000_123,
            });
        }
        coin
    }

    #[test]
    fn test_render_header_and_rows() {
        let coins = vec![
            coin_with_trades("btcusdt", &[100.0, 200.0]),
            coin_with_trades("ethusdt", &[]),
        ];
        let table = render_table(&coins);
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[1].starts_with("Symbol"));
        assert!(lines[1].contains("Last Update"));

        let btc = lines[3];
        assert!(btc.starts_with("btcusdt"));
        assert!(btc.contains("200.000000"));
        assert!(btc.contains("150.000000"));
        assert!(btc.contains("yes"));
        assert!(btc.contains(".123"));

        let eth = lines[4];
        assert!(eth.starts_with("ethusdt"));
        assert!(eth.contains("0/2"));
        assert!(eth.trim_end().ends_with('-'));
    }

    #[test]
    fn test_render_empty() {
        let table = render_table(&[]);
        assert!(table.contains("(no coins tracked)"));
    }

    #[test]
    fn test_format_trade_time_before_first_trade() {
        let coin = coin_with_trades("btcusdt", &[]);
        assert_eq!(format_trade_time(&coin), "-");
    }
}
