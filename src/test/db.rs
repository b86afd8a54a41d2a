#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use sqlx::{Pool, Sqlite, sqlite::SqlitePoolOptions};

    use crate::{
        db,
        models::{CurrentPrice, Currency, EtfHolding, OperationType, PricePoint, Transaction},
    };

    async fn pool() -> Pool<Sqlite> {
        // One connection, or the in-memory database vanishes between them.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        db::init::create_all(&pool).await.unwrap();
        pool
    }

    fn buy(ticker: &str, date: &str, order_ref: &str, protocol: &str) -> Transaction {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        Transaction::new(
            ticker.to_string(),
            Some(String::from("IE00BK5BQT80")),
            date,
            date,
            OperationType::Purchase,
            dec!(10),
            dec!(50),
            Currency::Eur,
            dec!(-500),
            dec!(500),
            order_ref.to_string(),
            protocol.to_string(),
            String::from("acquisto VWCE"),
            false,
        )
    }

    fn holding(etf: &str, ticker: &str, weighting: Option<Decimal>) -> EtfHolding {
        EtfHolding::new(
            etf.to_string(),
            ticker.to_string(),
            String::from("-"),
            String::from("Tecnologia"),
            String::from("Azione"),
            weighting,
            String::from("USA"),
            String::from("EUR"),
            String::from("USD"),
        )
    }

    #[tokio::test]
    async fn importing_the_same_batch_twice_is_idempotent() {
        let pool = pool().await;
        let batch = vec![
            buy("VWCE", "2023-01-02", "A1", "P1"),
            buy("VWCE", "2023-01-03", "A2", "P1"),
        ];

        let first = db::write::insert_transactions(&batch, &pool).await.unwrap();
        let second = db::write::insert_transactions(&batch, &pool).await.unwrap();

        assert_eq!(first, 2);
        assert_eq!(second, 0);
        assert_eq!(db::read::transaction_count(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn natural_key_distinguishes_order_reference_and_protocol() {
        let pool = pool().await;
        let batch = vec![
            buy("VWCE", "2023-01-02", "A1", "P1"),
            buy("VWCE", "2023-01-02", "A2", "P1"),
            buy("VWCE", "2023-01-02", "A1", "P2"),
        ];

        let inserted = db::write::insert_transactions(&batch, &pool).await.unwrap();

        assert_eq!(inserted, 3);
    }

    #[tokio::test]
    async fn transactions_round_trip_through_the_ledger() {
        let pool = pool().await;
        let original = buy("VWCE", "2023-01-02", "A1", "P1");
        db::write::insert_transactions(std::slice::from_ref(&original), &pool)
            .await
            .unwrap();

        let loaded = db::read::load_transactions(&pool).await.unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].ticker(), "VWCE");
        assert_eq!(loaded[0].operation_date(), original.operation_date());
        assert_eq!(*loaded[0].quantity(), dec!(10));
        assert_eq!(*loaded[0].purchase_price(), dec!(50));
        assert_eq!(*loaded[0].currency(), Currency::Eur);
        assert_eq!(loaded[0].order_reference(), "A1");
        assert_eq!(loaded[0].protocol(), "P1");
    }

    #[tokio::test]
    async fn replacing_holdings_never_touches_other_tickers() {
        let pool = pool().await;
        let vwce = vec![
            holding("VWCE", "AAPL", Some(dec!(5.2))),
            holding("VWCE", "MSFT", Some(dec!(4.1))),
        ];
        let eimi = vec![
            holding("EIMI", "TSM", Some(dec!(7.9))),
            holding("EIMI", "TCEHY", Some(dec!(4.4))),
            holding("EIMI", "BABA", None),
        ];
        db::write::replace_holdings("VWCE", &vwce, &pool).await.unwrap();
        db::write::replace_holdings("EIMI", &eimi, &pool).await.unwrap();

        let replacement = vec![holding("VWCE", "NVDA", Some(dec!(6.0)))];
        db::write::replace_holdings("VWCE", &replacement, &pool)
            .await
            .unwrap();

        assert_eq!(db::read::holdings_count(&pool, "VWCE").await.unwrap(), 1);
        assert_eq!(db::read::holdings_count(&pool, "EIMI").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn price_upsert_keeps_one_row_per_ticker() {
        let pool = pool().await;
        db::write::upsert_price(&CurrentPrice::new(String::from("VWCE"), dec!(100.5)), &pool)
            .await
            .unwrap();
        db::write::upsert_price(&CurrentPrice::new(String::from("VWCE"), dec!(101.25)), &pool)
            .await
            .unwrap();

        let prices = db::read::current_prices(&pool).await.unwrap();

        assert_eq!(prices.len(), 1);
        assert_eq!(prices["VWCE"], dec!(101.25));
    }

    #[tokio::test]
    async fn price_history_is_append_only() {
        let pool = pool().await;
        let date = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let points = vec![PricePoint::new(
            String::from("VWCE"),
            date,
            dec!(98.76),
            dec!(0),
        )];

        let first = db::write::insert_price_history(&points, &pool).await.unwrap();
        let second = db::write::insert_price_history(&points, &pool).await.unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn distinct_tickers_cover_ledger_and_holdings() {
        let pool = pool().await;
        db::write::insert_transactions(&[buy("VWCE", "2023-01-02", "A1", "P1")], &pool)
            .await
            .unwrap();
        db::write::replace_holdings("EIMI", &[holding("EIMI", "TSM", None)], &pool)
            .await
            .unwrap();

        let tickers = db::read::distinct_tickers(&pool).await.unwrap();

        assert_eq!(tickers, vec![String::from("EIMI"), String::from("VWCE")]);
    }

    #[tokio::test]
    async fn ranked_performers_order_by_gain() {
        let pool = pool().await;
        // VWCE: cost 500, price 55 -> gain +50. EIMI: cost 500, price 45 -> gain -50.
        db::write::insert_transactions(
            &[
                buy("VWCE", "2023-01-02", "A1", "P1"),
                buy("EIMI", "2023-01-02", "A2", "P1"),
            ],
            &pool,
        )
        .await
        .unwrap();
        db::write::upsert_price(&CurrentPrice::new(String::from("VWCE"), dec!(55)), &pool)
            .await
            .unwrap();
        db::write::upsert_price(&CurrentPrice::new(String::from("EIMI"), dec!(45)), &pool)
            .await
            .unwrap();

        let top = db::read::ranked_performers(&pool, 3, true).await.unwrap();
        let bottom = db::read::ranked_performers(&pool, 3, false).await.unwrap();

        assert_eq!(top[0], (String::from("VWCE"), dec!(50.00)));
        assert_eq!(bottom[0], (String::from("EIMI"), dec!(-50.00)));
    }

    #[tokio::test]
    async fn average_purchase_price_is_quantity_weighted() {
        let pool = pool().await;
        let date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let cheap = Transaction::new(
            String::from("VWCE"),
            None,
            date,
            date,
            OperationType::Purchase,
            dec!(30),
            dec!(10),
            Currency::Eur,
            dec!(-300),
            dec!(300),
            String::from("B1"),
            String::from("P1"),
            String::new(),
            false,
        );
        db::write::insert_transactions(
            &[buy("VWCE", "2023-01-03", "A1", "P1"), cheap],
            &pool,
        )
        .await
        .unwrap();

        let averages = db::read::average_purchase_price(&pool).await.unwrap();

        // (10*50 + 30*10) / 40 = 20
        assert_eq!(averages, vec![(String::from("VWCE"), dec!(20))]);
    }

    #[tokio::test]
    async fn purge_removes_only_test_rows() {
        let pool = pool().await;
        let date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let test_row = Transaction::new(
            String::from("TEST"),
            None,
            date,
            date,
            OperationType::Purchase,
            dec!(1),
            dec!(1),
            Currency::Eur,
            dec!(-1),
            dec!(1),
            String::from("T1"),
            String::from("P1"),
            String::new(),
            true,
        );
        db::write::insert_transactions(
            &[buy("VWCE", "2023-01-02", "A1", "P1"), test_row],
            &pool,
        )
        .await
        .unwrap();

        let removed = db::write::purge_test_transactions(&pool).await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(db::read::transaction_count(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn annual_invested_groups_by_year() {
        let pool = pool().await;
        db::write::insert_transactions(
            &[
                buy("VWCE", "2022-03-01", "A1", "P1"),
                buy("VWCE", "2023-04-01", "A2", "P1"),
                buy("EIMI", "2023-05-01", "A3", "P1"),
            ],
            &pool,
        )
        .await
        .unwrap();

        let by_year = db::read::annual_invested(&pool).await.unwrap();

        assert_eq!(
            by_year,
            vec![(2022, dec!(500.00)), (2023, dec!(1000.00))]
        );
    }
}
