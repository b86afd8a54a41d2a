#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use sqlx::{Pool, Sqlite, sqlite::SqlitePoolOptions};
    use tempfile::NamedTempFile;

    use crate::{
        app::Portfolio,
        app::portfolio::validate_transaction,
        db,
        errors::ValidationError,
        models::{Currency, OperationType, Transaction},
    };

    async fn pool() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        db::init::create_all(&pool).await.unwrap();
        pool
    }

    fn broker_file(rows: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for _ in 0..8 {
            writeln!(file, "Directa SIM - estratto movimenti").unwrap();
        }
        writeln!(
            file,
            "Data operazione,Data valuta,Tipo operazione,Ticker,ISIN,Protocollo,Descrizione,Quantita,Prezzo di acquisto,Importo euro,Importo divisa,Divisa,Riferimento ordine"
        )
        .unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        file
    }

    fn holdings_file(rows: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for _ in 0..2 {
            writeln!(file, "Composizione del fondo").unwrap();
        }
        writeln!(
            file,
            "Ticker;Nome;Settore;Asset Class;Ponderazione (%);Area Geografica;Cambio;Valuta di mercato"
        )
        .unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        file
    }

    #[tokio::test]
    async fn broker_import_is_idempotent_and_skips_invalid_rows() {
        let portfolio = Portfolio::new(pool().await);
        let file = broker_file(&[
            "02/01/2023,04/01/2023,Acquisto,vwce,IE00BK5BQT80,P1,acquisto,10,97.50,-975.00,975.00,EUR,O1",
            "03/01/2023,05/01/2023,Acquisto,EIMI,,P1,acquisto,\"1.000,5\",\"27,30\",,,EUR,O2",
            "04/01/2023,06/01/2023,Acquisto,BAD,,P1,quantita nulla,0,10,,,EUR,O3",
        ]);
        let path = file.path().to_str().unwrap();

        let first = portfolio.import_transactions(path).await.unwrap();
        assert_eq!(*first.parsed(), 2);
        assert_eq!(*first.inserted(), 2);
        assert_eq!(*first.skipped(), 1);

        let second = portfolio.import_transactions(path).await.unwrap();
        assert_eq!(*second.inserted(), 0);

        let ledger = db::read::load_transactions(portfolio.connection())
            .await
            .unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger[0].ticker(), "VWCE");
        assert_eq!(
            *ledger[0].operation_date(),
            NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
        );
        assert_eq!(*ledger[1].quantity(), dec!(1000.5));
        assert_eq!(*ledger[1].purchase_price(), dec!(27.30));
    }

    #[tokio::test]
    async fn holdings_upload_replaces_and_sanitizes() {
        let portfolio = Portfolio::new(pool().await);
        let first = holdings_file(&[
            "AAPL;Apple Inc.;Tecnologia;Azione;5,2;USA;EUR;USD",
            ";;;;x;;;", // everything missing or unparseable
        ]);
        let stored = portfolio
            .upload_holdings("vwce", first.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(stored, 2);

        let replacement = holdings_file(&["NVDA;NVIDIA Corp.;Tecnologia;Azione;6,0;USA;EUR;USD"]);
        portfolio
            .upload_holdings("VWCE", replacement.path().to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(
            db::read::holdings_count(portfolio.connection(), "VWCE")
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn manual_entries_share_the_ledger_with_imports() {
        let portfolio = Portfolio::new(pool().await);
        let transaction = portfolio
            .add_transaction(
                " vwce ",
                Some("ie00bk5bqt80"),
                NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
                dec!(10),
                dec!(97.5),
                Currency::Eur,
                "primo acquisto",
                false,
            )
            .await
            .unwrap();

        assert_eq!(transaction.ticker(), "VWCE");
        assert_eq!(transaction.isin().as_deref(), Some("IE00BK5BQT80"));
        assert_eq!(transaction.protocol(), "MANUALE");
        assert_eq!(transaction.order_reference().len(), 8);
        assert_eq!(*transaction.amount_eur(), dec!(-975));

        assert_eq!(
            db::read::transaction_count(portfolio.connection())
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn rejected_manual_entries_store_nothing() {
        let portfolio = Portfolio::new(pool().await);
        let result = portfolio
            .add_transaction(
                "VWCE",
                None,
                NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
                dec!(0),
                dec!(97.5),
                Currency::Eur,
                "",
                false,
            )
            .await;

        assert!(result.is_err());
        assert_eq!(
            db::read::transaction_count(portfolio.connection())
                .await
                .unwrap(),
            0
        );
    }

    #[test]
    fn validation_names_the_offending_field() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let build = |ticker: &str, qty, price, isin: Option<&str>| {
            Transaction::new(
                ticker.to_string(),
                isin.map(str::to_string),
                date,
                date,
                OperationType::Purchase,
                qty,
                price,
                Currency::Eur,
                dec!(0),
                dec!(0),
                String::from("O1"),
                String::from("P1"),
                String::new(),
                false,
            )
        };

        assert_eq!(
            validate_transaction(&build("", dec!(1), dec!(1), None)),
            Err(ValidationError::MissingField("ticker"))
        );
        assert_eq!(
            validate_transaction(&build("VWCE", dec!(0), dec!(1), None)),
            Err(ValidationError::NonPositive("quantita"))
        );
        assert_eq!(
            validate_transaction(&build("VWCE", dec!(1), dec!(0), None)),
            Err(ValidationError::NonPositive("prezzo_acquisto"))
        );
        assert_eq!(
            validate_transaction(&build("VWCE", dec!(1), dec!(1), Some("SHORT"))),
            Err(ValidationError::InvalidIsin(String::from("SHORT")))
        );
        assert!(validate_transaction(&build("VWCE", dec!(1), dec!(1), None)).is_ok());
    }

    #[tokio::test]
    async fn purchase_simulation_uses_the_stored_price() {
        let portfolio = Portfolio::new(pool().await);
        portfolio
            .add_transaction(
                "VWCE",
                None,
                NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
                dec!(10),
                dec!(90),
                Currency::Eur,
                "",
                false,
            )
            .await
            .unwrap();
        db::write::upsert_price(
            &crate::models::CurrentPrice::new(String::from("VWCE"), dec!(100)),
            portfolio.connection(),
        )
        .await
        .unwrap();

        let sim = portfolio.simulate_purchase("vwce", dec!(1)).await.unwrap();

        assert_eq!(*sim.cost(), dec!(100.00));
        // 100 of (900 + 100) = 10%
        assert_eq!(*sim.weight_pct(), Some(dec!(10.00)));

        let unknown = portfolio.simulate_purchase("ZZZZ", dec!(1)).await;
        assert!(unknown.is_err());
    }
}
