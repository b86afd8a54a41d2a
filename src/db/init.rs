use sqlx::sqlite::SqliteQueryResult;

pub async fn create_transactions(
    connection: &sqlx::Pool<sqlx::Sqlite>,
) -> Result<SqliteQueryResult, sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ticker TEXT NOT NULL,
            isin TEXT,
            data_operazione TEXT NOT NULL,
            data_valuta TEXT NOT NULL,
            tipo_operazione TEXT NOT NULL,
            quantita REAL NOT NULL,
            prezzo_acquisto REAL NOT NULL,
            divisa TEXT NOT NULL,
            importo_euro REAL NOT NULL,
            importo_divisa REAL NOT NULL,
            riferimento_ordine TEXT NOT NULL,
            protocollo TEXT NOT NULL,
            descrizione TEXT,
            is_test INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (ticker, data_operazione, riferimento_ordine, protocollo)
        )
        "#,
    )
    .execute(connection)
    .await
}

pub async fn create_etf_holdings(
    connection: &sqlx::Pool<sqlx::Sqlite>,
) -> Result<SqliteQueryResult, sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS etf_holdings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            etf_ticker TEXT NOT NULL,
            ticker TEXT NOT NULL,
            nome TEXT NOT NULL,
            settore TEXT NOT NULL,
            asset_class TEXT NOT NULL,
            ponderazione REAL,
            area_geografica TEXT NOT NULL,
            cambio TEXT NOT NULL,
            valuta_mercato TEXT NOT NULL
        )
        "#,
    )
    .execute(connection)
    .await
}

pub async fn create_etf_prices(
    connection: &sqlx::Pool<sqlx::Sqlite>,
) -> Result<SqliteQueryResult, sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS etf_prices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ticker TEXT NOT NULL UNIQUE,
            price REAL NOT NULL,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(connection)
    .await
}

pub async fn create_etf_price_history(
    connection: &sqlx::Pool<sqlx::Sqlite>,
) -> Result<SqliteQueryResult, sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS etf_price_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ticker TEXT NOT NULL,
            date TEXT NOT NULL,
            close REAL NOT NULL,
            dividends REAL NOT NULL DEFAULT 0,
            UNIQUE (ticker, date, close)
        )
        "#,
    )
    .execute(connection)
    .await
}

pub async fn create_all(connection: &sqlx::Pool<sqlx::Sqlite>) -> Result<(), sqlx::Error> {
    create_transactions(connection).await?;
    create_etf_holdings(connection).await?;
    create_etf_prices(connection).await?;
    create_etf_price_history(connection).await?;
    Ok(())
}
