//! Uploading a CSV file and reading it back through SQL

mod common;

use common::{temp_csv, PEOPLE_CSV};
use tabletalk::config::IngestConfig;
use tabletalk::store::{connect, TabularIngestor};
use tabletalk::{Config, Session};

#[tokio::test]
async fn test_name_age_round_trip() {
    let (_dir, csv) = temp_csv("people.csv", PEOPLE_CSV);
    let mut session = Session::new(&Config::default());
    session.ingest_file(&csv).unwrap();

    let db = session.store().unwrap().database();
    assert_eq!(db.columns("uploaded_data").await.unwrap(), vec!["name", "age"]);

    let result = db
        .query("SELECT name, age FROM uploaded_data ORDER BY age", 10)
        .await
        .unwrap();
    assert_eq!(result.rows.len(), 3);
    assert_eq!(
        result.rows,
        vec![
            vec!["ada".to_string(), "36".to_string()],
            vec!["alan".to_string(), "41".to_string()],
            vec!["grace".to_string(), "85".to_string()],
        ]
    );
}

#[tokio::test]
async fn test_numeric_columns_support_arithmetic() {
    let ingestor = TabularIngestor::new(&IngestConfig::default());
    let handle = ingestor
        .ingest_reader(
            "region,revenue,units\nnorth,1200.50,3\nsouth,99.5,10\n".as_bytes(),
            "sales.csv",
        )
        .unwrap();

    let result = handle
        .database()
        .query(
            "SELECT SUM(revenue), SUM(units), typeof(units) FROM uploaded_data",
            10,
        )
        .await
        .unwrap();
    assert_eq!(result.rows[0], vec!["1300", "13", "integer"]);
}

#[tokio::test]
async fn test_uploaded_store_can_be_reopened_by_path() {
    let (_dir, csv) = temp_csv("people.csv", PEOPLE_CSV);
    let handle = TabularIngestor::new(&IngestConfig::default())
        .ingest_path(&csv)
        .unwrap();

    let db_file = handle.scratch_dir().unwrap().join("uploaded_data.db");
    let reopened = connect(db_file.to_str().unwrap()).await.unwrap();
    assert_eq!(
        reopened
            .database()
            .row_count("uploaded_data")
            .await
            .unwrap(),
        3
    );
}

#[tokio::test]
async fn test_quoted_fields_with_delimiters() {
    let handle = TabularIngestor::new(&IngestConfig::default())
        .ingest_reader(
            "name,notes\n\"Lovelace, Ada\",\"said \"\"hi\"\"\"\n".as_bytes(),
            "quotes.csv",
        )
        .unwrap();
    let result = handle
        .database()
        .query("SELECT name, notes FROM uploaded_data", 10)
        .await
        .unwrap();
    assert_eq!(result.rows[0], vec!["Lovelace, Ada", "said \"hi\""]);
}

#[tokio::test]
async fn test_space_padded_export_sums_as_numbers() {
    let handle = TabularIngestor::new(&IngestConfig::default())
        .ingest_reader("name, age\nada, 36\nbob , 41\n".as_bytes(), "padded.csv")
        .unwrap();
    let db = handle.database();

    assert_eq!(db.columns("uploaded_data").await.unwrap(), vec!["name", "age"]);
    let result = db
        .query("SELECT SUM(age) FROM uploaded_data WHERE age > 40 OR name = 'ada'", 10)
        .await
        .unwrap();
    assert_eq!(result.rows[0], vec!["77"]);
}
