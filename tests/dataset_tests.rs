/// Tests for loading the customer dataset from disk
use customer_health_api::dataset::CustomerDataset;
use customer_health_api::errors::AppError;
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

/// Writes `contents` to a unique file under the system temp dir
fn temp_csv(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("customers_{}.csv", Uuid::new_v4()));
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_from_file() {
    let path = temp_csv(
        "name,days_since_last_activity,open_tickets,total_tickets,total_revenue,opportunities_won,opportunities_lost,email_engagement\n\
         Acme Corp, 3, 1, 12, 125000.50, 4, 1, high\n\
         \"Wayne Enterprises, Inc.\",90,7,40,2500000,0,5,very_low\n",
    );

    let ds = CustomerDataset::load(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(ds.len(), 2);
    assert!(!ds.is_empty());

    // Cells are trimmed
    let acme = ds.lookup_by_name("Acme Corp").unwrap();
    assert_eq!(acme.days_since_last_activity, 3);
    assert_eq!(acme.email_engagement, "high");

    // Quoted names keep their commas
    let wayne = ds.at(1).unwrap();
    assert_eq!(wayne.name, "Wayne Enterprises, Inc.");
    assert_eq!(wayne.total_revenue, 2_500_000.0);
}

#[test]
fn test_load_reports_bad_row_with_path() {
    let path = temp_csv(
        "name,days_since_last_activity,open_tickets,total_tickets,total_revenue,opportunities_won,opportunities_lost,email_engagement\n\
         Acme Corp,3,1,12,125000,4,1,high\n\
         Globex,-4,1,12,9000,1,1,low\n",
    );

    let err = CustomerDataset::load(&path).unwrap_err();
    fs::remove_file(&path).ok();

    assert!(matches!(err.root(), AppError::InvalidDataset(_)));
    let message = err.to_string();
    assert!(message.contains("row 2"), "{}", message);
    assert!(message.contains(&path.display().to_string()), "{}", message);
}

#[test]
fn test_load_rejects_non_finite_revenue() {
    let path = temp_csv(
        "name,days_since_last_activity,open_tickets,total_tickets,total_revenue,opportunities_won,opportunities_lost,email_engagement\n\
         Acme Corp,3,1,12,NaN,4,1,high\n",
    );

    let err = CustomerDataset::load(&path).unwrap_err();
    fs::remove_file(&path).ok();
    assert!(matches!(err.root(), AppError::InvalidDataset(_)));
}

#[test]
fn test_missing_file_is_file_not_found() {
    let path = std::env::temp_dir().join(format!("missing_{}.csv", Uuid::new_v4()));
    let err = CustomerDataset::load(&path).unwrap_err();
    assert!(matches!(err, AppError::FileNotFound(_)));
    assert!(err.to_string().contains("not found"));
}
